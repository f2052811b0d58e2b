//! Getting rewritten sources out: onto disk, or as a diff on stdout.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use similar::TextDiff;
use tracing::info;

use crate::config::Mode;
use crate::core::errors::{Error, Result};
use crate::observability::set_current_file;
use crate::reporter::Reporter;

/// Final content of one file, next to what was on disk before the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub original: String,
    pub text: String,
}

/// Writes or prints `changes` according to `mode`. Check mode never
/// touches anything.
pub fn persist(mode: Mode, changes: &[Change], root: &Path, out: &mut dyn Write, reporter: &Reporter) -> Result<()> {
    match mode {
        Mode::Check => Ok(()),
        Mode::DryRun => {
            for change in changes {
                let label = change.path.strip_prefix(root).unwrap_or(&change.path).display().to_string();
                let diff = render_diff(&label, &change.original, &change.text);
                out.write_all(colorize(&diff).as_bytes()).map_err(|e| Error::io("<stdout>", e))?;
                reporter.record_modified(&change.path);
            }
            Ok(())
        }
        Mode::Write => {
            for change in changes {
                let _file = set_current_file(&change.path);
                fs::write(&change.path, &change.text).map_err(|e| Error::io(&change.path, e))?;
                info!("wrote {}", change.path.display());
                reporter.record_modified(&change.path);
            }
            Ok(())
        }
    }
}

pub fn render_diff(label: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

fn colorize(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .map(|line| line + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn change(dir: &Path) -> Change {
        let path = dir.join("main.go");
        fs::write(&path, "package main\n\nfunc main() {}\n").unwrap();
        Change {
            path,
            original: "package main\n\nfunc main() {}\n".into(),
            text: "package main\n\nfunc main() {\n}\n".into(),
        }
    }

    #[test]
    fn write_mode_overwrites_and_records() {
        let dir = TempDir::new().unwrap();
        let change = change(dir.path());
        let reporter = Reporter::new();
        let mut out = Vec::new();
        persist(Mode::Write, std::slice::from_ref(&change), dir.path(), &mut out, &reporter).unwrap();
        assert_eq!(fs::read_to_string(&change.path).unwrap(), change.text);
        assert!(out.is_empty());
        assert_eq!(reporter.summary().modified, vec![change.path]);
    }

    #[test]
    fn dry_run_prints_a_diff_and_leaves_files_alone() {
        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        let change = change(dir.path());
        let reporter = Reporter::new();
        let mut out = Vec::new();
        persist(Mode::DryRun, std::slice::from_ref(&change), dir.path(), &mut out, &reporter).unwrap();
        let diff = String::from_utf8(out).unwrap();
        assert!(diff.starts_with("--- a/main.go\n+++ b/main.go\n"), "{diff}");
        assert!(diff.contains("-func main() {}\n+func main() {\n+}\n"), "{diff}");
        assert_eq!(fs::read_to_string(&change.path).unwrap(), change.original);
    }

    #[test]
    fn check_mode_does_nothing() {
        let dir = TempDir::new().unwrap();
        let change = change(dir.path());
        let reporter = Reporter::new();
        let mut out = Vec::new();
        persist(Mode::Check, &[change.clone()], dir.path(), &mut out, &reporter).unwrap();
        assert!(out.is_empty());
        assert!(reporter.summary().modified.is_empty());
        assert_eq!(fs::read_to_string(&change.path).unwrap(), change.original);
    }
}
