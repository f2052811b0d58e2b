//! Run summary: which files changed, how many discards were fixed or left
//! alone, and (in check mode) where the outstanding ones are.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use colored::Colorize;
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::errors::Result;
use crate::rewrite::Outcome;

/// A discarded error reported by check mode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Finding {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub kind: String,
    pub call: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub modified: Vec<PathBuf>,
    pub handled: usize,
    pub skipped: usize,
    pub panics_converted: usize,
    pub functions_changed: Vec<String>,
    pub findings: Vec<Finding>,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Default)]
struct State {
    modified: BTreeSet<PathBuf>,
    handled: usize,
    skipped: usize,
    panics: usize,
    functions: BTreeSet<String>,
    findings: BTreeSet<Finding>,
    iterations: usize,
    converged: bool,
}

/// Shared sink for run results.
#[derive(Debug, Default)]
pub struct Reporter {
    state: Mutex<State>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_modified(&self, path: &Path) {
        self.state.lock().modified.insert(path.to_path_buf());
    }

    /// Adds one injection pass. Skips only count for the latest pass: a
    /// point left alone is seen again on every later iteration.
    pub fn record_pass(&self, outcome: &Outcome, plan_skipped: usize) {
        let mut state = self.state.lock();
        state.handled += outcome.handled;
        state.panics += outcome.panics;
        state.skipped = outcome.skipped + plan_skipped;
    }

    pub fn record_changed_functions(&self, names: &[String]) {
        self.state.lock().functions.extend(names.iter().cloned());
    }

    pub fn record_finding(&self, finding: Finding) {
        self.state.lock().findings.insert(finding);
    }

    pub fn finish(&self, iterations: usize, converged: bool) {
        let mut state = self.state.lock();
        state.iterations = iterations;
        state.converged = converged;
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().findings.len()
    }

    pub fn summary(&self) -> Summary {
        let state = self.state.lock();
        Summary {
            modified: state.modified.iter().cloned().collect(),
            handled: state.handled,
            skipped: state.skipped,
            panics_converted: state.panics,
            functions_changed: state.functions.iter().cloned().collect(),
            findings: state.findings.iter().cloned().collect(),
            iterations: state.iterations,
            converged: state.converged,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }

    /// Human-readable summary; `root` shortens the printed paths.
    pub fn render_text(&self, root: &Path) -> String {
        let summary = self.summary();
        let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).display().to_string();
        let mut lines = Vec::new();
        for finding in &summary.findings {
            lines.push(format!(
                "{}:{}:{}: discarded error from {} ({})",
                relative(&finding.path),
                finding.line,
                finding.column,
                finding.call.bold(),
                finding.kind
            ));
        }
        for path in &summary.modified {
            lines.push(format!("{} {}", "fixed".green(), relative(path)));
        }
        let mut totals = format!("{} handled, {} skipped", summary.handled, summary.skipped);
        if summary.panics_converted > 0 {
            totals.push_str(&format!(", {} panics converted", summary.panics_converted));
        }
        if !summary.findings.is_empty() {
            totals = format!("{} discarded errors", summary.findings.len());
        }
        lines.push(totals);
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paths_are_sorted_and_deduplicated() {
        let reporter = Reporter::new();
        reporter.record_modified(Path::new("/m/b.go"));
        reporter.record_modified(Path::new("/m/a.go"));
        reporter.record_modified(Path::new("/m/b.go"));
        assert_eq!(
            reporter.summary().modified,
            vec![PathBuf::from("/m/a.go"), PathBuf::from("/m/b.go")]
        );
    }

    #[test]
    fn skips_reflect_the_latest_pass_only() {
        let reporter = Reporter::new();
        let first = Outcome {
            handled: 3,
            skipped: 2,
            panics: 0,
        };
        let second = Outcome {
            handled: 1,
            skipped: 1,
            panics: 1,
        };
        reporter.record_pass(&first, 1);
        reporter.record_pass(&second, 0);
        let summary = reporter.summary();
        assert_eq!((summary.handled, summary.skipped, summary.panics_converted), (4, 1, 1));
    }

    #[test]
    fn json_names_every_field() {
        let reporter = Reporter::new();
        reporter.record_finding(Finding {
            path: PathBuf::from("main.go"),
            line: 4,
            column: 2,
            kind: "bare call".into(),
            call: "os.Remove".into(),
        });
        reporter.finish(1, true);
        let value: serde_json::Value = serde_json::from_str(&reporter.to_json().unwrap()).unwrap();
        assert_eq!(value["findings"][0]["call"], "os.Remove");
        assert_eq!(value["iterations"], 1);
        assert_eq!(value["converged"], true);
        assert_eq!(reporter.outstanding(), 1);
    }

    #[test]
    fn text_lists_findings_relative_to_the_root() {
        colored::control::set_override(false);
        let reporter = Reporter::new();
        reporter.record_finding(Finding {
            path: PathBuf::from("/work/cmd/main.go"),
            line: 7,
            column: 3,
            kind: "deferred call".into(),
            call: "f.Close".into(),
        });
        assert_eq!(
            reporter.render_text(Path::new("/work")),
            "cmd/main.go:7:3: discarded error from f.Close (deferred call)\n1 discarded errors"
        );
    }
}
