use crate::core::errors::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directories the Go tool never builds from.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

pub struct GoFileWalker {
    root: PathBuf,
    include_tests: bool,
}

impl GoFileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            include_tests: true,
        }
    }

    pub fn with_tests(mut self, include_tests: bool) -> Self {
        self.include_tests = include_tests;
        self
    }

    /// Every `.go` file below the root, sorted by path.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && entry.depth() > 0 && (SKIPPED_DIRS.contains(&name.as_ref()) || name.starts_with('_')))
            })
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| Error::Load(format!("walking {}: {e}", self.root.display())))?;
            let path = entry.path();
            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != "go") {
            return false;
        }
        self.include_tests || !is_test_file(path)
    }
}

pub fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with("_test.go"))
}

pub fn find_go_files(root: &Path) -> Result<Vec<PathBuf>> {
    GoFileWalker::new(root.to_path_buf()).walk()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn skips_vendor_testdata_and_hidden_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for sub in ["pkg", "vendor/x", "testdata", ".git", "_old"] {
            fs::create_dir_all(root.join(sub)).unwrap();
            fs::write(root.join(sub).join("a.go"), "package a\n").unwrap();
        }
        fs::write(root.join("main.go"), "package main\n").unwrap();
        fs::write(root.join("main_test.go"), "package main\n").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let files: Vec<String> = find_go_files(root)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["main.go", "main_test.go", "pkg/a.go"]);

        let without_tests = GoFileWalker::new(root.to_path_buf()).with_tests(false).walk().unwrap();
        assert_eq!(without_tests.len(), 2);
    }
}
