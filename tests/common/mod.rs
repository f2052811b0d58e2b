#![allow(dead_code)]

use std::fs;
use std::path::Path;

use errfix::{Driver, FixConfig, Reporter, Summary};
use tempfile::TempDir;

pub const GO_MOD: &str = "module example.com/app\n\ngo 1.22\n";

/// A Go module in a temporary directory.
pub fn module(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("go.mod"), GO_MOD).expect("write go.mod");
    for (rel, text) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create package directory");
        }
        fs::write(path, text).expect("write fixture");
    }
    dir
}

pub fn read(dir: &Path, rel: &str) -> String {
    fs::read_to_string(dir.join(rel)).expect("read fixture")
}

/// Runs the fix loop over `dir` with `configure` applied to the defaults.
pub fn fix_with(dir: &Path, configure: impl FnOnce(&mut FixConfig)) -> Summary {
    let mut config = FixConfig::new(dir);
    configure(&mut config);
    let reporter = Reporter::new();
    Driver::new(&config, &reporter)
        .run(&mut Vec::new())
        .expect("fix run succeeds");
    reporter.summary()
}

pub fn fix(dir: &Path) -> Summary {
    fix_with(dir, |_| {})
}
