//! Fixtures for unit tests: small Go modules written to a temporary
//! directory and loaded through the real [`Loader`].
//!
//! ```rust,ignore
//! let (_dir, program) = testkit::load_single("package main\n\nfunc main() {}\n");
//! let (file, call) = testkit::find_call(&program, "os.Remove");
//! ```

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::loader::{FileRef, Loader, Program};
use crate::syntax::ast::{ExprKind, NodeId};
use crate::syntax::node::{walk, NodeRef};
use crate::syntax::printer::print_expr;

pub const MODULE: &str = "example.com/app";

pub fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, text).expect("write fixture file");
}

/// Writes `files` under a fresh module root. The directory must outlive
/// the returned program's paths.
pub fn module(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "go.mod", &format!("module {MODULE}\n\ngo 1.22\n"));
    for (rel, text) in files {
        write(dir.path(), rel, text);
    }
    dir
}

pub fn load(files: &[(&str, &str)]) -> (TempDir, Program) {
    let dir = module(files);
    let program = Loader::new(dir.path()).load().expect("fixture loads");
    (dir, program)
}

pub fn load_single(source: &str) -> (TempDir, Program) {
    load(&[("main.go", source)])
}

/// First call (in file and source order) whose callee prints as `callee`.
pub fn find_call(program: &Program, callee: &str) -> (FileRef, NodeId) {
    for (file, source) in program.files() {
        let mut found = None;
        walk(NodeRef::File(&source.ast), &mut |node, _| {
            if found.is_some() {
                return false;
            }
            if let NodeRef::Expr(expr) = node {
                if let ExprKind::Call { fun, .. } = &expr.kind {
                    if print_expr(fun) == callee {
                        found = Some(expr.id);
                    }
                }
            }
            true
        });
        if let Some(id) = found {
            return (file, id);
        }
    }
    panic!("no call to {callee}");
}
