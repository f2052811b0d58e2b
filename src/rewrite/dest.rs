//! Formatting-preserving destination trees, one per touched file.
//!
//! The analysis tree of a file is never printed. Edits land on a second
//! parse of the same source whose comments have been moved onto nodes, and
//! the printer copies every declaration that was not marked dirty straight
//! from the original bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use super::imports::ensure_imports;
use crate::core::errors::{Error, Result};
use crate::loader::{syntax_error, FileRef, Program};
use crate::syntax::ast::{File, IdGen, NodeId};
use crate::syntax::decorate::decorate;
use crate::syntax::node::{path_to, NodeRef};
use crate::syntax::parser::parse_file;
use crate::syntax::printer::print_file;

/// An import the generated code relies on: path plus the alias to write,
/// if the default package name was taken.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Required {
    pub path: String,
    pub alias: Option<String>,
}

#[derive(Debug)]
pub struct DestFile {
    pub path: PathBuf,
    pub original: String,
    pub ast: File,
    pub ids: IdGen,
    pub required: BTreeSet<Required>,
    touched: bool,
}

impl DestFile {
    pub fn parse(path: PathBuf, source: &str) -> Result<Self> {
        let mut ids = IdGen::default();
        let mut ast = parse_file(source, &mut ids).map_err(|e| syntax_error(&path, source, e))?;
        decorate(&mut ast, source);
        Ok(Self {
            path,
            original: source.to_string(),
            ast,
            ids,
            required: BTreeSet::new(),
            touched: false,
        })
    }

    /// Flags the top-level declaration holding `node` for re-printing.
    pub fn mark_dirty(&mut self, node: NodeId) {
        let index = path_to(NodeRef::File(&self.ast), node)
            .and_then(|path| path.get(1).and_then(|(edge, _)| edge.and_then(|e| e.index)));
        if let Some(decl) = index.and_then(|i| self.ast.decls.get_mut(i)) {
            decl.dirty = true;
            self.touched = true;
        }
    }

    pub fn require(&mut self, required: Required) {
        self.required.insert(required);
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn render(&self) -> String {
        print_file(&self.ast, &self.original)
    }
}

/// Output of one edited file.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub path: PathBuf,
    pub original: String,
    pub text: String,
}

impl Rendered {
    pub fn changed(&self) -> bool {
        self.original != self.text
    }
}

/// Per-iteration cache; repeated lookups of a file return the same tree.
#[derive(Debug, Default)]
pub struct DestCache {
    files: BTreeMap<FileRef, DestFile>,
}

impl DestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, program: &Program, file: FileRef) -> Result<&mut DestFile> {
        if !self.files.contains_key(&file) {
            let source = program.file(file);
            debug!(path = %source.path.display(), "parsing destination tree");
            let dest = DestFile::parse(source.path.clone(), &source.source)?;
            self.files.insert(file, dest);
        }
        self.files
            .get_mut(&file)
            .ok_or_else(|| Error::Load(format!("destination tree for {file:?} vanished")))
    }

    /// Adds the imports each file needs and prints every touched file.
    pub fn finish(self) -> Vec<Rendered> {
        self.files
            .into_values()
            .filter(|dest| dest.touched)
            .map(|mut dest| {
                let required: Vec<Required> = dest.required.iter().cloned().collect();
                ensure_imports(&mut dest.ast, &mut dest.ids, &required);
                Rendered {
                    text: dest.render(),
                    path: dest.path,
                    original: dest.original,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::DeclKind;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = indoc! {r#"
        package main

        // run does the work.
        func run() {
            // keep me
            work()
        }

        func other() {}
    "#};

    #[test]
    fn untouched_files_render_verbatim() {
        let dest = DestFile::parse(PathBuf::from("main.go"), SOURCE).unwrap();
        assert!(!dest.is_touched());
        assert_eq!(dest.render(), SOURCE);
    }

    #[test]
    fn dirty_declarations_keep_inner_comments() {
        let mut dest = DestFile::parse(PathBuf::from("main.go"), SOURCE).unwrap();
        let body_stmt = match &dest.ast.decls[0].kind {
            DeclKind::Func(func) => func.body.as_ref().unwrap().stmts[0].id,
            DeclKind::Gen(_) => unreachable!(),
        };
        dest.mark_dirty(body_stmt);
        assert!(dest.is_touched());
        assert!(dest.ast.decls[0].dirty);
        assert!(!dest.ast.decls[1].dirty);
        let text = dest.render();
        assert!(text.contains("// run does the work.\nfunc run() {"));
        assert!(text.contains("\t// keep me\n\twork()"));
    }
}
