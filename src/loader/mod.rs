//! Program loading: discovers the module's packages, parses every file with
//! one shared id generator and type-checks the packages in import order.
//!
//! Standard library imports are satisfied by the bundled stubs; any other
//! import outside the module becomes an opaque package.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use tracing::{debug, warn};

use crate::core::errors::{Error, Result};
use crate::io::walker::find_go_files;
use crate::syntax::ast::{File, IdGen, NodeId};
use crate::syntax::comments::CommentMap;
use crate::syntax::parser::parse_file;
use crate::syntax::{LineIndex, Position, SyntaxError};
use crate::types::check::check_package;
use crate::types::{stdlib, PkgId, TypeInfo, TypeStore};

static MODULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).expect("valid regex"));

static MAJOR_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v[0-9]+$").expect("valid regex"));

/// Locates one file of a loaded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef {
    pub unit: usize,
    pub file: usize,
}

#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    pub ast: File,
    pub comments: CommentMap,
    pub lines: LineIndex,
}

impl SourceFile {
    fn new(path: PathBuf, source: String, ast: File) -> Self {
        let comments = CommentMap::build(&ast, &source);
        let lines = LineIndex::new(&source);
        Self {
            path,
            source,
            ast,
            comments,
            lines,
        }
    }

    pub fn is_test(&self) -> bool {
        crate::io::walker::is_test_file(&self.path)
    }
}

/// One package of the module: the files of a directory sharing a package
/// clause.
#[derive(Debug)]
pub struct Unit {
    pub pkg: PkgId,
    pub import_path: String,
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<SourceFile>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug)]
pub struct Program {
    pub root: PathBuf,
    pub module: String,
    pub units: Vec<Unit>,
    pub store: TypeStore,
    pub info: TypeInfo,
    /// Continues numbering after the last parsed node.
    pub ids: IdGen,
    ranges: Vec<(u32, u32, FileRef)>,
}

impl Program {
    pub fn file(&self, file: FileRef) -> &SourceFile {
        &self.units[file.unit].files[file.file]
    }

    pub fn file_mut(&mut self, file: FileRef) -> &mut SourceFile {
        &mut self.units[file.unit].files[file.file]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileRef, &SourceFile)> {
        self.units.iter().enumerate().flat_map(|(unit, u)| {
            u.files
                .iter()
                .enumerate()
                .map(move |(file, f)| (FileRef { unit, file }, f))
        })
    }

    /// File whose parse produced `id`.
    pub fn file_of(&self, id: NodeId) -> Option<FileRef> {
        let idx = self.ranges.partition_point(|(start, _, _)| *start <= id.0);
        let (start, end, file) = self.ranges.get(idx.checked_sub(1)?)?;
        (*start <= id.0 && id.0 < *end).then_some(*file)
    }

    pub fn position(&self, file: FileRef, offset: usize) -> Position {
        self.file(file).lines.position(offset)
    }

    pub fn unit_of(&self, pkg: PkgId) -> Option<&Unit> {
        self.units.iter().find(|u| u.pkg == pkg)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Loads Go packages from a directory tree, reading file contents from an
/// in-memory overlay first.
pub struct Loader {
    root: PathBuf,
    overlay: HashMap<PathBuf, String>,
}

enum Node {
    Unit(usize),
    Stub(usize),
}

impl Loader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overlay: HashMap::new(),
        }
    }

    pub fn with_overlay(mut self, overlay: HashMap<PathBuf, String>) -> Self {
        self.overlay = overlay;
        self
    }

    fn read(&self, path: &Path) -> Result<String> {
        if let Some(source) = self.overlay.get(path) {
            return Ok(source.clone());
        }
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    pub fn load(&self) -> Result<Program> {
        let (module_dir, module) = find_module(&self.root);
        debug!(module = %module, "loading packages from {}", self.root.display());

        let mut ids = IdGen::default();
        let mut groups: IndexMap<(PathBuf, String), Vec<SourceFile>> = IndexMap::new();
        let mut ranges = Vec::new();
        for path in find_go_files(&self.root)? {
            let source = self.read(&path)?;
            let start = ids.peek();
            let ast = parse_file(&source, &mut ids).map_err(|e| syntax_error(&path, &source, e))?;
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let key = (dir, ast.package.name.clone());
            let files = groups.entry(key.clone()).or_default();
            files.push(SourceFile::new(path, source, ast));
            let file = files.len() - 1;
            let unit = groups.get_index_of(&key).unwrap_or_default();
            ranges.push((start, ids.peek(), FileRef { unit, file }));
        }

        let mut store = TypeStore::new();
        let mut by_path: HashMap<String, PkgId> = HashMap::new();
        let mut units = Vec::new();
        for ((dir, name), files) in groups {
            let mut import_path = import_path_of(&module_dir, &module, &dir);
            if name.ends_with("_test") && files.iter().all(SourceFile::is_test) {
                import_path.push_str("_test");
            }
            let pkg = store.new_package(&import_path, &name);
            by_path.insert(import_path.clone(), pkg);
            units.push(Unit {
                pkg,
                import_path,
                name,
                dir,
                files,
                diagnostics: Vec::new(),
            });
        }

        let mut stubs: Vec<(PkgId, File)> = Vec::new();
        let mut queue: VecDeque<String> = units
            .iter()
            .flat_map(|u| u.files.iter())
            .flat_map(|f| f.ast.imports().map(|i| i.unquoted_path().to_string()))
            .collect();
        while let Some(path) = queue.pop_front() {
            if by_path.contains_key(&path) {
                continue;
            }
            let pkg = match stdlib::source(&path) {
                Some(source) => {
                    let file = parse_file(source, &mut ids)
                        .map_err(|e| Error::Load(format!("bundled package {path}: {e}")))?;
                    let pkg = store.new_package(&path, &file.package.name);
                    store.package_mut(pkg).stub = true;
                    queue.extend(file.imports().map(|i| i.unquoted_path().to_string()));
                    stubs.push((pkg, file));
                    pkg
                }
                None => {
                    if !stdlib::is_standard(&path) && !path.starts_with(&module) {
                        debug!("treating {path} as an opaque import");
                    } else {
                        warn!("no source for import {path}; its members stay unresolved");
                    }
                    let pkg = store.new_package(&path, &package_name_guess(&path));
                    store.package_mut(pkg).opaque = true;
                    pkg
                }
            };
            by_path.insert(path, pkg);
        }

        let order = check_order(&units, &stubs, &by_path)?;
        let mut info = TypeInfo::default();
        let resolve = |path: &str| by_path.get(path).copied();
        for node in order {
            match node {
                Node::Stub(index) => {
                    let (pkg, file) = &stubs[index];
                    let diagnostics = check_package(&mut store, &mut info, *pkg, &[file], &resolve);
                    for diagnostic in diagnostics {
                        debug!("bundled {}: {diagnostic}", store.package(*pkg).path);
                    }
                }
                Node::Unit(index) => {
                    let unit = &mut units[index];
                    let files: Vec<&File> = unit.files.iter().map(|f| &f.ast).collect();
                    unit.diagnostics = check_package(&mut store, &mut info, unit.pkg, &files, &resolve);
                    if !unit.diagnostics.is_empty() {
                        debug!(
                            package = %unit.import_path,
                            count = unit.diagnostics.len(),
                            "type diagnostics"
                        );
                    }
                }
            }
        }

        Ok(Program {
            root: self.root.clone(),
            module,
            units,
            store,
            info,
            ids,
            ranges,
        })
    }
}

/// Dependencies first. Opaque packages have no node.
fn check_order(units: &[Unit], stubs: &[(PkgId, File)], by_path: &HashMap<String, PkgId>) -> Result<Vec<Node>> {
    let mut graph: DiGraph<PkgId, ()> = DiGraph::new();
    let mut index_of: HashMap<PkgId, NodeIndex> = HashMap::new();
    let mut nodes = Vec::new();
    let mut imports: Vec<(NodeIndex, Vec<String>)> = Vec::new();

    for (i, unit) in units.iter().enumerate() {
        let idx = graph.add_node(unit.pkg);
        index_of.insert(unit.pkg, idx);
        nodes.push((idx, Node::Unit(i)));
        let paths = unit
            .files
            .iter()
            .flat_map(|f| f.ast.imports().map(|i| i.unquoted_path().to_string()))
            .collect();
        imports.push((idx, paths));
    }
    for (i, (pkg, file)) in stubs.iter().enumerate() {
        let idx = graph.add_node(*pkg);
        index_of.insert(*pkg, idx);
        nodes.push((idx, Node::Stub(i)));
        imports.push((idx, file.imports().map(|i| i.unquoted_path().to_string()).collect()));
    }
    for (idx, paths) in imports {
        for path in paths {
            if let Some(dep) = by_path.get(&path).and_then(|pkg| index_of.get(pkg)) {
                if *dep != idx {
                    graph.update_edge(*dep, idx, ());
                }
            }
        }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        let pkg = graph[cycle.node_id()];
        let path = units
            .iter()
            .find(|u| u.pkg == pkg)
            .map(|u| u.import_path.clone())
            .unwrap_or_default();
        Error::Load(format!("import cycle through {path}"))
    })?;
    let mut slots: HashMap<NodeIndex, Node> = nodes.into_iter().collect();
    Ok(sorted.into_iter().filter_map(|idx| slots.remove(&idx)).collect())
}

pub(crate) fn syntax_error(path: &Path, source: &str, err: SyntaxError) -> Error {
    let pos = LineIndex::new(source).position(err.span.start.min(source.len()));
    Error::parse(path, pos.line, pos.column, err.message)
}

/// Module directory and path from the nearest `go.mod`; without one the
/// root directory's name stands in for the module path.
fn find_module(root: &Path) -> (PathBuf, String) {
    for dir in root.ancestors() {
        let Ok(text) = fs::read_to_string(dir.join("go.mod")) else {
            continue;
        };
        if let Some(caps) = MODULE_LINE.captures(&text) {
            return (dir.to_path_buf(), caps[1].to_string());
        }
    }
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    warn!("no go.mod above {}; using module path {name}", root.display());
    (root.to_path_buf(), name)
}

fn import_path_of(module_dir: &Path, module: &str, dir: &Path) -> String {
    match dir.strip_prefix(module_dir) {
        Ok(rel) if rel.as_os_str().is_empty() => module.to_string(),
        Ok(rel) => {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            format!("{module}/{rel}")
        }
        Err(_) => dir.to_string_lossy().into_owned(),
    }
}

/// Last path element, skipping a major-version suffix, a `go-` prefix and
/// a `.vN` gopkg.in suffix.
fn package_name_guess(path: &str) -> String {
    let mut parts = path.rsplit('/');
    let mut last = parts.next().unwrap_or(path);
    if MAJOR_VERSION.is_match(last) {
        last = parts.next().unwrap_or(last);
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.split('.').next().unwrap_or(last);
    last.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::format::describe;
    use indoc::indoc;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn loads_module_packages_in_dependency_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", "module example.com/app\n\ngo 1.22\n");
        write(
            dir.path(),
            "main.go",
            indoc! {r#"
                package main

                import "example.com/app/store"

                func main() {
                    store.Save("x")
                }
            "#},
        );
        write(
            dir.path(),
            "store/store.go",
            indoc! {r#"
                package store

                import "os"

                func Save(name string) error {
                    _, err := os.Create(name)
                    return err
                }
            "#},
        );

        let program = Loader::new(dir.path()).load().unwrap();
        assert_eq!(program.module, "example.com/app");
        let paths: Vec<&str> = program.units.iter().map(|u| u.import_path.as_str()).collect();
        assert_eq!(paths, vec!["example.com/app", "example.com/app/store"]);
        assert!(program.units.iter().all(|u| u.diagnostics.is_empty()), "{:?}", program.units[0].diagnostics);

        let store_pkg = program.units[1].pkg;
        let save = program.store.package(store_pkg).members["Save"];
        assert_eq!(describe(&program.store, &program.store.obj(save).ty), "func(string) error");

        let main_file = &program.file(FileRef { unit: 0, file: 0 }).ast;
        assert_eq!(program.file_of(main_file.decls[0].id), Some(FileRef { unit: 0, file: 0 }));
    }

    #[test]
    fn overlay_contents_win_over_disk() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", "module m\n");
        write(dir.path(), "a.go", "package a\n");
        let mut overlay = HashMap::new();
        overlay.insert(dir.path().join("a.go"), "package a\n\nfunc F() {}\n".to_string());
        let program = Loader::new(dir.path()).with_overlay(overlay).load().unwrap();
        assert!(program.store.package(program.units[0].pkg).members.contains_key("F"));
    }

    #[test]
    fn parse_errors_are_fatal_with_position() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", "module m\n");
        write(dir.path(), "bad.go", "package a\n\nfunc {\n");
        let err = Loader::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn unknown_imports_become_opaque_packages() {
        assert_eq!(package_name_guess("github.com/pkg/errors"), "errors");
        assert_eq!(package_name_guess("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(package_name_guess("github.com/x/go-redis/v9"), "redis");
    }
}
