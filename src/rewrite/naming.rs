//! Collision-free names for captured errors and lifted values.
//!
//! A [`Scope`] is the set of local bindings visible at one statement,
//! rebuilt from the analysis tree; the [`Namer`] remembers what this pass
//! already introduced in each top-level declaration, since those names
//! only exist in the destination tree.

use std::collections::{HashMap, HashSet};

use crate::loader::{FileRef, Program};
use crate::syntax::ast::*;
use crate::syntax::node::{path_to, walk, Edge, NodeRef};

pub const ERR: &str = "err";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Param,
    Result,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub origin: Origin,
    pub is_error: bool,
    /// Declared in the block that holds the statement.
    pub current_block: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Vec<Binding>,
    taken: HashSet<String>,
    /// Names declared later in the same block.
    later: HashSet<String>,
    /// Names spelled anywhere after the statement in the same block.
    later_refs: HashSet<String>,
    owner: Option<NodeId>,
}

struct Builder<'p> {
    program: &'p Program,
    depth: usize,
    found: Vec<(Binding, usize)>,
}

impl Builder<'_> {
    fn bind(&mut self, ident: &Ident, origin: Origin, declared_error: bool) {
        if ident.is_blank() {
            return;
        }
        let is_error = declared_error
            || self
                .program
                .info
                .defs
                .get(&ident.id)
                .is_some_and(|&obj| self.program.store.is_error(&self.program.store.obj(obj).ty));
        self.found.push((
            Binding {
                name: ident.name.clone(),
                origin,
                is_error,
                current_block: false,
            },
            self.depth,
        ));
    }

    fn signature(&mut self, recv: Option<&FieldList>, ty: &FuncType) {
        for list in recv.into_iter().chain(Some(&ty.params)) {
            self.fields(list, Origin::Param);
        }
        if let Some(results) = &ty.results {
            self.fields(results, Origin::Result);
        }
    }

    fn fields(&mut self, list: &FieldList, origin: Origin) {
        for field in &list.fields {
            let declared_error = field.ty.as_ident().is_some_and(|i| i.name == "error");
            for name in &field.names {
                self.bind(name, origin, declared_error);
            }
        }
    }

    /// Names a statement adds to the rest of its block.
    fn declared(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign {
                lhs,
                op: AssignOp::Define,
                ..
            } => {
                for ident in lhs.iter().filter_map(Expr::as_ident) {
                    if self.program.info.defs.contains_key(&ident.id) {
                        self.bind(ident, Origin::Local, false);
                    }
                }
            }
            StmtKind::Decl(gen) => {
                for spec in &gen.specs {
                    match &spec.kind {
                        SpecKind::Value(value) => {
                            for name in &value.names {
                                self.bind(name, Origin::Local, false);
                            }
                        }
                        SpecKind::Type(ty) => self.bind(&ty.name, Origin::Local, false),
                        SpecKind::Import(_) => {}
                    }
                }
            }
            StmtKind::Labeled { stmt, .. } => self.declared(stmt),
            _ => {}
        }
    }

    /// Statements of a list before `index` declare into the current depth.
    fn list(&mut self, stmts: &[Stmt], index: usize) {
        for stmt in &stmts[..index.min(stmts.len())] {
            self.declared(stmt);
        }
    }
}

impl Scope {
    /// Bindings visible at the statement or package-level spec `anchor`.
    pub fn at(program: &Program, file: FileRef, anchor: NodeId) -> Option<Scope> {
        let source = program.file(file);
        let path = path_to(NodeRef::File(&source.ast), anchor)?;
        let mut builder = Builder {
            program,
            depth: 0,
            found: Vec::new(),
        };
        let mut anchor_depth = 0;
        let mut later_stmts: &[Stmt] = &[];
        let last = path.len() - 1;

        for i in 1..path.len() {
            let node = path[i].1;
            let next = path.get(i + 1).and_then(|(edge, _)| *edge);
            match node {
                NodeRef::Decl(Decl {
                    kind: DeclKind::Func(func),
                    ..
                }) => {
                    builder.depth += 1;
                    builder.signature(func.recv.as_ref(), &func.ty);
                }
                NodeRef::Expr(Expr {
                    kind: ExprKind::FuncLit(lit),
                    ..
                }) => {
                    builder.depth += 1;
                    builder.signature(None, &lit.ty);
                }
                NodeRef::Block(block) => {
                    let function_body = matches!(
                        path[i - 1].1,
                        NodeRef::Decl(_)
                            | NodeRef::Expr(Expr {
                                kind: ExprKind::FuncLit(_),
                                ..
                            })
                    );
                    if !function_body {
                        builder.depth += 1;
                    }
                    if let Some(Edge {
                        field: "list",
                        index: Some(index),
                    }) = next
                    {
                        builder.list(&block.stmts, index);
                        if i + 1 == last {
                            anchor_depth = builder.depth;
                            later_stmts = &block.stmts[index + 1..];
                        }
                    }
                }
                NodeRef::Stmt(stmt) if i < last => {
                    let into_init = next.is_some_and(|e| e.field == "init");
                    match &stmt.kind {
                        StmtKind::If(IfStmt { init, .. })
                        | StmtKind::Switch(SwitchStmt { init, .. })
                        | StmtKind::For(ForStmt { init, .. }) => {
                            if let (Some(init), false) = (init, into_init) {
                                builder.depth += 1;
                                builder.declared(init);
                            }
                        }
                        StmtKind::TypeSwitch(TypeSwitchStmt { init, assign, .. }) => {
                            if !into_init {
                                builder.depth += 1;
                                if let Some(init) = init {
                                    builder.declared(init);
                                }
                                if next.is_some_and(|e| e.field == "body") {
                                    builder.declared(assign);
                                }
                            }
                        }
                        StmtKind::Range(range) if range.define && next.is_some_and(|e| e.field == "body") => {
                            builder.depth += 1;
                            for ident in [&range.key, &range.value].into_iter().flatten().filter_map(|e| e.as_ident()) {
                                builder.bind(ident, Origin::Local, false);
                            }
                        }
                        StmtKind::Case(CaseClause { body, .. }) | StmtKind::Comm(CommClause { body, .. }) => {
                            builder.depth += 1;
                            if let StmtKind::Comm(CommClause { comm: Some(comm), .. }) = &stmt.kind {
                                builder.declared(comm);
                            }
                            if let Some(Edge {
                                field: "body",
                                index: Some(index),
                            }) = next
                            {
                                builder.list(body, index);
                                if i + 1 == last {
                                    anchor_depth = builder.depth;
                                    later_stmts = &body[index + 1..];
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let bindings = builder
            .found
            .into_iter()
            .map(|(mut binding, depth)| {
                binding.current_block = depth == anchor_depth;
                binding
            })
            .collect();

        let mut later = Builder {
            program,
            depth: 0,
            found: Vec::new(),
        };
        let mut later_refs = HashSet::new();
        for stmt in later_stmts {
            later.declared(stmt);
            walk(NodeRef::Stmt(stmt), &mut |node, _| {
                if let NodeRef::Ident(ident) = node {
                    later_refs.insert(ident.name.clone());
                }
                true
            });
        }

        let mut taken = HashSet::new();
        if let Some((_, top)) = path.get(1) {
            walk(*top, &mut |node, _| {
                if let NodeRef::Ident(ident) = node {
                    taken.insert(ident.name.clone());
                }
                true
            });
        }
        let pkg = program.units[file.unit].pkg;
        taken.extend(program.store.package(pkg).members.keys().cloned());
        for import in source.ast.imports() {
            match &import.name {
                Some(alias) => taken.insert(alias.name.clone()),
                None => taken.insert(import.unquoted_path().rsplit('/').next().unwrap_or_default().to_string()),
            };
        }

        Some(Scope {
            bindings,
            taken,
            later: later.found.into_iter().map(|(b, _)| b.name).collect(),
            later_refs,
            owner: path.get(1).map(|(_, node)| node.id()),
        })
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.name == name)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn is_free(&self, name: &str) -> bool {
        !self.taken.contains(name) && !self.is_visible(name) && !self.later.contains(name)
    }
}

#[derive(Debug, Default)]
pub struct Namer {
    reserved: HashMap<Option<NodeId>, HashSet<String>>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_reserved(&self, scope: &Scope, name: &str) -> bool {
        self.reserved.get(&scope.owner).is_some_and(|names| names.contains(name))
    }

    fn reserve(&mut self, scope: &Scope, name: &str) {
        self.reserved.entry(scope.owner).or_default().insert(name.to_string());
    }

    /// Name for the error captured by a binding at `scope`. `needs_new`
    /// is set when the statement must declare a fresh variable (`var`
    /// declarations and the `var e error` prelude of `=` bindings).
    pub fn error_name(&mut self, scope: &Scope, needs_new: bool, callee: &Expr) -> String {
        let name = match scope.lookup(ERR) {
            None if scope.later.contains(ERR) => self.derived_or_suffixed(scope, callee),
            None if needs_new && self.is_reserved(scope, ERR) => self.suffixed(scope),
            None => ERR.to_string(),
            Some(binding) if binding.origin != Origin::Local => self.derived_or_suffixed(scope, callee),
            Some(binding) if binding.is_error => {
                let clashes = needs_new && (binding.current_block || self.is_reserved(scope, ERR));
                // A new `err` in this block would capture the reads that follow.
                let shadows = !binding.current_block && scope.later_refs.contains(ERR);
                if clashes || shadows {
                    self.suffixed(scope)
                } else {
                    ERR.to_string()
                }
            }
            Some(_) => self.suffixed(scope),
        };
        self.reserve(scope, &name);
        name
    }

    /// A visible local `err` of type `error` that a `=` binding can assign.
    pub fn assignable_error(&self, scope: &Scope) -> Option<String> {
        scope
            .lookup(ERR)
            .filter(|b| b.origin == Origin::Local && b.is_error)
            .map(|b| b.name.clone())
    }

    /// `base`, or `base2`, `base3`, ... whichever is unused.
    pub fn fresh(&mut self, scope: &Scope, base: &str) -> String {
        let name = std::iter::once(base.to_string())
            .chain((2..).map(|n| format!("{base}{n}")))
            .find(|candidate| scope.is_free(candidate) && !self.is_reserved(scope, candidate))
            .unwrap_or_else(|| base.to_string());
        self.reserve(scope, &name);
        name
    }

    fn derived_or_suffixed(&mut self, scope: &Scope, callee: &Expr) -> String {
        match callee_base(callee) {
            Some(base) => {
                let derived = format!("{base}Err");
                if scope.is_free(&derived) && !self.is_reserved(scope, &derived) {
                    derived
                } else {
                    self.suffixed(scope)
                }
            }
            None => self.suffixed(scope),
        }
    }

    fn suffixed(&self, scope: &Scope) -> String {
        (2..)
            .map(|n| format!("{ERR}{n}"))
            .find(|candidate| scope.is_free(candidate) && !self.is_reserved(scope, candidate))
            .unwrap_or_else(|| ERR.to_string())
    }
}

/// Lower-camel last identifier of a callee: `f.Close` gives `close`.
pub fn callee_base(fun: &Expr) -> Option<String> {
    let name = match &fun.unparen().kind {
        ExprKind::Ident(ident) => ident.name.clone(),
        ExprKind::Selector { sel, .. } => sel.name.clone(),
        ExprKind::Index { x, .. } => return callee_base(x),
        _ => return None,
    };
    let mut chars = name.chars();
    let first = chars.next()?;
    let base: String = first.to_lowercase().chain(chars).collect();
    (!base.is_empty() && base != "_").then_some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Detector, Filter};
    use crate::testkit::{find_call, load_single};
    use crate::syntax::parser::parse_expr;
    use indoc::indoc;

    fn scope_of(program: &Program, callee: &str) -> Scope {
        let (file, call) = find_call(program, callee);
        let filter = Filter::default();
        let detector = Detector::new(program, &filter, false);
        let anchor = match detector.site(file, call) {
            Some(crate::analysis::Site::Discarded(point)) => point.stmt,
            other => panic!("{callee} is not discarded: {other:?}"),
        };
        Scope::at(program, file, anchor).expect("scope")
    }

    fn fun(text: &str) -> Expr {
        parse_expr(text, &mut IdGen::default()).unwrap()
    }

    #[test]
    fn plain_err_when_nothing_collides() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            import "os"

            func run(path string) {
                os.Remove(path)
            }
        "#});
        let scope = scope_of(&program, "os.Remove");
        let mut namer = Namer::new();
        assert_eq!(namer.error_name(&scope, false, &fun("os.Remove")), "err");
        assert!(scope.lookup("path").is_some_and(|b| b.origin == Origin::Param && b.current_block));
    }

    #[test]
    fn parameters_named_err_get_a_derived_name() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            type file struct{}

            func (f *file) Close() error { return nil }

            func finish(f *file, err error) error {
                f.Close()
                return err
            }
        "#});
        let scope = scope_of(&program, "f.Close");
        let mut namer = Namer::new();
        assert_eq!(namer.error_name(&scope, false, &fun("f.Close")), "closeErr");
    }

    #[test]
    fn locals_are_reused_unless_a_new_variable_is_needed_in_the_same_block() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func load() (int, error) { return 0, nil }
            func save() error { return nil }

            func run() {
                n, err := load()
                _ = n
                _ = err
                var size, _ = load()
                _ = size
                if true {
                    save()
                }
            }
        "#});
        let (file, _) = find_call(&program, "save");
        let filter = Filter::default();
        let detector = Detector::new(&program, &filter, false);
        let points = detector.detect();

        let spec_point = points.iter().find(|p| matches!(p.kind, crate::analysis::DiscardKind::Assign { .. })).unwrap();
        let outer = Scope::at(&program, file, spec_point.stmt).unwrap();
        let binding = outer.lookup("err").unwrap();
        assert!(binding.is_error && binding.current_block);
        let mut namer = Namer::new();
        assert_eq!(namer.error_name(&outer, true, &fun("load")), "err2");
        assert_eq!(namer.assignable_error(&outer).as_deref(), Some("err"));

        let inner = scope_of(&program, "save");
        assert!(!inner.lookup("err").unwrap().current_block);
        assert_eq!(namer.error_name(&inner, false, &fun("save")), "err");
    }

    #[test]
    fn err_declared_later_in_the_block_is_avoided() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func save() error { return nil }
            func check() error { return nil }

            func run() {
                save()
                err := check()
                _ = err
            }
        "#});
        let scope = scope_of(&program, "save");
        let mut namer = Namer::new();
        assert_eq!(namer.error_name(&scope, false, &fun("save")), "saveErr");
    }

    #[test]
    fn fresh_names_skip_taken_and_reserved() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func pair() (int, error) { return 0, nil }

            func run(res int) int {
                return pair() + res
            }
        "#});
        let scope = scope_of(&program, "pair");
        let mut namer = Namer::new();
        assert_eq!(namer.fresh(&scope, "res"), "res2");
        assert_eq!(namer.fresh(&scope, "res"), "res3");
    }

    #[test]
    fn callee_bases() {
        assert_eq!(callee_base(&fun("f.Close")).as_deref(), Some("close"));
        assert_eq!(callee_base(&fun("(os.Remove)")).as_deref(), Some("remove"));
        assert_eq!(callee_base(&fun("Parse[int]")).as_deref(), Some("parse"));
        assert_eq!(callee_base(&fun("fns[0]")).as_deref(), Some("fns"));
        assert_eq!(callee_base(&fun("func() error { return nil }")), None);
    }
}
