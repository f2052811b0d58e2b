//! Phase one: choosing a handler for every discarded error.
//!
//! A discarded error is returned when its function can return one. At the
//! aggressive level a function that cannot, but is only ever called
//! directly, gains an `error` result: the analysis tree, the destination
//! tree and the object arena all change together, and every call site of
//! the function is classified again, which can cascade up to an entry
//! point. Everything else falls back to terminating or logging.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::dest::DestCache;
use super::mapper::correspond;
use crate::analysis::{
    enclosing_function, Detector, DiscardKind, Filter, FuncContext, FuncKey, InjectionPoint, InterfaceRegistry,
    Site,
};
use crate::config::Level;
use crate::core::errors::{Error, Result};
use crate::loader::{FileRef, Program};
use crate::syntax::ast::*;
use crate::syntax::node::{find_mut, path_to, walk, Edge, NodeMut, NodeRef};
use crate::syntax::Span;
use crate::types::{Level as ObjLevel, ObjId, ObjKind, Object, Param, Type, TypeStore};

/// What the failure path does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Return the error from the enclosing function.
    Return,
    /// Stop the program.
    Terminal,
    /// Log and carry on.
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    AlreadyFailing,
    Mutated,
    Terminal,
    Fallback,
}

impl Decision {
    fn handler(self) -> Handler {
        match self {
            Decision::AlreadyFailing | Decision::Mutated => Handler::Return,
            Decision::Terminal => Handler::Terminal,
            Decision::Fallback => Handler::Log,
        }
    }

    fn returns(self) -> bool {
        matches!(self, Decision::AlreadyFailing | Decision::Mutated)
    }
}

#[derive(Debug, Clone)]
pub struct Planned {
    pub point: InjectionPoint,
    pub handler: Handler,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub points: Vec<Planned>,
    /// Functions (declaration or literal node) whose panics become error
    /// returns.
    pub panics: Vec<(FileRef, NodeId)>,
    /// Names of functions that gained an `error` result.
    pub mutated: Vec<String>,
    pub skipped: usize,
}

pub struct Propagator<'a> {
    filter: &'a Filter,
    level: Level,
    verbose: bool,
    registry: InterfaceRegistry,
    decisions: HashMap<FuncKey, Decision>,
    named: HashSet<FuncKey>,
}

impl<'a> Propagator<'a> {
    pub fn new(program: &Program, filter: &'a Filter, level: Level, verbose: bool) -> Self {
        let registry = InterfaceRegistry::build(program);
        debug!(interfaces = registry.len(), "collected named interfaces");
        Self {
            filter,
            level,
            verbose,
            registry,
            decisions: HashMap::new(),
            named: HashSet::new(),
        }
    }

    /// Plans every point, following mutations to the call sites they
    /// create.
    pub fn run(&mut self, program: &mut Program, dests: &mut DestCache, points: Vec<InjectionPoint>) -> Result<Plan> {
        let mut plan = Plan::default();
        let mut queue: VecDeque<InjectionPoint> = points.into();
        let mut seen = HashSet::new();

        while let Some(point) = queue.pop_front() {
            if !seen.insert(point.call) {
                continue;
            }
            let path = program.file(point.file).path.clone();
            if !point.rewritable {
                warn!(
                    "{}:{}: leaving {} alone; moving the call would change evaluation order",
                    path.display(),
                    point.position,
                    point.kind.label()
                );
                plan.skipped += 1;
                continue;
            }
            let handler = match point.kind {
                DiscardKind::Global { .. } | DiscardKind::Background => Handler::Terminal,
                _ => {
                    let Some(ctx) = enclosing_function(program, point.file, point.call) else {
                        warn!("{}:{}: no enclosing function found", path.display(), point.position);
                        plan.skipped += 1;
                        continue;
                    };
                    let decision = self.decide(program, dests, point.file, &ctx, &mut queue, &mut plan)?;
                    if point.kind == DiscardKind::Deferred && decision.returns() && self.named.insert(ctx.key()) {
                        name_results(program, dests, point.file, &ctx)?;
                    }
                    decision.handler()
                }
            };
            plan.points.push(Planned { point, handler });
        }
        Ok(plan)
    }

    fn decide(
        &mut self,
        program: &mut Program,
        dests: &mut DestCache,
        file: FileRef,
        ctx: &FuncContext,
        queue: &mut VecDeque<InjectionPoint>,
        plan: &mut Plan,
    ) -> Result<Decision> {
        let key = ctx.key();
        if let Some(decision) = self.decisions.get(&key) {
            return Ok(*decision);
        }
        let decision = self.evaluate(program, file, ctx);
        self.decisions.insert(key, decision);
        debug!(function = %ctx.name, ?decision, "propagation decision");

        if decision == Decision::Mutated {
            add_error_result(program, dests, file, ctx)?;
            if self.verbose {
                info!("{}: now returns error", ctx.name);
            }
            plan.mutated.push(ctx.name.clone());
            let detector = Detector::new(program, self.filter, self.verbose);
            for (use_file, call) in call_sites(program, file, ctx) {
                if let Some(Site::Discarded(point)) = detector.site(use_file, call) {
                    queue.push_back(point);
                }
            }
        }
        if self.level == Level::Aggressive && decision.returns() {
            plan.panics.push((file, ctx.node));
        }
        Ok(decision)
    }

    fn evaluate(&self, program: &Program, file: FileRef, ctx: &FuncContext) -> Decision {
        let store = &program.store;
        if ctx.returns_error(store) {
            return Decision::AlreadyFailing;
        }
        if let (Some(_), Some(obj)) = (ctx.decl, ctx.object) {
            let conflicts = self.registry.check_compliance(store, obj);
            if let Some(conflict) = conflicts.first() {
                info!(
                    "{}: keeping the signature, {} must stay a method of {}",
                    ctx.name, conflict.method, conflict.interface
                );
                return Decision::Fallback;
            }
        }
        if is_entry_point(program, file, ctx) || is_test_handler(program, file, ctx) {
            return Decision::Terminal;
        }
        if self.level == Level::Safe {
            return Decision::Fallback;
        }
        if ctx.is_literal() {
            return self.literal(program, file, ctx);
        }
        if self.safe_to_change(program, file, ctx) {
            Decision::Mutated
        } else {
            Decision::Fallback
        }
    }

    fn literal(&self, program: &Program, file: FileRef, ctx: &FuncContext) -> Decision {
        let ast = &program.file(file).ast;
        let Some(path) = path_to(NodeRef::File(ast), ctx.node) else {
            return Decision::Fallback;
        };
        if forwards_tuples(path.last().map(|(_, node)| *node), ctx.result_count()) {
            return Decision::Fallback;
        }

        if let Some(call) = invocation(&path) {
            let index = path.iter().position(|(_, node)| node.id() == call).unwrap_or_default();
            return match index.checked_sub(1).map(|i| path[i].1) {
                Some(NodeRef::Stmt(Stmt {
                    kind: StmtKind::Go(_), ..
                })) => Decision::Terminal,
                Some(NodeRef::Stmt(Stmt {
                    kind: StmtKind::Defer(_),
                    ..
                })) => Decision::Fallback,
                _ if self.accepts_error(program, file, call) => Decision::Mutated,
                _ => Decision::Fallback,
            };
        }

        let defined = path.len() >= 2
            && matches!(
                path[path.len() - 2].1,
                NodeRef::Stmt(Stmt {
                    kind: StmtKind::Assign {
                        op: AssignOp::Define,
                        ..
                    },
                    ..
                })
            );
        match ctx.object {
            Some(var) if defined && matches!(program.store.obj(var).ty, Type::Func(_)) => {
                if self.uses_accept_error(program, var) {
                    Decision::Mutated
                } else {
                    Decision::Fallback
                }
            }
            _ => Decision::Fallback,
        }
    }

    fn safe_to_change(&self, program: &Program, file: FileRef, ctx: &FuncContext) -> bool {
        let Some(obj) = ctx.object else {
            return false;
        };
        let ast = &program.file(file).ast;
        let Some(path) = path_to(NodeRef::File(ast), ctx.node) else {
            return false;
        };
        let Some(NodeRef::Decl(decl)) = path.last().map(|(_, node)| *node) else {
            return false;
        };
        let DeclKind::Func(func) = &decl.kind else {
            return false;
        };
        if func.body.is_none() {
            return false;
        }
        if forwards_tuples(Some(NodeRef::Decl(decl)), ctx.result_count()) {
            debug!(function = %ctx.name, "returns a call's results directly");
            return false;
        }
        if self.filter.excludes_file(&program.file(file).path) {
            return false;
        }
        self.uses_accept_error(program, obj)
    }

    /// Every reference to `obj` is a direct call whose site can take one
    /// more result.
    fn uses_accept_error(&self, program: &Program, obj: ObjId) -> bool {
        for use_id in program.info.uses_of(obj) {
            let Some(use_file) = program.file_of(use_id) else {
                return false;
            };
            if self.filter.excludes_file(&program.file(use_file).path) {
                return false;
            }
            let Some(call) = direct_call(program, use_file, use_id) else {
                debug!(function = %program.store.obj(obj).name, "used as a value");
                return false;
            };
            if !self.accepts_error(program, use_file, call) {
                return false;
            }
        }
        true
    }

    fn accepts_error(&self, program: &Program, file: FileRef, call: NodeId) -> bool {
        let detector = Detector::new(program, self.filter, false);
        match detector.site_with(file, call, 1) {
            Some(Site::Discarded(point)) => point.rewritable,
            Some(Site::Checked) => true,
            Some(Site::Suppressed(_)) | None => false,
        }
    }
}

fn func_decl(program: &Program, file: FileRef, decl: NodeId) -> Option<&FuncDecl> {
    program
        .file(file)
        .ast
        .func_decls()
        .find(|(d, _)| d.id == decl)
        .map(|(_, func)| func)
}

/// `main` of package `main`, or any `init`.
fn is_entry_point(program: &Program, file: FileRef, ctx: &FuncContext) -> bool {
    let Some(func) = ctx.decl.and_then(|decl| func_decl(program, file, decl)) else {
        return false;
    };
    if func.recv.is_some() {
        return false;
    }
    match func.name.name.as_str() {
        "init" => true,
        "main" => program.units[file.unit].name == "main",
        _ => false,
    }
}

/// `TestX(t *testing.T)`, `BenchmarkX(b *testing.B)`, `FuzzX(f *testing.F)`
/// and `TestMain(m *testing.M)`.
pub(crate) fn is_test_handler(program: &Program, file: FileRef, ctx: &FuncContext) -> bool {
    let Some(func) = ctx.decl.and_then(|decl| func_decl(program, file, decl)) else {
        return false;
    };
    let Some(sig) = &ctx.signature else {
        return false;
    };
    if func.recv.is_some() || !sig.results.is_empty() || !program.file(file).is_test() {
        return false;
    }
    let name = func.name.name.as_str();
    match testing_param(&program.store, sig) {
        Some("M") => name == "TestMain",
        Some("T") => name.starts_with("Test"),
        Some("B") => name.starts_with("Benchmark"),
        Some("F") => name.starts_with("Fuzz"),
        _ => false,
    }
}

/// Type name of a lone `*testing.X` parameter.
pub(crate) fn testing_param<'s>(store: &'s TypeStore, sig: &crate::types::Signature) -> Option<&'s str> {
    let [param] = sig.params.as_slice() else {
        return None;
    };
    let Type::Pointer(inner) = &param.ty else {
        return None;
    };
    let Type::Named(named, _) = inner.as_ref() else {
        return None;
    };
    let obj = store.obj(store.named(*named).obj);
    let pkg = obj.pkg?;
    (store.package(pkg).path == "testing").then_some(obj.name.as_str())
}

/// A function with several results that returns some call's results in
/// one expression cannot take an extra `nil`.
fn forwards_tuples(node: Option<NodeRef<'_>>, results: usize) -> bool {
    if results < 2 {
        return false;
    }
    let body = match node {
        Some(NodeRef::Decl(Decl {
            kind: DeclKind::Func(FuncDecl { body: Some(body), .. }),
            ..
        })) => body,
        Some(NodeRef::Expr(Expr {
            kind: ExprKind::FuncLit(lit),
            ..
        })) => &lit.body,
        _ => return false,
    };
    let mut found = false;
    walk(NodeRef::Block(body), &mut |node, _| match node {
        NodeRef::Expr(Expr {
            kind: ExprKind::FuncLit(_),
            ..
        }) => false,
        NodeRef::Stmt(Stmt {
            kind: StmtKind::Return(values),
            ..
        }) => {
            found |= values.len() == 1;
            true
        }
        _ => true,
    });
    found
}

/// The call that immediately invokes the literal at the end of `path`.
fn invocation(path: &[(Option<Edge>, NodeRef<'_>)]) -> Option<NodeId> {
    let mut index = path.len().checked_sub(1)?;
    while index > 0 {
        match (path[index].0, path[index - 1].1) {
            (
                _,
                NodeRef::Expr(Expr {
                    kind: ExprKind::Paren(_),
                    ..
                }),
            ) => index -= 1,
            (Some(edge), NodeRef::Expr(call)) if call.is_call() && edge.field == "fun" => return Some(call.id),
            _ => return None,
        }
    }
    None
}

/// The call whose callee is the identifier `use_id`, looking through
/// selectors, parentheses and instantiation.
fn direct_call(program: &Program, file: FileRef, use_id: NodeId) -> Option<NodeId> {
    let path = path_to(NodeRef::File(&program.file(file).ast), use_id)?;
    let mut index = path.len().checked_sub(1)?;
    let edge = path[index].0?;
    match path.get(index.checked_sub(1)?)?.1 {
        NodeRef::Expr(Expr {
            kind: ExprKind::Ident(_),
            ..
        }) if edge.field == "ident" => index -= 1,
        NodeRef::Expr(Expr {
            kind: ExprKind::Selector { .. },
            ..
        }) if edge.field == "sel" => index -= 1,
        _ => return None,
    }
    while index > 0 {
        let edge = path[index].0?;
        match path[index - 1].1 {
            NodeRef::Expr(Expr {
                kind: ExprKind::Paren(_),
                ..
            }) => index -= 1,
            NodeRef::Expr(Expr {
                kind: ExprKind::Index { .. },
                ..
            }) if edge.field == "x" => index -= 1,
            NodeRef::Expr(call) if call.is_call() && edge.field == "fun" => return Some(call.id),
            _ => return None,
        }
    }
    None
}

/// Calls of a function that just changed shape.
fn call_sites(program: &Program, file: FileRef, ctx: &FuncContext) -> Vec<(FileRef, NodeId)> {
    if ctx.is_literal() {
        let invoked = path_to(NodeRef::File(&program.file(file).ast), ctx.node)
            .and_then(|path| invocation(&path));
        if let Some(call) = invoked {
            return vec![(file, call)];
        }
    }
    let Some(obj) = ctx.object else {
        return Vec::new();
    };
    program
        .info
        .uses_of(obj)
        .into_iter()
        .filter_map(|use_id| {
            let use_file = program.file_of(use_id)?;
            Some((use_file, direct_call(program, use_file, use_id)?))
        })
        .collect()
}

fn ident(name: &str, ids: &mut IdGen) -> Ident {
    Ident {
        id: ids.next_id(),
        name: name.to_string(),
        span: Span::default(),
    }
}

fn ident_expr(name: &str, ids: &mut IdGen) -> Expr {
    Expr {
        id: ids.next_id(),
        kind: ExprKind::Ident(ident(name, ids)),
        span: Span::default(),
    }
}

/// Every identifier spelled inside the function node `func`.
fn names_in(program: &Program, file: FileRef, func: NodeId) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Some(path) = path_to(NodeRef::File(&program.file(file).ast), func) {
        if let Some((_, node)) = path.last() {
            walk(*node, &mut |node, _| {
                if let NodeRef::Ident(ident) = node {
                    names.insert(ident.name.clone());
                }
                true
            });
        }
    }
    names
}

fn fresh_in(names: &HashSet<String>, base: &str) -> String {
    std::iter::once(base.to_string())
        .chain((2..).map(|n| format!("{base}{n}")))
        .find(|candidate| !names.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn function_parts<'t>(root: NodeMut<'t>, node: NodeId) -> Option<(&'t mut FuncType, Option<&'t mut Block>)> {
    match find_mut(root, node)? {
        NodeMut::Decl(Decl {
            kind: DeclKind::Func(func),
            ..
        }) => Some((&mut func.ty, func.body.as_mut())),
        NodeMut::Expr(Expr {
            kind: ExprKind::FuncLit(lit),
            ..
        }) => {
            let lit = lit.as_mut();
            Some((&mut lit.ty, Some(&mut lit.body)))
        }
        _ => None,
    }
}

/// Applies `edit` to the function `ctx` in both trees. The destination
/// node is located before the analysis tree changes.
fn edit_both<F>(program: &mut Program, dests: &mut DestCache, file: FileRef, ctx: &FuncContext, mut edit: F) -> Result<()>
where
    F: FnMut(&mut FuncType, Option<&mut Block>, &mut IdGen),
{
    let dest = dests.get(program, file)?;
    let target = correspond(&program.file(file).ast, &dest.ast, ctx.node).map_err(|e| e.in_file(&dest.path))?;

    {
        let Program { units, ids, .. } = &mut *program;
        let ast = &mut units[file.unit].files[file.file].ast;
        let (ty, body) = function_parts(NodeMut::File(ast), ctx.node)
            .ok_or_else(|| Error::Generation(format!("{} vanished from the analysis tree", ctx.name)))?;
        edit(ty, body, ids);
    }

    let (ty, body) = function_parts(NodeMut::File(&mut dest.ast), target.node)
        .ok_or_else(|| Error::Generation(format!("{} vanished from the destination tree", ctx.name)))?;
    edit(ty, body, &mut dest.ids);
    dest.mark_dirty(target.node);
    Ok(())
}

/// Gives the function `ctx` a trailing `error` result.
fn add_error_result(program: &mut Program, dests: &mut DestCache, file: FileRef, ctx: &FuncContext) -> Result<()> {
    let named = ctx.signature.as_ref().is_some_and(|sig| sig.results_named());
    let name = named.then(|| fresh_in(&names_in(program, file, ctx.node), "err"));

    edit_both(program, dests, file, ctx, |ty, body, ids| {
        append_error_field(ty, name.as_deref(), ids);
        if let Some(body) = body {
            append_nil(&mut body.stmts, named, ids);
            if !terminates_list(&body.stmts) {
                let values = if named { Vec::new() } else { vec![ident_expr("nil", ids)] };
                body.stmts.push(Stmt::new(ids.next_id(), StmtKind::Return(values)));
            }
        }
    })?;

    let error = program.store.error_type();
    let param = Param {
        name: name.unwrap_or_default(),
        ty: error,
    };
    patch_signature(program, ctx, |sig| sig.results.push(param.clone()));
    Ok(())
}

fn patch_signature<F>(program: &mut Program, ctx: &FuncContext, mut patch: F)
where
    F: FnMut(&mut crate::types::Signature),
{
    match (ctx.lit, ctx.object) {
        (None, Some(obj)) => {
            if let Some(sig) = program.store.signature_mut(obj) {
                patch(sig);
            }
        }
        (Some(lit), var) => {
            if let Some(Type::Func(sig)) = program.info.types.get_mut(&lit) {
                patch(sig);
            }
            if let Some(var) = var {
                if let Type::Func(sig) = &mut program.store.obj_mut(var).ty {
                    patch(sig);
                }
            }
        }
        (None, None) => {}
    }
}

fn append_error_field(ty: &mut FuncType, name: Option<&str>, ids: &mut IdGen) {
    let field = Field {
        id: ids.next_id(),
        names: name.map(|n| vec![ident(n, ids)]).unwrap_or_default(),
        ty: ident_expr("error", ids),
        tag: None,
        span: Span::default(),
        decs: Decorations::default(),
    };
    match &mut ty.results {
        Some(results) => {
            results.fields.push(field);
            results.parens = true;
        }
        None => {
            ty.results = Some(FieldList {
                id: ids.next_id(),
                fields: vec![field],
                parens: false,
                close_comments: Vec::new(),
            });
        }
    }
}

/// Adds `nil` to every `return` of the function, skipping nested literals.
/// Bare returns of named results already return a nil error.
fn append_nil(stmts: &mut [Stmt], named: bool, ids: &mut IdGen) {
    for stmt in stmts {
        match &mut stmt.kind {
            StmtKind::Return(values) => {
                if !(named && values.is_empty()) {
                    values.push(ident_expr("nil", ids));
                }
            }
            StmtKind::Labeled { stmt, .. } => append_nil(std::slice::from_mut(stmt.as_mut()), named, ids),
            StmtKind::Block(block) | StmtKind::Select(block) => append_nil(&mut block.stmts, named, ids),
            StmtKind::If(s) => {
                append_nil(&mut s.body.stmts, named, ids);
                if let Some(els) = &mut s.els {
                    append_nil(std::slice::from_mut(els.as_mut()), named, ids);
                }
            }
            StmtKind::Switch(s) => append_nil(&mut s.body.stmts, named, ids),
            StmtKind::TypeSwitch(s) => append_nil(&mut s.body.stmts, named, ids),
            StmtKind::For(s) => append_nil(&mut s.body.stmts, named, ids),
            StmtKind::Range(s) => append_nil(&mut s.body.stmts, named, ids),
            StmtKind::Case(clause) => append_nil(&mut clause.body, named, ids),
            StmtKind::Comm(clause) => append_nil(&mut clause.body, named, ids),
            _ => {}
        }
    }
}

fn terminates_list(stmts: &[Stmt]) -> bool {
    stmts
        .iter()
        .rev()
        .find(|s| !matches!(s.kind, StmtKind::Empty))
        .is_some_and(terminates)
}

/// Go's terminating statement rules.
fn terminates(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_)
        | StmtKind::Branch {
            kind: BranchKind::Goto,
            ..
        } => true,
        StmtKind::Expr(Expr {
            kind: ExprKind::Call { fun, .. },
            ..
        }) => fun.unparen().as_ident().is_some_and(|i| i.name == "panic"),
        StmtKind::Block(block) => terminates_list(&block.stmts),
        StmtKind::If(s) => terminates_list(&s.body.stmts) && s.els.as_deref().is_some_and(terminates),
        StmtKind::For(s) => s.cond.is_none() && !has_break(&s.body.stmts, None),
        StmtKind::Labeled { label, stmt } => match &stmt.kind {
            StmtKind::For(s) => s.cond.is_none() && !has_break(&s.body.stmts, Some(&label.name)),
            StmtKind::Switch(s) => clauses_terminate(&s.body.stmts, Some(&label.name)),
            StmtKind::TypeSwitch(s) => clauses_terminate(&s.body.stmts, Some(&label.name)),
            StmtKind::Select(block) => clauses_terminate(&block.stmts, Some(&label.name)),
            _ => terminates(stmt),
        },
        StmtKind::Switch(s) => clauses_terminate(&s.body.stmts, None),
        StmtKind::TypeSwitch(s) => clauses_terminate(&s.body.stmts, None),
        StmtKind::Select(block) => clauses_terminate(&block.stmts, None),
        _ => false,
    }
}

/// Switches need a `default` clause; selects do not.
fn clauses_terminate(clauses: &[Stmt], label: Option<&str>) -> bool {
    let select = clauses.iter().any(|c| matches!(c.kind, StmtKind::Comm(_)));
    let mut has_default = false;
    for clause in clauses {
        let (body, default) = match &clause.kind {
            StmtKind::Case(c) => (&c.body, c.default),
            StmtKind::Comm(c) => (&c.body, c.comm.is_none()),
            _ => return false,
        };
        has_default |= default;
        let falls_through = body.last().is_some_and(|s| {
            matches!(
                s.kind,
                StmtKind::Branch {
                    kind: BranchKind::Fallthrough,
                    ..
                }
            )
        });
        if has_break(body, label) || !(terminates_list(body) || falls_through) {
            return false;
        }
    }
    select || has_default
}

/// An unlabeled `break` reaching this level, or a `break label`.
fn has_break(stmts: &[Stmt], label: Option<&str>) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Branch {
            kind: BranchKind::Break,
            label: target,
        } => match target {
            None => true,
            Some(target) => Some(target.name.as_str()) == label,
        },
        StmtKind::Block(block) => has_break(&block.stmts, label),
        StmtKind::If(s) => {
            has_break(&s.body.stmts, label) || s.els.as_deref().is_some_and(|e| has_break(std::slice::from_ref(e), label))
        }
        StmtKind::Labeled { stmt, .. } => has_break(std::slice::from_ref(stmt.as_ref()), label),
        StmtKind::Case(c) => has_break(&c.body, label),
        StmtKind::Comm(c) => has_break(&c.body, label),
        // Nested breakable statements own their unlabeled breaks.
        StmtKind::For(s) => label.is_some() && has_labeled_break(&s.body.stmts, label),
        StmtKind::Range(s) => label.is_some() && has_labeled_break(&s.body.stmts, label),
        StmtKind::Switch(s) => label.is_some() && has_labeled_break(&s.body.stmts, label),
        StmtKind::TypeSwitch(s) => label.is_some() && has_labeled_break(&s.body.stmts, label),
        StmtKind::Select(b) => label.is_some() && has_labeled_break(&b.stmts, label),
        _ => false,
    })
}

fn has_labeled_break(stmts: &[Stmt], label: Option<&str>) -> bool {
    stmts.iter().any(|stmt| {
        let mut found = false;
        walk(NodeRef::Stmt(stmt), &mut |node, _| {
            match node {
                NodeRef::Expr(Expr {
                    kind: ExprKind::FuncLit(_),
                    ..
                }) => return false,
                NodeRef::Stmt(Stmt {
                    kind:
                        StmtKind::Branch {
                            kind: BranchKind::Break,
                            label: Some(target),
                        },
                    ..
                }) => found |= Some(target.name.as_str()) == label,
                _ => {}
            }
            true
        });
        found
    })
}

/// Names the results of `ctx` so a deferred closure can assign the error:
/// `_` for the leading slots and a fresh name for the error.
fn name_results(program: &mut Program, dests: &mut DestCache, file: FileRef, ctx: &FuncContext) -> Result<()> {
    let current = ctx_results(program, file, ctx);
    let Some((named, error_blank)) = current else {
        return Ok(());
    };
    if named && !error_blank {
        return Ok(());
    }
    let name = fresh_in(&names_in(program, file, ctx.node), "err");

    let mut created = None;
    let mut first = true;
    edit_both(program, dests, file, ctx, |ty, _, ids| {
        let Some(results) = &mut ty.results else {
            return;
        };
        results.parens = true;
        let last = results.fields.len().saturating_sub(1);
        for (i, field) in results.fields.iter_mut().enumerate() {
            if i == last {
                match field.names.last_mut() {
                    Some(existing) if existing.is_blank() => existing.name = name.clone(),
                    Some(_) => {}
                    None => field.names.push(ident(&name, ids)),
                }
                if first {
                    created = field.names.last().map(|i| i.id);
                }
            } else if field.names.is_empty() {
                field.names.push(ident("_", ids));
            }
        }
        first = false;
    })?;

    if let Some(ident_id) = created {
        let pkg = program.units[file.unit].pkg;
        let obj = program.store.new_obj(Object {
            name: name.clone(),
            kind: ObjKind::Var,
            ty: program.store.error_type(),
            pkg: Some(pkg),
            level: ObjLevel::Local,
            decl: Some(ident_id),
            recv: None,
        });
        program.info.defs.insert(ident_id, obj);
    }
    patch_signature(program, ctx, |sig| {
        let last = sig.results.len().saturating_sub(1);
        for (i, result) in sig.results.iter_mut().enumerate() {
            if i == last {
                result.name = name.clone();
            } else if result.name.is_empty() {
                result.name = "_".to_string();
            }
        }
    });
    Ok(())
}

/// `(named, error slot blank)` for the results of `ctx` as written.
fn ctx_results(program: &Program, file: FileRef, ctx: &FuncContext) -> Option<(bool, bool)> {
    let path = path_to(NodeRef::File(&program.file(file).ast), ctx.node)?;
    let ty = match path.last()?.1 {
        NodeRef::Decl(Decl {
            kind: DeclKind::Func(func),
            ..
        }) => &func.ty,
        NodeRef::Expr(Expr {
            kind: ExprKind::FuncLit(lit),
            ..
        }) => &lit.ty,
        _ => return None,
    };
    let results = ty.results.as_ref()?;
    let error_blank = results
        .fields
        .last()
        .and_then(|f| f.names.last())
        .is_some_and(Ident::is_blank);
    Some((results.is_named(), error_blank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::load_single;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn plan(source: &str, level: Level) -> (Plan, Program, String) {
        let (dir, mut program) = load_single(source);
        let filter = Filter::new(&[], &[], true).unwrap();
        let points = Detector::new(&program, &filter, false).detect();
        let mut dests = DestCache::new();
        let mut propagator = Propagator::new(&program, &filter, level, false);
        let plan = propagator.run(&mut program, &mut dests, points).unwrap();
        let rendered = dests
            .finish()
            .into_iter()
            .map(|r| r.text)
            .next()
            .unwrap_or_default();
        drop(dir);
        (plan, program, rendered)
    }

    fn handlers(plan: &Plan) -> Vec<(DiscardKind, Handler)> {
        plan.points.iter().map(|p| (p.point.kind, p.handler)).collect()
    }

    const CHAIN: &str = indoc! {r#"
        package main

        import "os"

        func save(path string) {
            os.Remove(path)
        }

        func main() {
            save("a")
        }
    "#};

    #[test]
    fn helpers_gain_an_error_and_callers_follow() {
        let (plan, program, rendered) = plan(CHAIN, Level::Aggressive);
        assert_eq!(
            handlers(&plan),
            vec![(DiscardKind::Bare, Handler::Return), (DiscardKind::Bare, Handler::Terminal)]
        );
        assert_eq!(plan.mutated, vec!["save".to_string()]);

        let pkg = program.units[0].pkg;
        let save = program.store.package(pkg).members["save"];
        assert!(program.store.ends_in_error(program.store.signature(save).unwrap()));
        assert!(rendered.contains("func save(path string) error {\n\tos.Remove(path)\n\treturn nil\n}"));
    }

    #[test]
    fn safe_level_logs_instead() {
        let (plan, _, rendered) = plan(CHAIN, Level::Safe);
        assert_eq!(handlers(&plan), vec![(DiscardKind::Bare, Handler::Log)]);
        assert!(plan.mutated.is_empty());
        assert!(rendered.is_empty());
    }

    #[test]
    fn interface_methods_keep_their_signature() {
        let (plan, _, _) = plan(
            indoc! {r#"
                package main

                import "os"

                type Runner interface{ Run() }

                type task struct{}

                func (task) Run() {
                    os.Remove("x")
                }

                func main() {
                    var r Runner = task{}
                    r.Run()
                }
            "#},
            Level::Aggressive,
        );
        assert_eq!(handlers(&plan), vec![(DiscardKind::Bare, Handler::Log)]);
    }

    #[test]
    fn functions_used_as_values_are_not_changed() {
        let (plan, _, _) = plan(
            indoc! {r#"
                package main

                import "os"

                func cleanup() {
                    os.Remove("x")
                }

                func main() {
                    hook := cleanup
                    hook()
                }
            "#},
            Level::Aggressive,
        );
        assert_eq!(handlers(&plan), vec![(DiscardKind::Bare, Handler::Log)]);
    }

    #[test]
    fn deferred_returns_name_the_results() {
        let (plan, program, rendered) = plan(
            indoc! {r#"
                package main

                import "os"

                func run(f *os.File) (int, error) {
                    defer f.Close()
                    return 1, nil
                }
            "#},
            Level::Aggressive,
        );
        assert_eq!(handlers(&plan), vec![(DiscardKind::Deferred, Handler::Return)]);
        assert!(rendered.contains("func run(f *os.File) (_ int, err error) {"));
        let pkg = program.units[0].pkg;
        let run = program.store.package(pkg).members["run"];
        assert_eq!(program.store.signature(run).unwrap().results[1].name, "err");
    }

    #[test]
    fn goroutine_literals_terminate() {
        let (plan, _, _) = plan(
            indoc! {r#"
                package main

                import "os"

                func start() {
                    go func() {
                        os.Remove("x")
                    }()
                }
            "#},
            Level::Aggressive,
        );
        assert_eq!(handlers(&plan), vec![(DiscardKind::Bare, Handler::Terminal)]);
    }

    #[test]
    fn terminating_statements() {
        let mut ids = IdGen::default();
        let stmts = |text: &str, ids: &mut IdGen| crate::syntax::parser::parse_stmts(text, ids).unwrap();
        assert!(terminates_list(&stmts("return", &mut ids)));
        assert!(terminates_list(&stmts("for {\n}", &mut ids)));
        assert!(!terminates_list(&stmts("for {\n\tbreak\n}", &mut ids)));
        assert!(terminates_list(&stmts("if x {\n\treturn\n} else {\n\tpanic(1)\n}", &mut ids)));
        assert!(!terminates_list(&stmts("if x {\n\treturn\n}", &mut ids)));
        assert!(terminates_list(&stmts(
            "switch x {\ncase 1:\n\treturn\ndefault:\n\tpanic(2)\n}",
            &mut ids
        )));
        assert!(!terminates_list(&stmts("switch x {\ncase 1:\n\treturn\n}", &mut ids)));
    }
}
