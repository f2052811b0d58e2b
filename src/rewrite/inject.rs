//! Phase two: every planned discard becomes a checked call.
//!
//! Each edit is worked out against the analysis tree first (variable
//! names, the failure path, zero values, imports) and only then carried
//! out on the destination tree. There the statement holding the call is
//! lifted out of its list, rebuilt, and spliced back as one or more
//! statements. Leading comments go on the first of them, a trailing one
//! after the rebuilt statement. An edit that cannot be completed restores
//! the original statement and is reported as skipped; the rest of the run
//! carries on.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::dest::{DestCache, DestFile};
use super::imports::package_name;
use super::mapper::correspond;
use super::naming::{callee_base, Namer, Origin, Scope, ERR};
use super::panics::{self, PanicSite};
use super::propagate::{is_test_handler, testing_param, Handler, Plan, Planned};
use super::snippet::{self, hole};
use super::template::{escape, Template};
use super::zero::{zero_value, FileQualifier};
use crate::analysis::detect::current_signature;
use crate::analysis::{enclosing_function, DiscardKind, FuncContext, InjectionPoint};
use crate::config::{FixConfig, TerminalStrategy};
use crate::core::errors::{Error, Result};
use crate::loader::{FileRef, Program};
use crate::observability::set_current_file;
use crate::syntax::ast::*;
use crate::syntax::node::{edges_to, find_mut, follow_mut, path_to, walk, Edge, NodeMut, NodeRef};
use crate::syntax::printer::print_expr;
use crate::syntax::Span;
use crate::types::format::type_string;

/// Counts for one injection pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub handled: usize,
    pub skipped: usize,
    /// `panic` statements turned into error returns.
    pub panics: usize,
}

/// A rewrite settled on the analysis side, waiting to be applied.
#[derive(Debug)]
enum Edit {
    /// `v, err := call` ahead of the statement; the call becomes `v`.
    Lift {
        end: usize,
        values: Vec<String>,
        err: String,
        failure: String,
    },
    /// `if _, err := call; err != nil {...}` replaces the statement.
    Collapse { blanks: String, failure: String },
    /// The error slot of an existing binding is named and checked after it.
    Bind {
        err: String,
        missing: bool,
        declare: bool,
        failure: String,
    },
    /// The error is bound in the `if`/`switch` init clause and checked by a
    /// new `if` in front, which carries the original statement in its else.
    Guard {
        err: String,
        /// `Some(blanks)` when the init is replaced by `blanks err := call`.
        collapse: Option<String>,
        missing: bool,
        declare: bool,
        failure: String,
    },
    /// `defer func() {...}()` or `go func() {...}()` around a collapsed check.
    Wrap {
        go: bool,
        blanks: String,
        failure: String,
    },
    /// `defer func() { err = errors.Join(err, call) }()`
    Join {
        result: String,
        errors: String,
        blanks: String,
        local: String,
    },
    /// A package-level initializer moved into a checked closure call.
    Global {
        missing: bool,
        values: Vec<String>,
        types: Vec<String>,
        err: String,
        failure: String,
    },
}

struct Group<'p> {
    file: FileRef,
    anchor: NodeId,
    points: Vec<&'p Planned>,
}

/// Statement rebuilt around its root call.
struct Rebuilt {
    before: Vec<Stmt>,
    primary: Stmt,
    after: Vec<Stmt>,
}

pub struct Injector<'a> {
    terminal: TerminalStrategy,
    template: &'a Template,
    namer: Namer,
}

impl<'a> Injector<'a> {
    pub fn new(config: &'a FixConfig) -> Self {
        Self {
            terminal: config.terminal,
            template: &config.template,
            namer: Namer::new(),
        }
    }

    pub fn run(&mut self, program: &Program, dests: &mut DestCache, plan: &Plan) -> Result<Outcome> {
        let mut outcome = Outcome::default();
        let groups = group(plan);
        let anchors: HashSet<NodeId> = groups.iter().map(|g| g.anchor).collect();

        // Every id is mapped before the first edit moves anything.
        let mut mapped = Vec::with_capacity(groups.len());
        for group in groups {
            let dest = dests.get(program, group.file)?;
            let src = &program.file(group.file).ast;
            let anchor = correspond(src, &dest.ast, group.anchor)
                .map_err(|e| e.in_file(&dest.path))?
                .node;
            let calls = group
                .points
                .iter()
                .map(|p| correspond(src, &dest.ast, p.point.call).map(|c| c.node))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| e.in_file(&dest.path))?;
            mapped.push((group, anchor, calls));
        }
        let mut panic_sites = Vec::new();
        for &(file, func) in &plan.panics {
            for site in panics::collect(program, file, func, &anchors) {
                let dest = dests.get(program, file)?;
                let stmt = correspond(&program.file(file).ast, &dest.ast, site.stmt)
                    .map_err(|e| e.in_file(&dest.path))?
                    .node;
                panic_sites.push((site, stmt));
            }
        }

        for (group, anchor, calls) in mapped {
            let _file = set_current_file(&program.file(group.file).path);
            self.apply_group(program, dests, &group, anchor, &calls, &mut outcome)?;
        }
        for (site, stmt) in panic_sites {
            match self.convert_panic(program, dests, &site, stmt) {
                Ok(()) => outcome.panics += 1,
                Err(e) if !e.is_fatal() => {
                    let path = &program.file(site.file).path;
                    warn!("{}: leaving a panic in place: {e}", path.display());
                    outcome.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        debug!(handled = outcome.handled, skipped = outcome.skipped, panics = outcome.panics, "injection pass done");
        Ok(outcome)
    }

    fn apply_group(
        &mut self,
        program: &Program,
        dests: &mut DestCache,
        group: &Group<'_>,
        anchor: NodeId,
        calls: &[NodeId],
        outcome: &mut Outcome,
    ) -> Result<()> {
        let dest = dests.get(program, group.file)?;
        let saved = dest.required.clone();
        let mut edits = Vec::new();
        let mut prepared = Vec::new();
        for (planned, &call) in group.points.iter().zip(calls) {
            let before = dest.required.clone();
            match self.prepare(program, dest, planned) {
                Ok(edit) => {
                    edits.push((edit, call));
                    prepared.push(*planned);
                }
                Err(e) if !e.is_fatal() => {
                    dest.required = before;
                    skip(program, planned, &e);
                    outcome.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        if edits.is_empty() {
            return Ok(());
        }

        let count = edits.len();
        let global = edits.iter().any(|(edit, _)| matches!(edit, Edit::Global { .. }));
        let applied = if global {
            apply_global(dest, anchor, edits)
        } else {
            apply_local(dest, anchor, edits)
        };
        match applied {
            Ok(()) => {
                outcome.handled += count;
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                dest.required = saved;
                for planned in prepared {
                    skip(program, planned, &e);
                }
                outcome.skipped += count;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Settles names and the failure path for one point.
    fn prepare(&mut self, program: &Program, dest: &mut DestFile, planned: &Planned) -> Result<Edit> {
        let point = &planned.point;
        let file = point.file;
        let ast = &program.file(file).ast;
        let scope = Scope::at(program, file, point.stmt)
            .ok_or_else(|| Error::Generation("statement not found in its file".into()))?;
        let fun = match find(ast, point.call) {
            Some(NodeRef::Expr(Expr {
                kind: ExprKind::Call { fun, .. },
                ..
            })) => fun.as_ref(),
            _ => return Err(Error::Generation("call not found in its file".into())),
        };
        let ctx = enclosing_function(program, file, point.call);
        let callee = callee_text(fun);
        let blanks = "_, ".repeat(point.results.saturating_sub(1));
        let path = FailurePath {
            program,
            file,
            scope: &scope,
            ctx: ctx.as_ref(),
            handler: planned.handler,
            callee: &callee,
            terminal: self.terminal,
            template: self.template,
        };

        if matches!(point.kind, DiscardKind::Bare | DiscardKind::Assign { .. }) {
            if let Some(init) = guarded_init(ast, point.stmt, point.call) {
                return self.guard(point, init, &scope, &path, dest, blanks);
            }
        }

        match point.kind {
            DiscardKind::Condition | DiscardKind::Chained | DiscardKind::Embedded => {
                let count = point.results.saturating_sub(1);
                if count == 0 {
                    return Err(Error::Generation("the error value is used in place".into()));
                }
                let end = find(ast, point.call).map_or(0, |node| match node {
                    NodeRef::Expr(expr) => expr.span.end,
                    _ => 0,
                });
                let values = match count {
                    1 => vec![self.namer.fresh(&scope, "res")],
                    _ => (0..count).map(|i| self.namer.fresh(&scope, &format!("res{i}"))).collect(),
                };
                let err = self.namer.error_name(&scope, false, fun);
                let failure = path.render(dest, &err, false)?;
                Ok(Edit::Lift {
                    end,
                    values,
                    err,
                    failure,
                })
            }
            DiscardKind::Bare => Ok(Edit::Collapse {
                blanks,
                failure: path.render(dest, ERR, false)?,
            }),
            DiscardKind::Assign { define, missing } => {
                let slots = binding_slots(ast, point.stmt)?;
                check_slots(&slots, missing, point.results)?;
                let others = if missing { &slots[..] } else { &slots[..slots.len() - 1] };
                if others.iter().all(|blank| *blank) {
                    return Ok(Edit::Collapse {
                        blanks,
                        failure: path.render(dest, ERR, false)?,
                    });
                }
                let is_var = matches!(
                    find(ast, point.stmt),
                    Some(NodeRef::Stmt(Stmt {
                        kind: StmtKind::Decl(_),
                        ..
                    }))
                );
                let (err, declare) = match (define || is_var, self.namer.assignable_error(&scope)) {
                    (true, _) => (self.namer.error_name(&scope, is_var, fun), false),
                    (false, Some(existing)) => (existing, false),
                    (false, None) => (self.namer.error_name(&scope, true, fun), true),
                };
                let failure = path.render(dest, &err, false)?;
                Ok(Edit::Bind {
                    err,
                    missing,
                    declare,
                    failure,
                })
            }
            DiscardKind::Deferred if planned.handler == Handler::Return => {
                let result = ctx
                    .as_ref()
                    .and_then(|ctx| error_result_name(program, file, ctx))
                    .ok_or_else(|| Error::Generation("the error result has no name to join into".into()))?;
                if scope.lookup(&result).is_some_and(|b| b.origin != Origin::Result) {
                    return Err(Error::Generation(format!("result `{result}` is shadowed at the defer")));
                }
                let errors = package_name(program, file, dest, "errors", &|name| scope.is_visible(name))?;
                let base = format!("{}Err", callee_base(fun).unwrap_or_else(|| "deferred".to_string()));
                let local = if blanks.is_empty() {
                    String::new()
                } else {
                    self.namer.fresh(&scope, &base)
                };
                Ok(Edit::Join {
                    result,
                    errors,
                    blanks,
                    local,
                })
            }
            DiscardKind::Deferred | DiscardKind::Background => {
                let go = point.kind == DiscardKind::Background;
                Ok(Edit::Wrap {
                    go,
                    failure: path.render(dest, ERR, go)?,
                    blanks,
                })
            }
            DiscardKind::Global { missing } => {
                let Some(NodeRef::Spec(Spec {
                    kind: SpecKind::Value(value),
                    ..
                })) = find(ast, point.stmt)
                else {
                    return Err(Error::Generation("initializer not found".into()));
                };
                let slots: Vec<bool> = value.names.iter().map(Ident::is_blank).collect();
                check_slots(&slots, missing, point.results)?;
                let count = point.results - 1;
                let types = match &value.ty {
                    Some(ty) => vec![print_expr(ty); count],
                    None => {
                        let sig = current_signature(program, point.callee, fun)
                            .ok_or_else(|| Error::Generation("callee signature unknown".into()))?;
                        let qual = FileQualifier::new(program, file);
                        sig.results[..count]
                            .iter()
                            .map(|p| type_string(&program.store, &p.ty, &qual))
                            .collect::<Option<Vec<_>>>()
                            .ok_or_else(|| Error::Generation("a result type cannot be written here".into()))?
                    }
                };
                let values = (0..count).map(|_| self.namer.fresh(&scope, "v")).collect();
                let err = self.namer.error_name(&scope, false, fun);
                let failure = path.render(dest, &err, false)?;
                Ok(Edit::Global {
                    missing,
                    values,
                    types,
                    err,
                    failure,
                })
            }
        }
    }

    /// A discard in the init clause of an `if` or `switch`. The new error
    /// stays visible through the whole chain, so it always gets a name the
    /// function does not use yet.
    fn guard(
        &mut self,
        point: &InjectionPoint,
        init: &Stmt,
        scope: &Scope,
        path: &FailurePath<'_>,
        dest: &mut DestFile,
        blanks: String,
    ) -> Result<Edit> {
        let (collapse, missing, define) = match (point.kind, &init.kind) {
            (DiscardKind::Bare, _) => (true, false, true),
            (DiscardKind::Assign { define, missing }, StmtKind::Assign { lhs, .. }) => {
                let slots: Vec<bool> = lhs.iter().map(Expr::is_blank).collect();
                check_slots(&slots, missing, point.results)?;
                let others = if missing { &slots[..] } else { &slots[..slots.len() - 1] };
                (others.iter().all(|blank| *blank), missing, define)
            }
            _ => return Err(Error::Generation("init clause is not a binding".into())),
        };
        let (err, declare) = match (collapse || define, self.namer.assignable_error(scope)) {
            (false, Some(existing)) => (existing, false),
            (needs_new, _) => (self.namer.fresh(scope, ERR), !needs_new),
        };
        let failure = path.render(dest, &err, false)?;
        Ok(Edit::Guard {
            err,
            collapse: collapse.then_some(blanks),
            missing,
            declare,
            failure,
        })
    }

    fn convert_panic(&mut self, program: &Program, dests: &mut DestCache, site: &PanicSite, stmt: NodeId) -> Result<()> {
        let dest = dests.get(program, site.file)?;
        let ctx = enclosing_function(program, site.file, site.stmt)
            .ok_or_else(|| Error::Generation("no enclosing function".into()))?;
        let sig = ctx
            .signature
            .as_ref()
            .ok_or_else(|| Error::Generation("enclosing signature unknown".into()))?;
        let Some((_, rest)) = sig.results.split_last() else {
            return Err(Error::Generation("enclosing function returns nothing".into()));
        };
        let qual = FileQualifier::new(program, site.file);
        let mut values = rest
            .iter()
            .map(|p| zero_value(&program.store, &p.ty, &qual))
            .collect::<Result<Vec<_>>>()?;
        let scope = Scope::at(program, site.file, site.stmt).unwrap_or_default();
        let saved = dest.required.clone();
        let value = match site.wrap.verb() {
            None => hole(0),
            Some(verb) => {
                let fmt = package_name(program, site.file, dest, "fmt", &|name| scope.is_visible(name))?;
                format!("{fmt}.Errorf(\"{verb}\", {})", hole(0))
            }
        };
        values.push(value);
        let text = format!("return {}", values.join(", "));

        let converted = {
            let DestFile { ast, ids, .. } = &mut *dest;
            match find_mut(NodeMut::File(ast), stmt) {
                Some(NodeMut::Stmt(target)) => {
                    let backup = target.clone();
                    let arg = match &mut target.kind {
                        StmtKind::Expr(Expr {
                            kind: ExprKind::Call { args, .. },
                            ..
                        }) => args.pop(),
                        _ => None,
                    };
                    match arg.ok_or_else(|| Error::Generation("panic value not found".into())) {
                        Ok(arg) => match snippet::statement(&text, ids, vec![arg]) {
                            Ok(new) => {
                                target.kind = new.kind;
                                Ok(())
                            }
                            Err(e) => {
                                *target = backup;
                                Err(e)
                            }
                        },
                        Err(e) => {
                            *target = backup;
                            Err(e)
                        }
                    }
                }
                _ => Err(Error::Generation("panic statement not found".into())),
            }
        };
        match converted {
            Ok(()) => {
                dest.mark_dirty(stmt);
                Ok(())
            }
            Err(e) => {
                dest.required = saved;
                Err(e)
            }
        }
    }
}

/// Builds the statements run when the captured error is non-nil.
struct FailurePath<'c> {
    program: &'c Program,
    file: FileRef,
    scope: &'c Scope,
    ctx: Option<&'c FuncContext>,
    handler: Handler,
    callee: &'c str,
    terminal: TerminalStrategy,
    template: &'c Template,
}

impl FailurePath<'_> {
    fn render(&self, dest: &mut DestFile, err: &str, background: bool) -> Result<String> {
        let (program, file, scope) = (self.program, self.file, self.scope);
        let visible = |name: &str| scope.is_visible(name);
        match self.handler {
            Handler::Return => {
                let sig = self
                    .ctx
                    .and_then(|ctx| ctx.signature.as_ref())
                    .ok_or_else(|| Error::Generation("enclosing signature unknown".into()))?;
                let Some((_, rest)) = sig.results.split_last() else {
                    return Err(Error::Generation("enclosing function returns nothing".into()));
                };
                let qual = FileQualifier::new(program, file);
                let mut values = rest
                    .iter()
                    .map(|p| zero_value(&program.store, &p.ty, &qual))
                    .collect::<Result<Vec<_>>>()?;
                for pkg in self.template.packages() {
                    let name = package_name(program, file, dest, pkg, &visible)?;
                    if name != *pkg {
                        return Err(Error::Generation(format!("template package {pkg} is not reachable by name")));
                    }
                }
                values.push(self.template.render(err, self.callee));
                Ok(format!("return {}", values.join(", ")))
            }
            Handler::Terminal => {
                if let Some(call) = self.ctx.and_then(|ctx| test_reporter(program, file, scope, ctx, background)) {
                    return Ok(format!("{call}({err})"));
                }
                match self.terminal {
                    TerminalStrategy::Fatal => {
                        let log = package_name(program, file, dest, "log", &visible)?;
                        Ok(format!("{log}.Fatal({err})"))
                    }
                    TerminalStrategy::Panic => {
                        if visible("panic") {
                            return Err(Error::Generation("`panic` is shadowed".into()));
                        }
                        Ok(format!("panic({err})"))
                    }
                    TerminalStrategy::Exit => {
                        let fmt = package_name(program, file, dest, "fmt", &visible)?;
                        let os = package_name(program, file, dest, "os", &visible)?;
                        Ok(format!("{fmt}.Fprintln({os}.Stderr, {err})\n{os}.Exit(1)"))
                    }
                }
            }
            Handler::Log => {
                let log = package_name(program, file, dest, "log", &visible)?;
                Ok(format!("{log}.Printf(\"{}: %v\", {err})", escape(self.callee).replace('%', "%%")))
            }
        }
    }
}

fn skip(program: &Program, planned: &Planned, err: &Error) {
    let point = &planned.point;
    warn!(
        "{}:{}: leaving {} alone: {err}",
        program.file(point.file).path.display(),
        point.position,
        point.kind.label()
    );
}

/// Points sharing an anchor statement, in plan order.
fn group(plan: &Plan) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut index: HashMap<(FileRef, NodeId), usize> = HashMap::new();
    let mut seen = HashSet::new();
    for planned in &plan.points {
        let point = &planned.point;
        if !seen.insert((point.file, point.call)) {
            continue;
        }
        let key = (point.file, point.stmt);
        match index.get(&key) {
            Some(&i) => groups[i].points.push(planned),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    file: point.file,
                    anchor: point.stmt,
                    points: vec![planned],
                });
            }
        }
    }
    groups
}

fn find(ast: &File, id: NodeId) -> Option<NodeRef<'_>> {
    path_to(NodeRef::File(ast), id).and_then(|path| path.last().map(|(_, node)| *node))
}

fn callee_text(fun: &Expr) -> String {
    match &fun.unparen().kind {
        ExprKind::FuncLit(_) => "func literal".to_string(),
        _ => print_expr(fun),
    }
}

/// Blank flags of the left-hand slots of an assignment or local `var`.
fn binding_slots(ast: &File, stmt: NodeId) -> Result<Vec<bool>> {
    match find(ast, stmt) {
        Some(NodeRef::Stmt(Stmt {
            kind: StmtKind::Assign { lhs, .. },
            ..
        })) => Ok(lhs.iter().map(Expr::is_blank).collect()),
        Some(NodeRef::Stmt(Stmt {
            kind: StmtKind::Decl(gen),
            ..
        })) => match gen.specs.as_slice() {
            [Spec {
                kind: SpecKind::Value(value),
                ..
            }] => Ok(value.names.iter().map(Ident::is_blank).collect()),
            _ => Err(Error::Generation("declaration holds several specs".into())),
        },
        _ => Err(Error::Generation("binding statement not found".into())),
    }
}

fn check_slots(slots: &[bool], missing: bool, results: usize) -> Result<()> {
    let fits = if missing {
        slots.len() + 1 == results
    } else {
        slots.len() == results && slots.last() == Some(&true)
    };
    if fits {
        Ok(())
    } else {
        Err(Error::Generation(format!("{} slots for {results} results", slots.len())))
    }
}

/// Name of the last (error) result of the function, when it has one.
fn error_result_name(program: &Program, file: FileRef, ctx: &FuncContext) -> Option<String> {
    let ty = match find(&program.file(file).ast, ctx.node)? {
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
    let name = ty.results.as_ref()?.fields.last()?.names.last()?;
    (!name.is_blank()).then(|| name.name.clone())
}

/// `t.Fatal` (or `t.Error` off the test goroutine) inside a test handler
/// whose `*testing` parameter is named and not shadowed.
fn test_reporter(program: &Program, file: FileRef, scope: &Scope, ctx: &FuncContext, background: bool) -> Option<String> {
    if !is_test_handler(program, file, ctx) {
        return None;
    }
    let sig = ctx.signature.as_ref()?;
    let param = sig.params.first()?;
    if param.name.is_empty() || param.name == "_" {
        return None;
    }
    if !scope.lookup(&param.name).is_some_and(|b| b.origin == Origin::Param) {
        return None;
    }
    let method = match (testing_param(&program.store, sig)?, background) {
        ("T" | "B", true) => "Error",
        ("T" | "B" | "F", false) => "Fatal",
        _ => return None,
    };
    Some(format!("{}.{method}", param.name))
}

fn not_found(what: &str) -> Error {
    Error::Generation(format!("{what} not found in the rewritten file"))
}

/// Statement list at `edges` below the file root.
fn stmt_list<'t>(file: &'t mut File, edges: &[Edge]) -> Option<&'t mut Vec<Stmt>> {
    match follow_mut(NodeMut::File(file), edges)? {
        NodeMut::Block(block) => Some(&mut block.stmts),
        NodeMut::Stmt(stmt) => match &mut stmt.kind {
            StmtKind::Case(clause) => Some(&mut clause.body),
            StmtKind::Comm(clause) => Some(&mut clause.body),
            _ => None,
        },
        _ => None,
    }
}

fn apply_local(dest: &mut DestFile, anchor: NodeId, edits: Vec<(Edit, NodeId)>) -> Result<()> {
    let edges = edges_to(NodeRef::File(&dest.ast), anchor).ok_or_else(|| not_found("statement"))?;
    let Some((last, parent)) = edges.split_last() else {
        return Err(not_found("statement"));
    };
    let index = last.index.ok_or_else(|| Error::Generation("statement is not in a list".into()))?;

    let original = {
        let list = stmt_list(&mut dest.ast, parent).ok_or_else(|| Error::Generation("statement is not in a list".into()))?;
        let slot = list
            .get_mut(index)
            .filter(|stmt| stmt.id == anchor)
            .ok_or_else(|| not_found("statement"))?;
        std::mem::replace(slot, Stmt::new(anchor, StmtKind::Empty))
    };
    let backup = original.clone();

    match rebuild(&mut dest.ids, original, edits) {
        Ok(stmts) => {
            let first = stmts.first().map(|stmt| stmt.id);
            let list = stmt_list(&mut dest.ast, parent).ok_or_else(|| not_found("statement list"))?;
            list.splice(index..=index, stmts);
            if let Some(first) = first {
                dest.mark_dirty(first);
            }
            Ok(())
        }
        Err(e) => {
            if let Some(slot) = stmt_list(&mut dest.ast, parent).and_then(|list| list.get_mut(index)) {
                *slot = backup;
            }
            Err(e)
        }
    }
}

fn rebuild(ids: &mut IdGen, original: Stmt, edits: Vec<(Edit, NodeId)>) -> Result<Vec<Stmt>> {
    let Stmt { id, kind, span, decs } = original;
    let (label, primary) = match kind {
        StmtKind::Labeled { label, stmt } => (Some(label), *stmt),
        kind => (None, Stmt { id, kind, span, decs: Decorations::default() }),
    };

    let (mut lifts, mut roots): (Vec<_>, Vec<_>) = edits.into_iter().partition(|(edit, _)| matches!(edit, Edit::Lift { .. }));
    lifts.sort_by_key(|(edit, _)| match edit {
        Edit::Lift { end, .. } => *end,
        _ => 0,
    });
    if roots.len() > 1 {
        return Err(Error::Generation("several discards share one statement".into()));
    }
    // A guarded switch keeps its label so `break L` still names it.
    let guarded = matches!(roots.first(), Some((Edit::Guard { .. }, _))) && !matches!(primary.kind, StmtKind::If(_));
    let (label, mut primary) = match label {
        Some(label) if guarded => (
            None,
            Stmt {
                id,
                kind: StmtKind::Labeled {
                    label,
                    stmt: Box::new(primary),
                },
                span,
                decs: Decorations::default(),
            },
        ),
        other => (other, primary),
    };

    let mut stmts = Vec::new();
    for (edit, call) in lifts {
        stmts.extend(lift(ids, &mut primary, call, edit)?);
    }
    let rebuilt = match roots.pop() {
        Some((edit, call)) => root(ids, primary, call, edit)?,
        None => Rebuilt {
            before: Vec::new(),
            primary,
            after: Vec::new(),
        },
    };
    stmts.extend(rebuilt.before);
    let position = stmts.len();
    let primary = match label {
        Some(label) => Stmt {
            id,
            kind: StmtKind::Labeled {
                label,
                stmt: Box::new(rebuilt.primary),
            },
            span,
            decs: Decorations::default(),
        },
        None => rebuilt.primary,
    };
    stmts.push(primary);
    stmts.extend(rebuilt.after);

    let Decorations {
        blank_before,
        leading,
        trailing,
    } = decs;
    stmts[0].decs.blank_before = blank_before;
    stmts[0].decs.leading = leading;
    // A rebuilt statement carries the comment after its closing brace.
    if trailing.is_some() {
        stmts[position].decs.trailing = trailing;
    }
    Ok(stmts)
}

fn take_expr(stmt: &mut Stmt, id: NodeId, replacement: Expr) -> Option<Expr> {
    match find_mut(NodeMut::Stmt(stmt), id)? {
        NodeMut::Expr(slot) => Some(std::mem::replace(slot, replacement)),
        _ => None,
    }
}

fn contains(stmt: &Stmt, id: NodeId) -> bool {
    let mut found = false;
    walk(NodeRef::Stmt(stmt), &mut |node, _| {
        found |= node.id() == id;
        !found
    });
    found
}

/// Init clause of the `if` or `switch` at `anchor` when it holds `call`.
fn guarded_init(ast: &File, anchor: NodeId, call: NodeId) -> Option<&Stmt> {
    match find(ast, anchor)? {
        NodeRef::Stmt(stmt) => init_of(stmt).filter(|init| contains(init, call)),
        _ => None,
    }
}

fn init_of(stmt: &Stmt) -> Option<&Stmt> {
    match &stmt.kind {
        StmtKind::Labeled { stmt, .. } => init_of(stmt),
        StmtKind::If(s) => s.init.as_deref(),
        StmtKind::Switch(s) => s.init.as_deref(),
        StmtKind::TypeSwitch(s) => s.init.as_deref(),
        _ => None,
    }
}

/// Hoists `call` out of `primary` into `values, err := call`.
fn lift(ids: &mut IdGen, primary: &mut Stmt, call: NodeId, edit: Edit) -> Result<Vec<Stmt>> {
    let Edit::Lift {
        values, err, failure, ..
    } = edit
    else {
        return Err(Error::Generation("not a hoisted call".into()));
    };
    if init_of(primary).is_some_and(|init| !contains(init, call)) {
        return Err(Error::Generation("the call may read variables the statement declares".into()));
    }
    let text = format!(
        "{}, {err} := {}\nif {err} != nil {{\n{failure}\n}}",
        values.join(", "),
        hole(0)
    );

    let moved = if let [value] = values.as_slice() {
        let placeholder = snippet::ident(value, ids);
        take_expr(primary, call, placeholder)
    } else {
        // Several values only fit where the call was the sole operand.
        let (parent, field) = {
            let path = path_to(NodeRef::Stmt(primary), call).ok_or_else(|| not_found("call"))?;
            let field = path.last().and_then(|(edge, _)| edge.map(|e| e.field));
            let parent = path.len().checked_sub(2).map(|i| path[i].1);
            let sole = match parent {
                Some(NodeRef::Expr(Expr {
                    kind: ExprKind::Call { args, ellipsis: false, .. },
                    ..
                })) => args.len() == 1,
                Some(NodeRef::Stmt(Stmt {
                    kind: StmtKind::Return(results),
                    ..
                })) => results.len() == 1,
                _ => false,
            };
            if !sole {
                return Err(Error::Generation("a multi-value call cannot be split here".into()));
            }
            (parent.map(|node| node.id()), field)
        };
        let idents: Vec<Expr> = values.iter().map(|v| snippet::ident(v, ids)).collect();
        let target = match parent {
            Some(parent) => find_mut(NodeMut::Stmt(&mut *primary), parent),
            None => None,
        };
        match (target, field) {
            (
                Some(NodeMut::Expr(Expr {
                    kind: ExprKind::Call { args, .. },
                    ..
                })),
                Some("args"),
            ) => {
                let call = args.pop();
                args.extend(idents);
                call
            }
            (
                Some(NodeMut::Stmt(Stmt {
                    kind: StmtKind::Return(results),
                    ..
                })),
                Some("results"),
            ) => {
                let call = results.pop();
                results.extend(idents);
                call
            }
            _ => None,
        }
    };
    let moved = moved.ok_or_else(|| not_found("call"))?;
    snippet::statements(&text, ids, vec![moved])
}

/// Rewrites the statement whose own expression is `call`.
fn root(ids: &mut IdGen, mut primary: Stmt, call: NodeId, edit: Edit) -> Result<Rebuilt> {
    let replaced = |stmt: Stmt| Rebuilt {
        before: Vec::new(),
        primary: stmt,
        after: Vec::new(),
    };
    let take = |primary: &mut Stmt, ids: &mut IdGen| {
        let placeholder = snippet::ident("_", ids);
        take_expr(primary, call, placeholder).ok_or_else(|| not_found("call"))
    };

    match edit {
        Edit::Collapse { blanks, failure } => {
            let moved = take(&mut primary, ids)?;
            let text = format!("if {blanks}err := {}; err != nil {{\n{failure}\n}}", hole(0));
            Ok(replaced(snippet::statement(&text, ids, vec![moved])?))
        }
        Edit::Wrap { go, blanks, failure } => {
            let moved = take(&mut primary, ids)?;
            let keyword = if go { "go" } else { "defer" };
            let text = format!(
                "{keyword} func() {{\n\tif {blanks}err := {}; err != nil {{\n{failure}\n\t}}\n}}()",
                hole(0)
            );
            Ok(replaced(snippet::statement(&text, ids, vec![moved])?))
        }
        Edit::Join {
            result,
            errors,
            blanks,
            local,
        } => {
            let moved = take(&mut primary, ids)?;
            let text = if blanks.is_empty() {
                format!("defer func() {{\n\t{result} = {errors}.Join({result}, {})\n}}()", hole(0))
            } else {
                format!(
                    "defer func() {{\n\t{blanks}{local} := {}\n\t{result} = {errors}.Join({result}, {local})\n}}()",
                    hole(0)
                )
            };
            Ok(replaced(snippet::statement(&text, ids, vec![moved])?))
        }
        Edit::Bind {
            err,
            missing,
            declare,
            failure,
        } => {
            match &mut primary.kind {
                StmtKind::Assign { lhs, .. } => {
                    let slot = snippet::ident(&err, ids);
                    match lhs.last_mut() {
                        Some(last) if !missing => *last = slot,
                        _ => lhs.push(slot),
                    }
                }
                StmtKind::Decl(GenDecl { specs, .. }) => {
                    let Some(Spec {
                        kind: SpecKind::Value(value),
                        ..
                    }) = specs.first_mut()
                    else {
                        return Err(not_found("declaration"));
                    };
                    let slot = Ident {
                        id: ids.next_id(),
                        name: err.clone(),
                        span: Span::default(),
                    };
                    match value.names.last_mut() {
                        Some(last) if !missing => *last = slot,
                        _ => value.names.push(slot),
                    }
                }
                _ => return Err(not_found("binding")),
            }
            let before = if declare {
                vec![snippet::statement(&format!("var {err} error"), ids, Vec::new())?]
            } else {
                Vec::new()
            };
            let check = snippet::statement(&format!("if {err} != nil {{\n{failure}\n}}"), ids, Vec::new())?;
            Ok(Rebuilt {
                before,
                primary,
                after: vec![check],
            })
        }
        Edit::Guard {
            err,
            collapse,
            missing,
            declare,
            failure,
        } => {
            let (label, mut target) = match primary.kind {
                StmtKind::Labeled { label, stmt } => (Some((label, primary.id, primary.span)), *stmt),
                kind => (
                    None,
                    Stmt {
                        id: primary.id,
                        kind,
                        span: primary.span,
                        decs: primary.decs,
                    },
                ),
            };
            let init = match &mut target.kind {
                StmtKind::If(s) => s.init.take(),
                StmtKind::Switch(s) => s.init.take(),
                StmtKind::TypeSwitch(s) => s.init.take(),
                _ => None,
            };
            let mut init = *init.ok_or_else(|| not_found("init clause"))?;
            let init = match collapse {
                Some(blanks) => {
                    let placeholder = snippet::ident("_", ids);
                    let moved = take_expr(&mut init, call, placeholder).ok_or_else(|| not_found("call"))?;
                    snippet::statement(&format!("{blanks}{err} := {}", hole(0)), ids, vec![moved])?
                }
                None => {
                    let StmtKind::Assign { lhs, .. } = &mut init.kind else {
                        return Err(not_found("binding"));
                    };
                    let slot = snippet::ident(&err, ids);
                    match lhs.last_mut() {
                        Some(last) if !missing => *last = slot,
                        _ => lhs.push(slot),
                    }
                    init
                }
            };
            let target = match label {
                Some((label, id, span)) => Stmt {
                    id,
                    kind: StmtKind::Labeled {
                        label,
                        stmt: Box::new(target),
                    },
                    span,
                    decs: Decorations::default(),
                },
                None => target,
            };

            let mut guard = snippet::statement(&format!("if {err} != nil {{\n{failure}\n}} else {{\n}}"), ids, Vec::new())?;
            let StmtKind::If(check) = &mut guard.kind else {
                return Err(Error::Generation("guard is not an if statement".into()));
            };
            check.init = Some(Box::new(init));
            let chained = matches!(target.kind, StmtKind::If(_));
            match (check.els.as_deref_mut(), chained) {
                (Some(els), true) => *els = target,
                (
                    Some(Stmt {
                        kind: StmtKind::Block(block),
                        ..
                    }),
                    false,
                ) => block.stmts.push(target),
                _ => return Err(Error::Generation("guard has no else branch".into())),
            }
            let before = if declare {
                vec![snippet::statement(&format!("var {err} error"), ids, Vec::new())?]
            } else {
                Vec::new()
            };
            Ok(Rebuilt {
                before,
                primary: guard,
                after: Vec::new(),
            })
        }
        Edit::Lift { .. } | Edit::Global { .. } => Err(Error::Generation("edit does not apply to a statement".into())),
    }
}

fn apply_global(dest: &mut DestFile, anchor: NodeId, mut edits: Vec<(Edit, NodeId)>) -> Result<()> {
    if edits.len() != 1 {
        return Err(Error::Generation("initializer holds more than one discard".into()));
    }
    let Some((
        Edit::Global {
            missing,
            values,
            types,
            err,
            failure,
        },
        call,
    )) = edits.pop()
    else {
        return Err(Error::Generation("not an initializer edit".into()));
    };

    let text = if values.is_empty() {
        format!(
            "func() struct{{}} {{\n\tif {err} := {}; {err} != nil {{\n{failure}\n\t}}\n\treturn struct{{}}{{}}\n}}()",
            hole(0)
        )
    } else {
        let names = values.join(", ");
        let ret = match types.as_slice() {
            [single] => single.clone(),
            many => format!("({})", many.join(", ")),
        };
        format!(
            "func() {ret} {{\n\t{names}, {err} := {}\n\tif {err} != nil {{\n{failure}\n\t}}\n\treturn {names}\n}}()",
            hole(0)
        )
    };

    let DestFile { ast, ids, .. } = &mut *dest;
    let Some(NodeMut::Spec(spec)) = find_mut(NodeMut::File(ast), anchor) else {
        return Err(not_found("initializer"));
    };
    let backup = spec.clone();
    let SpecKind::Value(value) = &mut spec.kind else {
        return Err(not_found("initializer"));
    };
    let moved = match value.values.as_mut_slice() {
        [only] if only.id == call || contains_expr(only, call) => {
            let placeholder = snippet::ident("_", ids);
            Some(std::mem::replace(only, placeholder))
        }
        _ => None,
    };
    let Some(moved) = moved else {
        return Err(not_found("initializer call"));
    };
    match snippet::expression_with(&text, ids, vec![moved]) {
        Ok(expr) => {
            value.values = vec![expr];
            if !missing && !values.is_empty() {
                value.names.pop();
            }
        }
        Err(e) => {
            *spec = backup;
            return Err(e);
        }
    }
    dest.mark_dirty(anchor);
    Ok(())
}

fn contains_expr(expr: &Expr, id: NodeId) -> bool {
    let mut found = false;
    walk(NodeRef::Expr(expr), &mut |node, _| {
        found |= node.id() == id;
        !found
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Detector, Filter};
    use crate::config::Level;
    use crate::rewrite::propagate::Propagator;
    use crate::testkit::load_single;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn fix_with(source: &str, config: &FixConfig) -> (Outcome, String) {
        let (dir, mut program) = load_single(source);
        let filter = Filter::new(&[], &[], true).unwrap();
        let points = Detector::new(&program, &filter, false).detect();
        let mut dests = DestCache::new();
        let plan = Propagator::new(&program, &filter, config.level, false)
            .run(&mut program, &mut dests, points)
            .unwrap();
        let outcome = Injector::new(config).run(&program, &mut dests, &plan).unwrap();
        let text = dests
            .finish()
            .into_iter()
            .map(|r| r.text)
            .next()
            .unwrap_or_else(|| source.to_string());
        drop(dir);
        (outcome, text)
    }

    fn fix(source: &str) -> (Outcome, String) {
        fix_with(source, &FixConfig::new("."))
    }

    #[test]
    fn bare_call_in_main_is_fatal() {
        let (outcome, text) = fix(indoc! {r#"
            package main

            import "os"

            func main() {
                // clean up
                os.Remove("tmp")
            }
        "#});
        assert_eq!(outcome.handled, 1);
        assert_eq!(
            text,
            indoc! {r#"
                package main

                import (
                	"log"
                	"os"
                )

                func main() {
                	// clean up
                	if err := os.Remove("tmp"); err != nil {
                		log.Fatal(err)
                	}
                }
            "#}
        );
    }

    #[test]
    fn discarded_binding_returns_with_zero_values() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "strconv"

            func parse(s string) (int, error) {
                n, _ := strconv.Atoi(s)
                return n, nil
            }

            func main() {
                parse("1")
            }
        "#});
        assert!(
            text.contains("\tn, err := strconv.Atoi(s)\n\tif err != nil {\n\t\treturn 0, err\n\t}\n\treturn n, nil\n"),
            "{text}"
        );
    }

    #[test]
    fn error_parameters_are_not_clobbered() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "os"

            func cleanup(path string, err error) error {
                n, _ := os.Stat(path)
                _ = n
                return err
            }

            func main() {
                _ = cleanup("x", nil)
            }
        "#});
        assert!(text.contains("n, statErr := os.Stat(path)\n\tif statErr != nil {\n\t\treturn statErr\n\t}"), "{text}");
    }

    #[test]
    fn conditions_are_hoisted_into_a_binding() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "strconv"

            func count(s string) int {
                n, _ := strconv.Atoi(s)
                return n
            }

            func main() {
                if count("3") > 2 {
                    println("big")
                }
            }
        "#});
        assert!(text.contains("func count(s string) (int, error) {"), "{text}");
        assert!(
            text.contains("\tres, err := count(\"3\")\n\tif err != nil {\n\t\tlog.Fatal(err)\n\t}\n\tif res > 2 {"),
            "{text}"
        );
    }

    #[test]
    fn goroutines_and_defers_get_closures() {
        let (outcome, text) = fix(indoc! {r#"
            package main

            import "os"

            func main() {
                f, _ := os.Open("x")
                defer f.Close()
                go os.Remove("y")
            }
        "#});
        assert_eq!(outcome.skipped, 0);
        assert!(
            text.contains("\tdefer func() {\n\t\tif err := f.Close(); err != nil {\n\t\t\tlog.Fatal(err)\n\t\t}\n\t}()"),
            "{text}"
        );
        assert!(
            text.contains("\tgo func() {\n\t\tif err := os.Remove(\"y\"); err != nil {\n\t\t\tlog.Fatal(err)\n\t\t}\n\t}()"),
            "{text}"
        );
    }

    #[test]
    fn defers_in_error_returning_functions_join_into_the_result() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "os"

            func write(path string) error {
                f, ferr := os.Create(path)
                if ferr != nil {
                    return ferr
                }
                defer f.Close()
                return nil
            }

            func main() {
                _ = write("x")
            }
        "#});
        assert!(text.contains("func write(path string) (err error) {"), "{text}");
        assert!(text.contains("defer func() {\n\t\terr = errors.Join(err, f.Close())\n\t}()"), "{text}");
        assert!(text.contains("\"errors\""), "{text}");
    }

    #[test]
    fn safe_level_logs_with_the_callee_name() {
        let mut config = FixConfig::new(".");
        config.level = Level::Safe;
        let (_, text) = fix_with(
            indoc! {r#"
                package main

                import "os"

                func tidy() {
                    os.Remove("a")
                }

                func main() {
                    tidy()
                }
            "#},
            &config,
        );
        assert!(
            text.contains("if err := os.Remove(\"a\"); err != nil {\n\t\tlog.Printf(\"os.Remove: %v\", err)\n\t}"),
            "{text}"
        );
    }

    #[test]
    fn exit_strategy_prints_and_exits() {
        let mut config = FixConfig::new(".");
        config.terminal = TerminalStrategy::Exit;
        let (_, text) = fix_with(
            indoc! {r#"
                package main

                import "os"

                func main() {
                    os.Remove("a")
                }
            "#},
            &config,
        );
        assert!(
            text.contains("\t\tfmt.Fprintln(os.Stderr, err)\n\t\tos.Exit(1)\n"),
            "{text}"
        );
    }

    #[test]
    fn package_initializers_become_checked_closures() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "strconv"

            var limit, _ = strconv.Atoi("10")

            func main() {
                println(limit)
            }
        "#});
        assert!(
            text.contains("var limit = func() int {\n\tv, err := strconv.Atoi(\"10\")\n\tif err != nil {\n\t\tlog.Fatal(err)\n\t}\n\treturn v\n}()"),
            "{text}"
        );
    }

    #[test]
    fn aggressive_level_converts_panics() {
        let mut config = FixConfig::new(".");
        config.level = Level::Aggressive;
        let (outcome, text) = fix_with(
            indoc! {r#"
                package main

                import "os"

                func prepare(dir string) {
                    if dir == "" {
                        panic("no dir")
                    }
                    os.Mkdir(dir, 0755)
                }

                func main() {
                    prepare("out")
                }
            "#},
            &config,
        );
        assert_eq!(outcome.panics, 1);
        assert!(text.contains("return fmt.Errorf(\"%s\", \"no dir\")"), "{text}");
        assert!(text.contains("if err := os.Mkdir(dir, 0755); err != nil {\n\t\treturn err\n\t}"), "{text}");
    }

    #[test]
    fn tests_report_through_the_testing_handle() {
        let (_dir, mut program) = crate::testkit::load(&[
            ("main.go", "package main\n\nfunc main() {}\n"),
            (
                "main_test.go",
                indoc! {r#"
                    package main

                    import (
                    	"os"
                    	"testing"
                    )

                    func TestRemove(t *testing.T) {
                    	os.Remove("x")
                    }
                "#},
            ),
        ]);
        let config = FixConfig::new(".");
        let filter = Filter::new(&[], &[], true).unwrap();
        let points = Detector::new(&program, &filter, false).detect();
        let mut dests = DestCache::new();
        let plan = Propagator::new(&program, &filter, config.level, false)
            .run(&mut program, &mut dests, points)
            .unwrap();
        Injector::new(&config).run(&program, &mut dests, &plan).unwrap();
        let text = dests.finish().into_iter().map(|r| r.text).collect::<String>();
        assert!(text.contains("if err := os.Remove(\"x\"); err != nil {\n\t\tt.Fatal(err)\n\t}"), "{text}");
        assert!(!text.contains("\"log\""), "{text}");
    }

    #[test]
    fn if_initializers_are_checked_ahead_of_the_condition() {
        let (outcome, text) = fix(indoc! {r#"
            package main

            import (
                "os"
                "strconv"
            )

            func main() {
                if v, _ := strconv.Atoi(os.Args[1]); v > 0 {
                    println(v)
                } else {
                    println("none")
                }
            }
        "#});
        assert_eq!(outcome.handled, 1);
        assert!(
            text.contains(concat!(
                "\tif v, err := strconv.Atoi(os.Args[1]); err != nil {\n",
                "\t\tlog.Fatal(err)\n",
                "\t} else if v > 0 {\n",
                "\t\tprintln(v)\n",
                "\t} else {\n",
                "\t\tprintln(\"none\")\n",
                "\t}\n",
            )),
            "{text}"
        );
    }

    #[test]
    fn switch_initializers_move_the_switch_into_the_else_branch() {
        let (outcome, text) = fix(indoc! {r#"
            package main

            import "os"

            func main() {
                path := "tmp"
            loop:
                switch os.Remove(path); path {
                case "tmp":
                    break loop
                }
            }
        "#});
        assert_eq!(outcome.handled, 1);
        assert!(text.contains("\tif err := os.Remove(path); err != nil {\n\t\tlog.Fatal(err)\n\t} else {\n"), "{text}");
        assert!(text.contains("loop:\n\t\tswitch path {\n"), "{text}");
        assert!(text.contains("\t\t\tbreak loop\n"), "{text}");
    }

    #[test]
    fn initializer_errors_avoid_names_used_in_the_chain() {
        let (_, text) = fix(indoc! {r#"
            package main

            import (
                "errors"
                "os"
            )

            func main() {
                err := errors.New("outer")
                if os.Remove("tmp"); err != nil {
                    println(err.Error())
                }
            }
        "#});
        assert!(text.contains("\tif err2 := os.Remove(\"tmp\"); err2 != nil {\n\t\tlog.Fatal(err2)\n\t} else if err != nil {\n"), "{text}");
    }

    #[test]
    fn trailing_comments_follow_the_rebuilt_statement() {
        let (_, text) = fix(indoc! {r#"
            package main

            import "os"

            func main() {
                os.Remove("tmp") // best effort
            }
        "#});
        assert!(
            text.contains("\tif err := os.Remove(\"tmp\"); err != nil {\n\t\tlog.Fatal(err)\n\t} // best effort\n"),
            "{text}"
        );
        assert!(!text.contains("\t// best effort\n"), "{text}");
    }
}
