//! Discard detection.
//!
//! Every call whose callee currently returns `error` in its last slot is
//! classified by the syntactic position it sits in. Positions that already
//! consume the error (a checked binding, a forwarding `return`, a comparison
//! of a single `error` result) are not reported; every other shape becomes
//! an [`InjectionPoint`].
//!
//! Signatures are always read through the object arena, so a function that
//! gained an `error` result earlier in the same iteration is seen with its
//! new shape.

use tracing::{debug, info};

use super::directive::directive_for;
use super::enclosing::from_path;
use super::filter::Filter;
use crate::loader::{FileRef, Program, SourceFile};
use crate::syntax::ast::*;
use crate::syntax::node::{path_to, walk_paths, Edge, NodeRef};
use crate::syntax::Position;
use crate::types::{ObjId, ObjKind, SelectionKind, Signature, Type, TypeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardKind {
    /// `f()`
    Bare,
    /// `x, _ := f()` or `_ = f()`; `missing` when the left side has no slot
    /// for the error at all.
    Assign { define: bool, missing: bool },
    /// `defer f()`
    Deferred,
    /// `go f()`
    Background,
    /// `if f() > 0 {`, `switch f() {`
    Condition,
    /// `f().Field`
    Chained,
    /// Any other operand position of a multi-result call.
    Embedded,
    /// Package-level `var x, _ = f()`.
    Global { missing: bool },
}

impl DiscardKind {
    pub fn label(self) -> &'static str {
        match self {
            DiscardKind::Bare => "bare call",
            DiscardKind::Assign { missing: false, .. } => "discarded binding",
            DiscardKind::Assign { missing: true, .. } => "missing binding",
            DiscardKind::Deferred => "deferred call",
            DiscardKind::Background => "goroutine call",
            DiscardKind::Condition => "condition",
            DiscardKind::Chained => "chained call",
            DiscardKind::Embedded => "embedded call",
            DiscardKind::Global { .. } => "package initializer",
        }
    }
}

/// Static call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Function(ObjId),
    Method(ObjId),
    /// A variable of function type.
    FuncVar(ObjId),
    Dynamic,
}

impl Callee {
    pub fn object(self) -> Option<ObjId> {
        match self {
            Callee::Function(obj) | Callee::Method(obj) | Callee::FuncVar(obj) => Some(obj),
            Callee::Dynamic => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InjectionPoint {
    pub file: FileRef,
    pub call: NodeId,
    /// Innermost statement held directly by a statement list (or the spec,
    /// for package-level initializers). Edits are anchored here.
    pub stmt: NodeId,
    pub kind: DiscardKind,
    pub callee: Callee,
    pub position: Position,
    /// Result count of the callee, the error included.
    pub results: usize,
    /// False where hoisting the call would change evaluation order or land
    /// outside a statement list.
    pub rewritable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    File,
    Symbol(String),
    Directive(Option<String>),
}

/// Verdict for one call site.
#[derive(Debug, Clone)]
pub enum Site {
    Discarded(InjectionPoint),
    Checked,
    Suppressed(Suppression),
}

pub(crate) struct Shape {
    pub kind: DiscardKind,
    pub stmt: NodeId,
    pub rewritable: bool,
}

enum Outcome {
    Kind(DiscardKind),
    Checked,
    Other,
}

pub struct Detector<'a> {
    program: &'a Program,
    filter: &'a Filter,
    verbose: bool,
}

impl<'a> Detector<'a> {
    pub fn new(program: &'a Program, filter: &'a Filter, verbose: bool) -> Self {
        Self {
            program,
            filter,
            verbose,
        }
    }

    /// Points in unit, file and source order.
    pub fn detect(&self) -> Vec<InjectionPoint> {
        let mut points = Vec::new();
        for (file_ref, file) in self.program.files() {
            if self.filter.excludes_file(&file.path) {
                debug!(path = %file.path.display(), "skipping file matched by exclusion glob");
                continue;
            }
            walk_paths(NodeRef::File(&file.ast), &mut |path| {
                if let Some(Site::Discarded(point)) = self.inspect(file_ref, file, path, 0) {
                    points.push(point);
                }
                true
            });
        }
        points
    }

    /// Classifies the call `call` as it reads now.
    pub fn site(&self, file_ref: FileRef, call: NodeId) -> Option<Site> {
        self.site_with(file_ref, call, 0)
    }

    /// Classifies `call` as if its callee returned `extra` more results.
    pub fn site_with(&self, file_ref: FileRef, call: NodeId, extra: usize) -> Option<Site> {
        let file = self.program.file(file_ref);
        let path = path_to(NodeRef::File(&file.ast), call)?;
        self.inspect(file_ref, file, &path, extra)
    }

    fn inspect(
        &self,
        file_ref: FileRef,
        file: &SourceFile,
        path: &[(Option<Edge>, NodeRef<'_>)],
        extra: usize,
    ) -> Option<Site> {
        let NodeRef::Expr(expr) = path.last()?.1 else {
            return None;
        };
        let ExprKind::Call { fun, .. } = &expr.kind else {
            return None;
        };
        let callee = resolve_callee(self.program, fun)?;
        let sig = current_signature(self.program, callee, fun)?;
        let returns_error = self.program.store.ends_in_error(&sig);
        if !returns_error && extra == 0 {
            return None;
        }
        let results = sig.results.len() + extra;
        let forward = from_path(self.program, &path[..path.len() - 1])
            .and_then(|ctx| ctx.signature)
            .filter(|sig| self.program.store.ends_in_error(sig))
            .map(|sig| sig.results.len());
        let Some(shape) = classify(path, results, forward) else {
            return Some(Site::Checked);
        };

        if self.filter.excludes_file(&file.path) {
            return Some(Site::Suppressed(Suppression::File));
        }
        let name = symbol(&self.program.store, callee);
        if let Some(name) = &name {
            if self.filter.excludes_symbol(name) {
                debug!(symbol = %name, "skipping call matched by symbol exclusion");
                return Some(Site::Suppressed(Suppression::Symbol(name.clone())));
            }
        }
        if let Some(directive) = self.directive(file, path, shape.stmt) {
            debug!(
                path = %file.path.display(),
                reason = directive.as_deref().unwrap_or("none given"),
                "skipping call under ignore directive"
            );
            return Some(Site::Suppressed(Suppression::Directive(directive)));
        }

        let position = self.program.position(file_ref, expr.span.start);
        let point = InjectionPoint {
            file: file_ref,
            call: expr.id,
            stmt: shape.stmt,
            kind: shape.kind,
            callee,
            position,
            results,
            rewritable: shape.rewritable,
        };
        if self.verbose {
            info!(
                "{}:{}: {} discards the error of {}",
                file.path.display(),
                position,
                shape.kind.label(),
                name.as_deref().unwrap_or("a dynamic call")
            );
        }
        Some(Site::Discarded(point))
    }

    /// Directive on the anchor statement, on any statement between the
    /// anchor and the call, or on the declaration around a package-level
    /// spec.
    fn directive(&self, file: &SourceFile, path: &[(Option<Edge>, NodeRef<'_>)], anchor: NodeId) -> Option<Option<String>> {
        let start = path.iter().position(|(_, node)| node.id() == anchor)?;
        let mut candidates: Vec<NodeId> = path[start..]
            .iter()
            .filter(|(_, node)| matches!(node, NodeRef::Stmt(_) | NodeRef::Spec(_)))
            .map(|(_, node)| node.id())
            .collect();
        if let Some((_, NodeRef::Decl(decl))) = start.checked_sub(1).and_then(|i| path.get(i)) {
            candidates.push(decl.id);
        }
        candidates
            .into_iter()
            .find_map(|id| directive_for(file, id))
            .map(|d| d.reason)
    }
}

/// Static target of a call, or `None` when the call is a conversion or a
/// builtin.
pub fn resolve_callee(program: &Program, fun: &Expr) -> Option<Callee> {
    let store = &program.store;
    let fun = fun.unparen();
    let from_object = |obj: ObjId| match store.obj(obj).kind {
        ObjKind::Func => Some(Callee::Function(obj)),
        ObjKind::Var => Some(Callee::FuncVar(obj)),
        ObjKind::TypeName | ObjKind::Builtin(_) | ObjKind::Nil | ObjKind::Const | ObjKind::PkgName(_) => None,
    };
    match &fun.kind {
        ExprKind::Ident(ident) => match program.info.uses.get(&ident.id) {
            Some(&obj) => from_object(obj),
            None => Some(Callee::Dynamic),
        },
        ExprKind::Selector { sel, .. } => match program.info.selections.get(&fun.id) {
            Some(selection) => match (selection.kind, selection.obj) {
                (SelectionKind::Method | SelectionKind::MethodExpr, Some(obj)) => Some(Callee::Method(obj)),
                _ => Some(Callee::Dynamic),
            },
            None => match program.info.uses.get(&sel.id) {
                Some(&obj) => from_object(obj),
                None => Some(Callee::Dynamic),
            },
        },
        ExprKind::Index { x, .. } => match resolve_callee(program, x)? {
            Callee::Function(obj) => Some(Callee::Function(obj)),
            Callee::Method(obj) => Some(Callee::Method(obj)),
            _ => Some(Callee::Dynamic),
        },
        ExprKind::Star(inner) => match inner.unparen().as_ident().and_then(|i| program.info.uses.get(&i.id)) {
            Some(&obj) if store.obj(obj).kind == ObjKind::TypeName => None,
            _ => Some(Callee::Dynamic),
        },
        ExprKind::ArrayType { .. }
        | ExprKind::MapType { .. }
        | ExprKind::ChanType { .. }
        | ExprKind::FuncType(_)
        | ExprKind::InterfaceType(_)
        | ExprKind::StructType(_) => None,
        _ => Some(Callee::Dynamic),
    }
}

/// Signature a call to `callee` has right now.
pub fn current_signature(program: &Program, callee: Callee, fun: &Expr) -> Option<Signature> {
    let store = &program.store;
    let ty = match callee {
        Callee::Function(obj) | Callee::Method(obj) => return store.signature(obj).cloned(),
        Callee::FuncVar(obj) => store.obj(obj).ty.clone(),
        Callee::Dynamic => program.info.type_of(fun.id)?.clone(),
    };
    match store.underlying(&ty) {
        Type::Func(sig) => Some(*sig),
        _ => None,
    }
}

/// Qualified name matched against symbol exclusion globs:
/// `pkg/path.Func`, `(*pkg/path.T).M`, `(pkg/path.I).M`, `pkg/path.var`.
pub fn symbol(store: &TypeStore, callee: Callee) -> Option<String> {
    let qualified = |obj: ObjId| {
        let object = store.obj(obj);
        match object.pkg {
            Some(pkg) => format!("{}.{}", store.package(pkg).path, object.name),
            None => object.name.clone(),
        }
    };
    match callee {
        Callee::Function(obj) | Callee::FuncVar(obj) => Some(qualified(obj)),
        Callee::Method(obj) => {
            let method = store.obj(obj);
            let recv = method.recv?;
            let type_name = qualified(store.named(recv.named?).obj);
            let star = if recv.pointer { "*" } else { "" };
            Some(format!("({star}{type_name}).{}", method.name))
        }
        Callee::Dynamic => None,
    }
}

fn is_paren(node: &NodeRef<'_>) -> bool {
    matches!(node, NodeRef::Expr(e) if matches!(e.kind, ExprKind::Paren(_)))
}

fn is_condition_wrapper(node: &NodeRef<'_>) -> bool {
    matches!(
        node,
        NodeRef::Expr(Expr {
            kind: ExprKind::Paren(_)
                | ExprKind::Unary {
                    op: UnaryOp::Not | UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Xor,
                    ..
                },
            ..
        })
    )
}

/// Whether the statement at `index` sits directly in a statement list.
fn list_level(path: &[(Option<Edge>, NodeRef<'_>)], index: usize) -> bool {
    let (Some(edge), NodeRef::Stmt(stmt)) = path[index] else {
        return false;
    };
    let Some(parent) = index.checked_sub(1).map(|i| path[i].1) else {
        return false;
    };
    match parent {
        NodeRef::Block(_) => {
            edge.field == "list" && !matches!(stmt.kind, StmtKind::Case(_) | StmtKind::Comm(_))
        }
        NodeRef::Stmt(outer) => {
            edge.field == "body" && matches!(outer.kind, StmtKind::Case(_) | StmtKind::Comm(_))
        }
        _ => false,
    }
}

/// `(immediate statement, anchor statement, rewritable)` for the node at
/// `from`.
fn anchor(path: &[(Option<Edge>, NodeRef<'_>)], from: usize) -> Option<(usize, usize, bool)> {
    let immediate = (0..=from).rev().find(|&i| matches!(path[i].1, NodeRef::Stmt(_)))?;
    if list_level(path, immediate) {
        return Some((immediate, immediate, true));
    }
    let labeled = immediate.checked_sub(1).filter(|&i| {
        matches!(path[i].1, NodeRef::Stmt(Stmt { kind: StmtKind::Labeled { .. }, .. })) && list_level(path, i)
    });
    if let Some(label) = labeled {
        return Some((immediate, label, true));
    }
    let outer = (0..immediate)
        .rev()
        .find(|&i| matches!(path[i].1, NodeRef::Stmt(_)) && list_level(path, i))?;
    Some((immediate, outer, false))
}

/// Whether the statement at `immediate` is the init clause of the `if` or
/// `switch` anchored at `anchor`. Inits of `else if` and `for` statements
/// are not.
fn is_init_clause(path: &[(Option<Edge>, NodeRef<'_>)], immediate: usize, anchor: usize) -> bool {
    let Some(owner) = immediate.checked_sub(1) else {
        return false;
    };
    let direct = owner == anchor
        || (owner == anchor + 1
            && matches!(path[anchor].1, NodeRef::Stmt(Stmt { kind: StmtKind::Labeled { .. }, .. })));
    direct
        && path[immediate].0.is_some_and(|edge| edge.field == "init")
        && matches!(
            path[owner].1,
            NodeRef::Stmt(Stmt {
                kind: StmtKind::If(_) | StmtKind::Switch(_) | StmtKind::TypeSwitch(_),
                ..
            })
        )
}

fn binding(slots: usize, last_blank: bool, values: usize, results: usize, define: bool) -> Outcome {
    if values != 1 {
        return Outcome::Other;
    }
    if slots == results {
        if last_blank {
            Outcome::Kind(DiscardKind::Assign { define, missing: false })
        } else {
            Outcome::Checked
        }
    } else if slots < results {
        Outcome::Kind(DiscardKind::Assign { define, missing: true })
    } else {
        Outcome::Checked
    }
}

/// Shape of the call at the end of `path`. `results` is the callee's result
/// count; `forward` is the enclosing function's result count when that
/// function returns `error`. `None` means the error is consumed.
pub(crate) fn classify(path: &[(Option<Edge>, NodeRef<'_>)], results: usize, forward: Option<usize>) -> Option<Shape> {
    let call = path.len().checked_sub(1)?;
    let multi = results >= 2;
    let mut top = call;
    while top > 0 && is_paren(&path[top - 1].1) {
        top -= 1;
    }
    let parent_index = top.checked_sub(1)?;
    let edge = path[top].0?;
    let parent = path[parent_index].1;

    if let NodeRef::Spec(spec) = parent {
        if let (SpecKind::Value(value), Some((_, NodeRef::Decl(_)))) =
            (&spec.kind, parent_index.checked_sub(1).map(|i| path[i]))
        {
            return match binding(
                value.names.len(),
                value.names.last().is_some_and(Ident::is_blank),
                value.values.len(),
                results,
                true,
            ) {
                Outcome::Kind(DiscardKind::Assign { missing, .. }) => Some(Shape {
                    kind: DiscardKind::Global { missing },
                    stmt: spec.id,
                    rewritable: value.ty.is_none() || value.names.len() == 1,
                }),
                Outcome::Checked => None,
                Outcome::Kind(_) | Outcome::Other => multi.then_some(Shape {
                    kind: DiscardKind::Embedded,
                    stmt: spec.id,
                    rewritable: false,
                }),
            };
        }
    }

    let mut outcome = match parent {
        NodeRef::Stmt(stmt) => match (&stmt.kind, edge.field) {
            (StmtKind::Expr(_), _) => Outcome::Kind(DiscardKind::Bare),
            (StmtKind::Go(_), _) => Outcome::Kind(DiscardKind::Background),
            (StmtKind::Defer(_), _) => Outcome::Kind(DiscardKind::Deferred),
            (StmtKind::Assign { lhs, op, rhs }, "rhs") => match op {
                AssignOp::Op(_) => Outcome::Other,
                _ => binding(
                    lhs.len(),
                    lhs.last().is_some_and(Expr::is_blank),
                    rhs.len(),
                    results,
                    *op == AssignOp::Define,
                ),
            },
            (StmtKind::Return(values), "results") => {
                if values.len() == 1 && forward == Some(results) {
                    Outcome::Checked
                } else {
                    Outcome::Other
                }
            }
            _ => Outcome::Other,
        },
        NodeRef::Spec(spec) => match &spec.kind {
            SpecKind::Value(value) => binding(
                value.names.len(),
                value.names.last().is_some_and(Ident::is_blank),
                value.values.len(),
                results,
                true,
            ),
            _ => Outcome::Other,
        },
        NodeRef::Expr(Expr {
            kind: ExprKind::Selector { .. },
            ..
        }) if edge.field == "x" && multi => Outcome::Kind(DiscardKind::Chained),
        _ => Outcome::Other,
    };

    if matches!(outcome, Outcome::Other) && multi {
        let mut cond_top = top;
        while cond_top > 0 && is_condition_wrapper(&path[cond_top - 1].1) {
            cond_top -= 1;
        }
        let is_condition = cond_top > 0
            && match (path[cond_top - 1].1, path[cond_top].0) {
                (NodeRef::Stmt(Stmt { kind: StmtKind::If(_), .. }), Some(edge)) => edge.field == "cond",
                (NodeRef::Stmt(Stmt { kind: StmtKind::Switch(_), .. }), Some(edge)) => edge.field == "tag",
                _ => false,
            };
        outcome = Outcome::Kind(if is_condition {
            DiscardKind::Condition
        } else {
            DiscardKind::Embedded
        });
    }
    let kind = match outcome {
        Outcome::Kind(kind) => kind,
        Outcome::Checked | Outcome::Other => return None,
    };

    let Some((immediate, anchor_index, mut rewritable)) = anchor(path, parent_index) else {
        // Nested inside a package-level initializer.
        let spec = path.iter().rev().find_map(|(_, node)| match node {
            NodeRef::Spec(spec) => Some(spec.id),
            _ => None,
        })?;
        return Some(Shape {
            kind: DiscardKind::Embedded,
            stmt: spec,
            rewritable: false,
        });
    };

    if !rewritable && matches!(kind, DiscardKind::Bare | DiscardKind::Assign { .. }) {
        rewritable = is_init_clause(path, immediate, anchor_index);
    }
    if let NodeRef::Spec(spec) = parent {
        if let (SpecKind::Value(value), NodeRef::Stmt(Stmt { kind: StmtKind::Decl(gen), .. })) =
            (&spec.kind, path[parent_index - 1].1)
        {
            rewritable &= value.ty.is_none() && gen.specs.len() == 1;
        }
    }
    if matches!(kind, DiscardKind::Embedded | DiscardKind::Condition | DiscardKind::Chained) {
        for step in immediate + 1..=call {
            let (Some(edge), _) = path[step] else {
                continue;
            };
            match path[step - 1].1 {
                NodeRef::Expr(Expr {
                    kind:
                        ExprKind::Binary {
                            op: BinaryOp::LAnd | BinaryOp::LOr,
                            ..
                        },
                    ..
                }) if edge.field == "y" => rewritable = false,
                NodeRef::Stmt(Stmt { kind: StmtKind::For(_), .. }) if edge.field == "cond" => rewritable = false,
                NodeRef::Expr(Expr {
                    kind: ExprKind::FuncLit(_),
                    ..
                }) => break,
                _ => {}
            }
        }
    }

    Some(Shape {
        kind,
        stmt: path[anchor_index].1.id(),
        rewritable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::load_single;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn detect(source: &str) -> Vec<(DiscardKind, bool)> {
        let (_dir, program) = load_single(source);
        let filter = Filter::new(&[], &[], true).expect("filter");
        Detector::new(&program, &filter, false)
            .detect()
            .into_iter()
            .map(|p| (p.kind, p.rewritable))
            .collect()
    }

    #[test]
    fn statement_level_shapes() {
        let points = detect(indoc! {r#"
            package main

            import "os"

            func pair() (int, error) { return 0, nil }

            func run() {
                os.Remove("a")
                _ = os.Remove("b")
                n, _ := pair()
                defer os.Remove("c")
                go os.Remove("d")
                _ = n
            }
        "#});
        assert_eq!(
            points,
            vec![
                (DiscardKind::Bare, true),
                (DiscardKind::Assign { define: false, missing: false }, true),
                (DiscardKind::Assign { define: true, missing: false }, true),
                (DiscardKind::Deferred, true),
                (DiscardKind::Background, true),
            ]
        );
    }

    #[test]
    fn checked_errors_are_not_reported() {
        let points = detect(indoc! {r#"
            package main

            import "os"

            func pair() (int, error) { return 0, nil }

            func run() error {
                if err := os.Remove("a"); err != nil {
                    return err
                }
                n, err := pair()
                if os.Remove("b") != nil {
                    return nil
                }
                _ = n
                return os.Remove("c")
            }

            func forward() (int, error) {
                return pair()
            }
        "#});
        assert_eq!(points, vec![]);
    }

    #[test]
    fn expression_shapes_of_multi_result_calls() {
        let points = detect(indoc! {r#"
            package main

            type box struct{ n int }

            func pair() (int, error) { return 0, nil }
            func ready() (bool, error) { return true, nil }
            func load() (*box, error) { return nil, nil }
            func use(int) {}

            func run(ok bool) {
                if !ready() {
                }
                if pair() > 1 {
                }
                _ = load().n
                use(pair())
                if ok && pair() > 0 {
                }
            }
        "#});
        assert_eq!(
            points,
            vec![
                (DiscardKind::Condition, true),
                (DiscardKind::Embedded, true),
                (DiscardKind::Chained, true),
                (DiscardKind::Embedded, true),
                (DiscardKind::Embedded, false),
            ]
        );
    }

    #[test]
    fn package_initializers_and_missing_slots() {
        let points = detect(indoc! {r#"
            package main

            func pair() (int, error) { return 0, nil }

            var total, _ = pair()

            func run() {
                n := pair()
                _ = n
            }
        "#});
        assert_eq!(
            points,
            vec![
                (DiscardKind::Global { missing: false }, true),
                (DiscardKind::Assign { define: true, missing: true }, true),
            ]
        );
    }

    #[test]
    fn if_and_switch_initializers_are_rewritable() {
        let points = detect(indoc! {r#"
            package main

            import (
                "os"
                "strconv"
            )

            func run(s string) {
                if v, _ := strconv.Atoi(s); v > 0 {
                }
                switch os.Remove(s); s {
                }
            L:
                switch n, _ := strconv.Atoi(s); n {
                case 1:
                    break L
                }
            }
        "#});
        assert_eq!(
            points,
            vec![
                (DiscardKind::Assign { define: true, missing: false }, true),
                (DiscardKind::Bare, true),
                (DiscardKind::Assign { define: true, missing: false }, true),
            ]
        );
    }

    #[test]
    fn else_if_and_for_initializers_are_not_rewritable() {
        let points = detect(indoc! {r#"
            package main

            import "os"

            func run(ok bool) {
                if ok {
                } else if os.Remove("x"); ok {
                }
                for os.Remove("y"); ok; {
                }
            }
        "#});
        assert_eq!(points, vec![(DiscardKind::Bare, false), (DiscardKind::Bare, false)]);
    }

    #[test]
    fn symbols_use_package_paths_and_receivers() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            import (
                "os"
                "strings"
            )

            type store struct{}

            func (s *store) Save() error { return nil }

            func run(s *store, b *strings.Builder) {
                s.Save()
                os.Remove("x")
                b.WriteString("y")
            }
        "#});
        let filter = Filter::new(&[], &[], false).expect("filter");
        let names: Vec<Option<String>> = Detector::new(&program, &filter, false)
            .detect()
            .into_iter()
            .map(|p| symbol(&program.store, p.callee))
            .collect();
        assert_eq!(
            names,
            vec![
                Some("(*example.com/app.store).Save".to_string()),
                Some("os.Remove".to_string()),
                Some("(*strings.Builder).WriteString".to_string()),
            ]
        );
    }

    #[test]
    fn directives_and_symbol_globs_suppress() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            import "os"

            func run() {
                // errfix:ignore -- temp file
                os.Remove("a")
                os.Remove("b") // errfix:ignore
                os.Chdir("c")
                os.Remove("d")
            }
        "#});
        let filter = Filter::new(&[], &["os.Chdir".to_string()], true).expect("filter");
        let points = Detector::new(&program, &filter, false).detect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position.line, 10);
    }

    #[test]
    fn directives_inside_clause_bodies_suppress() {
        let points = detect(indoc! {r#"
            package main

            import "os"

            func run(n int, ch chan int) {
                switch n {
                case 1:
                    os.Remove("a") // errfix:ignore
                default:
                    // errfix:ignore -- scratch
                    os.Remove("b")
                }
                select {
                case <-ch:
                    os.Remove("c") // errfix:ignore
                }
            }
        "#});
        assert!(points.is_empty(), "{points:?}");
    }

    #[test]
    fn conversions_and_builtins_are_not_calls() {
        let points = detect(indoc! {r#"
            package main

            type handler func() error

            func run(f func() error) {
                h := handler(f)
                h()
                _ = recover()
            }
        "#});
        assert_eq!(points, vec![(DiscardKind::Bare, true)]);
    }
}
