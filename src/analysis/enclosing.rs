//! Innermost function declaration or literal around a node.

use crate::loader::{FileRef, Program};
use crate::syntax::ast::{DeclKind, ExprKind, NodeId, SpecKind, StmtKind};
use crate::syntax::node::{path_to, Edge, NodeRef};
use crate::types::{ObjId, Signature, Type, TypeStore};

/// Identity of a function in the propagation worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FuncKey {
    Object(ObjId),
    Literal(NodeId),
}

#[derive(Debug, Clone)]
pub struct FuncContext {
    /// Current signature, read from the object arena for declarations and
    /// from the recorded expression type for literals.
    pub signature: Option<Signature>,
    pub decl: Option<NodeId>,
    pub lit: Option<NodeId>,
    /// The `Decl` or the `FuncLit` expression.
    pub node: NodeId,
    /// Function or method object; for literals, the variable the literal
    /// is bound to, if any.
    pub object: Option<ObjId>,
    pub name: String,
}

impl FuncContext {
    pub fn key(&self) -> FuncKey {
        match (self.decl, self.object) {
            (Some(_), Some(obj)) => FuncKey::Object(obj),
            _ => FuncKey::Literal(self.node),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.lit.is_some()
    }

    pub fn returns_error(&self, store: &TypeStore) -> bool {
        self.signature.as_ref().is_some_and(|sig| store.ends_in_error(sig))
    }

    pub fn result_count(&self) -> usize {
        self.signature.as_ref().map_or(0, |sig| sig.results.len())
    }
}

/// Resolves the function enclosing `target` in `file`. `None` when the
/// node is outside any function body or cannot be found.
pub fn enclosing_function(program: &Program, file: FileRef, target: NodeId) -> Option<FuncContext> {
    let ast = &program.file(file).ast;
    let path = path_to(NodeRef::File(ast), target)?;
    from_path(program, &path[..path.len().saturating_sub(1)])
}

/// Same search over an already computed root-to-node path; the innermost
/// function on `path` wins.
pub fn from_path(program: &Program, path: &[(Option<Edge>, NodeRef<'_>)]) -> Option<FuncContext> {
    for index in (0..path.len()).rev() {
        match path[index].1 {
            NodeRef::Decl(decl) => {
                let DeclKind::Func(func) = &decl.kind else {
                    return None;
                };
                let object = program.info.defs.get(&func.name.id).copied();
                return Some(FuncContext {
                    signature: object.and_then(|obj| program.store.signature(obj).cloned()),
                    decl: Some(decl.id),
                    lit: None,
                    node: decl.id,
                    object,
                    name: func.name.name.clone(),
                });
            }
            NodeRef::Expr(expr) if matches!(expr.kind, ExprKind::FuncLit(_)) => {
                let signature = match program.info.type_of(expr.id) {
                    Some(Type::Func(sig)) => Some((**sig).clone()),
                    _ => None,
                };
                let object = literal_binding(program, path, index);
                let name = object
                    .map(|obj| program.store.obj(obj).name.clone())
                    .unwrap_or_else(|| "func literal".to_string());
                return Some(FuncContext {
                    signature,
                    decl: None,
                    lit: Some(expr.id),
                    node: expr.id,
                    object,
                    name,
                });
            }
            _ => {}
        }
    }
    None
}

/// Variable a literal is assigned to by `name := func() {...}`,
/// `name = func() {...}` or `var name = func() {...}`.
pub fn literal_binding(program: &Program, path: &[(Option<Edge>, NodeRef<'_>)], index: usize) -> Option<ObjId> {
    let edge = path[index].0?;
    let slot = edge.index?;
    match path.get(index.checked_sub(1)?)?.1 {
        NodeRef::Stmt(stmt) => match &stmt.kind {
            StmtKind::Assign { lhs, rhs, .. } if edge.field == "rhs" && lhs.len() == rhs.len() => {
                let ident = lhs.get(slot)?.as_ident()?;
                program.info.object_of(ident.id)
            }
            _ => None,
        },
        NodeRef::Spec(spec) => match &spec.kind {
            SpecKind::Value(value) if edge.field == "values" && value.names.len() == value.values.len() => {
                program.info.object_of(value.names.get(slot)?.id)
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{find_call, load_single};
    use indoc::indoc;

    #[test]
    fn literal_inside_declaration_is_innermost() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func save() error { return nil }

            func run() int {
                store := func() error {
                    save()
                    return nil
                }
                _ = store
                return 0
            }
        "#});
        let (file, call) = find_call(&program, "save");
        let ctx = enclosing_function(&program, file, call).expect("context");
        assert!(ctx.is_literal());
        assert_eq!(ctx.name, "store");
        assert!(ctx.returns_error(&program.store));
        assert!(matches!(ctx.key(), FuncKey::Literal(_)));
    }

    #[test]
    fn declaration_context_reads_arena_signature() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func save() error { return nil }

            func run() (int, string) {
                save()
                return 0, ""
            }
        "#});
        let (file, call) = find_call(&program, "save");
        let ctx = enclosing_function(&program, file, call).expect("context");
        assert_eq!(ctx.name, "run");
        assert_eq!(ctx.result_count(), 2);
        assert!(!ctx.returns_error(&program.store));
        assert!(matches!(ctx.key(), FuncKey::Object(_)));
    }

    #[test]
    fn package_level_nodes_have_no_context() {
        let (_dir, program) = load_single(indoc! {r#"
            package main

            func load() (int, error) { return 0, nil }

            var count, _ = load()
        "#});
        let (file, call) = find_call(&program, "load");
        assert!(enclosing_function(&program, file, call).is_none());
    }
}
