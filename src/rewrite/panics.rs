//! `panic(x)` statements in functions that now return `error`.

use std::collections::HashSet;

use crate::loader::{FileRef, Program};
use crate::syntax::ast::*;
use crate::syntax::node::{path_to, walk, NodeRef};
use crate::types::{Builtin, ObjKind, Type};

/// How the panic value becomes an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// Already an `error`; returned as is.
    Error,
    /// `fmt.Errorf("%s", x)`
    String,
    /// `fmt.Errorf("%v", x)`
    Other,
}

impl Wrap {
    pub fn verb(self) -> Option<&'static str> {
        match self {
            Wrap::Error => None,
            Wrap::String => Some("%s"),
            Wrap::Other => Some("%v"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicSite {
    pub file: FileRef,
    /// The expression statement holding the call.
    pub stmt: NodeId,
    /// The declaration or literal the statement returns from.
    pub func: NodeId,
    pub wrap: Wrap,
}

/// Panic statements directly in the body of `func` (a `Decl` or a
/// `FuncLit` expression), leaving nested literals and any statement in
/// `anchors` alone.
pub fn collect(program: &Program, file: FileRef, func: NodeId, anchors: &HashSet<NodeId>) -> Vec<PanicSite> {
    let ast = &program.file(file).ast;
    let Some(path) = path_to(NodeRef::File(ast), func) else {
        return Vec::new();
    };
    let body = match path.last().map(|(_, node)| *node) {
        Some(NodeRef::Decl(Decl {
            kind: DeclKind::Func(FuncDecl { body: Some(body), .. }),
            ..
        })) => body,
        Some(NodeRef::Expr(Expr {
            kind: ExprKind::FuncLit(lit),
            ..
        })) => &lit.body,
        _ => return Vec::new(),
    };

    let mut sites = Vec::new();
    walk(NodeRef::Block(body), &mut |node, _| match node {
        NodeRef::Expr(Expr {
            kind: ExprKind::FuncLit(_),
            ..
        }) => false,
        NodeRef::Stmt(stmt) => {
            if !anchors.contains(&stmt.id) {
                if let Some(wrap) = panic_value(program, stmt) {
                    sites.push(PanicSite {
                        file,
                        stmt: stmt.id,
                        func,
                        wrap,
                    });
                }
            }
            true
        }
        _ => true,
    });
    sites
}

fn panic_value(program: &Program, stmt: &Stmt) -> Option<Wrap> {
    let StmtKind::Expr(Expr {
        kind: ExprKind::Call {
            fun, args, ellipsis, ..
        },
        ..
    }) = &stmt.kind
    else {
        return None;
    };
    let ident = fun.unparen().as_ident()?;
    let obj = program.info.uses.get(&ident.id)?;
    if program.store.obj(*obj).kind != ObjKind::Builtin(Builtin::Panic) || args.len() != 1 || *ellipsis {
        return None;
    }
    let store = &program.store;
    let wrap = match program.info.type_of(args[0].id) {
        Some(ty) if store.is_error(ty) => Wrap::Error,
        Some(ty) => match store.underlying(ty) {
            Type::Basic(kind) if kind.is_string() => Wrap::String,
            _ => Wrap::Other,
        },
        None => Wrap::Other,
    };
    Some(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn func_node(program: &Program, name: &str) -> NodeId {
        let ast = &program.file(FileRef { unit: 0, file: 0 }).ast;
        ast.func_decls()
            .find(|(_, f)| f.name.name == name)
            .map(|(d, _)| d.id)
            .expect("function")
    }

    #[test]
    fn panics_are_classified_by_value_type() {
        let (_dir, program) = crate::testkit::load_single(indoc! {r#"
            package main

            import "errors"

            func check(n int) error {
                if n < 0 {
                    panic("negative")
                }
                if n == 0 {
                    panic(errors.New("zero"))
                }
                if n > 100 {
                    panic(n)
                }
                go func() {
                    panic("elsewhere")
                }()
                return nil
            }
        "#});
        let file = FileRef { unit: 0, file: 0 };
        let sites = collect(&program, file, func_node(&program, "check"), &HashSet::new());
        let wraps: Vec<Wrap> = sites.iter().map(|s| s.wrap).collect();
        assert_eq!(wraps, vec![Wrap::String, Wrap::Error, Wrap::Other]);
        assert_eq!(Wrap::Other.verb(), Some("%v"));
    }

    #[test]
    fn anchored_statements_are_skipped() {
        let (_dir, program) = crate::testkit::load_single(indoc! {r#"
            package main

            func check() error {
                panic("boom")
            }
        "#});
        let file = FileRef { unit: 0, file: 0 };
        let func = func_node(&program, "check");
        let all = collect(&program, file, func, &HashSet::new());
        assert_eq!(all.len(), 1);
        let anchors = HashSet::from([all[0].stmt]);
        assert!(collect(&program, file, func, &anchors).is_empty());
    }
}
