//! Structural replay from the analysis tree onto the destination tree.
//!
//! The path to a node is recorded as the sequence of edges (field name and
//! index) that hold each step, then followed on the other tree. Both trees
//! come from the same source and only ever receive the same appends, so the
//! edges line up; any divergence is reported, never papered over.

use crate::core::errors::{Error, Result};
use crate::syntax::ast::{File, NodeId};
use crate::syntax::node::{path_to, Edge, NodeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence {
    /// Matched node in the destination tree.
    pub node: NodeId,
    pub kind: &'static str,
    /// Parent of the matched node in the destination tree.
    pub parent: Option<NodeId>,
    pub edges: Vec<Edge>,
}

/// Finds the node of `dst` standing where `target` stands in `src`.
pub fn correspond(src: &File, dst: &File, target: NodeId) -> Result<Correspondence> {
    let path = path_to(NodeRef::File(src), target).ok_or_else(|| Error::Mapping {
        file: Default::default(),
        depth: 0,
        expected: format!("node {}", target.0),
        found: "nothing in the analysis tree".to_string(),
    })?;

    let mut node = NodeRef::File(dst);
    let mut parent = None;
    let mut edges = Vec::with_capacity(path.len());
    for (depth, (edge, expected)) in path.iter().enumerate().skip(1) {
        let Some(edge) = *edge else {
            continue;
        };
        let child = node
            .children()
            .into_iter()
            .find(|(e, _)| *e == edge)
            .map(|(_, child)| child)
            .ok_or_else(|| Error::Mapping {
                file: Default::default(),
                depth,
                expected: format!("{} at {edge}", expected.kind_name()),
                found: format!("{} without {edge}", node.kind_name()),
            })?;
        if child.kind_name() != expected.kind_name() {
            return Err(Error::Mapping {
                file: Default::default(),
                depth,
                expected: expected.kind_name().to_string(),
                found: child.kind_name().to_string(),
            });
        }
        parent = Some(node.id());
        edges.push(edge);
        node = child;
    }
    Ok(Correspondence {
        node: node.id(),
        kind: node.kind_name(),
        parent,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::{DeclKind, ExprKind, IdGen, StmtKind};
    use crate::syntax::parser::parse_file;
    use indoc::indoc;

    const SOURCE: &str = indoc! {r#"
        package main

        func run() {
            if ok() {
                work(1, load())
            }
        }
    "#};

    fn load_call(file: &File) -> NodeId {
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func");
        };
        let StmtKind::If(stmt) = &func.body.as_ref().unwrap().stmts[0].kind else {
            panic!("expected if");
        };
        let StmtKind::Expr(call) = &stmt.body.stmts[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { args, .. } = &call.kind else {
            panic!("expected call");
        };
        args[1].id
    }

    #[test]
    fn replays_the_same_edges_on_a_separate_parse() {
        let src = parse_file(SOURCE, &mut IdGen::default()).unwrap();
        let dst = parse_file(SOURCE, &mut IdGen::starting_at(10_000)).unwrap();
        let found = correspond(&src, &dst, load_call(&src)).unwrap();
        assert_eq!(found.node, load_call(&dst));
        assert_eq!(found.kind, "CallExpr");
        assert_eq!(found.edges.last(), Some(&Edge::at("args", 1)));
    }

    #[test]
    fn divergent_trees_report_kinds_and_depth() {
        let src = parse_file(SOURCE, &mut IdGen::default()).unwrap();
        let mut dst = parse_file(SOURCE, &mut IdGen::starting_at(10_000)).unwrap();
        if let DeclKind::Func(func) = &mut dst.decls[0].kind {
            let body = func.body.as_mut().unwrap();
            body.stmts[0].kind = StmtKind::Empty;
        }
        let err = correspond(&src, &dst, load_call(&src)).unwrap_err();
        match err {
            Error::Mapping { expected, found, depth, .. } => {
                assert_eq!(depth, 3);
                assert_eq!(expected, "IfStmt");
                assert_eq!(found, "EmptyStmt");
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
