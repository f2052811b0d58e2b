//! Generated statements are written as Go text, parsed, and then have their
//! `__errfix_N` placeholders replaced by subtrees moved out of the original
//! statement, so the original expressions keep their ids and decorations.

use crate::core::errors::{Error, Result};
use crate::syntax::ast::{Expr, ExprKind, IdGen, Ident, Stmt, StmtKind};
use crate::syntax::node::{find_mut, walk, NodeMut, NodeRef};
use crate::syntax::parser::{parse_expr, parse_stmts};
use crate::syntax::Span;

const HOLE: &str = "__errfix_";

/// Placeholder text for the `n`th moved expression.
pub fn hole(n: usize) -> String {
    format!("{HOLE}{n}")
}

/// Parses `text` as a statement list and fills every placeholder.
pub fn statements(text: &str, ids: &mut IdGen, holes: Vec<Expr>) -> Result<Vec<Stmt>> {
    let mut stmts = parse_stmts(text, ids)
        .map_err(|e| Error::Generation(format!("generated code does not parse ({e}): {text}")))?;
    let mut holes: Vec<Option<Expr>> = holes.into_iter().map(Some).collect();
    for stmt in &mut stmts {
        fill(stmt, &mut holes)?;
        clear_decorations(stmt);
    }
    if holes.iter().any(Option::is_some) {
        return Err(Error::Generation(format!("placeholder left unused in: {text}")));
    }
    Ok(stmts)
}

/// Parses a single statement.
pub fn statement(text: &str, ids: &mut IdGen, holes: Vec<Expr>) -> Result<Stmt> {
    let mut stmts = statements(text, ids, holes)?;
    if stmts.len() != 1 {
        return Err(Error::Generation(format!("expected one statement, got {}: {text}", stmts.len())));
    }
    Ok(stmts.remove(0))
}

/// Parses an expression and fills its placeholders.
pub fn expression_with(text: &str, ids: &mut IdGen, holes: Vec<Expr>) -> Result<Expr> {
    let stmt = statement(&format!("_ = {text}"), ids, holes)?;
    match stmt.kind {
        StmtKind::Assign { mut rhs, .. } if rhs.len() == 1 => Ok(rhs.remove(0)),
        _ => Err(Error::Generation(format!("not a single expression: {text}"))),
    }
}

pub fn expression(text: &str, ids: &mut IdGen) -> Result<Expr> {
    parse_expr(text, ids).map_err(|e| Error::Generation(format!("generated expression does not parse ({e}): {text}")))
}

pub fn ident(name: &str, ids: &mut IdGen) -> Expr {
    Expr {
        id: ids.next_id(),
        kind: ExprKind::Ident(Ident {
            id: ids.next_id(),
            name: name.to_string(),
            span: Span::default(),
        }),
        span: Span::default(),
    }
}

fn fill(stmt: &mut Stmt, holes: &mut [Option<Expr>]) -> Result<()> {
    let mut targets = Vec::new();
    walk(NodeRef::Stmt(stmt), &mut |node, _| {
        if let NodeRef::Expr(Expr {
            id,
            kind: ExprKind::Ident(ident),
            ..
        }) = node
        {
            if let Some(n) = ident.name.strip_prefix(HOLE).and_then(|n| n.parse::<usize>().ok()) {
                targets.push((*id, n));
            }
        }
        true
    });
    for (id, n) in targets {
        let expr = holes
            .get_mut(n)
            .and_then(Option::take)
            .ok_or_else(|| Error::Generation(format!("placeholder {n} used twice or out of range")))?;
        match find_mut(NodeMut::Stmt(stmt), id) {
            Some(NodeMut::Expr(slot)) => *slot = expr,
            _ => return Err(Error::Generation(format!("placeholder {n} not found after parsing"))),
        }
    }
    Ok(())
}

/// Snippets carry no comments of their own; blank lines come from the
/// statement they replace.
fn clear_decorations(stmt: &mut Stmt) {
    stmt.decs.blank_before = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::printer::print_stmt;

    #[test]
    fn placeholders_receive_moved_expressions() {
        let mut ids = IdGen::starting_at(100);
        let call = expression("load(path)", &mut ids).unwrap();
        let call_id = call.id;
        let stmt = statement(
            &format!("if _, err := {}; err != nil {{\n\treturn err\n}}", hole(0)),
            &mut ids,
            vec![call],
        )
        .unwrap();
        assert_eq!(
            print_stmt(&stmt),
            "if _, err := load(path); err != nil {\n\treturn err\n}"
        );
        let mut found = false;
        walk(NodeRef::Stmt(&stmt), &mut |node, _| {
            found |= node.id() == call_id;
            true
        });
        assert!(found, "moved expression keeps its id");
    }

    #[test]
    fn expressions_take_placeholders_too() {
        let mut ids = IdGen::default();
        let call = expression("open()", &mut ids).unwrap();
        let expr = expression_with(&format!("func() int {{\n\treturn {}\n}}()", hole(0)), &mut ids, vec![call]).unwrap();
        assert!(expr.is_call());
        assert!(crate::syntax::printer::print_expr(&expr).contains("return open()"));
    }

    #[test]
    fn unparsable_text_is_a_generation_error() {
        let mut ids = IdGen::default();
        let err = statements("if err != nil {", &mut ids, Vec::new()).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn every_hole_must_be_used() {
        let mut ids = IdGen::default();
        let spare = ident("x", &mut ids);
        assert!(statements("return nil", &mut ids, vec![spare]).is_err());
    }
}
