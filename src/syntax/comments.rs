//! Comment-to-node association.
//!
//! Comments are assigned to the statement-level node they belong to: a
//! comment on the same line after a node trails it, a comment in the gap
//! before a node leads it, and comments after the last node of a block or
//! group sit on the container's closing side. Comments inside a node that
//! fall in no nested list are attached to the innermost anchor holding them.

use std::collections::HashMap;

use super::ast::{File, NodeId, Stmt, StmtKind};
use super::node::{Edge, NodeRef};
use super::token::{Comment, LineIndex, Span};

#[derive(Debug, Clone, Default)]
pub struct Attached {
    pub leading: Vec<usize>,
    pub trailing: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentMap {
    nodes: HashMap<NodeId, Attached>,
    closing: HashMap<NodeId, Vec<usize>>,
}

impl CommentMap {
    pub fn build(file: &File, source: &str) -> Self {
        let mut builder = Builder {
            comments: &file.comments,
            lines: LineIndex::new(source),
            assigned: vec![false; file.comments.len()],
            map: CommentMap::default(),
        };
        builder.visit(NodeRef::File(file), Span::new(0, source.len()), false);
        builder.assign_orphans(NodeRef::File(file));
        builder.map
    }

    pub fn attached(&self, node: NodeId) -> Option<&Attached> {
        self.nodes.get(&node)
    }

    pub fn closing(&self, container: NodeId) -> &[usize] {
        self.closing.get(&container).map_or(&[], Vec::as_slice)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Attached)> {
        self.nodes.iter().map(|(id, attached)| (*id, attached))
    }

    pub fn containers(&self) -> impl Iterator<Item = (NodeId, &[usize])> {
        self.closing.iter().map(|(id, list)| (*id, list.as_slice()))
    }

    /// Texts of every comment leading or trailing `node`.
    pub fn texts<'f>(&self, file: &'f File, node: NodeId) -> Vec<&'f str> {
        self.attached(node)
            .map(|a| {
                a.leading
                    .iter()
                    .chain(a.trailing.iter())
                    .map(|&i| file.comments[i].text.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct Builder<'a> {
    comments: &'a [Comment],
    lines: LineIndex,
    assigned: Vec<bool>,
    map: CommentMap,
}

fn is_list_edge(parent: &NodeRef<'_>, edge: &Edge) -> bool {
    match parent {
        NodeRef::File(_) => edge.field == "decls",
        NodeRef::Block(_) | NodeRef::FieldList(_) => edge.field == "list",
        NodeRef::Decl(_) => edge.field == "specs",
        NodeRef::Stmt(_) => (edge.field == "body" && edge.index.is_some()) || edge.field == "specs",
        _ => false,
    }
}

fn span_of(node: &NodeRef<'_>) -> Option<Span> {
    match node {
        NodeRef::File(f) => Some(f.span),
        NodeRef::Decl(d) => Some(d.span),
        NodeRef::Spec(s) => Some(s.span),
        NodeRef::Field(f) => Some(f.span),
        NodeRef::Stmt(s) => Some(s.span),
        NodeRef::Block(b) => Some(b.span),
        NodeRef::Expr(e) => Some(e.span),
        NodeRef::Ident(i) => Some(i.span),
        NodeRef::FieldList(_) | NodeRef::FuncType(_) => None,
    }
}

/// `case`/`comm` clauses end at their last statement; comments on that
/// line still belong inside the clause.
fn has_clause_body(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Case(clause) => !clause.body.is_empty(),
        StmtKind::Comm(clause) => !clause.body.is_empty(),
        _ => false,
    }
}

fn is_anchor(node: &NodeRef<'_>) -> bool {
    matches!(
        node,
        NodeRef::Decl(_) | NodeRef::Spec(_) | NodeRef::Field(_) | NodeRef::Stmt(_)
    )
}

impl Builder<'_> {
    fn unassigned_in(&self, lo: usize, hi: usize) -> Vec<usize> {
        let first = self.comments.partition_point(|c| c.span.start < lo);
        (first..self.comments.len())
            .take_while(|&i| self.comments[i].span.start < hi)
            .filter(|&i| !self.assigned[i])
            .collect()
    }

    /// `field_list_ok` is set for struct and interface bodies; parameter
    /// lists never own comments.
    fn visit(&mut self, node: NodeRef<'_>, range: Span, field_list_ok: bool) {
        let children = node.children();
        let items: Vec<(NodeId, Span)> = children
            .iter()
            .filter(|(edge, _)| is_list_edge(&node, edge))
            .filter_map(|(_, child)| span_of(child).map(|span| (child.id(), span)))
            .collect();
        let holds_list = match node {
            NodeRef::File(_) => {
                self.assign_top_level(&items);
                false
            }
            NodeRef::Block(_) => true,
            NodeRef::FieldList(_) => field_list_ok,
            NodeRef::Decl(decl) => matches!(decl.kind, super::ast::DeclKind::Gen(_)),
            NodeRef::Stmt(_) => !items.is_empty(),
            _ => false,
        };
        // Nested lists go first so a comment after the last statement of a
        // clause trails that statement rather than the clause.
        for (index, (_, child)) in children.iter().enumerate() {
            let child_range = match child {
                NodeRef::Block(block) => Span::new(block.span.start + 1, block.span.end.saturating_sub(1)),
                NodeRef::FieldList(_) => match node {
                    NodeRef::Expr(expr) => Span::new(expr.span.start, expr.span.end.saturating_sub(1)),
                    _ => range,
                },
                NodeRef::Stmt(stmt) if has_clause_body(stmt) => {
                    let next = children
                        .get(index + 1)
                        .and_then(|(_, sibling)| span_of(sibling))
                        .map_or(range.end, |span| span.start);
                    Span::new(stmt.span.start, self.lines.line_end(stmt.span.end).min(next).max(stmt.span.end))
                }
                other => span_of(other).unwrap_or(range),
            };
            self.visit(*child, child_range, matches!(node, NodeRef::Expr(_)));
        }
        if holds_list {
            self.assign_list(node.id(), range, &items);
        }
    }

    /// Top-level declarations keep only their leading comments in the map;
    /// the printer reproduces everything between declarations verbatim.
    fn assign_top_level(&mut self, items: &[(NodeId, Span)]) {
        let mut cursor = 0;
        for (id, span) in items {
            let leading = self.unassigned_in(cursor, span.start);
            for &i in &leading {
                self.assigned[i] = true;
            }
            self.map.nodes.entry(*id).or_default().leading.extend(leading);
            cursor = span.end;
        }
        let rest = self.unassigned_in(cursor, usize::MAX);
        for i in rest {
            self.assigned[i] = true;
        }
    }

    fn assign_list(&mut self, container: NodeId, range: Span, items: &[(NodeId, Span)]) {
        let mut cursor = range.start;
        let mut prev: Option<(NodeId, Span)> = None;
        for (id, span) in items {
            for i in self.unassigned_in(cursor, span.start) {
                self.assigned[i] = true;
                if !self.try_trail(prev, i) {
                    self.map.nodes.entry(*id).or_default().leading.push(i);
                }
            }
            cursor = span.end;
            prev = Some((*id, *span));
        }
        for i in self.unassigned_in(cursor, range.end) {
            self.assigned[i] = true;
            if !self.try_trail(prev, i) {
                self.map.closing.entry(container).or_default().push(i);
            }
        }
    }

    fn try_trail(&mut self, prev: Option<(NodeId, Span)>, comment: usize) -> bool {
        let Some((id, span)) = prev else {
            return false;
        };
        let start = self.comments[comment].span.start;
        if self.lines.line(start) != self.lines.line(span.end) {
            return false;
        }
        let entry = self.map.nodes.entry(id).or_default();
        if entry.trailing.is_some() {
            return false;
        }
        entry.trailing = Some(comment);
        true
    }

    fn assign_orphans(&mut self, root: NodeRef<'_>) {
        let orphans: Vec<usize> = (0..self.comments.len())
            .filter(|&i| !self.assigned[i])
            .collect();
        for i in orphans {
            let offset = self.comments[i].span.start;
            if let Some(anchor) = innermost_anchor(root, offset) {
                self.map.nodes.entry(anchor).or_default().leading.push(i);
                self.assigned[i] = true;
            }
        }
    }
}

fn innermost_anchor(node: NodeRef<'_>, offset: usize) -> Option<NodeId> {
    let mut found = None;
    if is_anchor(&node) {
        found = Some(node.id());
    }
    for (_, child) in node.children() {
        let contains = span_of(&child).map_or(true, |s| s.start <= offset && offset < s.end);
        if contains {
            if let Some(inner) = innermost_anchor(child, offset) {
                return Some(inner);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::{DeclKind, IdGen};
    use crate::syntax::parser::parse_file;
    use indoc::indoc;

    #[test]
    fn leading_and_trailing_comments_attach_to_statements() {
        let source = indoc! {r#"
            package p

            func f() {
                // leading
                a() // trailing
                b()
                // closing
            }
        "#};
        let mut ids = IdGen::default();
        let file = parse_file(source, &mut ids).expect("parses");
        let map = CommentMap::build(&file, source);
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func");
        };
        let body = func.body.as_ref().expect("body");
        assert_eq!(map.texts(&file, body.stmts[0].id), vec!["// leading", "// trailing"]);
        assert!(map.texts(&file, body.stmts[1].id).is_empty());
        let closing: Vec<_> = map
            .closing(body.id)
            .iter()
            .map(|&i| file.comments[i].text.as_str())
            .collect();
        assert_eq!(closing, vec!["// closing"]);
    }

    #[test]
    fn doc_comments_lead_top_level_declarations() {
        let source = "package p\n\n// Doc for f.\nfunc f() {}\n";
        let mut ids = IdGen::default();
        let file = parse_file(source, &mut ids).expect("parses");
        let map = CommentMap::build(&file, source);
        assert_eq!(map.texts(&file, file.decls[0].id), vec!["// Doc for f."]);
    }

    #[test]
    fn trailing_comments_in_clause_bodies_stay_on_the_statement() {
        let source = indoc! {r#"
            package p

            func f(n int) {
                switch n {
                case 1:
                    a() // first
                case 2:
                    b() // second
                }
            }
        "#};
        let mut ids = IdGen::default();
        let file = parse_file(source, &mut ids).expect("parses");
        let map = CommentMap::build(&file, source);
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func");
        };
        let body = func.body.as_ref().expect("body");
        let StmtKind::Switch(switch) = &body.stmts[0].kind else {
            panic!("expected switch");
        };
        let clauses: Vec<&Stmt> = switch.body.stmts.iter().collect();
        for (clause, text) in clauses.iter().zip(["// first", "// second"]) {
            let StmtKind::Case(case) = &clause.kind else {
                panic!("expected case clause");
            };
            assert!(map.texts(&file, clause.id).is_empty());
            assert_eq!(map.texts(&file, case.body[0].id), vec![text]);
        }
    }
}
