//! Moves comments from the file-level list onto the nodes that own them.
//!
//! Destination trees are printed rather than sliced from source, so every
//! comment inside an edited declaration has to travel with its node.

use std::collections::HashSet;

use super::ast::{DeclKind, File, NodeId, StmtKind};
use super::comments::CommentMap;
use super::node::{follow_mut, path_to, Edge, NodeMut, NodeRef};

enum Placement {
    Node {
        id: NodeId,
        leading: Vec<String>,
        trailing: Option<String>,
    },
    Closing {
        id: NodeId,
        texts: Vec<String>,
    },
}

/// Attaches every comment of `file` to a node. Doc comments of top-level
/// declarations stay in the gap text the printer copies verbatim; only
/// comments found inside a declaration end up in its decorations.
pub fn decorate(file: &mut File, source: &str) {
    let map = CommentMap::build(file, source);
    let top_level: HashSet<NodeId> = file.decls.iter().map(|d| d.id).collect();
    let mut placements = Vec::new();

    for (id, attached) in map.nodes() {
        let inner_start = if top_level.contains(&id) {
            file.decls.iter().find(|d| d.id == id).map(|d| d.span.start)
        } else {
            None
        };
        let leading: Vec<String> = attached
            .leading
            .iter()
            .map(|&i| &file.comments[i])
            .filter(|c| inner_start.is_none_or(|start| c.span.start >= start))
            .map(|c| c.text.clone())
            .collect();
        let trailing = if inner_start.is_some() {
            None
        } else {
            attached.trailing.map(|i| file.comments[i].text.clone())
        };
        if !leading.is_empty() || trailing.is_some() {
            placements.push(Placement::Node {
                id,
                leading,
                trailing,
            });
        }
    }
    for (id, indices) in map.containers() {
        let texts = indices
            .iter()
            .map(|&i| file.comments[i].text.clone())
            .collect();
        placements.push(Placement::Closing { id, texts });
    }

    for placement in placements {
        let target = match &placement {
            Placement::Node { id, .. } | Placement::Closing { id, .. } => *id,
        };
        let Some(edges) = edges_to(file, target) else {
            continue;
        };
        let Some(node) = follow_mut(NodeMut::File(file), &edges) else {
            continue;
        };
        apply(node, placement);
    }
}

fn edges_to(file: &File, target: NodeId) -> Option<Vec<Edge>> {
    let path = path_to(NodeRef::File(file), target)?;
    Some(path.into_iter().filter_map(|(edge, _)| edge).collect())
}

fn apply(node: NodeMut<'_>, placement: Placement) {
    match placement {
        Placement::Node {
            leading, trailing, ..
        } => {
            let decs = match node {
                NodeMut::Decl(decl) => &mut decl.decs,
                NodeMut::Spec(spec) => &mut spec.decs,
                NodeMut::Field(field) => &mut field.decs,
                NodeMut::Stmt(stmt) => &mut stmt.decs,
                _ => return,
            };
            decs.leading.extend(leading);
            if trailing.is_some() {
                decs.trailing = trailing;
            }
        }
        Placement::Closing { texts, .. } => match node {
            NodeMut::Block(block) => block.close_comments.extend(texts),
            NodeMut::FieldList(list) => list.close_comments.extend(texts),
            NodeMut::Decl(decl) => {
                if let DeclKind::Gen(gen) = &mut decl.kind {
                    gen.close_comments.extend(texts);
                }
            }
            NodeMut::Stmt(stmt) => match &mut stmt.kind {
                StmtKind::Decl(gen) => gen.close_comments.extend(texts),
                StmtKind::Case(clause) => append_to_last(&mut clause.body, texts),
                StmtKind::Comm(clause) => append_to_last(&mut clause.body, texts),
                _ => {}
            },
            _ => {}
        },
    }
}

/// Clause bodies have no closing brace of their own; comments after the
/// last statement continue its trailing comment on following lines.
fn append_to_last(body: &mut [super::ast::Stmt], texts: Vec<String>) {
    let Some(last) = body.last_mut() else {
        return;
    };
    let mut lines: Vec<String> = last.decs.trailing.take().into_iter().collect();
    lines.extend(texts);
    if !lines.is_empty() {
        last.decs.trailing = Some(lines.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::IdGen;
    use crate::syntax::parser::parse_file;
    use indoc::indoc;

    #[test]
    fn statements_inside_functions_receive_their_comments() {
        let source = indoc! {r#"
            package p

            // Doc stays in the gap.
            func f() {
                // before
                a() // after
                // end
            }
        "#};
        let mut ids = IdGen::default();
        let mut file = parse_file(source, &mut ids).expect("parses");
        decorate(&mut file, source);
        assert!(file.decls[0].decs.leading.is_empty());
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func");
        };
        let body = func.body.as_ref().expect("body");
        assert_eq!(body.stmts[0].decs.leading, vec!["// before".to_string()]);
        assert_eq!(body.stmts[0].decs.trailing.as_deref(), Some("// after"));
        assert_eq!(body.close_comments, vec!["// end".to_string()]);
    }
}
