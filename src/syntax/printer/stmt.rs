use super::expr::column_widths;
use super::Printer;
use crate::syntax::ast::*;

impl Printer {
    pub(crate) fn block(&mut self, block: &Block) {
        self.write("{");
        self.stmt_list(&block.stmts, &block.close_comments);
        self.newline();
        self.write("}");
    }

    /// Statements one level deeper than the current indentation. Trailing
    /// comments of consecutive single-line statements share a column.
    fn stmt_list(&mut self, stmts: &[Stmt], close: &[String]) {
        self.indent += 1;
        let rendered: Vec<String> = stmts.iter().map(|s| self.render(|p| p.stmt(s))).collect();
        let cells: Vec<Option<String>> = stmts
            .iter()
            .zip(&rendered)
            .map(|(stmt, text)| {
                (stmt.decs.trailing.is_some() && !text.contains('\n')).then(|| text.clone())
            })
            .collect();
        let widths = aligned_widths(stmts, &cells);
        for (i, (stmt, text)) in stmts.iter().zip(&rendered).enumerate() {
            if i > 0 && stmt.decs.blank_before {
                self.blank_line();
            }
            self.comment_lines(&stmt.decs.leading);
            self.newline();
            if matches!(stmt.kind, StmtKind::Labeled { .. }) && self.out.ends_with('\t') {
                self.out.pop();
            }
            self.write(text);
            if let Some(trailing) = &stmt.decs.trailing {
                let pad = widths[i].saturating_sub(text.chars().count()) + 1;
                self.trailing(trailing, pad);
            }
        }
        self.comment_lines(close);
        self.indent -= 1;
    }

    fn clause_block(&mut self, body: &Block) {
        self.write("{");
        for (i, clause) in body.stmts.iter().enumerate() {
            if i > 0 && clause.decs.blank_before {
                self.blank_line();
            }
            self.comment_lines(&clause.decs.leading);
            self.newline();
            self.clause(clause);
        }
        self.comment_lines(&body.close_comments);
        self.newline();
        self.write("}");
    }

    fn clause(&mut self, stmt: &Stmt) {
        let body = match &stmt.kind {
            StmtKind::Case(clause) => {
                if clause.default {
                    self.write("default:");
                } else {
                    self.write("case ");
                    self.expr_list(&clause.list, 1);
                    self.write(":");
                }
                &clause.body
            }
            StmtKind::Comm(clause) => {
                match &clause.comm {
                    Some(comm) => {
                        self.write("case ");
                        self.stmt(comm);
                        self.write(":");
                    }
                    None => self.write("default:"),
                }
                &clause.body
            }
            _ => {
                self.stmt(stmt);
                return;
            }
        };
        if let Some(text) = &stmt.decs.trailing {
            self.trailing(text, 1);
        }
        self.stmt_list(body, &[]);
    }

    fn header(&mut self, keyword: &str, init: Option<&Stmt>, rest: impl FnOnce(&mut Printer)) {
        self.write(keyword);
        self.write(" ");
        if let Some(init) = init {
            self.stmt(init);
            self.write("; ");
        }
        rest(self);
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(gen) => self.gen_decl(gen),
            StmtKind::Empty => {}
            StmtKind::Labeled { label, stmt: inner } => {
                self.write(&label.name);
                self.write(":");
                if !matches!(inner.kind, StmtKind::Empty) {
                    self.newline();
                    self.stmt(inner);
                }
            }
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Send { chan, value } => {
                self.expr(chan);
                self.write(" <- ");
                self.expr(value);
            }
            StmtKind::IncDec { x, inc } => {
                self.expr(x);
                self.write(if *inc { "++" } else { "--" });
            }
            StmtKind::Assign { lhs, op, rhs } => {
                let depth = if lhs.len() > 1 && rhs.len() > 1 { 2 } else { 1 };
                self.expr_list(lhs, depth);
                self.write(" ");
                self.write(&op.text());
                self.write(" ");
                self.expr_list(rhs, depth);
            }
            StmtKind::Go(call) => {
                self.write("go ");
                self.expr(call);
            }
            StmtKind::Defer(call) => {
                self.write("defer ");
                self.expr(call);
            }
            StmtKind::Return(results) => {
                self.write("return");
                if !results.is_empty() {
                    self.write(" ");
                    self.expr_list(results, 1);
                }
            }
            StmtKind::Branch { kind, label } => {
                self.write(kind.text());
                if let Some(label) = label {
                    self.write(" ");
                    self.write(&label.name);
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::If(if_stmt) => self.if_stmt(if_stmt),
            StmtKind::Case(_) | StmtKind::Comm(_) => self.clause(stmt),
            StmtKind::Switch(switch) => {
                self.header("switch", switch.init.as_deref(), |p| {
                    if let Some(tag) = &switch.tag {
                        p.expr(tag);
                        p.write(" ");
                    }
                });
                self.clause_block(&switch.body);
            }
            StmtKind::TypeSwitch(switch) => {
                self.header("switch", switch.init.as_deref(), |p| {
                    p.stmt(&switch.assign);
                    p.write(" ");
                });
                self.clause_block(&switch.body);
            }
            StmtKind::Select(body) => {
                self.write("select ");
                self.clause_block(body);
            }
            StmtKind::For(for_stmt) => {
                self.write("for ");
                if for_stmt.init.is_some() || for_stmt.post.is_some() {
                    if let Some(init) = &for_stmt.init {
                        self.stmt(init);
                    }
                    self.write("; ");
                    if let Some(cond) = &for_stmt.cond {
                        self.expr(cond);
                    }
                    self.write(";");
                    if let Some(post) = &for_stmt.post {
                        self.write(" ");
                        self.stmt(post);
                    }
                    self.write(" ");
                } else if let Some(cond) = &for_stmt.cond {
                    self.expr(cond);
                    self.write(" ");
                }
                self.block(&for_stmt.body);
            }
            StmtKind::Range(range) => {
                self.write("for ");
                if let Some(key) = &range.key {
                    self.expr(key);
                    if let Some(value) = &range.value {
                        self.write(", ");
                        self.expr(value);
                    }
                    self.write(if range.define { " := " } else { " = " });
                }
                self.write("range ");
                self.expr(&range.x);
                self.write(" ");
                self.block(&range.body);
            }
        }
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) {
        self.header("if", if_stmt.init.as_deref(), |p| {
            p.expr(&if_stmt.cond);
            p.write(" ");
        });
        self.block(&if_stmt.body);
        if let Some(els) = &if_stmt.els {
            self.write(" else ");
            match &els.kind {
                StmtKind::Block(block) => self.block(block),
                _ => self.stmt(els),
            }
        }
    }
}

/// Column widths for trailing comments: a run ends at a statement without
/// one, at a blank line, or at a leading comment.
fn aligned_widths(stmts: &[Stmt], cells: &[Option<String>]) -> Vec<usize> {
    let mut split: Vec<Option<String>> = Vec::with_capacity(cells.len());
    let mut widths = vec![0; cells.len()];
    let mut offset = 0;
    for (i, cell) in cells.iter().enumerate() {
        let breaks = i > 0 && (stmts[i].decs.blank_before || !stmts[i].decs.leading.is_empty());
        if breaks {
            let run = column_widths(&split);
            widths[offset..offset + run.len()].copy_from_slice(&run);
            offset = i;
            split.clear();
        }
        split.push(cell.clone());
    }
    let run = column_widths(&split);
    widths[offset..offset + run.len()].copy_from_slice(&run);
    widths
}
