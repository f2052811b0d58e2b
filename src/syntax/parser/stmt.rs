use super::{PResult, Parser};
use crate::syntax::ast::*;
use crate::syntax::token::{Span, TokenKind};
use crate::syntax::SyntaxError;

enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::Define => AssignOp::Define,
        TokenKind::AddAssign => AssignOp::Op(BinaryOp::Add),
        TokenKind::SubAssign => AssignOp::Op(BinaryOp::Sub),
        TokenKind::MulAssign => AssignOp::Op(BinaryOp::Mul),
        TokenKind::QuoAssign => AssignOp::Op(BinaryOp::Quo),
        TokenKind::RemAssign => AssignOp::Op(BinaryOp::Rem),
        TokenKind::AndAssign => AssignOp::Op(BinaryOp::And),
        TokenKind::OrAssign => AssignOp::Op(BinaryOp::Or),
        TokenKind::XorAssign => AssignOp::Op(BinaryOp::Xor),
        TokenKind::ShlAssign => AssignOp::Op(BinaryOp::Shl),
        TokenKind::ShrAssign => AssignOp::Op(BinaryOp::Shr),
        TokenKind::AndNotAssign => AssignOp::Op(BinaryOp::AndNot),
        _ => return None,
    };
    Some(op)
}

fn is_type_switch_guard(stmt: &Stmt) -> bool {
    let expr = match &stmt.kind {
        StmtKind::Expr(expr) => expr,
        StmtKind::Assign {
            lhs,
            op: AssignOp::Define,
            rhs,
        } if lhs.len() == 1 && rhs.len() == 1 => &rhs[0],
        _ => return false,
    };
    matches!(expr.kind, ExprKind::TypeAssert { ty: None, .. })
}

impl Parser<'_> {
    pub(crate) fn block(&mut self) -> PResult<Block> {
        let start = self.start();
        let id = self.next_id();
        self.expect(&TokenKind::LBrace)?;
        let stmts = self.stmt_list()?;
        let close = self.start();
        self.expect(&TokenKind::RBrace)?;
        Ok(Block {
            id,
            stmts,
            span: Span::new(start, self.last_end),
            close_comments: Vec::new(),
            one_line: self.line_of(start) == self.line_of(close),
        })
    }

    fn at_list_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
        )
    }

    pub(crate) fn stmt_list(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_semis();
        while !self.at_list_end() {
            stmts.push(self.stmt()?);
            if self.at_list_end() {
                break;
            }
            self.expect_semi()?;
            self.skip_semis();
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let blank_before = self.blank_line_before(start);
        let mut stmt = self.with_lit(true, |p| p.stmt_inner(start))?;
        stmt.decs.blank_before = blank_before;
        Ok(stmt)
    }

    fn stmt_inner(&mut self, start: usize) -> PResult<Stmt> {
        match self.peek() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                let gen = self.gen_decl()?;
                Ok(self.make_stmt(StmtKind::Decl(gen), start))
            }
            TokenKind::LBrace => {
                let block = self.block()?;
                Ok(self.make_stmt(StmtKind::Block(block), start))
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::Switch => self.switch_stmt(),
            TokenKind::Select => self.select_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Return => {
                self.bump();
                let results = if self.at_semi() || self.at_list_end() {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                Ok(self.make_stmt(StmtKind::Return(results), start))
            }
            TokenKind::Go | TokenKind::Defer => {
                let is_go = matches!(self.bump().kind, TokenKind::Go);
                let call = self.expr()?;
                if !call.unparen().is_call() {
                    return Err(SyntaxError {
                        message: "expression in go/defer must be a function call".to_string(),
                        span: call.span,
                    });
                }
                let kind = if is_go {
                    StmtKind::Go(call)
                } else {
                    StmtKind::Defer(call)
                };
                Ok(self.make_stmt(kind, start))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let kind = match self.bump().kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = if kind != BranchKind::Fallthrough
                    && matches!(self.peek(), TokenKind::Ident(_))
                {
                    Some(self.ident()?)
                } else {
                    None
                };
                Ok(self.make_stmt(StmtKind::Branch { kind, label }, start))
            }
            TokenKind::Semicolon { .. } => Ok(self.make_stmt(StmtKind::Empty, start)),
            TokenKind::Ident(_) if matches!(self.peek_at(1), TokenKind::Colon) => {
                let label = self.ident()?;
                self.bump();
                self.skip_semis();
                let inner = if self.at_list_end() {
                    let here = self.start();
                    self.make_stmt(StmtKind::Empty, here)
                } else {
                    self.stmt()?
                };
                Ok(self.make_stmt(
                    StmtKind::Labeled {
                        label,
                        stmt: Box::new(inner),
                    },
                    start,
                ))
            }
            _ => match self.simple_stmt(false)? {
                Simple::Stmt(stmt) => Ok(stmt),
                Simple::Range { x, .. } => Err(SyntaxError {
                    message: "unexpected range".to_string(),
                    span: x.span,
                }),
            },
        }
    }

    fn simple_stmt(&mut self, range_ok: bool) -> PResult<Simple> {
        let start = self.start();
        let lhs = self.expr_list()?;
        if let Some(op) = assign_op(self.peek()) {
            self.bump();
            if range_ok
                && self.at(&TokenKind::Range)
                && matches!(op, AssignOp::Assign | AssignOp::Define)
            {
                self.bump();
                let x = self.expr()?;
                let mut keys = lhs.into_iter();
                return Ok(Simple::Range {
                    key: keys.next(),
                    value: keys.next(),
                    define: op == AssignOp::Define,
                    x,
                });
            }
            let rhs = self.expr_list()?;
            return Ok(Simple::Stmt(
                self.make_stmt(StmtKind::Assign { lhs, op, rhs }, start),
            ));
        }
        let mut lhs = lhs;
        if lhs.len() > 1 {
            return Err(self.unexpected("`:=` or `=`"));
        }
        let x = lhs.remove(0);
        let kind = match self.peek() {
            TokenKind::Inc | TokenKind::Dec => {
                let inc = matches!(self.bump().kind, TokenKind::Inc);
                StmtKind::IncDec { x, inc }
            }
            TokenKind::Arrow => {
                self.bump();
                let value = self.expr()?;
                StmtKind::Send { chan: x, value }
            }
            _ => StmtKind::Expr(x),
        };
        Ok(Simple::Stmt(self.make_stmt(kind, start)))
    }

    fn header_stmt(&mut self) -> PResult<Stmt> {
        match self.simple_stmt(false)? {
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { x, .. } => Err(SyntaxError {
                message: "unexpected range".to_string(),
                span: x.span,
            }),
        }
    }

    fn stmt_into_expr(&self, stmt: Stmt, what: &str) -> PResult<Expr> {
        match stmt.kind {
            StmtKind::Expr(expr) => Ok(expr),
            _ => Err(SyntaxError {
                message: format!("expected {what} expression"),
                span: stmt.span,
            }),
        }
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&TokenKind::If)?;
        let (init, cond) = self.with_lit(false, |p| {
            if p.at(&TokenKind::LBrace) {
                return Err(p.error_here("missing condition in if statement"));
            }
            let first = if p.at_semi() {
                None
            } else {
                Some(p.header_stmt()?)
            };
            if p.at_semi() {
                p.bump();
                let cond = p.header_stmt()?;
                Ok((first, cond))
            } else {
                match first {
                    Some(cond) => Ok((None, cond)),
                    None => Err(p.error_here("missing condition in if statement")),
                }
            }
        })?;
        let cond = self.stmt_into_expr(cond, "condition")?;
        let body = self.block()?;
        let els = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                Some(Box::new(self.if_stmt()?))
            } else {
                let else_start = self.start();
                let block = self.block()?;
                Some(Box::new(self.make_stmt(StmtKind::Block(block), else_start)))
            }
        } else {
            None
        };
        Ok(self.make_stmt(
            StmtKind::If(IfStmt {
                init: init.map(Box::new),
                cond,
                body,
                els,
            }),
            start,
        ))
    }

    fn switch_stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&TokenKind::Switch)?;
        let (init, tag) = self.with_lit(false, |p| {
            let mut init = None;
            let mut tag = None;
            if !p.at(&TokenKind::LBrace) {
                let first = if p.at_semi() {
                    None
                } else {
                    Some(p.header_stmt()?)
                };
                if p.at_semi() {
                    p.bump();
                    init = first;
                    if !p.at(&TokenKind::LBrace) {
                        tag = Some(p.header_stmt()?);
                    }
                } else {
                    tag = first;
                }
            }
            Ok((init, tag))
        })?;
        let body = self.clause_block(false)?;
        let init = init.map(Box::new);
        let kind = match tag {
            Some(guard) if is_type_switch_guard(&guard) => StmtKind::TypeSwitch(TypeSwitchStmt {
                init,
                assign: Box::new(guard),
                body,
            }),
            Some(tag) => StmtKind::Switch(SwitchStmt {
                init,
                tag: Some(self.stmt_into_expr(tag, "switch")?),
                body,
            }),
            None => StmtKind::Switch(SwitchStmt {
                init,
                tag: None,
                body,
            }),
        };
        Ok(self.make_stmt(kind, start))
    }

    fn select_stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&TokenKind::Select)?;
        let body = self.clause_block(true)?;
        Ok(self.make_stmt(StmtKind::Select(body), start))
    }

    fn clause_block(&mut self, comm: bool) -> PResult<Block> {
        let start = self.start();
        let id = self.next_id();
        self.expect(&TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        self.skip_semis();
        while !self.at(&TokenKind::RBrace) {
            let clause = if comm {
                self.comm_clause()?
            } else {
                self.case_clause()?
            };
            clauses.push(clause);
            self.skip_semis();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Block {
            id,
            stmts: clauses,
            span: Span::new(start, self.last_end),
            close_comments: Vec::new(),
            one_line: false,
        })
    }

    fn case_clause(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let blank_before = self.blank_line_before(start);
        let (list, default) = if self.eat(&TokenKind::Case) {
            (self.expr_list()?, false)
        } else {
            self.expect(&TokenKind::Default)?;
            (Vec::new(), true)
        };
        self.expect(&TokenKind::Colon)?;
        let body = self.stmt_list()?;
        let mut stmt = self.make_stmt(StmtKind::Case(CaseClause { list, body, default }), start);
        stmt.decs.blank_before = blank_before;
        Ok(stmt)
    }

    fn comm_clause(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let blank_before = self.blank_line_before(start);
        let comm = if self.eat(&TokenKind::Case) {
            Some(Box::new(self.header_stmt()?))
        } else {
            self.expect(&TokenKind::Default)?;
            None
        };
        self.expect(&TokenKind::Colon)?;
        let body = self.stmt_list()?;
        let mut stmt = self.make_stmt(StmtKind::Comm(CommClause { comm, body }), start);
        stmt.decs.blank_before = blank_before;
        Ok(stmt)
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        self.expect(&TokenKind::For)?;
        enum Header {
            Loop(Option<Stmt>, Option<Expr>, Option<Stmt>),
            Range(Option<Expr>, Option<Expr>, bool, Expr),
        }
        let header = self.with_lit(false, |p| {
            if p.at(&TokenKind::LBrace) {
                return Ok(Header::Loop(None, None, None));
            }
            if p.eat(&TokenKind::Range) {
                let x = p.expr()?;
                return Ok(Header::Range(None, None, false, x));
            }
            let first = if p.at_semi() {
                None
            } else {
                match p.simple_stmt(true)? {
                    Simple::Range {
                        key,
                        value,
                        define,
                        x,
                    } => return Ok(Header::Range(key, value, define, x)),
                    Simple::Stmt(stmt) => Some(stmt),
                }
            };
            if p.at_semi() {
                p.bump();
                let cond = if p.at_semi() { None } else { Some(p.expr()?) };
                if !p.at_semi() {
                    return Err(p.unexpected("`;` in for clause"));
                }
                p.bump();
                let post = if p.at(&TokenKind::LBrace) {
                    None
                } else {
                    Some(p.header_stmt()?)
                };
                Ok(Header::Loop(first, cond, post))
            } else {
                match first {
                    Some(stmt) => {
                        let cond = p.stmt_into_expr(stmt, "loop condition")?;
                        Ok(Header::Loop(None, Some(cond), None))
                    }
                    None => Ok(Header::Loop(None, None, None)),
                }
            }
        })?;
        let body = self.block()?;
        let kind = match header {
            Header::Loop(init, cond, post) => StmtKind::For(ForStmt {
                init: init.map(Box::new),
                cond,
                post: post.map(Box::new),
                body,
            }),
            Header::Range(key, value, define, x) => StmtKind::Range(RangeStmt {
                key,
                value,
                define,
                x,
                body,
            }),
        };
        Ok(self.make_stmt(kind, start))
    }
}
