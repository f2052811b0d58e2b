use super::{PResult, Parser};
use crate::syntax::ast::*;
use crate::syntax::token::TokenKind;

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Quo => BinaryOp::Quo,
        TokenKind::Rem => BinaryOp::Rem,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Xor => BinaryOp::Xor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::AndNot => BinaryOp::AndNot,
        TokenKind::LAnd => BinaryOp::LAnd,
        TokenKind::LOr => BinaryOp::LOr,
        TokenKind::Eql => BinaryOp::Eql,
        TokenKind::Neq => BinaryOp::Neq,
        TokenKind::Lss => BinaryOp::Lss,
        TokenKind::Leq => BinaryOp::Leq,
        TokenKind::Gtr => BinaryOp::Gtr,
        TokenKind::Geq => BinaryOp::Geq,
        _ => return None,
    };
    Some(op)
}

/// Expressions that may precede `{` to form a composite literal.
fn is_literal_type(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_)
        | ExprKind::ArrayType { .. }
        | ExprKind::MapType { .. }
        | ExprKind::StructType(_) => true,
        ExprKind::Selector { x, .. } => matches!(x.kind, ExprKind::Ident(_)),
        ExprKind::Index { x, .. } => is_type_name(x),
        _ => false,
    }
}

fn is_type_name(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Selector { x, .. } => matches!(x.kind, ExprKind::Ident(_)),
        ExprKind::Index { x, .. } => is_type_name(x),
        _ => false,
    }
}

impl Parser<'_> {
    pub(crate) fn expr(&mut self) -> PResult<Expr> {
        self.binary_expr(1)
    }

    pub(crate) fn expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.unary_expr()?;
        while let Some(op) = binary_op(self.peek()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let y = self.binary_expr(prec + 1)?;
            x = self.make_expr(
                ExprKind::Binary {
                    op,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                start,
            );
        }
        Ok(x)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        let start = self.start();
        let op = match self.peek() {
            TokenKind::Add => Some(UnaryOp::Pos),
            TokenKind::Sub => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Xor => Some(UnaryOp::Xor),
            TokenKind::And => Some(UnaryOp::Addr),
            TokenKind::Tilde => Some(UnaryOp::Tilde),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let x = self.unary_expr()?;
            return Ok(self.make_expr(ExprKind::Unary { op, x: Box::new(x) }, start));
        }
        match self.peek() {
            TokenKind::Arrow => {
                if matches!(self.peek_at(1), TokenKind::Chan) {
                    return self.ty();
                }
                self.bump();
                let x = self.unary_expr()?;
                Ok(self.make_expr(
                    ExprKind::Unary {
                        op: UnaryOp::Recv,
                        x: Box::new(x),
                    },
                    start,
                ))
            }
            TokenKind::Mul => {
                self.bump();
                let x = self.unary_expr()?;
                Ok(self.make_expr(ExprKind::Star(Box::new(x)), start))
            }
            _ => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.operand()?;
        loop {
            match self.peek() {
                TokenKind::Period => {
                    self.bump();
                    if self.eat(&TokenKind::LParen) {
                        let ty = if self.eat(&TokenKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.with_lit(true, |p| p.ty())?))
                        };
                        self.expect(&TokenKind::RParen)?;
                        x = self.make_expr(
                            ExprKind::TypeAssert {
                                x: Box::new(x),
                                ty,
                            },
                            start,
                        );
                    } else {
                        let sel = self.ident()?;
                        x = self.make_expr(
                            ExprKind::Selector {
                                x: Box::new(x),
                                sel,
                            },
                            start,
                        );
                    }
                }
                TokenKind::LBrack => x = self.index_or_slice(x, start)?,
                TokenKind::LParen => x = self.call(x, start)?,
                TokenKind::LBrace => {
                    if is_literal_type(&x) && (!self.no_lit || !is_type_name(&x)) {
                        x = self.composite_lit(Some(x), start)?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn operand(&mut self) -> PResult<Expr> {
        let start = self.start();
        let lit = match self.peek().clone() {
            TokenKind::Int(v) => Some((LitKind::Int, v)),
            TokenKind::Float(v) => Some((LitKind::Float, v)),
            TokenKind::Imag(v) => Some((LitKind::Imag, v)),
            TokenKind::Char(v) => Some((LitKind::Char, v)),
            TokenKind::Str(v) => Some((LitKind::String, v)),
            _ => None,
        };
        if let Some((kind, value)) = lit {
            self.bump();
            return Ok(self.make_expr(ExprKind::BasicLit { kind, value }, start));
        }
        match self.peek() {
            TokenKind::Ident(_) => {
                let ident = self.ident()?;
                Ok(self.make_expr(ExprKind::Ident(ident), start))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.with_lit(true, |p| p.expr())?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.make_expr(ExprKind::Paren(Box::new(inner)), start))
            }
            TokenKind::Func => self.func_lit_or_type(),
            TokenKind::LBrack
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface => self.ty(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn func_lit_or_type(&mut self) -> PResult<Expr> {
        let start = self.start();
        self.expect(&TokenKind::Func)?;
        let type_id = self.next_id();
        let (params, results) = self.signature()?;
        let ty = FuncType {
            id: type_id,
            type_params: None,
            params,
            results,
        };
        if self.at(&TokenKind::LBrace) {
            let body = self.with_lit(true, |p| p.block())?;
            Ok(self.make_expr(ExprKind::FuncLit(Box::new(FuncLit { ty, body })), start))
        } else {
            Ok(self.make_expr(ExprKind::FuncType(ty), start))
        }
    }

    fn index_or_slice(&mut self, x: Expr, start: usize) -> PResult<Expr> {
        self.expect(&TokenKind::LBrack)?;
        self.with_lit(true, |p| {
            let low = if p.at(&TokenKind::Colon) {
                None
            } else {
                Some(p.expr()?)
            };
            if p.eat(&TokenKind::Colon) {
                let high = if p.at(&TokenKind::RBrack) || p.at(&TokenKind::Colon) {
                    None
                } else {
                    Some(Box::new(p.expr()?))
                };
                let mut three = false;
                let mut max = None;
                if p.eat(&TokenKind::Colon) {
                    three = true;
                    max = Some(Box::new(p.expr()?));
                }
                p.expect(&TokenKind::RBrack)?;
                return Ok(p.make_expr(
                    ExprKind::Slice {
                        x: Box::new(x),
                        low: low.map(Box::new),
                        high,
                        max,
                        three,
                    },
                    start,
                ));
            }
            let mut indices: Vec<Expr> = low.into_iter().collect();
            while p.eat(&TokenKind::Comma) {
                if p.at(&TokenKind::RBrack) {
                    break;
                }
                indices.push(p.expr()?);
            }
            p.expect(&TokenKind::RBrack)?;
            Ok(p.make_expr(
                ExprKind::Index {
                    x: Box::new(x),
                    indices,
                },
                start,
            ))
        })
    }

    fn call(&mut self, fun: Expr, start: usize) -> PResult<Expr> {
        self.expect(&TokenKind::LParen)?;
        let (args, ellipsis) = self.with_lit(true, |p| {
            let mut args = Vec::new();
            let mut ellipsis = false;
            p.skip_semis();
            while !p.at(&TokenKind::RParen) {
                args.push(p.expr()?);
                if p.eat(&TokenKind::Ellipsis) {
                    ellipsis = true;
                }
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
                p.skip_semis();
            }
            p.skip_semis();
            Ok((args, ellipsis))
        })?;
        let close = self.start();
        self.expect(&TokenKind::RParen)?;
        let multiline = args
            .last()
            .is_some_and(|last| self.line_of(last.span.end) != self.line_of(close));
        Ok(self.make_expr(
            ExprKind::Call {
                fun: Box::new(fun),
                args,
                ellipsis,
                multiline,
            },
            start,
        ))
    }

    fn composite_lit(&mut self, ty: Option<Expr>, start: usize) -> PResult<Expr> {
        self.expect(&TokenKind::LBrace)?;
        let elts = self.with_lit(true, |p| {
            let mut elts = Vec::new();
            p.skip_semis();
            while !p.at(&TokenKind::RBrace) {
                let elt_start = p.start();
                let key = p.element()?;
                let elt = if p.eat(&TokenKind::Colon) {
                    let value = p.element()?;
                    p.make_expr(
                        ExprKind::KeyValue {
                            key: Box::new(key),
                            value: Box::new(value),
                        },
                        elt_start,
                    )
                } else {
                    key
                };
                elts.push(elt);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
                p.skip_semis();
            }
            p.skip_semis();
            Ok(elts)
        })?;
        let close = self.start();
        self.expect(&TokenKind::RBrace)?;
        let multiline = elts
            .last()
            .is_some_and(|last| self.line_of(last.span.end) != self.line_of(close));
        Ok(self.make_expr(
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elts,
                multiline,
            },
            start,
        ))
    }

    fn element(&mut self) -> PResult<Expr> {
        if self.at(&TokenKind::LBrace) {
            let start = self.start();
            self.composite_lit(None, start)
        } else {
            self.expr()
        }
    }

    // --- types --------------------------------------------------------

    pub(crate) fn ty(&mut self) -> PResult<Expr> {
        let start = self.start();
        match self.peek() {
            TokenKind::Ident(_) => self.type_name(),
            TokenKind::LBrack => {
                self.bump();
                if self.eat(&TokenKind::RBrack) {
                    let elem = self.ty()?;
                    return Ok(self.make_expr(
                        ExprKind::ArrayType {
                            len: None,
                            elem: Box::new(elem),
                        },
                        start,
                    ));
                }
                let len = if self.at(&TokenKind::Ellipsis) {
                    let len_start = self.start();
                    self.bump();
                    self.make_expr(ExprKind::Ellipsis(None), len_start)
                } else {
                    self.with_lit(true, |p| p.expr())?
                };
                self.expect(&TokenKind::RBrack)?;
                let elem = self.ty()?;
                Ok(self.make_expr(
                    ExprKind::ArrayType {
                        len: Some(Box::new(len)),
                        elem: Box::new(elem),
                    },
                    start,
                ))
            }
            TokenKind::Mul => {
                self.bump();
                let x = self.ty()?;
                Ok(self.make_expr(ExprKind::Star(Box::new(x)), start))
            }
            TokenKind::Arrow => {
                self.bump();
                self.expect(&TokenKind::Chan)?;
                let value = self.ty()?;
                Ok(self.make_expr(
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        value: Box::new(value),
                    },
                    start,
                ))
            }
            TokenKind::Chan => {
                self.bump();
                let dir = if self.eat(&TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.ty()?;
                Ok(self.make_expr(
                    ExprKind::ChanType {
                        dir,
                        value: Box::new(value),
                    },
                    start,
                ))
            }
            TokenKind::Map => {
                self.bump();
                self.expect(&TokenKind::LBrack)?;
                let key = self.ty()?;
                self.expect(&TokenKind::RBrack)?;
                let value = self.ty()?;
                Ok(self.make_expr(
                    ExprKind::MapType {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    start,
                ))
            }
            TokenKind::Func => {
                self.bump();
                let type_id = self.next_id();
                let (params, results) = self.signature()?;
                Ok(self.make_expr(
                    ExprKind::FuncType(FuncType {
                        id: type_id,
                        type_params: None,
                        params,
                        results,
                    }),
                    start,
                ))
            }
            TokenKind::Struct => {
                let fields = self.struct_type()?;
                Ok(self.make_expr(ExprKind::StructType(fields), start))
            }
            TokenKind::Interface => {
                let methods = self.interface_type()?;
                Ok(self.make_expr(ExprKind::InterfaceType(methods), start))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.ty()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.make_expr(ExprKind::Paren(Box::new(inner)), start))
            }
            _ => Err(self.unexpected("type")),
        }
    }

    fn type_name(&mut self) -> PResult<Expr> {
        let start = self.start();
        let ident = self.ident()?;
        let mut x = self.make_expr(ExprKind::Ident(ident), start);
        if self.at(&TokenKind::Period) && matches!(self.peek_at(1), TokenKind::Ident(_)) {
            self.bump();
            let sel = self.ident()?;
            x = self.make_expr(
                ExprKind::Selector {
                    x: Box::new(x),
                    sel,
                },
                start,
            );
        }
        if self.at(&TokenKind::LBrack) && self.looks_like_instantiation() {
            self.bump();
            let indices = self.with_lit(true, |p| {
                let mut indices = vec![p.ty()?];
                while p.eat(&TokenKind::Comma) {
                    if p.at(&TokenKind::RBrack) {
                        break;
                    }
                    indices.push(p.ty()?);
                }
                Ok(indices)
            })?;
            self.expect(&TokenKind::RBrack)?;
            x = self.make_expr(
                ExprKind::Index {
                    x: Box::new(x),
                    indices,
                },
                start,
            );
        }
        Ok(x)
    }

    /// `Name[...]` is a generic instantiation unless the bracket is empty
    /// or followed by a type, as in the parameter `buf [4]byte`.
    fn looks_like_instantiation(&self) -> bool {
        if matches!(self.peek_at(1), TokenKind::RBrack) {
            return false;
        }
        let mut depth = 0usize;
        let mut ahead = 0;
        loop {
            match self.peek_at(ahead) {
                TokenKind::LBrack => depth += 1,
                TokenKind::RBrack => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            ahead += 1;
        }
        !matches!(
            self.peek_at(ahead + 1),
            TokenKind::Ident(_)
                | TokenKind::Mul
                | TokenKind::LBrack
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::Arrow
        )
    }

    /// Type constraint: `~T | U | ...`.
    pub(crate) fn constraint(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.constraint_term()?;
        while self.eat(&TokenKind::Or) {
            let y = self.constraint_term()?;
            x = self.make_expr(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                start,
            );
        }
        Ok(x)
    }

    fn constraint_term(&mut self) -> PResult<Expr> {
        let start = self.start();
        if self.eat(&TokenKind::Tilde) {
            let x = self.ty()?;
            return Ok(self.make_expr(
                ExprKind::Unary {
                    op: UnaryOp::Tilde,
                    x: Box::new(x),
                },
                start,
            ));
        }
        self.ty()
    }
}
