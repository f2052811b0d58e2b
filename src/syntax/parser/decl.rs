use super::{PResult, Parser};
use crate::syntax::ast::*;
use crate::syntax::token::{Span, TokenKind};

impl Parser<'_> {
    pub(super) fn top_level_decl(&mut self) -> PResult<Decl> {
        let start = self.start();
        let blank_before = self.blank_line_before(start);
        let id = self.next_id();
        let kind = match self.peek() {
            TokenKind::Func => DeclKind::Func(self.func_decl()?),
            TokenKind::Var | TokenKind::Const | TokenKind::Type | TokenKind::Import => {
                DeclKind::Gen(self.gen_decl()?)
            }
            _ => return Err(self.unexpected("declaration")),
        };
        Ok(Decl {
            id,
            kind,
            span: Span::new(start, self.last_end),
            decs: Decorations {
                blank_before,
                ..Decorations::default()
            },
            dirty: false,
        })
    }

    fn func_decl(&mut self) -> PResult<FuncDecl> {
        self.expect(&TokenKind::Func)?;
        let recv = if self.at(&TokenKind::LParen) {
            Some(self.params()?)
        } else {
            None
        };
        let name = self.ident()?;
        let type_id = self.next_id();
        let type_params = if self.at(&TokenKind::LBrack) {
            Some(self.type_params()?)
        } else {
            None
        };
        let (params, results) = self.signature()?;
        let body = if self.at(&TokenKind::LBrace) {
            Some(self.with_lit(true, |p| p.block())?)
        } else {
            None
        };
        Ok(FuncDecl {
            recv,
            name,
            ty: FuncType {
                id: type_id,
                type_params,
                params,
                results,
            },
            body,
        })
    }

    pub(super) fn signature(&mut self) -> PResult<(FieldList, Option<FieldList>)> {
        let params = self.params()?;
        let results = self.results()?;
        Ok((params, results))
    }

    fn results(&mut self) -> PResult<Option<FieldList>> {
        if self.at(&TokenKind::LParen) {
            return Ok(Some(self.params()?));
        }
        if !self.at_type_start() {
            return Ok(None);
        }
        let start = self.start();
        let ty = self.ty()?;
        let field = Field {
            id: self.next_id(),
            names: Vec::new(),
            ty,
            tag: None,
            span: Span::new(start, self.last_end),
            decs: Decorations::default(),
        };
        Ok(Some(FieldList {
            id: self.next_id(),
            fields: vec![field],
            parens: false,
            close_comments: Vec::new(),
        }))
    }

    pub(super) fn at_type_start(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Ident(_)
                | TokenKind::LBrack
                | TokenKind::Struct
                | TokenKind::Mul
                | TokenKind::Func
                | TokenKind::Interface
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::LParen
                | TokenKind::Arrow
        )
    }

    /// Parenthesized parameter or result list.
    pub(super) fn params(&mut self) -> PResult<FieldList> {
        let id = self.next_id();
        self.expect(&TokenKind::LParen)?;
        let fields = self.with_lit(true, |p| p.param_entries(&TokenKind::RParen, false))?;
        self.expect(&TokenKind::RParen)?;
        Ok(FieldList {
            id,
            fields,
            parens: true,
            close_comments: Vec::new(),
        })
    }

    pub(super) fn type_params(&mut self) -> PResult<FieldList> {
        let id = self.next_id();
        self.expect(&TokenKind::LBrack)?;
        let fields = self.with_lit(true, |p| p.param_entries(&TokenKind::RBrack, true))?;
        self.expect(&TokenKind::RBrack)?;
        Ok(FieldList {
            id,
            fields,
            parens: false,
            close_comments: Vec::new(),
        })
    }

    /// Parses `a, b int, c string` or `int, string` style lists. Leading
    /// entries without a type of their own share the next entry's type.
    fn param_entries(&mut self, close: &TokenKind, constraints: bool) -> PResult<Vec<Field>> {
        let mut fields = Vec::new();
        let mut pending: Vec<(Expr, usize)> = Vec::new();
        let mut named = false;
        self.skip_semis();
        while !self.at(close) {
            let start = self.start();
            let item = self.param_type(constraints)?;
            if !self.at(&TokenKind::Comma) && !self.at(close) && !self.at_semi() {
                let ty = self.param_type(constraints)?;
                let mut names = Vec::new();
                let group_start = pending.first().map_or(start, |(_, s)| *s);
                for (expr, _) in pending.drain(..) {
                    names.push(self.expr_into_ident(expr)?);
                }
                names.push(self.expr_into_ident(item)?);
                fields.push(Field {
                    id: self.next_id(),
                    names,
                    ty,
                    tag: None,
                    span: Span::new(group_start, self.last_end),
                    decs: Decorations::default(),
                });
                named = true;
            } else {
                pending.push((item, start));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_semis();
        }
        self.skip_semis();
        if named {
            if let Some((expr, _)) = pending.first() {
                return Err(crate::syntax::SyntaxError {
                    message: "mixed named and unnamed parameters".to_string(),
                    span: expr.span,
                });
            }
        } else {
            for (ty, start) in pending {
                let span = Span::new(start, ty.span.end);
                fields.push(Field {
                    id: self.next_id(),
                    names: Vec::new(),
                    ty,
                    tag: None,
                    span,
                    decs: Decorations::default(),
                });
            }
        }
        Ok(fields)
    }

    fn param_type(&mut self, constraint: bool) -> PResult<Expr> {
        let start = self.start();
        if self.eat(&TokenKind::Ellipsis) {
            let elt = self.ty()?;
            return Ok(self.make_expr(ExprKind::Ellipsis(Some(Box::new(elt))), start));
        }
        if constraint {
            self.constraint()
        } else {
            self.ty()
        }
    }

    fn expr_into_ident(&mut self, expr: Expr) -> PResult<Ident> {
        match expr.kind {
            ExprKind::Ident(ident) => Ok(ident),
            _ => Err(crate::syntax::SyntaxError {
                message: "expected parameter name".to_string(),
                span: expr.span,
            }),
        }
    }

    pub(super) fn gen_decl(&mut self) -> PResult<GenDecl> {
        let tok = match self.bump().kind {
            TokenKind::Import => GenTok::Import,
            TokenKind::Const => GenTok::Const,
            TokenKind::Type => GenTok::Type,
            TokenKind::Var => GenTok::Var,
            _ => return Err(self.unexpected("declaration keyword")),
        };
        if self.eat(&TokenKind::LParen) {
            let mut specs = Vec::new();
            self.skip_semis();
            while !self.at(&TokenKind::RParen) {
                specs.push(self.spec(tok)?);
                self.expect_semi()?;
                self.skip_semis();
            }
            self.expect(&TokenKind::RParen)?;
            Ok(GenDecl {
                tok,
                grouped: true,
                specs,
                close_comments: Vec::new(),
            })
        } else {
            let spec = self.spec(tok)?;
            Ok(GenDecl {
                tok,
                grouped: false,
                specs: vec![spec],
                close_comments: Vec::new(),
            })
        }
    }

    fn spec(&mut self, tok: GenTok) -> PResult<Spec> {
        let start = self.start();
        let blank_before = self.blank_line_before(start);
        let id = self.next_id();
        let kind = match tok {
            GenTok::Import => SpecKind::Import(self.import_spec()?),
            GenTok::Const | GenTok::Var => SpecKind::Value(self.value_spec()?),
            GenTok::Type => SpecKind::Type(self.type_spec()?),
        };
        Ok(Spec {
            id,
            kind,
            span: Span::new(start, self.last_end),
            decs: Decorations {
                blank_before,
                ..Decorations::default()
            },
        })
    }

    fn import_spec(&mut self) -> PResult<ImportSpec> {
        let name = match self.peek() {
            TokenKind::Ident(_) => Some(self.ident()?),
            TokenKind::Period => {
                let span = self.bump().span;
                Some(Ident {
                    id: self.next_id(),
                    name: ".".to_string(),
                    span,
                })
            }
            _ => None,
        };
        match self.peek().clone() {
            TokenKind::Str(path) => {
                self.bump();
                Ok(ImportSpec { name, path })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn value_spec(&mut self) -> PResult<ValueSpec> {
        let names = self.ident_list()?;
        let ty = if !self.at(&TokenKind::Assign) && !self.at_semi() && !self.at(&TokenKind::RParen)
        {
            Some(self.ty()?)
        } else {
            None
        };
        let values = if self.eat(&TokenKind::Assign) {
            self.with_lit(true, |p| p.expr_list())?
        } else {
            Vec::new()
        };
        Ok(ValueSpec { names, ty, values })
    }

    fn type_spec(&mut self) -> PResult<TypeSpec> {
        let name = self.ident()?;
        let generic = self.at(&TokenKind::LBrack)
            && matches!(self.peek_at(1), TokenKind::Ident(_))
            && matches!(
                self.peek_at(2),
                TokenKind::Ident(_)
                    | TokenKind::Comma
                    | TokenKind::Interface
                    | TokenKind::Tilde
                    | TokenKind::LBrack
                    | TokenKind::Func
                    | TokenKind::Map
                    | TokenKind::Chan
                    | TokenKind::Struct
            );
        let type_params = if generic {
            Some(self.type_params()?)
        } else {
            None
        };
        let alias = self.eat(&TokenKind::Assign);
        let ty = self.ty()?;
        Ok(TypeSpec {
            name,
            type_params,
            alias,
            ty,
        })
    }

    pub(super) fn struct_type(&mut self) -> PResult<FieldList> {
        self.expect(&TokenKind::Struct)?;
        let id = self.next_id();
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        self.skip_semis();
        while !self.at(&TokenKind::RBrace) {
            let start = self.start();
            let blank_before = self.blank_line_before(start);
            let embedded = match self.peek() {
                TokenKind::Mul => true,
                TokenKind::Ident(_) => matches!(
                    self.peek_at(1),
                    TokenKind::Semicolon { .. }
                        | TokenKind::RBrace
                        | TokenKind::Str(_)
                        | TokenKind::Period
                ),
                _ => false,
            };
            let (names, ty) = if embedded {
                (Vec::new(), self.ty()?)
            } else {
                let names = self.ident_list()?;
                (names, self.ty()?)
            };
            let tag = match self.peek().clone() {
                TokenKind::Str(tag) => {
                    self.bump();
                    Some(tag)
                }
                _ => None,
            };
            fields.push(Field {
                id: self.next_id(),
                names,
                ty,
                tag,
                span: Span::new(start, self.last_end),
                decs: Decorations {
                    blank_before,
                    ..Decorations::default()
                },
            });
            self.expect_semi()?;
            self.skip_semis();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(FieldList {
            id,
            fields,
            parens: false,
            close_comments: Vec::new(),
        })
    }

    pub(super) fn interface_type(&mut self) -> PResult<FieldList> {
        self.expect(&TokenKind::Interface)?;
        let id = self.next_id();
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        self.skip_semis();
        while !self.at(&TokenKind::RBrace) {
            let start = self.start();
            let blank_before = self.blank_line_before(start);
            let is_method = matches!(self.peek(), TokenKind::Ident(_))
                && matches!(self.peek_at(1), TokenKind::LParen);
            let (names, ty) = if is_method {
                let name = self.ident()?;
                let ty_start = self.start();
                let type_id = self.next_id();
                let (params, results) = self.signature()?;
                let func = FuncType {
                    id: type_id,
                    type_params: None,
                    params,
                    results,
                };
                (
                    vec![name],
                    self.make_expr(ExprKind::FuncType(func), ty_start),
                )
            } else {
                (Vec::new(), self.constraint()?)
            };
            fields.push(Field {
                id: self.next_id(),
                names,
                ty,
                tag: None,
                span: Span::new(start, self.last_end),
                decs: Decorations {
                    blank_before,
                    ..Decorations::default()
                },
            });
            self.expect_semi()?;
            self.skip_semis();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(FieldList {
            id,
            fields,
            parens: false,
            close_comments: Vec::new(),
        })
    }
}
