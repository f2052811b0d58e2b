//! Recursive-descent parser for Go source files.
//!
//! Besides whole files, the parser accepts standalone expressions,
//! statement lists and declaration lists. The rewrite engine builds
//! generated code as text and parses it through these entry points, so
//! every synthesized node goes through the same grammar as user code.

mod decl;
mod expr;
mod stmt;

use super::ast::*;
use super::lexer::lex;
use super::token::{Comment, LineIndex, Span, Token, TokenKind};
use super::SyntaxError;

pub type PResult<T> = Result<T, SyntaxError>;

pub fn parse_file(source: &str, ids: &mut IdGen) -> PResult<File> {
    let mut parser = Parser::new(source, ids)?;
    parser.file()
}

pub fn parse_expr(source: &str, ids: &mut IdGen) -> PResult<Expr> {
    let mut parser = Parser::new(source, ids)?;
    let expr = parser.expr()?;
    parser.skip_semis();
    parser.expect_eof()?;
    Ok(expr)
}

pub fn parse_stmts(source: &str, ids: &mut IdGen) -> PResult<Vec<Stmt>> {
    let mut parser = Parser::new(source, ids)?;
    let stmts = parser.stmt_list()?;
    parser.expect_eof()?;
    Ok(stmts)
}

pub fn parse_decls(source: &str, ids: &mut IdGen) -> PResult<Vec<Decl>> {
    let mut parser = Parser::new(source, ids)?;
    let mut decls = Vec::new();
    parser.skip_semis();
    while !parser.at(&TokenKind::Eof) {
        decls.push(parser.top_level_decl()?);
        parser.expect_semi()?;
        parser.skip_semis();
    }
    Ok(decls)
}

pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    lines: LineIndex,
    pos: usize,
    /// End of the last consumed token that is not an inserted semicolon.
    last_end: usize,
    /// Set while parsing a control clause header, where `T {` opens the
    /// statement body rather than a composite literal.
    no_lit: bool,
    ids: &'a mut IdGen,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, ids: &'a mut IdGen) -> PResult<Self> {
        let lexed = lex(source)?;
        Ok(Self {
            source,
            tokens: lexed.tokens,
            comments: lexed.comments,
            lines: LineIndex::new(source),
            pos: 0,
            last_end: 0,
            no_lit: false,
            ids,
        })
    }

    fn file(&mut self) -> PResult<File> {
        let id = self.next_id();
        self.skip_semis();
        self.expect(&TokenKind::Package)?;
        let package = self.ident()?;
        let header_end = self.last_end;
        self.expect_semi()?;
        let mut decls = Vec::new();
        self.skip_semis();
        while !self.at(&TokenKind::Eof) {
            decls.push(self.top_level_decl()?);
            if !self.at(&TokenKind::Eof) {
                self.expect_semi()?;
            }
            self.skip_semis();
        }
        Ok(File {
            id,
            package,
            header_end,
            decls,
            comments: std::mem::take(&mut self.comments),
            span: Span::new(0, self.source.len()),
        })
    }

    // --- token cursor -------------------------------------------------

    fn next_id(&mut self) -> NodeId {
        self.ids.next_id()
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn start(&self) -> usize {
        self.span().start
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_semi(&self) -> bool {
        matches!(self.peek(), TokenKind::Semicolon { .. })
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        if !matches!(token.kind, TokenKind::Semicolon { implicit: true }) {
            self.last_end = token.span.end;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            span: self.span(),
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        self.error_here(format!(
            "expected {wanted}, found {}",
            self.peek().describe()
        ))
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Span> {
        if self.at(kind) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{}`", kind.text())))
        }
    }

    /// A semicolon, or nothing before a closing `)` or `}`.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Semicolon { .. } => {
                self.bump();
                Ok(())
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("`;` or newline")),
        }
    }

    fn skip_semis(&mut self) {
        while self.at_semi() {
            self.bump();
        }
    }

    fn expect_eof(&mut self) -> PResult<()> {
        self.skip_semis();
        if self.at(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok(Ident {
                    id: self.next_id(),
                    name,
                    span,
                })
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn ident_list(&mut self) -> PResult<Vec<Ident>> {
        let mut names = vec![self.ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    // --- layout helpers -----------------------------------------------

    fn line_of(&self, offset: usize) -> usize {
        self.lines.line(offset)
    }

    /// Whether an empty line separates the previous token from `start`.
    fn blank_line_before(&self, start: usize) -> bool {
        if self.pos == 0 {
            return false;
        }
        let prev_end = self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| !matches!(t.kind, TokenKind::Semicolon { implicit: true }))
            .map_or(0, |t| t.span.end);
        if prev_end >= start {
            return false;
        }
        let gap = &self.source[prev_end..start];
        let lines: Vec<&str> = gap.split('\n').collect();
        lines.len() > 2
            && lines[1..lines.len() - 1]
                .iter()
                .any(|line| line.trim().is_empty())
    }

    fn with_lit<T>(&mut self, allow: bool, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.no_lit;
        self.no_lit = !allow;
        let result = f(self);
        self.no_lit = saved;
        result
    }

    fn make_expr(&mut self, kind: ExprKind, start: usize) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
            span: Span::new(start, self.last_end.max(start)),
        }
    }

    fn make_stmt(&mut self, kind: StmtKind, start: usize) -> Stmt {
        Stmt {
            id: self.next_id(),
            kind,
            span: Span::new(start, self.last_end.max(start)),
            decs: Decorations::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> File {
        let mut ids = IdGen::default();
        parse_file(source, &mut ids).unwrap_or_else(|e| panic!("parse failed: {e:?}"))
    }

    #[test]
    fn parses_functions_methods_and_generics() {
        let file = parse(indoc! {r#"
            package main

            import (
                "fmt"
                "os"
            )

            type Stack[T any] struct {
                items []T
            }

            func (s *Stack[T]) Push(v T) { s.items = append(s.items, v) }

            func Map[T, U any](xs []T, f func(T) U) []U {
                out := make([]U, 0, len(xs))
                for _, x := range xs {
                    out = append(out, f(x))
                }
                return out
            }

            func main() {
                if _, err := os.Open("x"); err != nil {
                    fmt.Println(err)
                }
            }
        "#});
        assert_eq!(file.package.name, "main");
        assert_eq!(file.decls.len(), 5);
        let names: Vec<_> = file.func_decls().map(|(_, f)| f.name.name.clone()).collect();
        assert_eq!(names, vec!["Push", "Map", "main"]);
        assert_eq!(file.imports().count(), 2);
    }

    #[test]
    fn composite_literal_is_not_parsed_in_if_header() {
        let file = parse(indoc! {r#"
            package p

            func f(x T) bool {
                if x == y {
                    return T{A: 1} == x
                }
                return false
            }
        "#});
        assert_eq!(file.decls.len(), 1);
    }

    #[test]
    fn parses_switches_selects_and_labels() {
        parse(indoc! {r#"
            package p

            func f(v any, ch chan int) {
            outer:
                for {
                    switch x := v.(type) {
                    case int, string:
                        _ = x
                    default:
                        break outer
                    }
                    select {
                    case n := <-ch:
                        ch <- n
                    case <-ch:
                    default:
                    }
                    switch {
                    case v == nil:
                        fallthrough
                    default:
                    }
                }
            }
        "#});
    }

    #[test]
    fn blank_lines_are_recorded_on_statements() {
        let file = parse("package p\n\nfunc f() {\n\ta()\n\n\tb()\n\tc()\n}\n");
        let (_, func) = file.func_decls().next().expect("func");
        let stmts = &func.body.as_ref().expect("body").stmts;
        let blanks: Vec<bool> = stmts.iter().map(|s| s.decs.blank_before).collect();
        assert_eq!(blanks, vec![false, true, false]);
    }

    #[test]
    fn statement_snippets_parse() {
        let mut ids = IdGen::starting_at(100);
        let stmts = parse_stmts("if err := f(); err != nil {\n\treturn 0, err\n}", &mut ids)
            .expect("snippet parses");
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].id.0 >= 100);
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let mut ids = IdGen::default();
        let err = parse_file("package p\n\nfunc f( {\n}\n", &mut ids).expect_err("bad input");
        assert!(err.message.contains("expected"), "{}", err.message);
    }
}
