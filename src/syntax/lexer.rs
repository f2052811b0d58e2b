use super::token::{Comment, Span, Token, TokenKind};
use super::SyntaxError;

/// Tokens plus the comments that were skipped between them.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

pub fn lex(source: &str) -> Result<Lexed, SyntaxError> {
    let mut lexer = Lexer::new(source);
    lexer.lex_all()?;
    Ok(Lexed {
        tokens: lexer.tokens,
        comments: lexer.comments,
    })
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            cursor: 0,
            tokens: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn lex_all(&mut self) -> Result<(), SyntaxError> {
        loop {
            self.skip_trivia()?;
            if self.is_at_end() {
                self.insert_semicolon(self.cursor);
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(self.cursor, self.cursor),
                });
                return Ok(());
            }
            let start = self.cursor;
            let byte = self.bytes[start];
            let kind = if is_ident_start(byte) {
                self.ident()
            } else if byte.is_ascii_digit()
                || (byte == b'.' && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()))
            {
                self.number()?
            } else if byte == b'"' {
                self.interpreted_string()?
            } else if byte == b'`' {
                self.raw_string()?
            } else if byte == b'\'' {
                self.char_literal()?
            } else {
                self.operator()?
            };
            self.tokens.push(Token {
                kind,
                span: Span::new(start, self.cursor),
            });
        }
    }

    fn is_at_end(&self) -> bool {
        self.cursor >= self.bytes.len()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.cursor + ahead).copied()
    }

    fn error(&self, message: impl Into<String>, start: usize) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            span: Span::new(start, self.cursor.max(start + 1)),
        }
    }

    fn last_ends_statement(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|token| token.kind.ends_statement())
    }

    fn insert_semicolon(&mut self, at: usize) {
        if self.last_ends_statement() {
            self.tokens.push(Token {
                kind: TokenKind::Semicolon { implicit: true },
                span: Span::new(at, at),
            });
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        while let Some(byte) = self.peek_at(0) {
            match byte {
                b' ' | b'\t' | b'\r' => self.cursor += 1,
                b'\n' => {
                    self.insert_semicolon(self.cursor);
                    self.cursor += 1;
                }
                b'/' if self.peek_at(1) == Some(b'/') => {
                    let start = self.cursor;
                    while self.peek_at(0).is_some_and(|b| b != b'\n') {
                        self.cursor += 1;
                    }
                    let end = trim_cr(self.bytes, start, self.cursor);
                    self.push_comment(start, end);
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    let start = self.cursor;
                    self.cursor += 2;
                    loop {
                        match self.peek_at(0) {
                            None => return Err(self.error("comment not terminated", start)),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.cursor += 2;
                                break;
                            }
                            Some(_) => self.cursor += 1,
                        }
                    }
                    self.push_comment(start, self.cursor);
                    if self.source[start..self.cursor].contains('\n') {
                        self.insert_semicolon(start);
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn push_comment(&mut self, start: usize, end: usize) {
        self.comments.push(Comment {
            text: self.source[start..end].to_string(),
            span: Span::new(start, end),
        });
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.cursor;
        while self.peek_at(0).is_some_and(is_ident_continue) {
            self.cursor += 1;
        }
        let word = &self.source[start..self.cursor];
        TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.cursor;
        let mut is_float = false;
        let radix_prefix = self.peek_at(0) == Some(b'0')
            && matches!(
                self.peek_at(1),
                Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
            );
        if radix_prefix {
            let hex = matches!(self.peek_at(1), Some(b'x' | b'X'));
            self.cursor += 2;
            while self
                .peek_at(0)
                .is_some_and(|b| b.is_ascii_hexdigit() || b == b'_')
            {
                self.cursor += 1;
            }
            if hex && self.peek_at(0) == Some(b'.') {
                is_float = true;
                self.cursor += 1;
                while self
                    .peek_at(0)
                    .is_some_and(|b| b.is_ascii_hexdigit() || b == b'_')
                {
                    self.cursor += 1;
                }
            }
            if hex && matches!(self.peek_at(0), Some(b'p' | b'P')) {
                is_float = true;
                self.exponent();
            }
        } else {
            self.digits();
            if self.peek_at(0) == Some(b'.') && self.peek_at(1) != Some(b'.') {
                is_float = true;
                self.cursor += 1;
                self.digits();
            }
            if matches!(self.peek_at(0), Some(b'e' | b'E')) {
                is_float = true;
                self.exponent();
            }
        }
        if self.cursor == start {
            return Err(self.error("malformed number", start));
        }
        if self.peek_at(0) == Some(b'i') {
            self.cursor += 1;
            return Ok(TokenKind::Imag(self.source[start..self.cursor].to_string()));
        }
        let text = self.source[start..self.cursor].to_string();
        Ok(if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        })
    }

    fn digits(&mut self) {
        while self
            .peek_at(0)
            .is_some_and(|b| b.is_ascii_digit() || b == b'_')
        {
            self.cursor += 1;
        }
    }

    fn exponent(&mut self) {
        self.cursor += 1;
        if matches!(self.peek_at(0), Some(b'+' | b'-')) {
            self.cursor += 1;
        }
        self.digits();
    }

    fn interpreted_string(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.cursor;
        self.cursor += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => return Err(self.error("string literal not terminated", start)),
                Some(b'\\') => self.cursor += 2,
                Some(b'"') => {
                    self.cursor += 1;
                    break;
                }
                Some(_) => self.cursor += 1,
            }
        }
        Ok(TokenKind::Str(self.source[start..self.cursor].to_string()))
    }

    fn raw_string(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.cursor;
        self.cursor += 1;
        loop {
            match self.peek_at(0) {
                None => return Err(self.error("raw string literal not terminated", start)),
                Some(b'`') => {
                    self.cursor += 1;
                    break;
                }
                Some(_) => self.cursor += 1,
            }
        }
        Ok(TokenKind::Str(self.source[start..self.cursor].to_string()))
    }

    fn char_literal(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.cursor;
        self.cursor += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => return Err(self.error("rune literal not terminated", start)),
                Some(b'\\') => self.cursor += 2,
                Some(b'\'') => {
                    self.cursor += 1;
                    break;
                }
                Some(_) => self.cursor += 1,
            }
        }
        Ok(TokenKind::Char(self.source[start..self.cursor].to_string()))
    }

    fn operator(&mut self) -> Result<TokenKind, SyntaxError> {
        const OPERATORS: &[(&str, TokenKind)] = &[
            ("<<=", TokenKind::ShlAssign),
            (">>=", TokenKind::ShrAssign),
            ("&^=", TokenKind::AndNotAssign),
            ("...", TokenKind::Ellipsis),
            ("+=", TokenKind::AddAssign),
            ("-=", TokenKind::SubAssign),
            ("*=", TokenKind::MulAssign),
            ("/=", TokenKind::QuoAssign),
            ("%=", TokenKind::RemAssign),
            ("&=", TokenKind::AndAssign),
            ("|=", TokenKind::OrAssign),
            ("^=", TokenKind::XorAssign),
            ("<<", TokenKind::Shl),
            (">>", TokenKind::Shr),
            ("&^", TokenKind::AndNot),
            ("&&", TokenKind::LAnd),
            ("||", TokenKind::LOr),
            ("<-", TokenKind::Arrow),
            ("++", TokenKind::Inc),
            ("--", TokenKind::Dec),
            ("==", TokenKind::Eql),
            ("!=", TokenKind::Neq),
            ("<=", TokenKind::Leq),
            (">=", TokenKind::Geq),
            (":=", TokenKind::Define),
            ("+", TokenKind::Add),
            ("-", TokenKind::Sub),
            ("*", TokenKind::Mul),
            ("/", TokenKind::Quo),
            ("%", TokenKind::Rem),
            ("&", TokenKind::And),
            ("|", TokenKind::Or),
            ("^", TokenKind::Xor),
            ("<", TokenKind::Lss),
            (">", TokenKind::Gtr),
            ("=", TokenKind::Assign),
            ("!", TokenKind::Not),
            ("~", TokenKind::Tilde),
            ("(", TokenKind::LParen),
            ("[", TokenKind::LBrack),
            ("{", TokenKind::LBrace),
            (",", TokenKind::Comma),
            (".", TokenKind::Period),
            (")", TokenKind::RParen),
            ("]", TokenKind::RBrack),
            ("}", TokenKind::RBrace),
            (";", TokenKind::Semicolon { implicit: false }),
            (":", TokenKind::Colon),
        ];
        let rest = &self.source[self.cursor..];
        for (text, kind) in OPERATORS {
            if rest.starts_with(text) {
                self.cursor += text.len();
                return Ok(kind.clone());
            }
        }
        let start = self.cursor;
        self.cursor += rest.chars().next().map_or(1, char::len_utf8);
        Err(self.error(
            format!("unexpected character `{}`", &self.source[start..self.cursor]),
            start,
        ))
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_ident_continue(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

fn trim_cr(bytes: &[u8], start: usize, mut end: usize) -> usize {
    while end > start && bytes[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lexes")
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn inserts_semicolons_at_line_ends() {
        let tokens = kinds("x := f()\nreturn\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Define,
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Semicolon { implicit: true },
                TokenKind::Return,
                TokenKind::Semicolon { implicit: true },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operator_at_line_end() {
        let tokens = kinds("a +\nb");
        assert!(!tokens[..3].contains(&TokenKind::Semicolon { implicit: true }));
    }

    #[test]
    fn comments_are_collected_separately() {
        let lexed = lex("f() // trailing\n/* block */ g()").expect("lexes");
        let texts: Vec<_> = lexed.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["// trailing", "/* block */"]);
        assert!(lexed
            .tokens
            .iter()
            .all(|t| !matches!(&t.kind, TokenKind::Ident(n) if n == "trailing")));
    }

    #[test]
    fn numbers_and_strings() {
        let tokens = kinds("0x1F 1.5 .5 1e3 2i 'a' \"s\\\"\" `raw\nline`");
        assert_eq!(tokens[0], TokenKind::Int("0x1F".into()));
        assert_eq!(tokens[1], TokenKind::Float("1.5".into()));
        assert_eq!(tokens[2], TokenKind::Float(".5".into()));
        assert_eq!(tokens[3], TokenKind::Float("1e3".into()));
        assert_eq!(tokens[4], TokenKind::Imag("2i".into()));
        assert_eq!(tokens[5], TokenKind::Char("'a'".into()));
        assert_eq!(tokens[6], TokenKind::Str("\"s\\\"\"".into()));
        assert_eq!(tokens[7], TokenKind::Str("`raw\nline`".into()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex("x := \"oops\n").is_err());
    }
}
