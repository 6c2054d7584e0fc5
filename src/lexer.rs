//! Lexer: character stream to token stream.
//!
//! Single-token lookahead over a source string held by reference for the
//! lifetime of the lexer. Whitespace and comments are skipped silently;
//! three comment syntaxes are supported and block comments nest.

use crate::token::{classify_identifier, SourceLocation, Token, TokenKind};

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: usize,
    column: usize,
    errors: Vec<String>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns what `next()` would return without consuming it.
    fn peek_char(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance_char(&mut self) -> Option<u8> {
        let c = self.peek_char()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.pos)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance_char();
                }
                Some(b'{') => self.skip_block_comment(),
                Some(b'(') if self.peek_char_at(1) == Some(b'*') => self.skip_block_comment(),
                Some(b'/') if self.peek_char_at(1) == Some(b'/') => self.skip_line_comment(),
                _ => break,
            }
        }
    }

    /// `{ … }` and `(* … *)` share one nesting depth: either opener
    /// increases it, either closer decreases it, so `{ (* } *)` is
    /// consumed as a single comment rather than having the brace scanner
    /// close at the first `}` and leave ` *)` to be lexed as real tokens.
    fn skip_block_comment(&mut self) {
        let start = self.location();
        let mut depth = 0usize;
        loop {
            if self.peek_char() == Some(b'{') {
                depth += 1;
                self.advance_char();
            } else if self.peek_char() == Some(b'}') {
                depth -= 1;
                self.advance_char();
                if depth == 0 {
                    return;
                }
            } else if self.peek_char() == Some(b'(') && self.peek_char_at(1) == Some(b'*') {
                depth += 1;
                self.advance_char();
                self.advance_char();
            } else if self.peek_char() == Some(b'*') && self.peek_char_at(1) == Some(b')') {
                depth -= 1;
                self.advance_char();
                self.advance_char();
                if depth == 0 {
                    return;
                }
            } else if self.peek_char().is_some() {
                self.advance_char();
            } else {
                self.errors.push(format!(
                    "{}: unterminated comment starting at {}",
                    self.location(),
                    start
                ));
                return;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == b'\n' {
                break;
            }
            self.advance_char();
        }
    }

    /// Returns what `next()` would return without consuming it, by saving
    /// position/line/column, calling `next()`, then restoring.
    pub fn peek(&mut self) -> Token {
        let saved = (self.pos, self.line, self.column);
        let tok = self.next();
        self.pos = saved.0;
        self.line = saved.1;
        self.column = saved.2;
        tok
    }

    pub fn next(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let loc = self.location();
        let Some(c) = self.peek_char() else {
            return Token::eof(loc);
        };

        if c == b'_' || c.is_ascii_alphabetic() {
            return self.lex_identifier(loc);
        }
        if c.is_ascii_digit() {
            return self.lex_number(loc);
        }
        if c == b'\'' {
            return self.lex_string(loc);
        }
        if c == b'#' {
            return self.lex_char_code(loc);
        }
        self.lex_operator(loc)
    }

    fn lex_identifier(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == b'_' || c.is_ascii_alphanumeric() {
                self.advance_char();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = classify_identifier(&text);
        Token::new(kind, text, loc)
    }

    /// Integer is `[0-9]+`; real is `[0-9]+ '.' [0-9]+ (['eE'] ['+''-']? [0-9]+)?`.
    /// Must not consume `..` as a fractional point, so that `0..9` still
    /// lexes as two integer tokens joined by a range operator.
    fn lex_number(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance_char();
        }
        let mut is_real = false;
        if self.peek_char() == Some(b'.') && self.peek_char_at(1) != Some(b'.') {
            if matches!(self.peek_char_at(1), Some(c) if c.is_ascii_digit()) {
                is_real = true;
                self.advance_char(); // '.'
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.advance_char();
                }
            }
        }
        if matches!(self.peek_char(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_char_at(1), Some(b'+') | Some(b'-')) {
                lookahead = 2;
            }
            if matches!(self.peek_char_at(lookahead), Some(c) if c.is_ascii_digit()) {
                is_real = true;
                self.advance_char(); // e/E
                if lookahead == 2 {
                    self.advance_char(); // sign
                }
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.advance_char();
                }
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = if is_real {
            TokenKind::RealLiteral
        } else {
            TokenKind::IntegerLiteral
        };
        Token::new(kind, text, loc)
    }

    /// `'…'` with doubled `''` as an escaped quote. Length-1 literals
    /// classify as `CharLiteral`; everything else (including empty) as
    /// `StringLiteral`.
    fn lex_string(&mut self, loc: SourceLocation) -> Token {
        self.advance_char(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek_char() {
                Some(b'\'') => {
                    self.advance_char();
                    if self.peek_char() == Some(b'\'') {
                        self.advance_char();
                        value.push('\'');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    self.advance_char();
                    value.push(c as char);
                }
                None => {
                    self.errors.push(format!(
                        "{}: unterminated string literal starting at {}",
                        self.location(),
                        loc
                    ));
                    break;
                }
            }
        }
        let kind = if value.chars().count() == 1 {
            TokenKind::CharLiteral
        } else {
            TokenKind::StringLiteral
        };
        Token::new(kind, value, loc)
    }

    /// `#` followed by digits: a char-code literal whose value text
    /// includes the leading `#`.
    fn lex_char_code(&mut self, loc: SourceLocation) -> Token {
        let start = self.pos;
        self.advance_char(); // '#'
        let mut has_digits = false;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            has_digits = true;
            self.advance_char();
        }
        if !has_digits {
            self.errors.push(format!(
                "{}: expected digits after '#' in character-code literal",
                loc
            ));
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        Token::new(TokenKind::CharLiteral, text, loc)
    }

    fn lex_operator(&mut self, loc: SourceLocation) -> Token {
        use TokenKind::*;
        let two = |s: &mut Self, kind: TokenKind| -> Token {
            let start = s.pos;
            s.advance_char();
            s.advance_char();
            let text = std::string::String::from_utf8_lossy(&s.source[start..s.pos]).into_owned();
            Token::new(kind, text, loc)
        };
        let one = |s: &mut Self, kind: TokenKind| -> Token {
            let start = s.pos;
            s.advance_char();
            let text = std::string::String::from_utf8_lossy(&s.source[start..s.pos]).into_owned();
            Token::new(kind, text, loc)
        };

        match (self.peek_char(), self.peek_char_at(1)) {
            (Some(b':'), Some(b'=')) => two(self, Assign),
            (Some(b'<'), Some(b'=')) => two(self, LessEqual),
            (Some(b'>'), Some(b'=')) => two(self, GreaterEqual),
            (Some(b'<'), Some(b'>')) => two(self, NotEqual),
            (Some(b'.'), Some(b'.')) => two(self, Range),
            (Some(b'+'), _) => one(self, Plus),
            (Some(b'-'), _) => one(self, Minus),
            (Some(b'*'), _) => one(self, Multiply),
            (Some(b'/'), _) => one(self, Divide),
            (Some(b'='), _) => one(self, Equal),
            (Some(b'<'), _) => one(self, LessThan),
            (Some(b'>'), _) => one(self, GreaterThan),
            (Some(b';'), _) => one(self, Semicolon),
            (Some(b','), _) => one(self, Comma),
            (Some(b'.'), _) => one(self, Period),
            (Some(b':'), _) => one(self, Colon),
            (Some(b'('), _) => one(self, LeftParen),
            (Some(b')'), _) => one(self, RightParen),
            (Some(b'['), _) => one(self, LeftBracket),
            (Some(b']'), _) => one(self, RightBracket),
            (Some(b'^'), _) => one(self, Caret),
            (Some(b'@'), _) => one(self, At),
            (Some(c), _) => {
                self.errors
                    .push(format!("{}: unexpected character '{}'", loc, c as char));
                one(self, Invalid)
            }
            (None, _) => Token::eof(loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lexer.next();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn nested_brace_star_comment_is_one_region() {
        // "{ (* } *)" is one comment
        let src = "{ (* } *) begin";
        assert_eq!(kinds(src), vec![TokenKind::Begin]);
    }

    #[test]
    fn mismatched_brace_then_error() {
        // "{ } }" is a comment followed by an error token
        let mut lexer = Lexer::new("{ } } begin");
        let t1 = lexer.next();
        assert_eq!(t1.kind, TokenKind::Invalid);
        let t2 = lexer.next();
        assert_eq!(t2.kind, TokenKind::Begin);
    }

    #[test]
    fn line_comment_stops_at_newline() {
        let src = "// comment\nbegin";
        assert_eq!(kinds(src), vec![TokenKind::Begin]);
    }

    #[test]
    fn range_not_consumed_as_decimal_point() {
        let src = "0..9";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::Range,
                TokenKind::IntegerLiteral
            ]
        );
    }

    #[test]
    fn real_literal_with_exponent() {
        let mut lexer = Lexer::new("1.5e-3");
        let t = lexer.next();
        assert_eq!(t.kind, TokenKind::RealLiteral);
        assert_eq!(t.text, "1.5e-3");
    }

    #[test]
    fn doubled_quote_is_one_literal_quote() {
        let mut lexer = Lexer::new("'it''s'");
        let t = lexer.next();
        assert_eq!(t.kind, TokenKind::StringLiteral);
        assert_eq!(t.text, "it's");
    }

    #[test]
    fn single_char_literal_classified_as_char() {
        let mut lexer = Lexer::new("'x'");
        let t = lexer.next();
        assert_eq!(t.kind, TokenKind::CharLiteral);
    }

    #[test]
    fn char_code_literal_includes_hash() {
        let mut lexer = Lexer::new("#65");
        let t = lexer.next();
        assert_eq!(t.kind, TokenKind::CharLiteral);
        assert_eq!(t.text, "#65");
    }

    #[test]
    fn two_char_operators_precede_single_char() {
        assert_eq!(
            kinds(":= <= >= <> .."),
            vec![
                TokenKind::Assign,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::NotEqual,
                TokenKind::Range,
            ]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("begin end");
        let peeked = lexer.peek();
        assert_eq!(peeked.kind, TokenKind::Begin);
        let next = lexer.next();
        assert_eq!(next.kind, TokenKind::Begin);
        assert_eq!(lexer.next().kind, TokenKind::End);
    }

    #[test]
    fn eof_is_idempotent() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next().kind, TokenKind::Eof);
        assert_eq!(lexer.next().kind, TokenKind::Eof);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut lexer = Lexer::new("{ unterminated");
        lexer.next();
        assert!(!lexer.errors().is_empty());
    }

    #[test]
    fn token_location_matches_first_character() {
        let mut lexer = Lexer::new("  begin");
        let t = lexer.next();
        assert_eq!(t.location.column, 3);
    }
}
