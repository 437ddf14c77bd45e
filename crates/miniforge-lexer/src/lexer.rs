//! Core lexer: converts source text to a token stream.
//!
//! Features:
//! - Every operator of the dialect, including the bitwise and shift extensions
//! - Number literals with fractions, leading dots and exponents
//! - String literals with `""` quote escapes (may span lines)
//! - Line comments kept as [`TokenKind::Comment`] tokens
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use miniforge_types::{CompileErrors, ErrorCode, SourceFile, Span, SyntaxError};

use crate::token::{Token, TokenKind};

/// The lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`miniforge_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Collected errors.
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: CompileErrors,
}

/// Start position of the token being scanned.
#[derive(Clone, Copy)]
struct Mark {
    line: u32,
    col: u32,
    pos: usize,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= miniforge_types::MAX_ERRORS {
                break;
            }
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let mark = self.mark();
            tokens.push(Token::new(TokenKind::Eof, self.span_from(mark)));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // Only count the first byte of a UTF-8 sequence as a column.
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            col: self.col,
            pos: self.pos,
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.line, mark.col, self.line, self.col).with_offsets(mark.pos, self.pos)
    }

    fn text_from(&self, mark: Mark) -> &'src str {
        let source: &'src [u8] = self.source;
        source
            .get(mark.pos..self.pos)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or("")
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        let err = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    /// Skip spaces and tabs (newlines are tokens).
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == 0x0C {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        self.skip_whitespace();
        let mark = self.mark();

        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.span_from(mark));
        };

        let kind = match ch {
            b'\n' => TokenKind::Newline,
            b'"' => return self.scan_string(mark),
            b'0'..=b'9' => return self.scan_number(mark),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => return self.scan_number(mark),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => return self.scan_identifier(mark),
            ch if ch >= 0x80 => return self.scan_identifier(mark),

            b'/' if self.peek() == Some(b'/') => {
                self.advance();
                while let Some(next) = self.peek() {
                    if next == b'\n' {
                        break;
                    }
                    self.advance();
                }
                let text = self.text_from(mark);
                let text = text.strip_prefix("//").unwrap_or(text).trim_end_matches('\r');
                TokenKind::Comment(text.to_string())
            }

            b'+' if self.eat(b'=') => TokenKind::PlusEq,
            b'+' => TokenKind::Plus,
            b'-' if self.eat(b'=') => TokenKind::MinusEq,
            b'-' => TokenKind::Minus,
            b'*' if self.eat(b'=') => TokenKind::StarEq,
            b'*' => TokenKind::Star,
            b'/' if self.eat(b'=') => TokenKind::SlashEq,
            b'/' => TokenKind::Slash,
            b'%' if self.eat(b'=') => TokenKind::PercentEq,
            b'%' => TokenKind::Percent,
            b'^' if self.eat(b'=') => TokenKind::CaretEq,
            b'^' => TokenKind::Caret,
            b'|' => TokenKind::Pipe,
            b'&' => TokenKind::Amp,
            b'@' => TokenKind::At,

            b'=' if self.eat(b'=') => TokenKind::EqEq,
            b'=' => TokenKind::Eq,
            b'!' if self.eat(b'=') => TokenKind::BangEq,
            b'<' if self.eat(b'<') => TokenKind::ShiftLeft,
            b'<' if self.eat(b'=') => TokenKind::LessEq,
            b'<' => TokenKind::Less,
            b'>' if self.peek() == Some(b'>') && self.peek_at(1) == Some(b'>') => {
                self.advance();
                self.advance();
                TokenKind::UnsignedShiftRight
            }
            b'>' if self.eat(b'>') => TokenKind::ShiftRight,
            b'>' if self.eat(b'=') => TokenKind::GreaterEq,
            b'>' => TokenKind::Greater,

            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b'#' => TokenKind::Hash,

            other => {
                let span = self.span_from(mark);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("Unexpected character '{}'", other as char),
                    span,
                );
                // Error recovery: skip the character and try again
                return self.scan();
            }
        };

        Token::new(kind, self.span_from(mark))
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, mark: Mark) -> Token {
        // The first digit (or leading dot) was already consumed.
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }

        let started_with_dot = self.source.get(mark.pos) == Some(&b'.');
        if !started_with_dot
            && self.peek() == Some(b'.')
            && matches!(self.peek_at(1), Some(b'0'..=b'9'))
        {
            self.advance(); // consume '.'
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if matches!(self.peek_at(1 + sign), Some(b'0'..=b'9')) {
                self.advance(); // consume 'e'
                if sign == 1 {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }

        let span = self.span_from(mark);
        let raw = self.text_from(mark).to_string();
        let value = match raw.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.emit_error(
                    ErrorCode::INVALID_NUMBER,
                    format!("Invalid number literal '{raw}'"),
                    span,
                );
                0.0
            }
        };

        Token::new(TokenKind::Number { value, raw }, span)
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, mark: Mark) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch >= 0x80 {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.text_from(mark);
        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, self.span_from(mark))
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening `"`.
    /// A doubled quote (`""`) inside the literal stands for one quote.
    fn scan_string(&mut self, mark: Mark) -> Token {
        let mut value = Vec::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(mark);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                    );
                    let raw = format!("{}\"", self.text_from(mark));
                    let value = String::from_utf8_lossy(&value).into_owned();
                    return Token::new(TokenKind::String { value, raw }, span);
                }
                Some(b'"') if self.peek_at(1) == Some(b'"') => {
                    self.advance();
                    self.advance();
                    value.push(b'"');
                }
                Some(b'"') => {
                    self.advance();
                    let raw = self.text_from(mark).to_string();
                    let value = String::from_utf8_lossy(&value).into_owned();
                    return Token::new(TokenKind::String { value, raw }, self.span_from(mark));
                }
                Some(ch) => {
                    self.advance();
                    value.push(ch);
                }
            }
        }
    }
}
