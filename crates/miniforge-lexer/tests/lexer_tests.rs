//! Lexer tests.
//!
//! Covers: keywords, operators (including bitwise and shift), number and
//! string literals, comment retention, spans, error recovery and
//! determinism.

use miniforge_lexer::{Lexer, TokenKind, ALL_KEYWORDS};
use miniforge_types::SourceFile;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("test.src", source);
    let result = Lexer::new(&sf).lex();
    result
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

/// Lex and return the error count.
fn error_count(source: &str) -> usize {
    let sf = SourceFile::new("test.src", source);
    Lexer::new(&sf).lex().errors.total_errors
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

fn number(raw: &str) -> TokenKind {
    TokenKind::Number {
        value: raw.parse().unwrap(),
        raw: raw.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_all_keywords_lex_as_keywords() {
    for word in ALL_KEYWORDS {
        let toks = kinds(word);
        assert_eq!(toks.len(), 1, "keyword '{word}'");
        assert!(toks[0].is_keyword(), "'{word}' lexed as {:?}", toks[0]);
    }
}

#[test]
fn test_identifiers_with_digits_and_underscores() {
    assert_eq!(
        kinds("_tmp value2 endX"),
        vec![ident("_tmp"), ident("value2"), ident("endX")]
    );
}

#[test]
fn test_end_if_is_two_tokens() {
    assert_eq!(kinds("end if"), vec![TokenKind::End, TokenKind::If]);
}

// ─────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_and_compound_operators() {
    assert_eq!(
        kinds("+ - * / % ^ += -= *= /= %= ^="),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Caret,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::PercentEq,
            TokenKind::CaretEq,
        ]
    );
}

#[test]
fn test_comparison_operators() {
    assert_eq!(
        kinds("== != < > <= >= ="),
        vec![
            TokenKind::EqEq,
            TokenKind::BangEq,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEq,
            TokenKind::GreaterEq,
            TokenKind::Eq,
        ]
    );
}

#[test]
fn test_bitwise_and_shift_operators() {
    assert_eq!(
        kinds("a | b & c << 1 >> 2 >>> 3"),
        vec![
            ident("a"),
            TokenKind::Pipe,
            ident("b"),
            TokenKind::Amp,
            ident("c"),
            TokenKind::ShiftLeft,
            number("1"),
            TokenKind::ShiftRight,
            number("2"),
            TokenKind::UnsignedShiftRight,
            number("3"),
        ]
    );
}

#[test]
fn test_directive_hash() {
    assert_eq!(
        kinds("#envar HOME;"),
        vec![TokenKind::Hash, ident("envar"), ident("HOME"), TokenKind::Semicolon]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_number_forms() {
    assert_eq!(
        kinds("42 3.14 .5 1e3 2.5E-2"),
        vec![
            number("42"),
            number("3.14"),
            number(".5"),
            number("1e3"),
            number("2.5E-2"),
        ]
    );
}

#[test]
fn test_member_access_after_number_is_not_fraction() {
    // `1.` followed by a letter stays a number then a dot.
    assert_eq!(kinds("1.a"), vec![number("1"), TokenKind::Dot, ident("a")]);
}

#[test]
fn test_string_with_doubled_quotes() {
    let toks = kinds(r#""say ""hi""""#);
    assert_eq!(
        toks,
        vec![TokenKind::String {
            value: "say \"hi\"".to_string(),
            raw: r#""say ""hi""""#.to_string(),
        }]
    );
}

#[test]
fn test_empty_string() {
    assert_eq!(
        kinds(r#""""#),
        vec![TokenKind::String {
            value: String::new(),
            raw: "\"\"".to_string(),
        }]
    );
}

#[test]
fn test_multiline_string_tracks_lines() {
    let sf = SourceFile::new("test.src", "\"a\nb\" x");
    let toks = Lexer::new(&sf).lex().tokens;
    assert_eq!(toks[0].span.start_line, 1);
    assert_eq!(toks[0].span.end_line, 2);
    assert_eq!(toks[1].span.start_line, 2);
}

#[test]
fn test_unterminated_string_is_error() {
    assert_eq!(error_count("x = \"abc"), 1);
}

// ─────────────────────────────────────────────────────────────────────
// Comments & newlines
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_comments_are_kept() {
    assert_eq!(
        kinds("x = 1 // note\n// whole line"),
        vec![
            ident("x"),
            TokenKind::Eq,
            number("1"),
            TokenKind::Comment(" note".to_string()),
            TokenKind::Newline,
            TokenKind::Comment(" whole line".to_string()),
        ]
    );
}

#[test]
fn test_crlf_newlines() {
    assert_eq!(
        kinds("a\r\nb"),
        vec![ident("a"), TokenKind::Newline, ident("b")]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Spans
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_token_spans_carry_offsets() {
    let sf = SourceFile::new("test.src", "foo = 12");
    let toks = Lexer::new(&sf).lex().tokens;
    assert_eq!(toks[2].span.start_col, 7);
    assert_eq!(sf.slice(toks[2].span), Some("12"));
}

// ─────────────────────────────────────────────────────────────────────
// Error recovery & determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unexpected_character_recovers() {
    let sf = SourceFile::new("test.src", "a = 1 $ b");
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.total_errors, 1);
    let has_b = result
        .tokens
        .iter()
        .any(|t| t.kind == TokenKind::Identifier("b".into()));
    assert!(has_b, "lexing should continue after the bad character");
}

#[test]
fn test_determinism_100_iterations() {
    let source = "f = function(a, b=2)\n  return a + b // sum\nend function\n";
    let first = kinds(source);
    for i in 0..100 {
        assert_eq!(first, kinds(source), "Determinism failure at iteration {i}");
    }
}
