//! Go tokenizer with automatic semicolon insertion.
//!
//! Comments are not part of the token stream; they are collected on the side so
//! the parser can attach doc comments and read `//go:build` lines.

use crate::diagnostics::{Diagnostic, FileId, Span};

mod literals;
mod state;
mod trivia;

pub use keyword::Keyword;
pub use literals::{parse_int_literal, unquote};
pub use token::{Comment, LiteralKind, Token, TokenKind};

mod keyword {
    use super::TokenKind;

    /// Reserved words of the Go language.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Keyword {
        Break,
        Case,
        Chan,
        Const,
        Continue,
        Default,
        Defer,
        Else,
        Fallthrough,
        For,
        Func,
        Go,
        Goto,
        If,
        Import,
        Interface,
        Map,
        Package,
        Range,
        Return,
        Select,
        Struct,
        Switch,
        Type,
        Var,
    }

    impl Keyword {
        #[must_use]
        pub fn from_ident(ident: &str) -> Option<Self> {
            KEYWORDS
                .iter()
                .find_map(|(name, keyword)| (*name == ident).then_some(*keyword))
        }

        #[must_use]
        pub fn as_str(self) -> &'static str {
            KEYWORDS
                .iter()
                .find_map(|(name, keyword)| (*keyword == self).then_some(*name))
                .unwrap_or("?")
        }

        pub fn token_kind(self) -> TokenKind {
            TokenKind::Keyword(self)
        }
    }

    const KEYWORDS: &[(&str, Keyword)] = &[
        ("break", Keyword::Break),
        ("case", Keyword::Case),
        ("chan", Keyword::Chan),
        ("const", Keyword::Const),
        ("continue", Keyword::Continue),
        ("default", Keyword::Default),
        ("defer", Keyword::Defer),
        ("else", Keyword::Else),
        ("fallthrough", Keyword::Fallthrough),
        ("for", Keyword::For),
        ("func", Keyword::Func),
        ("go", Keyword::Go),
        ("goto", Keyword::Goto),
        ("if", Keyword::If),
        ("import", Keyword::Import),
        ("interface", Keyword::Interface),
        ("map", Keyword::Map),
        ("package", Keyword::Package),
        ("range", Keyword::Range),
        ("return", Keyword::Return),
        ("select", Keyword::Select),
        ("struct", Keyword::Struct),
        ("switch", Keyword::Switch),
        ("type", Keyword::Type),
        ("var", Keyword::Var),
    ];
}

mod token {
    use super::Span;
    use super::keyword::Keyword;

    /// Token emitted by the lexer.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Token {
        pub kind: TokenKind,
        pub lexeme: String,
        pub span: Span,
        /// 1-based line of the first character.
        pub line: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LiteralKind {
        Int,
        Float,
        Imaginary,
        Rune,
        String,
        RawString,
    }

    /// Token categories understood by the parser.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TokenKind {
        Identifier,
        Keyword(Keyword),
        Literal(LiteralKind),
        /// `( ) [ ] { } , ; . :`. Automatically inserted semicolons carry the
        /// lexeme `"\n"`.
        Punctuation(char),
        Operator(&'static str),
        Unknown(char),
        Eof,
    }

    /// A `//` or `/* */` comment with its line range.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Comment {
        pub text: String,
        pub span: Span,
        pub line: u32,
        pub end_line: u32,
    }

    impl Comment {
        /// Comment body without the comment markers.
        #[must_use]
        pub fn body(&self) -> &str {
            if let Some(rest) = self.text.strip_prefix("//") {
                rest
            } else {
                self.text
                    .strip_prefix("/*")
                    .and_then(|rest| rest.strip_suffix("*/"))
                    .unwrap_or(&self.text)
            }
        }
    }
}

/// Result of lexing a source string.
#[derive(Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub diagnostics: Vec<Diagnostic>,
    pub file_id: FileId,
}

/// Lex an entire source string. The token list always ends with `Eof`.
#[must_use]
pub fn lex(source: &str) -> LexOutput {
    state::run(source, FileId::UNKNOWN)
}

/// Lex an entire source string with a known file id.
#[must_use]
pub fn lex_with_file(source: &str, file_id: FileId) -> LexOutput {
    state::run(source, file_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<String> {
        lex(source)
            .tokens
            .iter()
            .map(|token| match &token.kind {
                TokenKind::Punctuation(';') if token.lexeme == "\n" => "<semi>".to_string(),
                TokenKind::Eof => "<eof>".to_string(),
                _ => token.lexeme.clone(),
            })
            .collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        let output = lex("package main\nfunc mapper() {}");
        let keywords: Vec<_> = output
            .tokens
            .iter()
            .filter_map(|token| match token.kind {
                TokenKind::Keyword(keyword) => Some(keyword),
                _ => None,
            })
            .collect();
        assert_eq!(keywords, [Keyword::Package, Keyword::Func]);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn inserts_semicolons_at_line_ends() {
        assert_eq!(
            kinds("x := f(a)\nreturn\ny++\nz = [2]int{1, 2}\n"),
            [
                "x", ":=", "f", "(", "a", ")", "<semi>", "return", "<semi>", "y", "++",
                "<semi>", "z", "=", "[", "2", "]", "int", "{", "1", ",", "2", "}", "<semi>",
                "<eof>"
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operators_or_open_brace() {
        assert_eq!(
            kinds("if a &&\n b {\n}"),
            ["if", "a", "&&", "b", "{", "}", "<semi>", "<eof>"]
        );
    }

    #[test]
    fn multiline_block_comment_acts_as_newline() {
        assert_eq!(kinds("a /* x\n y */ b"), ["a", "<semi>", "b", "<semi>", "<eof>"]);
        assert_eq!(kinds("a /* x */ b"), ["a", "b", "<semi>", "<eof>"]);
    }

    #[test]
    fn collects_comments_with_lines() {
        let output = lex("// Package doc.\n// More.\npackage a // trailing\n");
        let lines: Vec<_> = output
            .comments
            .iter()
            .map(|c| (c.line, c.body().trim().to_string()))
            .collect();
        assert_eq!(
            lines,
            [
                (1, "Package doc.".to_string()),
                (2, "More.".to_string()),
                (3, "trailing".to_string())
            ]
        );
    }

    #[test]
    fn classifies_literals() {
        let output = lex("0x1F 1_000 0o17 0b101 1.5 .25 1e9 0x1p-2 3i 'a' \"s\" `raw\nstr`");
        let literal_kinds: Vec<_> = output
            .tokens
            .iter()
            .filter_map(|token| match token.kind {
                TokenKind::Literal(kind) => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            literal_kinds,
            [
                LiteralKind::Int,
                LiteralKind::Int,
                LiteralKind::Int,
                LiteralKind::Int,
                LiteralKind::Float,
                LiteralKind::Float,
                LiteralKind::Float,
                LiteralKind::Float,
                LiteralKind::Imaginary,
                LiteralKind::Rune,
                LiteralKind::String,
                LiteralKind::RawString
            ]
        );
        let raw = output
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::Literal(LiteralKind::RawString))
            .unwrap();
        assert_eq!(raw.line, 1);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn longest_operator_match_wins() {
        assert_eq!(
            kinds("a &^= b <<= c <- d ... e"),
            ["a", "&^=", "b", "<<=", "c", "<-", "d", "...", "e", "<semi>", "<eof>"]
        );
    }

    #[test]
    fn colon_equals_is_one_token_and_bare_colon_stays_punctuation() {
        let output = lex("x := m[1:2]\n");
        let kinds: Vec<_> = output.tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(kinds[1], TokenKind::Operator(":="));
        assert_eq!(kinds[5], TokenKind::Punctuation(':'));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn reports_unterminated_string() {
        let output = lex("x := \"abc\ny := 1");
        assert!(
            output
                .diagnostics
                .iter()
                .any(|diag| diag.message.contains("not terminated")),
            "expected unterminated diagnostic, got {:?}",
            output.diagnostics
        );
    }

    #[test]
    fn tracks_token_lines() {
        let output = lex("a\n\nb");
        let lines: Vec<_> = output
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, [1, 3]);
    }
}
