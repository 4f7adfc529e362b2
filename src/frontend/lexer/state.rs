use super::{Comment, Keyword, LexOutput, LiteralKind, Token, TokenKind};
use crate::diagnostics::{DiagnosticSink, FileId, Span};

pub(super) fn run(source: &str, file_id: FileId) -> LexOutput {
    let mut lexer = Lexer::new(source, file_id);
    lexer.lex_all();
    lexer.finish()
}

const OPERATORS_3: &[&str] = &["<<=", ">>=", "&^=", "..."];
const OPERATORS_2: &[&str] = &[
    "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "<<", ">>", "&^",
];
const OPERATORS_1: &[&str] = &["+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "~"];

pub(super) struct Lexer<'a> {
    pub(super) source: &'a str,
    pub(super) iter: core::str::CharIndices<'a>,
    pub(super) lookahead: Option<(usize, char)>,
    pub(super) tokens: Vec<Token>,
    pub(super) comments: Vec<Comment>,
    pub(super) diagnostics: DiagnosticSink,
    pub(super) file_id: FileId,
    pub(super) line: u32,
    /// Whether a newline at this point terminates a statement.
    pub(super) insert_semi: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub(super) fn new(source: &'a str, file_id: FileId) -> Self {
        let mut iter = source.char_indices();
        let lookahead = iter.next();
        Self {
            source,
            iter,
            lookahead,
            tokens: Vec::new(),
            comments: Vec::new(),
            diagnostics: DiagnosticSink::new("LEX"),
            file_id,
            line: 1,
            insert_semi: false,
        }
    }

    fn finish(self) -> LexOutput {
        let Lexer {
            tokens,
            comments,
            diagnostics,
            file_id,
            ..
        } = self;
        LexOutput {
            tokens,
            comments,
            diagnostics: diagnostics.into_vec(),
            file_id,
        }
    }

    pub(super) fn lex_all(&mut self) {
        while let Some((start, ch)) = self.lookahead {
            match ch {
                '\n' => {
                    if self.insert_semi {
                        self.emit_auto_semicolon(start);
                    }
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.consume_whitespace();
                }
                c if is_identifier_start(c) => {
                    self.consume_identifier(start);
                }
                c if c.is_ascii_digit() => {
                    self.consume_number(start);
                }
                '.' if matches!(self.peek_next_char(), Some((_, d)) if d.is_ascii_digit()) => {
                    self.consume_number(start);
                }
                '"' => self.consume_string(start),
                '`' => self.consume_raw_string(start),
                '\'' => self.consume_rune(start),
                '/' if matches!(self.peek_next_char(), Some((_, '/' | '*'))) => {
                    self.consume_comment(start);
                }
                ':' if matches!(self.peek_next_char(), Some((_, '='))) => {
                    self.consume_operator(start, ch);
                }
                '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';' | ':' | '.' => {
                    self.consume_punctuation(start, ch);
                }
                _ => self.consume_operator(start, ch),
            }
        }
        let end = self.source.len();
        if self.insert_semi {
            self.emit_auto_semicolon(end);
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: Span::in_file(self.file_id, end, end),
            line: self.line,
        });
    }

    pub(super) fn bump(&mut self) {
        if let Some((_, '\n')) = self.lookahead {
            self.line += 1;
        }
        self.lookahead = self.iter.next();
    }

    pub(super) fn peek_next_char(&self) -> Option<(usize, char)> {
        self.iter.clone().next()
    }

    pub(super) fn offset(&self) -> usize {
        self.lookahead
            .map(|(idx, _)| idx)
            .unwrap_or(self.source.len())
    }

    pub(super) fn slice(&self, start: usize, end: usize) -> &str {
        &self.source[start..end]
    }

    pub(super) fn span(&self, start: usize, end: usize) -> Span {
        Span::in_file(self.file_id, start, end)
    }

    pub(super) fn emit(&mut self, start: usize, end: usize, line: u32, kind: TokenKind) {
        self.insert_semi = match &kind {
            TokenKind::Identifier | TokenKind::Literal(_) => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Break | Keyword::Continue | Keyword::Fallthrough | Keyword::Return
            ),
            TokenKind::Operator(op) => matches!(*op, "++" | "--"),
            TokenKind::Punctuation(ch) => matches!(ch, ')' | ']' | '}'),
            TokenKind::Unknown(_) | TokenKind::Eof => false,
        };
        self.tokens.push(Token {
            kind,
            lexeme: self.slice(start, end).to_string(),
            span: self.span(start, end),
            line,
        });
    }

    pub(super) fn emit_auto_semicolon(&mut self, at: usize) {
        self.tokens.push(Token {
            kind: TokenKind::Punctuation(';'),
            lexeme: "\n".to_string(),
            span: self.span(at, at),
            line: self.line,
        });
        self.insert_semi = false;
    }

    fn consume_identifier(&mut self, start: usize) {
        let line = self.line;
        let mut end = start;
        while let Some((idx, ch)) = self.lookahead {
            if !is_identifier_continue(ch) {
                break;
            }
            end = idx + ch.len_utf8();
            self.bump();
        }
        let kind = Keyword::from_ident(self.slice(start, end))
            .map(Keyword::token_kind)
            .unwrap_or(TokenKind::Identifier);
        self.emit(start, end, line, kind);
    }

    fn consume_punctuation(&mut self, start: usize, ch: char) {
        let line = self.line;
        if ch == '.' && self.source[start..].starts_with("...") {
            self.bump();
            self.bump();
            self.bump();
            self.emit(start, start + 3, line, TokenKind::Operator("..."));
            return;
        }
        self.bump();
        self.emit(start, start + 1, line, TokenKind::Punctuation(ch));
    }

    fn consume_operator(&mut self, start: usize, ch: char) {
        let line = self.line;
        let rest = &self.source[start..];
        let matched = OPERATORS_3
            .iter()
            .chain(OPERATORS_2)
            .chain(OPERATORS_1)
            .find(|op| rest.starts_with(**op))
            .copied();
        match matched {
            Some(op) => {
                for _ in 0..op.len() {
                    self.bump();
                }
                self.emit(start, start + op.len(), line, TokenKind::Operator(op));
            }
            None => {
                self.bump();
                let end = start + ch.len_utf8();
                self.diagnostics
                    .push_error(format!("invalid character {ch:?}"), Some(self.span(start, end)));
                self.emit(start, end, line, TokenKind::Unknown(ch));
            }
        }
    }

    fn consume_number(&mut self, start: usize) {
        let line = self.line;
        let scanned = self.scan_number();
        let end = self.offset();
        let kind = match scanned {
            Ok(kind) => kind,
            Err(message) => {
                self.diagnostics.push_error(message, Some(self.span(start, end)));
                LiteralKind::Int
            }
        };
        self.emit(start, end, line, TokenKind::Literal(kind));
    }

    fn consume_string(&mut self, start: usize) {
        let line = self.line;
        self.bump();
        loop {
            match self.lookahead {
                Some((idx, '"')) => {
                    self.bump();
                    self.emit(start, idx + 1, line, TokenKind::Literal(LiteralKind::String));
                    return;
                }
                Some((_, '\\')) => {
                    self.bump();
                    if matches!(self.lookahead, Some((_, ch)) if ch != '\n') {
                        self.bump();
                    }
                }
                Some((_, '\n')) | None => {
                    let end = self.offset();
                    self.diagnostics.push_error(
                        "string literal not terminated",
                        Some(self.span(start, end)),
                    );
                    self.emit(start, end, line, TokenKind::Literal(LiteralKind::String));
                    return;
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn consume_raw_string(&mut self, start: usize) {
        let line = self.line;
        self.bump();
        while let Some((idx, ch)) = self.lookahead {
            self.bump();
            if ch == '`' {
                self.emit(start, idx + 1, line, TokenKind::Literal(LiteralKind::RawString));
                return;
            }
        }
        let end = self.source.len();
        self.diagnostics.push_error(
            "raw string literal not terminated",
            Some(self.span(start, end)),
        );
        self.emit(start, end, line, TokenKind::Literal(LiteralKind::RawString));
    }

    fn consume_rune(&mut self, start: usize) {
        let line = self.line;
        self.bump();
        let mut chars = 0usize;
        loop {
            match self.lookahead {
                Some((idx, '\'')) => {
                    self.bump();
                    if chars == 0 {
                        self.diagnostics
                            .push_error("empty rune literal", Some(self.span(start, idx + 1)));
                    }
                    self.emit(start, idx + 1, line, TokenKind::Literal(LiteralKind::Rune));
                    return;
                }
                Some((_, '\\')) => {
                    chars += 1;
                    self.bump();
                    if matches!(self.lookahead, Some((_, ch)) if ch != '\n') {
                        self.bump();
                    }
                }
                Some((_, '\n')) | None => {
                    let end = self.offset();
                    self.diagnostics
                        .push_error("rune literal not terminated", Some(self.span(start, end)));
                    self.emit(start, end, line, TokenKind::Literal(LiteralKind::Rune));
                    return;
                }
                Some(_) => {
                    chars += 1;
                    self.bump();
                }
            }
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_identifier_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}
