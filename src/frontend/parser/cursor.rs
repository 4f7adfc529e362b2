use super::{MAX_ERRORS, Parser};
use crate::diagnostics::Span;
use crate::frontend::ast::Ident;
use crate::frontend::lexer::{Keyword, LiteralKind, Token, TokenKind};

parser_impl! {
    pub(super) fn peek(&self) -> &Token {
        self.peek_n(0)
    }

    /// Token `offset` positions ahead; clamps to the trailing `Eof`.
    pub(super) fn peek_n(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.index + offset).min(last)]
    }

    pub(super) fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.index += 1;
            if token.lexeme != "\n" {
                self.prev_end = token.span.end;
            }
        }
        token
    }

    /// Span from `start` to the end of the last consumed token.
    pub(super) fn span_from(&self, start: usize) -> Span {
        Span::in_file(self.file_id, start, self.prev_end.max(start))
    }

    pub(super) fn start(&self) -> usize {
        self.peek().span.start
    }

    pub(super) fn check_punctuation(&self, expected: char) -> bool {
        self.peek().kind == TokenKind::Punctuation(expected)
    }

    pub(super) fn peek_punctuation_n(&self, offset: usize, expected: char) -> bool {
        self.peek_n(offset).kind == TokenKind::Punctuation(expected)
    }

    pub(super) fn consume_punctuation(&mut self, expected: char) -> bool {
        if self.check_punctuation(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect_punctuation(&mut self, expected: char) -> bool {
        if self.consume_punctuation(expected) {
            return true;
        }
        let token = self.peek().clone();
        self.push_error(
            format!("expected '{expected}', found {}", describe(&token)),
            Some(token.span),
        );
        false
    }

    pub(super) fn check_operator(&self, expected: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Operator(op) if op == expected)
    }

    pub(super) fn consume_operator(&mut self, expected: &str) -> bool {
        if self.check_operator(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(keyword)
    }

    pub(super) fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect_keyword(&mut self, keyword: Keyword) -> bool {
        if self.consume_keyword(keyword) {
            return true;
        }
        let token = self.peek().clone();
        self.push_error(
            format!("expected '{}', found {}", keyword.as_str(), describe(&token)),
            Some(token.span),
        );
        false
    }

    pub(super) fn check_identifier(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier)
    }

    pub(super) fn check_string_literal(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Literal(LiteralKind::String | LiteralKind::RawString)
        )
    }

    /// Consume an identifier, reporting an error and yielding `_` if absent.
    pub(super) fn expect_ident(&mut self) -> Ident {
        if self.check_identifier() {
            let token = self.advance();
            return Ident::new(token.lexeme, token.span);
        }
        let token = self.peek().clone();
        self.push_error(
            format!("expected identifier, found {}", describe(&token)),
            Some(token.span),
        );
        Ident::new("_", Span::in_file(self.file_id, token.span.start, token.span.start))
    }

    /// Statement terminator. Go permits omitting it before a closing `)` or `}`.
    pub(super) fn expect_semi(&mut self, context: &str) {
        if self.consume_punctuation(';') || self.check_punctuation(')') || self.check_punctuation('}') {
            return;
        }
        if self.at_eof() {
            return;
        }
        let token = self.peek().clone();
        self.push_error(
            format!("unexpected {} {context}", describe(&token)),
            Some(token.span),
        );
        self.skip_to_statement_end();
    }

    /// Skip tokens until just past the next semicolon or before a closing brace.
    pub(super) fn skip_to_statement_end(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.peek().kind {
                TokenKind::Punctuation('(' | '[' | '{') => depth += 1,
                TokenKind::Punctuation(')' | ']') => depth = depth.saturating_sub(1),
                TokenKind::Punctuation('}') => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Punctuation(';') if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    pub(super) fn push_error(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.diagnostics.push_error(message, span);
        if self.diagnostics.len() >= MAX_ERRORS {
            self.index = self.tokens.len().saturating_sub(1);
        }
    }
}

pub(super) fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Eof => "end of file".to_string(),
        TokenKind::Punctuation(';') if token.lexeme == "\n" => "newline".to_string(),
        TokenKind::Identifier => format!("name {}", token.lexeme),
        TokenKind::Literal(_) => format!("literal {}", token.lexeme),
        TokenKind::Keyword(keyword) => format!("keyword {}", keyword.as_str()),
        _ => format!("'{}'", token.lexeme),
    }
}
