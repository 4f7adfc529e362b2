//! Recursive-descent parser for Go source files.

use std::error::Error as StdError;
use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticSink, FileId};
use crate::frontend::ast::{Expr, FileAst};
use crate::frontend::lexer::{LexOutput, Token, lex_with_file};

// Helper macro for parser submodules: wrap new methods in `parser_impl! { ... }`
// instead of spelling out `impl Parser` everywhere.
macro_rules! parser_impl {
    ($($items:tt)*) => {
        impl Parser {
            $($items)*
        }
    };
}

mod cursor;
mod declarations;
mod docs;
mod expressions;
mod statements;
mod types;

#[cfg(test)]
mod tests;

use docs::CommentIndex;

/// How much of a file to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Package clause, package doc, build constraint and imports only.
    Header,
    Full,
}

/// Fatal parse error carrying every diagnostic produced for the file.
#[derive(Debug)]
pub struct ParseError {
    message: String,
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            message: message.into(),
            diagnostics,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ParseError {}

/// Stop collecting after this many errors and skip to the end of input.
const MAX_ERRORS: usize = 10;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    index: usize,
    diagnostics: DiagnosticSink,
    file_id: FileId,
    comments: CommentIndex,
    /// Nesting level used to decide whether `{` may open a composite literal:
    /// negative inside control clauses, positive inside brackets.
    expr_lev: i32,
    prev_end: usize,
}

impl Parser {
    fn new(output: LexOutput) -> Self {
        let LexOutput {
            tokens,
            comments,
            diagnostics,
            file_id,
        } = output;
        let comments = CommentIndex::build(&comments, &tokens);
        let mut sink = DiagnosticSink::new("PARSE");
        for diagnostic in diagnostics {
            sink.push(diagnostic);
        }
        Self {
            tokens,
            index: 0,
            diagnostics: sink,
            file_id,
            comments,
            expr_lev: 0,
            prev_end: 0,
        }
    }

    fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics.into_vec()
    }
}

/// Parse one Go source file.
///
/// # Errors
/// Returns every lexical and syntactic diagnostic when the file is malformed. In
/// header mode only problems before the end of the import block count.
pub fn parse_file(source: &str, file_id: FileId, mode: ParseMode) -> Result<FileAst, ParseError> {
    let mut output = lex_with_file(source, file_id);
    let lex_diagnostics = std::mem::take(&mut output.diagnostics);
    let mut parser = Parser::new(output);
    let file = parser.parse_source_file(mode);
    let header_end = parser.prev_end;
    let mut diagnostics = parser.finish();
    diagnostics.extend(lex_diagnostics.into_iter().filter(|diag| {
        mode == ParseMode::Full
            || diag
                .primary_label
                .as_ref()
                .is_none_or(|label| label.span.start < header_end)
    }));
    if diagnostics.iter().any(|diag| diag.severity.is_error()) {
        Err(ParseError::new(
            "encountered errors while parsing",
            diagnostics,
        ))
    } else {
        Ok(file)
    }
}

/// Parse standalone type syntax such as `map[string][]*pkg.T`.
///
/// # Errors
/// Returns the diagnostics when the text is not a single well-formed type.
pub fn parse_type_expr(source: &str) -> Result<Expr, ParseError> {
    let output = lex_with_file(source, FileId::UNKNOWN);
    let mut parser = Parser::new(output);
    let expr = parser.parse_type();
    parser.consume_punctuation(';');
    if !parser.at_eof() {
        let span = parser.peek().span;
        parser.push_error("unexpected trailing tokens after type", Some(span));
    }
    let diagnostics = parser.finish();
    if diagnostics.iter().any(|diag| diag.severity.is_error()) {
        Err(ParseError::new("invalid type expression", diagnostics))
    } else {
        Ok(expr)
    }
}
