//! Abstract syntax tree nodes for Go source files.
//!
//! Type syntax is represented with the same `Expr` nodes as value expressions,
//! so `[]T`, `map[K]V` and `*T` are expressions like any other.

pub mod expressions;
pub mod items;
pub mod statements;

pub use self::{expressions::*, items::*, statements::*};

use crate::diagnostics::Span;

/// Identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    /// Exported identifiers start with an upper-case letter.
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}
