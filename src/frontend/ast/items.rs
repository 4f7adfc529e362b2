//! File-level nodes: package clause, imports and top-level declarations.

use super::Ident;
use super::expressions::{Expr, FuncType};
use super::statements::Block;
use crate::diagnostics::{FileId, Span};
use crate::frontend::lexer::Keyword;

/// Parsed Go source file. In header mode `decls` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAst {
    pub file_id: FileId,
    pub doc: Option<String>,
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    /// Expression of the `//go:build` line, if present.
    pub build_constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub doc: Option<String>,
    /// Explicit local name, including `.` and `_`.
    pub name: Option<Ident>,
    pub path: String,
    pub path_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Gen(GenDecl),
}

/// `const`, `var` or `type` declaration, grouped or not.
#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub keyword: Keyword,
    pub doc: Option<String>,
    pub specs: Vec<Spec>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub doc: Option<String>,
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub doc: Option<String>,
    pub name: Ident,
    pub type_params: Vec<Field>,
    /// `type A = B`.
    pub is_alias: bool,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub doc: Option<String>,
    pub recv: Option<Field>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Block>,
    pub span: Span,
}

impl FuncDecl {
    /// Name of the receiver's base type, with pointers and type arguments removed.
    #[must_use]
    pub fn receiver_type_name(&self) -> Option<&str> {
        use super::expressions::ExprKind;
        let mut expr = self.recv.as_ref()?.ty.unparen();
        loop {
            match &expr.kind {
                ExprKind::Star(inner) => expr = inner.unparen(),
                ExprKind::Index { base, .. } => expr = base.unparen(),
                ExprKind::Ident(ident) => return Some(&ident.name),
                _ => return None,
            }
        }
    }
}

/// Struct field, parameter, result or type parameter. `names` is empty for
/// embedded fields and unnamed parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub doc: Option<String>,
    pub names: Vec<Ident>,
    pub ty: Expr,
    /// Raw tag literal including its quotes.
    pub tag: Option<String>,
    pub span: Span,
}
