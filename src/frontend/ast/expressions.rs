//! Expression nodes, including type expressions.

use super::Ident;
use super::items::Field;
use super::statements::Block;
use crate::diagnostics::Span;
use crate::frontend::lexer::LiteralKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    #[must_use]
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    #[must_use]
    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// Strip any number of enclosing parentheses.
    #[must_use]
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Element of a composite literal, with an optional `key:` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

/// `func(params) results`, also used for method signatures in interfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub span: Span,
    pub type_params: Vec<Field>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method {
        doc: Option<String>,
        name: Ident,
        ty: FuncType,
    },
    /// Embedded interface or type-set term such as `~int | ~string`.
    Embedded(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub elements: Vec<InterfaceElem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Bad,
    Ident(Ident),
    BasicLit {
        kind: LiteralKind,
        value: String,
    },
    CompositeLit {
        ty: Option<Box<Expr>>,
        elements: Vec<Element>,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Paren(Box<Expr>),
    Selector {
        base: Box<Expr>,
        field: Ident,
    },
    /// `x[i]` or a generic instantiation `T[A, B]`.
    Index {
        base: Box<Expr>,
        indices: Vec<Expr>,
    },
    Slice {
        base: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    /// `x.(T)`; `ty` is `None` for `x.(type)` in a type switch.
    TypeAssert {
        base: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        has_ellipsis: bool,
    },
    /// Dereference or pointer type.
    Star(Box<Expr>),
    Unary {
        op: &'static str,
        operand: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `[N]T`, `[...]T`, or `[]T` when `len` is `None`.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    /// `...T` in a variadic parameter, or the `...` length of an array literal.
    Ellipsis(Option<Box<Expr>>),
    StructType(StructType),
    FuncType(FuncType),
    InterfaceType(InterfaceType),
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
}
