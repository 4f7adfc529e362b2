//! Statement nodes.

use super::Ident;
use super::expressions::Expr;
use super::items::GenDecl;
use crate::diagnostics::Span;
use crate::frontend::lexer::Keyword;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// Statement node with span metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

impl Statement {
    #[must_use]
    pub fn new(span: Span, kind: StatementKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Bad,
    Empty,
    Decl(GenDecl),
    Labeled {
        label: Ident,
        body: Box<Statement>,
    },
    Expr(Expr),
    Send {
        channel: Expr,
        value: Expr,
    },
    IncDec {
        target: Expr,
        op: &'static str,
    },
    /// Assignment; `op` is `:=` for short variable declarations.
    Assign {
        lhs: Vec<Expr>,
        op: &'static str,
        rhs: Vec<Expr>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch {
        keyword: Keyword,
        label: Option<Ident>,
    },
    Block(Block),
    If(IfStatement),
    Switch(SwitchStatement),
    TypeSwitch(TypeSwitchStatement),
    Select(Vec<CommClause>),
    For(ForStatement),
    Range(RangeStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub init: Option<Box<Statement>>,
    pub condition: Expr,
    pub then_branch: Block,
    /// Either another `if` statement or a block.
    pub else_branch: Option<Box<Statement>>,
}

/// `case` clause; `values` is empty for `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    pub init: Option<Box<Statement>>,
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

/// `switch v := x.(type) { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSwitchStatement {
    pub init: Option<Box<Statement>>,
    pub binding: Option<Ident>,
    pub subject: Expr,
    pub clauses: Vec<CaseClause>,
}

/// `case` of a `select`; `comm` is `None` for `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommClause {
    pub comm: Option<Box<Statement>>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expr>,
    pub post: Option<Box<Statement>>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeStatement {
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    /// `:=` rather than `=`.
    pub define: bool,
    pub subject: Expr,
    pub body: Block,
}
