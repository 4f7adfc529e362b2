use super::Parser;
use super::cursor::describe;
use crate::frontend::ast::{
    Block, CaseClause, CommClause, Expr, ExprKind, ForStatement, IfStatement, RangeStatement,
    Statement, StatementKind, SwitchStatement, TypeSwitchStatement,
};
use crate::frontend::lexer::{Keyword, TokenKind};

const ASSIGN_OPS: &[&str] = &[
    "=", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "&^=",
];

/// Result of a simple statement in a `for` header, which may be a range clause.
enum SimpleStatement {
    Statement(Statement),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        subject: Expr,
    },
}

parser_impl! {
    pub(super) fn parse_block(&mut self) -> Block {
        let start = self.start();
        self.expect_punctuation('{');
        let statements = self.parse_statement_list();
        self.expect_punctuation('}');
        Block {
            statements,
            span: self.span_from(start),
        }
    }

    fn parse_statement_list(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.check_punctuation('}')
            && !self.check_keyword(Keyword::Case)
            && !self.check_keyword(Keyword::Default)
            && !self.at_eof()
        {
            let before = self.index;
            let statement = self.parse_statement();
            if !matches!(statement.kind, StatementKind::Empty) {
                statements.push(statement);
            }
            if self.index == before {
                self.advance();
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> Statement {
        let start = self.start();
        let kind = match self.peek().kind.clone() {
            TokenKind::Keyword(keyword @ (Keyword::Const | Keyword::Var | Keyword::Type)) => {
                StatementKind::Decl(self.parse_gen_decl(keyword))
            }
            TokenKind::Identifier if self.peek_punctuation_n(1, ':') => {
                let label = self.expect_ident();
                self.advance();
                if self.check_punctuation('}') {
                    let span = self.span_from(start);
                    return Statement::new(
                        span,
                        StatementKind::Labeled {
                            label,
                            body: Box::new(Statement::new(span, StatementKind::Empty)),
                        },
                    );
                }
                let body = self.parse_statement();
                return Statement::new(
                    self.span_from(start),
                    StatementKind::Labeled {
                        label,
                        body: Box::new(body),
                    },
                );
            }
            TokenKind::Keyword(Keyword::Go) => {
                self.advance();
                StatementKind::Go(self.parse_expr())
            }
            TokenKind::Keyword(Keyword::Defer) => {
                self.advance();
                StatementKind::Defer(self.parse_expr())
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let results = if self.check_punctuation(';') || self.check_punctuation('}') {
                    Vec::new()
                } else {
                    self.parse_expr_list()
                };
                StatementKind::Return(results)
            }
            TokenKind::Keyword(
                keyword @ (Keyword::Break | Keyword::Continue | Keyword::Goto | Keyword::Fallthrough),
            ) => {
                self.advance();
                let label = (keyword != Keyword::Fallthrough && self.check_identifier())
                    .then(|| self.expect_ident());
                StatementKind::Branch { keyword, label }
            }
            TokenKind::Punctuation('{') => StatementKind::Block(self.parse_block()),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Select) => self.parse_select(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Punctuation(';') => {
                self.advance();
                return Statement::new(self.span_from(start), StatementKind::Empty);
            }
            _ => match self.parse_simple_statement(false) {
                SimpleStatement::Statement(statement) => statement.kind,
                SimpleStatement::Range { .. } => StatementKind::Bad,
            },
        };
        let span = self.span_from(start);
        self.expect_semi("at end of statement");
        Statement::new(span, kind)
    }

    fn parse_simple_statement(&mut self, range_ok: bool) -> SimpleStatement {
        let start = self.start();
        if range_ok && self.consume_keyword(Keyword::Range) {
            let subject = self.parse_expr();
            return SimpleStatement::Range {
                key: None,
                value: None,
                define: false,
                subject,
            };
        }
        let mut lhs = self.parse_expr_list();
        let kind = match self.peek().kind {
            TokenKind::Operator(op) if ASSIGN_OPS.contains(&op) => {
                self.advance();
                if range_ok && matches!(op, "=" | ":=") && self.consume_keyword(Keyword::Range) {
                    let subject = self.parse_expr();
                    if lhs.len() > 2 {
                        let span = self.span_from(start);
                        self.push_error("range clause permits at most two iteration variables", Some(span));
                    }
                    let mut iter = lhs.into_iter();
                    return SimpleStatement::Range {
                        key: iter.next(),
                        value: iter.next(),
                        define: op == ":=",
                        subject,
                    };
                }
                let rhs = self.parse_expr_list();
                StatementKind::Assign { lhs, op, rhs }
            }
            TokenKind::Operator("<-") => {
                self.advance();
                let value = self.parse_expr();
                let channel = lhs.swap_remove(0);
                StatementKind::Send { channel, value }
            }
            TokenKind::Operator(op @ ("++" | "--")) => {
                self.advance();
                StatementKind::IncDec {
                    target: lhs.swap_remove(0),
                    op,
                }
            }
            _ => {
                if lhs.len() > 1 {
                    let token = self.peek().clone();
                    self.push_error(
                        format!("expected := or = or comma, found {}", describe(&token)),
                        Some(token.span),
                    );
                }
                StatementKind::Expr(lhs.swap_remove(0))
            }
        };
        SimpleStatement::Statement(Statement::new(self.span_from(start), kind))
    }

    fn parse_simple_only(&mut self) -> Statement {
        match self.parse_simple_statement(false) {
            SimpleStatement::Statement(statement) => statement,
            SimpleStatement::Range { subject, .. } => {
                Statement::new(subject.span, StatementKind::Bad)
            }
        }
    }

    fn parse_if(&mut self) -> StatementKind {
        self.expect_keyword(Keyword::If);
        let saved = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut condition = None;
        if self.check_punctuation('{') {
            let span = self.peek().span;
            self.push_error("missing condition in if statement", Some(span));
        } else {
            if !self.check_punctuation(';') {
                let statement = self.parse_simple_only();
                if self.check_punctuation(';') {
                    init = Some(Box::new(statement));
                } else {
                    condition = Some(self.statement_as_condition(statement));
                }
            }
            if condition.is_none() && self.consume_punctuation(';') {
                if self.check_punctuation('{') {
                    let span = self.peek().span;
                    self.push_error("missing condition in if statement", Some(span));
                } else {
                    condition = Some(self.parse_expr());
                }
            }
        }
        self.expr_lev = saved;
        let condition = condition.unwrap_or_else(|| Expr::new(self.span_from(self.prev_end), ExprKind::Bad));
        let then_branch = self.parse_block();
        let else_branch = if self.consume_keyword(Keyword::Else) {
            let start = self.start();
            if self.check_keyword(Keyword::If) {
                let kind = self.parse_if();
                Some(Box::new(Statement::new(self.span_from(start), kind)))
            } else if self.check_punctuation('{') {
                let block = self.parse_block();
                Some(Box::new(Statement::new(block.span, StatementKind::Block(block))))
            } else {
                let span = self.peek().span;
                self.push_error("else must be followed by if or statement block", Some(span));
                None
            }
        } else {
            None
        };
        StatementKind::If(IfStatement {
            init,
            condition,
            then_branch,
            else_branch,
        })
    }

    fn statement_as_condition(&mut self, statement: Statement) -> Expr {
        match statement.kind {
            StatementKind::Expr(expr) => expr,
            _ => {
                self.push_error("cannot use statement as value", Some(statement.span));
                Expr::new(statement.span, ExprKind::Bad)
            }
        }
    }

    fn parse_switch(&mut self) -> StatementKind {
        self.expect_keyword(Keyword::Switch);
        let saved = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut header = None;
        if !self.check_punctuation('{') {
            if !self.check_punctuation(';') {
                header = Some(self.parse_simple_only());
            }
            if self.consume_punctuation(';') {
                init = header.take().map(Box::new);
                if !self.check_punctuation('{') {
                    header = Some(self.parse_simple_only());
                }
            }
        }
        self.expr_lev = saved;
        let clauses = self.parse_case_clauses();

        match header.map(|statement| (statement.span, statement.kind)) {
            Some((_, StatementKind::Assign { mut lhs, op: ":=", mut rhs }))
                if lhs.len() == 1 && is_type_switch_guard(rhs.first()) =>
            {
                let binding = lhs.swap_remove(0);
                let binding = match binding.kind {
                    ExprKind::Ident(ident) => Some(ident),
                    _ => {
                        self.push_error("invalid variable name in type switch", Some(binding.span));
                        None
                    }
                };
                StatementKind::TypeSwitch(TypeSwitchStatement {
                    init,
                    binding,
                    subject: type_switch_subject(rhs.swap_remove(0)),
                    clauses,
                })
            }
            Some((_, StatementKind::Expr(expr))) if is_type_switch_guard(Some(&expr)) => {
                StatementKind::TypeSwitch(TypeSwitchStatement {
                    init,
                    binding: None,
                    subject: type_switch_subject(expr),
                    clauses,
                })
            }
            Some((_, StatementKind::Expr(expr))) => StatementKind::Switch(SwitchStatement {
                init,
                tag: Some(expr),
                clauses,
            }),
            Some((span, _)) => {
                self.push_error("switch expression must be an expression", Some(span));
                StatementKind::Switch(SwitchStatement {
                    init,
                    tag: None,
                    clauses,
                })
            }
            None => StatementKind::Switch(SwitchStatement {
                init,
                tag: None,
                clauses,
            }),
        }
    }

    fn parse_case_clauses(&mut self) -> Vec<CaseClause> {
        self.expect_punctuation('{');
        let mut clauses = Vec::new();
        while !self.check_punctuation('}') && !self.at_eof() {
            let start = self.start();
            let (values, is_default) = if self.consume_keyword(Keyword::Case) {
                (self.parse_expr_list(), false)
            } else if self.consume_keyword(Keyword::Default) {
                (Vec::new(), true)
            } else {
                let token = self.peek().clone();
                self.push_error(
                    format!("expected case or default or }}, found {}", describe(&token)),
                    Some(token.span),
                );
                self.skip_to_statement_end();
                continue;
            };
            self.expect_punctuation(':');
            let body = self.parse_statement_list();
            clauses.push(CaseClause {
                values,
                is_default,
                body,
                span: self.span_from(start),
            });
        }
        self.expect_punctuation('}');
        clauses
    }

    fn parse_select(&mut self) -> StatementKind {
        self.expect_keyword(Keyword::Select);
        self.expect_punctuation('{');
        let mut clauses = Vec::new();
        while !self.check_punctuation('}') && !self.at_eof() {
            let start = self.start();
            let comm = if self.consume_keyword(Keyword::Case) {
                Some(Box::new(self.parse_simple_only()))
            } else if self.consume_keyword(Keyword::Default) {
                None
            } else {
                let token = self.peek().clone();
                self.push_error(
                    format!("expected case or default or }}, found {}", describe(&token)),
                    Some(token.span),
                );
                self.skip_to_statement_end();
                continue;
            };
            self.expect_punctuation(':');
            let body = self.parse_statement_list();
            clauses.push(CommClause {
                comm,
                body,
                span: self.span_from(start),
            });
        }
        self.expect_punctuation('}');
        StatementKind::Select(clauses)
    }

    fn parse_for(&mut self) -> StatementKind {
        self.expect_keyword(Keyword::For);
        let saved = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut condition = None;
        let mut post = None;
        let mut range = None;
        if !self.check_punctuation('{') {
            let first = if self.check_punctuation(';') {
                None
            } else {
                Some(self.parse_simple_statement(true))
            };
            match first {
                Some(SimpleStatement::Range {
                    key,
                    value,
                    define,
                    subject,
                }) => range = Some((key, value, define, subject)),
                Some(SimpleStatement::Statement(statement)) if !self.check_punctuation(';') => {
                    condition = Some(self.statement_as_condition(statement));
                }
                first => {
                    init = first.and_then(|first| match first {
                        SimpleStatement::Statement(statement) => Some(Box::new(statement)),
                        SimpleStatement::Range { .. } => None,
                    });
                    self.expect_punctuation(';');
                    if !self.check_punctuation(';') {
                        condition = Some(self.parse_expr());
                    }
                    self.expect_punctuation(';');
                    if !self.check_punctuation('{') {
                        post = Some(Box::new(self.parse_simple_only()));
                    }
                }
            }
        }
        self.expr_lev = saved;
        let body = self.parse_block();
        match range {
            Some((key, value, define, subject)) => StatementKind::Range(RangeStatement {
                key,
                value,
                define,
                subject,
                body,
            }),
            None => StatementKind::For(ForStatement {
                init,
                condition,
                post,
                body,
            }),
        }
    }
}

fn is_type_switch_guard(expr: Option<&Expr>) -> bool {
    matches!(
        expr.map(|expr| &expr.unparen().kind),
        Some(ExprKind::TypeAssert { ty: None, .. })
    )
}

fn type_switch_subject(guard: Expr) -> Expr {
    match guard.kind {
        ExprKind::TypeAssert { base, ty: None } => *base,
        ExprKind::Paren(inner) => type_switch_subject(*inner),
        other => Expr::new(guard.span, other),
    }
}
