use super::Parser;
use super::cursor::describe;
use crate::frontend::ast::{Element, Expr, ExprKind};
use crate::frontend::lexer::{Keyword, TokenKind};

fn binary_precedence(op: &str) -> Option<u8> {
    let prec = match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "+" | "-" | "|" | "^" => 4,
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => 5,
        _ => return None,
    };
    Some(prec)
}

/// Composite literal types; with `allow_names` false, bare type names are
/// excluded because `{` after them opens a block in control clauses.
fn is_literal_type(expr: &Expr, allow_names: bool) -> bool {
    match &expr.unparen().kind {
        ExprKind::Bad | ExprKind::Ident(_) | ExprKind::Selector { .. } | ExprKind::Index { .. } => {
            allow_names
        }
        ExprKind::ArrayType { .. } | ExprKind::StructType(_) | ExprKind::MapType { .. } => true,
        _ => false,
    }
}

parser_impl! {
    pub(super) fn parse_expr(&mut self) -> Expr {
        self.parse_binary_expr(1)
    }

    pub(super) fn parse_expr_list(&mut self) -> Vec<Expr> {
        let mut list = vec![self.parse_expr()];
        while self.consume_punctuation(',') {
            list.push(self.parse_expr());
        }
        list
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Expr {
        let start = self.start();
        let mut left = self.parse_unary_expr();
        loop {
            let TokenKind::Operator(op) = self.peek().kind else {
                break;
            };
            let Some(prec) = binary_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary_expr(prec + 1);
            left = Expr::new(
                self.span_from(start),
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        left
    }

    fn parse_unary_expr(&mut self) -> Expr {
        let start = self.start();
        match self.peek().kind {
            TokenKind::Operator(op @ ("+" | "-" | "!" | "^" | "&" | "~")) => {
                self.advance();
                let operand = self.parse_unary_expr();
                Expr::new(
                    self.span_from(start),
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                )
            }
            TokenKind::Operator("<-") => {
                if self.peek_n(1).kind == TokenKind::Keyword(Keyword::Chan) {
                    let ty = self.parse_type();
                    return self.parse_primary_suffixes(ty);
                }
                self.advance();
                let operand = self.parse_unary_expr();
                Expr::new(
                    self.span_from(start),
                    ExprKind::Unary {
                        op: "<-",
                        operand: Box::new(operand),
                    },
                )
            }
            TokenKind::Operator("*") => {
                self.advance();
                let operand = self.parse_unary_expr();
                Expr::new(self.span_from(start), ExprKind::Star(Box::new(operand)))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let operand = self.parse_operand();
        self.parse_primary_suffixes(operand)
    }

    fn parse_operand(&mut self) -> Expr {
        let start = self.start();
        match self.peek().kind.clone() {
            TokenKind::Identifier => {
                let ident = self.expect_ident();
                Expr::new(ident.span, ExprKind::Ident(ident))
            }
            TokenKind::Literal(kind) => {
                let token = self.advance();
                Expr::new(
                    token.span,
                    ExprKind::BasicLit {
                        kind,
                        value: token.lexeme,
                    },
                )
            }
            TokenKind::Punctuation('(') => {
                self.advance();
                self.expr_lev += 1;
                let inner = self.parse_expr();
                self.expr_lev -= 1;
                self.expect_punctuation(')');
                Expr::new(self.span_from(start), ExprKind::Paren(Box::new(inner)))
            }
            TokenKind::Keyword(Keyword::Func) => {
                self.advance();
                let ty = self.parse_signature(start);
                if self.check_punctuation('{') {
                    let saved = self.expr_lev;
                    self.expr_lev = 0;
                    let body = self.parse_block();
                    self.expr_lev = saved;
                    Expr::new(self.span_from(start), ExprKind::FuncLit { ty, body })
                } else {
                    Expr::new(ty.span, ExprKind::FuncType(ty))
                }
            }
            TokenKind::Punctuation('[')
            | TokenKind::Keyword(
                Keyword::Map | Keyword::Chan | Keyword::Struct | Keyword::Interface,
            ) => self.parse_type(),
            _ => {
                let token = self.advance();
                self.push_error(
                    format!("expected expression, found {}", describe(&token)),
                    Some(token.span),
                );
                Expr::new(token.span, ExprKind::Bad)
            }
        }
    }

    fn parse_primary_suffixes(&mut self, mut expr: Expr) -> Expr {
        let start = expr.span.start;
        loop {
            match self.peek().kind {
                TokenKind::Punctuation('.') => {
                    self.advance();
                    if self.consume_punctuation('(') {
                        let ty = if self.consume_keyword(Keyword::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()))
                        };
                        self.expect_punctuation(')');
                        expr = Expr::new(
                            self.span_from(start),
                            ExprKind::TypeAssert {
                                base: Box::new(expr),
                                ty,
                            },
                        );
                    } else {
                        let field = self.expect_ident();
                        expr = Expr::new(
                            self.span_from(start),
                            ExprKind::Selector {
                                base: Box::new(expr),
                                field,
                            },
                        );
                    }
                }
                TokenKind::Punctuation('[') => {
                    self.advance();
                    expr = self.parse_index_or_slice(expr, start);
                }
                TokenKind::Punctuation('(') => {
                    self.advance();
                    expr = self.parse_call(expr, start);
                }
                TokenKind::Punctuation('{') => {
                    if !is_literal_type(&expr, self.expr_lev >= 0) {
                        break;
                    }
                    expr = self.parse_composite_literal(Some(expr), start);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_index_or_slice(&mut self, base: Expr, start: usize) -> Expr {
        self.expr_lev += 1;
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0usize;
        if !self.check_punctuation(':') {
            let first = self.parse_expr();
            if self.check_punctuation(',') || self.check_punctuation(']') {
                let mut indices = vec![first];
                while self.consume_punctuation(',') && !self.check_punctuation(']') {
                    indices.push(self.parse_expr());
                }
                self.expr_lev -= 1;
                self.expect_punctuation(']');
                return Expr::new(
                    self.span_from(start),
                    ExprKind::Index {
                        base: Box::new(base),
                        indices,
                    },
                );
            }
            parts[0] = Some(Box::new(first));
        }
        while colons < 2 && self.consume_punctuation(':') {
            colons += 1;
            if !self.check_punctuation(':') && !self.check_punctuation(']') {
                parts[colons] = Some(Box::new(self.parse_expr()));
            }
        }
        self.expr_lev -= 1;
        self.expect_punctuation(']');
        let [low, high, max] = parts;
        if colons == 2 && (high.is_none() || max.is_none()) {
            let span = self.span_from(start);
            self.push_error("middle and final index required in 3-index slice", Some(span));
        }
        Expr::new(
            self.span_from(start),
            ExprKind::Slice {
                base: Box::new(base),
                low,
                high,
                max,
            },
        )
    }

    fn parse_call(&mut self, func: Expr, start: usize) -> Expr {
        self.expr_lev += 1;
        let mut args = Vec::new();
        let mut has_ellipsis = false;
        while !self.check_punctuation(')') && !self.at_eof() {
            let before = self.index;
            args.push(self.parse_expr());
            if self.consume_operator("...") {
                has_ellipsis = true;
            }
            if !self.consume_punctuation(',') || self.index == before {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect_punctuation(')');
        Expr::new(
            self.span_from(start),
            ExprKind::Call {
                func: Box::new(func),
                args,
                has_ellipsis,
            },
        )
    }

    fn parse_composite_literal(&mut self, ty: Option<Expr>, start: usize) -> Expr {
        self.expect_punctuation('{');
        self.expr_lev += 1;
        let mut elements = Vec::new();
        while !self.check_punctuation('}') && !self.at_eof() {
            let before = self.index;
            let first = self.parse_element_value();
            let element = if self.consume_punctuation(':') {
                Element {
                    key: Some(first),
                    value: self.parse_element_value(),
                }
            } else {
                Element {
                    key: None,
                    value: first,
                }
            };
            elements.push(element);
            if !self.consume_punctuation(',') || self.index == before {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect_punctuation('}');
        Expr::new(
            self.span_from(start),
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elements,
            },
        )
    }

    fn parse_element_value(&mut self) -> Expr {
        if self.check_punctuation('{') {
            let start = self.start();
            return self.parse_composite_literal(None, start);
        }
        self.parse_expr()
    }
}
