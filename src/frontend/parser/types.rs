use super::Parser;
use super::cursor::describe;
use crate::frontend::ast::{
    ChanDir, Expr, ExprKind, Field, FuncType, Ident, InterfaceElem, InterfaceType, StructType,
};
use crate::frontend::lexer::{Keyword, TokenKind};

/// One entry of a parameter or field list before names are grouped with types.
enum ListEntry {
    Named(Ident, Expr),
    Unnamed(Expr),
}

/// Outcome of `name [ ... ]` in a field or parameter position.
enum ArrayOrInstance {
    /// `name [N]T` or `name []T`: a name followed by an array or slice type.
    Named(Ident, Expr),
    /// `Name[A, B]`: a generic instantiation.
    Instance(Expr),
}

parser_impl! {
    pub(super) fn parse_type(&mut self) -> Expr {
        let start = self.start();
        match self.peek().kind.clone() {
            TokenKind::Identifier => {
                let ident = self.expect_ident();
                self.parse_type_name_rest(ident)
            }
            TokenKind::Punctuation('[') => {
                self.advance();
                self.parse_array_type_rest(start)
            }
            TokenKind::Punctuation('(') => {
                self.advance();
                let inner = self.parse_type();
                self.expect_punctuation(')');
                Expr::new(self.span_from(start), ExprKind::Paren(Box::new(inner)))
            }
            TokenKind::Operator("*") => {
                self.advance();
                let elem = self.parse_type();
                Expr::new(self.span_from(start), ExprKind::Star(Box::new(elem)))
            }
            TokenKind::Operator("<-") => {
                self.advance();
                self.expect_keyword(Keyword::Chan);
                let value = self.parse_type();
                Expr::new(
                    self.span_from(start),
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        value: Box::new(value),
                    },
                )
            }
            TokenKind::Keyword(Keyword::Chan) => self.parse_chan_type(),
            TokenKind::Keyword(Keyword::Map) => self.parse_map_type(),
            TokenKind::Keyword(Keyword::Func) => {
                self.advance();
                let ty = self.parse_signature(start);
                Expr::new(ty.span, ExprKind::FuncType(ty))
            }
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct_type(),
            TokenKind::Keyword(Keyword::Interface) => self.parse_interface_type(),
            _ => {
                let token = self.peek().clone();
                self.push_error(format!("expected type, found {}", describe(&token)), Some(token.span));
                Expr::new(token.span, ExprKind::Bad)
            }
        }
    }

    /// Continue a type name after its first identifier: `pkg.Name` and `Name[Args]`.
    fn parse_type_name_rest(&mut self, ident: Ident) -> Expr {
        let start = ident.span.start;
        let mut expr = Expr::new(ident.span, ExprKind::Ident(ident));
        if self.check_punctuation('.') && matches!(self.peek_n(1).kind, TokenKind::Identifier) {
            self.advance();
            let field = self.expect_ident();
            expr = Expr::new(
                self.span_from(start),
                ExprKind::Selector {
                    base: Box::new(expr),
                    field,
                },
            );
        }
        if self.check_punctuation('[') && !self.peek_punctuation_n(1, ']') {
            self.advance();
            let indices = self.parse_type_args();
            expr = Expr::new(
                self.span_from(start),
                ExprKind::Index {
                    base: Box::new(expr),
                    indices,
                },
            );
        }
        expr
    }

    /// Type arguments after `[` up to and including the closing `]`.
    fn parse_type_args(&mut self) -> Vec<Expr> {
        self.expr_lev += 1;
        let mut args = Vec::new();
        while !self.check_punctuation(']') && !self.at_eof() {
            let before = self.index;
            args.push(self.parse_type());
            if !self.consume_punctuation(',') {
                break;
            }
            if self.index == before {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect_punctuation(']');
        args
    }

    /// After `[`: `[]T`, `[...]T` or `[N]T`.
    fn parse_array_type_rest(&mut self, start: usize) -> Expr {
        let len = if self.consume_punctuation(']') {
            None
        } else {
            let len_start = self.start();
            let len = if self.consume_operator("...") {
                Expr::new(self.span_from(len_start), ExprKind::Ellipsis(None))
            } else {
                self.expr_lev += 1;
                let len = self.parse_expr();
                self.expr_lev -= 1;
                len
            };
            self.expect_punctuation(']');
            Some(Box::new(len))
        };
        let elem = self.parse_type();
        Expr::new(
            self.span_from(start),
            ExprKind::ArrayType {
                len,
                elem: Box::new(elem),
            },
        )
    }

    fn parse_map_type(&mut self) -> Expr {
        let start = self.start();
        self.expect_keyword(Keyword::Map);
        self.expect_punctuation('[');
        let key = self.parse_type();
        self.expect_punctuation(']');
        let value = self.parse_type();
        Expr::new(
            self.span_from(start),
            ExprKind::MapType {
                key: Box::new(key),
                value: Box::new(value),
            },
        )
    }

    fn parse_chan_type(&mut self) -> Expr {
        let start = self.start();
        self.expect_keyword(Keyword::Chan);
        let dir = if self.consume_operator("<-") {
            ChanDir::Send
        } else {
            ChanDir::Both
        };
        let value = self.parse_type();
        Expr::new(
            self.span_from(start),
            ExprKind::ChanType {
                dir,
                value: Box::new(value),
            },
        )
    }

    fn parse_struct_type(&mut self) -> Expr {
        let start = self.start();
        self.expect_keyword(Keyword::Struct);
        self.expect_punctuation('{');
        let mut fields = Vec::new();
        while !self.check_punctuation('}') && !self.at_eof() {
            let before = self.index;
            if let Some(field) = self.parse_struct_field() {
                fields.push(field);
            }
            self.expect_semi("in struct type");
            if self.index == before {
                self.advance();
            }
        }
        self.expect_punctuation('}');
        Expr::new(
            self.span_from(start),
            ExprKind::StructType(StructType { fields }),
        )
    }

    fn parse_struct_field(&mut self) -> Option<Field> {
        let start = self.start();
        let doc = self.doc_for(self.index);
        let (names, ty) = if self.check_identifier() {
            let first = self.expect_ident();
            if self.check_punctuation(',') {
                let mut names = vec![first];
                while self.consume_punctuation(',') {
                    names.push(self.expect_ident());
                }
                (names, self.parse_type())
            } else if self.check_punctuation('.')
                || self.check_punctuation(';')
                || self.check_punctuation('}')
                || self.check_string_literal()
            {
                (Vec::new(), self.parse_type_name_rest(first))
            } else if self.check_punctuation('[') {
                match self.parse_array_or_instance(first) {
                    ArrayOrInstance::Named(name, ty) => (vec![name], ty),
                    ArrayOrInstance::Instance(ty) => (Vec::new(), ty),
                }
            } else {
                (vec![first], self.parse_type())
            }
        } else if self.check_operator("*") {
            (Vec::new(), self.parse_type())
        } else if self.check_punctuation('(') {
            let span = self.peek().span;
            self.push_error("cannot parenthesize embedded type", Some(span));
            (Vec::new(), self.parse_type())
        } else {
            let token = self.peek().clone();
            self.push_error(
                format!("expected field name or embedded type, found {}", describe(&token)),
                Some(token.span),
            );
            return None;
        };
        let tag = if self.check_string_literal() {
            Some(self.advance().lexeme)
        } else {
            None
        };
        Some(Field {
            doc,
            names,
            ty,
            tag,
            span: self.span_from(start),
        })
    }

    /// At `[` following `name`.
    fn parse_array_or_instance(&mut self, name: Ident) -> ArrayOrInstance {
        let open = self.start();
        self.expect_punctuation('[');
        if self.consume_punctuation(']') {
            let elem = self.parse_type();
            let ty = Expr::new(
                self.span_from(open),
                ExprKind::ArrayType {
                    len: None,
                    elem: Box::new(elem),
                },
            );
            return ArrayOrInstance::Named(name, ty);
        }
        if self.check_operator("...") {
            let len_start = self.start();
            self.advance();
            let len = Expr::new(self.span_from(len_start), ExprKind::Ellipsis(None));
            self.expect_punctuation(']');
            let elem = self.parse_type();
            let ty = Expr::new(
                self.span_from(open),
                ExprKind::ArrayType {
                    len: Some(Box::new(len)),
                    elem: Box::new(elem),
                },
            );
            return ArrayOrInstance::Named(name, ty);
        }
        self.expr_lev += 1;
        let mut args = vec![self.parse_expr()];
        while self.consume_punctuation(',') && !self.check_punctuation(']') {
            args.push(self.parse_type());
        }
        self.expr_lev -= 1;
        self.expect_punctuation(']');
        if args.len() == 1 && self.type_starts_here() {
            let elem = self.parse_type();
            let len = args.pop().map(Box::new);
            let ty = Expr::new(
                self.span_from(open),
                ExprKind::ArrayType {
                    len,
                    elem: Box::new(elem),
                },
            );
            return ArrayOrInstance::Named(name, ty);
        }
        let start = name.span.start;
        let base = Expr::new(name.span, ExprKind::Ident(name));
        ArrayOrInstance::Instance(Expr::new(
            self.span_from(start),
            ExprKind::Index {
                base: Box::new(base),
                indices: args,
            },
        ))
    }

    fn type_starts_here(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Identifier => true,
            TokenKind::Punctuation('[' | '(') => true,
            TokenKind::Operator("*" | "<-") => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Func
                    | Keyword::Map
                    | Keyword::Chan
                    | Keyword::Struct
                    | Keyword::Interface
            ),
            _ => false,
        }
    }

    fn parse_interface_type(&mut self) -> Expr {
        let start = self.start();
        self.expect_keyword(Keyword::Interface);
        self.expect_punctuation('{');
        let mut elements = Vec::new();
        while !self.check_punctuation('}') && !self.at_eof() {
            let before = self.index;
            let doc = self.doc_for(self.index);
            if self.check_identifier() && self.peek_punctuation_n(1, '(') {
                let name = self.expect_ident();
                let ty = self.parse_signature(name.span.start);
                elements.push(InterfaceElem::Method { doc, name, ty });
            } else {
                elements.push(InterfaceElem::Embedded(self.parse_constraint()));
            }
            self.expect_semi("in interface type");
            if self.index == before {
                self.advance();
            }
        }
        self.expect_punctuation('}');
        Expr::new(
            self.span_from(start),
            ExprKind::InterfaceType(InterfaceType { elements }),
        )
    }

    /// Type-set term list such as `~int | ~string | fmt.Stringer`.
    pub(super) fn parse_constraint(&mut self) -> Expr {
        let start = self.start();
        let mut expr = self.parse_constraint_term();
        while self.consume_operator("|") {
            let right = self.parse_constraint_term();
            expr = Expr::new(
                self.span_from(start),
                ExprKind::Binary {
                    op: "|",
                    left: Box::new(expr),
                    right: Box::new(right),
                },
            );
        }
        expr
    }

    fn parse_constraint_term(&mut self) -> Expr {
        let start = self.start();
        if self.consume_operator("~") {
            let operand = self.parse_type();
            return Expr::new(
                self.span_from(start),
                ExprKind::Unary {
                    op: "~",
                    operand: Box::new(operand),
                },
            );
        }
        self.parse_type()
    }

    /// Parameters and results after `func` (and name, and type parameters).
    pub(super) fn parse_signature(&mut self, start: usize) -> FuncType {
        let params = if self.expect_punctuation('(') {
            self.parse_field_list(')', false)
        } else {
            Vec::new()
        };
        let results = if self.consume_punctuation('(') {
            self.parse_field_list(')', false)
        } else if self.type_starts_here() {
            let ty = self.parse_type();
            let span = ty.span;
            vec![Field {
                doc: None,
                names: Vec::new(),
                ty,
                tag: None,
                span,
            }]
        } else {
            Vec::new()
        };
        FuncType {
            span: self.span_from(start),
            type_params: Vec::new(),
            params,
            results,
        }
    }

    /// Parameter, result or type-parameter list after the opening bracket, up to
    /// and including `close`.
    pub(super) fn parse_field_list(&mut self, close: char, type_params: bool) -> Vec<Field> {
        self.expr_lev += 1;
        let mut entries = Vec::new();
        while !self.check_punctuation(close) && !self.at_eof() {
            let before = self.index;
            entries.push(self.parse_list_entry(close, type_params));
            if !self.consume_punctuation(',') || self.index == before {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect_punctuation(close);
        self.group_list_entries(entries, type_params)
    }

    fn parse_list_entry(&mut self, close: char, type_params: bool) -> ListEntry {
        if self.check_identifier() {
            let name = self.expect_ident();
            if self.check_punctuation(',') || self.check_punctuation(close) {
                let span = name.span;
                return ListEntry::Unnamed(Expr::new(span, ExprKind::Ident(name)));
            }
            if self.check_punctuation('.') {
                return ListEntry::Unnamed(self.parse_type_name_rest(name));
            }
            if !type_params && self.check_punctuation('[') {
                return match self.parse_array_or_instance(name) {
                    ArrayOrInstance::Named(name, ty) => ListEntry::Named(name, ty),
                    ArrayOrInstance::Instance(ty) => ListEntry::Unnamed(ty),
                };
            }
            let ty = if type_params {
                self.parse_constraint()
            } else {
                self.parse_param_type()
            };
            return ListEntry::Named(name, ty);
        }
        ListEntry::Unnamed(self.parse_param_type())
    }

    fn parse_param_type(&mut self) -> Expr {
        let start = self.start();
        if self.consume_operator("...") {
            let elem = self.parse_type();
            return Expr::new(
                self.span_from(start),
                ExprKind::Ellipsis(Some(Box::new(elem))),
            );
        }
        self.parse_type()
    }

    fn group_list_entries(&mut self, entries: Vec<ListEntry>, type_params: bool) -> Vec<Field> {
        let any_named = entries
            .iter()
            .any(|entry| matches!(entry, ListEntry::Named(..)));
        if !any_named {
            if type_params && let Some(ListEntry::Unnamed(expr)) = entries.first() {
                let span = expr.span;
                self.push_error("type parameters require a constraint", Some(span));
            }
            return entries
                .into_iter()
                .filter_map(|entry| match entry {
                    ListEntry::Unnamed(ty) => Some(field(Vec::new(), ty)),
                    ListEntry::Named(..) => None,
                })
                .collect();
        }
        let mut fields = Vec::new();
        let mut pending: Vec<Ident> = Vec::new();
        for entry in entries {
            match entry {
                ListEntry::Unnamed(expr) => match expr.kind {
                    ExprKind::Ident(ident) => pending.push(ident),
                    _ => {
                        self.push_error("mixed named and unnamed parameters", Some(expr.span));
                    }
                },
                ListEntry::Named(name, ty) => {
                    pending.push(name);
                    fields.push(field(std::mem::take(&mut pending), ty));
                }
            }
        }
        if let Some(last) = pending.last() {
            let span = last.span;
            self.push_error("mixed named and unnamed parameters", Some(span));
        }
        fields
    }
}

fn field(names: Vec<Ident>, ty: Expr) -> Field {
    let span = match names.first() {
        Some(first) => first.span.to(ty.span),
        None => ty.span,
    };
    Field {
        doc: None,
        names,
        ty,
        tag: None,
        span,
    }
}

