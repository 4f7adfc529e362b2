use super::{ParseMode, Parser};
use crate::diagnostics::Span;
use crate::frontend::ast::{
    Decl, FileAst, FuncDecl, GenDecl, Ident, ImportSpec, Spec, TypeSpec, ValueSpec,
};
use crate::frontend::lexer::{Keyword, TokenKind, unquote};

parser_impl! {
    pub(super) fn parse_source_file(&mut self, mode: ParseMode) -> FileAst {
        let package_index = self.index;
        let doc = self.doc_for(package_index);
        let build_constraint = self.build_constraint(self.start());
        self.expect_keyword(Keyword::Package);
        let package = self.expect_ident();
        if package.is_blank() {
            self.push_error("invalid package name _", Some(package.span));
        }
        self.expect_semi("after package clause");

        let mut imports = Vec::new();
        while self.check_keyword(Keyword::Import) {
            self.parse_import_decl(&mut imports);
            self.expect_semi("after import declaration");
        }

        let mut decls = Vec::new();
        if mode == ParseMode::Full {
            while !self.at_eof() {
                let before = self.index;
                if let Some(decl) = self.parse_top_level_decl(&mut imports) {
                    decls.push(decl);
                }
                if self.index == before {
                    self.advance();
                }
            }
        }

        FileAst {
            file_id: self.file_id,
            doc,
            package,
            imports,
            decls,
            build_constraint,
        }
    }

    fn parse_top_level_decl(&mut self, imports: &mut Vec<ImportSpec>) -> Option<Decl> {
        let decl = match self.peek().kind {
            TokenKind::Keyword(Keyword::Func) => Some(Decl::Func(self.parse_func_decl())),
            TokenKind::Keyword(keyword @ (Keyword::Const | Keyword::Var | Keyword::Type)) => {
                Some(Decl::Gen(self.parse_gen_decl(keyword)))
            }
            TokenKind::Keyword(Keyword::Import) => {
                let span = self.peek().span;
                self.push_error("imports must appear before other declarations", Some(span));
                self.parse_import_decl(imports);
                None
            }
            TokenKind::Punctuation(';') => None,
            _ => {
                let span = self.peek().span;
                self.push_error("non-declaration statement outside function body", Some(span));
                self.skip_to_statement_end();
                return None;
            }
        };
        self.expect_semi("after top level declaration");
        decl
    }

    fn parse_import_decl(&mut self, imports: &mut Vec<ImportSpec>) {
        let doc = self.doc_for(self.index);
        self.expect_keyword(Keyword::Import);
        if self.consume_punctuation('(') {
            while !self.check_punctuation(')') && !self.at_eof() {
                let spec_doc = self.doc_for(self.index);
                let before = self.index;
                if let Some(spec) = self.parse_import_spec(spec_doc) {
                    imports.push(spec);
                }
                self.expect_semi("in import list");
                if self.index == before {
                    self.advance();
                }
            }
            self.expect_punctuation(')');
        } else if let Some(spec) = self.parse_import_spec(doc) {
            imports.push(spec);
        }
    }

    fn parse_import_spec(&mut self, doc: Option<String>) -> Option<ImportSpec> {
        let start = self.start();
        let name = if self.check_identifier() {
            Some(self.expect_ident())
        } else if self.check_punctuation('.') {
            let token = self.advance();
            Some(Ident::new(".", token.span))
        } else {
            None
        };
        if !self.check_string_literal() {
            let span = self.peek().span;
            self.push_error("missing import path", Some(span));
            return None;
        }
        let token = self.advance();
        let Some(path) = unquote(&token.lexeme) else {
            self.push_error("invalid import path literal", Some(token.span));
            return None;
        };
        if path.is_empty() {
            self.push_error("empty import path", Some(token.span));
            return None;
        }
        Some(ImportSpec {
            doc,
            name,
            path,
            path_span: token.span,
            span: self.span_from(start),
        })
    }

    /// `const`, `var` or `type` declaration. The trailing semicolon is left for
    /// the caller.
    pub(super) fn parse_gen_decl(&mut self, keyword: Keyword) -> GenDecl {
        let start = self.start();
        let doc = self.doc_for(self.index);
        self.expect_keyword(keyword);
        let mut specs = Vec::new();
        if self.consume_punctuation('(') {
            while !self.check_punctuation(')') && !self.at_eof() {
                let before = self.index;
                let spec_doc = self.doc_for(self.index);
                specs.push(self.parse_spec(keyword, spec_doc));
                self.expect_semi("in declaration list");
                if self.index == before {
                    self.advance();
                }
            }
            self.expect_punctuation(')');
        } else {
            let spec_doc = doc.clone();
            specs.push(self.parse_spec(keyword, spec_doc));
        }
        GenDecl {
            keyword,
            doc,
            specs,
            span: self.span_from(start),
        }
    }

    fn parse_spec(&mut self, keyword: Keyword, doc: Option<String>) -> Spec {
        if keyword == Keyword::Type {
            Spec::Type(self.parse_type_spec(doc))
        } else {
            Spec::Value(self.parse_value_spec(keyword, doc))
        }
    }

    fn parse_value_spec(&mut self, keyword: Keyword, doc: Option<String>) -> ValueSpec {
        let start = self.start();
        let mut names = vec![self.expect_ident()];
        while self.consume_punctuation(',') {
            names.push(self.expect_ident());
        }
        let ty = if self.check_operator("=") || self.check_punctuation(';') || self.check_punctuation(')') {
            None
        } else {
            Some(self.parse_type())
        };
        let values = if self.consume_operator("=") {
            self.parse_expr_list()
        } else {
            Vec::new()
        };
        if keyword == Keyword::Var && ty.is_none() && values.is_empty() {
            let span = self.span_from(start);
            self.push_error("missing variable type or initialization", Some(span));
        }
        ValueSpec {
            doc,
            names,
            ty,
            values,
            span: self.span_from(start),
        }
    }

    fn parse_type_spec(&mut self, doc: Option<String>) -> TypeSpec {
        let start = self.start();
        let name = self.expect_ident();
        let type_params = if self.check_punctuation('[') && self.type_params_ahead() {
            self.advance();
            self.parse_field_list(']', true)
        } else {
            Vec::new()
        };
        let is_alias = self.consume_operator("=");
        let ty = self.parse_type();
        TypeSpec {
            doc,
            name,
            type_params,
            is_alias,
            ty,
            span: self.span_from(start),
        }
    }

    /// At `[` after a type name: distinguish `type T[P any] ...` from the array
    /// type in `type A [N]int`.
    fn type_params_ahead(&self) -> bool {
        if !matches!(self.peek_n(1).kind, TokenKind::Identifier) {
            return false;
        }
        match &self.peek_n(2).kind {
            TokenKind::Identifier => true,
            TokenKind::Keyword(
                Keyword::Interface | Keyword::Func | Keyword::Map | Keyword::Chan | Keyword::Struct,
            ) => true,
            TokenKind::Punctuation(',' | '[' | '(') => true,
            TokenKind::Operator("~") => true,
            TokenKind::Operator("*") => matches!(
                self.peek_n(3).kind,
                TokenKind::Identifier | TokenKind::Punctuation('(')
            ),
            _ => false,
        }
    }

    fn parse_func_decl(&mut self) -> FuncDecl {
        let start = self.start();
        let doc = self.doc_for(self.index);
        self.expect_keyword(Keyword::Func);
        let recv = if self.consume_punctuation('(') {
            let recv_start = self.prev_end;
            let mut fields = self.parse_field_list(')', false);
            if fields.len() != 1 || fields[0].names.len() > 1 {
                let span = Span::in_file(self.file_id, recv_start, self.prev_end);
                self.push_error("method has multiple receivers", Some(span));
            }
            if fields.is_empty() {
                None
            } else {
                Some(fields.swap_remove(0))
            }
        } else {
            None
        };
        let name = self.expect_ident();
        let type_params = if recv.is_none() && self.consume_punctuation('[') {
            self.parse_field_list(']', true)
        } else {
            Vec::new()
        };
        let mut ty = self.parse_signature(start);
        ty.type_params = type_params;
        let body = if self.check_punctuation('{') {
            let saved = self.expr_lev;
            self.expr_lev = 0;
            let body = self.parse_block();
            self.expr_lev = saved;
            Some(body)
        } else {
            None
        };
        FuncDecl {
            doc,
            recv,
            name,
            ty,
            body,
            span: self.span_from(start),
        }
    }
}
