use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use super::imports::UnaliasedImports;
use super::scope::ScopeStack;
use super::{FileImport, FileNames, NAMESPACE, NameRef, PackageNames};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::frontend::ast::{
    Block, CaseClause, Decl, Element, Expr, ExprKind, Field, FileAst, FuncDecl, FuncType, GenDecl,
    Ident, InterfaceElem, Spec, Statement, StatementKind,
};
use crate::loader::{File, Package, PackageLoader};
use crate::paths::PkgPath;

/// Bound on the declarations followed when looking through a literal type.
const MAX_TYPE_HOPS: usize = 16;

/// Classifies every identifier of one file against the scope chain.
pub(super) struct FileWalker<'a> {
    loader: &'a PackageLoader,
    diagnostics: &'a Diagnostics,
    package: &'a Package,
    package_names: &'a PackageNames,
    scope: ScopeStack,
    idents: HashMap<usize, NameRef>,
    imports: Vec<FileImport>,
    aliases: BTreeMap<String, PkgPath>,
    unaliased: UnaliasedImports,
}

impl<'a> FileWalker<'a> {
    pub(super) fn new(
        loader: &'a PackageLoader,
        diagnostics: &'a Diagnostics,
        package: &'a Package,
        names: &'a PackageNames,
    ) -> Self {
        let mut scope = ScopeStack::new();
        for decl in names.iter() {
            scope.insert(
                &decl.name,
                NameRef::Package {
                    name: decl.name.clone(),
                },
            );
        }
        // File block holding explicit import names.
        scope.push();
        Self {
            loader,
            diagnostics,
            package,
            package_names: names,
            scope,
            idents: HashMap::new(),
            imports: Vec::new(),
            aliases: BTreeMap::new(),
            unaliased: UnaliasedImports::default(),
        }
    }

    /// Bind the file's imports. Dot imports are reported and left unbound.
    pub(super) fn collect_imports(&mut self, file: &File) {
        for spec in &file.imports {
            let resolved = if spec.path.starts_with('.') {
                self.package.import_path.join_relative(&spec.path)
            } else {
                PkgPath::new(spec.path.clone())
            };
            let path = match resolved {
                Ok(path) => path,
                Err(err) => {
                    self.diagnostics.emit(
                        NAMESPACE,
                        Diagnostic::error(err.to_string(), Some(spec.path_span)),
                    );
                    continue;
                }
            };
            match &spec.name {
                Some(alias) if alias.name == "." => {
                    self.diagnostics.emit(
                        NAMESPACE,
                        Diagnostic::error(
                            format!("dot import of {path} is not supported"),
                            Some(alias.span),
                        ),
                    );
                    continue;
                }
                Some(alias) if alias.is_blank() => {}
                Some(alias) => {
                    let target = NameRef::Import { path: path.clone() };
                    self.scope.insert(&alias.name, target.clone());
                    self.idents.insert(alias.span.start, target);
                    self.aliases.insert(alias.name.clone(), path.clone());
                }
                None => self.unaliased.push(path.clone()),
            }
            self.imports.push(FileImport {
                path,
                alias: spec.name.as_ref().map(|alias| alias.name.clone()),
                span: spec.span,
            });
        }
    }

    pub(super) fn finish(self) -> FileNames {
        let mut import_names = self.aliases;
        for (name, path) in self.unaliased.resolved() {
            import_names
                .entry(name.clone())
                .or_insert_with(|| path.clone());
        }
        FileNames {
            idents: self.idents,
            imports: self.imports,
            import_names,
        }
    }

    pub(super) fn walk_file(&mut self, ast: &FileAst) -> Result<()> {
        for decl in &ast.decls {
            match decl {
                Decl::Func(func) => self.walk_func_decl(func)?,
                Decl::Gen(gen_decl) => self.walk_gen_decl(gen_decl, false)?,
            }
        }
        Ok(())
    }

    fn record(&mut self, ident: &Ident, target: NameRef) {
        self.idents.insert(ident.span.start, target);
    }

    fn declare(&mut self, ident: &Ident) {
        if ident.is_blank() {
            return;
        }
        let target = NameRef::Local { decl: ident.span };
        self.scope.insert(&ident.name, target.clone());
        self.record(ident, target);
    }

    fn resolve_ident(&mut self, ident: &Ident) {
        if let Some(target) = self.scope.lookup(&ident.name).cloned() {
            self.record(ident, target);
        }
    }

    fn walk_func_decl(&mut self, func: &FuncDecl) -> Result<()> {
        self.scope.push();
        if let Some(recv) = &func.recv {
            self.walk_receiver_type(&recv.ty)?;
        } else if func.name.name != "init" && !func.name.is_blank() {
            self.record(
                &func.name,
                NameRef::Package {
                    name: func.name.name.clone(),
                },
            );
        }
        self.walk_signature(&func.ty)?;
        if let Some(recv) = &func.recv {
            for name in &recv.names {
                self.declare(name);
            }
        }
        if let Some(body) = &func.body {
            self.walk_statements(&body.statements)?;
        }
        self.scope.pop();
        Ok(())
    }

    /// `*Box[K, V]`: the bracketed names declare the receiver's type
    /// parameters.
    fn walk_receiver_type(&mut self, ty: &Expr) -> Result<()> {
        match &ty.unparen().kind {
            ExprKind::Star(inner) => self.walk_receiver_type(inner),
            ExprKind::Index { base, indices } => {
                for index in indices {
                    if let Some(ident) = index.as_ident() {
                        self.declare(ident);
                    }
                }
                self.walk_expr(base)
            }
            _ => self.walk_expr(ty),
        }
    }

    /// Type parameters first, then parameter and result types, and only then
    /// the parameter and result names.
    fn walk_signature(&mut self, ty: &FuncType) -> Result<()> {
        self.walk_type_params(&ty.type_params)?;
        for field in ty.params.iter().chain(&ty.results) {
            self.walk_expr(&field.ty)?;
        }
        for field in ty.params.iter().chain(&ty.results) {
            for name in &field.names {
                self.declare(name);
            }
        }
        Ok(())
    }

    fn walk_type_params(&mut self, params: &[Field]) -> Result<()> {
        for field in params {
            for name in &field.names {
                self.declare(name);
            }
        }
        for field in params {
            self.walk_expr(&field.ty)?;
        }
        Ok(())
    }

    fn walk_gen_decl(&mut self, decl: &GenDecl, local: bool) -> Result<()> {
        for spec in &decl.specs {
            match spec {
                Spec::Type(ts) => {
                    if local {
                        self.declare(&ts.name);
                    } else {
                        self.resolve_ident(&ts.name);
                    }
                    self.scope.push();
                    self.walk_type_params(&ts.type_params)?;
                    self.walk_expr(&ts.ty)?;
                    self.scope.pop();
                }
                Spec::Value(vs) => {
                    if let Some(ty) = &vs.ty {
                        self.walk_expr(ty)?;
                    }
                    self.walk_exprs(&vs.values)?;
                    for name in &vs.names {
                        if local {
                            self.declare(name);
                        } else {
                            self.resolve_ident(name);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn walk_block(&mut self, block: &Block) -> Result<()> {
        self.scope.push();
        self.walk_statements(&block.statements)?;
        self.scope.pop();
        Ok(())
    }

    fn walk_statements(&mut self, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            self.walk_statement(statement)?;
        }
        Ok(())
    }

    fn walk_optional_statement(&mut self, statement: Option<&Statement>) -> Result<()> {
        match statement {
            Some(statement) => self.walk_statement(statement),
            None => Ok(()),
        }
    }

    fn walk_statement(&mut self, statement: &Statement) -> Result<()> {
        match &statement.kind {
            StatementKind::Bad | StatementKind::Empty | StatementKind::Branch { .. } => Ok(()),
            StatementKind::Decl(decl) => self.walk_gen_decl(decl, true),
            StatementKind::Labeled { body, .. } => self.walk_statement(body),
            StatementKind::Expr(expr)
            | StatementKind::Go(expr)
            | StatementKind::Defer(expr)
            | StatementKind::IncDec { target: expr, .. } => self.walk_expr(expr),
            StatementKind::Send { channel, value } => {
                self.walk_expr(channel)?;
                self.walk_expr(value)
            }
            StatementKind::Assign { lhs, op, rhs } => {
                self.walk_exprs(rhs)?;
                if *op == ":=" {
                    self.define_all(lhs)
                } else {
                    self.walk_exprs(lhs)
                }
            }
            StatementKind::Return(values) => self.walk_exprs(values),
            StatementKind::Block(block) => self.walk_block(block),
            StatementKind::If(stmt) => {
                self.scope.push();
                self.walk_optional_statement(stmt.init.as_deref())?;
                self.walk_expr(&stmt.condition)?;
                self.walk_block(&stmt.then_branch)?;
                self.walk_optional_statement(stmt.else_branch.as_deref())?;
                self.scope.pop();
                Ok(())
            }
            StatementKind::Switch(stmt) => {
                self.scope.push();
                self.walk_optional_statement(stmt.init.as_deref())?;
                if let Some(tag) = &stmt.tag {
                    self.walk_expr(tag)?;
                }
                for clause in &stmt.clauses {
                    self.walk_case_clause(clause, None)?;
                }
                self.scope.pop();
                Ok(())
            }
            StatementKind::TypeSwitch(stmt) => {
                self.scope.push();
                self.walk_optional_statement(stmt.init.as_deref())?;
                self.walk_expr(&stmt.subject)?;
                for clause in &stmt.clauses {
                    self.walk_case_clause(clause, stmt.binding.as_ref())?;
                }
                self.scope.pop();
                Ok(())
            }
            StatementKind::Select(clauses) => {
                for clause in clauses {
                    self.scope.push();
                    self.walk_optional_statement(clause.comm.as_deref())?;
                    self.walk_statements(&clause.body)?;
                    self.scope.pop();
                }
                Ok(())
            }
            StatementKind::For(stmt) => {
                self.scope.push();
                self.walk_optional_statement(stmt.init.as_deref())?;
                if let Some(condition) = &stmt.condition {
                    self.walk_expr(condition)?;
                }
                self.walk_optional_statement(stmt.post.as_deref())?;
                self.walk_block(&stmt.body)?;
                self.scope.pop();
                Ok(())
            }
            StatementKind::Range(stmt) => {
                self.scope.push();
                self.walk_expr(&stmt.subject)?;
                let targets: Vec<&Expr> = stmt.key.iter().chain(&stmt.value).collect();
                for target in targets {
                    match target.as_ident() {
                        Some(ident) if stmt.define => self.declare(ident),
                        _ => self.walk_expr(target)?,
                    }
                }
                self.walk_block(&stmt.body)?;
                self.scope.pop();
                Ok(())
            }
        }
    }

    fn walk_case_clause(&mut self, clause: &CaseClause, binding: Option<&Ident>) -> Result<()> {
        self.scope.push();
        self.walk_exprs(&clause.values)?;
        if let Some(binding) = binding {
            self.declare(binding);
        }
        self.walk_statements(&clause.body)?;
        self.scope.pop();
        Ok(())
    }

    /// Left-hand side of `:=`: names new in this block are declared, the
    /// others are plain references.
    fn define_all(&mut self, lhs: &[Expr]) -> Result<()> {
        for target in lhs {
            match target.as_ident() {
                Some(ident) if !self.scope.declared_here(&ident.name) => self.declare(ident),
                _ => self.walk_expr(target)?,
            }
        }
        Ok(())
    }

    /// Walk the elements of a composite literal of type `ty`. Bare identifier
    /// keys of a struct literal are field names and are left unresolved.
    /// Elided element types are taken from the enclosing array or map type.
    fn walk_elements(&mut self, ty: Option<&Expr>, elements: &[Element]) -> Result<()> {
        let underlying = ty.map(|ty| self.literal_underlying(ty));
        let (key_ty, elem_ty) = match underlying.as_deref().map(|ty| &ty.kind) {
            Some(ExprKind::MapType { key, value }) => (Some(&**key), Some(&**value)),
            Some(ExprKind::ArrayType { elem, .. }) => (None, Some(&**elem)),
            _ => (None, None),
        };
        let field_keys = elem_ty.is_none();
        for Element { key, value } in elements {
            match key {
                Some(key) if field_keys && key.as_ident().is_some() => {}
                Some(key) => self.walk_element(key_ty, key)?,
                None => {}
            }
            self.walk_element(elem_ty, value)?;
        }
        Ok(())
    }

    fn walk_element(&mut self, elided: Option<&Expr>, element: &Expr) -> Result<()> {
        match &element.kind {
            ExprKind::CompositeLit { ty: None, elements } => self.walk_elements(elided, elements),
            _ => self.walk_expr(element),
        }
    }

    /// The type literal behind `ty`, following package-level type
    /// declarations. Pointers are stripped for elided `&T{...}` elements.
    fn literal_underlying<'e>(&self, ty: &'e Expr) -> Cow<'e, Expr> {
        let mut current = Cow::Borrowed(ty);
        for _ in 0..MAX_TYPE_HOPS {
            let next = match &current.kind {
                ExprKind::Paren(inner) | ExprKind::Star(inner) => (**inner).clone(),
                ExprKind::Index { base, .. } => (**base).clone(),
                ExprKind::Ident(ident) => {
                    let Some(NameRef::Package { name }) = self.scope.lookup(&ident.name) else {
                        return current;
                    };
                    match self.package_names.get(name).and_then(|info| info.type_spec()) {
                        Some(spec) => spec.ty.clone(),
                        None => return current,
                    }
                }
                _ => return current,
            };
            current = Cow::Owned(next);
        }
        current
    }

    fn walk_exprs(&mut self, exprs: &[Expr]) -> Result<()> {
        for expr in exprs {
            self.walk_expr(expr)?;
        }
        Ok(())
    }

    fn walk_optional_expr(&mut self, expr: Option<&Expr>) -> Result<()> {
        match expr {
            Some(expr) => self.walk_expr(expr),
            None => Ok(()),
        }
    }

    fn walk_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Bad | ExprKind::BasicLit { .. } => Ok(()),
            ExprKind::Ident(ident) => {
                self.resolve_ident(ident);
                Ok(())
            }
            ExprKind::Selector { base, .. } => self.walk_selector_base(base),
            ExprKind::CompositeLit { ty, elements } => {
                self.walk_optional_expr(ty.as_deref())?;
                self.walk_elements(ty.as_deref(), elements)
            }
            ExprKind::FuncLit { ty, body } => {
                self.scope.push();
                self.walk_signature(ty)?;
                self.walk_statements(&body.statements)?;
                self.scope.pop();
                Ok(())
            }
            ExprKind::FuncType(ty) => {
                self.scope.push();
                self.walk_signature(ty)?;
                self.scope.pop();
                Ok(())
            }
            ExprKind::Paren(inner)
            | ExprKind::Star(inner)
            | ExprKind::Unary { operand: inner, .. }
            | ExprKind::ChanType { value: inner, .. } => self.walk_expr(inner),
            ExprKind::Ellipsis(inner) => self.walk_optional_expr(inner.as_deref()),
            ExprKind::Index { base, indices } => {
                self.walk_expr(base)?;
                self.walk_exprs(indices)
            }
            ExprKind::Slice {
                base,
                low,
                high,
                max,
            } => {
                self.walk_expr(base)?;
                self.walk_optional_expr(low.as_deref())?;
                self.walk_optional_expr(high.as_deref())?;
                self.walk_optional_expr(max.as_deref())
            }
            ExprKind::TypeAssert { base, ty } => {
                self.walk_expr(base)?;
                self.walk_optional_expr(ty.as_deref())
            }
            ExprKind::Call { func, args, .. } => {
                self.walk_expr(func)?;
                self.walk_exprs(args)
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left)?;
                self.walk_expr(right)
            }
            ExprKind::ArrayType { len, elem } => {
                self.walk_optional_expr(len.as_deref())?;
                self.walk_expr(elem)
            }
            ExprKind::MapType { key, value } => {
                self.walk_expr(key)?;
                self.walk_expr(value)
            }
            ExprKind::StructType(st) => {
                for field in &st.fields {
                    self.walk_expr(&field.ty)?;
                }
                Ok(())
            }
            ExprKind::InterfaceType(iface) => {
                for element in &iface.elements {
                    match element {
                        InterfaceElem::Method { ty, .. } => {
                            self.scope.push();
                            self.walk_signature(ty)?;
                            self.scope.pop();
                        }
                        InterfaceElem::Embedded(expr) => self.walk_expr(expr)?,
                    }
                }
                Ok(())
            }
        }
    }

    /// `x.Sel`: an `x` missing from every scope may name an unaliased import.
    fn walk_selector_base(&mut self, base: &Expr) -> Result<()> {
        let Some(ident) = base.unparen().as_ident() else {
            return self.walk_expr(base);
        };
        if let Some(target) = self.scope.lookup(&ident.name).cloned() {
            self.record(ident, target);
            return Ok(());
        }
        match self.unaliased.resolve(self.loader, &ident.name, ident.span)? {
            Some(path) => self.record(ident, NameRef::Import { path }),
            None => {
                self.diagnostics.emit(
                    NAMESPACE,
                    Diagnostic::error(format!("undefined: {}", ident.name), Some(ident.span)),
                );
            }
        }
        Ok(())
    }
}
