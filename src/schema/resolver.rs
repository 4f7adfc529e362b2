use std::collections::BTreeMap;
use std::sync::Arc;

use super::SchemaResolver;
use super::decl::TypeParam;
use super::types::{
    BuiltinKind, FuncSig, InterfaceMethod, InterfaceType, ListLen, ListType, MapType, NamedType, Param,
    StructField, StructType, Type, TypeParamRef,
};
use crate::diagnostics::{Diagnostic, Span};
use crate::error::{Error, Result};
use crate::frontend::ast::{Expr, ExprKind, Field, FuncType, Ident, InterfaceElem};
use crate::frontend::lexer::{LiteralKind, parse_int_literal, unquote};
use crate::frontend::struct_tag::StructTag;
use crate::names::{FileNames, NameRef};
use crate::paths::{PkgPath, QualifiedName};

/// Where identifiers in the type syntax get their meaning.
pub(super) enum NameSource<'a> {
    /// A parsed source file with its resolved names.
    File {
        package: PkgPath,
        names: Arc<FileNames>,
    },
    /// Free-standing type text with a caller-supplied import table.
    Text {
        package: Option<&'a PkgPath>,
        imports: &'a BTreeMap<String, PkgPath>,
    },
}

/// Recursive-descent translation of type syntax into [`Type`], scoped to the
/// type parameters of one declaration.
pub(super) struct TypeResolver<'a> {
    schema: &'a SchemaResolver,
    source: NameSource<'a>,
    type_params: &'a [TypeParam],
}

impl<'a> TypeResolver<'a> {
    pub(super) fn new(
        schema: &'a SchemaResolver,
        source: NameSource<'a>,
        type_params: &'a [TypeParam],
    ) -> Self {
        Self {
            schema,
            source,
            type_params,
        }
    }

    pub(super) fn resolve(&self, expr: &Expr) -> Result<Type> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.resolve(inner),
            ExprKind::Ident(ident) => self.resolve_ident(ident),
            ExprKind::Selector { .. } => self.resolve_qualified(expr),
            ExprKind::Index { base, indices } => self.resolve_instance(expr, base, indices),
            ExprKind::Star(elem) => Ok(Type::pointer(self.resolve(elem)?)),
            ExprKind::ArrayType { len, elem } => self.resolve_list(len.as_deref(), elem),
            ExprKind::MapType { key, value } => Ok(Type::Map(MapType {
                key: Box::new(self.resolve(key)?),
                value: Box::new(self.resolve(value)?),
            })),
            ExprKind::StructType(st) => self.resolve_struct(&st.fields),
            ExprKind::FuncType(ty) => Ok(Type::Func(self.resolve_sig(ty)?)),
            ExprKind::InterfaceType(iface) => {
                let mut model = InterfaceType::default();
                for element in &iface.elements {
                    match element {
                        InterfaceElem::Method { doc, name, ty } => {
                            model.methods.push(InterfaceMethod {
                                name: name.name.clone(),
                                sig: self.resolve_sig(ty)?,
                                doc: doc.clone(),
                            });
                        }
                        InterfaceElem::Embedded(expr) => self.resolve_embedded(expr, &mut model)?,
                    }
                }
                Ok(Type::Interface(model))
            }
            ExprKind::ChanType { .. } => Err(self.unsupported("channel types are not supported", expr.span)),
            _ => Err(self.unsupported("unsupported type expression", expr.span)),
        }
    }

    pub(super) fn resolve_sig(&self, ty: &FuncType) -> Result<FuncSig> {
        let mut params = Vec::new();
        let mut variadic = false;
        let last = ty.params.len().saturating_sub(1);
        for (i, field) in ty.params.iter().enumerate() {
            let resolved = match &field.ty.kind {
                ExprKind::Ellipsis(Some(elem)) if i == last => {
                    variadic = true;
                    Type::slice(self.resolve(elem)?)
                }
                _ => self.resolve(&field.ty)?,
            };
            push_params(&mut params, field, resolved);
        }
        let mut results = Vec::new();
        for field in &ty.results {
            let resolved = self.resolve(&field.ty)?;
            push_params(&mut results, field, resolved);
        }
        Ok(FuncSig {
            params,
            results,
            variadic,
        })
    }

    fn resolve_ident(&self, ident: &Ident) -> Result<Type> {
        match &self.source {
            NameSource::File { package, names } => match names.resolve(ident) {
                Some(NameRef::Local { decl }) => {
                    match self.type_params.iter().position(|param| param.span == *decl) {
                        Some(index) => Ok(self.type_param(index)),
                        None => Err(self.unsupported(
                            format!("local type {} is not supported", ident.name),
                            ident.span,
                        )),
                    }
                }
                Some(NameRef::Package { name }) => {
                    let decl = self.schema.type_decl(package, name, Some(ident.span))?;
                    Ok(Type::Named(NamedType::new(&decl, Vec::new())))
                }
                Some(NameRef::Import { .. }) => Err(self.unsupported(
                    format!("use of package {} without selector", ident.name),
                    ident.span,
                )),
                None => self.predeclared(ident),
            },
            NameSource::Text { package, .. } => {
                if let Some(index) = self.type_params.iter().position(|param| param.name == ident.name) {
                    return Ok(self.type_param(index));
                }
                if let Some(package) = package
                    && self.schema.decl_info(package, &ident.name, Some(ident.span))?.is_some()
                {
                    let decl = self.schema.type_decl(package, &ident.name, Some(ident.span))?;
                    return Ok(Type::Named(NamedType::new(&decl, Vec::new())));
                }
                self.predeclared(ident)
            }
        }
    }

    fn predeclared(&self, ident: &Ident) -> Result<Type> {
        if ident.name == "any" {
            return Ok(Type::any());
        }
        match BuiltinKind::from_predeclared(&ident.name) {
            Some(kind) => Ok(Type::Builtin(kind)),
            None => Err(self.unsupported(format!("undefined: {}", ident.name), ident.span)),
        }
    }

    fn type_param(&self, index: usize) -> Type {
        Type::TypeParam(TypeParamRef {
            index,
            name: self.type_params[index].name.clone(),
        })
    }

    /// `pkg.Name`, resolved through the file's imports.
    fn resolve_qualified(&self, expr: &Expr) -> Result<Type> {
        let qualified = match &self.source {
            NameSource::File { package, names } => names.qualified_name(package, expr),
            NameSource::Text { imports, .. } => match &expr.kind {
                ExprKind::Selector { base, field } => base
                    .unparen()
                    .as_ident()
                    .and_then(|base| imports.get(&base.name))
                    .map(|path| QualifiedName::new(path.clone(), field.name.clone())),
                _ => None,
            },
        };
        let Some(qualified) = qualified else {
            return Err(self.unsupported("undefined qualified type", expr.span));
        };
        if let Some(kind) = self.schema.well_known(&qualified) {
            return Ok(Type::Builtin(kind));
        }
        let decl = self
            .schema
            .type_decl(&qualified.package, &qualified.name, Some(expr.span))?;
        Ok(Type::Named(NamedType::new(&decl, Vec::new())))
    }

    fn resolve_instance(&self, expr: &Expr, base: &Expr, indices: &[Expr]) -> Result<Type> {
        let Type::Named(mut named) = self.resolve(base)? else {
            return Err(self.unsupported("only named types can be instantiated", expr.span));
        };
        named.args = indices
            .iter()
            .map(|index| self.resolve(index))
            .collect::<Result<_>>()?;
        if self.schema.is_option(&named.key.qualified_name()) {
            if let [value] = named.args.as_slice() {
                return Ok(Type::Option(Box::new(value.clone())));
            }
            return Err(self.unsupported("option takes exactly one type argument", expr.span));
        }
        Ok(Type::Named(named))
    }

    fn resolve_list(&self, len: Option<&Expr>, elem: &Expr) -> Result<Type> {
        let elem = self.resolve(elem)?;
        let len = match len {
            None => {
                if elem == Type::Builtin(BuiltinKind::Uint8) {
                    return Ok(Type::Builtin(BuiltinKind::Bytes));
                }
                ListLen::Unbounded
            }
            Some(len) => match &len.unparen().kind {
                ExprKind::BasicLit {
                    kind: LiteralKind::Int,
                    value,
                } => parse_int_literal(value).map_or(ListLen::Unknown, ListLen::Fixed),
                _ => ListLen::Unknown,
            },
        };
        Ok(Type::List(ListType {
            elem: Box::new(elem),
            len,
        }))
    }

    fn resolve_struct(&self, fields: &[Field]) -> Result<Type> {
        let mut resolved = Vec::new();
        for field in fields {
            let ty = self.resolve(&field.ty)?;
            let raw_tag = field.tag.as_deref().and_then(unquote);
            let tag = raw_tag.as_deref().map(StructTag::parse).unwrap_or_default();
            if field.names.is_empty() {
                let Some(name) = embedded_name(&field.ty) else {
                    return Err(self.unsupported("invalid embedded field", field.span));
                };
                resolved.push(StructField {
                    name: name.to_string(),
                    ty,
                    embedded: true,
                    raw_tag,
                    tag,
                    doc: field.doc.clone(),
                });
                continue;
            }
            for name in &field.names {
                resolved.push(StructField {
                    name: name.name.clone(),
                    ty: ty.clone(),
                    embedded: false,
                    raw_tag: raw_tag.clone(),
                    tag: tag.clone(),
                    doc: field.doc.clone(),
                });
            }
        }
        Ok(Type::Struct(StructType { fields: resolved }))
    }

    /// Embedded interface element: another interface, or a type-set term
    /// such as `~int | ~string`.
    fn resolve_embedded(&self, expr: &Expr, model: &mut InterfaceType) -> Result<()> {
        match &expr.unparen().kind {
            ExprKind::Binary { op: "|", .. } | ExprKind::Unary { op: "~", .. } => {
                self.resolve_terms(expr, model)
            }
            _ => {
                model.embeds.push(self.resolve(expr)?);
                Ok(())
            }
        }
    }

    fn resolve_terms(&self, expr: &Expr, model: &mut InterfaceType) -> Result<()> {
        match &expr.unparen().kind {
            ExprKind::Binary {
                op: "|",
                left,
                right,
            } => {
                self.resolve_terms(left, model)?;
                self.resolve_terms(right, model)
            }
            ExprKind::Unary { op: "~", operand } => {
                model.terms.push(self.resolve(operand)?);
                Ok(())
            }
            _ => {
                model.terms.push(self.resolve(expr)?);
                Ok(())
            }
        }
    }

    fn unsupported(&self, message: impl Into<String>, span: Span) -> Error {
        self.schema
            .diagnostics
            .bail(super::NAMESPACE, Diagnostic::error(message, Some(span)))
    }
}

fn push_params(params: &mut Vec<Param>, field: &Field, ty: Type) {
    if field.names.is_empty() {
        params.push(Param { name: None, ty });
        return;
    }
    for name in &field.names {
        params.push(Param {
            name: Some(name.name.clone()),
            ty: ty.clone(),
        });
    }
}

/// Field name implied by an embedded type: `T`, `*T`, `pkg.T`, `T[X]`.
fn embedded_name(expr: &Expr) -> Option<&str> {
    match &expr.unparen().kind {
        ExprKind::Ident(ident) => Some(&ident.name),
        ExprKind::Selector { field, .. } => Some(&field.name),
        ExprKind::Star(inner) | ExprKind::Index { base: inner, .. } => embedded_name(inner),
        _ => None,
    }
}
