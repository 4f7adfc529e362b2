//! Type model construction: type syntax to [`Type`], declaration resolution
//! with a cycle-safe shared cache, and generic instantiation.

mod concretize;
mod decl;
mod resolver;
mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::build_info::BuildInfo;
use crate::diagnostics::{Diagnostic, Diagnostics, Span};
use crate::error::{Error, Result};
use crate::frontend::ast::{Expr, ExprKind};
use crate::frontend::parser::parse_type_expr;
use crate::loader::{File, PackageLoader};
use crate::names::{self, DeclKind, PkgDeclInfo};
use crate::paths::{PkgPath, QualifiedName};

pub use concretize::{concretize, concretize_sig};
pub use decl::{DeclKey, FuncDeclSig, TypeDecl, TypeParam};
pub use types::{
    BuiltinKind, FuncSig, InterfaceMethod, InterfaceType, ListLen, ListType, MapType, NamedType,
    Param, StructField, StructType, Type, TypeParamRef,
};

use resolver::{NameSource, TypeResolver};

const NAMESPACE: &str = "SCHEMA";

type FuncSlot = Arc<OnceCell<Option<Arc<FuncDeclSig>>>>;

/// Resolves type syntax and declarations. Declarations are shared through
/// one cache per analysis, so concurrent resolutions converge on a single
/// [`TypeDecl`] per key.
pub struct SchemaResolver {
    build: Arc<BuildInfo>,
    loader: Arc<PackageLoader>,
    diagnostics: Arc<Diagnostics>,
    decls: Mutex<HashMap<DeclKey, Arc<TypeDecl>>>,
    funcs: Mutex<HashMap<DeclKey, FuncSlot>>,
}

impl std::fmt::Debug for SchemaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let decls = self.decls.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("SchemaResolver")
            .field("decls", &decls)
            .finish_non_exhaustive()
    }
}

impl SchemaResolver {
    #[must_use]
    pub fn new(build: Arc<BuildInfo>, loader: Arc<PackageLoader>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            build,
            loader,
            diagnostics,
            decls: Mutex::new(HashMap::new()),
            funcs: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a type expression appearing in `file`, outside any generic
    /// declaration.
    pub fn resolve_type(&self, file: &File, expr: &Expr) -> Result<Type> {
        let source = self.file_source(file)?;
        TypeResolver::new(self, source, &[]).resolve(expr)
    }

    /// Resolve free-standing type syntax. Unqualified names are looked up in
    /// `package` when given; qualified ones through `imports`.
    pub fn resolve_type_text(
        &self,
        package: Option<&PkgPath>,
        imports: &BTreeMap<String, PkgPath>,
        text: &str,
    ) -> Result<Type> {
        let expr = parse_type_expr(text).map_err(Error::Parse)?;
        TypeResolver::new(self, NameSource::Text { package, imports }, &[]).resolve(&expr)
    }

    /// The declaration of type `package.name` with its underlying type
    /// computed. Waits when another thread is computing it.
    pub fn resolve_type_decl(
        &self,
        package: &PkgPath,
        name: &str,
        cause: Option<Span>,
    ) -> Result<Arc<TypeDecl>> {
        let decl = self.type_decl(package, name, cause)?;
        match decl.wait() {
            Some(_) => Ok(decl),
            None => Err(Error::Bailout),
        }
    }

    /// Signature of a package function, or of a method when `receiver` names
    /// the receiver's base type. Computed once per key.
    pub fn resolve_func_decl(
        &self,
        package: &PkgPath,
        name: &str,
        receiver: Option<&str>,
        cause: Option<Span>,
    ) -> Result<Arc<FuncDeclSig>> {
        let key = match receiver {
            Some(receiver) => DeclKey::method(package.clone(), receiver, name),
            None => DeclKey::new(package.clone(), name),
        };
        let slot = {
            let mut funcs = self.funcs.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(funcs.entry(key.clone()).or_default())
        };
        let sig = slot.get_or_init(|| match self.compute_func(&key, cause) {
            Ok(sig) => Some(Arc::new(sig)),
            Err(err) => {
                if !err.is_abandon() {
                    self.diagnostics
                        .emit(NAMESPACE, Diagnostic::error(err.to_string(), cause));
                }
                None
            }
        });
        sig.clone().ok_or(Error::Bailout)
    }

    /// Underlying type of `decl` with `args` substituted for its type
    /// parameters.
    pub fn instantiate(&self, decl: &TypeDecl, args: &[Type]) -> Result<Type> {
        let underlying = decl.wait().ok_or(Error::Bailout)?;
        Ok(concretize(underlying, args))
    }

    /// Declaration info for `package.name`, or `None` when the package has no
    /// such declaration. The package must exist.
    pub fn decl_info(
        &self,
        package: &PkgPath,
        name: &str,
        cause: Option<Span>,
    ) -> Result<Option<Arc<PkgDeclInfo>>> {
        let pkg = self.loader.must_load_package(cause, package)?;
        let names = names::package_names(&self.diagnostics, &pkg)?;
        Ok(names.get(name).cloned())
    }

    /// The cached declaration for `package.name`, creating and computing it
    /// on first use. The placeholder is published before its underlying type
    /// is computed, so a reference cycle finds it instead of recursing.
    pub(crate) fn type_decl(
        &self,
        package: &PkgPath,
        name: &str,
        cause: Option<Span>,
    ) -> Result<Arc<TypeDecl>> {
        let key = DeclKey::new(package.clone(), name);
        if let Some(decl) = self.cached_decl(&key) {
            return Ok(decl);
        }
        let Some(info) = self.decl_info(package, name, cause)? else {
            return Err(self.diagnostics.bail(
                NAMESPACE,
                Diagnostic::error(format!("undefined: {}", key.qualified_name()), cause),
            ));
        };
        if info.kind != DeclKind::Type {
            return Err(self.diagnostics.bail(
                NAMESPACE,
                Diagnostic::error(format!("{} is not a type", key.qualified_name()), cause),
            ));
        }
        let Some(spec) = info.type_spec() else {
            return Err(Error::internal(format!("{key} has no type spec")));
        };
        let type_params = spec
            .type_params
            .iter()
            .flat_map(|field| &field.names)
            .map(|ident| TypeParam {
                name: ident.name.clone(),
                span: ident.span,
            })
            .collect();
        let placeholder = Arc::new(TypeDecl {
            key: key.clone(),
            is_alias: spec.is_alias,
            info: Arc::clone(&info),
            type_params,
            underlying: OnceCell::new(),
        });

        let (decl, created) = {
            let mut decls = self.decls.lock().unwrap_or_else(PoisonError::into_inner);
            match decls.get(&key) {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    decls.insert(key, Arc::clone(&placeholder));
                    (placeholder, true)
                }
            }
        };
        if created {
            self.compute_decl(&decl);
        }
        Ok(decl)
    }

    fn cached_decl(&self, key: &DeclKey) -> Option<Arc<TypeDecl>> {
        let decls = self.decls.lock().unwrap_or_else(PoisonError::into_inner);
        decls.get(key).cloned()
    }

    /// Fill in the underlying type. Failures are recorded and leave the
    /// declaration marked failed.
    fn compute_decl(&self, decl: &TypeDecl) {
        let result = (|| {
            let spec = decl
                .info
                .type_spec()
                .ok_or_else(|| Error::internal(format!("{} has no type spec", decl.key)))?;
            let source = self.file_source(&decl.info.file)?;
            TypeResolver::new(self, source, &decl.type_params).resolve(&spec.ty)
        })();
        let underlying = match result {
            Ok(ty) => Some(ty),
            Err(err) => {
                if !err.is_abandon() {
                    self.diagnostics
                        .emit(NAMESPACE, Diagnostic::error(err.to_string(), Some(decl.info.span)));
                }
                None
            }
        };
        debug!(
            target: "schema",
            stage = "schema.decl",
            decl = %decl.key,
            status = if underlying.is_some() { "ok" } else { "failed" }
        );
        // Only the creating thread sets the cell.
        let _ = decl.underlying.set(underlying);
    }

    fn compute_func(&self, key: &DeclKey, cause: Option<Span>) -> Result<FuncDeclSig> {
        let pkg = self.loader.must_load_package(cause, &key.package)?;
        let names = names::package_names(&self.diagnostics, &pkg)?;
        let info = match &key.receiver {
            Some(receiver) => names.method(receiver, &key.name),
            None => names.get(&key.name).filter(|info| info.kind == DeclKind::Func),
        };
        let Some(info) = info.cloned() else {
            return Err(self.diagnostics.bail(
                NAMESPACE,
                Diagnostic::error(format!("undefined function {key}"), cause),
            ));
        };
        let Some(func) = info.func_decl() else {
            return Err(Error::internal(format!("{key} is not a function")));
        };

        let type_params: Vec<TypeParam> = match &func.recv {
            Some(recv) => receiver_type_params(&recv.ty),
            None => func
                .ty
                .type_params
                .iter()
                .flat_map(|field| &field.names)
                .map(|ident| TypeParam {
                    name: ident.name.clone(),
                    span: ident.span,
                })
                .collect(),
        };
        let source = self.file_source(&info.file)?;
        let resolver = TypeResolver::new(self, source, &type_params);
        let receiver = match &func.recv {
            Some(recv) => Some(Param {
                name: recv.names.first().map(|ident| ident.name.clone()),
                ty: resolver.resolve(&recv.ty)?,
            }),
            None => None,
        };
        let sig = resolver.resolve_sig(&func.ty)?;
        debug!(
            target: "schema",
            stage = "schema.func",
            func = %key,
            params = sig.params.len(),
            results = sig.results.len()
        );
        Ok(FuncDeclSig {
            key: key.clone(),
            receiver,
            type_params,
            sig,
        })
    }

    fn file_source(&self, file: &File) -> Result<NameSource<'static>> {
        let Some(package) = file.package() else {
            return Err(Error::internal(format!("file {} outlived its package", file.name)));
        };
        let names = names::file_names(&self.loader, &self.diagnostics, file)?;
        Ok(NameSource::File {
            package: package.import_path.clone(),
            names,
        })
    }

    /// Library types modeled as builtins.
    fn well_known(&self, name: &QualifiedName) -> Option<BuiltinKind> {
        let runtime = self.build.runtime_module.as_str();
        match (name.package.as_str(), name.name.as_str()) {
            ("time", "Time") => Some(BuiltinKind::Time),
            ("encoding/json", "RawMessage") => Some(BuiltinKind::Json),
            (package, "UUID") if package.strip_prefix(runtime) == Some("/types/uuid") => {
                Some(BuiltinKind::Uuid)
            }
            (package, "UID") if package.strip_prefix(runtime) == Some("/beta/auth") => {
                Some(BuiltinKind::UserId)
            }
            _ => None,
        }
    }

    fn is_option(&self, name: &QualifiedName) -> bool {
        let option = &self.build.option_type;
        name.is(&option.package, &option.name)
    }
}

/// `*Box[K, V]`: the bracketed receiver names are the method's type
/// parameters.
fn receiver_type_params(ty: &Expr) -> Vec<TypeParam> {
    match &ty.unparen().kind {
        ExprKind::Star(inner) => receiver_type_params(inner),
        ExprKind::Index { indices, .. } => indices
            .iter()
            .filter_map(Expr::as_ident)
            .map(|ident| TypeParam {
                name: ident.name.clone(),
                span: ident.span,
            })
            .collect(),
        _ => Vec::new(),
    }
}
