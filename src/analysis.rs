//! One analysis run: the build descriptor, the shared caches and the
//! diagnostics list, bundled so independent runs stay isolated.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::build_info::BuildInfo;
use crate::cancel::CancellationToken;
use crate::diagnostics::{Diagnostic, Diagnostics, Span};
use crate::error::{Error, Result};
use crate::frontend::ast::Expr;
use crate::loader::{File, Package, PackageLoader};
use crate::module::{Module, ModuleResolver};
use crate::names::{self, FileNames, PackageNames, PkgDeclInfo};
use crate::paths::{PkgPath, QualifiedName};
use crate::scanner::Scanner;
use crate::schema::{self, FuncDeclSig, SchemaResolver, Type, TypeDecl};

/// Semantic model of one application tree, built on demand.
#[derive(Debug)]
pub struct Analysis {
    build: Arc<BuildInfo>,
    diagnostics: Arc<Diagnostics>,
    cancel: Arc<CancellationToken>,
    modules: Arc<ModuleResolver>,
    loader: Arc<PackageLoader>,
    schema: SchemaResolver,
}

impl Analysis {
    /// Read the main module's manifest and set up empty caches. A missing or
    /// malformed main manifest fails the whole run.
    pub fn new(build: BuildInfo) -> Result<Self> {
        let build = Arc::new(build);
        let diagnostics = Arc::new(Diagnostics::new());
        let cancel = Arc::new(CancellationToken::new());
        let modules = Arc::new(ModuleResolver::new(
            Arc::clone(&build),
            Arc::clone(&diagnostics),
            Arc::clone(&cancel),
        )?);
        let loader = Arc::new(PackageLoader::new(
            Arc::clone(&build),
            Arc::clone(&modules),
            Arc::clone(&diagnostics),
            Arc::clone(&cancel),
        ));
        let schema = SchemaResolver::new(Arc::clone(&build), Arc::clone(&loader), Arc::clone(&diagnostics));
        info!(
            target: "modules",
            stage = "analysis.new",
            main = modules.main_module().path.as_str(),
            root = %modules.main_module().root_dir,
            goos = build.goos.as_str(),
            goarch = build.goarch.as_str()
        );
        Ok(Self {
            build,
            diagnostics,
            cancel,
            modules,
            loader,
            schema,
        })
    }

    #[must_use]
    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleResolver {
        &self.modules
    }

    #[must_use]
    pub fn main_module(&self) -> &Arc<Module> {
        self.modules.main_module()
    }

    #[must_use]
    pub fn loader(&self) -> &Arc<PackageLoader> {
        &self.loader
    }

    /// Stop starting new work and release blocked waiters.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn load_package(&self, cause: Option<Span>, pkg: &PkgPath) -> Result<Option<Arc<Package>>> {
        self.loader.load_package(cause, pkg)
    }

    pub fn must_load_package(&self, cause: Option<Span>, pkg: &PkgPath) -> Result<Arc<Package>> {
        self.loader.must_load_package(cause, pkg)
    }

    pub fn package_names(&self, package: &Package) -> Result<Arc<PackageNames>> {
        names::package_names(&self.diagnostics, package)
    }

    pub fn file_names(&self, file: &File) -> Result<Arc<FileNames>> {
        names::file_names(&self.loader, &self.diagnostics, file)
    }

    /// Package-level entity named by an identifier or `pkg.Name` selector in
    /// `file`.
    pub fn qualified_name(&self, file: &File, expr: &Expr) -> Result<Option<QualifiedName>> {
        let Some(package) = file.package() else {
            return Err(Error::internal(format!("file {} outlived its package", file.name)));
        };
        let names = self.file_names(file)?;
        Ok(names.qualified_name(&package.import_path, expr))
    }

    /// Declaration of `name`; a missing package or declaration is reported.
    pub fn lookup_decl(&self, name: &QualifiedName, cause: Option<Span>) -> Result<Arc<PkgDeclInfo>> {
        match self.schema.decl_info(&name.package, &name.name, cause)? {
            Some(info) => Ok(info),
            None => Err(self.diagnostics.bail(
                names::NAMESPACE,
                Diagnostic::error(format!("could not find declaration {name}"), cause),
            )),
        }
    }

    pub fn resolve_type(&self, file: &File, expr: &Expr) -> Result<Type> {
        self.schema.resolve_type(file, expr)
    }

    /// Resolve type syntax given as text, such as `map[string]*pkg.Item`.
    pub fn resolve_type_text(
        &self,
        package: Option<&PkgPath>,
        imports: &BTreeMap<String, PkgPath>,
        text: &str,
    ) -> Result<Type> {
        self.schema.resolve_type_text(package, imports, text)
    }

    pub fn resolve_type_decl(&self, name: &QualifiedName, cause: Option<Span>) -> Result<Arc<TypeDecl>> {
        self.schema.resolve_type_decl(&name.package, &name.name, cause)
    }

    pub fn resolve_func_decl(
        &self,
        name: &QualifiedName,
        receiver: Option<&str>,
        cause: Option<Span>,
    ) -> Result<Arc<FuncDeclSig>> {
        self.schema.resolve_func_decl(&name.package, &name.name, receiver, cause)
    }

    #[must_use]
    pub fn concretize(&self, ty: &Type, args: &[Type]) -> Type {
        schema::concretize(ty, args)
    }

    /// Underlying type of a generic declaration instantiated with `args`.
    pub fn instantiate(&self, decl: &TypeDecl, args: &[Type]) -> Result<Type> {
        self.schema.instantiate(decl, args)
    }

    #[must_use]
    pub fn scanner(&self) -> Scanner {
        Scanner::new(Arc::clone(&self.loader), Arc::clone(&self.cancel))
    }

    /// Load every package of the main module.
    pub fn parse_all(&self) -> Result<Vec<Arc<Package>>> {
        self.scanner().parse_all(self.modules.main_module())
    }
}
