//! Lexical name resolution: package-level declaration tables and per-file
//! identifier classification.

mod imports;
pub mod scope;
mod walk;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::{Diagnostic, Diagnostics, Span};
use crate::error::{Error, Result};
use crate::frontend::ast::{Decl, Expr, ExprKind, FileAst, FuncDecl, Ident, Spec, TypeSpec, ValueSpec};
use crate::frontend::lexer::Keyword;
use crate::loader::{File, Package, PackageLoader};
use crate::paths::{PkgPath, QualifiedName};

pub use scope::ScopeStack;

pub(crate) const NAMESPACE: &str = "NAME";

/// What an identifier occurrence refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRef {
    /// Local binding; `decl` is the span of the declaring identifier.
    Local { decl: Span },
    /// Package-level declaration of the enclosing package.
    Package { name: String },
    /// Local name of an imported package.
    Import { path: PkgPath },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Type,
    Func,
    Var,
    Const,
}

/// A package-level binding and where it is declared.
#[derive(Debug)]
pub struct PkgDeclInfo {
    pub name: String,
    pub kind: DeclKind,
    pub file: Arc<File>,
    pub ast: Arc<FileAst>,
    /// Span of the declaring identifier.
    pub span: Span,
    pub doc: Option<String>,
    decl_index: usize,
    spec_index: usize,
}

impl PkgDeclInfo {
    #[must_use]
    pub fn qualified_name(&self, package: &PkgPath) -> QualifiedName {
        QualifiedName::new(package.clone(), self.name.clone())
    }

    #[must_use]
    pub fn type_spec(&self) -> Option<&TypeSpec> {
        match self.ast.decls.get(self.decl_index)? {
            Decl::Gen(decl) => match decl.specs.get(self.spec_index)? {
                Spec::Type(spec) => Some(spec),
                Spec::Value(_) => None,
            },
            Decl::Func(_) => None,
        }
    }

    #[must_use]
    pub fn func_decl(&self) -> Option<&FuncDecl> {
        match self.ast.decls.get(self.decl_index)? {
            Decl::Func(func) => Some(func),
            Decl::Gen(_) => None,
        }
    }

    #[must_use]
    pub fn value_spec(&self) -> Option<&ValueSpec> {
        match self.ast.decls.get(self.decl_index)? {
            Decl::Gen(decl) => match decl.specs.get(self.spec_index)? {
                Spec::Value(spec) => Some(spec),
                Spec::Type(_) => None,
            },
            Decl::Func(_) => None,
        }
    }
}

/// Declarations shared by every file of one package. Methods live in their
/// own table keyed by receiver type name.
#[derive(Debug)]
pub struct PackageNames {
    pub package: PkgPath,
    decls: BTreeMap<String, Arc<PkgDeclInfo>>,
    methods: HashMap<(String, String), Arc<PkgDeclInfo>>,
}

impl PackageNames {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<PkgDeclInfo>> {
        self.decls.get(name)
    }

    #[must_use]
    pub fn method(&self, receiver: &str, name: &str) -> Option<&Arc<PkgDeclInfo>> {
        self.methods.get(&(receiver.to_string(), name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PkgDeclInfo>> {
        self.decls.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// An import of one file, with the local name it is known by when that is
/// known without loading the imported package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImport {
    pub path: PkgPath,
    pub alias: Option<String>,
    pub span: Span,
}

/// Per-file identifier classification, keyed by identifier position.
#[derive(Debug, Default)]
pub struct FileNames {
    idents: HashMap<usize, NameRef>,
    imports: Vec<FileImport>,
    import_names: BTreeMap<String, PkgPath>,
}

impl FileNames {
    #[must_use]
    pub fn resolve(&self, ident: &Ident) -> Option<&NameRef> {
        self.idents.get(&ident.span.start)
    }

    #[must_use]
    pub fn imports(&self) -> &[FileImport] {
        &self.imports
    }

    /// Import path bound to a local package name in this file.
    #[must_use]
    pub fn import_path(&self, name: &str) -> Option<&PkgPath> {
        self.import_names.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.idents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idents.is_empty()
    }

    /// Package-level entity named by an identifier or `pkg.Name` selector.
    /// Generic instantiations are looked through.
    #[must_use]
    pub fn qualified_name(&self, package: &PkgPath, expr: &Expr) -> Option<QualifiedName> {
        match &expr.unparen().kind {
            ExprKind::Ident(ident) => match self.resolve(ident)? {
                NameRef::Package { name } => Some(QualifiedName::new(package.clone(), name.clone())),
                NameRef::Local { .. } | NameRef::Import { .. } => None,
            },
            ExprKind::Selector { base, field } => {
                let base = base.unparen().as_ident()?;
                match self.resolve(base)? {
                    NameRef::Import { path } => Some(QualifiedName::new(path.clone(), field.name.clone())),
                    NameRef::Local { .. } | NameRef::Package { .. } => None,
                }
            }
            ExprKind::Index { base, .. } => self.qualified_name(package, base),
            _ => None,
        }
    }
}

/// Declaration table of `package`, computed once. A syntax error in any
/// file abandons the whole package.
pub fn package_names(diagnostics: &Diagnostics, package: &Package) -> Result<Arc<PackageNames>> {
    let names = package.names.get_or_init(|| {
        match collect_package_names(diagnostics, package) {
            Ok(names) => Some(Arc::new(names)),
            Err(err) => {
                if !err.is_abandon() {
                    diagnostics.emit(NAMESPACE, Diagnostic::error(err.to_string(), None));
                }
                None
            }
        }
    });
    names.clone().ok_or(Error::Bailout)
}

/// Identifier classification for `file`, computed once.
pub fn file_names(
    loader: &PackageLoader,
    diagnostics: &Diagnostics,
    file: &File,
) -> Result<Arc<FileNames>> {
    let names = file.names.get_or_init(|| {
        match walk_file(loader, diagnostics, file) {
            Ok(names) => Some(Arc::new(names)),
            Err(err) => {
                if !err.is_abandon() {
                    diagnostics.emit(NAMESPACE, Diagnostic::error(err.to_string(), None));
                }
                None
            }
        }
    });
    names.clone().ok_or(Error::Bailout)
}

fn collect_package_names(diagnostics: &Diagnostics, package: &Package) -> Result<PackageNames> {
    let mut names = PackageNames {
        package: package.import_path.clone(),
        decls: BTreeMap::new(),
        methods: HashMap::new(),
    };
    for file in &package.files {
        let ast = file.ast(diagnostics)?;
        for (decl_index, decl) in ast.decls.iter().enumerate() {
            match decl {
                Decl::Func(func) => {
                    let info = PkgDeclInfo {
                        name: func.name.name.clone(),
                        kind: DeclKind::Func,
                        file: Arc::clone(file),
                        ast: Arc::clone(&ast),
                        span: func.name.span,
                        doc: func.doc.clone(),
                        decl_index,
                        spec_index: 0,
                    };
                    if let Some(receiver) = func.receiver_type_name() {
                        names
                            .methods
                            .entry((receiver.to_string(), func.name.name.clone()))
                            .or_insert_with(|| Arc::new(info));
                    } else if func.name.name != "init" {
                        register(diagnostics, &mut names, info);
                    }
                }
                Decl::Gen(gen_decl) => {
                    for (spec_index, spec) in gen_decl.specs.iter().enumerate() {
                        let (kind, idents, doc): (DeclKind, Vec<&Ident>, _) = match spec {
                            Spec::Type(ts) => (DeclKind::Type, vec![&ts.name], ts.doc.clone()),
                            Spec::Value(vs) => (
                                if gen_decl.keyword == Keyword::Const {
                                    DeclKind::Const
                                } else {
                                    DeclKind::Var
                                },
                                vs.names.iter().collect(),
                                vs.doc.clone(),
                            ),
                        };
                        for ident in idents {
                            register(
                                diagnostics,
                                &mut names,
                                PkgDeclInfo {
                                    name: ident.name.clone(),
                                    kind,
                                    file: Arc::clone(file),
                                    ast: Arc::clone(&ast),
                                    span: ident.span,
                                    doc: doc.clone(),
                                    decl_index,
                                    spec_index,
                                },
                            );
                        }
                    }
                }
            }
        }
    }
    debug!(
        target: "names",
        stage = "names.package",
        package = package.import_path.as_str(),
        decls = names.decls.len(),
        methods = names.methods.len()
    );
    Ok(names)
}

fn register(diagnostics: &Diagnostics, names: &mut PackageNames, info: PkgDeclInfo) {
    if info.name == "_" {
        return;
    }
    if let Some(existing) = names.decls.get(&info.name) {
        diagnostics.emit(
            NAMESPACE,
            Diagnostic::error(format!("{} redeclared in this block", info.name), Some(info.span))
                .with_note(format!("previous declaration in {}", existing.file.name)),
        );
        return;
    }
    names.decls.insert(info.name.clone(), Arc::new(info));
}

fn walk_file(loader: &PackageLoader, diagnostics: &Diagnostics, file: &File) -> Result<FileNames> {
    let Some(package) = file.package() else {
        return Err(Error::internal(format!("file {} outlived its package", file.name)));
    };
    let pkg_names = package_names(diagnostics, &package)?;
    let ast = file.ast(diagnostics)?;
    let mut walker = walk::FileWalker::new(loader, diagnostics, &package, &pkg_names);
    walker.collect_imports(file);
    walker.walk_file(&ast)?;
    let names = walker.finish();
    debug!(
        target: "names",
        stage = "names.file",
        file = %file.fs_path,
        idents = names.idents.len()
    );
    Ok(names)
}
