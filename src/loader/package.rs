use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::diagnostics::{Diagnostics, FileId};
use crate::error::{Error, Result};
use crate::frontend::ast::{FileAst, ImportSpec};
use crate::frontend::parser::{ParseMode, parse_file};
use crate::module::Module;
use crate::names::{FileNames, PackageNames};
use crate::paths::{FsPath, PkgPath};

/// A loaded package. Created once per import path by the loader and shared
/// read-only afterwards.
#[derive(Debug)]
pub struct Package {
    pub import_path: PkgPath,
    /// Declared package name, which may differ from the last path segment.
    pub name: String,
    pub doc: Option<String>,
    pub fs_path: FsPath,
    pub module: Arc<Module>,
    pub files: Vec<Arc<File>>,
    /// Union of every file's imports.
    pub imports: BTreeSet<PkgPath>,
    pub(crate) names: OnceCell<Option<Arc<PackageNames>>>,
}

impl Package {
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&Arc<File>> {
        self.files.iter().find(|file| file.name == name)
    }

    #[must_use]
    pub fn is_stdlib(&self) -> bool {
        self.module.is_stdlib
    }
}

/// Header-level facts about a source file, read eagerly when the package is
/// loaded.
#[derive(Debug)]
pub(crate) struct FileHeader {
    pub name: String,
    pub fs_path: FsPath,
    pub file_id: FileId,
    pub contents: Arc<str>,
    pub is_test: bool,
    pub ast: FileAst,
}

/// One source file of a package. The full syntax tree and the name tables
/// are computed on first use.
#[derive(Debug)]
pub struct File {
    pub name: String,
    package: Weak<Package>,
    pub fs_path: FsPath,
    pub file_id: FileId,
    pub package_name: String,
    pub doc: Option<String>,
    pub imports: Vec<ImportSpec>,
    pub is_test: bool,
    contents: Arc<str>,
    ast: OnceCell<Option<Arc<FileAst>>>,
    pub(crate) names: OnceCell<Option<Arc<FileNames>>>,
}

impl File {
    pub(crate) fn from_header(header: FileHeader, package: Weak<Package>) -> Self {
        Self {
            name: header.name,
            package,
            fs_path: header.fs_path,
            file_id: header.file_id,
            package_name: header.ast.package.name,
            doc: header.ast.doc,
            imports: header.ast.imports,
            is_test: header.is_test,
            contents: header.contents,
            ast: OnceCell::new(),
            names: OnceCell::new(),
        }
    }

    /// Owning package. Only `None` once the package itself was dropped.
    #[must_use]
    pub fn package(&self) -> Option<Arc<Package>> {
        self.package.upgrade()
    }

    #[must_use]
    pub fn contents(&self) -> &Arc<str> {
        &self.contents
    }

    /// Full syntax tree. A syntax error is recorded once and every later
    /// call abandons with [`Error::Bailout`].
    pub fn ast(&self, diagnostics: &Diagnostics) -> Result<Arc<FileAst>> {
        let ast = self.ast.get_or_init(|| {
            match parse_file(&self.contents, self.file_id, ParseMode::Full) {
                Ok(ast) => Some(Arc::new(ast)),
                Err(err) => {
                    tracing::debug!(
                        target: "loader",
                        stage = "loader.parse_body",
                        file = %self.fs_path,
                        status = "error"
                    );
                    diagnostics.extend("PARSE", err.into_diagnostics());
                    None
                }
            }
        });
        ast.clone().ok_or(Error::Bailout)
    }
}
