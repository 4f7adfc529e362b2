use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::types::{FuncSig, Param, Type};
use crate::diagnostics::Span;
use crate::loader::File;
use crate::names::PkgDeclInfo;
use crate::paths::{PkgPath, QualifiedName};

/// Cache key of a declaration: package, name and, for methods, the receiver
/// type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclKey {
    pub package: PkgPath,
    pub name: String,
    pub receiver: Option<String>,
}

impl DeclKey {
    #[must_use]
    pub fn new(package: PkgPath, name: impl Into<String>) -> Self {
        Self {
            package,
            name: name.into(),
            receiver: None,
        }
    }

    #[must_use]
    pub fn method(package: PkgPath, receiver: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package,
            name: name.into(),
            receiver: Some(receiver.into()),
        }
    }

    #[must_use]
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.package.clone(), self.name.clone())
    }
}

impl fmt::Display for DeclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.receiver {
            Some(receiver) => write!(f, "{}.{}.{}", self.package, receiver, self.name),
            None => write!(f, "{}.{}", self.package, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    /// Span of the declaring identifier.
    pub span: Span,
}

/// A named type declaration. It is published in the declaration cache before
/// its underlying type is computed, so references from inside its own
/// definition resolve to this same object.
pub struct TypeDecl {
    pub key: DeclKey,
    pub info: Arc<PkgDeclInfo>,
    pub type_params: Vec<TypeParam>,
    pub is_alias: bool,
    /// `None` inside the cell marks a failed resolution.
    pub(super) underlying: OnceCell<Option<Type>>,
}

impl TypeDecl {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }

    #[must_use]
    pub fn file(&self) -> &Arc<File> {
        &self.info.file
    }

    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.info.doc.as_deref()
    }

    /// Underlying type; `None` while it is still being computed or when its
    /// resolution failed.
    #[must_use]
    pub fn underlying(&self) -> Option<&Type> {
        self.underlying.get().and_then(Option::as_ref)
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.underlying.get().is_some()
    }

    /// Block until whichever thread owns the computation has finished.
    pub(super) fn wait(&self) -> Option<&Type> {
        self.underlying.wait().as_ref()
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

impl fmt::Debug for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDecl")
            .field("key", &self.key)
            .field("type_params", &self.type_params)
            .field("is_alias", &self.is_alias)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Resolved signature of a package function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDeclSig {
    pub key: DeclKey,
    pub receiver: Option<Param>,
    /// Receiver type parameters for methods, declared ones for functions.
    pub type_params: Vec<TypeParam>,
    pub sig: FuncSig,
}

impl FuncDeclSig {
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}
