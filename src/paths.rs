//! Validated path values: filesystem paths, package import paths and module paths.
//!
//! These are plain values with no state. Containment queries are lexical: a module
//! path contains an import path when the import path equals it or continues it
//! after a `/` separator.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Module path of the synthetic standard-library module.
pub const STD_MODULE_PATH: &str = "std";

/// First path segments that are reserved for user code and never name a
/// standard-library package even though they contain no dot.
pub const RESERVED_USER_NAMESPACES: &[&str] = &["example", "test"];

/// Kind of path that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Filesystem,
    Package,
    Module,
}

impl PathKind {
    fn as_str(self) -> &'static str {
        match self {
            PathKind::Filesystem => "filesystem path",
            PathKind::Package => "package path",
            PathKind::Module => "module path",
        }
    }
}

/// Validation failure for one of the path newtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    kind: PathKind,
    value: String,
    reason: &'static str,
}

impl PathError {
    fn new(kind: PathKind, value: impl Into<String>, reason: &'static str) -> Self {
        Self {
            kind,
            value: value.into(),
            reason,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PathKind {
        self.kind
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} `{}`: {}",
            self.kind.as_str(),
            self.value,
            self.reason
        )
    }
}

impl StdError for PathError {}

fn validate_import_like(kind: PathKind, value: &str) -> Result<(), PathError> {
    if value.is_empty() {
        return Err(PathError::new(kind, value, "must not be empty"));
    }
    if value.starts_with('/') || value.ends_with('/') {
        return Err(PathError::new(
            kind,
            value,
            "must not start or end with a slash",
        ));
    }
    if value.contains("//") {
        return Err(PathError::new(kind, value, "must not contain empty segments"));
    }
    if value
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~' | '+' | '/')))
    {
        return Err(PathError::new(
            kind,
            value,
            "contains a character outside [A-Za-z0-9-._~+/]",
        ));
    }
    if value.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PathError::new(
            kind,
            value,
            "must not contain `.` or `..` segments",
        ));
    }
    Ok(())
}

fn contains_path(prefix: &str, path: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// Absolute filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FsPath(PathBuf);

impl FsPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PathError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(PathError::new(
                PathKind::Filesystem,
                String::new(),
                "must not be empty",
            ));
        }
        if !path.is_absolute() {
            return Err(PathError::new(
                PathKind::Filesystem,
                path.display().to_string(),
                "must be absolute",
            ));
        }
        Ok(Self(path))
    }

    /// Join a relative component; the result is absolute because `self` is.
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Path>) -> Self {
        Self(self.0.join(relative))
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|name| name.to_str())
    }
}

impl AsRef<Path> for FsPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Package import path, e.g. `example.com/app/users`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgPath(String);

impl PkgPath {
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        validate_import_like(PathKind::Package, &path)?;
        Ok(Self(path))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final `/`-separated segment.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    #[must_use]
    pub fn first_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Whether the path looks like a standard-library import: its first segment
    /// has no dot and is not a reserved user namespace.
    #[must_use]
    pub fn is_std_like(&self) -> bool {
        let first = self.first_segment();
        !first.contains('.') && !RESERVED_USER_NAMESPACES.contains(&first)
    }

    /// Resolve a relative import (`./x`, `../y`) against this package path.
    pub fn join_relative(&self, relative: &str) -> Result<Self, PathError> {
        let mut segments: Vec<&str> = self.0.split('/').collect();
        for part in relative.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() || segments.is_empty() {
                        return Err(PathError::new(
                            PathKind::Package,
                            format!("{}/{relative}", self.0),
                            "relative import escapes the module root",
                        ));
                    }
                }
                other => segments.push(other),
            }
        }
        Self::new(segments.join("/"))
    }
}

impl fmt::Display for PkgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Module path as declared by a `module` directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModPath(String);

impl ModPath {
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        validate_import_like(PathKind::Module, &path)?;
        Ok(Self(path))
    }

    #[must_use]
    pub fn std() -> Self {
        Self(STD_MODULE_PATH.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_std(&self) -> bool {
        self.0 == STD_MODULE_PATH
    }

    /// Lexical containment: `pkg` equals this path or lives underneath it.
    #[must_use]
    pub fn lexically_contains(&self, pkg: &PkgPath) -> bool {
        if self.is_std() {
            return pkg.is_std_like();
        }
        contains_path(&self.0, pkg.as_str())
    }

    /// Whether another module path lives lexically inside this one.
    #[must_use]
    pub fn contains_module(&self, other: &ModPath) -> bool {
        other.0 != self.0 && contains_path(&self.0, &other.0)
    }

    /// Directory of `pkg` relative to the module root, or `None` when the module
    /// does not contain it. The module's own root package yields `""`.
    #[must_use]
    pub fn relative_dir<'p>(&self, pkg: &'p PkgPath) -> Option<&'p str> {
        if self.is_std() {
            return pkg.is_std_like().then_some(pkg.as_str());
        }
        if !contains_path(&self.0, pkg.as_str()) {
            return None;
        }
        let rest = &pkg.as_str()[self.0.len()..];
        Some(rest.trim_start_matches('/'))
    }

    /// Import path of the package at `relative_dir` within this module.
    pub fn package_at(&self, relative_dir: &str) -> Result<PkgPath, PathError> {
        let relative_dir = relative_dir.trim_matches('/');
        if self.is_std() {
            return PkgPath::new(relative_dir);
        }
        if relative_dir.is_empty() {
            PkgPath::new(self.0.clone())
        } else {
            PkgPath::new(format!("{}/{relative_dir}", self.0))
        }
    }
}

impl fmt::Display for ModPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Universal handle for a package-level entity: package path plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub package: PkgPath,
    pub name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(package: PkgPath, name: impl Into<String>) -> Self {
        Self {
            package,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn is(&self, package: &str, name: &str) -> bool {
        self.package.as_str() == package && self.name == name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_package_paths() {
        assert!(PkgPath::new("").is_err());
        assert!(PkgPath::new("/abs").is_err());
        assert!(PkgPath::new("trailing/").is_err());
        assert!(PkgPath::new("a//b").is_err());
        assert!(PkgPath::new("has space").is_err());
        assert!(PkgPath::new("a/../b").is_err());
        assert!(PkgPath::new("github.com/foo/bar-baz_v2").is_ok());
    }

    #[test]
    fn filesystem_paths_must_be_absolute() {
        assert!(FsPath::new("relative/dir").is_err());
        assert!(FsPath::new("").is_err());
        let root = std::env::temp_dir();
        let path = FsPath::new(&root).unwrap();
        assert_eq!(path.join("x").as_path(), root.join("x"));
    }

    #[test]
    fn module_containment_respects_segment_boundaries() {
        let module = ModPath::new("example.com/app").unwrap();
        assert!(module.lexically_contains(&PkgPath::new("example.com/app").unwrap()));
        assert!(module.lexically_contains(&PkgPath::new("example.com/app/users").unwrap()));
        assert!(!module.lexically_contains(&PkgPath::new("example.com/apple").unwrap()));
        assert_eq!(
            module.relative_dir(&PkgPath::new("example.com/app/a/b").unwrap()),
            Some("a/b")
        );
        assert_eq!(
            module.relative_dir(&PkgPath::new("example.com/app").unwrap()),
            Some("")
        );
    }

    #[test]
    fn std_module_contains_dot_free_paths() {
        let std = ModPath::std();
        assert!(std.lexically_contains(&PkgPath::new("net/http").unwrap()));
        assert!(!std.lexically_contains(&PkgPath::new("github.com/x/y").unwrap()));
        assert!(!std.lexically_contains(&PkgPath::new("example/thing").unwrap()));
        assert_eq!(
            std.relative_dir(&PkgPath::new("encoding/json").unwrap()),
            Some("encoding/json")
        );
    }

    #[test]
    fn relative_imports_resolve_against_package() {
        let pkg = PkgPath::new("example.com/app/svc/users").unwrap();
        assert_eq!(
            pkg.join_relative("./internal").unwrap().as_str(),
            "example.com/app/svc/users/internal"
        );
        assert_eq!(
            pkg.join_relative("../orders").unwrap().as_str(),
            "example.com/app/svc/orders"
        );
        assert!(PkgPath::new("a").unwrap().join_relative("../../x").is_err());
    }

    #[test]
    fn segments_and_qualified_names() {
        let pkg = PkgPath::new("gopkg.in/yaml.v3").unwrap();
        assert_eq!(pkg.last_segment(), "yaml.v3");
        assert_eq!(pkg.first_segment(), "gopkg.in");
        let qn = QualifiedName::new(PkgPath::new("time").unwrap(), "Time");
        assert!(qn.is("time", "Time"));
        assert_eq!(qn.to_string(), "time.Time");
    }
}
