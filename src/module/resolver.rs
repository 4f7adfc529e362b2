use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::build_info::BuildInfo;
use crate::cancel::CancellationToken;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::module::manifest::{MANIFEST_FILE, Manifest, ReplaceTarget};
use crate::module::version::ModVersion;
use crate::paths::{FsPath, ModPath, PkgPath};

const NAMESPACE: &str = "MOD";

/// A module known to the analysis: the main module, a dependency or the
/// standard library.
#[derive(Debug)]
pub struct Module {
    pub root_dir: FsPath,
    pub path: ModPath,
    /// `None` for the main module and the standard library.
    pub version: Option<ModVersion>,
    /// Dependencies rooted lexically inside this module's path, sorted.
    pub nested_deps: Vec<ModPath>,
    /// Remaining dependencies, sorted.
    pub other_deps: Vec<ModPath>,
    pub is_main: bool,
    pub is_stdlib: bool,
}

impl Module {
    fn from_manifest(
        root_dir: FsPath,
        path: ModPath,
        version: Option<ModVersion>,
        manifest: &Manifest,
    ) -> Self {
        let (mut nested_deps, mut other_deps): (Vec<_>, Vec<_>) = manifest
            .requires
            .iter()
            .map(|req| req.path.clone())
            .partition(|dep| path.contains_module(dep));
        nested_deps.sort();
        nested_deps.dedup();
        other_deps.sort();
        other_deps.dedup();
        Self {
            root_dir,
            path,
            version,
            nested_deps,
            other_deps,
            is_main: false,
            is_stdlib: false,
        }
    }

    /// Directory holding `pkg`, or `None` when this module does not contain it.
    #[must_use]
    pub fn package_dir(&self, pkg: &PkgPath) -> Option<FsPath> {
        let relative = self.path.relative_dir(pkg)?;
        Some(if relative.is_empty() {
            self.root_dir.clone()
        } else {
            self.root_dir.join(relative)
        })
    }
}

/// Resolves import paths to their owning modules and caches module metadata
/// for the lifetime of one analysis.
pub struct ModuleResolver {
    build: Arc<BuildInfo>,
    diagnostics: Arc<Diagnostics>,
    cancel: Arc<CancellationToken>,
    main_manifest: Manifest,
    main: Arc<Module>,
    std: Option<Arc<Module>>,
    modules: Mutex<HashMap<ModPath, Arc<OnceCell<Arc<Module>>>>>,
}

impl std::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("main", &self.main.path)
            .finish_non_exhaustive()
    }
}

impl ModuleResolver {
    /// Read the main module manifest under `build.app_root`. Failure here is
    /// fatal for the analysis and is returned directly.
    pub fn new(
        build: Arc<BuildInfo>,
        diagnostics: Arc<Diagnostics>,
        cancel: Arc<CancellationToken>,
    ) -> Result<Self> {
        let root = FsPath::new(normalize(&build.app_root))?;
        let Some(manifest) = Manifest::read(root.as_path())? else {
            return Err(Error::manifest(
                root.join(MANIFEST_FILE).to_string(),
                "main module manifest not found",
            ));
        };
        let mut main = Module::from_manifest(root, manifest.module.clone(), None, &manifest);
        main.is_main = true;
        info!(
            target: "modules",
            stage = "modules.main",
            module = main.path.as_str(),
            nested = main.nested_deps.len(),
            dependencies = main.other_deps.len()
        );

        let std = match &build.goroot {
            Some(goroot) => Some(Arc::new(Module {
                root_dir: FsPath::new(normalize(&goroot.join("src")))?,
                path: ModPath::std(),
                version: None,
                nested_deps: Vec::new(),
                other_deps: Vec::new(),
                is_main: false,
                is_stdlib: true,
            })),
            None => None,
        };

        Ok(Self {
            build,
            diagnostics,
            cancel,
            main_manifest: manifest,
            main: Arc::new(main),
            std,
            modules: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn main_module(&self) -> &Arc<Module> {
        &self.main
    }

    #[must_use]
    pub fn std_module(&self) -> Option<&Arc<Module>> {
        self.std.as_ref()
    }

    #[must_use]
    pub fn main_manifest(&self) -> &Manifest {
        &self.main_manifest
    }

    /// Module owning `pkg`: the main module unless a nested dependency claims
    /// a longer prefix, then the longest matching dependency, then the
    /// standard library.
    pub fn resolve_module_for_package(&self, pkg: &PkgPath) -> Result<Arc<Module>> {
        if self.main.path.lexically_contains(pkg) {
            if let Some(dep) = self
                .main
                .nested_deps
                .iter()
                .rev()
                .find(|dep| dep.lexically_contains(pkg))
            {
                return self.module(dep);
            }
            return Ok(Arc::clone(&self.main));
        }
        if let Some(dep) = longest_owner(&self.main.other_deps, pkg) {
            return self.module(dep);
        }
        if let Some(std) = &self.std
            && std.path.lexically_contains(pkg)
        {
            return Ok(Arc::clone(std));
        }
        Err(Error::unresolved_module(pkg.as_str()))
    }

    /// Module metadata for `path`, read from disk on first reference.
    pub fn module(&self, path: &ModPath) -> Result<Arc<Module>> {
        if path == &self.main.path {
            return Ok(Arc::clone(&self.main));
        }
        if path.is_std()
            && let Some(std) = &self.std
        {
            return Ok(Arc::clone(std));
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let slot = {
            let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(modules.entry(path.clone()).or_default())
        };
        slot.get_or_try_init(|| self.load_dependency(path).map(Arc::new))
            .cloned()
            .map_err(|err| self.escalate(err))
    }

    fn load_dependency(&self, path: &ModPath) -> Result<Module> {
        let version = self
            .main_manifest
            .required_version(path)
            .cloned()
            .unwrap_or(ModVersion::ZERO);
        let dir = self.dependency_dir(path, &version)?;
        if !dir.is_dir() {
            return Err(Error::manifest(
                dir.display().to_string(),
                format!("module {path}@{version} not found"),
            ));
        }
        let root = FsPath::new(dir)?;
        let manifest = match Manifest::read(root.as_path())? {
            Some(manifest) => manifest,
            None => {
                debug!(
                    target: "modules",
                    stage = "modules.synthesize",
                    module = path.as_str(),
                    version = %version
                );
                Manifest::synthesized(path.clone())
            }
        };
        let module = Module::from_manifest(root, path.clone(), Some(version), &manifest);
        debug!(
            target: "modules",
            stage = "modules.load",
            module = path.as_str(),
            root = %module.root_dir,
            dependencies = module.nested_deps.len() + module.other_deps.len()
        );
        Ok(module)
    }

    fn dependency_dir(&self, path: &ModPath, version: &ModVersion) -> Result<PathBuf> {
        if path.as_str() == self.build.runtime_module
            && let Some(dir) = &self.build.runtime_dir
        {
            return Ok(normalize(&self.main.root_dir.as_path().join(dir)));
        }
        match self.main_manifest.replacement(path, version).map(|rep| &rep.target) {
            Some(ReplaceTarget::Dir(dir)) => Ok(normalize(&self.main.root_dir.as_path().join(dir))),
            Some(ReplaceTarget::Module { path, version }) => self.cache_dir(path, version),
            None => self.cache_dir(path, version),
        }
    }

    fn cache_dir(&self, path: &ModPath, version: &ModVersion) -> Result<PathBuf> {
        let Some(cache) = &self.build.mod_cache else {
            return Err(Error::manifest(
                path.as_str(),
                "module cache location unknown (set GOMODCACHE)",
            ));
        };
        Ok(cache.join(format!("{}@{}", escape_path(path.as_str()), escape_path(&version.to_string()))))
    }

    /// Module graph failures are fatal: record, cancel and abandon.
    fn escalate(&self, err: Error) -> Error {
        if err.is_abandon() {
            return err;
        }
        let error = self
            .diagnostics
            .bail(NAMESPACE, Diagnostic::error(err.to_string(), None));
        self.cancel.cancel();
        error
    }
}

/// Longest entry of the sorted `deps` that lexically contains `pkg`.
fn longest_owner<'a>(deps: &'a [ModPath], pkg: &PkgPath) -> Option<&'a ModPath> {
    match deps.binary_search_by(|dep| dep.as_str().cmp(pkg.as_str())) {
        Ok(index) => Some(&deps[index]),
        Err(index) => deps[..index]
            .iter()
            .rev()
            .find(|dep| dep.lexically_contains(pkg)),
    }
}

/// Module cache escaping: upper case letters become `!` plus lower case.
#[must_use]
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch.is_ascii_uppercase() {
            out.push('!');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mods(paths: &[&str]) -> Vec<ModPath> {
        let mut out: Vec<_> = paths.iter().map(|p| ModPath::new(*p).unwrap()).collect();
        out.sort();
        out
    }

    fn owner(deps: &[ModPath], pkg: &str) -> Option<String> {
        longest_owner(deps, &PkgPath::new(pkg).unwrap()).map(|m| m.as_str().to_string())
    }

    #[test]
    fn longest_owner_prefers_deepest_prefix() {
        let deps = mods(&["foo", "foo/bar", "foo/bar/baz"]);
        assert_eq!(owner(&deps, "foo/bar/baz/extra").as_deref(), Some("foo/bar/baz"));
        assert_eq!(owner(&deps, "foo/bar/baz").as_deref(), Some("foo/bar/baz"));
        assert_eq!(owner(&deps, "foo/qux").as_deref(), Some("foo"));
        assert_eq!(owner(&deps, "foo/bar/bazooka").as_deref(), Some("foo/bar"));
        assert_eq!(owner(&deps, "unrelated"), None);
    }

    #[test]
    fn longest_owner_skips_sibling_entries() {
        let deps = mods(&["a.com/x", "a.com/x/y", "a.com/x/y2", "a.com/x/y-z"]);
        assert_eq!(owner(&deps, "a.com/x/y/p").as_deref(), Some("a.com/x/y"));
        assert_eq!(owner(&deps, "a.com/x/yy").as_deref(), Some("a.com/x"));
    }

    #[test]
    fn escapes_upper_case_letters() {
        assert_eq!(escape_path("github.com/BurntSushi/toml"), "github.com/!burnt!sushi/toml");
        assert_eq!(escape_path("v1.0.0"), "v1.0.0");
    }

    #[test]
    fn normalizes_relative_components() {
        assert_eq!(normalize(Path::new("/app/./tools/../lib")), PathBuf::from("/app/lib"));
    }
}
