//! Package loading with at-most-once semantics per import path.

mod package;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::debug;

use crate::build_info::BuildInfo;
use crate::cancel::{CancelListener, CancellationToken};
use crate::diagnostics::{Diagnostic, Diagnostics, Span};
use crate::error::{Error, Result};
use crate::frontend::constraints::BuildContext;
use crate::frontend::parser::{ParseMode, parse_file};
use crate::module::ModuleResolver;
use crate::paths::{FsPath, PkgPath};

pub use package::{File, Package};
use package::FileHeader;

const NAMESPACE: &str = "LOAD";

enum LoadState {
    Loading,
    Loaded(Option<Arc<Package>>),
    Failed,
}

/// Completion signal for one import path.
struct LoadRecord {
    state: Mutex<LoadState>,
    done: Condvar,
}

impl LoadRecord {
    fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Loading),
            done: Condvar::new(),
        }
    }

    fn finish(&self, state: LoadState) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = state;
        self.done.notify_all();
    }

    fn published(&self) -> Option<Arc<Package>> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            LoadState::Loaded(package) => package.clone(),
            LoadState::Loading | LoadState::Failed => None,
        }
    }

    fn wait(&self, cancel: &CancellationToken) -> Result<Option<Arc<Package>>> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*guard {
                LoadState::Loaded(package) => return Ok(package.clone()),
                LoadState::Failed => return Ok(None),
                LoadState::Loading if cancel.is_cancelled() => return Err(Error::Cancelled),
                LoadState::Loading => {
                    guard = self
                        .done
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

impl CancelListener for LoadRecord {
    fn cancelled(&self) {
        let _guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.done.notify_all();
    }
}

/// Counters for loads that actually touched the disk.
#[derive(Debug, Default)]
pub struct LoadStats {
    packages_read: AtomicUsize,
    files_parsed: AtomicUsize,
}

impl LoadStats {
    #[must_use]
    pub fn packages_read(&self) -> usize {
        self.packages_read.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn files_parsed(&self) -> usize {
        self.files_parsed.load(Ordering::Relaxed)
    }
}

/// Loads packages by import path. Every distinct path is read and parsed at
/// most once; concurrent requests for a path wait on the first requester.
pub struct PackageLoader {
    constraints: BuildContext,
    modules: Arc<ModuleResolver>,
    diagnostics: Arc<Diagnostics>,
    cancel: Arc<CancellationToken>,
    records: Mutex<HashMap<PkgPath, Arc<LoadRecord>>>,
    stats: LoadStats,
}

impl std::fmt::Debug for PackageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLoader")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl PackageLoader {
    #[must_use]
    pub fn new(
        build: Arc<BuildInfo>,
        modules: Arc<ModuleResolver>,
        diagnostics: Arc<Diagnostics>,
        cancel: Arc<CancellationToken>,
    ) -> Self {
        Self {
            constraints: BuildContext::new(&build),
            modules,
            diagnostics,
            cancel,
            records: Mutex::new(HashMap::new()),
            stats: LoadStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    #[must_use]
    pub fn build_context(&self) -> &BuildContext {
        &self.constraints
    }

    /// Load `pkg`. `Ok(None)` means not found: no module owns the path, the
    /// directory holds no matching source files, or the load failed and its
    /// cause was recorded in the diagnostics.
    pub fn load_package(&self, cause: Option<Span>, pkg: &PkgPath) -> Result<Option<Arc<Package>>> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let (record, owner) = {
            let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            match records.get(pkg) {
                Some(record) => (Arc::clone(record), false),
                None => {
                    let record = Arc::new(LoadRecord::new());
                    records.insert(pkg.clone(), Arc::clone(&record));
                    (record, true)
                }
            }
        };
        if !owner {
            return record.wait(&self.cancel);
        }

        let listener: Arc<dyn CancelListener> = record.clone();
        self.cancel.register(&listener);
        match self.load_uncached(cause, pkg) {
            Ok(package) => {
                record.finish(LoadState::Loaded(package.clone()));
                Ok(package)
            }
            Err(err) => {
                if !err.is_abandon() {
                    self.diagnostics
                        .emit(NAMESPACE, Diagnostic::error(err.to_string(), cause));
                }
                debug!(
                    target: "loader",
                    stage = "loader.package",
                    package = pkg.as_str(),
                    status = "failed"
                );
                record.finish(LoadState::Failed);
                Ok(None)
            }
        }
    }

    /// Package published by a finished load of `pkg`. Never waits or starts a
    /// load, and keeps answering after the run is cancelled.
    #[must_use]
    pub fn loaded(&self, pkg: &PkgPath) -> Option<Arc<Package>> {
        let record = {
            let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(records.get(pkg)?)
        };
        record.published()
    }

    /// Like [`Self::load_package`], but absence is a fatal diagnostic.
    pub fn must_load_package(&self, cause: Option<Span>, pkg: &PkgPath) -> Result<Arc<Package>> {
        match self.load_package(cause, pkg)? {
            Some(package) => Ok(package),
            None => Err(self.diagnostics.bail(
                NAMESPACE,
                Diagnostic::error(format!("could not find package {pkg}"), cause),
            )),
        }
    }

    fn load_uncached(&self, cause: Option<Span>, pkg: &PkgPath) -> Result<Option<Arc<Package>>> {
        let module = match self.modules.resolve_module_for_package(pkg) {
            Ok(module) => module,
            Err(Error::UnresolvedModule { .. }) => {
                debug!(
                    target: "loader",
                    stage = "loader.resolve_module",
                    package = pkg.as_str(),
                    status = "unresolved"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some(dir) = module.package_dir(pkg) else {
            return Ok(None);
        };
        self.stats.packages_read.fetch_add(1, Ordering::Relaxed);

        let entries = match fs::read_dir(dir.as_path()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Io(err)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.constraints.accepts_file_name(&name) {
                names.push(name);
            }
        }
        names.sort();

        let mut headers = Vec::new();
        for name in names {
            if let Some(header) = self.read_header(&dir, name)? {
                headers.push(header);
            }
        }
        if headers.is_empty() {
            return Ok(None);
        }
        let package_name = self.check_package_names(cause, &dir, &mut headers)?;

        let doc = headers
            .iter()
            .filter(|header| !header.is_test)
            .chain(headers.iter().filter(|header| header.is_test))
            .find_map(|header| header.ast.doc.clone());
        let mut imports = BTreeSet::new();
        for header in &headers {
            for spec in &header.ast.imports {
                let resolved = if spec.path.starts_with('.') {
                    pkg.join_relative(&spec.path)
                } else {
                    PkgPath::new(spec.path.clone())
                };
                match resolved {
                    Ok(path) => {
                        imports.insert(path);
                    }
                    Err(err) => {
                        self.diagnostics.emit(
                            NAMESPACE,
                            Diagnostic::error(err.to_string(), Some(spec.path_span)),
                        );
                    }
                }
            }
        }

        let file_count = headers.len();
        let package = Arc::new_cyclic(|weak| Package {
            import_path: pkg.clone(),
            name: package_name,
            doc,
            fs_path: dir,
            module,
            files: headers
                .into_iter()
                .map(|header| Arc::new(File::from_header(header, weak.clone())))
                .collect(),
            imports,
            names: once_cell::sync::OnceCell::new(),
        });
        debug!(
            target: "loader",
            stage = "loader.package",
            package = pkg.as_str(),
            name = package.name.as_str(),
            files = file_count,
            status = "ok"
        );
        Ok(Some(package))
    }

    /// Read one file and parse its header. `Ok(None)` when a `//go:build`
    /// line excludes it.
    fn read_header(&self, dir: &FsPath, name: String) -> Result<Option<FileHeader>> {
        let fs_path = dir.join(&name);
        let contents: Arc<str> = fs::read_to_string(fs_path.as_path())?.into();
        let file_id = self
            .diagnostics
            .register_file(fs_path.as_path(), Arc::clone(&contents));
        self.stats.files_parsed.fetch_add(1, Ordering::Relaxed);
        let ast = parse_file(&contents, file_id, ParseMode::Header).map_err(|err| {
            self.diagnostics.extend("PARSE", err.into_diagnostics());
            Error::Bailout
        })?;
        if let Some(expr) = &ast.build_constraint {
            match self.constraints.eval_constraint(expr) {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(err) => {
                    return Err(self.diagnostics.bail(
                        NAMESPACE,
                        Diagnostic::error(err.to_string(), Some(Span::in_file(file_id, 0, 0))),
                    ));
                }
            }
        }
        let is_test = name.ends_with("_test.go");
        Ok(Some(FileHeader {
            name,
            fs_path,
            file_id,
            contents,
            is_test,
            ast,
        }))
    }

    /// One package name per directory. The only tolerated mix is `x` with
    /// external `x_test` test files, which are dropped.
    fn check_package_names(
        &self,
        cause: Option<Span>,
        dir: &FsPath,
        headers: &mut Vec<FileHeader>,
    ) -> Result<String> {
        let mut by_name: BTreeMap<String, Vec<(String, bool)>> = BTreeMap::new();
        for header in headers.iter() {
            by_name
                .entry(header.ast.package.name.clone())
                .or_default()
                .push((header.name.clone(), header.is_test));
        }
        let names: Vec<&String> = by_name.keys().collect();
        let external_test = match names.as_slice() {
            [single] => return Ok((*single).clone()),
            [a, b] if b.strip_suffix("_test") == Some(a.as_str()) => Some(((*a).clone(), (*b).clone())),
            [a, b] if a.strip_suffix("_test") == Some(b.as_str()) => Some(((*b).clone(), (*a).clone())),
            _ => None,
        };
        if let Some((base, test)) = external_test
            && by_name
                .get(&test)
                .is_some_and(|files| files.iter().all(|(_, is_test)| *is_test))
        {
            headers.retain(|header| header.ast.package.name != test);
            return Ok(base);
        }

        let listed: Vec<&str> = by_name.keys().map(String::as_str).collect();
        let mut diagnostic = Diagnostic::error(
            format!("found packages {} in {dir}", listed.join(", ")),
            cause,
        );
        for (name, files) in &by_name {
            if let Some((file, _)) = files.first() {
                diagnostic.add_note(format!("package {name} declared in {file}"));
            }
        }
        Err(self.diagnostics.bail(NAMESPACE, diagnostic))
    }
}
