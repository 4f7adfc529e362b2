//! Bulk front door: find every package under a module root and load them on
//! a bounded worker pool.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::loader::{Package, PackageLoader};
use crate::module::{MANIFEST_FILE, Module};
use crate::paths::PkgPath;

const MIN_WORKERS: usize = 4;

/// Walks a module tree and feeds package paths to the loader. Results come
/// back in completion order; callers sort them when they need determinism.
pub struct Scanner {
    loader: Arc<PackageLoader>,
    cancel: Arc<CancellationToken>,
    workers: usize,
}

impl Scanner {
    #[must_use]
    pub fn new(loader: Arc<PackageLoader>, cancel: Arc<CancellationToken>) -> Self {
        let workers = thread::available_parallelism()
            .map(|val| val.get())
            .unwrap_or(1)
            .max(MIN_WORKERS);
        Self {
            loader,
            cancel,
            workers,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Import paths of every directory under `module` holding candidate
    /// source files, sorted.
    #[must_use]
    pub fn scan(&self, module: &Module) -> Vec<PkgPath> {
        let mut packages = Vec::new();
        self.walk(module, |pkg| {
            packages.push(pkg);
            ControlFlow::Continue(())
        });
        packages.sort();
        debug!(
            target: "scanner",
            stage = "scanner.scan",
            module = module.path.as_str(),
            packages = packages.len()
        );
        packages
    }

    /// Hand each package directory under `module` to `visit` as soon as the
    /// walk meets its first candidate file. Returns the number of directories
    /// found before the walk ended or `visit` broke off.
    fn walk(&self, module: &Module, mut visit: impl FnMut(PkgPath) -> ControlFlow<()>) -> usize {
        let root = module.root_dir.as_path();
        let constraints = self.loader.build_context();
        let mut seen = HashSet::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| keep_entry(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(target: "scanner", stage = "scanner.walk", error = %err, "skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !constraints.accepts_file_name(name) {
                continue;
            }
            let Some(relative) = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
            else {
                continue;
            };
            let dir = relative_dir(relative);
            if seen.contains(&dir) {
                continue;
            }
            let pkg = module.path.package_at(&dir);
            seen.insert(dir);
            match pkg {
                Ok(pkg) => {
                    if visit(pkg).is_break() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(target: "scanner", stage = "scanner.walk", error = %err, "invalid package path");
                }
            }
        }
        seen.len()
    }

    /// Load every package under `module`. Directories without buildable
    /// files are left out. The order of the result is unspecified.
    pub fn parse_all(&self, module: &Module) -> Result<Vec<Arc<Package>>> {
        let capacity = self.workers * 2;
        let (work_tx, work_rx) = sync_channel::<PkgPath>(capacity);
        let (result_tx, result_rx) = sync_channel::<Arc<Package>>(capacity);
        let work_rx = Mutex::new(work_rx);

        let packages = thread::scope(|scope| {
            scope.spawn(move || {
                let found = self.walk(module, |pkg| {
                    if self.cancel.is_cancelled() || work_tx.send(pkg).is_err() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                });
                debug!(
                    target: "scanner",
                    stage = "scanner.walk",
                    module = module.path.as_str(),
                    packages = found
                );
            });
            for _ in 0..self.workers {
                let result_tx = result_tx.clone();
                let work_rx = &work_rx;
                scope.spawn(move || self.work(work_rx, &result_tx));
            }
            // The result queue closes once every worker has dropped its sender.
            drop(result_tx);
            result_rx.iter().collect::<Vec<_>>()
        });

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!(
            target: "scanner",
            stage = "scanner.parse_all",
            module = module.path.as_str(),
            packages = packages.len(),
            workers = self.workers
        );
        Ok(packages)
    }

    fn work(&self, queue: &Mutex<Receiver<PkgPath>>, results: &SyncSender<Arc<Package>>) {
        loop {
            let next = {
                let guard = queue.lock().unwrap_or_else(PoisonError::into_inner);
                guard.recv()
            };
            let Ok(pkg) = next else {
                return;
            };
            match self.loader.load_package(None, &pkg) {
                Ok(Some(package)) => {
                    if results.send(package).is_err() {
                        return;
                    }
                }
                // Keep draining after cancellation so the producer never blocks.
                Ok(None) | Err(_) => {}
            }
        }
    }
}

/// Skips hidden and `_` directories, `testdata`, `vendor`, and nested
/// modules. The root itself is always kept.
fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };
    if name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor" {
        return false;
    }
    !entry.path().join(MANIFEST_FILE).is_file()
}

fn relative_dir(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| component.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Analysis, BuildInfo};
    use std::fs;

    #[test]
    fn walk_hands_over_each_package_as_it_is_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/app\n").unwrap();
        for sub in ["a", "b", "c"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("x.go"), "package x\n").unwrap();
            fs::write(dir.path().join(sub).join("y.go"), "package x\n").unwrap();
        }
        let analysis = Analysis::new(BuildInfo::new(dir.path())).unwrap();
        let scanner = analysis.scanner();

        let mut first = Vec::new();
        let found = scanner.walk(analysis.main_module(), |pkg| {
            first.push(pkg);
            ControlFlow::Break(())
        });
        assert_eq!(found, 1);
        assert_eq!(first.len(), 1);

        let mut all = Vec::new();
        scanner.walk(analysis.main_module(), |pkg| {
            all.push(pkg);
            ControlFlow::Continue(())
        });
        all.sort();
        let all: Vec<_> = all.iter().map(PkgPath::as_str).collect();
        assert_eq!(all, ["example.com/app/a", "example.com/app/b", "example.com/app/c"]);
    }
}
