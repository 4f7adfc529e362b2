use std::fs;
use std::path::Path;
use std::sync::Arc;

use gosem::diagnostics::Span;
use gosem::frontend::ast::Ident;
use gosem::loader::{File, Package};
use gosem::logging::{LogOptions, init_logging};
use gosem::{Analysis, BuildInfo, PkgPath};
use tempfile::TempDir;

pub const APP_MODULE: &str = "example.com/app";

#[allow(dead_code)]
pub fn write_source(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap_or_else(|err| panic!("write source: {err}"));
}

#[allow(dead_code)]
pub fn write_sources(root: &Path, sources: &[(&str, &str)]) {
    for (relative, contents) in sources {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("create dir {}: {err}", parent.display()));
        }
        write_source(&path, contents);
    }
}

/// A throwaway main module `example.com/app` holding `sources`.
#[allow(dead_code)]
pub fn app_tree(sources: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    write_source(
        &dir.path().join("go.mod"),
        &format!("module {APP_MODULE}\n\ngo 1.22\n"),
    );
    write_sources(dir.path(), sources);
    dir
}

#[allow(dead_code)]
pub fn analysis(dir: &TempDir) -> Analysis {
    analysis_with(BuildInfo::new(dir.path()))
}

#[allow(dead_code)]
pub fn analysis_with(build: BuildInfo) -> Analysis {
    init_logging(&LogOptions::for_tests());
    Analysis::new(build).unwrap_or_else(|err| panic!("analysis: {err}"))
}

#[allow(dead_code)]
pub fn pkg(path: &str) -> PkgPath {
    PkgPath::new(path).unwrap_or_else(|err| panic!("package path {path}: {err}"))
}

#[allow(dead_code)]
pub fn load(analysis: &Analysis, path: &str) -> Arc<Package> {
    analysis
        .must_load_package(None, &pkg(path))
        .unwrap_or_else(|err| panic!("load {path}: {err}\n{}", analysis.diagnostics().render()))
}

#[allow(dead_code)]
pub fn file<'a>(package: &'a Package, name: &str) -> &'a Arc<File> {
    package
        .file(name)
        .unwrap_or_else(|| panic!("file {name} missing from {}", package.import_path))
}

/// Identifier at the `nth` (zero based) occurrence of `name` in the file.
#[allow(dead_code)]
pub fn ident_at(file: &File, name: &str, nth: usize) -> Ident {
    let start = file
        .contents()
        .match_indices(name)
        .nth(nth)
        .map(|(offset, _)| offset)
        .unwrap_or_else(|| panic!("occurrence {nth} of {name} missing from {}", file.name));
    Ident::new(name, Span::in_file(file.file_id, start, start + name.len()))
}
