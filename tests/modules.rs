mod common;

use common::{analysis_with, app_tree, load, pkg, write_sources};
use gosem::{BuildInfo, Error, ModPath};

const MANIFEST: &str = "module example.com/app

go 1.22

require (
\tgithub.com/Acme/widgets v1.2.0
\texample.com/app/plugins v0.0.0
\tlocal.dev/shared v0.1.0 // indirect
)

replace (
\texample.com/app/plugins => ./plugins
\tlocal.dev/shared => ../shared
)
";

fn graph() -> (tempfile::TempDir, tempfile::TempDir) {
    let workspace = tempfile::tempdir().unwrap();
    let root = workspace.path();
    write_sources(
        root,
        &[
            ("app/go.mod", MANIFEST),
            ("app/main.go", "package main\n"),
            ("app/plugins/go.mod", "module example.com/app/plugins\n"),
            ("app/plugins/hook/hook.go", "package hook\n"),
            ("shared/go.mod", "module local.dev/shared\n"),
            ("shared/text/text.go", "package text\n"),
        ],
    );
    let cache = tempfile::tempdir().unwrap();
    write_sources(
        cache.path(),
        &[("github.com/!acme/widgets@v1.2.0/knob/knob.go", "package knob\n")],
    );
    (workspace, cache)
}

#[test]
fn packages_map_to_their_owning_modules() {
    let (workspace, cache) = graph();
    let analysis = analysis_with(
        BuildInfo::new(workspace.path().join("app")).with_mod_cache(cache.path()),
    );
    let modules = analysis.modules();

    let main = modules
        .resolve_module_for_package(&pkg("example.com/app/internal/x"))
        .unwrap();
    assert!(main.is_main);

    let nested = modules
        .resolve_module_for_package(&pkg("example.com/app/plugins/hook"))
        .unwrap();
    assert_eq!(nested.path, ModPath::new("example.com/app/plugins").unwrap());
    assert!(nested.root_dir.as_path().ends_with("app/plugins"));

    let replaced = modules
        .resolve_module_for_package(&pkg("local.dev/shared/text"))
        .unwrap();
    assert!(replaced.root_dir.as_path().ends_with("shared"));
    assert_eq!(replaced.version.as_ref().map(ToString::to_string).as_deref(), Some("v0.1.0"));

    let cached = modules
        .resolve_module_for_package(&pkg("github.com/Acme/widgets/knob"))
        .unwrap();
    assert!(cached.root_dir.as_path().ends_with("github.com/!acme/widgets@v1.2.0"));

    let unowned = modules
        .resolve_module_for_package(&pkg("unknown.org/lib"))
        .unwrap_err();
    assert!(matches!(unowned, Error::UnresolvedModule { .. }));
}

#[test]
fn dependency_packages_load_from_their_module_roots() {
    let (workspace, cache) = graph();
    let analysis = analysis_with(
        BuildInfo::new(workspace.path().join("app")).with_mod_cache(cache.path()),
    );

    assert_eq!(load(&analysis, "example.com/app/plugins/hook").name, "hook");
    assert_eq!(load(&analysis, "local.dev/shared/text").name, "text");
    assert_eq!(load(&analysis, "github.com/Acme/widgets/knob").name, "knob");
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());
}

#[test]
fn missing_dependency_directory_cancels_the_analysis() {
    let (workspace, _cache) = graph();
    let empty_cache = tempfile::tempdir().unwrap();
    let analysis = analysis_with(
        BuildInfo::new(workspace.path().join("app")).with_mod_cache(empty_cache.path()),
    );

    // The failed load reads as absent; the module graph error cancels the run.
    let loaded = analysis
        .load_package(None, &pkg("github.com/Acme/widgets/knob"))
        .unwrap();
    assert!(loaded.is_none());
    assert!(analysis.is_cancelled());
    assert!(matches!(
        analysis.load_package(None, &pkg("example.com/app")),
        Err(Error::Cancelled)
    ));
    assert!(
        analysis
            .diagnostics()
            .render()
            .contains("module github.com/Acme/widgets@v1.2.0 not found")
    );
}

#[test]
fn missing_main_manifest_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let err = gosem::Analysis::new(BuildInfo::new(dir.path())).unwrap_err();
    assert!(matches!(err, Error::Manifest { .. }), "{err:?}");
}

#[test]
fn app_tree_manifest_is_the_main_module() {
    let dir = app_tree(&[]);
    let analysis = common::analysis(&dir);
    assert_eq!(analysis.main_module().path.as_str(), common::APP_MODULE);
    assert!(analysis.main_module().version.is_none());
}
