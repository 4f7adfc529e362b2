mod common;

use common::{analysis, app_tree};
use gosem::Error;

fn layout() -> tempfile::TempDir {
    app_tree(&[
        ("main.go", "package main\n\nfunc main() {}\n"),
        ("svc/svc.go", "package svc\n"),
        ("svc/svc_test.go", "package svc\n"),
        ("svc/internal/db/db.go", "package db\n"),
        ("testdata/fixture.go", "package fixture\n"),
        ("vendor/dep/dep.go", "package dep\n"),
        ("_old/old.go", "package old\n"),
        (".cache/gen.go", "package gen\n"),
        ("tools/go.mod", "module example.com/tools\n"),
        ("tools/tool.go", "package tools\n"),
        ("docs/README.md", "# docs\n"),
        ("mixed/a.go", "package alpha\n"),
        ("mixed/b.go", "package beta\n"),
    ])
}

#[test]
fn scan_skips_ignored_directories_and_nested_modules() {
    let dir = layout();
    let analysis = analysis(&dir);

    let found = analysis.scanner().scan(analysis.main_module());
    let found: Vec<_> = found.iter().map(|pkg| pkg.as_str()).collect();
    assert_eq!(
        found,
        [
            "example.com/app",
            "example.com/app/mixed",
            "example.com/app/svc",
            "example.com/app/svc/internal/db",
        ]
    );
}

#[test]
fn parse_all_loads_every_valid_package() {
    let dir = layout();
    let analysis = analysis(&dir);

    let mut packages = analysis.parse_all().unwrap();
    packages.sort_by(|a, b| a.import_path.cmp(&b.import_path));
    let loaded: Vec<_> = packages
        .iter()
        .map(|package| (package.import_path.as_str(), package.name.as_str()))
        .collect();
    assert_eq!(
        loaded,
        [
            ("example.com/app", "main"),
            ("example.com/app/svc", "svc"),
            ("example.com/app/svc/internal/db", "db"),
        ]
    );
    // The conflicting directory is reported, not fatal.
    assert!(analysis.diagnostics().render().contains("found packages alpha, beta in"));
    assert_eq!(analysis.loader().stats().packages_read(), 4);
}

#[test]
fn single_worker_gives_the_same_packages() {
    let dir = layout();
    let analysis = analysis(&dir);

    let scanner = analysis.scanner().with_workers(1);
    assert_eq!(scanner.workers(), 1);
    let packages = scanner.parse_all(analysis.main_module()).unwrap();
    assert_eq!(packages.len(), 3);
}

#[test]
fn cancelled_scan_reports_cancellation() {
    let dir = layout();
    let analysis = analysis(&dir);
    analysis.cancel();

    assert!(matches!(analysis.parse_all(), Err(Error::Cancelled)));
}
