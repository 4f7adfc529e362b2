mod common;

use common::{analysis, app_tree, file, ident_at, load, pkg};
use gosem::Analysis;
use gosem::frontend::ast::{Decl, Expr, ExprKind, StatementKind};
use gosem::loader::File;
use gosem::names::NameRef;

fn resolve(analysis: &Analysis, file: &File, name: &str, nth: usize) -> Option<NameRef> {
    let names = analysis.file_names(file).unwrap();
    names.resolve(&ident_at(file, name, nth)).cloned()
}

fn local_declared_at(analysis: &Analysis, file: &File, name: &str, nth: usize, decl_nth: usize) {
    match resolve(analysis, file, name, nth) {
        Some(NameRef::Local { decl }) => {
            assert_eq!(decl.start, ident_at(file, name, decl_nth).span.start);
        }
        other => panic!("occurrence {nth} of {name}: expected local, got {other:?}"),
    }
}

fn package_level(name: &str) -> Option<NameRef> {
    Some(NameRef::Package { name: name.into() })
}

#[test]
fn block_local_shadows_package_declaration() {
    let dir = app_tree(&[(
        "app.go",
        "package app\n\nvar count = 1\n\nfunc Use() int {\n\t{\n\t\tcount := 2\n\t\t_ = count\n\t}\n\treturn count\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    assert_eq!(resolve(&analysis, source, "count", 0), package_level("count"));
    local_declared_at(&analysis, source, "count", 1, 1);
    local_declared_at(&analysis, source, "count", 2, 1);
    assert_eq!(resolve(&analysis, source, "count", 3), package_level("count"));
}

#[test]
fn parameter_types_resolve_before_parameter_names() {
    let dir = app_tree(&[(
        "app.go",
        "package app\n\ntype Item struct{}\n\nfunc Take(Item Item) Item {\n\treturn Item\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    assert_eq!(resolve(&analysis, source, "Item", 0), package_level("Item"));
    local_declared_at(&analysis, source, "Item", 1, 1);
    assert_eq!(resolve(&analysis, source, "Item", 2), package_level("Item"));
    assert_eq!(resolve(&analysis, source, "Item", 3), package_level("Item"));
    local_declared_at(&analysis, source, "Item", 4, 1);
}

#[test]
fn range_variables_live_in_the_loop_scope() {
    let dir = app_tree(&[(
        "app.go",
        "package app\n\nvar key int\n\nfunc Walk(items []int) int {\n\tfor key := range items {\n\t\t_ = key\n\t}\n\treturn key\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    local_declared_at(&analysis, source, "key", 1, 1);
    local_declared_at(&analysis, source, "key", 2, 1);
    assert_eq!(resolve(&analysis, source, "key", 3), package_level("key"));
}

#[test]
fn unaliased_import_resolves_by_declared_package_name() {
    let dir = app_tree(&[
        (
            "go-yaml/yaml.go",
            "package yaml\n\nfunc Marshal(v any) ([]byte, error) { return nil, nil }\n",
        ),
        (
            "lib/util/util.go",
            "package helpers\n\nfunc Do() {}\n",
        ),
        (
            "app.go",
            "package app\n\nimport (\n\t\"example.com/app/go-yaml\"\n\t\"example.com/app/lib/util\"\n)\n\nfunc Dump() {\n\tyaml.Marshal(nil)\n\thelpers.Do()\n}\n",
        ),
    ]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    let yaml = pkg("example.com/app/go-yaml");
    let util = pkg("example.com/app/lib/util");
    assert_eq!(
        resolve(&analysis, source, "yaml", 1),
        Some(NameRef::Import { path: yaml.clone() })
    );
    assert_eq!(
        resolve(&analysis, source, "helpers", 0),
        Some(NameRef::Import { path: util.clone() })
    );

    let names = analysis.file_names(source).unwrap();
    assert_eq!(names.import_path("yaml"), Some(&yaml));
    assert_eq!(names.import_path("helpers"), Some(&util));
    assert!(names.imports().iter().all(|import| import.alias.is_none()));
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());

    // `yaml.Marshal(nil)` names a package-level function of the import.
    let ast = source.ast(analysis.diagnostics()).unwrap();
    let Decl::Func(dump) = &ast.decls[0] else {
        panic!("expected func");
    };
    let StatementKind::Expr(call) = &dump.body.as_ref().unwrap().statements[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { func, .. } = &call.kind else {
        panic!("expected call");
    };
    let qualified = analysis.qualified_name(source, func).unwrap().unwrap();
    assert!(qualified.is("example.com/app/go-yaml", "Marshal"));
}

#[test]
fn last_segment_match_with_other_declared_name_is_not_used() {
    let dir = app_tree(&[
        ("lib/util/util.go", "package helpers\n\nfunc Do() {}\n"),
        (
            "app.go",
            "package app\n\nimport \"example.com/app/lib/util\"\n\nfunc Run() {\n\tutil.Do()\n}\n",
        ),
    ]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    assert_eq!(resolve(&analysis, source, "util", 1), None);
    assert!(
        analysis.diagnostics().render().contains("undefined: util"),
        "{}",
        analysis.diagnostics().render()
    );
}

#[test]
fn unknown_import_paths_keep_their_last_segment() {
    let dir = app_tree(&[(
        "app.go",
        "package app\n\nimport \"fmt\"\n\nfunc Run() {\n\tfmt.Println()\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    assert_eq!(
        resolve(&analysis, source, "fmt", 1),
        Some(NameRef::Import { path: pkg("fmt") })
    );
}

#[test]
fn unknown_selectors_are_reported_without_aborting() {
    let dir = app_tree(&[
        ("go-yaml/yaml.go", "package yaml\n\nfunc Marshal(v any) {}\n"),
        (
            "app.go",
            "package app\n\nimport yml \"example.com/app/go-yaml\"\n\nfunc Use() {\n\tmissing.Call()\n\tyml.Marshal(nil)\n}\n",
        ),
    ]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    assert_eq!(
        resolve(&analysis, source, "yml", 1),
        Some(NameRef::Import {
            path: pkg("example.com/app/go-yaml")
        })
    );
    let rendered = analysis.diagnostics().render();
    assert!(rendered.contains("undefined: missing"), "{rendered}");
    let names = analysis.file_names(source).unwrap();
    assert_eq!(names.imports().len(), 1);
    assert_eq!(names.imports()[0].alias.as_deref(), Some("yml"));
}

#[test]
fn dot_import_is_reported_and_the_walk_continues() {
    let dir = app_tree(&[(
        "a.go",
        "package app\n\nimport . \"strings\"\n\nvar x = 1\n\nfunc Use() int {\n\tx := 2\n\treturn x\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "a.go");

    let names = analysis.file_names(source).unwrap();
    assert!(names.imports().is_empty());
    assert!(
        analysis
            .diagnostics()
            .render()
            .contains("dot import of strings is not supported")
    );
    local_declared_at(&analysis, source, "x", 1, 1);
    local_declared_at(&analysis, source, "x", 2, 1);
}

#[test]
fn struct_literal_keys_are_field_names() {
    let dir = app_tree(&[(
        "app.go",
        "package app\n\nvar Width = 1\nvar Key = \"k\"\n\ntype Size struct{ Width int }\ntype Lookup map[string]int\n\nfunc Build() []Size {\n\t_ = Lookup{Key: Width}\n\treturn []Size{{Width: Width}, Size{Width: 2}}\n}\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");
    let source = file(&app, "app.go");

    // Map keys are expressions; struct keys name fields.
    assert_eq!(resolve(&analysis, source, "Key", 1), package_level("Key"));
    assert_eq!(resolve(&analysis, source, "Width", 2), package_level("Width"));
    assert_eq!(resolve(&analysis, source, "Width", 3), None);
    assert_eq!(resolve(&analysis, source, "Width", 4), package_level("Width"));
    assert_eq!(resolve(&analysis, source, "Width", 5), None);

    let width = ident_at(source, "Width", 5);
    let field = Expr::new(width.span, ExprKind::Ident(width));
    assert_eq!(analysis.qualified_name(source, &field).unwrap(), None);
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());
}
