mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use common::{analysis, analysis_with, app_tree, load, pkg};
use expect_test::expect;
use gosem::schema::{BuiltinKind, ListLen, Type};
use gosem::{BuildInfo, Error, QualifiedName};

fn app_name(name: &str) -> QualifiedName {
    QualifiedName::new(pkg("example.com/app"), name)
}

fn underlying(decl: &gosem::schema::TypeDecl) -> &Type {
    decl.underlying().expect("resolved declaration")
}

#[test]
fn self_referential_struct_resolves_to_one_declaration() {
    let dir = app_tree(&[(
        "list.go",
        "package app\n\ntype Node struct {\n\tValue int\n\tNext  *Node\n}\n",
    )]);
    let analysis = analysis(&dir);

    let node = analysis.resolve_type_decl(&app_name("Node"), None).unwrap();
    expect![[r#"struct{Value int; Next *app.Node}"#]].assert_eq(&underlying(&node).to_string());

    let next = underlying(&node).as_struct().unwrap().field("Next").unwrap();
    let Type::Pointer(elem) = &next.ty else {
        panic!("expected pointer, got {}", next.ty);
    };
    let named = elem.as_named().unwrap();
    assert!(Arc::ptr_eq(&named.decl().unwrap(), &node));
    assert!(analysis.diagnostics().is_empty());
}

#[test]
fn function_bodies_with_short_declarations_keep_the_package_usable() {
    let dir = app_tree(&[(
        "a.go",
        "package app\n\ntype Foo struct{ N int }\n\nfunc F() int {\n\tx := 1\n\tfor i, v := range []int{x} {\n\t\tx += i + v\n\t}\n\treturn x\n}\n",
    )]);
    let analysis = analysis(&dir);

    let foo = analysis.resolve_type_decl(&app_name("Foo"), None).unwrap();
    expect![[r#"struct{N int}"#]].assert_eq(&underlying(&foo).to_string());
    let app = load(&analysis, "example.com/app");
    assert!(analysis.package_names(&app).unwrap().get("F").is_some());
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());
}

#[test]
fn mutually_recursive_declarations_across_files() {
    let dir = app_tree(&[
        ("foo.go", "package app\n\ntype Foo struct {\n\tBar *Bar\n}\n"),
        ("bar.go", "package app\n\ntype Bar struct {\n\tFoos []Foo\n}\n"),
    ]);
    let analysis = analysis(&dir);

    let foo = analysis.resolve_type_decl(&app_name("Foo"), None).unwrap();
    let bar = analysis.resolve_type_decl(&app_name("Bar"), None).unwrap();
    expect![[r#"struct{Bar *app.Bar}"#]].assert_eq(&underlying(&foo).to_string());
    expect![[r#"struct{Foos []app.Foo}"#]].assert_eq(&underlying(&bar).to_string());

    let Type::List(foos) = &underlying(&bar).as_struct().unwrap().fields[0].ty else {
        panic!("expected slice");
    };
    assert_eq!(foos.len, ListLen::Unbounded);
    assert!(Arc::ptr_eq(&foos.elem.as_named().unwrap().decl().unwrap(), &foo));
}

#[test]
fn concurrent_resolution_converges_on_one_declaration() {
    let dir = app_tree(&[
        ("a.go", "package app\n\ntype A struct {\n\tB *B\n}\n"),
        ("b.go", "package app\n\ntype B struct {\n\tA *A\n\tC []C\n}\n"),
        ("c.go", "package app\n\ntype C struct {\n\tA A\n}\n"),
    ]);
    let analysis = Arc::new(analysis(&dir));

    let handles: Vec<_> = ["A", "B", "C", "A", "B", "C", "A", "B"]
        .into_iter()
        .map(|name| {
            let analysis = Arc::clone(&analysis);
            thread::spawn(move || analysis.resolve_type_decl(&app_name(name), None).unwrap())
        })
        .collect();
    let decls: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
        let again = analysis.resolve_type_decl(&app_name(name), None).unwrap();
        assert!(Arc::ptr_eq(&decls[i], &again));
        assert!(Arc::ptr_eq(&decls[i + 3], &again));
        assert!(again.is_resolved());
    }
    assert_eq!(analysis.loader().stats().packages_read(), 1);
}

#[test]
fn builtins_lists_and_maps() {
    let dir = app_tree(&[(
        "model.go",
        "package app\n\nimport (\n\t\"encoding/json\"\n\t\"time\"\n)\n\nconst N = 4\n\ntype Record struct {\n\tID     int64 `json:\"id\"`\n\tAt     time.Time\n\tRaw    json.RawMessage\n\tBlob   []byte\n\tDigest [0x10]byte\n\tGrid   [N]int\n\tTags   []string\n\tMeta   map[string]any\n\tOnDone func(err error, args ...any) bool\n}\n",
    )]);
    let analysis = analysis(&dir);

    let record = analysis.resolve_type_decl(&app_name("Record"), None).unwrap();
    expect![[r#"struct{ID int64 "json:\"id\""; At time.Time; Raw json.RawMessage; Blob []byte; Digest [16]uint8; Grid [?]int; Tags []string; Meta map[string]any; OnDone func(err error, args ...any) bool}"#]]
        .assert_eq(&underlying(&record).to_string());

    let fields = &underlying(&record).as_struct().unwrap().fields;
    assert_eq!(fields[0].tag.get("json").map(|entry| entry.name.as_str()), Some("id"));
    assert_eq!(fields[1].ty, Type::Builtin(BuiltinKind::Time));
    assert_eq!(fields[3].ty, Type::Builtin(BuiltinKind::Bytes));
    assert!(underlying(&record).find_unsupported().is_none());
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());
}

#[test]
fn runtime_types_map_to_builtins_and_options() {
    let dir = app_tree(&[
        (
            "go.mod",
            "module example.com/app\n\ngo 1.22\n\nrequire encore.dev v1.0.0\n",
        ),
        (
            "runtime/types/option/option.go",
            "package option\n\ntype Option[T any] struct {\n\tValue   T\n\tPresent bool\n}\n",
        ),
        (
            "profile.go",
            "package app\n\nimport (\n\t\"encore.dev/beta/auth\"\n\t\"encore.dev/types/option\"\n\t\"encore.dev/types/uuid\"\n)\n\ntype Profile struct {\n\tID    uuid.UUID\n\tOwner auth.UID\n\tNick  option.Option[string]\n\tBoss  *option.Option[*Profile]\n}\n",
        ),
    ]);
    let analysis = analysis_with(BuildInfo::new(dir.path()).with_runtime_dir(dir.path().join("runtime")));

    let profile = analysis.resolve_type_decl(&app_name("Profile"), None).unwrap();
    expect![[r#"struct{ID uuid.UUID; Owner auth.UID; Nick option[string]; Boss *option[*app.Profile]}"#]]
        .assert_eq(&underlying(&profile).to_string());
    let fields = &underlying(&profile).as_struct().unwrap().fields;
    assert_eq!(fields[0].ty, Type::Builtin(BuiltinKind::Uuid));
    assert_eq!(fields[1].ty, Type::Builtin(BuiltinKind::UserId));
    assert_eq!(
        fields[2].ty,
        Type::Option(Box::new(Type::Builtin(BuiltinKind::String)))
    );
    assert!(analysis.diagnostics().is_empty(), "{}", analysis.diagnostics().render());
}

#[test]
fn option_requires_one_type_argument() {
    let dir = app_tree(&[
        (
            "go.mod",
            "module example.com/app\n\ngo 1.22\n\nrequire encore.dev v1.0.0\n",
        ),
        (
            "runtime/types/option/option.go",
            "package option\n\ntype Option[T, U any] struct {\n\tValue T\n}\n",
        ),
        (
            "bad.go",
            "package app\n\nimport \"encore.dev/types/option\"\n\ntype Bad struct {\n\tV option.Option[int, string]\n}\n",
        ),
    ]);
    let analysis = analysis_with(BuildInfo::new(dir.path()).with_runtime_dir(dir.path().join("runtime")));

    let err = analysis.resolve_type_decl(&app_name("Bad"), None).unwrap_err();
    assert!(matches!(err, Error::Bailout));
    assert!(
        analysis
            .diagnostics()
            .render()
            .contains("option takes exactly one type argument")
    );
}

#[test]
fn generic_declarations_instantiate_independently() {
    let dir = app_tree(&[(
        "box.go",
        "package app\n\ntype Box[T any] struct {\n\tItem  T\n\tItems []T\n}\n\ntype Pair[K, V any] struct {\n\tKey   K\n\tValue *Box[V]\n}\n",
    )]);
    let analysis = analysis(&dir);

    let boxed = analysis.resolve_type_decl(&app_name("Box"), None).unwrap();
    assert!(boxed.is_generic());
    expect![[r#"struct{Item T; Items []T}"#]].assert_eq(&underlying(&boxed).to_string());

    let ints = analysis
        .instantiate(&boxed, &[Type::Builtin(BuiltinKind::Int)])
        .unwrap();
    let strings = analysis
        .instantiate(&boxed, &[Type::Builtin(BuiltinKind::String)])
        .unwrap();
    expect![[r#"struct{Item int; Items []int}"#]].assert_eq(&ints.to_string());
    expect![[r#"struct{Item string; Items []string}"#]].assert_eq(&strings.to_string());

    let pair = analysis.resolve_type_decl(&app_name("Pair"), None).unwrap();
    let concrete = analysis
        .instantiate(
            &pair,
            &[Type::Builtin(BuiltinKind::String), Type::slice(Type::Builtin(BuiltinKind::Bool))],
        )
        .unwrap();
    expect![[r#"struct{Key string; Value *app.Box[[]bool]}"#]].assert_eq(&concrete.to_string());
    // The declaration itself is untouched.
    expect![[r#"struct{Key K; Value *app.Box[V]}"#]].assert_eq(&underlying(&pair).to_string());
}

#[test]
fn function_and_method_signatures() {
    let dir = app_tree(&[(
        "funcs.go",
        "package app\n\ntype Box[T any] struct {\n\tItem T\n}\n\nfunc (b *Box[T]) Put(item T) error { return nil }\n\nfunc Map[A, B any](xs []A, f func(A) B) []B { return nil }\n\nfunc Split(s string) (head, tail string) { return s, s }\n",
    )]);
    let analysis = analysis(&dir);

    let put = analysis
        .resolve_func_decl(&app_name("Put"), Some("Box"), None)
        .unwrap();
    assert!(put.is_method());
    assert_eq!(put.type_params.len(), 1);
    expect![[r#"*app.Box[T]"#]].assert_eq(&put.receiver.as_ref().unwrap().ty.to_string());
    expect![[r#"(item T) error"#]].assert_eq(&put.sig.to_string());

    let map = analysis.resolve_func_decl(&app_name("Map"), None, None).unwrap();
    expect![[r#"(xs []A, f func(A) B) []B"#]].assert_eq(&map.sig.to_string());
    let concrete = gosem::schema::concretize_sig(
        &map.sig,
        &[Type::Builtin(BuiltinKind::Int), Type::Builtin(BuiltinKind::String)],
    );
    expect![[r#"(xs []int, f func(int) string) []string"#]].assert_eq(&concrete.to_string());

    let split = analysis.resolve_func_decl(&app_name("Split"), None, None).unwrap();
    expect![[r#"(s string) (head string, tail string)"#]].assert_eq(&split.sig.to_string());

    // Cached per key.
    let again = analysis
        .resolve_func_decl(&app_name("Put"), Some("Box"), None)
        .unwrap();
    assert!(Arc::ptr_eq(&put, &again));

    assert!(analysis.resolve_func_decl(&app_name("Put"), None, None).is_err());
    assert!(analysis.diagnostics().render().contains("undefined function"));
}

#[test]
fn unsupported_constructs() {
    let dir = app_tree(&[(
        "odd.go",
        "package app\n\ntype Events struct {\n\tC chan int\n}\n\ntype Raw struct {\n\tP uintptr\n\tN int\n}\n\nvar NotAType = 1\n",
    )]);
    let analysis = analysis(&dir);

    let err = analysis.resolve_type_decl(&app_name("Events"), None).unwrap_err();
    assert!(matches!(err, Error::Bailout));
    assert!(analysis.diagnostics().render().contains("channel types are not supported"));

    // Unsupported builtins parse and are found on use.
    let raw = analysis.resolve_type_decl(&app_name("Raw"), None).unwrap();
    assert_eq!(underlying(&raw).find_unsupported(), Some("uintptr"));

    assert!(analysis.resolve_type_decl(&app_name("NotAType"), None).is_err());
    assert!(analysis.diagnostics().render().contains("is not a type"));
    let missing = analysis.lookup_decl(&app_name("Nowhere"), None).unwrap_err();
    assert!(matches!(missing, Error::Bailout));
    assert!(
        analysis
            .diagnostics()
            .render()
            .contains("could not find declaration example.com/app.Nowhere")
    );
}

#[test]
fn type_expressions_from_files_and_text() {
    let dir = app_tree(&[(
        "item.go",
        "package app\n\ntype Item struct {\n\tName string\n}\n\ntype Index map[string][]*Item\n",
    )]);
    let analysis = analysis(&dir);
    let app = load(&analysis, "example.com/app");

    let info = analysis.lookup_decl(&app_name("Index"), None).unwrap();
    let spec = info.type_spec().unwrap();
    let index = analysis.resolve_type(&info.file, &spec.ty).unwrap();
    expect![[r#"map[string][]*app.Item"#]].assert_eq(&index.to_string());

    let mut imports = BTreeMap::new();
    imports.insert("app".to_string(), app.import_path.clone());
    imports.insert("time".to_string(), pkg("time"));
    let text = analysis
        .resolve_type_text(None, &imports, "map[string]*app.Item")
        .unwrap();
    expect![[r#"map[string]*app.Item"#]].assert_eq(&text.to_string());
    assert_eq!(
        analysis.resolve_type_text(None, &imports, "time.Time").unwrap(),
        Type::Builtin(BuiltinKind::Time)
    );
    let local = analysis
        .resolve_type_text(Some(&app.import_path), &BTreeMap::new(), "[]Item")
        .unwrap();
    expect![[r#"[]app.Item"#]].assert_eq(&local.to_string());

    let err = analysis
        .resolve_type_text(None, &imports, "map[string")
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}
