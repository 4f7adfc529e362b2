use super::*;
use crate::frontend::ast::{
    Decl, ExprKind, InterfaceElem, Spec, StatementKind, TypeSpec,
};

fn parse_full(source: &str) -> FileAst {
    match parse_file(source, FileId(0), ParseMode::Full) {
        Ok(file) => file,
        Err(err) => panic!("parse failed: {:?}", err.diagnostics()),
    }
}

fn type_specs(file: &FileAst) -> Vec<&TypeSpec> {
    file.decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Gen(gen_decl) => Some(gen_decl),
            Decl::Func(_) => None,
        })
        .flat_map(|gen_decl| gen_decl.specs.iter())
        .filter_map(|spec| match spec {
            Spec::Type(spec) => Some(spec),
            Spec::Value(_) => None,
        })
        .collect()
}

#[test]
fn parses_package_doc_imports_and_constraint() {
    let source = r#"//go:build linux && !race

// Package users manages accounts.
package users

import (
	"context"
	// Storage layer.
	db "example.com/app/storage"
	_ "embed"
)

import "fmt"
"#;
    let file = parse_file(source, FileId(0), ParseMode::Header).unwrap();
    assert_eq!(file.package.name, "users");
    assert_eq!(file.doc.as_deref(), Some("Package users manages accounts."));
    assert_eq!(file.build_constraint.as_deref(), Some("linux && !race"));
    let paths: Vec<_> = file.imports.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, ["context", "example.com/app/storage", "embed", "fmt"]);
    assert_eq!(file.imports[1].name.as_ref().map(|n| n.name.as_str()), Some("db"));
    assert_eq!(file.imports[1].doc.as_deref(), Some("Storage layer."));
    assert!(file.decls.is_empty());
}

#[test]
fn header_mode_ignores_body_errors() {
    let source = "package a\n\nimport \"fmt\"\n\nfunc broken( {\n";
    assert!(parse_file(source, FileId(0), ParseMode::Header).is_ok());
    let err = parse_file(source, FileId(0), ParseMode::Full).unwrap_err();
    assert!(!err.diagnostics().is_empty());
}

#[test]
fn parses_generic_type_declarations_and_arrays() {
    let file = parse_full(
        "package a\n\ntype Box[T any] struct { Value T }\ntype Pair[K comparable, V any] map[K]V\ntype Arr [4]int\ntype Num interface { ~int | ~float64 }\ntype Alias = Box[int]\n",
    );
    let specs = type_specs(&file);
    assert_eq!(specs.len(), 5);
    assert_eq!(specs[0].type_params.len(), 1);
    assert_eq!(specs[0].type_params[0].names[0].name, "T");
    assert_eq!(specs[1].type_params.len(), 2);
    assert!(specs[2].type_params.is_empty());
    assert!(matches!(specs[2].ty.kind, ExprKind::ArrayType { len: Some(_), .. }));
    let ExprKind::InterfaceType(iface) = &specs[3].ty.kind else {
        panic!("expected interface");
    };
    assert!(matches!(
        &iface.elements[0],
        InterfaceElem::Embedded(expr) if matches!(expr.kind, ExprKind::Binary { op: "|", .. })
    ));
    assert!(specs[4].is_alias);
    assert!(matches!(specs[4].ty.kind, ExprKind::Index { .. }));
}

#[test]
fn struct_fields_keep_docs_tags_and_embeds() {
    let file = parse_full(
        "package a\n\ntype User struct {\n\t// ID is the key.\n\tID   int `json:\"id\"`\n\tA, B string\n\t*Base\n\tpkg.Mixin\n\tTags []string\n}\n",
    );
    let ExprKind::StructType(st) = &type_specs(&file)[0].ty.kind else {
        panic!("expected struct");
    };
    assert_eq!(st.fields.len(), 5);
    assert_eq!(st.fields[0].doc.as_deref(), Some("ID is the key."));
    assert_eq!(st.fields[0].tag.as_deref(), Some("`json:\"id\"`"));
    assert_eq!(st.fields[1].names.len(), 2);
    assert!(st.fields[2].names.is_empty());
    assert!(st.fields[3].names.is_empty());
    assert!(matches!(st.fields[4].ty.kind, ExprKind::ArrayType { len: None, .. }));
}

#[test]
fn parameter_lists_group_names() {
    let file = parse_full(
        "package a\n\nfunc F(a, b int, c ...string) (n int, err error) { return }\nfunc G(int, string) error { return nil }\nfunc (s *Svc[T]) M(xs []T) {}\n",
    );
    let funcs: Vec<_> = file
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Func(func) => Some(func),
            Decl::Gen(_) => None,
        })
        .collect();
    assert_eq!(funcs[0].ty.params.len(), 2);
    assert_eq!(funcs[0].ty.params[0].names.len(), 2);
    assert!(matches!(funcs[0].ty.params[1].ty.kind, ExprKind::Ellipsis(Some(_))));
    assert_eq!(funcs[0].ty.results.len(), 2);
    assert_eq!(funcs[1].ty.params.len(), 2);
    assert!(funcs[1].ty.params[0].names.is_empty());
    assert_eq!(funcs[2].receiver_type_name(), Some("Svc"));
    assert!(matches!(funcs[2].ty.params[0].ty.kind, ExprKind::ArrayType { len: None, .. }));
}

#[test]
fn composite_literal_is_not_taken_in_control_clauses() {
    let file = parse_full(
        "package a\n\nfunc f(x T) {\n\tif x == (T{}) {\n\t}\n\tif v := x; v == y {\n\t}\n\tfor _, p := range []Point{{1, 2}} {\n\t\t_ = p\n\t}\n\tswitch t := x.(type) {\n\tcase *T, []int:\n\t\t_ = t\n\tdefault:\n\t}\n\tselect {\n\tcase v := <-ch:\n\t\t_ = v\n\tcase ch <- 1:\n\t}\n\tfor i := 0; i < 3; i++ {\n\t}\n\tgo func() {}()\n\tdefer close(ch)\nloop:\n\tfor {\n\t\tbreak loop\n\t}\n}\n",
    );
    let Decl::Func(func) = &file.decls[0] else {
        panic!("expected func");
    };
    let kinds: Vec<_> = func
        .body
        .as_ref()
        .unwrap()
        .statements
        .iter()
        .map(|s| match &s.kind {
            StatementKind::If(_) => "if",
            StatementKind::Range(_) => "range",
            StatementKind::TypeSwitch(_) => "typeswitch",
            StatementKind::Select(_) => "select",
            StatementKind::For(_) => "for",
            StatementKind::Go(_) => "go",
            StatementKind::Defer(_) => "defer",
            StatementKind::Labeled { .. } => "label",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        ["if", "if", "range", "typeswitch", "select", "for", "go", "defer", "label"]
    );
}

#[test]
fn parses_standalone_type_expressions() {
    let expr = parse_type_expr("map[string][]*pkg.Item[int]").unwrap();
    assert!(matches!(expr.kind, ExprKind::MapType { .. }));
    assert!(parse_type_expr("[]int extra").is_err());
    assert!(parse_type_expr("").is_err());
}

#[test]
fn reports_missing_package_clause() {
    let err = parse_file("func f() {}", FileId(0), ParseMode::Header).unwrap_err();
    assert!(
        err.diagnostics()
            .iter()
            .any(|d| d.message.contains("expected 'package'"))
    );
}
