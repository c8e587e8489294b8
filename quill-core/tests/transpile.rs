use std::fs;

use quill_core::compat::types_are_compatible;
use quill_core::defs::{Defmap, FuncDef, Var};
use quill_core::diagnostic::Diagnostic;
use quill_core::render::RenderConfig;
use quill_core::span::{FileId, Span};
use quill_core::types::{DataType, FuncSig, Param, Prim};
use quill_core::value::Const;
use quill_core::{CoreError, load_source, parse_type, transpile_expr, transpile_statements};
use tempfile::tempdir;

const FILE: FileId = FileId(0);

fn span() -> Span {
    Span::new(FILE, 0, 1)
}

fn int() -> DataType {
    DataType::prim(Prim::Int)
}

fn expr(defs: &Defmap, source: &str) -> String {
    transpile_expr(source, FILE, defs, &RenderConfig::default())
        .expect("expression translates")
        .code
}

fn error_keys(defs: &Defmap, source: &str) -> Vec<&'static str> {
    let err = transpile_expr(source, FILE, defs, &RenderConfig::default()).expect_err("expression fails");
    err.diagnostics().iter().map(Diagnostic::key).collect()
}

#[test]
fn folds_constants_by_precedence() {
    let artifact = transpile_expr("2 + 3 * 4", FILE, &Defmap::new(), &RenderConfig::default()).expect("translates");
    assert_eq!(artifact.code, "i32{14}");
    assert_eq!(artifact.constant, Some(Const::Int(14)));
    assert!(artifact.diagnostics.is_empty());
}

#[test]
fn constant_division_by_zero_is_reported() {
    assert_eq!(error_keys(&Defmap::new(), "1 / (2 - 2)"), vec!["divide_by_zero"]);
}

#[test]
fn pointer_types_keep_their_spelling() {
    for source in ["*int", "**[]str", "*[str:*u8]", "[4]*f64"] {
        let ty = parse_type(source, FILE).expect("type parses");
        assert_eq!(ty.kind_text(), source);
    }
}

#[test]
fn pointer_wrapping_round_trips() {
    let base = DataType::slice_of(int());
    for depth in 0..4 {
        let wrapped = base.clone().with_ptr(depth);
        assert_eq!(
            wrapped.render(),
            format!("{}{}{}", "ptr<".repeat(depth), base.render(), ">".repeat(depth))
        );
        let stripped = (0..depth).fold(wrapped, |t, _| t.unptr());
        assert_eq!(stripped.render(), base.render());
    }
}

#[test]
fn integer_literals_keep_their_value() {
    let defs = Defmap::new();
    let cases = [
        ("127", Const::Int(127), "i32{127}"),
        ("0x7fffffff", Const::Int(i64::from(i32::MAX)), "i32{2147483647}"),
        ("0b100000000000000000000000000000000", Const::Int(1 << 32), "i64{4294967296}"),
        ("9223372036854775807", Const::Int(i64::MAX), "i64{9223372036854775807}"),
    ];
    for (source, constant, code) in cases {
        let artifact = transpile_expr(source, FILE, &defs, &RenderConfig::default()).expect("literal");
        assert_eq!(artifact.constant, Some(constant), "{source}");
        assert_eq!(artifact.code, code, "{source}");
    }
}

#[test]
fn full_slice_of_array_uses_declared_bounds() {
    let mut defs = Defmap::new();
    defs.push(Var::new("x", DataType::array_of(int(), 5)).with_span(span()));
    let full = expr(&defs, "x[:]");
    assert_eq!(full, "x_0.slice(uint{0}, uint{5})");
    assert_eq!(expr(&defs, "x[0:5]"), full);
    assert_eq!(error_keys(&defs, "x[0:6]"), vec!["overflow_limits"]);
}

#[test]
fn pointer_element_literals_stay_one_operand() {
    let defs = Defmap::new();
    assert_eq!(expr(&defs, "[2]*int{nil, nil}"), "array<ptr<int>,2>({nil, nil})");
    let artifact = transpile_expr("[]*int{nil} == nil", FILE, &defs, &RenderConfig::default()).expect("translates");
    assert_eq!(artifact.code, "(slice<ptr<int>>({nil}) == nil)");
    assert_eq!(artifact.value_kind, "bool");
}

#[test]
fn map_literals_keep_entry_order() {
    let code = expr(&Defmap::new(), "[int:str]{1: \"a\", 2: \"b\"}");
    assert!(code.starts_with("map<int,str>{"), "{code}");
    let first = code.find("{int{1}, str{\"a\"}}").expect("first entry");
    let second = code.find("{int{2}, str{\"b\"}}").expect("second entry");
    assert!(first < second);

    assert_eq!(error_keys(&Defmap::new(), "[int:str]{1: \"a\", 2}"), vec!["missing_expr"]);
}

#[test]
fn variadic_arguments_become_a_slice() {
    let mut defs = Defmap::new();
    defs.push(FuncDef::new("f", FuncSig::new(vec![Param::new("xs", int()).variadic()], int())).with_span(span()));
    assert_eq!(expr(&defs, "f(1, 2, 3)"), "f_0(slice<int>({int{1}, int{2}, int{3}}))");
    assert_eq!(expr(&defs, "f()"), "f_0(slice<int>({}))");
}

#[test]
fn positional_arguments_never_overwrite_named_ones() {
    let mut defs = Defmap::new();
    defs.push(
        FuncDef::new("f", FuncSig::new(vec![Param::new("a", int()), Param::new("b", int())], int()))
            .with_span(span()),
    );
    assert_eq!(expr(&defs, "f(b: 2, 1)"), "f_0(int{1}, int{2})");
    assert_eq!(error_keys(&defs, "f(a: 1, 2, 3)"), vec!["already_has_expr"]);
}

#[test]
fn tuple_results_expand_over_parameters() {
    let str_ty = DataType::prim(Prim::Str);
    let mut defs = Defmap::new();
    defs.push(
        FuncDef::new(
            "f",
            FuncSig::new(vec![Param::new("a", int()), Param::new("b", str_ty.clone())], DataType::void()),
        )
        .with_span(span()),
    )
    .push(FuncDef::new("g", FuncSig::new(Vec::new(), DataType::tuple(vec![int(), str_ty.clone()]))).with_span(span()))
    .push(
        FuncDef::new("h", FuncSig::new(Vec::new(), DataType::tuple(vec![int(), str_ty.clone(), int()])))
            .with_span(span()),
    )
    .push(FuncDef::new("k", FuncSig::new(Vec::new(), DataType::tuple(vec![str_ty, int()]))).with_span(span()));

    assert_eq!(expr(&defs, "f(g())"), "tuple_as_args(f_0, g_0())");
    assert_eq!(error_keys(&defs, "f(h())"), vec!["argument_overflow"]);
    let keys = error_keys(&defs, "f(k())");
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|k| *k == "incompatible_datatype"));
}

#[test]
fn nil_compatibility_is_symmetric() {
    let nil = DataType::prim(Prim::Nil);
    let slice = DataType::slice_of(int());
    assert!(types_are_compatible(&nil, &slice, false));
    assert!(types_are_compatible(&slice, &nil, false));
    assert!(!types_are_compatible(&nil, &int(), false));
    assert!(!types_are_compatible(&int(), &nil, false));
}

#[test]
fn alias_typed_variables_keep_their_name() {
    let mut defs = Defmap::new();
    defs.push(Var::new("b", parse_type("byte", FILE).expect("type parses")).with_span(span()))
        .push(Var::new("bs", parse_type("[]byte", FILE).expect("type parses")).with_span(span()));

    let artifact = transpile_expr("b + 1", FILE, &defs, &RenderConfig::default()).expect("translates");
    assert_eq!(artifact.code, "(b_0 + u8{1})");
    assert_eq!(artifact.value_kind, "byte");

    let element = transpile_expr("bs[0]", FILE, &defs, &RenderConfig::default()).expect("translates");
    assert_eq!(element.value_kind, "byte");
    assert_eq!(expr(&defs, "b << 2"), "(b_0 << i32{2})");
    assert_eq!(error_keys(&defs, "b + \"x\""), vec!["incompatible_types"]);
}

#[test]
fn anonymous_functions_render_as_lambdas() {
    let code = expr(&Defmap::new(), "(a int, b int) int { return a + b }");
    assert_eq!(code, "[=](int a_0, int b_0) mutable -> int {\n\treturn (a_0 + b_0);\n}");
}

#[test]
fn foreach_statements_call_the_runtime_helper() {
    let mut defs = Defmap::new();
    defs.push(Var::new("xs", DataType::slice_of(int())).with_span(span()));
    let artifact = transpile_statements("for i, x in xs { out(x) }", FILE, &defs, &RenderConfig::spaces(2))
        .expect("statement translates");
    assert!(
        artifact.code.starts_with("foreach<slice<int>, uint, int>(xs_0, [&](uint i_0, int x_0) -> void {\n  "),
        "{}",
        artifact.code
    );
    assert!(artifact.code.contains("out(x_0);"));
    assert!(artifact.code.ends_with("});"));
}

#[test]
fn unread_locals_are_warned_about() {
    let mut defs = Defmap::new();
    defs.push(Var::new("xs", DataType::slice_of(int())).with_span(span()));
    let artifact = transpile_statements("for i, x in xs { out(x) }", FILE, &defs, &RenderConfig::default())
        .expect("warnings do not fail the translation");
    let warned: Vec<String> = artifact.diagnostics.iter().map(ToString::to_string).collect();
    assert_eq!(warned.len(), 1, "{warned:?}");
    assert!(warned[0].contains("warning[unused_variable]"), "{}", warned[0]);
    assert!(warned[0].contains("`i`"), "{}", warned[0]);

    let lambda = transpile_expr("(a int, b int) int { return a }", FILE, &defs, &RenderConfig::default())
        .expect("translates");
    let keys: Vec<&str> = lambda.diagnostics.iter().map(Diagnostic::key).collect();
    assert_eq!(keys, vec!["unused_variable"]);
}

#[test]
fn sources_are_read_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("expr.quill");
    fs::write(&path, "1 << 4").expect("write source");

    let source = load_source(&path).expect("source loads");
    assert_eq!(expr(&Defmap::new(), &source), "i32{16}");

    let missing = load_source(&dir.path().join("missing.quill")).expect_err("missing file");
    assert!(matches!(missing, CoreError::SourceIo { .. }));
}
