//! End-to-end scenarios exercised through the public `compile_source` API.

use std::path::Path;

use pascalc::config::CompilerConfig;
use pascalc::{compile_source, CompileResult};

fn compile_ok(source: &str) -> String {
    match compile_source(source, None, Path::new("."), &CompilerConfig::default()) {
        CompileResult::Success { cpp_source, .. } => cpp_source,
        CompileResult::Failure { diagnostics } => panic!("unexpected failure: {:?}", diagnostics),
    }
}

#[test]
fn hello_world_compiles_and_prints_greeting() {
    let cpp = compile_ok("program Hi; begin writeln('Hello, World!') end.");
    assert!(cpp.contains("int main("));
    assert!(cpp.contains("std::cout"));
    assert!(cpp.contains("Hello, World!"));
}

#[test]
fn summation_loop_emits_a_for_loop_over_the_declared_bounds() {
    let cpp = compile_ok(
        "program S; var s,i:integer; begin s:=0; for i:=1 to 10 do s:=s+i; writeln(s) end.",
    );
    assert!(cpp.contains("for (i = 1; i <= 10; i++)"));
    assert!(cpp.contains("s = (s + i);"));
}

#[test]
fn string_concat_uses_string_plus() {
    let cpp = compile_ok(
        "program C; var a,b,c:string; begin a:='foo'; b:='bar'; c:=a+b; writeln(c) end.",
    );
    assert!(cpp.contains("c = (a + b);"));
    assert!(cpp.contains("std::string"));
}

#[test]
fn record_with_targets_the_with_bound_field() {
    let cpp = compile_ok(
        "program R; type P=record x,y:integer end; var p:P; begin p.x:=3; with p do y:=4; writeln(p.x+p.y) end.",
    );
    assert!(cpp.contains("struct P {"));
    assert!(cpp.contains("p.x = 3;"));
    assert!(cpp.contains("p.y = 4;"));
}

#[test]
fn overload_dispatch_emits_two_mangled_routines_and_picks_each_at_its_call_site() {
    let cpp = compile_ok(
        "program O; procedure add(a,b:integer); begin end; procedure add(a,b:real); begin end; begin add(1,2); add(1.5,2.5) end.",
    );
    assert!(cpp.contains("void add_integer_integer(int32_t a, int32_t b)"));
    assert!(cpp.contains("void add_real_real(double a, double b)"));
    assert!(cpp.contains("add_integer_integer(1, 2);"));
    assert!(cpp.contains("add_real_real(1.5, 2.5);"));
}

#[test]
fn enum_set_literal_emits_ordinal_bit_positions() {
    let cpp = compile_ok(
        "program E; type C=(red,green,blue); var s:set of C; begin s:=[red,blue] end.",
    );
    assert!(cpp.contains("enum class C { red,green,blue };"));
    assert!(cpp.contains("__set.set(0);"));
    assert!(cpp.contains("__set.set(2);"));
}

#[test]
fn forward_declaration_matched_by_implementation_emits_one_prototype_and_one_body() {
    let cpp = compile_ok(
        "program F; function f(x:integer):integer; forward; function f(x:integer):integer; begin f := x end; begin end.",
    );
    let prototype_count = cpp.matches("int32_t f(int32_t x);").count();
    let body_count = cpp.matches("int32_t f(int32_t x) {").count();
    assert_eq!(prototype_count, 1);
    assert_eq!(body_count, 1);
}

#[test]
fn undeclared_identifier_fails_compilation_with_a_diagnostic() {
    match compile_source("program P; begin x := 1 end.", None, Path::new("."), &CompilerConfig::default()) {
        CompileResult::Failure { diagnostics } => {
            assert!(diagnostics.iter().any(|d| d.message.contains("undeclared identifier 'x'")));
        }
        CompileResult::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn unit_source_emits_a_namespace_instead_of_main() {
    let cpp = compile_ok(
        "unit MathUtil; interface function Double(x: integer): integer; implementation function Double(x: integer): integer; begin Double := x * 2 end; begin end.",
    );
    assert!(cpp.contains("namespace MathUtil {"));
    assert!(!cpp.contains("int main("));
}

#[test]
fn program_uses_clause_resolves_against_a_unit_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("MathUtil.pas"),
        "unit MathUtil; interface function Double(x: integer): integer; \
         implementation function Double(x: integer): integer; begin Double := x * 2 end; begin end.",
    )
    .unwrap();

    match compile_source(
        "program P; uses MathUtil; var y: integer; begin y := Double(21); writeln(y) end.",
        None,
        dir.path(),
        &CompilerConfig::default(),
    ) {
        CompileResult::Success { cpp_source, .. } => {
            assert!(cpp_source.contains("#include \"MathUtil.hpp\""));
            assert!(cpp_source.contains("using namespace MathUtil;"));
            assert!(cpp_source.contains("y = Double(21);"));
        }
        CompileResult::Failure { diagnostics } => panic!("unexpected failure: {:?}", diagnostics),
    }
}
