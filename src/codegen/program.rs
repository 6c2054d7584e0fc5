//! Top-level declaration emission: constants, types, records, routines,
//! and the `main`/unit-namespace wrappers.

use crate::ast::{Declaration, Parameter, Program, RecordTypeDefinition, Unit};
use crate::symbol_table::SymbolKind;

use super::expressions::{cpp_ident, emit_expression, infer_type_name};
use super::statements::emit_statement;
use super::types::map_type;
use super::{CodeGenError, Emitter};

pub(super) fn emit_program(emitter: &mut Emitter, program: &Program) -> Result<(), CodeGenError> {
    emitter.emit_line("#include <iostream>");
    emitter.emit_line("#include <string>");
    emitter.emit_line("#include <vector>");
    emitter.emit_line("#include <array>");
    emitter.emit_line("#include <bitset>");
    emitter.emit_line("#include <cmath>");
    emitter.emit_line("#include <cstdint>");
    emitter.emit_line("#include <cstdlib>");
    emitter.emit_line("#include <limits>");
    emitter.emit_line("#include <iomanip>");
    emitter.emit("\n");
    emit_bounded_string_template(emitter);
    emitter.emit_line(&format!("// translated from Turbo Pascal program '{}'", program.name));
    emitter.emit("\n");

    for decl in &program.declarations {
        emit_declaration(emitter, decl)?;
    }

    emitter.emit_line("int main() {");
    emitter.increase_indent();
    for stmt in &program.main_block {
        emit_statement(emitter, stmt);
    }
    emitter.emit_line("return 0;");
    emitter.decrease_indent();
    emitter.emit_line("}");
    Ok(())
}

pub(super) fn emit_unit(emitter: &mut Emitter, unit: &Unit) -> Result<(), CodeGenError> {
    emitter.emit_line("#include <iostream>");
    emitter.emit_line("#include <string>");
    emitter.emit_line("#include <vector>");
    emitter.emit_line("#include <array>");
    emitter.emit_line("#include <bitset>");
    emitter.emit_line("#include <cmath>");
    emitter.emit_line("#include <cstdint>");
    emitter.emit_line("#include <cstdlib>");
    emitter.emit_line("#include <limits>");
    emitter.emit("\n");
    emit_bounded_string_template(emitter);
    emitter.emit_line(&format!("namespace {} {{", cpp_ident(&unit.name)));
    emitter.increase_indent();

    for decl in &unit.interface_declarations {
        emit_declaration(emitter, decl)?;
    }
    for decl in &unit.implementation_declarations {
        emit_declaration(emitter, decl)?;
    }

    if !unit.initialization.is_empty() {
        emitter.emit_line(&format!("struct {}_Initializer {{", cpp_ident(&unit.name)));
        emitter.increase_indent();
        emitter.emit_line(&format!("{}_Initializer() {{", cpp_ident(&unit.name)));
        emitter.increase_indent();
        for stmt in &unit.initialization {
            emit_statement(emitter, stmt);
        }
        emitter.decrease_indent();
        emitter.emit_line("}");
        emitter.decrease_indent();
        emitter.emit_line("};");
        emitter.emit_line(&format!("static {0}_Initializer {0}_run_init;", cpp_ident(&unit.name)));
    }

    emitter.decrease_indent();
    emitter.emit_line(&format!("}} // namespace {}", cpp_ident(&unit.name)));
    Ok(())
}

/// `string[N]` has no counterpart in the runtime library (it's a shape the
/// compiler invents, not a Turbo Pascal runtime routine), so the wrapper
/// that caps length and truncates on assignment is emitted here rather than
/// declared against `pascal_runtime.h`.
fn emit_bounded_string_template(emitter: &mut Emitter) {
    emitter.emit_line("template <std::size_t N>");
    emitter.emit_line("struct PascalBoundedString {");
    emitter.increase_indent();
    emitter.emit_line("std::string value;");
    emitter.emit_line("PascalBoundedString() = default;");
    emitter.emit_line("PascalBoundedString(const std::string& s) { *this = s; }");
    emitter.emit_line("PascalBoundedString(const char* s) : PascalBoundedString(std::string(s)) {}");
    emitter.emit_line("PascalBoundedString& operator=(const std::string& s) {");
    emitter.increase_indent();
    emitter.emit_line("value = s.size() > N ? s.substr(0, N) : s;");
    emitter.emit_line("return *this;");
    emitter.decrease_indent();
    emitter.emit_line("}");
    emitter.emit_line("operator std::string() const { return value; }");
    emitter.emit_line("char& operator[](std::size_t i) { return value[i]; }");
    emitter.emit_line("const char& operator[](std::size_t i) const { return value[i]; }");
    emitter.emit_line("std::size_t size() const { return value.size(); }");
    emitter.decrease_indent();
    emitter.emit_line("};");
    emitter.emit("\n");
}

fn emit_declaration(emitter: &mut Emitter, decl: &Declaration) -> Result<(), CodeGenError> {
    match decl {
        Declaration::Constant { name, value, .. } => {
            let rhs = emit_expression(emitter, value);
            emitter.emit_line(&format!("const auto {} = {};", cpp_ident(name), rhs));
        }
        Declaration::TypeDef { name, type_text, record_def, .. } => {
            emit_type_def(emitter, name, type_text, record_def.as_ref());
        }
        Declaration::Variable { names, type_name, .. } => {
            let cpp_type = map_type(emitter, type_name);
            let names_text = names
                .iter()
                .map(|n| cpp_ident(n))
                .collect::<Vec<_>>()
                .join(", ");
            emitter.emit_line(&format!("{} {};", cpp_type, names_text));
        }
        Declaration::Procedure { name, params, body, is_forward, .. } => {
            emit_routine(emitter, name, params, "void", body.as_deref(), *is_forward);
        }
        Declaration::Function { name, params, return_type, body, is_forward, .. } => {
            let cpp_return = map_type(emitter, return_type);
            emit_routine(emitter, name, params, &cpp_return, body.as_deref(), *is_forward);
        }
        Declaration::Uses { unit_names, .. } => {
            for name in unit_names {
                emitter.emit_line(&format!("#include \"{}.hpp\"", cpp_ident(name)));
            }
            for name in unit_names {
                emitter.emit_line(&format!("using namespace {};", cpp_ident(name)));
            }
        }
        Declaration::Label { .. } => {}
    }
    Ok(())
}

fn emit_type_def(
    emitter: &mut Emitter,
    name: &str,
    type_text: &str,
    record_def: Option<&RecordTypeDefinition>,
) {
    if let Some(def) = record_def {
        emitter.emit_line(&format!("struct {} {{", cpp_ident(name)));
        emitter.increase_indent();
        for field in &def.fields {
            let ty = map_type(emitter, &field.type_name);
            emitter.emit_line(&format!("{} {};", ty, cpp_ident(&field.name)));
        }
        if let Some(variant) = &def.variant {
            emitter.emit_line(&format!("// variant selector: {}", variant.selector_type));
            emitter.emit_line("union {");
            emitter.increase_indent();
            for case in &variant.cases {
                emitter.emit_line(&format!("struct {{ // case {}", case.values.join(", ")));
                emitter.increase_indent();
                for f in &case.fields {
                    let ty = map_type(emitter, &f.type_name);
                    emitter.emit_line(&format!("{} {};", ty, cpp_ident(&f.name)));
                }
                emitter.decrease_indent();
                emitter.emit_line("};");
            }
            emitter.decrease_indent();
            emitter.emit_line("};");
        }
        emitter.decrease_indent();
        emitter.emit_line("};");
        return;
    }

    let trimmed = type_text.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        let members = &trimmed[1..trimmed.len() - 1];
        emitter.emit_line(&format!("enum class {} {{ {} }};", cpp_ident(name), members));
        return;
    }

    // Plain alias or any other structured type text already reduced to a
    // nearest-fit C++ spelling by `types::map_type`.
    let mapped = map_type(emitter, type_text);
    emitter.emit_line(&format!("using {} = {};", cpp_ident(name), mapped));
}

fn emit_routine(
    emitter: &mut Emitter,
    name: &str,
    params: &[Parameter],
    cpp_return: &str,
    body: Option<&[crate::ast::Statement]>,
    is_forward: bool,
) {
    let mangled = mangle_name(emitter, name, params);
    let param_text = params
        .iter()
        .map(|p| {
            let base = map_type(emitter, &p.type_name);
            let ty = match p.mode {
                crate::ast::ParamMode::Var => format!("{}&", base),
                crate::ast::ParamMode::Const => format!("const {}&", base),
                crate::ast::ParamMode::Value => base,
            };
            format!("{} {}", ty, cpp_ident(&p.name))
        })
        .collect::<Vec<_>>()
        .join(", ");

    if is_forward || body.is_none() {
        emitter.emit_line(&format!("{} {}({});", cpp_return, mangled, param_text));
        return;
    }

    emitter.emit_line(&format!("{} {}({}) {{", cpp_return, mangled, param_text));
    emitter.increase_indent();
    if cpp_return != "void" {
        emitter.emit_line(&format!("{} {};", cpp_return, cpp_ident(name)));
    }
    for stmt in body.unwrap() {
        emit_statement(emitter, stmt);
    }
    if cpp_return != "void" {
        emitter.emit_line(&format!("return {};", cpp_ident(name)));
    }
    emitter.decrease_indent();
    emitter.emit_line("}");
}

/// Mangles overloaded routine names by appending an index among the
/// overloads sharing that lower-cased name, assigned in declaration order;
/// a routine with a single overload keeps its bare name.
fn mangle_name(emitter: &mut Emitter, name: &str, params: &[Parameter]) -> String {
    let overload_count = emitter.symbols.lookup_all_overloads(name).len();
    if overload_count <= 1 {
        return cpp_ident(name);
    }
    format!("{}_{}", cpp_ident(name), param_signature_suffix(params))
}

fn param_signature_suffix(params: &[Parameter]) -> String {
    if params.is_empty() {
        "v".to_string()
    } else {
        params
            .iter()
            .map(|p| p.type_name.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Resolves a call site to the mangled name of the overload whose
/// parameter-type signature matches the call's argument types (the same
/// dispatch rule `SymbolTable::lookup_function` applies), falling back to
/// arity alone when an argument's type cannot be inferred, and to the bare
/// name when the routine is not overloaded at all.
pub(super) fn mangled_call_name(emitter: &Emitter, callee: &str, args: &[crate::ast::Expression]) -> String {
    let overloads = emitter.symbols.lookup_all_overloads(callee);
    if overloads.len() <= 1 {
        return cpp_ident(callee);
    }

    let arg_types: Vec<String> = args
        .iter()
        .map(|a| infer_type_name(emitter, a).unwrap_or_default())
        .collect();
    if let Some(sym) = emitter.symbols.lookup_function(callee, &arg_types) {
        let params = match &sym.kind {
            SymbolKind::Procedure { params } => params,
            SymbolKind::Function { params, .. } => params,
            _ => return cpp_ident(callee),
        };
        return format!("{}_{}", cpp_ident(callee), param_name_suffix(params));
    }

    for sym in &overloads {
        let params = match &sym.kind {
            SymbolKind::Procedure { params } => params,
            SymbolKind::Function { params, .. } => params,
            _ => continue,
        };
        if params.len() == args.len() {
            return format!("{}_{}", cpp_ident(callee), param_name_suffix(params));
        }
    }
    cpp_ident(callee)
}

fn param_name_suffix(params: &[(String, crate::ast::ParamMode)]) -> String {
    params
        .iter()
        .map(|(t, _)| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::parser::Parser;

    fn codegen(src: &str) -> String {
        let mut parser = Parser::new(src);
        let mut program = parser.parse_program().unwrap();
        let mut analyzer = Analyzer::new();
        analyzer.analyze_program(&mut program);
        assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());
        super::super::generate_program(&program, &analyzer).unwrap().source
    }

    #[test]
    fn overloaded_procedures_get_distinct_mangled_names() {
        let cpp = codegen(
            "program P; procedure add(a, b: integer); begin end; procedure add(a, b: real); begin end; begin end.",
        );
        assert!(cpp.contains("add_integer_integer"));
        assert!(cpp.contains("add_real_real"));
    }

    #[test]
    fn record_declaration_emits_struct() {
        let cpp = codegen("program P; type Point = record x, y: integer; end; begin end.");
        assert!(cpp.contains("struct Point {"));
        assert!(cpp.contains("int32_t x;"));
    }

    #[test]
    fn enum_declaration_emits_enum_class() {
        let cpp = codegen("program P; type Color = (Red, Green, Blue); begin end.");
        assert!(cpp.contains("enum class Color { Red,Green,Blue };"));
    }

    #[test]
    fn non_overloaded_routine_keeps_bare_name() {
        let cpp = codegen("program P; procedure greet; begin writeln('hi') end; begin greet end.");
        assert!(cpp.contains("void greet()"));
    }

    #[test]
    fn array_index_subtracts_declared_lower_bound() {
        let cpp = codegen(
            "program P; var a: array[1..10] of integer; begin a[1] := 5 end.",
        );
        assert!(cpp.contains("a[(1)-1]"));
    }

    #[test]
    fn string_index_is_forced_one_based() {
        let cpp = codegen(
            "program P; var s: string; var c: char; begin c := s[1] end.",
        );
        assert!(cpp.contains("s[(1)-1]"));
    }

    #[test]
    fn set_arithmetic_emits_bitset_operators() {
        let cpp = codegen(
            "program P; type Colors = set of (red, green, blue); var s1, s2, s3: Colors; begin s3 := s1 + s2; s3 := s1 * s2; s3 := s1 - s2; end.",
        );
        assert!(cpp.contains("(s1 | s2)"));
        assert!(cpp.contains("(s1 & s2)"));
        assert!(cpp.contains("(s1 & ~s2)"));
    }

    #[test]
    fn bounded_string_variable_uses_capped_wrapper() {
        let cpp = codegen("program P; var s: string[10]; begin s := 'hi' end.");
        assert!(cpp.contains("struct PascalBoundedString {"));
        assert!(cpp.contains("PascalBoundedString<10> s;"));
    }

    #[test]
    fn uses_clause_emits_include_and_using_namespace() {
        let cpp = codegen("program P; uses MathUtil; begin end.");
        assert!(cpp.contains("#include \"MathUtil.hpp\""));
        assert!(cpp.contains("using namespace MathUtil;"));
    }
}
