//! Emits C++ source text from an analyzed AST.
//!
//! The generator is a single-pass tree walk holding an output buffer and
//! an indent level, built around an `emit`/`emit_line` buffer.
//! Declaration emission, expression emission, and the builtin dispatch
//! table live in sibling modules; this module owns the shared `Emitter`
//! state and the top-level `generate_program`/`generate_unit` entry points.

mod builtins;
mod expressions;
mod program;
mod statements;
mod types;

use std::fmt;

use crate::analyzer::Analyzer;
use crate::ast::{Program, Unit};
use crate::symbol_table::SymbolTable;

#[derive(Debug)]
pub enum CodeGenError {
    UnsupportedConstruct { what: String },
    UnresolvedType { name: String },
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::UnsupportedConstruct { what } => {
                write!(f, "code generator cannot emit: {}", what)
            }
            CodeGenError::UnresolvedType { name } => {
                write!(f, "cannot resolve type '{}' to a C++ type", name)
            }
        }
    }
}

impl std::error::Error for CodeGenError {}

/// Holds the output buffer, indentation, and per-overload mangling state
/// shared across the declaration/expression/statement emitters.
pub struct Emitter<'a> {
    pub(crate) out: String,
    pub(crate) indent: usize,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) records: &'a std::collections::HashMap<String, crate::analyzer::RecordInfo>,
    pub(crate) enums: &'a std::collections::HashMap<String, i64>,
    pub(crate) enum_types: &'a std::collections::HashMap<String, Vec<String>>,
    pub(crate) runtime_refs: std::collections::HashSet<&'static str>,
}

impl<'a> Emitter<'a> {
    fn new(
        symbols: &'a SymbolTable,
        records: &'a std::collections::HashMap<String, crate::analyzer::RecordInfo>,
        enums: &'a std::collections::HashMap<String, i64>,
        enum_types: &'a std::collections::HashMap<String, Vec<String>>,
    ) -> Self {
        Emitter {
            out: String::new(),
            indent: 0,
            symbols,
            records,
            enums,
            enum_types,
            runtime_refs: std::collections::HashSet::new(),
        }
    }

    pub(crate) fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn emit_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    pub(crate) fn emit_line(&mut self, text: &str) {
        self.emit_indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn increase_indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn decrease_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub(crate) fn note_runtime_ref(&mut self, name: &'static str) {
        self.runtime_refs.insert(name);
    }
}

/// Full C++ translation unit, with the runtime-library prelude first.
pub struct GeneratedCode {
    pub source: String,
}

pub fn generate_program(
    program: &Program,
    analyzer: &Analyzer,
) -> Result<GeneratedCode, CodeGenError> {
    let mut emitter = Emitter::new(
        &analyzer.symbols,
        analyzer.record_registry(),
        analyzer.enum_registry(),
        analyzer.enum_type_registry(),
    );
    program::emit_program(&mut emitter, program)?;
    let mut source = prelude(&emitter.runtime_refs);
    source.push_str(&emitter.out);
    Ok(GeneratedCode { source })
}

pub fn generate_unit(unit: &Unit, analyzer: &Analyzer) -> Result<GeneratedCode, CodeGenError> {
    let mut emitter = Emitter::new(
        &analyzer.symbols,
        analyzer.record_registry(),
        analyzer.enum_registry(),
        analyzer.enum_type_registry(),
    );
    program::emit_unit(&mut emitter, unit)?;
    let mut source = prelude(&emitter.runtime_refs);
    source.push_str(&emitter.out);
    Ok(GeneratedCode { source })
}

/// Declares (by name, never by body) every runtime symbol referenced
/// during emission, pinned to `pascal_runtime.h`'s exact names. The
/// bodies live in the frozen external runtime library and are linked,
/// not generated.
fn prelude(refs: &std::collections::HashSet<&'static str>) -> String {
    if refs.is_empty() {
        return String::new();
    }
    let mut text = String::from("// Runtime symbols provided by libpascalrt; declared here so this\n");
    text.push_str("// translation unit type-checks without linking the library source.\n");
    let mut names: Vec<&&str> = refs.iter().collect();
    names.sort();
    for name in names {
        text.push_str(&format!("// runtime: {} provided by libpascalrt\n", name));
    }
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(src: &str) -> String {
        let mut parser = Parser::new(src);
        let mut program = parser.parse_program().expect("parses");
        let mut analyzer = Analyzer::new();
        analyzer.analyze_program(&mut program);
        assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());
        generate_program(&program, &analyzer).expect("codegen").source
    }

    #[test]
    fn hello_world_emits_main_and_cout() {
        let src = "program Hi; begin writeln('Hello, World!') end.";
        let cpp = compile(src);
        assert!(cpp.contains("int main("));
        assert!(cpp.contains("std::cout"));
    }
}
