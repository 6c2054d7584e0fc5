//! Turbo Pascal 7 to C++ source-to-source compiler front-end.
//!
//! `compile_source` runs the full pipeline — lex, parse, resolve `uses`,
//! analyze, generate — and returns either the emitted C++ text or the
//! accumulated diagnostics. Nothing here writes to disk; that is the
//! binary's job.

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod symbol_table;
pub mod token;
pub mod unit_loader;

use std::path::Path;

use config::CompilerConfig;
use unit_loader::UnitLoader;

#[derive(Debug)]
pub struct Diagnostic {
    pub message: String,
}

pub enum CompileResult {
    Success { cpp_source: String, warnings: Vec<Diagnostic> },
    Failure { diagnostics: Vec<Diagnostic> },
}

/// Compiles one Pascal source file. `unit_name` selects unit-vs-program
/// parsing when the caller already knows the kind (e.g. from the file
/// being `uses`-referenced elsewhere); when `None`, the leading keyword in
/// `source` decides.
pub fn compile_source(
    source: &str,
    unit_name: Option<&str>,
    base_dir: &Path,
    config: &CompilerConfig,
) -> CompileResult {
    let is_unit = unit_name.is_some() || looks_like_unit(source);

    let mut parser = parser::Parser::new(source);
    let mut analyzer = analyzer::Analyzer::new();
    let mut loader = UnitLoader::new(base_dir).with_extra_dirs(config.unit_search_paths.clone());

    if is_unit {
        let Some(mut unit) = parser.parse_unit() else {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(parser.errors()),
            };
        };
        if !parser.errors().is_empty() {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(parser.errors()),
            };
        }
        if let Err(e) = analyzer.load_uses(&unit.interface_declarations, &mut loader) {
            return CompileResult::Failure {
                diagnostics: vec![Diagnostic { message: e.to_string() }],
            };
        }
        analyzer.analyze_unit(&mut unit);
        if !analyzer.errors().is_empty() {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(analyzer.errors()),
            };
        }
        match codegen::generate_unit(&unit, &analyzer) {
            Ok(generated) => CompileResult::Success {
                cpp_source: generated.source,
                warnings: Vec::new(),
            },
            Err(e) => CompileResult::Failure {
                diagnostics: vec![Diagnostic { message: e.to_string() }],
            },
        }
    } else {
        let Some(mut program) = parser.parse_program() else {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(parser.errors()),
            };
        };
        if !parser.errors().is_empty() {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(parser.errors()),
            };
        }
        if let Err(e) = analyzer.load_uses(&program.declarations, &mut loader) {
            return CompileResult::Failure {
                diagnostics: vec![Diagnostic { message: e.to_string() }],
            };
        }
        analyzer.analyze_program(&mut program);
        if !analyzer.errors().is_empty() {
            return CompileResult::Failure {
                diagnostics: as_diagnostics(analyzer.errors()),
            };
        }
        match codegen::generate_program(&program, &analyzer) {
            Ok(generated) => CompileResult::Success {
                cpp_source: generated.source,
                warnings: Vec::new(),
            },
            Err(e) => CompileResult::Failure {
                diagnostics: vec![Diagnostic { message: e.to_string() }],
            },
        }
    }
}

fn looks_like_unit(source: &str) -> bool {
    source
        .trim_start()
        .get(0..4)
        .map(|s| s.eq_ignore_ascii_case("unit"))
        .unwrap_or(false)
}

fn as_diagnostics(messages: &[String]) -> Vec<Diagnostic> {
    messages
        .iter()
        .map(|m| Diagnostic { message: m.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_hello_world_program() {
        let result = compile_source(
            "program Hi; begin writeln('Hello, World!') end.",
            None,
            Path::new("."),
            &CompilerConfig::default(),
        );
        match result {
            CompileResult::Success { cpp_source, .. } => {
                assert!(cpp_source.contains("int main("));
            }
            CompileResult::Failure { diagnostics } => panic!("{:?}", diagnostics),
        }
    }

    #[test]
    fn reports_semantic_errors_as_failure() {
        let result = compile_source(
            "program P; begin x := 1 end.",
            None,
            Path::new("."),
            &CompilerConfig::default(),
        );
        match result {
            CompileResult::Failure { diagnostics } => assert!(!diagnostics.is_empty()),
            CompileResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn detects_unit_from_leading_keyword() {
        let result = compile_source(
            "unit U; interface implementation begin end.",
            None,
            Path::new("."),
            &CompilerConfig::default(),
        );
        match result {
            CompileResult::Success { cpp_source, .. } => assert!(cpp_source.contains("namespace U")),
            CompileResult::Failure { diagnostics } => panic!("{:?}", diagnostics),
        }
    }

    #[test]
    fn resolves_uses_clause_against_a_sibling_unit_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MathUtil.pas"),
            "unit MathUtil; interface function Double(x: integer): integer; \
             implementation function Double(x: integer): integer; begin Double := x * 2 end; begin end.",
        )
        .unwrap();

        let result = compile_source(
            "program P; uses MathUtil; var y: integer; begin y := Double(21) end.",
            None,
            dir.path(),
            &CompilerConfig::default(),
        );
        match result {
            CompileResult::Success { .. } => {}
            CompileResult::Failure { diagnostics } => panic!("{:?}", diagnostics),
        }
    }

    #[test]
    fn missing_used_unit_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = compile_source(
            "program P; uses NoSuchUnit; begin end.",
            None,
            dir.path(),
            &CompilerConfig::default(),
        );
        match result {
            CompileResult::Failure { diagnostics } => assert!(!diagnostics.is_empty()),
            CompileResult::Success { .. } => panic!("expected failure"),
        }
    }
}
