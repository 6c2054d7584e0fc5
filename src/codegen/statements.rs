//! Statement emission.

use crate::ast::{CaseBranch, Expression, Statement};

use super::expressions::{cpp_ident, emit_expression};
use super::Emitter;

pub(super) fn emit_statement(emitter: &mut Emitter, stmt: &Statement) {
    match stmt {
        Statement::Expression(expr) => {
            let text = emit_expression(emitter, expr);
            emitter.emit_line(&format!("{};", text));
        }
        Statement::Compound(stmts) => {
            emitter.emit_line("{");
            emitter.increase_indent();
            for s in stmts {
                emit_statement(emitter, s);
            }
            emitter.decrease_indent();
            emitter.emit_line("}");
        }
        Statement::Assignment { target, value, .. } => {
            let lhs = emit_expression(emitter, target);
            let rhs = emit_expression(emitter, value);
            emitter.emit_line(&format!("{} = {};", lhs, rhs));
        }
        Statement::If { condition, then_branch, else_branch, .. } => {
            let cond_text = emit_expression(emitter, condition);
            emitter.emit_line(&format!("if ({}) {{", cond_text));
            emitter.increase_indent();
            emit_as_block_body(emitter, then_branch);
            emitter.decrease_indent();
            match else_branch {
                Some(e) => {
                    emitter.emit_line("} else {");
                    emitter.increase_indent();
                    emit_as_block_body(emitter, e);
                    emitter.decrease_indent();
                    emitter.emit_line("}");
                }
                None => emitter.emit_line("}"),
            }
        }
        Statement::While { condition, body, .. } => {
            let cond_text = emit_expression(emitter, condition);
            emitter.emit_line(&format!("while ({}) {{", cond_text));
            emitter.increase_indent();
            emit_as_block_body(emitter, body);
            emitter.decrease_indent();
            emitter.emit_line("}");
        }
        Statement::For { variable, from, to, downto, body, .. } => {
            let var = cpp_ident(variable);
            let from_text = emit_expression(emitter, from);
            let to_text = emit_expression(emitter, to);
            let (cmp, step) = if *downto { ("--", "--") } else { (">=", "++") };
            let _ = cmp;
            let cond = if *downto {
                format!("{} >= {}", var, to_text)
            } else {
                format!("{} <= {}", var, to_text)
            };
            emitter.emit_line(&format!(
                "for ({} = {}; {}; {}{}) {{",
                var, from_text, cond, var, step
            ));
            emitter.increase_indent();
            emit_as_block_body(emitter, body);
            emitter.decrease_indent();
            emitter.emit_line("}");
        }
        Statement::Repeat { body, condition, .. } => {
            emitter.emit_line("do {");
            emitter.increase_indent();
            for s in body {
                emit_statement(emitter, s);
            }
            emitter.decrease_indent();
            let cond_text = emit_expression(emitter, condition);
            emitter.emit_line(&format!("}} while (!({}));", cond_text));
        }
        Statement::Case { selector, branches, else_branch, .. } => {
            emit_case(emitter, selector, branches, else_branch.as_deref());
        }
        Statement::With(clause) => {
            // `with` has no C++ counterpart; its effect was already baked
            // into each `Identifier`'s `with_variable` stamp during
            // analysis, so only the body needs emitting.
            emit_statement(emitter, &clause.body);
        }
        Statement::Label { name, statement, .. } => {
            emitter.emit_line(&format!("{}:;", sanitize_label(name)));
            emit_statement(emitter, statement);
        }
        Statement::Goto { label, .. } => {
            emitter.emit_line(&format!("goto {};", sanitize_label(label)));
        }
        Statement::Break(_) => emitter.emit_line("break;"),
        Statement::Continue(_) => emitter.emit_line("continue;"),
        Statement::Empty => {}
    }
}

/// A Pascal statement used as an `if`/`while`/`for` body may itself be a
/// compound statement; emitting its inner statements directly avoids a
/// redundant nested `{ }` pair.
fn emit_as_block_body(emitter: &mut Emitter, stmt: &Statement) {
    match stmt {
        Statement::Compound(stmts) => {
            for s in stmts {
                emit_statement(emitter, s);
            }
        }
        other => emit_statement(emitter, other),
    }
}

fn sanitize_label(name: &str) -> String {
    format!("label_{}", name)
}

fn emit_case(
    emitter: &mut Emitter,
    selector: &Expression,
    branches: &[CaseBranch],
    else_branch: Option<&Statement>,
) {
    let selector_text = emit_expression(emitter, selector);
    emitter.emit_line(&format!("switch ({}) {{", selector_text));
    emitter.increase_indent();
    for branch in branches {
        for value in &branch.values {
            match value {
                Expression::RangeExpr { low, high, .. } => {
                    // C++ `switch` has no range label; expand to individual
                    // `case` labels when both bounds are integer literals,
                    // otherwise fall back to an `if` chain comment so the
                    // construct is still visible in the output.
                    if let (Some(lo), Some(hi)) = (literal_int(low), literal_int(high)) {
                        for v in lo..=hi {
                            emitter.emit_line(&format!("case {}:", v));
                        }
                    } else {
                        let low_text = emit_expression(emitter, low);
                        let high_text = emit_expression(emitter, high);
                        emitter.emit_line(&format!(
                            "/* UNKNOWN_OP non-constant case range {}..{} */",
                            low_text, high_text
                        ));
                    }
                }
                other => {
                    let other_text = emit_expression(emitter, other);
                    emitter.emit_line(&format!("case {}:", other_text))
                }
            }
        }
        emitter.increase_indent();
        emit_as_block_body(emitter, &branch.body);
        emitter.emit_line("break;");
        emitter.decrease_indent();
    }
    if let Some(else_stmt) = else_branch {
        emitter.emit_line("default: {");
        emitter.increase_indent();
        emit_as_block_body(emitter, else_stmt);
        emitter.emit_line("break;");
        emitter.decrease_indent();
        emitter.emit_line("}");
    }
    emitter.decrease_indent();
    emitter.emit_line("}");
}

fn literal_int(expr: &Expression) -> Option<i64> {
    match expr {
        Expression::Literal { value: crate::ast::Literal::Integer(text), .. } => text.parse().ok(),
        _ => None,
    }
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
    fn for_downto_emits_decrement_loop() {
        let cpp = codegen("program P; var i: integer; begin for i := 10 downto 1 do writeln(i); end.");
        assert!(cpp.contains("i--"));
        assert!(cpp.contains("i >= 1"));
    }

    #[test]
    fn case_with_range_expands_integer_labels() {
        let cpp = codegen(
            "program P; var x: integer; begin case x of 1..3: writeln('low'); else writeln('hi'); end; end.",
        );
        assert!(cpp.contains("case 1:"));
        assert!(cpp.contains("case 2:"));
        assert!(cpp.contains("case 3:"));
        assert!(cpp.contains("default:"));
    }

    #[test]
    fn with_statement_leaves_no_trace_of_itself() {
        let cpp = codegen(
            "program P; type Pt = record x: integer; end; var p: Pt; begin with p do x := 1; end.",
        );
        assert!(!cpp.contains("with"));
        assert!(cpp.contains("p.x = 1;"));
    }
}
