//! Dispatches calls to Turbo Pascal built-in routines onto their C++
//! equivalents, sharing the name list seeded into the symbol table by
//! `symbol_table::SymbolTable::seed_builtins` so the two never drift.

use crate::ast::Expression;

use super::expressions::emit_expression;
use super::Emitter;

pub(super) fn emit_call(emitter: &mut Emitter, callee: &str, args: &[Expression]) -> String {
    let lower = callee.to_ascii_lowercase();
    match lower.as_str() {
        "write" => emit_write(emitter, args, false),
        "writeln" => emit_write(emitter, args, true),
        "read" => emit_read(emitter, args, false),
        "readln" => emit_read(emitter, args, true),
        "length" => unary_call(emitter, args, |a| format!("static_cast<int32_t>({}.size())", a)),
        "copy" => ternary_method(emitter, args, "substr"),
        "pos" => {
            let a = emit_args(emitter, args);
            format!(
                "(({1}.find({0}) == std::string::npos) ? 0 : static_cast<int32_t>({1}.find({0}) + 1))",
                a.first().cloned().unwrap_or_default(),
                a.get(1).cloned().unwrap_or_default()
            )
        }
        "insert" => {
            emitter.note_runtime_ref("pascal_insert");
            format!("pascal_insert({})", emit_args(emitter, args).join(", "))
        }
        "delete" => {
            emitter.note_runtime_ref("pascal_delete");
            format!("pascal_delete({})", emit_args(emitter, args).join(", "))
        }
        "trim" => {
            emitter.note_runtime_ref("pascal_trim");
            format!("pascal_trim({})", emit_args(emitter, args).join(", "))
        }
        "trimleft" => {
            emitter.note_runtime_ref("pascal_trimleft");
            format!("pascal_trimleft({})", emit_args(emitter, args).join(", "))
        }
        "trimright" => {
            emitter.note_runtime_ref("pascal_trimright");
            format!("pascal_trimright({})", emit_args(emitter, args).join(", "))
        }
        "stringofchar" => {
            emitter.note_runtime_ref("pascal_stringofchar");
            format!("pascal_stringofchar({})", emit_args(emitter, args).join(", "))
        }
        "lowercase" => {
            emitter.note_runtime_ref("pascal_lowercase");
            format!("pascal_lowercase({})", emit_args(emitter, args).join(", "))
        }
        "uppercase" => {
            emitter.note_runtime_ref("pascal_uppercase");
            format!("pascal_uppercase({})", emit_args(emitter, args).join(", "))
        }
        "leftstr" => {
            emitter.note_runtime_ref("pascal_leftstr");
            format!("pascal_leftstr({})", emit_args(emitter, args).join(", "))
        }
        "rightstr" => {
            emitter.note_runtime_ref("pascal_rightstr");
            format!("pascal_rightstr({})", emit_args(emitter, args).join(", "))
        }
        "padleft" => {
            emitter.note_runtime_ref("pascal_padleft");
            format!("pascal_padleft({})", emit_args(emitter, args).join(", "))
        }
        "padright" => {
            emitter.note_runtime_ref("pascal_padright");
            format!("pascal_padright({})", emit_args(emitter, args).join(", "))
        }
        "concat" => format!("({})", emit_args(emitter, args).join(" + ")),
        "str" => {
            let a = emit_args(emitter, args);
            format!("std::to_string({})", a.first().cloned().unwrap_or_default())
        }
        "val" => {
            let a = emit_args(emitter, args);
            format!("std::stod({})", a.first().cloned().unwrap_or_default())
        }
        "abs" => unary_call(emitter, args, |a| format!("std::abs({})", a)),
        "sqr" => unary_call(emitter, args, |a| format!("({0} * {0})", a)),
        "sqrt" => unary_call(emitter, args, |a| format!("std::sqrt({})", a)),
        "sin" => unary_call(emitter, args, |a| format!("std::sin({})", a)),
        "cos" => unary_call(emitter, args, |a| format!("std::cos({})", a)),
        "arctan" => unary_call(emitter, args, |a| format!("std::atan({})", a)),
        "exp" => unary_call(emitter, args, |a| format!("std::exp({})", a)),
        "ln" => unary_call(emitter, args, |a| format!("std::log({})", a)),
        "trunc" => unary_call(emitter, args, |a| format!("static_cast<int32_t>(std::trunc({}))", a)),
        "round" => unary_call(emitter, args, |a| format!("static_cast<int32_t>(std::lround({}))", a)),
        "frac" => unary_call(emitter, args, |a| format!("std::fmod({}, 1.0)", a)),
        "int" => unary_call(emitter, args, |a| format!("std::trunc({})", a)),
        "random" => {
            if args.is_empty() {
                "pascal_random()".to_string()
            } else {
                unary_call(emitter, args, |a| format!("pascal_random({})", a))
            }
        }
        "randomize" => "pascal_randomize()".to_string(),
        "odd" => unary_call(emitter, args, |a| format!("(({}) % 2 != 0)", a)),
        "ord" => unary_call(emitter, args, |a| format!("static_cast<int32_t>({})", a)),
        "chr" => unary_call(emitter, args, |a| format!("static_cast<char>({})", a)),
        "succ" => unary_call(emitter, args, |a| format!("({} + 1)", a)),
        "pred" => unary_call(emitter, args, |a| format!("({} - 1)", a)),
        "hi" => unary_call(emitter, args, |a| format!("static_cast<uint8_t>(({} >> 8) & 0xFF)", a)),
        "lo" => unary_call(emitter, args, |a| format!("static_cast<uint8_t>({} & 0xFF)", a)),
        "swap" => unary_call(emitter, args, |a| format!("pascal_swap({})", a)),
        "new" => unary_call(emitter, args, |a| format!("({} = new std::remove_reference_t<decltype(*{0})>())", a)),
        "dispose" => unary_call(emitter, args, |a| format!("delete {}", a)),
        "getmem" => {
            let a = emit_args(emitter, args);
            format!(
                "({} = static_cast<decltype({0})>(std::malloc({})))",
                a.first().cloned().unwrap_or_default(),
                a.get(1).cloned().unwrap_or_default()
            )
        }
        "freemem" => unary_call(emitter, args, |a| format!("std::free({})", a)),
        "addr" => unary_call(emitter, args, |a| format!("(&{})", a)),
        "inc" => emit_incdec(emitter, args, "+="),
        "dec" => emit_incdec(emitter, args, "-="),
        "halt" => {
            if args.is_empty() {
                "std::exit(0)".to_string()
            } else {
                unary_call(emitter, args, |a| format!("std::exit({})", a))
            }
        }
        "exit" => "return".to_string(),
        "paramcount" => "pascal_paramcount()".to_string(),
        "paramstr" => unary_call(emitter, args, |a| format!("pascal_paramstr({})", a)),
        "eof" => {
            emitter.note_runtime_ref("ioresult");
            unary_call(emitter, args, |a| format!("{}.eof()", a))
        }
        "assign" => binary_method(emitter, args, "assign"),
        "reset" => unary_call(emitter, args, |a| format!("{}.reset()", a)),
        "rewrite" => unary_call(emitter, args, |a| format!("{}.rewrite()", a)),
        "append" => unary_call(emitter, args, |a| format!("{}.append()", a)),
        "close" => unary_call(emitter, args, |a| format!("{}.close()", a)),
        "blockwrite" => {
            emitter.note_runtime_ref("pascal_blockwrite");
            format!("pascal_blockwrite({})", emit_args(emitter, args).join(", "))
        }
        "blockread" => {
            emitter.note_runtime_ref("pascal_blockread");
            format!("pascal_blockread({})", emit_args(emitter, args).join(", "))
        }
        "filepos" => {
            emitter.note_runtime_ref("pascal_filepos");
            unary_call(emitter, args, |a| format!("pascal_filepos({})", a))
        }
        "filesize" => {
            emitter.note_runtime_ref("pascal_filesize");
            unary_call(emitter, args, |a| format!("pascal_filesize({})", a))
        }
        "seek" => {
            emitter.note_runtime_ref("pascal_seek");
            format!("pascal_seek({})", emit_args(emitter, args).join(", "))
        }
        "ioresult" => {
            emitter.note_runtime_ref("ioresult");
            "ioresult()".to_string()
        }
        "textcolor" => unary_call(emitter, args, |a| format!("pascal_textcolor({})", a)),
        "textbackground" => unary_call(emitter, args, |a| format!("pascal_textbackground({})", a)),
        "clrscr" => "pascal_clrscr()".to_string(),
        "gotoxy" => format!("pascal_gotoxy({})", emit_args(emitter, args).join(", ")),
        _ => {
            // Not a recognised builtin: emit a plain call against the
            // user-declared (possibly mangled) routine.
            let mangled = super::program::mangled_call_name(emitter, callee, args);
            format!("{}({})", mangled, emit_args(emitter, args).join(", "))
        }
    }
}

/// `write`/`writeln` are variadic and chain onto `std::cout`; a
/// `Formatted` argument already carries its own `std::setw`/`setprecision`
/// manipulators from expression emission, so this just streams each
/// argument in order and appends `std::endl` for the `ln` form.
fn emit_write(emitter: &mut Emitter, args: &[Expression], newline: bool) -> String {
    let mut chain = String::from("std::cout");
    for a in args {
        chain.push_str(" << ");
        chain.push_str(&emit_expression(emitter, a));
    }
    if newline {
        chain.push_str(" << std::endl");
    }
    chain
}

/// `read`/`readln` are variadic and chain onto `std::cin`; a bare
/// `readln` with no arguments only needs to discard the rest of the
/// line, and a `readln` with arguments discards the line-ending after
/// its last extraction the same way the Pascal runtime would.
fn emit_read(emitter: &mut Emitter, args: &[Expression], newline: bool) -> String {
    let discard = "std::cin.ignore(std::numeric_limits<std::streamsize>::max(), '\\n')";
    if args.is_empty() {
        return discard.to_string();
    }
    let mut chain = String::from("std::cin");
    for a in args {
        chain.push_str(" >> ");
        chain.push_str(&emit_expression(emitter, a));
    }
    if newline {
        return format!("({}, {})", chain, discard);
    }
    chain
}

fn emit_args(emitter: &mut Emitter, args: &[Expression]) -> Vec<String> {
    args.iter().map(|a| emit_expression(emitter, a)).collect()
}

fn unary_call(emitter: &mut Emitter, args: &[Expression], f: impl Fn(String) -> String) -> String {
    let a = emit_args(emitter, args);
    f(a.first().cloned().unwrap_or_else(|| "/* UNKNOWN_ARG */".to_string()))
}

fn binary_method(emitter: &mut Emitter, args: &[Expression], method: &str) -> String {
    let a = emit_args(emitter, args);
    format!(
        "{}.{}({})",
        a.first().cloned().unwrap_or_default(),
        method,
        a.get(1).cloned().unwrap_or_default()
    )
}

fn ternary_method(emitter: &mut Emitter, args: &[Expression], method: &str) -> String {
    let a = emit_args(emitter, args);
    format!(
        "{}.{}({}, {})",
        a.first().cloned().unwrap_or_default(),
        method,
        a.get(1).cloned().unwrap_or_default(),
        a.get(2).cloned().unwrap_or_default()
    )
}

/// `inc(x)` / `inc(x, n)` and `dec` share the same shape: an optional
/// second argument defaults to 1.
fn emit_incdec(emitter: &mut Emitter, args: &[Expression], op: &str) -> String {
    let a = emit_args(emitter, args);
    let target = a.first().cloned().unwrap_or_default();
    let amount = a.get(1).cloned().unwrap_or_else(|| "1".to_string());
    format!("{} {} {}", target, op, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::parser::Parser;

    fn codegen_expr(src_call: &str) -> String {
        let full = format!("program P; begin {} end.", src_call);
        let mut parser = Parser::new(&full);
        let program = parser.parse_program().unwrap();
        let analyzer = Analyzer::new();
        let mut emitter = Emitter {
            out: String::new(),
            indent: 0,
            symbols: &analyzer.symbols,
            records: analyzer.record_registry(),
            enums: analyzer.enum_registry(),
            enum_types: analyzer.enum_type_registry(),
            runtime_refs: Default::default(),
        };
        match &program.main_block[0] {
            crate::ast::Statement::Expression(e) => emit_expression(&mut emitter, e),
            _ => panic!("expected expression statement"),
        }
    }

    #[test]
    fn length_maps_to_size() {
        assert_eq!(codegen_expr("length(s)"), "static_cast<int32_t>(s.size())");
    }

    #[test]
    fn sqrt_maps_to_std_sqrt() {
        assert_eq!(codegen_expr("sqrt(x)"), "std::sqrt(x)");
    }

    #[test]
    fn inc_without_amount_defaults_to_one() {
        assert_eq!(codegen_expr("inc(i)"), "i += 1");
    }

    #[test]
    fn read_chains_onto_cin() {
        assert_eq!(codegen_expr("read(x)"), "std::cin >> x");
    }

    #[test]
    fn readln_with_args_discards_rest_of_line() {
        assert_eq!(
            codegen_expr("readln(x)"),
            "(std::cin >> x, std::cin.ignore(std::numeric_limits<std::streamsize>::max(), '\\n'))"
        );
    }
}
