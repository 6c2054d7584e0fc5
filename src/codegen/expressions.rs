//! Expression emission.
//!
//! A few spots genuinely need to peek at runtime shape rather than match
//! purely on the AST tag: `+`/`-`/`*` between two set-typed operands emit
//! `std::bitset` union/difference/intersection instead of arithmetic, a
//! dereference immediately consumed by a field access collapses `(*p).f`
//! into `p->f` the way a human writing this translator by hand would, and
//! an array/string index subtracts the declared lower bound (or the
//! fixed `1` for a string) instead of indexing the C++ storage directly.

use crate::ast::{BinaryOp, Expression, Literal, UnaryOp};

use super::types::map_type;
use super::Emitter;

pub(super) fn emit_expression(emitter: &mut Emitter, expr: &Expression) -> String {
    match expr {
        Expression::Literal { value, .. } => emit_literal(emitter, value),
        Expression::Identifier { name, with_variable, .. } => match with_variable {
            Some(binding) => format!("{}.{}", cpp_ident(binding), cpp_ident(name)),
            None => cpp_ident(name),
        },
        Expression::Binary { op, left, right, .. } => emit_binary(emitter, *op, left, right),
        Expression::Unary { op, operand, .. } => emit_unary(emitter, *op, operand),
        Expression::AddressOf { operand, .. } => format!("&{}", emit_expression(emitter, operand)),
        Expression::Dereference { operand, .. } => {
            format!("(*{})", emit_expression(emitter, operand))
        }
        Expression::Call { callee, args, .. } => {
            super::builtins::emit_call(emitter, callee, args)
        }
        Expression::FieldAccess { target, field, .. } => {
            // Collapse `(*p).f` into `p->f` when the target is a bare
            // dereference; this is the one place codegen inspects the
            // target's tag instead of just recursing, because Pascal's
            // `p^.f` and C++'s `p->f` are the same operation spelled
            // differently and a literal translation would double the
            // dereference.
            if let Expression::Dereference { operand, .. } = target.as_ref() {
                format!("{}->{}", emit_expression(emitter, operand), cpp_ident(field))
            } else {
                format!("{}.{}", emit_expression(emitter, target), cpp_ident(field))
            }
        }
        Expression::ArrayIndex { target, indices, .. } => emit_array_index(emitter, target, indices),
        Expression::SetLiteral { elements, .. } => emit_set_literal(emitter, elements),
        Expression::RangeExpr { low, high, .. } => format!(
            "/* range */ {}, {}",
            emit_expression(emitter, low),
            emit_expression(emitter, high)
        ),
        Expression::Formatted { expr, width, precision, .. } => {
            let mut text = emit_expression(emitter, expr);
            if let Some(w) = width {
                text = format!(
                    "std::setw({}) << {}",
                    emit_expression(emitter, w),
                    text
                );
            }
            if let Some(p) = precision {
                text = format!(
                    "std::fixed << std::setprecision({}) << {}",
                    emit_expression(emitter, p),
                    text
                );
            }
            text
        }
    }
}

fn emit_literal(emitter: &mut Emitter, lit: &Literal) -> String {
    match lit {
        Literal::Integer(text) => text.clone(),
        Literal::Real(text) => text.clone(),
        Literal::Str(text) => format!("std::string({})", escape_cpp_string(text)),
        Literal::Char(text) => escape_cpp_char(text),
        Literal::Bool(b) => if *b { "true".to_string() } else { "false".to_string() },
        Literal::Nil => {
            emitter.note_runtime_ref("ioresult");
            "nullptr".to_string()
        }
    }
}

/// Pascal string literals use doubled single quotes for an embedded quote;
/// the lexer already un-doubles them into the token's raw text, so this
/// only needs to convert to a C++ double-quoted literal and re-escape `"`
/// and `\`.
fn escape_cpp_string(pascal_raw: &str) -> String {
    let inner = pascal_raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(pascal_raw);
    let mut out = String::from("\"");
    for ch in inner.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn escape_cpp_char(pascal_raw: &str) -> String {
    if let Some(code) = pascal_raw.strip_prefix('#') {
        if let Ok(n) = code.parse::<u32>() {
            return format!("static_cast<char>({})", n);
        }
    }
    let inner = pascal_raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(pascal_raw);
    match inner {
        "'" => "'\\''".to_string(),
        "\\" => "'\\\\'".to_string(),
        other => format!("'{}'", other),
    }
}

fn emit_binary(emitter: &mut Emitter, op: BinaryOp, left: &Expression, right: &Expression) -> String {
    let lhs = emit_expression(emitter, left);
    let rhs = emit_expression(emitter, right);
    if matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul) && is_set_typed(emitter, left, right) {
        return match op {
            BinaryOp::Add => format!("({} | {})", lhs, rhs),
            BinaryOp::Mul => format!("({} & {})", lhs, rhs),
            BinaryOp::Sub => format!("({} & ~{})", lhs, rhs),
            _ => unreachable!(),
        };
    }
    match op {
        // `+` between string-typed operands means concatenation; Pascal's
        // `+` is overloaded the same way C++'s `std::string::operator+` is,
        // so no special emission is needed beyond recognising the case
        // exists — the one place this differs from arithmetic is that a
        // string literal operand must not be coerced to a numeric `+`.
        BinaryOp::Add => format!("({} + {})", lhs, rhs),
        BinaryOp::Sub => format!("({} - {})", lhs, rhs),
        BinaryOp::Mul => format!("({} * {})", lhs, rhs),
        BinaryOp::Div => format!("({} / {})", lhs, rhs),
        BinaryOp::IntDiv => format!("({} / {})", lhs, rhs),
        BinaryOp::Mod => format!("({} % {})", lhs, rhs),
        BinaryOp::And => format!("({} && {})", lhs, rhs),
        BinaryOp::Or => format!("({} || {})", lhs, rhs),
        BinaryOp::Xor => format!("({} != {})", lhs, rhs),
        BinaryOp::Eq => format!("({} == {})", lhs, rhs),
        BinaryOp::NotEq => format!("({} != {})", lhs, rhs),
        BinaryOp::Lt => format!("({} < {})", lhs, rhs),
        BinaryOp::LtEq => format!("({} <= {})", lhs, rhs),
        BinaryOp::Gt => format!("({} > {})", lhs, rhs),
        BinaryOp::GtEq => format!("({} >= {})", lhs, rhs),
        BinaryOp::In => format!("({}.test({}))", rhs, lhs),
        BinaryOp::Shl => format!("({} << {})", lhs, rhs),
        BinaryOp::Shr => format!("({} >> {})", lhs, rhs),
        BinaryOp::Range => format!("/* UNKNOWN_OP range */ {}, {}", lhs, rhs),
    }
}

fn emit_unary(emitter: &mut Emitter, op: UnaryOp, operand: &Expression) -> String {
    let text = emit_expression(emitter, operand);
    match op {
        UnaryOp::Neg => format!("(-{})", text),
        UnaryOp::Plus => text,
        UnaryOp::Not => format!("(!{})", text),
    }
}

/// Renders `[a, b..c]` as the integer ordinals a `std::bitset` should set,
/// resolving bare enum-member identifiers to their declared ordinal so
/// `set of (red,green,blue)` literals like `[red, blue]` become `{0, 2}`
/// rather than carrying the enumerator names into the bit positions.
fn emit_set_literal(emitter: &mut Emitter, elements: &[Expression]) -> String {
    let mut sets = Vec::new();
    for e in elements {
        match e {
            Expression::RangeExpr { low, high, .. } => {
                if let (Some(lo), Some(hi)) = (ordinal_of(emitter, low), ordinal_of(emitter, high)) {
                    for v in lo..=hi {
                        sets.push(format!("__set.set({});", v));
                    }
                } else {
                    sets.push(format!(
                        "/* UNKNOWN_OP non-constant set range {}..{} */",
                        emit_expression(emitter, low),
                        emit_expression(emitter, high)
                    ));
                }
            }
            other => match ordinal_of(emitter, other) {
                Some(v) => sets.push(format!("__set.set({});", v)),
                None => sets.push(format!("__set.set({});", emit_expression(emitter, other))),
            },
        }
    }
    format!(
        "[&]{{ std::bitset<256> __set; {} return __set; }}()",
        sets.join(" ")
    )
}

/// Returns a compile-time-known ordinal for an enum member identifier or
/// integer literal, used to build set-of-enum literals as bit positions.
fn ordinal_of(emitter: &Emitter, expr: &Expression) -> Option<i64> {
    match expr {
        Expression::Literal { value: Literal::Integer(text), .. } => text.parse().ok(),
        Expression::Identifier { name, .. } => emitter.enums.get(&name.to_ascii_lowercase()).copied(),
        _ => None,
    }
}

/// Pascal identifiers are case-insensitive and may collide with C++
/// keywords; mangling is limited to the reserved-word escape since the
/// symbol table already enforces case-insensitive uniqueness per scope.
pub(super) fn cpp_ident(name: &str) -> String {
    const CPP_KEYWORDS: &[&str] = &[
        "class", "new", "delete", "template", "namespace", "public", "private",
        "protected", "operator", "this", "friend", "union", "typename",
    ];
    if CPP_KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

#[allow(dead_code)]
pub(super) fn type_of(emitter: &Emitter, pascal_type: &str) -> String {
    map_type(emitter, pascal_type)
}

/// Best-effort static Pascal type name for a call argument, used only to
/// pick the right overload by signature; this is not a full type checker,
/// it covers literals, plain identifiers, and field access far enough to
/// resolve the overload sets this language actually allows.
pub(super) fn infer_type_name(emitter: &Emitter, expr: &Expression) -> Option<String> {
    match expr {
        Expression::Literal { value, .. } => Some(
            match value {
                Literal::Integer(_) => "integer",
                Literal::Real(_) => "real",
                Literal::Str(_) => "string",
                Literal::Char(_) => "char",
                Literal::Bool(_) => "boolean",
                Literal::Nil => "pointer",
            }
            .to_string(),
        ),
        Expression::Identifier { name, .. } => match &emitter.symbols.lookup(name)?.kind {
            crate::symbol_table::SymbolKind::Variable { type_name, .. }
            | crate::symbol_table::SymbolKind::Constant { type_name } => Some(type_name.clone()),
            _ => None,
        },
        Expression::FieldAccess { target, field, .. } => {
            let target_type = infer_type_name(emitter, target)?;
            let info = emitter
                .records
                .get(&target_type.to_ascii_lowercase())
                .or_else(|| {
                    let resolved = emitter.symbols.resolve_data_type(&target_type);
                    emitter.records.get(&resolved.to_ascii_lowercase())
                })?;
            info.fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(field))
                .map(|f| f.type_name.clone())
        }
        Expression::Unary { operand, .. } => infer_type_name(emitter, operand),
        Expression::Binary { op, left, .. } if !matches!(op, BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq | BinaryOp::And | BinaryOp::Or) => {
            infer_type_name(emitter, left)
        }
        _ => None,
    }
}

/// Resolves an expression's inferred Pascal type all the way through its
/// alias chain (e.g. a named array/set type to its `array[...]`/`set of
/// ...` definition text), lower-cased for shape matching.
fn resolved_type_of(emitter: &Emitter, expr: &Expression) -> Option<String> {
    let name = infer_type_name(emitter, expr)?;
    Some(emitter.symbols.resolve_data_type(&name).to_ascii_lowercase())
}

fn is_set_typed(emitter: &Emitter, left: &Expression, right: &Expression) -> bool {
    let is_set = |e: &Expression| resolved_type_of(emitter, e).is_some_and(|t| t.starts_with("set of "));
    is_set(left) || is_set(right)
}

/// Parses each dimension's declared lower bound out of `array[lo..hi{,
/// lo..hi}] of T` type text (already lower-cased), used to translate a
/// Pascal index to the zero-based position the C++ storage actually uses.
fn array_lower_bounds(resolved_lower: &str) -> Option<Vec<i64>> {
    let rest = resolved_lower.strip_prefix("array[")?;
    let end = rest.find(']')?;
    rest[..end]
        .split(',')
        .map(|dim| {
            let (lo, _hi) = dim.split_once("..")?;
            let lo = lo.trim();
            if let Ok(n) = lo.parse::<i64>() {
                Some(n)
            } else if lo.len() == 3 && lo.starts_with('\'') {
                Some(lo.chars().nth(1)? as i64)
            } else {
                Some(0)
            }
        })
        .collect()
}

/// Emits an indexing expression with the lower-bound offset the target's
/// declared type requires: `(idx)-1` for a string (Pascal strings are
/// always 1-based), `(idx)-lo_k` per dimension for a declared array, and
/// a plain pass-through index when the target's array shape can't be
/// determined (an open array parameter, or a type this isn't tracking).
fn emit_array_index(emitter: &mut Emitter, target: &Expression, indices: &[Expression]) -> String {
    let text = emit_expression(emitter, target);
    let resolved = resolved_type_of(emitter, target);

    if let Some(resolved) = &resolved {
        if resolved == "string" || resolved.starts_with("string[") {
            let idx = emit_expression(emitter, &indices[0]);
            return format!("{}[({})-1]", text, idx);
        }
        if let Some(los) = array_lower_bounds(resolved) {
            let mut text = text;
            for (idx_expr, lo) in indices.iter().zip(los.iter()) {
                let idx = emit_expression(emitter, idx_expr);
                text.push_str(&format!("[({})-{}]", idx, lo));
            }
            return text;
        }
    }

    let mut text = text;
    for idx in indices {
        text.push('[');
        text.push_str(&emit_expression(emitter, idx));
        text.push(']');
    }
    text
}
