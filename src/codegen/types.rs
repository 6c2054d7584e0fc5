//! Pascal-to-C++ type name mapping.

use super::Emitter;

/// Maps a Pascal type name (after alias resolution) to its C++ spelling.
/// Structured type text (`array[...]`, `record ... end`, `set of ...`,
/// `^T`, `string[N]`) is rewritten into the nearest idiomatic C++ shape;
/// anything unrecognised degrades to the resolved name itself so the
/// emitted code still compiles against a hand-written `using` alias.
pub(super) fn map_type(emitter: &Emitter, pascal_type: &str) -> String {
    let lower_name = pascal_type.to_ascii_lowercase();
    if emitter.records.contains_key(&lower_name) || emitter.enum_types.contains_key(&lower_name) {
        return super::expressions::cpp_ident(pascal_type);
    }
    let resolved = emitter.symbols.resolve_data_type(pascal_type);
    map_resolved(emitter, &resolved)
}

fn map_resolved(emitter: &Emitter, resolved: &str) -> String {
    let lower = resolved.to_ascii_lowercase();
    match lower.as_str() {
        "integer" | "longint" => return "int32_t".to_string(),
        "byte" => return "uint8_t".to_string(),
        "real" | "double" => return "double".to_string(),
        "boolean" => return "bool".to_string(),
        "char" => return "char".to_string(),
        "string" => return "std::string".to_string(),
        "text" => return "PascalFile".to_string(),
        "file" => return "PascalFile".to_string(),
        "pointer" => return "void*".to_string(),
        _ => {}
    }

    if let Some(inner) = lower.strip_prefix('^') {
        return format!("{}*", map_resolved(emitter, inner));
    }
    if let Some(rest) = lower.strip_prefix("string[") {
        let cap = rest
            .strip_suffix(']')
            .and_then(|n| n.trim().parse::<u32>().ok())
            .unwrap_or(255);
        return format!("PascalBoundedString<{}>", cap);
    }
    if let Some(rest) = lower.strip_prefix("array of ") {
        return format!("std::vector<{}>", map_resolved(emitter, rest));
    }
    if lower.starts_with("array[") {
        if let Some(of_idx) = lower.find(" of ") {
            let elem = &resolved[of_idx + 4..];
            // Reject multi-dimensional arrays down to their element type
            // wrapped once; each bracketed dimension becomes a std::array
            // rank, innermost first.
            let dims_text = &lower[6..lower.find(']').unwrap_or(lower.len())];
            let mut ty = map_resolved(emitter, elem);
            for dim in dims_text.split(',').rev() {
                let count = subrange_len(dim);
                ty = format!("std::array<{}, {}>", ty, count);
            }
            return ty;
        }
    }
    if let Some(rest) = lower.strip_prefix("set of ") {
        let _ = rest;
        return "std::bitset<256>".to_string();
    }
    if lower.starts_with("file of ") {
        return "PascalTypedFile".to_string();
    }
    if lower.starts_with("record ") {
        // Anonymous record literal type text; named records are emitted as
        // their own struct and referenced by name instead.
        return "struct { /* anonymous record */ }".to_string();
    }
    if lower.contains("..") {
        // Bare subrange used as a type: its representation is its base
        // integer width.
        return "int32_t".to_string();
    }
    // Enum text `(a,b,c)` or an unresolved alias: pass the name through so
    // it resolves against a generated `enum class` or `using` declaration.
    resolved.to_string()
}

/// Computes an inclusive element count for a Pascal subrange bound like
/// `0..9` or `'a'..'z'`; falls back to 1 when the bound text is not a
/// simple integer/char subrange (e.g. a named ordinal type used as an
/// array index), since that case has no fixed compile-time count here.
fn subrange_len(dim: &str) -> usize {
    if let Some((lo, hi)) = dim.split_once("..") {
        let lo = lo.trim();
        let hi = hi.trim();
        if let (Ok(lo_n), Ok(hi_n)) = (lo.parse::<i64>(), hi.parse::<i64>()) {
            return (hi_n - lo_n + 1).max(0) as usize;
        }
        if lo.len() == 3 && hi.len() == 3 && lo.starts_with('\'') && hi.starts_with('\'') {
            let lo_c = lo.chars().nth(1).unwrap_or('a') as i64;
            let hi_c = hi.chars().nth(1).unwrap_or('a') as i64;
            return (hi_c - lo_c + 1).max(0) as usize;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::SymbolTable;
    use std::collections::{HashMap, HashSet};

    fn test_emitter<'a>(
        table: &'a SymbolTable,
        records: &'a HashMap<String, crate::analyzer::RecordInfo>,
        enums: &'a HashMap<String, i64>,
        enum_types: &'a HashMap<String, Vec<String>>,
    ) -> Emitter<'a> {
        Emitter {
            out: String::new(),
            indent: 0,
            symbols: table,
            records,
            enums,
            enum_types,
            runtime_refs: HashSet::new(),
        }
    }

    #[test]
    fn maps_scalar_types() {
        let table = SymbolTable::new();
        let records = HashMap::new();
        let enums = HashMap::new();
        let enum_types = HashMap::new();
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(map_type(&emitter, "integer"), "int32_t");
        assert_eq!(map_type(&emitter, "String"), "std::string");
        assert_eq!(map_type(&emitter, "boolean"), "bool");
    }

    #[test]
    fn maps_fixed_array() {
        let table = SymbolTable::new();
        let records = HashMap::new();
        let enums = HashMap::new();
        let enum_types = HashMap::new();
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(
            map_type(&emitter, "array[0..9] of integer"),
            "std::array<int32_t, 10>"
        );
    }

    #[test]
    fn maps_bounded_string_to_capped_wrapper() {
        let table = SymbolTable::new();
        let records = HashMap::new();
        let enums = HashMap::new();
        let enum_types = HashMap::new();
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(
            map_type(&emitter, "string[20]"),
            "PascalBoundedString<20>"
        );
    }

    #[test]
    fn maps_pointer_type() {
        let table = SymbolTable::new();
        let records = HashMap::new();
        let enums = HashMap::new();
        let enum_types = HashMap::new();
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(map_type(&emitter, "^integer"), "int32_t*");
    }

    #[test]
    fn named_record_type_keeps_its_name() {
        let table = SymbolTable::new();
        let mut records = HashMap::new();
        records.insert(
            "point".to_string(),
            crate::analyzer::RecordInfo { fields: Vec::new() },
        );
        let enums = HashMap::new();
        let enum_types = HashMap::new();
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(map_type(&emitter, "Point"), "Point");
    }

    #[test]
    fn named_enum_type_keeps_its_name() {
        let table = SymbolTable::new();
        let records = HashMap::new();
        let enums = HashMap::new();
        let mut enum_types = HashMap::new();
        enum_types.insert(
            "color".to_string(),
            vec!["Red".to_string(), "Green".to_string(), "Blue".to_string()],
        );
        let emitter = test_emitter(&table, &records, &enums, &enum_types);
        assert_eq!(map_type(&emitter, "Color"), "Color");
    }
}
