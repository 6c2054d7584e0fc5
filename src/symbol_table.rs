//! Hierarchical symbol table: nested scopes, overload sets keyed by
//! parameter-type signature, and the seeded built-in symbol list shared
//! with the code generator's builtin dispatch table.

use std::collections::HashMap;

use crate::ast::ParamMode;

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable {
        type_name: String,
        mode: ParamMode,
    },
    Constant {
        type_name: String,
    },
    TypeAlias {
        type_name: String,
    },
    Procedure {
        params: Vec<(String, ParamMode)>,
    },
    Function {
        params: Vec<(String, ParamMode)>,
        return_type: String,
    },
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// True for symbols seeded by the compiler rather than declared in the
    /// program/unit being compiled.
    pub is_builtin: bool,
    /// True once a forward-declared routine has been matched by its
    /// implementation.
    pub is_defined: bool,
}

impl Symbol {
    /// The parameter-type signature used to distinguish overloads,
    /// e.g. `"integer,integer"`. Empty for non-callables.
    pub fn signature(&self) -> String {
        match &self.kind {
            SymbolKind::Procedure { params } | SymbolKind::Function { params, .. } => params
                .iter()
                .map(|(t, _)| t.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(","),
            _ => String::new(),
        }
    }

    /// The return type for a function, lower-cased so a forward
    /// declaration and its implementation compare equal regardless of
    /// case; `None` for procedures and non-callables, since they have no
    /// return type to match against.
    pub fn return_type(&self) -> Option<String> {
        match &self.kind {
            SymbolKind::Function { return_type, .. } => Some(return_type.to_ascii_lowercase()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    /// Lower-cased name -> overload set. Non-callables always have exactly
    /// one entry; callables may have several distinguished by signature.
    symbols: HashMap<String, Vec<Symbol>>,
}

/// A stack of lexical scopes, innermost last. Lookups walk outward.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: vec![Scope::default()],
        };
        table.seed_builtins();
        table
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Defines a non-overloadable symbol in the current scope. Returns an
    /// error describing the prior definition if one already exists here.
    pub fn define(&mut self, symbol: Symbol) -> Result<(), String> {
        let key = symbol.name.to_ascii_lowercase();
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if let Some(existing) = scope.symbols.get(&key) {
            if !existing.is_empty() {
                return Err(format!(
                    "'{}' is already declared in this scope",
                    symbol.name
                ));
            }
        }
        scope.symbols.insert(key, vec![symbol]);
        Ok(())
    }

    /// Defines a procedure/function overload. Two overloads in the same
    /// scope with identical signatures is an error (duplicate).
    pub fn define_overloaded(&mut self, symbol: Symbol) -> Result<(), String> {
        let key = symbol.name.to_ascii_lowercase();
        let sig = symbol.signature();
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        let entries = scope.symbols.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|s| s.signature() == sig) {
            if existing.is_defined && symbol.is_defined {
                return Err(format!(
                    "'{}' is already defined with this parameter signature",
                    symbol.name
                ));
            }
            // A forward-declared function's implementation must return the
            // same type; the parameter signature alone isn't enough to tell
            // the two apart from an incompatible redeclaration.
            if existing.return_type() != symbol.return_type() {
                return Err(format!(
                    "'{}' return type does not match its forward declaration",
                    symbol.name
                ));
            }
            // Forward declaration being matched by its implementation.
            *existing = symbol;
        } else {
            entries.push(symbol);
        }
        Ok(())
    }

    /// Looks up a non-overloaded symbol (variable, constant, type, unit) by
    /// name, innermost scope first. For callables returns the first match;
    /// use `lookup_all_overloads` to disambiguate by argument types.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        for scope in self.scopes.iter().rev() {
            if let Some(entries) = scope.symbols.get(&key) {
                if let Some(first) = entries.first() {
                    return Some(first);
                }
            }
        }
        None
    }

    /// All overloads of `name` visible from the current scope, innermost
    /// scope's overload set taking precedence over outer ones entirely
    /// (Pascal scoping does not merge overload sets across scopes).
    pub fn lookup_all_overloads(&self, name: &str) -> Vec<&Symbol> {
        let key = name.to_ascii_lowercase();
        for scope in self.scopes.iter().rev() {
            if let Some(entries) = scope.symbols.get(&key) {
                if !entries.is_empty() {
                    return entries.iter().collect();
                }
            }
        }
        Vec::new()
    }

    /// Picks the overload whose parameter types match `arg_types` exactly;
    /// falls back to the only overload when there is no ambiguity.
    pub fn lookup_function(&self, name: &str, arg_types: &[String]) -> Option<&Symbol> {
        let overloads = self.lookup_all_overloads(name);
        if overloads.len() == 1 {
            return overloads.into_iter().next();
        }
        let wanted = arg_types
            .iter()
            .map(|t| t.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        overloads.into_iter().find(|s| s.signature() == wanted)
    }

    /// Resolves a type name through alias chains to its ultimate
    /// definition text, stopping at built-in type names or after
    /// `max_hops` steps to guard against a cyclic alias.
    pub fn resolve_data_type(&self, name: &str) -> String {
        const MAX_HOPS: usize = 32;
        let mut current = name.to_string();
        for _ in 0..MAX_HOPS {
            match self.lookup(&current) {
                Some(Symbol {
                    kind: SymbolKind::TypeAlias { type_name },
                    ..
                }) if !type_name.eq_ignore_ascii_case(&current) => {
                    current = type_name.clone();
                }
                _ => break,
            }
        }
        current
    }

    fn define_builtin_fn(&mut self, name: &str, params: &[&str], return_type: &str) {
        let _ = self.define_overloaded(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function {
                params: params.iter().map(|p| (p.to_string(), ParamMode::Value)).collect(),
                return_type: return_type.to_string(),
            },
            is_builtin: true,
            is_defined: true,
        });
    }

    fn define_builtin_proc(&mut self, name: &str, params: &[&str]) {
        let _ = self.define_overloaded(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Procedure {
                params: params.iter().map(|p| (p.to_string(), ParamMode::Value)).collect(),
            },
            is_builtin: true,
            is_defined: true,
        });
    }

    fn define_builtin_const(&mut self, name: &str, type_name: &str) {
        let _ = self.define(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Constant {
                type_name: type_name.to_string(),
            },
            is_builtin: true,
            is_defined: true,
        });
    }

    /// Seeds the global scope with the frozen built-in list shared with
    /// `codegen::builtins`. Variadic constructs (`write`/`writeln`/`str`/
    /// `val`) are registered with an empty parameter list; call checking
    /// treats them specially rather than through signature matching.
    fn seed_builtins(&mut self) {
        // I/O
        self.define_builtin_proc("write", &[]);
        self.define_builtin_proc("writeln", &[]);
        self.define_builtin_proc("read", &[]);
        self.define_builtin_proc("readln", &[]);
        self.define_builtin_proc("assign", &["text", "string"]);
        self.define_builtin_proc("reset", &["text"]);
        self.define_builtin_proc("rewrite", &["text"]);
        self.define_builtin_proc("append", &["text"]);
        self.define_builtin_proc("close", &["text"]);
        self.define_builtin_fn("eof", &["text"], "boolean");
        self.define_builtin_fn("eoln", &["text"], "boolean");
        self.define_builtin_proc("blockwrite", &["file", "pointer", "integer"]);
        self.define_builtin_proc("blockread", &["file", "pointer", "integer"]);
        self.define_builtin_fn("filepos", &["file"], "longint");
        self.define_builtin_fn("filesize", &["file"], "longint");
        self.define_builtin_proc("seek", &["file", "longint"]);
        self.define_builtin_fn("ioresult", &[], "integer");

        // String
        self.define_builtin_fn("length", &["string"], "integer");
        self.define_builtin_fn("copy", &["string", "integer", "integer"], "string");
        self.define_builtin_proc("insert", &["string", "string", "integer"]);
        self.define_builtin_proc("delete", &["string", "integer", "integer"]);
        self.define_builtin_fn("pos", &["string", "string"], "integer");
        self.define_builtin_fn("concat", &[], "string");
        self.define_builtin_proc("str", &[]);
        self.define_builtin_proc("val", &[]);
        self.define_builtin_fn("trim", &["string"], "string");
        self.define_builtin_fn("trimleft", &["string"], "string");
        self.define_builtin_fn("trimright", &["string"], "string");
        self.define_builtin_fn("stringofchar", &["char", "integer"], "string");
        self.define_builtin_fn("lowercase", &["string"], "string");
        self.define_builtin_fn("uppercase", &["string"], "string");
        self.define_builtin_fn("leftstr", &["string", "integer"], "string");
        self.define_builtin_fn("rightstr", &["string", "integer"], "string");
        self.define_builtin_fn("padleft", &["string", "integer"], "string");
        self.define_builtin_fn("padright", &["string", "integer"], "string");

        // Pointer / memory
        self.define_builtin_proc("new", &["pointer"]);
        self.define_builtin_proc("dispose", &["pointer"]);
        self.define_builtin_proc("getmem", &["pointer", "integer"]);
        self.define_builtin_proc("freemem", &["pointer", "integer"]);
        self.define_builtin_fn("addr", &["any"], "pointer");

        // Math
        self.define_builtin_fn("abs", &["real"], "real");
        self.define_builtin_fn("sqr", &["real"], "real");
        self.define_builtin_fn("sqrt", &["real"], "real");
        self.define_builtin_fn("sin", &["real"], "real");
        self.define_builtin_fn("cos", &["real"], "real");
        self.define_builtin_fn("arctan", &["real"], "real");
        self.define_builtin_fn("exp", &["real"], "real");
        self.define_builtin_fn("ln", &["real"], "real");
        self.define_builtin_fn("trunc", &["real"], "longint");
        self.define_builtin_fn("round", &["real"], "longint");
        self.define_builtin_fn("frac", &["real"], "real");
        self.define_builtin_fn("int", &["real"], "real");
        self.define_builtin_fn("random", &[], "real");
        self.define_builtin_proc("randomize", &[]);
        self.define_builtin_fn("odd", &["longint"], "boolean");
        self.define_builtin_fn("ord", &["any"], "longint");
        self.define_builtin_fn("chr", &["integer"], "char");
        self.define_builtin_fn("succ", &["any"], "any");
        self.define_builtin_fn("pred", &["any"], "any");
        self.define_builtin_fn("hi", &["integer"], "byte");
        self.define_builtin_fn("lo", &["integer"], "byte");
        self.define_builtin_fn("swap", &["integer"], "integer");

        // System
        self.define_builtin_proc("halt", &[]);
        self.define_builtin_proc("exit", &[]);
        self.define_builtin_proc("inc", &[]);
        self.define_builtin_proc("dec", &[]);
        self.define_builtin_fn("paramcount", &[], "integer");
        self.define_builtin_fn("paramstr", &["integer"], "string");

        // CRT colour constants
        for (i, name) in [
            "black", "blue", "green", "cyan", "red", "magenta", "brown", "lightgray",
            "darkgray", "lightblue", "lightgreen", "lightcyan", "lightred", "lightmagenta",
            "yellow", "white",
        ]
        .iter()
        .enumerate()
        {
            self.define_builtin_const(name, "integer");
            let _ = i;
        }
        self.define_builtin_proc("textcolor", &["integer"]);
        self.define_builtin_proc("textbackground", &["integer"]);
        self.define_builtin_proc("clrscr", &[]);
        self.define_builtin_proc("gotoxy", &["integer", "integer"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_preseeded() {
        let table = SymbolTable::new();
        assert!(table.lookup("writeln").is_some());
        assert!(table.lookup("Writeln").is_some());
        assert!(table.lookup("sqrt").is_some());
    }

    #[test]
    fn duplicate_non_overload_definition_errors() {
        let mut table = SymbolTable::new();
        table
            .define(Symbol {
                name: "x".into(),
                kind: SymbolKind::Variable {
                    type_name: "integer".into(),
                    mode: ParamMode::Value,
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        let err = table.define(Symbol {
            name: "X".into(),
            kind: SymbolKind::Variable {
                type_name: "integer".into(),
                mode: ParamMode::Value,
            },
            is_builtin: false,
            is_defined: true,
        });
        assert!(err.is_err());
    }

    #[test]
    fn overloads_distinguished_by_signature() {
        let mut table = SymbolTable::new();
        table
            .define_overloaded(Symbol {
                name: "add".into(),
                kind: SymbolKind::Function {
                    params: vec![("integer".into(), ParamMode::Value), ("integer".into(), ParamMode::Value)],
                    return_type: "integer".into(),
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        table
            .define_overloaded(Symbol {
                name: "add".into(),
                kind: SymbolKind::Function {
                    params: vec![("real".into(), ParamMode::Value), ("real".into(), ParamMode::Value)],
                    return_type: "real".into(),
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        assert_eq!(table.lookup_all_overloads("add").len(), 2);
        let picked = table
            .lookup_function("add", &["real".into(), "real".into()])
            .unwrap();
        assert_eq!(picked.signature(), "real,real");
    }

    #[test]
    fn forward_declaration_matched_by_implementation_is_not_a_duplicate_error() {
        let mut table = SymbolTable::new();
        table
            .define_overloaded(Symbol {
                name: "f".into(),
                kind: SymbolKind::Function {
                    params: vec![("integer".into(), ParamMode::Value)],
                    return_type: "integer".into(),
                },
                is_builtin: false,
                is_defined: false,
            })
            .unwrap();
        table
            .define_overloaded(Symbol {
                name: "f".into(),
                kind: SymbolKind::Function {
                    params: vec![("integer".into(), ParamMode::Value)],
                    return_type: "integer".into(),
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        assert_eq!(table.lookup_all_overloads("f").len(), 1);
        assert!(table.lookup_all_overloads("f")[0].is_defined);
    }

    #[test]
    fn forward_declaration_with_mismatched_return_type_errors() {
        let mut table = SymbolTable::new();
        table
            .define_overloaded(Symbol {
                name: "f".into(),
                kind: SymbolKind::Function {
                    params: vec![("integer".into(), ParamMode::Value)],
                    return_type: "integer".into(),
                },
                is_builtin: false,
                is_defined: false,
            })
            .unwrap();
        let err = table.define_overloaded(Symbol {
            name: "f".into(),
            kind: SymbolKind::Function {
                params: vec![("integer".into(), ParamMode::Value)],
                return_type: "boolean".into(),
            },
            is_builtin: false,
            is_defined: true,
        });
        assert!(err.is_err());
    }

    #[test]
    fn scopes_shadow_and_restore() {
        let mut table = SymbolTable::new();
        table
            .define(Symbol {
                name: "x".into(),
                kind: SymbolKind::Variable {
                    type_name: "integer".into(),
                    mode: ParamMode::Value,
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        table.enter_scope();
        table
            .define(Symbol {
                name: "x".into(),
                kind: SymbolKind::Variable {
                    type_name: "string".into(),
                    mode: ParamMode::Value,
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        assert!(matches!(
            table.lookup("x").unwrap().kind,
            SymbolKind::Variable { ref type_name, .. } if type_name == "string"
        ));
        table.exit_scope();
        assert!(matches!(
            table.lookup("x").unwrap().kind,
            SymbolKind::Variable { ref type_name, .. } if type_name == "integer"
        ));
    }

    #[test]
    fn resolve_data_type_follows_alias_chain() {
        let mut table = SymbolTable::new();
        table
            .define(Symbol {
                name: "Age".into(),
                kind: SymbolKind::TypeAlias {
                    type_name: "SmallNumber".into(),
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        table
            .define(Symbol {
                name: "SmallNumber".into(),
                kind: SymbolKind::TypeAlias {
                    type_name: "integer".into(),
                },
                is_builtin: false,
                is_defined: true,
            })
            .unwrap();
        assert_eq!(table.resolve_data_type("Age"), "integer");
    }
}
