//! Semantic analysis: builds the symbol table from declarations, matches
//! forward declarations to their implementations, resolves identifiers
//! reached through an active `with` context, and checks call arity against
//! the builtin and user-declared signatures.

use std::collections::HashMap;

use crate::ast::*;
use crate::symbol_table::{Symbol, SymbolKind, SymbolTable};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordInfo {
    pub fields: Vec<RecordField>,
}

pub struct Analyzer {
    pub symbols: SymbolTable,
    records: HashMap<String, RecordInfo>,
    /// Lower-cased enum member name -> its ordinal within its `(a,b,c)`
    /// declaration, used by code generation to turn a set-of-enum literal
    /// into integer bit positions.
    enum_ordinals: HashMap<String, i64>,
    /// Lower-cased enum type name -> its member list, used by code
    /// generation to recognise "this type name is an enum" without
    /// re-deriving it from the type's verbatim definition text.
    enum_types: HashMap<String, Vec<String>>,
    /// Stack of with-contexts; each frame holds the field names visible
    /// through each `with`-bound expression, innermost (last-listed in the
    /// clause) taking precedence on lookup within the same frame.
    with_stack: Vec<Vec<(String, Vec<String>)>>,
    errors: Vec<String>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer {
            symbols: SymbolTable::new(),
            records: HashMap::new(),
            enum_ordinals: HashMap::new(),
            enum_types: HashMap::new(),
            with_stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn record_registry(&self) -> &HashMap<String, RecordInfo> {
        &self.records
    }

    pub fn enum_registry(&self) -> &HashMap<String, i64> {
        &self.enum_ordinals
    }

    pub fn enum_type_registry(&self) -> &HashMap<String, Vec<String>> {
        &self.enum_types
    }

    fn error(&mut self, location: crate::token::SourceLocation, message: impl Into<String>) {
        self.errors.push(format!("{}: {}", location, message.into()));
    }

    /// Walks a declaration list for `uses` clauses, loads each named unit
    /// through `loader`, and declares its interface symbols into the
    /// current scope so calls into the unit type-check without re-analyzing
    /// the unit's own statement bodies (those were already checked when the
    /// unit itself was compiled).
    pub fn load_uses(
        &mut self,
        decls: &[Declaration],
        loader: &mut crate::unit_loader::UnitLoader,
    ) -> Result<(), crate::unit_loader::UnitLoadError> {
        for decl in decls {
            if let Declaration::Uses { unit_names, .. } = decl {
                for name in unit_names {
                    let mut interface_decls = loader.load(name)?.interface_declarations.clone();
                    for d in interface_decls.iter_mut() {
                        self.declare(d);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn analyze_program(&mut self, program: &mut Program) {
        self.analyze_declarations(&mut program.declarations);
        self.check_unresolved_forwards(&program.declarations);
        self.symbols.enter_scope();
        self.analyze_statements(&mut program.main_block);
        self.symbols.exit_scope();
    }

    pub fn analyze_unit(&mut self, unit: &mut Unit) {
        self.analyze_declarations(&mut unit.interface_declarations);
        self.analyze_declarations(&mut unit.implementation_declarations);
        self.check_unresolved_forwards(&unit.implementation_declarations);
        self.symbols.enter_scope();
        self.analyze_statements(&mut unit.initialization);
        self.symbols.exit_scope();
    }

    fn check_unresolved_forwards(&mut self, decls: &[Declaration]) {
        for decl in decls {
            let (name, is_forward, loc) = match decl {
                Declaration::Procedure { name, is_forward, location, .. } => {
                    (name, *is_forward, *location)
                }
                Declaration::Function { name, is_forward, location, .. } => {
                    (name, *is_forward, *location)
                }
                _ => continue,
            };
            if is_forward {
                let unresolved = self
                    .symbols
                    .lookup_all_overloads(name)
                    .iter()
                    .any(|s| !s.is_defined);
                if unresolved {
                    self.error(loc, format!("'{}' is forward-declared but never implemented", name));
                }
            }
        }
    }

    fn analyze_declarations(&mut self, decls: &mut [Declaration]) {
        for decl in decls.iter_mut() {
            self.declare(decl);
        }
        for decl in decls.iter_mut() {
            self.analyze_routine_body(decl);
        }
    }

    fn declare(&mut self, decl: &mut Declaration) {
        match decl {
            Declaration::Constant { name, value, location } => {
                // A constant's type is whatever its initializer's type is;
                // falling back to "const" only when that can't be inferred
                // keeps a later operator type-check from treating every
                // constant as an unknown, incompatible type.
                let type_name = self.infer_type_name(value).unwrap_or_else(|| "const".to_string());
                let result = self.symbols.define(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Constant { type_name },
                    is_builtin: false,
                    is_defined: true,
                });
                if let Err(e) = result {
                    self.error(*location, e);
                }
            }
            Declaration::TypeDef { name, type_text, record_def, location } => {
                if let Some(def) = record_def {
                    self.records.insert(
                        name.to_ascii_lowercase(),
                        RecordInfo {
                            fields: def.fields.clone(),
                        },
                    );
                }
                let trimmed = type_text.trim();
                if trimmed.starts_with('(') && trimmed.ends_with(')') {
                    let mut members = Vec::new();
                    for (ordinal, member) in trimmed[1..trimmed.len() - 1].split(',').enumerate() {
                        let member = member.trim().to_string();
                        self.enum_ordinals.insert(member.to_ascii_lowercase(), ordinal as i64);
                        members.push(member);
                    }
                    self.enum_types.insert(name.to_ascii_lowercase(), members);
                }
                let result = self.symbols.define(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::TypeAlias {
                        type_name: type_text.clone(),
                    },
                    is_builtin: false,
                    is_defined: true,
                });
                if let Err(e) = result {
                    self.error(*location, e);
                }
            }
            Declaration::Variable { names, type_name, mode, location } => {
                for n in names.iter() {
                    let result = self.symbols.define(Symbol {
                        name: n.clone(),
                        kind: SymbolKind::Variable {
                            type_name: type_name.clone(),
                            mode: *mode,
                        },
                        is_builtin: false,
                        is_defined: true,
                    });
                    if let Err(e) = result {
                        self.error(*location, e);
                    }
                }
            }
            Declaration::Procedure { name, params, is_forward, location, .. } => {
                let result = self.symbols.define_overloaded(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Procedure {
                        params: params.iter().map(|p| (p.type_name.clone(), p.mode)).collect(),
                    },
                    is_builtin: false,
                    is_defined: !*is_forward,
                });
                if let Err(e) = result {
                    self.error(*location, e);
                }
            }
            Declaration::Function { name, params, return_type, is_forward, location, .. } => {
                let result = self.symbols.define_overloaded(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Function {
                        params: params.iter().map(|p| (p.type_name.clone(), p.mode)).collect(),
                        return_type: return_type.clone(),
                    },
                    is_builtin: false,
                    is_defined: !*is_forward,
                });
                if let Err(e) = result {
                    self.error(*location, e);
                }
            }
            Declaration::Label { .. } | Declaration::Uses { .. } => {}
        }
    }

    fn analyze_routine_body(&mut self, decl: &mut Declaration) {
        match decl {
            Declaration::Procedure { params, body, locals, name, location, .. } => {
                if let Some(stmts) = body {
                    self.symbols.enter_scope();
                    self.bind_params(params);
                    self.analyze_locals(locals, *location);
                    self.analyze_statements(stmts);
                    self.symbols.exit_scope();
                } else {
                    let _ = name;
                }
            }
            Declaration::Function {
                params,
                body,
                locals,
                name,
                return_type,
                location,
                ..
            } => {
                if let Some(stmts) = body {
                    self.symbols.enter_scope();
                    self.bind_params(params);
                    // The function name acts as an implicit result variable.
                    let _ = self.symbols.define(Symbol {
                        name: name.clone(),
                        kind: SymbolKind::Variable {
                            type_name: return_type.clone(),
                            mode: ParamMode::Value,
                        },
                        is_builtin: false,
                        is_defined: true,
                    });
                    self.analyze_locals(locals, *location);
                    self.analyze_statements(stmts);
                    self.symbols.exit_scope();
                }
            }
            _ => {}
        }
    }

    /// Declares a routine's local declarations, rejecting nested
    /// procedures/functions instead of recursing into them: this compiler
    /// only supports routines declared at the program/unit level, so a
    /// nested one is reported and left unanalyzed rather than silently
    /// compiled into a scope it doesn't belong in.
    fn analyze_locals(&mut self, locals: &mut [Declaration], location: crate::token::SourceLocation) {
        for decl in locals.iter_mut() {
            if matches!(decl, Declaration::Procedure { .. } | Declaration::Function { .. }) {
                self.error(
                    location,
                    format!(
                        "nested routine '{}' is not supported; declare it at the enclosing program or unit level",
                        decl.name()
                    ),
                );
                continue;
            }
            self.declare(decl);
        }
    }

    fn bind_params(&mut self, params: &[Parameter]) {
        for p in params {
            let _ = self.symbols.define(Symbol {
                name: p.name.clone(),
                kind: SymbolKind::Variable {
                    type_name: p.type_name.clone(),
                    mode: p.mode,
                },
                is_builtin: false,
                is_defined: true,
            });
        }
    }

    fn analyze_statements(&mut self, stmts: &mut [Statement]) {
        for stmt in stmts.iter_mut() {
            self.analyze_statement(stmt);
        }
    }

    fn analyze_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Expression(expr) => self.analyze_expression(expr),
            Statement::Compound(stmts) => self.analyze_statements(stmts),
            Statement::Assignment { target, value, .. } => {
                self.analyze_expression(target);
                self.analyze_expression(value);
            }
            Statement::If { condition, then_branch, else_branch, .. } => {
                self.analyze_expression(condition);
                self.analyze_statement(then_branch);
                if let Some(e) = else_branch {
                    self.analyze_statement(e);
                }
            }
            Statement::While { condition, body, .. } => {
                self.analyze_expression(condition);
                self.analyze_statement(body);
            }
            Statement::For { variable, from, to, body, location, .. } => {
                if self.symbols.lookup(variable).is_none() {
                    self.error(*location, format!("undeclared loop variable '{}'", variable));
                }
                self.analyze_expression(from);
                self.analyze_expression(to);
                self.analyze_statement(body);
            }
            Statement::Repeat { body, condition, .. } => {
                self.analyze_statements(body);
                self.analyze_expression(condition);
            }
            Statement::Case { selector, branches, else_branch, .. } => {
                self.analyze_expression(selector);
                for branch in branches.iter_mut() {
                    for v in branch.values.iter_mut() {
                        self.analyze_expression(v);
                    }
                    self.analyze_statement(&mut branch.body);
                }
                if let Some(e) = else_branch {
                    self.analyze_statement(e);
                }
            }
            Statement::With(clause) => self.analyze_with(clause),
            Statement::Label { statement, .. } => self.analyze_statement(statement),
            Statement::Goto { .. } | Statement::Break(_) | Statement::Continue(_) | Statement::Empty => {}
        }
    }

    /// Resolves each `with`-bound expression's record type and pushes its
    /// field names as a lookup frame, innermost frame first, so bare field
    /// references inside the body stamp `with_variable` on their identifier.
    fn analyze_with(&mut self, clause: &mut WithClause) {
        let mut frame = Vec::new();
        for expr in clause.expressions.iter_mut() {
            self.analyze_expression(expr);
            if let Some(type_name) = self.infer_type_name(expr) {
                if let Some(info) = self.record_info_for(&type_name).cloned() {
                    let binding = with_binding_text(expr);
                    let field_names = info.fields.iter().map(|f| f.name.clone()).collect();
                    frame.push((binding, field_names));
                }
            }
        }
        self.with_stack.push(frame);
        self.analyze_statement(&mut clause.body);
        self.with_stack.pop();
    }

    /// Best-effort static type name for an expression: Identifier/FieldAccess
    /// resolve against the symbol table and record registry, literals carry
    /// their obvious type, and a unary/binary expression inherits its
    /// operand's type (except the relational and boolean operators, which
    /// always produce a boolean regardless of their operands' type). Used
    /// both to resolve `with` bindings to their record field set and to
    /// type-check operators.
    fn infer_type_name(&self, expr: &Expression) -> Option<String> {
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
            Expression::Identifier { name, .. } => match &self.symbols.lookup(name)?.kind {
                SymbolKind::Variable { type_name, .. } | SymbolKind::Constant { type_name } => {
                    Some(type_name.clone())
                }
                _ => None,
            },
            Expression::FieldAccess { target, field, .. } => {
                let target_type = self.infer_type_name(target)?;
                let info = self.record_info_for(&target_type)?;
                info.fields
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(field))
                    .map(|f| f.type_name.clone())
            }
            Expression::Unary { op: UnaryOp::Not, .. } => Some("boolean".to_string()),
            Expression::Unary { operand, .. } => self.infer_type_name(operand),
            Expression::Binary { op, .. }
                if matches!(
                    op,
                    BinaryOp::Eq
                        | BinaryOp::NotEq
                        | BinaryOp::Lt
                        | BinaryOp::LtEq
                        | BinaryOp::Gt
                        | BinaryOp::GtEq
                        | BinaryOp::And
                        | BinaryOp::Or
                        | BinaryOp::Xor
                        | BinaryOp::In
                ) =>
            {
                Some("boolean".to_string())
            }
            Expression::Binary { left, .. } => self.infer_type_name(left),
            _ => None,
        }
    }

    /// `infer_type_name`, resolved through the alias chain and lower-cased,
    /// so a named array/set/string type compares against its definition
    /// text (e.g. `"set of ..."`) rather than its declared name.
    fn resolved_expr_type(&self, expr: &Expression) -> Option<String> {
        let name = self.infer_type_name(expr)?;
        Some(self.symbols.resolve_data_type(&name).to_ascii_lowercase())
    }

    /// Checks an operator's operand types against Turbo Pascal's own
    /// operator compatibility rules, reporting a type-mismatch diagnostic
    /// when both operand types are known and clearly incompatible. Skips
    /// silently when either side's type can't be inferred — this is not a
    /// full type checker, just a guard against the shapes that don't
    /// compile in the generated C++.
    fn check_binary_operator(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        location: crate::token::SourceLocation,
    ) {
        let (lt, rt) = match (self.resolved_expr_type(left), self.resolved_expr_type(right)) {
            (Some(l), Some(r)) => (l, r),
            _ => return,
        };

        fn is_numeric(t: &str) -> bool {
            matches!(t, "integer" | "longint" | "byte" | "real" | "double") || t.contains("..")
        }
        fn is_integer(t: &str) -> bool {
            matches!(t, "integer" | "longint" | "byte") || t.contains("..")
        }
        fn is_boolean(t: &str) -> bool {
            t == "boolean"
        }
        fn is_string(t: &str) -> bool {
            t == "string" || t.starts_with("string[")
        }
        fn is_set(t: &str) -> bool {
            t.starts_with("set of ")
        }

        let mismatch = |this: &mut Self, what: &str| {
            this.error(
                location,
                format!("type mismatch: {} (got '{}' and '{}')", what, lt, rt),
            );
        };

        match op {
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                if !(is_boolean(&lt) && is_boolean(&rt)) {
                    mismatch(self, "'and'/'or'/'xor' require boolean operands");
                }
            }
            BinaryOp::IntDiv | BinaryOp::Mod => {
                if !(is_integer(&lt) && is_integer(&rt)) {
                    mismatch(self, "'div'/'mod' require integer operands");
                }
            }
            BinaryOp::Add => {
                let ok = (is_numeric(&lt) && is_numeric(&rt))
                    || (is_string(&lt) && is_string(&rt))
                    || (is_set(&lt) && is_set(&rt));
                if !ok {
                    mismatch(self, "'+' requires matching numeric, string, or set operands");
                }
            }
            BinaryOp::Sub | BinaryOp::Mul => {
                let ok = (is_numeric(&lt) && is_numeric(&rt)) || (is_set(&lt) && is_set(&rt));
                if !ok {
                    mismatch(self, "operator requires matching numeric or set operands");
                }
            }
            BinaryOp::Div => {
                if !(is_numeric(&lt) && is_numeric(&rt)) {
                    mismatch(self, "'/' requires numeric operands");
                }
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                if !(is_integer(&lt) && is_integer(&rt)) {
                    mismatch(self, "shift operators require integer operands");
                }
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let compatible = lt == rt
                    || (is_numeric(&lt) && is_numeric(&rt))
                    || (is_string(&lt) && is_string(&rt));
                if !compatible {
                    mismatch(self, "relational operator operands are not comparable");
                }
            }
            BinaryOp::In => {
                if !is_set(&rt) {
                    mismatch(self, "'in' requires a set operand on the right");
                }
            }
            BinaryOp::Range => {}
        }
    }

    /// Looks up a record definition by type name, trying the name as
    /// written first since the record registry is keyed by declaration
    /// name, not by `resolve_data_type`'s fully-unwrapped definition text
    /// (which for a record type is its verbatim `record ... end` body,
    /// not a further type name to chase).
    fn record_info_for(&self, type_name: &str) -> Option<&RecordInfo> {
        if let Some(info) = self.records.get(&type_name.to_ascii_lowercase()) {
            return Some(info);
        }
        let resolved = self.symbols.resolve_data_type(type_name);
        self.records.get(&resolved.to_ascii_lowercase())
    }

    fn analyze_expression(&mut self, expr: &mut Expression) {
        match expr {
            Expression::Literal { .. } => {}
            Expression::Identifier { name, with_variable, location } => {
                if self.symbols.lookup(name).is_none() {
                    if let Some(binding) = self.resolve_through_with(name) {
                        *with_variable = Some(binding);
                    } else {
                        self.error(*location, format!("undeclared identifier '{}'", name));
                    }
                }
            }
            Expression::Binary { op, left, right, location } => {
                self.analyze_expression(left);
                self.analyze_expression(right);
                self.check_binary_operator(*op, left, right, *location);
            }
            Expression::Unary { operand, .. }
            | Expression::AddressOf { operand, .. }
            | Expression::Dereference { operand, .. } => self.analyze_expression(operand),
            Expression::Call { callee, args, location } => {
                for a in args.iter_mut() {
                    self.analyze_expression(a);
                }
                self.check_call(callee, args.len(), *location);
            }
            Expression::FieldAccess { target, .. } => self.analyze_expression(target),
            Expression::ArrayIndex { target, indices, .. } => {
                self.analyze_expression(target);
                for i in indices.iter_mut() {
                    self.analyze_expression(i);
                }
            }
            Expression::SetLiteral { elements, .. } => {
                for e in elements.iter_mut() {
                    self.analyze_expression(e);
                }
            }
            Expression::RangeExpr { low, high, .. } => {
                self.analyze_expression(low);
                self.analyze_expression(high);
            }
            Expression::Formatted { expr, width, precision, .. } => {
                self.analyze_expression(expr);
                if let Some(w) = width {
                    self.analyze_expression(w);
                }
                if let Some(p) = precision {
                    self.analyze_expression(p);
                }
            }
        }
    }

    /// Checks a bare name against the active `with` frames, innermost
    /// frame and innermost binding within that frame winning.
    fn resolve_through_with(&self, name: &str) -> Option<String> {
        for frame in self.with_stack.iter().rev() {
            for (binding, fields) in frame.iter().rev() {
                if fields.iter().any(|f| f.eq_ignore_ascii_case(name)) {
                    return Some(binding.clone());
                }
            }
        }
        None
    }

    /// Variadic builtins (`write`, `writeln`, `str`, `val`, `concat`) accept
    /// any arity; everything else is checked against its declared
    /// signature(s) when exactly one overload exists, or skipped when
    /// overload resolution would require full type inference this analyzer
    /// does not attempt.
    fn check_call(&mut self, callee: &str, arg_count: usize, location: crate::token::SourceLocation) {
        const VARIADIC: &[&str] = &["write", "writeln", "str", "val", "concat", "read", "readln"];
        if VARIADIC.contains(&callee.to_ascii_lowercase().as_str()) {
            return;
        }
        let overloads = self.symbols.lookup_all_overloads(callee);
        if overloads.is_empty() {
            self.error(location, format!("call to undeclared routine '{}'", callee));
            return;
        }
        if overloads.len() == 1 {
            let expected = match &overloads[0].kind {
                SymbolKind::Procedure { params } => params.len(),
                SymbolKind::Function { params, .. } => params.len(),
                _ => return,
            };
            if expected != arg_count {
                self.error(
                    location,
                    format!(
                        "'{}' expects {} argument(s) but {} were given",
                        callee, expected, arg_count
                    ),
                );
            }
        }
    }
}

fn with_binding_text(expr: &Expression) -> String {
    match expr {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::FieldAccess { target, field, .. } => format!("{}.{}", with_binding_text(target), field),
        _ => "with_expr".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str) -> (Program, Vec<String>) {
        let mut parser = Parser::new(src);
        let mut program = parser.parse_program().expect("parses");
        let mut analyzer = Analyzer::new();
        analyzer.analyze_program(&mut program);
        (program, analyzer.errors().to_vec())
    }

    #[test]
    fn undeclared_identifier_is_reported() {
        let (_, errors) = analyze("program P; begin x := 1 end.");
        assert!(errors.iter().any(|e| e.contains("undeclared identifier 'x'")));
    }

    #[test]
    fn declared_variable_has_no_error() {
        let (_, errors) = analyze("program P; var x: integer; begin x := 1 end.");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn with_statement_resolves_bare_field_name() {
        let (program, errors) = analyze(
            "program P; type Point = record x, y: integer; end; var p: Point; begin with p do x := 1 end.",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        match &program.main_block[0] {
            Statement::With(clause) => match &*clause.body {
                Statement::Assignment { target: Expression::Identifier { with_variable, .. }, .. } => {
                    assert_eq!(with_variable.as_deref(), Some("p"));
                }
                other => panic!("unexpected body {:?}", other),
            },
            _ => panic!("expected with"),
        }
    }

    #[test]
    fn forward_declaration_without_implementation_errors() {
        let (_, errors) = analyze(
            "program P; function f(x: integer): integer; forward; begin end.",
        );
        assert!(errors.iter().any(|e| e.contains("forward-declared but never implemented")));
    }

    #[test]
    fn forward_declaration_matched_has_no_error() {
        let (_, errors) = analyze(
            "program P; function f(x: integer): integer; forward; function f(x: integer): integer; begin f := x end; begin end.",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn call_arity_mismatch_is_reported() {
        let (_, errors) = analyze(
            "program P; procedure p(a: integer); begin end; begin p(1, 2) end.",
        );
        assert!(errors.iter().any(|e| e.contains("expects 1 argument")));
    }

    #[test]
    fn boolean_operator_on_non_boolean_operands_is_a_type_mismatch() {
        let (_, errors) = analyze(
            "program P; var x: integer; var b: boolean; begin b := x and 1 end.",
        );
        assert!(errors.iter().any(|e| e.contains("type mismatch")));
    }

    #[test]
    fn div_mod_on_real_operands_is_a_type_mismatch() {
        let (_, errors) = analyze(
            "program P; var x, y: real; var z: real; begin z := x div y end.",
        );
        assert!(errors.iter().any(|e| e.contains("type mismatch")));
    }

    #[test]
    fn numeric_arithmetic_across_integer_and_real_is_not_a_mismatch() {
        let (_, errors) = analyze(
            "program P; var x: integer; var y: real; var z: real; begin z := x + y end.",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn typed_constant_in_arithmetic_is_not_a_mismatch() {
        let (_, errors) = analyze(
            "program P; const Limit = 10; var x, y: integer; begin y := x + Limit end.",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn comparing_string_and_integer_is_a_type_mismatch() {
        let (_, errors) = analyze(
            "program P; var s: string; var b: boolean; begin b := s = 1 end.",
        );
        assert!(errors.iter().any(|e| e.contains("type mismatch")));
    }

    #[test]
    fn nested_procedure_is_rejected_not_analyzed() {
        let (_, errors) = analyze(
            "program P; procedure outer; procedure inner; begin end; begin end; begin outer end.",
        );
        assert!(errors.iter().any(|e| e.contains("nested routine 'inner' is not supported")));
    }

    #[test]
    fn duplicate_variable_declaration_errors() {
        let (_, errors) = analyze("program P; var x: integer; x: real; begin end.");
        assert!(errors.iter().any(|e| e.contains("already declared")));
    }
}
