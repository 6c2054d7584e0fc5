//! Recursive-descent parser with precedence climbing for expressions.
//!
//! Single-token lookahead over the lexer's token stream. On any parse
//! failure the parser records one diagnostic and synchronises to the next
//! `;` or statement-start keyword, then resumes — no construct is silently
//! dropped.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{SourceLocation, Token, TokenKind};

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    errors: Vec<String>,
    next_label_id: usize,
}

type PResult<T> = Result<T, ()>;

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next();
        Parser {
            lexer,
            current,
            errors: Vec::new(),
            next_label_id: 0,
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn advance(&mut self) -> Token {
        let prev = self.current.clone();
        self.current = self.lexer.next();
        prev
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        self.current.kind == TokenKind::Identifier
            && self.current.text.eq_ignore_ascii_case(word)
    }

    fn eat(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error(&format!(
                "expected {} but found '{}'",
                what, self.current.text
            ));
            Err(())
        }
    }

    fn error(&mut self, message: &str) {
        self.errors
            .push(format!("{}: {}", self.current.location, message));
    }

    fn record_lexer_errors(&mut self) {
        for e in self.lexer.errors() {
            self.errors.push(e.clone());
        }
    }

    /// Discard tokens until `;`, a statement-start keyword, or EOF.
    fn synchronize(&mut self) {
        while !self.check(TokenKind::Eof) {
            if self.check(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if is_statement_start(self.current.kind) || is_declaration_start(self.current.kind) {
                return;
            }
            self.advance();
        }
    }

    // ---------------------------------------------------------------
    // Top level
    // ---------------------------------------------------------------

    pub fn parse_program(&mut self) -> Option<Program> {
        let mut program = Program::default();
        if self.eat(TokenKind::Program, "'program'").is_err() {
            self.record_lexer_errors();
            return None;
        }
        if let Ok(name_tok) = self.eat(TokenKind::Identifier, "program name") {
            program.name = name_tok.text;
        }
        let _ = self.eat(TokenKind::Semicolon, "';'");

        if self.check(TokenKind::Uses) {
            program.uses = self.parse_uses_names();
        }

        self.parse_declarations(&mut program.declarations);

        if self.check(TokenKind::Begin) {
            match self.parse_compound_statement() {
                Ok(Statement::Compound(stmts)) => program.main_block = stmts,
                _ => {}
            }
        } else {
            self.error("expected 'begin' for program body");
        }
        let _ = self.eat(TokenKind::Period, "'.'");
        self.record_lexer_errors();
        Some(program)
    }

    pub fn parse_unit(&mut self) -> Option<Unit> {
        let mut unit = Unit::default();
        if self.eat(TokenKind::Unit, "'unit'").is_err() {
            self.record_lexer_errors();
            return None;
        }
        if let Ok(name_tok) = self.eat(TokenKind::Identifier, "unit name") {
            unit.name = name_tok.text;
        }
        let _ = self.eat(TokenKind::Semicolon, "';'");

        let _ = self.eat(TokenKind::Interface, "'interface'");
        if self.check(TokenKind::Uses) {
            unit.interface_uses = self.parse_uses_names();
        }
        self.parse_declarations(&mut unit.interface_declarations);

        let _ = self.eat(TokenKind::Implementation, "'implementation'");
        if self.check(TokenKind::Uses) {
            unit.implementation_uses = self.parse_uses_names();
        }
        self.parse_declarations(&mut unit.implementation_declarations);

        if self.check(TokenKind::Begin) {
            if let Ok(Statement::Compound(stmts)) = self.parse_compound_statement() {
                unit.initialization = stmts;
            }
        }
        let _ = self.eat(TokenKind::End, "'end'");
        let _ = self.eat(TokenKind::Period, "'.'");
        self.record_lexer_errors();
        Some(unit)
    }

    fn parse_uses_names(&mut self) -> Vec<String> {
        self.advance(); // 'uses'
        let mut names = Vec::new();
        loop {
            if let Ok(tok) = self.eat(TokenKind::Identifier, "unit name") {
                names.push(tok.text);
            } else {
                break;
            }
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let _ = self.eat(TokenKind::Semicolon, "';'");
        names
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    /// Each keyword introduces a run of same-kind declarations until the
    /// next keyword is seen; these may repeat in any order.
    fn parse_declarations(&mut self, out: &mut Vec<Declaration>) {
        loop {
            match self.current.kind {
                TokenKind::Const => self.parse_const_section(out),
                TokenKind::Type => self.parse_type_section(out),
                TokenKind::Var => self.parse_var_section(out, ParamMode::Value),
                TokenKind::Label => self.parse_label_section(out),
                TokenKind::Procedure => {
                    if let Some(d) = self.parse_procedure_decl() {
                        out.push(d);
                    }
                }
                TokenKind::Function => {
                    if let Some(d) = self.parse_function_decl() {
                        out.push(d);
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_const_section(&mut self, out: &mut Vec<Declaration>) {
        self.advance(); // 'const'
        while self.check(TokenKind::Identifier) {
            let loc = self.current.location;
            let name = self.advance().text;
            if self.eat(TokenKind::Equal, "'='").is_err() {
                self.synchronize();
                continue;
            }
            match self.parse_expression() {
                Ok(value) => out.push(Declaration::Constant {
                    name,
                    value,
                    location: loc,
                }),
                Err(()) => self.synchronize(),
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
    }

    fn parse_type_section(&mut self, out: &mut Vec<Declaration>) {
        self.advance(); // 'type'
        while self.check(TokenKind::Identifier) && !self.is_decl_keyword_ahead_of_name() {
            let loc = self.current.location;
            let name = self.advance().text;
            if self.eat(TokenKind::Equal, "'='").is_err() {
                self.synchronize();
                continue;
            }
            let (type_text, record_def) = self.parse_type_text();
            out.push(Declaration::TypeDef {
                name,
                type_text,
                record_def,
                location: loc,
            });
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
    }

    /// Disambiguate "identifier is actually the next section's keyword"
    /// from "identifier starts a new type name". Never true in practice
    /// since keywords don't lex as Identifier, kept for defensiveness.
    fn is_decl_keyword_ahead_of_name(&self) -> bool {
        false
    }

    fn parse_var_section(&mut self, out: &mut Vec<Declaration>, _default_mode: ParamMode) {
        self.advance(); // 'var'
        while self.check(TokenKind::Identifier) {
            let loc = self.current.location;
            let mut names = vec![self.advance().text];
            while self.check(TokenKind::Comma) {
                self.advance();
                if let Ok(tok) = self.eat(TokenKind::Identifier, "identifier") {
                    names.push(tok.text);
                }
            }
            if self.eat(TokenKind::Colon, "':'").is_err() {
                self.synchronize();
                continue;
            }
            let (type_name, _) = self.parse_type_text();
            out.push(Declaration::Variable {
                names,
                type_name,
                mode: ParamMode::Value,
                location: loc,
            });
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
    }

    fn parse_label_section(&mut self, out: &mut Vec<Declaration>) {
        let loc = self.current.location;
        self.advance(); // 'label'
        let mut names = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::IntegerLiteral | TokenKind::Identifier => {
                    names.push(self.advance().text);
                }
                _ => break,
            }
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let _ = self.eat(TokenKind::Semicolon, "';'");
        out.push(Declaration::Label { names, location: loc });
    }

    /// Parses the text of a type definition after `=` or `:`, returning the
    /// verbatim source text alongside a structured record definition when
    /// the type is a `record`.
    fn parse_type_text(&mut self) -> (String, Option<RecordTypeDefinition>) {
        match self.current.kind {
            TokenKind::Record => {
                let (text, def) = self.parse_record_type();
                (text, Some(def))
            }
            TokenKind::LeftParen => (self.parse_enum_type_text(), None),
            TokenKind::Caret => {
                self.advance();
                let inner = self.parse_single_type_token();
                (format!("^{}", inner), None)
            }
            TokenKind::Array => (self.parse_array_type_text(), None),
            TokenKind::Set => (self.parse_set_type_text(), None),
            TokenKind::String => {
                self.advance();
                if self.check(TokenKind::LeftBracket) {
                    self.advance();
                    let bound = self.parse_single_type_token();
                    let _ = self.eat(TokenKind::RightBracket, "']'");
                    (format!("string[{}]", bound), None)
                } else {
                    ("string".to_string(), None)
                }
            }
            TokenKind::File => {
                self.advance();
                if self.check_word("of") || self.check(TokenKind::Of) {
                    self.advance();
                    let elem = self.parse_single_type_token();
                    (format!("file of {}", elem), None)
                } else {
                    ("file".to_string(), None)
                }
            }
            _ => {
                // base type name, named alias, or subrange lo..hi
                let first = self.parse_single_type_token();
                if self.check(TokenKind::Range) {
                    self.advance();
                    let high = self.parse_single_type_token();
                    (format!("{}..{}", first, high), None)
                } else {
                    (first, None)
                }
            }
        }
    }

    /// Consumes one atomic type-name token (identifier, integer, or char
    /// literal forming a subrange bound) and renders it back to text.
    fn parse_single_type_token(&mut self) -> String {
        match self.current.kind {
            TokenKind::Minus => {
                self.advance();
                format!("-{}", self.advance().text)
            }
            _ => self.advance().text,
        }
    }

    fn parse_enum_type_text(&mut self) -> String {
        let mut text = String::from("(");
        self.advance(); // '('
        let mut first = true;
        while !self.check(TokenKind::RightParen) && !self.check(TokenKind::Eof) {
            if !first {
                text.push(',');
            }
            first = false;
            text.push_str(&self.advance().text);
            if self.check(TokenKind::Comma) {
                self.advance();
            }
        }
        let _ = self.eat(TokenKind::RightParen, "')'");
        text.push(')');
        text
    }

    fn parse_array_type_text(&mut self) -> String {
        self.advance(); // 'array'
        let mut dims = Vec::new();
        if self.check(TokenKind::LeftBracket) {
            self.advance();
            loop {
                let lo = self.parse_single_type_token();
                if self.check(TokenKind::Range) {
                    self.advance();
                    let hi = self.parse_single_type_token();
                    dims.push(format!("{}..{}", lo, hi));
                } else {
                    dims.push(lo);
                }
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            let _ = self.eat(TokenKind::RightBracket, "']'");
        }
        if self.check(TokenKind::Of) {
            self.advance();
        }
        let (elem, _) = self.parse_type_text();
        if dims.is_empty() {
            format!("array of {}", elem)
        } else {
            format!("array[{}] of {}", dims.join(","), elem)
        }
    }

    fn parse_set_type_text(&mut self) -> String {
        self.advance(); // 'set'
        if self.check(TokenKind::Of) {
            self.advance();
        }
        let (elem, _) = self.parse_type_text();
        format!("set of {}", elem)
    }

    /// `record …{; variant-part} end`.
    fn parse_record_type(&mut self) -> (String, RecordTypeDefinition) {
        self.advance(); // 'record'
        let mut fields = Vec::new();
        let mut variant = None;
        let mut text_parts = Vec::new();

        loop {
            if self.check(TokenKind::End) || self.check(TokenKind::Eof) {
                break;
            }
            if self.check(TokenKind::Case) {
                variant = Some(self.parse_variant_part(&mut text_parts));
                break;
            }
            let mut names = vec![self.advance().text];
            while self.check(TokenKind::Comma) {
                self.advance();
                names.push(self.advance().text);
            }
            let _ = self.eat(TokenKind::Colon, "':'");
            let (type_name, _) = self.parse_type_text();
            for n in &names {
                fields.push(RecordField {
                    name: n.clone(),
                    type_name: type_name.clone(),
                });
            }
            text_parts.push(format!("{}: {}", names.join(","), type_name));
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
        let _ = self.eat(TokenKind::End, "'end'");

        let mut text = String::from("record ");
        text.push_str(&text_parts.join("; "));
        if !text_parts.is_empty() {
            text.push_str("; ");
        }
        text.push_str("end");

        (text, RecordTypeDefinition { fields, variant })
    }

    /// `case SELECTOR : TYPE of VALUES : ( FIELDS ); …`
    fn parse_variant_part(&mut self, text_parts: &mut Vec<String>) -> VariantPart {
        self.advance(); // 'case'
        let first = self.advance().text;
        let (selector_name, selector_type) = if self.check(TokenKind::Colon) {
            self.advance();
            let ty = self.advance().text;
            (Some(first), ty)
        } else {
            // `case TYPE of` with no named selector aliasing a field
            (None, first)
        };
        let _ = self.eat(TokenKind::Of, "'of'");

        let mut cases = Vec::new();
        while !self.check(TokenKind::End) && !self.check(TokenKind::Eof) {
            let mut values = vec![self.advance().text];
            while self.check(TokenKind::Comma) {
                self.advance();
                values.push(self.advance().text);
            }
            let _ = self.eat(TokenKind::Colon, "':'");
            let _ = self.eat(TokenKind::LeftParen, "'('");
            let mut fields = Vec::new();
            while !self.check(TokenKind::RightParen) && !self.check(TokenKind::Eof) {
                let mut names = vec![self.advance().text];
                while self.check(TokenKind::Comma) {
                    self.advance();
                    names.push(self.advance().text);
                }
                let _ = self.eat(TokenKind::Colon, "':'");
                let (type_name, _) = self.parse_type_text();
                for n in &names {
                    fields.push(RecordField {
                        name: n.clone(),
                        type_name: type_name.clone(),
                    });
                }
                if self.check(TokenKind::Semicolon) {
                    self.advance();
                }
            }
            let _ = self.eat(TokenKind::RightParen, "')'");
            cases.push(VariantCase { values, fields });
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
        text_parts.push(format!("case {} of", selector_type));
        VariantPart {
            selector_name,
            selector_type,
            cases,
        }
    }

    fn parse_param_list(&mut self) -> Vec<Parameter> {
        let mut params = Vec::new();
        if !self.check(TokenKind::LeftParen) {
            return params;
        }
        self.advance();
        while !self.check(TokenKind::RightParen) && !self.check(TokenKind::Eof) {
            let mode = if self.check(TokenKind::Var) {
                self.advance();
                ParamMode::Var
            } else if self.check(TokenKind::Const) {
                self.advance();
                ParamMode::Const
            } else {
                ParamMode::Value
            };
            let mut names = vec![self.advance().text];
            while self.check(TokenKind::Comma) {
                self.advance();
                names.push(self.advance().text);
            }
            let _ = self.eat(TokenKind::Colon, "':'");
            let (type_name, _) = self.parse_type_text();
            for n in names {
                params.push(Parameter {
                    name: n,
                    type_name: type_name.clone(),
                    mode,
                });
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
        let _ = self.eat(TokenKind::RightParen, "')'");
        params
    }

    fn parse_procedure_decl(&mut self) -> Option<Declaration> {
        let loc = self.current.location;
        self.advance(); // 'procedure'
        let name = self.eat(TokenKind::Identifier, "procedure name").ok()?.text;
        let params = self.parse_param_list();
        let _ = self.eat(TokenKind::Semicolon, "';'");

        if self.check_word("forward") || self.check(TokenKind::Forward) {
            self.advance();
            let _ = self.eat(TokenKind::Semicolon, "';'");
            return Some(Declaration::Procedure {
                name,
                params,
                body: None,
                locals: Vec::new(),
                is_forward: true,
                location: loc,
            });
        }

        let mut locals = Vec::new();
        self.parse_declarations(&mut locals);
        let body = match self.parse_compound_statement() {
            Ok(Statement::Compound(stmts)) => Some(stmts),
            _ => None,
        };
        let _ = self.eat(TokenKind::Semicolon, "';'");
        Some(Declaration::Procedure {
            name,
            params,
            body,
            locals,
            is_forward: false,
            location: loc,
        })
    }

    fn parse_function_decl(&mut self) -> Option<Declaration> {
        let loc = self.current.location;
        self.advance(); // 'function'
        let name = self.eat(TokenKind::Identifier, "function name").ok()?.text;
        let params = self.parse_param_list();
        let _ = self.eat(TokenKind::Colon, "':'");
        let (return_type, _) = self.parse_type_text();
        let _ = self.eat(TokenKind::Semicolon, "';'");

        if self.check_word("forward") || self.check(TokenKind::Forward) {
            self.advance();
            let _ = self.eat(TokenKind::Semicolon, "';'");
            return Some(Declaration::Function {
                name,
                params,
                return_type,
                body: None,
                locals: Vec::new(),
                is_forward: true,
                location: loc,
            });
        }

        let mut locals = Vec::new();
        self.parse_declarations(&mut locals);
        let body = match self.parse_compound_statement() {
            Ok(Statement::Compound(stmts)) => Some(stmts),
            _ => None,
        };
        let _ = self.eat(TokenKind::Semicolon, "';'");
        Some(Declaration::Function {
            name,
            params,
            return_type,
            body,
            locals,
            is_forward: false,
            location: loc,
        })
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn parse_compound_statement(&mut self) -> PResult<Statement> {
        self.eat(TokenKind::Begin, "'begin'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::End) && !self.check(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(s) => stmts.push(s),
                Err(()) => self.synchronize(),
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
            } else if !self.check(TokenKind::End) {
                break;
            }
        }
        self.eat(TokenKind::End, "'end'")?;
        Ok(Statement::Compound(stmts))
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        // A bare integer literal followed by ':' is a label attached to the
        // next statement.
        if self.check(TokenKind::IntegerLiteral) {
            let save = self.current.clone();
            let label_text = save.text.clone();
            let loc = save.location;
            self.advance();
            if self.check(TokenKind::Colon) {
                self.advance();
                let inner = self.parse_statement()?;
                return Ok(Statement::Label {
                    name: label_text,
                    statement: Box::new(inner),
                    location: loc,
                });
            }
            // Not a label: treat the integer as the start of an expression
            // statement built from this literal.
            let expr = self.parse_expression_from_literal(Literal::Integer(label_text), loc)?;
            return self.finish_expression_or_assignment_statement(expr, loc);
        }

        match self.current.kind {
            TokenKind::Begin => self.parse_compound_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Repeat => self.parse_repeat_statement(),
            TokenKind::Case => self.parse_case_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Goto => self.parse_goto_statement(),
            TokenKind::Semicolon | TokenKind::End => Ok(Statement::Empty),
            _ if self.check_word("break") => {
                let loc = self.current.location;
                self.advance();
                Ok(Statement::Break(loc))
            }
            _ if self.check_word("continue") => {
                let loc = self.current.location;
                self.advance();
                Ok(Statement::Continue(loc))
            }
            _ => {
                let loc = self.current.location;
                let expr = self.parse_expression()?;
                self.finish_expression_or_assignment_statement(expr, loc)
            }
        }
    }

    /// When an identifier (or postfix chain built from one) is followed by
    /// `:=`, it is an assignment; otherwise it is an expression statement.
    fn finish_expression_or_assignment_statement(
        &mut self,
        expr: Expression,
        loc: SourceLocation,
    ) -> PResult<Statement> {
        if self.check(TokenKind::Assign) {
            self.advance();
            let value = self.parse_expression()?;
            Ok(Statement::Assignment {
                target: expr,
                value,
                location: loc,
            })
        } else {
            Ok(Statement::Expression(expr))
        }
    }

    fn parse_if_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'if'
        let condition = self.parse_expression()?;
        self.eat(TokenKind::Then, "'then'")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.check(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'while'
        let condition = self.parse_expression()?;
        self.eat(TokenKind::Do, "'do'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While {
            condition,
            body,
            location: loc,
        })
    }

    fn parse_for_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'for'
        let variable = self.eat(TokenKind::Identifier, "loop variable")?.text;
        self.eat(TokenKind::Assign, "':='")?;
        let from = self.parse_expression()?;
        let downto = if self.check(TokenKind::Downto) {
            self.advance();
            true
        } else {
            self.eat(TokenKind::To, "'to' or 'downto'")?;
            false
        };
        let to = self.parse_expression()?;
        self.eat(TokenKind::Do, "'do'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            variable,
            from,
            to,
            downto,
            body,
            location: loc,
        })
    }

    fn parse_repeat_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'repeat'
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Until) && !self.check(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(s) => stmts.push(s),
                Err(()) => self.synchronize(),
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
        self.eat(TokenKind::Until, "'until'")?;
        let condition = self.parse_expression()?;
        Ok(Statement::Repeat {
            body: stmts,
            condition,
            location: loc,
        })
    }

    fn parse_case_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'case'
        let selector = self.parse_expression()?;
        self.eat(TokenKind::Of, "'of'")?;
        let mut branches = Vec::new();
        let mut else_branch = None;
        while !self.check(TokenKind::End) && !self.check(TokenKind::Eof) {
            if self.check(TokenKind::Else) {
                self.advance();
                let mut stmts = Vec::new();
                while !self.check(TokenKind::End) && !self.check(TokenKind::Eof) {
                    stmts.push(self.parse_statement()?);
                    if self.check(TokenKind::Semicolon) {
                        self.advance();
                    }
                }
                else_branch = Some(Box::new(Statement::Compound(stmts)));
                break;
            }
            let mut values = vec![self.parse_case_label()?];
            while self.check(TokenKind::Comma) {
                self.advance();
                values.push(self.parse_case_label()?);
            }
            self.eat(TokenKind::Colon, "':'")?;
            let body = self.parse_statement()?;
            branches.push(CaseBranch { values, body });
            if self.check(TokenKind::Semicolon) {
                self.advance();
            }
        }
        self.eat(TokenKind::End, "'end'")?;
        Ok(Statement::Case {
            selector,
            branches,
            else_branch,
            location: loc,
        })
    }

    fn parse_case_label(&mut self) -> PResult<Expression> {
        let low = self.parse_additive_and_above()?;
        if self.check(TokenKind::Range) {
            let loc = self.current.location;
            self.advance();
            let high = self.parse_additive_and_above()?;
            Ok(Expression::RangeExpr {
                low: Box::new(low),
                high: Box::new(high),
                location: loc,
            })
        } else {
            Ok(low)
        }
    }

    fn parse_with_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'with'
        let mut expressions = vec![self.parse_expression()?];
        while self.check(TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_expression()?);
        }
        self.eat(TokenKind::Do, "'do'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::With(WithClause {
            expressions,
            body,
            location: loc,
        }))
    }

    fn parse_goto_statement(&mut self) -> PResult<Statement> {
        let loc = self.current.location;
        self.advance(); // 'goto'
        let label = self.advance().text;
        Ok(Statement::Goto { label, location: loc })
    }

    // ---------------------------------------------------------------
    // Expressions: precedence climbing, low to high:
    // or < and < equality < relational/in < additive < multiplicative < unary < primary
    // ---------------------------------------------------------------

    pub fn parse_expression(&mut self) -> PResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expression> {
        let mut left = self.parse_and()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::Xor => BinaryOp::Xor,
                _ => break,
            };
            let loc = self.current.location;
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expression> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::And) {
            let loc = self.current.location;
            self.advance();
            let right = self.parse_equality()?;
            left = Expression::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expression> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Equal => BinaryOp::Eq,
                TokenKind::NotEqual => BinaryOp::NotEq,
                _ => break,
            };
            let loc = self.current.location;
            self.advance();
            let right = self.parse_relational()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> PResult<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LessThan => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::LtEq,
                TokenKind::GreaterThan => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::GtEq,
                TokenKind::In => BinaryOp::In,
                _ => break,
            };
            let loc = self.current.location;
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    /// Used by case-label parsing, which stops below relational/equality.
    fn parse_additive_and_above(&mut self) -> PResult<Expression> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.current.location;
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Multiply => BinaryOp::Mul,
                TokenKind::Divide => BinaryOp::Div,
                TokenKind::Div => BinaryOp::IntDiv,
                TokenKind::Mod => BinaryOp::Mod,
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            let loc = self.current.location;
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expression> {
        let loc = self.current.location;
        match self.current.kind {
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            TokenKind::Plus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Plus,
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            TokenKind::At => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::AddressOf {
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    /// Postfix chains — call, field access, indexing, deref — attach to a
    /// primary in left-to-right order.
    fn parse_postfix(&mut self) -> PResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            let loc = self.current.location;
            match self.current.kind {
                TokenKind::Period => {
                    self.advance();
                    let field = self.eat(TokenKind::Identifier, "field name")?.text;
                    expr = Expression::FieldAccess {
                        target: Box::new(expr),
                        field,
                        location: loc,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let mut indices = vec![self.parse_expression()?];
                    while self.check(TokenKind::Comma) {
                        self.advance();
                        indices.push(self.parse_expression()?);
                    }
                    self.eat(TokenKind::RightBracket, "']'")?;
                    expr = Expression::ArrayIndex {
                        target: Box::new(expr),
                        indices,
                        location: loc,
                    };
                }
                TokenKind::Caret => {
                    self.advance();
                    expr = Expression::Dereference {
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                TokenKind::LeftParen => {
                    // Only a call if the primary was an identifier we haven't
                    // already turned into something else; we encode that by
                    // only entering this arm directly after parse_primary
                    // produced a bare Identifier, handled there instead.
                    break;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expression> {
        let loc = self.current.location;
        match self.current.kind {
            TokenKind::IntegerLiteral => {
                let text = self.advance().text;
                Ok(Expression::Literal {
                    value: Literal::Integer(text),
                    location: loc,
                })
            }
            TokenKind::RealLiteral => {
                let text = self.advance().text;
                Ok(Expression::Literal {
                    value: Literal::Real(text),
                    location: loc,
                })
            }
            TokenKind::StringLiteral => {
                let text = self.advance().text;
                Ok(Expression::Literal {
                    value: Literal::Str(text),
                    location: loc,
                })
            }
            TokenKind::CharLiteral => {
                let text = self.advance().text;
                Ok(Expression::Literal {
                    value: Literal::Char(text),
                    location: loc,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal {
                    value: Literal::Bool(true),
                    location: loc,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal {
                    value: Literal::Bool(false),
                    location: loc,
                })
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::Literal {
                    value: Literal::Nil,
                    location: loc,
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.eat(TokenKind::RightParen, "')'")?;
                self.continue_postfix(expr)
            }
            TokenKind::LeftBracket => self.parse_set_literal(),
            TokenKind::Identifier => {
                let name = self.advance().text;
                if self.check(TokenKind::LeftParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RightParen) {
                        args.push(self.parse_call_argument()?);
                        while self.check(TokenKind::Comma) {
                            self.advance();
                            args.push(self.parse_call_argument()?);
                        }
                    }
                    self.eat(TokenKind::RightParen, "')'")?;
                    let call = Expression::Call {
                        callee: name,
                        args,
                        location: loc,
                    };
                    self.continue_postfix(call)
                } else {
                    let ident = Expression::Identifier {
                        name,
                        with_variable: None,
                        location: loc,
                    };
                    self.continue_postfix(ident)
                }
            }
            _ => {
                self.error(&format!("unexpected token '{}'", self.current.text));
                Err(())
            }
        }
    }

    /// A write/writeln argument may carry `:width` or `:width:precision`.
    fn parse_call_argument(&mut self) -> PResult<Expression> {
        let loc = self.current.location;
        let expr = self.parse_expression()?;
        if self.check(TokenKind::Colon) {
            self.advance();
            let width = self.parse_expression()?;
            let precision = if self.check(TokenKind::Colon) {
                self.advance();
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            Ok(Expression::Formatted {
                expr: Box::new(expr),
                width: Some(Box::new(width)),
                precision,
                location: loc,
            })
        } else {
            Ok(expr)
        }
    }

    /// Continues a postfix chain after a primary expression that
    /// `parse_primary` already fully built (call or parenthesised group).
    fn continue_postfix(&mut self, mut expr: Expression) -> PResult<Expression> {
        loop {
            let loc = self.current.location;
            match self.current.kind {
                TokenKind::Period => {
                    self.advance();
                    let field = self.eat(TokenKind::Identifier, "field name")?.text;
                    expr = Expression::FieldAccess {
                        target: Box::new(expr),
                        field,
                        location: loc,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let mut indices = vec![self.parse_expression()?];
                    while self.check(TokenKind::Comma) {
                        self.advance();
                        indices.push(self.parse_expression()?);
                    }
                    self.eat(TokenKind::RightBracket, "']'")?;
                    expr = Expression::ArrayIndex {
                        target: Box::new(expr),
                        indices,
                        location: loc,
                    };
                }
                TokenKind::Caret => {
                    self.advance();
                    expr = Expression::Dereference {
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_set_literal(&mut self) -> PResult<Expression> {
        let loc = self.current.location;
        self.advance(); // '['
        let mut elements = Vec::new();
        if !self.check(TokenKind::RightBracket) {
            elements.push(self.parse_set_element()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                elements.push(self.parse_set_element()?);
            }
        }
        self.eat(TokenKind::RightBracket, "']'")?;
        Ok(Expression::SetLiteral { elements, location: loc })
    }

    fn parse_set_element(&mut self) -> PResult<Expression> {
        let low = self.parse_expression()?;
        if self.check(TokenKind::Range) {
            let loc = self.current.location;
            self.advance();
            let high = self.parse_expression()?;
            Ok(Expression::RangeExpr {
                low: Box::new(low),
                high: Box::new(high),
                location: loc,
            })
        } else {
            Ok(low)
        }
    }

    fn parse_expression_from_literal(
        &mut self,
        lit: Literal,
        loc: SourceLocation,
    ) -> PResult<Expression> {
        self.continue_postfix(Expression::Literal { value: lit, location: loc })
    }
}

fn is_statement_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Begin
            | TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Repeat
            | TokenKind::Case
            | TokenKind::With
            | TokenKind::Goto
            | TokenKind::End
    )
}

fn is_declaration_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Const
            | TokenKind::Type
            | TokenKind::Var
            | TokenKind::Label
            | TokenKind::Procedure
            | TokenKind::Function
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_parses_with_no_errors() {
        let mut parser = Parser::new("program Hi; begin writeln('Hello, World!') end.");
        let program = parser.parse_program().expect("program");
        assert!(parser.errors().is_empty());
        assert_eq!(program.name, "Hi");
        assert_eq!(program.main_block.len(), 1);
    }

    #[test]
    fn assignment_target_can_be_postfix_chain() {
        let mut parser = Parser::new("program P; var a: R; begin a.b[1].c := 2 end.");
        let program = parser.parse_program().expect("program");
        match &program.main_block[0] {
            Statement::Assignment { target, .. } => {
                assert!(matches!(target, Expression::FieldAccess { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn for_downto_parses() {
        let mut parser =
            Parser::new("program P; var i: integer; begin for i := 10 downto 1 do ; end.");
        let program = parser.parse_program().expect("program");
        match &program.main_block[0] {
            Statement::For { downto, .. } => assert!(*downto),
            _ => panic!("expected for"),
        }
    }

    #[test]
    fn parser_never_loops_forever_on_garbage() {
        let mut parser = Parser::new("program P; ;;; @@@ begin end.");
        let program = parser.parse_program();
        assert!(program.is_some() || !parser.errors().is_empty());
    }

    #[test]
    fn forward_declaration_has_no_body() {
        let mut parser =
            Parser::new("program P; function f(x:integer):integer; forward; begin end.");
        let program = parser.parse_program().expect("program");
        match &program.declarations[0] {
            Declaration::Function { is_forward, body, .. } => {
                assert!(*is_forward);
                assert!(body.is_none());
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn record_with_variant_captures_selector_once() {
        let mut parser = Parser::new(
            "program P; type V = record tag: integer; case t: integer of 1: (x: integer); end; begin end.",
        );
        let program = parser.parse_program().expect("program");
        match &program.declarations[0] {
            Declaration::TypeDef { record_def: Some(def), .. } => {
                assert!(def.variant.is_some());
            }
            _ => panic!("expected record typedef"),
        }
    }

    #[test]
    fn overload_style_two_procedures_parse() {
        let mut parser = Parser::new(
            "program P; procedure add(a,b:integer); begin end; procedure add(a,b:real); begin end; begin end.",
        );
        let program = parser.parse_program().expect("program");
        assert_eq!(program.declarations.len(), 2);
    }

    #[test]
    fn set_literal_with_range_parses() {
        let mut parser =
            Parser::new("program P; var s: set of integer; begin s := [1,3..5]; end.");
        let program = parser.parse_program().expect("program");
        match &program.main_block[0] {
            Statement::Assignment { value: Expression::SetLiteral { elements, .. }, .. } => {
                assert_eq!(elements.len(), 2);
                assert!(matches!(elements[1], Expression::RangeExpr { .. }));
            }
            _ => panic!("expected set literal assignment"),
        }
    }

    #[test]
    fn with_statement_supports_multiple_records() {
        let mut parser = Parser::new("program P; begin with a, b do x := 1; end.");
        let program = parser.parse_program().expect("program");
        match &program.main_block[0] {
            Statement::With(clause) => assert_eq!(clause.expressions.len(), 2),
            _ => panic!("expected with"),
        }
    }
}
