//! Statements, declarations, functions and classes.

use crate::ast::{FunctionKind, Kind, NodeId, NodeKind, VariableKind};
use crate::lexer::{LexMode, TokenKind};

use super::{unexpected, ParseResult, Parser, LABEL_LOOP, LABEL_STATEMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ClassKind {
    Base,
    Derived,
}

impl<'a> Parser<'a> {
    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn statement(&mut self, label: Option<&str>) -> ParseResult<NodeId> {
        match self.peek(LexMode::Regex)? {
            TokenKind::Identifier => {
                if self.peek_at(LexMode::Div)? == TokenKind::Punct(":") {
                    self.labelled_statement()
                } else {
                    self.expression_statement()
                }
            }
            TokenKind::Punct("{") => self.block(),
            TokenKind::Punct(";") => self.empty_statement(),
            TokenKind::Keyword("var") => self.variable_statement(),
            TokenKind::Keyword("return") => self.return_statement(),
            TokenKind::Keyword("break") => self.break_statement(),
            TokenKind::Keyword("continue") => self.continue_statement(),
            TokenKind::Keyword("throw") => self.throw_statement(),
            TokenKind::Keyword("debugger") => self.debugger_statement(),
            TokenKind::Keyword("if") => self.if_statement(),
            TokenKind::Keyword("do") => self.do_while_statement(label),
            TokenKind::Keyword("while") => self.while_statement(label),
            TokenKind::Keyword("for") => self.for_statement(label),
            TokenKind::Keyword("with") => self.with_statement(),
            TokenKind::Keyword("switch") => self.switch_statement(),
            TokenKind::Keyword("try") => self.try_statement(),
            _ => self.expression_statement(),
        }
    }

    fn block(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("{")?;
        let statements = self.statement_list(false)?;
        self.read("}")?;

        Ok(self.finish(NodeKind::Block { statements }, start))
    }

    /// Consume a statement terminator, or accept an inserted one before `}`,
    /// end of input or a line break.
    pub(super) fn semicolon(&mut self) -> ParseResult<()> {
        let token = self.peek_token(LexMode::Regex)?.clone();

        if token.is_punct(";") {
            self.read_token(LexMode::Regex)?;
            return Ok(());
        }

        if token.is_punct("}") || token.kind == TokenKind::Eof || token.newline_before {
            if let Some(hook) = self.on_asi.as_mut() {
                if !hook(&token) {
                    return Err(unexpected(&token));
                }
            }
            return Ok(());
        }

        Err(unexpected(&token))
    }

    fn labelled_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let label = self.identifier(false)?;
        let name = self.ast.identifier_value(label).unwrap_or_default().to_string();

        if self.get_label(&name) > 0 {
            return Err(self.error_at("Invalid label", label));
        }

        self.read(":")?;
        self.set_label(&name, LABEL_STATEMENT);

        // Sloppy code may label a function declaration
        let statement = if self.peek_is("function")? {
            let declaration = self.function_declaration()?;
            self.add_strict_error(
                "Labeled FunctionDeclarations are disallowed in strict mode",
                declaration,
            );
            declaration
        } else {
            self.statement(Some(name.as_str()))?
        };

        self.set_label(&name, 0);

        Ok(self.finish(
            NodeKind::LabelledStatement {
                label: Some(label),
                statement: Some(statement),
            },
            start,
        ))
    }

    fn expression_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let expression = self.expression(false)?;

        self.semicolon()?;

        Ok(self.finish(
            NodeKind::ExpressionStatement {
                expression: Some(expression),
            },
            start,
        ))
    }

    fn empty_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        self.semicolon()?;
        Ok(self.finish(NodeKind::EmptyStatement {}, start))
    }

    pub(super) fn variable_statement(&mut self) -> ParseResult<NodeId> {
        let node = self.variable_declaration(false)?;
        self.semicolon()?;
        self.ast.set_end(node, self.token_end);
        Ok(node)
    }

    fn variable_declaration(&mut self, no_in: bool) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let token = self.peek_token(LexMode::Regex)?;
        let (token_kind, is_let) = (token.kind, token.value == "let");

        let kind = match token_kind {
            TokenKind::Keyword("var") => VariableKind::Var,
            TokenKind::Keyword("const") => VariableKind::Const,
            TokenKind::Identifier if is_let => VariableKind::Let,
            _ => return Err(self.error_here("Expected var, const, or let")),
        };

        self.read_token(LexMode::Regex)?;

        let mut declarations = Vec::new();
        loop {
            declarations.push(self.variable_declarator(no_in, kind)?);
            if self.peek_is(",")? {
                self.read(",")?;
            } else {
                break;
            }
        }

        Ok(self.finish(NodeKind::VariableDeclaration { kind, declarations }, start))
    }

    fn variable_declarator(&mut self, no_in: bool, kind: VariableKind) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let pattern = self.binding_pattern()?;
        let is_identifier = self.ast.kind(pattern) == Kind::Identifier;
        let mut initializer = None;

        // Outside a for-statement head, patterns require an initializer
        if (!no_in && !is_identifier) || self.peek_is("=")? {
            self.read("=")?;
            initializer = Some(self.assignment_expression(no_in, false)?);
        } else if !no_in && kind == VariableKind::Const {
            return Err(self.error_at("Missing const initializer", pattern));
        }

        Ok(self.finish(
            NodeKind::VariableDeclarator {
                pattern: Some(pattern),
                initializer,
            },
            start,
        ))
    }

    fn return_statement(&mut self) -> ParseResult<NodeId> {
        if !self.context.is_function {
            return Err(self.error_here("Return statement outside of function"));
        }

        let start = self.node_start()?;
        self.read("return")?;

        let argument = if self.peek_expression_end()? {
            None
        } else {
            Some(self.expression(false)?)
        };

        self.semicolon()?;

        Ok(self.finish(NodeKind::ReturnStatement { argument }, start))
    }

    fn break_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("break")?;
        let label = if self.peek_expression_end()? {
            None
        } else {
            Some(self.identifier(false)?)
        };
        self.semicolon()?;

        let node = self.finish(NodeKind::BreakStatement { label }, start);

        match label {
            Some(label) => {
                let name = self.ast.identifier_value(label).unwrap_or_default();
                if self.get_label(name) == 0 {
                    return Err(self.error_at("Invalid label", label));
                }
            }
            None => {
                if self.context.loop_depth == 0 && self.context.switch_depth == 0 {
                    return Err(self.error_at("Break not contained within a switch or loop", node));
                }
            }
        }

        Ok(node)
    }

    fn continue_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("continue")?;
        let label = if self.peek_expression_end()? {
            None
        } else {
            Some(self.identifier(false)?)
        };
        self.semicolon()?;

        let node = self.finish(NodeKind::ContinueStatement { label }, start);

        match label {
            Some(label) => {
                let name = self.ast.identifier_value(label).unwrap_or_default();
                if self.get_label(name) != LABEL_LOOP {
                    return Err(self.error_at("Invalid label", label));
                }
            }
            None => {
                if self.context.loop_depth == 0 {
                    return Err(self.error_at("Continue not contained within a loop", node));
                }
            }
        }

        Ok(node)
    }

    fn throw_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("throw")?;

        if self.peek_expression_end()? {
            return Err(self.error_here("Missing throw expression"));
        }

        let expression = self.expression(false)?;
        self.semicolon()?;

        Ok(self.finish(
            NodeKind::ThrowStatement {
                expression: Some(expression),
            },
            start,
        ))
    }

    fn debugger_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("debugger")?;
        self.semicolon()?;

        Ok(self.finish(NodeKind::DebuggerStatement {}, start))
    }

    fn if_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("if")?;
        self.read("(")?;
        let test = self.expression(false)?;
        self.read(")")?;

        let consequent = self.statement(None)?;
        let alternate = if self.peek_is("else")? {
            self.read("else")?;
            Some(self.statement(None)?)
        } else {
            None
        };

        Ok(self.finish(
            NodeKind::IfStatement {
                test: Some(test),
                consequent: Some(consequent),
                alternate,
            },
            start,
        ))
    }

    fn loop_body(&mut self) -> ParseResult<NodeId> {
        self.context.loop_depth += 1;
        let body = self.statement(None);
        self.context.loop_depth -= 1;
        body
    }

    fn do_while_statement(&mut self, label: Option<&str>) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        if let Some(label) = label {
            self.set_label(label, LABEL_LOOP);
        }

        self.read("do")?;
        let body = self.loop_body()?;

        self.read("while")?;
        self.read("(")?;
        let test = self.expression(false)?;
        self.read(")")?;

        if self.peek_is(";")? {
            self.read(";")?;
        }

        Ok(self.finish(
            NodeKind::DoWhileStatement {
                body: Some(body),
                test: Some(test),
            },
            start,
        ))
    }

    fn while_statement(&mut self, label: Option<&str>) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        if let Some(label) = label {
            self.set_label(label, LABEL_LOOP);
        }

        self.read("while")?;
        self.read("(")?;
        let test = self.expression(false)?;
        self.read(")")?;

        let body = self.loop_body()?;

        Ok(self.finish(
            NodeKind::WhileStatement {
                test: Some(test),
                body: Some(body),
            },
            start,
        ))
    }

    fn for_statement(&mut self, label: Option<&str>) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        if let Some(label) = label {
            self.set_label(label, LABEL_LOOP);
        }

        self.read("for")?;

        let mut is_async = false;
        if self.peek_await()? {
            self.read_token(LexMode::Regex)?;
            is_async = true;
        }

        self.read("(")?;

        let initializer = match self.peek(LexMode::Regex)? {
            TokenKind::Punct(";") => None,
            TokenKind::Keyword("var" | "const") => Some(self.variable_declaration(true)?),
            TokenKind::Identifier if self.peek_let()? => Some(self.variable_declaration(true)?),
            _ => Some(self.expression(true)?),
        };

        if is_async || (initializer.is_some() && self.peek_keyword("of")?) {
            return self.for_of_statement(is_async, initializer, start);
        }

        if initializer.is_some() && self.peek_is("in")? {
            return self.for_in_statement(initializer, start);
        }

        self.check_for_init(initializer, "")?;

        self.read(";")?;
        let test = if self.peek_is(";")? {
            None
        } else {
            Some(self.expression(false)?)
        };

        self.read(";")?;
        let update = if self.peek_is(")")? {
            None
        } else {
            Some(self.expression(false)?)
        };

        self.read(")")?;
        let body = self.loop_body()?;

        Ok(self.finish(
            NodeKind::ForStatement {
                initializer,
                test,
                update,
                body: Some(body),
            },
            start,
        ))
    }

    fn for_in_statement(&mut self, left: Option<NodeId>, start: usize) -> ParseResult<NodeId> {
        self.check_for_init(left, "in")?;

        self.read("in")?;
        let right = self.expression(false)?;
        self.read(")")?;

        let body = self.loop_body()?;

        Ok(self.finish(
            NodeKind::ForInStatement {
                left,
                right: Some(right),
                body: Some(body),
            },
            start,
        ))
    }

    fn for_of_statement(
        &mut self,
        is_async: bool,
        left: Option<NodeId>,
        start: usize,
    ) -> ParseResult<NodeId> {
        if left.is_none() {
            return Err(self.unexpected_here());
        }

        self.check_for_init(left, "of")?;

        self.read_keyword("of")?;
        let right = self.assignment_expression(false, false)?;
        self.read(")")?;

        let body = self.loop_body()?;

        Ok(self.finish(
            NodeKind::ForOfStatement {
                is_async,
                left,
                right: Some(right),
                body: Some(body),
            },
            start,
        ))
    }

    fn with_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("with")?;
        self.read("(")?;
        let object = self.expression(false)?;
        self.read(")")?;
        let body = self.statement(None)?;

        let node = self.finish(
            NodeKind::WithStatement {
                object: Some(object),
                body: Some(body),
            },
            start,
        );

        self.add_strict_error("With statement is not allowed in strict mode", node);
        Ok(node)
    }

    fn switch_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("switch")?;
        self.read("(")?;
        let discriminant = self.expression(false)?;
        self.read(")")?;
        self.read("{")?;

        let mut cases = Vec::new();
        let mut has_default = false;

        self.context.switch_depth += 1;

        while self.peek_until("}", LexMode::Regex)?.is_some() {
            let case = self.switch_case()?;

            if let NodeKind::SwitchCase { test: None, .. } = self.ast.get(case) {
                if has_default {
                    return Err(
                        self.error_at("Switch statement cannot have more than one default", case)
                    );
                }
                has_default = true;
            }

            cases.push(case);
        }

        self.context.switch_depth -= 1;
        self.read("}")?;

        Ok(self.finish(
            NodeKind::SwitchStatement {
                discriminant: Some(discriminant),
                cases,
            },
            start,
        ))
    }

    fn switch_case(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        let test = if self.peek_is("default")? {
            self.read("default")?;
            None
        } else {
            self.read("case")?;
            Some(self.expression(false)?)
        };

        self.read(":")?;

        let mut consequent = Vec::new();
        while let Some(kind) = self.peek_until("}", LexMode::Regex)? {
            if matches!(kind, TokenKind::Keyword("case" | "default")) {
                break;
            }
            consequent.push(self.statement_list_item()?);
        }

        Ok(self.finish(NodeKind::SwitchCase { test, consequent }, start))
    }

    fn try_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("try")?;
        let block = self.block()?;

        let handler = if self.peek_is("catch")? {
            Some(self.catch_clause()?)
        } else {
            None
        };

        let finalizer = if self.peek_is("finally")? {
            self.read("finally")?;
            Some(self.block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("Missing catch or finally after try"));
        }

        Ok(self.finish(
            NodeKind::TryStatement {
                block: Some(block),
                handler,
                finalizer,
            },
            start,
        ))
    }

    fn catch_clause(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("catch")?;

        let param = if self.peek_is("(")? {
            self.read("(")?;
            let param = self.binding_pattern()?;
            self.read(")")?;
            Some(param)
        } else {
            None
        };

        let body = self.block()?;

        Ok(self.finish(
            NodeKind::CatchClause {
                param,
                body: Some(body),
            },
            start,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Statements up to `}` or end of input. With `prologue`, leading string
    /// statements are scanned for directives.
    pub(super) fn statement_list(&mut self, prologue: bool) -> ParseResult<Vec<NodeId>> {
        let mut list = Vec::new();
        let mut prologue = prologue;

        while self.peek_until("}", LexMode::Regex)?.is_some() {
            let node = self.statement_list_item()?;

            if prologue {
                let literal = match self.ast.get(node) {
                    NodeKind::ExpressionStatement {
                        expression: Some(expression),
                    } if self.ast.kind(*expression) == Kind::StringLiteral => Some(*expression),
                    _ => None,
                };

                match literal {
                    Some(expression) => self.check_directive(node, expression)?,
                    None => prologue = false,
                }
            }

            list.push(node);
        }

        Ok(list)
    }

    fn check_directive(&mut self, statement: NodeId, literal: NodeId) -> ParseResult<()> {
        // Directives match on the raw text, so escapes disqualify them
        let span = self.ast.span(literal);
        let source = self.source;
        let text = &source[span.start + 1..span.end - 1];

        if text != "use strict" {
            return Ok(());
        }

        *self.ast.get_mut(statement) = NodeKind::Directive {
            value: text.to_string(),
            expression: Some(literal),
        };

        if !self.context.allow_use_strict {
            return Err(self.error_at("Invalid \"use strict\" directive", statement));
        }

        self.set_strict(true);
        Ok(())
    }

    pub(super) fn statement_list_item(&mut self) -> ParseResult<NodeId> {
        match self.peek(LexMode::Regex)? {
            TokenKind::Punct("#[") => {
                let annotations = self.annotations()?;
                let item = self.statement_list_item()?;
                return self.annotate(annotations, item);
            }
            TokenKind::Keyword("function") => return self.function_declaration(),
            TokenKind::Keyword("class") => return self.class_declaration(),
            TokenKind::Keyword("const") => return self.lexical_declaration(),
            TokenKind::Identifier => {
                if self.peek_let()? {
                    return self.lexical_declaration();
                }
                match self.peek_async()? {
                    "function" => return self.function_declaration(),
                    "{" => return self.async_block(),
                    _ => {}
                }
            }
            _ => {}
        }

        self.statement(None)
    }

    pub(super) fn lexical_declaration(&mut self) -> ParseResult<NodeId> {
        let node = self.variable_declaration(false)?;
        self.semicolon()?;
        self.ast.set_end(node, self.token_end);
        Ok(node)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Functions
    // ─────────────────────────────────────────────────────────────────────────

    /// `async`? `function` `*`?
    fn function_head(&mut self) -> ParseResult<FunctionKind> {
        let mut kind = FunctionKind::Normal;

        if self.peek_token(LexMode::Regex)?.keyword_value() == "async" {
            self.read_token(LexMode::Regex)?;
            kind = FunctionKind::Async;
        }

        self.read("function")?;

        if self.peek_is("*")? {
            self.read("*")?;
            kind = if kind == FunctionKind::Async {
                FunctionKind::AsyncGenerator
            } else {
                FunctionKind::Generator
            };
        }

        Ok(kind)
    }

    pub(super) fn function_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let kind = self.function_head()?;

        self.push_context(false);
        self.set_function_type(kind);

        let identifier = self.binding_identifier()?;
        let params = self.formal_parameters()?;
        let body = self.function_body()?;

        self.pop_context(false)?;

        Ok(self.finish(
            NodeKind::FunctionDeclaration {
                kind,
                identifier: Some(identifier),
                params,
                body: Some(body),
            },
            start,
        ))
    }

    pub(super) fn function_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let kind = self.function_head()?;

        self.push_context(false);
        self.set_function_type(kind);

        let identifier = if self.peek_is("(")? {
            None
        } else {
            Some(self.binding_identifier()?)
        };
        let params = self.formal_parameters()?;
        let body = self.function_body()?;

        self.pop_context(false)?;

        Ok(self.finish(
            NodeKind::FunctionExpression {
                kind,
                identifier,
                params,
                body: Some(body),
            },
            start,
        ))
    }

    /// A method of an object literal (`class_kind` is `None`) or a class.
    /// In a class body this may turn out to be a field.
    pub(super) fn method_definition(
        &mut self,
        name: Option<NodeId>,
        kind: FunctionKind,
        class_kind: Option<ClassKind>,
    ) -> ParseResult<NodeId> {
        let start = match name {
            Some(name) => self.ast.span(name).start,
            None => self.node_start()?,
        };

        let mut kind = kind;
        let name = match name {
            None if self.peek(LexMode::Name)? == TokenKind::Punct("*") => {
                self.read_token(LexMode::Name)?;
                kind = FunctionKind::Generator;
                self.property_name()?
            }
            name => {
                let mut name = match name {
                    Some(name) => name,
                    None => self.property_name()?,
                };

                let value = self.ast.keyword_value(name).to_string();
                let next = self.peek_token(LexMode::Name)?;
                let (next_kind, next_newline) = (next.kind, next.newline_before);

                if class_kind.is_some() && matches!(next_kind, TokenKind::Punct(";" | "}" | "=")) {
                    return self.class_field(name);
                }

                if next_kind != TokenKind::Punct("(") {
                    if value == "get" || value == "set" {
                        kind = if value == "get" {
                            FunctionKind::Get
                        } else {
                            FunctionKind::Set
                        };
                        name = self.property_name()?;
                    } else if value == "async" && !next_newline {
                        if next_kind == TokenKind::Punct("*") {
                            self.read_token(LexMode::Name)?;
                            kind = FunctionKind::AsyncGenerator;
                        } else {
                            kind = FunctionKind::Async;
                        }
                        name = self.property_name()?;
                    } else if class_kind.is_some() && next_newline {
                        return self.class_field(name);
                    }
                }

                name
            }
        };

        self.push_context(false);
        self.context.is_method = true;
        self.set_function_type(kind);

        if kind == FunctionKind::Constructor && class_kind == Some(ClassKind::Derived) {
            self.context.allow_super_call = true;
        }

        let params = if matches!(kind, FunctionKind::Get | FunctionKind::Set) {
            self.accessor_parameters(kind)?
        } else {
            self.formal_parameters()?
        };

        let body = self.function_body()?;
        self.pop_context(false)?;

        Ok(self.finish(
            NodeKind::MethodDefinition {
                is_static: false,
                kind,
                name: Some(name),
                params,
                body: Some(body),
            },
            start,
        ))
    }

    fn accessor_parameters(&mut self, kind: FunctionKind) -> ParseResult<Vec<NodeId>> {
        let mut list = Vec::new();

        self.read("(")?;
        if kind == FunctionKind::Set {
            list.push(self.formal_parameter(false)?);
        }
        self.read(")")?;

        self.check_parameters(&list, false)?;
        Ok(list)
    }

    fn formal_parameters(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut list = Vec::new();

        self.read("(")?;

        while self.peek_until(")", LexMode::Regex)?.is_some() {
            // A rest parameter ends the list
            if self.peek_is("...")? {
                list.push(self.rest_parameter()?);
                break;
            }

            list.push(self.formal_parameter(true)?);

            if !self.peek_is(")")? {
                self.read(",")?;
            }
        }

        self.read(")")?;

        self.check_parameters(&list, false)?;
        Ok(list)
    }

    fn formal_parameter(&mut self, allow_default: bool) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let pattern = self.binding_pattern()?;

        let initializer = if allow_default && self.peek_is("=")? {
            self.read("=")?;
            Some(self.assignment_expression(false, false)?)
        } else {
            None
        };

        Ok(self.finish(
            NodeKind::FormalParameter {
                pattern: Some(pattern),
                initializer,
            },
            start,
        ))
    }

    fn rest_parameter(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        self.read("...")?;
        let pattern = self.binding_pattern()?;
        Ok(self.finish(
            NodeKind::RestParameter {
                pattern: Some(pattern),
            },
            start,
        ))
    }

    pub(super) fn function_body(&mut self) -> ParseResult<NodeId> {
        self.context.function_body = true;

        let start = self.node_start()?;
        self.read("{")?;
        let statements = self.statement_list(true)?;
        self.read("}")?;

        Ok(self.finish(NodeKind::FunctionBody { statements }, start))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Classes
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn class_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("class")?;
        let identifier = self.binding_identifier()?;
        let (base, mixins, class_kind) = self.class_heritage()?;
        let body = self.class_body(class_kind)?;

        Ok(self.finish(
            NodeKind::ClassDeclaration {
                identifier: Some(identifier),
                base,
                mixins,
                body: Some(body),
            },
            start,
        ))
    }

    pub(super) fn class_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("class")?;
        let identifier = if self.peek(LexMode::Regex)? == TokenKind::Identifier {
            Some(self.binding_identifier()?)
        } else {
            None
        };
        let (base, mixins, class_kind) = self.class_heritage()?;
        let body = self.class_body(class_kind)?;

        Ok(self.finish(
            NodeKind::ClassExpression {
                identifier,
                base,
                mixins,
                body: Some(body),
            },
            start,
        ))
    }

    /// `extends Base`? `with A, B`?
    fn class_heritage(&mut self) -> ParseResult<(Option<NodeId>, Vec<NodeId>, ClassKind)> {
        let mut base = None;
        let mut class_kind = ClassKind::Base;
        let mut mixins = Vec::new();

        if self.peek_is("extends")? {
            self.read("extends")?;
            class_kind = ClassKind::Derived;
            base = Some(self.member_expression(true)?);
        }

        if self.peek_is("with")? {
            self.read("with")?;
            loop {
                mixins.push(self.member_expression(true)?);
                if self.peek_is(",")? {
                    self.read(",")?;
                } else {
                    break;
                }
            }
        }

        Ok((base, mixins, class_kind))
    }

    fn class_body(&mut self, class_kind: ClassKind) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut has_constructor = false;
        let mut elements = Vec::new();

        self.push_context(true);
        self.set_strict(true);
        self.read("{")?;

        while self.peek_until("}", LexMode::Name)?.is_some() {
            let annotations = self.annotations()?;
            let element = self.class_element(class_kind)?;
            let element = self.annotate(annotations, element)?;

            if let NodeKind::MethodDefinition {
                kind: FunctionKind::Constructor,
                name: Some(name),
                ..
            } = self.ast.get(element)
            {
                if has_constructor {
                    return Err(self.error_at("Duplicate constructor definitions", *name));
                }
                has_constructor = true;
            }

            elements.push(element);
        }

        self.read("}")?;
        self.pop_context(false)?;

        Ok(self.finish(NodeKind::ClassBody { elements }, start))
    }

    fn class_element(&mut self, class_kind: ClassKind) -> ParseResult<NodeId> {
        let token = self.peek_token(LexMode::Name)?.clone();
        let start = token.span.start;

        if token.is_punct(";") {
            self.read_token(LexMode::Name)?;
            return Ok(self.finish(NodeKind::EmptyClassElement {}, start));
        }

        let mut is_static = false;
        if token.kind == TokenKind::Identifier && token.value == "static" {
            let next = self.peek_at(LexMode::Name)?;
            if next == TokenKind::Punct("{") {
                return self.class_initializer(start);
            }
            if matches!(
                next,
                TokenKind::Identifier
                    | TokenKind::String
                    | TokenKind::Number
                    | TokenKind::Symbol
                    | TokenKind::Punct("[" | "*")
            ) {
                self.read_token(LexMode::Name)?;
                is_static = true;
            }
        }

        let mut kind = FunctionKind::Normal;
        let mut name = None;

        if matches!(self.peek(LexMode::Name)?, TokenKind::Identifier | TokenKind::Punct("[")) {
            let property = self.property_name()?;
            if !is_static && self.ast.identifier_value(property) == Some("constructor") {
                kind = FunctionKind::Constructor;
            }
            name = Some(property);
        }

        let element = self.method_definition(name, kind, Some(class_kind))?;

        let (name, is_field, element_kind) = match self.ast.get(element) {
            NodeKind::MethodDefinition { name, kind, .. } => (*name, false, Some(*kind)),
            NodeKind::ClassField { name, .. } => (*name, true, None),
            _ => (None, false, None),
        };

        if let Some(name) = name {
            if let Some(value) = self.ast.identifier_value(name) {
                let invalid = if is_static {
                    value == "prototype" || (value == "constructor" && is_field)
                } else {
                    value == "constructor" && element_kind != Some(FunctionKind::Constructor)
                };

                if invalid {
                    let message = format!("Invalid {} property in class definition", value);
                    return Err(self.error_at(&message, name));
                }
            }
        }

        let node = self.ast.node_mut(element);
        node.span.start = start;
        match &mut node.kind {
            NodeKind::MethodDefinition { is_static: flag, .. }
            | NodeKind::ClassField { is_static: flag, .. } => *flag = is_static,
            _ => {}
        }

        Ok(element)
    }

    /// `static` `{` statements `}`. `this` is the class and `super` refers
    /// to its base, as in a static method.
    fn class_initializer(&mut self, start: usize) -> ParseResult<NodeId> {
        self.read_token(LexMode::Name)?;

        self.push_context(false);
        self.context.is_method = true;

        self.read("{")?;
        let statements = self.statement_list(false)?;
        self.read("}")?;

        self.pop_context(false)?;

        Ok(self.finish(NodeKind::ClassInitializer { statements }, start))
    }

    fn class_field(&mut self, name: NodeId) -> ParseResult<NodeId> {
        let initializer = if self.peek(LexMode::Name)? == TokenKind::Punct("=") {
            self.read_token(LexMode::Name)?;
            Some(self.assignment_expression(false, false)?)
        } else {
            None
        };

        self.semicolon()?;

        let start = self.ast.span(name).start;
        Ok(self.finish(
            NodeKind::ClassField {
                is_static: false,
                name: Some(name),
                initializer,
            },
            start,
        ))
    }
}
