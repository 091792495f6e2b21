//! Expression grammar: assignment down to primary expressions, literals
//! and the arrow-function cover grammar.

use crate::ast::{FunctionKind, IdentContext, Kind, NodeId, NodeKind};
use crate::error::ParseError;
use crate::lexer::{LexMode, TokenKind};
use crate::span::Span;

use super::{kind_is, unexpected, ParseResult, Parser};

/// Binary operator precedence, lowest binding first. Zero for non-operators.
fn precedence(op: &str) -> u8 {
    match op {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" | "===" | "!==" => 7,
        "<=" | ">=" | ">" | "<" | "instanceof" | "in" => 8,
        ">>>" | ">>" | "<<" => 9,
        "+" | "-" => 10,
        "*" | "/" | "%" => 11,
        "**" => 12,
        _ => 0,
    }
}

fn binary_operator(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Punct(op) | TokenKind::Keyword(op) if precedence(op) > 0 => Some(op),
        _ => None,
    }
}

fn is_assignment(op: &str) -> bool {
    matches!(
        op,
        "=" | "*=" | "**=" | "&=" | "^=" | "|=" | "<<=" | ">>=" | ">>>=" | "%=" | "+=" | "-=" | "/="
    )
}

fn unary_operator(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Keyword(op @ ("delete" | "void" | "typeof")) => Some(op),
        TokenKind::Punct(op @ ("!" | "~" | "+" | "-" | "&")) => Some(op),
        _ => None,
    }
}

fn is_valid_meta(left: &str, right: &str) -> bool {
    match left {
        "new" => right == "target",
        "import" => right == "meta",
        _ => false,
    }
}

impl<'a> Parser<'a> {
    pub(super) fn expression(&mut self, no_in: bool) -> ParseResult<NodeId> {
        let first = self.assignment_expression(no_in, false)?;
        let mut list: Option<Vec<NodeId>> = None;
        let mut trailing_comma = false;

        while self.peek(LexMode::Div)? == TokenKind::Punct(",") {
            self.read_token(LexMode::Div)?;
            let items = list.get_or_insert_with(|| vec![first]);

            if self.peek_is(")")? {
                trailing_comma = true;
                break;
            }

            let next = self.assignment_expression(no_in, false)?;
            items.push(next);
        }

        let expressions = match list {
            Some(expressions) => expressions,
            None => return Ok(first),
        };

        let start = self.ast.span(first).start;
        let node = self.finish(NodeKind::SequenceExpression { expressions }, start);

        if trailing_comma {
            self.add_invalid_node("Invalid trailing comma in sequence expression", node, false);
        }

        Ok(node)
    }

    pub(super) fn assignment_expression(
        &mut self,
        no_in: bool,
        allow_spread: bool,
    ) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        if self.peek_is("...")? {
            self.read("...")?;
            let expression = self.assignment_expression(no_in, false)?;
            let node = self.finish(
                NodeKind::SpreadExpression {
                    expression: Some(expression),
                },
                start,
            );

            if !allow_spread {
                self.add_invalid_node("Invalid spread expression", node, false);
            }

            return Ok(node);
        }

        if self.peek_yield()? {
            return self.yield_expression(no_in);
        }

        let node = self.conditional_expression(no_in)?;

        if self.ast.kind(node) == Kind::ArrowFunctionHead {
            return self.arrow_function_body(node, no_in);
        }

        let operator = match self.peek(LexMode::Div)? {
            TokenKind::Punct(op) if is_assignment(op) => op,
            _ => return Ok(node),
        };

        self.check_assignment_target(node, operator != "=")?;
        self.read_token(LexMode::Div)?;
        let right = self.assignment_expression(no_in, false)?;

        Ok(self.finish(
            NodeKind::AssignmentExpression {
                operator,
                left: Some(node),
                right: Some(right),
            },
            start,
        ))
    }

    fn yield_expression(&mut self, no_in: bool) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut delegate = false;
        let mut expression = None;

        self.read_keyword("yield")?;

        if !self.peek_expression_end()? {
            if self.peek_is("*")? {
                self.read("*")?;
                delegate = true;
            }
            expression = Some(self.assignment_expression(no_in, false)?);
        }

        self.context.has_yield_await = true;

        Ok(self.finish(NodeKind::YieldExpression { delegate, expression }, start))
    }

    /// A literal or identifier directly followed by `,`, `;`, `}` or `]`.
    fn peek_trivial_expression(&mut self) -> ParseResult<bool> {
        match self.peek(LexMode::Regex)? {
            TokenKind::Keyword("null" | "false" | "true" | "this")
            | TokenKind::Number
            | TokenKind::Identifier
            | TokenKind::String => Ok(matches!(
                self.peek_at(LexMode::Div)?,
                TokenKind::Punct("," | ";" | "}" | "]")
            )),
            _ => Ok(false),
        }
    }

    fn conditional_expression(&mut self, no_in: bool) -> ParseResult<NodeId> {
        if self.peek_trivial_expression()? {
            return self.primary_expression();
        }

        let start = self.node_start()?;
        let test = self.binary_expression(no_in)?;

        if self.peek(LexMode::Div)? != TokenKind::Punct("?") {
            return Ok(test);
        }

        self.read("?")?;
        let consequent = self.assignment_expression(false, false)?;
        self.read(":")?;
        let alternate = self.assignment_expression(no_in, false)?;

        Ok(self.finish(
            NodeKind::ConditionalExpression {
                test: Some(test),
                consequent: Some(consequent),
                alternate: Some(alternate),
            },
            start,
        ))
    }

    fn binary_expression(&mut self, no_in: bool) -> ParseResult<NodeId> {
        let lhs = self.unary_expression()?;
        self.partial_binary_expression(lhs, 0, no_in)
    }

    fn partial_binary_expression(
        &mut self,
        mut lhs: NodeId,
        min_prec: u8,
        no_in: bool,
    ) -> ParseResult<NodeId> {
        loop {
            let op = match binary_operator(self.peek(LexMode::Div)?) {
                Some(op) => op,
                None => break,
            };

            if op == "in" && no_in {
                break;
            }

            if op == "**" && self.ast.kind(lhs) == Kind::UnaryExpression {
                return Err(
                    self.error_here("Unary expression cannot be the left operand of **")
                );
            }

            let prec = precedence(op);
            if prec < min_prec {
                break;
            }

            self.read_token(LexMode::Div)?;
            let mut rhs = self.unary_expression()?;

            // Climb while the next operator binds tighter, or equally for the
            // right-associative `**`
            loop {
                let next = match binary_operator(self.peek(LexMode::Div)?) {
                    Some(next) => next,
                    None => break,
                };
                let next_prec = precedence(next);
                if (next == "in" && no_in)
                    || next_prec < prec
                    || (next_prec == prec && next != "**")
                {
                    break;
                }
                rhs = self.partial_binary_expression(rhs, next_prec, no_in)?;
            }

            if op == "??" && self.is_logical_expression(lhs) {
                return Err(self.error_at("Cannot mix ?? with || or && without parentheses", lhs));
            }

            let span = Span::new(self.ast.span(lhs).start, self.ast.span(rhs).end);
            lhs = self.node_at(
                NodeKind::BinaryExpression {
                    operator: op,
                    left: Some(lhs),
                    right: Some(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn is_logical_expression(&self, node: NodeId) -> bool {
        matches!(
            self.ast.get(node),
            NodeKind::BinaryExpression { operator: "||" | "&&", .. }
        )
    }

    fn unary_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let kind = self.peek(LexMode::Regex)?;

        if let TokenKind::Punct(operator @ ("++" | "--")) = kind {
            self.read_token(LexMode::Regex)?;
            let expression = self.member_expression(true)?;
            let target = self.ast.unwrap_parens(expression);
            self.check_assignment_target(target, true)?;

            return Ok(self.finish(
                NodeKind::UpdateExpression {
                    operator,
                    prefix: true,
                    expression: Some(expression),
                },
                start,
            ));
        }

        let operator = if self.peek_await()? {
            self.context.has_yield_await = true;
            Some("await")
        } else {
            unary_operator(kind)
        };

        if let Some(operator) = operator {
            self.read_token(LexMode::Regex)?;
            let expression = self.unary_expression()?;

            match operator {
                "delete" => self.check_delete(expression),
                "&" => self.check_method_extraction(expression)?,
                _ => {}
            }

            return Ok(self.finish(
                NodeKind::UnaryExpression {
                    operator,
                    expression: Some(expression),
                },
                start,
            ));
        }

        let expression = self.member_expression(true)?;
        let token = self.peek_token(LexMode::Div)?;

        if let (TokenKind::Punct(operator @ ("++" | "--")), false) = (token.kind, token.newline_before)
        {
            self.read_token(LexMode::Div)?;
            let target = self.ast.unwrap_parens(expression);
            self.check_assignment_target(target, true)?;

            return Ok(self.finish(
                NodeKind::UpdateExpression {
                    operator,
                    prefix: false,
                    expression: Some(expression),
                },
                start,
            ));
        }

        Ok(expression)
    }

    pub(super) fn member_expression(&mut self, allow_call: bool) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut is_super = false;

        let mut expr = match self.peek(LexMode::Regex)? {
            TokenKind::Keyword("super") => {
                is_super = true;
                self.super_keyword()?
            }
            TokenKind::Keyword("new") => {
                if kind_is(self.peek_at(LexMode::Regex)?, ".") {
                    self.meta_property()?
                } else {
                    self.new_expression()?
                }
            }
            TokenKind::Keyword("import") => {
                if kind_is(self.peek_at(LexMode::Regex)?, ".") {
                    self.meta_property()?
                } else {
                    self.import_call()?
                }
            }
            _ => self.primary_expression()?,
        };

        loop {
            let token = self.peek_token(LexMode::Div)?;
            let (kind, newline_before) = (token.kind, token.newline_before);

            match kind {
                TokenKind::Punct(".") => {
                    self.read_token(LexMode::Div)?;
                    let property = if self.peek(LexMode::Name)? == TokenKind::Symbol {
                        self.symbol_name()?
                    } else {
                        self.identifier_name()?
                    };
                    expr = self.finish(
                        NodeKind::MemberExpression {
                            object: Some(expr),
                            property: Some(property),
                        },
                        start,
                    );
                }

                TokenKind::Punct("[") => {
                    let property = self.computed_property_name()?;
                    expr = self.finish(
                        NodeKind::MemberExpression {
                            object: Some(expr),
                            property: Some(property),
                        },
                        start,
                    );
                }

                TokenKind::Punct("->") => {
                    self.read_token(LexMode::Div)?;
                    let callee = self.member_expression(false)?;
                    let (arguments, trailing_comma) = self.arguments()?;
                    expr = self.finish(
                        NodeKind::CallWithExpression {
                            trailing_comma,
                            subject: Some(expr),
                            callee: Some(callee),
                            arguments,
                        },
                        start,
                    );
                }

                TokenKind::Punct("(") => {
                    if !allow_call {
                        break;
                    }

                    if is_super && !self.context.allow_super_call {
                        return Err(self.error_here("Invalid super call"));
                    }

                    let async_arrow = self.ast.keyword_value(expr) == "async" && !newline_before;
                    if async_arrow {
                        self.push_maybe_context();
                    }

                    let (arguments, trailing_comma) = self.arguments()?;
                    expr = self.finish(
                        NodeKind::CallExpression {
                            trailing_comma,
                            callee: Some(expr),
                            arguments,
                        },
                        start,
                    );

                    if async_arrow {
                        let next = self.peek_token(LexMode::Div)?;
                        if next.is_punct("=>") && !next.newline_before {
                            return self.arrow_function_head(FunctionKind::Async, Some(expr), start);
                        }
                        self.pop_context(true)?;
                    }
                }

                TokenKind::Template => {
                    if is_super {
                        return Err(self.unexpected_here());
                    }

                    let template = self.template_expression()?;
                    expr = self.finish(
                        NodeKind::TaggedTemplateExpression {
                            tag: Some(expr),
                            template: Some(template),
                        },
                        start,
                    );
                }

                _ => {
                    if is_super {
                        return Err(self.unexpected_here());
                    }
                    break;
                }
            }

            is_super = false;
        }

        Ok(expr)
    }

    fn new_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        self.read("new")?;

        let callee = self.member_expression(false)?;
        let (arguments, trailing_comma) = if self.peek(LexMode::Div)? == TokenKind::Punct("(") {
            self.arguments()?
        } else {
            (Vec::new(), false)
        };

        if self.ast.kind(callee) == Kind::SuperKeyword {
            return Err(self.error_at("Invalid super keyword", callee));
        }

        Ok(self.finish(
            NodeKind::NewExpression {
                trailing_comma,
                callee: Some(callee),
                arguments,
            },
            start,
        ))
    }

    fn meta_property(&mut self) -> ParseResult<NodeId> {
        let token = self.read_token(LexMode::Regex)?;
        let start = token.span.start;
        let left = match token.kind {
            TokenKind::Identifier => token.value.clone(),
            TokenKind::Keyword(word) => word.to_string(),
            _ => return Err(unexpected(&token)),
        };

        if left == "import" && !self.is_module {
            return Err(ParseError::syntax("Invalid meta property", token.span));
        }

        self.read(".")?;
        let right = self.read_kind(TokenKind::Identifier, LexMode::Name)?;

        if !is_valid_meta(&left, &right.value) {
            return Err(ParseError::syntax("Invalid meta property", right.span));
        }

        Ok(self.finish(
            NodeKind::MetaProperty {
                left,
                right: right.value,
            },
            start,
        ))
    }

    fn super_keyword(&mut self) -> ParseResult<NodeId> {
        let token = self.read("super")?;
        let node = self.node_at(NodeKind::SuperKeyword {}, token.span);

        if !self.context.is_method {
            return Err(self.error_at("Super keyword outside of method", node));
        }

        Ok(node)
    }

    /// `( args )`, returning the arguments and whether a trailing comma
    /// closed the list.
    fn arguments(&mut self) -> ParseResult<(Vec<NodeId>, bool)> {
        let mut list = Vec::new();
        let mut trailing_comma = false;

        self.read("(")?;

        while self.peek_until(")", LexMode::Regex)?.is_some() {
            list.push(self.assignment_expression(false, true)?);

            if !self.peek_is(",")? {
                break;
            }

            self.read(",")?;

            if self.peek_is(")")? {
                trailing_comma = true;
                break;
            }
        }

        self.read(")")?;
        Ok((list, trailing_comma))
    }

    fn primary_expression(&mut self) -> ParseResult<NodeId> {
        let token = self.peek_token(LexMode::Regex)?.clone();
        let start = token.span.start;

        match token.kind {
            TokenKind::Keyword("function") => self.function_expression(),
            TokenKind::Keyword("class") => self.class_expression(),
            TokenKind::Template => self.template_expression(),
            TokenKind::Number => self.number_literal(),
            TokenKind::String => self.string_literal(),
            TokenKind::Punct("{") => self.object_literal(),
            TokenKind::Punct("(") => self.paren_expression(),
            TokenKind::Punct("[") => self.array_literal(),
            TokenKind::Regex => self.regular_expression(),

            TokenKind::Identifier => {
                let value = token.keyword_value();
                let next = self.peek_token_at(LexMode::Div)?;
                let (next_kind, next_newline) = (next.kind, next.newline_before);

                if !next_newline {
                    if next_kind == TokenKind::Punct("=>") {
                        self.push_context(true);
                        let param = self.binding_identifier()?;
                        return self.arrow_function_head(FunctionKind::Normal, Some(param), start);
                    }

                    if next_kind == TokenKind::Keyword("function") {
                        return self.function_expression();
                    }

                    if value == "async" && next_kind == TokenKind::Punct("{") {
                        return self.async_expression();
                    }

                    if value == "async" && next_kind == TokenKind::Identifier {
                        self.read_token(LexMode::Regex)?;
                        self.push_context(true);
                        let param = self.binding_identifier()?;

                        let next = self.peek_token(LexMode::Div)?;
                        if !next.is_punct("=>") || next.newline_before {
                            return Err(unexpected(next));
                        }

                        return self.arrow_function_head(FunctionKind::Async, Some(param), start);
                    }
                }

                self.identifier(true)
            }

            TokenKind::Keyword("null") => {
                self.read_token(LexMode::Regex)?;
                Ok(self.node_at(NodeKind::NullLiteral {}, token.span))
            }

            TokenKind::Keyword(word @ ("true" | "false")) => {
                self.read_token(LexMode::Regex)?;
                Ok(self.node_at(
                    NodeKind::BooleanLiteral {
                        value: word == "true",
                    },
                    token.span,
                ))
            }

            TokenKind::Keyword("this") => {
                self.read_token(LexMode::Regex)?;
                Ok(self.node_at(NodeKind::ThisExpression {}, token.span))
            }

            _ => Err(unexpected(&token)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Names and literals
    // ─────────────────────────────────────────────────────────────────────────

    /// An identifier reference (`is_var`) or a label.
    pub(super) fn identifier(&mut self, is_var: bool) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Identifier, LexMode::Regex)?;
        let context = if is_var {
            IdentContext::Variable
        } else {
            IdentContext::Name
        };

        let node = self.node_at(
            NodeKind::Identifier {
                value: token.value,
                context,
            },
            token.span,
        );

        self.check_identifier(node)?;
        Ok(node)
    }

    pub(super) fn identifier_name(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Identifier, LexMode::Name)?;
        Ok(self.node_at(
            NodeKind::Identifier {
                value: token.value,
                context: IdentContext::Name,
            },
            token.span,
        ))
    }

    fn symbol_name(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Symbol, LexMode::Name)?;
        Ok(self.node_at(NodeKind::SymbolName { value: token.value }, token.span))
    }

    pub(super) fn string_literal(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::String, LexMode::Regex)?;
        let node = self.node_at(NodeKind::StringLiteral { value: token.value }, token.span);

        if let Some(error) = token.strict_error {
            self.add_strict_error(error, node);
        }

        Ok(node)
    }

    fn number_literal(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Number, LexMode::Regex)?;
        let raw = self.lexer.slice(token.span.start, token.span.end).to_string();
        let node = self.node_at(
            NodeKind::NumberLiteral {
                value: token.number,
                suffix: token.number_suffix,
                raw,
            },
            token.span,
        );

        if let Some(error) = token.strict_error {
            self.add_strict_error(error, node);
        }

        Ok(node)
    }

    /// One literal section of a template, and whether it closes the template.
    fn template_part(&mut self) -> ParseResult<(NodeId, bool)> {
        let token = self.read_kind(TokenKind::Template, LexMode::Template)?;
        let end = token.template_end;
        let raw_end = token.span.end - if end { 1 } else { 2 };
        let raw = self.lexer.slice(token.span.start + 1, raw_end).to_string();

        let node = self.node_at(
            NodeKind::TemplatePart {
                value: token.value,
                raw,
                template_end: end,
            },
            token.span,
        );

        if let Some(error) = token.strict_error {
            self.add_strict_error(error, node);
        }

        Ok((node, end))
    }

    fn regular_expression(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Regex, LexMode::Regex)?;
        Ok(self.node_at(
            NodeKind::RegularExpression {
                value: token.value,
                flags: token.regex_flags,
            },
            token.span,
        ))
    }

    pub(super) fn binding_identifier(&mut self) -> ParseResult<NodeId> {
        let token = self.read_kind(TokenKind::Identifier, LexMode::Regex)?;
        let node = self.node_at(
            NodeKind::Identifier {
                value: token.value,
                context: IdentContext::Name,
            },
            token.span,
        );

        self.check_binding_target(node)?;
        Ok(node)
    }

    pub(super) fn binding_pattern(&mut self) -> ParseResult<NodeId> {
        let node = match self.peek(LexMode::Regex)? {
            TokenKind::Punct("{") => self.object_literal()?,
            TokenKind::Punct("[") => self.array_literal()?,
            _ => return self.binding_identifier(),
        };

        self.check_binding_target(node)?;
        Ok(node)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Compound literals
    // ─────────────────────────────────────────────────────────────────────────

    fn paren_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        // May turn out to be the parameter list of an arrow function
        self.push_maybe_context();
        self.read("(")?;

        if self.peek_is(")")? {
            let next = self.peek_token_at(LexMode::Regex)?;
            if next.newline_before || !next.is_punct("=>") {
                return Err(unexpected(next));
            }
            self.read(")")?;
            return self.arrow_function_head(FunctionKind::Normal, None, start);
        }

        let expression = self.expression(false)?;
        self.read(")")?;

        let next = self.peek_token(LexMode::Div)?;
        if !next.newline_before && next.is_punct("=>") {
            return self.arrow_function_head(FunctionKind::Normal, Some(expression), start);
        }

        self.pop_context(true)?;

        Ok(self.finish(
            NodeKind::ParenExpression {
                expression: Some(expression),
            },
            start,
        ))
    }

    fn object_literal(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut comma = false;
        let mut properties = Vec::new();

        self.read("{")?;

        while self.peek_until("}", LexMode::Name)?.is_some() {
            if !comma && !properties.is_empty() {
                self.read(",")?;
                comma = true;
            } else {
                comma = false;
                let annotations = self.annotations()?;
                let property = self.property_definition()?;
                properties.push(self.annotate(annotations, property)?);
            }
        }

        self.read("}")?;

        Ok(self.finish(
            NodeKind::ObjectLiteral {
                trailing_comma: comma,
                properties,
            },
            start,
        ))
    }

    fn property_definition(&mut self) -> ParseResult<NodeId> {
        if self.peek(LexMode::Name)? == TokenKind::Punct("*") {
            return self.method_definition(None, FunctionKind::Normal, None);
        }

        let start = self.node_start()?;

        if self.peek(LexMode::Name)? == TokenKind::Punct("...") {
            self.read_token(LexMode::Name)?;
            let expression = self.assignment_expression(false, false)?;
            return Ok(self.finish(
                NodeKind::SpreadExpression {
                    expression: Some(expression),
                },
                start,
            ));
        }

        match self.peek_at(LexMode::Name)? {
            TokenKind::Punct("=") => {
                // Rescan the name as an identifier reference
                self.unpeek();
                let name = self.identifier(true)?;
                self.read("=")?;
                let initializer = self.assignment_expression(false, false)?;

                let node = self.finish(
                    NodeKind::PatternProperty {
                        name: Some(name),
                        pattern: None,
                        initializer: Some(initializer),
                    },
                    start,
                );

                // Only valid once the literal is reinterpreted as a pattern
                self.add_invalid_node("Invalid property definition in object literal", node, false);
                return Ok(node);
            }

            TokenKind::Punct("," | "}") => {
                self.unpeek();
                let name = self.identifier(true)?;
                return Ok(self.finish(
                    NodeKind::PropertyDefinition {
                        name: Some(name),
                        expression: None,
                    },
                    start,
                ));
            }

            _ => {}
        }

        let name = self.property_name()?;

        if self.peek(LexMode::Name)? == TokenKind::Punct(":") {
            self.read_token(LexMode::Name)?;
            let expression = self.assignment_expression(false, false)?;
            return Ok(self.finish(
                NodeKind::PropertyDefinition {
                    name: Some(name),
                    expression: Some(expression),
                },
                start,
            ));
        }

        self.method_definition(Some(name), FunctionKind::Normal, None)
    }

    pub(super) fn property_name(&mut self) -> ParseResult<NodeId> {
        match self.peek(LexMode::Name)? {
            TokenKind::Identifier => self.identifier_name(),
            TokenKind::String => self.string_literal(),
            TokenKind::Number => self.number_literal(),
            TokenKind::Symbol => self.symbol_name(),
            TokenKind::Punct("[") => self.computed_property_name(),
            _ => Err(self.unexpected_here()),
        }
    }

    fn computed_property_name(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("[")?;
        let expression = self.assignment_expression(false, false)?;
        self.read("]")?;

        Ok(self.finish(
            NodeKind::ComputedPropertyName {
                expression: Some(expression),
            },
            start,
        ))
    }

    fn array_literal(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut comma = false;
        let mut elements = Vec::new();

        self.read("[")?;

        while let Some(kind) = self.peek_until("]", LexMode::Regex)? {
            if kind == TokenKind::Punct(",") {
                let token = self.read_token(LexMode::Regex)?;
                elements.push(self.node_at(NodeKind::Elision {}, Span::new(token.span.start, token.span.start)));
                comma = true;
            } else {
                elements.push(self.assignment_expression(false, true)?);
                comma = false;

                if !self.peek_is("]")? {
                    self.read(",")?;
                    comma = true;
                }
            }
        }

        self.read("]")?;

        Ok(self.finish(
            NodeKind::ArrayLiteral {
                trailing_comma: comma,
                elements,
            },
            start,
        ))
    }

    fn template_expression(&mut self) -> ParseResult<NodeId> {
        let (mut atom, mut end) = self.template_part()?;
        let start = self.ast.span(atom).start;
        let mut parts = vec![atom];

        while !end {
            parts.push(self.expression(false)?);

            // The closing `}` was scanned as a punctuator; rescan it as a
            // template continuation
            self.unpeek();

            (atom, end) = self.template_part()?;
            parts.push(atom);
        }

        Ok(self.finish(NodeKind::TemplateExpression { parts }, start))
    }

    pub(super) fn async_block(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let statements = self.async_body()?;
        Ok(self.finish(NodeKind::AsyncBlock { statements }, start))
    }

    fn async_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let statements = self.async_body()?;
        Ok(self.finish(NodeKind::AsyncExpression { statements }, start))
    }

    /// `async` `{` statements `}`, parsed as an async function body.
    fn async_body(&mut self) -> ParseResult<Vec<NodeId>> {
        self.read_token(LexMode::Regex)?;

        self.push_context(false);
        self.context.is_async = true;
        self.context.function_body = true;

        self.read("{")?;
        let statements = self.statement_list(true)?;
        self.read("}")?;

        self.pop_context(false)?;
        Ok(statements)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Arrow functions
    // ─────────────────────────────────────────────────────────────────────────

    /// Confirm a speculative parameter list. The caller has already pushed
    /// the context the arrow function will own.
    fn arrow_function_head(
        &mut self,
        kind: FunctionKind,
        params: Option<NodeId>,
        start: usize,
    ) -> ParseResult<NodeId> {
        self.set_function_type(kind);

        if self.context.has_yield_await {
            return Err(self.error_here("Invalid yield or await within arrow function head"));
        }

        let params = self.check_arrow_parameters(params)?;
        Ok(self.finish(NodeKind::ArrowFunctionHead { params }, start))
    }

    fn arrow_function_body(&mut self, head: NodeId, no_in: bool) -> ParseResult<NodeId> {
        self.read("=>")?;

        let params = match self.ast.get(head) {
            NodeKind::ArrowFunctionHead { params } => params.clone(),
            _ => return Err(self.error_at("Invalid arrow function head", head)),
        };
        let start = self.ast.span(head).start;
        let kind = if self.context.is_async {
            FunctionKind::Async
        } else {
            FunctionKind::Normal
        };

        // Expression bodies parse in function-body context as well
        self.context.function_body = true;

        let body = if self.peek_is("{")? {
            self.function_body()?
        } else {
            self.assignment_expression(no_in, false)?
        };

        self.pop_context(false)?;

        Ok(self.finish(
            NodeKind::ArrowFunction {
                kind,
                params,
                body: Some(body),
            },
            start,
        ))
    }
}
