//! Early errors and cover grammar conversion.
//!
//! Object and array literals, parenthesized lists and call arguments are
//! parsed as expressions first. Once the parser learns they were patterns
//! or parameter lists, the nodes are rewritten in place here.

use std::collections::HashSet;

use crate::ast::{IdentContext, Kind, NodeId, NodeKind, VariableKind};
use crate::lexer::{RESERVED_WORDS, STRICT_RESERVED_WORDS};

use super::{ParseResult, Parser};

fn is_restricted_name(value: &str) -> bool {
    value == "eval" || value == "arguments"
}

impl<'a> Parser<'a> {
    // ─────────────────────────────────────────────────────────────────────────
    // Identifiers
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn check_identifier(&mut self, node: NodeId) -> ParseResult<()> {
        let value = match self.ast.identifier_value(node) {
            Some(value) => value.to_string(),
            None => return Ok(()),
        };

        match value.as_str() {
            "yield" if self.context.is_generator => {
                return Err(
                    self.error_at("yield cannot be an identifier inside of a generator function", node)
                );
            }
            "await" if self.context.is_async => {
                return Err(
                    self.error_at("await cannot be an identifier inside of an async function", node)
                );
            }
            "await" if self.is_module => {
                return Err(self.error_at("Await is reserved within modules", node));
            }
            _ => {}
        }

        if RESERVED_WORDS.contains(value.as_str()) {
            return Err(self.error_at(&format!("Unexpected reserved word {}", value), node));
        }

        if STRICT_RESERVED_WORDS.contains(value.as_str()) {
            let message = format!("{} cannot be used as an identifier in strict mode", value);
            self.add_strict_error(&message, node);
        }

        Ok(())
    }

    /// An export-list local name becomes a reference to a module binding.
    pub(super) fn transform_identifier(&mut self, node: NodeId) -> ParseResult<()> {
        if let NodeKind::Identifier { context, .. } = self.ast.get_mut(node) {
            *context = IdentContext::Variable;
        }
        self.check_identifier(node)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Targets
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn check_binding_target(&mut self, node: NodeId) -> ParseResult<()> {
        match self.ast.kind(node) {
            Kind::Identifier => {
                let value = self.ast.identifier_value(node).unwrap_or_default().to_string();

                if RESERVED_WORDS.contains(value.as_str()) {
                    return Err(self.error_at("Invalid binding identifier", node));
                }

                self.check_identifier(node)?;

                if is_restricted_name(&value) {
                    let message = format!("Binding cannot be created for '{}' in strict mode", value);
                    self.add_strict_error(&message, node);
                }

                if let NodeKind::Identifier { context, .. } = self.ast.get_mut(node) {
                    *context = IdentContext::Declaration;
                }

                Ok(())
            }
            Kind::ObjectLiteral | Kind::ObjectPattern => self.transform_object_pattern(node, true),
            Kind::ArrayLiteral | Kind::ArrayPattern => self.transform_array_pattern(node, true),
            _ => Err(self.error_at("Invalid binding target", node)),
        }
    }

    /// Validate the left side of an assignment. `simple` rules out
    /// destructuring (compound operators, update expressions).
    pub(super) fn check_assignment_target(&mut self, node: NodeId, simple: bool) -> ParseResult<()> {
        match self.ast.kind(node) {
            Kind::Identifier => {
                let value = self.ast.identifier_value(node).unwrap_or_default();
                if is_restricted_name(value) {
                    let message = format!("Cannot modify {} in strict mode", value);
                    self.add_strict_error(&message, node);
                }
                Ok(())
            }
            Kind::MemberExpression => Ok(()),
            Kind::ParenExpression => {
                let inner = self.ast.unwrap_parens(node);
                self.check_assignment_target(inner, true)
            }
            Kind::ObjectLiteral | Kind::ObjectPattern if !simple => {
                self.transform_object_pattern(node, false)
            }
            Kind::ArrayLiteral | Kind::ArrayPattern if !simple => {
                self.transform_array_pattern(node, false)
            }
            _ => Err(self.error_at("Invalid assignment target", node)),
        }
    }

    fn pattern_target(&mut self, node: NodeId, binding: bool) -> ParseResult<()> {
        if binding {
            self.check_binding_target(node)
        } else {
            self.check_assignment_target(node, false)
        }
    }

    /// Split `target = default` into its parts and validate the target.
    fn transform_pattern_element(
        &mut self,
        node: NodeId,
        binding: bool,
    ) -> ParseResult<(NodeId, Option<NodeId>)> {
        let (pattern, initializer) = match self.ast.get(node) {
            NodeKind::AssignmentExpression {
                operator,
                left: Some(left),
                right,
            } => {
                if *operator != "=" {
                    return Err(self.error_at("Invalid pattern", node));
                }
                (*left, *right)
            }
            _ => (node, None),
        };

        self.pattern_target(pattern, binding)?;
        Ok((pattern, initializer))
    }

    fn transform_array_pattern(&mut self, node: NodeId, binding: bool) -> ParseResult<()> {
        let (elements, trailing_comma) = match self.ast.get(node) {
            NodeKind::ArrayLiteral {
                elements,
                trailing_comma,
            }
            | NodeKind::ArrayPattern {
                elements,
                trailing_comma,
            } => (elements.clone(), *trailing_comma),
            _ => return Err(self.error_at("Invalid pattern", node)),
        };

        let count = elements.len();
        let mut list = Vec::with_capacity(count);

        for (i, element) in elements.into_iter().enumerate() {
            match self.ast.get(element).clone() {
                NodeKind::Elision {} => list.push(element),

                NodeKind::SpreadExpression { expression: inner }
                | NodeKind::PatternRestElement { pattern: inner } => {
                    let inner = match inner {
                        Some(inner) if i + 1 == count && !trailing_comma => inner,
                        _ => return Err(self.error_at("Invalid rest element", element)),
                    };

                    self.resolve_invalid_node(element);
                    self.pattern_target(inner, binding)?;
                    *self.ast.get_mut(element) = NodeKind::PatternRestElement {
                        pattern: Some(inner),
                    };
                    list.push(element);
                }

                NodeKind::PatternElement {
                    pattern: Some(pattern),
                    ..
                } => {
                    self.pattern_target(pattern, binding)?;
                    list.push(element);
                }

                _ => {
                    let (pattern, initializer) = self.transform_pattern_element(element, binding)?;
                    let kind = NodeKind::PatternElement {
                        pattern: Some(pattern),
                        initializer,
                    };

                    if pattern == element {
                        let span = self.ast.span(element);
                        list.push(self.node_at(kind, span));
                    } else {
                        *self.ast.get_mut(element) = kind;
                        list.push(element);
                    }
                }
            }
        }

        *self.ast.get_mut(node) = NodeKind::ArrayPattern {
            trailing_comma,
            elements: list,
        };

        Ok(())
    }

    fn transform_object_pattern(&mut self, node: NodeId, binding: bool) -> ParseResult<()> {
        let (properties, trailing_comma) = match self.ast.get(node) {
            NodeKind::ObjectLiteral {
                properties,
                trailing_comma,
            }
            | NodeKind::ObjectPattern {
                properties,
                trailing_comma,
            } => (properties.clone(), *trailing_comma),
            _ => return Err(self.error_at("Invalid pattern", node)),
        };

        let count = properties.len();

        for (i, property) in properties.iter().copied().enumerate() {
            match self.ast.get(property).clone() {
                // `{ a }`
                NodeKind::PropertyDefinition {
                    name: Some(name),
                    expression: None,
                } => {
                    self.pattern_target(name, binding)?;
                    *self.ast.get_mut(property) = NodeKind::PatternProperty {
                        name: Some(name),
                        pattern: None,
                        initializer: None,
                    };
                }

                // `{ a: target }` and `{ a: target = default }`
                NodeKind::PropertyDefinition {
                    name,
                    expression: Some(expression),
                } => {
                    let (pattern, initializer) = self.transform_pattern_element(expression, binding)?;
                    *self.ast.get_mut(property) = NodeKind::PatternProperty {
                        name,
                        pattern: Some(pattern),
                        initializer,
                    };
                }

                // `{ a = default }` from the cover grammar
                NodeKind::PatternProperty { name, pattern, .. } => {
                    self.resolve_invalid_node(property);
                    match pattern.or(name) {
                        Some(target) => self.pattern_target(target, binding)?,
                        None => return Err(self.error_at("Invalid pattern", property)),
                    }
                }

                NodeKind::SpreadExpression { expression: inner }
                | NodeKind::PatternRestElement { pattern: inner } => {
                    let inner = match inner {
                        Some(inner) if i + 1 == count && !trailing_comma => inner,
                        _ => return Err(self.error_at("Invalid rest element", property)),
                    };

                    self.resolve_invalid_node(property);
                    self.pattern_target(inner, binding)?;
                    *self.ast.get_mut(property) = NodeKind::PatternRestElement {
                        pattern: Some(inner),
                    };
                }

                _ => return Err(self.error_at("Invalid pattern", property)),
            }
        }

        *self.ast.get_mut(node) = NodeKind::ObjectPattern {
            trailing_comma,
            properties,
        };

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────────────────

    /// Turn the expression covering an arrow head into formal parameters.
    fn transform_formals(&mut self, expression: Option<NodeId>) -> ParseResult<Vec<NodeId>> {
        let items = match expression {
            None => Vec::new(),
            Some(expression) => match self.ast.get(expression) {
                NodeKind::SequenceExpression { expressions } => {
                    let items = expressions.clone();
                    self.resolve_invalid_node(expression);
                    items
                }
                NodeKind::CallExpression { arguments, .. } => arguments.clone(),
                _ => vec![expression],
            },
        };

        let count = items.len();
        let mut params = Vec::with_capacity(count);

        for (i, item) in items.into_iter().enumerate() {
            if let NodeKind::SpreadExpression { expression: inner } = self.ast.get(item).clone() {
                let inner = match inner {
                    Some(inner) if i + 1 == count => inner,
                    _ => return Err(self.error_at("Invalid rest parameter", item)),
                };

                self.resolve_invalid_node(item);
                self.check_binding_target(inner)?;
                *self.ast.get_mut(item) = NodeKind::RestParameter {
                    pattern: Some(inner),
                };
                params.push(item);
                continue;
            }

            let (pattern, initializer) = self.transform_pattern_element(item, true)?;
            let kind = NodeKind::FormalParameter {
                pattern: Some(pattern),
                initializer,
            };

            if pattern == item {
                let span = self.ast.span(item);
                params.push(self.node_at(kind, span));
            } else {
                *self.ast.get_mut(item) = kind;
                params.push(item);
            }
        }

        Ok(params)
    }

    pub(super) fn check_arrow_parameters(&mut self, params: Option<NodeId>) -> ParseResult<Vec<NodeId>> {
        let list = self.transform_formals(params)?;
        self.check_parameters(&list, true)?;
        Ok(list)
    }

    /// Duplicate names are only tolerated in simple sloppy-mode lists.
    /// Non-simple lists also forbid a `"use strict"` body.
    pub(super) fn check_parameters(&mut self, params: &[NodeId], arrow: bool) -> ParseResult<()> {
        let mut simple = true;
        let mut names = Vec::new();

        for &param in params {
            match self.ast.get(param) {
                NodeKind::FormalParameter {
                    pattern: Some(pattern),
                    initializer,
                } => {
                    if initializer.is_some() || self.ast.kind(*pattern) != Kind::Identifier {
                        simple = false;
                    }
                    self.bound_names(*pattern, &mut names);
                }
                NodeKind::RestParameter {
                    pattern: Some(pattern),
                } => {
                    simple = false;
                    self.bound_names(*pattern, &mut names);
                }
                _ => {}
            }
        }

        if !simple {
            self.context.allow_use_strict = false;
        }

        let mut seen = HashSet::new();
        for name in names {
            let value = self.ast.identifier_value(name).unwrap_or_default().to_string();
            if seen.insert(value) {
                continue;
            }

            if simple && !arrow {
                self.add_strict_error("Duplicate parameter names are not allowed in strict mode", name);
            } else {
                return Err(self.error_at("Duplicate parameter names", name));
            }
        }

        Ok(())
    }

    fn bound_names(&self, pattern: NodeId, out: &mut Vec<NodeId>) {
        match self.ast.get(pattern) {
            NodeKind::Identifier { .. } => out.push(pattern),
            NodeKind::ObjectPattern { properties, .. } => {
                for &property in properties {
                    self.bound_names(property, out);
                }
            }
            NodeKind::ArrayPattern { elements, .. } => {
                for &element in elements {
                    self.bound_names(element, out);
                }
            }
            NodeKind::PatternProperty { name, pattern, .. } => {
                if let Some(target) = pattern.or(*name) {
                    self.bound_names(target, out);
                }
            }
            NodeKind::PatternElement {
                pattern: Some(target),
                ..
            }
            | NodeKind::PatternRestElement {
                pattern: Some(target),
            } => self.bound_names(*target, out),
            _ => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// `kind` is `"in"`, `"of"`, or empty for a plain `for` statement.
    pub(super) fn check_for_init(&mut self, init: Option<NodeId>, kind: &str) -> ParseResult<()> {
        let init = match init {
            Some(init) => init,
            None => return Ok(()),
        };

        let (variable_kind, declarations) = match self.ast.get(init) {
            NodeKind::VariableDeclaration { kind, declarations } => (*kind, declarations.clone()),
            _ => {
                if !kind.is_empty() {
                    let target = self.ast.unwrap_parens(init);
                    self.check_assignment_target(target, false)?;
                }
                return Ok(());
            }
        };

        if !kind.is_empty() {
            if declarations.len() != 1 {
                let message = format!("Invalid for-{} declaration", kind);
                return Err(self.error_at(&message, init));
            }

            let declaration = declarations[0];
            if let NodeKind::VariableDeclarator {
                pattern: Some(pattern),
                initializer: Some(_),
            } = self.ast.get(declaration)
            {
                let message = format!("Invalid initializer in for-{} statement", kind);
                if kind == "in"
                    && variable_kind == VariableKind::Var
                    && self.ast.kind(*pattern) == Kind::Identifier
                {
                    self.add_strict_error(&message, declaration);
                } else {
                    return Err(self.error_at(&message, declaration));
                }
            }

            return Ok(());
        }

        for declaration in declarations {
            if let NodeKind::VariableDeclarator {
                pattern: Some(pattern),
                initializer: None,
            } = self.ast.get(declaration)
            {
                if variable_kind == VariableKind::Const {
                    return Err(self.error_at("Missing const initializer", declaration));
                }
                if self.ast.kind(*pattern) != Kind::Identifier {
                    return Err(self.error_at("Missing initializer in destructuring declaration", declaration));
                }
            }
        }

        Ok(())
    }

    pub(super) fn check_delete(&mut self, node: NodeId) {
        if self.ast.kind(self.ast.unwrap_parens(node)) == Kind::Identifier {
            self.add_strict_error("Cannot delete unqualified property in strict mode", node);
        }
    }

    /// `&obj.method` requires a member expression operand.
    pub(super) fn check_method_extraction(&mut self, node: NodeId) -> ParseResult<()> {
        if self.ast.kind(node) != Kind::MemberExpression {
            return Err(self.error_at("Invalid method extraction", node));
        }
        Ok(())
    }

    /// Class and function expressions after `export default` become
    /// declarations. Returns whether that happened.
    pub(super) fn transform_default_export(&mut self, node: NodeId) -> bool {
        let converted = match self.ast.get(node).clone() {
            NodeKind::ClassExpression {
                identifier,
                base,
                mixins,
                body,
            } => NodeKind::ClassDeclaration {
                identifier,
                base,
                mixins,
                body,
            },
            NodeKind::FunctionExpression {
                kind,
                identifier,
                params,
                body,
            } => NodeKind::FunctionDeclaration {
                kind,
                identifier,
                params,
                body,
            },
            _ => return false,
        };

        *self.ast.get_mut(node) = converted;
        true
    }
}
