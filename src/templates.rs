//! Code Templates for Skert Compiler
//!
//! Passes describe generated code as source text with numbered holes
//! (`$$0`, `$$1`, ...) instead of assembling nodes by hand. A template is
//! parsed as a module into a scratch arena and then copied into the
//! target arena, filling each hole on the way. Copied template nodes get
//! synthetic spans; filled-in nodes keep their own.

use crate::ast::{Ast, IdentContext, NodeId, NodeKind};
use crate::error::{CompileError, CompileResult};
use crate::parser::parse_module;

/// What fills a `$$N` hole.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// An existing node of the target arena.
    Node(NodeId),
    /// A name, inserted as an identifier.
    Name(String),
}

impl From<NodeId> for TemplateValue {
    fn from(node: NodeId) -> Self {
        TemplateValue::Node(node)
    }
}

impl From<&str> for TemplateValue {
    fn from(name: &str) -> Self {
        TemplateValue::Name(name.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(name: String) -> Self {
        TemplateValue::Name(name)
    }
}

pub struct Template<'a> {
    ast: &'a mut Ast,
    values: Vec<TemplateValue>,
    used: Vec<bool>,
}

impl<'a> Template<'a> {
    /// Parse `source` and copy it into `ast`, returning the new `Module`.
    pub fn parse(ast: &'a mut Ast, source: &str, values: Vec<TemplateValue>) -> CompileResult<NodeId> {
        let parsed = parse_module(source)
            .map_err(|e| CompileError::Template(format!("{} in `{}`", e.message, source.trim())))?;

        let used = vec![false; values.len()];
        let mut template = Template { ast, values, used };
        template.graft(&parsed.ast, parsed.root)
    }

    fn graft(&mut self, from: &Ast, id: NodeId) -> CompileResult<NodeId> {
        if let NodeKind::Identifier { value, context } = from.get(id) {
            if let Some(index) = placeholder_index(value) {
                return self.fill(index, *context);
            }
        }

        let mut kind = from.get(id).clone();
        let mut children = Vec::new();
        kind.for_each_child(|child, _| children.push(child));

        let grafted = children
            .into_iter()
            .map(|child| self.graft(from, child))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut grafted = grafted.into_iter();
        kind.for_each_child_mut(|slot| {
            if let Some(copy) = grafted.next() {
                *slot = copy;
            }
        });

        Ok(self.ast.add(kind))
    }

    fn fill(&mut self, index: usize, context: IdentContext) -> CompileResult<NodeId> {
        let value = self
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| CompileError::Template(format!("no value for placeholder $${}", index)))?;

        let node = match value {
            TemplateValue::Name(name) => self.ast.add(NodeKind::Identifier {
                value: name,
                context,
            }),
            // A node may occupy only one slot
            TemplateValue::Node(node) if self.used[index] => self.ast.deep_clone(node),
            TemplateValue::Node(node) => node,
        };

        self.used[index] = true;
        Ok(node)
    }
}

fn placeholder_index(value: &str) -> Option<usize> {
    value.strip_prefix("$$")?.parse().ok()
}

fn module_statements(ast: &Ast, module: NodeId) -> Vec<NodeId> {
    match ast.get(module) {
        NodeKind::Module { statements } => statements.clone(),
        _ => Vec::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn module_template(ast: &mut Ast, source: &str, values: Vec<TemplateValue>) -> CompileResult<NodeId> {
    Template::parse(ast, source, values)
}

pub fn statement_list(
    ast: &mut Ast,
    source: &str,
    values: Vec<TemplateValue>,
) -> CompileResult<Vec<NodeId>> {
    let module = Template::parse(ast, source, values)?;
    Ok(module_statements(ast, module))
}

pub fn statement(ast: &mut Ast, source: &str, values: Vec<TemplateValue>) -> CompileResult<NodeId> {
    statement_list(ast, source, values)?
        .into_iter()
        .next()
        .ok_or_else(|| CompileError::Template(format!("no statement in `{}`", source.trim())))
}

pub fn expression(ast: &mut Ast, source: &str, values: Vec<TemplateValue>) -> CompileResult<NodeId> {
    let statement = statement(ast, source, values)?;
    match ast.get(statement) {
        NodeKind::ExpressionStatement {
            expression: Some(expression),
        } => Ok(*expression),
        _ => Err(CompileError::Template(format!(
            "`{}` is not an expression",
            source.trim()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_fills_holes() {
        let mut ast = Ast::new();
        let left = ast.identifier("a");
        let expr = expression(&mut ast, "$$0 + $$1", vec![left.into(), "b".into()]).unwrap();

        let json = ast.to_json(expr);
        assert_eq!(json["operator"], "+");
        assert_eq!(json["right"]["value"], "b");
        assert_eq!(json["right"]["context"], "variable");
        assert!(ast.span(expr).is_synthetic());

        match ast.get(expr) {
            NodeKind::BinaryExpression { left: Some(l), .. } => assert_eq!(*l, left),
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_reused_node_is_cloned() {
        let mut ast = Ast::new();
        let value = ast.identifier("x");
        let expr = expression(&mut ast, "$$0 != null ? $$0 : y", vec![value.into()]).unwrap();

        let mut ids = Vec::new();
        match ast.get(expr) {
            NodeKind::ConditionalExpression {
                test: Some(test),
                consequent: Some(consequent),
                ..
            } => {
                if let NodeKind::BinaryExpression { left: Some(l), .. } = ast.get(*test) {
                    ids.push(*l);
                }
                ids.push(*consequent);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }

        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], value);
        assert_ne!(ids[1], value);
        assert_eq!(ast.identifier_value(ids[1]), Some("x"));
    }

    #[test]
    fn test_declaration_hole_keeps_binding_context() {
        let mut ast = Ast::new();
        let list = statement_list(&mut ast, "let $$0 = 1; $$0;", vec!["tmp".into()]).unwrap();

        assert_eq!(list.len(), 2);
        let json = ast.to_json(list[0]);
        assert_eq!(json["declarations"][0]["pattern"]["value"], "tmp");
        assert_eq!(json["declarations"][0]["pattern"]["context"], "declaration");
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let mut ast = Ast::new();
        match expression(&mut ast, "$$1", vec!["a".into()]) {
            Err(CompileError::Template(message)) => assert!(message.contains("$$1")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_source_is_an_error() {
        let mut ast = Ast::new();
        assert!(matches!(
            statement(&mut ast, "let = ;", vec![]),
            Err(CompileError::Template(_))
        ));
    }
}
