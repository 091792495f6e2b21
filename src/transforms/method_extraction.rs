//! `&obj.method` becomes a frozen function bound to `obj`. Objects other
//! than plain identifiers are evaluated once through a temporary.

use crate::ast::{Kind, NodeId, NodeKind, VariableKind};
use crate::error::CompileResult;
use crate::path::{Declaration, PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates::{self, TemplateValue};

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("method-extraction", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut MethodExtractionVisitor)
}

struct MethodExtractionVisitor;

fn is_extraction(tree: &PathTree, node: NodeId) -> bool {
    matches!(
        tree.ast().get(node),
        NodeKind::UnaryExpression { operator: "&", .. }
    )
}

impl Visitor for MethodExtractionVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        if !is_extraction(tree, node) {
            return Ok(Visit::Descend);
        }

        tree.visit_children(path, self)?;

        let member = match tree.ast().get(node) {
            NodeKind::UnaryExpression {
                expression: Some(expression),
                ..
            } => tree.ast().unwrap_parens(*expression),
            _ => return Ok(Visit::Handled),
        };

        let (object, property) = match tree.ast().get(member) {
            NodeKind::MemberExpression {
                object: Some(object),
                property: Some(property),
            } => (*object, *property),
            _ => return Ok(Visit::Handled),
        };

        let replacement = if tree.ast().kind(object) == Kind::Identifier {
            let receiver = tree.ast_mut().deep_clone(object);
            templates::expression(
                tree.ast_mut(),
                "Object.freeze($$0.bind($$1))",
                vec![member.into(), receiver.into()],
            )?
        } else {
            let temp = tree.unique_identifier(path, "_tmp", Some(Declaration::new(VariableKind::Let)));
            let ast = tree.ast_mut();
            let receiver = ast.identifier(&temp);
            let method = ast.member(receiver, property);
            templates::expression(
                ast,
                "($$0 = $$1, Object.freeze($$2.bind($$0)))",
                vec![TemplateValue::from(temp), object.into(), method.into()],
            )?
        };

        tree.replace_node(path, replacement);
        Ok(Visit::Handled)
    }
}
