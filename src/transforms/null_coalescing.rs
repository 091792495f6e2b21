//! `a ?? b` becomes a conditional on `a != null`, evaluating `a` once.

use crate::ast::{Kind, NodeId, NodeKind, VariableKind};
use crate::error::CompileResult;
use crate::path::{Declaration, PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates::{self, TemplateValue};

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("null-coalescing", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut NullCoalescingVisitor)
}

struct NullCoalescingVisitor;

impl Visitor for NullCoalescingVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        let (left, right) = match tree.ast().get(node) {
            NodeKind::BinaryExpression { operator: "??", .. } => {
                tree.visit_children(path, self)?;
                match tree.ast().get(node) {
                    NodeKind::BinaryExpression {
                        left: Some(left),
                        right: Some(right),
                        ..
                    } => (*left, *right),
                    _ => return Ok(Visit::Handled),
                }
            }
            _ => return Ok(Visit::Descend),
        };

        let replacement = if tree.ast().kind(left) == Kind::Identifier {
            let test = tree.ast_mut().deep_clone(left);
            templates::expression(
                tree.ast_mut(),
                "($$0 != null ? $$1 : $$2)",
                vec![test.into(), left.into(), right.into()],
            )?
        } else {
            let temp = tree.unique_identifier(path, "_temp", Some(Declaration::new(VariableKind::Let)));
            templates::expression(
                tree.ast_mut(),
                "($$0 = $$1, $$0 != null ? $$0 : $$2)",
                vec![TemplateValue::from(temp), left.into(), right.into()],
            )?
        };

        tree.replace_node(path, replacement);
        Ok(Visit::Handled)
    }
}
