//! `async { ... }` in expression position becomes an immediately invoked
//! async arrow, so the expression evaluates to the body's promise.

use crate::ast::{FunctionKind, Kind, NodeId, NodeKind};
use crate::error::CompileResult;
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates;

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("async-expressions", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut AsyncExpressionVisitor)
}

struct AsyncExpressionVisitor;

impl Visitor for AsyncExpressionVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        if tree.ast().kind(node) != Kind::AsyncExpression {
            return Ok(Visit::Descend);
        }

        tree.visit_children(path, self)?;

        let statements = match tree.ast_mut().get_mut(node) {
            NodeKind::AsyncExpression { statements } => std::mem::take(statements),
            _ => return Ok(Visit::Handled),
        };

        let span = tree.ast().span(node);
        let ast = tree.ast_mut();
        let body = ast.add(NodeKind::FunctionBody { statements });
        let arrow = ast.add(NodeKind::ArrowFunction {
            kind: FunctionKind::Async,
            params: Vec::new(),
            body: Some(body),
        });
        ast.set_span(arrow, span);

        let call = templates::expression(ast, "($$0)()", vec![arrow.into()])?;

        tree.replace_node(path, call);
        Ok(Visit::Handled)
    }
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{expect, script};

    #[test]
    fn test_async_expression() {
        expect(
            script("x = async { await 1 };"),
            "
            x = (async () => {
              await 1;
            })();
            ",
        );
    }

    #[test]
    fn test_async_expression_as_member_object() {
        assert_eq!(script("p = async {}.then;"), "p = (async () => {})().then;");
    }

    #[test]
    fn test_async_expression_argument() {
        expect(
            script("run(async { return await load(); });"),
            "
            run((async () => {
              return await load();
            })());
            ",
        );
    }

    #[test]
    fn test_statement_position_stays_a_block() {
        let output = script("async { x = async { 1 }; }");
        assert_eq!(output.matches(".catch((e) => {").count(), 1);
        assert!(output.contains("x = (async () => {\n1;\n})();"));
    }
}
