//! `async { ... }` blocks become immediately invoked async arrows whose
//! rejections are rethrown outside the promise chain.

use crate::ast::{FunctionKind, Kind, NodeId, NodeKind};
use crate::error::CompileResult;
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates;

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("async-blocks", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut AsyncBlockVisitor)
}

struct AsyncBlockVisitor;

impl Visitor for AsyncBlockVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        if tree.ast().kind(node) != Kind::AsyncBlock {
            return Ok(Visit::Descend);
        }

        tree.visit_children(path, self)?;

        let statements = match tree.ast_mut().get_mut(node) {
            NodeKind::AsyncBlock { statements } => std::mem::take(statements),
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

        let statement = templates::statement(
            ast,
            "($$0)().catch((e) => { setTimeout(() => { throw e; }, 0); });",
            vec![arrow.into()],
        )?;

        tree.replace_node(path, statement);
        Ok(Visit::Handled)
    }
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{expect, script};

    #[test]
    fn test_async_block() {
        expect(
            script("async { await 1 }"),
            "
            (async () => {
              await 1;
            })().catch((e) => {
              setTimeout(() => {
                throw e;
              }, 0);
            });
            ",
        );
    }

    #[test]
    fn test_nested_async_blocks() {
        let output = script("async { async { await 2 } }");
        assert_eq!(output.matches("(async () => {").count(), 2);
        assert_eq!(output.matches(".catch((e) => {").count(), 2);
        assert!(!output.contains("async {"));
    }
}
