//! `subject->callee(args)` becomes `callee(subject, args)`.

use crate::ast::{NodeId, NodeKind};
use crate::error::CompileResult;
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("call-with", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut CallWithVisitor)
}

struct CallWithVisitor;

impl Visitor for CallWithVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        if !matches!(tree.ast().get(node), NodeKind::CallWithExpression { .. }) {
            return Ok(Visit::Descend);
        }

        // Chained calls nest in the subject
        tree.visit_children(path, self)?;

        let call = match tree.ast().get(node).clone() {
            NodeKind::CallWithExpression {
                trailing_comma,
                subject,
                callee,
                arguments,
            } => NodeKind::CallExpression {
                trailing_comma,
                callee,
                arguments: subject.into_iter().chain(arguments).collect(),
            },
            _ => return Ok(Visit::Handled),
        };

        let span = tree.ast().span(node);
        let ast = tree.ast_mut();
        let replacement = ast.add(call);
        ast.set_span(replacement, span);

        tree.replace_node(path, replacement);
        Ok(Visit::Handled)
    }
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{expect, script};

    #[test]
    fn test_call_with() {
        expect(script("obj->foo.bar(1, 2);"), "foo.bar(obj, 1, 2);");
    }

    #[test]
    fn test_call_with_no_arguments() {
        expect(script("x->f();"), "f(x);");
    }

    #[test]
    fn test_chained_call_with() {
        expect(script("x->f(1)->g(2);"), "g(f(x, 1), 2);");
    }
}
