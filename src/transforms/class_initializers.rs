//! `static { ... }` blocks are merged, in order, into one function that is
//! called with the class as `this` once the class is defined.

use crate::ast::{FunctionKind, Kind, NodeId, NodeKind};
use crate::error::CompileResult;
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates;

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("class-initializers", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut ClassInitializerVisitor)
}

struct ClassInitializerVisitor;

impl ClassInitializerVisitor {
    /// Detach the class's initializer blocks and wrap their statements in
    /// a single `function() { ... }`.
    fn take_initializers(tree: &mut PathTree, node: NodeId) -> Option<NodeId> {
        let body = match tree.ast().get(node) {
            NodeKind::ClassDeclaration { body: Some(body), .. }
            | NodeKind::ClassExpression { body: Some(body), .. } => *body,
            _ => return None,
        };

        let ast = tree.ast_mut();
        let elements = match ast.get_mut(body) {
            NodeKind::ClassBody { elements } => std::mem::take(elements),
            _ => return None,
        };

        let (blocks, kept): (Vec<NodeId>, Vec<NodeId>) = elements
            .into_iter()
            .partition(|&element| ast.kind(element) == Kind::ClassInitializer);

        if let NodeKind::ClassBody { elements } = ast.get_mut(body) {
            *elements = kept;
        }
        if blocks.is_empty() {
            return None;
        }

        let mut statements = Vec::new();
        for block in blocks {
            if let NodeKind::ClassInitializer { statements: list } = ast.get_mut(block) {
                statements.append(list);
            }
        }

        let body = ast.add(NodeKind::FunctionBody { statements });
        Some(ast.add(NodeKind::FunctionExpression {
            kind: FunctionKind::Normal,
            identifier: None,
            params: Vec::new(),
            body: Some(body),
        }))
    }

    fn class_declaration(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<()> {
        tree.visit_children(path, self)?;

        let function = match Self::take_initializers(tree, node) {
            Some(function) => function,
            None => return Ok(()),
        };

        // Default exports may be anonymous
        let existing = match tree.ast().get(node) {
            NodeKind::ClassDeclaration { identifier, .. } => {
                (*identifier).and_then(|id| tree.ast().identifier_value(id).map(str::to_string))
            }
            _ => None,
        };
        let name = match existing {
            Some(name) => name,
            None => {
                let name = tree.unique_identifier(path, "_class", None);
                let identifier = tree.ast_mut().binding_identifier(&name);
                if let NodeKind::ClassDeclaration { identifier: slot, .. } = tree.ast_mut().get_mut(node) {
                    *slot = Some(identifier);
                }
                name
            }
        };

        let target = match tree.parent_node(path).map(|parent| tree.ast().kind(parent)) {
            Some(Kind::ExportDeclaration | Kind::ExportDefault) => tree.parent(path).unwrap_or(path),
            _ => path,
        };

        let statement = templates::statement(
            tree.ast_mut(),
            "($$0).call($$1);",
            vec![function.into(), name.into()],
        )?;

        tree.insert_nodes_after(target, vec![statement])
    }

    fn class_expression(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<()> {
        tree.visit_children(path, self)?;

        let function = match Self::take_initializers(tree, node) {
            Some(function) => function,
            None => return Ok(()),
        };

        let under_new = tree
            .parent_node(path)
            .map_or(false, |parent| tree.ast().kind(parent) == Kind::NewExpression);

        let ast = tree.ast_mut();
        let mut replacement = templates::expression(ast, "($$0).call($$1)", vec![function.into(), node.into()])?;
        if under_new {
            replacement = ast.paren(replacement);
        }

        tree.replace_node(path, replacement);
        Ok(())
    }
}

impl Visitor for ClassInitializerVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        match tree.ast().kind(node) {
            Kind::ClassDeclaration => {
                self.class_declaration(tree, path, node)?;
                Ok(Visit::Handled)
            }
            Kind::ClassExpression => {
                self.class_expression(tree, path, node)?;
                Ok(Visit::Handled)
            }
            _ => Ok(Visit::Descend),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{expect, module, script};

    #[test]
    fn test_class_declaration_initializer() {
        expect(
            script("class A { static { register(this); } }"),
            "
            class A {}

            (function() {
              register(this);
            }).call(A);
            ",
        );
    }

    #[test]
    fn test_initializers_are_merged_in_order() {
        expect(
            script("class A { static { a(); } x = 1; static { b(); } }"),
            "
            class A {
              x = 1;
            }

            (function() {
              a();
              b();
            }).call(A);
            ",
        );
    }

    #[test]
    fn test_class_expression_initializer() {
        expect(
            script("x = class A { static { f(); } };"),
            "
            x = (function() {
              f();
            }).call(class A {});
            ",
        );
    }

    #[test]
    fn test_class_expression_under_new() {
        expect(
            script("new class { static { f(); } }();"),
            "
            new ((function() {
              f();
            }).call(class {}))();
            ",
        );
    }

    #[test]
    fn test_anonymous_default_export() {
        expect(
            module("export default class { static { f(); } }"),
            "
            export default class _class {}

            (function() {
              f();
            }).call(_class);
            ",
        );
    }

    #[test]
    fn test_classes_without_initializers_unchanged() {
        assert_eq!(script("class A { static x = 1; }"), "class A {\nstatic x = 1;\n}");
    }
}
