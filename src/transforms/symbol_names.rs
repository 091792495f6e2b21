//! `@name` member names become computed keys backed by one hoisted
//! `Symbol('@name')` constant per distinct name.

use crate::ast::{Kind, NodeId, NodeKind, VariableKind};
use crate::error::CompileResult;
use crate::path::{Declaration, PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates;

/// Accumulator map from symbol text to its constant's name.
pub const SYMBOL_NAMES: &str = "symbolNames";

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("symbol-names", run);
}

fn run(tree: &mut PathTree, accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut SymbolNameVisitor { accumulator })
}

struct SymbolNameVisitor<'a> {
    accumulator: &'a mut Accumulator,
}

impl SymbolNameVisitor<'_> {
    fn symbol_identifier(&mut self, tree: &mut PathTree, value: &str) -> CompileResult<String> {
        if let Some(name) = self.accumulator.lookup(SYMBOL_NAMES, value) {
            return Ok(name.to_string());
        }

        let description = tree.ast_mut().string_literal(value);
        let initializer = templates::expression(tree.ast_mut(), "Symbol($$0)", vec![description.into()])?;

        let root = tree.root();
        let base = format!("${}", value.trim_start_matches('@'));
        let name = tree.unique_identifier(
            root,
            &base,
            Some(Declaration::new(VariableKind::Const).with_initializer(initializer)),
        );

        self.accumulator.insert(SYMBOL_NAMES, value, &name);
        Ok(name)
    }
}

impl Visitor for SymbolNameVisitor<'_> {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        if tree.ast().kind(node) != Kind::SymbolName {
            return Ok(Visit::Descend);
        }

        let value = match tree.ast().get(node) {
            NodeKind::SymbolName { value } => value.clone(),
            _ => return Ok(Visit::Handled),
        };

        let name = self.symbol_identifier(tree, &value)?;
        let span = tree.ast().span(node);

        let ast = tree.ast_mut();
        let identifier = ast.identifier(&name);
        ast.set_span(identifier, span);
        let computed = ast.computed_property(identifier);

        tree.replace_node(path, computed);
        Ok(Visit::Handled)
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::CompileOptions;
    use crate::pipeline::Accumulator;
    use crate::transforms::test_support::{compile_with, expect, module};

    #[test]
    fn test_symbol_name_reference() {
        expect(
            module("x.@y = 1;"),
            "
            const $y = Symbol('@y');
            x[$y] = 1;
            ",
        );
    }

    #[test]
    fn test_symbol_named_methods() {
        expect(
            module("({ @x() {} });"),
            "
            const $x = Symbol('@x');
            ({
              [$x]() {}
            });
            ",
        );
    }

    #[test]
    fn test_repeated_symbol_declared_once() {
        expect(
            module("a.@y; b.@y; class C { @y() {} }"),
            "
            const $y = Symbol('@y');
            a[$y];
            b[$y];

            class C {
              [$y]() {}
            }
            ",
        );
    }

    #[test]
    fn test_symbol_name_avoids_existing_bindings() {
        expect(
            module("let $y = 1; x.@y;"),
            "
            const $y_1 = Symbol('@y');
            let $y = 1;
            x[$y_1];
            ",
        );
    }

    #[test]
    fn test_shared_accumulator_declares_once() {
        let options = CompileOptions {
            module: true,
            ..CompileOptions::default()
        };
        let mut accumulator = Accumulator::new();

        let first = compile_with("x.@y;", &options, &mut accumulator);
        let second = compile_with("z.@y;", &options, &mut accumulator);

        assert_eq!(first.matches("Symbol('@y')").count(), 1);
        assert_eq!(second, "z[$y];");
        assert_eq!(accumulator.lookup("symbolNames", "@y"), Some("$y"));
    }
}
