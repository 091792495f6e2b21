//! `class A with B, C {}` copies the members of each mixin onto the class
//! through a hoisted `_classMixin` helper. Sources may customize this with
//! a `Symbol.mixin` method, which resolves to a hoisted `_mixin` symbol.

use crate::ast::{Kind, NodeId, NodeKind, VariableKind};
use crate::error::CompileResult;
use crate::path::{Declaration, PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::templates;

const HELPER_KEY: &str = "classMixinHelper";
const SYMBOL_KEY: &str = "classMixinSymbol";

const HELPER_SOURCE: &str = "
    (target, ...sources) => {
      function copy(from, to) {
        for (let key of Reflect.ownKeys(from)) {
          if (!Reflect.getOwnPropertyDescriptor(to, key)) {
            Reflect.defineProperty(to, key, Reflect.getOwnPropertyDescriptor(from, key));
          }
        }
      }

      for (let source of sources) {
        let m = source[$$0];
        if (m !== undefined) {
          if (typeof m !== 'function') {
            throw new TypeError('Expected Symbol.mixin method to be a function');
          }
          m.call(source, target);
          continue;
        }

        if (typeof source !== 'function') {
          throw new TypeError('Invalid mixin source');
        }

        copy(source, target);
        if (source.prototype) {
          copy(source.prototype, target.prototype);
        }
      }

      return target;
    };
";

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("class-mixins", run);
}

fn run(tree: &mut PathTree, accumulator: &mut Accumulator) -> CompileResult<()> {
    let root = tree.root();
    tree.visit(root, &mut ClassMixinVisitor { accumulator })
}

struct ClassMixinVisitor<'a> {
    accumulator: &'a mut Accumulator,
}

impl ClassMixinVisitor<'_> {
    fn insert_symbol(&mut self, tree: &mut PathTree) -> CompileResult<String> {
        if let Some(name) = self.accumulator.get_str(SYMBOL_KEY) {
            return Ok(name.to_string());
        }

        let initializer = templates::expression(
            tree.ast_mut(),
            "Symbol.mixin || Symbol.for('Symbol.mixin')",
            Vec::new(),
        )?;

        let root = tree.root();
        let name = tree.unique_identifier(
            root,
            "_mixin",
            Some(Declaration::new(VariableKind::Const).with_initializer(initializer)),
        );

        self.accumulator.set(SYMBOL_KEY, name.clone());
        Ok(name)
    }

    fn insert_helper(&mut self, tree: &mut PathTree) -> CompileResult<String> {
        if let Some(name) = self.accumulator.get_str(HELPER_KEY) {
            return Ok(name.to_string());
        }

        let symbol = self.insert_symbol(tree)?;
        let initializer = templates::expression(tree.ast_mut(), HELPER_SOURCE, vec![symbol.into()])?;

        let root = tree.root();
        let name = tree.unique_identifier(
            root,
            "_classMixin",
            Some(Declaration::new(VariableKind::Const).with_initializer(initializer)),
        );

        self.accumulator.set(HELPER_KEY, name.clone());
        Ok(name)
    }

    fn class_declaration(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<()> {
        tree.visit_children(path, self)?;

        let has_mixins = matches!(
            tree.ast().get(node),
            NodeKind::ClassDeclaration { mixins, .. } if !mixins.is_empty()
        );
        if !has_mixins {
            return Ok(());
        }

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

        let helper = self.insert_helper(tree)?;

        let mixins = match tree.ast_mut().get_mut(node) {
            NodeKind::ClassDeclaration { mixins, .. } => std::mem::take(mixins),
            _ => Vec::new(),
        };

        let target = match tree.parent_node(path).map(|parent| tree.ast().kind(parent)) {
            Some(Kind::ExportDeclaration | Kind::ExportDefault) => tree.parent(path).unwrap_or(path),
            _ => path,
        };

        let ast = tree.ast_mut();
        let callee = ast.identifier(&helper);
        let class_name = ast.identifier(&name);
        let arguments = std::iter::once(class_name).chain(mixins).collect();
        let call = ast.call(callee, arguments);
        let statement = ast.expression_statement(call);

        tree.insert_nodes_after(target, vec![statement])
    }

    fn class_expression(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<()> {
        tree.visit_children(path, self)?;

        let mixins = match tree.ast_mut().get_mut(node) {
            NodeKind::ClassExpression { mixins, .. } => std::mem::take(mixins),
            _ => Vec::new(),
        };
        if mixins.is_empty() {
            return Ok(());
        }

        let helper = self.insert_helper(tree)?;
        let under_new = tree
            .parent_node(path)
            .map_or(false, |parent| tree.ast().kind(parent) == Kind::NewExpression);

        let ast = tree.ast_mut();
        let callee = ast.identifier(&helper);
        let arguments = std::iter::once(node).chain(mixins).collect();
        let mut replacement = ast.call(callee, arguments);
        if under_new {
            replacement = ast.paren(replacement);
        }

        tree.replace_node(path, replacement);
        Ok(())
    }

    fn is_symbol_mixin(tree: &PathTree, node: NodeId) -> bool {
        match tree.ast().get(node) {
            NodeKind::MemberExpression {
                object: Some(object),
                property: Some(property),
            } => {
                tree.ast().identifier_value(*object) == Some("Symbol")
                    && tree.ast().identifier_value(*property) == Some("mixin")
            }
            _ => false,
        }
    }
}

impl Visitor for ClassMixinVisitor<'_> {
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
            Kind::MemberExpression if Self::is_symbol_mixin(tree, node) => {
                let symbol = self.insert_symbol(tree)?;
                let identifier = tree.ast_mut().identifier(&symbol);
                tree.replace_node(path, identifier);
                Ok(Visit::Handled)
            }
            _ => Ok(Visit::Descend),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::Accumulator;
    use crate::transforms::test_support::{commonjs, module, script};

    fn tail(output: &str, marker: &str) -> String {
        match output.find(marker) {
            Some(start) => output[start..].to_string(),
            None => panic!("{:?} not found in {}", marker, output),
        }
    }

    #[test]
    fn test_class_declaration_with_mixins() {
        let output = script("class A with B, C {}");

        assert!(output.starts_with("const _classMixin = (target, ...sources) => {"));
        assert!(output.contains("let m = source[_mixin];"));
        assert!(output.contains("const _mixin = Symbol.mixin || Symbol.for('Symbol.mixin');"));
        assert_eq!(tail(&output, "class A"), "class A {}\n\n_classMixin(A, B, C);");
    }

    #[test]
    fn test_helper_declared_above_symbol() {
        let output = script("class A with B {}");
        let helper = output.find("const _classMixin").unwrap();
        let symbol = output.find("const _mixin").unwrap();
        assert!(helper < symbol);
    }

    #[test]
    fn test_class_expression_with_mixins() {
        let output = script("let C = class with A, B {};");
        assert_eq!(tail(&output, "let C"), "let C = _classMixin(class {}, A, B);");
    }

    #[test]
    fn test_class_expression_under_new() {
        let output = script("new class with A {}();");
        assert_eq!(tail(&output, "new "), "new (_classMixin(class {}, A))();");
    }

    #[test]
    fn test_anonymous_default_export() {
        let output = module("export default class with A {}");
        assert_eq!(
            tail(&output, "export default"),
            "export default class _class {}\n\n_classMixin(_class, A);"
        );
    }

    #[test]
    fn test_exported_class_call_follows_export() {
        let output = module("export class A with B {}");
        assert_eq!(tail(&output, "export class"), "export class A {}\n\n_classMixin(A, B);");
    }

    #[test]
    fn test_symbol_mixin_reference() {
        let output = script("class M { static [Symbol.mixin](target) {} }");
        assert_eq!(
            output,
            "const _mixin = Symbol.mixin || Symbol.for('Symbol.mixin');\n\nclass M {\nstatic [_mixin](target) {}\n}"
        );
    }

    #[test]
    fn test_classes_without_mixins_unchanged() {
        assert_eq!(script("class A extends B {}"), "class A extends B {}");
    }

    #[test]
    fn test_helper_shared_through_accumulator() {
        use crate::compiler::CompileOptions;
        use crate::transforms::test_support::compile_with;

        let options = CompileOptions::default();
        let mut accumulator = Accumulator::new();

        compile_with("class A with B {}", &options, &mut accumulator);
        let second = compile_with("class C with D {}", &options, &mut accumulator);

        assert_eq!(second, "class C {}\n\n_classMixin(C, D);");
        assert_eq!(accumulator.get_str("classMixinHelper"), Some("_classMixin"));
        assert_eq!(accumulator.get_str("classMixinSymbol"), Some("_mixin"));
    }

    #[test]
    fn test_mixins_with_module_transform() {
        let output = commonjs("export class A with B {}");
        assert!(output.contains("class A {}"));
        assert!(output.contains("_classMixin(A, B);"));
        assert!(output.contains("exports.A = A;"));
    }
}
