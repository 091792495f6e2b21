#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::ast::{Kind, NodeId, NodeKind, VariableKind};
    use crate::error::{CompileError, CompileResult, PathError};
    use crate::parser::parse_script;
    use crate::path::{Declaration, PathId, PathTree, Visit, Visitor};
    use crate::scope::resolve_scopes;

    fn tree(source: &str) -> PathTree {
        let output = parse_script(source).unwrap_or_else(|e| panic!("{}: {}", source, e));
        let scopes = resolve_scopes(&output.ast, output.root);
        PathTree::new(output.ast, output.root, &scopes)
    }

    /// One short label per top-level statement.
    fn summary(tree: &PathTree) -> Vec<String> {
        let ast = tree.ast();
        let root = tree.root_node().expect("root");
        let statements = match ast.get(root) {
            NodeKind::Script { statements } => statements.clone(),
            other => panic!("unexpected root {:?}", other.kind()),
        };

        statements
            .into_iter()
            .map(|statement| match ast.get(statement) {
                NodeKind::ExpressionStatement {
                    expression: Some(expression),
                } => ast
                    .identifier_value(*expression)
                    .unwrap_or("<expr>")
                    .to_string(),
                NodeKind::VariableDeclaration { kind, declarations } => {
                    let name = match ast.get(declarations[0]) {
                        NodeKind::VariableDeclarator {
                            pattern: Some(pattern),
                            ..
                        } => ast.identifier_value(*pattern).unwrap_or("?"),
                        _ => "?",
                    };
                    format!("{} {}", kind.as_str(), name)
                }
                NodeKind::Directive { value, .. } => format!("'{}'", value),
                other => other.kind().name().to_string(),
            })
            .collect()
    }

    fn statement_name(tree: &PathTree, node: NodeId) -> Option<String> {
        match tree.ast().get(node) {
            NodeKind::ExpressionStatement {
                expression: Some(expression),
            } => tree.ast().identifier_value(*expression).map(str::to_string),
            _ => None,
        }
    }

    /// Runs `edit` on every expression statement and counts visits by name.
    struct StatementVisitor<F> {
        edit: F,
        visits: HashMap<String, usize>,
    }

    impl<F> Visitor for StatementVisitor<F>
    where
        F: FnMut(&mut PathTree, PathId, &str) -> CompileResult<()>,
    {
        fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
            if tree.ast().kind(node) != Kind::ExpressionStatement {
                return Ok(Visit::Descend);
            }
            if let Some(name) = statement_name(tree, node) {
                *self.visits.entry(name.clone()).or_insert(0) += 1;
                (self.edit)(tree, path, &name)?;
            }
            Ok(Visit::Handled)
        }
    }

    fn run<F>(tree: &mut PathTree, edit: F) -> HashMap<String, usize>
    where
        F: FnMut(&mut PathTree, PathId, &str) -> CompileResult<()>,
    {
        let mut visitor = StatementVisitor {
            edit,
            visits: HashMap::new(),
        };
        let root = tree.root();
        tree.visit(root, &mut visitor).expect("visit");
        tree.apply_changes(root).expect("apply");
        visitor.visits
    }

    fn new_statement(tree: &mut PathTree, name: &str) -> NodeId {
        let ident = tree.ast_mut().identifier(name);
        tree.ast_mut().expression_statement(ident)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DEFERRED MUTATION
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_edits_do_not_disturb_sibling_iteration() {
        let mut tree = tree("a; b; c;");
        let visits = run(&mut tree, |tree, path, name| {
            match name {
                "a" => tree.remove_node(path),
                "b" => {
                    let d = new_statement(tree, "d");
                    tree.insert_nodes_after(path, vec![d])?;
                }
                _ => {}
            }
            Ok(())
        });

        assert_eq!(visits.get("c"), Some(&1));
        assert_eq!(visits.get("d"), None);
        assert_eq!(summary(&tree), vec!["b", "d", "c"]);
    }

    #[test]
    fn test_insert_before_then_replace_same_path() {
        let mut tree = tree("a; b;");
        run(&mut tree, |tree, path, name| {
            if name == "b" {
                let x = new_statement(tree, "x");
                let y = new_statement(tree, "y");
                tree.insert_nodes_before(path, vec![x])?;
                tree.replace_node(path, y);
            }
            Ok(())
        });

        assert_eq!(summary(&tree), vec!["a", "x", "y"]);
    }

    #[test]
    fn test_edits_after_removal_are_dropped() {
        let mut tree = tree("a; b;");
        run(&mut tree, |tree, path, name| {
            if name == "a" {
                let x = new_statement(tree, "x");
                tree.remove_node(path);
                tree.insert_nodes_after(path, vec![x])?;
            }
            Ok(())
        });

        assert_eq!(summary(&tree), vec!["b"]);
    }

    #[test]
    fn test_stale_index_is_recovered_by_rescan() {
        let mut tree = tree("a; b; c;");
        run(&mut tree, |tree, path, name| {
            match name {
                "b" => {
                    tree.unique_identifier(path, "t", Some(Declaration::new(VariableKind::Let)));
                }
                "c" => {
                    let e = new_statement(tree, "e");
                    tree.replace_node(path, e);
                }
                _ => {}
            }
            Ok(())
        });

        assert_eq!(summary(&tree), vec!["let t", "a", "b", "e"]);
    }

    #[test]
    fn test_replace_in_single_slot() {
        let mut tree = tree("f(a);");
        struct Renamer;
        impl Visitor for Renamer {
            fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
                if tree.ast().identifier_value(node) == Some("f") {
                    let g = tree.ast_mut().identifier("g");
                    tree.replace_node(path, g);
                }
                Ok(Visit::Descend)
            }
        }

        let root = tree.root();
        tree.visit(root, &mut Renamer).expect("visit");

        let json = tree.ast().to_json(tree.root_node().expect("root"));
        assert_eq!(json["statements"][0]["expression"]["callee"]["value"], "g");
        assert_eq!(json["statements"][0]["expression"]["arguments"][0]["value"], "a");
    }

    #[test]
    fn test_insert_against_single_slot_is_an_error() {
        let mut tree = tree("f(a);");
        struct Inserter(Option<PathError>);
        impl Visitor for Inserter {
            fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
                if tree.ast().identifier_value(node) == Some("f") {
                    let x = tree.ast_mut().identifier("x");
                    if let Err(CompileError::Path(e)) = tree.insert_nodes_after(path, vec![x]) {
                        self.0 = Some(e);
                    }
                }
                Ok(Visit::Descend)
            }
        }

        let mut visitor = Inserter(None);
        let root = tree.root();
        tree.visit(root, &mut visitor).expect("visit");
        assert_eq!(visitor.0, Some(PathError::NotInList));
    }

    #[test]
    fn test_root_cannot_be_replaced() {
        let mut tree = tree("a;");
        let root = tree.root();
        let x = tree.ast_mut().identifier("x");
        tree.replace_node(root, x);

        match tree.apply_changes(root) {
            Err(CompileError::Path(PathError::NoParent)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_detached_node_cannot_be_located() {
        let mut tree = tree("a; b;");
        let mut visitor = StatementVisitor {
            edit: |tree: &mut PathTree, path: PathId, name: &str| -> CompileResult<()> {
                if name == "a" {
                    if let (Some(parent), Some(node)) = (tree.parent_node(path), tree.node(path)) {
                        if let NodeKind::Script { statements } = tree.ast_mut().get_mut(parent) {
                            statements.retain(|&statement| statement != node);
                        }
                    }
                    tree.remove_node(path);
                }
                Ok(())
            },
            visits: HashMap::new(),
        };

        let root = tree.root();
        match tree.visit(root, &mut visitor) {
            Err(CompileError::Path(PathError::NodeLocation)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(summary(&tree), vec!["b"]);
    }

    #[test]
    fn test_after_hook_skips_removed_nodes() {
        struct Remover {
            after: Vec<String>,
        }
        impl Visitor for Remover {
            fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
                if statement_name(tree, node).as_deref() == Some("a") {
                    tree.remove_node(path);
                }
                Ok(Visit::Descend)
            }

            fn after(&mut self, tree: &mut PathTree, _path: PathId, node: NodeId) -> CompileResult<()> {
                if let Some(name) = statement_name(tree, node) {
                    self.after.push(name);
                }
                Ok(())
            }
        }

        let mut tree = tree("a; b;");
        let mut visitor = Remover { after: Vec::new() };
        let root = tree.root();
        tree.visit(root, &mut visitor).expect("visit");
        assert_eq!(visitor.after, vec!["b"]);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SYNTHESIZED NAMES
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unique_identifier_avoids_bound_and_free_names() {
        let mut tree = tree("let _tmp = 1; function f() { let _tmp_2; } _tmp_1;");
        let root = tree.root();

        let first = tree.unique_identifier(root, "_tmp", None);
        let second = tree.unique_identifier(root, "_tmp", None);

        assert_eq!(first, "_tmp_3");
        assert_eq!(second, "_tmp_4");
        assert!(tree.is_name_known("_tmp_4"));
    }

    #[test]
    fn test_latest_declaration_lands_nearest_the_top() {
        let mut tree = tree("'use strict'; x;");
        let root = tree.root();

        let one = tree.ast_mut().string_literal("one");
        tree.unique_identifier(root, "a", Some(Declaration::new(VariableKind::Let)));
        tree.unique_identifier(
            root,
            "b",
            Some(Declaration::new(VariableKind::Const).with_initializer(one)),
        );
        tree.apply_changes(root).expect("apply");

        assert_eq!(summary(&tree), vec!["'use strict'", "const b", "let a", "x"]);
    }

    #[test]
    fn test_declaration_targets_enclosing_function_body() {
        let mut tree = tree("function f() { y; } z;");
        run(&mut tree, |tree, path, name| {
            if name == "y" {
                tree.unique_identifier(path, "_v", Some(Declaration::new(VariableKind::Var)));
            }
            Ok(())
        });

        let json = tree.ast().to_json(tree.root_node().expect("root"));
        let body = &json["statements"][0]["body"]["statements"];
        assert_eq!(body[0]["type"], "VariableDeclaration");
        assert_eq!(body[0]["declarations"][0]["pattern"]["value"], "_v");
        assert_eq!(body[1]["expression"]["value"], "y");
        assert_eq!(summary(&tree), vec!["FunctionDeclaration", "z"]);
    }
}
