//! Annotation Macros for Skert Compiler
//!
//! `#[name(args)]` before a declaration or member calls a macro imported
//! by `name`. The macro receives the annotated node and the annotation's
//! arguments, and the nodes it returns take the annotated node's place.
//! An empty result removes the node.
//!
//! Macros are supplied by the host through a [`MacroRegistry`] keyed by
//! module specifier and export name. Imports whose names are only used by
//! annotations are dropped from the output.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Ast, Kind, NodeId, NodeKind};
use crate::error::{CompileError, CompileResult};
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::scope::ScopeTree;

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub trait Macro: Send + Sync {
    /// Build the replacement for `node`. Nodes are allocated in `ast`.
    fn expand(&self, ast: &mut Ast, node: NodeId, arguments: &[NodeId]) -> CompileResult<Vec<NodeId>>;
}

impl<F> Macro for F
where
    F: Fn(&mut Ast, NodeId, &[NodeId]) -> CompileResult<Vec<NodeId>> + Send + Sync,
{
    fn expand(&self, ast: &mut Ast, node: NodeId, arguments: &[NodeId]) -> CompileResult<Vec<NodeId>> {
        self(ast, node, arguments)
    }
}

#[derive(Clone, Default)]
pub struct MacroRegistry {
    modules: HashMap<String, HashMap<String, Arc<dyn Macro>>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro as `export` of the module `specifier`. Members of
    /// an export use dotted names, e.g. `group.name` for `#[ns.group.name]`
    /// with `import * as ns`.
    pub fn define<M: Macro + 'static>(&mut self, specifier: &str, export: &str, expander: M) -> &mut Self {
        self.modules
            .entry(specifier.to_string())
            .or_default()
            .insert(export.to_string(), Arc::new(expander));
        self
    }

    pub fn get(&self, specifier: &str, export: &str) -> Option<&Arc<dyn Macro>> {
        self.modules.get(specifier)?.get(export)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<(&String, Vec<&String>)> = self
            .modules
            .iter()
            .map(|(specifier, exports)| {
                let mut names: Vec<&String> = exports.keys().collect();
                names.sort();
                (specifier, names)
            })
            .collect();
        modules.sort();

        f.debug_struct("MacroRegistry").field("modules", &modules).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPANSION
// ═══════════════════════════════════════════════════════════════════════════════

/// What an import binds locally.
#[derive(Debug, Clone)]
struct ImportedName {
    specifier: String,
    /// `None` for a namespace import.
    imported: Option<String>,
}

/// Expand every annotation in the tree, innermost first, then drop imports
/// that only annotations used.
pub fn expand(
    tree: &mut PathTree,
    annotations: &HashMap<NodeId, Vec<NodeId>>,
    scopes: &ScopeTree,
    macros: &MacroRegistry,
) -> CompileResult<()> {
    if annotations.is_empty() {
        return Ok(());
    }

    let imports = match tree.root_node() {
        Some(root) => collect_imports(tree.ast(), root),
        None => return Ok(()),
    };

    let mut visitor = AnnotationVisitor {
        annotations,
        imports: &imports,
        macros,
        consumed: HashSet::new(),
    };
    let root = tree.root();
    tree.visit(root, &mut visitor)?;
    tree.apply_changes(root)?;

    let consumed = visitor.consumed;
    debug!(macros = consumed.len(), "annotations expanded");
    remove_macro_imports(tree, &consumed, scopes);
    Ok(())
}

struct AnnotationVisitor<'a> {
    annotations: &'a HashMap<NodeId, Vec<NodeId>>,
    imports: &'a HashMap<String, ImportedName>,
    macros: &'a MacroRegistry,
    /// Local import names referenced by annotations.
    consumed: HashSet<String>,
}

impl AnnotationVisitor<'_> {
    /// Split an annotation expression into its name path and arguments.
    fn reference(ast: &Ast, expression: NodeId) -> CompileResult<(Vec<String>, Vec<NodeId>)> {
        let (mut target, arguments) = match ast.get(expression) {
            NodeKind::CallExpression {
                callee: Some(callee),
                arguments,
                ..
            } => (*callee, arguments.clone()),
            _ => (expression, Vec::new()),
        };

        let mut names = Vec::new();
        loop {
            match ast.get(target) {
                NodeKind::MemberExpression {
                    object: Some(object),
                    property: Some(property),
                } => match ast.identifier_value(*property) {
                    Some(name) => {
                        names.push(name.to_string());
                        target = *object;
                    }
                    None => break,
                },
                NodeKind::Identifier { value, .. } => {
                    names.push(value.clone());
                    names.reverse();
                    return Ok((names, arguments));
                }
                _ => break,
            }
        }

        Err(CompileError::Macro(
            "Annotations must name a macro, optionally called with arguments".to_string(),
        ))
    }

    fn lookup(&mut self, names: &[String]) -> CompileResult<Arc<dyn Macro>> {
        let local = &names[0];
        let imports = self.imports;
        let import = imports.get(local).ok_or_else(|| {
            CompileError::Macro(format!("Import not declared for macro \"{}\"", names.join(".")))
        })?;

        let mut path: Vec<&str> = Vec::new();
        if let Some(imported) = &import.imported {
            path.push(imported);
        }
        path.extend(names[1..].iter().map(String::as_str));
        let export = path.join(".");

        let expander = self.macros.get(&import.specifier, &export).ok_or_else(|| {
            CompileError::Macro(format!(
                "Macro \"{}\" is not exported by \"{}\"",
                export, import.specifier
            ))
        })?;

        self.consumed.insert(local.clone());
        Ok(Arc::clone(expander))
    }

    fn expand_node(&mut self, tree: &mut PathTree, path: PathId, node: NodeId, list: &[NodeId]) -> CompileResult<()> {
        // An exported declaration is replaced along with its export
        let target = match tree.parent_node(path).map(|parent| tree.ast().kind(parent)) {
            Some(Kind::ExportDeclaration | Kind::ExportDefault) => tree.parent(path).unwrap_or(path),
            _ => path,
        };

        let mut current = node;
        let mut following = Vec::new();

        for &annotation in list {
            let expressions = match tree.ast().get(annotation) {
                NodeKind::Annotation { expressions } => expressions.clone(),
                _ => continue,
            };

            for expression in expressions {
                let (names, arguments) = Self::reference(tree.ast(), expression)?;
                let expander = self.lookup(&names)?;

                let mut result = expander.expand(tree.ast_mut(), current, &arguments)?;
                if result.is_empty() {
                    tree.remove_node(target);
                    return Ok(());
                }

                current = result.remove(0);
                result.extend(following);
                following = result;
            }
        }

        if current != node {
            tree.replace_node(target, current);
        }
        if !following.is_empty() {
            tree.insert_nodes_after(target, following)?;
        }
        Ok(())
    }
}

impl Visitor for AnnotationVisitor<'_> {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        let annotations = self.annotations;
        let list = match annotations.get(&node) {
            Some(list) => list,
            None => return Ok(Visit::Descend),
        };

        tree.visit_children(path, self)?;
        self.expand_node(tree, path, node, list)?;
        Ok(Visit::Handled)
    }
}

fn collect_imports(ast: &Ast, root: NodeId) -> HashMap<String, ImportedName> {
    let mut imports = HashMap::new();

    let statements = match ast.get(root) {
        NodeKind::Module { statements } => statements,
        _ => return imports,
    };

    for &statement in statements {
        if let NodeKind::ImportDeclaration {
            imports: Some(names),
            from: Some(from),
        } = ast.get(statement)
        {
            let specifier = match ast.get(*from) {
                NodeKind::StringLiteral { value } => value.clone(),
                _ => continue,
            };
            for (local, imported) in import_names(ast, *names) {
                imports.insert(
                    local,
                    ImportedName {
                        specifier: specifier.clone(),
                        imported,
                    },
                );
            }
        }
    }

    imports
}

/// `(local, imported)` pairs bound by an import clause.
fn import_names(ast: &Ast, node: NodeId) -> Vec<(String, Option<String>)> {
    let name = |id: &Option<NodeId>| id.and_then(|id| ast.identifier_value(id).map(str::to_string));
    let mut names = Vec::new();

    match ast.get(node) {
        NodeKind::DefaultImport { identifier, imports } => {
            if let Some(local) = name(identifier) {
                names.push((local, Some("default".to_string())));
            }
            if let Some(imports) = imports {
                names.extend(import_names(ast, *imports));
            }
        }
        NodeKind::NamespaceImport { identifier } => {
            if let Some(local) = name(identifier) {
                names.push((local, None));
            }
        }
        NodeKind::NamedImports { specifiers } => {
            for &specifier in specifiers {
                if let NodeKind::ImportSpecifier { imported, local } = ast.get(specifier) {
                    let imported = name(imported);
                    if let Some(local) = name(local).or_else(|| imported.clone()) {
                        names.push((local, imported));
                    }
                }
            }
        }
        _ => {}
    }

    names
}

/// Drop import declarations whose every name was consumed by annotations
/// and is not otherwise referenced.
fn remove_macro_imports(tree: &mut PathTree, consumed: &HashSet<String>, scopes: &ScopeTree) {
    if consumed.is_empty() {
        return;
    }

    let referenced = |name: &str| {
        scopes
            .root()
            .and_then(|root| scopes.get(root).names.get(name))
            .map_or(false, |binding| !binding.references.is_empty())
    };

    let root = match tree.root_node() {
        Some(root) => root,
        None => return,
    };

    let ast = tree.ast();
    let statements = match ast.get(root) {
        NodeKind::Module { statements } => statements.clone(),
        _ => return,
    };

    let kept: Vec<NodeId> = statements
        .into_iter()
        .filter(|&statement| {
            let names = match ast.get(statement) {
                NodeKind::ImportDeclaration {
                    imports: Some(names), ..
                } => import_names(ast, *names),
                _ => return true,
            };
            names.is_empty()
                || !names
                    .iter()
                    .all(|(local, _)| consumed.contains(local) && !referenced(local))
        })
        .collect();

    if let NodeKind::Module { statements } = tree.ast_mut().get_mut(root) {
        *statements = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile_with_macros, CompileOptions};
    use crate::pipeline::Accumulator;
    use crate::templates;
    use crate::transforms::test_support::normalize;

    fn hello(ast: &mut Ast, _node: NodeId, _arguments: &[NodeId]) -> CompileResult<Vec<NodeId>> {
        Ok(vec![templates::statement(ast, "'hello world';", Vec::new())?])
    }

    fn expand_module(source: &str, macros: &MacroRegistry) -> CompileResult<String> {
        let options = CompileOptions {
            module: true,
            ..CompileOptions::default()
        };
        let output = compile_with_macros(source, &options, macros, &mut Accumulator::new())?;
        Ok(normalize(&output.output))
    }

    fn registry() -> MacroRegistry {
        let mut macros = MacroRegistry::new();
        macros.define("a", "a", hello);
        macros
    }

    #[test]
    fn test_macro_replaces_declaration() {
        let output = expand_module("import { a } from 'a'; #[a] function f() {}", &registry()).unwrap();
        assert_eq!(output, "'hello world';");
    }

    #[test]
    fn test_macro_receives_node_and_arguments() {
        let mut macros = MacroRegistry::new();
        macros.define(
            "register",
            "default",
            |ast: &mut Ast, node: NodeId, arguments: &[NodeId]| -> CompileResult<Vec<NodeId>> {
                let name = match ast.get(node) {
                    NodeKind::FunctionDeclaration {
                        identifier: Some(identifier),
                        ..
                    } => ast.identifier_value(*identifier).unwrap_or_default().to_string(),
                    _ => String::new(),
                };
                let call = templates::statement(
                    ast,
                    "routes.add($$0, $$1);",
                    vec![name.as_str().into(), arguments[0].into()],
                )?;
                Ok(vec![node, call])
            },
        );

        let output = expand_module(
            "import register from 'register';\n#[register('/home')] function home() {}",
            &macros,
        )
        .unwrap();
        assert_eq!(output, "function home() {}\n\nroutes.add(home, '/home');");
    }

    #[test]
    fn test_namespace_member_macro() {
        let mut macros = MacroRegistry::new();
        macros.define("m", "group.drop", |_: &mut Ast, _: NodeId, _: &[NodeId]| -> CompileResult<Vec<NodeId>> {
            Ok(Vec::new())
        });

        let output = expand_module(
            "import * as m from 'm';\nclass A {\n#[m.group.drop] x = 1;\ny = 2;\n}",
            &macros,
        )
        .unwrap();
        assert_eq!(output, "class A {\ny = 2;\n}");
    }

    #[test]
    fn test_exported_declaration_replaced_with_export() {
        let output = expand_module("import { a } from 'a';\n#[a] export class C {}", &registry()).unwrap();
        assert_eq!(output, "'hello world';");
    }

    #[test]
    fn test_import_kept_while_referenced() {
        let output = expand_module("import { a } from 'a';\n#[a] function f() {}\na();", &registry()).unwrap();
        assert_eq!(output, "import { a } from 'a';\n'hello world';\na();");
    }

    #[test]
    fn test_undeclared_macro_import() {
        let error = expand_module("#[a] function f() {}", &registry()).unwrap_err();
        assert_eq!(error.to_string(), "Macro error: Import not declared for macro \"a\"");
    }

    #[test]
    fn test_unknown_macro_export() {
        let error = expand_module("import { b } from 'a'; #[b] function f() {}", &registry()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Macro error: Macro \"b\" is not exported by \"a\""
        );
    }

    #[test]
    fn test_registry_debug_lists_exports() {
        assert_eq!(
            format!("{:?}", registry()),
            "MacroRegistry { modules: [(\"a\", [\"a\"])] }"
        );
    }
}
