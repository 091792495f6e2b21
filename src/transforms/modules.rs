//! Module Transform for Skert Compiler
//!
//! Rewrites `import`/`export` into the `require`/`exports` form. The
//! module's top-level statements are regrouped as:
//!
//! 1. a `'use strict'` directive
//! 2. hoisted `exports.f = f` assignments for exported functions
//! 3. one `require` binding per distinct specifier, with interop guards
//! 4. the remaining statements, with export declarations unwrapped
//!
//! References to imported names are then rewritten to member reads on the
//! module binding. A module that awaits at the top level runs its body
//! inside an async function.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::ast::{Ast, FunctionKind, Kind, NodeId, NodeKind};
use crate::error::CompileResult;
use crate::path::{PathId, PathTree, Visit, Visitor};
use crate::pipeline::{Accumulator, Pipeline};
use crate::scope::resolve_scopes;
use crate::templates::{self, TemplateValue};

lazy_static! {
    static ref DIRECTORY_PREFIX: Regex = Regex::new(r"^.*[/\\]").unwrap();
    static ref EXTENSION: Regex = Regex::new(r"\..*$").unwrap();
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_$]").unwrap();
}

pub fn register(pipeline: &mut Pipeline) {
    pipeline.define("modules", run);
}

fn run(tree: &mut PathTree, _accumulator: &mut Accumulator) -> CompileResult<()> {
    let root_node = match tree.root_node() {
        Some(node) if tree.ast().kind(node) == Kind::Module => node,
        _ => return Ok(()),
    };

    let replacements = ModuleProcessor::new(tree).process(root_node)?;

    let root = tree.root();
    tree.visit(root, &mut ReferenceVisitor { replacements })
}

/// The base name for a module's binding: `./lib/foo-bar.js` gives `_foo_bar`.
pub fn module_binding_base(specifier: &str) -> String {
    let file = DIRECTORY_PREFIX.replace(specifier, "");
    let stem = EXTENSION.replace(&file, "");
    format!("_{}", INVALID_NAME_CHARS.replace_all(&stem, "_"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT PROCESSING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct ImportName {
    /// `None` for a namespace.
    imported: Option<String>,
    /// `None` for `export * from`.
    local: Option<String>,
}

#[derive(Debug, Clone)]
struct ImportGroup {
    names: Vec<ImportName>,
    from: String,
    exporting: bool,
}

#[derive(Debug, Clone)]
struct ExportName {
    local: String,
    exported: String,
}

/// Member read that replaces one reference to an imported name.
#[derive(Debug, Clone)]
struct ImportedMember {
    module: String,
    imported: String,
}

struct ModuleProcessor<'a> {
    tree: &'a mut PathTree,
    hoisted: Vec<ExportName>,
    imports: Vec<ImportGroup>,
    module_names: HashMap<String, String>,
}

impl<'a> ModuleProcessor<'a> {
    fn new(tree: &'a mut PathTree) -> Self {
        ModuleProcessor {
            tree,
            hoisted: Vec::new(),
            imports: Vec::new(),
            module_names: HashMap::new(),
        }
    }

    fn ast(&self) -> &Ast {
        self.tree.ast()
    }

    fn ast_mut(&mut self) -> &mut Ast {
        self.tree.ast_mut()
    }

    fn process(mut self, module: NodeId) -> CompileResult<HashMap<NodeId, ImportedMember>> {
        let original = match self.ast().get(module) {
            NodeKind::Module { statements } => statements.clone(),
            _ => return Ok(HashMap::new()),
        };

        let scopes = resolve_scopes(self.ast(), module);
        let module_scope = scopes.root().map(|id| scopes.get(id));

        let mut body = Vec::new();
        for statement in original {
            body.extend(self.statement(statement)?);
        }

        let mut statements = vec![self.ast_mut().directive("use strict")];

        for export in std::mem::take(&mut self.hoisted) {
            statements.push(templates::statement(
                self.ast_mut(),
                "exports.$$0 = $$1;",
                vec![export.exported.into(), export.local.into()],
            )?);
        }

        let mut replacements = HashMap::new();

        for group in std::mem::take(&mut self.imports) {
            if group.exporting && group.names.len() == 1 {
                statements.push(self.inline_reexport(&group.from, &group.names[0])?);
                continue;
            }

            let module_name = match self.module_names.get(&group.from) {
                Some(name) => name.clone(),
                None => {
                    let root = self.tree.root();
                    let name = self
                        .tree
                        .unique_identifier(root, &module_binding_base(&group.from), None);
                    debug!(specifier = %group.from, binding = %name, "require binding");

                    self.module_names.insert(group.from.clone(), name.clone());
                    let from = self.ast_mut().string_literal(&group.from);
                    statements.push(templates::statement(
                        self.ast_mut(),
                        "let $$0 = require($$1);",
                        vec![name.as_str().into(), from.into()],
                    )?);
                    name
                }
            };

            for name in &group.names {
                if group.exporting {
                    statements.push(self.reexport(&module_name, name)?);
                    continue;
                }

                let local = match &name.local {
                    Some(local) => local,
                    None => continue,
                };

                match &name.imported {
                    Some(imported) => {
                        if imported == "default" {
                            statements.push(templates::statement(
                                self.ast_mut(),
                                "if (typeof $$0 === 'function') { $$0 = { default: $$0 }; }",
                                vec![module_name.as_str().into()],
                            )?);
                        }

                        let references = module_scope
                            .and_then(|scope| scope.names.get(local))
                            .map(|binding| binding.references.as_slice())
                            .unwrap_or(&[]);

                        for &reference in references {
                            replacements.insert(
                                reference,
                                ImportedMember {
                                    module: module_name.clone(),
                                    imported: imported.clone(),
                                },
                            );
                        }
                    }
                    None => {
                        statements.push(templates::statement(
                            self.ast_mut(),
                            "const $$0 = $$1;",
                            vec![local.as_str().into(), module_name.as_str().into()],
                        )?);
                    }
                }
            }
        }

        statements.extend(body);

        if has_top_level_await(self.ast(), &statements[1..]) {
            let wrapped = self.async_wrapper(statements.split_off(1))?;
            statements.push(wrapped);
        }

        if let NodeKind::Module { statements: slot } = self.ast_mut().get_mut(module) {
            *slot = statements;
        }

        Ok(replacements)
    }

    /// The statements that take the place of one top-level statement.
    fn statement(&mut self, statement: NodeId) -> CompileResult<Vec<NodeId>> {
        match self.ast().get(statement).clone() {
            NodeKind::ImportDeclaration {
                imports,
                from: Some(from),
            } => {
                let mut names = Vec::new();
                if let Some(imports) = imports {
                    self.import_names(imports, &mut names);
                }
                let group = ImportGroup {
                    names,
                    from: self.string_value(from),
                    exporting: false,
                };
                self.imports.push(group);
                Ok(Vec::new())
            }

            NodeKind::ExportDeclaration {
                declaration: Some(declaration),
            } => self.export_declaration(declaration),

            NodeKind::ExportNameList { specifiers, from } => self.export_name_list(&specifiers, from),

            NodeKind::ExportDefault {
                binding: Some(binding),
            } => self.export_default(binding),

            NodeKind::ExportNamespace {
                identifier,
                from: Some(from),
            } => {
                let group = ImportGroup {
                    names: vec![ImportName {
                        imported: None,
                        local: identifier.and_then(|id| self.name_of(id)),
                    }],
                    from: self.string_value(from),
                    exporting: true,
                };
                self.imports.push(group);
                Ok(Vec::new())
            }

            NodeKind::ExportDefaultFrom {
                identifier: Some(identifier),
                from: Some(from),
            } => {
                let group = ImportGroup {
                    names: vec![ImportName {
                        imported: Some("default".to_string()),
                        local: self.name_of(identifier),
                    }],
                    from: self.string_value(from),
                    exporting: true,
                };
                self.imports.push(group);
                Ok(Vec::new())
            }

            NodeKind::Directive { value, .. } if value == "use strict" => Ok(Vec::new()),

            _ => Ok(vec![statement]),
        }
    }

    fn import_names(&self, node: NodeId, names: &mut Vec<ImportName>) {
        match self.ast().get(node) {
            NodeKind::DefaultImport {
                identifier,
                imports,
            } => {
                names.push(ImportName {
                    imported: Some("default".to_string()),
                    local: identifier.and_then(|id| self.name_of(id)),
                });
                if let Some(imports) = imports {
                    self.import_names(*imports, names);
                }
            }
            NodeKind::NamespaceImport { identifier } => names.push(ImportName {
                imported: None,
                local: identifier.and_then(|id| self.name_of(id)),
            }),
            NodeKind::NamedImports { specifiers } => {
                for &specifier in specifiers {
                    if let NodeKind::ImportSpecifier { imported, local } = self.ast().get(specifier) {
                        let imported = imported.and_then(|id| self.name_of(id));
                        let local = local.and_then(|id| self.name_of(id)).or_else(|| imported.clone());
                        names.push(ImportName { imported, local });
                    }
                }
            }
            _ => {}
        }
    }

    fn export_declaration(&mut self, declaration: NodeId) -> CompileResult<Vec<NodeId>> {
        match self.ast().kind(declaration) {
            Kind::VariableDeclaration => {
                let mut bindings = Vec::new();
                pattern_names(self.ast(), declaration, &mut bindings);

                let mut statements = vec![declaration];
                for name in bindings {
                    statements.push(templates::statement(
                        self.ast_mut(),
                        "exports.$$0 = $$1;",
                        vec![name.as_str().into(), name.as_str().into()],
                    )?);
                }
                Ok(statements)
            }
            Kind::FunctionDeclaration => {
                if let Some(name) = self.declared_name(declaration) {
                    self.hoisted.push(ExportName {
                        local: name.clone(),
                        exported: name,
                    });
                }
                Ok(vec![declaration])
            }
            _ => {
                let mut statements = vec![declaration];
                if let Some(name) = self.declared_name(declaration) {
                    statements.push(templates::statement(
                        self.ast_mut(),
                        "exports.$$0 = $$1;",
                        vec![name.as_str().into(), name.as_str().into()],
                    )?);
                }
                Ok(statements)
            }
        }
    }

    fn export_name_list(&mut self, specifiers: &[NodeId], from: Option<NodeId>) -> CompileResult<Vec<NodeId>> {
        let pairs: Vec<(NodeId, Option<NodeId>)> = specifiers
            .iter()
            .filter_map(|&specifier| match self.ast().get(specifier) {
                NodeKind::ExportSpecifier {
                    local: Some(local),
                    exported,
                } => Some((*local, *exported)),
                _ => None,
            })
            .collect();

        if let Some(from) = from {
            let names = pairs
                .iter()
                .map(|&(local, exported)| {
                    let imported = self.name_of(local);
                    ImportName {
                        local: exported.and_then(|id| self.name_of(id)).or_else(|| imported.clone()),
                        imported,
                    }
                })
                .collect();

            let group = ImportGroup {
                names,
                from: self.string_value(from),
                exporting: true,
            };
            self.imports.push(group);
            return Ok(Vec::new());
        }

        let mut statements = Vec::new();
        for (local, exported) in pairs {
            let exported = match exported.or(Some(local)).and_then(|id| self.name_of(id)) {
                Some(name) => name,
                None => continue,
            };
            // The local identifier is moved, so an imported name is rewritten later
            statements.push(templates::statement(
                self.ast_mut(),
                "exports.$$0 = $$1;",
                vec![exported.into(), local.into()],
            )?);
        }
        Ok(statements)
    }

    fn export_default(&mut self, binding: NodeId) -> CompileResult<Vec<NodeId>> {
        let kind = self.ast().kind(binding);
        if !matches!(kind, Kind::FunctionDeclaration | Kind::ClassDeclaration) {
            let statement = templates::statement(
                self.ast_mut(),
                "exports.default = $$0;",
                vec![binding.into()],
            )?;
            return Ok(vec![statement]);
        }

        let name = match self.declared_name(binding) {
            Some(name) => name,
            None => {
                let root = self.tree.root();
                let name = self.tree.unique_identifier(root, "_default", None);
                let identifier = self.ast_mut().binding_identifier(&name);
                match self.ast_mut().get_mut(binding) {
                    NodeKind::FunctionDeclaration { identifier: slot, .. }
                    | NodeKind::ClassDeclaration { identifier: slot, .. } => *slot = Some(identifier),
                    _ => {}
                }
                name
            }
        };

        if kind == Kind::FunctionDeclaration {
            self.hoisted.push(ExportName {
                local: name,
                exported: "default".to_string(),
            });
            return Ok(vec![binding]);
        }

        let statement = templates::statement(
            self.ast_mut(),
            "exports.default = $$0;",
            vec![name.into()],
        )?;
        Ok(vec![binding, statement])
    }

    fn inline_reexport(&mut self, from: &str, name: &ImportName) -> CompileResult<NodeId> {
        let from = TemplateValue::Node(self.ast_mut().string_literal(from));
        match (&name.imported, &name.local) {
            (Some(imported), Some(local)) => templates::statement(
                self.ast_mut(),
                "exports.$$0 = require($$1).$$2;",
                vec![local.as_str().into(), from, imported.as_str().into()],
            ),
            (None, Some(local)) => templates::statement(
                self.ast_mut(),
                "exports.$$0 = require($$1);",
                vec![local.as_str().into(), from],
            ),
            _ => templates::statement(
                self.ast_mut(),
                "Object.assign(exports, require($$0));",
                vec![from],
            ),
        }
    }

    fn reexport(&mut self, module_name: &str, name: &ImportName) -> CompileResult<NodeId> {
        match (&name.imported, &name.local) {
            (Some(imported), Some(local)) => templates::statement(
                self.ast_mut(),
                "exports.$$0 = $$1.$$2;",
                vec![local.as_str().into(), module_name.into(), imported.as_str().into()],
            ),
            (None, Some(local)) => templates::statement(
                self.ast_mut(),
                "exports.$$0 = $$1;",
                vec![local.as_str().into(), module_name.into()],
            ),
            _ => templates::statement(
                self.ast_mut(),
                "Object.assign(exports, $$0);",
                vec![module_name.into()],
            ),
        }
    }

    fn async_wrapper(&mut self, statements: Vec<NodeId>) -> CompileResult<NodeId> {
        let ast = self.ast_mut();
        let body = ast.add(NodeKind::FunctionBody { statements });
        let function = ast.add(NodeKind::FunctionExpression {
            kind: FunctionKind::Async,
            identifier: None,
            params: Vec::new(),
            body: Some(body),
        });

        templates::statement(
            ast,
            "($$0)().catch((err) => setTimeout(() => { throw err; }, 0));",
            vec![function.into()],
        )
    }

    fn name_of(&self, id: NodeId) -> Option<String> {
        self.ast().identifier_value(id).map(str::to_string)
    }

    fn string_value(&self, id: NodeId) -> String {
        match self.ast().get(id) {
            NodeKind::StringLiteral { value } => value.clone(),
            _ => String::new(),
        }
    }

    fn declared_name(&self, declaration: NodeId) -> Option<String> {
        match self.ast().get(declaration) {
            NodeKind::FunctionDeclaration { identifier, .. }
            | NodeKind::ClassDeclaration { identifier, .. } => (*identifier).and_then(|id| self.name_of(id)),
            _ => None,
        }
    }
}

/// Names bound by a declaration or binding pattern, in source order.
fn pattern_names(ast: &Ast, node: NodeId, names: &mut Vec<String>) {
    match ast.get(node) {
        NodeKind::Identifier { value, .. } => names.push(value.clone()),
        NodeKind::VariableDeclaration { declarations, .. } => {
            for &declarator in declarations {
                pattern_names(ast, declarator, names);
            }
        }
        NodeKind::ObjectPattern { properties, .. } => {
            for &property in properties {
                pattern_names(ast, property, names);
            }
        }
        NodeKind::ArrayPattern { elements, .. } => {
            for &element in elements {
                pattern_names(ast, element, names);
            }
        }
        NodeKind::PatternProperty { name, pattern, .. } => {
            if let Some(target) = pattern.or(*name) {
                pattern_names(ast, target, names);
            }
        }
        NodeKind::VariableDeclarator {
            pattern: Some(pattern),
            ..
        }
        | NodeKind::PatternElement {
            pattern: Some(pattern),
            ..
        }
        | NodeKind::PatternRestElement {
            pattern: Some(pattern),
        } => pattern_names(ast, *pattern, names),
        _ => {}
    }
}

/// Whether any statement awaits outside of a nested function.
fn has_top_level_await(ast: &Ast, statements: &[NodeId]) -> bool {
    fn walk(ast: &Ast, node: NodeId) -> bool {
        match ast.get(node) {
            NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionExpression { .. }
            | NodeKind::ArrowFunction { .. }
            | NodeKind::MethodDefinition { .. }
            | NodeKind::ClassField { .. }
            | NodeKind::ClassInitializer { .. }
            | NodeKind::AsyncBlock { .. }
            | NodeKind::AsyncExpression { .. } => false,
            NodeKind::UnaryExpression { operator: "await", .. } => true,
            NodeKind::ForOfStatement { is_async: true, .. } => true,
            _ => ast.children(node).into_iter().any(|(child, _)| walk(ast, child)),
        }
    }

    statements.iter().any(|&statement| walk(ast, statement))
}

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCE REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

struct ReferenceVisitor {
    replacements: HashMap<NodeId, ImportedMember>,
}

impl ReferenceVisitor {
    fn member(tree: &mut PathTree, import: &ImportedMember) -> NodeId {
        let ast = tree.ast_mut();
        let object = ast.identifier(&import.module);
        ast.member_name(object, &import.imported)
    }

    fn identifier(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<()> {
        let import = match self.replacements.get(&node) {
            Some(import) => import.clone(),
            None => return Ok(()),
        };

        let parent = match tree.parent_node(path) {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let key = tree.location(path).map(|location| location.key);

        let shorthand = key == Some("name")
            && matches!(
                tree.ast().get(parent),
                NodeKind::PatternProperty { pattern: None, .. }
                    | NodeKind::PropertyDefinition { expression: None, .. }
            );
        let member = Self::member(tree, &import);

        if shorthand {
            // `{ x }` gains an explicit value
            match tree.ast_mut().get_mut(parent) {
                NodeKind::PatternProperty { pattern: slot, .. }
                | NodeKind::PropertyDefinition { expression: slot, .. } => *slot = Some(member),
                _ => {}
            }
        } else if key == Some("callee") && tree.ast().kind(parent) == Kind::CallExpression {
            // Called without the module object as `this`
            let callee = templates::expression(tree.ast_mut(), "(0, $$0)", vec![member.into()])?;
            tree.replace_node(path, callee);
        } else {
            tree.replace_node(path, member);
        }

        Ok(())
    }
}

impl Visitor for ReferenceVisitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit> {
        match tree.ast().kind(node) {
            Kind::Identifier => {
                self.identifier(tree, path, node)?;
                Ok(Visit::Handled)
            }
            Kind::ImportCall => {
                tree.visit_children(path, self)?;
                let argument = match tree.ast().get(node) {
                    NodeKind::ImportCall {
                        argument: Some(argument),
                    } => *argument,
                    _ => return Ok(Visit::Handled),
                };
                let replacement = templates::expression(
                    tree.ast_mut(),
                    "Promise.resolve(require($$0))",
                    vec![argument.into()],
                )?;
                tree.replace_node(path, replacement);
                Ok(Visit::Handled)
            }
            _ => Ok(Visit::Descend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::test_support::{commonjs, expect, module};

    #[test]
    fn test_module_binding_base() {
        assert_eq!(module_binding_base("a"), "_a");
        assert_eq!(module_binding_base("./lib/foo-bar.js"), "_foo_bar");
        assert_eq!(module_binding_base("..\\dir\\x.min.js"), "_x");
        assert_eq!(module_binding_base("@scope/pkg"), "_pkg");
    }

    #[test]
    fn test_modules_untouched_without_option() {
        let output = module("import { x } from 'a'; x;");
        assert!(output.starts_with("import"));
        assert!(!output.contains("require"));
    }

    #[test]
    fn test_import_default() {
        expect(
            commonjs("import x from 'a';"),
            "
            'use strict';

            let _a = require('a');
            if (typeof _a === 'function') {
              _a = {
                default: _a
              };
            }
            ",
        );
    }

    #[test]
    fn test_import_names() {
        expect(
            commonjs("import { x, y as z } from 'a'; x; z;"),
            "
            'use strict';

            let _a = require('a');
            _a.x;
            _a.y;
            ",
        );
    }

    #[test]
    fn test_import_twice() {
        expect(
            commonjs("import { x } from 'a'; import { y } from 'a'; x; y;"),
            "
            'use strict';

            let _a = require('a');
            _a.x;
            _a.y;
            ",
        );
    }

    #[test]
    fn test_import_no_shadowing() {
        expect(
            commonjs("import { x } from 'a'; import { y } from 'b'; let _a; _b();"),
            "
            'use strict';

            let _a_1 = require('a');
            let _b_1 = require('b');
            let _a;
            _b();
            ",
        );
    }

    #[test]
    fn test_import_namespace() {
        expect(
            commonjs("import * as ns from './lib/util.js'; ns.f;"),
            "
            'use strict';

            let _util = require('./lib/util.js');
            const ns = _util;
            ns.f;
            ",
        );
    }

    #[test]
    fn test_shorthand_properties() {
        expect(
            commonjs("import { x } from 'a'; ({ x }); ({ x } = 1);"),
            "
            'use strict';

            let _a = require('a');
            ({
              x: _a.x
            });
            ({ x: _a.x } = 1);
            ",
        );
    }

    #[test]
    fn test_import_call() {
        expect(
            commonjs("import('foo').then(x);"),
            "
            'use strict';

            Promise.resolve(require('foo')).then(x);
            ",
        );
    }

    #[test]
    fn test_imported_callee() {
        expect(
            commonjs("import { x } from 'a'; x(); f(x);"),
            "
            'use strict';

            let _a = require('a');
            (0, _a.x)();
            f(_a.x);
            ",
        );
    }

    #[test]
    fn test_export_default_from() {
        expect(
            commonjs("export x from 'a';"),
            "
            'use strict';

            exports.x = require('a').default;
            ",
        );
    }

    #[test]
    fn test_export_namespace() {
        expect(
            commonjs("export * from 'a';"),
            "
            'use strict';

            Object.assign(exports, require('a'));
            ",
        );
        expect(
            commonjs("export * as x from 'a';"),
            "
            'use strict';

            exports.x = require('a');
            ",
        );
    }

    #[test]
    fn test_export_one_from() {
        expect(
            commonjs("export { x as y } from 'a';"),
            "
            'use strict';

            exports.y = require('a').x;
            ",
        );
    }

    #[test]
    fn test_export_multiple_from() {
        expect(
            commonjs("export { x, y as z } from 'a';"),
            "
            'use strict';

            let _a = require('a');
            exports.x = _a.x;
            exports.z = _a.y;
            ",
        );
    }

    #[test]
    fn test_import_then_export() {
        expect(
            commonjs("import { x } from 'a'; export { x }; export { x as y };"),
            "
            'use strict';

            let _a = require('a');
            exports.x = _a.x;
            exports.y = _a.x;
            ",
        );
    }

    #[test]
    fn test_exports_hoisted_to_top() {
        expect(
            commonjs("import { x } from 'a'; export function f() {}"),
            "
            'use strict';

            exports.f = f;
            let _a = require('a');

            function f() {}
            ",
        );
    }

    #[test]
    fn test_export_default_function() {
        expect(
            commonjs("export default function f() {}"),
            "
            'use strict';

            exports.default = f;

            function f() {}
            ",
        );
        expect(
            commonjs("export default function() {}"),
            "
            'use strict';

            exports.default = _default;

            function _default() {}
            ",
        );
    }

    #[test]
    fn test_export_default_class() {
        expect(
            commonjs("export default class C {}"),
            "
            'use strict';

            class C {}

            exports.default = C;
            ",
        );
        expect(
            commonjs("export default class {}"),
            "
            'use strict';

            class _default {}

            exports.default = _default;
            ",
        );
    }

    #[test]
    fn test_export_default_expression() {
        expect(
            commonjs("export default { x: 1, y: 2 };"),
            "
            'use strict';

            exports.default = {
              x: 1,
              y: 2
            };
            ",
        );
    }

    #[test]
    fn test_export_function_and_class() {
        expect(
            commonjs("export function f() {}"),
            "
            'use strict';

            exports.f = f;

            function f() {}
            ",
        );
        expect(
            commonjs("export class C {}"),
            "
            'use strict';

            class C {}

            exports.C = C;
            ",
        );
    }

    #[test]
    fn test_export_variables() {
        expect(
            commonjs("export let x = 1, y = 2, { z } = a, [m] = b;"),
            "
            'use strict';

            let x = 1, y = 2, { z } = a, [m] = b;
            exports.x = x;
            exports.y = y;
            exports.z = z;
            exports.m = m;
            ",
        );
    }

    #[test]
    fn test_export_locals() {
        expect(
            commonjs("const x = 1; export { x as y };"),
            "
            'use strict';

            const x = 1;
            exports.y = x;
            ",
        );
    }

    #[test]
    fn test_top_level_await() {
        expect(
            commonjs("import x from 'x'; await 1;"),
            "
            'use strict';

            (async function() {
              let _x = require('x');
              if (typeof _x === 'function') {
                _x = {
                  default: _x
                };
              }
              await 1;
            })().catch((err) => setTimeout(() => {
              throw err;
            }, 0));
            ",
        );
    }

    #[test]
    fn test_await_inside_function_not_wrapped() {
        let output = commonjs("async function f() { await g(); }");
        assert!(!output.contains("(async function() {"));
    }

    #[test]
    fn test_existing_strict_directive_not_repeated() {
        let output = commonjs("'use strict'; x;");
        assert_eq!(output.matches("'use strict'").count(), 1);
    }
}
