//! Scope Resolver for Skert Compiler
//!
//! One walk over a finished tree builds the scope tree. Binding occurrences
//! register in the scope that owns them; references start out free in the
//! scope where they appear and are bound on the way back up, when the
//! scope that declares the name is closed. Anything still free at the root
//! refers to a global or module-external name.
//!
//! Scopes are created for the script or module top level, every function
//! (including arrow functions and methods), class expressions, catch
//! clauses, and blocks or loop heads that declare `let`, `const`, `class`
//! or `function` bindings.

use std::collections::{HashMap, HashSet};

use crate::ast::{Ast, IdentContext, NodeId, NodeKind, VariableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Script,
    Module,
    Function,
    Class,
    Block,
}

impl ScopeKind {
    /// `var` declarations hoist to the nearest scope of these kinds.
    pub fn is_var_scope(self) -> bool {
        matches!(self, ScopeKind::Script | ScopeKind::Module | ScopeKind::Function)
    }
}

/// Every site that declares or reads one name within a scope.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    pub declarations: Vec<NodeId>,
    pub references: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// The node that introduced this scope.
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    pub names: HashMap<String, Binding>,
    /// Identifiers in this scope's subtree that this scope does not bind.
    pub free: Vec<NodeId>,
    pub children: Vec<ScopeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn root(&self) -> Option<ScopeId> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(ScopeId(0))
        }
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, scope)| (ScopeId(i), scope))
    }

    /// Identifiers left unresolved by every scope.
    pub fn free_identifiers(&self) -> &[NodeId] {
        match self.scopes.first() {
            Some(scope) => &scope.free,
            None => &[],
        }
    }

    /// Every bound name in any scope plus every free name. Synthesized
    /// identifiers must avoid all of them.
    pub fn known_names(&self, ast: &Ast) -> HashSet<String> {
        let mut names = HashSet::new();
        for scope in &self.scopes {
            names.extend(scope.names.keys().cloned());
            for &ident in &scope.free {
                if let Some(value) = ast.identifier_value(ident) {
                    names.insert(value.to_string());
                }
            }
        }
        names
    }

    /// The innermost scope that binds `name`, searching outward from `from`.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if scope.names.contains_key(name) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }
}

/// Build the scope tree for the tree rooted at `root`.
pub fn resolve_scopes(ast: &Ast, root: NodeId) -> ScopeTree {
    let mut resolver = Resolver {
        ast,
        tree: ScopeTree::default(),
        stack: Vec::new(),
        target: None,
        saved_targets: Vec::new(),
    };

    match ast.get(root) {
        NodeKind::Script { .. } | NodeKind::Module { .. } => resolver.visit(root),
        _ => {
            // A bare subtree still gets a top-level scope to resolve into
            resolver.push(ScopeKind::Script, root);
            resolver.visit(root);
            resolver.pop();
        }
    }

    resolver.tree
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

struct Resolver<'a> {
    ast: &'a Ast,
    tree: ScopeTree,
    stack: Vec<ScopeId>,
    /// Where binding identifiers currently declare; `None` means the
    /// current scope. Set while walking a `var` declarator's pattern.
    target: Option<ScopeId>,
    saved_targets: Vec<Option<ScopeId>>,
}

impl<'a> Resolver<'a> {
    fn current(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    fn var_scope(&self) -> Option<ScopeId> {
        self.stack
            .iter()
            .rev()
            .copied()
            .find(|id| self.tree.get(*id).kind.is_var_scope())
    }

    fn push(&mut self, kind: ScopeKind, node: NodeId) {
        let id = ScopeId(self.tree.scopes.len());
        let parent = self.current();

        self.tree.scopes.push(Scope {
            kind,
            node,
            parent,
            names: HashMap::new(),
            free: Vec::new(),
            children: Vec::new(),
        });

        if let Some(parent) = parent {
            self.tree.scopes[parent.0].children.push(id);
        }

        self.stack.push(id);
        self.saved_targets.push(self.target.take());
    }

    /// Close the current scope: bind what it declares and pass the rest up.
    fn pop(&mut self) {
        let id = match self.stack.pop() {
            Some(id) => id,
            None => return,
        };
        self.target = self.saved_targets.pop().flatten();

        let pending = std::mem::take(&mut self.tree.scopes[id.0].free);
        let mut free = Vec::new();

        for ident in pending {
            let name = self.ast.identifier_value(ident).unwrap_or_default();
            match self.tree.scopes[id.0].names.get_mut(name) {
                Some(binding) => binding.references.push(ident),
                None => free.push(ident),
            }
        }

        if let Some(parent) = self.tree.scopes[id.0].parent {
            self.tree.scopes[parent.0].free.extend(free.iter().copied());
        }

        self.tree.scopes[id.0].free = free;
    }

    fn declare(&mut self, name: &str, node: NodeId) {
        let scope = match self.target.or_else(|| self.current()) {
            Some(scope) => scope,
            None => return,
        };

        self.tree.scopes[scope.0]
            .names
            .entry(name.to_string())
            .or_default()
            .declarations
            .push(node);
    }

    fn reference(&mut self, node: NodeId) {
        if let Some(scope) = self.current() {
            self.tree.scopes[scope.0].free.push(node);
        }
    }

    fn visit_opt(&mut self, node: Option<NodeId>) {
        if let Some(node) = node {
            self.visit(node);
        }
    }

    fn visit_all(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            self.visit(node);
        }
    }

    fn visit_children(&mut self, node: NodeId) {
        for (child, _) in self.ast.children(node) {
            self.visit(child);
        }
    }

    fn has_lexical_declarations(&self, statements: &[NodeId]) -> bool {
        statements.iter().any(|&statement| self.is_lexical_declaration(Some(statement)))
    }

    fn is_lexical_declaration(&self, node: Option<NodeId>) -> bool {
        match node.map(|node| self.ast.get(node)) {
            Some(NodeKind::VariableDeclaration { kind, .. }) => *kind != VariableKind::Var,
            Some(NodeKind::ClassDeclaration { .. }) | Some(NodeKind::FunctionDeclaration { .. }) => true,
            _ => false,
        }
    }

    fn visit(&mut self, node: NodeId) {
        let ast = self.ast;

        match ast.get(node) {
            NodeKind::Identifier { value, context } => match context {
                IdentContext::Declaration => self.declare(value, node),
                IdentContext::Variable => self.reference(node),
                IdentContext::Name => {}
            },

            NodeKind::Script { statements } => {
                self.push(ScopeKind::Script, node);
                self.visit_all(statements);
                self.pop();
            }

            NodeKind::Module { statements } => {
                self.push(ScopeKind::Module, node);
                self.visit_all(statements);
                self.pop();
            }

            NodeKind::FunctionDeclaration {
                identifier,
                params,
                body,
                ..
            } => {
                self.visit_opt(*identifier);
                self.push(ScopeKind::Function, node);
                self.visit_all(params);
                self.visit_opt(*body);
                self.pop();
            }

            // The name of a function expression is only visible inside it
            NodeKind::FunctionExpression {
                identifier,
                params,
                body,
                ..
            } => {
                self.push(ScopeKind::Function, node);
                self.visit_opt(*identifier);
                self.visit_all(params);
                self.visit_opt(*body);
                self.pop();
            }

            NodeKind::ArrowFunction { params, body, .. } => {
                self.push(ScopeKind::Function, node);
                self.visit_all(params);
                self.visit_opt(*body);
                self.pop();
            }

            NodeKind::MethodDefinition {
                name, params, body, ..
            } => {
                self.visit_opt(*name);
                self.push(ScopeKind::Function, node);
                self.visit_all(params);
                self.visit_opt(*body);
                self.pop();
            }

            NodeKind::AsyncBlock { statements }
            | NodeKind::AsyncExpression { statements }
            | NodeKind::ClassInitializer { statements } => {
                self.push(ScopeKind::Function, node);
                self.visit_all(statements);
                self.pop();
            }

            NodeKind::ClassDeclaration {
                identifier,
                base,
                mixins,
                body,
            } => {
                self.visit_opt(*identifier);
                self.visit_opt(*base);
                self.visit_all(mixins);
                self.visit_opt(*body);
            }

            NodeKind::ClassExpression {
                identifier,
                base,
                mixins,
                body,
            } => {
                self.push(ScopeKind::Class, node);
                self.visit_opt(*identifier);
                self.visit_opt(*base);
                self.visit_all(mixins);
                self.visit_opt(*body);
                self.pop();
            }

            NodeKind::Block { statements } => {
                let scoped = self.has_lexical_declarations(statements);
                if scoped {
                    self.push(ScopeKind::Block, node);
                }
                self.visit_all(statements);
                if scoped {
                    self.pop();
                }
            }

            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => {
                self.visit_opt(*discriminant);

                let scoped = cases.iter().any(|&case| match ast.get(case) {
                    NodeKind::SwitchCase { consequent, .. } => {
                        self.has_lexical_declarations(consequent)
                    }
                    _ => false,
                });

                if scoped {
                    self.push(ScopeKind::Block, node);
                }
                self.visit_all(cases);
                if scoped {
                    self.pop();
                }
            }

            NodeKind::ForStatement { initializer, .. } => self.visit_loop(node, *initializer),
            NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. } => {
                self.visit_loop(node, *left)
            }

            NodeKind::CatchClause { param, body } => {
                self.push(ScopeKind::Block, node);
                self.visit_opt(*param);
                self.visit_opt(*body);
                self.pop();
            }

            NodeKind::VariableDeclaration { kind, declarations } => {
                let target = if *kind == VariableKind::Var {
                    self.var_scope()
                } else {
                    None
                };

                for &declaration in declarations {
                    if let NodeKind::VariableDeclarator {
                        pattern,
                        initializer,
                    } = ast.get(declaration)
                    {
                        let saved = std::mem::replace(&mut self.target, target);
                        self.visit_opt(*pattern);
                        self.target = saved;
                        self.visit_opt(*initializer);
                    }
                }
            }

            _ => self.visit_children(node),
        }
    }

    fn visit_loop(&mut self, node: NodeId, head: Option<NodeId>) {
        let scoped = self.is_lexical_declaration(head);
        if scoped {
            self.push(ScopeKind::Block, node);
        }
        self.visit_children(node);
        if scoped {
            self.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_module, parse_script};

    fn names_of(tree: &ScopeTree, id: ScopeId) -> Vec<String> {
        let mut names: Vec<String> = tree.get(id).names.keys().cloned().collect();
        names.sort();
        names
    }

    fn free_names(tree: &ScopeTree, ast: &Ast) -> Vec<String> {
        tree.free_identifiers()
            .iter()
            .filter_map(|&id| ast.identifier_value(id).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_function_scope_and_free_names() {
        let output = parse_script("let x = 1;\nfunction f(a) { return a + x + y; }")
            .unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        assert_eq!(names_of(&tree, root), vec!["f", "x"]);
        assert_eq!(tree.get(root).names["x"].references.len(), 1);

        let function = tree.get(root).children[0];
        assert_eq!(tree.get(function).kind, ScopeKind::Function);
        assert_eq!(names_of(&tree, function), vec!["a"]);
        assert_eq!(tree.get(function).names["a"].references.len(), 1);

        assert_eq!(free_names(&tree, &output.ast), vec!["y"]);
    }

    #[test]
    fn test_block_shadowing() {
        let output = parse_script("let x;\n{ let x; x; }\nx;").unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        let block = tree.get(root).children[0];

        assert_eq!(tree.get(block).kind, ScopeKind::Block);
        assert_eq!(tree.get(block).names["x"].references.len(), 1);
        assert_eq!(tree.get(root).names["x"].references.len(), 1);
        assert!(tree.free_identifiers().is_empty());
    }

    #[test]
    fn test_var_hoists_out_of_blocks() {
        let output = parse_script("{ let a; var v = a; }\nv;").unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        assert_eq!(names_of(&tree, root), vec!["v"]);
        assert_eq!(tree.get(root).names["v"].references.len(), 1);

        let block = tree.get(root).children[0];
        assert_eq!(names_of(&tree, block), vec!["a"]);
    }

    #[test]
    fn test_plain_block_has_no_scope() {
        let output = parse_script("{ x; }").unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_imports_and_patterns_bind() {
        let output = parse_module(
            "import a, { b as c } from 'm';\nconst { d, e: [f] } = a;\nexport { c, g };",
        )
        .unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        assert_eq!(names_of(&tree, root), vec!["a", "c", "d", "f"]);
        assert_eq!(tree.get(root).names["c"].references.len(), 1);
        assert_eq!(free_names(&tree, &output.ast), vec!["g"]);
    }

    #[test]
    fn test_function_expression_name_is_inner() {
        let output = parse_script("let g = function f() { return f; };\nf;")
            .unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        let function = tree.get(root).children[0];
        assert_eq!(names_of(&tree, function), vec!["f"]);
        assert_eq!(free_names(&tree, &output.ast), vec!["f"]);
    }

    #[test]
    fn test_known_names_and_lookup() {
        let output = parse_script("let a; function b(c) { d; }").unwrap_or_else(|e| panic!("{}", e));
        let tree = resolve_scopes(&output.ast, output.root);

        let names = tree.known_names(&output.ast);
        for name in ["a", "b", "c", "d"] {
            assert!(names.contains(name), "missing {}", name);
        }

        let root = tree.root().unwrap_or_else(|| panic!("no root scope"));
        let function = tree.get(root).children[0];
        assert_eq!(tree.lookup(function, "a"), Some(root));
        assert_eq!(tree.lookup(function, "c"), Some(function));
        assert_eq!(tree.lookup(function, "zzz"), None);
    }
}
