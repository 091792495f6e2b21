//! Mutable Tree Paths for Skert Compiler
//!
//! A [`PathTree`] owns the arena for the duration of the transform passes
//! and hands out lightweight [`PathId`]s: one per node currently being
//! walked. Edits requested through a path are recorded on it and applied
//! only when the walk of its parent's children has finished, so a pass may
//! remove, replace or insert around nodes while their siblings are still
//! being enumerated.
//!
//! Traversal rules:
//! 1. `for_each_child` visits every child first, then applies each child's
//!    recorded edits in child order.
//! 2. `visit` hands each node to the [`Visitor`]; a visitor that handles a
//!    node must descend explicitly with `visit_children`.
//! 3. Synthesized declarations are applied before any other edit on the
//!    same path, each at the top of the nearest enclosing block.

use std::collections::HashSet;

use crate::ast::{Ast, Location, NodeId, NodeKind, SlotMut, SlotRef, VariableKind};
use crate::error::{CompileResult, PathError};
use crate::scope::ScopeTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(usize);

/// A binding to be inserted for a synthesized name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Declaration {
    pub kind: VariableKind,
    pub initializer: Option<NodeId>,
}

impl Declaration {
    pub fn new(kind: VariableKind) -> Self {
        Declaration {
            kind,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: NodeId) -> Self {
        self.initializer = Some(initializer);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Change {
    /// `None` removes the node.
    Replace(Option<NodeId>),
    InsertBefore(Vec<NodeId>),
    InsertAfter(Vec<NodeId>),
}

#[derive(Debug)]
struct Frame {
    node: Option<NodeId>,
    parent: Option<PathId>,
    location: Option<Location>,
    declarations: Vec<(String, Declaration)>,
    changes: Vec<Change>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// VISITOR
// ═══════════════════════════════════════════════════════════════════════════════

/// What the walk should do after [`Visitor::visit`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The visitor did not handle the node; walk its children.
    Descend,
    /// The visitor handled the node, including any descent it wanted.
    Handled,
}

pub trait Visitor {
    fn visit(&mut self, tree: &mut PathTree, path: PathId, node: NodeId) -> CompileResult<Visit>;

    /// Runs after a node's subtree has been walked, unless the node has
    /// been removed or replaced in the meantime.
    fn after(&mut self, _tree: &mut PathTree, _path: PathId, _node: NodeId) -> CompileResult<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct PathTree {
    ast: Ast,
    frames: Vec<Frame>,
    /// Every name a synthesized identifier must avoid.
    names: HashSet<String>,
}

impl PathTree {
    pub fn new(ast: Ast, root: NodeId, scopes: &ScopeTree) -> Self {
        let names = scopes.known_names(&ast);
        PathTree {
            ast,
            frames: vec![Frame {
                node: Some(root),
                parent: None,
                location: None,
                declarations: Vec::new(),
                changes: Vec::new(),
            }],
            names,
        }
    }

    pub fn root(&self) -> PathId {
        PathId(0)
    }

    pub fn root_node(&self) -> Option<NodeId> {
        self.frames[0].node
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub fn into_ast(self) -> Ast {
        self.ast
    }

    pub fn node(&self, path: PathId) -> Option<NodeId> {
        self.frames[path.0].node
    }

    pub fn parent(&self, path: PathId) -> Option<PathId> {
        self.frames[path.0].parent
    }

    pub fn parent_node(&self, path: PathId) -> Option<NodeId> {
        self.parent(path).and_then(|parent| self.node(parent))
    }

    pub fn location(&self, path: PathId) -> Option<Location> {
        self.frames[path.0].location
    }

    pub fn is_name_known(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recording edits
    // ─────────────────────────────────────────────────────────────────────────

    pub fn replace_node(&mut self, path: PathId, node: NodeId) {
        self.frames[path.0].changes.push(Change::Replace(Some(node)));
    }

    pub fn remove_node(&mut self, path: PathId) {
        self.frames[path.0].changes.push(Change::Replace(None));
    }

    pub fn insert_nodes_before(&mut self, path: PathId, nodes: Vec<NodeId>) -> CompileResult<()> {
        self.check_in_list(path)?;
        self.frames[path.0].changes.push(Change::InsertBefore(nodes));
        Ok(())
    }

    pub fn insert_nodes_after(&mut self, path: PathId, nodes: Vec<NodeId>) -> CompileResult<()> {
        self.check_in_list(path)?;
        self.frames[path.0].changes.push(Change::InsertAfter(nodes));
        Ok(())
    }

    fn check_in_list(&self, path: PathId) -> Result<(), PathError> {
        match self.frames[path.0].location {
            None => Err(PathError::NoParent),
            Some(Location { index: None, .. }) => Err(PathError::NotInList),
            Some(_) => Ok(()),
        }
    }

    /// Reserve a name derived from `base` that no scope binds or reads.
    /// With a declaration, a binding for it is queued on `path`.
    pub fn unique_identifier(
        &mut self,
        path: PathId,
        base: &str,
        declaration: Option<Declaration>,
    ) -> String {
        let mut name = base.to_string();
        let mut suffix = 0;

        while self.names.contains(&name) {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }

        self.names.insert(name.clone());

        if let Some(declaration) = declaration {
            self.frames[path.0]
                .declarations
                .push((name.clone(), declaration));
        }

        name
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Traversal
    // ─────────────────────────────────────────────────────────────────────────

    /// Calls `f` with a path for each child of `path`, then applies the
    /// edits recorded on those paths.
    pub fn for_each_child<F>(&mut self, path: PathId, mut f: F) -> CompileResult<()>
    where
        F: FnMut(&mut PathTree, PathId) -> CompileResult<()>,
    {
        let node = match self.node(path) {
            Some(node) => node,
            None => return Ok(()),
        };

        let base = self.frames.len();
        let children: Vec<PathId> = self
            .ast
            .children(node)
            .into_iter()
            .map(|(child, location)| {
                self.frames.push(Frame {
                    node: Some(child),
                    parent: Some(path),
                    location: Some(location),
                    declarations: Vec::new(),
                    changes: Vec::new(),
                });
                PathId(self.frames.len() - 1)
            })
            .collect();

        let result = children
            .iter()
            .try_for_each(|&child| f(self, child))
            .and_then(|_| {
                children
                    .iter()
                    .try_for_each(|&child| self.apply_changes(child))
            });

        self.frames.truncate(base);
        result
    }

    pub fn visit<V: Visitor + ?Sized>(&mut self, path: PathId, visitor: &mut V) -> CompileResult<()> {
        let node = match self.node(path) {
            Some(node) => node,
            None => return Ok(()),
        };

        if visitor.visit(self, path, node)? == Visit::Descend {
            self.visit_children(path, visitor)?;
        }

        let evicted = self.frames[path.0]
            .changes
            .iter()
            .any(|change| matches!(change, Change::Replace(_)));

        if !evicted {
            visitor.after(self, path, node)?;
        }

        Ok(())
    }

    pub fn visit_children<V: Visitor + ?Sized>(
        &mut self,
        path: PathId,
        visitor: &mut V,
    ) -> CompileResult<()> {
        self.for_each_child(path, |tree, child| tree.visit(child, visitor))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applying edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply and clear everything recorded on `path`. Edits queued after
    /// the node has been removed are dropped.
    pub fn apply_changes(&mut self, path: PathId) -> CompileResult<()> {
        let declarations = std::mem::take(&mut self.frames[path.0].declarations);
        for (name, declaration) in declarations {
            self.insert_declaration(path, &name, declaration)?;
        }

        let changes = std::mem::take(&mut self.frames[path.0].changes);
        for change in changes {
            if self.node(path).is_none() {
                break;
            }
            match change {
                Change::Replace(node) => self.apply_replace(path, node)?,
                Change::InsertBefore(nodes) => self.apply_insert(path, nodes, false)?,
                Change::InsertAfter(nodes) => self.apply_insert(path, nodes, true)?,
            }
        }

        Ok(())
    }

    fn apply_replace(&mut self, path: PathId, node: Option<NodeId>) -> CompileResult<()> {
        let (parent, location) = self.locate(path)?;
        let parent_kind = self.ast.kind(parent).name();

        match (self.ast.get_mut(parent).slot_mut(location.key), location.index) {
            (Some(SlotMut::One(slot)), None) => *slot = node,
            (Some(SlotMut::Many(list)), Some(index)) => match node {
                Some(node) => list[index] = node,
                None => {
                    list.remove(index);
                }
            },
            _ => {
                return Err(PathError::ShapeMismatch {
                    kind: parent_kind,
                    field: location.key,
                }
                .into())
            }
        }

        self.frames[path.0].node = node;
        Ok(())
    }

    fn apply_insert(&mut self, path: PathId, nodes: Vec<NodeId>, after: bool) -> CompileResult<()> {
        let (parent, location) = self.locate(path)?;
        let index = location.index.ok_or(PathError::NotInList)?;
        let count = nodes.len();
        let at = if after { index + 1 } else { index };

        match self.ast.get_mut(parent).slot_mut(location.key) {
            Some(SlotMut::Many(list)) => {
                list.splice(at..at, nodes);
            }
            _ => return Err(PathError::NotInList.into()),
        }

        if !after {
            self.frames[path.0].location = Some(Location {
                key: location.key,
                index: Some(index + count),
            });
        }

        Ok(())
    }

    /// The parent node and current slot of `path`'s node. A stale list
    /// index is recovered by rescanning the parent's children.
    fn locate(&mut self, path: PathId) -> Result<(NodeId, Location), PathError> {
        let frame = &self.frames[path.0];
        let parent = frame.parent.ok_or(PathError::NoParent)?;
        let parent_node = self.node(parent).ok_or(PathError::NodeLocation)?;
        let node = frame.node.ok_or(PathError::NodeLocation)?;
        let location = frame.location.ok_or(PathError::NodeLocation)?;

        let kind = self.ast.get(parent_node);
        let in_place = match kind.slot(location.key) {
            None => {
                return Err(PathError::ShapeMismatch {
                    kind: kind.kind().name(),
                    field: location.key,
                })
            }
            Some(SlotRef::One(slot)) => location.index.is_none() && *slot == Some(node),
            Some(SlotRef::Many(list)) => {
                location.index.and_then(|i| list.get(i)) == Some(&node)
            }
        };

        let location = if in_place {
            location
        } else {
            self.ast
                .children(parent_node)
                .into_iter()
                .find(|(child, _)| *child == node)
                .map(|(_, location)| location)
                .ok_or(PathError::NodeLocation)?
        };

        self.frames[path.0].location = Some(location);
        Ok((parent_node, location))
    }

    fn insert_declaration(
        &mut self,
        path: PathId,
        name: &str,
        declaration: Declaration,
    ) -> CompileResult<()> {
        let block = self
            .enclosing_block(path)
            .ok_or_else(|| PathError::NoEnclosingBlock(name.to_string()))?;

        let statement = self
            .ast
            .variable_declaration(declaration.kind, name, declaration.initializer);

        let prologue = match self.ast.get(block) {
            NodeKind::Script { statements }
            | NodeKind::Module { statements }
            | NodeKind::FunctionBody { statements } => statements
                .iter()
                .take_while(|&&s| matches!(self.ast.get(s), NodeKind::Directive { .. }))
                .count(),
            _ => 0,
        };

        match self.ast.get_mut(block).slot_mut("statements") {
            Some(SlotMut::Many(statements)) => statements.insert(prologue, statement),
            _ => return Err(PathError::NoEnclosingBlock(name.to_string()).into()),
        }

        Ok(())
    }

    fn enclosing_block(&self, path: PathId) -> Option<NodeId> {
        let mut current = Some(path);
        while let Some(id) = current {
            if let Some(node) = self.node(id) {
                if matches!(
                    self.ast.get(node),
                    NodeKind::Script { .. }
                        | NodeKind::Module { .. }
                        | NodeKind::Block { .. }
                        | NodeKind::FunctionBody { .. }
                        | NodeKind::AsyncBlock { .. }
                        | NodeKind::AsyncExpression { .. }
                        | NodeKind::ClassInitializer { .. }
                ) {
                    return Some(node);
                }
            }
            current = self.parent(id);
        }
        None
    }
}
