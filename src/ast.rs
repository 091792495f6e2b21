//! AST Node Model for Skert Compiler
//!
//! Nodes live in an arena ([`Ast`]) and refer to each other by [`NodeId`].
//! Every node kind is declared once in the `node_kinds!` table below: its
//! plain data fields, then its child fields in traversal order, each child
//! field being a single optional node (`one`) or an ordered list (`many`).
//! The enum, the kind tag, child enumeration, slot access and the JSON dump
//! are all generated from that one table, so adding a kind without its
//! children is impossible.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A child's slot in its parent: field name plus list index for `many` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub key: &'static str,
    pub index: Option<usize>,
}

pub enum SlotRef<'a> {
    One(&'a Option<NodeId>),
    Many(&'a Vec<NodeId>),
}

pub enum SlotMut<'a> {
    One(&'a mut Option<NodeId>),
    Many(&'a mut Vec<NodeId>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// DATA FIELD TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdentContext {
    /// A reference to a variable.
    #[serde(rename = "variable")]
    Variable,
    /// A binding occurrence (declaration, parameter, import, catch param).
    #[serde(rename = "declaration")]
    Declaration,
    /// A property name, label or other non-variable name.
    #[serde(rename = "")]
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionKind {
    #[serde(rename = "")]
    Normal,
    #[serde(rename = "async")]
    Async,
    #[serde(rename = "generator")]
    Generator,
    #[serde(rename = "async-generator")]
    AsyncGenerator,
    #[serde(rename = "get")]
    Get,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "constructor")]
    Constructor,
}

impl FunctionKind {
    pub fn is_async(self) -> bool {
        matches!(self, FunctionKind::Async | FunctionKind::AsyncGenerator)
    }

    pub fn is_generator(self) -> bool {
        matches!(self, FunctionKind::Generator | FunctionKind::AsyncGenerator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

impl VariableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::Var => "var",
            VariableKind::Let => "let",
            VariableKind::Const => "const",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE KIND TABLE
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! node_slot {
    (one) => { Option<NodeId> };
    (many) => { Vec<NodeId> };
}

macro_rules! visit_slot {
    (one, $slot:ident, $f:ident) => {
        if let Some(id) = *$slot {
            $f(id, Location { key: stringify!($slot), index: None });
        }
    };
    (many, $slot:ident, $f:ident) => {
        for (i, id) in $slot.iter().enumerate() {
            $f(*id, Location { key: stringify!($slot), index: Some(i) });
        }
    };
}

macro_rules! visit_slot_mut {
    (one, $slot:ident, $f:ident) => {
        if let Some(id) = $slot.as_mut() {
            $f(id);
        }
    };
    (many, $slot:ident, $f:ident) => {
        for id in $slot.iter_mut() {
            $f(id);
        }
    };
}

macro_rules! slot_ref {
    (one, $slot:ident) => { SlotRef::One($slot) };
    (many, $slot:ident) => { SlotRef::Many($slot) };
}

macro_rules! slot_mut {
    (one, $slot:ident) => { SlotMut::One($slot) };
    (many, $slot:ident) => { SlotMut::Many($slot) };
}

macro_rules! slot_json {
    (one, $slot:ident, $ast:ident) => {
        match $slot {
            Some(id) => $ast.to_json(*id),
            None => Value::Null,
        }
    };
    (many, $slot:ident, $ast:ident) => {
        Value::Array($slot.iter().map(|id| $ast.to_json(*id)).collect())
    };
}

macro_rules! node_kinds {
    (
        $(
            $(#[$meta:meta])*
            $kind:ident { $( $field:ident : $fty:ty ),* $(,)? }
                [ $( $child:ident : $arity:ident ),* $(,)? ]
        )*
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum NodeKind {
            $(
                $(#[$meta])*
                $kind {
                    $( $field: $fty, )*
                    $( $child: node_slot!($arity), )*
                },
            )*
        }

        /// Field-less tag of a [`NodeKind`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Kind {
            $( $kind, )*
        }

        impl Kind {
            pub fn name(self) -> &'static str {
                match self {
                    $( Kind::$kind => stringify!($kind), )*
                }
            }
        }

        impl NodeKind {
            pub fn kind(&self) -> Kind {
                match self {
                    $( NodeKind::$kind { .. } => Kind::$kind, )*
                }
            }

            /// Calls `f` for every present child, in field order.
            #[allow(unused_variables, unused_mut)]
            pub fn for_each_child<F: FnMut(NodeId, Location)>(&self, mut f: F) {
                match self {
                    $(
                        NodeKind::$kind { $( $child, )* .. } => {
                            $( visit_slot!($arity, $child, f); )*
                        }
                    )*
                }
            }

            #[allow(unused_variables, unused_mut)]
            pub fn for_each_child_mut<F: FnMut(&mut NodeId)>(&mut self, mut f: F) {
                match self {
                    $(
                        NodeKind::$kind { $( $child, )* .. } => {
                            $( visit_slot_mut!($arity, $child, f); )*
                        }
                    )*
                }
            }

            #[allow(unused_variables)]
            pub fn slot(&self, key: &str) -> Option<SlotRef<'_>> {
                match self {
                    $(
                        NodeKind::$kind { $( $child, )* .. } => {
                            $(
                                if key == stringify!($child) {
                                    return Some(slot_ref!($arity, $child));
                                }
                            )*
                            None
                        }
                    )*
                }
            }

            #[allow(unused_variables)]
            pub fn slot_mut(&mut self, key: &str) -> Option<SlotMut<'_>> {
                match self {
                    $(
                        NodeKind::$kind { $( $child, )* .. } => {
                            $(
                                if key == stringify!($child) {
                                    return Some(slot_mut!($arity, $child));
                                }
                            )*
                            None
                        }
                    )*
                }
            }

            #[allow(unused_variables, unused_mut)]
            fn to_json(&self, ast: &Ast) -> Value {
                match self {
                    $(
                        NodeKind::$kind { $( $field, )* $( $child, )* } => {
                            let mut map = Map::new();
                            map.insert("type".to_string(), Value::from(stringify!($kind)));
                            $(
                                map.insert(
                                    camel_case(stringify!($field)),
                                    serde_json::to_value($field).unwrap_or(Value::Null),
                                );
                            )*
                            $(
                                map.insert(
                                    camel_case(stringify!($child)),
                                    slot_json!($arity, $child, ast),
                                );
                            )*
                            Value::Object(map)
                        }
                    )*
                }
            }
        }
    };
}

node_kinds! {
    Identifier { value: String, context: IdentContext } []
    /// `raw` is the literal as written, empty for synthesized numbers.
    NumberLiteral { value: f64, suffix: String, raw: String } []
    StringLiteral { value: String } []
    TemplatePart { value: String, raw: String, template_end: bool } []
    RegularExpression { value: String, flags: String } []
    BooleanLiteral { value: bool } []
    NullLiteral {} []
    /// An `@name` member name; `value` keeps the `@`.
    SymbolName { value: String } []
    ThisExpression {} []
    SuperKeyword {} []
    MetaProperty { left: String, right: String } []

    Script {} [statements: many]
    Module {} [statements: many]

    SequenceExpression {} [expressions: many]
    AssignmentExpression { operator: &'static str } [left: one, right: one]
    SpreadExpression {} [expression: one]
    YieldExpression { delegate: bool } [expression: one]
    ConditionalExpression {} [test: one, consequent: one, alternate: one]
    BinaryExpression { operator: &'static str } [left: one, right: one]
    UpdateExpression { operator: &'static str, prefix: bool } [expression: one]
    UnaryExpression { operator: &'static str } [expression: one]
    MemberExpression {} [object: one, property: one]
    CallExpression { trailing_comma: bool } [callee: one, arguments: many]
    /// `subject->callee(arguments)`
    CallWithExpression { trailing_comma: bool } [subject: one, callee: one, arguments: many]
    TemplateExpression {} [parts: many]
    TaggedTemplateExpression {} [tag: one, template: one]
    NewExpression { trailing_comma: bool } [callee: one, arguments: many]
    ParenExpression {} [expression: one]
    ObjectLiteral { trailing_comma: bool } [properties: many]
    ComputedPropertyName {} [expression: one]
    PropertyDefinition {} [name: one, expression: one]
    ObjectPattern { trailing_comma: bool } [properties: many]
    PatternProperty {} [name: one, pattern: one, initializer: one]
    ArrayPattern { trailing_comma: bool } [elements: many]
    PatternElement {} [pattern: one, initializer: one]
    PatternRestElement {} [pattern: one]
    MethodDefinition { is_static: bool, kind: FunctionKind } [name: one, params: many, body: one]
    ArrayLiteral { trailing_comma: bool } [elements: many]
    /// A hole in an array literal or pattern.
    Elision {} []

    Block {} [statements: many]
    /// `async { ... }`
    AsyncBlock {} [statements: many]
    /// `async { ... }` in expression position.
    AsyncExpression {} [statements: many]
    LabelledStatement {} [label: one, statement: one]
    ExpressionStatement {} [expression: one]
    Directive { value: String } [expression: one]
    EmptyStatement {} []
    VariableDeclaration { kind: VariableKind } [declarations: many]
    VariableDeclarator {} [pattern: one, initializer: one]
    ReturnStatement {} [argument: one]
    BreakStatement {} [label: one]
    ContinueStatement {} [label: one]
    ThrowStatement {} [expression: one]
    DebuggerStatement {} []
    IfStatement {} [test: one, consequent: one, alternate: one]
    DoWhileStatement {} [body: one, test: one]
    WhileStatement {} [test: one, body: one]
    ForStatement {} [initializer: one, test: one, update: one, body: one]
    ForInStatement {} [left: one, right: one, body: one]
    ForOfStatement { is_async: bool } [left: one, right: one, body: one]
    WithStatement {} [object: one, body: one]
    SwitchStatement {} [discriminant: one, cases: many]
    SwitchCase {} [test: one, consequent: many]
    TryStatement {} [block: one, handler: one, finalizer: one]
    CatchClause {} [param: one, body: one]

    FunctionDeclaration { kind: FunctionKind } [identifier: one, params: many, body: one]
    FunctionExpression { kind: FunctionKind } [identifier: one, params: many, body: one]
    FormalParameter {} [pattern: one, initializer: one]
    RestParameter {} [pattern: one]
    FunctionBody {} [statements: many]
    /// Transient: the confirmed parameter list of an arrow function before its body.
    ArrowFunctionHead {} [params: many]
    ArrowFunction { kind: FunctionKind } [params: many, body: one]
    /// `mixins` holds the `with A, B` list.
    ClassDeclaration {} [identifier: one, base: one, mixins: many, body: one]
    ClassExpression {} [identifier: one, base: one, mixins: many, body: one]
    ClassBody {} [elements: many]
    EmptyClassElement {} []
    ClassField { is_static: bool } [name: one, initializer: one]
    /// `static { ... }`
    ClassInitializer {} [statements: many]
    /// `#[a, b(1)]` attached to the declaration or member that follows it.
    Annotation {} [expressions: many]

    ImportCall {} [argument: one]
    ImportDeclaration {} [imports: one, from: one]
    NamespaceImport {} [identifier: one]
    NamedImports {} [specifiers: many]
    DefaultImport {} [identifier: one, imports: one]
    ImportSpecifier {} [imported: one, local: one]
    ExportDeclaration {} [declaration: one]
    ExportDefault {} [binding: one]
    ExportNameList {} [specifiers: many, from: one]
    ExportNamespace {} [identifier: one, from: one]
    ExportDefaultFrom {} [identifier: one, from: one]
    ExportSpecifier {} [local: one, exported: one]

    Comment { value: String } []
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARENA
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, span });
        id
    }

    /// Allocate a node with no source position.
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind, Span::SYNTHETIC)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.nodes[id.0].kind.kind()
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.0].span = span;
    }

    pub fn set_end(&mut self, id: NodeId, end: usize) {
        self.nodes[id.0].span.end = end;
    }

    /// Children of `id` with their slots, in field order.
    pub fn children(&self, id: NodeId) -> Vec<(NodeId, Location)> {
        let mut list = Vec::new();
        self.get(id).for_each_child(|child, location| list.push((child, location)));
        list
    }

    /// Copy the subtree rooted at `id`, giving every copied node a fresh id.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let node = self.node(id).clone();
        let mut kind = node.kind;

        let mut originals = Vec::new();
        kind.for_each_child(|child, _| originals.push(child));

        let copies: Vec<NodeId> = originals.into_iter().map(|c| self.deep_clone(c)).collect();
        let mut copies = copies.into_iter();
        kind.for_each_child_mut(|slot| {
            if let Some(copy) = copies.next() {
                *slot = copy;
            }
        });

        self.alloc(kind, node.span)
    }

    /// JSON rendering of the subtree rooted at `id`.
    pub fn to_json(&self, id: NodeId) -> Value {
        self.get(id).to_json(self)
    }

    pub fn unwrap_parens(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::ParenExpression {
            expression: Some(inner),
        } = self.get(id)
        {
            id = *inner;
        }
        id
    }

    pub fn identifier_value(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            NodeKind::Identifier { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The identifier name if `id` is an identifier written without escapes.
    pub fn keyword_value(&self, id: NodeId) -> &str {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Identifier { value, .. }
                if node.span.is_synthetic() || node.span.end - node.span.start == value.len() =>
            {
                value
            }
            _ => "",
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Constructors for synthesized code
    // ─────────────────────────────────────────────────────────────────────────

    pub fn identifier(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Identifier {
            value: name.to_string(),
            context: IdentContext::Variable,
        })
    }

    pub fn binding_identifier(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Identifier {
            value: name.to_string(),
            context: IdentContext::Declaration,
        })
    }

    pub fn string_literal(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::StringLiteral {
            value: value.to_string(),
        })
    }

    pub fn call(&mut self, callee: NodeId, arguments: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::CallExpression {
            trailing_comma: false,
            callee: Some(callee),
            arguments,
        })
    }

    pub fn member(&mut self, object: NodeId, property: NodeId) -> NodeId {
        self.add(NodeKind::MemberExpression {
            object: Some(object),
            property: Some(property),
        })
    }

    /// `object.name`, with `name` as a property name.
    pub fn member_name(&mut self, object: NodeId, name: &str) -> NodeId {
        let property = self.add(NodeKind::Identifier {
            value: name.to_string(),
            context: IdentContext::Name,
        });
        self.member(object, property)
    }

    pub fn computed_property(&mut self, expression: NodeId) -> NodeId {
        self.add(NodeKind::ComputedPropertyName {
            expression: Some(expression),
        })
    }

    pub fn paren(&mut self, expression: NodeId) -> NodeId {
        self.add(NodeKind::ParenExpression {
            expression: Some(expression),
        })
    }

    pub fn expression_statement(&mut self, expression: NodeId) -> NodeId {
        self.add(NodeKind::ExpressionStatement {
            expression: Some(expression),
        })
    }

    /// `kind name = initializer;`
    pub fn variable_declaration(
        &mut self,
        kind: VariableKind,
        name: &str,
        initializer: Option<NodeId>,
    ) -> NodeId {
        let pattern = self.binding_identifier(name);
        let declarator = self.add(NodeKind::VariableDeclarator {
            pattern: Some(pattern),
            initializer,
        });
        self.add(NodeKind::VariableDeclaration {
            kind,
            declarations: vec![declarator],
        })
    }

    pub fn directive(&mut self, value: &str) -> NodeId {
        let expression = self.string_literal(value);
        self.add(NodeKind::Directive {
            value: value.to_string(),
            expression: Some(expression),
        })
    }
}
