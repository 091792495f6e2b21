//! Printer for Skert Compiler
//!
//! Turns a tree back into source text with two-space indentation and
//! collects a source-map entry for every node that came from the input.
//!
//! Layout rules:
//! 1. One statement per line; a blank line follows the directive prologue
//!    and surrounds function and class declarations.
//! 2. Object literals with properties put one property per line; patterns
//!    stay inline.
//! 3. Arrow parameters are always parenthesized.
//! 4. Grouping comes from `ParenExpression` nodes. The printer only adds
//!    parentheses where a statement or arrow body would otherwise start
//!    with `{`, `function` or `class`.
//!
//! Extension syntax that no pass lowered is printed as written.

use crate::ast::{Ast, FunctionKind, Kind, NodeId, NodeKind};
use crate::source_map::{LineColumn, Mapping};
use crate::span::{utf16_len, LineMap};

const INDENT: &str = "  ";

#[derive(Debug, Clone, Default)]
pub struct PrintResult {
    pub output: String,
    pub mappings: Vec<Mapping>,
}

pub fn print(ast: &Ast, root: NodeId, line_map: &LineMap) -> PrintResult {
    let mut printer = Printer {
        ast,
        line_map,
        out: String::new(),
        line: 0,
        line_start: 0,
        depth: 0,
        mappings: Vec::new(),
    };

    printer.node(root);

    PrintResult {
        output: printer.out,
        mappings: printer.mappings,
    }
}

struct Printer<'a> {
    ast: &'a Ast,
    line_map: &'a LineMap,
    out: String,
    /// Zero-based line of the write position.
    line: usize,
    /// Byte offset in `out` where the current line starts.
    line_start: usize,
    depth: usize,
    mappings: Vec<Mapping>,
}

impl<'a> Printer<'a> {
    // ─────────────────────────────────────────────────────────────────────────
    // Output primitives
    // ─────────────────────────────────────────────────────────────────────────

    fn write(&mut self, text: &str) {
        // Template literals may carry raw line breaks
        for (i, _) in text.match_indices('\n') {
            self.line += 1;
            self.line_start = self.out.len() + i + 1;
        }
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.write("\n");
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn blank_line(&mut self) {
        self.write("\n");
    }

    fn mark(&mut self, id: NodeId) {
        let node = self.ast.node(id);
        if node.span.is_synthetic() {
            return;
        }

        let original = self.line_map.locate(node.span.start);
        let name = match &node.kind {
            NodeKind::Identifier { value, .. } => Some(value.clone()),
            _ => None,
        };

        self.mappings.push(Mapping {
            generated: LineColumn {
                line: self.line,
                column: utf16_len(&self.out, self.line_start, self.out.len()),
            },
            original: LineColumn {
                line: original.line,
                column: original.column,
            },
            source: None,
            name,
        });
    }

    fn is_bare_integer(&self, id: NodeId) -> bool {
        match self.ast.get(id) {
            NodeKind::NumberLiteral { value, suffix, raw } => number_text(*value, suffix, raw)
                .bytes()
                .all(|b| b.is_ascii_digit()),
            _ => false,
        }
    }

    fn opt(&mut self, id: &Option<NodeId>) {
        if let Some(id) = id {
            self.node(*id);
        }
    }

    fn comma_list(&mut self, list: &[NodeId]) {
        for (i, &id) in list.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.node(id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement layout
    // ─────────────────────────────────────────────────────────────────────────

    fn statement_lines(&mut self, list: &[NodeId], leading_newline: bool) {
        let mut previous = None;

        for &statement in list {
            if matches!(self.ast.get(statement), NodeKind::Comment { .. }) {
                continue;
            }

            if let Some(previous) = previous {
                if self.needs_blank_line(previous, statement) {
                    self.blank_line();
                }
                self.newline();
            } else if leading_newline {
                self.newline();
            }

            self.node(statement);
            previous = Some(statement);
        }
    }

    fn needs_blank_line(&self, previous: NodeId, next: NodeId) -> bool {
        let directive = |id| self.ast.kind(id) == Kind::Directive;
        (directive(previous) && !directive(next))
            || self.is_declaration(previous)
            || self.is_declaration(next)
    }

    fn is_declaration(&self, id: NodeId) -> bool {
        match self.ast.get(id) {
            NodeKind::FunctionDeclaration { .. } | NodeKind::ClassDeclaration { .. } => true,
            NodeKind::ExportDeclaration {
                declaration: Some(inner),
            }
            | NodeKind::ExportDefault {
                binding: Some(inner),
            } => matches!(
                self.ast.kind(*inner),
                Kind::FunctionDeclaration | Kind::ClassDeclaration
            ),
            _ => false,
        }
    }

    fn block(&mut self, statements: &[NodeId]) {
        if statements.is_empty() {
            self.write("{}");
            return;
        }

        self.write("{");
        self.depth += 1;
        self.statement_lines(statements, true);
        self.depth -= 1;
        self.newline();
        self.write("}");
    }

    /// The body of a control statement.
    fn substatement(&mut self, id: &Option<NodeId>) {
        match id {
            Some(id) if self.ast.kind(*id) == Kind::Block => {
                self.write(" ");
                self.node(*id);
            }
            Some(id) => {
                self.depth += 1;
                self.newline();
                self.node(*id);
                self.depth -= 1;
            }
            None => self.write(";"),
        }
    }

    fn ends_with_block(&self, id: &Option<NodeId>) -> bool {
        matches!(id, Some(id) if self.ast.kind(*id) == Kind::Block)
    }

    /// A declaration without its terminating semicolon.
    fn declaration_head(&mut self, id: NodeId) {
        self.mark(id);
        let ast = self.ast;
        if let NodeKind::VariableDeclaration { kind, declarations } = ast.get(id) {
            self.write(kind.as_str());
            self.write(" ");
            self.comma_list(declarations);
        } else {
            self.node(id);
        }
    }

    fn for_head(&mut self, id: &Option<NodeId>) {
        if let Some(id) = id {
            self.declaration_head(*id);
        }
    }

    /// The node printed first when `id` is printed.
    fn leftmost(&self, mut id: NodeId) -> NodeId {
        loop {
            id = match self.ast.get(id) {
                NodeKind::MemberExpression {
                    object: Some(next), ..
                }
                | NodeKind::CallExpression {
                    callee: Some(next), ..
                }
                | NodeKind::CallWithExpression {
                    subject: Some(next), ..
                }
                | NodeKind::TaggedTemplateExpression { tag: Some(next), .. }
                | NodeKind::BinaryExpression { left: Some(next), .. }
                | NodeKind::AssignmentExpression { left: Some(next), .. }
                | NodeKind::ConditionalExpression { test: Some(next), .. }
                | NodeKind::UpdateExpression {
                    prefix: false,
                    expression: Some(next),
                    ..
                } => *next,
                NodeKind::SequenceExpression { expressions } if !expressions.is_empty() => {
                    expressions[0]
                }
                _ => return id,
            };
        }
    }

    fn starts_like_statement(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(self.leftmost(id)),
            Kind::ObjectLiteral
                | Kind::ObjectPattern
                | Kind::FunctionExpression
                | Kind::ClassExpression
                | Kind::AsyncExpression
        )
    }

    fn guarded_expression(&mut self, id: NodeId, guard: bool) {
        if guard {
            self.write("(");
            self.node(id);
            self.write(")");
        } else {
            self.node(id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Functions and classes
    // ─────────────────────────────────────────────────────────────────────────

    fn function(&mut self, kind: FunctionKind, identifier: &Option<NodeId>, params: &[NodeId], body: &Option<NodeId>) {
        if kind.is_async() {
            self.write("async ");
        }
        self.write("function");
        if kind.is_generator() {
            self.write("*");
        }
        if let Some(identifier) = identifier {
            self.write(" ");
            self.node(*identifier);
        }
        self.parameters(params);
        self.write(" ");
        self.opt(body);
    }

    fn parameters(&mut self, params: &[NodeId]) {
        self.write("(");
        self.comma_list(params);
        self.write(")");
    }

    fn class(&mut self, identifier: &Option<NodeId>, base: &Option<NodeId>, mixins: &[NodeId], body: &Option<NodeId>) {
        self.write("class");
        if let Some(identifier) = identifier {
            self.write(" ");
            self.node(*identifier);
        }
        if let Some(base) = base {
            self.write(" extends ");
            self.node(*base);
        }
        if !mixins.is_empty() {
            self.write(" with ");
            self.comma_list(mixins);
        }
        self.write(" ");
        self.opt(body);
    }

    fn method_prefix(&mut self, is_static: bool, kind: FunctionKind) {
        if is_static {
            self.write("static ");
        }
        self.write(match kind {
            FunctionKind::Async => "async ",
            FunctionKind::Generator => "*",
            FunctionKind::AsyncGenerator => "async *",
            FunctionKind::Get => "get ",
            FunctionKind::Set => "set ",
            FunctionKind::Normal | FunctionKind::Constructor => "",
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────────

    fn node(&mut self, id: NodeId) {
        self.mark(id);
        let ast = self.ast;

        match ast.get(id) {
            NodeKind::Identifier { value, .. } => self.write(value),
            NodeKind::NumberLiteral { value, suffix, raw } => {
                self.write(&number_text(*value, suffix, raw));
            }
            NodeKind::StringLiteral { value } => self.write(&quote(value)),
            NodeKind::TemplatePart { raw, .. } => self.write(raw),
            NodeKind::RegularExpression { value, flags } => {
                self.write("/");
                self.write(value);
                self.write("/");
                self.write(flags);
            }
            NodeKind::BooleanLiteral { value } => self.write(if *value { "true" } else { "false" }),
            NodeKind::NullLiteral {} => self.write("null"),
            NodeKind::SymbolName { value } => self.write(value),
            NodeKind::ThisExpression {} => self.write("this"),
            NodeKind::SuperKeyword {} => self.write("super"),
            NodeKind::MetaProperty { left, right } => {
                self.write(left);
                self.write(".");
                self.write(right);
            }

            NodeKind::Script { statements } | NodeKind::Module { statements } => {
                self.statement_lines(statements, false)
            }

            NodeKind::SequenceExpression { expressions } => self.comma_list(expressions),
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            }
            | NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                self.opt(left);
                self.write(" ");
                self.write(operator);
                self.write(" ");
                self.opt(right);
            }
            NodeKind::SpreadExpression { expression } => {
                self.write("...");
                self.opt(expression);
            }
            NodeKind::YieldExpression {
                delegate,
                expression,
            } => {
                self.write(if *delegate { "yield*" } else { "yield" });
                if let Some(expression) = expression {
                    self.write(" ");
                    self.node(*expression);
                }
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                self.opt(test);
                self.write(" ? ");
                self.opt(consequent);
                self.write(" : ");
                self.opt(alternate);
            }
            NodeKind::UpdateExpression {
                operator,
                prefix,
                expression,
            } => {
                if *prefix {
                    self.write(operator);
                    self.opt(expression);
                } else {
                    self.opt(expression);
                    self.write(operator);
                }
            }
            NodeKind::UnaryExpression {
                operator,
                expression,
            } => {
                self.write(operator);
                if operator.chars().all(|c| c.is_ascii_alphabetic())
                    || self.repeats_sign(operator, expression)
                {
                    self.write(" ");
                }
                self.opt(expression);
            }
            NodeKind::MemberExpression { object, property } => {
                let computed = property.map_or(false, |p| ast.kind(p) == Kind::ComputedPropertyName);
                match object {
                    // `1.x` would lex as a number
                    Some(object) if !computed && self.is_bare_integer(*object) => {
                        self.write("(");
                        self.node(*object);
                        self.write(")");
                    }
                    _ => self.opt(object),
                }
                if let Some(property) = property {
                    if ast.kind(*property) != Kind::ComputedPropertyName {
                        self.write(".");
                    }
                    self.node(*property);
                }
            }
            NodeKind::CallExpression {
                callee, arguments, ..
            } => {
                self.opt(callee);
                self.parameters(arguments);
            }
            NodeKind::CallWithExpression {
                subject,
                callee,
                arguments,
                ..
            } => {
                self.opt(subject);
                self.write("->");
                self.opt(callee);
                self.parameters(arguments);
            }
            NodeKind::TemplateExpression { parts } => {
                self.write("`");
                for &part in parts {
                    match ast.get(part) {
                        NodeKind::TemplatePart { template_end, .. } => {
                            self.node(part);
                            if !template_end {
                                self.write("${");
                            }
                        }
                        _ => {
                            self.node(part);
                            self.write("}");
                        }
                    }
                }
                self.write("`");
            }
            NodeKind::TaggedTemplateExpression { tag, template } => {
                self.opt(tag);
                self.opt(template);
            }
            NodeKind::NewExpression {
                callee, arguments, ..
            } => {
                self.write("new ");
                self.opt(callee);
                self.parameters(arguments);
            }
            NodeKind::ParenExpression { expression } => {
                self.write("(");
                self.opt(expression);
                self.write(")");
            }
            NodeKind::ObjectLiteral { properties, .. } => {
                if properties.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{");
                    self.depth += 1;
                    for (i, &property) in properties.iter().enumerate() {
                        if i > 0 {
                            self.write(",");
                        }
                        self.newline();
                        self.node(property);
                    }
                    self.depth -= 1;
                    self.newline();
                    self.write("}");
                }
            }
            NodeKind::ComputedPropertyName { expression } => {
                self.write("[");
                self.opt(expression);
                self.write("]");
            }
            NodeKind::PropertyDefinition { name, expression } => {
                self.opt(name);
                if let Some(expression) = expression {
                    self.write(": ");
                    self.node(*expression);
                }
            }
            NodeKind::ObjectPattern { properties, .. } => {
                if properties.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{ ");
                    self.comma_list(properties);
                    self.write(" }");
                }
            }
            NodeKind::PatternProperty {
                name,
                pattern,
                initializer,
            } => {
                self.opt(name);
                if let Some(pattern) = pattern {
                    self.write(": ");
                    self.node(*pattern);
                }
                if let Some(initializer) = initializer {
                    self.write(" = ");
                    self.node(*initializer);
                }
            }
            NodeKind::ArrayPattern { elements, .. } | NodeKind::ArrayLiteral { elements, .. } => {
                self.write("[");
                self.comma_list(elements);
                if elements.last().map(|&e| ast.kind(e)) == Some(Kind::Elision) {
                    self.write(",");
                }
                self.write("]");
            }
            NodeKind::PatternElement {
                pattern,
                initializer,
            }
            | NodeKind::FormalParameter {
                pattern,
                initializer,
            } => {
                self.opt(pattern);
                if let Some(initializer) = initializer {
                    self.write(" = ");
                    self.node(*initializer);
                }
            }
            NodeKind::PatternRestElement { pattern } | NodeKind::RestParameter { pattern } => {
                self.write("...");
                self.opt(pattern);
            }
            NodeKind::MethodDefinition {
                is_static,
                kind,
                name,
                params,
                body,
            } => {
                self.method_prefix(*is_static, *kind);
                self.opt(name);
                self.parameters(params);
                self.write(" ");
                self.opt(body);
            }
            NodeKind::Elision {} => {}

            NodeKind::Block { statements } | NodeKind::FunctionBody { statements } => {
                self.block(statements)
            }
            NodeKind::AsyncBlock { statements } | NodeKind::AsyncExpression { statements } => {
                self.write("async ");
                self.block(statements);
            }
            NodeKind::LabelledStatement { label, statement } => {
                self.opt(label);
                self.write(": ");
                self.opt(statement);
            }
            NodeKind::ExpressionStatement { expression } => {
                if let Some(expression) = expression {
                    let guard = self.starts_like_statement(*expression);
                    self.guarded_expression(*expression, guard);
                }
                self.write(";");
            }
            NodeKind::Directive { value, .. } => {
                let quote = if value.contains('\'') { "\"" } else { "'" };
                self.write(quote);
                self.write(value);
                self.write(quote);
                self.write(";");
            }
            NodeKind::EmptyStatement {} => self.write(";"),
            NodeKind::VariableDeclaration { kind, declarations } => {
                self.write(kind.as_str());
                self.write(" ");
                self.comma_list(declarations);
                self.write(";");
            }
            NodeKind::VariableDeclarator {
                pattern,
                initializer,
            } => {
                self.opt(pattern);
                if let Some(initializer) = initializer {
                    self.write(" = ");
                    self.node(*initializer);
                }
            }
            NodeKind::ReturnStatement { argument } => {
                self.write("return");
                if let Some(argument) = argument {
                    self.write(" ");
                    self.node(*argument);
                }
                self.write(";");
            }
            NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => {
                self.write(if ast.kind(id) == Kind::BreakStatement {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.write(" ");
                    self.node(*label);
                }
                self.write(";");
            }
            NodeKind::ThrowStatement { expression } => {
                self.write("throw ");
                self.opt(expression);
                self.write(";");
            }
            NodeKind::DebuggerStatement {} => self.write("debugger;"),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                self.write("if (");
                self.opt(test);
                self.write(")");
                self.substatement(consequent);
                if let Some(alternate) = alternate {
                    if self.ends_with_block(consequent) {
                        self.write(" ");
                    } else {
                        self.newline();
                    }
                    self.write("else");
                    if matches!(ast.kind(*alternate), Kind::IfStatement) {
                        self.write(" ");
                        self.node(*alternate);
                    } else {
                        self.substatement(&Some(*alternate));
                    }
                }
            }
            NodeKind::DoWhileStatement { body, test } => {
                self.write("do");
                self.substatement(body);
                if self.ends_with_block(body) {
                    self.write(" ");
                } else {
                    self.newline();
                }
                self.write("while (");
                self.opt(test);
                self.write(");");
            }
            NodeKind::WhileStatement { test, body } => {
                self.write("while (");
                self.opt(test);
                self.write(")");
                self.substatement(body);
            }
            NodeKind::ForStatement {
                initializer,
                test,
                update,
                body,
            } => {
                self.write("for (");
                self.for_head(initializer);
                self.write(";");
                if let Some(test) = test {
                    self.write(" ");
                    self.node(*test);
                }
                self.write(";");
                if let Some(update) = update {
                    self.write(" ");
                    self.node(*update);
                }
                self.write(")");
                self.substatement(body);
            }
            NodeKind::ForInStatement { left, right, body } => {
                self.write("for (");
                self.for_head(left);
                self.write(" in ");
                self.opt(right);
                self.write(")");
                self.substatement(body);
            }
            NodeKind::ForOfStatement {
                is_async,
                left,
                right,
                body,
            } => {
                self.write(if *is_async { "for await (" } else { "for (" });
                self.for_head(left);
                self.write(" of ");
                self.opt(right);
                self.write(")");
                self.substatement(body);
            }
            NodeKind::WithStatement { object, body } => {
                self.write("with (");
                self.opt(object);
                self.write(")");
                self.substatement(body);
            }
            NodeKind::SwitchStatement { discriminant, cases } => {
                self.write("switch (");
                self.opt(discriminant);
                self.write(") {");
                self.depth += 1;
                for &case in cases {
                    self.newline();
                    self.node(case);
                }
                self.depth -= 1;
                self.newline();
                self.write("}");
            }
            NodeKind::SwitchCase { test, consequent } => {
                match test {
                    Some(test) => {
                        self.write("case ");
                        self.node(*test);
                        self.write(":");
                    }
                    None => self.write("default:"),
                }
                self.depth += 1;
                self.statement_lines(consequent, true);
                self.depth -= 1;
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.write("try ");
                self.opt(block);
                if let Some(handler) = handler {
                    self.write(" ");
                    self.node(*handler);
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.node(*finalizer);
                }
            }
            NodeKind::CatchClause { param, body } => {
                self.write("catch ");
                if let Some(param) = param {
                    self.write("(");
                    self.node(*param);
                    self.write(") ");
                }
                self.opt(body);
            }

            NodeKind::FunctionDeclaration {
                kind,
                identifier,
                params,
                body,
            }
            | NodeKind::FunctionExpression {
                kind,
                identifier,
                params,
                body,
            } => self.function(*kind, identifier, params, body),
            NodeKind::ArrowFunctionHead { params } => self.parameters(params),
            NodeKind::ArrowFunction { kind, params, body } => {
                if kind.is_async() {
                    self.write("async ");
                }
                self.parameters(params);
                self.write(" => ");
                if let Some(body) = body {
                    let guard = ast.kind(*body) != Kind::FunctionBody
                        && ast.kind(self.leftmost(*body)) == Kind::ObjectLiteral;
                    self.guarded_expression(*body, guard);
                }
            }

            NodeKind::ClassDeclaration {
                identifier,
                base,
                mixins,
                body,
            }
            | NodeKind::ClassExpression {
                identifier,
                base,
                mixins,
                body,
            } => self.class(identifier, base, mixins, body),
            NodeKind::ClassBody { elements } => {
                if elements.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{");
                    self.depth += 1;
                    for &element in elements {
                        self.newline();
                        self.node(element);
                    }
                    self.depth -= 1;
                    self.newline();
                    self.write("}");
                }
            }
            NodeKind::EmptyClassElement {} => self.write(";"),
            NodeKind::ClassField {
                is_static,
                name,
                initializer,
            } => {
                if *is_static {
                    self.write("static ");
                }
                self.opt(name);
                if let Some(initializer) = initializer {
                    self.write(" = ");
                    self.node(*initializer);
                }
                self.write(";");
            }
            NodeKind::ClassInitializer { statements } => {
                self.write("static ");
                self.block(statements);
            }
            NodeKind::Annotation { expressions } => {
                self.write("#[");
                self.comma_list(expressions);
                self.write("]");
            }

            NodeKind::ImportCall { argument } => {
                self.write("import(");
                self.opt(argument);
                self.write(")");
            }
            NodeKind::ImportDeclaration { imports, from } => {
                self.write("import ");
                if let Some(imports) = imports {
                    self.node(*imports);
                    self.write(" from ");
                }
                self.opt(from);
                self.write(";");
            }
            NodeKind::NamespaceImport { identifier } => {
                self.write("* as ");
                self.opt(identifier);
            }
            NodeKind::NamedImports { specifiers } => self.braced_list(specifiers),
            NodeKind::DefaultImport {
                identifier,
                imports,
            } => {
                self.opt(identifier);
                if let Some(imports) = imports {
                    self.write(", ");
                    self.node(*imports);
                }
            }
            NodeKind::ImportSpecifier { imported, local } => {
                self.opt(imported);
                if let Some(local) = local {
                    self.write(" as ");
                    self.node(*local);
                }
            }
            NodeKind::ExportDeclaration { declaration } => {
                self.write("export ");
                self.opt(declaration);
            }
            NodeKind::ExportDefault { binding } => {
                self.write("export default ");
                if let Some(binding) = binding {
                    self.node(*binding);
                    if !matches!(
                        ast.kind(*binding),
                        Kind::FunctionDeclaration | Kind::ClassDeclaration
                    ) {
                        self.write(";");
                    }
                }
            }
            NodeKind::ExportNameList { specifiers, from } => {
                self.write("export ");
                self.braced_list(specifiers);
                if let Some(from) = from {
                    self.write(" from ");
                    self.node(*from);
                }
                self.write(";");
            }
            NodeKind::ExportNamespace { identifier, from } => {
                self.write("export *");
                if let Some(identifier) = identifier {
                    self.write(" as ");
                    self.node(*identifier);
                }
                self.write(" from ");
                self.opt(from);
                self.write(";");
            }
            NodeKind::ExportDefaultFrom { identifier, from } => {
                self.write("export ");
                self.opt(identifier);
                self.write(" from ");
                self.opt(from);
                self.write(";");
            }
            NodeKind::ExportSpecifier { local, exported } => {
                self.opt(local);
                if let Some(exported) = exported {
                    self.write(" as ");
                    self.node(*exported);
                }
            }

            NodeKind::Comment { .. } => {}
        }
    }

    fn braced_list(&mut self, list: &[NodeId]) {
        if list.is_empty() {
            self.write("{}");
        } else {
            self.write("{ ");
            self.comma_list(list);
            self.write(" }");
        }
    }

    /// `- -x` and `+ +x` must not fuse into `--x` or `++x`.
    fn repeats_sign(&self, operator: &str, expression: &Option<NodeId>) -> bool {
        let inner = match expression {
            Some(inner) => self.ast.get(*inner),
            None => return false,
        };
        let first = match inner {
            NodeKind::UnaryExpression { operator, .. } => *operator,
            NodeKind::UpdateExpression {
                operator,
                prefix: true,
                ..
            } => *operator,
            _ => return false,
        };
        (operator == "-" || operator == "+") && first.starts_with(operator)
    }
}

fn number_text(value: f64, suffix: &str, raw: &str) -> String {
    if raw.is_empty() {
        format!("{}{}", format_number(value), suffix)
    } else {
        raw.to_string()
    }
}

fn format_number(value: f64) -> String {
    if value.is_infinite() {
        "1e999".to_string()
    } else {
        format!("{}", value)
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');

    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }

    out.push('\'');
    out
}
