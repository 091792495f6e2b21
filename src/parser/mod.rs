//! Parser for Skert Compiler
//!
//! Recursive-descent parser with precedence climbing for binary operators.
//! The grammar is fail-fast: the first unexpected token aborts the parse.
//! Rules that only apply to strict code are recorded against the current
//! [`Context`] and escalated when that context is popped, once its final
//! strictness is known.

mod annotations;
mod expressions;
mod modules;
mod statements;
mod validate;

use std::collections::{HashMap, HashSet};

use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::ParseError;
use crate::lexer::{LexMode, Lexer, Token, TokenKind};
use crate::span::{LineMap, Span};

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// Consulted when a statement ends without a semicolon at a position where
/// one may be inserted. Returning `false` rejects the insertion.
pub type AsiHook<'a> = Box<dyn FnMut(&Token) -> bool + 'a>;

/// Everything a parse produces.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub ast: Ast,
    pub root: NodeId,
    /// `Comment` nodes in source order. They are not attached to the tree.
    pub comments: Vec<NodeId>,
    /// `Annotation` nodes keyed by the declaration or member they precede.
    pub annotations: HashMap<NodeId, Vec<NodeId>>,
    pub line_map: LineMap,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Label states stored in [`Context::labels`].
const LABEL_STATEMENT: u8 = 1;
const LABEL_LOOP: u8 = 2;

#[derive(Debug, Clone, Copy)]
struct InvalidNode {
    node: NodeId,
    /// Only an error if the owning context turns out to be strict.
    strict: bool,
}

#[derive(Debug, Default)]
struct Context {
    strict: bool,
    allow_use_strict: bool,
    is_function: bool,
    function_body: bool,
    is_generator: bool,
    is_async: bool,
    is_method: bool,
    allow_super_call: bool,
    has_yield_await: bool,
    labels: HashMap<String, u8>,
    switch_depth: u32,
    loop_depth: u32,
    invalid_nodes: Vec<InvalidNode>,
}

impl Context {
    fn child_of(parent: &Context) -> Self {
        Context {
            strict: parent.strict,
            allow_use_strict: true,
            ..Context::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    ast: Ast,
    peek0: Option<Token>,
    peek1: Option<Token>,
    /// End offset of the last consumed token.
    token_end: usize,
    context: Context,
    parents: Vec<Context>,
    /// Pending messages for nodes registered as invalid. Removing an entry
    /// resolves the node (e.g. a cover grammar turned into a pattern).
    node_errors: HashMap<NodeId, String>,
    comments: Vec<NodeId>,
    comment_starts: HashSet<usize>,
    annotations: HashMap<NodeId, Vec<NodeId>>,
    is_module: bool,
    on_asi: Option<AsiHook<'a>>,
}

/// Parse `source` as a module (strict, import/export allowed).
pub fn parse_module(source: &str) -> Result<ParseOutput, ParseError> {
    Parser::new(source).parse_module()
}

/// Parse `source` as a classic script.
pub fn parse_script(source: &str) -> Result<ParseOutput, ParseError> {
    Parser::new(source).parse_script()
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let lexer = Lexer::new(source);
        let token_end = lexer.offset();

        Parser {
            source,
            lexer,
            ast: Ast::new(),
            peek0: None,
            peek1: None,
            token_end,
            context: Context::default(),
            parents: Vec::new(),
            node_errors: HashMap::new(),
            comments: Vec::new(),
            comment_starts: HashSet::new(),
            annotations: HashMap::new(),
            is_module: false,
            on_asi: None,
        }
    }

    /// Parse into an existing arena, so that parsed nodes can be spliced
    /// into a tree already living there.
    pub fn with_ast(mut self, ast: Ast) -> Self {
        self.ast = ast;
        self
    }

    pub fn with_asi_hook(mut self, hook: AsiHook<'a>) -> Self {
        self.on_asi = Some(hook);
        self
    }

    pub fn parse_module(mut self) -> Result<ParseOutput, ParseError> {
        let root = self.module()?;
        Ok(self.finish_output(root))
    }

    pub fn parse_script(mut self) -> Result<ParseOutput, ParseError> {
        let root = self.script()?;
        Ok(self.finish_output(root))
    }

    fn finish_output(self, root: NodeId) -> ParseOutput {
        ParseOutput {
            ast: self.ast,
            root,
            comments: self.comments,
            annotations: self.annotations,
            line_map: LineMap::new(self.source),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────

    fn next_token(&mut self, mode: LexMode) -> ParseResult<Token> {
        loop {
            let token = self.lexer.next(mode)?;
            if token.kind == TokenKind::Comment {
                self.add_comment(&token);
            } else {
                return Ok(token);
            }
        }
    }

    fn add_comment(&mut self, token: &Token) {
        // Tokens rescanned after an unpeek can yield the same comment twice
        if self.comment_starts.insert(token.span.start) {
            let node = self.ast.alloc(
                NodeKind::Comment {
                    value: token.value.clone(),
                },
                token.span,
            );
            self.comments.push(node);
        }
    }

    /// Start offset of the next token, skipping whitespace and comments.
    fn node_start(&mut self) -> ParseResult<usize> {
        if let Some(token) = &self.peek0 {
            return Ok(token.span.start);
        }

        while let Some(comment) = self.lexer.skip()? {
            self.add_comment(&comment);
        }

        Ok(self.lexer.offset())
    }

    fn finish(&mut self, kind: NodeKind, start: usize) -> NodeId {
        self.ast.alloc(kind, Span::new(start, self.token_end))
    }

    fn node_at(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.alloc(kind, span)
    }

    fn read_token(&mut self, mode: LexMode) -> ParseResult<Token> {
        let token = match self.peek0.take() {
            Some(token) => token,
            None => self.next_token(mode)?,
        };

        self.peek0 = self.peek1.take();
        self.token_end = token.span.end;
        Ok(token)
    }

    /// Consume the next token, which must be the punctuator or keyword `word`.
    fn read(&mut self, word: &str) -> ParseResult<Token> {
        let token = self.read_token(LexMode::Regex)?;
        if token_is(&token, word) {
            Ok(token)
        } else {
            Err(unexpected(&token))
        }
    }

    fn read_kind(&mut self, kind: TokenKind, mode: LexMode) -> ParseResult<Token> {
        let token = self.read_token(mode)?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(unexpected(&token))
        }
    }

    /// Consume a keyword, or a contextual keyword written without escapes.
    fn read_keyword(&mut self, word: &str) -> ParseResult<Token> {
        let token = self.read_token(LexMode::Regex)?;
        if token_is(&token, word) || token.keyword_value() == word {
            Ok(token)
        } else {
            Err(unexpected(&token))
        }
    }

    fn peek_token(&mut self, mode: LexMode) -> ParseResult<&Token> {
        let token = match self.peek0.take() {
            Some(token) => token,
            None => self.next_token(mode)?,
        };
        Ok(self.peek0.insert(token))
    }

    fn peek(&mut self, mode: LexMode) -> ParseResult<TokenKind> {
        Ok(self.peek_token(mode)?.kind)
    }

    /// Second token of lookahead.
    fn peek_token_at(&mut self, mode: LexMode) -> ParseResult<&Token> {
        self.peek_token(LexMode::Regex)?;
        let token = match self.peek1.take() {
            Some(token) => token,
            None => self.next_token(mode)?,
        };
        Ok(self.peek1.insert(token))
    }

    fn peek_at(&mut self, mode: LexMode) -> ParseResult<TokenKind> {
        Ok(self.peek_token_at(mode)?.kind)
    }

    fn peek_is(&mut self, word: &str) -> ParseResult<bool> {
        Ok(kind_is(self.peek(LexMode::Regex)?, word))
    }

    /// Forget lookahead so it can be rescanned in a different mode.
    fn unpeek(&mut self) {
        if let Some(token) = self.peek0.take() {
            self.lexer.reset(token.span.start, token.newline_before);
            self.peek1 = None;
        }
    }

    /// The next token kind, or `None` at end of input or at `word`.
    fn peek_until(&mut self, word: &str, mode: LexMode) -> ParseResult<Option<TokenKind>> {
        let kind = self.peek(mode)?;
        if kind == TokenKind::Eof || kind_is(kind, word) {
            Ok(None)
        } else {
            Ok(Some(kind))
        }
    }

    fn peek_keyword(&mut self, word: &str) -> ParseResult<bool> {
        let token = self.peek_token(LexMode::Regex)?;
        Ok(token_is(token, word) || token.keyword_value() == word)
    }

    fn peek_let(&mut self) -> ParseResult<bool> {
        if self.peek_keyword("let")? {
            return Ok(matches!(
                self.peek_at(LexMode::Div)?,
                TokenKind::Punct("{") | TokenKind::Punct("[") | TokenKind::Identifier
            ));
        }
        Ok(false)
    }

    fn peek_yield(&mut self) -> ParseResult<bool> {
        Ok(self.context.function_body && self.context.is_generator && self.peek_keyword("yield")?)
    }

    fn peek_await(&mut self) -> ParseResult<bool> {
        if self.peek_keyword("await")? {
            if self.context.function_body && self.context.is_async {
                return Ok(true);
            }
            if self.is_module {
                return Err(self.error_here("Await is reserved within modules"));
            }
        }
        Ok(false)
    }

    /// `"function"` or `"{"` if the lookahead is `async function` or an
    /// async block; empty otherwise.
    fn peek_async(&mut self) -> ParseResult<&'static str> {
        if self.peek_token(LexMode::Regex)?.keyword_value() != "async" {
            return Ok("");
        }

        let next = self.peek_token_at(LexMode::Div)?;
        if next.newline_before {
            return Ok("");
        }

        Ok(match next.kind {
            TokenKind::Keyword("function") => "function",
            TokenKind::Punct("{") => "{",
            _ => "",
        })
    }

    /// True if no expression operand follows on this line.
    fn peek_expression_end(&mut self) -> ParseResult<bool> {
        let token = self.peek_token(LexMode::Regex)?;
        if token.newline_before {
            return Ok(true);
        }

        Ok(matches!(
            token.kind,
            TokenKind::Eof
                | TokenKind::Punct("}")
                | TokenKind::Punct(";")
                | TokenKind::Punct("]")
                | TokenKind::Punct(")")
                | TokenKind::Punct(",")
                | TokenKind::Keyword("in")
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// A syntax error at the lookahead token.
    fn error_here(&mut self, message: &str) -> ParseError {
        match self.peek_token(LexMode::Regex) {
            Ok(token) => ParseError::syntax(message, token.span),
            Err(error) => error,
        }
    }

    fn unexpected_here(&mut self) -> ParseError {
        match self.peek_token(LexMode::Regex) {
            Ok(token) => unexpected(token),
            Err(error) => error,
        }
    }

    fn error_at(&self, message: &str, node: NodeId) -> ParseError {
        ParseError::syntax(message, self.ast.span(node))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Contexts
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a new context. A lexical context keeps the enclosing method's
    /// `super` permissions.
    fn push_context(&mut self, lexical: bool) {
        let mut context = Context::child_of(&self.context);
        if lexical {
            context.is_method = self.context.is_method;
            context.allow_super_call = self.context.allow_super_call;
        }
        let parent = std::mem::replace(&mut self.context, context);
        self.parents.push(parent);
    }

    /// Enter a context that may turn out to be an arrow function head, or
    /// may be collapsed back into its parent.
    fn push_maybe_context(&mut self) {
        self.push_context(false);
        if let Some(parent) = self.parents.last() {
            self.context.is_function = parent.is_function;
            self.context.is_generator = parent.is_generator;
            self.context.is_async = parent.is_async;
            self.context.is_method = parent.is_method;
            self.context.allow_super_call = parent.allow_super_call;
            self.context.function_body = parent.function_body;
        }
    }

    /// Leave the current context. Collapsing hands its invalid nodes to the
    /// parent; otherwise they are checked against its final strictness.
    fn pop_context(&mut self, collapse: bool) -> ParseResult<()> {
        if !collapse {
            self.check_invalid_nodes()?;
        }

        if let Some(parent) = self.parents.pop() {
            let context = std::mem::replace(&mut self.context, parent);
            if collapse {
                self.context.invalid_nodes.extend(context.invalid_nodes);
            }
        }

        Ok(())
    }

    fn check_invalid_nodes(&mut self) -> ParseResult<()> {
        let list = std::mem::take(&mut self.context.invalid_nodes);
        let mut deferred = Vec::new();

        for item in list {
            let message = match self.node_errors.get(&item.node) {
                Some(message) => message.clone(),
                None => continue,
            };

            let span = self.ast.span(item.node);
            if !item.strict {
                return Err(ParseError::syntax(message, span));
            }
            if self.context.strict {
                return Err(ParseError::strict(message, span));
            }
            deferred.push(item);
        }

        // Strict-only errors that did not apply here remain pending upward
        if let Some(parent) = self.parents.last_mut() {
            parent.invalid_nodes.extend(deferred);
        }

        Ok(())
    }

    fn set_strict(&mut self, strict: bool) {
        self.context.strict = strict;
    }

    fn add_strict_error(&mut self, message: &str, node: NodeId) {
        self.add_invalid_node(message, node, true);
    }

    fn add_invalid_node(&mut self, message: &str, node: NodeId, strict: bool) {
        self.node_errors.insert(node, message.to_string());
        self.context.invalid_nodes.push(InvalidNode { node, strict });
    }

    fn resolve_invalid_node(&mut self, node: NodeId) {
        self.node_errors.remove(&node);
    }

    fn set_label(&mut self, label: &str, value: u8) {
        self.context.labels.insert(label.to_string(), value);
    }

    fn get_label(&self, label: &str) -> u8 {
        self.context.labels.get(label).copied().unwrap_or(0)
    }

    fn set_function_type(&mut self, kind: crate::ast::FunctionKind) {
        self.context.is_function = true;
        self.context.is_async = kind.is_async();
        self.context.is_generator = kind.is_generator();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Top level
    // ─────────────────────────────────────────────────────────────────────────

    fn script(&mut self) -> ParseResult<NodeId> {
        self.is_module = false;
        self.push_context(false);

        let start = self.node_start()?;
        let statements = self.statement_list(true)?;

        // A stray `}` ends the statement list early
        if self.peek(LexMode::Regex)? != TokenKind::Eof {
            return Err(self.unexpected_here());
        }

        self.pop_context(false)?;
        Ok(self.finish(NodeKind::Script { statements }, start))
    }

    fn module(&mut self) -> ParseResult<NodeId> {
        self.is_module = true;
        self.push_context(false);
        self.set_strict(true);

        // Top-level await
        self.context.is_async = true;
        self.context.function_body = true;

        let start = self.node_start()?;
        let statements = self.module_item_list()?;

        self.pop_context(false)?;
        Ok(self.finish(NodeKind::Module { statements }, start))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// True if `kind` is the punctuator or keyword `word`.
fn kind_is(kind: TokenKind, word: &str) -> bool {
    match kind {
        TokenKind::Punct(p) | TokenKind::Keyword(p) => p == word,
        TokenKind::Eof => word == "EOF",
        _ => false,
    }
}

fn token_is(token: &Token, word: &str) -> bool {
    kind_is(token.kind, word)
}

fn unexpected(token: &Token) -> ParseError {
    let message = if token.kind == TokenKind::Eof {
        "Unexpected end of input".to_string()
    } else {
        format!("Unexpected token {}", token.kind.describe())
    };
    ParseError::syntax(message, token.span)
}
