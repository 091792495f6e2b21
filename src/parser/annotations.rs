//! `#[...]` annotations on declarations and members.
//!
//! Annotations are not part of the tree. Each one is recorded against the
//! node it decorates and handed out through [`super::ParseOutput`].

use crate::ast::{Kind, NodeId, NodeKind};
use crate::lexer::{LexMode, TokenKind};

use super::{ParseResult, Parser};

impl<'a> Parser<'a> {
    /// Zero or more `#[` expression, ... `]` groups.
    pub(super) fn annotations(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut list = Vec::new();

        while self.peek(LexMode::Regex)? == TokenKind::Punct("#[") {
            let start = self.node_start()?;
            self.read_token(LexMode::Regex)?;

            let mut expressions = Vec::new();
            while self.peek_until("]", LexMode::Regex)?.is_some() {
                if !expressions.is_empty() {
                    self.read(",")?;
                    if self.peek_is("]")? {
                        break;
                    }
                }
                expressions.push(self.assignment_expression(false, false)?);
            }

            self.read("]")?;

            if expressions.is_empty() {
                return Err(self.error_here("Empty annotation"));
            }
            list.push(self.finish(NodeKind::Annotation { expressions }, start));
        }

        Ok(list)
    }

    /// Attach `annotations` to `item`, or to the declaration an export
    /// wraps. Only declarations and members may be annotated.
    pub(super) fn annotate(&mut self, annotations: Vec<NodeId>, item: NodeId) -> ParseResult<NodeId> {
        let first = match annotations.first() {
            Some(&first) => first,
            None => return Ok(item),
        };

        let target = match self.ast.get(item) {
            NodeKind::ExportDeclaration {
                declaration: Some(inner),
            }
            | NodeKind::ExportDefault { binding: Some(inner) } => *inner,
            _ => item,
        };

        match self.ast.kind(target) {
            Kind::FunctionDeclaration
            | Kind::ClassDeclaration
            | Kind::MethodDefinition
            | Kind::ClassField
            | Kind::PropertyDefinition => {}
            _ => return Err(self.error_at("Invalid annotation target", first)),
        }

        self.annotations.entry(target).or_default().extend(annotations);
        Ok(item)
    }
}
