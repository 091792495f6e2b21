//! Import and export declarations.

use crate::ast::{NodeId, NodeKind};
use crate::lexer::{LexMode, TokenKind};

use super::{kind_is, ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(super) fn module_item_list(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut list = Vec::new();

        while self.peek_until("EOF", LexMode::Regex)?.is_some() {
            list.push(self.module_item()?);
        }

        Ok(list)
    }

    fn module_item(&mut self) -> ParseResult<NodeId> {
        match self.peek(LexMode::Regex)? {
            TokenKind::Punct("#[") => {
                let annotations = self.annotations()?;
                let item = self.module_item()?;
                self.annotate(annotations, item)
            }
            TokenKind::Keyword("import") => {
                let next = self.peek_at(LexMode::Div)?;
                if kind_is(next, "(") || kind_is(next, ".") {
                    self.statement_list_item()
                } else {
                    self.import_declaration()
                }
            }
            TokenKind::Keyword("export") => self.export_declaration(),
            _ => self.statement_list_item(),
        }
    }

    pub(super) fn import_call(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("import")?;
        self.read("(")?;
        let argument = self.assignment_expression(false, false)?;
        self.read(")")?;

        Ok(self.finish(
            NodeKind::ImportCall {
                argument: Some(argument),
            },
            start,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Imports
    // ─────────────────────────────────────────────────────────────────────────

    fn import_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut from = None;

        self.read("import")?;

        let imports = match self.peek(LexMode::Regex)? {
            TokenKind::Punct("*") => Some(self.namespace_import()?),
            TokenKind::Punct("{") => Some(self.named_imports()?),
            TokenKind::String => {
                from = Some(self.string_literal()?);
                None
            }
            _ => Some(self.default_import()?),
        };

        let from = match from {
            Some(from) => from,
            None => {
                self.read_keyword("from")?;
                self.string_literal()?
            }
        };

        self.semicolon()?;

        Ok(self.finish(
            NodeKind::ImportDeclaration {
                imports,
                from: Some(from),
            },
            start,
        ))
    }

    fn default_import(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let identifier = self.binding_identifier()?;
        let mut imports = None;

        if self.peek_is(",")? {
            self.read(",")?;
            imports = Some(match self.peek(LexMode::Regex)? {
                TokenKind::Punct("*") => self.namespace_import()?,
                TokenKind::Punct("{") => self.named_imports()?,
                _ => return Err(self.unexpected_here()),
            });
        }

        Ok(self.finish(
            NodeKind::DefaultImport {
                identifier: Some(identifier),
                imports,
            },
            start,
        ))
    }

    fn namespace_import(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("*")?;
        self.read_keyword("as")?;
        let identifier = self.binding_identifier()?;

        Ok(self.finish(
            NodeKind::NamespaceImport {
                identifier: Some(identifier),
            },
            start,
        ))
    }

    fn named_imports(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let mut specifiers = Vec::new();

        self.read("{")?;

        while self.peek_until("}", LexMode::Regex)?.is_some() {
            specifiers.push(self.import_specifier()?);
            if self.peek_is(",")? {
                self.read(",")?;
            } else {
                break;
            }
        }

        self.read("}")?;

        Ok(self.finish(NodeKind::NamedImports { specifiers }, start))
    }

    fn import_specifier(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        // A reserved word may be imported, but only under a local name
        let (imported, has_local) = if self.peek(LexMode::Regex)? != TokenKind::Identifier {
            self.unpeek();
            (self.identifier_name()?, true)
        } else {
            let imported = self.identifier(false)?;
            (imported, self.peek_keyword("as")?)
        };

        let local = if has_local {
            self.read_keyword("as")?;
            Some(self.binding_identifier()?)
        } else {
            self.check_binding_target(imported)?;
            None
        };

        Ok(self.finish(
            NodeKind::ImportSpecifier {
                imported: Some(imported),
                local,
            },
            start,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exports
    // ─────────────────────────────────────────────────────────────────────────

    fn export_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;

        self.read("export")?;

        let declaration = match self.peek(LexMode::Regex)? {
            TokenKind::Keyword("default") => return self.export_default(start),
            TokenKind::Punct("*") => return self.export_namespace(start),
            TokenKind::Punct("{") => return self.export_name_list(start),
            TokenKind::Keyword("var" | "const") => self.lexical_declaration()?,
            TokenKind::Keyword("function") => self.function_declaration()?,
            TokenKind::Keyword("class") => self.class_declaration()?,
            TokenKind::Identifier => {
                if self.peek_let()? {
                    self.lexical_declaration()?
                } else if self.peek_async()? == "function" {
                    self.function_declaration()?
                } else {
                    return self.export_default_from(start);
                }
            }
            _ => return Err(self.unexpected_here()),
        };

        Ok(self.finish(
            NodeKind::ExportDeclaration {
                declaration: Some(declaration),
            },
            start,
        ))
    }

    fn export_default(&mut self, start: usize) -> ParseResult<NodeId> {
        self.read("default")?;

        let binding = match self.peek(LexMode::Regex)? {
            TokenKind::Keyword("class") => self.class_expression()?,
            TokenKind::Keyword("function") => self.function_expression()?,
            TokenKind::Identifier if self.peek_async()? == "function" => {
                self.function_expression()?
            }
            _ => self.assignment_expression(false, false)?,
        };

        if !self.transform_default_export(binding) {
            self.semicolon()?;
        }

        Ok(self.finish(
            NodeKind::ExportDefault {
                binding: Some(binding),
            },
            start,
        ))
    }

    fn export_name_list(&mut self, start: usize) -> ParseResult<NodeId> {
        let mut specifiers = Vec::new();
        let mut from = None;

        self.read("{")?;

        while self.peek_until("}", LexMode::Name)?.is_some() {
            specifiers.push(self.export_specifier()?);
            if self.peek_is(",")? {
                self.read(",")?;
            } else {
                break;
            }
        }

        self.read("}")?;

        if self.peek_keyword("from")? {
            self.read_token(LexMode::Regex)?;
            from = Some(self.string_literal()?);
        } else {
            // Local names must refer to bindings in this module
            for &specifier in &specifiers {
                if let NodeKind::ExportSpecifier {
                    local: Some(local), ..
                } = self.ast.get(specifier)
                {
                    let local = *local;
                    self.transform_identifier(local)?;
                }
            }
        }

        self.semicolon()?;

        Ok(self.finish(NodeKind::ExportNameList { specifiers, from }, start))
    }

    fn export_default_from(&mut self, start: usize) -> ParseResult<NodeId> {
        let identifier = self.identifier(false)?;

        self.read_keyword("from")?;
        let from = self.string_literal()?;
        self.semicolon()?;

        Ok(self.finish(
            NodeKind::ExportDefaultFrom {
                identifier: Some(identifier),
                from: Some(from),
            },
            start,
        ))
    }

    fn export_namespace(&mut self, start: usize) -> ParseResult<NodeId> {
        let mut identifier = None;

        self.read("*")?;

        if self.peek_keyword("as")? {
            self.read_token(LexMode::Regex)?;
            identifier = Some(self.identifier_name()?);
        }

        self.read_keyword("from")?;
        let from = self.string_literal()?;
        self.semicolon()?;

        Ok(self.finish(
            NodeKind::ExportNamespace {
                identifier,
                from: Some(from),
            },
            start,
        ))
    }

    fn export_specifier(&mut self) -> ParseResult<NodeId> {
        let start = self.node_start()?;
        let local = self.identifier_name()?;
        let mut exported = None;

        if self.peek_keyword("as")? {
            self.read_token(LexMode::Regex)?;
            exported = Some(self.identifier_name()?);
        }

        Ok(self.finish(
            NodeKind::ExportSpecifier {
                local: Some(local),
                exported,
            },
            start,
        ))
    }
}
