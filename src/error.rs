//! Error Types for Skert Compiler
//!
//! Every stage reports failures through these types. Parse errors carry a
//! byte span and are located against the source's line map once they leave
//! the parser; mutation-engine failures are structural and carry no span.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::{LineMap, Span};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_LEXICAL: &str = "SK-ERR-LEX-001";
pub const ERR_SYNTAX: &str = "SK-ERR-SYNTAX-001";
pub const ERR_STRICT: &str = "SK-ERR-STRICT-001";
pub const ERR_PATH: &str = "SK-ERR-PATH-001";
pub const ERR_TEMPLATE: &str = "SK-ERR-TEMPLATE-001";
pub const ERR_MACRO: &str = "SK-ERR-MACRO-001";
pub const ERR_SOURCE_MAP: &str = "SK-ERR-MAP-001";
pub const ERR_IO: &str = "SK-ERR-IO-001";

pub const WARN_MODULE_TRANSFORM: &str = "SK-WARN-MODULE-001";

// ═══════════════════════════════════════════════════════════════════════════════
// PARSE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorKind {
    /// Malformed literal or character sequence.
    Lexical,
    /// Unexpected token or violated production.
    Syntax,
    /// A violation that only became fatal once its context turned out strict.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Lexical,
            message: message.into(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            span,
        }
    }

    pub fn strict(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Strict,
            message: message.into(),
            span,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUTATION ENGINE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Unable to determine node location")]
    NodeLocation,

    #[error("Node is not contained within a node list")]
    NotInList,

    #[error("Node does not have a parent")]
    NoParent,

    #[error("No enclosing block for declaration `{0}`")]
    NoEnclosingBlock(String),

    #[error("{kind} has no child field `{field}`")]
    ShapeMismatch { kind: &'static str, field: &'static str },
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("SyntaxError: {message} ({file}:{line}:{column})")]
    Syntax {
        kind: ParseErrorKind,
        message: String,
        file: String,
        /// One-based.
        line: usize,
        /// One-based.
        column: usize,
        span: Span,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Invalid template: {0}")]
    Template(String),

    #[error("Macro error: {0}")]
    Macro(String),

    #[error("Invalid source map: {0}")]
    SourceMap(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    /// Attach a file label and line/column to a parse error.
    pub fn located(error: ParseError, line_map: &LineMap, file: &str) -> Self {
        let loc = line_map.locate(error.span.start);
        CompileError::Syntax {
            kind: error.kind,
            message: error.message,
            file: file.to_string(),
            line: loc.line + 1,
            column: loc.column + 1,
            span: error.span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Syntax { kind, .. } => match kind {
                ParseErrorKind::Lexical => ERR_LEXICAL,
                ParseErrorKind::Syntax => ERR_SYNTAX,
                ParseErrorKind::Strict => ERR_STRICT,
            },
            CompileError::Path(_) => ERR_PATH,
            CompileError::Template(_) => ERR_TEMPLATE,
            CompileError::Macro(_) => ERR_MACRO,
            CompileError::SourceMap(_) => ERR_SOURCE_MAP,
            CompileError::Io(_) | CompileError::Json(_) => ERR_IO,
        }
    }

    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        match self {
            CompileError::Syntax {
                message,
                file,
                line,
                column,
                ..
            } => Diagnostic::new(self.code(), message, file, *line as u32, *column as u32),
            other => Diagnostic::new(other.code(), &other.to_string(), file, 0, 0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable report handed to collaborators (CLI, linters, editors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_syntax_error() {
        let map = LineMap::new("let a;\nlet b = ;");
        let error = ParseError::syntax("Unexpected token ;", Span::new(15, 16));
        let located = CompileError::located(error, &map, "input.js");

        assert_eq!(located.code(), ERR_SYNTAX);
        assert_eq!(
            located.to_string(),
            "SyntaxError: Unexpected token ; (input.js:2:9)"
        );

        let diagnostic = located.to_diagnostic("input.js");
        assert_eq!(diagnostic.line, 2);
        assert_eq!(diagnostic.column, 9);
    }

    #[test]
    fn test_path_error_code() {
        let error = CompileError::from(PathError::NotInList);
        assert_eq!(error.code(), ERR_PATH);
        assert_eq!(error.to_string(), "Node is not contained within a node list");
    }
}
