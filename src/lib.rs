//! # Skert Compiler
//!
//! Source-to-source compiler for an extended JavaScript dialect. Source
//! text is parsed into an arena tree, scopes are resolved, and a pipeline
//! of passes rewrites the extensions down to base syntax through the path
//! engine before the tree is printed with a source map.
//!
//! ## Invariants
//!
//! 1. **Fail-fast parsing**: the first lexical or syntax error ends the
//!    parse. Strict-only violations are held on their context and raised
//!    once its strictness is final.
//!
//! 2. **Deferred edits**: edits made through a path are queued and applied
//!    when the parent's child iteration finishes, so siblings still see a
//!    stable list while a pass runs.
//!
//! 3. **Unique names**: `PathTree::unique_identifier` never returns a name
//!    that is bound, read, or already handed out in this compile.
//!
//! 4. **Synthetic spans**: nodes built by passes or templates carry no
//!    source position and produce no source map entries.

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod printer;
pub mod scope;
pub mod source_map;
pub mod span;
pub mod templates;
pub mod transforms;
pub mod translate;

#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod path_tests;

pub use cache::CompileCache;
pub use compiler::{
    check, compile, compile_with_macros, Compilation, CompileOptions, CompileOutput, SourceMapMode,
};
pub use error::{CompileError, CompileResult, Diagnostic, ParseError, PathError};
pub use parser::{parse_module, parse_script, ParseOutput};
pub use path::{Declaration, PathId, PathTree, Visit, Visitor};
pub use pipeline::{Accumulator, Pipeline};
pub use scope::{resolve_scopes, ScopeTree};
pub use source_map::{SourceMap, SourceMapConsumer};
pub use translate::{translate_file, translate_folder, Translator};
pub use transforms::annotations::{Macro, MacroRegistry};
