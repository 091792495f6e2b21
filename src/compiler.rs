//! Compile Entry Point for Skert Compiler
//!
//! `compile` drives one source text through every stage:
//!
//! 1. parse (module or script goal)
//! 2. resolve scopes
//! 3. build the root path
//! 4. run the registered passes
//! 5. print, then attach the source map
//!
//! [`Compilation`] exposes the same stages one at a time for collaborators
//! that inspect intermediate state.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use std::collections::HashMap;

use crate::ast::{Ast, NodeId};
use crate::error::{CompileError, CompileResult, Diagnostic, WARN_MODULE_TRANSFORM};
use crate::parser::{parse_module, parse_script, ParseOutput};
use crate::path::PathTree;
use crate::pipeline::{Accumulator, Pipeline};
use crate::printer::print;
use crate::scope::{resolve_scopes, ScopeTree};
use crate::source_map::{
    encode_inline_source_map, encode_source_map_link, generate_source_map, MapOptions, SourceEntry,
    SourceMap,
};
use crate::span::LineMap;
use crate::transforms::annotations::{self, MacroRegistry};
use crate::transforms::{self, PassSelection};

const DEFAULT_LOCATION: &str = "__source__";

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMapMode {
    #[default]
    None,
    /// Return the map and link it by file name.
    File,
    /// Embed the map as a data URI.
    Inline,
}

impl Serialize for SourceMapMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceMapMode::None => serializer.serialize_bool(false),
            SourceMapMode::File => serializer.serialize_bool(true),
            SourceMapMode::Inline => serializer.serialize_str("inline"),
        }
    }
}

impl<'de> Deserialize<'de> for SourceMapMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Named(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(SourceMapMode::None),
            Raw::Flag(true) => Ok(SourceMapMode::File),
            Raw::Named(name) if name == "inline" => Ok(SourceMapMode::Inline),
            Raw::Named(name) => Err(de::Error::custom(format!(
                "unknown source map mode `{}`",
                name
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Parse with the module goal instead of the script goal.
    pub module: bool,
    pub source_map: SourceMapMode,
    pub transform_modules: bool,
    /// Label used in diagnostics and as the source map's source name.
    pub location: String,
    /// Path the output is written to. When set, the map link and the
    /// map's `file` name it instead of the input.
    pub output_location: String,
    pub passes: PassSelection,
}

impl CompileOptions {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn label(&self) -> &str {
        if self.location.is_empty() {
            DEFAULT_LOCATION
        } else {
            &self.location
        }
    }

    fn basename(&self) -> &str {
        file_name(self.label())
    }

    /// File name of the generated output.
    fn output_basename(&self) -> &str {
        if self.output_location.is_empty() {
            self.basename()
        } else {
            file_name(&self.output_location)
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub output: String,
    pub source_map: Option<SourceMap>,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STAGES
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Compilation<'a> {
    source: &'a str,
    options: &'a CompileOptions,
    line_map: LineMap,
    scopes: ScopeTree,
    tree: PathTree,
    /// Annotations not yet expanded, keyed by the node they precede.
    annotations: HashMap<NodeId, Vec<NodeId>>,
    macros: Option<&'a MacroRegistry>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Compilation<'a> {
    /// Parse `source` and build its scopes and root path.
    pub fn new(source: &'a str, options: &'a CompileOptions) -> CompileResult<Self> {
        let parsed = Self::parse(source, options)?;
        let scopes = Self::resolve(&parsed);
        let ParseOutput {
            ast,
            root,
            line_map,
            annotations,
            ..
        } = parsed;

        let mut diagnostics = Vec::new();
        if options.transform_modules && !options.module {
            diagnostics.push(Diagnostic::new(
                WARN_MODULE_TRANSFORM,
                "Module transform skipped for script source",
                options.label(),
                0,
                0,
            ));
        }

        let tree = Self::root_path(ast, root, &scopes);
        Ok(Compilation {
            source,
            options,
            line_map,
            scopes,
            tree,
            annotations,
            macros: None,
            diagnostics,
        })
    }

    /// Resolve annotations against `macros` when the passes run.
    pub fn with_macros(mut self, macros: &'a MacroRegistry) -> Self {
        self.macros = Some(macros);
        self
    }

    pub fn parse(source: &str, options: &CompileOptions) -> CompileResult<ParseOutput> {
        let result = if options.module {
            parse_module(source)
        } else {
            parse_script(source)
        };

        result.map_err(|error| {
            let line_map = LineMap::new(source);
            CompileError::located(error, &line_map, options.label())
        })
    }

    pub fn resolve(parsed: &ParseOutput) -> ScopeTree {
        resolve_scopes(&parsed.ast, parsed.root)
    }

    pub fn root_path(ast: Ast, root: NodeId, scopes: &ScopeTree) -> PathTree {
        PathTree::new(ast, root, scopes)
    }

    /// Scopes of the parsed input. Passes do not update them.
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    /// The root path, for visitors run before or after the passes.
    pub fn tree_mut(&mut self) -> &mut PathTree {
        &mut self.tree
    }

    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    /// Expand annotations, then run the selected passes.
    pub fn run_passes(&mut self, accumulator: &mut Accumulator) -> CompileResult<()> {
        if !self.annotations.is_empty() {
            let none = MacroRegistry::new();
            let macros = self.macros.unwrap_or(&none);
            annotations::expand(&mut self.tree, &self.annotations, &self.scopes, macros)?;
            self.annotations.clear();
        }

        let mut pipeline = Pipeline::new();
        transforms::register(
            &mut pipeline,
            &self.options.passes,
            self.options.transform_modules && self.options.module,
        );

        trace!(passes = ?pipeline.names(), "running pipeline");
        pipeline.run(&mut self.tree, accumulator)
    }

    /// Print the tree and attach the source map the options ask for.
    pub fn emit(self) -> CompileResult<CompileOutput> {
        let root = match self.tree.root_node() {
            Some(root) => root,
            None => {
                return Ok(CompileOutput {
                    output: String::new(),
                    source_map: None,
                    diagnostics: self.diagnostics,
                })
            }
        };

        let printed = print(self.tree.ast(), root, &self.line_map);
        let mut output = printed.output;

        if self.options.source_map == SourceMapMode::None {
            return Ok(CompileOutput {
                output,
                source_map: None,
                diagnostics: self.diagnostics,
            });
        }

        let basename = self.options.basename();
        let output_name = self.options.output_basename();
        let map = generate_source_map(
            &printed.mappings,
            &MapOptions {
                sources: vec![SourceEntry {
                    file: basename.to_string(),
                    content: Some(self.source.to_string()),
                    default: true,
                }],
                file: Some(output_name.to_string()),
                source_root: None,
            },
        );

        let source_map = match self.options.source_map {
            SourceMapMode::Inline => {
                output.push_str(&encode_inline_source_map(&map)?);
                None
            }
            _ => {
                output.push_str(&encode_source_map_link(&format!("{}.map", output_name)));
                Some(map)
            }
        };

        Ok(CompileOutput {
            output,
            source_map,
            diagnostics: self.diagnostics,
        })
    }
}

/// Compile `source` with `options`. Passes that synthesize shared helpers
/// record them in `accumulator`.
pub fn compile(
    source: &str,
    options: &CompileOptions,
    accumulator: &mut Accumulator,
) -> CompileResult<CompileOutput> {
    compile_with_macros(source, options, &MacroRegistry::new(), accumulator)
}

/// [`compile`] with `macros` available to annotations.
pub fn compile_with_macros(
    source: &str,
    options: &CompileOptions,
    macros: &MacroRegistry,
    accumulator: &mut Accumulator,
) -> CompileResult<CompileOutput> {
    debug!(file = %options.label(), bytes = source.len(), "compile start");

    let mut compilation = Compilation::new(source, options)?.with_macros(macros);
    compilation.run_passes(accumulator)?;
    let output = compilation.emit()?;

    debug!(file = %options.label(), bytes = output.output.len(), "compile done");
    Ok(output)
}

/// Compile `source` and report any failure as diagnostics.
pub fn check(source: &str, options: &CompileOptions) -> Vec<Diagnostic> {
    match compile(source, options, &mut Accumulator::new()) {
        Ok(output) => output.diagnostics,
        Err(error) => vec![error.to_diagnostic(options.label())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Kind, NodeKind};
    use crate::error::{ERR_MACRO, ERR_STRICT, ERR_SYNTAX};
    use crate::path::{PathId, Visit, Visitor};
    use crate::source_map::SourceMapConsumer;

    fn options(source_map: SourceMapMode) -> CompileOptions {
        CompileOptions {
            source_map,
            location: "src/input.js".to_string(),
            ..CompileOptions::default()
        }
    }

    #[test]
    fn test_options_from_json() {
        let options = CompileOptions::from_json(
            r#"{ "module": true, "sourceMap": "inline", "transformModules": true, "passes": { "callWith": false } }"#,
        )
        .unwrap();

        assert!(options.module);
        assert!(options.transform_modules);
        assert_eq!(options.source_map, SourceMapMode::Inline);
        assert!(!options.passes.call_with);
        assert!(options.passes.async_blocks);

        let file = CompileOptions::from_json(r#"{ "sourceMap": true }"#).unwrap();
        assert_eq!(file.source_map, SourceMapMode::File);

        assert!(CompileOptions::from_json(r#"{ "sourceMap": "external" }"#).is_err());
    }

    #[test]
    fn test_source_map_mode_serializes_like_input() {
        let json = serde_json::to_value(options(SourceMapMode::File)).unwrap();
        assert_eq!(json["sourceMap"], serde_json::json!(true));

        let json = serde_json::to_value(options(SourceMapMode::Inline)).unwrap();
        assert_eq!(json["sourceMap"], serde_json::json!("inline"));
    }

    #[test]
    fn test_file_source_map() {
        let output = compile("let x = 1;", &options(SourceMapMode::File), &mut Accumulator::new()).unwrap();

        assert_eq!(output.output, "let x = 1;\n\n//# sourceMappingURL=input.js.map");

        let map = output.source_map.unwrap();
        assert_eq!(map.sources, vec!["input.js".to_string()]);
        assert_eq!(map.sources_content, Some(vec![Some("let x = 1;".to_string())]));
        assert!(map.names.contains(&"x".to_string()));
    }

    #[test]
    fn test_map_link_names_output_file() {
        let options = CompileOptions {
            output_location: "out/input.min.js".to_string(),
            ..options(SourceMapMode::File)
        };
        let output = compile("x;", &options, &mut Accumulator::new()).unwrap();

        assert!(output.output.ends_with("//# sourceMappingURL=input.min.js.map"));
        let map = output.source_map.unwrap();
        assert_eq!(map.file.as_deref(), Some("input.min.js"));
        assert_eq!(map.sources, vec!["input.js".to_string()]);
    }

    #[test]
    fn test_inline_source_map() {
        let output =
            compile("x;", &options(SourceMapMode::Inline), &mut Accumulator::new()).unwrap();

        assert!(output.source_map.is_none());
        assert!(output
            .output
            .contains("//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
    }

    #[test]
    fn test_mappings_point_into_original() {
        let source = "a\n  ->f();";
        let output = compile(source, &options(SourceMapMode::File), &mut Accumulator::new()).unwrap();
        assert!(output.output.starts_with("f(a);"));

        let consumer = SourceMapConsumer::new(output.source_map.unwrap()).unwrap();
        let position = consumer.original_position_for(0, 2).unwrap();
        assert_eq!(position.source, "input.js");
        assert_eq!((position.line, position.column), (0, 0));
        assert_eq!(position.name, Some("a"));
    }

    #[test]
    fn test_syntax_error_is_located() {
        let error = compile("let x = ;", &options(SourceMapMode::None), &mut Accumulator::new())
            .unwrap_err();

        match &error {
            CompileError::Syntax {
                file, line, column, ..
            } => {
                assert_eq!(file, "src/input.js");
                assert_eq!((*line, *column), (1, 9));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(error.code(), ERR_SYNTAX);
    }

    #[test]
    fn test_check_reports_diagnostics() {
        let module = CompileOptions {
            module: true,
            location: "m.js".to_string(),
            ..CompileOptions::default()
        };

        let diagnostics = check("with (x) {}", &module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, ERR_STRICT);
        assert_eq!(diagnostics[0].file, "m.js");

        assert!(check("x;", &module).is_empty());
    }

    #[test]
    fn test_annotations_need_registered_macros() {
        let module = CompileOptions {
            module: true,
            ..CompileOptions::default()
        };

        let diagnostics = check("import { a } from 'a';\n#[a] function f() {}", &module);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, ERR_MACRO);
        assert_eq!(diagnostics[0].message, "Macro error: Macro \"a\" is not exported by \"a\"");
    }

    #[test]
    fn test_macros_expand_before_passes() {
        let options = CompileOptions {
            module: true,
            ..CompileOptions::default()
        };
        let mut macros = MacroRegistry::new();
        macros.define(
            "m",
            "lazy",
            |ast: &mut Ast, node: NodeId, _: &[NodeId]| -> CompileResult<Vec<NodeId>> {
                let block = ast.add(NodeKind::AsyncExpression {
                    statements: vec![node],
                });
                let wrapped = crate::templates::statement(ast, "x = $$0;", vec![block.into()])?;
                Ok(vec![wrapped])
            },
        );

        let output = compile_with_macros(
            "import { lazy } from 'm';\n#[lazy] class C {}",
            &options,
            &macros,
            &mut Accumulator::new(),
        )
        .unwrap();
        assert_eq!(output.output, "x = (async () => {\n  class C {}\n})();");
    }

    #[test]
    fn test_module_transform_requires_module_goal() {
        let script = CompileOptions {
            transform_modules: true,
            ..CompileOptions::default()
        };

        let output = compile("x;", &script, &mut Accumulator::new()).unwrap();
        assert_eq!(output.output, "x;");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, WARN_MODULE_TRANSFORM);
    }

    #[test]
    fn test_passes_can_be_disabled() {
        let options = CompileOptions {
            passes: PassSelection::none(),
            ..CompileOptions::default()
        };

        let output = compile("a->f();", &options, &mut Accumulator::new()).unwrap();
        assert_eq!(output.output, "a->f();");
    }

    #[test]
    fn test_stages_run_separately() {
        let options = CompileOptions::default();
        let mut compilation = Compilation::new("x ?? y;", &options).unwrap();
        assert_eq!(compilation.line_map().line_count(), 1);

        compilation.run_passes(&mut Accumulator::new()).unwrap();
        let output = compilation.emit().unwrap();
        assert_eq!(output.output, "(x != null ? x : y);");
    }

    /// Renames every free `console` reference to `logger`.
    struct GlobalRenamer {
        renamed: usize,
    }

    impl Visitor for GlobalRenamer {
        fn visit(&mut self, tree: &mut PathTree, _path: PathId, node: NodeId) -> CompileResult<Visit> {
            if let NodeKind::Identifier { value, .. } = tree.ast_mut().get_mut(node) {
                if value == "console" {
                    *value = "logger".to_string();
                    self.renamed += 1;
                }
            }
            Ok(Visit::Descend)
        }
    }

    #[test]
    fn test_validator_runs_between_stages() {
        let options = CompileOptions::default();
        let mut compilation =
            Compilation::new("let a = 1; console.log(a ?? b);", &options).unwrap();

        let mut free: Vec<String> = compilation
            .scopes()
            .free_identifiers()
            .iter()
            .filter_map(|&id| compilation.tree().ast().identifier_value(id))
            .map(str::to_string)
            .collect();
        free.sort();
        assert_eq!(free, vec!["b".to_string(), "console".to_string()]);

        let root = compilation.tree().root();
        let mut renamer = GlobalRenamer { renamed: 0 };
        compilation.tree_mut().visit(root, &mut renamer).unwrap();
        assert_eq!(renamer.renamed, 1);

        compilation.run_passes(&mut Accumulator::new()).unwrap();
        let top = compilation.tree().root_node().unwrap();
        assert_eq!(compilation.tree().ast().kind(top), Kind::Script);

        let output = compilation.emit().unwrap();
        assert_eq!(output.output, "let a = 1;\nlogger.log((a != null ? a : b));");
    }
}
