//! Bundled Transform Passes for Skert Compiler
//!
//! Each pass lowers one language extension to base syntax using only the
//! public path, template and accumulator API. `register` adds the enabled
//! passes to a pipeline in their fixed order.

pub mod annotations;
pub mod async_block;
pub mod async_expression;
pub mod call_with;
pub mod class_initializers;
pub mod class_mixins;
pub mod method_extraction;
pub mod modules;
pub mod null_coalescing;
pub mod symbol_names;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;

/// Which bundled passes run. The module pass is selected separately by
/// `CompileOptions::transform_modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassSelection {
    pub async_blocks: bool,
    pub async_expressions: bool,
    pub class_initializers: bool,
    pub symbol_names: bool,
    pub method_extraction: bool,
    pub call_with: bool,
    pub null_coalescing: bool,
    pub class_mixins: bool,
}

impl Default for PassSelection {
    fn default() -> Self {
        PassSelection {
            async_blocks: true,
            async_expressions: true,
            class_initializers: true,
            symbol_names: true,
            method_extraction: true,
            call_with: true,
            null_coalescing: true,
            class_mixins: true,
        }
    }
}

impl PassSelection {
    pub fn none() -> Self {
        PassSelection {
            async_blocks: false,
            async_expressions: false,
            class_initializers: false,
            symbol_names: false,
            method_extraction: false,
            call_with: false,
            null_coalescing: false,
            class_mixins: false,
        }
    }
}

pub fn register(pipeline: &mut Pipeline, selection: &PassSelection, transform_modules: bool) {
    if selection.async_blocks {
        async_block::register(pipeline);
    }
    if selection.async_expressions {
        async_expression::register(pipeline);
    }
    if selection.class_initializers {
        class_initializers::register(pipeline);
    }
    if selection.symbol_names {
        symbol_names::register(pipeline);
    }
    if selection.method_extraction {
        method_extraction::register(pipeline);
    }
    if selection.call_with {
        call_with::register(pipeline);
    }
    if selection.null_coalescing {
        null_coalescing::register(pipeline);
    }
    if selection.class_mixins {
        class_mixins::register(pipeline);
    }
    if transform_modules {
        modules::register(pipeline);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lazy_static::lazy_static;
    use regex::Regex;

    use crate::compiler::{compile, CompileOptions};
    use crate::pipeline::Accumulator;

    lazy_static! {
        static ref LEADING_SPACE: Regex = Regex::new(r"\n[ ]+").unwrap();
    }

    /// Drop indentation so comparisons pin structure, not whitespace.
    pub fn normalize(code: &str) -> String {
        LEADING_SPACE.replace_all(code.trim(), "\n").into_owned()
    }

    pub fn compile_with(source: &str, options: &CompileOptions, accumulator: &mut Accumulator) -> String {
        match compile(source, options, accumulator) {
            Ok(output) => normalize(&output.output),
            Err(e) => panic!("{}: {}", source, e),
        }
    }

    pub fn script(source: &str) -> String {
        compile_with(source, &CompileOptions::default(), &mut Accumulator::new())
    }

    pub fn module(source: &str) -> String {
        let options = CompileOptions {
            module: true,
            ..CompileOptions::default()
        };
        compile_with(source, &options, &mut Accumulator::new())
    }

    pub fn commonjs(source: &str) -> String {
        let options = CompileOptions {
            module: true,
            transform_modules: true,
            ..CompileOptions::default()
        };
        compile_with(source, &options, &mut Accumulator::new())
    }

    pub fn expect(actual: String, expected: &str) {
        assert_eq!(actual, normalize(expected));
    }
}
