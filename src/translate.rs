//! File Translation for Skert Compiler
//!
//! Compiles single files or whole directory trees to disk. Folder
//! translation mirrors the input layout under the output directory and
//! compiles files in parallel; every file gets its own accumulator, so
//! helper names never leak between files.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::cache::CompileCache;
use crate::compiler::{compile_with_macros, CompileOptions, CompileOutput, SourceMapMode};
use crate::error::CompileResult;
use crate::pipeline::Accumulator;
use crate::transforms::annotations::MacroRegistry;

const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "skert"];

#[derive(Debug, Clone)]
pub struct Translator {
    options: CompileOptions,
    cache: Option<CompileCache>,
    macros: MacroRegistry,
}

impl Translator {
    pub fn new(options: CompileOptions) -> Self {
        Translator {
            options,
            cache: None,
            macros: MacroRegistry::new(),
        }
    }

    pub fn with_cache(mut self, cache: CompileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Macros available to annotations in every translated file. Cached
    /// outputs are bypassed while any are registered.
    pub fn with_macros(mut self, macros: MacroRegistry) -> Self {
        self.macros = macros;
        self
    }

    fn file_options(&self, input: &Path, output: &Path) -> CompileOptions {
        let mut options = self.options.clone();
        options.location = input.to_string_lossy().into_owned();
        options.output_location = output.to_string_lossy().into_owned();
        if input.extension().map_or(false, |ext| ext == "mjs") {
            options.module = true;
        }
        options
    }

    fn compile_source(&self, source: &str, options: &CompileOptions) -> CompileResult<CompileOutput> {
        let cache = self.cache.as_ref().filter(|_| self.macros.is_empty());

        if let Some(cache) = cache {
            if let Some(output) = cache.get(source, options) {
                debug!(file = %options.location, "cache hit");
                return Ok(output);
            }
            trace!(file = %options.location, "cache miss");
        }

        let output = compile_with_macros(source, options, &self.macros, &mut Accumulator::new())?;

        if let Some(cache) = cache {
            cache.set(source, options, &output)?;
        }
        Ok(output)
    }

    /// Compile `input` into `output`, writing `<output>.map` alongside it
    /// when file source maps are enabled.
    pub fn translate_file(&self, input: &Path, output: &Path) -> CompileResult<()> {
        let source = fs::read_to_string(input)?;
        let options = self.file_options(input, output);
        let compiled = self.compile_source(&source, &options)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, &compiled.output)?;

        if let (SourceMapMode::File, Some(map)) = (options.source_map, &compiled.source_map) {
            let map_path = map_path(output);
            fs::write(&map_path, map.to_json()?)?;
            trace!(path = %map_path.display(), "wrote source map");
        }

        debug!(input = %input.display(), output = %output.display(), "translated");
        Ok(())
    }

    /// Translate every source file under `input_dir`. Returns the written
    /// output paths in input order.
    pub fn translate_folder(&self, input_dir: &Path, output_dir: &Path) -> CompileResult<Vec<PathBuf>> {
        let files = find_source_files(input_dir);
        debug!(dir = %input_dir.display(), files = files.len(), "translating folder");

        files
            .par_iter()
            .map(|input| -> CompileResult<PathBuf> {
                let relative = input.strip_prefix(input_dir).unwrap_or(input);
                let output = output_path(&output_dir.join(relative));
                self.translate_file(input, &output)?;
                Ok(output)
            })
            .collect()
    }
}

pub fn translate_file(input: &Path, output: &Path, options: &CompileOptions) -> CompileResult<()> {
    Translator::new(options.clone()).translate_file(input, output)
}

pub fn translate_folder(
    input_dir: &Path,
    output_dir: &Path,
    options: &CompileOptions,
) -> CompileResult<Vec<PathBuf>> {
    Translator::new(options.clone()).translate_folder(input_dir, output_dir)
}

/// Recursively find translatable files, sorted for stable output.
fn find_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_source_file(path))
        .collect();

    files.sort();
    files
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// `.skert` sources are written as `.js`; other names are kept.
fn output_path(path: &Path) -> PathBuf {
    if path.extension().map_or(false, |ext| ext == "skert") {
        path.with_extension("js")
    } else {
        path.to_path_buf()
    }
}

fn map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}
