//! Source Map Codec for Skert Compiler
//!
//! Version 3 source maps: mapping entries are encoded as base64 VLQ
//! deltas, one `;`-separated group per generated line. The decoder is the
//! exact inverse and backs [`SourceMapConsumer`], which translates
//! generated positions (e.g. from stack traces) back to the original.

use std::collections::HashMap;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

const LINK_PREFIX: &str = "\n\n//# sourceMappingURL=";
const DATA_URI_PREFIX: &str = "data:application/json;charset=utf-8;base64,";
const DEFAULT_SOURCE: &str = "__source__";

const VLQ_DIGITS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_SHIFT: u32 = 5;
const VLQ_MASK: i64 = 0b01_1111;
const VLQ_CONTINUE: i64 = 0b10_0000;

/// A zero-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// One correspondence between generated and original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub generated: LineColumn,
    pub original: LineColumn,
    /// `None` means the default source.
    pub source: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub file: String,
    pub content: Option<String>,
    /// Used for mappings that do not name a source.
    pub default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    pub sources: Vec<SourceEntry>,
    pub file: Option<String>,
    pub source_root: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
}

impl SourceMap {
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Table of distinct values in first-seen order.
#[derive(Default)]
struct IndexTable {
    index: HashMap<String, usize>,
    values: Vec<String>,
}

impl IndexTable {
    fn get_or_insert(&mut self, value: &str) -> usize {
        if let Some(&i) = self.index.get(value) {
            return i;
        }
        let i = self.values.len();
        self.index.insert(value.to_string(), i);
        self.values.push(value.to_string());
        i
    }
}

pub fn generate_source_map(mappings: &[Mapping], options: &MapOptions) -> SourceMap {
    let default_source = options
        .sources
        .iter()
        .rev()
        .find(|entry| entry.default)
        .map(|entry| entry.file.as_str())
        .unwrap_or(DEFAULT_SOURCE);

    let mut sources = IndexTable::default();
    let mut names = IndexTable::default();
    let encoded = serialize_mappings(mappings, &mut names, &mut sources, default_source);

    let has_content = options.sources.iter().any(|entry| entry.content.is_some());
    let sources_content = if has_content {
        Some(
            sources
                .values
                .iter()
                .map(|file| {
                    options
                        .sources
                        .iter()
                        .find(|entry| &entry.file == file)
                        .and_then(|entry| entry.content.clone())
                })
                .collect(),
        )
    } else {
        None
    };

    SourceMap {
        version: 3,
        sources: sources.values,
        names: names.values,
        mappings: encoded,
        file: options.file.clone(),
        source_root: options.source_root.clone(),
        sources_content,
    }
}

fn serialize_mappings(
    mappings: &[Mapping],
    names: &mut IndexTable,
    sources: &mut IndexTable,
    default_source: &str,
) -> String {
    let mut result = String::new();
    let mut generated_line = 0;
    let mut generated_column = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut source_index = 0i64;
    let mut name_index = 0i64;

    for (i, mapping) in mappings.iter().enumerate() {
        if mapping.generated.line != generated_line {
            generated_column = 0;
            while generated_line < mapping.generated.line {
                result.push(';');
                generated_line += 1;
            }
        } else if i > 0 {
            if mapping == &mappings[i - 1] {
                continue;
            }
            result.push(',');
        }

        let column = mapping.generated.column as i64;
        encode_vlq(column - generated_column, &mut result);
        generated_column = column;

        let source = mapping.source.as_deref().unwrap_or(default_source);
        let index = sources.get_or_insert(source) as i64;
        encode_vlq(index - source_index, &mut result);
        source_index = index;

        let line = mapping.original.line as i64;
        encode_vlq(line - original_line, &mut result);
        original_line = line;

        let column = mapping.original.column as i64;
        encode_vlq(column - original_column, &mut result);
        original_column = column;

        if let Some(name) = &mapping.name {
            let index = names.get_or_insert(name) as i64;
            encode_vlq(index - name_index, &mut result);
            name_index = index;
        }
    }

    result
}

pub fn encode_vlq(value: i64, out: &mut String) {
    // Sign moves to the lowest bit
    let mut rest = if value < 0 { ((-value) << 1) + 1 } else { value << 1 };

    loop {
        let mut digit = rest & VLQ_MASK;
        rest >>= VLQ_SHIFT;
        if rest > 0 {
            digit |= VLQ_CONTINUE;
        }
        out.push(VLQ_DIGITS[digit as usize] as char);
        if rest == 0 {
            break;
        }
    }
}

/// The comment linking generated output to a map file.
pub fn encode_source_map_link(target: &str) -> String {
    format!("{}{}", LINK_PREFIX, target)
}

/// The comment embedding `map` as a base64 data URI.
pub fn encode_inline_source_map(map: &SourceMap) -> CompileResult<String> {
    let json = map.to_json()?;
    let data = base64::engine::general_purpose::STANDARD.encode(json.as_bytes());
    Ok(format!("{}{}{}", LINK_PREFIX, DATA_URI_PREFIX, data))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// A decoded mapping segment with all deltas resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: usize,
    pub source: Option<usize>,
    pub original_line: usize,
    pub original_column: usize,
    pub name: Option<usize>,
}

fn vlq_digit(c: u8) -> Option<i64> {
    VLQ_DIGITS.iter().position(|&d| d == c).map(|i| i as i64)
}

fn decode_vlq(bytes: &[u8], pos: &mut usize) -> CompileResult<i64> {
    let mut result = 0i64;
    let mut shift = 0;

    loop {
        let c = *bytes
            .get(*pos)
            .ok_or_else(|| CompileError::SourceMap("unterminated VLQ value".to_string()))?;
        let digit = vlq_digit(c)
            .ok_or_else(|| CompileError::SourceMap(format!("invalid VLQ digit `{}`", c as char)))?;
        *pos += 1;

        result += (digit & VLQ_MASK) << shift;
        shift += VLQ_SHIFT;

        if digit & VLQ_CONTINUE == 0 {
            break;
        }
        if shift > 60 {
            return Err(CompileError::SourceMap("VLQ value overflow".to_string()));
        }
    }

    let magnitude = result >> 1;
    Ok(if result & 1 == 1 { -magnitude } else { magnitude })
}

fn resolve(base: i64, delta: i64) -> CompileResult<usize> {
    usize::try_from(base + delta)
        .map_err(|_| CompileError::SourceMap("negative position in mappings".to_string()))
}

/// Decode a `mappings` string into segments, one list per generated line.
pub fn decode_mappings(mappings: &str) -> CompileResult<Vec<Vec<Segment>>> {
    let mut lines = Vec::new();
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;

    for group in mappings.split(';') {
        let mut segments = Vec::new();
        let mut generated_column = 0i64;

        for field in group.split(',').filter(|f| !f.is_empty()) {
            let bytes = field.as_bytes();
            let mut pos = 0;
            let mut values = Vec::with_capacity(5);
            while pos < bytes.len() {
                values.push(decode_vlq(bytes, &mut pos)?);
            }

            let column = resolve(generated_column, values[0])?;
            generated_column = column as i64;

            let mut segment = Segment {
                generated_column: column,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            match values.len() {
                1 => {}
                4 | 5 => {
                    source += values[1];
                    original_line += values[2];
                    original_column += values[3];
                    segment.source = Some(resolve(source, 0)?);
                    segment.original_line = resolve(original_line, 0)?;
                    segment.original_column = resolve(original_column, 0)?;
                    if let Some(&delta) = values.get(4) {
                        name += delta;
                        segment.name = Some(resolve(name, 0)?);
                    }
                }
                n => {
                    return Err(CompileError::SourceMap(format!(
                        "segment `{}` has {} fields",
                        field, n
                    )))
                }
            }

            segments.push(segment);
        }

        lines.push(segments);
    }

    Ok(lines)
}

/// A position in an original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition<'a> {
    pub source: &'a str,
    pub line: usize,
    pub column: usize,
    pub name: Option<&'a str>,
}

pub struct SourceMapConsumer {
    map: SourceMap,
    lines: Vec<Vec<Segment>>,
}

impl SourceMapConsumer {
    pub fn new(map: SourceMap) -> CompileResult<Self> {
        let lines = decode_mappings(&map.mappings)?;
        Ok(SourceMapConsumer { map, lines })
    }

    pub fn map(&self) -> &SourceMap {
        &self.map
    }

    /// The original position of the nearest segment at or before the
    /// zero-based generated `line` and `column`.
    pub fn original_position_for(&self, line: usize, column: usize) -> Option<OriginalPosition<'_>> {
        let segments = self.lines.get(line)?;
        let after = segments.partition_point(|s| s.generated_column <= column);
        let segment = segments.get(after.checked_sub(1)?)?;

        Some(OriginalPosition {
            source: self.map.sources.get(segment.source?)?,
            line: segment.original_line,
            column: segment.original_column,
            name: segment
                .name
                .and_then(|i| self.map.names.get(i))
                .map(String::as_str),
        })
    }
}
