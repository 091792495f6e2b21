//! Source Positions for Skert Compiler
//!
//! Byte-offset spans and the line map that turns offsets into
//! line/column pairs for diagnostics and source maps.

use serde::{Deserialize, Serialize};

/// A `[start, end)` byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Marker for nodes produced by templates and passes.
    pub const SYNTHETIC: Span = Span {
        start: usize::MAX,
        end: usize::MAX,
    };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == usize::MAX
    }
}

/// A resolved source position. `line` is zero-based; `column` counts
/// UTF-16 code units from the byte offset `line_offset`, as source map
/// consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub line_offset: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LineMap {
    source: String,
    starts: Vec<usize>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        let bytes = source.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    starts.push(i + 1);
                }
                b'\n' => starts.push(i + 1),
                // U+2028 and U+2029 are line terminators too
                0xE2 if bytes.get(i + 1) == Some(&0x80)
                    && matches!(bytes.get(i + 2), Some(0xA8) | Some(0xA9)) =>
                {
                    i += 2;
                    starts.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            source: source.to_string(),
            starts,
        }
    }

    pub fn locate(&self, offset: usize) -> Position {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_offset = self.starts[line];

        Position {
            line,
            column: utf16_len(&self.source, line_offset, offset),
            line_offset,
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// UTF-16 length of `text[start..end]`, or the byte distance when the
/// range does not fall on character boundaries.
pub fn utf16_len(text: &str, start: usize, end: usize) -> usize {
    match text.get(start..end) {
        Some(slice) if slice.is_ascii() => slice.len(),
        Some(slice) => slice.encode_utf16().count(),
        None => end.saturating_sub(start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_across_line_endings() {
        let map = LineMap::new("ab\ncd\r\nef\rg");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.locate(0).line, 0);
        assert_eq!(map.locate(4).line, 1);
        assert_eq!(map.locate(4).column, 1);
        assert_eq!(map.locate(7).line, 2);
        assert_eq!(map.locate(10).line, 3);
        assert_eq!(map.locate(10).line_offset, 10);
    }

    #[test]
    fn test_columns_count_utf16_units() {
        let source = "let é = 1; // 😀 x";
        let map = LineMap::new(source);

        let equals = source.find('=').unwrap();
        assert_eq!(equals, 7);
        assert_eq!(map.locate(equals).column, 6);

        let x = source.rfind('x').unwrap();
        assert_eq!(map.locate(x).column, 17);
        assert_eq!(utf16_len(source, 0, 3), 3);
    }

    #[test]
    fn test_synthetic_span() {
        assert!(Span::SYNTHETIC.is_synthetic());
        assert!(!Span::new(0, 3).is_synthetic());
    }
}
