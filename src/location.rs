//! Location & offset primitives (C1): URIs, 0-based line/character ranges,
//! containment, and UTF-8/UTF-16 offset translation.
//!
//! Positions follow LSP semantics: 0-based `(line, character)` pairs where
//! `character` counts UTF-16 code units within the line, not bytes or
//! codepoints. This matches `lsp-types::Position` exactly, so a location
//! produced by an LSP-driven symbol source needs no translation; a
//! tree-sitter-driven source (which reports byte offsets) must go through
//! [`LineIndex`] to get here.

use lsp_types::{Position, Range as LspRange, Url};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A location in a source file: a URI plus a half-open range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: Url,
    pub range: Range,
}

impl Location {
    pub fn new(uri: Url, range: Range) -> Self {
        Self { uri, range }
    }

    /// `a.includes(b)`: same file, `a.start <= b.start` and `b.end <= a.end`.
    pub fn includes(&self, other: &Location) -> bool {
        self.uri == other.uri && self.range.includes(&other.range)
    }

    /// A location with an empty range at `position`, used for the
    /// zero-width callee stubs the IPC-cache source synthesizes.
    pub fn zero_width(uri: Url, position: Position) -> Self {
        Self {
            uri,
            range: Range { start: position, end: position },
        }
    }

    pub fn is_zero_width(&self) -> bool {
        self.range.start == self.range.end
    }
}

/// A 0-based `(line, character)` half-open range. `character` is a UTF-16
/// code-unit offset within the line, per LSP convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Total order consistent with `<` on `(line, character)`, applied to
    /// `start` then `end`. Used to order symbols by declaration position.
    pub fn cmp_start(&self, other: &Range) -> Ordering {
        cmp_position(self.start, other.start)
    }

    pub fn includes(&self, other: &Range) -> bool {
        cmp_position(self.start, other.start) != Ordering::Greater
            && cmp_position(other.end, self.end) != Ordering::Greater
    }

    /// `true` if the two ranges share any point. Used by `filterLocalSymbols`
    /// to detect a non-containing overlap, which the design notes call
    /// "structural breakage" worth logging rather than silently ignoring.
    pub fn overlaps(&self, other: &Range) -> bool {
        cmp_position(self.start, other.end) == Ordering::Less
            && cmp_position(other.start, self.end) == Ordering::Less
    }
}

pub fn cmp_position(a: Position, b: Position) -> Ordering {
    (a.line, a.character).cmp(&(b.line, b.character))
}

pub fn to_lsp_range(r: Range) -> LspRange {
    LspRange { start: r.start, end: r.end }
}

pub fn from_lsp_range(r: LspRange) -> Range {
    Range { start: r.start, end: r.end }
}

/// Per-line prefix-length table in both UTF-8 bytes and UTF-16 code units,
/// built once per consumed file so that any `(row, col_utf8)` emitted by a
/// byte-oriented parser (tree-sitter) can be mapped to the LSP `(line,
/// char_utf16)` space in O(1) after an O(line length) scan of that one line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line, plus a sentinel past-the-end.
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (idx, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        line_starts.push(text.len());
        Self { line_starts, text_len: text.len() }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }

    fn line_bounds(&self, line: usize) -> (usize, usize) {
        let start = *self.line_starts.get(line).unwrap_or(&self.text_len);
        let end = *self.line_starts.get(line + 1).unwrap_or(&self.text_len);
        (start, end)
    }

    /// Converts a byte offset into a `(line, utf16_character)` position by
    /// binary-searching the line table then re-scanning that line's UTF-8 to
    /// count UTF-16 code units up to the target byte.
    pub fn position_at_byte(&self, text: &str, byte_offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&byte_offset) {
            Ok(i) => i.min(self.line_count().saturating_sub(1).max(0)),
            Err(i) => i.saturating_sub(1),
        };
        let (line_start, line_end) = self.line_bounds(line);
        let end = byte_offset.min(line_end).max(line_start);
        let slice = &text[line_start..end];
        let utf16_len: usize = slice.chars().map(char::len_utf16).sum();
        Position { line: line as u32, character: utf16_len as u32 }
    }

    /// Inverse of [`Self::position_at_byte`]: returns the absolute byte
    /// offset of a `(line, utf16_character)` position. This is
    /// `PositionOffset` from the component design, specialised to bytes
    /// (callers that need a codepoint count can re-derive it from the
    /// returned slice since Rust slicing is byte-indexed anyway).
    pub fn byte_at_position(&self, text: &str, pos: Position) -> usize {
        let (line_start, line_end) = self.line_bounds(pos.line as usize);
        let line_text = &text[line_start..line_end.min(text.len())];
        let mut utf16_count = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16_count >= pos.character {
                return line_start + byte_idx;
            }
            utf16_count += ch.len_utf16() as u32;
        }
        line_start + line_text.len()
    }
}

/// `ChunkHead(text, textStart, pos)`: the prefix of `text` (whose first byte
/// corresponds to `text_start`) up to absolute byte offset `pos`. Used to
/// compute signature text ("everything up to the body") and impl-header
/// text ("everything up to the first method token").
pub fn chunk_head(text: &str, text_start: usize, pos: usize) -> &str {
    let rel_end = pos.saturating_sub(text_start).min(text.len());
    &text[..rel_end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn includes_is_reflexive_and_respects_bounds() {
        let outer = Range::new(pos(0, 0), pos(10, 0));
        let inner = Range::new(pos(1, 0), pos(2, 0));
        assert!(outer.includes(&outer));
        assert!(outer.includes(&inner));
        assert!(!inner.includes(&outer));
    }

    #[test]
    fn line_index_round_trips_ascii() {
        let text = "fn main() {\n    let x = 1;\n}\n";
        let idx = LineIndex::new(text);
        let byte_offset = text.find("let").unwrap();
        let p = idx.position_at_byte(text, byte_offset);
        assert_eq!(p, pos(1, 4));
        assert_eq!(idx.byte_at_position(text, p), byte_offset);
    }

    #[test]
    fn line_index_counts_utf16_surrogate_pairs() {
        // U+1F600 (😀) is one codepoint but two UTF-16 code units.
        let text = "let s = \"😀\";\nlet t = 1;\n";
        let idx = LineIndex::new(text);
        let byte_offset = text.find("t = 1").unwrap();
        let p = idx.position_at_byte(text, byte_offset);
        assert_eq!(p.line, 1);
    }

    #[test]
    fn chunk_head_slices_relative_to_symbol_start() {
        let sym_text = "fn foo(a: i32) -> i32 {\n    a\n}";
        let head = chunk_head(sym_text, 0, 22);
        assert_eq!(head, "fn foo(a: i32) -> i32");
    }

    #[test]
    fn overlaps_detects_partial_but_non_containing_overlap() {
        let a = Range::new(pos(0, 0), pos(5, 0));
        let b = Range::new(pos(3, 0), pos(8, 0));
        assert!(a.overlaps(&b));
        assert!(!a.includes(&b));
        assert!(!b.includes(&a));
    }
}
