//! Surrounding-sentence context for a text selection.
//!
//! A reader selection is modelled after a DOM range: the text nodes of
//! the container element, in document order, plus a start and end
//! position, each a node index and a character offset into that node.
//!
//! [`extract_context`] renders the selection with up to two sentences on
//! either side, the selection itself wrapped in brackets:
//!
//! ```text
//! It was dark. The wind rose. [She opened the door.] Nobody was there. Or so it seemed.
//! ```
//!
//! Offsets count Unicode scalar values, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default number of sentences kept on each side of the selection.
pub const DEFAULT_SENTENCES: usize = 2;

/// Sentence boundary: terminal punctuation followed by whitespace. The
/// boundary falls after the punctuation.
static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence break pattern compiles"));

// ---------------------------------------------------------------------------
// Selection model
// ---------------------------------------------------------------------------

/// A boundary point of a selection.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TextPosition {
    /// Index of the text node within the container.
    pub node: usize,
    /// Character offset within that node.
    pub offset: usize,
}

impl TextPosition {
    pub const fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection inside a container of text nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectionRange {
    nodes: Vec<String>,
    start: TextPosition,
    end: TextPosition,
    selected: Option<String>,
}

impl SelectionRange {
    /// Creates a selection over `nodes` from `start` to `end`.
    pub fn new(nodes: Vec<String>, start: TextPosition, end: TextPosition) -> Self {
        Self {
            nodes,
            start,
            end,
            selected: None,
        }
    }

    /// Selection within a single block of text, by character offsets.
    pub fn from_text(text: &str, start: usize, end: usize) -> Self {
        Self::new(
            vec![text.to_string()],
            TextPosition::new(0, start),
            TextPosition::new(0, end),
        )
    }

    /// Overrides the selected text (what the host reports as the
    /// selection's string value).
    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected = Some(text.into());
        self
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn start(&self) -> TextPosition {
        self.start
    }

    pub fn end(&self) -> TextPosition {
        self.end
    }

    /// All container text, concatenated.
    pub fn container_text(&self) -> String {
        self.nodes.concat()
    }

    /// Absolute character positions of start and end in the container.
    ///
    /// The walk stops at the end node. A start node that is never
    /// reached counts as position 0; an end node that is never reached
    /// counts as the container length.
    pub fn absolute_bounds(&self) -> (usize, usize) {
        let total: usize = self.nodes.iter().map(|n| n.chars().count()).sum();
        let mut start = 0;
        let mut end = total;

        let mut pos: usize = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if i == self.start.node {
                start = pos.saturating_add(self.start.offset);
            }
            if i == self.end.node {
                end = pos.saturating_add(self.end.offset);
                break;
            }
            pos += node.chars().count();
        }

        (start.min(total), end.min(total))
    }

    /// The selected text: the override if set, otherwise the container
    /// text between the bounds.
    pub fn selected_text(&self) -> String {
        if let Some(text) = &self.selected {
            return text.clone();
        }
        let (start, end) = self.absolute_bounds();
        if start >= end {
            return String::new();
        }
        char_slice(&self.container_text(), start, Some(end)).to_string()
    }
}

/// Slices `s` by character positions. `to = None` means the end.
fn char_slice(s: &str, from: usize, to: Option<usize>) -> &str {
    let byte_at = |chars: usize| s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b);
    let start = byte_at(from);
    let end = to.map_or(s.len(), byte_at).max(start);
    &s[start..end]
}

// ---------------------------------------------------------------------------
// Sentences
// ---------------------------------------------------------------------------

/// Splits text into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        // Terminal punctuation is a single ASCII byte.
        pieces.push(&text[last..m.start() + 1]);
        last = m.end();
    }
    pieces.push(&text[last..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Renders the selection with two sentences of context on each side.
///
/// Returns `""` when the selection is empty after trimming.
pub fn extract_context(range: &SelectionRange) -> String {
    extract_context_with(range, DEFAULT_SENTENCES, DEFAULT_SENTENCES)
}

/// Like [`extract_context`] with explicit sentence counts.
///
/// Fewer sentences than requested are used as-is; nothing is padded.
pub fn extract_context_with(range: &SelectionRange, before: usize, after: usize) -> String {
    let selected = range.selected_text();
    let text = selected.trim();
    if text.is_empty() {
        return String::new();
    }

    let full = range.container_text();
    let (start, end) = range.absolute_bounds();
    let before_text = char_slice(&full, 0, Some(start)).trim();
    let after_text = char_slice(&full, end, None).trim();

    let before_sentences = split_sentences(before_text);
    let after_sentences = split_sentences(after_text);

    let context_before = before_sentences[before_sentences.len().saturating_sub(before)..].join(" ");
    let context_after = after_sentences[..after.min(after_sentences.len())].join(" ");

    let mut parts = Vec::with_capacity(3);
    if !context_before.is_empty() {
        parts.push(context_before);
    }
    parts.push(format!("[{text}]"));
    if !context_after.is_empty() {
        parts.push(context_after);
    }
    parts.join(" ")
}
