//! Plain-text projection of article HTML.
//!
//! Issue offsets are expressed against a tag-stripped rendering of the stored
//! HTML. The projection here must be byte-for-byte stable for the same input,
//! otherwise anchors drift between renders: no whitespace collapsing, no
//! block-level newline insertion, only tag removal and entity decoding.
//!
//! All offsets handed out by [`PlainText`] are char (Unicode scalar) indices.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));
static RAW_TEXT_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("raw-text element pattern is valid")
});
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Longest entity body we try to decode (`&thetasym;` is the longest named one).
const MAX_ENTITY_LEN: usize = 10;

/// The plain text of an article together with a char -> byte index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainText {
    text: String,
    /// `byte_offsets[i]` is the byte index of char `i`; the final entry is
    /// `text.len()` so `[start, end)` slicing works for `end == len_chars()`.
    byte_offsets: Vec<usize>,
}

impl PlainText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        byte_offsets.push(text.len());
        Self { text, byte_offsets }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(html_to_plain(html))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the substring covering chars `[start, end)`, or `None` when the
    /// range is inverted or out of bounds.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end || end > self.len_chars() {
            return None;
        }
        Some(&self.text[self.byte_offsets[start]..self.byte_offsets[end]])
    }

    /// Char range of the first literal occurrence of `needle`.
    pub fn find(&self, needle: &str) -> Option<(usize, usize)> {
        if needle.is_empty() {
            return None;
        }
        let byte_start = self.text.find(needle)?;
        let start = self.char_index_of_byte(byte_start);
        let end = self.char_index_of_byte(byte_start + needle.len());
        Some((start, end))
    }

    fn char_index_of_byte(&self, byte: usize) -> usize {
        match self.byte_offsets.binary_search(&byte) {
            Ok(i) | Err(i) => i,
        }
    }
}

/// Strips markup from `html` and decodes character references.
///
/// Comments and the bodies of `<script>` / `<style>` elements are dropped
/// entirely; every other tag is removed and its text content kept in place.
pub fn html_to_plain(html: &str) -> String {
    let without_comments = COMMENTS.replace_all(html, "");
    let without_raw = RAW_TEXT_ELEMENTS.replace_all(&without_comments, "");
    let without_tags = TAGS.replace_all(&without_raw, "");
    decode_entities(&without_tags).into_owned()
}

/// Decodes named and numeric HTML character references. Unknown or malformed
/// references are left untouched.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp + 1..];
        let decoded = candidate
            .char_indices()
            .take(MAX_ENTITY_LEN + 1)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&candidate[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201c}'),
        "rdquo" => Some('\u{201d}'),
        _ => None,
    }
}

/// Collapses every whitespace run (including non-breaking spaces) to a single
/// ASCII space and trims both ends.
pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
