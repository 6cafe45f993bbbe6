//! Text normalization for filenames and identifiers.
//!
//! Strips everything that is not a word character or whitespace, collapses
//! whitespace runs and bounds the length in characters (not bytes), so
//! Korean and other multi-byte text truncates cleanly.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex matching characters that are neither word characters nor whitespace.
static NON_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Regex to collapse whitespace runs into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Maximum characters of a ref used in an image filename.
pub const FILENAME_MAX_CHARS: usize = 30;

/// Maximum characters of text used in a node identifier.
pub const ID_MAX_CHARS: usize = 20;

/// Maximum characters kept from a text used as an image ref.
pub const REF_MAX_CHARS: usize = 80;

/// Reduce text to a filename-safe token of at most `max_chars` characters.
///
/// Returns an empty string when nothing usable is left.
pub fn sanitize_for_filename(text: &str, max_chars: usize) -> String {
    // Decomposed Hangul (as produced by macOS file APIs) would otherwise
    // leave stray conjoining jamo in names.
    let composed: String = text.nfc().collect();

    let stripped = NON_WORD_REGEX.replace_all(&composed, "");
    let collapsed = WHITESPACE_COLLAPSE_REGEX.replace_all(stripped.trim(), " ");

    truncate_chars(&collapsed, max_chars).trim_end().to_string()
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
