//! Slug generation and string sanitation for user-entered names.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Upper bound on `-2`, `-3`, ... suffixes tried when looking for a free slug
pub const MAX_SLUG_ATTEMPTS: u32 = 100;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static NON_SLUG_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));
static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// Trim, drop control characters and collapse whitespace runs to one space
pub fn collapse_whitespace(input: &str) -> String {
    let visible: String = input
        .chars()
        .filter(|c| c.is_whitespace() || !c.is_control())
        .collect();
    WHITESPACE_RUN.replace_all(visible.trim(), " ").into_owned()
}

/// Turn a display name into a lowercase ASCII slug.
///
/// Input is NFD-decomposed and combining marks are dropped, so accents fold
/// whether they arrive precomposed or not (`"Açaí & Cia"` becomes
/// `"acai-cia"`). Anything else outside `[a-z0-9]` acts as a separator. The
/// result may be empty.
pub fn slugify(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for c in input.nfd().flat_map(char::to_lowercase) {
        if is_combining_mark(c) {
            continue;
        }
        match fold_undecomposable(c) {
            Some(ascii) => folded.push_str(ascii),
            None => folded.push(c),
        }
    }

    NON_SLUG_RUN
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// [`slugify`], cut to at most `max_len` bytes without a dangling `-`
pub fn slugify_with_limit(input: &str, max_len: usize) -> String {
    truncate_slug(&slugify(input), max_len).to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG.is_match(slug)
}

/// `base-n`, shortening `base` so the whole slug stays within `max_len`.
///
/// `None` when not even one character of `base` fits next to the suffix.
pub fn slug_with_suffix(base: &str, n: u32, max_len: usize) -> Option<String> {
    let suffix = format!("-{n}");
    let base = truncate_slug(base, max_len.saturating_sub(suffix.len()));
    if base.is_empty() {
        None
    } else {
        Some(format!("{base}{suffix}"))
    }
}

/// First slug derived from `base` that `is_taken` reports as free.
///
/// Tries `base` itself, then `base-2` up to `base-{MAX_SLUG_ATTEMPTS}`.
/// Returns `None` for an empty base or when every candidate is taken.
pub fn unique_slug(
    base: &str,
    max_len: usize,
    is_taken: impl Fn(&str) -> bool,
) -> Option<String> {
    let base = truncate_slug(base, max_len);
    if base.is_empty() {
        return None;
    }
    if !is_taken(base) {
        return Some(base.to_string());
    }

    (2..=MAX_SLUG_ATTEMPTS)
        .filter_map(|n| slug_with_suffix(base, n, max_len))
        .find(|candidate| !is_taken(candidate.as_str()))
}

// Slugs are ASCII, so byte truncation never splits a character
fn truncate_slug(slug: &str, max_len: usize) -> &str {
    let end = slug.len().min(max_len);
    match slug.get(..end) {
        Some(cut) => cut.trim_end_matches('-'),
        None => "",
    }
}

// Latin letters with no canonical decomposition
fn fold_undecomposable(c: char) -> Option<&'static str> {
    let ascii = match c {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'ł' => "l",
        'đ' => "d",
        'ı' => "i",
        'þ' => "th",
        _ => return None,
    };
    Some(ascii)
}
