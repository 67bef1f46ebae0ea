//! Identifier sanitizing, content hashing, and name-uniqueness resolution.
//!
//! Every identifier minted during an analysis run goes through this module so
//! that the same input always produces the same names.

use std::collections::BTreeSet;

use md5::{Digest, Md5};

/// Characters replaced by `_` in [`SanitizeMode::Event`].
const EVENT_PUNCTUATION: &[char] = &[
    ' ', '.', '/', '\\', ':', ';', ',', '(', ')', '[', ']', '{', '}', '|', '@', '#', '&', '+',
    '=', '!', '?', '*', '\'', '"', '<', '>', '~', '`', '$', '%', '^', '\t', '\n',
];

/// Truncated bases shorter than this switch to the `GenType` fallback.
const MIN_LETTER_BASE_LEN: usize = 3;

const GENERIC_TYPE_BASE: &str = "GenType";

/// How [`sanitize`] rewrites its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Lowercase, with `.`, `-` and spaces replaced by `_`.
    Basic,
    /// Event identifiers: punctuation to `_`, everything outside
    /// `[A-Za-z0-9_-]` removed, repeated `_` collapsed, ends trimmed,
    /// lowercased.
    Event,
}

/// How [`ensure_unique`] derives alternatives for a taken name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueStrategy {
    /// `base`, `base_1`, `base_2`, ...
    Counter,
    /// `base`, `baseA` .. `baseZ`, `baseAA` .. `baseZZ`, `baseAAA`, ...
    LetterSuffix,
}

/// Sanitize `input` for use as an identifier.
///
/// - `"Product.Viewed-now"` (Basic) → `"product_viewed_now"`
/// - `"Order Completed (v2)!"` (Event) → `"order_completed_v2"`
pub fn sanitize(input: &str, mode: SanitizeMode) -> String {
    match mode {
        SanitizeMode::Basic => input
            .to_lowercase()
            .chars()
            .map(|c| if matches!(c, '.' | '-' | ' ') { '_' } else { c })
            .collect(),
        SanitizeMode::Event => {
            let replaced: String = input
                .chars()
                .map(|c| if EVENT_PUNCTUATION.contains(&c) { '_' } else { c })
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            collapse_underscores(&replaced)
                .trim_matches(|c| c == '_' || c == '-')
                .to_lowercase()
        }
    }
}

fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_underscore = false;
    for c in s.chars() {
        if c == '_' {
            if !prev_underscore {
                out.push(c);
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    out
}

/// Stable content hash: the first 8 hex chars of the MD5 of
/// `"{prefix}_{content}"`, or of `content` alone when no prefix is given.
pub fn content_hash(content: &str, prefix: Option<&str>) -> String {
    let digest = match prefix {
        Some(prefix) if !prefix.is_empty() => Md5::digest(format!("{prefix}_{content}")),
        _ => Md5::digest(content),
    };
    let mut hex = hex::encode(digest);
    hex.truncate(8);
    hex
}

/// Return the first variant of `base` not present in `used`.
///
/// The caller records the returned name. With `max_len`, the base is
/// truncated to leave room for the suffix; under
/// [`UniqueStrategy::LetterSuffix`] a base truncated below three characters
/// is replaced by `GenType` followed by the suffix.
pub fn ensure_unique(
    base: &str,
    used: &BTreeSet<String>,
    strategy: UniqueStrategy,
    max_len: Option<usize>,
) -> String {
    let mut attempt = 0usize;
    loop {
        let candidate = candidate(base, attempt, strategy, max_len);
        if !used.contains(&candidate) {
            return candidate;
        }
        attempt += 1;
    }
}

fn candidate(base: &str, attempt: usize, strategy: UniqueStrategy, max_len: Option<usize>) -> String {
    let suffix = match (strategy, attempt) {
        (_, 0) => String::new(),
        (UniqueStrategy::Counter, n) => format!("_{n}"),
        (UniqueStrategy::LetterSuffix, n) => letter_suffix(n),
    };

    let Some(max_len) = max_len else {
        return format!("{base}{suffix}");
    };
    if base.chars().count() + suffix.len() <= max_len {
        return format!("{base}{suffix}");
    }

    let room = max_len.saturating_sub(suffix.len());
    let truncated: String = base.chars().take(room).collect();
    if strategy == UniqueStrategy::LetterSuffix && truncated.chars().count() < MIN_LETTER_BASE_LEN {
        return format!("{GENERIC_TYPE_BASE}{suffix}");
    }
    format!("{truncated}{suffix}")
}

/// Bijective base-26 letters: 1 → `A`, 26 → `Z`, 27 → `AA`, 702 → `ZZ`.
fn letter_suffix(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}
