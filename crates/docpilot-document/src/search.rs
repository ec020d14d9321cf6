//! Text Search
//!
//! Non-overlapping matches as byte ranges into the searched text. The
//! case-insensitive path compares char by char so the ranges always index the
//! original text, even where lowercasing would change byte lengths.

use std::ops::Range;

/// All non-overlapping occurrences of `needle` in `haystack`, in order
pub fn find_all(haystack: &str, needle: &str, match_case: bool) -> Vec<Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    if match_case {
        return haystack
            .match_indices(needle)
            .map(|(start, m)| start..start + m.len())
            .collect();
    }

    let needle: Vec<char> = needle.chars().collect();
    let mut found = Vec::new();
    let mut resume = 0;

    for (start, _) in haystack.char_indices() {
        if start < resume {
            continue;
        }
        if let Some(len) = match_at(&haystack[start..], &needle) {
            found.push(start..start + len);
            resume = start + len;
        }
    }
    found
}

/// Byte length of the match of `needle` at the start of `rest`, if any
fn match_at(rest: &str, needle: &[char]) -> Option<usize> {
    let mut chars = rest.char_indices();
    for &expected in needle {
        let (_, c) = chars.next()?;
        if c != expected && !c.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(rest.len(), |(i, _)| i))
}
