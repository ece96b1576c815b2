//! Whitespace normalization and literal substring substitution.
//!
//! Source text is adversarial input for a substitution step, so nothing here
//! treats its arguments as patterns.

/// Collapse a multi-line rendering onto one line.
///
/// Line breaks become single spaces and runs of spaces collapse to one.
/// Other whitespace (tabs) is kept as-is.
#[must_use]
pub fn flatten(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let c = match c {
            '\r' if chars.peek() == Some(&'\n') => continue,
            '\n' => ' ',
            other => other,
        };

        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }

    out
}

/// Byte offset of the first literal occurrence of `needle` at or after `from`.
#[must_use]
pub fn locate(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(from..)
        .and_then(|tail| tail.find(needle))
        .map(|offset| from + offset)
}

/// Replace the first literal occurrence of `needle`; unchanged if absent.
#[must_use]
pub fn replace_first(haystack: &str, needle: &str, replacement: &str) -> String {
    match locate(haystack, 0, needle) {
        Some(start) => {
            let mut out = String::with_capacity(haystack.len());
            out.push_str(&haystack[..start]);
            out.push_str(replacement);
            out.push_str(&haystack[start + needle.len()..]);
            out
        }
        None => haystack.to_string(),
    }
}
