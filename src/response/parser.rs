//! Recovery of structured values from free-form model output
//!
//! Model replies are the least controlled input in the system: JSON is often
//! wrapped in prose, fenced in markdown, or cut off by the token limit. The
//! recovery chain is
//!
//! 1. [`strip_fences`] removes markdown code-fence markers,
//! 2. [`locate_json_span`] slices from the first `{`/`[` to its last matching closer,
//! 3. a plain `serde_json` parse of that span,
//! 4. [`repair_truncated`] closes unterminated strings and brackets, then parses again.
//!
//! [`to_structured`] never fails: any error in the chain yields the fallback.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ParseError;

/// Free-text normalization: trimmed identity
pub fn to_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// Recover a `T` from `raw`, returning `fallback` on any failure
pub fn to_structured<T: DeserializeOwned>(raw: Option<&str>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };

    match try_structured(raw) {
        Ok(value) => value,
        Err(e) => {
            let preview: String = raw.chars().take(50).collect();
            debug!(error = %e, input = %preview, "Structured parse failed, using fallback");
            fallback
        }
    }
}

/// Run the recovery chain and report why it failed
pub fn try_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let span = locate_json_span(&cleaned).ok_or(ParseError::NoJson)?;

    match serde_json::from_str::<T>(span) {
        Ok(value) => Ok(value),
        Err(first) => match repair_truncated(span) {
            Some(repaired) => serde_json::from_str::<T>(&repaired).map_err(|_| first.into()),
            None => Err(first.into()),
        },
    }
}

/// Remove every markdown code-fence marker (bare or language-tagged) and trim
pub fn strip_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 3..];
        let tag_len = after
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
            .unwrap_or(after.len());
        rest = &after[tag_len..];
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Slice `text` from its first opening bracket to the last matching closer.
///
/// When no closer follows the opener (truncated output) the span runs to the
/// end of the text so that [`repair_truncated`] can complete it.
pub fn locate_json_span(text: &str) -> Option<&str> {
    let start = text.find(&['{', '['][..])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };

    match text.rfind(closer) {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

/// Complete JSON that was cut off inside an open string, array or object.
///
/// Returns `None` when the text is already balanced, or when the structure
/// cannot be closed sensibly (e.g. it ends right after a key's colon).
pub fn repair_truncated(text: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return None;
    }

    let mut repaired = text.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    let trimmed_len = repaired.trim_end().trim_end_matches(',').trim_end().len();
    repaired.truncate(trimmed_len);
    if repaired.ends_with(':') {
        return None;
    }

    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    Some(repaired)
}
