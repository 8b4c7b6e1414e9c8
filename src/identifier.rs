//! Column identifier sanitization.
//!
//! Raw headers and JSON keys arrive as arbitrary text; the warehouse only
//! accepts `[a-zA-Z_][a-zA-Z0-9_]*` column names. [`sanitize`] rewrites any
//! string into that shape and is used by both schema inference and row
//! conversion, so the two stages always agree on field names.

/// Name assigned when sanitization consumes the entire input.
pub const FALLBACK_IDENTIFIER: &str = "unnamed_field";

/// Rewrites `raw` into a valid lowercase column identifier.
///
/// Trims, lowercases, maps every character outside `[a-z0-9_]` to `_`,
/// collapses underscore runs, strips surrounding underscores, and prefixes
/// `_` when the remainder starts with a digit. Empty results fall back to
/// [`FALLBACK_IDENTIFIER`]. Total and idempotent.
pub fn sanitize(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for ch in raw.trim().chars() {
        let mapped = if ch.is_ascii_alphanumeric() {
            ch.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        cleaned.push(mapped);
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        return FALLBACK_IDENTIFIER.to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{trimmed}");
    }
    trimmed.to_string()
}
