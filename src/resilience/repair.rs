//! Best-effort parsing of LLM-produced text that may not be strict JSON.
//!
//! Strategies are layered from safest to most aggressive: a direct parse,
//! then extraction of the first embedded array/object span, then textual
//! repairs. Repair runs last because naive quote and comma substitution can
//! corrupt otherwise-valid JSON containing apostrophes in string content.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("static regex"))
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\*[\s\S]*?\*/").expect("static regex"))
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)//[^\n]*").expect("static regex"))
}

/// Parse model output into JSON, falling back through extraction and repair
/// strategies. Never fails: when every strategy is exhausted the supplied
/// `fallback` is returned unchanged.
pub fn safe_json_parse(text: &str, fallback: Value) -> Value {
    if let Ok(value) = serde_json::from_str(text) {
        return value;
    }

    // Arrays first; the object span is only consulted when no array span
    // exists at all. A span that exists but fails to parse falls through to
    // the repair pass instead.
    let span = extract_balanced_span(text, '[').or_else(|| extract_balanced_span(text, '{'));
    if let Some(span) = span {
        if let Ok(value) = serde_json::from_str(span) {
            debug!(strategy = "extraction", "Parsed embedded JSON span");
            return value;
        }
    }

    if let Ok(value) = serde_json::from_str(&repair_text(text)) {
        debug!(strategy = "repair", "Parsed repaired JSON text");
        return value;
    }

    debug!("All JSON parse strategies failed, returning fallback");
    fallback
}

/// Pull a specific key's value out of loosely structured model output.
///
/// Tries `key: [...]` / `key: {...}` spans (quoted or bare key) before
/// falling back to parsing the whole text and projecting the key from a
/// top-level object. Returns the whole parsed value when the key is absent
/// but the text itself parses, and `None` when nothing parses.
pub fn extract_json_from_text(text: &str, key: Option<&str>) -> Option<Value> {
    if let Some(key) = key {
        if let Some(value) = extract_keyed_span(text, key) {
            return Some(value);
        }
    }

    let parsed = safe_json_parse(text, Value::Null);
    if parsed.is_null() {
        return None;
    }

    if let Some(key) = key {
        if let Value::Object(map) = &parsed {
            if let Some(sub) = map.get(key) {
                return Some(sub.clone());
            }
        }
    }

    Some(parsed)
}

fn extract_keyed_span(text: &str, key: &str) -> Option<Value> {
    let pattern = format!(r#""?{}"?\s*:\s*"#, regex::escape(key));
    let key_re = Regex::new(&pattern).ok()?;

    for found in key_re.find_iter(text) {
        let rest = &text[found.end()..];
        let next = rest.trim_start().chars().next()?;
        if next != '[' && next != '{' {
            continue;
        }
        if let Some(span) = extract_balanced_span(rest, next) {
            let value = safe_json_parse(span, Value::Null);
            if !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

/// Slice out the first balanced `open..close` span, string-aware so brackets
/// inside quoted content do not confuse the depth count.
fn extract_balanced_span(text: &str, open: char) -> Option<&str> {
    let close = match open {
        '[' => ']',
        '{' => '}',
        _ => return None,
    };

    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Textual repairs for near-JSON: trailing commas, single quotes, comments.
fn repair_text(text: &str) -> String {
    let repaired = trailing_comma_re().replace_all(text, "$1");
    let repaired = repaired.replace('\'', "\"");
    let repaired = block_comment_re().replace_all(&repaired, "");
    let repaired = line_comment_re().replace_all(&repaired, "");
    repaired.into_owned()
}
