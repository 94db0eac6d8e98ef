//! Scalar re-typing after a textual substitution.

use serde_yaml::Value;

/// Reinterprets a substituted string as the most specific YAML scalar.
///
/// Tried in order: quoted string literal, bracketed list (elements coerced
/// recursively), integer, float, boolean, null. Anything else stays a
/// string. Only called after a substitution actually happened, so literal
/// spec values keep their original type.
#[must_use]
pub fn coerce_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();

    if let Some(inner) = strip_quotes(trimmed) {
        return Value::String(inner.to_string());
    }

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        let items = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(coerce_scalar).collect()
        };
        return Value::Sequence(items);
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }

    // Reject the textual float forms the stdlib parser accepts.
    if !trimmed.eq_ignore_ascii_case("nan")
        && !trimmed.eq_ignore_ascii_case("inf")
        && !trimmed.eq_ignore_ascii_case("-inf")
        && !trimmed.eq_ignore_ascii_case("infinity")
        && let Ok(float) = trimmed.parse::<f64>()
    {
        return Value::Number(float.into());
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Value::Null;
    }

    Value::String(trimmed.to_string())
}

/// Returns the content of a quoted literal, if `s` is one.
fn strip_quotes(s: &str) -> Option<&str> {
    if s.len() < 2 {
        return None;
    }
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
}
