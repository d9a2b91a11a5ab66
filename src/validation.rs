//! Input validation and sanitization for request payloads.
//!
//! Two distinct operations with different guarantees:
//!
//! - [`validate_payload`] is the authoritative gate: it rejects payloads
//!   whose string fields match injection/XSS-indicative patterns, exceed
//!   the per-field length cap, or whose numeric fields fall outside the
//!   configured bounds. Rejection is reported per field.
//! - [`sanitize_payload`] is a best-effort transform that strips
//!   dangerous substrings from string fields. It is NOT a security
//!   boundary; routes that need strict rejection rely on validation.
//!
//! Pattern matching is case-insensitive and intentionally coarse: the
//! goal is to refuse clearly hostile input early, not to parse SQL.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for any string-valued payload field.
pub const MAX_STRING_LENGTH: usize = 500;

/// Maximum serialized payload size accepted by the validator (10 KB).
///
/// This is independent of the outer HTTP body ceiling; it bounds the
/// JSON document a handler will ever see.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024;

/// SQL-injection-indicative patterns, matched case-insensitively.
static SQL_INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|UNION)\b",
        r"(?i)\b(OR|AND)\s+\d+\s*=\s*\d+",
        r"(--|#|/\*|\*/)",
        r"(?i)\b(SCRIPT|JAVASCRIPT|VBSCRIPT)\b",
        r"(<|>|&lt;|&gt;)",
    ])
});

/// XSS-indicative patterns, matched case-insensitively.
static XSS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)<\s*script[^>]*>",
        r"(?i)javascript\s*:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<\s*iframe[^>]*>",
        r"(?i)<\s*object[^>]*>",
        r"(?i)<\s*embed[^>]*>",
    ])
});

/// Substrings removed by the sanitizer.
static SANITIZE_STRIP: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r#"[<>&"']"#, r"(?i)javascript\s*:", r"(?i)\bon\w+\s*="])
});

/// Compile a fixed list of pattern literals.
///
/// The literals above are known-valid; `filter_map` keeps this free of
/// panicking paths under the crate-wide unwrap lint.
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// A numeric bound applied to a named payload field when present.
#[derive(Debug, Clone, Copy)]
pub struct NumericRule {
    pub field: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Numeric rules for game payloads: price in [0, 9999.99], rating in
/// [0, 10], developer links must be positive identifiers.
pub fn game_numeric_rules() -> &'static [NumericRule] {
    const RULES: [NumericRule; 3] = [
        NumericRule {
            field: "price",
            min: Some(0.0),
            max: Some(9999.99),
        },
        NumericRule {
            field: "rating",
            min: Some(0.0),
            max: Some(10.0),
        },
        NumericRule {
            field: "developer_id",
            min: Some(1.0),
            max: None,
        },
    ];
    &RULES
}

/// Numeric rules for developer payloads.
pub fn developer_numeric_rules() -> &'static [NumericRule] {
    const RULES: [NumericRule; 1] = [NumericRule {
        field: "founded_year",
        min: Some(1950.0),
        max: Some(2100.0),
    }];
    &RULES
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a single string field. Returns the list of violations
/// (empty when the value is acceptable).
pub fn validate_string(value: &str, field_name: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if value.chars().count() > MAX_STRING_LENGTH {
        errors.push(format!(
            "{field_name} cannot exceed {MAX_STRING_LENGTH} characters"
        ));
    }

    if SQL_INJECTION_PATTERNS.iter().any(|p| p.is_match(value)) {
        errors.push(format!("Suspicious content detected in {field_name}"));
    }

    if XSS_PATTERNS.iter().any(|p| p.is_match(value)) {
        errors.push(format!(
            "Potentially dangerous content detected in {field_name}"
        ));
    }

    errors
}

/// Validate a numeric field against optional inclusive bounds.
pub fn validate_number(
    value: f64,
    field_name: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if !value.is_finite() {
        errors.push(format!("{field_name} must be a valid number"));
        return errors;
    }

    if let Some(min) = min
        && value < min
    {
        errors.push(format!("{field_name} must be greater than or equal to {min}"));
    }

    if let Some(max) = max
        && value > max
    {
        errors.push(format!("{field_name} must be less than or equal to {max}"));
    }

    errors
}

/// Validate a full JSON payload.
///
/// Checks, in order:
/// 1. The payload is a JSON object.
/// 2. The serialized payload is within [`MAX_PAYLOAD_BYTES`].
/// 3. Every string-valued field passes [`validate_string`].
/// 4. Every field named by a [`NumericRule`] is a number within bounds.
///
/// All violations are collected; the caller receives the complete list,
/// not just the first.
pub fn validate_payload(payload: &Value, rules: &[NumericRule]) -> Result<(), Vec<String>> {
    let Some(object) = payload.as_object() else {
        return Err(vec!["Payload must be a JSON object".to_string()]);
    };

    let mut errors = Vec::new();

    let serialized_len = payload.to_string().len();
    if serialized_len > MAX_PAYLOAD_BYTES {
        errors.push(format!(
            "Payload too large (maximum {MAX_PAYLOAD_BYTES} bytes, got {serialized_len})"
        ));
    }

    for (key, value) in object {
        if let Some(text) = value.as_str() {
            errors.extend(validate_string(text, key));
        }
    }

    for rule in rules {
        let Some(value) = object.get(rule.field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match value.as_f64() {
            Some(number) => {
                errors.extend(validate_number(number, rule.field, rule.min, rule.max));
            }
            // Prices may arrive as decimal strings; parse before judging
            None => match value.as_str().and_then(|s| s.parse::<f64>().ok()) {
                Some(number) => {
                    errors.extend(validate_number(number, rule.field, rule.min, rule.max));
                }
                None => errors.push(format!("{} must be a valid number", rule.field)),
            },
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// =============================================================================
// Sanitization
// =============================================================================

/// Strip dangerous substrings from a string value.
///
/// Removes angle brackets, ampersands and quotes, `javascript:` schemes
/// and inline event-handler assignments, then trims whitespace. The
/// transform is applied repeatedly until a fixpoint so that removal
/// cannot splice a new dangerous substring together; this makes
/// `sanitize_string(sanitize_string(x)) == sanitize_string(x)` hold for
/// every input.
pub fn sanitize_string(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let mut next = current.clone();
        for pattern in SANITIZE_STRIP.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        let next = next.trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Sanitize every string field of a JSON payload.
///
/// Pure: returns a new payload, leaving the input untouched. Non-string
/// and nested values pass through unchanged (payloads are flat objects
/// in this API).
pub fn sanitize_payload(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let sanitized = map
                .iter()
                .map(|(key, value)| {
                    let new_value = match value.as_str() {
                        Some(text) => Value::String(sanitize_string(text)),
                        None => value.clone(),
                    };
                    (key.clone(), new_value)
                })
                .collect();
            Value::Object(sanitized)
        }
        other => other.clone(),
    }
}
