//! Parse: locate and decode the JSON object embedded in the model's text.
//!
//! Model output is not guaranteed to be *only* JSON — models wrap it in
//! prose or code fences despite the prompt. The scan is deliberately greedy:
//! first `{` to last `}` in the text. If the model emits more than one
//! JSON-like fragment or stray braces in prose, the capture spans them all
//! and the decode fails; that is accepted behavior, not corrected for.
//!
//! Only JSON well-formedness is validated here. Semantic checks on the field
//! values belong to the persister.

use crate::error::ReceiptError;
use crate::record::ReceiptFields;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Decode the first greedy `{…}` substring of `text` as [`ReceiptFields`].
///
/// # Errors
///
/// [`ReceiptError::NoJsonObject`] if no brace-delimited substring exists,
/// [`ReceiptError::MalformedJson`] if the substring is not valid JSON.
pub fn extract_fields(text: &str) -> Result<ReceiptFields, ReceiptError> {
    let candidate = RE_JSON_OBJECT
        .find(text)
        .ok_or(ReceiptError::NoJsonObject)?
        .as_str();

    serde_json::from_str(candidate).map_err(|source| ReceiptError::MalformedJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_object_decodes() {
        let fields = extract_fields(
            r#"{"total_amount": "45.00", "vendor_name": "Acme Foods", "receipt_date": "2024-03-01"}"#,
        )
        .expect("bare object must decode");
        assert_eq!(fields.total_amount(), Some("45.00"));
        assert_eq!(fields.vendor_name(), Some("Acme Foods"));
        assert_eq!(fields.receipt_date(), Some("2024-03-01"));
    }

    #[test]
    fn prose_wrapped_object_decodes() {
        let text = r#"Here you go: {"total_amount": "45.00", "vendor_name": "Acme Foods", "receipt_date": "2024-03-01"} — let me know if you need anything else!"#;
        let fields = extract_fields(text).expect("prose-wrapped object must decode");
        assert_eq!(fields.vendor_name(), Some("Acme Foods"));
    }

    #[test]
    fn fenced_object_decodes() {
        let text = "```json\n{\"total_amount\": \"12.50\", \"vendor_name\": \"None\", \"receipt_date\": \"None\"}\n```";
        let fields = extract_fields(text).expect("fenced object must decode");
        assert_eq!(fields.total_amount(), Some("12.50"));
        assert_eq!(fields.vendor_name(), None, "sentinel collapses to absent");
    }

    #[test]
    fn multiline_object_decodes() {
        let text = "{\n  \"total_amount\": \"99.00\",\n  \"vendor_name\": \"Acme\",\n  \"receipt_date\": \"2024-01-01\"\n}";
        assert!(extract_fields(text).is_ok(), "the scan must span newlines");
    }

    #[test]
    fn no_braces_is_no_json_object() {
        let err = extract_fields("I could not read this receipt.").unwrap_err();
        assert!(matches!(err, ReceiptError::NoJsonObject));
    }

    #[test]
    fn malformed_substring_is_malformed_json() {
        let err = extract_fields(r#"{"total_amount": "#).unwrap_err();
        // The lone `{` without a closing brace is NoJsonObject; with one it
        // becomes a decode failure.
        assert!(matches!(err, ReceiptError::NoJsonObject));

        let err = extract_fields(r#"{"total_amount": oops}"#).unwrap_err();
        assert!(matches!(err, ReceiptError::MalformedJson { .. }));
    }

    #[test]
    fn greedy_scan_spans_multiple_objects_and_fails() {
        // Two objects in one response: the capture runs from the first `{`
        // to the last `}`, which is not valid JSON. Accepted behavior.
        let text = r#"{"total_amount": "1.00"} or maybe {"total_amount": "2.00"}"#;
        let err = extract_fields(text).unwrap_err();
        assert!(matches!(err, ReceiptError::MalformedJson { .. }));
    }

    #[test]
    fn empty_object_decodes_to_all_absent() {
        let fields = extract_fields("{}").expect("empty object is well-formed");
        assert_eq!(fields.total_amount(), None);
        assert_eq!(fields.vendor_name(), None);
        assert_eq!(fields.receipt_date(), None);
    }
}
