//! Data types flowing through the pipeline.
//!
//! [`ReceiptFields`] is what the model claims to have read off the image —
//! untrusted, every field optional. [`ReceiptRecord`] is the normalized row
//! that actually reaches the database. The distance between the two is the
//! persister's normalization rules ([`crate::pipeline::persist`]).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three optional fields decoded from the model's JSON output.
///
/// The extraction prompt instructs the model to emit the literal string
/// `"None"` for anything it cannot determine, so a field may be absent,
/// JSON `null`, or that sentinel — the accessors treat all three as missing.
/// Unknown extra keys in the model's object are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptFields {
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub receipt_date: Option<String>,
}

impl ReceiptFields {
    /// Total amount, with the `"None"` sentinel collapsed to absence.
    pub fn total_amount(&self) -> Option<&str> {
        known(&self.total_amount)
    }

    /// Vendor name, with the `"None"` sentinel collapsed to absence.
    pub fn vendor_name(&self) -> Option<&str> {
        known(&self.vendor_name)
    }

    /// Receipt date, with the `"None"` sentinel collapsed to absence.
    pub fn receipt_date(&self) -> Option<&str> {
        known(&self.receipt_date)
    }
}

fn known(value: &Option<String>) -> Option<&str> {
    match value.as_deref() {
        None | Some("None") => None,
        Some(s) => Some(s),
    }
}

/// Raw text returned by the vision model, plus token accounting.
///
/// Exists only within one pipeline invocation; discarded after parsing.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The model's full text response. Not guaranteed to be pure JSON —
    /// models wrap output in prose or code fences.
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The persisted row, one per invocation.
///
/// `receipt_id` is freshly generated per insert: re-processing the same
/// object key creates a second row with a new identifier.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRecord {
    pub receipt_id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    /// `YYYY-MM-DD`. Kept as text because the model's date is not guaranteed
    /// to conform; the database `date` column is the final validator.
    pub receipt_date: String,
    pub vendor_name: String,
    pub total_amount: Decimal,
    pub s3_url: String,
}

/// Result of a successful [`crate::process`] call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub record: ReceiptRecord,
    pub stats: ProcessStats,
}

/// Timing and token accounting for one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessStats {
    pub bytes_fetched: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub fetch_duration_ms: u64,
    pub inference_duration_ms: u64,
    pub persist_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The uniform request/response shape of the invocation surface.
///
/// Mirrors an event-triggered function contract: 200 with a JSON-stringified
/// message on success, 500 on any caught failure. No structured error code
/// distinguishes the failure kinds to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_none_collapses_to_absent() {
        let fields = ReceiptFields {
            total_amount: Some("None".into()),
            vendor_name: None,
            receipt_date: Some("2024-03-01".into()),
        };
        assert_eq!(fields.total_amount(), None);
        assert_eq!(fields.vendor_name(), None);
        assert_eq!(fields.receipt_date(), Some("2024-03-01"));
    }

    #[test]
    fn fields_decode_with_missing_and_null_keys() {
        let fields: ReceiptFields =
            serde_json::from_str(r#"{"total_amount": "45.00", "vendor_name": null}"#)
                .expect("valid JSON");
        assert_eq!(fields.total_amount(), Some("45.00"));
        assert_eq!(fields.vendor_name(), None);
        assert_eq!(fields.receipt_date(), None);
    }

    #[test]
    fn fields_ignore_unknown_keys() {
        let fields: ReceiptFields = serde_json::from_str(
            r#"{"total_amount": "9.99", "vendor_name": "Acme", "receipt_date": "2024-01-02", "currency": "INR"}"#,
        )
        .expect("extra keys must not fail decoding");
        assert_eq!(fields.vendor_name(), Some("Acme"));
    }

    #[test]
    fn record_serialises_to_json() {
        let record = ReceiptRecord {
            receipt_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: "work".into(),
            receipt_date: "2024-03-01".into(),
            vendor_name: "Acme Foods".into(),
            total_amount: Decimal::new(4500, 2),
            s3_url: "https://bucket.example.com/r1.jpg".into(),
        };
        let json = serde_json::to_string(&record).expect("record must serialise");
        assert!(json.contains("Acme Foods"));
        assert!(json.contains("45.00"));
    }
}
