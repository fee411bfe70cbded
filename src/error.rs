//! Error types for the ledgerly-receipts library.
//!
//! Every failure in the pipeline is fatal to the invocation: there is no
//! retry, no fallback, and no partial-success state. Either the record exists
//! fully formed in the database, or no record exists. [`ReceiptError`] is the
//! single error type returned from every stage; `handle` collapses all of
//! them into the uniform 500 response at the top level.
//!
//! Variants are grouped by the stage that raises them: fetch, inference,
//! parse, validation, persistence, and configuration.

use thiserror::Error;

/// All errors returned by the ledgerly-receipts library.
#[derive(Debug, Error)]
pub enum ReceiptError {
    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The object key does not exist in the bucket.
    #[error("object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    /// The storage service was unreachable or returned a non-404 failure.
    #[error("object storage request for '{key}' failed: {reason}")]
    StorageUnavailable { key: String, reason: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The configured vision provider is not initialised (missing API key etc.).
    #[error("vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The inference API returned an error (quota, malformed request, timeout).
    #[error("vision API error: {message}")]
    Inference { message: String },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The model output contained no `{`…`}` delimited substring.
    #[error("no JSON object found in model output")]
    NoJsonObject,

    /// A brace-delimited substring existed but was not valid JSON.
    #[error("model output contained malformed JSON: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    // ── Validation errors ─────────────────────────────────────────────────
    /// The total amount did not reduce to a nonnegative decimal after
    /// currency-symbol stripping.
    #[error("total amount '{raw}' is invalid: {reason}")]
    AmountInvalid { raw: String, reason: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The database connect, insert, or commit failed. The transaction is
    /// rolled back before this is raised.
    #[error("database write failed: {source}")]
    Persist {
        #[source]
        source: sqlx::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required environment variable was absent at startup.
    #[error("required environment variable {var} is not set")]
    MissingEnv { var: &'static str },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_not_found_display() {
        let e = ReceiptError::ObjectNotFound {
            bucket: "ledgerly-receipt-bucket".into(),
            key: "r1.jpg".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("r1.jpg"), "got: {msg}");
        assert!(msg.contains("ledgerly-receipt-bucket"));
    }

    #[test]
    fn amount_invalid_display() {
        let e = ReceiptError::AmountInvalid {
            raw: "12,34,56x".into(),
            reason: "not a decimal".into(),
        };
        assert!(e.to_string().contains("12,34,56x"));
        assert!(e.to_string().contains("not a decimal"));
    }

    #[test]
    fn malformed_json_preserves_source() {
        use std::error::Error as _;
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e = ReceiptError::MalformedJson { source };
        assert!(e.source().is_some(), "source error must be preserved");
    }

    #[test]
    fn missing_env_display() {
        let e = ReceiptError::MissingEnv { var: "S3_ENDPOINT" };
        assert!(e.to_string().contains("S3_ENDPOINT"));
    }
}
