//! The fixed instruction prompt sent alongside each receipt image.
//!
//! Centralising the prompt here keeps it the single source of truth: the
//! parser and persister both depend on the exact field names and the `"None"`
//! placeholder convention it mandates, and unit tests can inspect it without
//! calling a model.
//!
//! Callers can override it via [`crate::config::PipelineConfig::extraction_prompt`];
//! the constant is used only when no override is provided.

/// Default extraction prompt for a receipt image.
///
/// The model is told to answer with nothing but a JSON object carrying the
/// three fields the persister understands, and to use the literal string
/// `"None"` for anything it cannot determine.
pub const EXTRACTION_PROMPT: &str = r#"Extract the following information from the receipt image and return ONLY a JSON object with these fields
{
   "total_amount": "amount in the format X.XX",
   "vendor_name": "full business name",
   "receipt_date": "date in YYYY-MM-DD format"
}

Requirements:
- Convert all dates to YYYY-MM-DD format regardless of input format
- Exclude currency symbols such as ₹ from total amount always
- Extract the final paid amount including tax
- Include full business name without abbreviations where possible
- In case any of the other data is unavailable, return None as its value"#;
