//! Pipeline stages for receipt extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets callers swap
//! implementations (in-memory store, canned extractor) without touching the
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ parse ──▶ persist
//! (bytes+meta) (VLM text) (fields)  (one row)
//! ```
//!
//! 1. [`fetch`]   — retrieve object bytes and metadata for (bucket, key)
//! 2. [`extract`] — base64-wrap the image and drive the vision call; the
//!    first of the two network stages
//! 3. [`parse`]   — greedy brace-scan for the embedded JSON object
//! 4. [`persist`] — normalization rules plus a single-transaction insert
//!
//! The flow is strictly linear: a failure at any stage aborts the remaining
//! stages, and the caller re-invokes from the start.

pub mod extract;
pub mod fetch;
pub mod parse;
pub mod persist;
