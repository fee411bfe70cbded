//! # ledgerly-receipts
//!
//! Extract structured fields from receipt images with Vision Language Models
//! and persist them to Postgres.
//!
//! ## Why a VLM?
//!
//! Receipts are the worst case for template OCR: thermal-printer fonts,
//! crumpled paper, dozens of layout variants per vendor. A vision model reads
//! the image the way a human would and reports just the three fields the
//! ledger needs — total paid, vendor, date — as a JSON object.
//!
//! ## Pipeline Overview
//!
//! ```text
//! (bucket, key)
//!  │
//!  ├─ 1. Fetch    object bytes + metadata over HTTP
//!  ├─ 2. Extract  image + fixed prompt → gemini / gpt-4.1 / claude / …
//!  ├─ 3. Parse    greedy {…} scan, JSON decode
//!  └─ 4. Persist  normalize → one row in `receipts`, one transaction
//! ```
//!
//! One invocation processes one object, sequentially, with no internal retry:
//! a failure at any stage aborts the invocation and the caller re-invokes
//! from the start. Re-running the same key inserts a second row with a fresh
//! identifier — deduplication is deliberately not performed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledgerly_receipts::{process, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = PipelineConfig::from_env()?;
//!     let outcome = process("ledgerly-receipt-bucket", "r1.jpg", &config).await?;
//!     println!("stored {} — {} {}",
//!         outcome.record.receipt_id,
//!         outcome.record.vendor_name,
//!         outcome.record.total_amount);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `receipts` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ledgerly-receipts = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::ReceiptError;
pub use pipeline::extract::{LlmExtractor, VisionExtractor};
pub use pipeline::fetch::{HttpObjectStore, ObjectStore, StoredObject};
pub use process::{handle, process, process_sync};
pub use record::{
    ExtractionResult, InvocationResponse, ProcessOutcome, ProcessStats, ReceiptFields,
    ReceiptRecord,
};
