//! Pipeline entry points.
//!
//! [`process`] runs the four stages for one (bucket, key) pair and returns
//! the typed outcome. [`handle`] wraps it in the uniform status/body shape
//! of an event-triggered invocation. [`process_sync`] is a convenience for
//! callers without a runtime.
//!
//! One invocation handles one object. Callers wanting concurrency invoke the
//! pipeline independently per object; each invocation opens and closes its
//! own database connection.

use crate::config::PipelineConfig;
use crate::error::ReceiptError;
use crate::pipeline::extract::{LlmExtractor, VisionExtractor};
use crate::pipeline::fetch::{HttpObjectStore, ObjectStore};
use crate::pipeline::{parse, persist};
use crate::prompts::EXTRACTION_PROMPT;
use crate::record::{InvocationResponse, ProcessOutcome, ProcessStats};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Process one receipt object end to end: fetch, extract, parse, persist.
///
/// # Arguments
/// * `bucket` — object-storage bucket name
/// * `key` — object key of the receipt image
/// * `config` — pipeline configuration
///
/// # Errors
///
/// Any stage failure aborts the remaining stages and propagates unchanged;
/// nothing is retried. On success exactly one row exists in `receipts`.
pub async fn process(
    bucket: &str,
    key: &str,
    config: &PipelineConfig,
) -> Result<ProcessOutcome, ReceiptError> {
    let total_start = Instant::now();
    info!("Processing receipt '{}' from bucket '{}'", key, bucket);

    // ── Step 1: Resolve clients ──────────────────────────────────────────
    let store = resolve_store(config)?;
    let extractor = resolve_extractor(config)?;

    // ── Step 2: Fetch image bytes and metadata ───────────────────────────
    let fetch_start = Instant::now();
    let object = store.fetch(bucket, key).await?;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
    let bytes_fetched = object.bytes.len() as u64;

    // ── Step 3: Run vision extraction ────────────────────────────────────
    let prompt = config
        .extraction_prompt
        .as_deref()
        .unwrap_or(EXTRACTION_PROMPT);
    let inference_start = Instant::now();
    let extraction = extractor.extract(&object, prompt).await?;
    let inference_duration_ms = inference_start.elapsed().as_millis() as u64;

    // ── Step 4: Parse the embedded JSON object ───────────────────────────
    let fields = parse::extract_fields(&extraction.text)?;

    // ── Step 5: Normalize and insert ─────────────────────────────────────
    let record = persist::prepare_record(
        &fields,
        &object.metadata,
        key,
        config.user_id,
        &config.storage_endpoint,
    )?;
    let persist_start = Instant::now();
    persist::insert_receipt(&config.database_url, &record).await?;
    let persist_duration_ms = persist_start.elapsed().as_millis() as u64;

    let stats = ProcessStats {
        bytes_fetched,
        input_tokens: extraction.input_tokens,
        output_tokens: extraction.output_tokens,
        fetch_duration_ms,
        inference_duration_ms,
        persist_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Receipt '{}' processed: record {}, {}ms total",
        key, record.receipt_id, stats.total_duration_ms
    );

    Ok(ProcessOutcome { record, stats })
}

/// Process one receipt and collapse the result into the uniform
/// invocation response: 200 with a JSON-stringified message on success,
/// 500 on any caught failure. No structured error code distinguishes the
/// failure kinds to the caller.
pub async fn handle(bucket: &str, key: &str, config: &PipelineConfig) -> InvocationResponse {
    match process(bucket, key, config).await {
        Ok(_) => InvocationResponse {
            status_code: 200,
            body: serde_json::to_string("Processing complete")
                .unwrap_or_else(|_| "\"Processing complete\"".to_string()),
        },
        Err(e) => {
            let message = format!("Error processing receipt {key}: {e}");
            error!("{message}");
            InvocationResponse {
                status_code: 500,
                body: serde_json::to_string(&message).unwrap_or_else(|_| format!("\"{message}\"")),
            }
        }
    }
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    bucket: &str,
    key: &str,
    config: &PipelineConfig,
) -> Result<ProcessOutcome, ReceiptError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReceiptError::InvalidConfig(format!("failed to create tokio runtime: {e}")))?
        .block_on(process(bucket, key, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the object store: the injected one, else the HTTP adapter on the
/// configured endpoint.
fn resolve_store(config: &PipelineConfig) -> Result<Arc<dyn ObjectStore>, ReceiptError> {
    if let Some(ref store) = config.object_store {
        return Ok(Arc::clone(store));
    }
    Ok(Arc::new(HttpObjectStore::new(
        config.storage_endpoint.clone(),
        config.fetch_timeout_secs,
    )?))
}

/// Resolve the extractor, from most-specific to least-specific:
///
/// 1. Pre-built extractor (`config.extractor`) — used as-is; the provider
///    chain never runs. This is the test seam.
/// 2. Pre-built provider (`config.provider`) — wrapped in [`LlmExtractor`].
/// 3. Named provider + model (`config.provider_name`) — the factory reads
///    the matching API key from the environment.
/// 4. Full auto-detection (`ProviderFactory::from_env`) — first provider
///    whose API key variable is present.
fn resolve_extractor(config: &PipelineConfig) -> Result<Arc<dyn VisionExtractor>, ReceiptError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmExtractor::new(
        provider,
        config.temperature,
        config.max_tokens,
    )))
}

fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, ReceiptError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gemini-2.0-flash");
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ReceiptError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        });
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReceiptError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from the environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(provider)
}
