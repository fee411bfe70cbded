//! CLI binary for ledgerly-receipts.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints the stored record.

use anyhow::{Context, Result};
use clap::Parser;
use ledgerly_receipts::config::database_url_from_env;
use ledgerly_receipts::{process, PipelineConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process one receipt (provider auto-detected from API key env vars)
  receipts ledgerly-receipt-bucket r1.jpg --user-id 6f993986-6a45-47a7-9d46-cb0624d49b30

  # Use a specific model
  receipts --provider gemini --model gemini-2.0-flash my-bucket r1.jpg

  # Structured JSON output (record + stats)
  receipts --json my-bucket r1.jpg > outcome.json

  # Custom extraction prompt
  receipts --prompt prompt.txt my-bucket r1.jpg

ENVIRONMENT VARIABLES:
  S3_ENDPOINT             Public endpoint of the receipt bucket (required)
  DATABASE_URL            Postgres connection string
  DB_HOST / DB_NAME / DB_USER / DB_PASS
                          Assembled into a connection URL when DATABASE_URL
                          is unset (port 5432, DB_NAME defaults to 'ldb')
  RECEIPTS_USER_ID        Owner of every stored record (required)
  RECEIPTS_LLM_PROVIDER   Override provider (gemini, openai, anthropic, …)
  RECEIPTS_MODEL          Override model ID
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key

EXPECTED TABLE:
  receipts (receipt_id uuid, user_id uuid, category text, receipt_date date,
            vendor_name text, total_amount numeric, s3_url text)
"#;

/// Extract receipt fields from an image in object storage and store them.
#[derive(Parser, Debug)]
#[command(
    name = "receipts",
    version,
    about = "Extract receipt fields from an image in object storage and store them in Postgres",
    long_about = "Fetch a receipt image by (bucket, key), extract the total amount, vendor \
name, and date with a vision language model, and insert one row into the receipts table. \
One invocation processes one object; re-running the same key inserts a second row.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Object-storage bucket name.
    bucket: String,

    /// Object key of the receipt image.
    key: String,

    /// User that owns the stored record.
    #[arg(long, env = "RECEIPTS_USER_ID")]
    user_id: Uuid,

    /// Public endpoint of the receipt bucket (used to fetch the object and
    /// to build the stored URL).
    #[arg(long, env = "S3_ENDPOINT")]
    endpoint: String,

    /// Postgres connection string. Falls back to DB_HOST/DB_NAME/DB_USER/DB_PASS.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Vision model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "RECEIPTS_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "RECEIPTS_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "RECEIPTS_PROMPT")]
    prompt: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "RECEIPTS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max model output tokens.
    #[arg(long, env = "RECEIPTS_MAX_TOKENS", default_value_t = 512)]
    max_tokens: usize,

    /// Object-fetch timeout in seconds.
    #[arg(long, env = "RECEIPTS_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Output the full outcome (record + stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RECEIPTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RECEIPTS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let outcome = process(&cli.bucket, &cli.key, &config)
        .await
        .with_context(|| format!("Error processing receipt {}", cli.key))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !cli.quiet {
        let r = &outcome.record;
        println!("Stored receipt {}", r.receipt_id);
        println!("  vendor:   {}", r.vendor_name);
        println!("  amount:   {}", r.total_amount);
        println!("  date:     {}", r.receipt_date);
        println!("  category: {}", r.category);
        println!("  url:      {}", r.s3_url);
        eprintln!(
            "  {} tokens in / {} tokens out — {}ms total",
            outcome.stats.input_tokens, outcome.stats.output_tokens, outcome.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let database_url = match cli.database_url.clone() {
        Some(url) => url,
        None => database_url_from_env().context(
            "No database configured: set DATABASE_URL or DB_HOST/DB_USER/DB_PASS",
        )?,
    };

    let extraction_prompt = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read extraction prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = PipelineConfig::builder()
        .storage_endpoint(cli.endpoint.clone())
        .database_url(database_url)
        .user_id(cli.user_id)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .fetch_timeout_secs(cli.fetch_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = extraction_prompt {
        builder = builder.extraction_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
