//! Vision inference: send the receipt image and extraction prompt to a VLM.
//!
//! This stage is intentionally thin — all prompt wording lives in
//! [`crate::prompts`] so it can change without touching the request plumbing
//! here. Any inference-API error (quota, malformed request, timeout) is a
//! hard failure of the invocation; there is no fallback model and no retry.

use crate::error::ReceiptError;
use crate::pipeline::fetch::StoredObject;
use crate::record::ExtractionResult;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A vision-capable inference backend: one image in, text out.
///
/// No streaming, no multi-turn context.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    /// Run the extraction prompt against the image and return the model's
    /// raw text response.
    async fn extract(
        &self,
        image: &StoredObject,
        prompt: &str,
    ) -> Result<ExtractionResult, ReceiptError>;
}

/// Production extractor backed by an `edgequake_llm` provider.
pub struct LlmExtractor {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl VisionExtractor for LlmExtractor {
    /// ## Message Layout
    ///
    /// 1. **System message** — the extraction prompt
    /// 2. **User message** — the receipt image as a base64 attachment
    ///    (empty text: VLM APIs require a user turn to respond to, but the
    ///    image carries all the content)
    async fn extract(
        &self,
        image: &StoredObject,
        prompt: &str,
    ) -> Result<ExtractionResult, ReceiptError> {
        let start = Instant::now();
        let image_data = encode_image(image);

        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ReceiptError::Inference {
                message: e.to_string(),
            })?;

        info!(
            "Extraction call finished: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ExtractionResult {
            text: response.content,
            input_tokens: response.prompt_tokens as u32,
            output_tokens: response.completion_tokens as u32,
        })
    }
}

/// Base64-wrap the raw image bytes for the multimodal request body.
///
/// `detail: "high"` asks GPT-4-class models for the full image-tile budget;
/// receipt line items are small print and get lost at the overview tile.
fn encode_image(image: &StoredObject) -> ImageData {
    let b64 = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {} image → {} bytes base64",
        image.content_type,
        b64.len()
    );
    ImageData::new(b64, &image.content_type).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn encode_wraps_bytes_as_base64_with_content_type() {
        let image = StoredObject {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: "image/jpeg".into(),
            metadata: HashMap::new(),
        };
        let data = encode_image(&image);
        assert_eq!(data.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, image.bytes);
    }
}
