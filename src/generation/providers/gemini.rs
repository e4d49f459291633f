//! Gemini (Google) image generation and editing.

use crate::config::ApiKey;
use crate::error::{parse_retry_after, sanitize_error_message, Result, SundaError};
use crate::generation::provider::ImageProvider;
use crate::generation::types::{GeneratedImage, GenerationMetadata, ImageFormat};
use crate::prompt::ComposedRequest;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const GENERATE_PREFIX: &str = "Hyper-realistic, high detail, 4k, daytime lighting:";
const GENERATE_SUFFIX: &str = "Authentic Sundanese atmosphere, West Java rural vibes.";
const EDIT_PREFIX: &str = "Edit this image:";
const EDIT_SUFFIX: &str = "Maintain hyper-realistic Sundanese rural aesthetic.";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = SundaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "nano-banana" | "gemini-2.5-flash-image" => Ok(Self::NanoBanana),
            "nano-banana-pro" | "nano-banana-pro-preview" => Ok(Self::NanoBananaPro),
            other => Err(SundaError::InvalidRequest(format!(
                "unknown Gemini model '{other}'"
            ))),
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: Option<String>,
}

impl std::fmt::Debug for GeminiProviderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProviderBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to the environment (see [`ApiKey::from_env`]).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL (proxies, tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = match self.api_key {
            Some(key) => ApiKey::new(key)?,
            None => ApiKey::from_env()?,
        };

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: ApiKey,
    model: GeminiModel,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Returns the configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn generate_impl(&self, request: &ComposedRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_composed_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            mode = %request.mode(),
            "sending Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let inline_data = extract_image(gemini_response)?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline_data.data)
            .map_err(|e| SundaError::UnexpectedResponse(format!("invalid image payload: {e}")))?;

        let duration_ms = start.elapsed().as_millis() as u64;

        let format = response_format(&inline_data.mime_type, &data)?;

        tracing::debug!(
            model = self.model.as_str(),
            duration_ms,
            bytes = data.len(),
            "Gemini image received"
        );

        Ok(GeneratedImage::new(
            data,
            format,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }
}

/// Format of a returned image: the declared MIME type, else the magic bytes.
fn response_format(mime_type: &str, data: &[u8]) -> Result<ImageFormat> {
    ImageFormat::from_mime_type(mime_type)
        .or_else(|| ImageFormat::from_magic_bytes(data))
        .ok_or_else(|| {
            SundaError::UnexpectedResponse(format!(
                "unrecognized image data (declared type '{mime_type}')"
            ))
        })
}

/// Pulls the first inline image out of a response, mapping block reasons to errors.
fn extract_image(response: GeminiResponse) -> Result<InlineData> {
    // Blocks are returned as HTTP 200 with prompt feedback
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(SundaError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        SundaError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(SundaError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                return Err(SundaError::UnexpectedResponse(format!(
                    "Generation failed: {}. Try a different prompt.",
                    finish_reason
                )));
            }
            _ => {}
        }
    }

    candidate
        .content
        .ok_or_else(|| SundaError::UnexpectedResponse("No content in Gemini candidate".into()))?
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| SundaError::UnexpectedResponse("No image data received from Gemini".into()))
}

fn model_not_found() -> SundaError {
    SundaError::Api {
        status: 404,
        message: "Model not found. Verify the model name is correct.".into(),
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> SundaError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return model_not_found();
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return SundaError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return SundaError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return SundaError::ContentBlocked(text);
    }
    SundaError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &ComposedRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(SundaError::Auth("Invalid API key".into())),
            404 => Err(model_not_found()),
            s if !(200..300).contains(&s) => Err(SundaError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    fn from_composed_request(req: &ComposedRequest) -> Self {
        let (parts, image_config) = match req {
            ComposedRequest::Generate {
                prompt,
                aspect_ratio,
            } => (
                vec![GeminiRequestPart::Text {
                    text: frame(GENERATE_PREFIX, prompt, GENERATE_SUFFIX),
                }],
                Some(GeminiImageConfig {
                    aspect_ratio: aspect_ratio.as_str().to_string(),
                }),
            ),
            // Image part goes first, then the instruction
            ComposedRequest::Edit { image, instruction } => (
                vec![
                    GeminiRequestPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: image.mime_type().to_string(),
                            data: image.to_base64(),
                        },
                    },
                    GeminiRequestPart::Text {
                        text: frame(EDIT_PREFIX, instruction, EDIT_SUFFIX),
                    },
                ],
                None,
            ),
        };

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config,
            },
        }
    }
}

fn frame(prefix: &str, body: &str, suffix: &str) -> String {
    let body = body.trim().trim_end_matches('.');
    format!("{prefix} {body}. {suffix}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::DataUri;
    use crate::generation::AspectRatio;

    fn generate_request() -> ComposedRequest {
        ComposedRequest::Generate {
            prompt: "A waterfall. A person in the foreground.".into(),
            aspect_ratio: AspectRatio::Landscape,
        }
    }

    fn edit_request() -> ComposedRequest {
        ComposedRequest::Edit {
            image: DataUri::new("image/jpeg", b"jpeg-bytes".to_vec()),
            instruction: "Replace the entire background with: a beach.".into(),
        }
    }

    #[test]
    fn test_builder_debug_hides_key() {
        let builder = GeminiProvider::builder().api_key("secret-key-123");
        let debug = format!("{builder:?}");
        assert!(!debug.contains("secret-key-123"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "nano-banana-pro-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
        assert_eq!(
            "nano-banana-pro".parse::<GeminiModel>().unwrap(),
            GeminiModel::NanoBananaPro
        );
        assert!(matches!(
            "dall-e-3".parse::<GeminiModel>(),
            Err(SundaError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_format() {
        let png: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(response_format("image/jpeg", &png).unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            response_format("application/octet-stream", &png).unwrap(),
            ImageFormat::Png
        );

        let err = response_format("application/octet-stream", b"not an image at all").unwrap_err();
        assert!(matches!(err, SundaError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::NanoBananaPro)
            .base_url("http://localhost:9000/v1beta/")
            .build()
            .unwrap();
        assert_eq!(provider.model(), GeminiModel::NanoBananaPro);
        assert_eq!(provider.base_url, "http://localhost:9000/v1beta");
    }

    #[test]
    fn test_builder_rejects_blank_key() {
        let result = GeminiProviderBuilder::new().api_key("  ").build();
        assert!(matches!(result, Err(SundaError::Auth(_))));
    }

    #[test]
    fn test_generate_request_construction() {
        let gemini_req = GeminiRequest::from_composed_request(&generate_request());
        let json = serde_json::to_value(&gemini_req).unwrap();

        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "Hyper-realistic, high detail, 4k, daytime lighting: A waterfall. A person in the foreground. Authentic Sundanese atmosphere, West Java rural vibes."
        );
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn test_edit_request_construction() {
        let gemini_req = GeminiRequest::from_composed_request(&edit_request());
        let json = serde_json::to_value(&gemini_req).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inline_data"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inline_data"]["data"], "anBlZy1ieXRlcw==");
        assert_eq!(
            parts[1]["text"],
            "Edit this image: Replace the entire background with: a beach. Maintain hyper-realistic Sundanese rural aesthetic."
        );
        assert!(json["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn test_extract_image() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let inline = extract_image(resp).unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "iVBORw0KGgo=");
    }

    #[test]
    fn test_extract_image_without_image_part() {
        let json = r#"{"candidates": [{"content": {"parts": [{}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_image(resp).unwrap_err();
        assert!(matches!(err, SundaError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_extract_image_prompt_blocked() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_image(resp).unwrap_err();
        assert_eq!(err.to_string(), "content blocked: Prompt was blocked due to safety");
    }

    #[test]
    fn test_extract_image_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image(resp),
            Err(SundaError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_extract_image_no_candidates() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_image(resp),
            Err(SundaError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(401, "bad key", &headers),
            SundaError::Auth(_)
        ));
        assert!(matches!(
            parse_error(429, "", &headers),
            SundaError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            parse_error(400, "request blocked by safety system", &headers),
            SundaError::ContentBlocked(_)
        ));
        assert!(matches!(
            parse_error(500, "internal", &headers),
            SundaError::Api { status: 500, .. }
        ));
    }
}
