//! Client for the hosted multimodal model: scalp analysis and preview generation.

pub mod error;
mod prompts;
pub mod retry;
mod wire;

use tracing::{debug, info, warn};
use url::Url;

use crate::assessment::{AssessmentResult, Language, response_schema};
use crate::constants::{DEFAULT_ANALYSIS_MODEL, DEFAULT_IMAGE_MODEL, X_GOOG_API_KEY};
use crate::imaging::{PreprocessOptions, prepare_for_upload};
use crate::payload::{ImagePayload, data_uri};

pub use error::{ErrorKind, GatewayError, Operation};
pub use retry::RetryPolicy;
use wire::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse, GenerationConfig};

/// Everything the client needs, built once at startup.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Upstream API key; calls fail with [GatewayError::MissingCredential] without one.
    pub api_key: Option<String>,
    /// API root, eg `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base: Url,
    /// Model for [GatewayClient::analyze].
    pub analysis_model: String,
    /// Model for [GatewayClient::generate].
    pub image_model: String,
    /// Quota retry behaviour.
    pub retry: RetryPolicy,
    /// Upload resizing.
    pub preprocess: PreprocessOptions,
}

impl GatewayConfig {
    /// Config with default models, retry and preprocessing.
    pub fn new(api_key: Option<String>, api_base: Url) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            api_base,
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            retry: RetryPolicy::default(),
            preprocess: PreprocessOptions::default(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base.as_str())
            .field("analysis_model", &self.analysis_model)
            .field("image_model", &self.image_model)
            .field("retry", &self.retry)
            .field("preprocess", &self.preprocess)
            .finish()
    }
}

/// Shared, stateless gateway; clone the `Arc` it lives in, not the client.
#[derive(Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Builds the HTTP client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Whether an API key is configured.
    pub fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredential)
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!(
            "{}/{}:generateContent",
            self.config.api_base.as_str().trim_end_matches('/'),
            model_path
        )
    }

    /// Assesses the scalp photo, with the summary written in `language`.
    pub async fn analyze(
        &self,
        image: &ImagePayload,
        language: Language,
    ) -> Result<AssessmentResult, GatewayError> {
        if image.is_empty() {
            return Err(GatewayError::InvalidInput("image is empty".to_string()));
        }
        let api_key = self.api_key()?;

        let prepared = prepare_for_upload(image.clone(), self.config.preprocess).await;
        let request = GenerateContentRequest::user_turn(
            &prepared,
            prompts::analysis_prompt(language),
            Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(response_schema()),
                ..Default::default()
            }),
        );
        let endpoint = self.endpoint(&self.config.analysis_model);
        debug!(
            "Analyzing {} byte {} upload via {}",
            prepared.bytes.len(),
            prepared.mime_type,
            self.config.analysis_model
        );

        let response = self
            .config
            .retry
            .run("analyze", || self.generate_content(&endpoint, api_key, &request))
            .await?;

        if let Some(reason) = response.safety_block() {
            info!("Analysis blocked by content safety: {}", reason);
            return Err(GatewayError::SafetyBlock(reason));
        }
        let text = response.text().ok_or_else(|| {
            GatewayError::ParseError(format!(
                "response has no text (finish reason {})",
                response.finish_reason().unwrap_or("none")
            ))
        })?;
        let result = AssessmentResult::from_model_text(&text)?;
        info!(
            "Assessment complete: Norwood {}, {} grafts",
            result.norwood_scale, result.total_grafts
        );
        Ok(result)
    }

    /// Edits the photo to preview `style_prompt`, returning the image as a data URI.
    pub async fn generate(
        &self,
        image: &ImagePayload,
        style_prompt: &str,
    ) -> Result<String, GatewayError> {
        if image.is_empty() {
            return Err(GatewayError::InvalidInput("image is empty".to_string()));
        }
        if style_prompt.trim().is_empty() {
            return Err(GatewayError::InvalidInput("style prompt is empty".to_string()));
        }
        let api_key = self.api_key()?;

        let prepared = prepare_for_upload(image.clone(), self.config.preprocess).await;
        let request = GenerateContentRequest::user_turn(
            &prepared,
            prompts::preview_prompt(style_prompt),
            Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..Default::default()
            }),
        );
        let endpoint = self.endpoint(&self.config.image_model);

        let response = self
            .config
            .retry
            .run("generate", || self.generate_content(&endpoint, api_key, &request))
            .await?;

        if let Some(reason) = response.safety_block() {
            info!("Preview blocked by content safety: {}", reason);
            return Err(GatewayError::SafetyBlock(reason));
        }
        if let Some(inline) = response.first_inline_image() {
            return Ok(data_uri(&inline.mime_type, &inline.data));
        }
        match response.finish_reason() {
            None | Some("STOP") => Err(GatewayError::NoImageReturned),
            Some(reason) => Err(GatewayError::GenerationStopped(reason.to_string())),
        }
    }

    async fn generate_content(
        &self,
        endpoint: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let response = self
            .http
            .post(endpoint)
            .header(X_GOOG_API_KEY, api_key)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| GatewayError::ParseError(format!("invalid response envelope: {err}")))
    }
}

/// Maps a non-2xx upstream response to an error kind.
fn classify_failure(status: u16, body: &[u8]) -> GatewayError {
    let parsed = serde_json::from_slice::<ApiErrorResponse>(body).ok();
    let upstream_status = parsed
        .as_ref()
        .and_then(|parsed| parsed.error.status.clone());
    let message = match parsed {
        Some(parsed) => parsed.error.message,
        None => String::from_utf8_lossy(body).chars().take(500).collect(),
    };

    if status == 429 || upstream_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        return GatewayError::QuotaExceeded(message);
    }
    warn!("Upstream returned {}: {}", status, message);
    GatewayError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> GatewayClient {
        let api_base = Url::parse(api_base).unwrap();
        GatewayClient::new(GatewayConfig::new(Some("key".to_string()), api_base)).unwrap()
    }

    #[test]
    fn endpoint_joins_model_path() {
        let client = client("https://example.org/v1beta/");
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "https://example.org/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.endpoint(" models/custom "),
            "https://example.org/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let config = GatewayConfig::new(
            Some("super-secret".to_string()),
            Url::parse("https://example.org").unwrap(),
        );
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = GatewayConfig::new(
            Some("  ".to_string()),
            Url::parse("https://example.org").unwrap(),
        );
        assert!(config.api_key.is_none());
    }

    #[test]
    fn classifies_quota_failures() {
        assert!(matches!(
            classify_failure(429, b"Too Many Requests"),
            GatewayError::QuotaExceeded(_)
        ));
        let exhausted = br#"{"error": {"code": 400, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_failure(400, exhausted),
            GatewayError::QuotaExceeded(message) if message == "quota"
        ));
    }

    #[test]
    fn other_failures_are_upstream() {
        let invalid = br#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        match classify_failure(400, invalid) {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(classify_failure(503, b"").kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let api_base = Url::parse("http://127.0.0.1:9").unwrap();
        let client = GatewayClient::new(GatewayConfig::new(None, api_base)).unwrap();
        assert!(!client.has_credential());
        let image = ImagePayload::new("image/jpeg", vec![1, 2, 3]);
        assert!(matches!(
            client.analyze(&image, Language::En).await,
            Err(GatewayError::MissingCredential)
        ));
        assert!(matches!(
            client.generate(&image, "buzz cut").await,
            Err(GatewayError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let client = client("http://127.0.0.1:9");
        let empty = ImagePayload::new("image/jpeg", Vec::new());
        assert_eq!(
            client.analyze(&empty, Language::En).await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let image = ImagePayload::new("image/jpeg", vec![1]);
        assert_eq!(
            client.generate(&image, "   ").await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
