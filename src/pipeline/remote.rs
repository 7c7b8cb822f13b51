//! Remote redesign client: one page image in, one generated image out.
//!
//! [`RedesignClient`] is the seam between the orchestrator and the image
//! model. [`GeminiClient`] implements it over the Generative Language REST
//! API (`models/{model}:generateContent`); tests substitute scripted clients.
//!
//! ## Request layout
//!
//! A single user turn whose parts are, in order:
//! 1. the request text: composed prompt, optional aspect-ratio sentence,
//!    and the reference-style sentence when references are attached
//! 2. the page image
//! 3. the reference images, in bundle order
//!
//! ## Response handling
//!
//! The first inline image of the first candidate is the result. Image models
//! sometimes answer with prose only; that text is returned as
//! [`GeneratedImage::Text`] instead of failing the page.

use crate::config::{AspectRatio, RedesignConfig};
use crate::error::RedesignError;
use crate::output::GeneratedImage;
use crate::pipeline::encode::ImageData;
use crate::prompts::request_text;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Everything the model needs to redesign one page.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// 0-based position in the run.
    pub page_index: usize,
    pub page_image: ImageData,
    /// Composed prompt (see [`crate::prompts::compose_prompt`]).
    pub prompt: String,
    /// Ordered style anchors (see [`crate::pipeline::references::build_references`]).
    pub reference_images: Vec<ImageData>,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Reject requests that must never reach the network.
    pub fn validate(&self) -> Result<(), RedesignError> {
        let invalid = |reason: &str| RedesignError::InvalidRequest {
            page: self.page_index + 1,
            reason: reason.to_string(),
        };
        if self.page_image.is_empty() {
            return Err(invalid("page image is empty"));
        }
        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt is empty"));
        }
        Ok(())
    }
}

/// Sends one page to an image model.
///
/// Implementations return exactly one result or an error; they never retry.
/// A future that is still pending when the run is stopped is allowed to
/// finish.
pub trait RedesignClient: Send + Sync {
    fn redesign<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<GeneratedImage, RedesignError>>;
}

/// [`RedesignClient`] for the Gemini image models.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from the API settings in `config`.
    ///
    /// Fails with [`RedesignError::MissingApiKey`] when no key is configured.
    pub fn from_config(config: &RedesignConfig) -> Result<Self, RedesignError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(RedesignError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RedesignError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, RedesignError> {
        request.validate()?;

        let body = build_request_body(request);
        debug!(
            "Page {}: sending {} reference image(s) to {}",
            request.page_index + 1,
            request.reference_images.len(),
            self.model
        );

        let mut builder = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RedesignError::RemoteApi {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| self.transport_error(e))?;
        extract_result(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> RedesignError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => RedesignError::RemoteTimeout { secs },
            _ => RedesignError::RemoteTransport(e.to_string()),
        }
    }
}

impl RedesignClient for GeminiClient {
    fn redesign<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<GeneratedImage, RedesignError>> {
        Box::pin(self.generate(request))
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Blob {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    message: String,
}

fn inline_part(image: &ImageData) -> Part {
    Part {
        text: None,
        inline_data: Some(Blob {
            mime_type: image.mime_type.clone(),
            data: image.to_base64(),
        }),
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
    let text = request_text(
        &request.prompt,
        request.aspect_ratio.hint(),
        !request.reference_images.is_empty(),
    );

    let mut parts = Vec::with_capacity(2 + request.reference_images.len());
    parts.push(Part {
        text: Some(text),
        inline_data: None,
    });
    parts.push(inline_part(&request.page_image));
    parts.extend(request.reference_images.iter().map(inline_part));

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
        },
    }
}

fn extract_result(response: GenerateContentResponse) -> Result<GeneratedImage, RedesignError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut fallback_text: Option<String> = None;
    for part in parts {
        if let Some(blob) = part.inline_data.filter(|b| !b.data.is_empty()) {
            return ImageData::from_base64(blob.mime_type, &blob.data).map(GeneratedImage::Image);
        }
        if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
            fallback_text = Some(text);
        }
    }

    fallback_text
        .map(GeneratedImage::Text)
        .ok_or(RedesignError::EmptyResponse)
}

/// Pull `error.message` out of an API error body, or fall back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
