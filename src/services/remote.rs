// src/services/remote.rs
use crate::errors::StagingError;
use crate::models::TransmittableImage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// What the caller wants back from a remote invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputModality {
    Text,
    Image,
}

#[derive(Debug, Clone)]
pub enum RequestPart {
    Text(String),
    InlineImage(TransmittableImage),
}

/// A single remote generative call: model, typed content parts, desired
/// output modality, and an optional lat/long retrieval hint for location
/// grounding.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub model: String,
    pub parts: Vec<RequestPart>,
    pub output: OutputModality,
    pub retrieval_hint: Option<(f64, f64)>,
}

/// Grounding metadata as the wire delivers it: every field untrusted and
/// optional. The generation client filters it once at its boundary.
#[derive(Debug, Clone, Default)]
pub struct GroundingChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RemoteResponse {
    pub text: Option<String>,
    pub image_parts: Vec<TransmittableImage>,
    pub grounding: Vec<GroundingChunk>,
}

impl RemoteResponse {
    /// First inline image part, if the call returned one at all.
    pub fn first_image(&self) -> Option<&TransmittableImage> {
        self.image_parts.first()
    }
}

/// The sole network boundary of the pipeline. Injected into the
/// generation and edit clients so tests can substitute a fake.
#[async_trait]
pub trait RemoteCapability: Send + Sync {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, StagingError>;
}

// ---------------------------------------------------------------------
// Gemini generateContent wire format
// ---------------------------------------------------------------------

#[derive(Serialize)]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    InlineData { inline_data: WireInlineData },
}

#[derive(Serialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Serialize)]
struct WireLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRetrievalConfig {
    lat_lng: WireLatLng,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireToolConfig {
    retrieval_config: WireRetrievalConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    google_maps: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<WireToolConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponseInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<WireResponseInlineData>,
}

#[derive(Deserialize, Default)]
struct WireResponseContent {
    #[serde(default)]
    parts: Option<Vec<WireResponsePart>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireGroundingSite {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<WireGroundingSite>,
    #[serde(default)]
    maps: Option<WireGroundingSite>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Option<Vec<WireGroundingChunk>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireResponseContent>,
    #[serde(default)]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Deserialize, Default)]
struct WireResponse {
    #[serde(default)]
    candidates: Option<Vec<WireCandidate>>,
}

/// reqwest-backed client for the hosted Gemini generateContent endpoint.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client: Client::new(),
        }
    }

    fn build_body(&self, request: &RemoteRequest) -> WireRequest {
        let parts = request
            .parts
            .iter()
            .map(|p| match p {
                RequestPart::Text(text) => WirePart::Text { text: text.clone() },
                RequestPart::InlineImage(img) => WirePart::InlineData {
                    inline_data: WireInlineData {
                        mime_type: img.mime_type.clone(),
                        data: img.payload.clone(),
                    },
                },
            })
            .collect();

        let generation_config = match request.output {
            OutputModality::Image => Some(WireGenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
            }),
            OutputModality::Text => None,
        };

        // The maps grounding tool only applies to planning (text) calls.
        let wants_grounding =
            request.output == OutputModality::Text && request.retrieval_hint.is_some();
        let tools = wants_grounding.then(|| {
            vec![WireTool {
                google_maps: serde_json::json!({}),
            }]
        });
        let tool_config = request
            .retrieval_hint
            .filter(|_| wants_grounding)
            .map(|(latitude, longitude)| WireToolConfig {
                retrieval_config: WireRetrievalConfig {
                    lat_lng: WireLatLng {
                        latitude,
                        longitude,
                    },
                },
            });

        WireRequest {
            contents: vec![WireContent { parts }],
            generation_config,
            tools,
            tool_config,
        }
    }
}

fn flatten_response(wire: WireResponse) -> RemoteResponse {
    let mut out = RemoteResponse::default();

    for candidate in wire.candidates.unwrap_or_default() {
        if let Some(parts) = candidate.content.and_then(|c| c.parts) {
            for part in parts {
                if let Some(text) = part.text {
                    match &mut out.text {
                        Some(existing) => existing.push_str(&text),
                        None => out.text = Some(text),
                    }
                }
                if let Some(inline) = part.inline_data {
                    out.image_parts.push(TransmittableImage {
                        mime_type: inline.mime_type,
                        payload: inline.data,
                    });
                }
            }
        }

        if let Some(meta) = candidate.grounding_metadata {
            for chunk in meta.grounding_chunks.unwrap_or_default() {
                if let Some(site) = chunk.maps.or(chunk.web) {
                    out.grounding.push(GroundingChunk {
                        title: site.title,
                        uri: site.uri,
                        subtitle: site.text,
                    });
                }
            }
        }
    }

    out
}

#[async_trait]
impl RemoteCapability for GeminiClient {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, StagingError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = self.build_body(&request);

        let response = self
            .client
            .post(&url)
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StagingError::Remote(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(StagingError::Remote(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| StagingError::Remote(format!("Failed to parse response: {}", e)))?;

        Ok(flatten_response(wire))
    }
}
