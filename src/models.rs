// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user's photo as captured at upload time. Immutable for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// Optional location context supplied with a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationInput {
    Coordinates { latitude: f64, longitude: f64 },
    Query { query: String },
    #[default]
    Unspecified,
}

/// Base64 image payload paired with its MIME type, the only form an image
/// takes at the remote-call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmittableImage {
    pub mime_type: String,
    pub payload: String,
}

/// A textual design concept produced by the planning call, before any
/// image exists for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignPlan {
    pub title: String,
    pub description: String,
    #[serde(rename = "imagePrompt", default)]
    pub image_prompt: Option<String>,
}

/// A finished design: concept text plus the displayable redesigned image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignResult {
    pub design_title: String,
    pub design_description: String,
    pub redesigned_image_url: String,
}

/// Store/place metadata surfaced by location grounding. Only entries
/// carrying both a title and a URI survive the boundary filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingReference {
    pub title: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Everything a successful generation request produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub designs: Vec<DesignResult>,
    pub grounding_refs: Vec<GroundingReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub location: LocationInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub instruction: String,
}
