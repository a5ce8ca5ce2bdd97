// src/services/edit.rs
use crate::errors::StagingError;
use crate::services::codec;
use crate::services::remote::{OutputModality, RemoteCapability, RemoteRequest, RequestPart};
use log::debug;
use std::sync::Arc;

/// Applies a free-text instruction to an already-generated image with a
/// single image-synthesis call. Edits operate on an already-cropped
/// image, so no aspect correction happens here.
pub struct EditClient {
    remote: Arc<dyn RemoteCapability>,
    model: String,
}

impl EditClient {
    pub fn new(remote: Arc<dyn RemoteCapability>, model: String) -> Self {
        Self { remote, model }
    }

    pub async fn edit_image(
        &self,
        base_reference: &str,
        instruction: &str,
    ) -> Result<String, StagingError> {
        let base = codec::parse_transmittable_from_reference(base_reference)?;
        debug!("Editing image with instruction: {}", instruction);

        let response = self
            .remote
            .invoke(RemoteRequest {
                model: self.model.clone(),
                parts: vec![
                    RequestPart::InlineImage(base),
                    RequestPart::Text(instruction.to_string()),
                ],
                output: OutputModality::Image,
                retrieval_hint: None,
            })
            .await?;

        let edited = response
            .first_image()
            .ok_or(StagingError::EditImagePartMissing)?;

        Ok(codec::decode_from_transmission(
            &edited.payload,
            &edited.mime_type,
        ))
    }
}
