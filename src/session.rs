// src/session.rs
use crate::errors::StagingError;
use crate::models::{GenerationOutcome, UploadedImage};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Generating,
    Results,
    Error,
}

/// Per-session state. One generation or edit is in flight at a time; the
/// stage field is what enforces it.
#[derive(Debug)]
pub struct GenerationSession {
    pub stage: Stage,
    pub image: Option<UploadedImage>,
    pub outcome: Option<GenerationOutcome>,
    pub active_index: usize,
    /// Displayed in place of the active design's base image after an
    /// edit. Scoped to one design; switching designs discards it.
    pub edited_image: Option<String>,
    pub last_error: Option<String>,
    edit_in_flight: bool,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::Upload,
            image: None,
            outcome: None,
            active_index: 0,
            edited_image: None,
            last_error: None,
            edit_in_flight: false,
        }
    }

    pub fn capture_image(&mut self, image: UploadedImage) -> Result<(), StagingError> {
        if self.stage != Stage::Upload {
            return Err(StagingError::InvalidTransition(
                "An image can only be uploaded before generation starts".to_string(),
            ));
        }
        self.image = Some(image);
        Ok(())
    }

    /// `upload -> generating`. A submit without a captured image lands in
    /// the error state rather than being rejected, matching the dead-end
    /// semantics the UI expects.
    pub fn submit(&mut self) -> Result<UploadedImage, StagingError> {
        match self.stage {
            Stage::Upload => {}
            Stage::Generating => {
                return Err(StagingError::InvalidTransition(
                    "A generation is already in flight".to_string(),
                ));
            }
            _ => {
                return Err(StagingError::InvalidTransition(
                    "Generation can only start from the upload stage".to_string(),
                ));
            }
        }

        match self.image.clone() {
            Some(image) => {
                self.stage = Stage::Generating;
                Ok(image)
            }
            None => {
                self.stage = Stage::Error;
                self.last_error = Some("No image has been uploaded".to_string());
                Err(StagingError::Validation(
                    "No image has been uploaded".to_string(),
                ))
            }
        }
    }

    /// `generating -> results`.
    pub fn succeed(&mut self, outcome: GenerationOutcome) {
        self.stage = Stage::Results;
        self.outcome = Some(outcome);
        self.active_index = 0;
        self.edited_image = None;
        self.last_error = None;
    }

    /// `generating -> error`. Terminal; only reset leaves it.
    pub fn fail(&mut self, message: String) {
        self.stage = Stage::Error;
        self.last_error = Some(message);
    }

    pub fn select_design(&mut self, index: usize) -> Result<(), StagingError> {
        if self.stage != Stage::Results {
            return Err(StagingError::InvalidTransition(
                "No results to select from".to_string(),
            ));
        }
        let count = self.outcome.as_ref().map(|o| o.designs.len()).unwrap_or(0);
        if index >= count {
            return Err(StagingError::Validation(format!(
                "Design index {} out of range ({} designs)",
                index, count
            )));
        }
        self.active_index = index;
        self.edited_image = None;
        Ok(())
    }

    /// Reference of the image currently shown: the edit override if one
    /// exists, else the active design's base image.
    pub fn displayed_image(&self) -> Option<&str> {
        if let Some(edited) = &self.edited_image {
            return Some(edited);
        }
        self.outcome
            .as_ref()
            .and_then(|o| o.designs.get(self.active_index))
            .map(|d| d.redesigned_image_url.as_str())
    }

    pub fn begin_edit(&mut self) -> Result<String, StagingError> {
        if self.stage != Stage::Results {
            return Err(StagingError::InvalidTransition(
                "Edits only apply to results".to_string(),
            ));
        }
        if self.edit_in_flight {
            return Err(StagingError::InvalidTransition(
                "An edit is already in flight".to_string(),
            ));
        }
        let base = self
            .displayed_image()
            .ok_or_else(|| StagingError::Validation("No design to edit".to_string()))?
            .to_string();
        self.edit_in_flight = true;
        Ok(base)
    }

    /// Edit outcomes never change stage; a failure leaves the current
    /// results view exactly as it was. A reset issued while the edit was
    /// in flight invalidates it, so a late result is dropped rather than
    /// written into the fresh session.
    pub fn finish_edit(&mut self, result: Result<String, &StagingError>) {
        if !self.edit_in_flight || self.stage != Stage::Results {
            return;
        }
        self.edit_in_flight = false;
        match result {
            Ok(reference) => self.edited_image = Some(reference),
            Err(err) => self.last_error = Some(err.to_string()),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session registry. Nothing is persisted; a restart or a reset
/// discards everything.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, GenerationSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .await
            .insert(id, GenerationSession::new());
        id
    }

    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut GenerationSession) -> T,
    ) -> Result<T, StagingError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| StagingError::SessionNotFound(id.to_string()))?;
        Ok(f(session))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
