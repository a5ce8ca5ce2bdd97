// src/config.rs
use crate::services::plan_parser::PlanFormat;

/// Service configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Number of design concepts requested per generation (1..=4).
    pub design_count: usize,
    /// How the planning response is structured; selected explicitly,
    /// never probed by trial and error.
    pub plan_format: PlanFormat,
    /// Side of the square the upload is letterboxed into for transmission.
    pub target_size: u32,
    pub planning_model: String,
    pub image_model: String,
    pub bind_addr: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let design_count = std::env::var("RESTAGE_DESIGN_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| (1..=4).contains(n))
            .unwrap_or(2);

        let plan_format = match std::env::var("RESTAGE_PLAN_FORMAT").as_deref() {
            Ok("tagged") => PlanFormat::Tagged,
            _ => PlanFormat::Json,
        };

        let target_size = std::env::var("RESTAGE_TARGET_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1024);

        Self {
            design_count,
            plan_format,
            target_size,
            planning_model: std::env::var("RESTAGE_PLANNING_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            image_model: std::env::var("RESTAGE_IMAGE_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            bind_addr: std::env::var("RESTAGE_BIND")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            design_count: 2,
            plan_format: PlanFormat::Json,
            target_size: 1024,
            planning_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}
