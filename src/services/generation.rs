// src/services/generation.rs
use crate::config::ServiceConfig;
use crate::errors::StagingError;
use crate::models::{
    DesignPlan, DesignResult, GenerationOutcome, GroundingReference, LocationInput,
    TransmittableImage, UploadedImage,
};
use crate::services::codec;
use crate::services::geometry;
use crate::services::plan_parser::{self, PlanFormat};
use crate::services::remote::{
    OutputModality, RemoteCapability, RemoteRequest, RequestPart,
};
use futures_util::future::try_join_all;
use log::{debug, info};
use std::sync::Arc;

/// Orchestrates a full generation request: letterbox the upload, run one
/// planning call, then one image-synthesis call per concept, and crop the
/// results back to the upload's aspect ratio.
pub struct GenerationClient {
    remote: Arc<dyn RemoteCapability>,
    design_count: usize,
    plan_format: PlanFormat,
    target_size: u32,
    planning_model: String,
    image_model: String,
}

impl GenerationClient {
    pub fn new(remote: Arc<dyn RemoteCapability>, config: &ServiceConfig) -> Self {
        Self {
            remote,
            design_count: config.design_count,
            plan_format: config.plan_format,
            target_size: config.target_size,
            planning_model: config.planning_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    pub async fn generate_designs(
        &self,
        image: &UploadedImage,
        location: &LocationInput,
    ) -> Result<GenerationOutcome, StagingError> {
        let letterboxed = geometry::letterbox_to_square(&image.data, self.target_size)?;
        let transmittable = codec::encode_for_transmission(&letterboxed, "image/jpeg")?;

        // Planning: one text call, optionally location-grounded.
        let retrieval_hint = match location {
            LocationInput::Coordinates {
                latitude,
                longitude,
            } => Some((*latitude, *longitude)),
            _ => None,
        };

        let planning = self
            .remote
            .invoke(RemoteRequest {
                model: self.planning_model.clone(),
                parts: vec![
                    RequestPart::InlineImage(transmittable.clone()),
                    RequestPart::Text(self.planning_prompt(location)),
                ],
                output: OutputModality::Text,
                retrieval_hint,
            })
            .await?;

        let plan_text = planning
            .text
            .as_deref()
            .ok_or_else(|| StagingError::PlanParse("Planning call returned no text".to_string()))?;
        let plans = plan_parser::parse_plans(plan_text, self.plan_format, self.design_count)?;
        info!("Planning call produced {} design concepts", plans.len());

        // Synthesis: all calls dispatched before any is awaited, joined
        // all-or-nothing. A single failure fails the whole batch; the
        // caller has no way to render a partial design set.
        let synthesis = plans
            .iter()
            .map(|plan| self.synthesize(plan, &transmittable));
        let squares = try_join_all(synthesis).await?;

        let mut designs = Vec::with_capacity(plans.len());
        for (plan, square) in plans.into_iter().zip(squares) {
            let square_bytes = codec::payload_bytes(&square)?;
            let cropped = geometry::crop_to_original_aspect(
                &square_bytes,
                image.width,
                image.height,
                self.target_size,
            )?;
            let encoded = codec::encode_for_transmission(&cropped, "image/jpeg")?;
            designs.push(DesignResult {
                design_title: plan.title,
                design_description: plan.description,
                redesigned_image_url: codec::decode_from_transmission(
                    &encoded.payload,
                    &encoded.mime_type,
                ),
            });
        }

        let grounding_refs = planning
            .grounding
            .into_iter()
            .filter_map(|chunk| match (chunk.title, chunk.uri) {
                (Some(title), Some(uri)) => Some(GroundingReference {
                    title,
                    uri,
                    subtitle: chunk.subtitle,
                }),
                _ => None,
            })
            .collect();

        Ok(GenerationOutcome {
            designs,
            grounding_refs,
        })
    }

    async fn synthesize(
        &self,
        plan: &DesignPlan,
        original: &TransmittableImage,
    ) -> Result<TransmittableImage, StagingError> {
        let prompt = match &plan.image_prompt {
            Some(p) => p.clone(),
            None => format!(
                "Redesign this room as \"{}\": {}. Keep the camera angle, walls, windows and \
                 architectural structure exactly as in the photo.",
                plan.title, plan.description
            ),
        };
        debug!("Synthesizing image for design \"{}\"", plan.title);

        let response = self
            .remote
            .invoke(RemoteRequest {
                model: self.image_model.clone(),
                parts: vec![
                    RequestPart::InlineImage(original.clone()),
                    RequestPart::Text(prompt),
                ],
                output: OutputModality::Image,
                retrieval_hint: None,
            })
            .await?;

        response
            .first_image()
            .cloned()
            .ok_or_else(|| StagingError::ImagePartMissing(plan.title.clone()))
    }

    fn planning_prompt(&self, location: &LocationInput) -> String {
        let format_instructions = match self.plan_format {
            PlanFormat::Json => format!(
                "Respond with a single JSON object of the form \
                 {{\"designs\": [{{\"title\": ..., \"description\": ..., \"imagePrompt\": ...}}]}} \
                 containing exactly {} entries and nothing else.",
                self.design_count
            ),
            PlanFormat::Tagged => format!(
                "Respond with exactly {} concepts, each as a [TITLE]...[/TITLE] block followed \
                 immediately by a [DESCRIPTION]...[/DESCRIPTION] block, and no other markup.",
                self.design_count
            ),
        };

        let location_clause = match location {
            LocationInput::Query { query } => format!(
                " The room is located near {}. When suggesting furniture or decor, prefer \
                 pieces available from stores in that area and name the stores.",
                query
            ),
            // Coordinates travel as a structured retrieval hint, not text.
            _ => String::new(),
        };

        format!(
            "You are an interior designer. Study this photo of a room and propose {} distinct \
             redesign concepts. Hard constraints: do not change walls, windows, doors or any \
             architectural structure; reuse the existing furniture where it fits the concept, \
             replacing at most a few pieces per concept.{} {}",
            self.design_count, location_clause, format_instructions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::remote::{GroundingChunk, RemoteResponse};
    use async_trait::async_trait;
    use chrono::Utc;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Scripted fake: hands out canned responses in invocation order and
    /// records every request it sees.
    struct FakeRemote {
        responses: Mutex<Vec<Result<RemoteResponse, StagingError>>>,
        seen: Mutex<Vec<RemoteRequest>>,
    }

    impl FakeRemote {
        fn new(responses: Vec<Result<RemoteResponse, StagingError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteCapability for FakeRemote {
        async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, StagingError> {
            self.seen.lock().unwrap().push(request);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([120, 90, 60, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn upload(w: u32, h: u32) -> UploadedImage {
        UploadedImage {
            data: png_bytes(w, h),
            content_type: "image/png".to_string(),
            width: w,
            height: h,
            uploaded_at: Utc::now(),
        }
    }

    fn square_image_part(size: u32) -> TransmittableImage {
        codec::encode_for_transmission(&png_bytes(size, size), "image/png").unwrap()
    }

    fn plan_response(json: &str, grounding: Vec<GroundingChunk>) -> RemoteResponse {
        RemoteResponse {
            text: Some(json.to_string()),
            image_parts: vec![],
            grounding,
        }
    }

    fn image_response(size: u32) -> RemoteResponse {
        RemoteResponse {
            text: None,
            image_parts: vec![square_image_part(size)],
            grounding: vec![],
        }
    }

    fn client(remote: Arc<dyn RemoteCapability>, target_size: u32) -> GenerationClient {
        let config = ServiceConfig {
            target_size,
            ..ServiceConfig::default()
        };
        GenerationClient::new(remote, &config)
    }

    const TWO_PLANS: &str = r#"{"designs": [
        {"title": "Coastal Calm", "description": "Linen and driftwood.", "imagePrompt": "coastal room"},
        {"title": "Warm Industrial", "description": "Brick and brass."}
    ]}"#;

    #[tokio::test]
    async fn two_designs_come_back_in_plan_order_with_original_aspect() {
        let remote = Arc::new(FakeRemote::new(vec![
            Ok(plan_response(
                TWO_PLANS,
                vec![
                    GroundingChunk {
                        title: Some("Austin Vintage Decor".to_string()),
                        uri: Some("https://maps.example/1".to_string()),
                        subtitle: None,
                    },
                    GroundingChunk {
                        title: None,
                        uri: Some("https://maps.example/untitled".to_string()),
                        subtitle: None,
                    },
                ],
            )),
            Ok(image_response(256)),
            Ok(image_response(256)),
        ]));
        let client = client(remote.clone(), 256);

        let outcome = client
            .generate_designs(
                &upload(1600, 900),
                &LocationInput::Query {
                    query: "Austin, TX".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.designs.len(), 2);
        assert_eq!(outcome.designs[0].design_title, "Coastal Calm");
        assert_eq!(outcome.designs[1].design_title, "Warm Industrial");

        // Displayed image decodes to roughly the upload's 16:9.
        let t = codec::parse_transmittable_from_reference(
            &outcome.designs[0].redesigned_image_url,
        )
        .unwrap();
        let bytes = codec::payload_bytes(&t).unwrap();
        let (w, h) = geometry::measure_dimensions(&bytes).unwrap();
        assert!(((w as f64 / h as f64) - 16.0 / 9.0).abs() < 0.05);

        // Untitled grounding chunks are filtered at the boundary.
        assert_eq!(outcome.grounding_refs.len(), 1);
        assert_eq!(outcome.grounding_refs[0].title, "Austin Vintage Decor");

        // Text location is embedded in the planning prompt, not sent as a
        // structured hint.
        let seen = remote.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].retrieval_hint.is_none());
        assert!(seen[0].parts.iter().any(|p| matches!(
            p,
            RequestPart::Text(t) if t.contains("Austin, TX")
        )));
    }

    #[tokio::test]
    async fn coordinates_travel_as_retrieval_hint() {
        let remote = Arc::new(FakeRemote::new(vec![
            Ok(plan_response(TWO_PLANS, vec![])),
            Ok(image_response(256)),
            Ok(image_response(256)),
        ]));
        let client = client(remote.clone(), 256);

        client
            .generate_designs(
                &upload(800, 600),
                &LocationInput::Coordinates {
                    latitude: 30.26,
                    longitude: -97.74,
                },
            )
            .await
            .unwrap();

        let seen = remote.seen.lock().unwrap();
        assert_eq!(seen[0].retrieval_hint, Some((30.26, -97.74)));
        assert!(seen[0].parts.iter().all(|p| match p {
            RequestPart::Text(t) => !t.contains("30.26"),
            _ => true,
        }));
    }

    #[tokio::test]
    async fn wrong_plan_count_fails_before_any_synthesis() {
        let three = r#"{"designs": [
            {"title": "A", "description": "a"},
            {"title": "B", "description": "b"},
            {"title": "C", "description": "c"}
        ]}"#;
        let remote = Arc::new(FakeRemote::new(vec![Ok(plan_response(three, vec![]))]));
        let client = client(remote.clone(), 256);

        let err = client
            .generate_designs(&upload(1600, 900), &LocationInput::Unspecified)
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::PlanParse(_)));
        assert_eq!(remote.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_image_part_names_the_design_and_fails_the_batch() {
        let remote = Arc::new(FakeRemote::new(vec![
            Ok(plan_response(TWO_PLANS, vec![])),
            Ok(image_response(256)),
            Ok(RemoteResponse::default()), // no image part
        ]));
        let client = client(remote, 256);

        let err = client
            .generate_designs(&upload(1600, 900), &LocationInput::Unspecified)
            .await
            .unwrap_err();
        match err {
            StagingError::ImagePartMissing(title) => assert_eq!(title, "Warm Industrial"),
            other => panic!("expected ImagePartMissing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn remote_synthesis_failure_fails_the_batch() {
        let remote = Arc::new(FakeRemote::new(vec![
            Ok(plan_response(TWO_PLANS, vec![])),
            Err(StagingError::Remote("quota exceeded".to_string())),
            Ok(image_response(256)),
        ]));
        let client = client(remote, 256);

        let err = client
            .generate_designs(&upload(1600, 900), &LocationInput::Unspecified)
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Remote(_)));
    }
}
