// src/handlers.rs
use crate::{AppState, errors::StagingError, models::*, services::geometry, session::Stage};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;
use log::warn;
use uuid::Uuid;

const MAX_DIMENSION: u32 = 4096;

pub async fn create_session(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let session_id = data.sessions.create().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "session_id": session_id })))
}

pub async fn get_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let view = data
        .sessions
        .with_session(session_id, |s| {
            serde_json::json!({
                "session_id": session_id,
                "stage": s.stage,
                "has_image": s.image.is_some(),
                "designs": s.outcome.as_ref().map(|o| &o.designs),
                "grounding_refs": s.outcome.as_ref().map(|o| &o.grounding_refs),
                "active_index": s.active_index,
                "displayed_image": s.displayed_image(),
                "error": s.last_error,
            })
        })
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn upload_image(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let mut captured: Option<(u32, u32)> = None;

    while let Some(mut field) = payload.try_next().await? {
        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        let (width, height) = geometry::measure_dimensions(&image_data)?;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(StagingError::Validation(format!(
                "Image dimensions exceed {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            ))
            .into());
        }

        let image = UploadedImage {
            data: image_data,
            content_type,
            width,
            height,
            uploaded_at: chrono::Utc::now(),
        };

        data.sessions
            .with_session(session_id, |s| s.capture_image(image))
            .await??;
        captured = Some((width, height));

        // One photo per session; further fields are ignored.
        break;
    }

    let (width, height) = captured
        .ok_or_else(|| StagingError::Validation("No image field in upload".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "session_id": session_id,
        "width": width,
        "height": height
    })))
}

pub async fn generate(
    path: web::Path<Uuid>,
    body: web::Json<GenerateRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let location = body.into_inner().location;

    // submit() owns the stage transition; a missing image has already
    // moved the session to the error state by the time we see Err.
    let image = data
        .sessions
        .with_session(session_id, |s| s.submit())
        .await??;

    let result = data.generation.generate_designs(&image, &location).await;

    let response = data
        .sessions
        .with_session(session_id, |s| match result {
            Ok(outcome) => {
                s.succeed(outcome.clone());
                Ok(HttpResponse::Ok().json(outcome))
            }
            Err(err) => {
                warn!("Generation failed for session {}: {}", session_id, err);
                s.fail(err.to_string());
                Err(err)
            }
        })
        .await??;

    Ok(response)
}

pub async fn select_design(
    path: web::Path<(Uuid, usize)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, index) = path.into_inner();
    let displayed = data
        .sessions
        .with_session(session_id, |s| {
            s.select_design(index)?;
            Ok::<_, StagingError>(s.displayed_image().map(str::to_string))
        })
        .await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "active_index": index,
        "displayed_image": displayed
    })))
}

pub async fn edit(
    path: web::Path<Uuid>,
    body: web::Json<EditRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let instruction = body.into_inner().instruction;
    if instruction.trim().is_empty() {
        return Err(StagingError::Validation("Empty edit instruction".to_string()).into());
    }

    let base = data
        .sessions
        .with_session(session_id, |s| s.begin_edit())
        .await??;

    let result = data.edit.edit_image(&base, &instruction).await;

    // Edit failures are non-fatal: the session stays in results and the
    // outcome is reported in the body.
    let body = match &result {
        Ok(reference) => serde_json::json!({
            "edited": true,
            "displayed_image": reference
        }),
        Err(err) => {
            warn!("Edit failed for session {}: {}", session_id, err);
            serde_json::json!({
                "edited": false,
                "error": err.to_string()
            })
        }
    };

    data.sessions
        .with_session(session_id, |s| s.finish_edit(result.as_ref().cloned()))
        .await?;

    Ok(HttpResponse::Ok().json(body))
}

pub async fn reset(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    data.sessions
        .with_session(session_id, |s| s.reset())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "stage": Stage::Upload })))
}
