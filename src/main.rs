// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod session;

use crate::config::ServiceConfig;
use crate::handlers::{
    create_session, edit, generate, get_session, reset, select_design, upload_image,
};
use crate::services::remote::GeminiClient;
use crate::services::{EditClient, GenerationClient};
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    generation: Arc<GenerationClient>,
    edit: Arc<EditClient>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting restage service...");

    let config = ServiceConfig::from_env();
    let remote = Arc::new(GeminiClient::new(
        std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set"),
    ));

    let app_state = AppState {
        sessions: Arc::new(SessionStore::new()),
        generation: Arc::new(GenerationClient::new(remote.clone(), &config)),
        edit: Arc::new(EditClient::new(remote, config.image_model.clone())),
    };

    info!(
        "Starting HTTP server on {} ({} designs per request)",
        config.bind_addr, config.design_count
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/sessions", web::post().to(create_session))
                    .route("/sessions/{session_id}", web::get().to(get_session))
                    .route(
                        "/sessions/{session_id}/upload",
                        web::post().to(upload_image),
                    )
                    .route("/sessions/{session_id}/generate", web::post().to(generate))
                    .route(
                        "/sessions/{session_id}/designs/{index}",
                        web::post().to(select_design),
                    )
                    .route("/sessions/{session_id}/edit", web::post().to(edit))
                    .route("/sessions/{session_id}/reset", web::post().to(reset)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "restage",
        "version": "0.1.0"
    }))
}
