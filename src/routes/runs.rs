use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{ErrorResponse, HealthResponse, PubSubEnvelope};
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Held for the duration of a run so redelivered triggers do not overlap
    pub run_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            run_guard: Arc::new(Mutex::new(())),
        }
    }
}

/// Configure all run-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::post().to(trigger_run))
        .route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Pub/Sub push endpoint
///
/// POST /
///
/// Request body:
/// ```json
/// {
///   "message": { "data": "base64", "messageId": "string" },
///   "subscription": "projects/.../subscriptions/..."
/// }
/// ```
///
/// Runs the matching pipeline to completion and answers with the run report.
async fn trigger_run(
    state: web::Data<AppState>,
    req: web::Json<PubSubEnvelope>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for push envelope: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    // A second delivery while a run is active is acknowledged, not queued
    let _guard = match state.run_guard.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::warn!("Run already in progress; ignoring message {}", req.message.message_id);
            return HttpResponse::Accepted().json(serde_json::json!({
                "status": "already_running",
                "messageId": req.message.message_id,
            }));
        }
    };

    tracing::info!("Received trigger message {}", req.message.message_id);

    match state.pipeline.run().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Run failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
