//! Informational endpoints.
//!
//! - GET /         -> service descriptor
//! - GET /healthz  -> simple liveness ("ok")

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /`
///
/// Static description of the service and its endpoints.
pub async fn index() -> impl IntoResponse {
    Json(ServiceDescriptor {
        message: "SharePoint Inspection API Server",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            inspection: "POST /api/inspection",
        },
    })
}

/// `GET /healthz`
///
/// Liveness check. Does not touch Graph.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

#[derive(Serialize)]
struct ServiceDescriptor {
    message: &'static str,
    version: &'static str,
    endpoints: Endpoints,
}

#[derive(Serialize)]
struct Endpoints {
    inspection: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
