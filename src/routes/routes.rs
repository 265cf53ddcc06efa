//! Defines routes for the inspection API.
//!
//! ## Structure
//! - `GET  /`              : service descriptor
//! - `GET  /healthz`       : liveness
//! - `POST /api/inspection`: multipart inspection submission

use crate::{
    config::AppConfig,
    handlers::{
        health_handlers::{healthz, index},
        inspection_handlers::create_inspection,
    },
    services::inspection_service::InspectionService,
};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router carrying `InspectionService` as shared state.
pub fn routes() -> Router<InspectionService> {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/inspection", post(create_inspection))
}

/// Attach state and the HTTP layers configured for this process.
pub fn app(service: InspectionService, cfg: &AppConfig) -> Result<Router> {
    let origin = HeaderValue::from_str(&cfg.cors_origin)
        .with_context(|| format!("invalid CORS origin `{}`", cfg.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST]);

    Ok(routes()
        .with_state(service)
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Args,
        services::graph_service::{GraphService, tests::settings_for},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use clap::Parser;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "inspection-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
                Part::File(name, file_name, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn post_inspection(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/inspection")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn test_app(server: &ServerGuard) -> Router {
        let cfg = AppConfig::resolve(Args::parse_from(["inspection-log"]), |_| None).unwrap();
        let graph = GraphService::new(reqwest::Client::new(), settings_for(&server.url()));
        app(InspectionService::new(graph), &cfg).unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn index_describes_service() {
        let server = Server::new_async().await;
        let req = Request::get("/").body(Body::empty()).unwrap();
        let (status, body) = send(test_app(&server), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "SharePoint Inspection API Server");
        assert_eq!(body["endpoints"]["inspection"], "POST /api/inspection");
    }

    #[tokio::test]
    async fn missing_inspector_is_400_without_upstream_calls() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let req = post_inspection(&[
            Part::Text("productName", "WIDGET-1"),
            Part::Text("inspector", ""),
        ]);
        let (status, body) = send(test_app(&server), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(body.get("detail").is_none());
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn front_only_submission_creates_record() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/tenant/oauth2/v2.0/token")
            .with_body(r#"{"access_token":"tok"}"#)
            .expect(2)
            .create_async()
            .await;
        let put = server
            .mock(
                "PUT",
                Matcher::Regex(
                    r"^/sites/site/drives/drive/root:/inspection-images/front_\d+\.jpg:/content$"
                        .into(),
                ),
            )
            .match_header("content-type", "image/jpeg")
            .match_body(Matcher::Exact("abc".into()))
            .with_body(r#"{"webUrl":"https://contoso/front.jpg"}"#)
            .expect(1)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/sites/site/lists/list/items")
            .match_body(Matcher::PartialJson(json!({
                "fields": {
                    "ProductName": "WIDGET-1",
                    "Inspector": "J. Lee",
                    "FrontImageUrl": "https://contoso/front.jpg",
                    "BackImageUrl": "",
                    "SideImageUrl": ""
                }
            })))
            .with_status(201)
            .with_body(r#"{"id":"99"}"#)
            .expect(1)
            .create_async()
            .await;

        let req = post_inspection(&[
            Part::Text("productName", "WIDGET-1"),
            Part::Text("inspector", "J. Lee"),
            Part::Text("note", ""),
            Part::Text("datamatrix", ""),
            Part::File("front", "IMG.JPG", "image/jpeg", b"abc"),
            Part::File("back", "", "application/octet-stream", b""),
        ]);
        let (status, body) = send(test_app(&server), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "ok": true,
                "itemId": "99",
                "images": { "frontUrl": "https://contoso/front.jpg" }
            })
        );
        put.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_is_500_with_detail() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/tenant/oauth2/v2.0/token")
            .with_body(r#"{"access_token":"tok"}"#)
            .create_async()
            .await;
        let _put = server
            .mock("PUT", Matcher::Any)
            .with_status(403)
            .with_body("accessDenied")
            .create_async()
            .await;
        let create = server
            .mock("POST", "/sites/site/lists/list/items")
            .expect(0)
            .create_async()
            .await;

        let req = post_inspection(&[
            Part::Text("productName", "WIDGET-1"),
            Part::Text("inspector", "J. Lee"),
            Part::File("front", "a.png", "image/png", b"png"),
        ]);
        let (status, body) = send(test_app(&server), req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "server error");
        assert_eq!(body["detail"], "Upload error: 403 accessDenied");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn second_file_for_same_side_is_rejected() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let req = post_inspection(&[
            Part::Text("productName", "WIDGET-1"),
            Part::Text("inspector", "J. Lee"),
            Part::File("side", "a.jpg", "image/jpeg", b"1"),
            Part::File("side", "b.jpg", "image/jpeg", b"2"),
        ]);
        let (status, _) = send(test_app(&server), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        upstream.assert_async().await;
    }
}
