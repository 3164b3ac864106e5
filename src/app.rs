use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, complaints, stats};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(complaints::router())
                .merge(stats::router())
                .route("/ping", get(ping))
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "message": state.config.ping_message }))
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod api_tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn raw(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_req(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut b = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().method(Method::GET).uri(uri);
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, email: &str, role: &str) -> (String, Value) {
        let (status, body) = send(
            app,
            json_req(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": email, "password": "password1", "name": "Test", "userType": role }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    async fn file_complaint(app: &Router, token: &str, category: &str) -> Value {
        let (status, body) = send(
            app,
            json_req(
                Method::POST,
                "/api/complaints",
                Some(token),
                json!({
                    "title": "Pothole on Main St",
                    "description": "Big enough to lose a wheel",
                    "category": category,
                    "location": { "latitude": 40.7, "longitude": -74.0, "address": "Main St" }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["complaint"].clone()
    }

    #[tokio::test]
    async fn end_to_end_complaint_lifecycle() {
        let app = app();
        let (citizen, u1) = register(&app, "u1@city.org", "public").await;
        let c1 = file_complaint(&app, &citizen, "roads").await;
        let id = c1["id"].as_str().unwrap();

        let (status, list) = send(&app, get_req("/api/complaints", Some(&citizen))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);
        assert_eq!(list["complaints"][0]["id"], c1["id"]);
        assert_eq!(list["complaints"][0]["status"], "pending");
        assert_eq!(list["complaints"][0]["createdBy"], u1["id"]);

        let (official, u2) = register(&app, "u2@city.gov", "government").await;
        let (status, body) = send(
            &app,
            json_req(
                Method::PATCH,
                &format!("/api/complaints/{id}"),
                Some(&official),
                json!({ "status": "resolved", "message": "Fixed pothole" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, body) =
            send(&app, get_req(&format!("/api/complaints/{id}"), Some(&citizen))).await;
        assert_eq!(status, StatusCode::OK);
        let complaint = &body["complaint"];
        assert_eq!(complaint["status"], "resolved");
        let updates = complaint["updates"].as_array().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["message"], "Fixed pothole");
        assert_eq!(updates[0]["createdBy"], u2["id"]);

        let (status, stats) = send(&app, get_req("/api/stats", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalComplaints"], 1);
        assert_eq!(stats["resolvedComplaints"], 1);
    }

    #[tokio::test]
    async fn register_and_login_responses() {
        let app = app();
        let (_, user) = register(&app, "jo@city.org", "public").await;
        assert!(user.get("password").is_none());
        assert!(user.get("passwordHash").is_none());
        assert_eq!(user["userType"], "public");

        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": "jo@city.org", "password": "different1", "name": "Other", "userType": "government" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already exists");

        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "jo@city.org", "password": "password1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], user["id"]);
        assert!(body["token"].as_str().is_some());

        let (status, _) = send(
            &app,
            json_req(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": "jo@city.org" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn short_password_and_malformed_json_are_bad_requests() {
        let app = app();
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/auth/register",
                None,
                json!({ "email": "a@b.io", "password": "1234567", "name": "A", "userType": "public" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Password must be at least 8 characters");

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn complaint_routes_require_a_valid_token() {
        let app = app();
        let (status, body) = send(&app, get_req("/api/complaints", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");

        let forged = format!("token_{}_{}", uuid::Uuid::new_v4(), 1_700_000_000_u64);
        let (status, _) = send(&app, get_req("/api/complaints", Some(&forged))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/complaints")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_requires_fields_and_starts_pending() {
        let app = app();
        let (token, _) = register(&app, "c@city.org", "public").await;

        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/complaints",
                Some(&token),
                json!({ "title": "No location", "description": "d", "category": "garbage" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Title, description, category, and location are required"
        );

        let c = file_complaint(&app, &token, "electricity").await;
        assert_eq!(c["status"], "pending");
        assert!(c["updates"].as_array().unwrap().is_empty());
        assert_eq!(c["location"]["address"], "Main St");
    }

    #[tokio::test]
    async fn create_accepts_multipart_forms() {
        let app = app();
        let (token, user) = register(&app, "m@city.org", "public").await;

        let boundary = "XBOUNDARYX";
        let mut body = String::new();
        for (name, value) in [
            ("title", "Broken streetlight"),
            ("description", "Out since Monday"),
            ("category", "electricity"),
            ("location", "Corner of 3rd and Pine"),
            ("latitude", "47.61"),
        ] {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"lamp.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nJPEGDATA\r\n--{boundary}--\r\n"
        ));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/complaints")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let c = &body["complaint"];
        assert_eq!(c["category"], "electricity");
        assert_eq!(c["location"]["address"], "Corner of 3rd and Pine");
        assert_eq!(c["location"]["latitude"], 47.61);
        assert_eq!(c["location"]["longitude"], 0.0);
        assert_eq!(c["imageUrl"], "lamp.jpg");
        assert_eq!(c["createdBy"], user["id"]);
    }

    #[tokio::test]
    async fn unknown_complaint_is_not_found() {
        let app = app();
        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let (official, _) = register(&app, "g@city.gov", "government").await;

        let missing = uuid::Uuid::new_v4();
        let (status, _) = send(
            &app,
            get_req(&format!("/api/complaints/{missing}"), Some(&citizen)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get_req("/api/complaints/not-a-uuid", Some(&citizen))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            json_req(
                Method::PATCH,
                &format!("/api/complaints/{missing}"),
                Some(&official),
                json!({ "status": "resolved" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Complaint not found");
    }

    #[tokio::test]
    async fn only_government_users_update_status() {
        let app = app();
        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let c = file_complaint(&app, &citizen, "garbage").await;
        let id = c["id"].as_str().unwrap();

        let (status, _) = send(
            &app,
            json_req(
                Method::PATCH,
                &format!("/api/complaints/{id}"),
                Some(&citizen),
                json!({ "status": "resolved" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let malformed = Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/complaints/{id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {citizen}"))
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let no_body = Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/complaints/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {citizen}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, no_body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = send(&app, get_req(&format!("/api/complaints/{id}"), Some(&citizen))).await;
        assert_eq!(body["complaint"]["status"], "pending");
    }

    #[tokio::test]
    async fn status_update_rules() {
        let app = app();
        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let (official, _) = register(&app, "g@city.gov", "government").await;
        let c = file_complaint(&app, &citizen, "roads").await;
        let uri = format!("/api/complaints/{}", c["id"].as_str().unwrap());

        let patch = |body: Value| json_req(Method::PATCH, &uri, Some(&official), body);

        let (status, _) = send(&app, patch(json!({ "status": "closed" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, patch(json!({ "message": "no status" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, patch(json!({ "status": "in-progress" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["complaint"]["updates"].as_array().unwrap().is_empty());

        let (status, body) = send(
            &app,
            patch(json!({ "status": "in-progress", "message": "Crew scheduled" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complaint"]["updates"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolved_complaints_can_be_reopened_by_default() {
        let app = app();
        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let (official, _) = register(&app, "g@city.gov", "government").await;
        let c = file_complaint(&app, &citizen, "roads").await;
        let uri = format!("/api/complaints/{}", c["id"].as_str().unwrap());

        let (status, _) = send(
            &app,
            json_req(Method::PATCH, &uri, Some(&official), json!({ "status": "resolved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            json_req(
                Method::PATCH,
                &uri,
                Some(&official),
                json!({ "status": "pending", "message": "reopened" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["complaint"]["status"], "pending");
        assert_eq!(body["complaint"]["updates"][0]["message"], "reopened");
    }

    #[tokio::test]
    async fn regression_rejected_when_disabled() {
        let mut state = AppState::fake();
        let mut config = (*state.config).clone();
        config.allow_status_regression = false;
        state.config = std::sync::Arc::new(config);
        let app = build_app(state);

        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let (official, _) = register(&app, "g@city.gov", "government").await;
        let c = file_complaint(&app, &citizen, "roads").await;
        let uri = format!("/api/complaints/{}", c["id"].as_str().unwrap());
        let patch = |body: Value| json_req(Method::PATCH, &uri, Some(&official), body);

        for forward in ["in-progress", "in-progress", "resolved"] {
            let (status, _) = send(&app, patch(json!({ "status": forward }))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, patch(json!({ "status": "pending" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot move complaint from resolved to pending");

        let (_, body) = send(&app, get_req(&uri, Some(&official))).await;
        assert_eq!(body["complaint"]["status"], "resolved");
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let app = app();
        let (token, _) = register(&app, "r@city.org", "public").await;
        let c = file_complaint(&app, &token, "other").await;
        let uri = format!("/api/complaints/{}", c["id"].as_str().unwrap());

        let (s1, first) = raw(&app, get_req(&uri, Some(&token))).await;
        let (s2, second) = raw(&app, get_req(&uri, Some(&token))).await;
        assert_eq!(s1, StatusCode::OK);
        assert_eq!(s2, StatusCode::OK);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_supports_status_filter_and_paging() {
        let app = app();
        let (citizen, _) = register(&app, "p@city.org", "public").await;
        let (official, _) = register(&app, "g@city.gov", "government").await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(file_complaint(&app, &citizen, "garbage").await["id"].clone());
        }
        let (status, _) = send(
            &app,
            json_req(
                Method::PATCH,
                &format!("/api/complaints/{}", ids[0].as_str().unwrap()),
                Some(&official),
                json!({ "status": "resolved" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get_req("/api/complaints?status=pending", Some(&citizen))).await;
        assert_eq!(body["total"], 2);

        let (_, body) = send(&app, get_req("/api/complaints?limit=1&offset=1", Some(&citizen))).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["complaints"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, get_req("/api/complaints?status=bogus", Some(&citizen))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_and_ping_are_public() {
        let app = app();
        let (status, stats) = send(&app, get_req("/api/stats", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalComplaints"], 0);
        assert_eq!(stats["resolvedComplaints"], 0);

        let (status, body) = send(&app, get_req("/api/ping", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "pong");

        let (status, body) = raw(&app, get_req("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }
}
