//! Client decoding against a stub service.

use std::collections::HashMap;

use assert_matches::assert_matches;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use corral_cli::client::{ClientError, ListQuery, ServiceClient};
use corral_core::site::CreateSite;
use corral_core::state::GlideinState;
use serde_json::{json, Value};

const SUBJECT: &str = "/DC=org/DC=doegrids/OU=People/CN=Gideon Juve";

async fn create_site(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let subject = headers
        .get("x-client-subject")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if subject != SUBJECT || body["name"] != "abe" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad request"})));
    }
    (StatusCode::CREATED, Json(json!({"data": {"id": 7}})))
}

async fn get_site(Path(id): Path<i64>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("Site {id} not found"), "code": "NOT_FOUND"})),
    )
}

async fn list_sites(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    // Anything but `?all=true` gets a body the client cannot decode.
    if params.get("all").map(String::as_str) == Some("true") && !params.contains_key("user") {
        Json(json!({"data": []}))
    } else {
        Json(json!({"data": null}))
    }
}

async fn remove_glidein() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn glidein_history(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({"data": [
        {"id": id, "state": "NEW", "time": "2009-04-01T13:05:00Z"},
        {"id": id, "state": "QUEUED", "time": "2009-04-01T13:07:30Z"}
    ]}))
}

async fn submit_glidein() -> StatusCode {
    StatusCode::ACCEPTED
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/v1/sites", post(create_site).get(list_sites))
        .route("/api/v1/sites/{id}", get(get_site))
        .route("/api/v1/glideins/{id}/remove", post(remove_glidein))
        .route("/api/v1/glideins/{id}/submit", post(submit_glidein))
        .route("/api/v1/glideins/{id}/history", get(glidein_history));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> ServiceClient {
    ServiceClient::new(base, Some(SUBJECT.to_string()))
}

#[tokio::test]
async fn create_returns_id_and_sends_subject() {
    let base = spawn_stub().await;
    let req = CreateSite {
        name: Some("abe".to_string()),
        ..Default::default()
    };
    assert_eq!(client(&base).create_site(&req).await.unwrap(), 7);
}

#[tokio::test]
async fn error_body_becomes_message() {
    let base = spawn_stub().await;
    let err = client(&base).get_site(42).await.unwrap_err();
    assert_eq!(err.to_string(), "Site 42 not found");
    assert_matches!(err, ClientError::Api { status, .. } if status == StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_json_error_keeps_status() {
    let base = spawn_stub().await;
    let err = client(&base).remove_glidein(3, true).await.unwrap_err();
    assert_eq!(err.to_string(), "Service returned 500 Internal Server Error: boom");
}

#[tokio::test]
async fn empty_accepted_body_is_ok() {
    let base = spawn_stub().await;
    let credential = corral_core::credential::Credential {
        pem: "-----BEGIN CERTIFICATE-----\n".to_string(),
        expires_at: chrono::Utc::now(),
    };
    client(&base).submit_glidein(3, &credential).await.unwrap();
}

#[tokio::test]
async fn list_query_omits_defaults() {
    let base = spawn_stub().await;
    let all = ListQuery {
        user: None,
        all: true,
    };
    assert!(client(&base).list_sites(&all).await.unwrap().is_empty());

    // Without `all` the stub answers with a body that does not decode.
    let err = client(&base).list_sites(&ListQuery::default()).await.unwrap_err();
    assert_matches!(err, ClientError::Request(_));
}

#[tokio::test]
async fn unreachable_service() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).get_site(1).await.unwrap_err();
    assert_matches!(err, ClientError::Request(_));
    assert!(err.to_string().starts_with("Error communicating with service"));
}

#[tokio::test]
async fn history_decodes_entries() {
    let base = spawn_stub().await;
    let history = client(&base).glidein_history(5).await.unwrap();

    let states: Vec<_> = history.iter().map(|e| e.state).collect();
    assert_eq!(states, vec![GlideinState::New, GlideinState::Queued]);
    assert!(history.iter().all(|e| e.id == 5));
}
