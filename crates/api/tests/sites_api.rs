//! Site endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, credential, site_body, OTHER_SUBJECT, OTHER_USERNAME, SUBJECT, USERNAME};
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../db/migrations")]
async fn create_site_returns_id(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let response = app.post_json("/api/v1/sites", Some(SUBJECT), site_body()).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let response = app.get(&format!("/api/v1/sites/{id}"), Some(SUBJECT)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let site = body_json(response).await;
    assert_eq!(site["data"]["name"], "abe");
    assert_eq!(site["data"]["state"], "NEW");
    assert_eq!(site["data"]["subject"], SUBJECT);
    assert_eq!(site["data"]["local_username"], USERNAME);
    assert_eq!(site["data"]["staging_service"]["service_type"], "GT2");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_site_requires_name(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let mut body = site_body();
    body.as_object_mut().unwrap().remove("name");

    let response = app.post_json("/api/v1/sites", Some(SUBJECT), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Site must have name");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_site_requires_condor_package_or_version(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let mut body = site_body();
    body.as_object_mut().unwrap().remove("condor_version");

    let response = app.post_json("/api/v1/sites", Some(SUBJECT), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Must specify condor package OR condor version"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_missing_site_is_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let response = app.get("/api/v1/sites/42", Some(SUBJECT)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Site 42 not found");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_defaults_to_callers_sites(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    app.create_site(SUBJECT).await;
    app.create_site(OTHER_SUBJECT).await;

    let mine = body_json(app.get("/api/v1/sites", Some(SUBJECT)).await).await;
    let mine = mine["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["local_username"], USERNAME);

    let theirs = body_json(
        app.get(&format!("/api/v1/sites?user={OTHER_USERNAME}"), Some(SUBJECT))
            .await,
    )
    .await;
    let theirs = theirs["data"].as_array().unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0]["local_username"], OTHER_USERNAME);

    let all = body_json(app.get("/api/v1/sites?all=true", Some(SUBJECT)).await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_starts_staging(pool: SqlitePool) {
    let mut app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;

    let response = app
        .post_json(
            &format!("/api/v1/sites/{id}/submit"),
            Some(SUBJECT),
            json!({ "credential": credential(12) }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    app.pump().await;

    let site = body_json(app.get(&format!("/api/v1/sites/{id}"), Some(SUBJECT)).await).await;
    assert_eq!(site["data"]["state"], "STAGING");
    assert_eq!(site["data"]["short_message"], "Staging executables");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_with_short_credential_fails_site(pool: SqlitePool) {
    let mut app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;

    let response = app
        .post_json(
            &format!("/api/v1/sites/{id}/submit"),
            Some(SUBJECT),
            json!({ "credential": credential(0) }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    app.pump().await;

    let site = body_json(app.get(&format!("/api/v1/sites/{id}"), Some(SUBJECT)).await).await;
    assert_eq!(site["data"]["state"], "FAILED");
    assert_eq!(site["data"]["short_message"], "Not enough time left on credential");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_requires_credential(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;

    let response = app
        .post_json(&format!("/api/v1/sites/{id}/submit"), Some(SUBJECT), json!({}))
        .await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn remove_without_credential_is_rejected(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;

    let response = app
        .post_json(&format!("/api/v1/sites/{id}/remove"), Some(SUBJECT), json!({}))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Must provide a credential to remove a site"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn forced_remove_deletes_site(pool: SqlitePool) {
    let mut app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;

    let response = app
        .post_json(
            &format!("/api/v1/sites/{id}/remove"),
            Some(SUBJECT),
            json!({ "force": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    app.pump().await;

    let response = app.get(&format!("/api/v1/sites/{id}"), Some(SUBJECT)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let all = body_json(app.get("/api/v1/sites?all=true", Some(SUBJECT)).await).await;
    assert!(all["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn history_lists_state_changes(pool: SqlitePool) {
    let mut app = common::build_test_app(pool);
    let id = app.create_site(SUBJECT).await;
    app.post_json(
        &format!("/api/v1/sites/{id}/submit"),
        Some(SUBJECT),
        json!({ "credential": credential(12) }),
    )
    .await;
    app.pump().await;

    let response = app
        .get(&format!("/api/v1/sites/{id}/history"), Some(OTHER_SUBJECT))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entries = json["data"].as_array().unwrap();
    let states: Vec<_> = entries.iter().map(|e| e["state"].as_str().unwrap()).collect();
    assert_eq!(states, vec!["NEW", "STAGING"]);
    assert!(entries.iter().all(|e| e["id"] == id));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn history_of_unknown_site_is_404(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let response = app.get("/api/v1/sites/42/history", Some(SUBJECT)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Site 42 not found");
}
