use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::imap_probe::classifier::FailureKind;
use crate::onboarding::submission::ConnectionRequestDraft;
use crate::settings::ProbeConfig;
use crate::web::{create_router, submit_onboarding, test_imap, AppState, SUBMISSION_SAVED};

use super::fake_imap::{self, Script};
use super::{draft_from, submission_json};

fn state_for(output_dir: &Path) -> Arc<AppState> {
    Arc::new(AppState {
        output_dir: output_dir.to_path_buf(),
        probe: ProbeConfig {
            connect_timeout_secs: 5,
            auth_timeout_secs: 2,
            accept_invalid_certs: true,
        },
    })
}

fn connection_draft(value: Value) -> ConnectionRequestDraft {
    serde_json::from_value(value).unwrap()
}

async fn body_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_imap_endpoint_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let port = fake_imap::spawn(Script::Accept { exists: 12 }).await;
    let draft = connection_draft(json!({
        "host": "127.0.0.1",
        "port": port,
        "tls": false,
        "username": "office@acme.test",
        "password": "app-password-123"
    }));

    let response = test_imap(State(state_for(dir.path())), Ok(Json(draft)))
        .await
        .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": "Successfully connected and opened \"INBOX\" (12 message(s) found)."
        })
    );
}

#[tokio::test]
async fn test_imap_endpoint_rejects_incomplete_request() {
    let dir = tempfile::tempdir().unwrap();
    let draft = connection_draft(json!({ "host": "imap.acme.test", "port": "x", "tls": true }));

    let response = test_imap(State(state_for(dir.path())), Ok(Json(draft)))
        .await
        .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["error"],
        json!("IMAP port must be a valid integer. Username is required. Password is required.")
    );
}

#[tokio::test]
async fn test_imap_endpoint_classifies_probe_failure() {
    let dir = tempfile::tempdir().unwrap();
    let port = fake_imap::spawn(Script::RejectLogin).await;
    let draft = connection_draft(json!({
        "host": "127.0.0.1",
        "port": port.to_string(),
        "tls": false,
        "username": "office@acme.test",
        "password": "wrong"
    }));

    let response = test_imap(State(state_for(dir.path())), Ok(Json(draft)))
        .await
        .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": FailureKind::Authentication.message() })
    );
}

#[tokio::test]
async fn test_submit_lists_every_violation() {
    let dir = tempfile::tempdir().unwrap();
    let mut value = submission_json();
    value["pilot_consent"] = json!(false);
    value["tenant"]["primary_contact_email"] = json!("nobody");

    let response = submit_onboarding(State(state_for(dir.path())), Ok(Json(draft_from(value))))
        .await
        .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "success": false,
            "errors": [
                "Valid primary contact email is required.",
                "Pilot system acknowledgement is required."
            ]
        })
    );
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_submit_persists_accepted_submission() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("onboarding_output");

    let response = submit_onboarding(
        State(state_for(&output_dir)),
        Ok(Json(draft_from(submission_json()))),
    )
    .await
    .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!(SUBMISSION_SAVED));

    let file_id = body["file_id"].as_str().unwrap();
    let text = body["files"]["text"].as_str().unwrap();
    let json_file = body["files"]["json"].as_str().unwrap();
    assert!(text.ends_with(&format!("_Acme_Dental_Group_{}.txt", file_id)));
    assert!(output_dir.join(text).is_file());
    assert!(output_dir.join(json_file).is_file());
}

#[tokio::test]
async fn test_submit_hides_storage_details() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    fs::write(&blocker, "not a directory").unwrap();

    let response = submit_onboarding(
        State(state_for(&blocker.join("output"))),
        Ok(Json(draft_from(submission_json()))),
    )
    .await
    .into_response();
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Server error: could not create output directory."
        })
    );
}

async fn raw_post(port: u16, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_router_serves_both_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let router = create_router(state_for(dir.path()), 64 * 1024);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let response = raw_post(port, "/api/submit-onboarding", "{\"tenant\": ").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);
    assert!(response.contains("Malformed request body"), "{}", response);

    let response = raw_post(port, "/api/test-imap", "{}").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);
    assert!(response.contains("IMAP host is required."), "{}", response);

    let response = raw_post(
        port,
        "/api/test-imap",
        r#"{"host": 123, "port": 993, "tls": true, "username": "u", "password": "p"}"#,
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);
    assert!(response.contains("IMAP host is required."), "{}", response);
    assert!(!response.contains("invalid type"), "{}", response);

    let response = raw_post(port, "/api/unknown", "{}").await;
    assert!(response.starts_with("HTTP/1.1 404"), "{}", response);
}
