// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, ScriptedEngine};
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(ScriptedEngine::new(Vec::new()));

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_version() {
    let app = create_test_app(ScriptedEngine::new(Vec::new()));

    let response = app.server.get("/version").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_favicon_returns_empty_object() {
    let app = create_test_app(ScriptedEngine::new(Vec::new()));

    let response = app.server.get("/favicon.ico").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({}));
}
