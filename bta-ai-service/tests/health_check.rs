//! Integration tests against a spawned server.
//!
//! The OpenAI key is a dummy: nothing here reaches the provider.
//! Run with: cargo test -p bta-ai-service --test health_check

use bta_ai_service::config::BtaConfig;
use bta_ai_service::startup::{Application, ANALYSIS_PATH};
use reqwest::Client;
use std::time::Duration;

const ALLOWED_ORIGIN: &str = "https://brainhealth.example.com";

/// Spawn the application on a random port and return the port number.
async fn spawn_app() -> u16 {
    // Set test environment variables
    std::env::set_var("ENVIRONMENT", "test");
    std::env::set_var("APP__PORT", "0"); // Random port
    std::env::set_var("BTA_ALLOWED_ORIGINS", ALLOWED_ORIGIN);
    std::env::set_var("OPENAI_API_KEY", "test-api-key");
    std::env::set_var("OPENAI_BASE_URL", "http://127.0.0.1:9");

    let config = BtaConfig::load().expect("Failed to load config");
    let app = Application::build(config)
        .await
        .expect("Failed to build application");

    let port = app.port();

    // Spawn the server in the background
    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let port = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bta-ai-service");
    assert_eq!(body["generation_configured"], true);
}

#[tokio::test]
async fn readiness_check_returns_ok() {
    let port = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(format!("http://localhost:{}/ready", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn cross_origin_post_is_refused_over_the_wire() {
    let port = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(format!("http://localhost:{}{}", port, ANALYSIS_PATH))
        .header("origin", "https://evil.example.net")
        .json(&serde_json::json!({"mode": "full_report", "bta_payload": {"score": 42}}))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 403);
    assert_eq!(response.headers()["access-control-allow-origin"], "null");
    assert_eq!(response.headers()["vary"], "Origin");
}
