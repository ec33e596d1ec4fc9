use bookrev_e2e_tests::{prepare_env, spawn_server};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let response = reqwest::get(base_url.join("health").unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
#[traced_test]
async fn test_api_docs() {
    let (args, _config_guard) = prepare_env("test_api_docs").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let response = reqwest::get(base_url.join("api-docs/openapi.json").unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    let docs: serde_json::Value = response.json().await.unwrap();
    assert!(docs["paths"]["/api/books"].is_object());
    assert!(docs["paths"]["/api/search"].is_object());
}
