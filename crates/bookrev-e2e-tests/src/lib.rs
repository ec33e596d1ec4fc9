use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use bookrev_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::{
    Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::json;
use tempfile::TempDir;
use tracing::{debug, info};

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps temporary data directory alive for the duration of the test
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let base_url = format!("http://127.0.0.1:{}/", port);
    let args = &[
        "bookrev-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir)
}

/// Starts server in background and waits until it answers health check
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = args.base_url.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = bookrev_server::run(args).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Server is up");
                return Ok(());
            }
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    Err(anyhow!("Server did not start in time"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUser {
    Alice,
    Bob,
    Carol,
}

impl TestUser {
    pub fn username(&self) -> &'static str {
        match self {
            TestUser::Alice => "alice",
            TestUser::Bob => "bob",
            TestUser::Carol => "carol",
        }
    }

    pub fn email(&self) -> String {
        format!("{}@example.com", self.username())
    }

    pub fn password(&self) -> &'static str {
        "password123"
    }
}

/// Registers user through API and returns its token
pub async fn signup(base_url: &Url, user: TestUser) -> Result<String> {
    let response = reqwest::Client::new()
        .post(base_url.join("api/auth/signup")?)
        .json(&json!({
            "username": user.username(),
            "email": user.email(),
            "password": user.password(),
        }))
        .send()
        .await?;
    if response.status() != reqwest::StatusCode::CREATED {
        return Err(anyhow!("Signup failed with status {}", response.status()));
    }
    let body: serde_json::Value = response.json().await?;
    body["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Missing token in signup response"))
}

/// Client sending bearer token of newly registered user with every request
pub async fn user_client(base_url: &Url, user: TestUser) -> Result<reqwest::Client> {
    let token = signup(base_url, user).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Spawns server and returns client authenticated as given user, together with server base url
pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(reqwest::Client, Url)> {
    let base_url = args.base_url.clone();
    spawn_server(args).await?;
    let client = user_client(&base_url, user).await?;
    info!("Test environment ready at {base_url}");
    Ok((client, base_url))
}

pub fn extend_url(url: &Url, segment: impl std::fmt::Display) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("Invalid URL")
        .push(&segment.to_string());
    url
}
