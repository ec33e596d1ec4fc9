use std::{path::PathBuf, time::Duration};

use bookrev_types::config::BackendConfig;
pub use clap::Parser;
use url::Url;

use crate::error::Result;

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "Book review API server")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "BOOKREV_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "BOOKREV_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "BOOKREV_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server, as visible to users"
    )]
    pub base_url: Url,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        env = "BOOKREV_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Default token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "BOOKREV_BODY_LIMIT_MB",
        default_value = "10",
        help = "Maximum request body size in MB"
    )]
    pub body_limit_mb: usize,

    #[arg(
        long,
        env = "BOOKREV_DEFAULT_PAGE_SIZE",
        default_value = "10",
        value_parser = clap::value_parser!(u32).range(1..=100),
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "BOOKREV_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.backend.data_dir()
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }
}
