use std::sync::Arc;

use bookrev_auth::TokenManager;
use bookrev_dal::Pool;
use url::Url;

use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(tokens: TokenManager, app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                tokens,
                app_config,
                pool,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url> {
        let url = self.config().base_url.join(relative_url)?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }
}

/// Garde validation context (unit) required by `axum_valid::Garde` extractor
impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) {}
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
    /// Token cookie is sent only over https
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn new(base_url: Url) -> Self {
        let secure_cookies = base_url.scheme() == "https";
        AppConfig {
            base_url,
            default_page_size: 10,
            secure_cookies,
        }
    }
}
