use std::path::Path;

use axum::{extract::DefaultBodyLimit, response::IntoResponse, routing::get, Json, Router};
use bookrev_app::{
    auth::auth_router,
    state::{AppConfig, AppState},
};
use futures::FutureExt;
use http::StatusCode;
use serde_json::json;
use time::OffsetDateTime;
use tokio::{fs, io::AsyncWriteExt as _};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::Result;

const SECRET_LENGTH: usize = 64;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state).layer(DefaultBodyLimit::max(args.body_limit_mb * 1024 * 1024));

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(feature = "openapi")]
fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::openapi::Components;

    #[derive(utoipa::OpenApi)]
    #[openapi(
        info(title = "Book reviews API"),
        modifiers(&SecurityAddon),
        security(("bearer" = []))
    )]
    struct OpenApi;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            openapi
                .components
                .get_or_insert_with(Components::new)
                .add_security_scheme(
                    "bearer",
                    SecurityScheme::Http(
                        HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build(),
                    ),
                );
        }
    }

    use utoipa::OpenApi as _;
    OpenApi::openapi()
        .nest("/api/auth", bookrev_app::auth::api_docs())
        .nest("/api/books", bookrev_app::rest_api::book::api_docs())
        .nest("/api/reviews", bookrev_app::rest_api::review::api_docs())
        .nest("/api/search", bookrev_app::search::api_docs())
}

pub fn main_router(state: AppState) -> Router<()> {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api/auth", auth_router())
        .nest("/api/books", bookrev_app::rest_api::book::router())
        .nest("/api/reviews", bookrev_app::rest_api::review::router())
        .nest("/api/search", bookrev_app::search::router())
        .layer(tower_cookies::CookieManagerLayer::new())
        .with_state(state)
        .route("/health", get(health));

    #[cfg(feature = "openapi")]
    {
        let docs = api_docs();
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs),
        );
    }
    router.layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    let timestamp = OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({"status": "OK", "timestamp": timestamp})),
    )
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !fs::try_exists(&data_dir).await? {
        fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    } else if !data_dir.is_dir() {
        anyhow::bail!("Data directory {data_dir:?} is not a directory");
    }

    let pool = bookrev_dal::new_pool(&config.database_url()).await?;

    let secret = read_secret(&data_dir).await?;
    let tokens = bookrev_auth::TokenManager::new(&secret, config.token_validity)?;

    let mut app_config = AppConfig::new(config.base_url.clone());
    app_config.default_page_size = config.default_page_size;
    debug!("Application state ready");
    Ok(AppState::new(tokens, app_config, pool))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; SECRET_LENGTH]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // readable only by owner
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        info!("Generated new token secret");
        random_bytes.to_vec()
    };
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secret_is_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let secret = read_secret(dir.path()).await.unwrap();
        assert_eq!(secret.len(), SECRET_LENGTH);
        let again = read_secret(dir.path()).await.unwrap();
        assert_eq!(secret, again);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            let meta = std::fs::metadata(dir.path().join("secret")).unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        }
    }
}
