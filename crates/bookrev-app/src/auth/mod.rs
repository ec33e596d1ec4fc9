use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use axum_valid::Garde;
use bookrev_dal::user::{CreateUser, User, UserRepository};
use bookrev_types::claim::ApiClaim;
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::info;

use crate::{error::ApiResult, state::AppState};

pub mod token;

pub const TOKEN_COOKIE_NAME: &str = "bookrev_token";

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginCredentials {
    #[garde(length(min = 1, max = 255))]
    email: String,
    #[garde(length(min = 1, max = 255))]
    password: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthResponse {
    token: String,
    user: User,
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/signup", tag = "Auth",
responses((status = StatusCode::CREATED, description = "Registered new user", body = AuthResponse),
(status = StatusCode::CONFLICT, description = "Username or email already taken"))))]
pub async fn signup(
    State(state): State<AppState>,
    repository: UserRepository,
    cookies: Cookies,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository.create(payload).await?;
    info!(user_id = user.id, "New user {} registered", user.username);
    let token = token::issue_token(&state, &cookies, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/login", tag = "Auth",
responses((status = StatusCode::OK, description = "Logged in", body = AuthResponse),
(status = StatusCode::UNAUTHORIZED, description = "Invalid credentials"))))]
pub async fn login(
    State(state): State<AppState>,
    repository: UserRepository,
    cookies: Cookies,
    Garde(Json(credentials)): Garde<Json<LoginCredentials>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository
        .check_password(&credentials.email, &credentials.password)
        .await?;
    let token = token::issue_token(&state, &cookies, &user)?;
    Ok((StatusCode::OK, Json(AuthResponse { token, user })))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/me", tag = "Auth",
responses((status = StatusCode::OK, description = "Current user", body = User))))]
pub async fn me(claim: ApiClaim, repository: UserRepository) -> ApiResult<impl IntoResponse> {
    let user = repository.get(token::caller_id(&claim)?).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Builds authentication router - must be nested on /api/auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(signup, login, me))]
    struct ApiDocs;
    ApiDocs::openapi()
}
