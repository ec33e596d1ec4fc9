use axum::{extract::FromRequestParts, RequestPartsExt};
use axum_extra::TypedHeader;
use bookrev_types::claim::ApiClaim;
use cookie::{Cookie, Expiration, SameSite};
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tracing::{debug, error};

use super::TOKEN_COOKIE_NAME;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut header_token = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|h| h.0.token().to_string());

        if header_token.is_none() {
            let cookies = parts.extract::<Cookies>().await.map_err(|e| {
                error!("Cannot get cookies: {}", e.1);
                ApiError::InternalError(e.1.to_string())
            })?;
            header_token = cookies.get(TOKEN_COOKIE_NAME).map(|t| t.value().to_string());
        }

        match header_token {
            Some(token) => state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
                debug!("Failed to validate token: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }),
            None => {
                debug!("No token found");
                Err(ApiError::Unauthorized("Authentication required".to_string()))
            }
        }
    }
}

/// Local user id from validated claim
pub fn caller_id(claim: &ApiClaim) -> ApiResult<i64> {
    claim
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Token does not identify a user".to_string()))
}

/// Signs token for the user and also stores it in http only cookie, so browser clients need not handle it
pub fn issue_token(
    state: &AppState,
    cookies: &Cookies,
    user: &bookrev_dal::user::User,
) -> ApiResult<String> {
    let claim = ApiClaim::new_expired(user.id, &user.username);
    let signed_token = state.tokens().issue(claim)?;

    let cookie = Cookie::build((TOKEN_COOKIE_NAME, signed_token.clone()))
        .http_only(true)
        .secure(state.config().secure_cookies)
        .path("/")
        .same_site(SameSite::Lax)
        .expires(Expiration::DateTime(
            OffsetDateTime::now_utc() + state.tokens().default_validity(),
        ));
    cookies.add(cookie.into());

    Ok(signed_token)
}
