use axum::{extract::Path, response::IntoResponse, routing, Json};
use axum_valid::Garde;
use bookrev_dal::review::{CreateReview, ReviewRepository};
use bookrev_types::claim::ApiClaim;
use http::StatusCode;

use crate::{auth::token::caller_id, error::ApiResult, state::AppState};

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{id}", tag = "Review", params(("id" = i64, Path, description = "Review id")),
responses((status = StatusCode::OK, description = "Get one", body = bookrev_dal::review::Review))))]
pub async fn get(Path(id): Path<i64>, repository: ReviewRepository) -> ApiResult<impl IntoResponse> {
    let review = repository.get(id).await?;
    Ok((StatusCode::OK, Json(review)))
}

#[cfg_attr(feature = "openapi", utoipa::path(put, path = "/{id}", tag = "Review", params(("id" = i64, Path, description = "Review id")),
responses((status = StatusCode::OK, description = "Updated review", body = bookrev_dal::review::Review),
(status = StatusCode::FORBIDDEN, description = "Review belongs to other user"))))]
pub async fn update(
    Path(id): Path<i64>,
    claim: ApiClaim,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let review = repository.update(id, caller_id(&claim)?, payload).await?;
    Ok((StatusCode::OK, Json(review)))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{id}", tag = "Review", params(("id" = i64, Path, description = "Review id")),
responses((status = StatusCode::NO_CONTENT, description = "Deleted review"),
(status = StatusCode::FORBIDDEN, description = "Review belongs to other user"))))]
pub async fn delete(
    Path(id): Path<i64>,
    claim: ApiClaim,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id, caller_id(&claim)?).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/{id}", routing::get(get).put(update).delete(delete))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(get, update, delete))]
    struct ApiDocs;
    ApiDocs::openapi()
}
