use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing, Json,
};
use axum_valid::Garde;
use bookrev_dal::{
    book::{Book, BookRepository, CreateBook},
    review::{CreateReview, Review, ReviewRepository},
    ListingParams,
};
use bookrev_types::claim::ApiClaim;
use http::{header, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::{Pagination, Paging};
use crate::{
    auth::token::caller_id,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookPage {
    pub books: Vec<Book>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookDetail {
    pub book: Book,
    pub reviews: Vec<Review>,
    pub pagination: Pagination,
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Book",
responses((status = StatusCode::CREATED, description = "Created book", body = Book),
(status = StatusCode::CONFLICT, description = "ISBN already used"))))]
pub async fn create(
    claim: ApiClaim,
    repository: BookRepository,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<CreateBook>>,
) -> ApiResult<impl IntoResponse> {
    let book = repository.create(payload, caller_id(&claim)?).await?;
    let location = state
        .build_url(&format!("api/books/{}", book.id))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location.to_string())],
        Json(book),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Book", params(Paging),
responses((status = StatusCode::OK, description = "List paginated", body = BookPage))))]
pub async fn list(
    repository: BookRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    debug!("Paging: {:?}", paging);
    let default_page_size = state.config().default_page_size;
    let page = paging.page();
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params).await?;
    Ok((
        StatusCode::OK,
        Json(BookPage {
            pagination: Pagination::new(page, page_size, batch.total),
            books: batch.rows,
        }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{id}", tag = "Book", params(("id" = i64, Path, description = "Book id"), Paging),
responses((status = StatusCode::OK, description = "Book with page of its reviews", body = BookDetail))))]
pub async fn get(
    Path(id): Path<i64>,
    repository: BookRepository,
    reviews: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let book = repository.get(id).await?;
    let page = paging.page();
    let page_size = paging.page_size(state.config().default_page_size);
    let ListingParams { offset, limit, .. } =
        paging.into_listing_params(state.config().default_page_size)?;
    let batch = reviews
        .list_for_book(id, ListingParams::new(offset, limit))
        .await?;
    Ok((
        StatusCode::OK,
        Json(BookDetail {
            book,
            reviews: batch.rows,
            pagination: Pagination::new(page, page_size, batch.total),
        }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/{id}/reviews", tag = "Book", params(("id" = i64, Path, description = "Book id")),
responses((status = StatusCode::CREATED, description = "Added review", body = Review),
(status = StatusCode::CONFLICT, description = "Book already reviewed by caller"))))]
pub async fn add_review(
    Path(id): Path<i64>,
    claim: ApiClaim,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let review = repository.create(id, caller_id(&claim)?, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", routing::post(create).get(list))
        .route("/{id}", routing::get(get))
        .route("/{id}/reviews", routing::post(add_review))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(create, list, get, add_review))]
    struct ApiDocs;
    ApiDocs::openapi()
}
