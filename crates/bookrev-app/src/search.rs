use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use axum_valid::Garde;
use bookrev_dal::book::{Book, BookRepository};
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    rest_api::{Pagination, Paging},
    state::AppState,
};

pub const MIN_QUERY_LENGTH: usize = 2;

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SearchQuery {
    /// Searched in book titles and authors, at least 2 characters
    #[garde(length(max = 255))]
    q: String,
    #[garde(range(min = 1))]
    page: Option<u32>,
    #[garde(range(min = 1, max = 100))]
    limit: Option<u32>,
}

impl SearchQuery {
    /// Trimmed query, if long enough
    fn terms(&self) -> ApiResult<&str> {
        let terms = self.q.trim();
        if terms.chars().count() < MIN_QUERY_LENGTH {
            return Err(ApiError::InvalidQuery(format!(
                "Search query must be at least {MIN_QUERY_LENGTH} characters long"
            )));
        }
        Ok(terms)
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResult {
    query: String,
    books: Vec<Book>,
    pagination: Pagination,
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Search", params(SearchQuery),
responses((status = StatusCode::OK, description = "Search", body = SearchResult),
(status = StatusCode::BAD_REQUEST, description = "Query too short"))))]
pub async fn search(
    repository: BookRepository,
    State(state): State<AppState>,
    Garde(Query(query)): Garde<Query<SearchQuery>>,
) -> ApiResult<impl IntoResponse> {
    let terms = query.terms()?.to_string();
    let paging = Paging {
        page: query.page,
        limit: query.limit,
        ..Default::default()
    };
    let default_page_size = state.config().default_page_size;
    let page = paging.page();
    let page_size = paging.page_size(default_page_size);
    let batch = repository
        .search(&terms, paging.into_listing_params(default_page_size)?)
        .await?;
    debug!("Search for {terms:?} found {} books", batch.total);
    Ok((
        StatusCode::OK,
        Json(SearchResult {
            query: terms,
            books: batch.rows,
            pagination: Pagination::new(page, page_size, batch.total),
        }),
    ))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/", axum::routing::get(search))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(search))]
    struct ApiDocs;
    ApiDocs::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(q: &str) -> SearchQuery {
        SearchQuery {
            q: q.to_string(),
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_short_query_rejected() {
        for q in ["", "a", "  a  ", " "] {
            assert!(matches!(query(q).terms(), Err(ApiError::InvalidQuery(_))));
        }
    }

    #[test]
    fn test_query_trimmed() {
        assert_eq!(query("  tolkien ").terms().unwrap(), "tolkien");
        assert_eq!(query("ab").terms().unwrap(), "ab");
    }
}
