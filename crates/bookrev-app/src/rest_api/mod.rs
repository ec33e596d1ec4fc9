use bookrev_dal::{Filter, ListingParams, Order};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub mod book;
pub mod review;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct Paging {
    #[garde(range(min = 1))]
    pub page: Option<u32>,
    #[garde(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    /// Case insensitive substring of author
    #[garde(length(max = 100))]
    pub author: Option<String>,
    /// Case insensitive substring of genre
    #[garde(length(max = 50))]
    pub genre: Option<String>,
    #[garde(length(max = 100))]
    pub sort_by: Option<String>,
    /// Applies only together with sortBy
    #[garde(skip)]
    pub sort_order: Option<SortOrder>,
}

impl Paging {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.limit.unwrap_or(default_page_size).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let page_size = self.page_size(default_page_size);
        let offset = u64::from(self.page().saturating_sub(1)) * u64::from(page_size);
        let mut params = ListingParams::new(
            i64::try_from(offset).map_err(|_| ApiError::InvalidQuery("Page too big".into()))?,
            page_size.into(),
        );

        if let Some(sort_by) = self.sort_by {
            let field = match sort_by.trim() {
                "" => return Err(ApiError::InvalidQuery("Empty sortBy".to_string())),
                name => name.to_string(),
            };
            let order = match self.sort_order.unwrap_or_default() {
                SortOrder::Asc => Order::Asc(field),
                SortOrder::Desc => Order::Desc(field),
            };
            params = params.with_order(vec![order]);
        }

        for (field, value) in [("author", self.author), ("genre", self.genre)] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params = params.with_filter(Filter::contains(field, value));
            }
        }

        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(current_page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = u32::try_from(total.div_ceil(u64::from(page_size.max(1))))
            .unwrap_or(u32::MAX);
        Pagination {
            current_page,
            page_size,
            total_pages,
            total,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}
