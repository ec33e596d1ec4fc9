use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool, Row};
use tracing::debug;

use crate::{
    Batch, ChosenConnection, ChosenDB, ChosenRow, Error, ListingParams, begin_write,
    error::Result, user::UserShort,
};

const SELECT_REVIEW: &str = "SELECT r.id, r.book_id, r.user_id, u.username, r.rating, r.comment, r.created, r.modified
FROM review r
JOIN users u ON r.user_id = u.id";

const DUPLICATE_REVIEW: &str = "You have already reviewed this book";

/// Derived rating fields of a book
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl RatingSummary {
    /// Mean of ratings rounded half up to one decimal place, 0 for no reviews.
    /// Rounding is done in integer arithmetic on tenths, so 4.25 gives 4.3 and never 4.2
    pub fn from_totals(count: i64, sum: i64) -> Self {
        if count <= 0 {
            return RatingSummary {
                average_rating: 0.0,
                total_reviews: 0,
            };
        }
        let tenths = (20 * sum + count) / (2 * count);
        RatingSummary {
            average_rating: tenths as f64 / 10.0,
            total_reviews: count,
        }
    }
}

/// Recalculates book's average rating and review count from its current reviews.
/// Should run in same transaction as the review change that triggered it.
pub async fn recompute_rating(conn: &mut ChosenConnection, book_id: i64) -> Result<RatingSummary> {
    let (count, sum): (i64, i64) =
        sqlx::query_as("SELECT count(*), coalesce(sum(rating), 0) FROM review WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&mut *conn)
            .await?;
    let summary = RatingSummary::from_totals(count, sum);
    let res = sqlx::query("UPDATE book SET average_rating = ?, total_reviews = ? WHERE id = ?")
        .bind(summary.average_rating)
        .bind(summary.total_reviews)
        .bind(book_id)
        .execute(&mut *conn)
        .await?;
    if res.rows_affected() == 0 {
        return Err(Error::RecordNotFound("Book".to_string()));
    }
    Ok(summary)
}

fn normalized_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Review content, used both for new review and for its update
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateReview {
    #[garde(range(min = 1, max = 5))]
    pub rating: i64,
    #[garde(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub user: UserShort,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl sqlx::FromRow<'_, ChosenRow> for Review {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Review {
            id: row.try_get("id")?,
            book_id: row.try_get("book_id")?,
            user: UserShort {
                id: row.try_get("user_id")?,
                username: row.try_get("username")?,
            },
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created")?,
            updated_at: row.try_get("modified")?,
        })
    }
}

async fn fetch_review(conn: &mut ChosenConnection, id: i64) -> Result<Review> {
    let sql = format!("{SELECT_REVIEW} WHERE r.id = ?");
    sqlx::query_as::<_, Review>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
}

/// Book id of the review, if review exists and belongs to user
async fn owned_review_book(conn: &mut ChosenConnection, id: i64, user_id: i64) -> Result<i64> {
    let (book_id, owner_id): (i64, i64) =
        sqlx::query_as("SELECT book_id, user_id FROM review WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))?;
    if owner_id != user_id {
        return Err(Error::NotOwner("review".to_string()));
    }
    Ok(book_id)
}

pub type ReviewRepository = ReviewRepositoryImpl<Pool<ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Adds user's review of the book and updates book's rating, user can review book only once
    pub async fn create(&self, book_id: i64, user_id: i64, payload: CreateReview) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;

        let book_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM book WHERE id = ?")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if book_exists.is_none() {
            return Err(Error::RecordNotFound("Book".to_string()));
        }

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE book_id = ? AND user_id = ?")
                .bind(book_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(Error::Conflict(DUPLICATE_REVIEW.to_string()));
        }

        let id = sqlx::query("INSERT INTO review (book_id, user_id, rating, comment) VALUES (?, ?, ?, ?)")
            .bind(book_id)
            .bind(user_id)
            .bind(payload.rating)
            .bind(normalized_comment(payload.comment))
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::on_unique_violation(e, DUPLICATE_REVIEW))?
            .last_insert_rowid();

        let summary = recompute_rating(&mut *tx, book_id).await?;
        let review = fetch_review(&mut *tx, id).await?;
        tx.commit().await?;
        debug!(book_id, review_id = id, ?summary, "Created review");
        Ok(review)
    }

    pub async fn get(&self, id: i64) -> Result<Review> {
        let sql = format!("{SELECT_REVIEW} WHERE r.id = ?");
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    /// Only author of the review can update it
    pub async fn update(&self, id: i64, user_id: i64, payload: CreateReview) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let book_id = owned_review_book(&mut *tx, id, user_id).await?;

        sqlx::query(
            "UPDATE review SET rating = ?, comment = ?, modified = datetime('now') WHERE id = ?",
        )
        .bind(payload.rating)
        .bind(normalized_comment(payload.comment))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let summary = recompute_rating(&mut *tx, book_id).await?;
        let review = fetch_review(&mut *tx, id).await?;
        tx.commit().await?;
        debug!(book_id, review_id = id, ?summary, "Updated review");
        Ok(review)
    }

    /// Only author of the review can delete it
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<()> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let book_id = owned_review_book(&mut *tx, id, user_id).await?;

        sqlx::query("DELETE FROM review WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let summary = recompute_rating(&mut *tx, book_id).await?;
        tx.commit().await?;
        debug!(book_id, review_id = id, ?summary, "Deleted review");
        Ok(())
    }

    /// Reviews of the book, newest first
    pub async fn list_for_book(&self, book_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&self.executor)
            .await?;

        let sql =
            format!("{SELECT_REVIEW} WHERE r.book_id = ? ORDER BY r.created DESC, r.id DESC LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(book_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            total: total.try_into().unwrap_or_default(),
            rows,
        })
    }

    pub async fn recompute_rating(&self, book_id: i64) -> Result<RatingSummary> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let summary = recompute_rating(&mut *tx, book_id).await?;
        tx.commit().await?;
        Ok(summary)
    }
}
