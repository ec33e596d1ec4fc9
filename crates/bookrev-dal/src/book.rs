use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool, Row};
use tracing::{debug, info};

use crate::{
    Batch, ChosenDB, ChosenRow, Error, FieldMap, Filter, ListingParams, Order, begin_write,
    error::Result, review::recompute_rating, user::UserShort,
};

const VALID_ORDER_FIELDS: &FieldMap = &[
    ("id", "b.id"),
    ("title", "b.title"),
    ("author", "b.author"),
    ("genre", "b.genre"),
    ("publishedYear", "b.published_year"),
    ("pages", "b.pages"),
    ("averageRating", "b.average_rating"),
    ("totalReviews", "b.total_reviews"),
    ("createdAt", "b.created"),
];

const VALID_FILTER_FIELDS: &FieldMap = &[
    ("title", "b.title"),
    ("author", "b.author"),
    ("genre", "b.genre"),
];

const SELECT_BOOK: &str = "SELECT b.id, b.title, b.author, b.genre, b.isbn, b.description, b.published_year, b.pages,
b.average_rating, b.total_reviews, b.added_by, u.username AS added_by_username, b.created, b.modified
FROM book b
JOIN users u ON b.added_by = u.id";

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

fn not_in_future(year: &i32, _ctx: &()) -> garde::Result {
    let current_year = time::OffsetDateTime::now_utc().year();
    if *year > current_year {
        Err(garde::Error::new(format!(
            "published year cannot be after {current_year}"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBook {
    #[garde(length(min = 1, max = 200), custom(not_blank))]
    pub title: String,
    #[garde(length(min = 1, max = 100), custom(not_blank))]
    pub author: String,
    #[garde(length(min = 1, max = 50), custom(not_blank))]
    pub genre: String,
    #[garde(length(min = 10, max = 17), pattern(r"^[0-9Xx-]+$"))]
    pub isbn: Option<String>,
    #[garde(length(max = 2000))]
    pub description: Option<String>,
    #[garde(inner(range(min = 1000), custom(not_in_future)))]
    pub published_year: Option<i32>,
    #[garde(range(min = 1))]
    pub pages: Option<i64>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub pages: Option<i64>,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub added_by: UserShort,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl sqlx::FromRow<'_, ChosenRow> for Book {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre: row.try_get("genre")?,
            isbn: row.try_get("isbn")?,
            description: row.try_get("description")?,
            published_year: row.try_get("published_year")?,
            pages: row.try_get("pages")?,
            average_rating: row.try_get("average_rating")?,
            total_reviews: row.try_get("total_reviews")?,
            added_by: UserShort {
                id: row.try_get("added_by")?,
                username: row.try_get("added_by_username")?,
            },
            created_at: row.try_get("created")?,
            updated_at: row.try_get("modified")?,
        })
    }
}

pub type BookRepository = BookRepositoryImpl<Pool<ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateBook, added_by: i64) -> Result<Book> {
        let result = sqlx::query(
            "INSERT INTO book (title, author, genre, isbn, description, published_year, pages, added_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payload.title.trim())
        .bind(payload.author.trim())
        .bind(payload.genre.trim())
        .bind(trimmed(payload.isbn))
        .bind(trimmed(payload.description))
        .bind(payload.published_year)
        .bind(payload.pages)
        .bind(added_by)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::on_unique_violation(e, "A book with this ISBN already exists"))?;

        let id = result.last_insert_rowid();
        debug!("Created book {id}");
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        let sql = format!("{SELECT_BOOK} WHERE b.id = ?");
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Book".to_string()))
    }

    /// Books matching params filters, newest first unless ordering is requested
    pub async fn list(&self, params: ListingParams) -> Result<Batch<Book>> {
        let order = params.ordering(
            VALID_ORDER_FIELDS,
            &[Order::Desc("createdAt".to_string())],
            Order::Desc("b.id".to_string()),
        )?;
        self.fetch_batch(params, &order).await
    }

    /// Books with title or author containing query, best rated first
    pub async fn search(&self, query: &str, params: ListingParams) -> Result<Batch<Book>> {
        let params = ListingParams {
            order: Some(vec![
                Order::Desc("averageRating".to_string()),
                Order::Desc("totalReviews".to_string()),
            ]),
            filter: Some(vec![Filter::any_contains(["title", "author"], query.trim())]),
            ..params
        };
        let order = params.ordering(VALID_ORDER_FIELDS, &[], Order::Asc("b.id".to_string()))?;
        self.fetch_batch(params, &order).await
    }

    async fn fetch_batch(&self, params: ListingParams, order: &str) -> Result<Batch<Book>> {
        let (conditions, values) = params.filtering(VALID_FILTER_FIELDS)?;

        let count_sql = format!("SELECT count(*) FROM book b {conditions}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &values {
            count_query = count_query.bind(value.as_str());
        }
        let total = count_query.fetch_one(&self.executor).await?;

        let sql = format!("{SELECT_BOOK} {conditions} ORDER BY {order} LIMIT ? OFFSET ?");
        let mut query = sqlx::query_as::<_, Book>(&sql);
        for value in &values {
            query = query.bind(value.as_str());
        }
        let rows = query
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

    /// Recomputes derived rating fields of all books, returns number of books processed
    pub async fn recompute_all_ratings(&self) -> Result<u64> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM book ORDER BY id")
            .fetch_all(&self.executor)
            .await?;
        let mut processed = 0;
        let mut conn = self.executor.acquire().await?;
        for id in ids {
            let mut tx = begin_write(&mut conn).await?;
            let summary = recompute_rating(&mut *tx, id).await?;
            tx.commit().await?;
            debug!(book_id = id, ?summary, "Recomputed rating");
            processed += 1;
        }
        info!("Recomputed ratings of {processed} books");
        Ok(processed)
    }
}
