pub mod book;
pub mod error;
pub mod review;
pub mod user;

use std::{fmt::Display, str::FromStr as _};

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{
    Connection as _, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type ChosenConnection = sqlx::SqliteConnection;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const MAX_LIMIT: usize = 10_000;

/// Options for every connection - foreign keys on and `REGEXP` function registered for substring filters
pub fn connect_options(database_url: &str) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .with_regexp();
    Ok(options)
}

/// Opens (and creates if needed) database and brings schema up to date
pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let options = connect_options(database_url)?;
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    debug!("Database schema is up to date");
    Ok(())
}

/// Transaction holding database write lock from its start.
/// Deferred transaction that reads first cannot wait for the lock when upgrading to write
pub(crate) async fn begin_write(
    conn: &mut ChosenConnection,
) -> Result<Transaction<'_, ChosenDB>> {
    let tx = conn.begin_with("BEGIN IMMEDIATE").await?;
    Ok(tx)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Order {
    fn with_name(&self, name: &str) -> Order {
        match self {
            Order::Asc(_) => Order::Asc(name.to_string()),
            Order::Desc(_) => Order::Desc(name.to_string()),
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{}", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

/// Case insensitive (full Unicode case folding) substring match on any of given fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub fields: Vec<String>,
    pub value: String,
}

impl Filter {
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter {
            fields: vec![field.into()],
            value: value.into(),
        }
    }

    pub fn any_contains<I, S>(fields: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter {
            fields: fields.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// Regular expression matching value literally anywhere in text, ignoring case
    pub fn pattern(&self) -> String {
        format!("(?i){}", regex::escape(&self.value))
    }
}

/// Maps public field names to SQL columns
pub type FieldMap = [(&'static str, &'static str)];

fn column_for(fields: &FieldMap, name: &str) -> Option<&'static str> {
    fields
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, column)| *column)
}

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<Vec<Order>>,
    pub filter: Option<Vec<Filter>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT as i64,
            order: None,
            filter: None,
        }
    }
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            order: None,
            filter: None,
        }
    }

    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter.get_or_insert_with(Vec::new).push(filter);
        self
    }

    /// ORDER BY clause content - requested ordering or default, always completed by tie breaker column,
    /// so same params give same rows
    pub fn ordering(
        &self,
        valid_fields: &FieldMap,
        default: &[Order],
        tie_breaker: Order,
    ) -> Result<String> {
        let requested = match self.order.as_deref() {
            Some(order) if !order.is_empty() => order,
            _ => default,
        };
        let mut clauses = requested
            .iter()
            .map(|o| {
                column_for(valid_fields, o.as_ref())
                    .map(|column| o.with_name(column).to_string())
                    .ok_or_else(|| Error::InvalidOrderByField(o.as_ref().to_string()))
            })
            .collect::<Result<Vec<String>>>()?;
        clauses.push(tie_breaker.to_string());
        Ok(clauses.join(", "))
    }

    /// WHERE clause (empty if no filters) and values to bind to it in order
    pub fn filtering(&self, valid_fields: &FieldMap) -> Result<(String, Vec<String>)> {
        let filters = match self.filter.as_deref() {
            Some(filters) if !filters.is_empty() => filters,
            _ => return Ok((String::new(), Vec::new())),
        };

        let mut conditions = Vec::with_capacity(filters.len());
        let mut values = Vec::new();
        for filter in filters {
            if filter.fields.is_empty() {
                return Err(Error::InvalidFilterField(String::new()));
            }
            let pattern = filter.pattern();
            let alternatives = filter
                .fields
                .iter()
                .map(|name| {
                    column_for(valid_fields, name)
                        .map(|column| format!("{column} REGEXP ?"))
                        .ok_or_else(|| Error::InvalidFilterField(name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            values.extend(std::iter::repeat_n(pattern, alternatives.len()));
            conditions.push(format!("({})", alternatives.join(" OR ")));
        }

        Ok((format!("WHERE {}", conditions.join(" AND ")), values))
    }
}

/// One page of listed records together with total count of matching records
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub offset: i64,
    pub limit: i64,
    pub total: u64,
    pub rows: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &FieldMap = &[
        ("title", "b.title"),
        ("author", "b.author"),
        ("createdAt", "b.created"),
    ];

    #[test]
    fn test_default_ordering() {
        let params = ListingParams::new(0, 10);
        let order = params
            .ordering(
                FIELDS,
                &[Order::Desc("createdAt".into())],
                Order::Desc("b.id".into()),
            )
            .unwrap();
        assert_eq!(order, "b.created DESC, b.id DESC");
    }

    #[test]
    fn test_requested_ordering() {
        let params = ListingParams::new(0, 10).with_order(vec![
            Order::Asc("author".into()),
            Order::Desc("title".into()),
        ]);
        let order = params
            .ordering(FIELDS, &[], Order::Asc("b.id".into()))
            .unwrap();
        assert_eq!(order, "b.author, b.title DESC, b.id");
    }

    #[test]
    fn test_invalid_ordering() {
        let params =
            ListingParams::new(0, 10).with_order(vec![Order::Asc("1; DROP TABLE book".into())]);
        let res = params.ordering(FIELDS, &[], Order::Asc("b.id".into()));
        assert!(matches!(res, Err(Error::InvalidOrderByField(_))));
    }

    #[test]
    fn test_filtering() {
        let params = ListingParams::new(0, 10)
            .with_filter(Filter::contains("author", "tolkien"))
            .with_filter(Filter::any_contains(["title", "author"], "ring"));
        let (clause, values) = params.filtering(FIELDS).unwrap();
        assert_eq!(
            clause,
            "WHERE (b.author REGEXP ?) AND (b.title REGEXP ? OR b.author REGEXP ?)"
        );
        assert_eq!(values, vec!["(?i)tolkien", "(?i)ring", "(?i)ring"]);
    }

    #[test]
    fn test_no_filter() {
        let (clause, values) = ListingParams::default().filtering(FIELDS).unwrap();
        assert!(clause.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_invalid_filter() {
        let params = ListingParams::new(0, 10).with_filter(Filter::contains("password", "x"));
        assert!(matches!(
            params.filtering(FIELDS),
            Err(Error::InvalidFilterField(_))
        ));
    }

    #[test]
    fn test_pattern_is_literal() {
        assert_eq!(Filter::contains("title", "100%").pattern(), "(?i)100%");
        assert_eq!(Filter::contains("title", "a.b*").pattern(), "(?i)a\\.b\\*");
        assert_eq!(Filter::contains("title", "c:\\").pattern(), "(?i)c:\\\\");
    }

    #[test]
    fn test_pattern_ignores_unicode_case() {
        let pattern = regex::Regex::new(&Filter::contains("author", "émile").pattern()).unwrap();
        assert!(pattern.is_match("Émile Zola"));
        assert!(pattern.is_match("ÉMILE"));
        assert!(!pattern.is_match("emile"));
    }
}
