use anyhow::{Result, anyhow};
use bookrev_dal::{book::Book, review::Review};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::info;

pub fn book_payload(title: &str, author: &str, genre: &str) -> Value {
    json!({"title": title, "author": author, "genre": genre})
}

pub async fn create_book(client: &reqwest::Client, base_url: &Url, payload: &Value) -> Result<Book> {
    let api_url = base_url.join("api/books")?;

    let response = client.post(api_url).json(payload).send().await?;
    if response.status() != StatusCode::CREATED {
        let status = response.status();
        let body = response.text().await?;
        return Err(anyhow!("Book not created, status {status}, body {body}"));
    }

    let new_book: Book = response.json().await?;
    Ok(new_book)
}

pub async fn add_review(
    client: &reqwest::Client,
    base_url: &Url,
    book_id: i64,
    rating: i64,
    comment: Option<&str>,
) -> Result<Review> {
    let api_url = base_url.join(&format!("api/books/{book_id}/reviews"))?;

    let response = client
        .post(api_url)
        .json(&json!({"rating": rating, "comment": comment}))
        .send()
        .await?;
    info!("Review response: {:?}", response.status());
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!("Review not created, status {}", response.status()));
    }

    let review: Review = response.json().await?;
    Ok(review)
}

/// Book as returned by detail endpoint, with page of its reviews
pub async fn get_book(base_url: &Url, book_id: i64) -> Result<Value> {
    let api_url = base_url.join(&format!("api/books/{book_id}"))?;
    let response = reqwest::get(api_url).await?;
    if !response.status().is_success() {
        return Err(anyhow!("Cannot get book, status {}", response.status()));
    }
    Ok(response.json().await?)
}
