use bookrev_e2e_tests::{
    TestUser, extend_url, launch_env, prepare_env,
    rest::{book_payload, create_book},
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_create_book() {
    let (args, _config_guard) = prepare_env("test_create_book").await.unwrap();
    let (client, base_url) = launch_env(args, TestUser::Alice).await.unwrap();
    let api_url = base_url.join("api/books").unwrap();

    let payload = json!({
        "title": "The Hobbit",
        "author": "J.R.R. Tolkien",
        "genre": "Fantasy",
        "isbn": "978-0261102217",
        "publishedYear": 1937,
        "pages": 310,
        "averageRating": 5.0,
        "totalReviews": 100
    });
    let book = create_book(&client, &base_url, &payload).await.unwrap();
    assert_eq!(book.title, "The Hobbit");
    assert_eq!(book.average_rating, 0.0);
    assert_eq!(book.total_reviews, 0);
    assert_eq!(book.added_by.username, "alice");

    let response = client.post(api_url.clone()).json(&payload).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .post(api_url.clone())
        .json(&book_payload("The Silmarillion", "J.R.R. Tolkien", "Fantasy"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let second: Value = response.json().await.unwrap();
    assert_eq!(location, extend_url(&api_url, &second["id"]).to_string());

    let response = reqwest::Client::new()
        .post(api_url.clone())
        .json(&book_payload("Anonymous", "Nobody", "None"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let invalid = json!({"title": "", "author": "x", "genre": "y", "pages": 0});
    let response = client.post(api_url.clone()).json(&invalid).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = reqwest::get(extend_url(&api_url, book.id)).await.unwrap();
    assert!(response.status().is_success());
    let detail: Value = response.json().await.unwrap();
    info!("Book detail: {detail:#?}");
    assert_eq!(detail["book"]["isbn"], "978-0261102217");
    assert_eq!(detail["book"]["publishedYear"], 1937);
    assert_eq!(detail["book"]["addedBy"]["username"], "alice");
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 0);
    assert_eq!(detail["pagination"]["totalPages"], 0);

    let response = reqwest::get(extend_url(&api_url, book.id + 1000)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[traced_test]
async fn test_paging() {
    let (args, _config_guard) = prepare_env("test_paging").await.unwrap();
    let (client, base_url) = launch_env(args, TestUser::Alice).await.unwrap();
    let api_url = base_url.join("api/books").unwrap();

    for i in 0..15 {
        let genre = if i % 3 == 0 { "Poetry" } else { "Prose" };
        create_book(
            &client,
            &base_url,
            &book_payload(&format!("Book {i:02}"), &format!("Author {}", i % 5), genre),
        )
        .await
        .unwrap();
    }

    let get_page = async |query: &str| -> (StatusCode, Value) {
        let mut page_url = api_url.clone();
        page_url.set_query(Some(query));
        let response = reqwest::get(page_url).await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    };

    let (status, page) = get_page("").await;
    assert!(status.is_success());
    assert_eq!(page["books"].as_array().unwrap().len(), 10);
    assert_eq!(page["pagination"]["currentPage"], 1);
    assert_eq!(page["pagination"]["total"], 15);
    assert_eq!(page["pagination"]["totalPages"], 2);
    assert_eq!(page["pagination"]["hasNextPage"], true);
    assert_eq!(page["pagination"]["hasPrevPage"], false);
    assert_eq!(page["books"][0]["title"], "Book 14");

    let (_, page) = get_page("page=2&limit=10").await;
    assert_eq!(page["books"].as_array().unwrap().len(), 5);
    assert_eq!(page["pagination"]["hasNextPage"], false);
    assert_eq!(page["pagination"]["hasPrevPage"], true);

    let (_, page) = get_page("page=5&limit=10").await;
    assert_eq!(page["books"].as_array().unwrap().len(), 0);
    assert_eq!(page["pagination"]["total"], 15);

    let (_, page) = get_page("genre=poetry&author=author%200").await;
    let titles: Vec<_> = page["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Book 00"]);

    let (_, page) = get_page("sortBy=title&limit=3").await;
    assert_eq!(page["books"][0]["title"], "Book 00");
    assert_eq!(page["books"][2]["title"], "Book 02");

    let (_, page) = get_page("sortBy=title&sortOrder=desc&limit=1").await;
    assert_eq!(page["books"][0]["title"], "Book 14");

    let (status, _) = get_page("sortBy=password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_page("sortBy=title&sortOrder=sideways").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_page("limit=101").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get_page("page=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
