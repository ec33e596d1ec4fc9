use bookrev_e2e_tests::{
    TestUser, launch_env, prepare_env,
    rest::{add_review, book_payload, create_book, get_book},
    user_client,
};
use reqwest::StatusCode;
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_rating_aggregation() {
    let (args, _config_guard) = prepare_env("test_rating_aggregation").await.unwrap();
    let (alice, base_url) = launch_env(args, TestUser::Alice).await.unwrap();
    let bob = user_client(&base_url, TestUser::Bob).await.unwrap();
    let carol = user_client(&base_url, TestUser::Carol).await.unwrap();

    let book = create_book(
        &alice,
        &base_url,
        &book_payload("The Hobbit", "J.R.R. Tolkien", "Fantasy"),
    )
    .await
    .unwrap();

    add_review(&alice, &base_url, book.id, 4, Some("Nice")).await.unwrap();
    add_review(&bob, &base_url, book.id, 5, None).await.unwrap();
    let carol_review = add_review(&carol, &base_url, book.id, 3, Some("  meh  "))
        .await
        .unwrap();
    assert_eq!(carol_review.comment.as_deref(), Some("meh"));
    assert_eq!(carol_review.user.username, "carol");

    let detail = get_book(&base_url, book.id).await.unwrap();
    assert_eq!(detail["book"]["averageRating"], 4.0);
    assert_eq!(detail["book"]["totalReviews"], 3);
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 3);
    assert_eq!(detail["reviews"][0]["user"]["username"], "carol");
    assert_eq!(detail["pagination"]["total"], 3);

    let review_url = base_url
        .join(&format!("api/reviews/{}", carol_review.id))
        .unwrap();
    let response = carol.delete(review_url.clone()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let detail = get_book(&base_url, book.id).await.unwrap();
    assert_eq!(detail["book"]["averageRating"], 4.5);
    assert_eq!(detail["book"]["totalReviews"], 2);

    let response = reqwest::get(review_url).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[traced_test]
async fn test_review_rules() {
    let (args, _config_guard) = prepare_env("test_review_rules").await.unwrap();
    let (alice, base_url) = launch_env(args, TestUser::Alice).await.unwrap();
    let bob = user_client(&base_url, TestUser::Bob).await.unwrap();

    let book = create_book(&alice, &base_url, &book_payload("Dune", "Frank Herbert", "Sci-Fi"))
        .await
        .unwrap();
    let reviews_url = base_url
        .join(&format!("api/books/{}/reviews", book.id))
        .unwrap();

    let first = add_review(&alice, &base_url, book.id, 5, Some("first"))
        .await
        .unwrap();

    let response = alice
        .post(reviews_url.clone())
        .json(&json!({"rating": 1, "comment": "second"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You have already reviewed this book");

    let response = reqwest::Client::new()
        .post(reviews_url.clone())
        .json(&json!({"rating": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for rating in [0, 6] {
        let response = bob
            .post(reviews_url.clone())
            .json(&json!({"rating": rating}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let missing_book_url = base_url.join("api/books/99999/reviews").unwrap();
    let response = bob
        .post(missing_book_url)
        .json(&json!({"rating": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let review_url = base_url.join(&format!("api/reviews/{}", first.id)).unwrap();
    let response = bob
        .put(review_url.clone())
        .json(&json!({"rating": 1, "comment": "hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = bob.delete(review_url.clone()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = bob
        .put(base_url.join("api/reviews/99999").unwrap())
        .json(&json!({"rating": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(review_url.clone()).await.unwrap();
    assert!(response.status().is_success());
    let unchanged: serde_json::Value = response.json().await.unwrap();
    assert_eq!(unchanged["rating"], 5);
    assert_eq!(unchanged["comment"], "first");

    let response = alice
        .put(review_url)
        .json(&json!({"rating": 2, "comment": "changed my mind"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let updated: serde_json::Value = response.json().await.unwrap();
    info!("Updated review: {updated:#?}");
    assert_eq!(updated["rating"], 2);

    let detail = get_book(&base_url, book.id).await.unwrap();
    assert_eq!(detail["book"]["averageRating"], 2.0);
    assert_eq!(detail["book"]["totalReviews"], 1);
}

#[tokio::test]
#[traced_test]
async fn test_review_pages() {
    let (args, _config_guard) = prepare_env("test_review_pages").await.unwrap();
    let (alice, base_url) = launch_env(args, TestUser::Alice).await.unwrap();
    let bob = user_client(&base_url, TestUser::Bob).await.unwrap();
    let carol = user_client(&base_url, TestUser::Carol).await.unwrap();

    let book = create_book(&alice, &base_url, &book_payload("Emma", "Jane Austen", "Classic"))
        .await
        .unwrap();
    for (client, rating) in [(&alice, 1), (&bob, 2), (&carol, 2)] {
        add_review(client, &base_url, book.id, rating, None)
            .await
            .unwrap();
    }

    let mut url = base_url.join(&format!("api/books/{}", book.id)).unwrap();
    url.set_query(Some("page=2&limit=2"));
    let detail: serde_json::Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(detail["reviews"][0]["user"]["username"], "alice");
    assert_eq!(detail["pagination"]["totalPages"], 2);
    assert_eq!(detail["pagination"]["hasPrevPage"], true);
    assert_eq!(detail["book"]["averageRating"], 1.7);
}
