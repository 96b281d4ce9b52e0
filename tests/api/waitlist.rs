use crate::helpers::{spawn_app, spawn_app_without_store};
use serde_json::{json, Value};

#[tokio::test]
async fn join_returns_a_200_and_the_normalised_entry_for_a_valid_email() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_waitlist(&json!({"email": "User@Example.com"})).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse the response.");
    assert_eq!(body["email"], "user@example.com");
    let id = body["id"].as_str().expect("`id` is not a string.");
    assert_eq!(id.len(), 24);
}

#[tokio::test]
async fn join_persists_the_new_entry() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_waitlist(&json!({"email": "User@Example.com"})).await;

    // Assert
    let body: Value = response.json().await.expect("Failed to parse the response.");
    let saved = app.stored_entries("user@example.com").await;
    assert_eq!(saved.len(), 1);
    let saved_id = saved[0]
        .get_object_id("_id")
        .expect("The stored entry has no ObjectId.");
    assert_eq!(body["id"], saved_id.to_hex());
}

#[tokio::test]
async fn joining_twice_returns_a_400() {
    // Arrange
    let app = spawn_app().await;
    let body = json!({"email": "User@Example.com"});

    // Act
    let first = app.post_waitlist(&body).await;
    let second = app.post_waitlist(&body).await;

    // Assert
    assert_eq!(200, first.status().as_u16());
    assert_eq!(400, second.status().as_u16());
    let detail: Value = second.json().await.expect("Failed to parse the response.");
    assert_eq!(detail, json!({"detail": "Email already in waitlist"}));
    assert_eq!(app.stored_entries("user@example.com").await.len(), 1);
}

#[tokio::test]
async fn duplicates_are_detected_regardless_of_case() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let first = app.post_waitlist(&json!({"email": "A@B.com"})).await;
    let second = app.post_waitlist(&json!({"email": "a@b.com"})).await;

    // Assert
    assert_eq!(200, first.status().as_u16());
    assert_eq!(400, second.status().as_u16());
}

#[tokio::test]
async fn join_returns_a_422_when_the_email_is_invalid() {
    // Arrange
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({"email": "not-an-email"}), "no @"),
        (json!({"email": ""}), "empty email"),
        (json!({"email": "ursula@"}), "no domain"),
        (json!({"email": "@example.com"}), "no local part"),
        (json!({"email": 42}), "not a string"),
        (json!({}), "missing email"),
    ];

    for (body, description) in test_cases {
        // Act
        let response = app.post_waitlist(&body).await;

        // Assert
        assert_eq!(
            422,
            response.status().as_u16(),
            "The API did not fail with 422 Unprocessable Entity when the payload had {}.",
            description
        );
    }
    assert_eq!(app.stored_entries_count().await, 0);
}

#[tokio::test]
async fn join_returns_a_422_for_malformed_json() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_waitlist_raw("application/json", r#"{"email": "#)
        .await;

    // Assert
    assert_eq!(422, response.status().as_u16());
}

#[tokio::test]
async fn join_returns_a_415_for_a_body_that_is_not_json() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_waitlist_raw(
            "application/x-www-form-urlencoded",
            "email=ursula%40example.com",
        )
        .await;

    // Assert
    assert_eq!(415, response.status().as_u16());
    assert_eq!(app.stored_entries_count().await, 0);
}

#[tokio::test]
async fn join_returns_a_500_when_the_store_is_unreachable() {
    // Arrange
    let app = spawn_app_without_store().await;

    // Act
    let response = app.post_waitlist(&json!({"email": "x@y.com"})).await;

    // Assert
    assert_eq!(500, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse the response.");
    let detail = body["detail"].as_str().expect("`detail` is not a string.");
    assert!(detail.starts_with("Database error: "), "{detail}");
    assert!(detail.len() > "Database error: ".len());
}

#[tokio::test]
async fn concurrent_joins_for_the_same_email_have_a_single_winner() {
    // Arrange
    let app = spawn_app().await;
    let body = json!({"email": "race@example.com"});

    // Act
    let (a, b, c, d) = tokio::join!(
        app.post_waitlist(&body),
        app.post_waitlist(&body),
        app.post_waitlist(&body),
        app.post_waitlist(&body),
    );

    // Assert
    let mut statuses: Vec<u16> = [a, b, c, d]
        .iter()
        .map(|r| r.status().as_u16())
        .collect();
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 400, 400, 400]);
    assert_eq!(app.stored_entries("race@example.com").await.len(), 1);
}

#[tokio::test]
async fn cors_preflight_is_allowed_from_any_origin() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .request(
            reqwest::Method::OPTIONS,
            &format!("{}/waitlist/", &app.address),
        )
        .header("Origin", "http://frontend.example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some("http://frontend.example.com")
    );
    assert_eq!(
        headers
            .get("access-control-allow-credentials")
            .and_then(|h| h.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn join_is_also_served_without_the_trailing_slash() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_waitlist_without_trailing_slash(&json!({"email": "ursula@example.com"}))
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.stored_entries("ursula@example.com").await.len(), 1);
}
