//! Router tests for the book API and health endpoint.

use crate::api::handlers::auth::test_support::TestApp;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};

async fn add_book(app: &TestApp, token: &str, body: Value) -> Result<Value> {
    let (status, book) = app.send("POST", "/api/books", Some(token), Some(body)).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create failed: {book}");
    Ok(book)
}

fn book_id(book: &Value) -> Result<String> {
    book["_id"]
        .as_str()
        .map(str::to_string)
        .context("missing _id")
}

#[tokio::test]
async fn create_then_list_defaults_status() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;

    let created = add_book(
        &app,
        &token,
        json!({ "title": "Dune", "author": "Frank Herbert" }),
    )
    .await?;
    assert_eq!(created["status"], "to-read");
    assert!(created["createdAt"].is_string());

    let (status, books) = app.send("GET", "/api/books", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let books = books.as_array().context("expected array")?;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Dune");
    assert_eq!(books[0]["author"], "Frank Herbert");
    assert_eq!(books[0]["status"], "to-read");
    assert_eq!(books[0]["_id"], created["_id"]);
    Ok(())
}

#[tokio::test]
async fn create_validates_input() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;

    for body in [
        json!({ "author": "Frank Herbert" }),
        json!({ "title": "Dune", "author": "   " }),
        json!({ "title": "Dune", "author": "Frank Herbert", "status": "finished" }),
    ] {
        let (status, response) = app
            .send("POST", "/api/books", Some(&token), Some(body))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn books_are_isolated_between_users() -> Result<()> {
    let app = TestApp::new();
    let alice = app.register("alice").await?;
    let bob = app.register("bob").await?;

    let book = add_book(&app, &alice, json!({ "title": "Dune", "author": "Herbert" })).await?;
    let id = book_id(&book)?;

    let (status, books) = app.send("GET", "/api/books", Some(&bob), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/books/{id}"),
            Some(&bob),
            Some(json!({ "title": "Stolen" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Book not found");

    let (status, _) = app
        .send("DELETE", &format!("/api/books/{id}"), Some(&bob), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, books) = app.send("GET", "/api/books", Some(&alice), None).await?;
    assert_eq!(books[0]["title"], "Dune");
    Ok(())
}

#[tokio::test]
async fn cycling_status_three_times_returns_to_start() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;
    let book = add_book(&app, &token, json!({ "title": "Dune", "author": "Herbert" })).await?;
    let id = book_id(&book)?;

    let mut seen = Vec::new();
    let mut current = book["status"]
        .as_str()
        .context("missing status")?
        .parse::<crate::store::BookStatus>()?;
    for _ in 0..3 {
        current = current.next();
        let (status, updated) = app
            .send(
                "PATCH",
                &format!("/api/books/{id}"),
                Some(&token),
                Some(json!({ "status": current.as_str() })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        seen.push(updated["status"].clone());
    }
    assert_eq!(seen, vec![json!("reading"), json!("read"), json!("to-read")]);
    Ok(())
}

#[tokio::test]
async fn filter_by_status() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;
    for (title, status) in [
        ("a", "to-read"),
        ("b", "reading"),
        ("c", "read"),
        ("d", "reading"),
    ] {
        add_book(
            &app,
            &token,
            json!({ "title": title, "author": "Anon", "status": status }),
        )
        .await?;
    }

    let (status, books) = app
        .send("GET", "/api/books/reading", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = books
        .as_array()
        .context("expected array")?
        .iter()
        .map(|b| b["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("b"), json!("d")]);

    let (status, _) = app
        .send("GET", "/api/books/finished", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn padded_status_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;

    let (status, body) = app
        .send(
            "POST",
            "/api/books",
            Some(&token),
            Some(json!({ "title": "Dune", "author": "Herbert", "status": " reading " })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send("GET", "/api/books/%20reading", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_rejects_empty_and_unknown_fields() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;
    let book = add_book(&app, &token, json!({ "title": "Dune", "author": "Herbert" })).await?;
    let uri = format!("/api/books/{}", book_id(&book)?);

    let (status, body) = app.send("PATCH", &uri, Some(&token), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No updates provided");

    let (status, _) = app
        .send("PATCH", &uri, Some(&token), Some(json!({ "user": "someone" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .send(
            "PATCH",
            &uri,
            Some(&token),
            Some(json!({ "title": "Dune Messiah" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["author"], "Herbert");
    Ok(())
}

#[tokio::test]
async fn delete_missing_or_repeated_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("ada").await?;
    let book = add_book(&app, &token, json!({ "title": "Dune", "author": "Herbert" })).await?;
    let uri = format!("/api/books/{}", book_id(&book)?);

    let (status, body) = app.send("DELETE", &uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.send("DELETE", &uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("DELETE", "/api/books/not-a-uuid", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            "DELETE",
            "/api/books/00000000-0000-4000-8000-000000000000",
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn book_routes_require_a_session() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/books", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let (status, body) = app
        .send("GET", "/api/books", Some("forged.token.value"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate");

    let (status, _) = app
        .send(
            "POST",
            "/api/books",
            None,
            Some(json!({ "title": "Dune", "author": "Herbert" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn health_reports_dependencies() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    assert_eq!(body["google_keyset"], "static");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/health")
        .body(Body::empty())?;
    let (status, body) = app.send_request(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    Ok(())
}
