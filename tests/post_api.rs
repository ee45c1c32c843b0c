mod common;

use axum::{
    body::Body,
    http::{self, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use bulletin_server::models::Post;

use common::helpers::{
    api_token_auth, bearer_auth, create_staff_user, create_test_app, create_test_category,
    create_test_comment, create_test_post, create_test_user, generate_boundary,
    multipart_post_body, RecordingMailer,
};

#[sqlx::test]
async fn anonymous_list_shows_owner_username(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "test_username", "test1@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    create_test_post(&pool, &user, &category, "Test title", "test text").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::GET)
                .uri("/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let page: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(page["count"], 1);
    let results = page["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["owner"], "test_username");
    assert_eq!(results[0]["title"], "Test title");
    assert_eq!(results[0]["category"], json!(category.id));
}

#[sqlx::test]
async fn list_is_paginated(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "author", "author@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    for i in 0..12 {
        create_test_post(&pool, &user, &category, &format!("Post {}", i), "text").await;
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let page: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["count"], 12);
    assert_eq!(page["results"].as_array().unwrap().len(), 10);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/posts?page=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let page: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
}

#[sqlx::test]
async fn retrieve_expands_category_and_comments_and_hides_owner(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let commenter = create_test_user(&pool, "commenter", "commenter@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp for sale", "barely used").await;
    let comment = create_test_comment(&pool, &commenter, &post, "is it still available?").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/posts/{}", post.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let detail: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(detail["category"]["name"], "Tools");
    assert_eq!(detail["category"]["id"], json!(category.id));

    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["id"], json!(comment.id));
    assert_eq!(comments[0]["accepted"], false);
    assert_eq!(comments[0]["owner"], json!(commenter.id));

    // The detail shape never exposes the raw owner reference.
    assert!(detail.get("owner").is_none());
    assert!(detail.get("owner_id").is_none());
}

#[sqlx::test]
async fn retrieve_missing_post_is_not_found(pool: PgPool) {
    let app = create_test_app(pool, RecordingMailer::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/posts/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn create_requires_authentication(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let category = create_test_category(&pool, "Tools").await;

    let boundary = generate_boundary();
    let body = multipart_post_body(&boundary, "Lamp", "A lamp", category.id);

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/posts")
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn create_injects_owner_from_caller(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "seller", "seller@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;

    let boundary = generate_boundary();
    let body = multipart_post_body(&boundary, "Lamp", "A sturdy lamp", category.id);

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/posts")
                .header(http::header::AUTHORIZATION, bearer_auth(&user))
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let created: Value = serde_json::from_slice(&body).unwrap();

    // The creation shape has no owner field; ownership is server-side only.
    assert!(created.get("owner").is_none());
    assert_eq!(created["title"], "Lamp");

    let saved = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(created["id"].as_str().unwrap().parse::<Uuid>().unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(saved.owner_id, user.id);
}

#[sqlx::test]
async fn create_accepts_opaque_api_token(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "seller", "seller@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let authorization = api_token_auth(&pool, &user).await;

    let boundary = generate_boundary();
    let body = multipart_post_body(&boundary, "Lamp", "A lamp", category.id);

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/posts")
                .header(http::header::AUTHORIZATION, authorization)
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test]
async fn create_rejects_overlong_text(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "seller", "seller@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;

    let boundary = generate_boundary();
    let body = multipart_post_body(&boundary, "Lamp", &"x".repeat(5001), category.id);

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/posts")
                .header(http::header::AUTHORIZATION, bearer_auth(&user))
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert!(report.get("text").is_some());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn create_rejects_unknown_category(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let user = create_test_user(&pool, "seller", "seller@mail.ru").await;

    let boundary = generate_boundary();
    let body = multipart_post_body(&boundary, "Lamp", "A lamp", Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/posts")
                .header(http::header::AUTHORIZATION, bearer_auth(&user))
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert!(report.get("category").is_some());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn update_by_stranger_is_forbidden(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let stranger = create_test_user(&pool, "stranger", "stranger@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::PUT)
                .uri(format!("/posts/{}", post.id))
                .header(http::header::AUTHORIZATION, bearer_auth(&stranger))
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    json!({ "title": "Hijacked", "text": "changed", "category": category.id })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let saved = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(post.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(saved.title, "Lamp");
}

#[sqlx::test]
async fn update_by_owner_succeeds(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let other_category = create_test_category(&pool, "Games").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::PUT)
                .uri(format!("/posts/{}", post.id))
                .header(http::header::AUTHORIZATION, bearer_auth(&owner))
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    json!({ "title": "Lamp", "text": "A lamp", "category": other_category.id })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let updated: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated["category"], json!(other_category.id));
    assert_eq!(updated["owner"], "owner");
}

#[sqlx::test]
async fn update_by_staff_bypasses_ownership(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let staff = create_staff_user(&pool, "moderator", "mod@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::PUT)
                .uri(format!("/posts/{}", post.id))
                .header(http::header::AUTHORIZATION, bearer_auth(&staff))
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    json!({ "title": "Cleaned up", "text": "A lamp", "category": category.id })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test]
async fn partial_update_keeps_absent_fields(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::PATCH)
                .uri(format!("/posts/{}", post.id))
                .header(http::header::AUTHORIZATION, bearer_auth(&owner))
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(json!({ "title": "Desk lamp" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let saved = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(post.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(saved.title, "Desk lamp");
    assert_eq!(saved.text, "A lamp");
    assert_eq!(saved.category_id, category.id);
}

#[sqlx::test]
async fn delete_cascades_to_comments(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let commenter = create_test_user(&pool, "commenter", "commenter@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;
    create_test_comment(&pool, &commenter, &post, "still available?").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::DELETE)
                .uri(format!("/posts/{}", post.id))
                .header(http::header::AUTHORIZATION, bearer_auth(&owner))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(posts, 0);
    assert_eq!(comments, 0);
}

#[sqlx::test]
async fn anonymous_write_is_unauthorized(pool: PgPool) {
    let app = create_test_app(pool.clone(), RecordingMailer::new());
    let owner = create_test_user(&pool, "owner", "owner@mail.ru").await;
    let category = create_test_category(&pool, "Tools").await;
    let post = create_test_post(&pool, &owner, &category, "Lamp", "A lamp").await;

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::DELETE)
                .uri(format!("/posts/{}", post.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
