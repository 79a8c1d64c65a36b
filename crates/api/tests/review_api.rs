//! HTTP-level integration tests for reviews and provider rating aggregates.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_user, delete_auth, get, get_auth, patch_json_auth, post_json_auth, put_json_auth};
use helphub_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_VOLUNTEER};
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn post_review(pool: &PgPool, token: &str, body: Value) -> axum::response::Response {
    let app = common::build_test_app(pool.clone());
    post_json_auth(app, "/api/reviews", body, token).await
}

async fn provider_profile(pool: &PgPool, provider_id: i64) -> Value {
    let app = common::build_test_app(pool.clone());
    body_json(get(app, &format!("/api/users/{provider_id}")).await).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn aggregate_follows_creates_and_deletes(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;

    let mut review_ids = Vec::new();
    for (i, rating) in [5, 4, 3].into_iter().enumerate() {
        let (_, token) = create_user(&pool, &format!("r{i}@example.com"), ROLE_CUSTOMER).await;
        let response = post_review(
            &pool,
            &token,
            json!({ "provider_id": provider.id, "rating": rating, "comment": "ok" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["data"]["id"].as_i64().unwrap();
        review_ids.push((id, token));
    }

    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["average_rating"], 4.0);
    assert_eq!(profile["review_count"], 3);

    // Delete the 3-star review.
    let (id, token) = &review_ids[2];
    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/reviews/{id}"), token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["average_rating"], 4.5);
    assert_eq!(profile["review_count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn editing_a_rating_recomputes(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (_, token) = create_user(&pool, "author@example.com", ROLE_CUSTOMER).await;
    let response = post_review(&pool, &token, json!({ "provider_id": provider.id, "rating": 2 })).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &format!("/api/reviews/{id}"), json!({ "rating": 5 }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["average_rating"], 5.0);
    assert_eq!(profile["review_count"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn hidden_reviews_leave_the_aggregate(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (_, admin_token) = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let (_, a) = create_user(&pool, "a@example.com", ROLE_CUSTOMER).await;
    let (_, b) = create_user(&pool, "b@example.com", ROLE_CUSTOMER).await;

    post_review(&pool, &a, json!({ "provider_id": provider.id, "rating": 5 })).await;
    let response = post_review(&pool, &b, json!({ "provider_id": provider.id, "rating": 1 })).await;
    let low_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = patch_json_auth(
        app,
        &format!("/api/admin/reviews/{low_id}/approval"),
        json!({ "is_approved": false }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["average_rating"], 5.0);
    assert_eq!(profile["review_count"], 1);

    let app = common::build_test_app(pool);
    let public = body_json(get(app, &format!("/api/reviews/provider/{}", provider.id)).await).await;
    assert_eq!(public["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Validation and permissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_rules(pool: PgPool) {
    let (provider, provider_token) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (customer, token) = create_user(&pool, "cust@example.com", ROLE_CUSTOMER).await;

    // Out of range.
    let response = post_review(&pool, &token, json!({ "provider_id": provider.id, "rating": 6 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Self review.
    let response =
        post_review(&pool, &provider_token, json!({ "provider_id": provider.id, "rating": 5 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Provider must be a volunteer.
    let response = post_review(&pool, &provider_token, json!({ "provider_id": customer.id, "rating": 5 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown provider.
    let response = post_review(&pool, &token, json!({ "provider_id": 999999, "rating": 5 })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn one_review_per_request(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (_, token) = create_user(&pool, "cust@example.com", ROLE_CUSTOMER).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/requests",
        json!({ "volunteer_id": provider.id, "message": "Dog walking", "contact": "x" }),
        &token,
    )
    .await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let body = json!({ "provider_id": provider.id, "request_id": request_id, "rating": 4 });
    let response = post_review(&pool, &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_review(&pool, &token, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn request_reviews_belong_to_its_customer(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (_, customer) = create_user(&pool, "cust@example.com", ROLE_CUSTOMER).await;
    let (_, stranger) = create_user(&pool, "stranger@example.com", ROLE_CUSTOMER).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/requests",
        json!({ "volunteer_id": provider.id, "message": "Groceries", "contact": "x" }),
        &customer,
    )
    .await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let body = json!({ "provider_id": provider.id, "request_id": request_id, "rating": 1 });
    let response = post_review(&pool, &stranger, body.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    // The rejected attempt leaves no trace and does not block the customer.
    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["review_count"], 0);

    let response = post_review(&pool, &customer, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_author_or_admin_may_change_a_review(pool: PgPool) {
    let (provider, _) = create_user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
    let (_, author) = create_user(&pool, "author@example.com", ROLE_CUSTOMER).await;
    let (_, stranger) = create_user(&pool, "stranger@example.com", ROLE_CUSTOMER).await;
    let (_, admin) = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;

    let response = post_review(&pool, &author, json!({ "provider_id": provider.id, "rating": 4 })).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/reviews/{id}");

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &uri, json!({ "rating": 1 }), &stranger).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &uri, &stranger).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let profile = provider_profile(&pool, provider.id).await;
    assert_eq!(profile["review_count"], 0);
    assert_eq!(profile["average_rating"], 0.0);

    // Sanity: the admin token still works elsewhere.
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/auth/me", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
}
