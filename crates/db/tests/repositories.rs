//! Integration tests for the repository layer.
//!
//! Exercises each repository against a real database:
//! - Request creation writes the initial history entry
//! - Sticky admin override and one-way workflow flags
//! - Payment release/refund bookkeeping and timeline ordering
//! - Review uniqueness and approved-only rating queries

use chrono::{Duration, Utc};
use helphub_core::escrow::{compute_settlement, PaymentStatus};
use helphub_core::request_status::RequestStatus;
use helphub_db::models::payment::NewPayment;
use helphub_db::models::request::{CreateServiceRequest, NewServiceRequest};
use helphub_db::models::review::{CreateReview, UpdateReview};
use helphub_db::models::user::{CreateUser, UpdateProfile};
use helphub_db::repositories::{
    PaymentRepo, RequestFilter, RequestRepo, ReviewRepo, TimelineRecord, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, email: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn request_input(volunteer_id: i64) -> CreateServiceRequest {
    CreateServiceRequest {
        volunteer_id,
        message: "Need help moving a sofa".to_string(),
        contact: "555-0100".to_string(),
        service_category: Some("moving".to_string()),
        location: None,
        scheduled_for: None,
    }
}

async fn seed_request(pool: &PgPool, customer: i64, volunteer: i64) -> i64 {
    let input = request_input(volunteer);
    RequestRepo::create(
        pool,
        &NewServiceRequest {
            user_id: Some(customer),
            input: &input,
            cancel_deadline: Utc::now() + Duration::hours(2),
        },
    )
    .await
    .unwrap()
    .id
}

fn escrow_payment(request_id: i64, volunteer_id: i64, payer_id: i64, amount: i64) -> NewPayment {
    NewPayment {
        request_id,
        volunteer_id,
        payer_id: Some(payer_id),
        amount,
        currency: "usd".to_string(),
        method: "credit_card".to_string(),
        status: PaymentStatus::Escrow.as_str().to_string(),
        processor: Some("stripe".to_string()),
        processor_payment_id: Some(format!("pi_test_{request_id}")),
        client_secret: None,
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_check(pool: PgPool) {
    helphub_db::health_check(&pool).await.unwrap();
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_violates_unique_constraint(pool: PgPool) {
    seed_user(&pool, "dup@example.com", "customer").await;
    let err = UserRepo::create(
        &pool,
        &CreateUser {
            name: "Again".to_string(),
            email: "dup@example.com".to_string(),
            password_hash: "x".to_string(),
            role: "customer".to_string(),
        },
    )
    .await
    .unwrap_err();

    match err {
        sqlx::Error::Database(db) => {
            assert_eq!(db.code().as_deref(), Some("23505"));
            assert_eq!(db.constraint(), Some("uq_users_email"));
        }
        other => panic!("expected database error, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_profile_update_keeps_unset_fields(pool: PgPool) {
    let id = seed_user(&pool, "vol@example.com", "volunteer").await;
    let updated = UserRepo::update_profile(
        &pool,
        id,
        &UpdateProfile {
            bio: Some("Handy with tools".to_string()),
            skills: Some(vec!["plumbing".to_string()]),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "vol");
    assert_eq!(updated.bio.as_deref(), Some("Handy with tools"));
    assert_eq!(updated.skills, vec!["plumbing".to_string()]);
    assert!(updated.is_available);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_volunteer_directory_filters_availability(pool: PgPool) {
    let busy = seed_user(&pool, "busy@example.com", "volunteer").await;
    seed_user(&pool, "free@example.com", "volunteer").await;
    seed_user(&pool, "cust@example.com", "customer").await;

    UserRepo::update_profile(
        &pool,
        busy,
        &UpdateProfile {
            is_available: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let all = UserRepo::list_volunteers(&pool, false, 50, 0).await.unwrap();
    assert_eq!(all.len(), 2);

    let available = UserRepo::list_volunteers(&pool, true, 50, 0).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].email, "free@example.com");
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_request_writes_initial_history(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let id = seed_request(&pool, customer, volunteer).await;

    let request = RequestRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(request.status, "requested");
    assert_eq!(request.payment_status, "pending");
    assert!(!request.admin_override);

    let history = RequestRepo::list_history(&pool, id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "requested");
    assert_eq!(history[0].updated_by, Some(customer));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_override_flag_is_sticky(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let id = seed_request(&pool, customer, volunteer).await;

    let forced = RequestRepo::update_status(&pool, id, RequestStatus::Paid, true)
        .await
        .unwrap()
        .unwrap();
    assert!(forced.admin_override);

    let later = RequestRepo::update_status(&pool, id, RequestStatus::Completed, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.status, "completed");
    assert!(later.admin_override);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_workflow_flags_and_listing(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let other = seed_user(&pool, "o@example.com", "volunteer").await;
    let first = seed_request(&pool, customer, volunteer).await;
    seed_request(&pool, customer, other).await;

    let marked = RequestRepo::mark_completed_by_helper(&pool, first)
        .await
        .unwrap()
        .unwrap();
    assert!(marked.is_completed_by_helper);
    assert!(!marked.is_confirmed_by_user);

    let viewed = RequestRepo::mark_viewed(&pool, first).await.unwrap().unwrap();
    assert!(viewed.viewed_by_helper);

    let mine = RequestRepo::list_filtered(
        &pool,
        &RequestFilter {
            user_id: Some(customer),
            ..Default::default()
        },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(mine.len(), 2);

    let assigned = RequestRepo::list_filtered(
        &pool,
        &RequestFilter {
            volunteer_id: Some(volunteer),
            status: Some("requested"),
            ..Default::default()
        },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, first);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_many_cascades_history(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let a = seed_request(&pool, customer, volunteer).await;
    let b = seed_request(&pool, customer, volunteer).await;

    let removed = RequestRepo::delete_many(&pool, &[a, b, 999_999]).await.unwrap();
    assert_eq!(removed, 2);
    assert!(RequestRepo::list_history(&pool, a).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_release_records_settlement(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let request = seed_request(&pool, customer, volunteer).await;

    let payment = PaymentRepo::create(&pool, &escrow_payment(request, volunteer, customer, 1000))
        .await
        .unwrap();
    assert_eq!(payment.status, "escrow");
    assert!(payment.released_at.is_none());

    let released = PaymentRepo::mark_released(&pool, payment.id, compute_settlement(1000))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(released.status, "released");
    assert_eq!(released.platform_fee, Some(100));
    assert_eq!(released.payout_amount, Some(900));
    assert!(released.released_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_lookup_by_processor_reference(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let request = seed_request(&pool, customer, volunteer).await;
    let payment = PaymentRepo::create(&pool, &escrow_payment(request, volunteer, customer, 500))
        .await
        .unwrap();

    let found = PaymentRepo::find_by_processor_payment_id(&pool, &format!("pi_test_{request}"))
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(payment.id));

    let missing = PaymentRepo::find_by_processor_payment_id(&pool, "pi_unknown")
        .await
        .unwrap();
    assert!(missing.is_none());

    let held = PaymentRepo::find_latest_for_request(&pool, request, PaymentStatus::Escrow)
        .await
        .unwrap();
    assert_eq!(held.map(|p| p.id), Some(payment.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_timeline_is_ordered_oldest_first(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let request = seed_request(&pool, customer, volunteer).await;
    let payment = PaymentRepo::create(&pool, &escrow_payment(request, volunteer, customer, 700))
        .await
        .unwrap();

    for (action, status) in [
        ("held", PaymentStatus::Escrow),
        ("refunded", PaymentStatus::Refunded),
    ] {
        PaymentRepo::append_timeline(
            &pool,
            payment.id,
            &TimelineRecord {
                action,
                status,
                actor_id: Some(customer),
                note: None,
                processor_event_id: None,
            },
        )
        .await
        .unwrap();
    }

    let timeline = PaymentRepo::list_timeline(&pool, payment.id).await.unwrap();
    let actions: Vec<&str> = timeline.iter().map(|t| t.action.as_str()).collect();
    assert_eq!(actions, vec!["held", "refunded"]);

    assert!(PaymentRepo::delete(&pool, payment.id).await.unwrap());
    assert!(PaymentRepo::list_timeline(&pool, payment.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_payment_list_scoped_to_participant(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let stranger = seed_user(&pool, "s@example.com", "customer").await;
    let request = seed_request(&pool, customer, volunteer).await;
    PaymentRepo::create(&pool, &escrow_payment(request, volunteer, customer, 300))
        .await
        .unwrap();

    let as_payer = PaymentRepo::list_filtered(&pool, Some(customer), None, 50, 0)
        .await
        .unwrap();
    let as_volunteer = PaymentRepo::list_filtered(&pool, Some(volunteer), Some("escrow"), 50, 0)
        .await
        .unwrap();
    let as_stranger = PaymentRepo::list_filtered(&pool, Some(stranger), None, 50, 0)
        .await
        .unwrap();
    let everyone = PaymentRepo::list_filtered(&pool, None, None, 50, 0).await.unwrap();

    assert_eq!(as_payer.len(), 1);
    assert_eq!(as_volunteer.len(), 1);
    assert!(as_stranger.is_empty());
    assert_eq!(everyone.len(), 1);
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hidden_reviews_excluded_from_ratings(pool: PgPool) {
    let provider = seed_user(&pool, "p@example.com", "volunteer").await;
    let r1 = seed_user(&pool, "r1@example.com", "customer").await;
    let r2 = seed_user(&pool, "r2@example.com", "customer").await;

    ReviewRepo::create(
        &pool,
        r1,
        &CreateReview {
            provider_id: provider,
            request_id: None,
            rating: 5,
            comment: None,
        },
    )
    .await
    .unwrap();
    let low = ReviewRepo::create(
        &pool,
        r2,
        &CreateReview {
            provider_id: provider,
            request_id: None,
            rating: 1,
            comment: Some("late".to_string()),
        },
    )
    .await
    .unwrap();
    assert!(low.is_approved);

    ReviewRepo::set_approval(&pool, low.id, false).await.unwrap();

    let ratings = ReviewRepo::approved_ratings_for_provider(&pool, provider)
        .await
        .unwrap();
    assert_eq!(ratings, vec![5]);
    assert_eq!(
        ReviewRepo::list_approved_for_provider(&pool, provider)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_review_update_and_duplicate(pool: PgPool) {
    let customer = seed_user(&pool, "c@example.com", "customer").await;
    let volunteer = seed_user(&pool, "v@example.com", "volunteer").await;
    let request = seed_request(&pool, customer, volunteer).await;

    let input = CreateReview {
        provider_id: volunteer,
        request_id: Some(request),
        rating: 3,
        comment: None,
    };
    let review = ReviewRepo::create(&pool, customer, &input).await.unwrap();

    let updated = ReviewRepo::update(
        &pool,
        review.id,
        &UpdateReview {
            rating: Some(4),
            comment: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.rating, 4);

    let err = ReviewRepo::create(&pool, customer, &input).await.unwrap_err();
    match err {
        sqlx::Error::Database(db) => {
            assert_eq!(db.constraint(), Some("uq_reviews_reviewer_request"));
        }
        other => panic!("expected database error, got {other:?}"),
    }

    assert!(ReviewRepo::delete(&pool, review.id).await.unwrap());
    assert!(ReviewRepo::find_by_id(&pool, review.id).await.unwrap().is_none());
}
