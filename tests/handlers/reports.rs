//! Reporting endpoints: course buyers and ledger-wide totals

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::*;

struct Fixture {
    admin_key: String,
    user_key: String,
    video: Course,
    book: Course,
}

/// Two buyers, three successful payments, one pending and one failed.
fn seed(app: &TestApp) -> Fixture {
    let conn = app.conn();
    let (_, admin_key) = create_test_user(&conn, "admin@example.com", Role::Admin);
    let (ada, user_key) = create_test_user(&conn, "ada@example.com", Role::User);
    let (bob, _) = create_test_user(&conn, "bob@example.com", Role::User);
    let video = create_test_course(&conn, "Rust 101", 1_000);
    let book = create_test_course(&conn, "Async Rust", 2_500);

    create_pending_payment(&conn, "ref_1", &ada, &video);
    create_pending_payment(&conn, "ref_2", &bob, &video);
    create_pending_payment(&conn, "ref_3", &ada, &book);
    create_pending_payment(&conn, "ref_4", &bob, &book);
    create_pending_payment(&conn, "ref_5", &ada, &video);

    for reference in ["ref_1", "ref_2", "ref_3"] {
        assert!(queries::try_transition_payment(&conn, reference, PaymentStatus::Success).unwrap());
    }
    assert!(queries::try_transition_payment(&conn, "ref_4", PaymentStatus::Failed).unwrap());

    Fixture {
        admin_key,
        user_key,
        video,
        book,
    }
}

// ============ Stats ============

#[tokio::test]
async fn test_stats_count_only_successful_payments() {
    let app = TestApp::new();
    let fx = seed(&app);

    let (status, body) = app
        .send(get_request("/payments/stats", Some(&fx.admin_key)))
        .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalUsers"], 2);
    assert_eq!(body["totalAmount"], 1_000 + 1_000 + 2_500);
    assert_eq!(body["totalCourses"], 2);
}

#[tokio::test]
async fn test_stats_on_empty_ledger_are_zero() {
    let app = TestApp::new();
    let (_, admin_key) = create_test_user(&app.conn(), "root@example.com", Role::SuperAdmin);

    let (status, body) = app.send(get_request("/payments/stats", Some(&admin_key))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 0);
    assert_eq!(body["totalAmount"], 0);
    assert_eq!(body["totalCourses"], 0);
}

#[tokio::test]
async fn test_stats_reject_regular_users_and_anonymous_callers() {
    let app = TestApp::new();
    let fx = seed(&app);

    let (as_user, body) = app.send(get_request("/payments/stats", Some(&fx.user_key))).await;
    let (anonymous, _) = app.send(get_request("/payments/stats", None)).await;

    assert_eq!(as_user, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Only admins can access this resource");
    assert_eq!(anonymous, StatusCode::UNAUTHORIZED);
}

// ============ Course buyers ============

#[tokio::test]
async fn test_course_buyers_lists_successful_payments_with_total() {
    let app = TestApp::new();
    let fx = seed(&app);

    let uri = format!("/payments/courses/{}/buyers", fx.video.id);
    let (status, body) = app.send(get_request(&uri, Some(&fx.admin_key))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["count"], 2);
    assert_eq!(body["totalAmount"], 2_000);

    let mut references: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["reference"].as_str().unwrap())
        .collect();
    references.sort();
    assert_eq!(references, vec!["ref_1", "ref_2"], "pending ref_5 must be excluded");
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p["status"] == "success")
    );
}

#[tokio::test]
async fn test_course_buyers_excludes_failed_payments() {
    let app = TestApp::new();
    let fx = seed(&app);

    let uri = format!("/payments/courses/{}/buyers", fx.book.id);
    let (_, body) = app.send(get_request(&uri, Some(&fx.admin_key))).await;

    assert_eq!(body["count"], 1);
    assert_eq!(body["totalAmount"], 2_500);
    assert_eq!(body["data"][0]["reference"], "ref_3");
}

#[tokio::test]
async fn test_course_without_buyers_has_empty_list() {
    let app = TestApp::new();
    let fx = seed(&app);
    let fresh = create_test_course(&app.conn(), "Brand New", 500);

    let uri = format!("/payments/courses/{}/buyers", fresh.id);
    let (status, body) = app.send(get_request(&uri, Some(&fx.admin_key))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["totalAmount"], 0);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_course_buyers_for_unknown_course_is_not_found() {
    let app = TestApp::new();
    let fx = seed(&app);

    for id in ["cp_crs_ffffffffffffffffffffffffffffffff", "not-an-id"] {
        let uri = format!("/payments/courses/{}/buyers", id);
        let (status, _) = app.send(get_request(&uri, Some(&fx.admin_key))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "course id {}", id);
    }
}

#[tokio::test]
async fn test_course_buyers_requires_privileged_caller() {
    let app = TestApp::new();
    let fx = seed(&app);

    let uri = format!("/payments/courses/{}/buyers", fx.video.id);
    let (status, _) = app.send(get_request(&uri, Some(&fx.user_key))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
