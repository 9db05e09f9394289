//! POST /payments/purchase

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

fn payment_rows(conn: &rusqlite::Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
        .unwrap()
}

struct Buyer {
    user: User,
    api_key: String,
    course: Course,
}

fn setup(app: &TestApp) -> Buyer {
    let conn = app.conn();
    let (user, api_key) = create_test_user(&conn, "ada@example.com", Role::User);
    let course = create_test_course(&conn, "Rust 101", 15_000);
    Buyer {
        user,
        api_key,
        course,
    }
}

fn purchase_body(buyer: &Buyer) -> serde_json::Value {
    json!({
        "userId": buyer.user.id,
        "courseId": buyer.course.id,
        "amount": buyer.course.price,
        "email": buyer.user.email,
    })
}

#[tokio::test]
async fn test_purchase_returns_checkout_and_records_pending_payment() {
    let app = TestApp::new();
    let buyer = setup(&app);

    let (status, body) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), purchase_body(&buyer)))
        .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["reference"], "ref_1");
    assert_eq!(body["data"]["authorizationUrl"], "https://checkout.example.com/ref_1");
    assert_eq!(body["data"]["accessCode"], "access_1");

    let conn = app.conn();
    let record = queries::get_payment_by_reference(&conn, "ref_1")
        .unwrap()
        .expect("ledger entry should exist");
    assert_eq!(record.status, PaymentStatus::Pending);
    assert_eq!(record.user_id, buyer.user.id);
    assert_eq!(record.course_id, buyer.course.id);
    assert_eq!(record.amount, 15_000);
    assert_eq!(record.full_name, buyer.user.name);

    let sent = app.gateway.last_request().expect("gateway should be called");
    assert_eq!(sent.email, "ada@example.com");
    assert_eq!(sent.amount, 15_000);
    assert_eq!(sent.callback_url, TEST_CALLBACK_URL);
}

#[tokio::test]
async fn test_purchase_of_owned_course_is_rejected_without_gateway_call() {
    let app = TestApp::new();
    let buyer = setup(&app);
    queries::grant_course(&app.conn(), &buyer.user.id, &buyer.course.id).unwrap();

    let (status, body) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), purchase_body(&buyer)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "You have already purchased this course");
    assert_eq!(app.gateway.calls(), 0);
    assert_eq!(payment_rows(&app.conn()), 0, "no ledger entry for a rejected purchase");
}

#[tokio::test]
async fn test_purchase_requires_api_key() {
    let app = TestApp::new();
    let buyer = setup(&app);

    let (missing, _) = app
        .send(post_json("/payments/purchase", None, purchase_body(&buyer)))
        .await;
    let (invalid, _) = app
        .send(post_json("/payments/purchase", Some("cp_not_a_real_key"), purchase_body(&buyer)))
        .await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(invalid, StatusCode::UNAUTHORIZED);
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn test_gateway_failure_is_bad_gateway_and_records_nothing() {
    let app = TestApp::new();
    let buyer = setup(&app);
    app.gateway.set_failing(true);

    let (status, body) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), purchase_body(&buyer)))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Payment gateway request failed");
    assert_eq!(app.gateway.calls(), 1);
    assert_eq!(payment_rows(&app.conn()), 0);
}

#[tokio::test]
async fn test_reused_reference_is_conflict_and_keeps_existing_record() {
    let app = TestApp::new();
    let buyer = setup(&app);
    let other = {
        let conn = app.conn();
        let (other, _) = create_test_user(&conn, "bob@example.com", Role::User);
        create_pending_payment(&conn, "ref_dup", &other, &buyer.course);
        other
    };
    app.gateway.set_fixed_reference("ref_dup");

    let (status, _) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), purchase_body(&buyer)))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    let record = queries::get_payment_by_reference(&app.conn(), "ref_dup")
        .unwrap()
        .unwrap();
    assert_eq!(record.user_id, other.id, "existing ledger entry must not be overwritten");
    assert_eq!(payment_rows(&app.conn()), 1);
}

#[tokio::test]
async fn test_purchase_of_unknown_course_is_not_found() {
    let app = TestApp::new();
    let buyer = setup(&app);

    let mut body = purchase_body(&buyer);
    body["courseId"] = json!("cp_crs_ffffffffffffffffffffffffffffffff");
    let (status, _) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), body))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn test_purchase_for_unknown_user_is_not_found() {
    let app = TestApp::new();
    let buyer = setup(&app);

    let mut body = purchase_body(&buyer);
    body["userId"] = json!("cp_usr_ffffffffffffffffffffffffffffffff");
    let (status, _) = app
        .send(post_json("/payments/purchase", Some(&buyer.api_key), body))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_purchase_bodies_are_bad_requests() {
    let app = TestApp::new();
    let buyer = setup(&app);

    let mut zero_amount = purchase_body(&buyer);
    zero_amount["amount"] = json!(0);
    let mut bad_email = purchase_body(&buyer);
    bad_email["email"] = json!("not-an-email");
    let missing_fields = json!({ "userId": buyer.user.id });

    for body in [zero_amount, bad_email, missing_fields] {
        let (status, response) = app
            .send(post_json("/payments/purchase", Some(&buyer.api_key), body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {}", response);
        assert_eq!(response["success"], false);
    }
    assert_eq!(app.gateway.calls(), 0);
}
