//! Paystack webhook endpoint: signature checks, event translation, acknowledgements

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::*;

fn seed_pending(app: &TestApp, reference: &str) -> (User, Course) {
    let conn = app.conn();
    let (user, _) = create_test_user(&conn, "ada@example.com", Role::User);
    let course = create_test_course(&conn, "Rust 101", 100);
    create_pending_payment(&conn, reference, &user, &course);
    (user, course)
}

// ============ Signature verification ============

#[tokio::test]
async fn test_signed_charge_success_confirms_payment() {
    let app = TestApp::new();
    let (user, course) = seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let signature = sign_paystack(&payload, TEST_WEBHOOK_SECRET);
    let (status, body) = app.send(webhook_request(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["reference"], "ref_1");

    let conn = app.conn();
    assert_eq!(payment_status(&conn, "ref_1"), Some(PaymentStatus::Success));
    assert!(queries::user_owns_course(&conn, &user.id, &course.id).unwrap());
    assert_eq!(app.notifier.count(), 1);
}

#[tokio::test]
async fn test_uppercase_signature_is_accepted() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let signature = sign_paystack(&payload, TEST_WEBHOOK_SECRET).to_uppercase();
    let (status, _) = app.send(webhook_request(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_signature_is_unauthorized_and_changes_nothing() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let signature = sign_paystack(&payload, "some_other_secret");
    let (status, body) = app.send(webhook_request(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(payment_status(&app.conn(), "ref_1"), Some(PaymentStatus::Pending));
    assert_eq!(app.notifier.count(), 0);
}

#[tokio::test]
async fn test_signature_over_different_body_is_rejected() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let signed = paystack_payload("charge.success", "ref_other", "ada@example.com");
    let signature = sign_paystack(&signed, TEST_WEBHOOK_SECRET);
    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let (status, _) = app.send(webhook_request(payload, Some(&signature))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_signature_header_is_bad_request() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let (status, _) = app.send(webhook_request(payload, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payment_status(&app.conn(), "ref_1"), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn test_unsigned_transfer_failure_cannot_purge_account() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("transfer.failed", "ref_1", "ada@example.com");
    let (status, body) = app.send(webhook_request(payload, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let conn = app.conn();
    assert_eq!(payment_status(&conn, "ref_1"), Some(PaymentStatus::Pending));
    assert!(queries::get_user_by_email(&conn, "ada@example.com").unwrap().is_some());
}

#[tokio::test]
async fn test_delivery_rejected_when_no_signing_key_configured() {
    let app = TestApp::without_webhook_secret();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let signature = sign_paystack(&payload, "");
    let (status, _) = app.send(webhook_request(payload.clone(), Some(&signature))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app.send(webhook_request(payload, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(payment_status(&app.conn(), "ref_1"), Some(PaymentStatus::Pending));
    assert_eq!(app.notifier.count(), 0);
}

// ============ Event handling ============

#[tokio::test]
async fn test_replayed_delivery_is_acknowledged() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ada@example.com");
    let (first, _) = app.send(signed_webhook_request(payload.clone())).await;
    let (second, body) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["message"], "Already processed");
    assert_eq!(app.notifier.count(), 1);
}

#[tokio::test]
async fn test_unknown_event_is_acknowledged_and_ignored() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("subscription.create", "ref_1", "ada@example.com");
    let (status, body) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event ignored");
    assert!(body.get("reference").is_none());
    assert_eq!(payment_status(&app.conn(), "ref_1"), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn test_unrecorded_reference_is_retryable_not_found() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_later", "ada@example.com");
    let (status, body) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_unknown_payer_is_not_found_without_retry_hint() {
    let app = TestApp::new();
    seed_pending(&app, "ref_1");

    let payload = paystack_payload("charge.success", "ref_1", "ghost@example.com");
    let (status, body) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("retryable").is_none());
}

#[tokio::test]
async fn test_transfer_failed_purges_account() {
    let app = TestApp::new();
    let (user, _) = seed_pending(&app, "ref_2");

    let payload = paystack_payload("transfer.failed", "ref_2", "ada@example.com");
    let (status, body) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment and account removed");
    let conn = app.conn();
    assert!(payment_status(&conn, "ref_2").is_none());
    assert!(queries::get_user_by_id(&conn, &user.id).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app
        .send(signed_webhook_request(b"{not json".to_vec()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid JSON");
}

#[tokio::test]
async fn test_funds_event_without_reference_is_bad_request() {
    let app = TestApp::new();

    let payload = serde_json::to_vec(&serde_json::json!({
        "event": "charge.success",
        "data": { "customer": { "email": "ada@example.com" } }
    }))
    .unwrap();
    let (status, _) = app.send(signed_webhook_request(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
