use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::Value;
use washroute_engine::{db_types::PaymentStatus, helpers::sign_payload, AuditLog, OrderManagement};

use super::helpers::*;

#[actix_web::test]
async fn health_check() {
    let db = setup().await;
    let (status, body) = send(&db, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    tear_down(db).await;
}

#[actix_web::test]
async fn signed_payment_is_applied_once() {
    let db = setup().await;
    let order = checkout(&db).await;
    let body = charge_success_body(&order);
    let signature = sign(&body);

    let (status, response) = post_webhook(&db, &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["received"], true);
    assert_eq!(response["outcome"], "applied");
    let paid = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Success);

    // The gateway retries. It must still get a 200, and nothing changes.
    let (status, response) = post_webhook(&db, &body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["outcome"], "already_applied");
    let replayed = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(replayed.paid_at, paid.paid_at);
    tear_down(db).await;
}

#[actix_web::test]
async fn unset_webhook_secret_rejects_everything() {
    let db = setup().await;
    let order = checkout(&db).await;
    let body = charge_success_body(&order);
    let forged = sign_payload("", body.as_bytes()).unwrap();

    let (status, response) = send_with_secret(&db, webhook_request(&body, Some(&forged)), "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response.contains("secret"), "{response}");
    let unpaid = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(unpaid.payment_status, PaymentStatus::Pending);
    tear_down(db).await;
}

#[actix_web::test]
async fn bad_signatures_are_unauthorized() {
    let db = setup().await;
    let order = checkout(&db).await;
    let body = charge_success_body(&order);

    let (status, response) = post_webhook(&db, &body, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response.contains("error"), "{response}");

    let forged = sign_payload("not-the-secret", body.as_bytes()).unwrap();
    let (status, _) = post_webhook(&db, &body, Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let tampered = body.replace("mobile_money", "card");
    let (status, _) = post_webhook(&db, &tampered, Some(&sign(&body))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unpaid = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(unpaid.payment_status, PaymentStatus::Pending);
    let rejections = db.fetch_audit_entries_for("webhook").await.unwrap();
    assert_eq!(rejections.len(), 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn malformed_payload_is_a_bad_request() {
    let db = setup().await;
    let body = r#"{"event": "charge.success", "data": "#;
    let (status, response) = post_webhook(&db, body, Some(&sign(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Could not parse the webhook payload"), "{response}");
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_references_are_acknowledged() {
    let db = setup().await;
    let body = r#"{"event":"charge.success","data":{"reference":"WRPAY_0_NOSUCHORDER","amount":100}}"#;
    let (status, response) = post_webhook(&db, body, Some(&sign(body))).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["outcome"], "discarded");

    let body = r#"{"event":"customeridentification.success","data":{"reference":"CUS_1"}}"#;
    let (status, response) = post_webhook(&db, body, Some(&sign(body))).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["outcome"], "discarded");
    tear_down(db).await;
}
