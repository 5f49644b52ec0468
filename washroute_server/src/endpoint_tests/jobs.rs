use actix_web::{http::StatusCode, test::TestRequest};
use washroute_engine::{db_types::PayoutStatus, CommissionManagement};

use super::helpers::*;
use crate::{data_objects::SweepSummary, middleware::SWEEP_SECRET_HEADER};

fn sweep_request(secret: Option<&str>) -> TestRequest {
    let req = TestRequest::post().uri("/jobs/settlement_sweep");
    match secret {
        Some(s) => req.insert_header((SWEEP_SECRET_HEADER, s)),
        None => req,
    }
}

#[actix_web::test]
async fn sweep_requires_the_shared_secret() {
    let db = setup().await;
    let (status, body) = send(&db, sweep_request(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "No shared secret provided.");

    let (status, body) = send(&db, sweep_request(Some("guess"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid shared secret.");
    tear_down(db).await;
}

#[actix_web::test]
async fn sweep_matures_commissions_once() {
    let db = setup().await;
    let order = checkout(&db).await;
    let body = charge_success_body(&order);
    let (status, _) = post_webhook(&db, &body, Some(&sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    deliver(&db, &order).await;
    order_api(&db).force_confirm(order.id, ADMIN).await.unwrap();

    let (status, body) = send(&db, sweep_request(Some(SWEEP_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    let summary: SweepSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.matured_count, 3);
    // platform 6.50 + rider 10.00 + partner 48.00
    assert_eq!(summary.matured_total.value(), 6450);
    assert_eq!(summary.expired_orders, 0);
    let commissions = db.fetch_commissions_for_order(order.id).await.unwrap();
    assert!(commissions.iter().all(|c| c.payout_status == PayoutStatus::ReadyForPayout));

    // A second run finds nothing new
    let (status, body) = send(&db, sweep_request(Some(SWEEP_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    let summary: SweepSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.matured_count, 0);
    tear_down(db).await;
}
