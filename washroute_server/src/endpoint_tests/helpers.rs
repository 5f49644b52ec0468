use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, Utc};
use log::debug;
use serde_json::json;
use washroute_common::Secret;
use washroute_engine::{
    db_types::{
        ClientSnapshot,
        DeliveryLocation,
        DirectoryUser,
        FeeSchedule,
        Money,
        NewOrder,
        Order,
        OrderItem,
        OrderStatusType,
        Percentage,
        UserRole,
    },
    events::EventProducers,
    helpers::sign_payload,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    traits::{ChargeAuthorization, ChargeRequest, TransferReceipt, TransferRequest, VerifiedRecipient},
    FeeConfigApi,
    GatewayError,
    LedgerDatabase,
    OrderFlowApi,
    PaymentGateway,
    SettlementApi,
    SqliteDatabase,
    UserDirectory,
    WebhookApi,
};

use crate::{
    config::ServerOptions,
    middleware::{SharedSecretMiddlewareFactory, SWEEP_SECRET_HEADER},
    routes::{health, GatewayWebhookRoute, SettlementSweepRoute},
};

pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";
pub const SWEEP_SECRET: &str = "sweep_endpoint_tests";
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";
pub const RIDER: &str = "rider-1";
pub const PARTNER: &str = "partner-1";
pub const ADMIN: &str = "admin-1";

/// A gateway that accepts every charge. Payouts are not exercised through the HTTP surface.
pub struct StubGateway;

impl PaymentGateway for StubGateway {
    async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeAuthorization, GatewayError> {
        Ok(ChargeAuthorization {
            authorization_url: format!("https://checkout.example/{}", request.reference),
            reference: request.reference,
        })
    }

    async fn resolve_recipient(&self, recipient: &str) -> Result<VerifiedRecipient, GatewayError> {
        Err(GatewayError::Rejected(format!("Unexpected recipient lookup for {recipient}")))
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, GatewayError> {
        Err(GatewayError::Rejected(format!("Unexpected transfer {}", request.reference)))
    }
}

pub async fn setup() -> SqliteDatabase {
    let db = prepare_test_env(&random_db_path()).await;
    db.upsert_directory_user(DirectoryUser::new(RIDER, UserRole::Rider, "Kojo").with_payout_recipient("RCP_rider1"))
        .await
        .unwrap();
    db.upsert_directory_user(
        DirectoryUser::new(PARTNER, UserRole::Partner, "Sparkle Laundry").with_payout_recipient("RCP_partner1"),
    )
    .await
    .unwrap();
    let fees = FeeSchedule::new(Percentage::from_percent(9.0).unwrap(), Money::from_major(10), Money::from_major(1));
    FeeConfigApi::new(db.clone()).set_fee_schedule(fees, ADMIN).await.unwrap();
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    drop_database(&url).await;
}

pub fn order_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

/// Checks out an order for 2 × 15.00 and 1 × 20.00. The total with fees is 66.50.
pub async fn checkout(db: &SqliteDatabase) -> Order {
    let client = ClientSnapshot {
        phone: "+233241234567".into(),
        display_name: "Ama Owusu".into(),
        location: DeliveryLocation { address: "12 Oxford St, Osu".into(), latitude: 5.556, longitude: -0.182 },
    };
    let items = vec![OrderItem::new("Shirt", Money::from(1500), 2), OrderItem::new("Duvet", Money::from(2000), 1)];
    let order = NewOrder::new("client-1", client, items);
    order_api(db).checkout(order, &StubGateway).await.unwrap().order
}

/// Assigns the order and walks it to `delivered`.
pub async fn deliver(db: &SqliteDatabase, order: &Order) {
    let api = order_api(db);
    api.assign_order(order.id, RIDER, PARTNER, ADMIN).await.unwrap();
    api.advance_status(order.id, OrderStatusType::PickedUp, RIDER).await.unwrap();
    api.advance_status(order.id, OrderStatusType::Washing, PARTNER).await.unwrap();
    api.advance_status(order.id, OrderStatusType::Delivered, RIDER).await.unwrap();
}

pub fn charge_success_body(order: &Order) -> String {
    json!({
        "event": "charge.success",
        "data": {
            "id": 4_099_260_516_u64,
            "reference": order.payment_reference.as_str(),
            "amount": order.pricing.total_amount.value(),
            "currency": "GHS",
            "channel": "mobile_money",
            "paid_at": Utc::now().to_rfc3339(),
        }
    })
    .to_string()
}

pub fn sign(body: &str) -> String {
    sign_payload(WEBHOOK_SECRET, body.as_bytes()).unwrap()
}

/// Options for tests: no settlement hold, so a sweep matures everything that exists.
pub fn test_options() -> ServerOptions {
    ServerOptions { settlement_hold: Duration::zero(), ..ServerOptions::default() }
}

pub fn configure(cfg: &mut ServiceConfig, db: SqliteDatabase, webhook_secret: &str) {
    let producers = EventProducers::default();
    let webhook_api = WebhookApi::new(db.clone(), producers.clone(), Secret::new(webhook_secret.to_string()));
    let settlement_api = SettlementApi::new(db.clone(), producers.clone());
    let orders_api = OrderFlowApi::new(db, producers);
    cfg.app_data(web::Data::new(webhook_api))
        .app_data(web::Data::new(settlement_api))
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(test_options()))
        .service(health)
        .service(web::scope("/gateway").service(GatewayWebhookRoute::<SqliteDatabase>::new()))
        .service(
            web::scope("/jobs")
                .wrap(SharedSecretMiddlewareFactory::new(
                    SWEEP_SECRET_HEADER,
                    Some(Secret::new(SWEEP_SECRET.to_string())),
                ))
                .service(SettlementSweepRoute::<SqliteDatabase>::new()),
        );
}

/// Sends the request to a fresh app instance. Errors raised by middleware are returned as their HTTP response would
/// have been.
pub async fn send(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String) {
    send_with_secret(db, req, WEBHOOK_SECRET).await
}

pub async fn send_with_secret(db: &SqliteDatabase, req: TestRequest, webhook_secret: &str) -> (StatusCode, String) {
    let app = App::new().configure(|cfg| configure(cfg, db.clone(), webhook_secret));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn webhook_request(body: &str, signature: Option<&str>) -> TestRequest {
    let req = TestRequest::post().uri("/gateway/webhook").set_payload(body.to_string());
    match signature {
        Some(sig) => req.insert_header((SIGNATURE_HEADER, sig)),
        None => req,
    }
}

pub async fn post_webhook(db: &SqliteDatabase, body: &str, signature: Option<&str>) -> (StatusCode, String) {
    send(db, webhook_request(body, signature)).await
}
