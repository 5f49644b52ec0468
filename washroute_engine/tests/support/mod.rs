#![allow(dead_code)]

use chrono::Utc;
use mockall::mock;
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
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    traits::{ChargeAuthorization, ChargeRequest, TransferReceipt, TransferRequest, VerifiedRecipient},
    FeeConfigApi,
    GatewayError,
    GatewayEvent,
    LedgerDatabase,
    OrderFlowApi,
    PaymentGateway,
    SqliteDatabase,
    UserDirectory,
    WebhookApi,
};
use washroute_common::Secret;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const CLIENT: &str = "client-1";
pub const RIDER: &str = "rider-1";
pub const PARTNER: &str = "partner-1";
pub const IDLE_RIDER: &str = "rider-2";
pub const ADMIN: &str = "admin-1";

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeAuthorization, GatewayError>;
        async fn resolve_recipient(&self, recipient: &str) -> Result<VerifiedRecipient, GatewayError>;
        async fn initiate_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, GatewayError>;
    }
}

/// A gateway that accepts every charge and echoes the reference back.
pub fn charging_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_initialize_charge().returning(|req| {
        Ok(ChargeAuthorization {
            authorization_url: format!("https://checkout.example/{}", req.reference),
            reference: req.reference,
        })
    });
    gateway
}

/// A gateway that verifies every recipient and accepts every transfer.
pub fn transferring_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_resolve_recipient().returning(|recipient| {
        Ok(VerifiedRecipient { recipient: recipient.to_string(), verified_name: "Kojo Mensah".into() })
    });
    gateway
        .expect_initiate_transfer()
        .returning(|req| Ok(TransferReceipt { transfer_code: format!("TRF_{}", req.reference) }));
    gateway
}

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    drop_database(&url).await;
}

/// 9% service fee, 10.00 delivery, 1.00 per line item.
pub fn standard_fees() -> FeeSchedule {
    FeeSchedule::new(Percentage::from_percent(9.0).unwrap(), Money::from_major(10), Money::from_major(1))
}

/// Adds the usual cast to the user directory and sets the standard fee schedule.
pub async fn seed(db: &SqliteDatabase) {
    db.upsert_directory_user(DirectoryUser::new(RIDER, UserRole::Rider, "Kojo").with_payout_recipient("RCP_rider1"))
        .await
        .unwrap();
    db.upsert_directory_user(
        DirectoryUser::new(PARTNER, UserRole::Partner, "Sparkle Laundry").with_payout_recipient("RCP_partner1"),
    )
    .await
    .unwrap();
    db.upsert_directory_user(DirectoryUser::new(IDLE_RIDER, UserRole::Rider, "Yaw").deactivated()).await.unwrap();
    FeeConfigApi::new(db.clone()).set_fee_schedule(standard_fees(), ADMIN).await.unwrap();
}

/// Two line items: 2 × 15.00 and 1 × 20.00. The subtotal is 50.00 and the total with standard fees is 66.50.
pub fn basket(client_id: &str) -> NewOrder {
    let client = ClientSnapshot {
        phone: "+233241234567".into(),
        display_name: "Ama Owusu".into(),
        location: DeliveryLocation { address: "12 Oxford St, Osu".into(), latitude: 5.556, longitude: -0.182 },
    };
    let items = vec![OrderItem::new("Shirt", Money::from(1500), 2), OrderItem::new("Duvet", Money::from(2000), 1)];
    NewOrder::new(client_id, client, items)
}

pub fn order_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

pub fn webhook_api(db: &SqliteDatabase) -> WebhookApi<SqliteDatabase> {
    WebhookApi::new(db.clone(), EventProducers::default(), Secret::new(WEBHOOK_SECRET.to_string()))
}

pub async fn checkout(db: &SqliteDatabase) -> Order {
    order_api(db).checkout(basket(CLIENT), &charging_gateway()).await.unwrap().order
}

pub async fn pay(db: &SqliteDatabase, order: &Order) {
    let event = GatewayEvent::new("charge.success", order.payment_reference.as_str())
        .with_amount(order.pricing.total_amount)
        .with_paid_at(Utc::now());
    webhook_api(db).handle_event(event).await.unwrap();
}

/// Checks out, assigns and walks an order all the way to `delivered`, optionally paying for it on the way.
pub async fn delivered_order(db: &SqliteDatabase, paid: bool) -> Order {
    let api = order_api(db);
    let order = checkout(db).await;
    if paid {
        pay(db, &order).await;
    }
    api.assign_order(order.id, RIDER, PARTNER, ADMIN).await.unwrap();
    api.advance_status(order.id, OrderStatusType::PickedUp, RIDER).await.unwrap();
    api.advance_status(order.id, OrderStatusType::Washing, PARTNER).await.unwrap();
    api.advance_status(order.id, OrderStatusType::Delivered, RIDER).await.unwrap()
}
