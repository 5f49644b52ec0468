use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
pub use washroute_common::{Money, Percentage};

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Implements `Display` and `FromStr` for a snake_case enum so that the in-code, database and wire representations
/// all agree.
macro_rules! snake_case_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConversionError::new(stringify!($name), s)),
                }
            }
        }
    };
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The fulfilment state of an order.
///
/// Every state apart from `Cancelled` carries a priority. A status update is only legal when it strictly increases
/// the priority, so states can be skipped but never revisited. `Cancelled` is terminal and sits outside the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatusType {
    Created,
    Assigned,
    OnMyWayToPick,
    PickedUp,
    DroppedAtLaundry,
    Washing,
    ReadyForPick,
    OutForDelivery,
    Delivered,
    Cancelled,
}

snake_case_enum!(OrderStatusType {
    Created => "created",
    Assigned => "assigned",
    OnMyWayToPick => "on_my_way_to_pick",
    PickedUp => "picked_up",
    DroppedAtLaundry => "dropped_at_laundry",
    Washing => "washing",
    ReadyForPick => "ready_for_pick",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatusType {
    pub const PROGRESSION: [OrderStatusType; 9] = [
        OrderStatusType::Created,
        OrderStatusType::Assigned,
        OrderStatusType::OnMyWayToPick,
        OrderStatusType::PickedUp,
        OrderStatusType::DroppedAtLaundry,
        OrderStatusType::Washing,
        OrderStatusType::ReadyForPick,
        OrderStatusType::OutForDelivery,
        OrderStatusType::Delivered,
    ];

    /// Numeric priority used for transition guards. `Cancelled` has none.
    pub fn priority(&self) -> Option<u8> {
        use OrderStatusType::*;
        match self {
            Created => Some(1),
            Assigned => Some(2),
            OnMyWayToPick => Some(3),
            PickedUp => Some(4),
            DroppedAtLaundry => Some(5),
            Washing => Some(6),
            ReadyForPick => Some(7),
            OutForDelivery => Some(8),
            Delivered => Some(9),
            Cancelled => None,
        }
    }

    /// True if moving from `self` to `next` is a legal forward progression.
    pub fn can_advance_to(&self, next: OrderStatusType) -> bool {
        match (self.priority(), next.priority()) {
            (Some(current), Some(new)) => new > current,
            _ => false,
        }
    }

    /// Cancellation is only possible before the rider and partner have physically engaged with the order.
    pub fn is_cancellable(&self) -> bool {
        matches!(self.priority(), Some(p) if p <= 2)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Abandoned,
}

snake_case_enum!(PaymentStatus {
    Pending => "pending",
    Success => "success",
    Failed => "failed",
    Abandoned => "abandoned",
});

//--------------------------------------       UserRole        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Rider,
    Partner,
    Admin,
}

snake_case_enum!(UserRole {
    Client => "client",
    Rider => "rider",
    Partner => "partner",
    Admin => "admin",
});

//--------------------------------------   BeneficiaryRole     ---------------------------------------------------------
/// Which party a commission credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BeneficiaryRole {
    Platform,
    Rider,
    Partner,
}

snake_case_enum!(BeneficiaryRole {
    Platform => "platform",
    Rider => "rider",
    Partner => "partner",
});

//--------------------------------------   CommissionType      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CommissionType {
    DeliveryFee,
    ServiceFee,
    PlatformFee,
    Bonus,
    Penalty,
}

snake_case_enum!(CommissionType {
    DeliveryFee => "delivery_fee",
    ServiceFee => "service_fee",
    PlatformFee => "platform_fee",
    Bonus => "bonus",
    Penalty => "penalty",
});

//--------------------------------------     PayoutStatus      ---------------------------------------------------------
/// Settlement state of a single commission.
///
/// `PendingSettlement → ReadyForPayout → Processing → Paid`, with `Processing → Failed`. Failed commissions are
/// eligible for a new payout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayoutStatus {
    PendingSettlement,
    ReadyForPayout,
    Processing,
    Paid,
    Failed,
}

snake_case_enum!(PayoutStatus {
    PendingSettlement => "pending_settlement",
    ReadyForPayout => "ready_for_payout",
    Processing => "processing",
    Paid => "paid",
    Failed => "failed",
});

impl PayoutStatus {
    pub fn is_payout_eligible(&self) -> bool {
        matches!(self, PayoutStatus::ReadyForPayout | PayoutStatus::Failed)
    }
}

//--------------------------------------      ConfirmedBy      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ConfirmedBy {
    Client,
    Admin,
    System,
}

snake_case_enum!(ConfirmedBy {
    Client => "client",
    Admin => "admin",
    System => "system",
});

//--------------------------------------   TransactionType     ---------------------------------------------------------
/// Wallet ledger entry kinds. `Payout` records money leaving the pending balance; it does not count towards
/// `total_earned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionType {
    Earning,
    Bonus,
    Deduction,
    Payout,
}

snake_case_enum!(TransactionType {
    Earning => "earning",
    Bonus => "bonus",
    Deduction => "deduction",
    Payout => "payout",
});

impl TransactionType {
    /// The signed contribution of a transaction of this type to `total_earned`.
    pub fn earned_delta(&self, amount: Money) -> Money {
        match self {
            TransactionType::Earning | TransactionType::Bonus => amount,
            TransactionType::Deduction => -amount,
            TransactionType::Payout => Money::zero(),
        }
    }
}

/// The two kinds of manual wallet correction an administrator may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Bonus,
    Deduction,
}

impl From<AdjustmentType> for TransactionType {
    fn from(value: AdjustmentType) -> Self {
        match value {
            AdjustmentType::Bonus => TransactionType::Bonus,
            AdjustmentType::Deduction => TransactionType::Deduction,
        }
    }
}

//--------------------------------------  PayoutBatchStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayoutBatchStatus {
    Processing,
    Paid,
    Failed,
}

snake_case_enum!(PayoutBatchStatus {
    Processing => "processing",
    Paid => "paid",
    Failed => "failed",
});

//--------------------------------------      OrderCode        ---------------------------------------------------------
/// The short, human-facing order code, e.g. `WR-7KQ2ZL0P`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderCode(pub String);

impl FromStr for OrderCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl OrderCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     FeeSchedule       ---------------------------------------------------------
/// Platform fee configuration. Orders carry a copy of the schedule that was current when they were created, and all
/// later pricing and commission maths uses that copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FeeSchedule {
    /// Percentage of the items subtotal charged as a service fee, and retained by the platform.
    pub service_fee: Percentage,
    /// Flat delivery fee, passed on in full to the rider.
    pub delivery_fee: Money,
    /// Fee charged per line item, retained by the platform out of the partner's share.
    pub per_item_fee: Money,
}

impl FeeSchedule {
    pub fn new(service_fee: Percentage, delivery_fee: Money, per_item_fee: Money) -> Self {
        Self { service_fee, delivery_fee, per_item_fee }
    }

    /// Monetary components must be non-negative. The percentage is already range-checked by its constructor.
    pub fn validate(&self) -> Result<(), String> {
        if self.delivery_fee.is_negative() {
            return Err(format!("Delivery fee cannot be negative ({})", self.delivery_fee));
        }
        if self.per_item_fee.is_negative() {
            return Err(format!("Per-item fee cannot be negative ({})", self.per_item_fee));
        }
        Ok(())
    }
}

impl Display for FeeSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "service fee {}, delivery fee {}, per-item fee {}",
            self.service_fee, self.delivery_fee, self.per_item_fee
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeeScheduleRecord {
    pub id: i64,
    #[sqlx(flatten)]
    pub schedule: FeeSchedule,
    pub set_by: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new<S: Into<String>>(name: S, unit_price: Money, quantity: i64) -> Self {
        Self { name: name.into(), unit_price, quantity }
    }

    /// `None` if the line total does not fit in a [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

//--------------------------------------    ClientSnapshot     ---------------------------------------------------------
/// The client's details as they were at checkout. Later profile edits must not rewrite order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub phone: String,
    pub display_name: String,
    pub location: DeliveryLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLocation {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

//--------------------------------------   PricingBreakdown    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PricingBreakdown {
    pub items_subtotal: Money,
    pub service_fee_amount: Money,
    pub delivery_fee_amount: Money,
    pub system_fee_amount: Money,
    pub total_amount: Money,
}

impl PricingBreakdown {
    /// Prices a basket of items against a fee schedule.
    ///
    /// The system fee is charged per line item, not per unit.
    /// Fails if any intermediate amount overflows.
    pub fn calculate(items: &[OrderItem], fees: &FeeSchedule) -> Result<Self, String> {
        let too_large = || "The order total is too large to be priced".to_string();
        let items_subtotal = items.iter().try_fold(Money::zero(), |acc, item| {
            item.line_total().and_then(|line| acc.checked_add(line)).ok_or_else(too_large)
        })?;
        let service_fee_amount = items_subtotal.percent_of(fees.service_fee);
        let delivery_fee_amount = fees.delivery_fee;
        let item_count = i64::try_from(items.len()).map_err(|_| too_large())?;
        let system_fee_amount = fees.per_item_fee.checked_mul(item_count).ok_or_else(too_large)?;
        let total_amount = items_subtotal
            .checked_add(service_fee_amount)
            .and_then(|v| v.checked_add(delivery_fee_amount))
            .and_then(|v| v.checked_add(system_fee_amount))
            .ok_or_else(too_large)?;
        Ok(Self { items_subtotal, service_fee_amount, delivery_fee_amount, system_fee_amount, total_amount })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_code: OrderCode,
    pub client_id: String,
    pub client: Json<ClientSnapshot>,
    pub items: Json<Vec<OrderItem>>,
    #[sqlx(flatten)]
    pub pricing: PricingBreakdown,
    #[sqlx(flatten)]
    pub fees: FeeSchedule,
    pub currency: String,
    pub status: OrderStatusType,
    pub rider_id: Option<String>,
    pub partner_id: Option<String>,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_confirmed_by_client: bool,
    pub is_admin_confirmed: bool,
    pub is_disbursed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn item_count(&self) -> i64 {
        #[allow(clippy::cast_possible_wrap)]
        let n = self.items.len() as i64;
        n
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Success
    }

    pub fn is_confirmed(&self) -> bool {
        self.is_confirmed_by_client || self.is_admin_confirmed
    }

    pub fn is_fully_assigned(&self) -> bool {
        self.rider_id.is_some() && self.partner_id.is_some()
    }

    /// True when every precondition for creating the commission set holds: paid, confirmed by the client or an admin,
    /// and both a rider and a partner attached. Commission creation is deferred until all of them are present.
    pub fn is_ready_for_disbursement(&self) -> bool {
        self.is_paid() && self.is_confirmed() && self.is_fully_assigned()
    }

    pub fn beneficiary_for(&self, role: BeneficiaryRole) -> Option<&str> {
        match role {
            BeneficiaryRole::Platform => None,
            BeneficiaryRole::Rider => self.rider_id.as_deref(),
            BeneficiaryRole::Partner => self.partner_id.as_deref(),
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order {} (#{}) for {} [{}] status: {}, payment: {}",
            self.order_code, self.id, self.client_id, self.pricing.total_amount, self.status, self.payment_status
        )
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: String,
    pub client: ClientSnapshot,
    pub items: Vec<OrderItem>,
    pub currency: String,
}

impl NewOrder {
    pub fn new<S: Into<String>>(client_id: S, client: ClientSnapshot, items: Vec<OrderItem>) -> Self {
        Self { client_id: client_id.into(), client, items, currency: washroute_common::DEFAULT_CURRENCY_CODE.into() }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("Client id is required".into());
        }
        if self.client.phone.trim().is_empty() {
            return Err("Client phone number is required".into());
        }
        if self.items.is_empty() {
            return Err("An order needs at least one item".into());
        }
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err("Item names cannot be empty".into());
            }
            if item.quantity < 1 {
                return Err(format!("Quantity for '{}' must be at least 1", item.name));
            }
            if item.unit_price.is_negative() {
                return Err(format!("Unit price for '{}' cannot be negative", item.name));
            }
        }
        Ok(())
    }
}

/// Everything the storage layer needs to persist a priced, reference-bearing order.
#[derive(Debug, Clone)]
pub struct OrderInsert {
    pub order_code: OrderCode,
    pub order: NewOrder,
    pub pricing: PricingBreakdown,
    pub fees: FeeSchedule,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Commission       ---------------------------------------------------------
/// The inputs used to derive a commission amount. Written once and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionCalculation {
    pub base_amount: Money,
    pub percentage: Percentage,
    pub item_count: i64,
    pub per_item_fee: Money,
    pub item_commission: Money,
    pub percentage_fee: Money,
    pub delivery_fee: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Commission {
    pub id: i64,
    pub order_id: i64,
    pub beneficiary_id: Option<String>,
    pub beneficiary_role: BeneficiaryRole,
    pub commission_type: CommissionType,
    pub amount: Money,
    pub calculation: Json<CommissionCalculation>,
    pub order_status: OrderStatusType,
    pub payout_status: PayoutStatus,
    pub confirmed_by: ConfirmedBy,
    pub transfer_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Display for Commission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Commission #{} on order #{}: {} {} to {} ({})",
            self.id,
            self.order_id,
            self.commission_type,
            self.amount,
            self.beneficiary_id.as_deref().unwrap_or("platform"),
            self.payout_status
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCommission {
    pub order_id: i64,
    pub beneficiary_id: Option<String>,
    pub beneficiary_role: BeneficiaryRole,
    pub commission_type: CommissionType,
    pub amount: Money,
    pub calculation: CommissionCalculation,
    pub order_status: OrderStatusType,
    pub confirmed_by: ConfirmedBy,
}

//--------------------------------------    WalletBalance      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WalletBalance {
    pub user_id: String,
    pub total_earned: Money,
    pub pending_balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Display for WalletBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wallet[{}]: earned {}, pending {}", self.user_id, self.total_earned, self.pending_balance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: String,
    pub tx_type: TransactionType,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<i64>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single ledger mutation: one transaction row plus the matching balance deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: String,
    pub tx_type: TransactionType,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<i64>,
    pub performed_by: Option<String>,
}

impl LedgerEntry {
    pub fn new<S: Into<String>, D: Into<String>>(user_id: S, tx_type: TransactionType, amount: Money, desc: D) -> Self {
        Self {
            user_id: user_id.into(),
            tx_type,
            amount,
            description: desc.into(),
            order_id: None,
            performed_by: None,
        }
    }

    pub fn for_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn performed_by<S: Into<String>>(mut self, who: S) -> Self {
        self.performed_by = Some(who.into());
        self
    }

    /// Change to `total_earned` implied by this entry.
    pub fn earned_delta(&self) -> Money {
        self.tx_type.earned_delta(self.amount)
    }

    /// Change to `pending_balance` implied by this entry.
    pub fn pending_delta(&self) -> Money {
        match self.tx_type {
            TransactionType::Earning => self.amount,
            TransactionType::Payout => -self.amount,
            TransactionType::Bonus | TransactionType::Deduction => Money::zero(),
        }
    }
}

//--------------------------------------        Payout         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: i64,
    pub reference: String,
    pub user_id: String,
    pub amount: Money,
    pub status: PayoutBatchStatus,
    pub transfer_code: Option<String>,
    pub failure_reason: Option<String>,
    pub initiated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayout {
    pub reference: String,
    pub user_id: String,
    pub initiated_by: String,
    pub commission_ids: Vec<i64>,
    pub amount: Money,
}

//--------------------------------------    DirectoryUser      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DirectoryUser {
    pub id: String,
    pub role: UserRole,
    pub display_name: String,
    pub is_active: bool,
    /// The gateway's transfer-recipient handle, once the user's payout details have been verified.
    pub payout_recipient: Option<String>,
}

impl DirectoryUser {
    pub fn new<S: Into<String>, N: Into<String>>(id: S, role: UserRole, display_name: N) -> Self {
        Self { id: id.into(), role, display_name: display_name.into(), is_active: true, payout_recipient: None }
    }

    pub fn with_payout_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.payout_recipient = Some(recipient.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

//--------------------------------------      AuditEntry       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub performed_by: String,
    pub target_entity: String,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub action: String,
    pub performed_by: String,
    pub target_entity: String,
    pub metadata: Value,
}

impl NewAuditEntry {
    pub fn new<A: Into<String>, P: Into<String>, T: Into<String>>(action: A, performed_by: P, target: T) -> Self {
        Self {
            action: action.into(),
            performed_by: performed_by.into(),
            target_entity: target.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_priorities_are_strictly_increasing() {
        let priorities =
            OrderStatusType::PROGRESSION.iter().map(|s| s.priority().expect("has priority")).collect::<Vec<_>>();
        assert!(priorities.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(OrderStatusType::Cancelled.priority(), None);
    }

    #[test]
    fn skipping_is_allowed_but_regression_is_not() {
        use OrderStatusType::*;
        assert!(Assigned.can_advance_to(Washing));
        assert!(Created.can_advance_to(Delivered));
        assert!(!Washing.can_advance_to(PickedUp));
        assert!(!Washing.can_advance_to(Washing));
        assert!(!Cancelled.can_advance_to(Delivered));
        assert!(!Created.can_advance_to(Cancelled));
    }

    #[test]
    fn cancellable_states() {
        use OrderStatusType::*;
        assert!(Created.is_cancellable());
        assert!(Assigned.is_cancellable());
        assert!(!OnMyWayToPick.is_cancellable());
        assert!(!Cancelled.is_cancellable());
    }

    #[test]
    fn status_text_round_trips_through_the_wire_names() {
        for status in OrderStatusType::PROGRESSION {
            assert_eq!(status.as_str().parse::<OrderStatusType>().unwrap(), status);
        }
        assert_eq!("dropped_at_laundry".parse::<OrderStatusType>().unwrap(), OrderStatusType::DroppedAtLaundry);
        assert!("Delivered".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn pricing_snapshot() {
        let fees = FeeSchedule::new(Percentage::from_percent(9.0).unwrap(), Money::from(1000), Money::from(100));
        let items =
            vec![OrderItem::new("Shirt", Money::from(1000), 3), OrderItem::new("Duvet", Money::from(2000), 1)];
        let pricing = PricingBreakdown::calculate(&items, &fees).unwrap();
        assert_eq!(pricing.items_subtotal, Money::from(5000));
        assert_eq!(pricing.service_fee_amount, Money::from(450));
        assert_eq!(pricing.delivery_fee_amount, Money::from(1000));
        assert_eq!(pricing.system_fee_amount, Money::from(200));
        assert_eq!(pricing.total_amount, Money::from(6650));
    }

    #[test]
    fn pricing_rejects_amounts_that_overflow() {
        let fees = FeeSchedule::new(Percentage::from_percent(9.0).unwrap(), Money::from(1000), Money::from(100));
        let huge_line = vec![OrderItem::new("Shirt", Money::from(1500), i64::MAX / 1000)];
        assert!(PricingBreakdown::calculate(&huge_line, &fees).unwrap_err().contains("too large"));
        let huge_sum =
            vec![OrderItem::new("Duvet", Money::from(i64::MAX / 2), 1), OrderItem::new("Rug", Money::from(i64::MAX / 2), 1)];
        assert!(PricingBreakdown::calculate(&huge_sum, &fees).is_err());
        let huge_fee = FeeSchedule::new(Percentage::from_percent(0.0).unwrap(), Money::from(i64::MAX), Money::zero());
        let items = vec![OrderItem::new("Shirt", Money::from(1000), 1)];
        assert!(PricingBreakdown::calculate(&items, &huge_fee).is_err());
    }

    #[test]
    fn ledger_entry_deltas() {
        let earning = LedgerEntry::new("u1", TransactionType::Earning, Money::from(500), "x");
        assert_eq!((earning.earned_delta(), earning.pending_delta()), (Money::from(500), Money::from(500)));
        let deduction = LedgerEntry::new("u1", TransactionType::Deduction, Money::from(200), "x");
        assert_eq!((deduction.earned_delta(), deduction.pending_delta()), (Money::from(-200), Money::zero()));
        let payout = LedgerEntry::new("u1", TransactionType::Payout, Money::from(300), "x");
        assert_eq!((payout.earned_delta(), payout.pending_delta()), (Money::zero(), Money::from(-300)));
    }

    #[test]
    fn new_order_validation() {
        let client = ClientSnapshot {
            phone: "+233200000000".into(),
            display_name: "Ama".into(),
            location: DeliveryLocation { address: "12 Ring Rd".into(), latitude: 5.6, longitude: -0.18 },
        };
        let ok = NewOrder::new("c1", client.clone(), vec![OrderItem::new("Shirt", Money::from(500), 1)]);
        assert!(ok.validate().is_ok());
        let empty = NewOrder::new("c1", client.clone(), vec![]);
        assert!(empty.validate().is_err());
        let zero_qty = NewOrder::new("c1", client, vec![OrderItem::new("Shirt", Money::from(500), 0)]);
        assert!(zero_qty.validate().unwrap_err().contains("at least 1"));
    }
}
