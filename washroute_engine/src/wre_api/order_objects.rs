use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Commission, Order, OrderStatusType, PaymentStatus},
    traits::CommissionOutcome,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub client_id: Option<String>,
    pub rider_id: Option<String>,
    pub partner_id: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub statuses: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_rider_id<S: Into<String>>(mut self, rider_id: S) -> Self {
        self.rider_id = Some(rider_id.into());
        self
    }

    pub fn with_partner_id<S: Into<String>>(mut self, partner_id: S) -> Self {
        self.partner_id = Some(partner_id.into());
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() &&
            self.rider_id.is_none() &&
            self.partner_id.is_none() &&
            self.payment_status.is_none() &&
            self.statuses.as_ref().map_or(true, |s| s.is_empty()) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(client_id) = &self.client_id {
            write!(f, "client_id: {client_id}. ")?;
        }
        if let Some(rider_id) = &self.rider_id {
            write!(f, "rider_id: {rider_id}. ")?;
        }
        if let Some(partner_id) = &self.partner_id {
            write!(f, "partner_id: {partner_id}. ")?;
        }
        if let Some(payment_status) = &self.payment_status {
            write!(f, "payment_status: {payment_status}. ")?;
        }
        if let Some(statuses) = self.statuses.as_ref().filter(|s| !s.is_empty()) {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: {statuses}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

/// What the client gets back from checkout: the stored order and the URL where they complete the payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub authorization_url: String,
}

/// The result of a client confirmation or an admin force-confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub order: Order,
    /// `None` when the order is not ready for disbursement yet (e.g. unpaid), so no commissions were attempted.
    pub commissions: Option<CommissionOutcome>,
}

impl ConfirmationResult {
    pub fn new_commissions(&self) -> &[Commission] {
        self.commissions.as_ref().map(|c| c.created()).unwrap_or_default()
    }
}
