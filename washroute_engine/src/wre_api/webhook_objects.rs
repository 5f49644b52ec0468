use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use washroute_common::Money;

use crate::{helpers::WebhookSignatureError, traits::LedgerError};

/// A payment gateway webhook body, e.g.
///
/// ```json
/// { "event": "charge.success", "data": { "reference": "WRPAY_...", "amount": 6650, "paid_at": "2024-06-01T10:00:00Z", "channel": "mobile_money" } }
/// ```
///
/// Amounts are in minor units. Unknown fields are ignored, since the gateway sends a lot more than we need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, alias = "gateway_response")]
    pub reason: Option<String>,
}

impl GatewayEvent {
    pub fn new<E: Into<String>, R: Into<String>>(event: E, reference: R) -> Self {
        Self { event: event.into(), data: GatewayEventData { reference: reference.into(), ..Default::default() } }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.data.amount = Some(amount);
        self
    }

    pub fn with_paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.data.paid_at = Some(paid_at);
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.data.reason = Some(reason.into());
        self
    }

    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from(self.event.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventKind {
    ChargeSuccess,
    ChargeFailed,
    TransferSuccess,
    TransferFailed,
    TransferReversed,
    Unknown,
}

impl From<&str> for GatewayEventKind {
    fn from(value: &str) -> Self {
        match value {
            "charge.success" => Self::ChargeSuccess,
            "charge.failed" => Self::ChargeFailed,
            "transfer.success" => Self::TransferSuccess,
            "transfer.failed" => Self::TransferFailed,
            "transfer.reversed" => Self::TransferReversed,
            _ => Self::Unknown,
        }
    }
}

/// What happened to a webhook event. None of these are errors: the gateway gets a success response for all of them,
/// so it does not retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The event changed the ledger.
    Applied(String),
    /// The event had already been applied. Replays end up here.
    AlreadyApplied(String),
    /// The event could not be matched or is not one we act on. Nothing changed.
    Discarded(String),
}

impl ReconcileOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied(s) => write!(f, "Applied: {s}"),
            Self::AlreadyApplied(s) => write!(f, "Already applied: {s}"),
            Self::Discarded(s) => write!(f, "Discarded: {s}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Webhook signature verification failed. {0}")]
    InvalidSignature(#[from] WebhookSignatureError),
    #[error("Could not parse the webhook payload. {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
