use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use washroute_engine::{db_types::Money, ReconcileOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body returned to the payment gateway for every webhook it delivers that passed signature checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

impl From<ReconcileOutcome> for WebhookResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self { received: true, outcome }
    }
}

/// The result of one settlement sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Commissions created at or before this moment were due to mature.
    pub cutoff: DateTime<Utc>,
    pub matured_count: usize,
    pub matured_total: Money,
    pub expired_orders: usize,
}

impl Display for SweepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} commission(s) worth {} matured, {} unpaid order(s) expired",
            self.matured_count, self.matured_total, self.expired_orders
        )
    }
}
