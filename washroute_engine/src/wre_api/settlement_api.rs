use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use washroute_common::Money;

use crate::{
    db_types::{Commission, NewAuditEntry, NewPayout, Payout},
    events::{EventProducers, PayoutResolvedEvent},
    helpers::new_payout_reference,
    traits::{
        AuditLog,
        GatewayError,
        LedgerError,
        PaymentGateway,
        PayoutResolution,
        SettlementManagement,
        TransferRequest,
        UserDirectory,
    },
    wre_api::record_audit,
};

/// `SettlementApi` moves earned commissions towards the beneficiary's bank or mobile money account.
///
/// * The settlement sweep matures commissions once the hold period has passed.
/// * An administrator initiates a payout for a user, which claims that user's eligible commissions and asks the
///   payment gateway to send a transfer.
/// * The gateway reports the transfer result through the webhook, which completes or fails the payout.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Commissions created at or before this moment were due to mature.
    pub cutoff: DateTime<Utc>,
    /// The commissions this run moved to `ready_for_payout`.
    pub matured: Vec<Commission>,
}

impl SweepResult {
    pub fn matured_count(&self) -> usize {
        self.matured.len()
    }

    pub fn matured_total(&self) -> Money {
        self.matured.iter().map(|c| c.amount).sum()
    }
}

impl<B> SettlementApi<B>
where B: SettlementManagement + UserDirectory + AuditLog
{
    /// Moves every `pending_settlement` commission that is at least `hold` old to `ready_for_payout`.
    ///
    /// The sweep is idempotent and safe to run concurrently: a commission that has already matured is not touched
    /// again, so a second run in the same window reports nothing.
    pub async fn run_settlement_sweep(&self, now: DateTime<Utc>, hold: Duration) -> Result<SweepResult, LedgerError> {
        let cutoff = now
            .checked_sub_signed(hold)
            .ok_or_else(|| LedgerError::Validation(format!("A settlement hold of {hold} is out of range")))?;
        trace!("⏳️ Running settlement sweep for commissions created before {cutoff}");
        let matured = self.db.mature_commissions(cutoff, now).await?;
        let result = SweepResult { cutoff, matured };
        if result.matured.is_empty() {
            debug!("⏳️ Settlement sweep: nothing to mature.");
        } else {
            info!(
                "⏳️ Settlement sweep: {} commission(s) worth {} are now ready for payout.",
                result.matured_count(),
                result.matured_total()
            );
        }
        Ok(result)
    }

    pub async fn payout_eligible_commissions(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError> {
        self.db.fetch_payout_eligible_commissions(user_id).await
    }

    /// Sum of the user's `ready_for_payout` and `failed` commissions.
    pub async fn payout_eligible_total(&self, user_id: &str) -> Result<Money, LedgerError> {
        let eligible = self.db.fetch_payout_eligible_commissions(user_id).await?;
        Ok(eligible.iter().map(|c| c.amount).sum())
    }

    /// Pays out up to `amount` of the user's eligible commissions.
    ///
    /// Commissions are taken oldest first, skipping any that would push the batch over `amount`, so the payout may
    /// be smaller than requested. The chosen commissions are moved to `processing` in one transaction *before* the
    /// gateway is called, so they cannot end up in a second batch. If the gateway call fails, the batch is failed
    /// straight away, which leaves the commissions eligible for the next attempt, and the gateway error is returned.
    pub async fn initiate_payout<G: PaymentGateway>(
        &self,
        user_id: &str,
        amount: Money,
        performed_by: &str,
        gateway: &G,
    ) -> Result<Payout, LedgerError> {
        if amount <= Money::zero() {
            return Err(LedgerError::Validation(format!("Payout amount must be positive, not {amount}")));
        }
        let user = self.db.fetch_directory_user(user_id).await?.ok_or_else(|| LedgerError::UserNotFound(user_id.into()))?;
        if !user.is_active {
            return Err(LedgerError::Validation(format!("User {user_id} is not active")));
        }
        let recipient = user
            .payout_recipient
            .ok_or_else(|| LedgerError::Validation(format!("User {user_id} has no payout details on file")))?;
        let eligible = self.db.fetch_payout_eligible_commissions(user_id).await?;
        let available: Money = eligible.iter().map(|c| c.amount).sum();
        if amount > available {
            return Err(LedgerError::Validation(format!(
                "Requested payout of {amount} exceeds the {available} available to {user_id}"
            )));
        }
        let (commission_ids, batch_total) = select_for_payout(&eligible, amount);
        if batch_total.is_zero() {
            return Err(LedgerError::Validation(format!(
                "No eligible commission for {user_id} fits within a payout of {amount}"
            )));
        }
        let reference = new_payout_reference();
        let new_payout = NewPayout {
            reference: reference.clone(),
            user_id: user_id.to_string(),
            initiated_by: performed_by.to_string(),
            commission_ids,
            amount: batch_total,
        };
        let payout = self.db.open_payout(new_payout).await?;
        info!("⏳️ Payout {reference} of {batch_total} opened for {user_id} by {performed_by}");
        let payout = match self.send_transfer(&payout, &recipient, gateway).await {
            Ok(transfer_code) => self.db.record_transfer_code(&reference, &transfer_code).await?,
            Err(e) => {
                warn!("⏳️ Transfer for payout {reference} could not be sent: {e}. Failing the batch.");
                if let Err(fail_err) = self.db.fail_payout(&reference, &e.to_string()).await {
                    error!(
                        "⏳️ Payout {reference} could not be failed after the gateway error ({fail_err}). Its \
                         commissions are stuck in processing and need manual attention."
                    );
                }
                let entry = NewAuditEntry::new("payout.initiation_failed", performed_by, payout_target(&reference))
                    .with_metadata(json!({ "user_id": user_id, "amount": batch_total.value(), "error": e.to_string() }));
                record_audit(&self.db, entry).await;
                return Err(e.into());
            },
        };
        let entry = NewAuditEntry::new("payout.initiated", performed_by, payout_target(&reference)).with_metadata(
            json!({ "user_id": user_id, "amount": batch_total.value(), "transfer_code": payout.transfer_code }),
        );
        record_audit(&self.db, entry).await;
        Ok(payout)
    }

    async fn send_transfer<G: PaymentGateway>(
        &self,
        payout: &Payout,
        recipient: &str,
        gateway: &G,
    ) -> Result<String, GatewayError> {
        let verified = gateway.resolve_recipient(recipient).await?;
        debug!("⏳️ Payout recipient for {} verified as {}", payout.user_id, verified.verified_name);
        let request = TransferRequest {
            recipient: verified.recipient,
            amount: payout.amount,
            reference: payout.reference.clone(),
            reason: format!("WashRoute earnings payout {}", payout.reference),
        };
        let receipt = gateway.initiate_transfer(request).await?;
        Ok(receipt.transfer_code)
    }

    /// The gateway confirmed the transfer. Commissions become `paid` and the pending balance is debited.
    pub async fn complete_payout(&self, reference: &str, performed_by: &str) -> Result<PayoutResolution, LedgerError> {
        let resolution = self.db.complete_payout(reference).await?;
        self.after_resolution(&resolution, "payout.paid", performed_by, None).await;
        Ok(resolution)
    }

    /// The gateway reported a failed or reversed transfer. Commissions become `failed`, which keeps them eligible for
    /// a new payout. The wallet is untouched because no money left it.
    pub async fn fail_payout(
        &self,
        reference: &str,
        reason: &str,
        performed_by: &str,
    ) -> Result<PayoutResolution, LedgerError> {
        let resolution = self.db.fail_payout(reference, reason).await?;
        self.after_resolution(&resolution, "payout.failed", performed_by, Some(reason)).await;
        Ok(resolution)
    }

    async fn after_resolution(
        &self,
        resolution: &PayoutResolution,
        action: &str,
        performed_by: &str,
        reason: Option<&str>,
    ) {
        let payout = resolution.payout();
        match resolution {
            PayoutResolution::Resolved { commissions, .. } => {
                info!(
                    "⏳️ Payout {} for {} is now {} ({} commission(s))",
                    payout.reference,
                    payout.user_id,
                    payout.status,
                    commissions.len()
                );
                let entry = NewAuditEntry::new(action, performed_by, payout_target(&payout.reference))
                    .with_metadata(json!({ "amount": payout.amount.value(), "reason": reason }));
                record_audit(&self.db, entry).await;
                self.producers.publish_payout_resolved(PayoutResolvedEvent::new(payout.clone())).await;
            },
            PayoutResolution::AlreadyResolved(_) => {
                debug!("⏳️ Payout {} was already {}. Nothing to do.", payout.reference, payout.status);
            },
        }
    }

    pub async fn payout(&self, reference: &str) -> Result<Option<Payout>, LedgerError> {
        self.db.fetch_payout(reference).await
    }

    pub async fn payouts_for_user(&self, user_id: &str) -> Result<Vec<Payout>, LedgerError> {
        self.db.fetch_payouts_for_user(user_id).await
    }

    pub async fn commissions_for_payout(&self, reference: &str) -> Result<Vec<Commission>, LedgerError> {
        self.db.fetch_commissions_for_payout(reference).await
    }
}

/// Picks commissions oldest first while the running total stays within `limit`.
fn select_for_payout(eligible: &[Commission], limit: Money) -> (Vec<i64>, Money) {
    let mut total = Money::zero();
    let mut ids = Vec::new();
    for commission in eligible {
        if total + commission.amount <= limit {
            total += commission.amount;
            ids.push(commission.id);
        }
    }
    (ids, total)
}

fn payout_target(reference: &str) -> String {
    format!("payout:{reference}")
}
