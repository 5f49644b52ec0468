use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use washroute_common::Money;

/// The outbound side of the external payment provider.
///
/// The engine only needs three calls: open a charge for a checkout, check a payout recipient, and send a transfer.
/// Charge and transfer *results* arrive asynchronously through the webhook, and are handled by `WebhookApi`.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeAuthorization, GatewayError>;

    /// Confirms that the payout handle is valid and returns the account holder's name as the gateway knows it.
    async fn resolve_recipient(&self, recipient: &str) -> Result<VerifiedRecipient, GatewayError>;

    async fn initiate_transfer(&self, request: TransferRequest) -> Result<TransferReceipt, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Money,
    pub currency: String,
    pub reference: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeAuthorization {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: Money,
    pub reference: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedRecipient {
    pub recipient: String,
    pub verified_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("The payment gateway sent a response we could not understand: {0}")]
    InvalidResponse(String),
}
