mod commission_split;
mod references;
mod webhook_signature;

pub use commission_split::{plan_commissions, CommissionSplit};
pub use references::{new_order_code, new_payment_reference, new_payout_reference};
pub use webhook_signature::{sign_payload, verify_signature, WebhookSignatureError};
