use crate::{
    db_types::{Commission, ConfirmedBy},
    traits::{data_objects::CommissionOutcome, LedgerError},
};

#[allow(async_fn_in_trait)]
pub trait CommissionManagement {
    /// Creates the commission set for the order and credits the beneficiaries' wallets, in one atomic unit.
    ///
    /// Implementations must guarantee that:
    /// * If the order is already disbursed, nothing changes and the existing commissions are returned.
    /// * At most one commission per `(order, beneficiary role)` is ever stored, even under concurrent calls. A role
    ///   whose beneficiary is not assigned yet is skipped, and may be topped up by a later call.
    /// * A wallet is credited exactly once per stored commission.
    /// * `is_disbursed` is set once every role has its commission.
    ///
    /// The caller is responsible for checking that the order is paid and confirmed. The commission maths uses the fee
    /// snapshot stored on the order.
    async fn create_order_commissions(
        &self,
        order_id: i64,
        confirmed_by: ConfirmedBy,
    ) -> Result<CommissionOutcome, LedgerError>;

    async fn fetch_commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, LedgerError>;

    async fn fetch_commissions_for_user(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError>;
}
