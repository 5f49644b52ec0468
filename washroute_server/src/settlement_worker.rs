use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;
use washroute_engine::{events::EventProducers, LedgerDatabase, LedgerError, OrderFlowApi, SettlementApi, SqliteDatabase};

use crate::{config::ServerOptions, data_objects::SweepSummary};

/// Matures every commission that has served its hold, then cancels orders that were never paid for.
///
/// Both steps are idempotent, so the in-process worker and an external scheduler hitting `/jobs/settlement_sweep`
/// can overlap safely.
pub async fn run_sweep<B: LedgerDatabase>(
    settlement: &SettlementApi<B>,
    orders: &OrderFlowApi<B>,
    options: &ServerOptions,
) -> Result<SweepSummary, LedgerError> {
    let result = settlement.run_settlement_sweep(Utc::now(), options.settlement_hold).await?;
    let expired = orders.expire_unpaid_orders(options.unpaid_order_timeout).await?;
    Ok(SweepSummary {
        cutoff: result.cutoff,
        matured_count: result.matured_count(),
        matured_total: result.matured_total(),
        expired_orders: expired.len(),
    })
}

/// Starts the settlement worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_settlement_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    options: ServerOptions,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let settlement = SettlementApi::new(db.clone(), producers.clone());
        let orders = OrderFlowApi::new(db, producers);
        info!("🕰️ Settlement worker started. Sweeping every {} s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running settlement sweep");
            match run_sweep(&settlement, &orders, &options).await {
                Ok(summary) => info!("🕰️ Settlement sweep complete. {summary}"),
                Err(e) => error!("🕰️ Error running settlement sweep: {e}"),
            }
        }
    })
}
