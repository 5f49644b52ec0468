use std::collections::HashMap;

use cucumber::World;
use log::*;
use washroute_engine::{
    db_types::{Order, Payout},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    SettlementApi,
    SqliteDatabase,
    WalletApi,
    WebhookApi,
};
use washroute_common::Secret;

use crate::support::WEBHOOK_SECRET;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
}

#[derive(Debug)]
pub struct LedgerSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub settlement: SettlementApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
    pub webhooks: WebhookApi<SqliteDatabase>,
    /// Orders by the label the scenario gave them
    pub order_labels: HashMap<String, Order>,
    pub last_payout: Option<Payout>,
    pub last_matured: usize,
    pub last_error: Option<String>,
}

impl LedgerWorld {
    pub fn system(&self) -> &LedgerSystem {
        self.system.as_ref().expect("Ledger not initialised")
    }

    pub fn system_mut(&mut self) -> &mut LedgerSystem {
        self.system.as_mut().expect("Ledger not initialised")
    }

    /// The latest stored state of the order with the given label.
    pub async fn order(&self, label: &str) -> Order {
        let sys = self.system();
        let order = sys.order_labels.get(label).unwrap_or_else(|| panic!("No order labelled '{label}'"));
        sys.orders.order_by_id(order.id).await.expect("Error fetching order").expect("Order has disappeared")
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        Self {
            db_path: url,
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            settlement: SettlementApi::new(db.clone(), producers.clone()),
            wallets: WalletApi::new(db.clone()),
            webhooks: WebhookApi::new(db.clone(), producers, Secret::new(WEBHOOK_SECRET.to_string())),
            db,
            order_labels: HashMap::new(),
            last_payout: None,
            last_matured: 0,
            last_error: None,
        }
    }
}
