use cucumber::given;
use washroute_engine::{
    db_types::{DirectoryUser, FeeSchedule, Money, Percentage, UserRole},
    FeeConfigApi,
    UserDirectory,
};

use crate::{
    cucumber::{LedgerSystem, LedgerWorld},
    support::ADMIN,
};

#[given("a fresh install")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = LedgerSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "{word} '{word}' is active with payout account '{word}'")]
async fn active_user(world: &mut LedgerWorld, role: String, id: String, recipient: String) {
    let role = role.parse::<UserRole>().expect("Not a valid role");
    let user = DirectoryUser::new(id.as_str(), role, id.as_str()).with_payout_recipient(recipient);
    world.system().db.upsert_directory_user(user).await.expect("Error adding user");
}

#[given(expr = "the fee schedule is {word} service, {word} delivery and {word} per item")]
async fn fee_schedule(world: &mut LedgerWorld, service: String, delivery: String, per_item: String) {
    let service = service.trim_end_matches('%').parse::<f64>().expect("Not a valid percentage");
    let schedule = FeeSchedule::new(
        Percentage::from_percent(service).expect("Not a valid percentage"),
        delivery.parse::<Money>().expect("Not a valid amount"),
        per_item.parse::<Money>().expect("Not a valid amount"),
    );
    FeeConfigApi::new(world.system().db.clone()).set_fee_schedule(schedule, ADMIN).await.expect("Error setting fees");
}
