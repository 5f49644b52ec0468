use chrono::Utc;
use rand::Rng;

use crate::db_types::OrderCode;

// No 0/O or 1/I, so codes can be read out over the phone.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_CODE_LEN: usize = 8;

fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char).collect()
}

/// A fresh short order code, e.g. `WR-7KQ2ZLAP`. Uniqueness is enforced by the database; callers retry on a clash.
pub fn new_order_code() -> OrderCode {
    OrderCode(format!("WR-{}", random_code(ORDER_CODE_LEN)))
}

/// A unique charge reference to hand to the payment gateway.
pub fn new_payment_reference() -> String {
    format!("WRPAY_{}_{}", Utc::now().timestamp_millis(), random_code(10))
}

pub fn new_payout_reference() -> String {
    format!("WRPO_{}_{}", Utc::now().timestamp_millis(), random_code(10))
}
