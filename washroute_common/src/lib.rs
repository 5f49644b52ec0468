pub mod helpers;
mod money;
mod percentage;
mod secret;

pub mod op;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE, MINOR_UNITS_PER_MAJOR};
pub use percentage::{Percentage, PercentageError};
pub use secret::Secret;
