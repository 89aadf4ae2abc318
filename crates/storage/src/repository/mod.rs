pub mod milestone;
pub mod peer_review;
pub mod project;
pub mod review_topic;
pub mod role;
pub mod role_metric;
pub mod scoring_store;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Scores and metrics are stored as `NUMERIC(9, 6)`.
const SCORE_SCALE: u32 = 6;

pub(crate) fn decimal_to_f64(decimal: Decimal) -> f64 {
    decimal.to_f64().unwrap_or(0.0)
}

pub(crate) fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(SCORE_SCALE)
}
