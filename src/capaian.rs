//! Achievement ("capaian") arithmetic shared by row views, aggregates and exports.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// `round(realisasi / target * 100, 2)`, or zero when there is no target.
pub fn capaian(realisasi: Decimal, target: Decimal) -> Decimal {
    let mut pct = if target.is_zero() {
        Decimal::ZERO
    } else {
        (realisasi * Decimal::ONE_HUNDRED / target)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };
    // always two decimals so "50" renders as "50.00"
    pct.rescale(2);
    pct
}

/// Lossy conversion for spreadsheet cells.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
