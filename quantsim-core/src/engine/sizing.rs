//! Entry sizing — requested quantity bounded by cash and the notional cap,
//! truncated to the lot resolution.

use super::params::SimParams;

/// Lots per unit: quantities are held in multiples of 1e-6.
pub const LOT_SCALE: f64 = 1_000_000.0;

/// Tolerance, in lots, under which a scaled quantity counts as sitting on a
/// lot boundary.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Truncate `quantity` down to whole lots, snapping up near a boundary.
///
/// This is not a pure floor. Scaling by `LOT_SCALE` can land a hair below an
/// exact boundary (e.g. `x.xxx999999…`), so a value within `BOUNDARY_EPSILON`
/// lots *below* a whole lot rounds up to it instead of dropping a full lot.
/// The snap never adds more than `BOUNDARY_EPSILON / LOT_SCALE` units.
pub fn floor_lot(quantity: f64) -> f64 {
    lots(quantity) as f64 / LOT_SCALE
}

/// Whole lots contained in `quantity` (0 for non-positive or non-finite input).
pub fn lots(quantity: f64) -> i64 {
    if !quantity.is_finite() || quantity <= 0.0 {
        return 0;
    }
    let scaled = quantity * LOT_SCALE;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < BOUNDARY_EPSILON {
        nearest as i64
    } else {
        scaled.floor() as i64
    }
}

/// Quantity to open at `price` with `cash` available, or `None` when the
/// truncated size falls below the minimum.
///
/// Longs and shorts are sized identically: both are funded from cash alone.
pub fn entry_quantity(cash: f64, price: f64, params: &SimParams) -> Option<f64> {
    let notional_cap = params.max_notional / price;
    let affordable = cash / (price * (1.0 + params.fee_rate));
    let quantity = floor_lot(params.target_quantity.min(affordable).min(notional_cap));
    (quantity >= params.min_quantity).then_some(quantity)
}
