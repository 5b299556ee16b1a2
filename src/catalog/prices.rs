// SPDX-License-Identifier: GPL-3.0-only
//! Price string handling. Catalog documents carry prices as decimal
//! strings (empty string = unset); all arithmetic happens on `Decimal`
//! and values are converted to `f64` only at the serialization edge.

use rust_decimal::prelude::*;

/// Monetary values round to 2 decimal places, half-up.
const DECIMAL_PLACES: u32 = 2;

/// Parse a price string into a Decimal. Empty or non-numeric input is
/// None; sign checking is the caller's concern.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Resolve the price that actually applies: the sale price when set and
/// numeric, else the current price, else the regular price, else zero.
pub fn effective_price(sale_price: &str, price: &str, regular_price: &str) -> Decimal {
    parse_price(sale_price)
        .or_else(|| parse_price(price))
        .or_else(|| parse_price(regular_price))
        .unwrap_or_default()
}

/// Round to monetary precision, half-up (away from zero on midpoints).
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a monetary Decimal to f64 for serialization.
#[inline]
pub fn money_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}
