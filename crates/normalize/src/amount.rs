//! Cost and count parsing.
//!
//! Costs are carried as `Decimal` end to end and only rounded once, when a
//! normalizer emits its final rows. Rounding is half-to-even so totals agree
//! with the figures the marketing team reconciles against in the sheet.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every cost column.
pub const COST_DP: u32 = 2;

/// Round a cost to two decimal places with a fixed scale ("10" → "10.00").
pub fn round_cost(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(COST_DP, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(COST_DP);
    rounded
}

/// Parse a decimal cell. Accepts plain ("12.3456") and scientific ("1.2e3") forms.
/// Returns `Ok(None)` for an empty cell.
pub fn parse_decimal(s: &str) -> Result<Option<Decimal>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Parse a non-negative count cell. Tolerates a float rendering of a whole
/// number ("100.0"), which some report exports emit for integer metrics.
/// Returns `Ok(None)` for an empty cell.
pub fn parse_count(s: &str) -> Result<Option<u64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(n) = s.parse::<u64>() {
        return Ok(Some(n));
    }
    let d = parse_decimal(s)?.unwrap_or_default();
    if d.is_sign_negative() && !d.is_zero() {
        return Err(format!("negative count: {}", s));
    }
    if d.fract() != Decimal::ZERO {
        return Err(format!("fractional count: {}", s));
    }
    d.to_u64().map(Some).ok_or_else(|| format!("count out of range: {}", s))
}
