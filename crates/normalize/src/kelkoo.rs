//! Kelkoo category statistics → canonical rows.
//!
//! Kelkoo bills in GBP and covers the UK only. It reports no impressions, so
//! that column is always zero, and USD cost is derived from the day's
//! GBP→USD rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::aggregate::aggregate_rows;
use crate::amount::{parse_decimal, round_cost};
use crate::error::NormalizeError;
use crate::model::{Channel, CostRow, Engine};
use crate::taxonomy::device_from_label;

/// Body Kelkoo returns when the window has no statistics.
pub const EMPTY_SENTINEL: &str = "[]";

/// Market stamped on every Kelkoo row.
pub const MARKET: &str = "UK";

/// One statistics record, already renamed to canonical column names.
/// Category id/name, sales, order value and tracked-lead metrics are not
/// part of the cost table and are never deserialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KelkooRecord {
    #[serde(deserialize_with = "de_date")]
    pub date: String,
    #[serde(default, deserialize_with = "de_count")]
    pub clicks: u64,
    #[serde(rename = "cost", default, deserialize_with = "de_cost")]
    pub billingcost: Decimal,
    #[serde(rename = "currency", default)]
    pub billingcurrency: Option<String>,
    #[serde(rename = "deviceType", default)]
    pub device: Option<String>,
}

fn de_date<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(normalize_date(&raw))
}

/// Reduce a date or datetime string to `YYYY-MM-DD`. Anything unparseable is
/// kept as sent.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    match chrono::NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .ok_or_else(|| D::Error::custom(format!("invalid click count {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid click count '{}'", s))),
        other => Err(D::Error::custom(format!("invalid click count {}", other))),
    }
}

fn de_cost<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    use serde::de::Error;
    let text = match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => return Ok(Decimal::ZERO),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => return Err(D::Error::custom(format!("invalid cost {}", other))),
    };
    parse_decimal(&text)
        .map(Option::unwrap_or_default)
        .map_err(|e| D::Error::custom(format!("invalid cost '{}': {}", text, e)))
}

/// True for the "nothing to report" body.
pub fn is_empty_payload(raw: &str) -> bool {
    raw.trim_start_matches('\u{feff}').trim() == EMPTY_SENTINEL
}

/// Parse the raw JSON array into records.
pub fn parse_records(raw: &str) -> Result<Vec<KelkooRecord>, NormalizeError> {
    let raw = raw.trim_start_matches('\u{feff}');
    serde_json::from_str(raw).map_err(|e| NormalizeError::Json(e.to_string()))
}

/// Group records by (date, device), convert to USD, stamp the constant
/// engine/market/channel columns and round.
pub fn to_cost_rows(records: Vec<KelkooRecord>, usd_rate: Decimal) -> Vec<CostRow> {
    let rows: Vec<CostRow> = records
        .into_iter()
        .map(|r| CostRow {
            date: r.date,
            device: device_from_label(r.device.as_deref().unwrap_or("")),
            impressions: 0,
            clicks: r.clicks,
            billingcost: r.billingcost,
            billingcurrency: r.billingcurrency.filter(|c| !c.is_empty()),
            costusd: Decimal::ZERO,
            engine: Engine::Kelkoo,
            majormarket: MARKET.to_string(),
            channel: Channel::Affiliate,
        })
        .collect();

    aggregate_rows(rows)
        .into_iter()
        .map(|mut row| {
            row.costusd = round_cost(row.billingcost * usd_rate);
            row.billingcost = round_cost(row.billingcost);
            row
        })
        .collect()
}

/// Build the Kelkoo table from the raw response body.
///
/// Returns `Ok(None)` for the empty-array sentinel (and for any array with
/// no records): Kelkoo had nothing to report, which is not an error.
pub fn build(raw: &str, usd_rate: Decimal) -> Result<Option<Vec<CostRow>>, NormalizeError> {
    if is_empty_payload(raw) {
        return Ok(None);
    }
    let records = parse_records(raw)?;
    if records.is_empty() {
        return Ok(None);
    }
    log::debug!("Kelkoo records parsed: {}", records.len());
    Ok(Some(to_cost_rows(records, usd_rate)))
}
