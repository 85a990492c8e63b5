//! Criteo statistics reports → canonical rows.
//!
//! Criteo reports cost only in each advertiser's own billing currency, so a
//! run pulls three reports: a full-metrics USD report over every advertiser,
//! and cost-only GBP and EUR reports restricted to the advertisers billed in
//! those currencies. This module reconciles the three:
//!
//! 1. [`parse_report`]: read one semicolon-delimited report, drop the
//!    advertiser id column and rows without a device.
//! 2. [`join_reports`]: outer-join the three on (advertiser, day, device),
//!    renaming each report's cost/currency columns by its currency role.
//! 3. [`JoinedRow::billing_cost`] / [`JoinedRow::billing_currency`]: coalesce
//!    GBP, then EUR, then the USD report's own values.
//! 4. [`build`]: map device and market taxonomy, aggregate, round.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::aggregate::aggregate_rows;
use crate::amount::{parse_count, parse_decimal, round_cost};
use crate::error::NormalizeError;
use crate::model::{Channel, CostRow, Engine};
use crate::taxonomy::{device_from_label, MarketMap};

/// Criteo report CSV delimiter.
pub const REPORT_DELIMITER: u8 = b';';

const COL_ADVERTISER: &str = "Advertiser";
const COL_DAY: &str = "Day";
const COL_DEVICE: &str = "Device";
const COL_DISPLAYS: &str = "Displays";
const COL_CLICKS: &str = "Clicks";
const COL_COST: &str = "AdvertiserCost";
const COL_CURRENCY: &str = "Currency";

// ---------------------------------------------------------------------------
// Currency roles
// ---------------------------------------------------------------------------

/// Which of the three pulls a report came from. Decides how its cost and
/// currency columns are renamed before the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrencyRole {
    Usd,
    Gbp,
    Eur,
}

impl CurrencyRole {
    /// ISO code sent as the report's `currency` parameter.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
        }
    }

    /// Canonical name the report's cost column takes after the join.
    pub fn cost_column(&self) -> &'static str {
        match self {
            Self::Usd => "costusd",
            Self::Gbp => "billingcost_gbp",
            Self::Eur => "billingcost_eur",
        }
    }

    /// Canonical name the report's currency column takes after the join.
    pub fn currency_column(&self) -> &'static str {
        match self {
            Self::Usd => "billingcurrency",
            Self::Gbp => "billingcurrency_gbp",
            Self::Eur => "billingcurrency_eur",
        }
    }

    /// Report metrics requested for this pull.
    pub fn metrics(&self) -> &'static [&'static str] {
        match self {
            Self::Usd => &[COL_DISPLAYS, COL_CLICKS, COL_COST],
            Self::Gbp | Self::Eur => &[COL_COST],
        }
    }

    fn report_name(&self) -> String {
        format!("Criteo {}", self.code())
    }
}

impl std::fmt::Display for CurrencyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Parsed report
// ---------------------------------------------------------------------------

/// Join key: (advertiser, day, device) as the report spells them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JoinKey {
    pub advertiser: String,
    pub day: String,
    pub device: String,
}

/// Metric cells of one report line. Absent cells stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportCells {
    pub displays: Option<u64>,
    pub clicks: Option<u64>,
    pub cost: Option<Decimal>,
    pub currency: Option<String>,
}

impl ReportCells {
    /// Fold a repeated key into this one: metrics summed, currency max-wins.
    fn absorb(&mut self, other: ReportCells) {
        self.displays = add_opt(self.displays, other.displays);
        self.clicks = add_opt(self.clicks, other.clicks);
        self.cost = add_opt(self.cost, other.cost);
        if other.currency > self.currency {
            self.currency = other.currency;
        }
    }
}

fn add_opt<T: std::ops::Add<Output = T>>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// One parsed report, keyed for the join.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub role: CurrencyRole,
    pub rows: BTreeMap<JoinKey, ReportCells>,
}

impl ReportTable {
    pub fn empty(role: CurrencyRole) -> Self {
        Self { role, rows: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse one semicolon-delimited Criteo report.
///
/// The advertiser id column is ignored and lines with an empty device are
/// dropped. A blank body is an empty report. Lines repeating a key are folded
/// together rather than multiplied out by the join.
pub fn parse_report(raw: &str, role: CurrencyRole) -> Result<ReportTable, NormalizeError> {
    let report = role.report_name();
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim().is_empty() {
        return Ok(ReportTable::empty(role));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(REPORT_DELIMITER)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| NormalizeError::Csv { report: report.clone(), message: e.to_string() })?
        .clone();
    let find = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| NormalizeError::MissingColumn {
            report: report.clone(),
            column: name.to_string(),
        })
    };

    let advertiser_idx = require(COL_ADVERTISER)?;
    let day_idx = require(COL_DAY)?;
    let device_idx = require(COL_DEVICE)?;
    let cost_idx = require(COL_COST)?;
    let currency_idx = find(COL_CURRENCY);
    let displays_idx = find(COL_DISPLAYS);
    let clicks_idx = find(COL_CLICKS);

    let mut table = ReportTable::empty(role);
    let mut dropped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| NormalizeError::Csv { report: report.clone(), message: e.to_string() })?;
        let record_no = i as u64 + 1;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let device = cell(Some(device_idx));
        if device.is_empty() {
            dropped += 1;
            continue;
        }

        let invalid = |field: &str, value: &str| NormalizeError::InvalidValue {
            report: report.clone(),
            record: record_no,
            field: field.to_string(),
            value: value.to_string(),
        };

        let displays_raw = cell(displays_idx);
        let clicks_raw = cell(clicks_idx);
        let cost_raw = cell(Some(cost_idx));
        let currency = cell(currency_idx);

        let cells = ReportCells {
            displays: parse_count(displays_raw).map_err(|_| invalid(COL_DISPLAYS, displays_raw))?,
            clicks: parse_count(clicks_raw).map_err(|_| invalid(COL_CLICKS, clicks_raw))?,
            cost: parse_decimal(cost_raw).map_err(|_| invalid(COL_COST, cost_raw))?,
            currency: (!currency.is_empty()).then(|| currency.to_string()),
        };

        let key = JoinKey {
            advertiser: cell(Some(advertiser_idx)).to_string(),
            day: cell(Some(day_idx)).to_string(),
            device: device.to_string(),
        };

        match table.rows.get_mut(&key) {
            Some(existing) => existing.absorb(cells),
            None => {
                table.rows.insert(key, cells);
            }
        }
    }

    if dropped > 0 {
        log::debug!("{}: dropped {} line(s) without a device", report, dropped);
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// Three-way join
// ---------------------------------------------------------------------------

/// One (advertiser, day, device) after the outer join, with every report's
/// columns under its role-specific name.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub key: JoinKey,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub costusd: Option<Decimal>,
    pub billingcurrency: Option<String>,
    pub billingcost_eur: Option<Decimal>,
    pub billingcurrency_eur: Option<String>,
    pub billingcost_gbp: Option<Decimal>,
    pub billingcurrency_gbp: Option<String>,
}

impl JoinedRow {
    fn new(key: JoinKey) -> Self {
        Self {
            key,
            impressions: None,
            clicks: None,
            costusd: None,
            billingcurrency: None,
            billingcost_eur: None,
            billingcurrency_eur: None,
            billingcost_gbp: None,
            billingcurrency_gbp: None,
        }
    }

    fn fill(&mut self, role: CurrencyRole, cells: &ReportCells) {
        log::trace!(
            "{:?}: {} report -> {}={:?} {}={:?}",
            self.key,
            role,
            role.cost_column(),
            cells.cost,
            role.currency_column(),
            cells.currency,
        );
        match role {
            CurrencyRole::Usd => {
                self.impressions = cells.displays;
                self.clicks = cells.clicks;
                self.costusd = cells.cost;
                self.billingcurrency = cells.currency.clone();
            }
            CurrencyRole::Eur => {
                self.billingcost_eur = cells.cost;
                self.billingcurrency_eur = cells.currency.clone();
            }
            CurrencyRole::Gbp => {
                self.billingcost_gbp = cells.cost;
                self.billingcurrency_gbp = cells.currency.clone();
            }
        }
    }

    /// Native billing currency: GBP report, else EUR report, else the USD
    /// report's own currency column.
    pub fn billing_currency(&self) -> Option<&str> {
        self.billingcurrency_gbp
            .as_deref()
            .or(self.billingcurrency_eur.as_deref())
            .or(self.billingcurrency.as_deref())
    }

    /// Cost in the native billing currency, same precedence as
    /// [`billing_currency`](Self::billing_currency), falling back to USD cost.
    pub fn billing_cost(&self) -> Option<Decimal> {
        self.billingcost_gbp.or(self.billingcost_eur).or(self.costusd)
    }
}

/// Outer-join the three reports on (advertiser, day, device). A key present
/// in any report yields exactly one joined row.
pub fn join_reports(usd: &ReportTable, eur: &ReportTable, gbp: &ReportTable) -> Vec<JoinedRow> {
    let mut joined: BTreeMap<&JoinKey, JoinedRow> = BTreeMap::new();

    for table in [usd, eur, gbp] {
        for (key, cells) in &table.rows {
            joined
                .entry(key)
                .or_insert_with(|| JoinedRow::new(key.clone()))
                .fill(table.role, cells);
        }
    }

    joined.into_values().collect()
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Turn joined rows into canonical rows: coalesce cost and currency, map
/// device and market, aggregate by (date, device, market, channel), round.
///
/// Rows without an advertiser or day cannot be grouped and are skipped.
pub fn to_cost_rows(joined: &[JoinedRow], markets: &MarketMap) -> Vec<CostRow> {
    let rows: Vec<CostRow> = joined
        .iter()
        .filter(|j| !j.key.advertiser.is_empty() && !j.key.day.is_empty())
        .map(|j| CostRow {
            date: j.key.day.clone(),
            device: device_from_label(&j.key.device),
            impressions: j.impressions.unwrap_or(0),
            clicks: j.clicks.unwrap_or(0),
            billingcost: j.billing_cost().unwrap_or_default(),
            billingcurrency: j.billing_currency().map(str::to_string),
            costusd: j.costusd.unwrap_or_default(),
            engine: Engine::Criteo,
            majormarket: markets.market_for(&j.key.advertiser).to_string(),
            channel: Channel::Retargeting,
        })
        .collect();

    aggregate_rows(rows)
        .into_iter()
        .map(|mut row| {
            row.billingcost = round_cost(row.billingcost);
            row.costusd = round_cost(row.costusd);
            row
        })
        .collect()
}

/// Build the Criteo table from the three raw reports.
///
/// Returns `Ok(None)` when the join holds no advertiser at all: Criteo had
/// nothing to report for the window.
pub fn build(
    raw_usd: &str,
    raw_gbp: &str,
    raw_eur: &str,
    markets: &MarketMap,
) -> Result<Option<Vec<CostRow>>, NormalizeError> {
    let usd = parse_report(raw_usd, CurrencyRole::Usd)?;
    let gbp = parse_report(raw_gbp, CurrencyRole::Gbp)?;
    let eur = parse_report(raw_eur, CurrencyRole::Eur)?;
    log::debug!(
        "Criteo reports parsed: usd={} gbp={} eur={}",
        usd.len(),
        gbp.len(),
        eur.len(),
    );

    let joined = join_reports(&usd, &eur, &gbp);
    if joined.iter().all(|j| j.key.advertiser.is_empty()) {
        return Ok(None);
    }

    Ok(Some(to_cost_rows(&joined, markets)))
}
