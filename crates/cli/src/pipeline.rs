//! One run: fetch both sources, normalise, merge, publish.
//!
//! Every step before the sheet write is fallible and aborts the run, so the
//! sheet is only cleared once a non-empty merged table is in hand.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use cost_uploader_config::{Settings, SheetTarget};
use cost_uploader_normalize::model::sheet_values;
use cost_uploader_normalize::{criteo, kelkoo, merge, CostRow, MarketMap, COLUMNS};
use cost_uploader_sheets::{SheetsClient, UpdateSummary};

use crate::fetch::{CriteoClient, FixerClient, KelkooClient, ReportWindow};
use crate::CliError;

/// Criteo rows for the window, or `None` when no advertiser had activity.
pub fn criteo_rows(
    settings: &Settings,
    window: &ReportWindow,
    timeout: Duration,
) -> Result<Option<Vec<CostRow>>, CliError> {
    let cfg = &settings.criteo;
    let client = CriteoClient::from_settings(cfg, timeout)?;
    let reports = client.fetch_all(&cfg.gbp_advertiser_ids, &cfg.eur_advertiser_ids, window)?;

    let markets = MarketMap::new(cfg.market_replacements.clone());
    let rows = criteo::build(&reports.usd, &reports.gbp, &reports.eur, &markets)
        .map_err(|e| CliError::normalize("Criteo", e))?;

    match &rows {
        Some(r) => log::info!("Criteo: {} rows", r.len()),
        None => log::info!("Criteo: no data for {}", window),
    }
    Ok(rows)
}

/// Kelkoo rows for the window, or `None` when Kelkoo answered `[]`.
pub fn kelkoo_rows(
    settings: &Settings,
    window: &ReportWindow,
    timeout: Duration,
) -> Result<Option<Vec<CostRow>>, CliError> {
    let rate = FixerClient::from_settings(&settings.fixer, timeout)?.usd_rate()?;
    log::info!("GBP→USD rate: {}", rate);

    let raw = KelkooClient::from_settings(&settings.kelkoo, timeout)?.fetch(window)?;
    let rows = kelkoo::build(&raw, rate).map_err(|e| CliError::normalize("Kelkoo", e))?;

    match &rows {
        Some(r) => log::info!("Kelkoo: {} rows", r.len()),
        None => log::info!("Kelkoo: no data for {}", window),
    }
    Ok(rows)
}

/// Fetch and normalise both sources and merge them. Fails when neither
/// source had data.
pub fn collect(settings: &Settings, window: &ReportWindow) -> Result<Vec<CostRow>, CliError> {
    log::info!("report window: {}", window);
    let timeout = settings.http.timeout();

    let criteo = criteo_rows(settings, window, timeout)?;
    let kelkoo = kelkoo_rows(settings, window, timeout)?;

    merge(criteo, kelkoo).map_err(|e| CliError::normalize("merge", e))
}

/// Clear the target range on the first worksheet and write header + rows.
pub fn publish(target: &SheetTarget, rows: &[CostRow], timeout: Duration) -> Result<UpdateSummary, CliError> {
    let client = SheetsClient::connect(&target.credentials_json, target.api_base.as_deref(), timeout)
        .map_err(CliError::sheets)?;
    let values = sheet_values(rows);
    let summary = client
        .publish(&target.key, &target.range, &values)
        .map_err(CliError::sheets)?;
    log::info!(
        "sheet updated: {} ({} rows x {} columns, {} cells)",
        summary.updated_range,
        summary.updated_rows,
        summary.updated_columns,
        summary.updated_cells,
    );
    Ok(summary)
}

/// Full run. The sheet target is resolved first so a missing key or
/// credential fails before any upstream call.
pub fn upload(settings: &Settings, window: &ReportWindow) -> Result<UpdateSummary, CliError> {
    let target = settings.sheet.target().map_err(CliError::config)?;
    let rows = collect(settings, window)?;
    publish(&target, &rows, settings.http.timeout())
}

/// Write rows as CSV (file or stdout). Returns the output label for
/// progress messages.
pub fn write_csv(rows: &[CostRow], out: &Option<PathBuf>) -> Result<String, CliError> {
    let out_label = out
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    let writer: Box<dyn Write> = match out {
        Some(path) => {
            let f = std::fs::File::create(path).map_err(|e| {
                CliError::io(format!("cannot create {}: {}", path.display(), e))
            })?;
            Box::new(std::io::BufWriter::new(f))
        }
        None => Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
    };

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    // Header even with zero rows
    csv_writer
        .write_record(COLUMNS)
        .map_err(|e| CliError::io(format!("CSV write error: {}", e)))?;
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|e| CliError::io(format!("CSV write error: {}", e)))?;
    }
    csv_writer
        .flush()
        .map_err(|e| CliError::io(format!("flush error: {}", e)))?;

    Ok(out_label)
}
