use rust_decimal::Decimal;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Taxonomy enums
// ---------------------------------------------------------------------------

/// Normalized device class. Variant order matches the alphabetical order of
/// the labels so grouped output sorts the same way the labels would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl Device {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Provenance tag: which ad network a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Engine {
    Criteo,
    Kelkoo,
}

impl Engine {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Criteo => "Criteo",
            Self::Kelkoo => "Kelkoo",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Marketing channel. Constant per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Channel {
    Affiliate,
    Retargeting,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Affiliate => "Affiliate",
            Self::Retargeting => "Retargeting",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Canonical cost row
// ---------------------------------------------------------------------------

/// Sheet header, in column order A..J.
pub const COLUMNS: [&str; 10] = [
    "date",
    "device",
    "impressions",
    "clicks",
    "billingcost",
    "billingcurrency",
    "costusd",
    "engine",
    "majormarket",
    "channel",
];

/// One row of the published cost table.
///
/// Field order is the column order; `serde` serializes in declaration order,
/// so CSV output and [`COLUMNS`] always agree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRow {
    pub date: String,
    pub device: Device,
    pub impressions: u64,
    pub clicks: u64,
    pub billingcost: Decimal,
    pub billingcurrency: Option<String>,
    pub costusd: Decimal,
    pub engine: Engine,
    pub majormarket: String,
    pub channel: Channel,
}

impl CostRow {
    /// Cell values for a USER_ENTERED sheet write. Counts go out as numbers,
    /// costs as fixed two-decimal strings the sheet coerces itself, a missing
    /// currency as an empty cell.
    pub fn to_cells(&self) -> Vec<serde_json::Value> {
        use serde_json::Value;
        vec![
            Value::String(self.date.clone()),
            Value::String(self.device.label().to_string()),
            Value::from(self.impressions),
            Value::from(self.clicks),
            Value::String(self.billingcost.to_string()),
            Value::String(self.billingcurrency.clone().unwrap_or_default()),
            Value::String(self.costusd.to_string()),
            Value::String(self.engine.label().to_string()),
            Value::String(self.majormarket.clone()),
            Value::String(self.channel.label().to_string()),
        ]
    }
}

/// Header row followed by one row per record: the block written at A1.
pub fn sheet_values(rows: &[CostRow]) -> Vec<Vec<serde_json::Value>> {
    let mut values = Vec::with_capacity(rows.len() + 1);
    values.push(
        COLUMNS
            .iter()
            .map(|c| serde_json::Value::String(c.to_string()))
            .collect(),
    );
    values.extend(rows.iter().map(CostRow::to_cells));
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> CostRow {
        CostRow {
            date: "2024-01-01".into(),
            device: Device::Desktop,
            impressions: 100,
            clicks: 5,
            billingcost: dec!(10.00),
            billingcurrency: None,
            costusd: dec!(10.00),
            engine: Engine::Criteo,
            majormarket: "Acme".into(),
            channel: Channel::Retargeting,
        }
    }

    #[test]
    fn device_order_is_label_order() {
        let mut devices = vec![Device::Unknown, Device::Tablet, Device::Desktop, Device::Mobile];
        devices.sort();
        let labels: Vec<&str> = devices.iter().map(|d| d.label()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn sheet_values_header_first() {
        let values = sheet_values(&[row()]);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].len(), 10);
        assert_eq!(values[0][0], "date");
        assert_eq!(values[0][9], "channel");
    }

    #[test]
    fn cells_follow_column_order() {
        let cells = row().to_cells();
        assert_eq!(cells[0], "2024-01-01");
        assert_eq!(cells[1], "desktop");
        assert_eq!(cells[2], 100);
        assert_eq!(cells[3], 5);
        assert_eq!(cells[4], "10.00");
        assert_eq!(cells[5], "");
        assert_eq!(cells[7], "Criteo");
        assert_eq!(cells[9], "Retargeting");
    }

    #[test]
    fn empty_table_is_header_only() {
        let values = sheet_values(&[]);
        assert_eq!(values.len(), 1);
    }
}
