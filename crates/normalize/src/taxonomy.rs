use std::collections::BTreeMap;

use crate::model::Device;

/// Map an upstream device label to a [`Device`].
///
/// Total: every label lands on exactly one class, anything unrecognised is
/// `Unknown`. Case-insensitive, so already-normalized labels map to themselves.
pub fn device_from_label(label: &str) -> Device {
    match label.trim().to_ascii_lowercase().as_str() {
        "desktop" | "computer" => Device::Desktop,
        "tablet" => Device::Tablet,
        "smartphone" | "mobile" => Device::Mobile,
        _ => Device::Unknown,
    }
}

/// Advertiser name → major market substitutions. Names without an entry pass
/// through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketMap {
    replacements: BTreeMap<String, String>,
}

impl MarketMap {
    pub fn new(replacements: BTreeMap<String, String>) -> Self {
        Self { replacements }
    }

    pub fn market_for<'a>(&'a self, advertiser: &'a str) -> &'a str {
        self.replacements
            .get(advertiser)
            .map(String::as_str)
            .unwrap_or(advertiser)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

impl FromIterator<(String, String)> for MarketMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
