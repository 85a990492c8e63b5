use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::{Channel, CostRow, Device};

/// Group key shared by both sources. Kelkoo rows carry a constant market and
/// channel, so for them this reduces to (date, device).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub date: String,
    pub device: Device,
    pub majormarket: String,
    pub channel: Channel,
}

impl GroupKey {
    fn of(row: &CostRow) -> Self {
        Self {
            date: row.date.clone(),
            device: row.device,
            majormarket: row.majormarket.clone(),
            channel: row.channel,
        }
    }
}

/// Group rows by (date, device, majormarket, channel) and sum counts and costs.
/// Billing currency and engine are max-wins, never summed. Output is ordered
/// by group key. Nothing is rounded here.
pub fn aggregate_rows(rows: Vec<CostRow>) -> Vec<CostRow> {
    let mut groups: BTreeMap<GroupKey, CostRow> = BTreeMap::new();

    for row in rows {
        match groups.entry(GroupKey::of(&row)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                acc.impressions += row.impressions;
                acc.clicks += row.clicks;
                acc.billingcost += row.billingcost;
                acc.costusd += row.costusd;
                if row.billingcurrency > acc.billingcurrency {
                    acc.billingcurrency = row.billingcurrency;
                }
                acc.engine = acc.engine.max(row.engine);
            }
        }
    }

    groups.into_values().collect()
}
