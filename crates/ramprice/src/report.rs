use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::store::{PriceStore, StoredSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub price: u64,
}

pub type Trends = BTreeMap<String, Vec<TrendPoint>>;

/// Flattens the history into one chronological price series per product.
///
/// History keys sort lexicographically in time order, so walking the map in
/// key order yields each series oldest first.
pub fn trends(store: &PriceStore) -> Trends {
    let mut trends = Trends::new();
    for (key, snapshot) in &store.history {
        for record in snapshot.values().flatten() {
            trends
                .entry(record.product.clone())
                .or_default()
                .push(TrendPoint {
                    date: key.clone(),
                    price: record.price,
                });
        }
    }
    trends
}

/// The payload served to chart front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamReport {
    pub current: StoredSnapshot,
    pub trends: Trends,
    pub total_days: usize,
    pub date_range: String,
}

impl RamReport {
    pub fn from_store(store: &PriceStore) -> Self {
        let date_range = match (store.history.keys().next(), store.history.keys().next_back()) {
            (Some(first), Some(last)) => format!("{first} ~ {last}"),
            _ => String::new(),
        };

        Self {
            current: store.current.clone(),
            trends: trends(store),
            total_days: store.history.len(),
            date_range,
        }
    }
}

impl Display for RamReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ {} observation(s) ─ {}", self.total_days, self.date_range)?;
        for (category, records) in &self.current {
            writeln!(f, "├─ {}", category)?;
            for record in records {
                writeln!(f, "│  {}", record)?;
            }
        }
        writeln!(f, "└─ {} product series", self.trends.len())
    }
}
