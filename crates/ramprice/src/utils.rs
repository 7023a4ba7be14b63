use crate::report::{TrendPoint, Trends};
use crate::types::Snapshot;

use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct TrendFilter {
    pub contains: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TrendFilter {
    pub fn apply(self, trends: Trends) -> Trends {
        trends
            .into_iter()
            .filter(|(product, _)| {
                self.contains
                    .as_deref()
                    .is_none_or(|needle| product.contains(needle))
            })
            .map(|(product, points)| {
                let points: Vec<TrendPoint> = points
                    .into_iter()
                    .filter(|p| self.in_range(&p.date))
                    .collect();
                (product, points)
            })
            .filter(|(_, points)| !points.is_empty())
            .collect()
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start_date
            && let Some(end) = self.end_date
            && start > end
        {
            return Err(format!(
                "Start date ({start}) cannot be after end date ({end})"
            ));
        }
        if self.contains.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err("Product filter must not be blank".to_string());
        }
        Ok(self)
    }

    // History keys start with YYYY-MM-DD in both key modes.
    fn in_range(&self, key: &str) -> bool {
        let Some(date) = key
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            return false;
        };
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

#[derive(Debug)]
pub struct SnapshotStats {
    pub per_category: Vec<(String, usize)>,
    pub total: usize,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> SnapshotStats {
        SnapshotStats {
            per_category: snapshot
                .iter()
                .map(|(category, records)| (category.to_string(), records.len()))
                .collect(),
            total: snapshot.values().map(Vec::len).sum(),
        }
    }
}

impl std::fmt::Display for SnapshotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        for (category, count) in &self.per_category {
            writeln!(f, "  {:<24} {}", category, count)?;
        }
        writeln!(f, "  {:<24} {}", "Total", self.total)
    }
}
