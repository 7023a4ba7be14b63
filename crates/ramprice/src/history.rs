use std::{fmt::Display, str::FromStr};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum HistoryKeyError {
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    Date(String),
    #[error("Invalid time '{0}'. Expected HH:MM")]
    Time(String),
    #[error("Invalid key mode '{0}'. Accepted values: 'slot', 'date'")]
    Mode(String),
}

/// How observation timestamps are bucketed into history keys.
///
/// Keys from both modes sort chronologically as plain strings, but they do
/// not mix: a store must be written in a single mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKeyMode {
    /// `YYYY-MM-DD HH:MM`, with the time snapped to one of three daily slots.
    #[default]
    Slot,
    /// `YYYY-MM-DD`; a second run on the same day overwrites the first.
    DateOnly,
}

impl HistoryKeyMode {
    pub fn key_at(&self, at: NaiveDateTime) -> String {
        match self {
            HistoryKeyMode::Slot => {
                format!("{} {}", at.date().format("%Y-%m-%d"), time_slot(at.time()))
            }
            HistoryKeyMode::DateOnly => at.date().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn key_now(&self) -> String {
        self.key_at(Local::now().naive_local())
    }

    /// Builds a key from operator supplied date and time strings.
    ///
    /// In slot mode the time is kept verbatim so the operator chooses the
    /// slot; in date-only mode it is validated and then ignored.
    pub fn manual_key(&self, date: &str, time: &str) -> Result<String, HistoryKeyError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| HistoryKeyError::Date(date.to_string()))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|_| HistoryKeyError::Time(time.to_string()))?;

        Ok(match self {
            HistoryKeyMode::Slot => format!("{} {}", date.format("%Y-%m-%d"), time.format("%H:%M")),
            HistoryKeyMode::DateOnly => date.format("%Y-%m-%d").to_string(),
        })
    }
}

impl FromStr for HistoryKeyMode {
    type Err = HistoryKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slot" => Ok(HistoryKeyMode::Slot),
            "date" | "date_only" => Ok(HistoryKeyMode::DateOnly),
            _ => Err(HistoryKeyError::Mode(s.to_string())),
        }
    }
}

impl Display for HistoryKeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryKeyMode::Slot => write!(f, "slot"),
            HistoryKeyMode::DateOnly => write!(f, "date"),
        }
    }
}

/// Snaps a time of day to the morning, afternoon or evening slot.
pub fn time_slot(time: NaiveTime) -> &'static str {
    match time.hour() {
        0..12 => "10:00",
        12..16 => "13:00",
        _ => "18:00",
    }
}
