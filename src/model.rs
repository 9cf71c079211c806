use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Column 4 of the table. Kept as text when it does not parse as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Magnitude {
    Number(f64),
    Text(String),
}

impl Magnitude {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Magnitude::Number(v),
            _ => Magnitude::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_label: String,
    pub reference: String,
    pub local_datetime: String,
    pub magnitude: Magnitude,
    pub report_link: String,
    pub scraped_at: String,
}

/// A report with its store identity attached, as handed to [`crate::store::Store`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    #[serde(flatten)]
    pub report: Report,
}

/// The single timestamp a run is stamped with. Both `scraped_at` and every id
/// derive from it, never from the clock at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp {
    at: OffsetDateTime,
}

impl RunStamp {
    pub fn now() -> Self {
        Self {
            at: OffsetDateTime::now_utc(),
        }
    }

    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        let nanos = i128::from(millis) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .map(|at| Self { at })
    }

    pub fn unix_millis(&self) -> i64 {
        (self.at.unix_timestamp_nanos() / 1_000_000) as i64
    }

    pub fn rfc3339(&self) -> String {
        self.at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }

    /// `<label, whitespace runs as "_">_<run millis>_<ordinal>`.
    ///
    /// The ordinal is the record's position in the whole run, not in its batch,
    /// so the id does not depend on how the run is chunked.
    pub fn record_id(&self, report_label: &str, ordinal: usize) -> String {
        let label = WHITESPACE_RUN.replace_all(report_label, "_");
        format!("{}_{}_{}", label, self.unix_millis(), ordinal)
    }
}
