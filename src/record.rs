//! Data model: the raw extracted row and the persisted source record.
//!
//! [`SourceRecord`] is the canonical unit of the store CSV. Field order here
//! is the store's column order — the `csv` crate derives headers from the
//! struct, so reordering fields is a store-format change.
//!
//! Timestamps are persisted as `%Y-%m-%d %H:%M:%S%.6f` (naive wall-clock,
//! microsecond precision) to keep the store human-inspectable and stable
//! across runs; the custom serde modules below pin that format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the `name` of a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// An evaluation benchmark (MMLU, GSM8K, …).
    Benchmark,
    /// A model under evaluation.
    Model,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Benchmark => write!(f, "benchmark"),
            SourceType::Model => write!(f, "model"),
        }
    }
}

/// One row of the table returned by the completion provider, reduced to the
/// two columns the normalizer cares about. Ephemeral — consumed immediately
/// by [`crate::sources::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Free-text benchmark or model identifier.
    pub name: String,
    /// Free-text citation: a URL, a paper title, or the `-` placeholder.
    pub source: String,
}

/// The canonical unit persisted to the source store, one per canonical URL.
///
/// `crawled_timestamp`, `success` and `cost` start out null and are only
/// ever written by the crawl step that actually fetches `url`; the
/// normalize/merge steps never touch them (see [`crate::store::merge`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Benchmark/model identifier, copied verbatim from the raw row.
    pub name: String,
    /// Canonicalized, fetchable URL. Unique within the store.
    pub url: String,
    /// URL of the document the table was extracted from.
    pub origin_url: String,
    /// When `url` was actually fetched; null until then.
    #[serde(with = "opt_timestamp")]
    pub crawled_timestamp: Option<NaiveDateTime>,
    /// Normalization-pass start time, shared by the whole batch.
    /// Never altered by later merges.
    #[serde(with = "timestamp")]
    pub added_timestamp: NaiveDateTime,
    /// What `name` refers to.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Whether the crawl of `url` succeeded; null until crawled.
    pub success: Option<bool>,
    /// Resource cost attributed to crawling `url`; null until known.
    pub cost: Option<f64>,
}

/// Store timestamp format, microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// Lenient on parse: accept any fractional width (or none) so hand-edited
// stores still load.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_PARSE_FORMAT)
}

mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(raw.trim()).map_err(serde::de::Error::custom)
    }
}

mod opt_timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&format_timestamp(ts)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse_timestamp(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SourceRecord {
        SourceRecord {
            name: "MMLU".into(),
            url: "https://arxiv.org/pdf/2201.11903.pdf".into(),
            origin_url: "https://example.com/paper.pdf".into(),
            crawled_timestamp: None,
            added_timestamp: parse_timestamp("2025-01-09 10:54:17.495720").unwrap(),
            source_type: SourceType::Benchmark,
            success: None,
            cost: None,
        }
    }

    #[test]
    fn csv_round_trip_preserves_record() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(sample_record()).unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let got: SourceRecord = rdr.deserialize().next().unwrap().unwrap();
        assert_eq!(got, sample_record());
    }

    #[test]
    fn csv_header_matches_store_schema() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(sample_record()).unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let header = data.lines().next().unwrap();
        assert_eq!(
            header,
            "name,url,origin_url,crawled_timestamp,added_timestamp,type,success,cost"
        );
    }

    #[test]
    fn timestamp_format_microseconds() {
        let ts = parse_timestamp("2025-01-09 10:54:17.495720").unwrap();
        assert_eq!(format_timestamp(&ts), "2025-01-09 10:54:17.495720");
    }

    #[test]
    fn timestamp_parse_accepts_missing_fraction() {
        assert!(parse_timestamp("2025-01-09 10:54:17").is_ok());
    }

    #[test]
    fn source_type_display_lowercase() {
        assert_eq!(SourceType::Benchmark.to_string(), "benchmark");
        assert_eq!(SourceType::Model.to_string(), "model");
    }
}
