use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::{BitLayout, TimeUnit};

/// Pattern of [`Unique::time_string`]: `yyyy-MM-dd HH:mm:ss.SSS`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A decoded ID.
///
/// Built by [`SnowflakeGenerator::parse`] (or [`Unique::decode`]) from nothing
/// but the ID and the layout, so it can describe IDs produced by any
/// generator sharing that layout.
///
/// `Display` renders the canonical flat JSON object:
///
/// ```text
/// {"id":"7130316800516173829","dataCenterId":2,"workerId":3,"sequence":5,"timestamp":1700000000123,"timeUnit":"MILLISECONDS","gmtTime":1700000000123,"timeString":"2023-11-14 22:13:20.123"}
/// ```
///
/// [`SnowflakeGenerator::parse`]: crate::SnowflakeGenerator::parse
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unique {
    #[serde(rename = "id", serialize_with = "as_string")]
    raw_id: i64,
    data_center_id: u64,
    worker_id: u64,
    sequence: u64,
    timestamp: u64,
    #[serde(serialize_with = "as_unit_name")]
    time_unit: TimeUnit,
    gmt_time: u64,
    time_string: String,
}

impl Unique {
    /// Decodes `id` with `layout`. Never fails.
    pub fn decode(layout: &BitLayout, id: i64) -> Self {
        let parts = layout.decode(id);
        let timestamp = parts.tick_delta.saturating_add(layout.epoch());
        let gmt_time = layout.unit().to_millis(timestamp);
        let time_string = i64::try_from(gmt_time)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|at| at.format(TIME_FORMAT).to_string())
            .unwrap_or_default();

        Self {
            raw_id: id,
            data_center_id: parts.data_center_id,
            worker_id: parts.worker_id,
            sequence: parts.sequence,
            timestamp,
            time_unit: layout.unit(),
            gmt_time,
            time_string,
        }
    }

    pub const fn id(&self) -> i64 {
        self.raw_id
    }

    pub const fn data_center_id(&self) -> u64 {
        self.data_center_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Absolute tick (epoch added back) in [`time_unit`](Self::time_unit).
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub const fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Milliseconds since 1970-01-01 UTC.
    pub const fn gmt_time(&self) -> u64 {
        self.gmt_time
    }

    /// UTC time formatted with [`TIME_FORMAT`]; empty if the timestamp is
    /// outside the representable calendar range.
    pub fn time_string(&self) -> &str {
        &self.time_string
    }
}

impl fmt::Display for Unique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

fn as_string<S: Serializer>(id: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(id)
}

fn as_unit_name<S: Serializer>(unit: &TimeUnit, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(unit.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twitter() -> BitLayout {
        BitLayout::new(41, 5, 5, 12, 0, TimeUnit::Millis).unwrap()
    }

    #[test]
    fn renders_canonical_string() {
        let unique = Unique::decode(&twitter(), 7_130_316_800_516_173_829);
        assert_eq!(
            unique.to_string(),
            r#"{"id":"7130316800516173829","dataCenterId":2,"workerId":3,"sequence":5,"timestamp":1700000000123,"timeUnit":"MILLISECONDS","gmtTime":1700000000123,"timeString":"2023-11-14 22:13:20.123"}"#
        );
    }

    #[test]
    fn adds_the_epoch_back() {
        let layout = BitLayout::new(41, 5, 5, 12, 1_000, TimeUnit::Millis).unwrap();
        let id = layout.encode(500, 1, 1, 0);
        let unique = Unique::decode(&layout, id);
        assert_eq!(unique.timestamp(), 1_500);
        assert_eq!(unique.gmt_time(), 1_500);
        assert_eq!(unique.time_string(), "1970-01-01 00:00:01.500");
    }

    #[test]
    fn second_layouts_report_millis() {
        let layout = BitLayout::seconds();
        let id = layout.encode(10, 4, 7, 99);
        let unique = Unique::decode(&layout, id);
        assert_eq!(unique.timestamp(), 1_288_834_984);
        assert_eq!(unique.gmt_time(), 1_288_834_984_000);
        assert_eq!(unique.time_unit(), TimeUnit::Seconds);
        assert_eq!(unique.time_string(), "2010-11-04 01:43:04.000");
        assert_eq!((unique.data_center_id(), unique.worker_id(), unique.sequence()), (4, 7, 99));
        assert!(unique.to_string().contains(r#""timeUnit":"SECONDS""#));
    }

    #[test]
    fn decodes_foreign_values() {
        let unique = Unique::decode(&twitter(), -1);
        assert_eq!(unique.id(), -1);
        assert_eq!(unique.sequence(), 4095);
        assert!(unique.to_string().starts_with(r#"{"id":"-1","#));
    }
}
