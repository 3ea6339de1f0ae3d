use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::datetime::parse_iso;

/// Wire format of the value echoed to the host form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// `YYYY-MM-DDTHH:mm:ss`, local, no zone designator.
    #[serde(rename = "full_ISO")]
    FullIso,
    /// `YYYY-MM-DD`.
    #[serde(rename = "short_ISO")]
    ShortIso,
    /// Seconds since the epoch.
    #[serde(rename = "timestamp")]
    Timestamp,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::FullIso => "full_ISO",
            OutputFormat::ShortIso => "short_ISO",
            OutputFormat::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full_iso" => Ok(OutputFormat::FullIso),
            "short_iso" => Ok(OutputFormat::ShortIso),
            "timestamp" => Ok(OutputFormat::Timestamp),
            other => Err(anyhow!(
                "unknown date output `{other}` (expected full_ISO, short_ISO or timestamp)"
            )),
        }
    }
}

/// How `timestamp` output turns a wall clock value into epoch seconds.
///
/// `Naive` feeds the local fields straight into a UTC constructor, so the
/// number does not depend on any zone. `ZoneCorrected` interprets the
/// fields in the given zone first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampEncoding {
    #[default]
    Naive,
    ZoneCorrected(Tz),
}

impl TimestampEncoding {
    pub fn label(&self) -> String {
        match self {
            TimestampEncoding::Naive => "naive".to_string(),
            TimestampEncoding::ZoneCorrected(tz) => format!("zone:{}", tz.name()),
        }
    }
}

/// A serialized endpoint value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Text(String),
    Seconds(i64),
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Text(text) => f.write_str(text),
            OutputValue::Seconds(secs) => write!(f, "{secs}"),
        }
    }
}

pub fn full_iso(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:00").to_string()
}

pub fn short_iso(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d").to_string()
}

pub fn naive_timestamp(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Epoch seconds of `dt` read as wall clock time in `tz`.
///
/// Ambiguous instants use the earliest mapping. Instants skipped by a
/// transition are shifted by the offset in force at the same UTC reading.
pub fn zone_timestamp(dt: NaiveDateTime, tz: &Tz) -> i64 {
    match tz.from_local_datetime(&dt) {
        LocalResult::Single(local) => local.timestamp(),
        LocalResult::Ambiguous(first, second) => first.timestamp().min(second.timestamp()),
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&dt).fix().local_minus_utc();
            warn!(
                local = %dt,
                timezone = tz.name(),
                offset,
                "local time skipped by zone transition"
            );
            naive_timestamp(dt) - i64::from(offset)
        }
    }
}

/// Serializes `dt` for the host form.
pub fn encode(dt: NaiveDateTime, format: OutputFormat, encoding: TimestampEncoding) -> OutputValue {
    match format {
        OutputFormat::FullIso => OutputValue::Text(full_iso(dt)),
        OutputFormat::ShortIso => OutputValue::Text(short_iso(dt)),
        OutputFormat::Timestamp => OutputValue::Seconds(match encoding {
            TimestampEncoding::Naive => naive_timestamp(dt),
            TimestampEncoding::ZoneCorrected(tz) => zone_timestamp(dt, &tz),
        }),
    }
}

/// Reads back a value written by [`encode`], so an echoed field can seed
/// the next construction whatever output format produced it.
pub fn decode(raw: &str, encoding: TimestampEncoding) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        let utc = DateTime::from_timestamp(secs, 0)?;
        return Some(match encoding {
            TimestampEncoding::Naive => utc.naive_utc(),
            TimestampEncoding::ZoneCorrected(tz) => utc.with_timezone(&tz).naive_local(),
        });
    }
    parse_iso(trimmed)
}
