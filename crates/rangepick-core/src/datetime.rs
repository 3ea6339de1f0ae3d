use std::sync::OnceLock;

use chrono::{
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike
};
use regex::Regex;
use serde::Serialize;

/// Minute steps accepted for `round_to`.
pub const ALLOWED_GRANULARITIES: [u32; 6] =
  [1, 5, 10, 15, 20, 30];

/// A caller supplied date before it has
/// been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
  DateTime(NaiveDateTime),
  Date(NaiveDate),
  Text(String)
}

impl DateInput {
  /// Validates the input, returning `None`
  /// for strings outside the grammar or
  /// impossible calendar dates.
  #[must_use]
  pub fn to_datetime(
    &self
  ) -> Option<NaiveDateTime> {
    match self {
      | Self::DateTime(dt) => Some(*dt),
      | Self::Date(date) => {
        Some(date.and_time(NaiveTime::MIN))
      }
      | Self::Text(raw) => parse_iso(raw)
    }
  }
}

impl From<NaiveDateTime> for DateInput {
  fn from(value: NaiveDateTime) -> Self {
    Self::DateTime(value)
  }
}

impl From<NaiveDate> for DateInput {
  fn from(value: NaiveDate) -> Self {
    Self::Date(value)
  }
}

impl From<&str> for DateInput {
  fn from(value: &str) -> Self {
    Self::Text(value.to_string())
  }
}

impl From<String> for DateInput {
  fn from(value: String) -> Self {
    Self::Text(value)
  }
}

fn iso_regex() -> Option<&'static Regex>
{
  static ISO_RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  ISO_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?:T(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})(?:\.\d{1,3})?Z?)?$",
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "internal regex compile failure"
        );
      })
      .ok()
    })
    .as_ref()
}

/// Parses `YYYY-MM-DD` or
/// `YYYY-MM-DDTHH:mm:ss` as a local wall
/// clock instant.
///
/// Fractional seconds and a trailing `Z`
/// written by older encoders are accepted
/// and dropped. Field values are checked by
/// building the date, so `2030-13-01` or
/// `2030-02-30` are rejected instead of
/// clamped.
#[tracing::instrument(level = "trace")]
pub fn parse_iso(
  raw: &str
) -> Option<NaiveDateTime> {
  let caps =
    iso_regex()?.captures(raw.trim())?;

  let field = |name: &str| {
    caps
      .name(name)
      .and_then(|m| {
        m.as_str().parse::<u32>().ok()
      })
  };

  let year = caps
    .name("year")?
    .as_str()
    .parse::<i32>()
    .ok()?;
  let date = NaiveDate::from_ymd_opt(
    year,
    field("month")?,
    field("day")?
  )?;

  if caps.name("hour").is_none() {
    return Some(
      date.and_time(NaiveTime::MIN)
    );
  }

  date.and_hms_opt(
    field("hour")?,
    field("minute")?,
    field("second")?
  )
}

/// Picks the initial value of one date
/// field.
///
/// A previously echoed value wins, then the
/// explicit setting, then the computed
/// default. Invalid candidates are skipped.
#[tracing::instrument(
  level = "debug",
  skip(default)
)]
pub fn resolve_value(
  default: NaiveDateTime,
  setting: Option<&DateInput>,
  echoed: Option<&str>
) -> NaiveDateTime {
  if let Some(raw) = echoed
    .map(str::trim)
    .filter(|raw| !raw.is_empty())
  {
    if let Some(dt) = parse_iso(raw) {
      tracing::debug!(
        value = %dt,
        "using echoed value"
      );
      return dt;
    }
    tracing::warn!(
      echoed = raw,
      "ignoring malformed echoed value"
    );
  }

  if let Some(input) = setting {
    if let Some(dt) = input.to_datetime()
    {
      tracing::debug!(
        value = %dt,
        "using explicit setting"
      );
      return dt;
    }
    tracing::warn!(
      setting = ?input,
      "ignoring malformed date setting"
    );
  }

  default
}

/// Minute step applied to every displayed
/// or selected time.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
pub struct Granularity(u32);

impl Granularity {
  /// Step used when `round_to` is not set.
  pub const HALF_HOUR: Self = Self(30);

  /// Accepts 1, 5, 10, 15, 20 or 30;
  /// anything else falls back to 1.
  #[must_use]
  pub fn new(minutes: u32) -> Self {
    if ALLOWED_GRANULARITIES
      .contains(&minutes)
    {
      Self(minutes)
    } else {
      tracing::warn!(
        round_to = minutes,
        "unsupported rounding step; \
         falling back to 1 minute"
      );
      Self(1)
    }
  }

  #[must_use]
  pub fn minutes(self) -> u32 {
    self.0
  }
}

impl Default for Granularity {
  fn default() -> Self {
    Self::HALF_HOUR
  }
}

/// Rounds the minute component up to the
/// next multiple of the step, zeroing
/// seconds. Exact multiples are kept; a
/// round up past 23:59 lands on the next
/// day at midnight.
#[must_use]
pub fn round_minutes(
  dt: NaiveDateTime,
  step: Granularity
) -> NaiveDateTime {
  let truncated = dt
    .with_second(0)
    .and_then(|d| d.with_nanosecond(0))
    .unwrap_or(dt);

  let step = step.minutes();
  let minute = truncated.minute();
  let remainder = minute % step;
  if remainder == 0 {
    return truncated;
  }

  truncated
    + Duration::minutes(i64::from(
      step - remainder
    ))
}

/// Replaces the clock part of `dt` with
/// the clock part of `source`, keeping the
/// calendar day.
#[must_use]
pub fn with_time_of(
  dt: NaiveDateTime,
  source: NaiveDateTime
) -> NaiveDateTime {
  dt.date().and_time(
    NaiveTime::from_hms_opt(
      source.hour(),
      source.minute(),
      0
    )
    .unwrap_or(NaiveTime::MIN)
  )
}
