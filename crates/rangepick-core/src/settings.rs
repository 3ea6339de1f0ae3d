use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::datetime::DateInput;
use crate::i18n::Locale;
use crate::output::{OutputFormat, TimestampEncoding};
use crate::zone::resolve_timezone;

/// The four picker flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickerKind {
    Date,
    DateTime,
    DateRange,
    DateTimeRange,
}

impl PickerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PickerKind::Date => "date",
            PickerKind::DateTime => "datetime",
            PickerKind::DateRange => "daterange",
            PickerKind::DateTimeRange => "datetimerange",
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, PickerKind::DateRange | PickerKind::DateTimeRange)
    }

    pub fn has_time(self) -> bool {
        matches!(self, PickerKind::DateTime | PickerKind::DateTimeRange)
    }

    pub fn default_output(self) -> OutputFormat {
        match self {
            PickerKind::Date | PickerKind::DateRange => OutputFormat::ShortIso,
            PickerKind::DateTime | PickerKind::DateTimeRange => OutputFormat::FullIso,
        }
    }
}

impl fmt::Display for PickerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "date" => Ok(PickerKind::Date),
            "datetime" => Ok(PickerKind::DateTime),
            "daterange" => Ok(PickerKind::DateRange),
            "datetimerange" => Ok(PickerKind::DateTimeRange),
            other => Err(anyhow!(
                "unknown picker kind `{other}` (expected date, datetime, daterange or datetimerange)"
            )),
        }
    }
}

/// Presentation passthrough; only the renderer reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styles {
    pub active_background: Option<String>,
    pub active_color: Option<String>,
    pub inactive_background: Option<String>,
    pub inactive_color: Option<String>,
}

impl Styles {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut styles = Styles::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "active_background" => &mut styles.active_background,
                "active_color" => &mut styles.active_color,
                "inactive_background" => &mut styles.inactive_background,
                "inactive_color" => &mut styles.inactive_color,
                other => {
                    warn!(key = other, "unknown style key; ignoring");
                    continue;
                }
            };
            *slot = Some(value);
        }
        styles
    }
}

/// Container ids the picker is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub start: String,
    pub end: Option<String>,
}

impl Targets {
    pub fn single(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
        }
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
        }
    }

    /// Command line ids win over `target.start` / `target.end`.
    pub fn from_sources(cfg: &Config, cli_ids: &[String]) -> Self {
        let mut ids = cli_ids.iter().cloned();
        let start = ids
            .next()
            .or_else(|| cfg.get("target.start"))
            .unwrap_or_default();
        let end = if cli_ids.is_empty() {
            cfg.get("target.end")
        } else {
            ids.next()
        };
        Self { start, end }
    }
}

/// Construction parameters of one picker instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub kind: PickerKind,
    pub start_date: Option<DateInput>,
    pub first_date: Option<DateInput>,
    pub last_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
    pub first_day_no: i64,
    pub date_output: Option<OutputFormat>,
    /// Minute step; `None` keeps the half-hour grid.
    pub round_to: Option<u32>,
    pub min_range_hours: Option<f64>,
    pub timestamp_encoding: TimestampEncoding,
    pub l10n: Locale,
    pub styles: Styles,
}

impl Settings {
    pub fn new(kind: PickerKind) -> Self {
        Self {
            kind,
            start_date: None,
            first_date: None,
            last_date: None,
            end_date: None,
            first_day_no: 0,
            date_output: None,
            round_to: None,
            min_range_hours: None,
            timestamp_encoding: TimestampEncoding::Naive,
            l10n: Locale::english(),
            styles: Styles::default(),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.date_output.unwrap_or(self.kind.default_output())
    }

    /// Decodes settings from configuration keys. Only the picker kind is
    /// strict; other malformed values fall back to their defaults.
    #[tracing::instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let kind: PickerKind = cfg
            .get("kind")
            .as_deref()
            .unwrap_or("datetime")
            .parse()
            .context("invalid `kind` setting")?;

        let mut settings = Settings::new(kind);
        settings.start_date = cfg.get("start_date").map(DateInput::from);
        settings.first_date = cfg.get("first_date").map(DateInput::from);
        settings.last_date = cfg.get("last_date").map(DateInput::from);
        settings.end_date = cfg.get("end_date").map(DateInput::from);

        if let Some(raw) = cfg.get("first_day_no") {
            settings.first_day_no = raw.parse().unwrap_or_else(|_| {
                warn!(first_day_no = %raw, "invalid first_day_no; using 0");
                0
            });
        }

        if let Some(raw) = cfg.get("date_output") {
            match raw.parse::<OutputFormat>() {
                Ok(format) => settings.date_output = Some(format),
                Err(err) => warn!(error = %err, "ignoring date_output"),
            }
        }

        if let Some(raw) = cfg.get("round_to") {
            // Zero leaves rounding unset; other bad values become a 1 minute step.
            settings.round_to = match raw.parse::<u32>() {
                Ok(0) => None,
                Ok(minutes) => Some(minutes),
                Err(_) => {
                    warn!(round_to = %raw, "invalid round_to; using 1");
                    Some(1)
                }
            };
        }

        if let Some(raw) = cfg.get("min_range_hours") {
            match raw.parse::<f64>() {
                Ok(hours) => settings.min_range_hours = Some(hours),
                Err(_) => warn!(min_range_hours = %raw, "invalid min_range_hours; using default"),
            }
        }

        settings.timestamp_encoding = match cfg.get("timestamp.encoding").as_deref() {
            None | Some("naive") => TimestampEncoding::Naive,
            Some("zone") => {
                TimestampEncoding::ZoneCorrected(resolve_timezone(cfg.get("timezone").as_deref()))
            }
            Some(other) => {
                warn!(encoding = other, "unknown timestamp encoding; using naive");
                TimestampEncoding::Naive
            }
        };

        settings.l10n = Locale::english().with_overrides(cfg.section("l10n"));
        settings.styles = Styles::from_pairs(cfg.section("styles"));

        debug!(?settings, "decoded picker settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::{PickerKind, Settings, Targets};
    use crate::config::Config;
    use crate::datetime::DateInput;
    use crate::output::{OutputFormat, TimestampEncoding};

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut cfg = Config::default();
        cfg.apply_overrides(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        cfg
    }

    #[test]
    fn decodes_all_recognised_keys() {
        let cfg = config(&[
            ("kind", "datetimerange"),
            ("start_date", "2030-01-01T10:00:00"),
            ("end_date", "2030-01-02"),
            ("first_day_no", "1"),
            ("date_output", "timestamp"),
            ("round_to", "15"),
            ("min_range_hours", "2.5"),
            ("timestamp.encoding", "zone"),
            ("timezone", "Europe/Madrid"),
            ("l10n.jan", "Ene"),
            ("styles.active_color", "#fff"),
        ]);
        let settings = Settings::from_config(&cfg).expect("settings decode");

        assert_eq!(settings.kind, PickerKind::DateTimeRange);
        assert_eq!(
            settings.start_date,
            Some(DateInput::from("2030-01-01T10:00:00"))
        );
        assert_eq!(settings.end_date, Some(DateInput::from("2030-01-02")));
        assert_eq!(settings.first_day_no, 1);
        assert_eq!(settings.output_format(), OutputFormat::Timestamp);
        assert_eq!(settings.round_to, Some(15));
        assert_eq!(settings.min_range_hours, Some(2.5));
        assert_eq!(
            settings.timestamp_encoding,
            TimestampEncoding::ZoneCorrected(chrono_tz::Europe::Madrid)
        );
        assert_eq!(settings.l10n.month_short(1), "Ene");
        assert_eq!(settings.styles.active_color.as_deref(), Some("#fff"));
    }

    #[test]
    fn hex_styles_survive_the_rc_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("pickerrc");
        std::fs::write(
            &rc,
            "styles.active_color = #e34c26 # brand\nstyles.active_background =\n",
        )
        .expect("write rc");

        let mut cfg = Config::default();
        cfg.load_file(&rc).expect("load rc");
        let settings = Settings::from_config(&cfg).expect("settings decode");

        assert_eq!(settings.styles.active_color.as_deref(), Some("#e34c26"));
        assert_eq!(settings.styles.active_background, None);
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = config(&[
            ("kind", "date"),
            ("first_day_no", "monday"),
            ("date_output", "rfc"),
            ("round_to", "abc"),
            ("min_range_hours", "lots"),
        ]);
        let settings = Settings::from_config(&cfg).expect("settings decode");

        assert_eq!(settings.first_day_no, 0);
        assert_eq!(settings.output_format(), OutputFormat::ShortIso);
        assert_eq!(settings.round_to, Some(1));
        assert_eq!(settings.min_range_hours, None);
    }

    #[test]
    fn zero_round_to_means_unset() {
        let cfg = config(&[("round_to", "0")]);
        let settings = Settings::from_config(&cfg).expect("settings decode");
        assert_eq!(settings.round_to, None);
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let cfg = config(&[("kind", "calendar")]);
        assert!(Settings::from_config(&cfg).is_err());
    }

    #[test]
    fn default_outputs_per_kind() {
        assert_eq!(PickerKind::Date.default_output(), OutputFormat::ShortIso);
        assert_eq!(PickerKind::DateTime.default_output(), OutputFormat::FullIso);
        assert_eq!(PickerKind::DateRange.default_output(), OutputFormat::ShortIso);
        assert_eq!(
            PickerKind::DateTimeRange.default_output(),
            OutputFormat::FullIso
        );
        assert!(PickerKind::DateRange.is_range());
        assert!(!PickerKind::DateRange.has_time());
    }

    #[test]
    fn cli_targets_override_config() {
        let cfg = config(&[("target.start", "checkin"), ("target.end", "checkout")]);
        assert_eq!(
            Targets::from_sources(&cfg, &[]),
            Targets::range("checkin", "checkout")
        );
        assert_eq!(
            Targets::from_sources(&cfg, &["when".to_string()]),
            Targets::single("when")
        );
    }
}
