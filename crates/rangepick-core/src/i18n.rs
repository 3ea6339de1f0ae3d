use std::collections::BTreeMap;

use chrono::Weekday;
use tracing::{debug, warn};

/// Short month keys; the full-name key appends `_`.
pub const MONTH_KEYS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const ENGLISH: [(&str, &str); 39] = [
    ("jan", "Jan"),
    ("feb", "Feb"),
    ("mar", "Mar"),
    ("apr", "Apr"),
    ("may", "May"),
    ("jun", "Jun"),
    ("jul", "Jul"),
    ("aug", "Aug"),
    ("sep", "Sep"),
    ("oct", "Oct"),
    ("nov", "Nov"),
    ("dec", "Dec"),
    ("jan_", "January"),
    ("feb_", "February"),
    ("mar_", "March"),
    ("apr_", "April"),
    ("may_", "May"),
    ("jun_", "June"),
    ("jul_", "July"),
    ("aug_", "August"),
    ("sep_", "September"),
    ("oct_", "October"),
    ("nov_", "November"),
    ("dec_", "December"),
    ("mon", "Mon"),
    ("tue", "Tue"),
    ("wed", "Wed"),
    ("thu", "Thu"),
    ("fri", "Fri"),
    ("sat", "Sat"),
    ("sun", "Sun"),
    ("mon_", "Monday"),
    ("tue_", "Tuesday"),
    ("wed_", "Wednesday"),
    ("thu_", "Thursday"),
    ("fri_", "Friday"),
    ("sat_", "Saturday"),
    ("sun_", "Sunday"),
    ("done", "Done"),
];

pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Display strings for month and weekday names. The picker never looks
/// inside the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    strings: BTreeMap<String, String>,
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

impl Locale {
    pub fn english() -> Self {
        Self {
            strings: ENGLISH
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Replaces individual entries; keys outside the fixed set are kept but
    /// reported.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            if !self.strings.contains_key(&key) {
                warn!(key = %key, "unknown l10n key");
            }
            debug!(key = %key, value = %value, "l10n override");
            self.strings.insert(key, value);
        }
        self
    }

    /// Unknown keys render as themselves.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.strings.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn month_short(&self, month: u32) -> &str {
        let key = MONTH_KEYS[(month.clamp(1, 12) - 1) as usize];
        self.get(key)
    }

    pub fn month_full(&self, month: u32) -> String {
        let key = MONTH_KEYS[(month.clamp(1, 12) - 1) as usize];
        self.get(&format!("{key}_")).to_string()
    }

    pub fn weekday_short(&self, day: Weekday) -> &str {
        self.get(weekday_key(day))
    }

    pub fn weekday_full(&self, day: Weekday) -> String {
        self.get(&format!("{}_", weekday_key(day))).to_string()
    }

    pub fn done(&self) -> &str {
        self.get("done")
    }
}
