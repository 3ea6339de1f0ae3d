use chrono::{Duration, NaiveDateTime, Weekday};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::datetime::{DateInput, Granularity, resolve_value, round_minutes};

/// Days between "now" and the default start selection.
pub const DEFAULT_START_LEAD_DAYS: i64 = 1;

/// Width of the default selectable window after the start date.
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

const CANONICAL_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Inclusive selectable window of one picker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl Bounds {
    pub fn contains(&self, dt: NaiveDateTime) -> bool {
        self.first <= dt && dt <= self.last
    }
}

/// Display order of the weekday columns, a left rotation of the
/// Sunday-first week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOrder {
    offset: usize,
    days: [Weekday; 7],
}

impl DayOrder {
    /// `first_day_no` follows the Sunday = 0 .. Saturday = 6 numbering and
    /// is clamped into that range.
    pub fn from_first_day_no(first_day_no: i64) -> Self {
        let clamped = first_day_no.clamp(0, 6);
        if clamped != first_day_no {
            warn!(first_day_no, clamped, "week start out of range; clamped");
        }
        let offset = clamped as usize;
        let mut days = CANONICAL_DAYS;
        days.rotate_left(offset);
        Self { offset, days }
    }

    pub fn days(&self) -> &[Weekday; 7] {
        &self.days
    }

    pub fn first(&self) -> Weekday {
        self.days[0]
    }

    /// Zero based column of `day` in this order.
    pub fn column_of(&self, day: Weekday) -> usize {
        (day.num_days_from_sunday() as usize + 7 - self.offset) % 7
    }
}

impl Default for DayOrder {
    fn default() -> Self {
        Self::from_first_day_no(0)
    }
}

/// Smallest gap allowed between the two endpoints of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinInterval(Duration);

impl MinInterval {
    pub const DEFAULT_HOURS: i64 = 1;

    /// Hours may be fractional. Zero, negative and non finite values fall
    /// back to the one hour default; anything longer than the default
    /// window is capped to it.
    pub fn from_hours(hours: f64) -> Self {
        if !hours.is_finite() || hours <= 0.0 {
            warn!(hours, "invalid minimum interval; using default");
            return Self::default();
        }
        let max_hours = (DEFAULT_WINDOW_DAYS * 24) as f64;
        if hours > max_hours {
            warn!(hours, max_hours, "minimum interval too long; capping");
            return Self(Duration::days(DEFAULT_WINDOW_DAYS));
        }
        Self(Duration::milliseconds((hours * 3_600_000.0).round() as i64))
    }

    pub fn duration(self) -> Duration {
        self.0
    }
}

impl Default for MinInterval {
    fn default() -> Self {
        Self(Duration::hours(Self::DEFAULT_HOURS))
    }
}

/// Raw inputs for the start endpoint and the bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartInputs<'a> {
    pub start: Option<&'a DateInput>,
    pub first: Option<&'a DateInput>,
    pub last: Option<&'a DateInput>,
    pub echoed_start: Option<&'a str>,
    pub first_day_no: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartResolution {
    pub start: NaiveDateTime,
    pub bounds: Bounds,
    pub day_order: DayOrder,
}

/// Establishes the start date and the selectable window.
///
/// The start selection wins over an inconsistent lower bound (the bound is
/// lowered to it) while an upper bound earlier than the start is replaced
/// by the default window.
#[instrument(skip(inputs, step))]
pub fn resolve_start(
    now: NaiveDateTime,
    inputs: StartInputs<'_>,
    step: Granularity,
) -> StartResolution {
    let start_default = now + Duration::days(DEFAULT_START_LEAD_DAYS);
    let start = resolve_value(start_default, inputs.start, inputs.echoed_start);

    let mut first = resolve_value(now, inputs.first, None);
    if start < first {
        debug!(%start, %first, "start precedes first date; lowering bound");
        first = start;
    }

    let last_default = start + Duration::days(DEFAULT_WINDOW_DAYS);
    let mut last = resolve_value(last_default, inputs.last, None);
    if last < start {
        debug!(%start, %last, "last date precedes start; using default window");
        last = last_default;
    }

    let resolution = StartResolution {
        start: round_minutes(start, step),
        bounds: Bounds {
            first: round_minutes(first, step),
            last: round_minutes(last, step),
        },
        day_order: DayOrder::from_first_day_no(inputs.first_day_no),
    };
    debug!(?resolution, "resolved start endpoint");
    resolution
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndResolution {
    pub end: NaiveDateTime,
    pub last: NaiveDateTime,
}

/// Establishes the end date of a range, widening the upper bound when the
/// end selection lies beyond it.
#[instrument(skip(setting, echoed, step))]
pub fn resolve_end(
    setting: Option<&DateInput>,
    echoed: Option<&str>,
    start: NaiveDateTime,
    min_interval: MinInterval,
    last: NaiveDateTime,
    step: Granularity,
) -> EndResolution {
    let end_default = start + min_interval.duration();
    let mut end = resolve_value(end_default, setting, echoed);
    if end < start {
        debug!(%start, %end, "end precedes start; using default");
        end = end_default;
    }

    let end = round_minutes(end, step);
    let last = if end > last {
        debug!(%end, %last, "end exceeds last date; widening bound");
        end
    } else {
        last
    };

    EndResolution { end, last }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};

    use super::{DayOrder, MinInterval, StartInputs, resolve_end, resolve_start};
    use crate::datetime::{DateInput, Granularity};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .expect("valid date")
            .and_hms_opt(h, mi, 0)
            .expect("valid time")
    }

    #[test]
    fn defaults_are_relative_to_now() {
        let now = at(2030, 3, 10, 9, 0);
        let res = resolve_start(now, StartInputs::default(), Granularity::HALF_HOUR);

        assert_eq!(res.start, at(2030, 3, 11, 9, 0));
        assert_eq!(res.bounds.first, now);
        assert_eq!(res.bounds.last, at(2030, 3, 11, 9, 0) + Duration::days(365));
        assert_eq!(res.day_order.first(), Weekday::Sun);
    }

    #[test]
    fn defaults_are_rounded() {
        let now = at(2030, 3, 10, 9, 7);
        let res = resolve_start(now, StartInputs::default(), Granularity::HALF_HOUR);

        assert_eq!(res.start, at(2030, 3, 11, 9, 30));
        assert_eq!(res.bounds.first, at(2030, 3, 10, 9, 30));
    }

    #[test]
    fn start_before_first_lowers_the_bound() {
        let start = DateInput::from("2030-01-05T10:00:00");
        let first = DateInput::from("2030-02-01");
        let res = resolve_start(
            at(2029, 12, 1, 0, 0),
            StartInputs {
                start: Some(&start),
                first: Some(&first),
                ..StartInputs::default()
            },
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.bounds.first, at(2030, 1, 5, 10, 0));
        assert_eq!(res.start, res.bounds.first);
    }

    #[test]
    fn last_before_start_is_replaced_by_default_window() {
        let start = DateInput::from("2030-01-05T10:00:00");
        let last = DateInput::from("2030-01-01");
        let res = resolve_start(
            at(2029, 12, 1, 0, 0),
            StartInputs {
                start: Some(&start),
                last: Some(&last),
                ..StartInputs::default()
            },
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.bounds.last, at(2031, 1, 5, 10, 0));
        assert!(res.bounds.first <= res.start && res.start <= res.bounds.last);
    }

    #[test]
    fn echoed_start_overrides_setting() {
        let start = DateInput::from("2030-01-05T10:00:00");
        let res = resolve_start(
            at(2029, 12, 1, 0, 0),
            StartInputs {
                start: Some(&start),
                echoed_start: Some("2030-01-07T08:00:00"),
                ..StartInputs::default()
            },
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.start, at(2030, 1, 7, 8, 0));
    }

    #[test]
    fn end_defaults_to_start_plus_interval() {
        let start = at(2030, 1, 1, 10, 0);
        let res = resolve_end(
            None,
            None,
            start,
            MinInterval::from_hours(3.0),
            at(2030, 6, 1, 0, 0),
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.end, at(2030, 1, 1, 13, 0));
        assert_eq!(res.last, at(2030, 6, 1, 0, 0));
    }

    #[test]
    fn end_before_start_is_reset() {
        let start = at(2030, 1, 1, 10, 0);
        let end = DateInput::from(at(2029, 1, 1, 0, 0));
        let res = resolve_end(
            Some(&end),
            None,
            start,
            MinInterval::default(),
            at(2030, 6, 1, 0, 0),
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.end, at(2030, 1, 1, 11, 0));
    }

    #[test]
    fn end_beyond_last_widens_the_bound() {
        let start = at(2030, 1, 1, 10, 0);
        let end = DateInput::from("2030-08-01T12:10:00");
        let res = resolve_end(
            Some(&end),
            None,
            start,
            MinInterval::default(),
            at(2030, 6, 1, 0, 0),
            Granularity::HALF_HOUR,
        );

        assert_eq!(res.end, at(2030, 8, 1, 12, 30));
        assert_eq!(res.last, res.end);
    }

    #[test]
    fn monday_first_rotation() {
        let order = DayOrder::from_first_day_no(1);
        assert_eq!(order.first(), Weekday::Mon);
        assert_eq!(order.days()[6], Weekday::Sun);
        assert_eq!(order.column_of(Weekday::Sun), 6);
        assert_eq!(order.column_of(Weekday::Mon), 0);
    }

    #[test]
    fn week_start_is_clamped() {
        assert_eq!(DayOrder::from_first_day_no(9).first(), Weekday::Sat);
        assert_eq!(DayOrder::from_first_day_no(-3).first(), Weekday::Sun);
    }

    #[test]
    fn interval_from_fractional_hours() {
        assert_eq!(
            MinInterval::from_hours(1.5).duration(),
            Duration::minutes(90)
        );
        assert_eq!(MinInterval::from_hours(0.0), MinInterval::default());
        assert_eq!(MinInterval::from_hours(f64::NAN), MinInterval::default());
    }

    #[test]
    fn huge_intervals_are_capped_to_the_window() {
        let gap = MinInterval::from_hours(1e13);
        assert_eq!(gap.duration(), Duration::days(365));

        let end = resolve_end(
            None,
            None,
            at(2030, 1, 1, 6, 0),
            gap,
            at(2030, 6, 1, 0, 0),
            Granularity::HALF_HOUR,
        );
        assert_eq!(end.end, at(2031, 1, 1, 6, 0));
        assert_eq!(end.last, end.end);
    }
}
