use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::bounds::Bounds;
use crate::datetime::Granularity;

/// Columns of the fixed time grid.
pub const GRID_COLUMNS: usize = 6;

/// A wall clock hour:minute pair inside one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TimeSlot {
    pub hour: u32,
    pub minute: u32,
}

impl TimeSlot {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn of(dt: NaiveDateTime) -> Self {
        Self {
            hour: dt.hour(),
            minute: dt.minute(),
        }
    }

    /// The instant this slot denotes on `day`.
    pub fn on(self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN))
    }

    pub fn label(self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow!("expected HH:MM, got: {s}"))?;
        let hour: u32 = h.parse().with_context(|| format!("invalid hour in {s}"))?;
        let minute: u32 = m.parse().with_context(|| format!("invalid minute in {s}"))?;
        TimeSlot::new(hour, minute).ok_or_else(|| anyhow!("time out of range: {s}"))
    }
}

/// Every slot of a day at the given step, starting at midnight.
pub fn day_slots(step: Granularity) -> impl Iterator<Item = TimeSlot> {
    let step = step.minutes() as usize;
    (0..24 * 60)
        .step_by(step)
        .map(|minutes: u32| TimeSlot {
            hour: minutes / 60,
            minute: minutes % 60,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeCell {
    pub slot: TimeSlot,
    pub disabled: bool,
    pub selected: bool,
}

impl TimeCell {
    pub fn labels(&self) -> Vec<&'static str> {
        if self.disabled {
            return vec!["hour", "disabled"];
        }
        if self.selected {
            vec!["hour", "selectable", "time-selected"]
        } else {
            vec!["hour", "selectable"]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourGrid {
    pub day: NaiveDate,
    pub columns: usize,
    pub cells: Vec<TimeCell>,
}

impl HourGrid {
    pub fn rows(&self) -> std::slice::Chunks<'_, TimeCell> {
        self.cells.chunks(self.columns)
    }

    pub fn find(&self, slot: TimeSlot) -> Option<&TimeCell> {
        self.cells.iter().find(|cell| cell.slot == slot)
    }
}

/// Builds the time grid for the day of `current`, the value of the
/// endpoint being edited.
///
/// A slot is disabled when the instant it denotes on that day falls
/// outside the bounds; the slot whose label matches the endpoint's
/// hour:minute is flagged as selected.
#[instrument(skip(bounds, step))]
pub fn build_hours(current: NaiveDateTime, bounds: &Bounds, step: Granularity) -> HourGrid {
    let day = current.date();
    let selected = TimeSlot::of(current).label();

    let cells: Vec<TimeCell> = day_slots(step)
        .map(|slot| {
            let disabled = !bounds.contains(slot.on(day));
            TimeCell {
                slot,
                disabled,
                selected: !disabled && slot.label() == selected,
            }
        })
        .collect();

    trace!(
        %day,
        slots = cells.len(),
        enabled = cells.iter().filter(|cell| !cell.disabled).count(),
        "built hour grid"
    );

    HourGrid {
        day,
        columns: GRID_COLUMNS,
        cells,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListOption {
    pub value: u32,
    pub selected: bool,
}

/// Hour and minute selection lists, the minute list depending on the
/// chosen hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeLists {
    pub day: NaiveDate,
    pub current: NaiveDateTime,
    pub step: Granularity,
    pub hours: Vec<ListOption>,
    pub selected_hour: Option<u32>,
    pub minutes: Vec<ListOption>,
}

impl TimeLists {
    /// Rebuilds the minute list after the hour selection changed.
    #[instrument(skip(self, bounds))]
    pub fn choose_hour(&mut self, hour: u32, bounds: &Bounds) {
        for option in &mut self.hours {
            option.selected = option.value == hour;
        }
        self.selected_hour = Some(hour);
        self.minutes = minute_options(self.day, hour, self.current, bounds, self.step);
    }

    /// The slot formed by the selected hour and `minute`, if both are on
    /// offer.
    pub fn slot(&self, minute: u32) -> Option<TimeSlot> {
        let hour = self.selected_hour?;
        self.minutes
            .iter()
            .any(|option| option.value == minute)
            .then_some(TimeSlot { hour, minute })
    }
}

/// Minutes of `hour` on `day` that stay inside the bounds, stepping by
/// `step`. The endpoint's current minute is flagged as selected only in
/// the endpoint's own hour.
pub fn minute_options(
    day: NaiveDate,
    hour: u32,
    current: NaiveDateTime,
    bounds: &Bounds,
    step: Granularity,
) -> Vec<ListOption> {
    (0..60)
        .step_by(step.minutes() as usize)
        .filter(|&minute| {
            TimeSlot::new(hour, minute)
                .map(|slot| bounds.contains(slot.on(day)))
                .unwrap_or(false)
        })
        .map(|minute| ListOption {
            value: minute,
            selected: hour == current.hour() && minute == current.minute(),
        })
        .collect()
}

/// Builds the dependent hour/minute lists for the day of `current`.
///
/// Hours with no minute left inside the bounds are dropped. The endpoint's
/// hour anchors the initial minute list; if that hour is not on offer the
/// first available hour is used.
#[instrument(skip(bounds, step))]
pub fn build_time_lists(current: NaiveDateTime, bounds: &Bounds, step: Granularity) -> TimeLists {
    let day = current.date();

    let hours: Vec<ListOption> = (0..24)
        .filter(|&hour| !minute_options(day, hour, current, bounds, step).is_empty())
        .map(|hour| ListOption {
            value: hour,
            selected: hour == current.hour(),
        })
        .collect();

    let selected_hour = hours
        .iter()
        .find(|option| option.selected)
        .or_else(|| hours.first())
        .map(|option| option.value);

    let minutes = selected_hour
        .map(|hour| minute_options(day, hour, current, bounds, step))
        .unwrap_or_default();

    TimeLists {
        day,
        current,
        step,
        hours,
        selected_hour,
        minutes,
    }
}
