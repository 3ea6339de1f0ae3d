use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::bounds::{Bounds, DayOrder};
use crate::enforce::{Endpoints, Mode};

pub fn is_leap_year(year: i32) -> bool {
    (year % 100 != 0 && year % 4 == 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Which month a grid cell belongs to, relative to the displayed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthPart {
    Previous,
    Current,
    Next,
}

/// Whether an endpoint marker belongs to the endpoint being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Active,
    Inactive,
}

impl Emphasis {
    fn for_mode(marker: Mode, editing: Mode) -> Self {
        if marker == editing {
            Emphasis::Active
        } else {
            Emphasis::Inactive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emphasis::Active => "active",
            Emphasis::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DayClasses {
    pub disabled: bool,
    pub today: bool,
    pub start: Option<Emphasis>,
    pub end: Option<Emphasis>,
    pub in_range: bool,
}

impl DayClasses {
    pub fn selectable(&self) -> bool {
        !self.disabled
    }

    /// Class labels in the order a renderer would emit them.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = vec!["day"];
        labels.push(if self.disabled { "disabled" } else { "selectable" });
        if self.today {
            labels.push("today");
        }
        if let Some(emphasis) = self.start {
            labels.push("start-day");
            labels.push(emphasis.as_str());
        }
        if self.in_range {
            labels.push("range");
        }
        if let Some(emphasis) = self.end {
            labels.push("end-day");
            labels.push(emphasis.as_str());
        }
        labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub part: MonthPart,
    pub classes: DayClasses,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// Everything the classification of a day depends on.
#[derive(Debug, Clone, Copy)]
pub struct CalendarContext<'a> {
    pub bounds: &'a Bounds,
    pub endpoints: &'a Endpoints,
    pub mode: Mode,
    pub today: NaiveDate,
    pub day_order: &'a DayOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    /// Last day of the previous month.
    pub previous_anchor: NaiveDate,
    /// First day of the displayed month.
    pub current_anchor: NaiveDate,
    /// First day of the next month.
    pub next_anchor: NaiveDate,
    pub cells: Vec<DayCell>,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

impl MonthGrid {
    pub fn weeks(&self) -> std::slice::Chunks<'_, DayCell> {
        self.cells.chunks(7)
    }

    pub fn find(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().find(|cell| cell.date == date)
    }

    pub fn current_days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells
            .iter()
            .filter(|cell| cell.part == MonthPart::Current)
    }
}

/// Classifies one day with the clock time stripped from every bound and
/// endpoint, so both bound days are selectable.
pub fn classify_day(date: NaiveDate, ctx: &CalendarContext<'_>) -> DayClasses {
    let start = ctx.endpoints.start.date();
    let mut classes = DayClasses {
        disabled: date < ctx.bounds.first.date() || date > ctx.bounds.last.date(),
        today: date == ctx.today,
        ..DayClasses::default()
    };

    if date == start {
        classes.start = Some(Emphasis::for_mode(Mode::Start, ctx.mode));
    }

    if let Some(end) = ctx.endpoints.end.map(|end| end.date()) {
        classes.in_range = start < date && date < end;
        if date == end {
            classes.end = Some(Emphasis::for_mode(Mode::End, ctx.mode));
        }
    }

    classes
}

/// Builds the day grid of the month containing `date`, padded with the
/// tail of the previous month and the head of the next one so that every
/// row holds seven cells.
#[instrument(skip(ctx))]
pub fn build_month(date: NaiveDate, ctx: &CalendarContext<'_>) -> MonthGrid {
    let current_anchor = date.with_day(1).unwrap_or(date);
    let year = current_anchor.year();
    let month = current_anchor.month();
    let length = days_in_month(year, month);

    let previous_anchor = current_anchor.pred_opt().unwrap_or(current_anchor);
    let next_anchor = current_anchor
        .checked_add_days(Days::new(u64::from(length)))
        .unwrap_or(current_anchor);

    let leading = ctx.day_order.column_of(current_anchor.weekday());
    let used = leading + length as usize;
    let total = used.div_ceil(7) * 7;

    let grid_start = current_anchor
        .checked_sub_days(Days::new(leading as u64))
        .unwrap_or(current_anchor);

    let cells: Vec<DayCell> = grid_start
        .iter_days()
        .take(total)
        .map(|day| {
            let part = if day < current_anchor {
                MonthPart::Previous
            } else if day >= next_anchor {
                MonthPart::Next
            } else {
                MonthPart::Current
            };
            DayCell {
                date: day,
                part,
                classes: classify_day(day, ctx),
            }
        })
        .collect();

    let can_go_previous = previous_anchor >= ctx.bounds.first.date();
    let can_go_next = ctx.bounds.last > next_anchor.and_time(NaiveTime::MIN);

    trace!(
        %current_anchor,
        leading,
        cells = cells.len(),
        can_go_previous,
        can_go_next,
        "built month grid"
    );

    MonthGrid {
        previous_anchor,
        current_anchor,
        next_anchor,
        cells,
        can_go_previous,
        can_go_next,
    }
}
