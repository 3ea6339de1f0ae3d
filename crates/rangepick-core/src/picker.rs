use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::bounds::{Bounds, DayOrder, MinInterval, StartInputs, resolve_end, resolve_start};
use crate::calendar::{CalendarContext, MonthGrid, build_month, classify_day, days_in_month};
use crate::datetime::Granularity;
use crate::enforce::{Endpoints, Mode, enforce};
use crate::error::PickerError;
use crate::hours::{HourGrid, TimeLists, TimeSlot, build_hours, build_time_lists};
use crate::i18n::Locale;
use crate::output::{OutputFormat, OutputValue, TimestampEncoding, decode, encode, full_iso};
use crate::settings::{PickerKind, Settings, Targets};

/// Delay between a selection and the automatic close of its panel.
pub const CLOSE_DELAY: Duration = Duration::from_millis(500);

/// Name of the echo field that carries the serialized value of `target`.
pub fn echo_field(target: &str) -> String {
    format!("{target}_value")
}

/// Read access to values echoed by a previous construction.
pub trait EchoSource {
    fn echoed(&self, field: &str) -> Option<String>;
}

impl EchoSource for BTreeMap<String, String> {
    fn echoed(&self, field: &str) -> Option<String> {
        self.get(field).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Date,
    Time,
}

/// The one panel that may be open on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub mode: Mode,
    pub kind: PanelKind,
}

/// Which time panel a datetime picker shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeStyle {
    /// Fixed grid of every slot in the day.
    Grid,
    /// Hour list with a dependent minute list.
    Lists,
}

/// A user gesture on a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Day(NaiveDate),
    Time(TimeSlot),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "panel", rename_all = "lowercase")]
pub enum PanelView {
    Calendar(MonthGrid),
    Grid(HourGrid),
    Lists(TimeLists),
}

/// One echo field and its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoedValue {
    pub field: String,
    pub value: OutputValue,
}

/// Result of an accepted selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub mode: Mode,
    pub view: PanelView,
    /// Peer endpoint moved by the enforcer and due for redisplay.
    pub refresh: Option<Mode>,
    pub outputs: Vec<EchoedValue>,
    /// The host closes the panel after this delay.
    pub close_after: Duration,
}

/// Text shown on an endpoint button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointDisplay {
    pub weekday: String,
    pub day: String,
    pub month: String,
    pub year: i32,
    pub hour: Option<String>,
    pub minute: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub kind: PickerKind,
    pub start_target: String,
    pub end_target: Option<String>,
    pub bounds: Bounds,
    pub endpoints: Endpoints,
    pub mode: Mode,
    pub open_panel: Option<Panel>,
    pub displayed_month: NaiveDate,
    pub granularity_minutes: u32,
    pub time_style: TimeStyle,
    pub min_interval_minutes: Option<i64>,
    pub date_output: OutputFormat,
    pub timestamp_encoding: String,
    pub outputs: Vec<EchoedValue>,
}

/// One date or range picker. All state lives here; instances share
/// nothing.
#[derive(Debug, Clone)]
pub struct Picker {
    kind: PickerKind,
    targets: Targets,
    bounds: Bounds,
    endpoints: Endpoints,
    day_order: DayOrder,
    granularity: Granularity,
    time_style: TimeStyle,
    min_interval: MinInterval,
    format: OutputFormat,
    encoding: TimestampEncoding,
    locale: Locale,
    today: NaiveDate,
    mode: Mode,
    open: Option<Panel>,
    displayed: NaiveDate,
    chosen_hour: Option<u32>,
}

impl Picker {
    /// Resolves endpoints and bounds for a new instance.
    ///
    /// Echoed values found in `echo` take precedence over the dates in
    /// `settings`; both fall back to defaults relative to `now`.
    #[instrument(skip(settings, echo), fields(kind = %settings.kind))]
    pub fn new(
        targets: Targets,
        settings: &Settings,
        echo: &dyn EchoSource,
        now: NaiveDateTime,
    ) -> Result<Self, PickerError> {
        let kind = settings.kind;
        validate_targets(kind, &targets)?;

        let (granularity, time_style) = match settings.round_to {
            Some(minutes) => (Granularity::new(minutes), TimeStyle::Lists),
            None => (Granularity::HALF_HOUR, TimeStyle::Grid),
        };
        let encoding = settings.timestamp_encoding;
        let read_echo = |target: &str| {
            echo.echoed(&echo_field(target)).map(|raw| {
                // Re-express timestamps in the grammar the resolver reads.
                decode(&raw, encoding).map(full_iso).unwrap_or(raw)
            })
        };

        let echoed_start = read_echo(&targets.start);
        let start_res = resolve_start(
            now,
            StartInputs {
                start: settings.start_date.as_ref(),
                first: settings.first_date.as_ref(),
                last: settings.last_date.as_ref(),
                echoed_start: echoed_start.as_deref(),
                first_day_no: settings.first_day_no,
            },
            granularity,
        );

        let mut bounds = start_res.bounds;
        let min_interval = settings
            .min_range_hours
            .map(MinInterval::from_hours)
            .unwrap_or_default();

        let end = match targets.end.as_deref() {
            Some(end_target) => {
                let echoed_end = read_echo(end_target);
                let end_res = resolve_end(
                    settings.end_date.as_ref(),
                    echoed_end.as_deref(),
                    start_res.start,
                    min_interval,
                    bounds.last,
                    granularity,
                );
                bounds.last = end_res.last;
                Some(end_res.end)
            }
            None => None,
        };

        let mut endpoints = Endpoints {
            start: start_res.start,
            end,
        };
        enforce(Mode::Start, &mut endpoints, &bounds, min_interval);

        let picker = Self {
            kind,
            targets,
            bounds,
            endpoints,
            day_order: start_res.day_order,
            granularity,
            time_style,
            min_interval,
            format: settings.output_format(),
            encoding,
            locale: settings.l10n.clone(),
            today: now.date(),
            mode: Mode::Start,
            open: None,
            displayed: month_anchor(endpoints.start.date()),
            chosen_hour: None,
        };
        info!(
            kind = %picker.kind,
            start = %picker.endpoints.start,
            end = ?picker.endpoints.end,
            "picker constructed"
        );
        Ok(picker)
    }

    pub fn kind(&self) -> PickerKind {
        self.kind
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn day_order(&self) -> &DayOrder {
        &self.day_order
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn open_panel(&self) -> Option<Panel> {
        self.open
    }

    pub fn time_style(&self) -> TimeStyle {
        self.time_style
    }

    pub fn displayed_month(&self) -> NaiveDate {
        self.displayed
    }

    fn check_mode(&self, mode: Mode) -> Result<(), PickerError> {
        if mode == Mode::End && !self.kind.is_range() {
            return Err(PickerError::NoEndEndpoint(self.kind.as_str()));
        }
        Ok(())
    }

    fn current(&self, mode: Mode) -> NaiveDateTime {
        self.endpoints.get(mode).unwrap_or(self.endpoints.start)
    }

    /// Opens a panel for `mode`, closing any other one. Opening the panel
    /// that is already open closes it and yields `None`.
    #[instrument(skip(self))]
    pub fn open(&mut self, mode: Mode, kind: PanelKind) -> Result<Option<PanelView>, PickerError> {
        self.check_mode(mode)?;
        if kind == PanelKind::Time && !self.kind.has_time() {
            return Err(PickerError::NoTimePanel(self.kind.as_str()));
        }

        let panel = Panel { mode, kind };
        if self.open == Some(panel) {
            debug!(?panel, "panel toggled closed");
            self.open = None;
            return Ok(None);
        }

        self.open = Some(panel);
        self.mode = mode;
        self.chosen_hour = None;
        if kind == PanelKind::Date {
            self.displayed = month_anchor(self.current(mode).date());
        }
        debug!(?panel, "panel opened");
        Ok(self.view())
    }

    pub fn close(&mut self) {
        if let Some(panel) = self.open.take() {
            debug!(?panel, "panel closed");
        }
        self.chosen_hour = None;
    }

    /// The content of the open panel, rebuilt from the model.
    pub fn view(&self) -> Option<PanelView> {
        let panel = self.open?;
        Some(match panel.kind {
            PanelKind::Date => PanelView::Calendar(self.calendar()),
            PanelKind::Time => self.time_view(panel.mode),
        })
    }

    fn context(&self) -> CalendarContext<'_> {
        CalendarContext {
            bounds: &self.bounds,
            endpoints: &self.endpoints,
            mode: self.mode,
            today: self.today,
            day_order: &self.day_order,
        }
    }

    /// Month grid of the displayed month.
    pub fn calendar(&self) -> MonthGrid {
        build_month(self.displayed, &self.context())
    }

    fn time_view(&self, mode: Mode) -> PanelView {
        let current = self.current(mode);
        match self.time_style {
            TimeStyle::Grid => PanelView::Grid(build_hours(current, &self.bounds, self.granularity)),
            TimeStyle::Lists => PanelView::Lists(self.lists_for(current, self.chosen_hour)),
        }
    }

    fn lists_for(&self, current: NaiveDateTime, hour: Option<u32>) -> TimeLists {
        let mut lists = build_time_lists(current, &self.bounds, self.granularity);
        if let Some(hour) = hour
            && lists.hours.iter().any(|option| option.value == hour)
        {
            lists.choose_hour(hour, &self.bounds);
        }
        lists
    }

    /// Moves the displayed month back one, unless that month lies wholly
    /// before the first date.
    pub fn previous_month(&mut self) -> Option<MonthGrid> {
        let grid = self.calendar();
        if !grid.can_go_previous {
            debug!(month = %grid.current_anchor, "previous month is out of bounds");
            return None;
        }
        self.displayed = month_anchor(grid.previous_anchor);
        Some(self.calendar())
    }

    /// Moves the displayed month forward one, unless the last date falls
    /// before it.
    pub fn next_month(&mut self) -> Option<MonthGrid> {
        let grid = self.calendar();
        if !grid.can_go_next {
            debug!(month = %grid.current_anchor, "next month is out of bounds");
            return None;
        }
        self.displayed = grid.next_anchor;
        Some(self.calendar())
    }

    /// Jumps to the month containing `date` if any of its days is
    /// selectable.
    pub fn show_month(&mut self, date: NaiveDate) -> Option<MonthGrid> {
        let anchor = month_anchor(date);
        let month_end = anchor
            .with_day(days_in_month(anchor.year(), anchor.month()))
            .unwrap_or(anchor);
        if month_end < self.bounds.first.date() || anchor > self.bounds.last.date() {
            debug!(month = %anchor, "month holds no selectable day");
            return None;
        }
        self.displayed = anchor;
        Some(self.calendar())
    }

    /// Picks an hour in the list variant and returns the rebuilt lists.
    pub fn choose_hour(&mut self, hour: u32) -> Option<TimeLists> {
        let panel = self.open.filter(|panel| panel.kind == PanelKind::Time)?;
        if self.time_style != TimeStyle::Lists {
            return None;
        }
        let lists = self.lists_for(self.current(panel.mode), Some(hour));
        if lists.selected_hour != Some(hour) {
            warn!(hour, "hour has no selectable minute");
            return None;
        }
        self.chosen_hour = Some(hour);
        Some(lists)
    }

    /// Applies a cell selection to the endpoint of the open panel.
    ///
    /// Cells that are disabled, or that do not belong to the open panel,
    /// are ignored.
    #[instrument(skip(self))]
    pub fn select(&mut self, cell: Cell) -> Option<Selection> {
        let Some(panel) = self.open else {
            warn!(?cell, "no panel open; selection ignored");
            return None;
        };
        let mode = panel.mode;
        let current = self.current(mode);

        let value = match (cell, panel.kind) {
            (Cell::Day(date), PanelKind::Date) => {
                if !classify_day(date, &self.context()).selectable() {
                    warn!(%date, "disabled day selected; ignoring");
                    return None;
                }
                date.and_time(current.time())
            }
            (Cell::Time(slot), PanelKind::Time) => {
                if !self.slot_selectable(current, slot) {
                    warn!(%slot, "disabled time selected; ignoring");
                    return None;
                }
                slot.on(current.date())
            }
            (cell, kind) => {
                warn!(?cell, ?kind, "cell does not belong to the open panel");
                return None;
            }
        };

        self.endpoints.set(mode, value);
        let refresh = enforce(mode, &mut self.endpoints, &self.bounds, self.min_interval);
        if panel.kind == PanelKind::Date {
            self.displayed = month_anchor(self.current(mode).date());
        }
        self.chosen_hour = None;

        let view = self.view()?;
        info!(%mode, value = %self.current(mode), ?refresh, "selection applied");
        Some(Selection {
            mode,
            view,
            refresh,
            outputs: self.outputs(),
            close_after: CLOSE_DELAY,
        })
    }

    fn slot_selectable(&self, current: NaiveDateTime, slot: TimeSlot) -> bool {
        match self.time_style {
            TimeStyle::Grid => build_hours(current, &self.bounds, self.granularity)
                .find(slot)
                .is_some_and(|cell| !cell.disabled),
            TimeStyle::Lists => {
                let lists = self.lists_for(current, Some(slot.hour));
                lists.selected_hour == Some(slot.hour) && lists.slot(slot.minute).is_some()
            }
        }
    }

    pub fn output(&self, mode: Mode) -> Option<OutputValue> {
        self.endpoints
            .get(mode)
            .map(|dt| encode(dt, self.format, self.encoding))
    }

    /// Echo field values for every endpoint.
    pub fn outputs(&self) -> Vec<EchoedValue> {
        let mut outputs = vec![EchoedValue {
            field: echo_field(&self.targets.start),
            value: encode(self.endpoints.start, self.format, self.encoding),
        }];
        if let (Some(target), Some(end)) = (self.targets.end.as_deref(), self.endpoints.end) {
            outputs.push(EchoedValue {
                field: echo_field(target),
                value: encode(end, self.format, self.encoding),
            });
        }
        outputs
    }

    /// Button text of an endpoint, derived from the model.
    pub fn display(&self, mode: Mode) -> Result<EndpointDisplay, PickerError> {
        self.check_mode(mode)?;
        let value = self.current(mode);
        let date = value.date();
        let has_time = self.kind.has_time();
        Ok(EndpointDisplay {
            weekday: self.locale.weekday_short(date.weekday()).to_string(),
            day: format!("{:02}", date.day()),
            month: self.locale.month_short(date.month()).to_string(),
            year: date.year(),
            hour: has_time.then(|| format!("{:02}", value.hour())),
            minute: has_time.then(|| format!(":{:02}", value.minute())),
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: self.kind,
            start_target: self.targets.start.clone(),
            end_target: self.targets.end.clone(),
            bounds: self.bounds,
            endpoints: self.endpoints,
            mode: self.mode,
            open_panel: self.open,
            displayed_month: self.displayed,
            granularity_minutes: self.granularity.minutes(),
            time_style: self.time_style,
            min_interval_minutes: self
                .kind
                .is_range()
                .then(|| self.min_interval.duration().num_minutes()),
            date_output: self.format,
            timestamp_encoding: self.encoding.label(),
            outputs: self.outputs(),
        }
    }
}

fn validate_targets(kind: PickerKind, targets: &Targets) -> Result<(), PickerError> {
    if targets.start.trim().is_empty() {
        return Err(PickerError::MissingTarget);
    }
    let end = targets.end.as_deref().filter(|id| !id.trim().is_empty());
    match (kind.is_range(), end) {
        (true, None) => Err(PickerError::MissingEndTarget(kind.as_str())),
        (false, Some(id)) => Err(PickerError::UnexpectedEndTarget(
            kind.as_str(),
            id.to_string(),
        )),
        _ => Ok(()),
    }
}

fn month_anchor(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::{CLOSE_DELAY, Cell, PanelKind, PanelView, Picker, TimeStyle};
    use crate::datetime::DateInput;
    use crate::enforce::Mode;
    use crate::error::PickerError;
    use crate::hours::TimeSlot;
    use crate::output::OutputValue;
    use crate::settings::{PickerKind, Settings, Targets};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .expect("valid date")
            .and_hms_opt(h, mi, 0)
            .expect("valid time")
    }

    fn day(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).expect("valid date")
    }

    fn slot(h: u32, m: u32) -> TimeSlot {
        TimeSlot::new(h, m).expect("valid slot")
    }

    fn no_echo() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn range_settings() -> Settings {
        let mut settings = Settings::new(PickerKind::DateTimeRange);
        settings.first_date = Some(DateInput::from("2030-01-01T00:00:00"));
        settings.last_date = Some(DateInput::from("2030-01-02T00:00:00"));
        settings.start_date = Some(DateInput::from("2030-01-01T06:00:00"));
        settings.end_date = Some(DateInput::from("2030-01-01T12:00:00"));
        settings.min_range_hours = Some(3.0);
        settings
    }

    fn range_picker() -> Picker {
        Picker::new(
            Targets::range("from", "to"),
            &range_settings(),
            &no_echo(),
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds")
    }

    #[test]
    fn target_validation() {
        let now = at(2030, 1, 1, 0, 0);
        let single = Settings::new(PickerKind::Date);
        let range = Settings::new(PickerKind::DateRange);

        assert_eq!(
            Picker::new(Targets::single(""), &single, &no_echo(), now).err(),
            Some(PickerError::MissingTarget)
        );
        assert_eq!(
            Picker::new(Targets::single("a"), &range, &no_echo(), now).err(),
            Some(PickerError::MissingEndTarget("daterange"))
        );
        assert_eq!(
            Picker::new(Targets::range("a", "b"), &single, &no_echo(), now).err(),
            Some(PickerError::UnexpectedEndTarget("date", "b".to_string()))
        );
    }

    #[test]
    fn echoed_values_seed_the_endpoints() {
        let mut echo = no_echo();
        echo.insert("from_value".to_string(), "2030-01-01T09:00:00".to_string());
        echo.insert("to_value".to_string(), "garbage".to_string());

        let picker = Picker::new(
            Targets::range("from", "to"),
            &range_settings(),
            &echo,
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds");

        assert_eq!(picker.endpoints().start, at(2030, 1, 1, 9, 0));
        assert_eq!(picker.endpoints().end, Some(at(2030, 1, 1, 12, 0)));
    }

    #[test]
    fn echoed_timestamps_are_read_back() {
        let mut settings = Settings::new(PickerKind::DateTime);
        settings.date_output = Some(crate::output::OutputFormat::Timestamp);
        let mut echo = no_echo();
        echo.insert("when_value".to_string(), "1893456000".to_string());

        let picker = Picker::new(Targets::single("when"), &settings, &echo, at(2029, 6, 1, 0, 0))
            .expect("picker builds");

        assert_eq!(picker.endpoints().start, at(2030, 1, 1, 0, 0));
        assert_eq!(picker.output(Mode::Start), Some(OutputValue::Seconds(1_893_456_000)));
    }

    #[test]
    fn construction_enforces_the_minimum_interval() {
        let mut settings = range_settings();
        settings.end_date = Some(DateInput::from("2030-01-01T07:00:00"));
        let picker = Picker::new(
            Targets::range("from", "to"),
            &settings,
            &no_echo(),
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds");

        assert_eq!(picker.endpoints().end, Some(at(2030, 1, 1, 9, 0)));
    }

    #[test]
    fn date_ranges_echo_short_dates() {
        let mut settings = Settings::new(PickerKind::DateRange);
        settings.start_date = Some(DateInput::from("2030-01-05"));
        let picker = Picker::new(
            Targets::range("a", "b"),
            &settings,
            &no_echo(),
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds");

        assert_eq!(
            picker.output(Mode::Start),
            Some(OutputValue::Text("2030-01-05".to_string()))
        );
        assert_eq!(
            picker.output(Mode::End),
            Some(OutputValue::Text("2030-01-05".to_string()))
        );
    }

    #[test]
    fn oversized_interval_still_builds() {
        let mut settings = range_settings();
        settings.min_range_hours = Some(1e13);
        let picker = Picker::new(
            Targets::range("from", "to"),
            &settings,
            &no_echo(),
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds");

        assert_eq!(picker.endpoints().end, Some(at(2030, 1, 2, 0, 0)));
    }

    #[test]
    fn only_one_panel_is_open() {
        let mut picker = range_picker();

        assert!(picker.open(Mode::Start, PanelKind::Date).expect("open").is_some());
        assert!(picker.open(Mode::End, PanelKind::Time).expect("open").is_some());
        assert_eq!(picker.open_panel().map(|p| p.mode), Some(Mode::End));
        assert_eq!(picker.mode(), Mode::End);

        assert!(picker.open(Mode::End, PanelKind::Time).expect("toggle").is_none());
        assert_eq!(picker.open_panel(), None);
    }

    #[test]
    fn panels_respect_the_kind() {
        let mut picker = Picker::new(
            Targets::single("d"),
            &Settings::new(PickerKind::Date),
            &no_echo(),
            at(2030, 1, 1, 0, 0),
        )
        .expect("picker builds");

        assert_eq!(
            picker.open(Mode::End, PanelKind::Date),
            Err(PickerError::NoEndEndpoint("date"))
        );
        assert_eq!(
            picker.open(Mode::Start, PanelKind::Time),
            Err(PickerError::NoTimePanel("date"))
        );
        assert!(picker.display(Mode::End).is_err());
    }

    #[test]
    fn start_time_selection_drags_the_end() {
        let mut picker = range_picker();
        picker.open(Mode::Start, PanelKind::Time).expect("open");

        let selection = picker
            .select(Cell::Time(slot(23, 0)))
            .expect("23:00 is enabled");

        assert_eq!(picker.endpoints().start, at(2030, 1, 1, 21, 0));
        assert_eq!(picker.endpoints().end, Some(at(2030, 1, 2, 0, 0)));
        assert_eq!(selection.refresh, Some(Mode::End));
        assert_eq!(selection.close_after, CLOSE_DELAY);
        assert_eq!(selection.outputs.len(), 2);
        assert_eq!(selection.outputs[0].field, "from_value");
        assert_eq!(
            selection.outputs[1].value,
            OutputValue::Text("2030-01-02T00:00:00".to_string())
        );
        assert!(matches!(selection.view, PanelView::Grid(_)));
    }

    #[test]
    fn disabled_cells_are_ignored() {
        let mut picker = range_picker();
        picker.open(Mode::Start, PanelKind::Date).expect("open");
        let before = *picker.endpoints();

        assert!(picker.select(Cell::Day(day(2030, 1, 3))).is_none());
        assert!(picker.select(Cell::Time(slot(10, 0))).is_none());
        assert_eq!(*picker.endpoints(), before);
    }

    #[test]
    fn day_selection_keeps_the_time() {
        let mut settings = Settings::new(PickerKind::DateTime);
        settings.start_date = Some(DateInput::from("2030-03-10T14:30:00"));
        let mut picker = Picker::new(Targets::single("when"), &settings, &no_echo(), at(2030, 3, 1, 0, 0))
            .expect("picker builds");
        picker.open(Mode::Start, PanelKind::Date).expect("open");

        let selection = picker
            .select(Cell::Day(day(2030, 3, 21)))
            .expect("day is enabled");

        assert_eq!(picker.endpoints().start, at(2030, 3, 21, 14, 30));
        assert_eq!(selection.refresh, None);
        assert_eq!(
            picker.output(Mode::Start),
            Some(OutputValue::Text("2030-03-21T14:30:00".to_string()))
        );
    }

    #[test]
    fn month_navigation_stops_at_the_bounds() {
        let mut settings = Settings::new(PickerKind::Date);
        settings.first_date = Some(DateInput::from("2030-01-15"));
        settings.start_date = Some(DateInput::from("2030-01-20"));
        settings.last_date = Some(DateInput::from("2030-02-10"));
        let mut picker = Picker::new(Targets::single("d"), &settings, &no_echo(), at(2030, 1, 1, 0, 0))
            .expect("picker builds");
        picker.open(Mode::Start, PanelKind::Date).expect("open");

        assert!(picker.previous_month().is_none());
        let next = picker.next_month().expect("february is reachable");
        assert_eq!(next.current_anchor, day(2030, 2, 1));
        assert!(picker.next_month().is_none());
        assert!(picker.show_month(day(2030, 5, 1)).is_none());
        assert!(picker.show_month(day(2030, 1, 31)).is_some());
        assert_eq!(picker.displayed_month(), day(2030, 1, 1));
    }

    #[test]
    fn list_variant_uses_round_to() {
        let mut settings = range_settings();
        settings.round_to = Some(15);
        let mut picker = Picker::new(
            Targets::range("from", "to"),
            &settings,
            &no_echo(),
            at(2029, 12, 1, 8, 0),
        )
        .expect("picker builds");
        assert_eq!(picker.time_style(), TimeStyle::Lists);

        picker.open(Mode::End, PanelKind::Time).expect("open");
        let lists = picker.choose_hour(16).expect("16h is enabled");
        assert_eq!(lists.minutes.len(), 4);
        assert!(picker.select(Cell::Time(slot(16, 10))).is_none());

        let selection = picker
            .select(Cell::Time(slot(16, 45)))
            .expect("16:45 is on offer");
        assert_eq!(picker.endpoints().end, Some(at(2030, 1, 1, 16, 45)));
        assert_eq!(selection.refresh, None);
    }

    #[test]
    fn button_projection() {
        let picker = range_picker();
        let start = picker.display(Mode::Start).expect("start display");

        assert_eq!(start.weekday, "Tue");
        assert_eq!(start.day, "01");
        assert_eq!(start.month, "Jan");
        assert_eq!(start.year, 2030);
        assert_eq!(start.hour.as_deref(), Some("06"));
        assert_eq!(start.minute.as_deref(), Some(":00"));
    }

    #[test]
    fn instances_are_independent() {
        let mut a = range_picker();
        let b = range_picker();
        a.open(Mode::Start, PanelKind::Time).expect("open");
        a.select(Cell::Time(slot(20, 0))).expect("enabled");

        assert_ne!(a.endpoints(), b.endpoints());
        assert_eq!(b.open_panel(), None);
        assert_eq!(b.endpoints().start, at(2030, 1, 1, 6, 0));
    }
}
