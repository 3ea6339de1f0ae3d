use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayCell, Emphasis, MonthGrid, MonthPart};
use crate::config::Config;
use crate::enforce::Mode;
use crate::hours::{HourGrid, ListOption, TimeLists};
use crate::picker::{EndpointDisplay, PanelView, Picker, Selection};
use crate::settings::Styles;

const DIM: &str = "2";
const BOLD: &str = "1";
const RANGE: &str = "36";
const DEFAULT_ACTIVE: &str = "7";
const DEFAULT_INACTIVE: &str = "4";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    active: String,
    inactive: String,
}

impl Renderer {
    pub fn new(cfg: &Config, styles: &Styles) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self::with_color(
            color && io::stdout().is_terminal(),
            styles,
        ))
    }

    pub fn with_color(color: bool, styles: &Styles) -> Self {
        Self {
            color,
            active: emphasis_code(
                styles.active_color.as_deref(),
                styles.active_background.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_ACTIVE.to_string()),
            inactive: emphasis_code(
                styles.inactive_color.as_deref(),
                styles.inactive_background.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_INACTIVE.to_string()),
        }
    }

    /// Endpoint buttons and their echoed values.
    #[tracing::instrument(skip(self, out, picker))]
    pub fn print_endpoints<W: Write>(&self, out: &mut W, picker: &Picker) -> anyhow::Result<()> {
        let headers = vec![
            "Endpoint".to_string(),
            "Field".to_string(),
            "Button".to_string(),
            "Value".to_string(),
        ];

        let mut modes = vec![Mode::Start];
        if picker.kind().is_range() {
            modes.push(Mode::End);
        }

        let mut rows = Vec::with_capacity(modes.len());
        for (mode, echoed) in modes.into_iter().zip(picker.outputs()) {
            let display = picker.display(mode)?;
            let mut button = button_text(&display);
            if mode == picker.mode() {
                button = self.paint(&button, &self.active);
            }
            rows.push(vec![
                mode.to_string(),
                echoed.field,
                button,
                echoed.value.to_string(),
            ]);
        }

        write_table(&mut *out, &headers, rows)?;
        Ok(())
    }

    pub fn print_view<W: Write>(
        &self,
        out: &mut W,
        picker: &Picker,
        view: &PanelView,
    ) -> anyhow::Result<()> {
        match view {
            PanelView::Calendar(grid) => self.print_calendar(out, picker, grid),
            PanelView::Grid(grid) => self.print_hour_grid(out, grid),
            PanelView::Lists(lists) => self.print_time_lists(out, lists),
        }
    }

    #[tracing::instrument(skip(self, out, picker, grid))]
    pub fn print_calendar<W: Write>(
        &self,
        out: &mut W,
        picker: &Picker,
        grid: &MonthGrid,
    ) -> anyhow::Result<()> {
        let locale = picker.locale();
        let anchor = grid.current_anchor;
        let previous = if grid.can_go_previous { "<" } else { " " };
        let next = if grid.can_go_next { ">" } else { " " };
        writeln!(
            out,
            "{previous} {} {} {next}",
            locale.month_full(anchor.month()),
            anchor.year()
        )?;

        let headers: Vec<String> = picker
            .day_order()
            .days()
            .iter()
            .map(|day| locale.weekday_short(*day).to_string())
            .collect();

        let rows: Vec<Vec<String>> = grid
            .weeks()
            .map(|week| week.iter().map(|cell| self.day_cell(cell)).collect())
            .collect();

        write_table(&mut *out, &headers, rows)?;
        Ok(())
    }

    fn day_cell(&self, cell: &DayCell) -> String {
        let text = format!("{:>2}", cell.day());
        let classes = &cell.classes;

        let emphasis = match (classes.start, classes.end) {
            (Some(Emphasis::Active), _) | (_, Some(Emphasis::Active)) => Some(Emphasis::Active),
            (Some(Emphasis::Inactive), _) | (_, Some(Emphasis::Inactive)) => {
                Some(Emphasis::Inactive)
            }
            (None, None) => None,
        };

        let text = match emphasis {
            Some(Emphasis::Active) => self.paint(&text, &self.active),
            Some(Emphasis::Inactive) => self.paint(&text, &self.inactive),
            None if classes.disabled || cell.part != MonthPart::Current => self.paint(&text, DIM),
            None if classes.in_range => self.paint(&text, RANGE),
            None => text,
        };

        if classes.today {
            format!("{}*", self.paint(&text, BOLD))
        } else {
            text
        }
    }

    #[tracing::instrument(skip(self, out, grid))]
    pub fn print_hour_grid<W: Write>(&self, out: &mut W, grid: &HourGrid) -> anyhow::Result<()> {
        writeln!(out, "{}", grid.day.format("%Y-%m-%d"))?;

        let rows: Vec<Vec<String>> = grid
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let label = cell.slot.label();
                        if cell.disabled {
                            self.paint(&label, DIM)
                        } else if cell.selected {
                            self.paint(&label, &self.active)
                        } else {
                            label
                        }
                    })
                    .collect()
            })
            .collect();

        write_table(&mut *out, &[], rows)?;
        Ok(())
    }

    pub fn print_time_lists<W: Write>(&self, out: &mut W, lists: &TimeLists) -> anyhow::Result<()> {
        writeln!(out, "{}", lists.day.format("%Y-%m-%d"))?;
        writeln!(out, "hours   {}", self.options(&lists.hours))?;
        writeln!(out, "minutes {}", self.options(&lists.minutes))?;
        Ok(())
    }

    fn options(&self, options: &[ListOption]) -> String {
        options
            .iter()
            .map(|option| {
                let text = format!("{:02}", option.value);
                if option.selected {
                    self.paint(&format!("[{text}]"), &self.active)
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[tracing::instrument(skip(self, out, picker, selection))]
    pub fn print_selection<W: Write>(
        &self,
        out: &mut W,
        picker: &Picker,
        selection: &Selection,
    ) -> anyhow::Result<()> {
        self.print_view(out, picker, &selection.view)?;
        writeln!(out)?;
        if let Some(peer) = selection.refresh {
            writeln!(out, "{peer} adjusted to keep the range valid")?;
        }
        self.print_endpoints(out, picker)?;
        writeln!(
            out,
            "panel closes in {}ms",
            selection.close_after.as_millis()
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Button text: weekday, day, month and year, then the clock parts for
/// time kinds.
pub fn button_text(display: &EndpointDisplay) -> String {
    let mut text = format!(
        "{} {} {} {}",
        display.weekday, display.day, display.month, display.year
    );
    if let (Some(hour), Some(minute)) = (&display.hour, &display.minute) {
        text.push(' ');
        text.push_str(hour);
        text.push_str(minute);
    }
    text
}

fn emphasis_code(color: Option<&str>, background: Option<&str>) -> Option<String> {
    let codes: Vec<String> = [
        color.and_then(|raw| color_code(raw, false)),
        background.and_then(|raw| color_code(raw, true)),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!codes.is_empty()).then(|| codes.join(";"))
}

/// ANSI SGR parameters for a CSS style colour: one of the eight basic
/// names, `#rgb` or `#rrggbb`.
fn color_code(raw: &str, background: bool) -> Option<String> {
    let raw = raw.trim().to_ascii_lowercase();
    let base = if background { 40 } else { 30 };
    let named = [
        "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
    ];
    if let Some(idx) = named.iter().position(|name| *name == raw) {
        return Some((base + idx).to_string());
    }

    let hex = raw.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let (r, g, b) = match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_string().repeat(2));
            (
                channel(&digits.next()?)?,
                channel(&digits.next()?)?,
                channel(&digits.next()?)?,
            )
        }
        6 => (
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        ),
        _ => return None,
    };
    let layer = if background { 48 } else { 38 };
    Some(format!("{layer};2;{r};{g};{b}"))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: &[String],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    if !headers.is_empty() {
        for (idx, header) in headers.iter().enumerate() {
            write!(writer, "{:width$} ", header, width = widths[idx])?;
        }
        writeln!(writer)?;

        for width in &widths {
            write!(writer, "{:-<width$} ", "", width = *width)?;
        }
        writeln!(writer)?;
    }

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
