use std::io::{self, Write};

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::echo::EchoStore;
use crate::enforce::Mode;
use crate::hours::TimeSlot;
use crate::picker::{Cell, PanelKind, Picker};
use crate::render::Renderer;
use crate::settings::{Settings, Targets};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show", "calendar", "hours", "pick", "export", "reset", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Everything a command needs besides its arguments.
pub struct Session<'a> {
    pub store: &'a mut EchoStore,
    pub settings: &'a Settings,
    pub targets: Targets,
    pub renderer: &'a Renderer,
}

#[instrument(skip(session, inv))]
pub fn dispatch(session: Session<'_>, inv: Invocation) -> anyhow::Result<()> {
    let now = Local::now().naive_local();
    let mut out = io::stdout().lock();
    run_command(session, &inv, now, &mut out)
}

/// Runs one command against a fresh picker built at `now`.
#[instrument(skip(session, inv, out))]
pub fn run_command<W: Write>(
    session: Session<'_>,
    inv: &Invocation,
    now: NaiveDateTime,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();
    debug!(command, ?args, "dispatching command");

    match command {
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        "reset" => cmd_reset(session.store, out),
        "show" | "calendar" | "hours" | "pick" | "export" => {
            let mut picker = Picker::new(
                session.targets.clone(),
                session.settings,
                &*session.store,
                now,
            )
            .context("failed to construct picker")?;

            match command {
                "show" => session.renderer.print_endpoints(out, &picker),
                "calendar" => cmd_calendar(&mut picker, session.renderer, args, out),
                "hours" => cmd_hours(&mut picker, session.renderer, args, out),
                "pick" => cmd_pick(&mut picker, session.store, session.renderer, args, out),
                _ => cmd_export(&picker, out),
            }
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(picker, renderer, args, out))]
fn cmd_calendar<W: Write>(
    picker: &mut Picker,
    renderer: &Renderer,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command calendar");

    let mut mode = Mode::Start;
    let mut month = None;
    let mut steps = Vec::new();
    for arg in args {
        match arg.as_str() {
            "prev" | "next" => steps.push(arg.as_str()),
            _ => {
                if let Ok(parsed) = arg.parse::<Mode>() {
                    mode = parsed;
                } else {
                    month = Some(parse_month(arg)?);
                }
            }
        }
    }

    picker.open(mode, PanelKind::Date)?;
    if let Some(month) = month
        && picker.show_month(month).is_none()
    {
        warn!(%month, "month outside the selectable range");
        writeln!(
            out,
            "{} is outside the selectable range",
            month.format("%Y-%m")
        )?;
    }
    for step in steps {
        let moved = if step == "prev" {
            picker.previous_month()
        } else {
            picker.next_month()
        };
        if moved.is_none() {
            writeln!(out, "no selectable days {step} of this month")?;
        }
    }

    let grid = picker.calendar();
    renderer.print_calendar(out, picker, &grid)
}

#[instrument(skip(picker, renderer, args, out))]
fn cmd_hours<W: Write>(
    picker: &mut Picker,
    renderer: &Renderer,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command hours");

    let mut mode = Mode::Start;
    let mut hour = None;
    for arg in args {
        if let Ok(parsed) = arg.parse::<Mode>() {
            mode = parsed;
        } else {
            hour = Some(
                arg.parse::<u32>()
                    .with_context(|| format!("expected start, end or an hour, got: {arg}"))?,
            );
        }
    }

    let view = picker
        .open(mode, PanelKind::Time)?
        .ok_or_else(|| anyhow!("time panel did not open"))?;

    match hour {
        Some(hour) => match picker.choose_hour(hour) {
            Some(lists) => renderer.print_time_lists(out, &lists),
            None => Err(anyhow!("hour {hour} cannot be chosen")),
        },
        None => renderer.print_view(out, picker, &view),
    }
}

#[instrument(skip(picker, store, renderer, args, out))]
fn cmd_pick<W: Write>(
    picker: &mut Picker,
    store: &mut EchoStore,
    renderer: &Renderer,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command pick");

    let [mode, value] = args else {
        return Err(anyhow!("pick requires <start|end> <YYYY-MM-DD|HH:MM>"));
    };
    let mode: Mode = mode.parse()?;

    let cell = if value.contains(':') {
        Cell::Time(value.parse::<TimeSlot>()?)
    } else {
        Cell::Day(
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .with_context(|| format!("invalid date: {value}"))?,
        )
    };
    let kind = match cell {
        Cell::Day(_) => PanelKind::Date,
        Cell::Time(_) => PanelKind::Time,
    };

    picker.open(mode, kind)?;
    let Some(selection) = picker.select(cell) else {
        writeln!(out, "{value} is not selectable; nothing changed")?;
        return Ok(());
    };

    renderer.print_selection(out, picker, &selection)?;
    store.record(&selection.outputs)?;
    picker.close();
    Ok(())
}

fn cmd_export<W: Write>(picker: &Picker, out: &mut W) -> anyhow::Result<()> {
    info!("command export");
    let json = serde_json::to_string_pretty(&picker.snapshot())?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn cmd_reset<W: Write>(store: &mut EchoStore, out: &mut W) -> anyhow::Result<()> {
    info!("command reset");
    let removed = store.clear()?;
    writeln!(out, "Cleared {removed} echo field(s).")?;
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: show, calendar [start|end] [YYYY-MM] [prev|next]..., hours [start|end] [HH], \
         pick <start|end> <YYYY-MM-DD|HH:MM>, export, reset, help, version"
    )?;
    Ok(())
}

fn parse_month(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .with_context(|| format!("expected start, end or YYYY-MM, got: {raw}"))
}
