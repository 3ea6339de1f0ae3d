use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::bounds::{Bounds, MinInterval};
use crate::datetime::with_time_of;

/// Which endpoint user selections currently mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Start,
    End,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Start => "start",
            Mode::End => "end",
        }
    }

    pub fn peer(self) -> Mode {
        match self {
            Mode::Start => Mode::End,
            Mode::End => Mode::Start,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Mode::Start),
            "end" => Ok(Mode::End),
            other => Err(anyhow!("expected `start` or `end`, got: {other}")),
        }
    }
}

/// The user's current selection. `end` is present only in range mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl Endpoints {
    pub fn get(&self, mode: Mode) -> Option<NaiveDateTime> {
        match mode {
            Mode::Start => Some(self.start),
            Mode::End => self.end,
        }
    }

    /// Setting the end of a single-date selection is ignored.
    pub fn set(&mut self, mode: Mode, value: NaiveDateTime) {
        match mode {
            Mode::Start => self.start = value,
            Mode::End => {
                if let Some(end) = self.end.as_mut() {
                    *end = value;
                }
            }
        }
    }
}

/// Repairs the endpoints after an edit made in `mode`.
///
/// The start endpoint only has its clock time forced to a bound when it
/// touches one, so the calendar day the user picked survives. In range mode
/// the edited endpoint drags its peer along to keep `min_interval` between
/// them, pinning against the hard bound first. Returns the peer whose value
/// changed and must be redisplayed.
#[instrument(skip(endpoints, bounds, min_interval))]
pub fn enforce(
    mode: Mode,
    endpoints: &mut Endpoints,
    bounds: &Bounds,
    min_interval: MinInterval,
) -> Option<Mode> {
    let before = *endpoints;
    let gap = min_interval.duration();
    let mut start = endpoints.start;

    if start <= bounds.first {
        start = with_time_of(start, bounds.first);
    }
    if start >= bounds.last {
        start = with_time_of(start, bounds.last);
    }

    let Some(mut end) = endpoints.end else {
        endpoints.start = start;
        return None;
    };

    match mode {
        Mode::Start => {
            if start + gap >= end {
                if start + gap >= bounds.last {
                    start = bounds.last - gap;
                }
                end = start + gap;
            }
        }
        Mode::End => {
            if end >= bounds.last {
                end = with_time_of(end, bounds.last);
            }
            if end - gap <= start {
                if end - gap <= bounds.first {
                    end = bounds.first + gap;
                }
                start = end - gap;
            }
        }
    }

    endpoints.start = start;
    endpoints.end = Some(end);

    if *endpoints != before {
        debug!(?before, after = ?endpoints, "repaired endpoints");
    }

    let peer = mode.peer();
    (endpoints.get(peer) != before.get(peer)).then_some(peer)
}
