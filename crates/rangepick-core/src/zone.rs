use chrono_tz::Tz;
use tracing::{debug, warn};

const TIMEZONE_ENV_VAR: &str = "RANGEPICK_TIMEZONE";

/// Zone for `timestamp.encoding = zone`: the configured `timezone` key,
/// then `RANGEPICK_TIMEZONE`, then UTC. Unknown zone ids are skipped with
/// a warning.
pub fn resolve_timezone(configured: Option<&str>) -> Tz {
    let from_env = std::env::var(TIMEZONE_ENV_VAR).ok();
    let candidates = [
        ("config", configured),
        (TIMEZONE_ENV_VAR, from_env.as_deref()),
    ];

    candidates
        .into_iter()
        .find_map(|(source, raw)| parse_timezone(raw?, source))
        .unwrap_or_else(|| {
            debug!("no timestamp timezone configured; using UTC");
            chrono_tz::UTC
        })
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let id = raw.trim();
    if id.is_empty() {
        return None;
    }
    match id.parse::<Tz>() {
        Ok(tz) => {
            debug!(source, timezone = id, "resolved timestamp timezone");
            Some(tz)
        }
        Err(err) => {
            warn!(source, timezone = id, error = %err, "unknown timezone id; skipping");
            None
        }
    }
}
