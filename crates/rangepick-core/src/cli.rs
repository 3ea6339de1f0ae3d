use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rangepick",
    version,
    about = "Date and date range picker with bounded, consistent selections",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "pickerrc")]
    pub pickerrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Container id; give it twice for a range.
    #[arg(long = "target", action = ArgAction::Append)]
    pub targets: Vec<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let mut tokens = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string());

        let Some(token) = tokens.next() else {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "show".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        };

        let known = crate::commands::known_command_names();
        let command = crate::commands::expand_command_abbrev(&token, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {token}"))?;
        debug!(token = %token, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: tokens.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{GlobalCli, Invocation, preprocess_args};
    use crate::config::Config;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_lifted_out() {
        let pre = preprocess_args(&os(&[
            "rangepick",
            "rc.kind=daterange",
            "rc.round_to:15",
            "show",
        ]))
        .expect("preprocess");

        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.kind".to_string(), "daterange".to_string()),
                ("rc.round_to".to_string(), "15".to_string()),
            ]
        );
        assert_eq!(pre.cleaned_args, os(&["rangepick", "show"]));
    }

    #[test]
    fn global_flags_and_targets() {
        let cli = GlobalCli::parse_from(os(&[
            "rangepick",
            "-vv",
            "--target",
            "checkin",
            "--target",
            "checkout",
            "--rc",
            "first_day_no=1",
            "pick",
            "end",
            "2030-01-05",
        ]));

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.targets, vec!["checkin", "checkout"]);
        assert_eq!(cli.rc_overrides[0].key, "first_day_no");
        assert_eq!(cli.rest, os(&["pick", "end", "2030-01-05"]));
    }

    #[test]
    fn commands_expand_unique_prefixes() {
        let cfg = Config::default();
        let inv = Invocation::parse(&cfg, os(&["cal", "end", "2030-02"])).expect("parse");
        assert_eq!(inv.command, "calendar");
        assert_eq!(inv.command_args, vec!["end", "2030-02"]);

        assert!(Invocation::parse(&cfg, os(&["h"])).is_err());
        assert_eq!(
            Invocation::parse(&cfg, vec![]).expect("parse").command,
            "show"
        );
    }
}
