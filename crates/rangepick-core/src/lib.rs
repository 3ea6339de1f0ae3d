pub mod bounds;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod echo;
pub mod enforce;
pub mod error;
pub mod hours;
pub mod i18n;
pub mod output;
pub mod picker;
pub mod render;
pub mod settings;
pub mod zone;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::PickerError;
pub use picker::{
  Cell,
  PanelKind,
  Picker
};
pub use settings::{
  PickerKind,
  Settings,
  Targets
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting rangepick CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.pickerrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut store =
    echo::EchoStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open echo store \
           at {}",
          data_dir.display()
        )
      })?;

  let settings =
    settings::Settings::from_config(
      &cfg
    )?;
  let targets =
    settings::Targets::from_sources(
      &cfg,
      &cli.targets
    );
  let renderer = render::Renderer::new(
    &cfg,
    &settings.styles
  )?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    commands::Session {
      store: &mut store,
      settings: &settings,
      targets,
      renderer: &renderer
    },
    inv
  )?;

  info!("done");
  Ok(())
}
