use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "RANGEPICKRC";
const RC_FILE_NAME: &str = ".rangepickrc";
const DATA_DIR_NAME: &str = ".rangepick";

#[derive(Debug, Clone)]
pub struct Config {
  map: BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    map.insert(
      "data.location".to_string(),
      format!("~/{DATA_DIR_NAME}")
    );
    map.insert(
      "kind".to_string(),
      "datetime".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading pickerrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no pickerrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self
      .map
      .get(key)
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
  }

  /// Non empty entries under `prefix.`,
  /// with the prefix removed.
  pub fn section(
    &self,
    prefix: &str
  ) -> Vec<(String, String)> {
    let dotted = format!("{prefix}.");
    self
      .map
      .iter()
      .filter_map(|(k, v)| {
        let rest =
          k.strip_prefix(&dotted)?;
        let value = v.trim();
        (!value.is_empty()).then(|| {
          (
            rest.to_string(),
            value.to_string()
          )
        })
      })
      .collect()
  }

  /// Loads `path` and every file it
  /// includes. Later keys win.
  pub fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    self.load_chain(path, &mut Vec::new())
  }

  /// `chain` holds the canonical paths of
  /// the files currently being read, so an
  /// include back into one of them is a
  /// cycle.
  #[tracing::instrument(skip(
    self, chain
  ))]
  fn load_chain(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone());
    if chain.contains(&canonical) {
      return Err(anyhow!(
        "include cycle: {} is already \
         being loaded",
        path.display()
      ));
    }

    self
      .loaded_files
      .push(path.clone());
    chain.push(canonical);

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line_no = idx + 1;
      match parse_rc_line(raw_line) {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          let target =
            resolve_include_path(
              &base_dir, target
            )?;
          debug!(
            file = %path.display(),
            include = %target.display(),
            line = line_no,
            "processing include"
          );
          if target.exists() {
            self.load_chain(
              &target, chain
            )?;
          } else {
            warn!(include = %target.display(), "include file does not exist; skipping");
          }
        }
        | RcLine::Setting(key, value) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | RcLine::Invalid => {
          return Err(anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_no,
            raw_line
          ));
        }
      }
    }

    chain.pop();
    Ok(())
  }
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str),
  Invalid
}

fn parse_rc_line(
  raw: &str
) -> RcLine<'_> {
  let line =
    strip_comment(raw.trim());
  if line.is_empty() {
    return RcLine::Blank;
  }
  if let Some(rest) =
    line.strip_prefix("include ")
  {
    return RcLine::Include(rest.trim());
  }
  match line.split_once('=') {
    | Some((k, v))
      if !k.trim().is_empty() =>
    {
      RcLine::Setting(k.trim(), v.trim())
    }
    | _ => RcLine::Invalid
  }
}

/// Cuts a trailing `#` comment. A `#` only
/// opens a comment at the start of the line
/// or after whitespace, and never as the
/// first character of a value, so hex
/// colours such as `#e34c26` survive.
fn strip_comment(line: &str) -> &str {
  if line.starts_with('#') {
    return "";
  }
  let value_start = line
    .find('=')
    .map(|eq| {
      let rest = &line[eq + 1..];
      eq + 1 + (rest.len()
        - rest.trim_start().len())
    })
    .unwrap_or(0);

  let bytes = line.as_bytes();
  for (idx, ch) in line.char_indices() {
    if ch == '#'
      && idx > value_start
      && bytes[idx - 1]
        .is_ascii_whitespace()
    {
      return line[..idx].trim_end();
    }
  }
  line
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping pickerrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(DATA_DIR_NAME))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
