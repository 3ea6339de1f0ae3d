use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::picker::{EchoSource, EchoedValue};

const FIELDS_FILE: &str = "fields.json";

/// Persisted echo fields, the values a host form would read back.
#[derive(Debug)]
pub struct EchoStore {
    pub data_dir: PathBuf,
    pub fields_path: PathBuf,
    fields: BTreeMap<String, String>,
}

impl EchoStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let fields_path = data_dir.join(FIELDS_FILE);
        let fields = load_fields(&fields_path)
            .with_context(|| format!("failed to load {}", fields_path.display()))?;

        info!(
            data_dir = %data_dir.display(),
            fields = fields.len(),
            "opened echo store"
        );

        Ok(Self {
            data_dir,
            fields_path,
            fields,
        })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Stores the given values and writes the file.
    #[tracing::instrument(skip(self, values))]
    pub fn record(&mut self, values: &[EchoedValue]) -> anyhow::Result<()> {
        for echoed in values {
            debug!(field = %echoed.field, value = %echoed.value, "echoing value");
            self.fields
                .insert(echoed.field.clone(), echoed.value.to_string());
        }
        save_fields_atomic(&self.fields_path, &self.fields)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&mut self) -> anyhow::Result<usize> {
        let removed = self.fields.len();
        self.fields.clear();
        save_fields_atomic(&self.fields_path, &self.fields)?;
        info!(removed, "cleared echo fields");
        Ok(removed)
    }
}

impl EchoSource for EchoStore {
    fn echoed(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }
}

fn load_fields(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    if !path.exists() {
        debug!(file = %path.display(), "no echo fields yet");
        return Ok(BTreeMap::new());
    }

    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let fields: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    debug!(count = fields.len(), "loaded echo fields");
    Ok(fields)
}

#[tracing::instrument(skip(path, fields))]
fn save_fields_atomic(path: &Path, fields: &BTreeMap<String, String>) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = fields.len(), "saving echo fields atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, fields)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::EchoStore;
    use crate::output::OutputValue;
    use crate::picker::{EchoSource, EchoedValue};

    #[test]
    fn records_survive_reopening() {
        let dir = tempdir().expect("tempdir");
        let mut store = EchoStore::open(dir.path()).expect("open store");
        store
            .record(&[
                EchoedValue {
                    field: "from_value".to_string(),
                    value: OutputValue::Text("2030-01-01T10:00:00".to_string()),
                },
                EchoedValue {
                    field: "to_value".to_string(),
                    value: OutputValue::Seconds(1_893_456_000),
                },
            ])
            .expect("record");

        let reopened = EchoStore::open(dir.path()).expect("reopen store");
        assert_eq!(
            reopened.echoed("from_value").as_deref(),
            Some("2030-01-01T10:00:00")
        );
        assert_eq!(reopened.get("to_value"), Some("1893456000"));
        assert_eq!(reopened.echoed("other_value"), None);
    }

    #[test]
    fn clear_empties_the_file() {
        let dir = tempdir().expect("tempdir");
        let mut store = EchoStore::open(dir.path()).expect("open store");
        store
            .record(&[EchoedValue {
                field: "d_value".to_string(),
                value: OutputValue::Text("2030-01-01".to_string()),
            }])
            .expect("record");

        assert_eq!(store.clear().expect("clear"), 1);
        let reopened = EchoStore::open(dir.path()).expect("reopen store");
        assert!(reopened.fields().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("fields.json"), "[1, 2").expect("write");
        assert!(EchoStore::open(dir.path()).is_err());
    }
}
