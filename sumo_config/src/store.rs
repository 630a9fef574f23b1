//! Key-value persistence for calibration values.
//!
//! The CSV store keeps one `key,value` row per entry and atomically rewrites
//! the whole file on every `put`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sumo_traits::SettingsStore;

use crate::atomic::write_atomic;

#[derive(Debug, serde::Deserialize)]
struct Row {
    key: String,
    value: i32,
}

/// CSV-backed settings file with headers `key,value`.
#[derive(Debug)]
pub struct CsvSettingsStore {
    path: PathBuf,
    values: BTreeMap<String, i32>,
}

impl CsvSettingsStore {
    /// Open `path`, creating an empty store when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            read_rows(&path)?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), entries = values.len(), "settings store opened");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn flush(&self) -> eyre::Result<()> {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.write_record(["key", "value"])?;
        for (k, v) in &self.values {
            let v = v.to_string();
            w.write_record([k.as_str(), v.as_str()])?;
        }
        let bytes = w
            .into_inner()
            .map_err(|e| eyre::eyre!("serialize settings: {}", e))?;
        write_atomic(&self.path, &bytes)
            .map_err(|e| eyre::eyre!("write settings {:?}: {}", self.path, e))
    }
}

fn read_rows(path: &Path) -> eyre::Result<BTreeMap<String, i32>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open settings CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["key", "value"] {
        eyre::bail!(
            "settings CSV must have headers 'key,value', got: {}",
            actual.join(",")
        );
    }

    let mut out = BTreeMap::new();
    for (idx, rec) in rdr.deserialize::<Row>().enumerate() {
        match rec {
            Ok(row) => {
                out.insert(row.key.trim().to_string(), row.value);
            }
            Err(e) => eyre::bail!("invalid settings row {}: {}", idx + 2, e),
        }
    }
    Ok(out)
}

impl SettingsStore for CsvSettingsStore {
    fn get(&self, key: &str) -> Option<i32> {
        self.values.get(key.trim()).copied()
    }

    fn put(
        &mut self,
        key: &str,
        value: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.values.insert(key.trim().to_string(), value);
        self.flush().map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            e.to_string().into()
        })
    }
}

/// Volatile store for simulation and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, i32>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    fn put(
        &mut self,
        key: &str,
        value: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.csv");
        {
            let mut s = CsvSettingsStore::open(&path).unwrap();
            assert!(s.is_empty());
            s.put("0000 NO_LINE", 1384).unwrap();
            s.put("1111 OUTSIDE", 4096).unwrap();
        }
        let s = CsvSettingsStore::open(&path).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("0000 NO_LINE"), Some(1384));
        assert_eq!(s.get("1111 OUTSIDE"), Some(4096));
        assert_eq!(s.get("0101 _RIGHT_"), None);
    }

    #[test]
    fn rejects_wrong_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "label,adc\nfoo,1\n").unwrap();
        let err = CsvSettingsStore::open(&path).unwrap_err();
        assert!(format!("{err}").contains("headers 'key,value'"));
    }
}
