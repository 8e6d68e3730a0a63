use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::EntityId;
use crate::error::TimelineError;
use crate::record::NormalizedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// External storage, idempotent on `record.id`. Records are handed over by value.
pub trait RecordSink {
    fn upsert(&self, record: NormalizedRecord) -> Result<UpsertOutcome, TimelineError>;
}

impl<T: RecordSink + ?Sized> RecordSink for &T {
    fn upsert(&self, record: NormalizedRecord) -> Result<UpsertOutcome, TimelineError> {
        (**self).upsert(record)
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<HashMap<EntityId, NormalizedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EntityId) -> Option<NormalizedRecord> {
        self.records.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn upsert(&self, record: NormalizedRecord) -> Result<UpsertOutcome, TimelineError> {
        let mut map = self
            .records
            .lock()
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        match map.insert(record.id.clone(), record) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }
}

/// One pretty-printed JSON file per record, `<root>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    root: Utf8PathBuf,
}

impl JsonDirSink {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn record_path(&self, id: &EntityId) -> Utf8PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl RecordSink for JsonDirSink {
    fn upsert(&self, record: NormalizedRecord) -> Result<UpsertOutcome, TimelineError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        let path = self.record_path(&record.id);
        let outcome = if path.as_std_path().exists() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        let content = serde_json::to_vec_pretty(&record)
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".record")
            .suffix(".tmp")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| TimelineError::Sink(err.to_string()))?;
        Ok(outcome)
    }
}
