use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::EntityId;
use crate::entity::EntityDocument;
use crate::error::TimelineError;

/// Keyed store of fetched entity documents, consulted before any network fetch.
pub trait EntityCache: Send + Sync {
    fn get(&self, id: &EntityId) -> Option<EntityDocument>;
    fn put(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError>;
}

impl<T: EntityCache + ?Sized> EntityCache for &T {
    fn get(&self, id: &EntityId) -> Option<EntityDocument> {
        (**self).get(id)
    }

    fn put(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError> {
        (**self).put(id, doc)
    }
}

impl<T: EntityCache + ?Sized> EntityCache for Arc<T> {
    fn get(&self, id: &EntityId) -> Option<EntityDocument> {
        (**self).get(id)
    }

    fn put(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError> {
        (**self).put(id, doc)
    }
}

pub fn default_cache_root() -> Result<Utf8PathBuf, TimelineError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("world-history-timeline"))
                .ok()
        })
        .ok_or_else(|| TimelineError::Filesystem("unable to resolve cache directory".to_string()))
}

/// Cross-run cache: one JSON file per entity under `<root>/entities/`, fronted
/// by an in-memory map for the lifetime of the process.
///
/// Files are written to a temporary sibling and renamed into place, so a
/// concurrent reader sees either the old entry, the new one, or none.
#[derive(Debug)]
pub struct FsEntityCache {
    root: Utf8PathBuf,
    memory: Mutex<HashMap<EntityId, EntityDocument>>,
}

impl FsEntityCache {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn entity_dir(&self) -> Utf8PathBuf {
        self.root.join("entities")
    }

    pub fn entity_path(&self, id: &EntityId) -> Utf8PathBuf {
        self.entity_dir().join(format!("{id}.json"))
    }

    pub fn ensure_root(&self) -> Result<(), TimelineError> {
        fs::create_dir_all(self.entity_dir().as_std_path())
            .map_err(|err| TimelineError::Filesystem(err.to_string()))
    }

    /// Number of documents held in memory for this process.
    pub fn len(&self) -> usize {
        self.memory.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<(), TimelineError> {
        if let Ok(mut map) = self.memory.lock() {
            map.clear();
        }
        let dir = self.entity_dir();
        if dir.as_std_path().exists() {
            fs::remove_dir_all(dir.as_std_path())
                .map_err(|err| TimelineError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    fn read_entry(&self, id: &EntityId) -> Option<EntityDocument> {
        let path = self.entity_path(id);
        let content = fs::read(path.as_std_path()).ok()?;
        let parsed = serde_json::from_slice::<serde_json::Value>(&content)
            .map_err(|err| TimelineError::Filesystem(err.to_string()))
            .and_then(|raw| EntityDocument::from_value(raw, Some(id)));
        match parsed {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::warn!(%id, %path, %err, "discarding unreadable cache entry");
                None
            }
        }
    }

    fn write_entry(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError> {
        let dir = self.entity_dir();
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        let content = serde_json::to_vec(doc.raw())
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".entity")
            .suffix(".tmp")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        temp.persist(self.entity_path(id).as_std_path())
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        Ok(())
    }
}

impl EntityCache for FsEntityCache {
    fn get(&self, id: &EntityId) -> Option<EntityDocument> {
        if let Some(doc) = self.memory.lock().ok()?.get(id) {
            return Some(doc.clone());
        }
        let doc = self.read_entry(id)?;
        if let Ok(mut map) = self.memory.lock() {
            map.insert(id.clone(), doc.clone());
        }
        Some(doc)
    }

    fn put(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError> {
        self.write_entry(id, doc)?;
        let mut map = self
            .memory
            .lock()
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        map.insert(id.clone(), doc.clone());
        Ok(())
    }
}

/// Process-local cache with no persistence.
#[derive(Debug, Default)]
pub struct MemoryEntityCache {
    entries: Mutex<HashMap<EntityId, EntityDocument>>,
}

impl MemoryEntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityCache for MemoryEntityCache {
    fn get(&self, id: &EntityId) -> Option<EntityDocument> {
        self.entries.lock().ok()?.get(id).cloned()
    }

    fn put(&self, id: &EntityId, doc: &EntityDocument) -> Result<(), TimelineError> {
        let mut map = self
            .entries
            .lock()
            .map_err(|err| TimelineError::CacheWrite(err.to_string()))?;
        map.insert(id.clone(), doc.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let cache = FsEntityCache::new(Utf8PathBuf::from("/tmp/wht-cache"));
        let id: EntityId = "Q48314".parse().unwrap();
        assert!(cache.entity_path(&id).ends_with("entities/Q48314.json"));
    }
}
