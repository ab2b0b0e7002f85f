use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use log::{debug, info, warn};

use crate::event::{Event, EventRequest};
use crate::merge::{assign_missing_ids, generate_event_id, merge_month_scoped};
use crate::schedule::ParsedSchedule;

// Maximum allowed size for the store file to prevent DoS attacks (10MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Event '{0}' not found")]
    NotFound(String),
    #[error("Failed to read event store {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Event store {path} is not valid event JSON: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
    #[error("Event store {path} exceeds the size limit")]
    TooLarge { path: PathBuf },
    #[error("Failed to write event store {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to lock event store: {0}")]
    Lock(io::Error),
    #[error("Invalid event: {0}")]
    Invalid(#[from] crate::event::EventError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// JSON-file event store.
///
/// Every mutation is a read-modify-write cycle under an in-process mutex and an
/// exclusive lock on `<file>.lock`; snapshots take a shared lock. New contents go to `<file>.tmp` and are
/// renamed over the store, so a failed write leaves the previous file intact.
pub struct EventStore {
    path: PathBuf,
    max_file_size: u64,
    guard: Mutex<()>,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), max_file_size: DEFAULT_MAX_FILE_SIZE, guard: Mutex::new(()) }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all events. Needs only read access to the store directory.
    pub fn load(&self) -> StoreResult<Vec<Event>> {
        self.with_lock(LockMode::Shared, || self.read_events())
    }

    /// Events in one `YYYY-MM` month, ordered by date.
    pub fn events_in_month(&self, month: &str) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> =
            self.load()?.into_iter().filter(|event| event.month_key() == month).collect();
        events.sort_by_key(|event| event.date);
        Ok(events)
    }

    /// Apply a parsed paste: replace its affected months, keep the rest.
    pub fn apply_schedule(&self, parsed: ParsedSchedule) -> StoreResult<Vec<Event>> {
        self.merge(&parsed.affected_months, parsed.events)
    }

    /// Month-scoped overwrite of `affected` with `incoming`. Returns the new store contents.
    pub fn merge(&self, affected: &BTreeSet<String>, incoming: Vec<Event>) -> StoreResult<Vec<Event>> {
        self.modify(|events| {
            let merged = merge_month_scoped(std::mem::take(events), affected, incoming);
            *events = merged;
            Ok(events.clone())
        })
    }

    /// Add one manually entered event.
    pub fn create_event(&self, request: &EventRequest) -> StoreResult<Event> {
        let mut event = request.to_event()?;
        self.modify(|events| {
            let mut taken: HashSet<String> = events.iter().filter_map(|e| e.id.clone()).collect();
            assign_missing_ids(std::slice::from_mut(&mut event), &mut taken, generate_event_id);
            events.push(event.clone());
            Ok(event)
        })
    }

    /// Replace the content of the event with `id`, keeping the id.
    pub fn update_event(&self, id: &str, request: &EventRequest) -> StoreResult<Event> {
        let mut updated = request.to_event()?;
        updated.id = Some(id.to_string());
        self.modify(|events| {
            let slot = events
                .iter_mut()
                .find(|event| event.id.as_deref() == Some(id))
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            *slot = updated.clone();
            Ok(updated)
        })
    }

    pub fn delete_event(&self, id: &str) -> StoreResult<Event> {
        self.modify(|events| {
            let pos = events
                .iter()
                .position(|event| event.id.as_deref() == Some(id))
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            Ok(events.remove(pos))
        })
    }

    /// Run `f` on the current events and persist the result if it succeeds.
    fn modify<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Vec<Event>) -> StoreResult<T>,
    {
        self.with_lock(LockMode::Exclusive, || {
            let mut events = self.read_events()?;
            let result = f(&mut events)?;
            self.write_events(&events)?;
            Ok(result)
        })
    }

    fn with_lock<T, F>(&self, mode: LockMode, f: F) -> StoreResult<T>
    where
        F: FnOnce() -> StoreResult<T>,
    {
        // A poisoned guard only means another thread panicked mid-cycle; the
        // file itself is still consistent because writes are atomic.
        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let lock_file = match mode {
            LockMode::Exclusive => {
                self.ensure_parent_dir()?;
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(self.lock_path())
                    .map_err(StoreError::Lock)?;
                FileExt::lock_exclusive(&file).map_err(StoreError::Lock)?;
                Some(file)
            }
            LockMode::Shared => match File::open(self.lock_path()) {
                Ok(file) => {
                    FileExt::lock_shared(&file).map_err(StoreError::Lock)?;
                    Some(file)
                }
                // No writer has created the lock yet, so there is nothing to wait for.
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(StoreError::Lock(e)),
            },
        };

        let result = f();
        if let Some(file) = &lock_file {
            if let Err(e) = FileExt::unlock(file) {
                warn!("Failed to release store lock: {}", e);
            }
        }
        result
    }

    fn read_events(&self) -> StoreResult<Vec<Event>> {
        if !self.path.exists() {
            debug!("No event store at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let read_err = |source| StoreError::Read { path: self.path.clone(), source };
        let metadata = fs::metadata(&self.path).map_err(read_err)?;
        if metadata.len() > self.max_file_size {
            return Err(StoreError::TooLarge { path: self.path.clone() });
        }
        if metadata.len() == 0 {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(read_err)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }

    fn write_events(&self, events: &[Event]) -> StoreResult<()> {
        let write_err = |source| StoreError::Write { path: self.path.clone(), source };
        let json = serde_json::to_vec_pretty(events)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let tmp_path = self.tmp_path();
        let mut file = File::create(&tmp_path).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;

        info!("Saved {} events to {}", events.len(), self.path.display());
        Ok(())
    }

    fn ensure_parent_dir(&self) -> StoreResult<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source }),
            _ => Ok(()),
        }
    }

    fn lock_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, "lock")
    }

    fn tmp_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, "tmp")
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_schedule;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn request(title: &str, date: &str) -> EventRequest {
        EventRequest {
            title: title.to_string(),
            date: date.to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            note: None,
            color: Some("green".to_string()),
        }
    }

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let temp_dir = tempdir()?;
        let nested = temp_dir.path().join("nested");
        let store = EventStore::new(nested.join("events.json"));
        assert!(store.load()?.is_empty());
        assert!(store.events_in_month("2025-09")?.is_empty());
        // Reading never creates the store directory or its lock file.
        assert!(!nested.exists());
        Ok(())
    }

    #[test]
    fn test_load_does_not_create_lock_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("events.json");
        fs::write(&path, "[]")?;
        let store = EventStore::new(&path);

        assert!(store.load()?.is_empty());
        assert!(!store.lock_path().exists());

        store.create_event(&request("Shared", "2025-09-03"))?;
        assert!(store.lock_path().exists());
        assert_eq!(store.load()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_create_update_delete() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = EventStore::new(temp_dir.path().join("events.json"));

        let created = store.create_event(&request("Dentist", "2025-03-04"))?;
        let id = created.id.clone().expect("created event has an id");
        assert_eq!(created.title, "Dentist 09:00-10:00");

        let updated = store.update_event(&id, &request("Dentist moved", "2025-03-05"))?;
        assert_eq!(updated.id.as_deref(), Some(id.as_str()));

        let events = store.load()?;
        assert_eq!(events, vec![updated.clone()]);

        let deleted = store.delete_event(&id)?;
        assert_eq!(deleted, updated);
        assert!(store.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_id_is_not_found() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = EventStore::new(temp_dir.path().join("events.json"));
        store.create_event(&request("Keep", "2025-03-04"))?;

        assert!(matches!(store.delete_event("nope"), Err(StoreError::NotFound(id)) if id == "nope"));
        assert!(matches!(
            store.update_event("nope", &request("X", "2025-03-04")),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.load()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_request_does_not_touch_store() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = EventStore::new(temp_dir.path().join("events.json"));
        let mut bad = request("Bad", "2025-03-04");
        bad.start_time = "9am".to_string();
        assert!(matches!(store.create_event(&bad), Err(StoreError::Invalid(_))));
        assert!(!store.path().exists());
        Ok(())
    }

    #[test]
    fn test_failed_write_keeps_previous_store() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("events.json");
        let store = EventStore::new(&path);
        store.create_event(&request("Original", "2025-09-10"))?;
        let before = fs::read_to_string(&path)?;

        // A directory where the temp file should go makes the write fail.
        fs::create_dir(temp_dir.path().join("events.json.tmp"))?;
        let parsed = parse_schedule("September 2025\n1\n08:00\n16:00\nEarly")?;
        assert!(matches!(store.apply_schedule(parsed), Err(StoreError::Write { .. })));

        assert_eq!(fs::read_to_string(&path)?, before);
        Ok(())
    }

    #[test]
    fn test_corrupt_and_oversized_files() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("events.json");
        fs::write(&path, "{not json")?;
        let store = EventStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));

        fs::write(&path, "[]")?;
        let tiny = EventStore::new(&path).with_max_file_size(1);
        assert!(matches!(tiny.load(), Err(StoreError::TooLarge { .. })));
        Ok(())
    }

    #[test]
    fn test_events_in_month_sorted() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = EventStore::new(temp_dir.path().join("events.json"));
        store.create_event(&request("B", "2025-03-20"))?;
        store.create_event(&request("Other", "2025-04-01"))?;
        store.create_event(&request("A", "2025-03-02"))?;

        let titles: Vec<_> =
            store.events_in_month("2025-03")?.into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["A 09:00-10:00", "B 09:00-10:00"]);
        Ok(())
    }
}
