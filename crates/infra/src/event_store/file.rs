//! Durable JSON-lines event log.
//!
//! One `StoredEvent` per line, appended in global position order. Opening a
//! file replays it into the same `EventLog` the in-memory store uses, so every
//! append-time invariant is re-checked on startup.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use stela_core::{AggregateId, AggregateType, ExpectedVersion, Version};
use tracing::{debug, info, warn};

use super::log::EventLog;
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
struct FileLog {
    file: File,
    len: u64,
    log: EventLog,
}

/// File-backed append-only event store.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    sync_writes: bool,
    inner: RwLock<FileLog>,
}

impl FileEventStore {
    /// Open (or create) the log at `path`.
    ///
    /// A final line without a trailing newline that does not parse is treated
    /// as a torn write and truncated. Any other unreadable line is `Corrupt`.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self, EventStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let mut log = EventLog::default();
        let mut len = contents.len() as u64;
        let mut offset = 0usize;
        let mut line_no = 0usize;

        while offset < contents.len() {
            line_no += 1;
            let rest = &contents[offset..];
            let (line, complete) = match rest.iter().position(|&b| b == b'\n') {
                Some(end) => (&rest[..end], true),
                None => (rest, false),
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                offset += line.len() + 1;
                continue;
            }

            match serde_json::from_slice::<StoredEvent>(line) {
                Ok(event) => {
                    log.restore(event)
                        .map_err(|reason| EventStoreError::Corrupt { line: line_no, reason })?;
                    if !complete {
                        file.write_all(b"\n")?;
                        len += 1;
                    }
                }
                Err(e) if !complete => {
                    warn!(
                        path = %path.display(),
                        line = line_no,
                        error = %e,
                        "truncating torn trailing write"
                    );
                    file.set_len(offset as u64)?;
                    len = offset as u64;
                    break;
                }
                Err(e) => {
                    return Err(EventStoreError::Corrupt {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
            }
            offset += line.len() + 1;
        }

        info!(path = %path.display(), events = log.len(), "opened event log");

        Ok(Self {
            path,
            sync_writes,
            inner: RwLock::new(FileLog { file, len, log }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_batch(file: &mut File, bytes: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

impl EventStore for FileEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut inner = self.inner.write().map_err(|_| EventStoreError::Poisoned)?;

        let committed = inner.log.prepare(events, expected_version)?;
        if committed.is_empty() {
            return Ok(committed);
        }

        let mut buf = String::new();
        for e in &committed {
            let line = serde_json::to_string(e)
                .map_err(|err| EventStoreError::Serialization(err.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        // The whole batch lands or none of it does.
        let before = inner.len;
        let written = write_batch(&mut inner.file, buf.as_bytes(), self.sync_writes);
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "append failed, rolling back file");
            if let Err(rollback) = inner.file.set_len(before) {
                warn!(error = %rollback, "rollback failed; torn tail will be truncated on next open");
            }
            return Err(EventStoreError::Io(e));
        }

        inner.len = before + buf.len() as u64;
        inner.log.commit(&committed);

        if let Some(last) = committed.last() {
            debug!(
                aggregate_id = %last.aggregate_id,
                aggregate_type = %last.aggregate_type,
                version = %last.version,
                count = committed.len(),
                "appended events"
            );
        }
        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.load_stream(aggregate_id))
    }

    fn all_events(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.all_events())
    }

    fn latest_version(&self, aggregate_id: AggregateId) -> Result<Version, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.current_version(aggregate_id))
    }

    fn aggregate_ids(&self, aggregate_type: AggregateType) -> Result<Vec<AggregateId>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.aggregate_ids(aggregate_type))
    }

    fn events_of_type(&self, aggregate_type: AggregateType) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.events_of_type(aggregate_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn event(aggregate_id: AggregateId, version: u64) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: AggregateType::Moment,
            event_type: "MomentCaptured".to_string(),
            schema_version: 1,
            timestamp: Utc.with_ymd_and_hms(2026, 5, 2, 18, 30, 0).unwrap(),
            version: Version::new(version),
            data: json!({ "n": version }),
            metadata: Some(json!({ "source": "test" })),
        }
    }

    #[test]
    fn events_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log").join("events.jsonl");
        let id = AggregateId::new();

        {
            let store = FileEventStore::open(&path, true).unwrap();
            store
                .append(vec![event(id, 1), event(id, 2)], ExpectedVersion::NoStream)
                .unwrap();
        }

        let reopened = FileEventStore::open(&path, true).unwrap();
        let stream = reopened.load_stream(id).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[1].version, Version::new(2));
        assert_eq!(stream[1].metadata, Some(json!({ "source": "test" })));
        assert_eq!(reopened.aggregate_ids(AggregateType::Moment).unwrap(), vec![id]);

        // Concurrency checks see the persisted stream.
        let err = reopened
            .append(vec![event(id, 2)], ExpectedVersion::Exact(Version::new(1)))
            .unwrap_err();
        assert!(err.is_retryable());
        reopened
            .append(vec![event(id, 3)], ExpectedVersion::Exact(Version::new(2)))
            .unwrap();
        assert_eq!(reopened.latest_version(id).unwrap(), Version::new(3));
    }

    #[test]
    fn torn_trailing_line_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let id = AggregateId::new();

        {
            let store = FileEventStore::open(&path, false).unwrap();
            store.append(vec![event(id, 1)], ExpectedVersion::NoStream).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"{\"position\":2,\"event_id\":").unwrap();
        }

        let store = FileEventStore::open(&path, false).unwrap();
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
        store
            .append(vec![event(id, 2)], ExpectedVersion::Exact(Version::new(1)))
            .unwrap();

        let reopened = FileEventStore::open(&path, false).unwrap();
        assert_eq!(reopened.load_stream(id).unwrap().len(), 2);
    }

    #[test]
    fn torn_write_inside_multibyte_character_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let id = AggregateId::new();

        {
            let store = FileEventStore::open(&path, false).unwrap();
            store.append(vec![event(id, 1)], ExpectedVersion::NoStream).unwrap();
        }

        let mut second = event(id, 2);
        second.data = json!({ "caption": "café 🌅" });
        let line = serde_json::to_string(&second.into_stored(2)).unwrap();
        let cut = line.find('🌅').unwrap() + 2;
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&line.as_bytes()[..cut]).unwrap();
        }

        let store = FileEventStore::open(&path, false).unwrap();
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
        assert_eq!(store.latest_version(id).unwrap(), Version::new(1));

        let mut retry = event(id, 2);
        retry.data = json!({ "caption": "café 🌅" });
        store.append(vec![retry], ExpectedVersion::Exact(Version::new(1))).unwrap();

        let reopened = FileEventStore::open(&path, false).unwrap();
        let stream = reopened.load_stream(id).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[1].data, json!({ "caption": "café 🌅" }));
    }

    #[test]
    fn garbage_in_the_middle_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "not json\n{}\n").unwrap();

        let err = FileEventStore::open(&path, false).unwrap_err();
        match err {
            EventStoreError::Corrupt { line, .. } => assert_eq!(line, 1),
            other => panic!("Expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn unknown_aggregate_tag_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let id = AggregateId::new();

        let mut stored = event(id, 1).into_stored(1);
        stored.aggregate_type = AggregateType::Habit;
        let line = serde_json::to_string(&stored)
            .unwrap()
            .replace("\"habit\"", "\"Habit\"");
        fs::write(&path, format!("{line}\n")).unwrap();

        let err = FileEventStore::open(&path, false).unwrap_err();
        assert!(matches!(err, EventStoreError::Corrupt { line: 1, .. }));
    }

    #[test]
    fn duplicate_versions_on_disk_are_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let id = AggregateId::new();

        let first = serde_json::to_string(&event(id, 1).into_stored(1)).unwrap();
        let second = serde_json::to_string(&event(id, 1).into_stored(2)).unwrap();
        fs::write(&path, format!("{first}\n{second}\n")).unwrap();

        let err = FileEventStore::open(&path, false).unwrap_err();
        assert!(matches!(err, EventStoreError::Corrupt { line: 2, .. }));
    }
}
