// crates/substrate-adapters/src/lab/filesystem.rs
// ============================================================================
// Module: Filesystem Lab Adapters
// Description: Filesystem-backed object store and blackboard for lab mode.
// Purpose: Give lab deployments a durable-enough local backend without a cloud SDK.
// Dependencies: substrate-core, std::fs
// ============================================================================

//! ## Overview
//! Lab mode is the only mode in which `filesystem` is an allowed backend
//! type (see [`crate::backend_class`]). Layout follows the persistent layout
//! the external interface contract documents:
//! `var/{resource_kind}/{tenant}/{env}/{project|_}/{surface|_}/…`.
//!
//! Security posture: every relative path segment is validated before it
//! touches the filesystem; `..`, absolute paths, and path separators inside a
//! single segment are rejected, mirroring the traversal protection the
//! teacher's object-store adapter applies to S3 keys.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use substrate_core::ActorId;
use substrate_core::AdapterError;
use substrate_core::Blackboard;
use substrate_core::BlackboardEntry;
use substrate_core::ObjectListPage;
use substrate_core::ObjectStore;
use substrate_core::Timestamp;

/// Maximum length of a single path segment.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

/// Validates that `key` is a safe, relative, non-traversing path.
///
/// # Errors
///
/// Returns [`AdapterError::Invalid`] when `key` is empty, absolute, contains
/// `..`, or has an overlong segment.
fn validate_key(key: &str) -> Result<(), AdapterError> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(AdapterError::Invalid(format!("unsafe object key: {key}")));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(AdapterError::Invalid(format!("unsafe object key segment in: {key}")));
        }
        if segment.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(AdapterError::Invalid(format!("object key segment too long in: {key}")));
        }
    }
    Ok(())
}

fn io_err(context: &str, err: io::Error) -> AdapterError {
    AdapterError::Unavailable(format!("{context}: {err}"))
}

/// Filesystem-backed object store rooted at a single directory. `lab` mode only.
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    /// Creates a filesystem object store rooted at `root`, creating the
    /// directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when `root` cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AdapterError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| io_err("create object store root", err))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FilesystemObjectStore {
    fn put(&self, key: &str, bytes: &[u8], _content_type: Option<&str>) -> Result<(), AdapterError> {
        validate_key(key)?;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_err("create object parent dir", err))?;
        }
        let tmp_path = path.with_extension("tmp-write");
        fs::write(&tmp_path, bytes).map_err(|err| io_err("write object", err))?;
        fs::rename(&tmp_path, &path).map_err(|err| io_err("commit object", err))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AdapterError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err("read object", err)),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, AdapterError> {
        validate_key(key)?;
        Ok(self.path_for(key).is_file())
    }

    fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ObjectListPage, AdapterError> {
        let mut keys = Vec::new();
        collect_keys(&self.root, &self.root, &mut keys).map_err(|err| io_err("list objects", err))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        if let Some(after) = cursor {
            keys.retain(|k| k.as_str() > after);
        }
        Ok(ObjectListPage { keys, next_cursor: None })
    }

    fn delete(&self, key: &str) -> Result<(), AdapterError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) | Err(_) if !path.exists() => Ok(()),
            Err(err) => Err(io_err("delete object", err)),
        }
    }
}

fn collect_keys(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_keys(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            if let Some(name) = relative.to_str() {
                if !name.ends_with("tmp-write") {
                    out.push(name.replace(std::path::MAIN_SEPARATOR, "/"));
                }
            }
        }
    }
    Ok(())
}

/// Filesystem-backed versioned coordination store. `lab` mode only.
///
/// Each `(stream_key, key)` pair is serialized as one JSON file; writes are
/// serialized process-wide by an internal mutex, matching the "no in-memory
/// fallback, filesystem in lab with a startup warning" contract.
pub struct FilesystemBlackboard {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FilesystemBlackboard {
    /// Creates a filesystem-backed blackboard rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when `root` cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AdapterError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| io_err("create blackboard root", err))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn entry_path(&self, stream_key: &str, key: &str) -> PathBuf {
        self.root.join(stream_key).join(format!("{key}.json"))
    }

    fn read_entry(&self, stream_key: &str, key: &str) -> Result<Option<BlackboardEntry>, AdapterError> {
        let path = self.entry_path(stream_key, key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| AdapterError::Invalid(format!("corrupt blackboard entry: {err}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err("read blackboard entry", err)),
        }
    }
}

impl Blackboard for FilesystemBlackboard {
    fn write(
        &self,
        stream_key: &str,
        key: &str,
        value: serde_json::Value,
        expected_version: Option<u64>,
        actor: Option<&ActorId>,
    ) -> Result<BlackboardEntry, AdapterError> {
        let _guard = self.write_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let current = self.read_entry(stream_key, key)?;
        let now = Timestamp::now();
        let entry = match (&current, expected_version) {
            (None, None) => BlackboardEntry {
                stream_key: stream_key.to_owned(),
                key: key.to_owned(),
                version: 1,
                value,
                created_by: actor.cloned(),
                created_at: now,
                updated_by: actor.cloned(),
                updated_at: now,
            },
            (Some(existing), Some(expected)) if existing.version == expected => BlackboardEntry {
                stream_key: stream_key.to_owned(),
                key: key.to_owned(),
                version: existing.version + 1,
                value,
                created_by: existing.created_by.clone(),
                created_at: existing.created_at,
                updated_by: actor.cloned(),
                updated_at: now,
            },
            (Some(existing), _) => {
                return Err(AdapterError::VersionConflict {
                    expected_version,
                    current_version: existing.version,
                });
            }
            (None, Some(expected)) => {
                return Err(AdapterError::VersionConflict {
                    expected_version: Some(expected),
                    current_version: 0,
                });
            }
        };
        let path = self.entry_path(stream_key, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_err("create blackboard stream dir", err))?;
        }
        let bytes = serde_json::to_vec(&entry).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let tmp_path = path.with_extension("tmp-write");
        fs::write(&tmp_path, &bytes).map_err(|err| io_err("write blackboard entry", err))?;
        fs::rename(&tmp_path, &path).map_err(|err| io_err("commit blackboard entry", err))?;
        Ok(entry)
    }

    fn read(&self, stream_key: &str, key: &str, version: Option<u64>) -> Result<Option<BlackboardEntry>, AdapterError> {
        let current = self.read_entry(stream_key, key)?;
        Ok(current.filter(|entry| version.is_none_or(|v| v == entry.version)))
    }

    fn list_keys(&self, stream_key: &str) -> Result<Vec<String>, AdapterError> {
        let dir = self.root.join(stream_key);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|err| io_err("list blackboard keys", err))? {
            let entry = entry.map_err(|err| io_err("list blackboard keys", err))?;
            if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                keys.push(name.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_store_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FilesystemObjectStore::new(dir.path()).expect("store");
        let err = store.put("../escape", b"x", None);
        assert!(err.is_err());
    }

    #[test]
    fn object_store_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FilesystemObjectStore::new(dir.path()).expect("store");
        store.put("t_acme/dev/p1/obj.bin", b"hello", None).expect("put");
        assert_eq!(store.get("t_acme/dev/p1/obj.bin").expect("get"), Some(b"hello".to_vec()));
        let page = store.list("t_acme/", None).expect("list");
        assert_eq!(page.keys, vec!["t_acme/dev/p1/obj.bin".to_owned()]);
    }

    #[test]
    fn blackboard_enforces_version_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let board = FilesystemBlackboard::new(dir.path()).expect("board");
        board.write("sk", "k", serde_json::json!(1), None, None).expect("create");
        let conflict = board.write("sk", "k", serde_json::json!(2), Some(5), None);
        assert!(matches!(conflict, Err(AdapterError::VersionConflict { .. })));
    }
}
