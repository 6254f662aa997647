//! Configuration store handles.
//!
//! The record is shared between separate invocations, so every
//! read-modify-write runs under a lock file next to the record, and saves go
//! through a temp file plus rename.

use std::cell::{Cell, RefCell};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use super::ConfigRecord;
use crate::error::AssistError;

pub trait ConfigStore {
    fn load(&self) -> Result<ConfigRecord, AssistError>;

    fn save(&self, record: &ConfigRecord) -> Result<(), AssistError>;

    /// Delete the stored record entirely.
    fn reset(&self) -> Result<(), AssistError>;

    /// Human-readable location, for status output.
    fn location(&self) -> String;

    /// Load, modify and save as one step.
    fn update<T, F>(&self, f: F) -> Result<T, AssistError>
    where
        F: FnOnce(&mut ConfigRecord) -> T,
        Self: Sized,
    {
        let mut record = self.load()?;
        let out = f(&mut record);
        self.save(&record)?;
        Ok(out)
    }
}

const LOCK_RETRY: Duration = Duration::from_millis(50);
const LOCK_STALE_AFTER: Duration = Duration::from_secs(10);

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn lock(&self) -> Result<StoreLock, AssistError> {
        ensure_parent_dir(&self.path)?;
        StoreLock::acquire(self.lock_path(), self.lock_timeout)
    }

    fn read_record(&self) -> Result<ConfigRecord, AssistError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", self.path.display());
                return Ok(ConfigRecord::default());
            }
            Err(source) => {
                return Err(AssistError::Store {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| AssistError::InvalidRecord {
            path: self.path.clone(),
            source,
        })
    }

    fn write_record(&self, record: &ConfigRecord) -> Result<(), AssistError> {
        let data = serde_json::to_vec_pretty(record).map_err(|source| AssistError::InvalidRecord {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &data)
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<ConfigRecord, AssistError> {
        self.read_record()
    }

    fn save(&self, record: &ConfigRecord) -> Result<(), AssistError> {
        let _lock = self.lock()?;
        self.write_record(record)
    }

    fn reset(&self) -> Result<(), AssistError> {
        let _lock = self.lock()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AssistError::Store {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn update<T, F>(&self, f: F) -> Result<T, AssistError>
    where
        F: FnOnce(&mut ConfigRecord) -> T,
        Self: Sized,
    {
        let _lock = self.lock()?;
        let mut record = self.read_record()?;
        let out = f(&mut record);
        self.write_record(&record)?;
        Ok(out)
    }
}

fn store_error(path: &Path) -> impl FnOnce(io::Error) -> AssistError + '_ {
    move |source| AssistError::Store {
        path: path.to_path_buf(),
        source,
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), AssistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(store_error(parent))?;
    }
    Ok(())
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), AssistError> {
    ensure_parent_dir(path)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(store_error(&tmp))?;
    restrict_permissions(&tmp)?;
    fs::rename(&tmp, path).map_err(store_error(path))?;
    Ok(())
}

// The record holds the API key.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), AssistError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(store_error(path))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), AssistError> {
    Ok(())
}

/// Exclusive lock file, removed on drop.
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, AssistError> {
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        debug!("Failed to write pid into {}: {}", path.display(), e);
                    }
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) && reclaim_stale(&path)? {
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(AssistError::Store {
                            path,
                            source: io::Error::new(
                                io::ErrorKind::WouldBlock,
                                "configuration is locked by another invocation",
                            ),
                        });
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(source) => return Err(AssistError::Store { path, source }),
            }
        }
    }
}

/// Move a stale lock aside and delete it. Renaming lets only one of several
/// reclaimers win; if the lock taken turns out to be fresh (a new holder got
/// in between the staleness check and the rename) it is put back.
fn reclaim_stale(path: &Path) -> Result<bool, AssistError> {
    let claimed = path.with_extension(format!("lock.stale.{}", std::process::id()));
    match fs::rename(path, &claimed) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(store_error(path)(e)),
    }

    if !is_stale(&claimed) {
        if let Err(e) = fs::hard_link(&claimed, path) {
            warn!("Failed to restore lock {}: {}", path.display(), e);
        }
        if let Err(e) = fs::remove_file(&claimed) {
            debug!("Failed to remove {}: {}", claimed.display(), e);
        }
        return Ok(false);
    }

    warn!("Removing stale lock {}", path.display());
    fs::remove_file(&claimed).map_err(store_error(&claimed))?;
    Ok(true)
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > LOCK_STALE_AFTER)
        .unwrap_or(false)
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RefCell<ConfigRecord>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new(record: ConfigRecord) -> Self {
        Self {
            record: RefCell::new(record),
            saves: Cell::new(0),
        }
    }

    pub fn snapshot(&self) -> ConfigRecord {
        self.record.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<ConfigRecord, AssistError> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &ConfigRecord) -> Result<(), AssistError> {
        *self.record.borrow_mut() = record.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn reset(&self) -> Result<(), AssistError> {
        *self.record.borrow_mut() = ConfigRecord::default();
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
