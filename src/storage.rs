//! Storage layer for shiftpoints
//!
//! Manages persistent state in a single data directory (default
//! `.shiftpoints/`):
//!
//! ```text
//! .shiftpoints/
//!   shiftpoints.toml      # Configuration (point rules, retention)
//!   tasks.json            # Registry of task records (templates included)
//!   check_ins.json        # Registry of check-in records
//!   ledger.jsonl          # Append-only points history
//!   goals.json            # Daily goal rows + monthly sticky flags
//!   schedule.json         # Roster input (produced externally, read here)
//!   notifications.jsonl   # Recorded notifications
//!   maintenance.json      # Per-date maintenance markers
//! ```
//!
//! Mutating operations on the JSON registries go through a locked
//! read-modify-write (`update_registry`): acquire `<file>.lock`, read, apply,
//! atomically rewrite. Losers of a race observe the already-updated state.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Default name of the data directory
pub const DATA_DIR: &str = ".shiftpoints";

/// Storage manager for the shiftpoints data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a storage manager rooted at the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("shiftpoints.toml")
    }

    /// Path to the task registry
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    /// Path to the check-in registry
    pub fn check_ins_file(&self) -> PathBuf {
        self.data_dir.join("check_ins.json")
    }

    /// Path to the points ledger (JSONL format)
    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir.join("ledger.jsonl")
    }

    /// Path to the goal rows file
    pub fn goals_file(&self) -> PathBuf {
        self.data_dir.join("goals.json")
    }

    /// Path to the roster input file
    pub fn schedule_file(&self) -> PathBuf {
        self.data_dir.join("schedule.json")
    }

    /// Path to the recorded notifications file (JSONL format)
    pub fn notifications_file(&self) -> PathBuf {
        self.data_dir.join("notifications.jsonl")
    }

    /// Path to the maintenance markers file
    pub fn maintenance_file(&self) -> PathBuf {
        self.data_dir.join("maintenance.json")
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize the data directory and touch the append-only files
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;

        let ledger = self.ledger_file();
        if !ledger.exists() {
            File::create(&ledger)?;
        }

        let notifications = self.notifications_file();
        if !notifications.exists() {
            File::create(&notifications)?;
        }

        Ok(())
    }

    /// Check if the data directory has been initialized
    pub fn is_initialized(&self) -> bool {
        self.data_dir.exists()
    }

    // =========================================================================
    // File I/O helpers (atomic writes for safety)
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    ///
    /// This ensures that concurrent readers never see partial writes.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read JSON data from a file, or the type's default if the file is absent
    pub fn read_json_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        self.read_json(path)
    }

    /// Append a record to a JSONL file
    ///
    /// Note: the append itself is not atomic across processes. Callers that
    /// pair the append with a registry mutation must hold that registry's
    /// lock so the two land together.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // One write_all so concurrent appenders cannot interleave lines.
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all records from a JSONL file
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }

    /// Rewrite a JSONL file with the given records (temp file + rename)
    pub fn rewrite_jsonl<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        lock::write_atomic(path, &buf)
    }

    // =========================================================================
    // Locked registry mutation
    // =========================================================================

    /// Run a read-modify-write cycle on a JSON registry file under its lock.
    ///
    /// The closure sees the current registry (or its default when the file
    /// does not exist yet), mutates it, and its result is returned after the
    /// registry has been atomically rewritten. Returning an error from the
    /// closure aborts the cycle with the file untouched.
    pub fn update_registry<R, T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        R: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut R) -> Result<T>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_path = lock::lock_path_for(path);
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut registry: R = self.read_json_or_default(path)?;
        let result = f(&mut registry)?;

        let json = serde_json::to_string_pretty(&registry)?;
        lock::write_atomic(path, json.as_bytes())?;

        Ok(result)
    }

    /// Run a read-only closure on a JSON registry file under its lock.
    pub fn with_registry<R, T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        R: DeserializeOwned + Default,
        F: FnOnce(&R) -> Result<T>,
    {
        let lock_path = lock::lock_path_for(path);
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let registry: R = self.read_json_or_default(path)?;
        f(&registry)
    }
}
