//! JSON file store.
//!
//! All medications and logs live in one file shaped like
//! `{ "medications": [...], "logs": [...] }`. Every mutation is applied to a
//! copy, written to a temporary file next to the target and renamed over it;
//! only after the rename succeeds does the in-memory copy change. The CLI and
//! the daemon share the file, so the store reloads whenever the file's
//! modification time moves. Writers hold an exclusive lock on a sidecar
//! `<file>.lock` from the re-read until the rename, so two processes never
//! overwrite each other's changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{MedicationData, MedicationStore};
use crate::common::utils::{ensure_parent_dir, private_path};
use crate::error::ReminderError;
use crate::model::{DoseLog, Medication, MedicationPatch, NewMedication};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: MedicationData,
    last_modified: Option<SystemTime>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; the file is
    /// created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (data, last_modified) = read_data(&path)?;
        Ok(Self {
            path,
            data,
            last_modified,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file locked around every write.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Apply `change` to a copy of the data and persist it.
    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut MedicationData) -> Result<T, ReminderError>,
    ) -> Result<T, ReminderError> {
        let store_error = |e: anyhow::Error| ReminderError::StoreWrite(format!("{e:#}"));

        // Released when dropped at the end of this function
        let _lock = lock_data_file(&self.lock_path()).map_err(store_error)?;

        // Always re-read under the lock: mtimes can be too coarse to show a
        // write that landed within the same tick.
        let (current, _) = read_data(&self.path).map_err(store_error)?;

        let mut next = current;
        let value = change(&mut next)?;
        let modified = write_data(&self.path, &next).map_err(store_error)?;

        self.data = next;
        self.last_modified = modified;
        Ok(value)
    }
}

/// Block until this process holds the data file lock.
fn lock_data_file(lock_path: &Path) -> Result<File> {
    ensure_parent_dir(lock_path)?;
    let file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("Failed to open {}", private_path(lock_path)))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock {}", private_path(lock_path)))?;
    Ok(file)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_data(path: &Path) -> Result<(MedicationData, Option<SystemTime>)> {
    if !path.exists() {
        return Ok((MedicationData::default(), None));
    }

    let modified = modified_time(path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", private_path(path)))?;
    if content.trim().is_empty() {
        return Ok((MedicationData::default(), modified));
    }

    let data = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", private_path(path)))?;
    Ok((data, modified))
}

fn write_data(path: &Path, data: &MedicationData) -> Result<Option<SystemTime>> {
    ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let json = serde_json::to_vec_pretty(data).context("Failed to serialize medication data")?;
    let mut temp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", private_path(&dir)))?;
    temp.write_all(&json)?;
    temp.write_all(b"\n")?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", private_path(path)))?;

    Ok(modified_time(path))
}

impl MedicationStore for JsonFileStore {
    fn all(&self) -> Vec<Medication> {
        self.data.medications.clone()
    }

    fn get(&self, id: &str) -> Option<Medication> {
        self.data.find(id).cloned()
    }

    fn add(&mut self, new: NewMedication, now: DateTime<Local>) -> Result<Medication, ReminderError> {
        self.mutate(|data| Ok(data.add(new, now)))
    }

    fn update(
        &mut self,
        id: &str,
        patch: MedicationPatch,
        now: DateTime<Local>,
    ) -> Result<Medication, ReminderError> {
        self.mutate(|data| data.update(id, patch, now))
    }

    fn remove(&mut self, id: &str) -> Result<Medication, ReminderError> {
        self.mutate(|data| data.remove(id))
    }

    fn logs_for_day(&self, medication_id: &str, day: NaiveDate) -> Vec<DoseLog> {
        self.data.logs_for_day(medication_id, day)
    }

    fn logs_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DoseLog> {
        self.data.logs_between(from, to)
    }

    fn record_taken(
        &mut self,
        medication_id: &str,
        taken_at: DateTime<Local>,
    ) -> Result<DoseLog, ReminderError> {
        self.mutate(|data| data.record_taken(medication_id, taken_at))
    }

    fn refresh(&mut self) -> Result<bool> {
        let current = modified_time(&self.path);
        if current.is_none() || current == self.last_modified {
            return Ok(false);
        }

        let (data, modified) = read_data(&self.path)?;
        let changed = data != self.data;
        self.data = data;
        self.last_modified = modified;
        Ok(changed)
    }
}
