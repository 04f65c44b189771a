//! The list of alarms that haven't gone off yet and the JSON file backing it.
//!
//! Every read and write of the list goes through one mutex, and the file is rewritten while that
//! lock is held, so the user adding or deleting alarms can never interleave with the scheduler
//! firing them.

use std::{
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::{
    alarm::{Alarm, AlarmId, AlarmTime},
    communication::{notify, Event},
    error::{AlarmError, Result},
};

#[derive(Debug)]
pub struct AlarmStore {
    path: PathBuf,
    alarms: Mutex<Vec<Alarm>>,
    events: Option<Sender<Event>>,
}

impl AlarmStore {
    /// Opens the store backed by `path`, see [`AlarmStore::load`] for how a bad file is handled.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let alarms = Self::load(&path);
        Self {
            path,
            alarms: Mutex::new(alarms),
            events: None,
        }
    }

    /// Reads the alarms saved at `path`.
    /// A missing or unreadable file gives an empty list, startup never fails because of it.
    /// Entries that can't be read are skipped with a warning.
    #[must_use]
    pub fn load(path: &Path) -> Vec<Alarm> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no alarms file at {}, starting empty", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("couldn't read alarms file {}: {e}", path.display());
                return Vec::new();
            }
        };
        let entries = match serde_json::from_slice::<Vec<serde_json::Value>>(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("couldn't parse alarms file {}: {e}", path.display());
                return Vec::new();
            }
        };
        // one broken entry mustn't cost the user every other alarm
        let alarms: Vec<Alarm> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value(entry) {
                Ok(alarm) => Some(alarm),
                Err(e) => {
                    warn!("skipping alarm {i} in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        info!("loaded {} alarms from {}", alarms.len(), path.display());
        alarms
    }

    /// Sends [`Event`]s about every change to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: Sender<Event>) -> Self {
        self.events = Some(sender);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the alarms in the order they were added.
    #[must_use]
    pub fn alarms(&self) -> Vec<Alarm> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Appends a new alarm and saves.
    ///
    /// # Errors
    /// [`AlarmError::Validation`] if `time` isn't `HH:MM`, nothing is stored or written then.
    /// [`AlarmError::Persistence`] if the file couldn't be written, the alarm is not kept.
    pub fn add(
        &self,
        name: impl Into<String>,
        dose: impl Into<String>,
        time: &str,
    ) -> Result<Alarm> {
        let alarm = match Alarm::new(name, dose, time) {
            Ok(alarm) => alarm,
            Err(e) => {
                debug!("rejected alarm: {e}");
                notify(self.events.as_ref(), Event::AlarmRejected(e.to_string()));
                return Err(e);
            }
        };

        let mut alarms = self.lock();
        alarms.push(alarm.clone());
        if let Err(e) = self.persist(&alarms) {
            alarms.pop();
            error!("{e}");
            notify(self.events.as_ref(), Event::AlarmRejected(e.to_string()));
            return Err(e);
        }
        info!("added alarm {} ({alarm})", alarm.id());
        notify(self.events.as_ref(), Event::AlarmAdded(alarm.clone()));
        notify(self.events.as_ref(), Event::AlarmsChanged(alarms.clone()));
        Ok(alarm)
    }

    /// Removes the alarm with `id` and saves.
    ///
    /// # Errors
    /// [`AlarmError::NotFound`] if there is no such alarm, usually because it already went off.
    /// [`AlarmError::Persistence`] if the file couldn't be written, the alarm is put back.
    pub fn remove(&self, id: AlarmId) -> Result<Alarm> {
        let mut alarms = self.lock();
        let Some(index) = alarms.iter().position(|alarm| alarm.id() == id) else {
            return Err(AlarmError::NotFound(id));
        };
        let alarm = alarms.remove(index);
        if let Err(e) = self.persist(&alarms) {
            alarms.insert(index, alarm);
            error!("{e}");
            notify(self.events.as_ref(), Event::PersistenceFailed(e.to_string()));
            return Err(e);
        }
        info!("removed alarm {id} ({alarm})");
        notify(self.events.as_ref(), Event::AlarmsChanged(alarms.clone()));
        Ok(alarm)
    }

    /// Takes every alarm set for `time` out of the store, in order, and saves.
    ///
    /// The alarms stay removed even if saving fails, so they can't go off twice.
    /// That failure is logged and sent as [`Event::PersistenceFailed`].
    pub fn take_due(&self, time: AlarmTime) -> Vec<Alarm> {
        let mut alarms = self.lock();
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *alarms)
            .into_iter()
            .partition(|alarm| alarm.time == time);
        *alarms = rest;
        if due.is_empty() {
            return due;
        }
        if let Err(e) = self.persist(&alarms) {
            error!("{e}");
            notify(self.events.as_ref(), Event::PersistenceFailed(e.to_string()));
        }
        notify(self.events.as_ref(), Event::AlarmsChanged(alarms.clone()));
        due
    }

    /// Writes the whole list to disk, replacing the file.
    ///
    /// # Errors
    /// [`AlarmError::Persistence`] if the list couldn't be serialized or written.
    pub fn save(&self) -> Result<()> {
        let alarms = self.lock();
        self.persist(&alarms)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alarm>> {
        // nothing that touches the list can panic halfway through, so a poisoned lock is fine to reuse
        self.alarms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, alarms: &[Alarm]) -> Result<()> {
        write_alarms(&self.path, alarms)?;
        debug!("saved {} alarms to {}", alarms.len(), self.path.display());
        Ok(())
    }
}

/// Pretty prints `alarms` with a 4 space indent into a sibling temp file, then renames it over
/// `path` so a crash mid write leaves the old file intact.
fn write_alarms(path: &Path, alarms: &[Alarm]) -> Result<()> {
    let mut json = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
    alarms
        .serialize(&mut serializer)
        .map_err(|e| AlarmError::Persistence(format!("couldn't serialize alarms: {e}")))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AlarmError::Persistence(format!("couldn't create {}: {e}", parent.display()))
        })?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, &json)
        .map_err(|e| AlarmError::Persistence(format!("couldn't write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        AlarmError::Persistence(format!("couldn't replace {}: {e}", path.display()))
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("alarms.json"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}
