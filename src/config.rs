use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AlarmError, Result};

const APP_NAME: &str = "pill_clock";
const DEFAULT_SOUND: &str = "alarm_sound.mp3";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// where the alarms are saved
    pub alarms_file: PathBuf,
    /// sound played (on repeat) when an alarm goes off, see [`Config::sound_file`]
    pub sound: Option<PathBuf>,
    /// 0 - 100
    pub volume: f32,
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alarms_file: Self::alarms_path(),
            sound: None,
            volume: 100.0,
            poll_interval_secs: crate::scheduler::POLL_INTERVAL.as_secs(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the config at `path`, a missing file gives the defaults.
    ///
    /// # Errors
    /// If the file exists but can't be read or isn't valid toml.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(config) => config,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AlarmError::Config(format!(
                    "couldn't read config file {}: {e}",
                    path.display()
                )));
            }
        };
        toml::from_str(&config).map_err(|e| {
            AlarmError::Config(format!("couldn't parse config file {}: {e}", path.display()))
        })
    }

    /// # Errors
    /// If the config couldn't be serialized or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = toml::to_string(self)
            .map_err(|e| AlarmError::Config(format!("couldn't serialize config: {e}")))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    /// Time between checks for due alarms, at least a second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Volume as a fraction for the audio sink.
    #[must_use]
    pub fn volume_fraction(&self) -> f32 {
        self.volume.clamp(0.0, 100.0) / 100.0
    }

    /// The configured sound, or `alarm_sound.mp3` in the sounds directory when none is set.
    #[must_use]
    pub fn sound_file(&self) -> Option<PathBuf> {
        self.sound
            .clone()
            .or_else(|| Self::sounds_path().map(|path| path.join(DEFAULT_SOUND)))
    }

    #[must_use]
    pub fn config_path() -> PathBuf {
        project_dirs().map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Without a home directory alarms are kept in the working directory.
    #[must_use]
    pub fn alarms_path() -> PathBuf {
        project_dirs().map_or_else(
            || PathBuf::from("alarms.json"),
            |dirs| dirs.data_dir().join("alarms.json"),
        )
    }

    #[must_use]
    pub fn sounds_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join("sounds"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}
