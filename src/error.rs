use crate::alarm::AlarmId;

/// Everything that can go wrong while managing alarms.
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    /// The alarm time is not a valid `HH:MM` string.
    #[error("invalid time {0:?}, please enter a valid time in HH:MM format")]
    Validation(String),

    /// No alarm with this id is stored (it may already have fired).
    #[error("alarm {0} not found")]
    NotFound(AlarmId),

    /// The alarm list couldn't be written to disk.
    #[error("couldn't save alarms: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AlarmError>;
