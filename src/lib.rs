#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Medicine reminder alarms: a persisted list of one shot alarms and a scheduler that sets them
//! off when the clock reaches their time.

pub mod alarm;
/// sound played while an alarm is going off
pub mod audio;
pub mod communication;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;

pub use alarm::{Alarm, AlarmId, AlarmTime};
pub use communication::Event;
pub use error::{AlarmError, Result};
pub use scheduler::{LocalClock, Scheduler, SchedulerHandle, TimeSource};
pub use store::AlarmStore;
