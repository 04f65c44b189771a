//! Background loop that sets off alarms when the clock reaches their time.

use std::{
    cell::Cell,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveTime;
use crossbeam_channel::{select, Receiver, Sender};
use log::{error, info};

use crate::{
    alarm::{Alarm, AlarmTime},
    communication::{notify, Event},
    error::Result,
    store::AlarmStore,
};

/// How often the store is checked for due alarms.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Longest gap between two checks that is caught up on. A bigger jump forward (through midnight)
/// means the clock was set back, and only the current minute is checked.
const MAX_CATCH_UP_MINUTES: i64 = 12 * 60;

/// Where the scheduler gets the current time of day from.
pub trait TimeSource {
    fn now(&self) -> NaiveTime;
}

/// The local wall clock, no timezone handling beyond what the system reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().naive_local().time()
    }
}

#[derive(Debug)]
pub struct Scheduler<C = LocalClock> {
    store: Arc<AlarmStore>,
    clock: C,
    period: Duration,
    events: Option<Sender<Event>>,
    last_checked: Cell<Option<AlarmTime>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Arc<AlarmStore>) -> Self {
        Self {
            store,
            clock: LocalClock,
            period: POLL_INTERVAL,
            events: None,
            last_checked: Cell::new(None),
        }
    }
}

impl<C: TimeSource> Scheduler<C> {
    #[must_use]
    pub fn with_clock<T: TimeSource>(self, clock: T) -> Scheduler<T> {
        Scheduler {
            store: self.store,
            clock,
            period: self.period,
            events: self.events,
            last_checked: self.last_checked,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sends [`Event::AlarmFired`] to `sender` for every alarm that goes off.
    #[must_use]
    pub fn with_events(mut self, sender: Sender<Event>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Runs one check against the scheduler's clock.
    /// Every minute since the previous check is covered, so a late tick can't skip an alarm.
    pub fn poll(&self) -> Vec<Alarm> {
        let now = AlarmTime::from_time(self.clock.now());
        let minutes = match self.last_checked.replace(Some(now)) {
            Some(last) => minutes_to_check(last, now),
            None => vec![now],
        };
        minutes
            .into_iter()
            .flat_map(|time| self.fire_due(time))
            .collect()
    }

    /// Sets off (and removes) every alarm for `time`, returning them in the order they were added.
    pub fn fire_due(&self, time: AlarmTime) -> Vec<Alarm> {
        let fired = self.store.take_due(time);
        for alarm in &fired {
            info!("alarm {} went off at {time} ({alarm})", alarm.id());
            notify(self.events.as_ref(), Event::AlarmFired(alarm.clone()));
        }
        fired
    }

    /// Starts checking on a background thread, right away and then once every period.
    ///
    /// # Errors
    /// If the thread couldn't be spawned.
    pub fn spawn(self) -> Result<SchedulerHandle>
    where
        C: Send + 'static,
    {
        let (stop, stopped) = crossbeam_channel::bounded(0);
        let thread = thread::Builder::new()
            .name("alarm-scheduler".to_string())
            .spawn(move || self.run(&stopped))?;
        Ok(SchedulerHandle {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    fn run(&self, stopped: &Receiver<()>) {
        info!("scheduler started, checking every {:?}", self.period);
        let ticker = crossbeam_channel::tick(self.period);
        loop {
            self.poll();
            select! {
                // the handle only ever hangs up
                recv(stopped) -> _ => break,
                recv(ticker) -> _ => {}
            }
        }
        info!("scheduler stopped");
    }
}

/// The minutes after `last` up to and including `now`.
fn minutes_to_check(last: AlarmTime, now: AlarmTime) -> Vec<AlarmTime> {
    let gap = now.minutes_since(last);
    if gap == 0 || gap > MAX_CATCH_UP_MINUTES {
        return vec![now];
    }
    (1..=gap).map(|minutes| last.plus_minutes(minutes)).collect()
}

/// Keeps the scheduler thread running, dropping it stops the thread.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops the scheduler and waits for its thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
