use crossbeam_channel::Sender;

use crate::alarm::Alarm;

/// Notifications sent from the store and scheduler to whatever is showing alarms to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// the alarm went off and has been removed from the store
    AlarmFired(Alarm),
    AlarmAdded(Alarm),
    /// an add was refused, carries the reason
    AlarmRejected(String),
    /// snapshot of the alarms after any change
    AlarmsChanged(Vec<Alarm>),
    PersistenceFailed(String),
}

/// Sends `event` if anyone is listening, a hung up receiver is not an error.
pub(crate) fn notify(sender: Option<&Sender<Event>>, event: Event) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            log::debug!("event receiver hung up");
        }
    }
}
