use std::{fs, sync::Arc};

use pill_clock::{AlarmError, AlarmStore, Scheduler};
use serde_json::{json, Value};

fn read_json(store: &AlarmStore) -> Value {
    serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap()
}

#[test]
fn aspirin_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AlarmStore::open(dir.path().join("alarms.json")));
    assert!(store.is_empty());

    store.add("Aspirin", "1 pill", "08:00").unwrap();
    assert_eq!(
        read_json(&store),
        json!([{"name": "Aspirin", "dose": "1 pill", "time": "08:00"}])
    );

    let scheduler = Scheduler::new(Arc::clone(&store));
    let fired = scheduler.fire_due("08:00".parse().unwrap());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].name, "Aspirin");
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
}

#[test]
fn save_of_load_keeps_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    {
        let store = AlarmStore::open(&path);
        store.add("Aspirin", "1 pill", "08:00").unwrap();
        store.add("Metformin", "500 mg", "19:30").unwrap();
        store.add("Aspirin", "1 pill", "08:00").unwrap();
        store.add("Ωmega-3", "", "00:00").unwrap();
    }
    let before = fs::read(&path).unwrap();

    let reopened = AlarmStore::open(&path);
    assert_eq!(reopened.len(), 4);
    reopened.save().unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn hand_written_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    let contents = "[\n    {\n        \"name\": \"Aspirin\",\n        \"dose\": \"1 pill\",\n        \"time\": \"08:00\"\n    }\n]";
    fs::write(&path, contents).unwrap();

    let store = AlarmStore::open(&path);
    store.save().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), contents);
}

#[test]
fn empty_store_saves_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = AlarmStore::open(dir.path().join("data").join("alarms.json"));
    store.save().unwrap();
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
}

#[test]
fn malformed_times_leave_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = AlarmStore::open(dir.path().join("alarms.json"));
    let kept = store.add("Aspirin", "1 pill", "08:00").unwrap();

    for time in ["25:61", "8:00", "", "noon", "12:5"] {
        let err = store.add("Ibuprofen", "200 mg", time).unwrap_err();
        assert!(matches!(err, AlarmError::Validation(_)), "{time:?}: {err}");
    }
    assert_eq!(store.alarms(), vec![kept]);
    assert_eq!(AlarmStore::load(store.path()).len(), 1);
}

#[test]
fn well_formed_times_are_appended_last() {
    let dir = tempfile::tempdir().unwrap();
    let store = AlarmStore::open(dir.path().join("alarms.json"));
    for hour in 0..24 {
        for minute in [0, 1, 30, 59] {
            let time = format!("{hour:02}:{minute:02}");
            let alarm = store.add("Pill", "1", &time).unwrap();
            assert_eq!(store.alarms().last(), Some(&alarm));
            assert_eq!(alarm.time.to_string(), time);
        }
    }
    assert_eq!(AlarmStore::load(store.path()).len(), 24 * 4);
}
