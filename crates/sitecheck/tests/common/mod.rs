use chrono::{DateTime, Duration, Utc};
use sitecheck_core::RecordStore;
use sitecheck_records::{Detection, NewDetectionEvent};

pub fn now() -> DateTime<Utc> {
    "2025-06-10T12:00:00Z".parse().unwrap()
}

pub fn labels(classes: &[&str]) -> Vec<Detection> {
    classes.iter().map(|c| Detection::labeled(*c)).collect()
}

pub fn new_event(
    filename: &str,
    site: Option<&str>,
    hours_ago: i64,
    classes: &[&str],
) -> NewDetectionEvent {
    let mut new = NewDetectionEvent::new(filename, labels(classes))
        .with_timestamp(now() - Duration::hours(hours_ago));
    new.site = site.map(str::to_string);
    new
}

/// Six inspections over three days across two named sites and one unnamed
pub fn sample_store() -> RecordStore {
    let store = RecordStore::new();
    let events = [
        new_event("gate-1.jpg", Some("North Yard"), 50, &["helmet", "vest"]),
        new_event("gate-2.jpg", Some("North Yard"), 49, &["helmet", "no-vest"]),
        new_event("crane.jpg", Some("Harbour Depot"), 26, &["no-helmet", "vest", "vest"]),
        new_event("scaffold.jpg", None, 25, &["helmet"]),
        new_event("gate-3.jpg", Some("North Yard"), 2, &["helmet", "helmet", "vest", "vest"]),
        new_event("loading.jpg", Some("Harbour Depot"), 1, &[]),
    ];
    for e in events {
        store.insert(e).unwrap();
    }
    store
}
