use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use sitecheck_core::query::query_history;
use sitecheck_core::stats::compute_statistics;
use sitecheck_core::{Page, Period, RecordFilter, RecordStore, StatisticsQuery};
use sitecheck_records::{Detection, NewDetectionEvent};
use std::hint::black_box;

fn full_store() -> RecordStore {
    let store = RecordStore::new();
    let now = Utc::now();
    let sites = ["North Yard", "Harbour Depot", "Lot 7", "Tower B"];
    let classes = ["helmet", "vest", "no-helmet", "no-vest", "person"];
    for i in 0..1000i64 {
        let detections = (0..(i % 6) as usize)
            .map(|j| Detection::labeled(classes[j % classes.len()]))
            .collect();
        let new = NewDetectionEvent::new(format!("img-{i}.jpg"), detections)
            .with_site(sites[(i % 4) as usize])
            .with_timestamp(now - Duration::minutes(i * 97));
        store.insert(new).unwrap();
    }
    store
}

fn bench_statistics_full_store(c: &mut Criterion) {
    let records = full_store().list();
    let query = StatisticsQuery {
        period: Period::Quarter,
        ..Default::default()
    };

    c.bench_function("statistics_1000_records", |b| {
        b.iter(|| compute_statistics(black_box(&records), &query, Utc::now()));
    });
}

fn bench_history_page(c: &mut Criterion) {
    let records = full_store().list();
    let filter = RecordFilter::from_params(None, None, Some("yard"), None).unwrap();

    c.bench_function("history_filtered_page", |b| {
        b.iter(|| query_history(black_box(&records), &filter, Page::new(50, 100)));
    });
}

criterion_group!(benches, bench_statistics_full_store, bench_history_page);
criterion_main!(benches);
