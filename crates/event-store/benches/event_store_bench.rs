use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    CancellationToken, EventId, EventStore, EventStoreExt, ExpectedStreamVersion,
    InMemoryEventStore, StreamEvent, StreamName, StreamReadPosition, Version,
};
use uuid::Uuid;

fn stream_name() -> StreamName {
    StreamName::new("ShoppingCart", Uuid::new_v4().to_string()).unwrap()
}

fn make_event(sequence: i64) -> StreamEvent {
    StreamEvent::builder()
        .event_id(EventId::from_uuid(Uuid::new_v4()))
        .event_type("ProductItemAdded")
        .aggregate_id("00000000-0000-0000-0000-000000000001")
        .aggregate_sequence_number(Version::new(sequence))
        .occurred_on(Utc::now())
        .payload_raw(serde_json::json!({
            "type": "ProductItemAdded",
            "data": { "product_id": "00000000-0000-0000-0000-000000000002", "quantity": 1 }
        }))
        .build()
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cancel = CancellationToken::new();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                store
                    .append_event(
                        &stream_name(),
                        make_event(1),
                        ExpectedStreamVersion::Any,
                        &cancel,
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_batch_10(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cancel = CancellationToken::new();

    c.bench_function("event_store/append_batch_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let events: Vec<StreamEvent> = (1..=10).map(make_event).collect();
                store
                    .append_events(&stream_name(), events, ExpectedStreamVersion::NoStream, &cancel)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_with_version_check(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cancel = CancellationToken::new();
    let store = InMemoryEventStore::new();
    let stream = stream_name();
    let mut expected = ExpectedStreamVersion::NoStream;

    c.bench_function("event_store/append_with_version_check", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = store
                    .append_event(&stream, make_event(1), expected, &cancel)
                    .await
                    .unwrap();
                expected = result.expected();
            });
        });
    });
}

fn bench_read_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cancel = CancellationToken::new();
    let store = InMemoryEventStore::new();
    let stream = stream_name();

    // Pre-populate with 100 events
    rt.block_on(async {
        let events: Vec<StreamEvent> = (1..=100).map(make_event).collect();
        store
            .append_events(&stream, events, ExpectedStreamVersion::NoStream, &cancel)
            .await
            .unwrap();
    });

    c.bench_function("event_store/read_stream_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let events = store
                    .read_stream(&stream, StreamReadPosition::START, &cancel)
                    .await
                    .unwrap();
                assert_eq!(events.len(), 100);
            });
        });
    });

    c.bench_function("event_store/read_stream_from_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .read_stream(&stream, StreamReadPosition::at(Version::new(50)), &cancel)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_batch_10,
    bench_append_with_version_check,
    bench_read_stream,
);
criterion_main!(benches);
