use common::EventContext;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Aggregate, AggregateFactory, AggregateStore};
use event_store::{CancellationToken, ExpectedStreamVersion, InMemoryEventStore};
use test_support::{ShoppingCart, ShoppingCartEvent};
use uuid::Uuid;

fn cart_with_items(ctx: &EventContext, items: usize) -> ShoppingCart {
    let mut cart = ShoppingCart::create(Uuid::new_v4(), ctx);
    for _ in 0..items {
        cart.add_item(Uuid::new_v4(), ctx).unwrap();
    }
    cart
}

fn bench_apply_event(c: &mut Criterion) {
    let ctx = EventContext::system();

    c.bench_function("domain/create_and_add_10_items", |b| {
        b.iter(|| cart_with_items(&ctx, 10));
    });
}

fn bench_rehydrate(c: &mut Criterion) {
    let ctx = EventContext::system();
    let cart = cart_with_items(&ctx, 100);
    let history: Vec<ShoppingCartEvent> = cart
        .uncommitted_events()
        .iter()
        .map(|record| record.data.clone())
        .collect();

    c.bench_function("domain/rehydrate_101_events", |b| {
        b.iter(|| AggregateFactory::<ShoppingCart>::rehydrate(&history));
    });
}

fn bench_store_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = EventContext::system();
    let cancel = CancellationToken::new();

    c.bench_function("domain/store_and_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = AggregateStore::new(InMemoryEventStore::new());
                let mut cart = cart_with_items(&ctx, 5);
                store
                    .store(&mut cart, ExpectedStreamVersion::NoStream, &cancel)
                    .await
                    .unwrap();
                let id = cart.id().unwrap();
                store.get::<ShoppingCart>(&id, &cancel).await.unwrap();
            });
        });
    });
}

fn bench_load_long_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = EventContext::system();
    let cancel = CancellationToken::new();
    let store = AggregateStore::new(InMemoryEventStore::new());

    // Pre-populate with a 500-event stream
    let id = rt.block_on(async {
        let mut cart = cart_with_items(&ctx, 499);
        store
            .store(&mut cart, ExpectedStreamVersion::NoStream, &cancel)
            .await
            .unwrap();
        cart.id().unwrap()
    });

    c.bench_function("domain/get_500_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get::<ShoppingCart>(&id, &cancel).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_apply_event,
    bench_rehydrate,
    bench_store_cycle,
    bench_load_long_stream,
);
criterion_main!(benches);
