use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rust_producer_consumer::prelude::*;
use rust_producer_consumer::queue::NoopObserver;
use std::sync::Arc;
use std::thread;

fn quiet_queue(capacity: usize) -> Arc<BoundedQueue<u64>> {
    Arc::new(
        BoundedQueue::with_observer(capacity, Arc::new(NoopObserver))
            .expect("Failed to create queue"),
    )
}

fn benchmark_uncontended_put_get(c: &mut Criterion) {
    let queue = quiet_queue(1024);

    c.bench_function("uncontended_put_get", |b| {
        b.iter(|| {
            queue.put(black_box(42u64)).expect("put failed");
            black_box(queue.get().expect("get failed"));
        });
    });
}

fn benchmark_spsc_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_transfer_10k");
    group.throughput(Throughput::Elements(10_000));

    for capacity in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter_batched(
                || quiet_queue(capacity),
                |queue| {
                    queue.register_producer().expect("register failed");
                    let q = Arc::clone(&queue);
                    let producer = thread::spawn(move || {
                        for i in 0..10_000u64 {
                            q.put(i).expect("put failed");
                        }
                        q.producer_done();
                    });

                    let mut sum = 0u64;
                    while let Some(v) = queue.get().expect("get failed") {
                        sum = sum.wrapping_add(v);
                    }
                    producer.join().expect("producer panicked");
                    black_box(sum);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_2k_items");
    group.throughput(Throughput::Elements(2_000));
    group.sample_size(20);

    for (producers, consumers) in [(1usize, 1usize), (2, 2), (4, 4)] {
        let id = format!("{}p_{}c", producers, consumers);
        group.bench_function(id, |b| {
            b.iter(|| {
                let config = PipelineConfig::new(2_000, 32)
                    .with_producers(producers)
                    .with_consumers(consumers);
                let report = Pipeline::new(config)
                    .expect("valid config")
                    .with_observer(Arc::new(NoopObserver))
                    .run()
                    .expect("pipeline failed");
                black_box(report.destination_size);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_uncontended_put_get,
    benchmark_spsc_transfer,
    benchmark_pipeline
);
criterion_main!(benches);
