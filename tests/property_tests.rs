//! Property-based tests for rust_producer_consumer using proptest

use proptest::prelude::*;
use rust_producer_consumer::prelude::*;
use rust_producer_consumer::queue::{NoopObserver, Occupancy, MAX_CAPACITY};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn quiet_queue<T: Send + 'static>(capacity: usize) -> BoundedQueue<T> {
    BoundedQueue::with_observer(capacity, Arc::new(NoopObserver)).expect("Failed to create queue")
}

#[derive(Clone, Debug)]
enum Op {
    Put(u32),
    Get,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u32>().prop_map(Op::Put), Just(Op::Get)]
}

// ============================================================================
// Single-threaded laws, checked against a VecDeque model
// ============================================================================

proptest! {
    /// Non-blocking operations behave like a bounded VecDeque, and the
    /// counters reconcile after every step
    #[test]
    fn test_matches_bounded_model(
        capacity in 1usize..16,
        ops in prop::collection::vec(op(), 0..200)
    ) {
        let queue = quiet_queue::<u32>(capacity);
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(v) => {
                    let result = queue.try_put(v);
                    if model.len() < capacity {
                        prop_assert!(result.is_ok());
                        model.push_back(v);
                    } else {
                        let full = matches!(result, Err(PipelineError::QueueFull { .. }));
                        prop_assert!(full);
                    }
                }
                Op::Get => {
                    prop_assert_eq!(queue.try_get(), model.pop_front());
                }
            }

            let stats = queue.stats();
            prop_assert!(stats.current_size <= capacity);
            prop_assert_eq!(stats.current_size, model.len());
            prop_assert_eq!(stats.produced - stats.consumed, stats.current_size as u64);
            prop_assert_eq!(stats.in_transit, stats.current_size as u64);
        }
    }

    /// Absent items are rejected without touching the queue
    #[test]
    fn test_absent_item_rejected(capacity in 1usize..8, prefill in 0usize..8) {
        let queue = quiet_queue::<u32>(capacity);
        for i in 0..prefill.min(capacity) {
            queue.put(i as u32).expect("put should succeed");
        }
        let before = queue.stats();

        let result = queue.put(None::<u32>);
        let invalid = matches!(result, Err(PipelineError::InvalidArgument { .. }));
        prop_assert!(invalid);
        prop_assert_eq!(queue.stats(), before);
    }

    /// Every capacity in range is accepted; zero and oversized are not
    #[test]
    fn test_capacity_validation(capacity in 0usize..4096, excess in 1usize..1000) {
        let result = BoundedQueue::<u8>::new(capacity);
        if capacity == 0 {
            let invalid = matches!(result, Err(PipelineError::InvalidConfig { .. }));
            prop_assert!(invalid);
        } else {
            prop_assert_eq!(result.map(|q| q.capacity()).ok(), Some(capacity));
        }

        let oversized = BoundedQueue::<u8>::new(MAX_CAPACITY + excess);
        let invalid = matches!(oversized, Err(PipelineError::InvalidConfig { .. }));
        prop_assert!(invalid);
    }
}

// ============================================================================
// Threaded laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// One producer, one consumer: output equals input, in order
    #[test]
    fn test_fifo_single_producer_single_consumer(
        capacity in 1usize..8,
        items in prop::collection::vec(any::<u32>(), 0..300)
    ) {
        let queue = Arc::new(quiet_queue::<u32>(capacity));
        queue.register_producer().expect("register should succeed");

        let q = Arc::clone(&queue);
        let input = items.clone();
        let producer = thread::spawn(move || {
            for v in input {
                q.put(v).expect("put should succeed");
            }
            q.producer_done();
        });

        let mut output = Vec::with_capacity(items.len());
        while let Some(v) = queue.get().expect("get should succeed") {
            output.push(v);
        }
        producer.join().expect("producer panicked");

        prop_assert_eq!(output, items);
    }

    /// Many producers and consumers: nothing lost, nothing duplicated, and
    /// the buffer never exceeds capacity
    #[test]
    fn test_conservation_under_contention(
        capacity in 1usize..6,
        producers in 1usize..4,
        consumers in 1usize..4,
        per_producer in 0u64..60
    ) {
        let peak = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&peak);
        let observer = Arc::new(move |o: &Occupancy| {
            p.fetch_max(o.size, Ordering::Relaxed);
        });
        let queue = Arc::new(
            BoundedQueue::<u64>::with_observer(capacity, observer).expect("Failed to create queue"),
        );
        let destination: Arc<Container<u64>> = Arc::new(Container::new());

        let mut producer_workers = Vec::new();
        for i in 0..producers as u64 {
            let source: Arc<Container<u64>> =
                Arc::new((i * per_producer..(i + 1) * per_producer).collect());
            producer_workers.push(
                ProducerWorker::new(&format!("P{}", i), source, Arc::clone(&queue), Duration::ZERO)
                    .expect("Failed to create producer"),
            );
        }

        let mut handles: Vec<WorkerHandle> = producer_workers
            .into_iter()
            .map(|w| w.spawn().expect("Failed to spawn producer"))
            .collect();
        let total = producers as u64 * per_producer;
        for i in 0..consumers {
            handles.push(
                ConsumerWorker::new(
                    &format!("C{}", i),
                    Arc::clone(&queue),
                    destination.clone(),
                    total,
                    Duration::ZERO,
                )
                .expect("Failed to create consumer")
                .spawn()
                .expect("Failed to spawn consumer"),
            );
        }
        for h in handles {
            let report = h.join().expect("worker thread died");
            prop_assert_eq!(report.state, WorkerState::Finished);
        }

        let mut received = destination.snapshot();
        received.sort_unstable();
        prop_assert_eq!(received, (0..total).collect::<Vec<_>>());

        let stats = queue.stats();
        prop_assert!(stats.is_drained());
        prop_assert_eq!(stats.produced, total);
        prop_assert!(peak.load(Ordering::Relaxed) <= capacity);
    }

    /// Consumer budgets from any config add up to exactly the item count
    #[test]
    fn test_pipeline_delivers_everything(
        num_items in 0u64..120,
        capacity in 1usize..10,
        producers in 1usize..4,
        consumers in 1usize..4
    ) {
        let config = PipelineConfig::new(num_items, capacity)
            .with_producers(producers)
            .with_consumers(consumers);
        let report = Pipeline::new(config)
            .expect("valid config")
            .with_observer(Arc::new(NoopObserver))
            .run()
            .expect("pipeline run failed");

        prop_assert!(report.is_complete());
        prop_assert_eq!(report.destination_size as u64, num_items);
        prop_assert_eq!(report.queue.produced, num_items);
    }
}
