//! Producer-consumer demo
//!
//! One producer and one slower consumer move 20 items through a queue of 5,
//! so the queue fills up and the producer has to wait.
//!
//! Run with: RUST_LOG=debug cargo run --example producer_consumer [config.json]

use rust_producer_consumer::prelude::*;
use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    println!("=== Producer-Consumer Pattern Demo ===\n");
    println!("Configuration:");
    println!("  Items to transfer: {}", config.num_items);
    println!("  Queue capacity: {}", config.queue_capacity);
    println!("  Producers: {}", config.producers);
    println!("  Consumers: {}", config.consumers);
    println!("  Producer delay: {}ms", config.producer_delay.as_millis());
    println!("  Consumer delay: {}ms", config.consumer_delay.as_millis());
    if config.consumer_delay > config.producer_delay {
        println!("  (Consumer is slower - expect queue to fill up)");
    }
    println!();

    let report = Pipeline::new(config)?.run()?;

    println!("\n{}", report);

    if report.is_complete() {
        println!("\nVerification: SUCCESS");
        println!("All {} items successfully transferred!", report.items_requested);
    } else {
        println!("\nVerification: FAILED");
        println!(
            "ERROR: Expected {} items in destination, got {}",
            report.items_requested, report.destination_size
        );
    }
    println!("Throughput: {:.1} items/s", report.throughput());

    Ok(())
}
