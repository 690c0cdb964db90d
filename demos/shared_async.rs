//! Shared pool usage from threads and async tasks

use slotpool::{PoolConfiguration, SharedBitPool};
use std::thread;
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("=== slotpool - Shared and Async Examples ===\n");

    // Example 1: Threads sharing one pool
    threaded();

    // Example 2: Waiting for a slot
    wait_for_slot().await;

    // Example 3: Timeout
    timeout().await;
}

fn threaded() {
    println!("1. Threads:");
    let pool = SharedBitPool::<Vec<u8>>::new(4);

    let workers: Vec<_> = (0..4)
        .map(|id| {
            let pool = pool.clone();
            thread::spawn(move || {
                if let Some(slot) = pool.try_get_object() {
                    let _ = slot.with_mut(|buffer| buffer.push(id));
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }

    let metrics = pool.get_metrics();
    println!("   Acquired: {}, in use now: {}\n", metrics.total_acquired, metrics.objects_in_use);
}

async fn wait_for_slot() {
    println!("2. Waiting for a Slot:");
    let pool = SharedBitPool::<u32>::new(1);
    let held = pool.get_object().unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);
    });

    match pool.get_object_async().await {
        Ok(slot) => println!("   Got slot {} after release\n", slot.handle().index()),
        Err(err) => println!("   Failed: {err}\n"),
    }
}

async fn timeout() {
    println!("3. Timeout:");
    let config = PoolConfiguration::new()
        .with_capacity(1)
        .with_timeout(Duration::from_millis(100));
    let pool = SharedBitPool::<u32>::with_config(config);
    let _held = pool.get_object().unwrap();

    match pool.get_object_async().await {
        Ok(_) => println!("   Unexpected success"),
        Err(err) => println!("   {err}"),
    }
}
