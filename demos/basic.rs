//! Basic usage examples for BitPool

use slotpool::{BitPool, PoolConfiguration, PoolError, ScanPolicy};

#[derive(Debug, Default, Clone)]
struct Bullet {
    x: f32,
    y: f32,
    alive: bool,
}

fn main() {
    println!("=== slotpool - Basic Examples ===\n");

    // Example 1: Acquire and return
    simple_pool();

    // Example 2: Pool with configuration
    configured_pool();

    // Example 3: Rejected returns
    rejected_returns();

    // Example 4: Index-based bulk return
    bulk_return();

    // Example 5: Metrics and health
    metrics_and_health();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let mut pool = BitPool::<Bullet>::new(3);

    let handle = pool.get_object().unwrap();
    if let Ok(bullet) = pool.get_mut(handle) {
        bullet.alive = true;
        bullet.x = 10.0;
    }
    println!("   Got slot {} -> {:?}", handle.index(), pool.get(handle).unwrap());

    pool.return_object(handle);
    println!("   In use after return: {}\n", pool.objects_in_use());
}

fn configured_pool() {
    println!("2. Configured Pool:");

    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_scan_policy(ScanPolicy::LowestFree);

    let mut pool = BitPool::<Bullet>::with_config(config);

    let first = pool.get_object().unwrap();
    let _second = pool.get_object().unwrap();
    pool.return_object(first);

    let reused = pool.get_object().unwrap();
    println!("   Lowest free slot reused: {}", reused.index());
    println!("   Available: {}\n", pool.available_count());
}

fn rejected_returns() {
    println!("3. Rejected Returns:");
    let mut pool = BitPool::<Bullet>::new(2);
    let mut other = BitPool::<Bullet>::new(2);

    let handle = pool.get_object().unwrap();
    pool.return_object(handle);

    match pool.release(handle) {
        Err(PoolError::NotInUse) => println!("   Double return rejected"),
        result => println!("   Unexpected: {result:?}"),
    }

    let foreign = other.get_object().unwrap();
    match pool.release(foreign) {
        Err(err) => println!("   Foreign handle rejected: {err}"),
        Ok(()) => println!("   Unexpected success"),
    }

    while pool.try_get_object().is_some() {}
    match pool.get_object() {
        Err(PoolError::PoolExhausted) => {
            println!("   Pool exhausted at {} slots\n", pool.max_objects())
        }
        result => println!("   Unexpected: {result:?}\n"),
    }
}

fn bulk_return() {
    println!("4. Index-Based Bulk Return:");
    let mut pool = BitPool::<Bullet>::new(8);
    while pool.try_get_object().is_some() {}

    for index in (0..pool.max_objects()).step_by(2) {
        if let Ok(handle) = pool.handle_at(index) {
            pool.return_object(handle);
        }
    }
    println!("   In use after freeing even slots: {}", pool.objects_in_use());
    println!("   Released the rest: {}\n", pool.release_all());
}

fn metrics_and_health() {
    println!("5. Metrics and Health:");
    let mut pool = BitPool::<Bullet>::new(5);

    for _ in 0..5 {
        pool.get_object().unwrap();
    }
    let _ = pool.get_object();

    let health = pool.get_health_status();
    println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
    println!("   Utilization: {:.1}%", health.utilization * 100.0);
    for warning in &health.warnings {
        println!("   Warning: {warning}");
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }

    if let Ok(output) = pool.export_metrics_prometheus("bullets", None) {
        println!("\n   Prometheus:\n{output}");
    }
}
