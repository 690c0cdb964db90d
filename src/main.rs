// slotpool - fixed-capacity object pool
// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use slotpool::{BitPool, PoolConfiguration, ScanPolicy};

#[derive(Debug, Default)]
struct Particle {
    position: [f32; 2],
    velocity: [f32; 2],
}

fn main() {
    env_logger::init();

    println!("=== slotpool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_scan_policy(ScanPolicy::RoundRobin);
    let mut pool = BitPool::<Particle>::with_config(config);

    println!("Quick Demo:");
    let mut live = Vec::new();
    while let Some(handle) = pool.try_get_object() {
        if let Ok(particle) = pool.get_mut(handle) {
            particle.velocity = [1.0, 0.5];
            particle.position[0] += particle.velocity[0];
        }
        live.push(handle);
    }
    println!("  Spawned {} particles, pool exhausted: {}", live.len(), pool.is_exhausted());

    let returned = live.iter().filter(|handle| pool.return_object(**handle)).count();
    println!("  Returned {returned}, in use after return: {}", pool.objects_in_use());
    if let Some(first) = live.first() {
        println!("  Second return accepted: {}", pool.return_object(*first));
    }

    if let Some(particle) = pool.get_object_at(0) {
        println!("  Slot 0 keeps its last value: {particle:?}");
    }
}
