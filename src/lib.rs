//! # slotpool
//!
//! Fixed-capacity object pool for Rust: a preallocated, contiguous store of
//! objects handed out one slot at a time and returned for reuse without any
//! allocation after construction.
//!
//! ## Features
//!
//! - Storage and usage flags allocated once, never grown
//! - Round-robin or lowest-index free-slot search
//! - Opaque slot handles that reject foreign, double and stale returns
//! - Indexed access to every slot regardless of its state
//! - Mutex-guarded shared pool with RAII slot guards and async acquisition
//! - Metrics, Prometheus export and health reporting
//!
//! ## Quick Start
//!
//! ```rust
//! use slotpool::BitPool;
//!
//! let mut pool = BitPool::<[f32; 3]>::new(5);
//!
//! let handle = pool.get_object().unwrap();
//! pool.get_mut(handle).unwrap()[0] = 1.5;
//! assert_eq!(pool.objects_in_use(), 1);
//!
//! assert!(pool.return_object(handle));
//! assert!(!pool.return_object(handle));
//! assert_eq!(pool.objects_in_use(), 0);
//! ```

mod pool;
mod shared;
mod config;
mod metrics;
mod health;
mod errors;

pub use pool::{BitPool, SlotHandle};
pub use shared::{SharedBitPool, PooledSlot};
pub use config::{PoolConfiguration, ScanPolicy};
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use health::HealthStatus;
pub use errors::{PoolError, PoolResult};
