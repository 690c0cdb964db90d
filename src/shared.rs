//! Lock-guarded pool shared between threads and async tasks

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::PoolMetrics;
use crate::pool::{BitPool, SlotHandle};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

struct Shared<T> {
    pool: Mutex<BitPool<T>>,
    released: Notify,
}

/// A slot that automatically returns to the pool when dropped
pub struct PooledSlot<T> {
    handle: SlotHandle,
    detached: bool,
    shared: Arc<Shared<T>>,
}

impl<T> PooledSlot<T> {
    fn new(handle: SlotHandle, shared: Arc<Shared<T>>) -> Self {
        Self {
            handle,
            detached: false,
            shared,
        }
    }

    /// Handle of the held slot
    pub fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// Run `f` against the held object.
    ///
    /// `f` runs under the pool lock. Calling back into the same pool from `f`,
    /// even `objects_in_use()`, deadlocks.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> PoolResult<R> {
        let pool = self.shared.pool.lock();
        pool.get_exact(self.handle).map(f)
    }

    /// Run `f` against the held object mutably.
    ///
    /// Same locking rules as [`with()`][Self::with].
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> PoolResult<R> {
        let mut pool = self.shared.pool.lock();
        pool.get_mut_exact(self.handle).map(f)
    }

    /// Keep the slot in use after the guard is gone.
    ///
    /// The caller becomes responsible for returning the handle through
    /// [`SharedBitPool::with_pool()`].
    pub fn into_handle(mut self) -> SlotHandle {
        self.detached = true;
        self.handle
    }
}

impl<T> fmt::Debug for PooledSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSlot")
            .field("handle", &self.handle)
            .field("detached", &self.detached)
            .finish()
    }
}

impl<T> Drop for PooledSlot<T> {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        // Generations are always compared here, so a guard whose slot was
        // released out of band cannot free the next occupant.
        if self.shared.pool.lock().release_exact(self.handle).is_ok() {
            self.shared.released.notify_one();
        }
    }
}

/// Thread-safe wrapper around a [`BitPool`].
///
/// Every operation takes one lock around the whole pool. Slots are handed out
/// as [`PooledSlot`] guards that return themselves on drop.
///
/// # Examples
///
/// ```
/// use slotpool::SharedBitPool;
///
/// let pool = SharedBitPool::<Vec<u8>>::new(2);
/// {
///     let slot = pool.get_object().unwrap();
///     slot.with_mut(|buffer| buffer.push(1)).unwrap();
///     assert_eq!(pool.objects_in_use(), 1);
/// }
/// assert_eq!(pool.objects_in_use(), 0);
/// ```
pub struct SharedBitPool<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SharedBitPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> From<BitPool<T>> for SharedBitPool<T> {
    fn from(pool: BitPool<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool: Mutex::new(pool),
                released: Notify::new(),
            }),
        }
    }
}

impl<T: Default> SharedBitPool<T> {
    /// Create a shared pool of `capacity` default-constructed objects
    pub fn new(capacity: usize) -> Self {
        BitPool::new(capacity).into()
    }

    /// Create a shared pool from a configuration
    pub fn with_config(config: PoolConfiguration) -> Self {
        BitPool::with_config(config).into()
    }

    /// Create a shared pool from a configuration, reporting allocation failure
    pub fn try_with_config(config: PoolConfiguration) -> PoolResult<Self> {
        BitPool::try_with_config(config).map(Self::from)
    }
}

impl<T> SharedBitPool<T> {
    /// Get a slot from the pool
    pub fn get_object(&self) -> PoolResult<PooledSlot<T>> {
        let handle = self.shared.pool.lock().get_object()?;
        Ok(PooledSlot::new(handle, Arc::clone(&self.shared)))
    }

    /// Try to get a slot without an error
    pub fn try_get_object(&self) -> Option<PooledSlot<T>> {
        self.get_object().ok()
    }

    /// Get a slot, waiting for one to be returned if the pool is exhausted.
    ///
    /// Gives up with [`PoolError::Timeout`] after the configured operation
    /// timeout; waits indefinitely when none is configured.
    pub async fn get_object_async(&self) -> PoolResult<PooledSlot<T>> {
        let timeout = self.shared.pool.lock().config().operation_timeout;

        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.wait_for_slot())
                .await
                .map_err(|_| PoolError::Timeout(timeout)),
            None => Ok(self.wait_for_slot().await),
        }
    }

    /// Try to get a slot asynchronously
    pub async fn try_get_object_async(&self) -> Option<PooledSlot<T>> {
        self.get_object_async().await.ok()
    }

    async fn wait_for_slot(&self) -> PooledSlot<T> {
        loop {
            // Created before the attempt so a release in between is not missed.
            let released = self.shared.released.notified();
            if let Some(slot) = self.try_get_object() {
                return slot;
            }
            log::trace!("waiting for a slot to be returned");
            released.await;
        }
    }

    /// Run `f` with exclusive access to the underlying pool.
    ///
    /// Dropping a [`PooledSlot`] of the same pool inside `f` deadlocks.
    pub fn with_pool<R>(&self, f: impl FnOnce(&mut BitPool<T>) -> R) -> R {
        let mut pool = self.shared.pool.lock();
        let available_before = pool.available_count();
        let result = f(&mut pool);
        let available_after = pool.available_count();
        drop(pool);

        for _ in available_before..available_after {
            self.shared.released.notify_one();
        }
        result
    }

    /// Number of slots currently in use
    pub fn objects_in_use(&self) -> usize {
        self.shared.pool.lock().objects_in_use()
    }

    /// Fixed number of slots in the pool
    pub fn max_objects(&self) -> usize {
        self.shared.pool.lock().max_objects()
    }

    /// Number of free slots
    pub fn available_count(&self) -> usize {
        self.shared.pool.lock().available_count()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.shared.pool.lock().get_metrics()
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.shared.pool.lock().export_metrics()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        self.shared.pool.lock().export_metrics_prometheus(pool_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        self.shared.pool.lock().get_health_status()
    }
}
