//! Core fixed-capacity pool implementation

use crate::config::{PoolConfiguration, ScanPolicy};
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;
use crate::metrics::{MetricsTracker, PoolMetrics};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

/// Opaque reference to one slot of a [`BitPool`].
///
/// Handed out by [`BitPool::get_object()`] and consumed by
/// [`BitPool::return_object()`]. A handle remembers which pool created it and
/// which occupant of the slot it was issued to, so handles from another pool
/// or from an earlier occupant are rejected instead of freeing the wrong slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    pool_id: usize,
    index: usize,
    generation: u32,
}

impl SlotHandle {
    /// Zero-based index of the slot in the pool's storage
    pub fn index(&self) -> usize {
        self.index
    }

    /// Occupant counter of the slot at the time the handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Fixed-capacity pool of preallocated objects.
///
/// All storage is allocated once at construction. Acquiring a slot flips its
/// usage flag and hands out a [`SlotHandle`]; returning the handle flips the
/// flag back. Values are never reset or dropped on return, a reacquired slot
/// still holds whatever the previous user left in it.
///
/// The pool is not synchronized. Wrap it in a [`SharedBitPool`][crate::SharedBitPool]
/// when several threads need it.
///
/// # Examples
///
/// ```
/// use slotpool::BitPool;
///
/// let mut pool = BitPool::<u64>::new(2);
///
/// let first = pool.get_object().unwrap();
/// let second = pool.get_object().unwrap();
/// assert_ne!(first, second);
/// assert!(pool.try_get_object().is_none());
///
/// *pool.get_mut(first).unwrap() = 7;
/// assert!(pool.return_object(first));
/// assert!(!pool.return_object(first));
/// assert_eq!(pool.objects_in_use(), 1);
/// ```
#[derive(Debug)]
pub struct BitPool<T> {
    storage: Box<[T]>,
    in_use: Box<[bool]>,
    generations: Box<[u32]>,
    used_count: usize,
    scan_cursor: usize,
    pool_id: usize,
    config: PoolConfiguration,
    metrics: MetricsTracker,
}

impl<T: Default> BitPool<T> {
    /// Create a pool of `capacity` default-constructed objects
    pub fn new(capacity: usize) -> Self {
        Self::with_config(PoolConfiguration::new().with_capacity(capacity))
    }

    /// Create a pool from a configuration.
    ///
    /// Allocation failure aborts the process like any other infallible
    /// allocation. Use [`try_with_config()`][Self::try_with_config] to get an
    /// error instead.
    pub fn with_config(config: PoolConfiguration) -> Self {
        let capacity = config.capacity;
        let storage = std::iter::repeat_with(T::default).take(capacity).collect();

        Self::assemble(
            storage,
            vec![false; capacity].into_boxed_slice(),
            vec![0; capacity].into_boxed_slice(),
            config,
        )
    }

    /// Create a pool from a configuration, reporting allocation failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::{BitPool, PoolConfiguration, PoolError};
    ///
    /// let config = PoolConfiguration::new().with_capacity(usize::MAX);
    /// let result = BitPool::<u64>::try_with_config(config);
    ///
    /// assert!(matches!(result, Err(PoolError::AllocationFailed { .. })));
    /// ```
    pub fn try_with_config(config: PoolConfiguration) -> PoolResult<Self> {
        let capacity = config.capacity;
        let storage = try_filled(capacity, T::default)?;
        let in_use = try_filled(capacity, || false)?;
        let generations = try_filled(capacity, || 0)?;

        Ok(Self::assemble(storage, in_use, generations, config))
    }
}

impl<T> BitPool<T> {
    /// Create a pool that owns the given objects.
    ///
    /// The capacity is the number of objects; `config.capacity` is overridden.
    pub fn from_objects(objects: Vec<T>, config: PoolConfiguration) -> Self {
        let capacity = objects.len();

        Self::assemble(
            objects.into_boxed_slice(),
            vec![false; capacity].into_boxed_slice(),
            vec![0; capacity].into_boxed_slice(),
            config.with_capacity(capacity),
        )
    }

    fn assemble(
        storage: Box<[T]>,
        in_use: Box<[bool]>,
        generations: Box<[u32]>,
        config: PoolConfiguration,
    ) -> Self {
        let pool_id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("created pool {pool_id} with {} slots", storage.len());

        Self {
            storage,
            in_use,
            generations,
            used_count: 0,
            scan_cursor: 0,
            pool_id,
            config,
            metrics: MetricsTracker::new(),
        }
    }

    /// Acquire a free slot and mark it in use
    pub fn get_object(&mut self) -> PoolResult<SlotHandle> {
        let capacity = self.max_objects();
        if self.used_count >= capacity {
            self.metrics.exhausted_events += 1;
            log::debug!("pool {} exhausted at {capacity} slots", self.pool_id);
            return Err(PoolError::PoolExhausted);
        }

        let start = match self.config.scan_policy {
            ScanPolicy::RoundRobin => self.scan_cursor,
            ScanPolicy::LowestFree => 0,
        };

        // used_count < capacity, so one full revolution always finds a slot.
        let index = self.find_free_from(start).ok_or(PoolError::PoolExhausted)?;

        // A new occupant invalidates every handle made for this slot before,
        // including ones taken from `handle_at` while it was free.
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.in_use[index] = true;
        self.used_count += 1;
        if self.config.scan_policy == ScanPolicy::RoundRobin {
            self.scan_cursor = (index + 1) % capacity;
        }
        self.metrics.total_acquired += 1;
        log::trace!("pool {} acquired slot {index}", self.pool_id);

        Ok(self.handle_for(index))
    }

    /// Try to acquire a slot without an error
    pub fn try_get_object(&mut self) -> Option<SlotHandle> {
        self.get_object().ok()
    }

    /// Return a slot to the pool, reporting whether the handle was accepted.
    ///
    /// A handle from another pool, a slot that is already free, and a handle
    /// from an earlier occupant all yield `false` and leave the pool untouched.
    pub fn return_object(&mut self, handle: SlotHandle) -> bool {
        self.release(handle).is_ok()
    }

    /// Return a slot to the pool, telling apart the ways a return can be rejected
    pub fn release(&mut self, handle: SlotHandle) -> PoolResult<()> {
        self.release_checked(handle, self.config.check_generations)
    }

    /// Release that always compares generations, whatever the configuration.
    ///
    /// Used by guards, which must never free a slot they no longer own.
    pub(crate) fn release_exact(&mut self, handle: SlotHandle) -> PoolResult<()> {
        self.release_checked(handle, true)
    }

    fn release_checked(&mut self, handle: SlotHandle, check_generation: bool) -> PoolResult<()> {
        let index = match self.validate(handle, check_generation) {
            Ok(index) => index,
            Err(err) => {
                self.metrics.invalid_returns += 1;
                log::debug!(
                    "pool {} rejected return of slot {}: {err}",
                    self.pool_id,
                    handle.index
                );
                return Err(err);
            }
        };

        self.free_slot(index);
        self.metrics.total_returned += 1;
        log::trace!("pool {} released slot {index}", self.pool_id);
        Ok(())
    }

    /// Return every slot currently in use. Returns the number of slots freed.
    ///
    /// Handles issued before the call become stale.
    pub fn release_all(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.in_use.len() {
            if self.in_use[index] {
                self.free_slot(index);
                freed += 1;
            }
        }

        self.metrics.total_returned += freed;
        log::debug!("pool {} released all {freed} slots in use", self.pool_id);
        freed
    }

    /// Borrow the object behind a handle that is currently in use
    pub fn get(&self, handle: SlotHandle) -> PoolResult<&T> {
        let index = self.validate(handle, self.config.check_generations)?;
        Ok(&self.storage[index])
    }

    /// Mutably borrow the object behind a handle that is currently in use
    pub fn get_mut(&mut self, handle: SlotHandle) -> PoolResult<&mut T> {
        let index = self.validate(handle, self.config.check_generations)?;
        Ok(&mut self.storage[index])
    }

    pub(crate) fn get_exact(&self, handle: SlotHandle) -> PoolResult<&T> {
        let index = self.validate(handle, true)?;
        Ok(&self.storage[index])
    }

    pub(crate) fn get_mut_exact(&mut self, handle: SlotHandle) -> PoolResult<&mut T> {
        let index = self.validate(handle, true)?;
        Ok(&mut self.storage[index])
    }

    /// Object at `index`, whether it is in use or free
    pub fn get_object_at(&self, index: usize) -> Option<&T> {
        self.storage.get(index)
    }

    /// Mutable object at `index`, whether it is in use or free
    pub fn get_object_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.storage.get_mut(index)
    }

    /// Handle for the current occupant of the slot at `index`.
    ///
    /// Lets callers that track slots by index return them. Returning the
    /// handle of a free slot fails like any other double return, and once the
    /// slot is acquired again the handle is stale.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::BitPool;
    ///
    /// let mut pool = BitPool::<u8>::new(4);
    /// for _ in 0..4 {
    ///     pool.get_object().unwrap();
    /// }
    ///
    /// for index in (0..4).step_by(2) {
    ///     let handle = pool.handle_at(index).unwrap();
    ///     assert!(pool.return_object(handle));
    /// }
    /// assert_eq!(pool.objects_in_use(), 2);
    /// assert!(pool.handle_at(4).is_err());
    /// ```
    pub fn handle_at(&self, index: usize) -> PoolResult<SlotHandle> {
        if index >= self.max_objects() {
            return Err(PoolError::IndexOutOfRange {
                index,
                capacity: self.max_objects(),
            });
        }
        Ok(self.handle_for(index))
    }

    /// Whether the slot at `index` is in use. Out-of-range indexes are not.
    pub fn is_in_use(&self, index: usize) -> bool {
        self.in_use.get(index).copied().unwrap_or(false)
    }

    /// Handles of all slots currently in use, in index order
    pub fn handles_in_use(&self) -> impl Iterator<Item = SlotHandle> + '_ {
        self.in_use
            .iter()
            .enumerate()
            .filter(|(_, in_use)| **in_use)
            .map(move |(index, _)| self.handle_for(index))
    }

    /// Number of slots currently in use
    pub fn objects_in_use(&self) -> usize {
        self.used_count
    }

    /// Fixed number of slots in the pool
    pub fn max_objects(&self) -> usize {
        self.storage.len()
    }

    /// Number of free slots
    pub fn available_count(&self) -> usize {
        self.max_objects() - self.used_count
    }

    /// Whether every slot is in use
    pub fn is_exhausted(&self) -> bool {
        self.used_count == self.max_objects()
    }

    /// Configuration the pool was built with
    pub fn config(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(self.used_count, self.max_objects())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(
            self.used_count,
            self.max_objects(),
            self.config.health_utilization_threshold,
        )
    }

    fn find_free_from(&self, start: usize) -> Option<usize> {
        let (head, tail) = self.in_use.split_at(start);
        tail.iter()
            .position(|in_use| !in_use)
            .map(|offset| start + offset)
            .or_else(|| head.iter().position(|in_use| !in_use))
    }

    fn validate(&self, handle: SlotHandle, check_generation: bool) -> PoolResult<usize> {
        if handle.pool_id != self.pool_id || handle.index >= self.max_objects() {
            return Err(PoolError::ForeignHandle);
        }
        if !self.in_use[handle.index] {
            return Err(PoolError::NotInUse);
        }
        if check_generation && self.generations[handle.index] != handle.generation {
            return Err(PoolError::StaleHandle);
        }
        Ok(handle.index)
    }

    fn free_slot(&mut self, index: usize) {
        self.in_use[index] = false;
        self.used_count -= 1;
    }

    fn handle_for(&self, index: usize) -> SlotHandle {
        SlotHandle {
            pool_id: self.pool_id,
            index,
            generation: self.generations[index],
        }
    }
}

fn try_filled<U>(capacity: usize, fill: impl FnMut() -> U) -> PoolResult<Box<[U]>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| PoolError::AllocationFailed { capacity })?;
    slots.extend(std::iter::repeat_with(fill).take(capacity));
    Ok(slots.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent<T>(pool: &BitPool<T>) {
        let flagged = pool.in_use.iter().filter(|in_use| **in_use).count();
        assert_eq!(pool.used_count, flagged);
        assert!(pool.used_count <= pool.max_objects());
        assert!(pool.max_objects() == 0 || pool.scan_cursor < pool.max_objects());
    }

    #[test]
    fn test_get_object_marks_slot() {
        let mut pool = BitPool::<i32>::new(3);

        let handle = pool.get_object().unwrap();
        assert!(pool.is_in_use(handle.index()));
        assert_eq!(pool.objects_in_use(), 1);
        assert_eq!(pool.available_count(), 2);
        assert_consistent(&pool);
    }

    #[test]
    fn test_round_robin_skips_past_last_acquired() {
        let mut pool = BitPool::<i32>::new(4);

        let first = pool.get_object().unwrap();
        let second = pool.get_object().unwrap();
        assert_eq!((first.index(), second.index()), (0, 1));

        assert!(pool.return_object(first));
        assert_eq!(pool.get_object().unwrap().index(), 2);
        assert_eq!(pool.get_object().unwrap().index(), 3);
        // Wraps around to the slot freed earlier.
        assert_eq!(pool.get_object().unwrap().index(), 0);
        assert_consistent(&pool);
    }

    #[test]
    fn test_lowest_free_reuses_lowest_index() {
        let config = PoolConfiguration::new()
            .with_capacity(4)
            .with_scan_policy(ScanPolicy::LowestFree);
        let mut pool = BitPool::<i32>::with_config(config);

        let first = pool.get_object().unwrap();
        pool.get_object().unwrap();
        assert!(pool.return_object(first));

        assert_eq!(pool.get_object().unwrap().index(), 0);
        assert_eq!(pool.scan_cursor, 0);
    }

    #[test]
    fn test_double_return_fails() {
        let mut pool = BitPool::<i32>::new(5);

        let handle = pool.get_object().unwrap();
        assert_eq!(pool.release(handle), Ok(()));
        assert_eq!(pool.release(handle), Err(PoolError::NotInUse));
        assert_eq!(pool.objects_in_use(), 0);
        assert_eq!(pool.get_metrics().invalid_returns, 1);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut ours = BitPool::<i32>::new(5);
        let mut theirs = BitPool::<i32>::new(5);

        ours.get_object().unwrap();
        let foreign = theirs.get_object().unwrap();

        assert_eq!(ours.release(foreign), Err(PoolError::ForeignHandle));
        assert_eq!(ours.objects_in_use(), 1);
        assert!(ours.get(foreign).is_err());
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut pool = BitPool::<i32>::new(1);

        let old = pool.get_object().unwrap();
        assert!(pool.return_object(old));
        let new = pool.get_object().unwrap();
        assert_eq!(old.index(), new.index());

        assert_eq!(pool.release(old), Err(PoolError::StaleHandle));
        assert_eq!(pool.objects_in_use(), 1);
        assert!(pool.return_object(new));
    }

    #[test]
    fn test_handle_of_free_slot_does_not_match_next_occupant() {
        let mut pool = BitPool::<i32>::new(1);

        let early = pool.handle_at(0).unwrap();
        let occupant = pool.get_object().unwrap();
        assert_eq!(early.index(), occupant.index());
        assert_ne!(early, occupant);

        assert_eq!(pool.release(early), Err(PoolError::StaleHandle));
        assert_eq!(pool.objects_in_use(), 1);
        assert!(pool.get(occupant).is_ok());
        assert!(pool.try_get_object().is_none());
    }

    #[test]
    fn test_stale_handle_accepted_without_generation_checks() {
        let config = PoolConfiguration::new()
            .with_capacity(1)
            .with_generation_checks(false);
        let mut pool = BitPool::<i32>::with_config(config);

        let old = pool.get_object().unwrap();
        assert!(pool.return_object(old));
        pool.get_object().unwrap();

        assert!(pool.return_object(old));
        assert_eq!(pool.objects_in_use(), 0);
    }

    #[test]
    fn test_failed_calls_leave_state_untouched() {
        let mut pool = BitPool::<i32>::new(3);
        let handle = pool.get_object().unwrap();
        pool.get_object().unwrap();
        pool.get_object().unwrap();
        assert!(pool.return_object(handle));

        let cursor = pool.scan_cursor;
        let flags = pool.in_use.clone();
        let generations = pool.generations.clone();

        assert!(!pool.return_object(handle));
        assert!(pool.get_object_at(3).is_none());
        assert!(pool.handle_at(3).is_err());

        assert_eq!(pool.scan_cursor, cursor);
        assert_eq!(pool.in_use, flags);
        assert_eq!(pool.generations, generations);
        assert_eq!(pool.objects_in_use(), 2);

        pool.get_object().unwrap();
        let cursor = pool.scan_cursor;
        assert_eq!(pool.get_object(), Err(PoolError::PoolExhausted));
        assert_eq!(pool.scan_cursor, cursor);
        assert_consistent(&pool);
    }

    #[test]
    fn test_zero_capacity_pool() {
        let mut pool = BitPool::<i32>::new(0);

        assert_eq!(pool.get_object(), Err(PoolError::PoolExhausted));
        assert_eq!(pool.objects_in_use(), 0);
        assert_eq!(pool.max_objects(), 0);
        assert!(pool.is_exhausted());
        assert!(pool.get_object_at(0).is_none());
        assert_consistent(&pool);
    }

    #[test]
    fn test_try_with_config_reports_allocation_failure() {
        let config = PoolConfiguration::new().with_capacity(usize::MAX);
        let result = BitPool::<u64>::try_with_config(config);
        assert_eq!(
            result.unwrap_err(),
            PoolError::AllocationFailed {
                capacity: usize::MAX
            }
        );

        let config = PoolConfiguration::new().with_capacity(8);
        let pool = BitPool::<u64>::try_with_config(config).unwrap();
        assert_eq!(pool.max_objects(), 8);
    }

    #[test]
    fn test_from_objects_uses_object_count() {
        let config = PoolConfiguration::new().with_capacity(100);
        let mut pool = BitPool::from_objects(vec!["a".to_string(), "b".to_string()], config);

        assert_eq!(pool.max_objects(), 2);
        assert_eq!(pool.config().capacity, 2);

        let handle = pool.get_object().unwrap();
        assert_eq!(pool.get(handle).unwrap(), "a");
    }

    #[test]
    fn test_returned_value_is_not_reset() {
        let config = PoolConfiguration::new()
            .with_capacity(2)
            .with_scan_policy(ScanPolicy::LowestFree);
        let mut pool = BitPool::<Vec<u8>>::with_config(config);

        let handle = pool.get_object().unwrap();
        pool.get_mut(handle).unwrap().push(42);
        assert!(pool.return_object(handle));

        let again = pool.get_object().unwrap();
        assert_eq!(pool.get(again).unwrap().as_slice(), &[42u8]);
    }

    #[test]
    fn test_get_requires_slot_in_use() {
        let mut pool = BitPool::<i32>::new(2);
        let handle = pool.handle_at(1).unwrap();
        assert_eq!(pool.get(handle), Err(PoolError::NotInUse));

        *pool.get_object_at_mut(1).unwrap() = 5;
        assert_eq!(pool.get_object_at(1), Some(&5));
    }

    #[test]
    fn test_release_all() {
        let mut pool = BitPool::<i32>::new(6);
        let handles: Vec<_> = (0..4).map(|_| pool.get_object().unwrap()).collect();
        assert!(pool.return_object(handles[1]));

        assert_eq!(pool.handles_in_use().count(), 3);
        assert_eq!(pool.release_all(), 3);
        assert_eq!(pool.objects_in_use(), 0);
        assert!(handles.iter().all(|handle| !pool.return_object(*handle)));
        assert_eq!(pool.get_metrics().total_returned, 4);
        assert_consistent(&pool);
    }

    #[test]
    fn test_metrics_and_health() {
        let mut pool = BitPool::<i32>::new(2);
        pool.get_object().unwrap();
        pool.get_object().unwrap();
        assert!(pool.get_object().is_err());

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.exhausted_events, 1);
        assert_eq!(metrics.utilization, 1.0);

        let health = pool.get_health_status();
        assert!(!health.is_healthy());
        assert_eq!(pool.export_metrics()["objects_in_use"], "2");
    }
}
