//! Pool configuration options

use std::time::Duration;

/// Order in which free slots are searched on acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Scan circularly from the slot after the last one handed out.
    #[default]
    RoundRobin,

    /// Always scan from slot 0 and hand out the lowest free index.
    LowestFree,
}

/// Configuration for slot pool behavior
///
/// # Examples
///
/// ```
/// use slotpool::{PoolConfiguration, ScanPolicy};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(128)
///     .with_scan_policy(ScanPolicy::LowestFree)
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.capacity, 128);
/// assert_eq!(config.operation_timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfiguration {
    /// Number of slots, fixed for the lifetime of the pool
    pub capacity: usize,

    /// Free-slot search order
    pub scan_policy: ScanPolicy,

    /// Reject handles from an earlier occupant of a slot
    pub check_generations: bool,

    /// Timeout for async acquisition on a shared pool
    pub operation_timeout: Option<Duration>,

    /// Utilization above which the pool reports itself unhealthy (0.0 to 1.0)
    pub health_utilization_threshold: f64,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            capacity: 100,
            scan_policy: ScanPolicy::RoundRobin,
            check_generations: true,
            operation_timeout: Some(Duration::from_secs(30)),
            health_utilization_threshold: 0.9,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of slots
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_capacity(50);
    ///
    /// assert_eq!(config.capacity, 50);
    /// ```
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the free-slot search order
    pub fn with_scan_policy(mut self, policy: ScanPolicy) -> Self {
        self.scan_policy = policy;
        self
    }

    /// Enable or disable generation checks on return.
    ///
    /// With checks disabled a handle is matched on slot identity alone, so a
    /// handle kept from an earlier occupant can return the current one.
    pub fn with_generation_checks(mut self, enabled: bool) -> Self {
        self.check_generations = enabled;
        self
    }

    /// Set operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely in async acquisition
    pub fn without_timeout(mut self) -> Self {
        self.operation_timeout = None;
        self
    }

    /// Set the utilization threshold used by health reporting
    pub fn with_health_threshold(mut self, threshold: f64) -> Self {
        self.health_utilization_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.scan_policy, ScanPolicy::RoundRobin);
        assert!(config.check_generations);
    }

    #[test]
    fn test_health_threshold_is_clamped() {
        let config = PoolConfiguration::new().with_health_threshold(1.7);
        assert_eq!(config.health_utilization_threshold, 1.0);

        let config = PoolConfiguration::new().with_health_threshold(-0.2);
        assert_eq!(config.health_utilization_threshold, 0.0);
    }
}
