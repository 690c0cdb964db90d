//! Health reporting for slot pools

/// Health status of a slot pool
///
/// # Examples
///
/// ```
/// use slotpool::BitPool;
///
/// let pool = BitPool::<u32>::new(3);
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.available_objects, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    /// Free slots
    pub available_objects: usize,

    /// Slots in use
    pub objects_in_use: usize,

    /// Total capacity
    pub total_capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status.
    ///
    /// The pool is unhealthy once utilization goes above `threshold`.
    pub fn new(in_use: usize, capacity: usize, threshold: f64) -> Self {
        let utilization = crate::metrics::utilization(in_use, capacity);
        let available = capacity - in_use;

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if utilization > threshold {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if available == 0 && capacity > 0 {
            warnings.push("Pool is exhausted".to_string());
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            available_objects: available,
            objects_in_use: in_use,
            total_capacity: capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_pool_is_unhealthy() {
        let health = HealthStatus::new(10, 10, 0.9);
        assert!(!health.is_healthy());
        assert_eq!(health.warning_count, 2);
        assert_eq!(health.available_objects, 0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let health = HealthStatus::new(9, 10, 0.9);
        assert!(health.is_healthy());
        assert!(health.warnings.is_empty());
    }

    #[test]
    fn test_empty_pool_has_no_warnings() {
        let health = HealthStatus::new(0, 0, 0.9);
        assert!(health.is_healthy());
        assert_eq!(health.warning_count, 0);
    }
}
