//! Metrics collection and export for slot pools

use std::collections::HashMap;

#[cfg(feature = "metrics")]
use crate::errors::{PoolError, PoolResult};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use slotpool::BitPool;
///
/// let mut pool = BitPool::<u32>::new(3);
///
/// let _handle = pool.get_object().unwrap();
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.objects_in_use, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total successful acquisitions
    pub total_acquired: usize,

    /// Total successful returns
    pub total_returned: usize,

    /// Current slots in use
    pub objects_in_use: usize,

    /// Current free slots
    pub available_objects: usize,

    /// Number of acquisitions rejected because the pool was exhausted
    pub exhausted_events: usize,

    /// Number of rejected returns (foreign, double or stale handles)
    pub invalid_returns: usize,

    /// Pool utilization ratio (0.0 to 1.0)
    pub utilization: f64,

    /// Fixed pool capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("objects_in_use".to_string(), self.objects_in_use.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("invalid_returns".to_string(), self.invalid_returns.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// Every sample carries a `pool` label plus the given tags.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotpool::BitPool;
    /// use std::collections::HashMap;
    ///
    /// let pool = BitPool::<u32>::new(3);
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("slotpool_objects_in_use"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            labels.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let registry = Registry::new_custom(Some("slotpool".to_string()), Some(labels))
            .map_err(metrics_error)?;

        // Gauges
        let in_use =
            IntGauge::new("objects_in_use", "Current slots in use").map_err(metrics_error)?;
        in_use.set(metrics.objects_in_use as i64);
        registry.register(Box::new(in_use)).map_err(metrics_error)?;

        let available =
            IntGauge::new("objects_available", "Current free slots").map_err(metrics_error)?;
        available.set(metrics.available_objects as i64);
        registry.register(Box::new(available)).map_err(metrics_error)?;

        let capacity = IntGauge::new("capacity", "Fixed pool capacity").map_err(metrics_error)?;
        capacity.set(metrics.max_capacity as i64);
        registry.register(Box::new(capacity)).map_err(metrics_error)?;

        let utilization =
            Gauge::new("utilization", "Pool utilization ratio").map_err(metrics_error)?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization)).map_err(metrics_error)?;

        // Counters
        let counters = [
            (
                "objects_acquired_total",
                "Total slots acquired",
                metrics.total_acquired,
            ),
            (
                "objects_returned_total",
                "Total slots returned",
                metrics.total_returned,
            ),
            (
                "events_exhausted_total",
                "Acquisitions rejected on an exhausted pool",
                metrics.exhausted_events,
            ),
            (
                "invalid_returns_total",
                "Rejected returns",
                metrics.invalid_returns,
            ),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::new(name, help).map_err(metrics_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(metrics_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| PoolError::Metrics(e.to_string()))
    }
}

#[cfg(feature = "metrics")]
fn metrics_error(err: prometheus::Error) -> PoolError {
    PoolError::Metrics(err.to_string())
}

/// Internal metrics tracker
#[derive(Debug, Default, Clone)]
pub(crate) struct MetricsTracker {
    pub total_acquired: usize,
    pub total_returned: usize,
    pub exhausted_events: usize,
    pub invalid_returns: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, in_use: usize, capacity: usize) -> PoolMetrics {
        PoolMetrics {
            total_acquired: self.total_acquired,
            total_returned: self.total_returned,
            objects_in_use: in_use,
            available_objects: capacity - in_use,
            exhausted_events: self.exhausted_events,
            invalid_returns: self.invalid_returns,
            utilization: utilization(in_use, capacity),
            max_capacity: capacity,
        }
    }
}

pub(crate) fn utilization(in_use: usize, capacity: usize) -> f64 {
    if capacity > 0 {
        in_use as f64 / capacity as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_of_empty_pool() {
        let metrics = MetricsTracker::new().get_metrics(0, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.available_objects, 0);
    }

    #[test]
    fn test_export_contains_all_keys() {
        let mut tracker = MetricsTracker::new();
        tracker.total_acquired = 4;
        tracker.total_returned = 2;
        let exported = tracker.get_metrics(2, 8).export();

        assert_eq!(exported["total_acquired"], "4");
        assert_eq!(exported["available_objects"], "6");
        assert_eq!(exported["utilization"], "0.25");
        assert_eq!(exported.len(), 8);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_counters() {
        let mut tracker = MetricsTracker::new();
        tracker.exhausted_events = 3;
        let metrics = tracker.get_metrics(1, 1);

        let output = MetricsExporter::export_prometheus(&metrics, "bullets", None).unwrap();
        assert!(output.contains("# TYPE slotpool_events_exhausted_total counter"));
        assert!(output.contains("pool=\"bullets\""));
        assert!(output.contains("} 3"));
    }
}
