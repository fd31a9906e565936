//! Top-level registry of collectors.
//!
//! The [`MetricsVault`] owns one [`GaugeCollector`] per registered
//! [`Mapping`], routes samples to them by metric name, and sweeps all of them
//! for stale entries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::collector::GaugeCollector;
use crate::error::{Result, VaultError};
use crate::exposition::ExpositionRegistry;
use crate::types::{Mapping, Sample};

/// Registry of per-mapping collectors with an injectable clock.
///
/// Registration takes `&mut self`; once the vault is shared (usually as
/// `Arc<MetricsVault>`) the set of collectors is fixed and routing is
/// lock-free. Each collector carries its own lock.
#[derive(Debug)]
pub struct MetricsVault {
    clock: Arc<dyn Clock>,
    metrics: HashMap<String, Arc<GaugeCollector>>,
}

impl Default for MetricsVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsVault {
    /// Creates an empty vault reading the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty vault reading `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            metrics: HashMap::new(),
        }
    }

    /// Registers mappings and publishes their collectors to `registry`.
    ///
    /// Processing is fail-fast: the first invalid, duplicate or rejected
    /// mapping aborts the call and the remaining mappings are not registered.
    ///
    /// # Errors
    ///
    /// Returns the error of the first mapping that could not be registered.
    pub fn register_mappings(
        &mut self,
        mappings: impl IntoIterator<Item = Mapping>,
        registry: &ExpositionRegistry,
    ) -> Result<()> {
        for mapping in mappings {
            if self.metrics.contains_key(&mapping.name) {
                return Err(VaultError::DuplicateMetric { name: mapping.name });
            }

            let collector = Arc::new(GaugeCollector::new(mapping)?);
            registry.publish(Arc::clone(&collector))?;

            let name = collector.mapping().name.clone();
            info!(
                metric = %name,
                labels = collector.mapping().label_names.len(),
                ttl = ?collector.mapping().ttl,
                "registered mapping"
            );
            self.metrics.insert(name, collector);
        }
        Ok(())
    }

    /// Stores a sample under the collector registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns `MetricNotFound` for an unregistered name, or the collector's
    /// error if the sample is rejected.
    pub fn store(&self, name: &str, sample: Sample) -> Result<()> {
        let collector = self
            .metrics
            .get(name)
            .ok_or_else(|| VaultError::MetricNotFound {
                name: name.to_string(),
            })?;
        collector.store(self.clock.now(), sample)
    }

    /// Sweeps every collector for entries older than their TTL.
    ///
    /// Collectors are visited one at a time, all against the same "now".
    /// Returns the total number of evicted entries.
    pub fn remove_stale_metrics(&self) -> usize {
        let now = self.clock.now();
        let evicted = self
            .metrics
            .values()
            .map(|collector| collector.clear(now))
            .sum::<usize>();

        if evicted > 0 {
            debug!(evicted, "removed stale metrics");
        }
        evicted
    }

    /// Returns the collector registered as `name`.
    #[must_use]
    pub fn collector(&self, name: &str) -> Option<&Arc<GaugeCollector>> {
        self.metrics.get(name)
    }

    /// Returns the registered metric names.
    #[must_use]
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered collectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
