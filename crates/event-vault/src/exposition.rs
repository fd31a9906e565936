//! Prometheus exposition of vault collectors.
//!
//! Collectors are published to an explicit [`ExpositionRegistry`] handle
//! instead of a process-wide default registry. On every scrape each published
//! collector encodes one gauge descriptor and one sample per live row.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use event_vault::{ExpositionRegistry, Mapping, MetricsVault, Sample};
//!
//! let registry = ExpositionRegistry::new();
//! let mut vault = MetricsVault::new();
//! vault
//!     .register_mappings(
//!         vec![Mapping::new("demo_info", "Demo", Duration::from_secs(60)).with_labels(["name"])],
//!         &registry,
//!     )
//!     .unwrap();
//!
//! vault.store("demo_info", Sample::new(["x"], 1.0).with_id("1")).unwrap();
//!
//! let output = registry.encode().unwrap();
//! assert!(output.contains("demo_info{name=\"x\"}"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::MetricType;
use prometheus_client::registry::Registry;
use tracing::warn;

use crate::collector::GaugeCollector;
use crate::error::{Result, VaultError};

/// Adapter publishing a [`GaugeCollector`] to a prometheus-client registry.
#[derive(Debug)]
struct PublishedCollector(Arc<GaugeCollector>);

impl Collector for PublishedCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> std::result::Result<(), std::fmt::Error> {
        let desc = self.0.describe();
        let help = escape_help(&desc.help);
        let mut metric_encoder =
            encoder.encode_descriptor(desc.name.as_str(), &help, None, MetricType::Gauge)?;

        let rows = self.0.collect();
        for row in rows.iter() {
            let labels: Vec<(&str, String)> = desc
                .label_names
                .iter()
                .map(String::as_str)
                .zip(row.label_values.iter().map(|v| escape_label_value(v)))
                .collect();
            let gauge = ConstGauge::new(row.value);

            let encoded = metric_encoder
                .encode_family(&labels)
                .and_then(|family| gauge.encode(family));
            if let Err(err) = encoded {
                warn!(metric = %desc.name, error = %err, "failed to encode gauge row");
            }
        }

        Ok(())
    }
}

/// Escapes a label value for the text format: backslash, double quote and
/// line feed.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes help text for the text format: backslash and line feed.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

#[derive(Debug, Default)]
struct Published {
    registry: Registry,
    names: HashSet<String>,
}

/// Registry handle the vault publishes its collectors to.
///
/// Cloning is cheap and clones share state, so the same handle can be given
/// to the vault at startup and to the HTTP layer that serves scrapes.
#[derive(Clone, Default)]
pub struct ExpositionRegistry {
    inner: Arc<RwLock<Published>>,
}

impl std::fmt::Debug for ExpositionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpositionRegistry")
            .field("names", &self.inner.read().names)
            .finish_non_exhaustive()
    }
}

impl ExpositionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a collector under its metric name.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationRejected` if a collector with the same name is
    /// already published.
    pub fn publish(&self, collector: Arc<GaugeCollector>) -> Result<()> {
        let name = collector.name().to_string();
        let mut inner = self.inner.write();

        if !inner.names.insert(name.clone()) {
            return Err(VaultError::RegistrationRejected {
                name,
                reason: "a collector with this name is already published".to_string(),
            });
        }
        inner
            .registry
            .register_collector(Box::new(PublishedCollector(collector)));

        Ok(())
    }

    /// Returns `true` if a collector is published under `name`.
    #[must_use]
    pub fn is_published(&self, name: &str) -> bool {
        self.inner.read().names.contains(name)
    }

    /// Encodes every published collector in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns `Exposition` if the registry could not be written out.
    pub fn encode(&self) -> Result<String> {
        let inner = self.inner.read();
        let mut buffer = String::new();
        encode(&mut buffer, &inner.registry).map_err(|e| {
            tracing::error!(error = %e, "failed to encode prometheus metrics");
            VaultError::Exposition {
                reason: e.to_string(),
            }
        })?;
        Ok(buffer)
    }

    /// Returns the Content-Type header value for [`encode`](Self::encode) output.
    #[must_use]
    pub const fn content_type() -> &'static str {
        "application/openmetrics-text; version=1.0.0; charset=utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mapping, Sample};
    use chrono::Utc;
    use std::time::Duration;

    fn collector(name: &str, labels: &[&str]) -> Arc<GaugeCollector> {
        Arc::new(
            GaugeCollector::new(
                Mapping::new(name, "Test help", Duration::from_secs(3600))
                    .with_labels(labels.iter().copied()),
            )
            .unwrap(),
        )
    }

    mod publish_tests {
        use super::*;

        #[test]
        fn publish_registers_name() {
            let registry = ExpositionRegistry::new();
            registry.publish(collector("test_metric", &["name"])).unwrap();

            assert!(registry.is_published("test_metric"));
            assert!(!registry.is_published("other_metric"));
        }

        #[test]
        fn duplicate_publish_is_rejected() {
            let registry = ExpositionRegistry::new();
            registry.publish(collector("test_metric", &["name"])).unwrap();

            let result = registry.publish(collector("test_metric", &["other"]));
            assert!(matches!(
                result,
                Err(VaultError::RegistrationRejected { ref name, .. }) if name == "test_metric"
            ));
        }

        #[test]
        fn clones_share_state() {
            let registry1 = ExpositionRegistry::new();
            let registry2 = registry1.clone();

            registry1.publish(collector("test_metric", &[])).unwrap();
            assert!(registry2.is_published("test_metric"));
        }
    }

    mod encode_tests {
        use super::*;

        #[test]
        fn empty_collector_still_describes() {
            let registry = ExpositionRegistry::new();
            registry.publish(collector("test_metric", &["name"])).unwrap();

            let output = registry.encode().unwrap();

            assert!(output.contains("# HELP test_metric Test help"));
            assert!(output.contains("# TYPE test_metric gauge"));
            assert!(!output.contains("test_metric{"));
        }

        #[test]
        fn rows_are_labeled_in_mapping_order() {
            let registry = ExpositionRegistry::new();
            let c = collector("test_metric", &["kind", "name"]);
            registry.publish(Arc::clone(&c)).unwrap();

            c.store(Utc::now(), Sample::new(["Pod", "web-0"], 5.0).with_id("1"))
                .unwrap();

            let output = registry.encode().unwrap();
            assert!(output.contains("test_metric{kind=\"Pod\",name=\"web-0\"} 5"));
        }

        #[test]
        fn encode_reflects_evictions() {
            let registry = ExpositionRegistry::new();
            let c = collector("test_metric", &["name"]);
            registry.publish(Arc::clone(&c)).unwrap();

            let now = Utc::now();
            c.store(now, Sample::new(["gone"], 1.0).with_id("1").with_timestamp(now))
                .unwrap();
            assert!(registry.encode().unwrap().contains("name=\"gone\""));

            c.clear(now + chrono::TimeDelta::hours(2));
            assert!(!registry.encode().unwrap().contains("name=\"gone\""));
        }

        #[test]
        fn multiple_families_are_encoded() {
            let registry = ExpositionRegistry::new();
            registry.publish(collector("metric_a", &[])).unwrap();
            registry.publish(collector("metric_b", &[])).unwrap();

            let output = registry.encode().unwrap();
            assert!(output.contains("# TYPE metric_a gauge"));
            assert!(output.contains("# TYPE metric_b gauge"));
        }

        #[test]
        fn label_values_are_escaped() {
            let registry = ExpositionRegistry::new();
            let c = collector("test_metric", &["message"]);
            registry.publish(Arc::clone(&c)).unwrap();

            c.store(
                Utc::now(),
                Sample::new(["Back-off pulling image \"nginx\"\nline2 \\ end"], 1.0).with_id("1"),
            )
            .unwrap();

            let output = registry.encode().unwrap();
            assert!(output.contains(
                "test_metric{message=\"Back-off pulling image \\\"nginx\\\"\\nline2 \\\\ end\"} 1"
            ));
            assert!(output.lines().all(|line| !line.starts_with("line2")));
        }

        #[test]
        fn help_text_is_escaped() {
            let registry = ExpositionRegistry::new();
            let c = Arc::new(
                GaugeCollector::new(Mapping::new(
                    "test_metric",
                    "First line\nC:\\path",
                    Duration::from_secs(60),
                ))
                .unwrap(),
            );
            registry.publish(c).unwrap();

            let output = registry.encode().unwrap();
            assert!(output.contains("# HELP test_metric First line\\nC:\\\\path"));
        }

        #[test]
        fn plain_values_are_unchanged() {
            assert_eq!(escape_label_value("web-0"), "web-0");
            assert_eq!(escape_help("Plain help"), "Plain help");
        }

        #[test]
        fn content_type_is_openmetrics() {
            let ct = ExpositionRegistry::content_type();
            assert!(ct.contains("openmetrics-text"));
            assert!(ct.contains("1.0.0"));
        }
    }

    mod thread_safety_tests {
        use super::*;
        use std::thread;

        #[test]
        fn concurrent_encode_and_store() {
            let registry = ExpositionRegistry::new();
            let c = collector("test_metric", &["name"]);
            registry.publish(Arc::clone(&c)).unwrap();

            let mut handles = vec![];

            for i in 0..5 {
                let c = Arc::clone(&c);
                handles.push(thread::spawn(move || {
                    for j in 0..100 {
                        c.store(Utc::now(), Sample::new([format!("{i}")], f64::from(j)).with_id(format!("{i}")))
                            .unwrap();
                    }
                }));
            }

            for _ in 0..5 {
                let registry = registry.clone();
                handles.push(thread::spawn(move || {
                    for _ in 0..100 {
                        let output = registry.encode().unwrap();
                        assert!(output.contains("# TYPE test_metric gauge"));
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(c.len(), 5);
        }
    }
}
