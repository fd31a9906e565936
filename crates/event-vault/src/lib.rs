//! In-memory, TTL-evicting gauge store for Prometheus exporters.
#![forbid(unsafe_code)]
//!
//! `event-vault` keeps the latest observed state of every entity a watch
//! source reports and exposes it as gauges. The source never deletes
//! anything: an entity that stops being re-asserted simply ages out once its
//! last update is older than the TTL of its metric family.
//!
//! # Concepts
//!
//! - **Mapping**: schema of a metric family (name, help, ordered labels, TTL)
//! - **Sample**: one observation of one entity
//! - **Collector**: per-mapping store with the freshness rule and the sweep
//! - **Vault**: routes samples to collectors and sweeps them all
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use event_vault::{ExpositionRegistry, Mapping, MetricsVault, Sample};
//!
//! let registry = ExpositionRegistry::new();
//! let mut vault = MetricsVault::new();
//!
//! let mapping = Mapping::new("pod_restarts", "Restarts per pod", Duration::from_secs(3600))
//!     .with_labels(["namespace", "pod"]);
//! vault.register_mappings(vec![mapping], &registry).unwrap();
//!
//! vault
//!     .store("pod_restarts", Sample::new(["default", "web-0"], 3.0).with_id("uid-1"))
//!     .unwrap();
//!
//! // Called periodically to drop entities nobody re-asserted within the TTL.
//! vault.remove_stale_metrics();
//!
//! assert!(registry.encode().unwrap().contains("pod_restarts"));
//! ```

#![doc(html_root_url = "https://docs.rs/event-vault/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod clock;
pub mod collector;
pub mod error;
pub mod exposition;
pub mod types;
pub mod vault;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{hash_labels, Descriptor, EntryKey, GaugeCollector, GaugeRow, Rows, StoredMetric};
pub use error::{Result, VaultError};
pub use exposition::ExpositionRegistry;
pub use types::{IdentitySource, Mapping, MetricName, Sample};
pub use vault::MetricsVault;
