//! # events-exporter
//!
//! Prometheus exporter for Kubernetes events.
//!
//! Events arrive as a JSON stream (`kubectl get events --watch -o json`, a
//! FIFO, or any other producer), are projected into the `kube_event_info`
//! gauge and kept in an [`event_vault::MetricsVault`] until their TTL runs
//! out. The exposition is served over HTTP.
//!
//! ## Pipeline
//!
//! ```text
//! JsonEventSource --WatchEvent--> EventHandler --Sample--> MetricsVault
//!                                                              |
//!                         Sweeper (every --sweep-interval) ----+
//!                                                              |
//! scraper --GET /metrics--> MetricsServer --> ExpositionRegistry
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use event_vault::{ExpositionRegistry, MetricsVault};
//! use events_exporter::{event_mapping, EventHandler, EventRecord, WatchEvent};
//!
//! let registry = ExpositionRegistry::new();
//! let mut vault = MetricsVault::new();
//! vault.register_mappings([event_mapping(Duration::from_secs(3600))], &registry).unwrap();
//!
//! let handler = EventHandler::new(Arc::new(vault), false);
//! let mut record = EventRecord::default();
//! record.metadata.uid = "6b1c".to_string();
//! record.reason = "Scheduled".to_string();
//! handler.handle(&WatchEvent::Created(record)).unwrap();
//!
//! assert!(registry.encode().unwrap().contains("reason=\"Scheduled\""));
//! ```
//!
//! ## HTTP Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/metrics` | GET | Text exposition of all live events |
//! | `/healthz` | GET | Liveness probe |
//! | `/` | GET | Landing page |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod selector;
pub mod server;
pub mod source;
pub mod sweeper;

// Re-export main types
pub use config::{Config, LogFormat};
pub use error::{ExporterError, ExporterResult};
pub use event::{EventRecord, WatchEvent};
pub use handler::{event_mapping, event_to_sample, EventHandler, EVENT_METRIC};
pub use selector::FieldSelector;
pub use server::MetricsServer;
pub use source::{Classifier, JsonEventSource};
pub use sweeper::Sweeper;
