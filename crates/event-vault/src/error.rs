//! Error types for the event-vault crate.

use thiserror::Error;

/// Errors that can occur in the metrics vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The metric name is invalid (empty or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// A label name of a mapping is invalid.
    #[error("invalid label name {label:?} in mapping {metric}: {reason}")]
    InvalidLabelName {
        /// The mapping the label belongs to.
        metric: String,
        /// The offending label name.
        label: String,
        /// The reason the label name is invalid.
        reason: String,
    },

    /// A mapping with the same name is already registered.
    #[error("duplicate metric: {name} is already registered")]
    DuplicateMetric {
        /// The metric name that was registered twice.
        name: String,
    },

    /// The exposition registry refused to publish a collector.
    #[error("registration of {name} rejected: {reason}")]
    RegistrationRejected {
        /// The metric name that was rejected.
        name: String,
        /// The reason the registry gave.
        reason: String,
    },

    /// A sample was routed to a metric name that was never registered.
    #[error("metric not found: {name}")]
    MetricNotFound {
        /// The metric name that was not found.
        name: String,
    },

    /// A sample carries a different number of label values than its mapping.
    #[error("label cardinality mismatch for {metric}: expected {expected} values, got {actual}")]
    LabelCardinality {
        /// The metric the sample was stored under.
        metric: String,
        /// Number of label names declared by the mapping.
        expected: usize,
        /// Number of label values carried by the sample.
        actual: usize,
    },

    /// A sample without an identity was stored under a mapping keyed by sample ID.
    #[error("sample for {metric} has no id")]
    MissingSampleId {
        /// The metric the sample was stored under.
        metric: String,
    },

    /// The exposition registry could not be encoded.
    #[error("failed to encode exposition: {reason}")]
    Exposition {
        /// The underlying formatter error.
        reason: String,
    },
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
