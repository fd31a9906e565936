//! Core types for the vault.
//!
//! - [`Mapping`]: the immutable schema of one metric family
//! - [`Sample`]: a single observation submitted for storage
//! - [`MetricName`]: a validated metric name
//! - [`IdentitySource`]: how a collector tells entities apart

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// A validated metric name.
///
/// Metric names must:
/// - Be non-empty
/// - Contain only alphanumeric characters, underscores, and colons
/// - Start with a letter, underscore or colon
/// - Be at most 256 characters long
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricName(String);

impl MetricName {
    /// Maximum allowed length for a metric name.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidMetricName` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(VaultError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(VaultError::InvalidMetricName {
                reason: format!(
                    "metric name exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }

        if let Some(c) = name.chars().next() {
            if !c.is_ascii_alphabetic() && c != '_' && c != ':' {
                return Err(VaultError::InvalidMetricName {
                    reason: format!("metric name {name:?} must start with a letter, underscore or colon"),
                });
            }
        }

        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != ':')
        {
            return Err(VaultError::InvalidMetricName {
                reason: format!("invalid character '{c}' in metric name {name:?}"),
            });
        }

        Ok(Self(name))
    }

    /// Returns the metric name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a collector derives the identity of the entity behind a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Use the caller-assigned [`Sample::id`]. Samples without one are rejected.
    #[default]
    SampleId,
    /// Legacy fallback: hash the ordered label values.
    ///
    /// This is probabilistic. Two entities whose label values coincide are
    /// conflated, and distinct label sets may collide in the 64-bit hash.
    LabelHash,
}

/// The immutable schema of one metric family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Metric name, unique across the vault.
    pub name: String,
    /// Help text shown in the exposition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    /// Ordered label names. Every sample must carry one value per name, in this order.
    #[serde(rename = "labels", default, skip_serializing_if = "Vec::is_empty")]
    pub label_names: Vec<String>,
    /// How long an entry survives without a fresh update.
    #[serde(default, with = "humantime_duration")]
    pub ttl: Duration,
    /// How entities are told apart.
    #[serde(default)]
    pub identity: IdentitySource,
}

impl Mapping {
    /// Creates a mapping keyed by sample ID.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
            ttl,
            identity: IdentitySource::SampleId,
        }
    }

    /// Sets the ordered label names.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_names = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the identity source.
    #[must_use]
    pub const fn with_identity(mut self, identity: IdentitySource) -> Self {
        self.identity = identity;
        self
    }

    /// Checks the metric name and every label name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetricName` or `InvalidLabelName` describing the first problem found.
    pub fn validate(&self) -> Result<MetricName> {
        let name = MetricName::new(self.name.clone())?;

        for (i, label) in self.label_names.iter().enumerate() {
            let reason = if label.is_empty() {
                Some("label name cannot be empty".to_string())
            } else if label.starts_with("__") {
                Some("label names starting with '__' are reserved".to_string())
            } else if label.starts_with(|c: char| c.is_ascii_digit()) {
                Some("label name must not start with a digit".to_string())
            } else if let Some(c) = label.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
                Some(format!("invalid character '{c}'"))
            } else if self.label_names[..i].contains(label) {
                Some("duplicate label name".to_string())
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(VaultError::InvalidLabelName {
                    metric: self.name.clone(),
                    label: label.clone(),
                    reason,
                });
            }
        }

        Ok(name)
    }
}

/// One observation of an entity, submitted for storage under a mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    /// Stable identity of the observed entity, e.g. a source-assigned UID.
    pub id: Option<String>,
    /// Label values in the order of the mapping's label names.
    pub labels: Vec<String>,
    /// Latest gauge reading.
    pub value: f64,
    /// Authoritative observation time, if the source supplied one.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Sample {
    /// Creates an untimed sample without identity.
    #[must_use]
    pub fn new<I, S>(labels: I, value: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            labels: labels.into_iter().map(Into::into).collect(),
            value,
            timestamp: None,
        }
    }

    /// Sets the entity identity.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the authoritative observation time.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Serde adapter for durations written as `"1h"`, `"90s"`, `"1h 30m"`.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
