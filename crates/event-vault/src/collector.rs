//! Per-mapping gauge store.
//!
//! A [`GaugeCollector`] keeps the latest value of every entity observed under
//! one [`Mapping`], decides on each write whether the entity's freshness clock
//! moves, and drops entities whose clock is older than the mapping's TTL.

use std::collections::HashMap;
use std::hash::Hasher;

use chrono::{DateTime, TimeDelta, Utc};
use fnv::FnvHasher;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::types::{IdentitySource, Mapping, MetricName, Sample};

/// Separator written after every label value before hashing.
///
/// `0xFF` never occurs in UTF-8, so it cannot appear inside a label value.
const LABELS_SEPARATOR: u8 = 0xFF;

/// Identity of an entry within a collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    /// Caller-assigned identity.
    Id(String),
    /// FNV-1a hash of the ordered label values.
    LabelHash(u64),
}

/// The latest known state of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMetric {
    /// Last stored gauge value.
    pub value: f64,
    /// Last stored label values, in mapping order.
    pub label_values: Vec<String>,
    /// The freshness clock checked against the TTL.
    pub last_update: DateTime<Utc>,
}

/// Exposition descriptor of a collector: one per mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Metric name.
    pub name: MetricName,
    /// Help text.
    pub help: String,
    /// Ordered label names.
    pub label_names: Vec<String>,
}

/// A live row yielded by [`Rows::iter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeRow<'a> {
    /// Label values in descriptor order.
    pub label_values: &'a [String],
    /// Gauge value.
    pub value: f64,
}

/// Thread-safe store of the latest sample per entity for one mapping.
#[derive(Debug)]
pub struct GaugeCollector {
    mapping: Mapping,
    descriptor: Descriptor,
    /// TTL as a signed delta, saturated for durations chrono cannot represent.
    ttl: TimeDelta,
    collection: RwLock<HashMap<EntryKey, StoredMetric>>,
}

impl GaugeCollector {
    /// Creates an empty collector for `mapping`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping's metric or label names are invalid.
    pub fn new(mapping: Mapping) -> Result<Self> {
        let name = mapping.validate()?;
        let descriptor = Descriptor {
            name,
            help: mapping.help.clone(),
            label_names: mapping.label_names.clone(),
        };
        let ttl = TimeDelta::from_std(mapping.ttl).unwrap_or(TimeDelta::MAX);

        Ok(Self {
            mapping,
            descriptor,
            ttl,
            collection: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the mapping this collector was built from.
    #[must_use]
    pub const fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.descriptor.name
    }

    /// Returns the exposition descriptor.
    #[must_use]
    pub const fn describe(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Resolves the entry key a sample is stored under.
    ///
    /// # Errors
    ///
    /// Returns `MissingSampleId` when the mapping is keyed by sample ID and the
    /// sample has none.
    pub fn identity_of(&self, sample: &Sample) -> Result<EntryKey> {
        match self.mapping.identity {
            IdentitySource::SampleId => match sample.id.as_deref() {
                Some(id) if !id.is_empty() => Ok(EntryKey::Id(id.to_string())),
                _ => Err(VaultError::MissingSampleId {
                    metric: self.mapping.name.clone(),
                }),
            },
            IdentitySource::LabelHash => Ok(EntryKey::LabelHash(hash_labels(&sample.labels))),
        }
    }

    /// Stores a sample observed at ingestion time `now`.
    ///
    /// The entry's freshness clock moves to the sample's timestamp when it has
    /// one. Untimed samples move it to `now` only for new entries or a changed
    /// value; an unchanged re-emission leaves it where it was. Value and label
    /// values are always overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample's label count does not match the mapping
    /// or its identity cannot be resolved. The collector is left untouched.
    #[allow(clippy::float_cmp)] // Exact change detection on the stored value
    pub fn store(&self, now: DateTime<Utc>, sample: Sample) -> Result<()> {
        let expected = self.descriptor.label_names.len();
        if sample.labels.len() != expected {
            return Err(VaultError::LabelCardinality {
                metric: self.mapping.name.clone(),
                expected,
                actual: sample.labels.len(),
            });
        }

        let key = self.identity_of(&sample)?;

        let mut collection = self.collection.write();
        match collection.get_mut(&key) {
            Some(stored) => {
                if let Some(timestamp) = sample.timestamp {
                    stored.last_update = timestamp;
                } else if sample.value != stored.value {
                    stored.last_update = now;
                }
                stored.value = sample.value;
                stored.label_values = sample.labels;
            }
            None => {
                collection.insert(
                    key,
                    StoredMetric {
                        value: sample.value,
                        label_values: sample.labels,
                        last_update: sample.timestamp.unwrap_or(now),
                    },
                );
            }
        }

        Ok(())
    }

    /// Evicts every entry whose last update plus TTL is strictly before `now`.
    ///
    /// Returns the number of evicted entries.
    pub fn clear(&self, now: DateTime<Utc>) -> usize {
        let mut collection = self.collection.write();
        let before = collection.len();
        collection.retain(|_, stored| !self.is_expired(stored, now));
        let evicted = before - collection.len();
        drop(collection);

        if evicted > 0 {
            debug!(metric = %self.descriptor.name, evicted, "evicted stale entries");
        }
        evicted
    }

    /// Returns the live rows behind a shared lock.
    ///
    /// Stores and sweeps on this collector wait until the returned [`Rows`] is dropped.
    #[must_use]
    pub fn collect(&self) -> Rows<'_> {
        Rows {
            collection: self.collection.read(),
        }
    }

    /// Returns a copy of the entry stored under `key`.
    #[must_use]
    pub fn get(&self, key: &EntryKey) -> Option<StoredMetric> {
        self.collection.read().get(key).cloned()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.read().len()
    }

    /// Returns `true` if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.read().is_empty()
    }

    fn is_expired(&self, stored: &StoredMetric, now: DateTime<Utc>) -> bool {
        // A deadline past chrono's range never expires.
        stored
            .last_update
            .checked_add_signed(self.ttl)
            .is_some_and(|deadline| deadline < now)
    }
}

/// Live rows of a collector, held under its read lock.
#[derive(Debug)]
pub struct Rows<'a> {
    collection: RwLockReadGuard<'a, HashMap<EntryKey, StoredMetric>>,
}

impl Rows<'_> {
    /// Iterates the rows in no particular order.
    ///
    /// Every row matches the descriptor's label arity; [`GaugeCollector::store`]
    /// rejects anything else.
    pub fn iter(&self) -> impl Iterator<Item = GaugeRow<'_>> + '_ {
        self.collection.values().map(|stored| GaugeRow {
            label_values: &stored.label_values,
            value: stored.value,
        })
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Returns `true` if there are no stored entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

/// Derives a legacy identity from ordered label values.
///
/// Not collision-free: a 64-bit FNV-1a hash over each value followed by
/// [`LABELS_SEPARATOR`].
#[must_use]
pub fn hash_labels<S: AsRef<str>>(labels: &[S]) -> u64 {
    let mut hasher = FnvHasher::default();
    for label in labels {
        hasher.write(label.as_ref().as_bytes());
        hasher.write(&[LABELS_SEPARATOR]);
    }
    hasher.finish()
}
