//! Typed Kubernetes events as delivered by the watch source.
//!
//! Only the `core/v1` `Event` fields the exporter projects into labels are
//! modelled. Unknown fields are ignored and `null` reads as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An upstream observation, tagged by what the source saw.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The source saw this event for the first time.
    Created(EventRecord),
    /// The source saw a new revision of a known event.
    Updated(EventRecord),
    /// The source finished a full resynchronization.
    Resynced,
}

impl WatchEvent {
    /// Returns the carried record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&EventRecord> {
        match self {
            Self::Created(record) | Self::Updated(record) => Some(record),
            Self::Resynced => None,
        }
    }
}

/// Object metadata of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Unique ID assigned by the API server.
    #[serde(deserialize_with = "nullable")]
    pub uid: String,
    /// Event object name.
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// Event object namespace.
    #[serde(deserialize_with = "nullable")]
    pub namespace: String,
}

/// The component that reported an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSource {
    /// Reporting component, e.g. `kubelet`.
    #[serde(deserialize_with = "nullable")]
    pub component: String,
    /// Node name the event originated on.
    #[serde(deserialize_with = "nullable")]
    pub host: String,
}

/// The object an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    /// Object kind, e.g. `Pod`.
    #[serde(deserialize_with = "nullable")]
    pub kind: String,
    /// Object name.
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// Object namespace.
    #[serde(deserialize_with = "nullable")]
    pub namespace: String,
}

/// A Kubernetes `core/v1` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRecord {
    /// Object metadata.
    #[serde(deserialize_with = "nullable")]
    pub metadata: ObjectMeta,
    /// `Normal` or `Warning`.
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub event_type: String,
    /// Short machine-readable reason.
    #[serde(deserialize_with = "nullable")]
    pub reason: String,
    /// Human-readable description.
    #[serde(deserialize_with = "nullable")]
    pub message: String,
    /// Number of times this event has occurred.
    pub count: Option<i32>,
    /// Reporting component (legacy field).
    #[serde(deserialize_with = "nullable")]
    pub source: EventSource,
    /// The object this event is about.
    #[serde(deserialize_with = "nullable")]
    pub involved_object: ObjectReference,
    /// Controller that emitted the event.
    #[serde(deserialize_with = "nullable")]
    pub reporting_component: String,
    /// Instance of the controller that emitted the event.
    #[serde(deserialize_with = "nullable")]
    pub reporting_instance: String,
    /// When the most recent occurrence was recorded.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// When the event was first observed, with microsecond precision.
    pub event_time: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// Returns the time of the most recent occurrence, if the record has one.
    #[must_use]
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp.or(self.event_time)
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_EVENT: &str = r#"{
        "apiVersion": "v1",
        "kind": "Event",
        "metadata": {"name": "web-0.17a", "namespace": "default", "uid": "6b1c"},
        "type": "Warning",
        "reason": "BackOff",
        "message": "Back-off restarting failed container",
        "count": 7,
        "source": {"component": "kubelet", "host": "node-1"},
        "involvedObject": {"kind": "Pod", "name": "web-0", "namespace": "default"},
        "reportingComponent": "kubelet",
        "reportingInstance": "node-1",
        "firstTimestamp": "2024-05-01T11:00:00Z",
        "lastTimestamp": "2024-05-01T12:00:00Z",
        "eventTime": null
    }"#;

    #[test]
    fn deserializes_core_v1_event() {
        let record: EventRecord = serde_json::from_str(POD_EVENT).unwrap();

        assert_eq!(record.metadata.uid, "6b1c");
        assert_eq!(record.event_type, "Warning");
        assert_eq!(record.reason, "BackOff");
        assert_eq!(record.count, Some(7));
        assert_eq!(record.source.component, "kubelet");
        assert_eq!(record.source.host, "node-1");
        assert_eq!(record.involved_object.kind, "Pod");
        assert_eq!(record.involved_object.name, "web-0");
        assert_eq!(record.reporting_component, "kubelet");
        assert_eq!(record.reporting_instance, "node-1");
        assert!(record.event_time.is_none());
        assert_eq!(
            record.observed_at().unwrap().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn nulls_and_missing_fields_read_as_empty() {
        let json = r#"{"metadata": {"uid": "1"}, "message": null, "source": null, "count": null}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.metadata.uid, "1");
        assert!(record.message.is_empty());
        assert_eq!(record.source, EventSource::default());
        assert!(record.count.is_none());
        assert!(record.observed_at().is_none());
    }

    #[test]
    fn observed_at_falls_back_to_event_time() {
        let json = r#"{"eventTime": "2024-05-01T12:00:00.123456Z"}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.observed_at(), record.event_time);
        assert!(record.observed_at().is_some());
    }

    #[test]
    fn watch_event_record_accessor() {
        let record = EventRecord::default();

        assert_eq!(WatchEvent::Created(record.clone()).record(), Some(&record));
        assert_eq!(WatchEvent::Updated(record.clone()).record(), Some(&record));
        assert_eq!(WatchEvent::Resynced.record(), None);
    }
}
