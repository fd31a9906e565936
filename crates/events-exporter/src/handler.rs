//! Projection of Kubernetes events into the `kube_event_info` gauge.

use std::sync::Arc;
use std::time::Duration;

use event_vault::{Mapping, MetricsVault, Sample};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::event::{EventRecord, WatchEvent};

/// Name of the metric family every event is stored under.
pub const EVENT_METRIC: &str = "kube_event_info";

/// Longest message, in characters, that is kept as a label value.
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Label names of [`EVENT_METRIC`], in the order [`event_to_sample`] fills them.
pub const EVENT_LABELS: [&str; 10] = [
    "type",
    "source_component",
    "source_host",
    "involved_kind",
    "involved_name",
    "involved_namespace",
    "reporting_controller",
    "reporting_instance",
    "reason",
    "message",
];

/// Builds the mapping for [`EVENT_METRIC`] with the given TTL.
#[must_use]
pub fn event_mapping(ttl: Duration) -> Mapping {
    Mapping::new(EVENT_METRIC, "Expose Kubernetes events information", ttl).with_labels(EVENT_LABELS)
}

/// Converts an event into a vault sample.
///
/// The event's UID is the identity and its count the value. The message is
/// cut to [`MAX_MESSAGE_CHARS`] characters, or left empty when
/// `omit_messages` is set to keep label cardinality down.
#[must_use]
pub fn event_to_sample(event: &EventRecord, omit_messages: bool) -> Sample {
    let message = if omit_messages {
        String::new()
    } else {
        truncate_chars(&event.message, MAX_MESSAGE_CHARS).to_string()
    };

    let labels = [
        event.event_type.clone(),
        event.source.component.clone(),
        event.source.host.clone(),
        event.involved_object.kind.clone(),
        event.involved_object.name.clone(),
        event.involved_object.namespace.clone(),
        event.reporting_component.clone(),
        event.reporting_instance.clone(),
        event.reason.clone(),
        message,
    ];

    let sample = Sample::new(labels, f64::from(event.count.unwrap_or(0))).with_id(event.metadata.uid.clone());
    match event.observed_at() {
        Some(at) => sample.with_timestamp(at),
        None => sample,
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Stores incoming events in the vault.
#[derive(Debug, Clone)]
pub struct EventHandler {
    vault: Arc<MetricsVault>,
    omit_messages: bool,
}

impl EventHandler {
    /// Creates a handler writing to `vault`.
    #[must_use]
    pub const fn new(vault: Arc<MetricsVault>, omit_messages: bool) -> Self {
        Self {
            vault,
            omit_messages,
        }
    }

    /// Applies one watch event.
    ///
    /// A resync triggers an immediate sweep.
    ///
    /// # Errors
    ///
    /// Returns the vault's error if the sample is rejected.
    pub fn handle(&self, event: &WatchEvent) -> event_vault::Result<()> {
        match event {
            WatchEvent::Created(record) | WatchEvent::Updated(record) => {
                debug!(
                    uid = %record.metadata.uid,
                    namespace = %record.involved_object.namespace,
                    kind = %record.involved_object.kind,
                    name = %record.involved_object.name,
                    reason = %record.reason,
                    count = record.count.unwrap_or(0),
                    "Received event"
                );
                self.vault
                    .store(EVENT_METRIC, event_to_sample(record, self.omit_messages))
            }
            WatchEvent::Resynced => {
                let evicted = self.vault.remove_stale_metrics();
                debug!(evicted, "Swept after resync");
                Ok(())
            }
        }
    }

    /// Consumes events until the sending side closes.
    pub async fn run(self, mut rx: mpsc::Receiver<WatchEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle(&event) {
                error!(error = %e, "Failed to collect event");
            }
        }
        info!("Event channel closed, handler stopped");
    }
}
