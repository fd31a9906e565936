//! Watch source reading Kubernetes events as a stream of JSON documents.
//!
//! Accepted shapes, freely mixed and whitespace-separated:
//!
//! - watch envelopes as printed by `kubectl get events --watch -o json`
//!   (`{"type": "ADDED", "object": {...}}`)
//! - `EventList` documents, treated as a full resynchronization
//! - bare `Event` objects
//!
//! A JSON syntax or I/O error ends the source. Well-formed documents that
//! are not events are logged and skipped.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ExporterError, ExporterResult};
use crate::event::{EventRecord, WatchEvent};
use crate::selector::FieldSelector;

/// Upper bound on remembered event UIDs before the set is reset.
const SEEN_CAPACITY: usize = 100_000;

/// Path that selects standard input as the events source.
pub const STDIN_PATH: &str = "-";

/// Turns decoded JSON documents into watch events.
#[derive(Debug, Default)]
pub struct Classifier {
    selector: FieldSelector,
    seen: HashSet<String>,
}

impl Classifier {
    /// Creates a classifier that only lets selected events through.
    #[must_use]
    pub fn new(selector: FieldSelector) -> Self {
        Self {
            selector,
            seen: HashSet::new(),
        }
    }

    /// Classifies one JSON document.
    pub fn classify(&mut self, value: Value) -> Vec<WatchEvent> {
        let Value::Object(map) = value else {
            warn!("Skipping non-object JSON document");
            return Vec::new();
        };

        if map.contains_key("type") && map.contains_key("object") {
            let kind = map.get("type").and_then(Value::as_str).unwrap_or_default();
            let object = map.get("object").cloned().unwrap_or(Value::Null);
            return self.envelope(kind, object).into_iter().collect();
        }

        let kind = map
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("Event")
            .to_owned();
        match kind.as_str() {
            "EventList" => {
                let items = match map.get("items") {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                self.resync(items)
            }
            "Event" => self.bare(Value::Object(map)).into_iter().collect(),
            other => {
                debug!(kind = other, "Skipping non-event document");
                Vec::new()
            }
        }
    }

    fn envelope(&mut self, kind: &str, object: Value) -> Option<WatchEvent> {
        match kind {
            "ADDED" | "MODIFIED" => {
                let record = Self::decode(object)?;
                let created = kind == "ADDED";
                self.remember(&record);
                self.select(record)
                    .map(|r| if created { WatchEvent::Created(r) } else { WatchEvent::Updated(r) })
            }
            "DELETED" | "BOOKMARK" => {
                debug!(kind, "Ignoring watch notification");
                None
            }
            "ERROR" => {
                let message = object
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                warn!(reason = message, "Watch reported an error");
                None
            }
            other => {
                warn!(kind = other, "Unknown watch notification type");
                None
            }
        }
    }

    fn bare(&mut self, object: Value) -> Option<WatchEvent> {
        let record = Self::decode(object)?;
        let created = !self.seen.contains(&record.metadata.uid);
        self.remember(&record);
        self.select(record)
            .map(|r| if created { WatchEvent::Created(r) } else { WatchEvent::Updated(r) })
    }

    fn resync(&mut self, items: Vec<Value>) -> Vec<WatchEvent> {
        let previous = std::mem::take(&mut self.seen);
        let mut events = Vec::with_capacity(items.len() + 1);

        for item in items {
            let Some(record) = Self::decode(item) else {
                continue;
            };
            let known = previous.contains(&record.metadata.uid);
            self.remember(&record);
            if let Some(record) = self.select(record) {
                events.push(if known {
                    WatchEvent::Updated(record)
                } else {
                    WatchEvent::Created(record)
                });
            }
        }

        info!(events = events.len(), "Events list resynchronized");
        events.push(WatchEvent::Resynced);
        events
    }

    fn decode(object: Value) -> Option<EventRecord> {
        match serde_json::from_value::<EventRecord>(object) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                None
            }
        }
    }

    fn remember(&mut self, record: &EventRecord) {
        if record.metadata.uid.is_empty() {
            return;
        }
        if self.seen.len() >= SEEN_CAPACITY {
            debug!(capacity = SEEN_CAPACITY, "Resetting seen event set");
            self.seen.clear();
        }
        self.seen.insert(record.metadata.uid.clone());
    }

    fn select(&self, record: EventRecord) -> Option<EventRecord> {
        self.selector.matches(&record).then_some(record)
    }
}

/// A blocking source of watch events backed by any reader.
#[derive(Debug)]
pub struct JsonEventSource<R> {
    reader: R,
    classifier: Classifier,
}

impl<R: Read> JsonEventSource<R> {
    /// Creates a source reading from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            classifier: Classifier::default(),
        }
    }

    /// Only forwards events matching `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: FieldSelector) -> Self {
        self.classifier = Classifier::new(selector);
        self
    }

    /// Reads the stream to its end, forwarding every watch event to `tx`.
    ///
    /// Must run on a blocking thread. Returns `Ok` only when the receiving
    /// side has gone away.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::SourceRead`] on malformed JSON or a read
    /// failure and [`ExporterError::SourceEnded`] once the input is exhausted.
    pub fn run(self, tx: &mpsc::Sender<WatchEvent>) -> ExporterResult<()> {
        let Self {
            reader,
            mut classifier,
        } = self;

        let stream = serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter::<Value>();
        for value in stream {
            for event in classifier.classify(value?) {
                if tx.blocking_send(event).is_err() {
                    debug!("Event receiver closed, stopping source");
                    return Ok(());
                }
            }
        }

        Err(ExporterError::SourceEnded)
    }
}

/// Opens the events source at `path`, where `-` means standard input.
///
/// # Errors
///
/// Returns [`ExporterError::SourceOpen`] if the file cannot be opened.
pub fn open(path: &str) -> ExporterResult<JsonEventSource<Box<dyn Read + Send>>> {
    let reader: Box<dyn Read + Send> = if path == STDIN_PATH {
        Box::new(io::stdin())
    } else {
        let file = File::open(path).map_err(|source| ExporterError::SourceOpen {
            path: path.to_string(),
            source,
        })?;
        Box::new(file)
    };
    Ok(JsonEventSource::new(reader))
}
