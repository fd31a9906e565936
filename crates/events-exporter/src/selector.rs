//! Field selectors for filtering events before they reach the vault.
//!
//! Syntax follows `kubectl --field-selector`: comma-separated requirements
//! of the form `field=value`, `field==value` or `field!=value`. All
//! requirements must hold for an event to be selected.

use std::fmt;
use std::str::FromStr;

use crate::error::{ExporterError, ExporterResult};
use crate::event::EventRecord;

/// Event fields a selector can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `type`
    Type,
    /// `reason`
    Reason,
    /// `involvedObject.kind`
    InvolvedKind,
    /// `involvedObject.name`
    InvolvedName,
    /// `involvedObject.namespace`
    InvolvedNamespace,
    /// `source.component`
    SourceComponent,
    /// `source.host`
    SourceHost,
    /// `metadata.name`
    Name,
    /// `metadata.namespace`
    Namespace,
}

impl Field {
    fn parse(path: &str) -> Option<Self> {
        Some(match path {
            "type" => Self::Type,
            "reason" => Self::Reason,
            "involvedObject.kind" => Self::InvolvedKind,
            "involvedObject.name" => Self::InvolvedName,
            "involvedObject.namespace" => Self::InvolvedNamespace,
            "source.component" => Self::SourceComponent,
            "source.host" => Self::SourceHost,
            "metadata.name" => Self::Name,
            "metadata.namespace" => Self::Namespace,
            _ => return None,
        })
    }

    const fn path(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Reason => "reason",
            Self::InvolvedKind => "involvedObject.kind",
            Self::InvolvedName => "involvedObject.name",
            Self::InvolvedNamespace => "involvedObject.namespace",
            Self::SourceComponent => "source.component",
            Self::SourceHost => "source.host",
            Self::Name => "metadata.name",
            Self::Namespace => "metadata.namespace",
        }
    }

    fn value_of(self, record: &EventRecord) -> &str {
        match self {
            Self::Type => &record.event_type,
            Self::Reason => &record.reason,
            Self::InvolvedKind => &record.involved_object.kind,
            Self::InvolvedName => &record.involved_object.name,
            Self::InvolvedNamespace => &record.involved_object.namespace,
            Self::SourceComponent => &record.source.component,
            Self::SourceHost => &record.source.host,
            Self::Name => &record.metadata.name,
            Self::Namespace => &record.metadata.namespace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    field: Field,
    value: String,
    negated: bool,
}

impl Requirement {
    fn matches(&self, record: &EventRecord) -> bool {
        (self.field.value_of(record) == self.value) != self.negated
    }
}

/// A parsed field selector. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    requirements: Vec<Requirement>,
}

impl FieldSelector {
    /// Parses a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::InvalidSelector`] if a requirement has no
    /// operator or names an unsupported field.
    pub fn parse(selector: &str) -> ExporterResult<Self> {
        let invalid = |reason: String| ExporterError::InvalidSelector {
            selector: selector.to_string(),
            reason,
        };

        let mut requirements = Vec::new();
        for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (path, value, negated) = if let Some((path, value)) = term.split_once("!=") {
                (path, value, true)
            } else if let Some((path, value)) = term.split_once("==") {
                (path, value, false)
            } else if let Some((path, value)) = term.split_once('=') {
                (path, value, false)
            } else {
                return Err(invalid(format!("expected field=value in {term:?}")));
            };

            let path = path.trim();
            let field = Field::parse(path)
                .ok_or_else(|| invalid(format!("unsupported field {path:?}")))?;

            requirements.push(Requirement {
                field,
                value: value.trim().to_string(),
                negated,
            });
        }

        Ok(Self { requirements })
    }

    /// Returns true if the record satisfies every requirement.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.requirements.iter().all(|r| r.matches(record))
    }

    /// Returns true if the selector has no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl FromStr for FieldSelector {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let op = if r.negated { "!=" } else { "=" };
            write!(f, "{}{op}{}", r.field.path(), r.value)?;
        }
        Ok(())
    }
}
