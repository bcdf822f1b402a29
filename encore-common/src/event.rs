use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A performer listed on the event page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    /// Absent when the page does not say what the artist plays.
    #[serde(default)]
    pub instrument: Option<String>,
}

impl Artist {
    /// A blank instrument counts as unknown.
    pub fn new(name: impl Into<String>, instrument: Option<&str>) -> Self {
        Self {
            name: name.into(),
            instrument: instrument
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(str::to_string),
        }
    }
}

/// A piece on the event's program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub title: String,
    pub composer: String,
}

impl Program {
    pub fn new(title: impl Into<String>, composer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            composer: composer.into(),
        }
    }
}

/// Structured description of a live performance.
///
/// Values are best-effort model output: `date` and `time` are free text and
/// any scalar may be empty when the source page lacks it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub date: String,
    pub time: String,
    pub venue_name: String,
    pub venue_address: String,
    pub patron_services_phone: String,
    pub patron_services_email: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub programs: Vec<Program>,
    pub music_director: String,
    pub event_description: String,
    pub ticket_status: String,
}

/// An [`Event`] as persisted for a source URL.
///
/// Serializes flat: the record identity sits next to the event fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}
