//! Turns normalized page text into an [`Event`] by asking a model for a
//! schema-constrained JSON reply.

use crate::traits::{LlmClient, LlmError, OutputSchema};
use async_trait::async_trait;
use encore_common::{Artist, EncoreError, Event, Program, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Fixed instruction sent ahead of every page.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an information extraction assistant. \
Please extract the following information from the text: \n\
1. Event name\n2. Date\n3. Time\n4. Venue name\n5. Venue address\n\
6. Patron services contact phone\n7. Patron services contact email\n\
8. Artists (name and instrument)\n9. Program (title and composer)\n\
10. Music director\n11. Event description\n12. Ticket status";

const SCHEMA_NAME: &str = "event";

/// Lowest-variance sampling; identical text should yield the same event as
/// often as the model allows.
pub const EXTRACTION_TEMPERATURE: f32 = 0.0;

#[async_trait]
pub trait EventExtractor: Send + Sync {
    /// Extract one event from visible page text.
    async fn extract(&self, text: &str) -> Result<Event>;
}

pub struct LlmEventExtractor {
    client: Arc<dyn LlmClient>,
    schema: OutputSchema,
    max_tokens: Option<u32>,
}

impl LlmEventExtractor {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: Option<u32>) -> Self {
        Self {
            client,
            schema: OutputSchema::new(SCHEMA_NAME, event_schema()),
            max_tokens,
        }
    }
}

#[async_trait]
impl EventExtractor for LlmEventExtractor {
    async fn extract(&self, text: &str) -> Result<Event> {
        let started = Instant::now();
        tracing::info!(
            target: "extract",
            model = self.client.model_name(),
            text_bytes = text.len(),
            "extract.start"
        );

        let reply = self
            .client
            .generate_structured(
                text,
                EXTRACTION_SYSTEM_PROMPT,
                &self.schema,
                self.max_tokens,
                Some(EXTRACTION_TEMPERATURE),
            )
            .await
            .map_err(|e| {
                tracing::warn!(target: "extract", error = %e, "extract.failed");
                EncoreError::from(e)
            })?;

        let event = decode_event(reply)?;
        tracing::info!(
            target: "extract",
            name = %event.name,
            artists = event.artists.len(),
            programs = event.programs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extract.done"
        );
        Ok(event)
    }
}

impl From<LlmError> for EncoreError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Config(msg) => EncoreError::Config(msg),
            other => EncoreError::ExtractionFailure(other.to_string()),
        }
    }
}

/// JSON schema describing [`Event`].
///
/// Every property is listed as required so strict decoders accept it; the
/// one optional value, an artist's instrument, is nullable instead.
pub fn event_schema() -> Value {
    let text = |description: &str| json!({ "type": "string", "description": description });
    json!({
        "type": "object",
        "properties": {
            "name": text("The name of the event"),
            "date": text("The date of the event"),
            "time": text("The time of the event"),
            "venue_name": text("The name of the venue"),
            "venue_address": text("The address of the venue"),
            "patron_services_phone": text("The phone number for patron services"),
            "patron_services_email": text("The email address for patron services"),
            "artists": {
                "type": "array",
                "description": "List of artists performing",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": text("The name of the artist"),
                        "instrument": {
                            "type": ["string", "null"],
                            "description": "The instrument played by the artist (if known)"
                        }
                    },
                    "required": ["name", "instrument"],
                    "additionalProperties": false
                }
            },
            "programs": {
                "type": "array",
                "description": "List of program pieces",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": text("The title of the program piece"),
                        "composer": text("The composer of the program piece")
                    },
                    "required": ["title", "composer"],
                    "additionalProperties": false
                }
            },
            "music_director": text("The music director for the event"),
            "event_description": text("A description of the event"),
            "ticket_status": text("The current ticket status for the event")
        },
        "required": [
            "name", "date", "time", "venue_name", "venue_address",
            "patron_services_phone", "patron_services_email", "artists",
            "programs", "music_director", "event_description", "ticket_status"
        ],
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
struct EventWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    venue_name: Option<String>,
    #[serde(default)]
    venue_address: Option<String>,
    #[serde(default)]
    patron_services_phone: Option<String>,
    #[serde(default)]
    patron_services_email: Option<String>,
    #[serde(default)]
    artists: Option<Vec<ArtistWire>>,
    #[serde(default)]
    programs: Option<Vec<ProgramWire>>,
    #[serde(default)]
    music_director: Option<String>,
    #[serde(default)]
    event_description: Option<String>,
    #[serde(default)]
    ticket_status: Option<String>,
}

#[derive(Deserialize)]
struct ArtistWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instrument: Option<String>,
}

#[derive(Deserialize)]
struct ProgramWire {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    composer: Option<String>,
}

fn clean(field: Option<String>) -> String {
    field.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Decode a model reply into an [`Event`].
///
/// Missing or null scalars become empty strings and missing lists become
/// empty. Artists without a name and programs with neither title nor
/// composer are dropped. Values of the wrong JSON type are rejected.
pub fn decode_event(reply: Value) -> Result<Event> {
    if !reply.is_object() {
        return Err(EncoreError::ExtractionFailure(
            "model reply is not a JSON object".into(),
        ));
    }
    let wire: EventWire = serde_json::from_value(reply).map_err(|e| {
        EncoreError::ExtractionFailure(format!("model reply does not match the event shape: {e}"))
    })?;

    let artists = wire
        .artists
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let name = clean(a.name);
            if name.is_empty() {
                return None;
            }
            let instrument = Some(clean(a.instrument)).filter(|i| !i.is_empty());
            Some(Artist { name, instrument })
        })
        .collect();

    let programs = wire
        .programs
        .unwrap_or_default()
        .into_iter()
        .map(|p| Program {
            title: clean(p.title),
            composer: clean(p.composer),
        })
        .filter(|p| !(p.title.is_empty() && p.composer.is_empty()))
        .collect();

    Ok(Event {
        name: clean(wire.name),
        date: clean(wire.date),
        time: clean(wire.time),
        venue_name: clean(wire.venue_name),
        venue_address: clean(wire.venue_address),
        patron_services_phone: clean(wire.patron_services_phone),
        patron_services_email: clean(wire.patron_services_email),
        artists,
        programs,
        music_director: clean(wire.music_director),
        event_description: clean(wire.event_description),
        ticket_status: clean(wire.ticket_status),
    })
}
