//! Common types and utilities shared across Encore crates.
//!
//! This crate defines the extracted event model, the shared error taxonomy,
//! and observability helpers used throughout the Encore workspace. It is
//! intentionally lightweight so that every crate in the pipeline can depend
//! on it without pulling in browser, model, or database dependencies.
//!
//! # Overview
//!
//! - [`Event`], [`Artist`], [`Program`]: the structured record extracted from a page
//! - [`StoredRecord`]: an [`Event`] as persisted, keyed by its source URL
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`EncoreError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use encore_common::{Artist, Event};
//!
//! let event = Event {
//!     name: "Fall Gala".into(),
//!     artists: vec![Artist::new("Yo-Yo Ma", Some("cello"))],
//!     ..Event::default()
//! };
//! assert_eq!(event.artists[0].instrument.as_deref(), Some("cello"));
//! assert!(event.programs.is_empty());
//! ```
use std::time::Duration;

pub mod event;
pub mod observability;

pub use event::{Artist, Event, Program, StoredRecord};

/// Error types used across the Encore pipeline.
///
/// Each variant maps to one failure class of the save/get flow. A lookup
/// that finds nothing is not an error and is modelled as `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum EncoreError {
    /// The caller supplied a missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The page did not become ready before the render deadline.
    #[error("Render timed out after {}s", .0.as_secs_f32())]
    RenderTimeout(Duration),

    /// Navigation, network, or WebDriver session failure.
    #[error("Render failed: {0}")]
    RenderFailure(String),

    /// The model service failed or returned something that is not an Event.
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    /// Connectivity or constraint failure in the durable store.
    #[error("Database error: {0}")]
    StorageFailure(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EncoreError {
    /// Whether the caller may reasonably retry the whole request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RenderTimeout(_)
                | Self::RenderFailure(_)
                | Self::ExtractionFailure(_)
                | Self::StorageFailure(_)
        )
    }
}

/// Convenient alias for results that use [`EncoreError`].
pub type Result<T> = std::result::Result<T, EncoreError>;
