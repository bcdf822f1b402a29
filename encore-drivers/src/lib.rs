//! Driver layer for rendering event pages in a real browser.
//!
//! This crate owns the WebDriver session used to turn a URL into fully
//! rendered HTML, with automation fingerprints suppressed so that typical
//! bot detection does not short-circuit rendering.
//!
//! - [`browser::renderer::Renderer`]: the render contract used by the pipeline
//! - [`browser::renderer::BrowserRenderer`]: one isolated session per call
//! - [`browser::driver::EncoreDriver`]: WebDriver client wrapper
//! - [`browser::page::EncorePage`]: navigation, readiness wait, page source
//! - [`browser::stealth`]: Chrome arguments and JS evasions
pub mod browser;

pub use browser::renderer::{BrowserRenderer, Renderer};
