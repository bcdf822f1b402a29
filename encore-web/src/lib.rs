//! Page text utilities.
//!
//! - [`text::normalize_html`]: rendered HTML to a single line of visible text

pub mod text;

pub use text::normalize_html;
