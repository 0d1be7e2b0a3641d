//! Replication packages and the builders that produce them.
//!
//! A package is opaque to the sharing layer: it carries an id, an action and
//! the content paths it applies to, plus a serialized payload in a
//! builder-specific format.

mod builder;
mod types;

pub use builder::*;
pub use types::*;
