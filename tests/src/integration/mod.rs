//! Cross-crate integration flows.

pub mod delivery;
pub mod properties;
pub mod scenarios;
