//! Shared domain types for the dashboard alerting subsystem.
//!
//! Everything here is storage-agnostic: the alert and dashboard records, the
//! state enum, signed-in user identity, the injectable [`clock::Clock`] and
//! the process-wide id generator.

pub mod clock;
pub mod error;
pub mod id;
pub mod text;
pub mod types;
