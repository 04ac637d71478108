//! Warden Sync - the command-driven write path
//!
//! Consumes the three command streams delivered by the message-bus
//! collaborator and applies them to the index with optimistic versioning.
//! Also carries the bulk import/export surface and the initial-group-rights
//! backfill.

pub mod command;
pub mod service;
pub mod transfer;

pub use command::*;
pub use service::CommandService;
