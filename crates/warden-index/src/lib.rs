//! Warden Index - rights-aware query compilation and retrieval
//!
//! Every read composes the mandatory rights filter with optional selection
//! and free-text clauses, compiled into index query documents and executed
//! against an [`warden_core::IndexStore`].

pub mod engine;
pub mod guard;
pub mod mapping;
pub mod memory;
pub mod query;

pub use engine::{Page, QueryEngine};
pub use guard::{bootstrap_kinds, GuardedStore, RetryPolicy};
pub use memory::MemoryIndex;

#[cfg(test)]
mod tests;
