//! Warden Core - Domain types and traits for the permission search index

pub mod config;
pub mod error;
pub mod model;
pub mod rights;
pub mod selection;
pub mod traits;

pub use config::*;
pub use error::*;
pub use model::*;
pub use rights::*;
pub use selection::*;
pub use traits::*;
