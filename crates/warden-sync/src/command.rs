//! Inbound command payloads
//!
//! Wire shapes as delivered on the message bus: one stream per resource
//! kind plus the shared permission and user streams. Field casing follows
//! the upstream producers.

use serde::Deserialize;

/// Envelope of a resource-kind stream message. The domain payload travels
/// alongside these fields and is handed to the feature projector verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceCommand {
    pub command: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner: String,
}

/// Permission stream message; exactly one of `User`/`Group` is populated.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionCommand {
    pub command: String,
    #[serde(default, rename = "Kind")]
    pub kind: String,
    #[serde(default, rename = "Resource")]
    pub resource: String,
    #[serde(default, rename = "User")]
    pub user: String,
    #[serde(default, rename = "Group")]
    pub group: String,
    #[serde(default, rename = "Right")]
    pub right: String,
}

/// User stream message.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCommand {
    pub command: String,
    #[serde(default)]
    pub id: String,
}
