//! Command handlers
//!
//! Each handler is a pure function of (current state, command): it reads the
//! affected document with its version, applies the mutation and writes back
//! conditioned on that version. A concurrent writer that commits first makes
//! the write fail with a version conflict; redelivery is the message bus's
//! responsibility, the pipeline never retries on its own.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use warden_core::{
    Config, Entry, FeatureProjector, IndexStore, Result, RightSet, SearchRequest, WardenError,
};
use warden_index::{query, QueryEngine};

/// Page size for the scan-then-mutate passes (user deletion, backfill).
const SCAN_PAGE: usize = 20;

use crate::command::{PermissionCommand, ResourceCommand, UserCommand};

pub struct CommandService {
    store: Arc<dyn IndexStore>,
    config: Arc<Config>,
    projector: Arc<dyn FeatureProjector>,
    engine: QueryEngine,
}

impl CommandService {
    pub fn new(
        store: Arc<dyn IndexStore>,
        config: Arc<Config>,
        projector: Arc<dyn FeatureProjector>,
    ) -> Self {
        let engine = QueryEngine::new(store.clone(), config.clone());
        Self {
            store,
            config,
            projector,
            engine,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatches a resource-kind stream message.
    #[instrument(skip(self, payload))]
    pub async fn handle_resource_command(&self, kind: &str, payload: &[u8]) -> Result<()> {
        let command: ResourceCommand = serde_json::from_slice(payload)
            .map_err(|e| WardenError::invalid_request(format!("resource command: {}", e)))?;
        match command.command.as_str() {
            "PUT" => self.update_features(kind, &command, payload).await,
            "DELETE" => self.delete_features(kind, &command.id).await,
            other => Err(WardenError::unhandled_command(format!(
                "resource command {:?} on kind {}",
                other, kind
            ))),
        }
    }

    /// Dispatches a permission stream message.
    #[instrument(skip(self, payload))]
    pub async fn handle_permission_command(&self, payload: &[u8]) -> Result<()> {
        let command: PermissionCommand = serde_json::from_slice(payload)
            .map_err(|e| WardenError::invalid_request(format!("permission command: {}", e)))?;
        match (
            command.command.as_str(),
            !command.user.is_empty(),
            !command.group.is_empty(),
        ) {
            ("PUT", true, _) => {
                self.set_user_right(
                    &command.kind,
                    &command.resource,
                    &command.user,
                    &command.right,
                )
                .await
            }
            ("PUT", false, true) => {
                self.set_group_right(
                    &command.kind,
                    &command.resource,
                    &command.group,
                    &command.right,
                )
                .await
            }
            ("DELETE", true, _) => {
                self.delete_user_right(&command.kind, &command.resource, &command.user)
                    .await
            }
            ("DELETE", false, true) => {
                self.delete_group_right(&command.kind, &command.resource, &command.group)
                    .await
            }
            _ => Err(WardenError::unhandled_command(format!(
                "permission command {:?} names neither user nor group",
                command.command
            ))),
        }
    }

    /// Dispatches a user stream message. Unknown user commands are logged
    /// and dropped; redelivering them would never succeed.
    #[instrument(skip(self, payload))]
    pub async fn handle_user_command(&self, payload: &[u8]) -> Result<()> {
        let command: UserCommand = serde_json::from_slice(payload)
            .map_err(|e| WardenError::invalid_request(format!("user command: {}", e)))?;
        if command.command == "DELETE" && !command.id.is_empty() {
            return self.delete_user(&command.id).await;
        }
        warn!(command = %command.command, "unhandled user command");
        Ok(())
    }

    /// Replaces a resource's features, creating the document with default
    /// permissions if it does not exist yet. ACL lists are never touched on
    /// update; the creator is backfilled from the first admin user when
    /// still empty.
    pub async fn update_features(
        &self,
        kind: &str,
        command: &ResourceCommand,
        payload: &[u8],
    ) -> Result<()> {
        let features = self.projector.project(kind, payload).await?;
        if self.engine.exists(kind, &command.id).await? {
            let (mut entry, version) = self.engine.get_entry(kind, &command.id).await?;
            entry.features = features;
            if entry.creator.is_empty() {
                if let Some(admin) = entry.admin_users.first() {
                    entry.creator = admin.clone();
                }
            }
            self.write_entry(kind, &mut entry, Some(version)).await
        } else {
            let mut entry = Entry::new(command.id.clone(), features);
            entry.creator = command.owner.clone();
            entry.apply_default_permissions(&self.config.kind(kind), &command.owner);
            info!(kind, resource = %command.id, owner = %command.owner, "creating resource");
            self.write_entry(kind, &mut entry, None).await
        }
    }

    /// Removes the whole document; deleting a missing resource is a no-op.
    pub async fn delete_features(&self, kind: &str, resource: &str) -> Result<()> {
        if self.engine.exists(kind, resource).await? {
            self.store.delete(kind, resource).await?;
        }
        Ok(())
    }

    /// Full revoke followed by a re-grant of the named rights.
    pub async fn set_user_right(
        &self,
        kind: &str,
        resource: &str,
        user: &str,
        rights: &str,
    ) -> Result<()> {
        let (mut entry, version) = self.engine.get_entry(kind, resource).await?;
        entry.revoke_user(user);
        entry.grant_user(user, RightSet::parse(rights));
        self.write_entry(kind, &mut entry, Some(version)).await
    }

    pub async fn set_group_right(
        &self,
        kind: &str,
        resource: &str,
        group: &str,
        rights: &str,
    ) -> Result<()> {
        let (mut entry, version) = self.engine.get_entry(kind, resource).await?;
        entry.revoke_group(group);
        entry.grant_group(group, RightSet::parse(rights));
        self.write_entry(kind, &mut entry, Some(version)).await
    }

    /// Removes the user from all four right lists.
    pub async fn delete_user_right(&self, kind: &str, resource: &str, user: &str) -> Result<()> {
        let (mut entry, version) = self.engine.get_entry(kind, resource).await?;
        entry.revoke_user(user);
        self.write_entry(kind, &mut entry, Some(version)).await
    }

    pub async fn delete_group_right(&self, kind: &str, resource: &str, group: &str) -> Result<()> {
        let (mut entry, version) = self.engine.get_entry(kind, resource).await?;
        entry.revoke_group(group);
        self.write_entry(kind, &mut entry, Some(version)).await
    }

    /// Cascading revoke across every configured kind. Not transactional: a
    /// failure mid-scan leaves earlier revokes applied; redelivery converges
    /// because revoked documents drop out of the membership query.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user: &str) -> Result<()> {
        for kind in self.config.kinds() {
            self.delete_user_from_kind(kind, user).await?;
        }
        Ok(())
    }

    pub async fn delete_user_from_kind(&self, kind: &str, user: &str) -> Result<()> {
        loop {
            let hits = self
                .store
                .search(
                    kind,
                    SearchRequest::new(query::user_membership(user)).paged(0, SCAN_PAGE),
                )
                .await?;
            if hits.is_empty() {
                return Ok(());
            }
            for hit in hits {
                self.delete_user_right(kind, &hit.id, user).await?;
            }
        }
    }

    pub(crate) async fn write_entry(
        &self,
        kind: &str,
        entry: &mut Entry,
        expected_version: Option<u64>,
    ) -> Result<()> {
        entry.rebuild_search_text();
        let source = serde_json::to_value(&*entry)
            .map_err(|e| WardenError::internal(format!("entry serialization: {}", e)))?;
        self.store
            .put(kind, &entry.resource, source, expected_version)
            .await?;
        Ok(())
    }
}
