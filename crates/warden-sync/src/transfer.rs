//! Bulk import/export and the initial-group-rights backfill

use std::collections::HashMap;

use tracing::{info, instrument};

use warden_core::{Entry, ResourceRights, Result, SearchRequest, WardenError};
use warden_index::query;

use crate::service::CommandService;

/// Page size for the export full scan.
const EXPORT_PAGE: usize = 100;

impl CommandService {
    /// Exports every configured kind as transport rights records.
    #[instrument(skip(self))]
    pub async fn export(&self) -> Result<HashMap<String, Vec<ResourceRights>>> {
        let mut exports = HashMap::new();
        let kinds: Vec<String> = self.config().kinds().map(String::from).collect();
        for kind in kinds {
            let records = self.export_kind_all(&kind).await?;
            exports.insert(kind, records);
        }
        Ok(exports)
    }

    /// Scans a kind to exhaustion in fixed-size pages.
    pub async fn export_kind_all(&self, kind: &str) -> Result<Vec<ResourceRights>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self.export_kind(kind, EXPORT_PAGE, offset).await?;
            let last_page = batch.len() < EXPORT_PAGE;
            result.extend(batch);
            if last_page {
                return Ok(result);
            }
            offset += EXPORT_PAGE;
        }
    }

    pub async fn export_kind(
        &self,
        kind: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ResourceRights>> {
        let hits = self
            .store()
            .search(
                kind,
                SearchRequest::new(query::match_all()).paged(offset, limit),
            )
            .await?;
        hits.iter()
            .map(|hit| {
                let entry: Entry = serde_json::from_value(hit.source.clone()).map_err(|e| {
                    WardenError::internal(format!("malformed index document {}: {}", hit.id, e))
                })?;
                Ok(entry.to_resource_rights())
            })
            .collect()
    }

    /// Imports records per kind. Import is a full overwrite of each
    /// resource, no prior document version is preserved.
    #[instrument(skip(self, imports))]
    pub async fn import(&self, imports: &HashMap<String, Vec<ResourceRights>>) -> Result<()> {
        for (kind, records) in imports {
            for record in records {
                self.import_resource(kind, record).await?;
            }
        }
        Ok(())
    }

    pub async fn import_resource(&self, kind: &str, record: &ResourceRights) -> Result<()> {
        let mut entry = Entry::new(record.resource_id.clone(), record.features.clone());
        entry.creator = record.creator.clone();
        entry.apply_resource_rights(record);
        // Unconditional write: an existing document is overwritten.
        self.write_entry(kind, &mut entry, None).await
    }

    /// Re-applies the configured initial group rights to every existing
    /// document of every kind. Used after configuration changes.
    #[instrument(skip(self))]
    pub async fn update_initial_group_rights(&self) -> Result<()> {
        let kinds: Vec<String> = self.config().kinds().map(String::from).collect();
        for kind in kinds {
            let pairs: Vec<(String, String)> = self
                .config()
                .kind(&kind)
                .initial_group_rights
                .iter()
                .map(|(group, rights)| (group.clone(), rights.clone()))
                .collect();
            if pairs.is_empty() {
                continue;
            }
            let records = self.export_kind_all(&kind).await?;
            info!(kind = %kind, resources = records.len(), "backfilling initial group rights");
            for record in records {
                for (group, rights) in &pairs {
                    self.set_group_right(&kind, &record.resource_id, group, rights)
                        .await?;
                }
            }
        }
        Ok(())
    }
}
