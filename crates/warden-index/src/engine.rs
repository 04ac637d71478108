//! The rights-filtered retrieval engine
//!
//! Every operation except [`QueryEngine::exists`] and
//! [`QueryEngine::get_entry`] composes the mandatory rights filter with the
//! operation's own criteria. Listing operations return the entry's feature
//! map augmented with `id`, `creator` and `permissions` (the requesting
//! principal's right quad); administrative operations return the transport
//! rights shape instead.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::instrument;

use warden_core::{
    Claims, Config, Entry, FeatureMap, IndexStore, ResourceRights, Result, RightSet, SearchRequest,
    Selection, SortSpec, VersionedDoc, WardenError,
};

use crate::query;

/// Page size used by the transparently paging "full" variants.
const FULL_SCAN_PAGE: usize = 20;

/// Numeric offset/limit pagination, parsed from request strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Page { limit, offset }
    }

    /// Parses string parameters; failures are client errors.
    pub fn parse(limit: &str, offset: &str) -> Result<Self> {
        let limit = limit
            .parse()
            .map_err(|_| WardenError::invalid_request(format!("invalid limit: {:?}", limit)))?;
        let offset = offset
            .parse()
            .map_err(|_| WardenError::invalid_request(format!("invalid offset: {:?}", offset)))?;
        Ok(Page { limit, offset })
    }
}

pub struct QueryEngine {
    store: Arc<dyn IndexStore>,
    config: Arc<Config>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn IndexStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Existence probe without a rights check; used by the synchronization
    /// pipeline to decide between create and update.
    pub async fn exists(&self, kind: &str, resource: &str) -> Result<bool> {
        self.store.exists(kind, resource).await
    }

    /// Fetches an entry together with its version token.
    pub async fn get_entry(&self, kind: &str, resource: &str) -> Result<(Entry, u64)> {
        let doc = self
            .store
            .get(kind, resource)
            .await?
            .ok_or_else(|| WardenError::not_found(kind, resource))?;
        Ok((decode_entry(&doc)?, doc.version))
    }

    /// Fetches an entry in the transport rights shape.
    pub async fn get_resource(&self, kind: &str, resource: &str) -> Result<ResourceRights> {
        let (entry, _) = self.get_entry(kind, resource).await?;
        Ok(entry.to_resource_rights())
    }

    /// Probes whether the principal holds every requested right on the
    /// resource. A missing resource and a denied one are indistinguishable.
    #[instrument(skip(self, claims))]
    pub async fn check_access(
        &self,
        kind: &str,
        resource: &str,
        claims: &Claims,
        rights: RightSet,
    ) -> Result<()> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::resource_term(resource));
        let hits = self
            .store
            .search(kind, SearchRequest::new(query::filtered(filters)).paged(0, 1))
            .await?;
        if hits.is_empty() {
            return Err(WardenError::access_denied(
                kind,
                resource,
                rights.to_string(),
            ));
        }
        Ok(())
    }

    /// Batch access probe; ids absent from the result are denied.
    #[instrument(skip(self, ids, claims))]
    pub async fn check_access_bulk(
        &self,
        kind: &str,
        ids: &[String],
        claims: &Claims,
        rights: RightSet,
    ) -> Result<HashSet<String>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::resource_terms(ids));
        let hits = self
            .store
            .search(
                kind,
                SearchRequest::new(query::filtered(filters)).paged(0, ids.len()),
            )
            .await?;
        let mut allowed = HashSet::new();
        for hit in hits {
            allowed.insert(decode_entry(&hit)?.resource);
        }
        Ok(allowed)
    }

    /// One page of readable (per the requested rights) resources.
    pub async fn list(
        &self,
        kind: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
    ) -> Result<Vec<FeatureMap>> {
        self.run_list(kind, query::rights_clauses(rights, claims), None, page, None, claims)
            .await
    }

    /// Like [`Self::list`], ordered by a feature field.
    pub async fn list_ordered(
        &self,
        kind: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
    ) -> Result<Vec<FeatureMap>> {
        self.run_list(
            kind,
            query::rights_clauses(rights, claims),
            None,
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    /// The complete readable result set, paged through transparently.
    pub async fn list_all(
        &self,
        kind: &str,
        claims: &Claims,
        rights: RightSet,
    ) -> Result<Vec<FeatureMap>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .list(kind, claims, rights, Page::new(FULL_SCAN_PAGE, offset))
                .await?;
            if batch.is_empty() {
                return Ok(result);
            }
            result.extend(batch);
            offset += FULL_SCAN_PAGE;
        }
    }

    /// The ids of every resource the principal holds the rights on.
    pub async fn list_ids(
        &self,
        kind: &str,
        claims: &Claims,
        rights: RightSet,
    ) -> Result<Vec<String>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let hits = self
                .store
                .search(
                    kind,
                    SearchRequest::new(query::filtered(query::rights_clauses(rights, claims)))
                        .paged(offset, FULL_SCAN_PAGE),
                )
                .await?;
            if hits.is_empty() {
                return Ok(result);
            }
            for hit in &hits {
                result.push(decode_entry(hit)?.resource);
            }
            offset += FULL_SCAN_PAGE;
        }
    }

    /// Relevance-ranked free-text search over the readable resources.
    pub async fn search(
        &self,
        kind: &str,
        text: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
    ) -> Result<Vec<FeatureMap>> {
        self.run_list(
            kind,
            query::rights_clauses(rights, claims),
            Some(query::feature_search(text)),
            page,
            None,
            claims,
        )
        .await
    }

    /// Free-text search with an explicit order; the order overrides the
    /// relevance ranking.
    pub async fn search_ordered(
        &self,
        kind: &str,
        text: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
    ) -> Result<Vec<FeatureMap>> {
        self.run_list(
            kind,
            query::rights_clauses(rights, claims),
            Some(query::feature_search(text)),
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    /// All free-text matches, paged through transparently.
    pub async fn search_all(
        &self,
        kind: &str,
        text: &str,
        claims: &Claims,
        rights: RightSet,
    ) -> Result<Vec<FeatureMap>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .search(kind, text, claims, rights, Page::new(FULL_SCAN_PAGE, offset))
                .await?;
            if batch.is_empty() {
                return Ok(result);
            }
            result.extend(batch);
            offset += FULL_SCAN_PAGE;
        }
    }

    /// Exact-match filter on a feature field.
    pub async fn select_by_field(
        &self,
        kind: &str,
        field: &str,
        value: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::feature_term(field, value));
        self.run_list(kind, filters, None, page, None, claims).await
    }

    pub async fn select_by_field_ordered(
        &self,
        kind: &str,
        field: &str,
        value: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::feature_term(field, value));
        self.run_list(
            kind,
            filters,
            None,
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    pub async fn select_by_field_all(
        &self,
        kind: &str,
        field: &str,
        value: &str,
        claims: &Claims,
        rights: RightSet,
    ) -> Result<Vec<FeatureMap>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .select_by_field(
                    kind,
                    field,
                    value,
                    claims,
                    rights,
                    Page::new(FULL_SCAN_PAGE, offset),
                )
                .await?;
            if batch.is_empty() {
                return Ok(result);
            }
            result.extend(batch);
            offset += FULL_SCAN_PAGE;
        }
    }

    /// Bulk fetch by id; unauthorized ids are dropped silently.
    pub async fn get_by_ids(
        &self,
        kind: &str,
        ids: &[String],
        claims: &Claims,
        rights: RightSet,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::resource_terms(ids));
        self.run_list(kind, filters, None, Page::new(ids.len(), 0), None, claims)
            .await
    }

    pub async fn get_by_ids_ordered(
        &self,
        kind: &str,
        ids: &[String],
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::resource_terms(ids));
        self.run_list(
            kind,
            filters,
            None,
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    /// Ordered listing intersected with a caller-supplied selection.
    pub async fn list_with_selection(
        &self,
        kind: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
        selection: &Selection,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::compile_selection(selection, claims)?);
        self.run_list(
            kind,
            filters,
            None,
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    /// Ordered search intersected with a caller-supplied selection.
    pub async fn search_with_selection(
        &self,
        kind: &str,
        text: &str,
        claims: &Claims,
        rights: RightSet,
        page: Page,
        order_feature: &str,
        ascending: bool,
        selection: &Selection,
    ) -> Result<Vec<FeatureMap>> {
        let mut filters = query::rights_clauses(rights, claims);
        filters.push(query::compile_selection(selection, claims)?);
        self.run_list(
            kind,
            filters,
            Some(query::feature_search(text)),
            page,
            Some(SortSpec::feature(order_feature, ascending)),
            claims,
        )
        .await
    }

    /// Every resource the principal administrates, in the transport shape.
    #[instrument(skip(self, claims))]
    pub async fn admin_list(&self, kind: &str, claims: &Claims) -> Result<Vec<ResourceRights>> {
        let mut result = Vec::new();
        let mut offset = 0;
        loop {
            let filters = query::rights_clauses(RightSet::parse("a"), claims);
            let hits = self
                .store
                .search(
                    kind,
                    SearchRequest::new(query::filtered(filters)).paged(offset, FULL_SCAN_PAGE),
                )
                .await?;
            if hits.is_empty() {
                return Ok(result);
            }
            for hit in &hits {
                result.push(decode_entry(hit)?.to_resource_rights());
            }
            offset += FULL_SCAN_PAGE;
        }
    }

    /// Free-text filtered variant of [`Self::admin_list`], paginated.
    #[instrument(skip(self, claims))]
    pub async fn admin_search(
        &self,
        kind: &str,
        text: &str,
        claims: &Claims,
        page: Page,
    ) -> Result<Vec<ResourceRights>> {
        let filters = query::rights_clauses(RightSet::parse("a"), claims);
        let request = SearchRequest::new(query::filtered_with_must(
            filters,
            query::feature_search(text),
        ))
        .paged(page.offset, page.limit);
        let hits = self.store.search(kind, request).await?;
        hits.iter()
            .map(|hit| Ok(decode_entry(hit)?.to_resource_rights()))
            .collect()
    }

    async fn run_list(
        &self,
        kind: &str,
        filters: Vec<Value>,
        must: Option<Value>,
        page: Page,
        sort: Option<SortSpec>,
        claims: &Claims,
    ) -> Result<Vec<FeatureMap>> {
        let compiled = match must {
            Some(must) => query::filtered_with_must(filters, must),
            None => query::filtered(filters),
        };
        let request = SearchRequest::new(compiled)
            .paged(page.offset, page.limit)
            .sorted(sort);
        let hits = self.store.search(kind, request).await?;
        hits.iter()
            .map(|hit| Ok(augment(decode_entry(hit)?, claims)))
            .collect()
    }
}

fn decode_entry(doc: &VersionedDoc) -> Result<Entry> {
    serde_json::from_value(doc.source.clone())
        .map_err(|e| WardenError::internal(format!("malformed index document {}: {}", doc.id, e)))
}

/// Projects an entry onto its feature map, adding the synthetic `id`,
/// `creator` and `permissions` fields for the requesting principal.
fn augment(entry: Entry, claims: &Claims) -> FeatureMap {
    let permissions = entry.permissions_for(&claims.user, &claims.groups);
    let mut features = entry.features;
    features.insert("id".to_string(), json!(entry.resource));
    features.insert("creator".to_string(), json!(entry.creator));
    features.insert(
        "permissions".to_string(),
        serde_json::to_value(permissions).unwrap_or(Value::Null),
    );
    features
}
