//! Trait seams towards the external collaborators
//!
//! The document index wire client and the feature projector are external
//! systems; the engine and the command pipeline only see these traits.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::FeatureMap;

/// A document together with its optimistic-concurrency version token.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub id: String,
    pub source: Value,
    pub version: u64,
}

/// Sort specification on a document field (dotted path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub ascending: bool,
}

impl SortSpec {
    /// Sort on a feature field.
    pub fn feature(field: &str, ascending: bool) -> Self {
        SortSpec {
            field: format!("features.{}", field),
            ascending,
        }
    }
}

/// A compiled index query with paging and ordering.
///
/// Without an explicit sort, results with a relevance clause are ranked by
/// score; everything else comes back in a deterministic storage order.
/// Documents missing the sort field are placed after all documents that
/// carry it, for both directions.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Value,
    pub from: usize,
    pub size: usize,
    pub sort: Option<SortSpec>,
}

impl SearchRequest {
    pub fn new(query: Value) -> Self {
        SearchRequest {
            query,
            from: 0,
            size: 10,
            sort: None,
        }
    }

    pub fn paged(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    pub fn sorted(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }
}

/// The document index. One index per resource kind, addressed by the kind
/// name (an alias over the versioned physical index).
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Ensures the kind's index and alias exist, creating them with the
    /// given mapping if missing.
    async fn ensure_kind(&self, kind: &str, mapping: &Value) -> Result<()>;

    async fn exists(&self, kind: &str, id: &str) -> Result<bool>;

    async fn get(&self, kind: &str, id: &str) -> Result<Option<VersionedDoc>>;

    /// Writes a document. With `expected_version` set, the write is
    /// conditioned on that version and fails with a version conflict if the
    /// stored document has moved on. Returns the new version.
    async fn put(
        &self,
        kind: &str,
        id: &str,
        source: Value,
        expected_version: Option<u64>,
    ) -> Result<u64>;

    async fn delete(&self, kind: &str, id: &str) -> Result<()>;

    async fn search(&self, kind: &str, request: SearchRequest) -> Result<Vec<VersionedDoc>>;
}

/// Maps an inbound domain payload onto named feature values. The projection
/// rules (structured paths per kind) live with the upstream system.
#[async_trait]
pub trait FeatureProjector: Send + Sync {
    async fn project(&self, kind: &str, payload: &[u8]) -> Result<FeatureMap>;
}
