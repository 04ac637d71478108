//! Unit tests for warden-index

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use warden_core::{
    Claims, Config, Entry, FeatureMap, IndexStore, KindConfig, Result, RightSet, SearchRequest,
    Selection, SortSpec, VersionedDoc, WardenError,
};

use crate::engine::{Page, QueryEngine};
use crate::guard::{GuardedStore, RetryPolicy};
use crate::memory::MemoryIndex;
use crate::{mapping, query};

const KIND: &str = "device";

fn features(name: &str) -> FeatureMap {
    let mut map = FeatureMap::new();
    map.insert("name".to_string(), json!(name));
    map
}

async fn seed(store: &MemoryIndex, entry: &Entry) {
    store
        .put(
            KIND,
            &entry.resource,
            serde_json::to_value(entry).unwrap(),
            None,
        )
        .await
        .unwrap();
}

fn readable_entry(resource: &str, name: &str, user: &str) -> Entry {
    let mut entry = Entry::new(resource, features(name));
    entry.creator = user.to_string();
    entry.grant_user(user, RightSet::all());
    entry
}

fn engine(store: Arc<MemoryIndex>) -> QueryEngine {
    QueryEngine::new(store, Arc::new(Config::default()))
}

mod query_tests {
    use super::*;

    #[test]
    fn test_rights_clauses_one_per_letter() {
        let claims = Claims {
            user: "alice".to_string(),
            groups: vec!["staff".to_string()],
        };
        let clauses = query::rights_clauses(RightSet::parse("ra"), &claims);
        assert_eq!(clauses.len(), 2);
        let rendered = serde_json::to_string(&clauses).unwrap();
        assert!(rendered.contains("read_users"));
        assert!(rendered.contains("read_groups"));
        assert!(rendered.contains("admin_users"));
        assert!(rendered.contains("admin_groups"));
    }

    #[test]
    fn test_anonymous_principal_never_matches() {
        let clauses = query::rights_clauses(RightSet::parse("r"), &Claims::default());
        assert_eq!(clauses, vec![json!({"match_none": {}})]);
    }

    #[test]
    fn test_user_only_clause_omits_group_terms() {
        let clauses = query::rights_clauses(RightSet::parse("w"), &Claims::user("alice"));
        let rendered = serde_json::to_string(&clauses).unwrap();
        assert!(rendered.contains("write_users"));
        assert!(!rendered.contains("write_groups"));
    }

    #[test]
    fn test_selection_equal_compiles_to_term() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "name", "operation": "==", "value": "lamp"}
        }))
        .unwrap();
        let compiled = query::compile_selection(&selection, &Claims::default()).unwrap();
        assert_eq!(compiled, json!({"term": {"features.name": "lamp"}}));
    }

    #[test]
    fn test_selection_equal_empty_value_compiles_to_missing_field() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "name", "operation": "==", "value": ""}
        }))
        .unwrap();
        let compiled = query::compile_selection(&selection, &Claims::default()).unwrap();
        assert_eq!(
            compiled,
            json!({"bool": {"must_not": {"exists": {"field": "features.name"}}}})
        );
    }

    #[test]
    fn test_selection_unequal_empty_value_compiles_to_exists() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "name", "operation": "!="}
        }))
        .unwrap();
        let compiled = query::compile_selection(&selection, &Claims::default()).unwrap();
        assert_eq!(compiled, json!({"exists": {"field": "features.name"}}));
    }

    #[test]
    fn test_selection_any_value_splits_comma_string() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "any_value_in_feature", "value": "on, off"}
        }))
        .unwrap();
        let compiled = query::compile_selection(&selection, &Claims::default()).unwrap();
        assert_eq!(compiled, json!({"terms": {"features.state": ["on", "off"]}}));
    }

    #[test]
    fn test_selection_any_value_rejects_non_sequence() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "any_value_in_feature", "value": 7}
        }))
        .unwrap();
        let result = query::compile_selection(&selection, &Claims::default());
        assert!(matches!(result, Err(WardenError::InvalidRequest { .. })));
    }

    #[test]
    fn test_selection_substitutes_group_claims() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "zone", "operation": "any_value_in_feature", "ref": "jwt.groups"}
        }))
        .unwrap();
        let claims = Claims::groups(vec!["east".to_string(), "west".to_string()]);
        let compiled = query::compile_selection(&selection, &claims).unwrap();
        assert_eq!(
            compiled,
            json!({"terms": {"features.zone": ["east", "west"]}})
        );
    }

    #[test]
    fn test_qualified_feature_names_stay_verbatim() {
        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "features.name", "operation": "==", "value": "lamp"}
        }))
        .unwrap();
        let compiled = query::compile_selection(&selection, &Claims::default()).unwrap();
        assert_eq!(compiled, json!({"term": {"features.name": "lamp"}}));
    }

    #[test]
    fn test_mapping_contains_permission_fields_and_feature_hints() {
        let mut kind = KindConfig::default();
        kind.feature_mappings
            .insert("name".to_string(), json!({"type": "keyword"}));
        let mapping = mapping::kind_mapping(&kind);
        let rendered = mapping.to_string();
        assert!(rendered.contains("admin_users"));
        assert!(rendered.contains("feature_search"));
        assert!(rendered.contains("edge_ngram"));
        assert_eq!(
            mapping["mappings"]["properties"]["features"]["properties"]["name"],
            json!({"type": "keyword"})
        );
        assert_eq!(mapping::physical_index("device"), "device_v1");
    }
}

mod memory_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_assigns_and_bumps_versions() {
        let store = MemoryIndex::new();
        let v1 = store.put(KIND, "a", json!({"x": 1}), None).await.unwrap();
        assert_eq!(v1, 1);
        let v2 = store.put(KIND, "a", json!({"x": 2}), Some(1)).await.unwrap();
        assert_eq!(v2, 2);
    }

    #[tokio::test]
    async fn test_stale_version_fails() {
        let store = MemoryIndex::new();
        store.put(KIND, "a", json!({"x": 1}), None).await.unwrap();
        store.put(KIND, "a", json!({"x": 2}), Some(1)).await.unwrap();
        let result = store.put(KIND, "a", json!({"x": 3}), Some(1)).await;
        assert!(matches!(result, Err(WardenError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_versioned_write_against_missing_doc_fails() {
        let store = MemoryIndex::new();
        let result = store.put(KIND, "ghost", json!({}), Some(1)).await;
        assert!(matches!(result, Err(WardenError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = MemoryIndex::new();
        store.delete(KIND, "ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_term_search_and_missing_sort_field_last() {
        let store = MemoryIndex::new();
        store
            .put(KIND, "b", json!({"features": {"name": "beta", "rank": 2}}), None)
            .await
            .unwrap();
        store
            .put(KIND, "a", json!({"features": {"name": "alpha", "rank": 1}}), None)
            .await
            .unwrap();
        store
            .put(KIND, "c", json!({"features": {"name": "gamma"}}), None)
            .await
            .unwrap();

        let request = SearchRequest::new(json!({"match_all": {}})).paged(0, 10).sorted(Some(
            SortSpec::feature("rank", true),
        ));
        let hits = store.search(KIND, request).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let request = SearchRequest::new(json!({"match_all": {}})).paged(0, 10).sorted(Some(
            SortSpec::feature("rank", false),
        ));
        let hits = store.search(KIND, request).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"], "missing field stays last on desc");
    }

    #[tokio::test]
    async fn test_match_prefixes_rank_by_token_count() {
        let store = MemoryIndex::new();
        store
            .put(KIND, "one", json!({"feature_search": "kitchen lamp"}), None)
            .await
            .unwrap();
        store
            .put(KIND, "two", json!({"feature_search": "garden hose"}), None)
            .await
            .unwrap();
        store
            .put(KIND, "three", json!({"feature_search": "kitchen lamp dimmer"}), None)
            .await
            .unwrap();

        let request = SearchRequest::new(json!({"match": {"feature_search": "kit lam dim"}}))
            .paged(0, 10);
        let hits = store.search(KIND, request).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["three", "one"]);
    }

    #[tokio::test]
    async fn test_bool_should_requires_one_match() {
        let store = MemoryIndex::new();
        store
            .put(KIND, "a", json!({"read_users": ["alice"]}), None)
            .await
            .unwrap();
        store
            .put(KIND, "b", json!({"read_users": ["bob"]}), None)
            .await
            .unwrap();
        let q = json!({"bool": {"should": [
            {"term": {"read_users": "alice"}},
            {"terms": {"read_groups": ["staff"]}}
        ]}});
        let hits = store
            .search(KIND, SearchRequest::new(q).paged(0, 10))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }
}

mod guard_tests {
    use super::*;

    /// Fails a configurable number of times before delegating to an inner
    /// memory store.
    struct FlakyStore {
        inner: MemoryIndex,
        failures_left: AtomicU32,
        calls: Arc<AtomicU32>,
        permanent: bool,
    }

    impl FlakyStore {
        fn new(failures: u32, permanent: bool) -> Self {
            Self {
                inner: MemoryIndex::new(),
                failures_left: AtomicU32::new(failures),
                calls: Arc::new(AtomicU32::new(0)),
                permanent,
            }
        }

        fn fail_or_pass(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(());
            }
            self.failures_left.store(left - 1, Ordering::SeqCst);
            if self.permanent {
                Err(WardenError::storage_down("connection refused"))
            } else {
                Err(WardenError::storage_unavailable("timeout"))
            }
        }
    }

    #[async_trait]
    impl IndexStore for FlakyStore {
        async fn ensure_kind(&self, kind: &str, mapping: &Value) -> Result<()> {
            self.fail_or_pass()?;
            self.inner.ensure_kind(kind, mapping).await
        }

        async fn exists(&self, kind: &str, id: &str) -> Result<bool> {
            self.fail_or_pass()?;
            self.inner.exists(kind, id).await
        }

        async fn get(&self, kind: &str, id: &str) -> Result<Option<VersionedDoc>> {
            self.fail_or_pass()?;
            self.inner.get(kind, id).await
        }

        async fn put(
            &self,
            kind: &str,
            id: &str,
            source: Value,
            expected_version: Option<u64>,
        ) -> Result<u64> {
            self.fail_or_pass()?;
            self.inner.put(kind, id, source, expected_version).await
        }

        async fn delete(&self, kind: &str, id: &str) -> Result<()> {
            self.fail_or_pass()?;
            self.inner.delete(kind, id).await
        }

        async fn search(&self, kind: &str, request: SearchRequest) -> Result<Vec<VersionedDoc>> {
            self.fail_or_pass()?;
            self.inner.search(kind, request).await
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base: std::time::Duration::from_millis(1),
            cap: std::time::Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let guarded = GuardedStore::new(FlakyStore::new(2, false), fast_policy(5));
        assert!(!guarded.exists(KIND, "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let flaky = FlakyStore::new(10, false);
        let guarded = GuardedStore::new(flaky, fast_policy(3));
        let result = guarded.exists(KIND, "a").await;
        assert!(matches!(
            result,
            Err(WardenError::StorageUnavailable { retryable: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let flaky = FlakyStore::new(10, true);
        let calls = flaky.calls.clone();
        let guarded = GuardedStore::new(flaky, fast_policy(5));
        let result = guarded.exists(KIND, "a").await;
        assert!(matches!(
            result,
            Err(WardenError::StorageUnavailable { retryable: false, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

mod engine_tests {
    use super::*;

    #[tokio::test]
    async fn test_check_access_owner_and_stranger() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("test", "test", "ownerA")).await;
        let engine = engine(store);

        engine
            .check_access(KIND, "test", &Claims::user("ownerA"), RightSet::parse("a"))
            .await
            .unwrap();
        let denied = engine
            .check_access(KIND, "test", &Claims::user("stranger"), RightSet::parse("a"))
            .await;
        assert!(matches!(denied, Err(WardenError::AccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_check_access_requires_all_requested_rights() {
        let store = Arc::new(MemoryIndex::new());
        let mut entry = Entry::new("x", features("x"));
        entry.grant_group("admin", RightSet::parse("ra"));
        seed(&store, &entry).await;
        let engine = engine(store);
        let admin = Claims::groups(vec!["admin".to_string()]);

        engine
            .check_access(KIND, "x", &admin, RightSet::parse("r"))
            .await
            .unwrap();
        engine
            .check_access(KIND, "x", &admin, RightSet::parse("ra"))
            .await
            .unwrap();
        let denied = engine
            .check_access(KIND, "x", &admin, RightSet::parse("w"))
            .await;
        assert!(matches!(denied, Err(WardenError::AccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_anonymous_principal_is_always_denied() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("r1", "lamp", "alice")).await;
        let engine = engine(store);
        let denied = engine
            .check_access(KIND, "r1", &Claims::default(), RightSet::parse("r"))
            .await;
        assert!(matches!(denied, Err(WardenError::AccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_check_access_bulk_drops_denied_ids() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("a", "a", "alice")).await;
        seed(&store, &readable_entry("b", "b", "bob")).await;
        let engine = engine(store);

        let ids = vec!["a".to_string(), "b".to_string(), "ghost".to_string()];
        let allowed = engine
            .check_access_bulk(KIND, &ids, &Claims::user("alice"), RightSet::parse("r"))
            .await
            .unwrap();
        assert!(allowed.contains("a"));
        assert!(!allowed.contains("b"));
        assert!(!allowed.contains("ghost"));
    }

    #[tokio::test]
    async fn test_list_augments_features() {
        let store = Arc::new(MemoryIndex::new());
        let mut entry = readable_entry("r1", "lamp", "alice");
        entry.grant_user("bob", RightSet::parse("r"));
        seed(&store, &entry).await;
        let engine = engine(store);

        let page = engine
            .list(KIND, &Claims::user("bob"), RightSet::parse("r"), Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        let item = &page[0];
        assert_eq!(item["id"], json!("r1"));
        assert_eq!(item["creator"], json!("alice"));
        assert_eq!(
            item["permissions"],
            json!({"read": true, "write": false, "execute": false, "administrate": false})
        );
    }

    #[tokio::test]
    async fn test_full_list_concatenates_all_pages() {
        let store = Arc::new(MemoryIndex::new());
        for i in 0..47 {
            seed(&store, &readable_entry(&format!("r{:02}", i), "thing", "alice")).await;
        }
        let engine = engine(store);
        let claims = Claims::user("alice");

        let full = engine
            .list_all(KIND, &claims, RightSet::parse("r"))
            .await
            .unwrap();
        assert_eq!(full.len(), 47);

        let single = engine
            .list(KIND, &claims, RightSet::parse("r"), Page::new(1000, 0))
            .await
            .unwrap();
        let full_ids: std::collections::HashSet<_> =
            full.iter().map(|m| m["id"].clone()).collect();
        let single_ids: std::collections::HashSet<_> =
            single.iter().map(|m| m["id"].clone()).collect();
        assert_eq!(full_ids, single_ids);
    }

    #[tokio::test]
    async fn test_search_explicit_order_overrides_ranking() {
        let store = Arc::new(MemoryIndex::new());
        let mut a = readable_entry("a", "lamp small", "alice");
        a.features.insert("rank".to_string(), json!(2));
        a.rebuild_search_text();
        let mut b = readable_entry("b", "lamp lamp big", "alice");
        b.features.insert("rank".to_string(), json!(1));
        b.rebuild_search_text();
        seed(&store, &a).await;
        seed(&store, &b).await;
        let engine = engine(store);
        let claims = Claims::user("alice");

        let ranked = engine
            .search(KIND, "lamp", &claims, RightSet::parse("r"), Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);

        let ordered = engine
            .search_ordered(
                KIND,
                "lamp",
                &claims,
                RightSet::parse("r"),
                Page::new(10, 0),
                "rank",
                true,
            )
            .await
            .unwrap();
        assert_eq!(ordered[0]["id"], json!("b"));
        assert_eq!(ordered[1]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_search_excludes_unreadable_matches() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("mine", "lamp", "alice")).await;
        seed(&store, &readable_entry("other", "lamp", "bob")).await;
        let engine = engine(store);

        let hits = engine
            .search(KIND, "lamp", &Claims::user("alice"), RightSet::parse("r"), Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("mine"));
    }

    #[tokio::test]
    async fn test_select_by_field() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("a", "lamp", "alice")).await;
        seed(&store, &readable_entry("b", "fan", "alice")).await;
        let engine = engine(store);

        let hits = engine
            .select_by_field(
                KIND,
                "name",
                "fan",
                &Claims::user("alice"),
                RightSet::parse("r"),
                Page::new(10, 0),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("b"));
    }

    #[tokio::test]
    async fn test_get_by_ids_silently_drops_unauthorized() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("a", "lamp", "alice")).await;
        seed(&store, &readable_entry("b", "fan", "bob")).await;
        let engine = engine(store);

        let ids = vec!["a".to_string(), "b".to_string()];
        let hits = engine
            .get_by_ids(KIND, &ids, &Claims::user("alice"), RightSet::parse("r"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_admin_list_returns_transport_shape() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("a", "lamp", "alice")).await;
        seed(&store, &readable_entry("b", "fan", "bob")).await;
        let engine = engine(store);

        let records = engine.admin_list(KIND, &Claims::user("alice")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource_id, "a");
        assert!(records[0].user_rights["alice"].administrate);
    }

    #[tokio::test]
    async fn test_admin_search_filters_by_text_and_administration() {
        let store = Arc::new(MemoryIndex::new());
        seed(&store, &readable_entry("a", "kitchen lamp", "alice")).await;
        seed(&store, &readable_entry("b", "garden lamp", "alice")).await;
        seed(&store, &readable_entry("c", "kitchen fan", "alice")).await;
        // Readable but not administrable, matches the text.
        let mut foreign = readable_entry("d", "office lamp", "bob");
        foreign.grant_user("alice", RightSet::parse("r"));
        seed(&store, &foreign).await;
        let engine = engine(store);

        let records = engine
            .admin_search(KIND, "lamp", &Claims::user("alice"), Page::new(10, 0))
            .await
            .unwrap();
        let mut ids: Vec<&str> = records.iter().map(|r| r.resource_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(records.iter().all(|r| r.user_rights["alice"].administrate));
    }

    #[tokio::test]
    async fn test_search_with_selection_composes_all_filters() {
        let store = Arc::new(MemoryIndex::new());
        let mut on = readable_entry("a", "kitchen lamp", "alice");
        on.features.insert("state".to_string(), json!("on"));
        let mut off = readable_entry("b", "kitchen lamp", "alice");
        off.features.insert("state".to_string(), json!("off"));
        let mut wrong_text = readable_entry("c", "garden hose", "alice");
        wrong_text.features.insert("state".to_string(), json!("on"));
        let mut unreadable = readable_entry("d", "kitchen lamp", "bob");
        unreadable.features.insert("state".to_string(), json!("on"));
        for entry in [&on, &off, &wrong_text, &unreadable] {
            seed(&store, entry).await;
        }
        let engine = engine(store);

        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "==", "value": "on"}
        }))
        .unwrap();
        let hits = engine
            .search_with_selection(
                KIND,
                "kitchen",
                &Claims::user("alice"),
                RightSet::parse("r"),
                Page::new(10, 0),
                "name",
                true,
                &selection,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_selection_filters_compose_with_rights() {
        let store = Arc::new(MemoryIndex::new());
        let mut a = readable_entry("a", "lamp", "alice");
        a.features.insert("state".to_string(), json!("on"));
        let mut b = readable_entry("b", "lamp", "alice");
        b.features.insert("state".to_string(), json!("off"));
        let c = readable_entry("c", "lamp", "bob");
        seed(&store, &a).await;
        seed(&store, &b).await;
        seed(&store, &c).await;
        let engine = engine(store);

        let selection: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "==", "value": "on"}
        }))
        .unwrap();
        let hits = engine
            .list_with_selection(
                KIND,
                &Claims::user("alice"),
                RightSet::parse("r"),
                Page::new(10, 0),
                "name",
                true,
                &selection,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_selection_empty_value_matches_missing_field() {
        let store = Arc::new(MemoryIndex::new());
        let mut with_state = readable_entry("a", "lamp", "alice");
        with_state.features.insert("state".to_string(), json!("on"));
        let without_state = readable_entry("b", "lamp", "alice");
        seed(&store, &with_state).await;
        seed(&store, &without_state).await;
        let engine = engine(store);
        let claims = Claims::user("alice");

        let missing: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "==", "value": ""}
        }))
        .unwrap();
        let hits = engine
            .list_with_selection(
                KIND, &claims, RightSet::parse("r"), Page::new(10, 0), "name", true, &missing,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("b"));

        let present: Selection = serde_json::from_value(json!({
            "condition": {"feature": "state", "operation": "!=", "value": ""}
        }))
        .unwrap();
        let hits = engine
            .list_with_selection(
                KIND, &claims, RightSet::parse("r"), Page::new(10, 0), "name", true, &present,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_get_entry_not_found() {
        let store = Arc::new(MemoryIndex::new());
        let engine = engine(store);
        let result = engine.get_entry(KIND, "ghost").await;
        assert!(matches!(result, Err(WardenError::NotFound { .. })));
    }

    #[test]
    fn test_page_parsing() {
        assert_eq!(Page::parse("20", "40").unwrap(), Page::new(20, 40));
        assert!(matches!(
            Page::parse("twenty", "0"),
            Err(WardenError::InvalidRequest { .. })
        ));
        assert!(matches!(
            Page::parse("10", "-1"),
            Err(WardenError::InvalidRequest { .. })
        ));
    }
}
