//! Index mappings for the permission document schema
//!
//! Every kind shares the fixed permission fields; the feature sub-object
//! gets the kind-specific type hints from configuration. The search text is
//! indexed with an edge n-gram analyzer for prefix matching and searched
//! with the standard analyzer.

use serde_json::{json, Value};

use warden_core::KindConfig;

/// Name of the physical, versioned index behind the kind alias.
pub fn physical_index(kind: &str) -> String {
    format!("{}_v1", kind)
}

/// Builds the full index creation body (mappings plus analyzer settings)
/// for a kind.
pub fn kind_mapping(kind: &KindConfig) -> Value {
    let mut properties = json!({
        "resource":       {"type": "keyword"},
        "creator":        {"type": "keyword"},
        "admin_users":    {"type": "keyword"},
        "admin_groups":   {"type": "keyword"},
        "read_users":     {"type": "keyword"},
        "read_groups":    {"type": "keyword"},
        "write_users":    {"type": "keyword"},
        "write_groups":   {"type": "keyword"},
        "execute_users":  {"type": "keyword"},
        "execute_groups": {"type": "keyword"},
        "feature_search": {
            "type": "text",
            "analyzer": "autocomplete",
            "search_analyzer": "standard"
        }
    });
    if !kind.feature_mappings.is_empty() {
        properties["features"] = json!({"properties": kind.feature_mappings});
    }
    json!({
        "mappings": {
            "properties": properties
        },
        "settings": {
            "analysis": {
                "filter": {
                    "autocomplete_filter": {
                        "type": "edge_ngram",
                        "min_gram": 1,
                        "max_gram": 20
                    }
                },
                "analyzer": {
                    "autocomplete": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "autocomplete_filter"]
                    }
                }
            }
        }
    })
}
