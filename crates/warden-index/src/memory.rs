//! In-memory index store
//!
//! Evaluates the boolean query subset the compilers in [`crate::query`]
//! emit. Used by the test suites and for local development without a
//! document index. Semantics intentionally track the index dialect:
//! optimistic versioning on writes, deterministic insertion order when no
//! sort is given, relevance ranking when a `match` clause scores, and
//! missing sort fields placed after present ones in both directions.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use warden_core::{IndexStore, Result, SearchRequest, SortSpec, VersionedDoc, WardenError};

#[derive(Debug, Clone)]
struct DocRecord {
    source: Value,
    version: u64,
    seq: u64,
}

#[derive(Debug, Default)]
struct KindData {
    docs: HashMap<String, DocRecord>,
    next_seq: u64,
}

/// A process-local [`IndexStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    kinds: RwLock<HashMap<String, KindData>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndex {
    async fn ensure_kind(&self, kind: &str, _mapping: &Value) -> Result<()> {
        let mut kinds = self.kinds.write().expect("memory index lock");
        kinds.entry(kind.to_string()).or_default();
        Ok(())
    }

    async fn exists(&self, kind: &str, id: &str) -> Result<bool> {
        let kinds = self.kinds.read().expect("memory index lock");
        Ok(kinds
            .get(kind)
            .map(|data| data.docs.contains_key(id))
            .unwrap_or(false))
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Option<VersionedDoc>> {
        let kinds = self.kinds.read().expect("memory index lock");
        Ok(kinds.get(kind).and_then(|data| {
            data.docs.get(id).map(|record| VersionedDoc {
                id: id.to_string(),
                source: record.source.clone(),
                version: record.version,
            })
        }))
    }

    async fn put(
        &self,
        kind: &str,
        id: &str,
        source: Value,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let mut kinds = self.kinds.write().expect("memory index lock");
        let data = kinds.entry(kind.to_string()).or_default();
        match (data.docs.get_mut(id), expected_version) {
            (Some(record), Some(expected)) if record.version != expected => Err(
                WardenError::version_conflict(kind, id, expected),
            ),
            (Some(record), _) => {
                record.source = source;
                record.version += 1;
                Ok(record.version)
            }
            (None, Some(expected)) => Err(WardenError::version_conflict(kind, id, expected)),
            (None, None) => {
                let seq = data.next_seq;
                data.next_seq += 1;
                data.docs.insert(
                    id.to_string(),
                    DocRecord {
                        source,
                        version: 1,
                        seq,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        let mut kinds = self.kinds.write().expect("memory index lock");
        if let Some(data) = kinds.get_mut(kind) {
            data.docs.remove(id);
        }
        Ok(())
    }

    async fn search(&self, kind: &str, request: SearchRequest) -> Result<Vec<VersionedDoc>> {
        let kinds = self.kinds.read().expect("memory index lock");
        let Some(data) = kinds.get(kind) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &DocRecord, f64)> = Vec::new();
        for (id, record) in &data.docs {
            if let Some(score) = eval(&request.query, &record.source) {
                hits.push((id, record, score));
            }
        }

        match &request.sort {
            Some(sort) => hits.sort_by(|a, b| compare_docs(&a.1.source, &b.1.source, sort)
                .then(a.1.seq.cmp(&b.1.seq))),
            None => hits.sort_by(|a, b| {
                b.2.partial_cmp(&a.2)
                    .unwrap_or(Ordering::Equal)
                    .then(a.1.seq.cmp(&b.1.seq))
            }),
        }

        Ok(hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(id, record, _)| VersionedDoc {
                id: id.clone(),
                source: record.source.clone(),
                version: record.version,
            })
            .collect())
    }
}

/// Resolves a dotted field path against a document.
fn value_at<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn compare_docs(a: &Value, b: &Value, sort: &SortSpec) -> Ordering {
    let left = value_at(a, &sort.field);
    let right = value_at(b, &sort.field);
    match (left, right) {
        (None, None) => Ordering::Equal,
        // Missing sort fields go last, regardless of direction.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => {
            let ordering = compare_values(l, r);
            if sort.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Evaluates a query clause against a document. `None` means no match;
/// `Some(score)` carries the relevance contribution of `match` clauses.
fn eval(query: &Value, doc: &Value) -> Option<f64> {
    let object = query.as_object()?;
    let (name, body) = object.iter().next()?;
    match name.as_str() {
        "match_all" => Some(0.0),
        "match_none" => None,
        "term" => eval_term(body, doc),
        "terms" => eval_terms(body, doc),
        "exists" => {
            let field = body.get("field")?.as_str()?;
            match value_at(doc, field) {
                Some(Value::Null) | None => None,
                Some(_) => Some(0.0),
            }
        }
        "match" => eval_match(body, doc),
        "bool" => eval_bool(body, doc),
        _ => None,
    }
}

fn eval_term(body: &Value, doc: &Value) -> Option<f64> {
    let (field, expected) = body.as_object()?.iter().next()?;
    let actual = value_at(doc, field)?;
    value_contains(actual, expected).then_some(0.0)
}

fn eval_terms(body: &Value, doc: &Value) -> Option<f64> {
    let (field, expected) = body.as_object()?.iter().next()?;
    let actual = value_at(doc, field)?;
    expected
        .as_array()?
        .iter()
        .any(|candidate| value_contains(actual, candidate))
        .then_some(0.0)
}

/// Term equality: a scalar matches on equality, an array matches if any
/// element equals the candidate.
fn value_contains(actual: &Value, candidate: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == candidate),
        other => other == candidate,
    }
}

/// Prefix-token match against an analyzed text field, mirroring the edge
/// n-gram analyzer: each query token scores if it prefixes any document
/// token; at least one token has to score.
fn eval_match(body: &Value, doc: &Value) -> Option<f64> {
    let (field, query_text) = body.as_object()?.iter().next()?;
    let text = value_at(doc, field)?.as_str()?;
    let doc_tokens = tokenize(text);
    let mut score = 0.0;
    for token in tokenize(query_text.as_str()?) {
        if doc_tokens
            .iter()
            .any(|doc_token| doc_token.starts_with(&token))
        {
            score += 1.0;
        }
    }
    (score > 0.0).then_some(score)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn eval_bool(body: &Value, doc: &Value) -> Option<f64> {
    let mut score = 0.0;

    for clause in clauses(body.get("filter")).chain(clauses(body.get("must"))) {
        score += eval(clause, doc)?;
    }

    for clause in clauses(body.get("must_not")) {
        if eval(clause, doc).is_some() {
            return None;
        }
    }

    let should: Vec<&Value> = clauses(body.get("should")).collect();
    if !should.is_empty() {
        let mut any = false;
        for clause in &should {
            if let Some(s) = eval(clause, doc) {
                score += s;
                any = true;
            }
        }
        // Without must/filter clauses at least one should clause is required.
        let required = body.get("filter").is_none() && body.get("must").is_none();
        if required && !any {
            return None;
        }
    }

    Some(score)
}

fn clauses(value: Option<&Value>) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(single) => Box::new(std::iter::once(single)),
        None => Box::new(std::iter::empty()),
    }
}
