//! Compilation of rights filters and selections into index queries
//!
//! Queries are emitted as JSON fragments in the document index's boolean
//! query dialect: `bool` with `filter`/`should`/`must`/`must_not`, `term`,
//! `terms`, `exists`, `match`, `match_all` and `match_none`.

use serde_json::{json, Value};

use warden_core::{Claims, Condition, Operation, Result, Right, RightSet, Selection, WardenError};

/// One filter clause per requested right: the principal's user id is in the
/// right's user list, or any of its groups is in the right's group list.
/// A principal with neither identity nor groups gets a clause that never
/// matches; combining the clauses with `filter` makes the overall query
/// require every requested right.
pub fn rights_clauses(rights: RightSet, claims: &Claims) -> Vec<Value> {
    let mut clauses = Vec::new();
    for right in rights.iter() {
        clauses.push(right_clause(right, claims));
    }
    clauses
}

fn right_clause(right: Right, claims: &Claims) -> Value {
    let mut should = Vec::new();
    if !claims.user.is_empty() {
        should.push(json!({"term": {(right.user_field()): claims.user}}));
    }
    if !claims.groups.is_empty() {
        should.push(json!({"terms": {(right.group_field()): claims.groups}}));
    }
    if should.is_empty() {
        return json!({"match_none": {}});
    }
    json!({"bool": {"filter": {"bool": {"should": should}}}})
}

/// Combines filter clauses into a boolean query.
pub fn filtered(filters: Vec<Value>) -> Value {
    json!({"bool": {"filter": filters}})
}

/// Combines filter clauses with a scoring clause; the filters constrain the
/// result, the `must` clause ranks it.
pub fn filtered_with_must(filters: Vec<Value>, must: Value) -> Value {
    json!({"bool": {"filter": filters, "must": must}})
}

pub fn term(field: &str, value: Value) -> Value {
    json!({"term": {(field): value}})
}

pub fn terms(field: &str, values: &[String]) -> Value {
    json!({"terms": {(field): values}})
}

/// Restriction to a single resource id.
pub fn resource_term(resource: &str) -> Value {
    term("resource", json!(resource))
}

/// Restriction to a set of resource ids.
pub fn resource_terms(ids: &[String]) -> Value {
    terms("resource", ids)
}

/// Exact match on a feature field.
pub fn feature_term(field: &str, value: &str) -> Value {
    term(&feature_field(field), json!(value))
}

/// Relevance match against the derived search text.
pub fn feature_search(text: &str) -> Value {
    json!({"match": {"feature_search": text}})
}

pub fn match_all() -> Value {
    json!({"match_all": {}})
}

/// Matches every document in which the user appears in any of the four
/// per-right user lists. Used by the cascading user deletion.
pub fn user_membership(user: &str) -> Value {
    let should: Vec<Value> = Right::ALL
        .iter()
        .map(|right| json!({"term": {(right.user_field()): user}}))
        .collect();
    json!({"bool": {"should": should}})
}

/// Qualifies a selection feature name into the feature namespace. Names
/// already carrying the `features.` prefix are used verbatim.
fn feature_field(name: &str) -> String {
    if name.starts_with("features.") {
        name.to_string()
    } else {
        format!("features.{}", name)
    }
}

/// Compiles a selection tree into a filter clause, substituting claim
/// references in terminal conditions.
pub fn compile_selection(selection: &Selection, claims: &Claims) -> Result<Value> {
    match selection {
        Selection::And(parts) => {
            let compiled: Result<Vec<Value>> = parts
                .iter()
                .map(|part| compile_selection(part, claims))
                .collect();
            Ok(json!({"bool": {"filter": compiled?}}))
        }
        Selection::Or(parts) => {
            let compiled: Result<Vec<Value>> = parts
                .iter()
                .map(|part| compile_selection(part, claims))
                .collect();
            Ok(json!({"bool": {"should": compiled?}}))
        }
        Selection::Condition(condition) => compile_condition(condition, claims),
    }
}

fn compile_condition(condition: &Condition, claims: &Claims) -> Result<Value> {
    let field = feature_field(&condition.feature);
    let value = condition.resolve_value(claims);
    match condition.operation {
        Operation::Equal => Ok(match value {
            None => json!({"bool": {"must_not": {"exists": {"field": field}}}}),
            Some(v) => json!({"term": {(field): v}}),
        }),
        Operation::Unequal => Ok(match value {
            None => json!({"exists": {"field": field}}),
            Some(v) => json!({"bool": {"must_not": {"term": {(field): v}}}}),
        }),
        Operation::AnyValueInFeature => {
            let values = match value {
                Some(Value::Array(items)) => items,
                Some(Value::String(list)) => list
                    .split(',')
                    .map(|part| Value::String(part.trim().to_string()))
                    .collect(),
                _ => {
                    return Err(WardenError::invalid_request(format!(
                        "selection value for {} cannot be interpreted as a sequence",
                        condition.feature
                    )))
                }
            };
            Ok(json!({"terms": {(field): values}}))
        }
    }
}
