//! The structured selection filter
//!
//! A [`Selection`] is a caller-supplied boolean filter tree, combined with
//! the mandatory rights query at retrieval time. It is deserialized from an
//! untyped JSON body; a node must populate exactly one of `and`, `or` or
//! `condition`, anything else is rejected as an invalid request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WardenError;

/// The identity of the requesting principal, as established by the
/// authentication collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub user: String,
    pub groups: Vec<String>,
}

impl Claims {
    pub fn user(id: impl Into<String>) -> Self {
        Claims {
            user: id.into(),
            groups: Vec::new(),
        }
    }

    pub fn groups(groups: Vec<String>) -> Self {
        Claims {
            user: String::new(),
            groups,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty() && self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    Unequal,
    #[serde(rename = "any_value_in_feature")]
    AnyValueInFeature,
}

/// A terminal condition on a single feature field. When `value` is absent or
/// empty, `ref` names a substitution source resolved against the caller's
/// claims (`jwt.user` or `jwt.groups`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    pub operation: Operation,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
}

impl Condition {
    /// Resolves the condition's value, substituting from claims when the
    /// literal value is absent or empty.
    pub fn resolve_value(&self, claims: &Claims) -> Option<Value> {
        let empty = match &self.value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            _ => false,
        };
        if !empty {
            return self.value.clone();
        }
        match self.reference.as_deref() {
            Some("jwt.user") if !claims.user.is_empty() => {
                Some(Value::String(claims.user.clone()))
            }
            Some("jwt.groups") => Some(Value::Array(
                claims
                    .groups
                    .iter()
                    .map(|g| Value::String(g.clone()))
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// A recursive boolean filter: a conjunction, a disjunction or a terminal
/// condition. There is no depth limit; the tree is acyclic by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum Selection {
    And(Vec<Selection>),
    Or(Vec<Selection>),
    Condition(Condition),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and: Option<Vec<Selection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or: Option<Vec<Selection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
}

impl TryFrom<RawSelection> for Selection {
    type Error = WardenError;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        // Empty lists count as unpopulated arms.
        let and = raw.and.filter(|l| !l.is_empty());
        let or = raw.or.filter(|l| !l.is_empty());
        match (and, or, raw.condition) {
            (Some(and), None, None) => Ok(Selection::And(and)),
            (None, Some(or), None) => Ok(Selection::Or(or)),
            (None, None, Some(condition)) => Ok(Selection::Condition(condition)),
            (None, None, None) => Err(WardenError::invalid_request(
                "selection node populates none of and/or/condition",
            )),
            _ => Err(WardenError::invalid_request(
                "selection node populates more than one of and/or/condition",
            )),
        }
    }
}

impl From<Selection> for RawSelection {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::And(and) => RawSelection {
                and: Some(and),
                or: None,
                condition: None,
            },
            Selection::Or(or) => RawSelection {
                and: None,
                or: Some(or),
                condition: None,
            },
            Selection::Condition(condition) => RawSelection {
                and: None,
                or: None,
                condition: Some(condition),
            },
        }
    }
}
