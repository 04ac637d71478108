//! Domain models for the Warden permission search index
//!
//! An [`Entry`] is the stored document for one resource: its open feature
//! map, the eight ACL membership lists and the creator. [`ResourceRights`]
//! is the transport shape used by export/import and the administrative
//! listings; both shapes round-trip losslessly except for list order and
//! duplicate collapse.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::KindConfig;
use crate::rights::{Right, RightSet};

/// Open map of named feature values. The feature set and types are
/// kind-specific and validated only at the storage-mapping boundary.
pub type FeatureMap = Map<String, Value>;

/// The boolean quad a single actor holds on a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rights {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub administrate: bool,
}

impl Rights {
    pub fn set(&mut self, right: Right) {
        match right {
            Right::Read => self.read = true,
            Right::Write => self.write = true,
            Right::Execute => self.execute = true,
            Right::Administrate => self.administrate = true,
        }
    }

    pub fn contains(&self, right: Right) -> bool {
        match right {
            Right::Read => self.read,
            Right::Write => self.write,
            Right::Execute => self.execute,
            Right::Administrate => self.administrate,
        }
    }

    pub fn to_set(&self) -> RightSet {
        Right::ALL.into_iter().filter(|r| self.contains(*r)).collect()
    }
}

/// Transport record for one resource: features plus per-actor right quads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRights {
    pub resource_id: String,
    pub features: FeatureMap,
    pub user_rights: HashMap<String, Rights>,
    pub group_rights: HashMap<String, Rights>,
    pub creator: String,
}

/// The stored document for one resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub resource: String,
    #[serde(default)]
    pub features: FeatureMap,
    #[serde(default)]
    pub admin_users: Vec<String>,
    #[serde(default)]
    pub admin_groups: Vec<String>,
    #[serde(default)]
    pub read_users: Vec<String>,
    #[serde(default)]
    pub read_groups: Vec<String>,
    #[serde(default)]
    pub write_users: Vec<String>,
    #[serde(default)]
    pub write_groups: Vec<String>,
    #[serde(default)]
    pub execute_users: Vec<String>,
    #[serde(default)]
    pub execute_groups: Vec<String>,
    #[serde(default)]
    pub creator: String,
    /// Derived free-text field feeding prefix search; rebuilt on every
    /// features write.
    #[serde(default)]
    pub feature_search: String,
}

impl Entry {
    pub fn new(resource: impl Into<String>, features: FeatureMap) -> Self {
        let mut entry = Entry {
            resource: resource.into(),
            features,
            ..Default::default()
        };
        entry.rebuild_search_text();
        entry
    }

    fn user_list_mut(&mut self, right: Right) -> &mut Vec<String> {
        match right {
            Right::Read => &mut self.read_users,
            Right::Write => &mut self.write_users,
            Right::Execute => &mut self.execute_users,
            Right::Administrate => &mut self.admin_users,
        }
    }

    fn group_list_mut(&mut self, right: Right) -> &mut Vec<String> {
        match right {
            Right::Read => &mut self.read_groups,
            Right::Write => &mut self.write_groups,
            Right::Execute => &mut self.execute_groups,
            Right::Administrate => &mut self.admin_groups,
        }
    }

    pub fn user_list(&self, right: Right) -> &[String] {
        match right {
            Right::Read => &self.read_users,
            Right::Write => &self.write_users,
            Right::Execute => &self.execute_users,
            Right::Administrate => &self.admin_users,
        }
    }

    pub fn group_list(&self, right: Right) -> &[String] {
        match right {
            Right::Read => &self.read_groups,
            Right::Write => &self.write_groups,
            Right::Execute => &self.execute_groups,
            Right::Administrate => &self.admin_groups,
        }
    }

    /// Appends the user to the list of every right in the set.
    pub fn grant_user(&mut self, user: &str, rights: RightSet) {
        for right in rights.iter() {
            self.user_list_mut(right).push(user.to_string());
        }
    }

    /// Appends the group to the list of every right in the set.
    pub fn grant_group(&mut self, group: &str, rights: RightSet) {
        for right in rights.iter() {
            self.group_list_mut(right).push(group.to_string());
        }
    }

    /// Removes the user from all four right lists.
    pub fn revoke_user(&mut self, user: &str) {
        for right in Right::ALL {
            self.user_list_mut(right).retain(|u| u != user);
        }
    }

    /// Removes the group from all four right lists.
    pub fn revoke_group(&mut self, group: &str) {
        for right in Right::ALL {
            self.group_list_mut(right).retain(|g| g != group);
        }
    }

    /// Grants a non-empty owner all four rights, then applies the kind's
    /// configured initial group rights.
    pub fn apply_default_permissions(&mut self, kind: &KindConfig, owner: &str) {
        if !owner.is_empty() {
            self.grant_user(owner, RightSet::all());
        }
        for (group, letters) in &kind.initial_group_rights {
            self.grant_group(group, RightSet::parse(letters));
        }
    }

    /// Computes the right quad held by the given principal on this entry.
    pub fn permissions_for(&self, user: &str, groups: &[String]) -> Rights {
        let mut rights = Rights::default();
        for right in Right::ALL {
            let held = (!user.is_empty() && self.user_list(right).iter().any(|u| u == user))
                || self
                    .group_list(right)
                    .iter()
                    .any(|g| groups.iter().any(|h| h == g));
            if held {
                rights.set(right);
            }
        }
        rights
    }

    /// Merges per-actor quads from the transport shape into the ACL lists.
    pub fn apply_resource_rights(&mut self, rights: &ResourceRights) {
        for (user, quad) in &rights.user_rights {
            self.grant_user(user, quad.to_set());
        }
        for (group, quad) in &rights.group_rights {
            self.grant_group(group, quad.to_set());
        }
    }

    /// Collapses the ACL lists into the per-actor transport shape.
    pub fn to_resource_rights(&self) -> ResourceRights {
        let mut result = ResourceRights {
            resource_id: self.resource.clone(),
            features: self.features.clone(),
            creator: self.creator.clone(),
            ..Default::default()
        };
        for right in Right::ALL {
            for user in self.user_list(right) {
                result.user_rights.entry(user.clone()).or_default().set(right);
            }
            for group in self.group_list(right) {
                result
                    .group_rights
                    .entry(group.clone())
                    .or_default()
                    .set(right);
            }
        }
        result
    }

    /// Rebuilds `feature_search` from every string value in the feature map,
    /// nested values included.
    pub fn rebuild_search_text(&mut self) {
        let mut terms = Vec::new();
        for value in self.features.values() {
            collect_text(value, &mut terms);
        }
        self.feature_search = terms.join(" ");
    }
}

fn collect_text(value: &Value, terms: &mut Vec<String>) {
    match value {
        Value::String(s) => terms.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_text(item, terms);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_text(item, terms);
            }
        }
        _ => {}
    }
}
