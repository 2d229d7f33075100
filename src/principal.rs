//! The user a search runs on behalf of.

use crate::model::{Capability, Group};
use crate::predicate::{Column, Operand, Predicate, Value};
use crate::schema::{PERMISSIONS, PERMISSION_GROUP};
use std::collections::BTreeSet;

/// Requesting user with its groups and the union of their capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: i64,
    login: String,
    groups: Vec<Group>,
    capabilities: BTreeSet<Capability>,
}

impl Principal {
    pub fn new(user_id: i64, login: impl Into<String>) -> Self {
        Self {
            user_id,
            login: login.into(),
            groups: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_group(mut self, group: Group) -> Self {
        if !self.groups.iter().any(|g| g.id == group.id) {
            self.groups.push(group);
        }
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_member_of(&self, group_id: i64) -> bool {
        self.groups.iter().any(|g| g.id == group_id)
    }

    /// Objects visible to this principal: shared with one of its groups,
    /// or everything with `access_all_objects`.
    pub fn access_predicate(&self, object_id: Column) -> Predicate {
        if self.has_capability(Capability::AccessAllObjects) {
            return Predicate::Const(true);
        }
        if self.groups.is_empty() {
            return Predicate::Const(false);
        }
        let group_ids = self.groups.iter().map(|g| Value::Integer(g.id)).collect();
        Predicate::exists(
            &PERMISSIONS,
            object_id,
            Predicate::InList {
                operand: Operand::Column(PERMISSION_GROUP),
                values: group_ids,
            },
        )
    }
}
