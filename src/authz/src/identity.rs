//! Caller identity derived from bearer-token claims

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Claim, scope and role names understood by the engine
pub mod claims {
    /// Space-separated delegated scopes
    pub const SCOPE: &str = "scp";
    /// Application roles
    pub const ROLES: &str = "roles";
    /// Object identifier of the principal
    pub const OBJECT_ID: &str = "oid";
    /// Display name
    pub const NAME: &str = "name";

    /// Delegated read scope, also the name of the read policy
    pub const TODO_READ: &str = "ToDo.Read";
    /// Delegated write scope, also the name of the write policy
    pub const TODO_WRITE: &str = "ToDo.Write";
    /// Application permission to read every user's items
    pub const TODO_READ_ALL: &str = "Todo.Read.All";
}

/// Authenticated caller, populated once per request by the boundary adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Display name of the principal
    pub name: String,

    /// Value of the `oid` claim, if presented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Delegated scopes (`scp`); empty when the claim is absent
    #[serde(default)]
    pub scopes: BTreeSet<String>,

    /// Application roles (`roles`)
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl CallerIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_object_id(mut self, oid: impl Into<String>) -> Self {
        self.object_id = Some(oid.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    /// Add every scope of a space-separated `scp` claim value
    pub fn with_scope_claim(mut self, scp: &str) -> Self {
        self.scopes.extend(scp.split_whitespace().map(str::to_string));
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Owner identifier: the object id when presented, else the display name
    pub fn resolved_owner(&self) -> &str {
        self.object_id.as_deref().unwrap_or(&self.name)
    }

    /// Owner identifier from the object id alone, with no name fallback
    pub fn object_id_owner(&self) -> Option<&str> {
        self.object_id.as_deref()
    }
}
