//! Claim checks shared by the engine operations

use crate::error::{AuthzError, Result};
use crate::identity::{claims, CallerIdentity};
use serde::Serialize;

/// Which items a List call may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "owner", rename_all = "snake_case")]
pub enum ListAccess {
    /// Delegated call: only items owned by this identifier
    Owned(String),
    /// Application-permission call: every item
    All,
}

impl ListAccess {
    pub fn permits(&self, owner: &str) -> bool {
        match self {
            ListAccess::Owned(o) => o == owner,
            ListAccess::All => true,
        }
    }
}

/// Decide List access
///
/// The `ToDo.Read` scope wins over the `Todo.Read.All` role when both are
/// present, so a delegated call never sees other users' items.
pub fn list_access(caller: &CallerIdentity) -> Result<ListAccess> {
    if caller.has_scope(claims::TODO_READ) {
        return Ok(ListAccess::Owned(caller.resolved_owner().to_string()));
    }

    if caller.has_role(claims::TODO_READ_ALL) {
        return Ok(ListAccess::All);
    }

    Err(AuthzError::Forbidden(format!(
        "requires scope '{}' or role '{}'",
        claims::TODO_READ,
        claims::TODO_READ_ALL
    )))
}

/// Require a delegated scope
pub fn require_scope(caller: &CallerIdentity, scope: &str) -> Result<()> {
    if caller.has_scope(scope) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!("requires scope '{}'", scope)))
    }
}

/// Require a named policy; a policy is satisfied by the scope of the same name
pub fn require_policy(caller: &CallerIdentity, policy: &str) -> Result<()> {
    if caller.has_scope(policy) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!(
            "policy '{}' not satisfied",
            policy
        )))
    }
}
