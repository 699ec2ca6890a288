use crate::error::VaultError;
use crate::types::ids::{PrincipalId, ProfileId};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Row operations guarded by the gate, one per row-level policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Read => "read",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Decides whether `principal` may perform `operation` on a row owned by `owner`.
///
/// For inserts `owner` is the proposed owner of the new row.
pub trait AccessPolicy: Send + Sync {
    fn decide(&self, principal: PrincipalId, operation: Operation, owner: PrincipalId)
    -> Decision;
}

/// Owner equality for all four operations; no partial visibility.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnerOnly;

impl AccessPolicy for OwnerOnly {
    fn decide(
        &self,
        principal: PrincipalId,
        _operation: Operation,
        owner: PrincipalId,
    ) -> Decision {
        if principal == owner {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Wraps a policy and turns denials into errors.
#[derive(Clone)]
pub struct AccessGate {
    policy: Arc<dyn AccessPolicy>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(OwnerOnly)
    }
}

impl AccessGate {
    pub fn new(policy: impl AccessPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn authorize(
        &self,
        principal: PrincipalId,
        operation: Operation,
        owner: PrincipalId,
        profile: Option<ProfileId>,
    ) -> Result<(), VaultError> {
        match self.policy.decide(principal, operation, owner) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                warn!(
                    principal = %principal,
                    operation = %operation,
                    profile = %profile.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                    "access denied"
                );
                Err(VaultError::PermissionDenied)
            }
        }
    }
}
