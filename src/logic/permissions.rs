//! Per-request authorization.
//!
//! Endpoints are bound to a `Policy` at route registration. A policy is data:
//! capabilities are interpreted here against the caller and the target
//! resource, with ownership resolved through an `OwnershipStore`.

use std::fmt;

use crate::error::{DomainError, DomainResult};
use crate::model::{Id, Role, UserContext};
use crate::store::{OwnershipStore, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Caller owns the candidate profile identified by the resource id
    OwnsCandidate,
    OwnsCompany,
    /// Caller owns the company that posted the job
    OwnsJob,
    /// The resource id is the caller's own user id
    IsSelf,
    RoleIs(Role),
    /// Every listed capability holds
    All(&'static [Capability]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Only the elevated role passes
    AdminOnly,
    Allow(Capability),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoCaller,
    ElevatedOnly,
    CapabilityNotMet,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoCaller => f.write_str("no caller"),
            DenyReason::ElevatedOnly => f.write_str("administrator role required"),
            DenyReason::CapabilityNotMet => f.write_str("caller may not act on this resource"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

async fn owns<S: OwnershipStore + ?Sized>(
    store: &S,
    kind: ResourceKind,
    caller: &UserContext,
    resource_id: Option<Id>,
) -> anyhow::Result<bool> {
    let Some(id) = resource_id else {
        return Ok(false);
    };
    Ok(store.owner_of(kind, id).await? == Some(caller.user_id))
}

/// Interpret `capability` for a non-elevated caller
pub async fn check_capability<S: OwnershipStore + ?Sized>(
    capability: Capability,
    caller: &UserContext,
    resource_id: Option<Id>,
    store: &S,
) -> anyhow::Result<bool> {
    // Composites are flattened onto a work list instead of recursing
    let mut pending = vec![capability];
    while let Some(capability) = pending.pop() {
        let holds = match capability {
            Capability::OwnsCandidate => {
                owns(store, ResourceKind::Candidate, caller, resource_id).await?
            }
            Capability::OwnsCompany => {
                owns(store, ResourceKind::Company, caller, resource_id).await?
            }
            Capability::OwnsJob => owns(store, ResourceKind::Job, caller, resource_id).await?,
            Capability::IsSelf => resource_id == Some(caller.user_id),
            Capability::RoleIs(role) => caller.role == role,
            Capability::All(capabilities) => {
                pending.extend(capabilities.iter().rev().copied());
                true
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Decide whether `caller` may pass `policy` for `resource_id`
pub async fn evaluate<S: OwnershipStore + ?Sized>(
    caller: Option<&UserContext>,
    policy: Policy,
    resource_id: Option<Id>,
    store: &S,
) -> anyhow::Result<Decision> {
    let Some(caller) = caller else {
        return Ok(Decision::Deny(DenyReason::NoCaller));
    };
    if caller.is_admin() {
        return Ok(Decision::Allow);
    }
    match policy {
        Policy::AdminOnly => Ok(Decision::Deny(DenyReason::ElevatedOnly)),
        Policy::Allow(capability) => {
            if check_capability(capability, caller, resource_id, store).await? {
                Ok(Decision::Allow)
            } else {
                Ok(Decision::Deny(DenyReason::CapabilityNotMet))
            }
        }
    }
}

/// Gate a request: denials become domain errors and are reported to the audit log
pub async fn authorize<S: OwnershipStore + ?Sized>(
    caller: Option<&UserContext>,
    policy: Policy,
    resource_id: Option<Id>,
    store: &S,
) -> DomainResult<()> {
    match evaluate(caller, policy, resource_id, store).await? {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            log::warn!(
                target: "audit",
                "authorization denied: caller={:?} role={:?} policy={:?} resource={:?} reason={}",
                caller.map(|c| c.user_id),
                caller.map(|c| c.role),
                policy,
                resource_id,
                reason
            );
            match reason {
                DenyReason::NoCaller => Err(DomainError::Unauthenticated),
                _ => Err(DomainError::Forbidden(reason.to_string())),
            }
        }
    }
}
