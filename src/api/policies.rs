//! Authorization policy bound to each write endpoint.
//!
//! The resource id each policy is checked against is noted per constant.

use crate::logic::permissions::{Capability, Policy};
use crate::model::Role;

/// Registering an account with the elevated role
pub const REGISTER_ADMIN: Policy = Policy::AdminOnly;

/// Path user id
pub const DELETE_USER: Policy = Policy::AdminOnly;

/// `user_id` of the submitted profile
pub const CREATE_CANDIDATE: Policy = Policy::Allow(Capability::All(&[
    Capability::RoleIs(Role::Candidate),
    Capability::IsSelf,
]));

/// Path candidate id; covers updates, deletion and profile additions
pub const EDIT_CANDIDATE: Policy = Policy::Allow(Capability::OwnsCandidate);

/// `user_id` of the submitted company
pub const CREATE_COMPANY: Policy = Policy::Allow(Capability::All(&[
    Capability::RoleIs(Role::Company),
    Capability::IsSelf,
]));

/// Path company id
pub const POST_JOB: Policy = Policy::Allow(Capability::OwnsCompany);

/// Path job id
pub const EDIT_JOB: Policy = Policy::Allow(Capability::OwnsJob);
