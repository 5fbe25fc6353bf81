use serde::{Deserialize, Serialize};

use crate::model::{Id, Role};

/// Authenticated caller attached to a request by the authentication layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Id,
    pub role: Role,
}

impl UserContext {
    pub fn new(user_id: Id, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Create an administrator context for internal operations
    pub fn admin(user_id: Id) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_elevated()
    }
}
