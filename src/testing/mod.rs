use chrono::{DateTime, Utc};

use crate::types::RoleAssignment;

/// Non-expiring role assignment.
pub fn role(name: &str, hierarchy_level: i32) -> RoleAssignment {
    RoleAssignment {
        name: name.to_string(),
        hierarchy_level,
        expires_at: None,
    }
}

pub fn expiring_role(
    name: &str,
    hierarchy_level: i32,
    expires_at: DateTime<Utc>,
) -> RoleAssignment {
    RoleAssignment {
        name: name.to_string(),
        hierarchy_level,
        expires_at: Some(expires_at),
    }
}
