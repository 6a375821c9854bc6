// Pure role classification. Everything here is a function of the assignment
// set at a point in time; nothing is persisted and every check recomputes.

use chrono::{DateTime, Utc};

use crate::types::{RoleAssignment, HIERARCHY_ADMIN, HIERARCHY_PREMIUM};

/// Role names granting academy/LMS access.
pub const ACADEMY_ROLES: &[&str] = &["academy_student", "academy"];

/// Explicit trial entitlement as granted by support tooling. Both spellings
/// exist in production data.
pub const TRIAL_ROLES: &[&str] = &["Trial User", "trial_user"];

/// Holding any of these alongside an academy role disqualifies the user from
/// the academy-only residual category. Unlisted cosmetic roles do not.
const NON_ACADEMY_ROLES: &[&str] = &[
    "premium_user",
    "admin",
    "moderator",
    "basic_user",
    "free_user",
    "Free User",
    "Trial User",
    "trial_user",
];

/// Snapshot of what the active role set says about a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_admin: bool,
    pub is_academy_only: bool,
    pub max_hierarchy_level: i32,
    pub has_premium_access: bool,
}

/// Drop assignments whose expiry has passed. The backend rows are left alone;
/// absence is a read-time interpretation.
pub fn filter_active(roles: &[RoleAssignment], now: DateTime<Utc>) -> Vec<RoleAssignment> {
    roles.iter().filter(|r| r.is_active(now)).cloned().collect()
}

pub fn has_role(roles: &[RoleAssignment], names: &[&str], now: DateTime<Utc>) -> bool {
    roles
        .iter()
        .any(|r| r.is_active(now) && names.contains(&r.name.as_str()))
}

pub fn is_admin(roles: &[RoleAssignment], now: DateTime<Utc>) -> bool {
    roles
        .iter()
        .any(|r| r.is_active(now) && (r.name == "admin" || r.hierarchy_level >= HIERARCHY_ADMIN))
}

pub fn max_hierarchy_level(roles: &[RoleAssignment], now: DateTime<Utc>) -> i32 {
    roles
        .iter()
        .filter(|r| r.is_active(now))
        .map(|r| r.hierarchy_level)
        .max()
        .unwrap_or(0)
}

/// Academy-only is a residual category, not an explicitly granted one: the
/// academy role is held, no elevated/trial/free role is held, and the user is
/// not admin.
pub fn is_academy_only(roles: &[RoleAssignment], now: DateTime<Utc>) -> bool {
    if !has_role(roles, ACADEMY_ROLES, now) {
        return false;
    }
    if is_admin(roles, now) {
        return false;
    }
    if has_role(roles, NON_ACADEMY_ROLES, now) {
        return false;
    }
    // Any premium-tier hierarchy disqualifies even under an unknown name.
    !roles
        .iter()
        .any(|r| r.is_active(now) && r.hierarchy_level >= HIERARCHY_PREMIUM)
}

/// Whether the role set alone carries an active subscription entitlement
/// (premium tier, admin, or an unexpired explicit trial). The implicit
/// 24-hour window is the trial resolver's business, not the role set's.
pub fn has_premium_access(roles: &[RoleAssignment], now: DateTime<Utc>) -> bool {
    if is_admin(roles, now) {
        return true;
    }
    if has_role(roles, TRIAL_ROLES, now) {
        return true;
    }
    roles
        .iter()
        .any(|r| r.is_active(now) && r.hierarchy_level >= HIERARCHY_PREMIUM)
}

pub fn classify(roles: &[RoleAssignment], now: DateTime<Utc>) -> Classification {
    Classification {
        is_admin: is_admin(roles, now),
        is_academy_only: is_academy_only(roles, now),
        max_hierarchy_level: max_hierarchy_level(roles, now),
        has_premium_access: has_premium_access(roles, now),
    }
}
