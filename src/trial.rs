use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::RoleCache;
use crate::classify;
use crate::config::TrialConfig;
use crate::types::SessionUser;

/// What the trial resolver hands back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialStatus {
    pub is_trial_active: bool,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub hours_remaining: i64,
}

impl TrialStatus {
    pub fn inactive() -> Self {
        Self {
            is_trial_active: false,
            trial_expires_at: None,
            hours_remaining: 0,
        }
    }

    fn from_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let is_trial_active = expires_at > now;
        Self {
            is_trial_active,
            trial_expires_at: Some(expires_at),
            hours_remaining: if is_trial_active {
                hours_remaining_ceil(expires_at, now)
            } else {
                0
            },
        }
    }
}

/// Remaining whole hours, rounded up, floored at zero.
fn hours_remaining_ceil(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (expires_at - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 3599) / 3600
    }
}

/// Derives whether a user is inside a trial window, either from an explicit
/// trial role or implicitly from account age.
///
/// The result is memoized per `(user id, created_at)`: the role lookup behind
/// it is async and must not be re-issued every time a caller re-checks within
/// the same identity. Invalidation rides the same clear-cache event as the
/// role cache.
pub struct TrialResolver {
    roles: Arc<RoleCache>,
    implicit_hours: i64,
    memo: Mutex<Option<((Uuid, DateTime<Utc>), TrialStatus)>>,
}

impl TrialResolver {
    pub fn new(roles: Arc<RoleCache>, config: &TrialConfig) -> Self {
        Self {
            roles,
            implicit_hours: config.implicit_hours,
            memo: Mutex::new(None),
        }
    }

    pub async fn resolve(&self, user: Option<&SessionUser>) -> TrialStatus {
        // Rule 1: nobody signed in.
        let Some(user) = user else {
            return TrialStatus::inactive();
        };

        let key = (user.id, user.created_at);
        {
            let memo = self.memo.lock().await;
            if let Some((cached_key, status)) = *memo {
                if cached_key == key {
                    return status;
                }
            }
        }

        let status = self.compute(user).await;
        *self.memo.lock().await = Some((key, status));
        status
    }

    pub async fn invalidate(&self) {
        self.memo.lock().await.take();
        tracing::debug!("trial status memo invalidated");
    }

    // Ordered rules, first match wins.
    async fn compute(&self, user: &SessionUser) -> TrialStatus {
        let now = Utc::now();
        let roles = self.roles.roles_detailed(user.id).await;

        let has_academy = classify::has_role(&roles, classify::ACADEMY_ROLES, now);
        let trial_role = roles
            .iter()
            .find(|r| classify::TRIAL_ROLES.contains(&r.name.as_str()) && r.is_active(now));

        // Rule 2: academy-only users have no trial entitlement at all.
        if has_academy && trial_role.is_none() && classify::is_academy_only(&roles, now) {
            tracing::debug!(user_id = %user.id, "academy-only user, no trial entitlement");
            return TrialStatus::inactive();
        }

        // Rule 3: explicit trial role with an expiry.
        if let Some(role) = trial_role {
            return match role.expires_at {
                Some(expires_at) => TrialStatus::from_expiry(expires_at, now),
                // A trial role without an expiry grants nothing.
                None => TrialStatus::inactive(),
            };
        }

        // Rule 4: implicit window from account creation.
        if !has_academy {
            let expires_at = user.created_at + Duration::hours(self.implicit_hours);
            return TrialStatus::from_expiry(expires_at, now);
        }

        // Rule 5: everything else.
        TrialStatus::inactive()
    }
}
