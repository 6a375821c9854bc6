// Read-through memoization over the backend's session and role queries.
//
// These caches exist so the trial resolver, redirect engine, and route gate
// can all check identity within one render cycle without three round trips.
// They are not a source of truth: short TTL, wholesale invalidation on the
// clear-cache event, no per-entry eviction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::backend::AuthBackend;
use crate::classify::{self, Classification};
use crate::error::BackendError;
use crate::types::{RoleAssignment, SessionUser};

struct RoleEntry {
    user_id: Uuid,
    fetched_at: Instant,
    /// Raw backend rows, expired ones included. Expiry is filtered on every
    /// read so an assignment can lapse mid-window.
    assignments: Vec<RoleAssignment>,
}

/// Memoized role-assignment lookup for the current user.
pub struct RoleCache {
    backend: Arc<dyn AuthBackend>,
    ttl: Duration,
    entry: Mutex<Option<RoleEntry>>,
}

impl RoleCache {
    pub fn new(backend: Arc<dyn AuthBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Active assignments for `user_id`, memoized per identity. Propagates
    /// backend failure so callers that must not act on uncertain state (the
    /// redirect engine) can tell an error apart from an empty grant list.
    pub async fn fetch(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, BackendError> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.user_id == user_id && cached.fetched_at.elapsed() < self.ttl {
                return Ok(classify::filter_active(&cached.assignments, Utc::now()));
            }
        }

        let assignments = self.backend.fetch_role_assignments(user_id).await?;
        let active = classify::filter_active(&assignments, Utc::now());
        tracing::debug!(
            %user_id,
            total = assignments.len(),
            active = active.len(),
            "role assignments fetched"
        );
        *entry = Some(RoleEntry {
            user_id,
            fetched_at: Instant::now(),
            assignments,
        });
        Ok(active)
    }

    /// Soft-fail variant: a backend error degrades to an empty list so every
    /// caller defaults to least privilege.
    pub async fn roles_detailed(&self, user_id: Uuid) -> Vec<RoleAssignment> {
        match self.fetch(user_id).await {
            Ok(assignments) => assignments,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "role lookup failed, defaulting to no roles");
                Vec::new()
            }
        }
    }

    pub async fn roles(&self, user_id: Uuid) -> Vec<String> {
        self.roles_detailed(user_id)
            .await
            .into_iter()
            .map(|r| r.name)
            .collect()
    }

    pub async fn max_hierarchy_level(&self, user_id: Uuid) -> i32 {
        let roles = self.roles_detailed(user_id).await;
        classify::max_hierarchy_level(&roles, Utc::now())
    }

    pub async fn classification(&self, user_id: Uuid) -> Classification {
        let roles = self.roles_detailed(user_id).await;
        classify::classify(&roles, Utc::now())
    }

    /// Wholesale invalidation, wired to the clear-cache event.
    pub async fn invalidate(&self) {
        self.entry.lock().await.take();
        tracing::debug!("role cache invalidated");
    }
}

struct SessionEntry {
    fetched_at: Instant,
    user: Option<SessionUser>,
}

/// Memoized session lookup. Only used to read `user_metadata.signup_type`
/// during first-login routing; the host's auth provider remains the source of
/// truth for the session the rest of the app sees.
pub struct SessionCache {
    backend: Arc<dyn AuthBackend>,
    ttl: Duration,
    entry: Mutex<Option<SessionEntry>>,
}

impl SessionCache {
    pub fn new(backend: Arc<dyn AuthBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Current session user, or `None` when signed out or when the backend
    /// fails (soft fail, logged).
    pub async fn session_user(&self) -> Option<SessionUser> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.user.clone();
            }
        }

        match self.backend.get_session().await {
            Ok(session) => {
                let user = session.map(|s| s.user);
                *entry = Some(SessionEntry {
                    fetched_at: Instant::now(),
                    user: user.clone(),
                });
                user
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed, treating as signed out");
                None
            }
        }
    }

    pub async fn invalidate(&self) {
        self.entry.lock().await.take();
        tracing::debug!("session cache invalidated");
    }
}
