use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::types::{OnboardingStatus, RoleAssignment, Session};

/// The hosted identity/data backend, host-implemented.
///
/// Every call is an opaque remote round trip; this crate never assumes
/// anything about transport or retries. Consumers decide individually how to
/// degrade when a call fails (see `RoleCache`, `RedirectEngine`).
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current session, if anyone is signed in.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// All role assignments for a user, including expired rows. Expiry
    /// filtering is a read-time concern of the callers.
    async fn fetch_role_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, BackendError>;

    async fn check_onboarding_status(
        &self,
        user_id: Uuid,
    ) -> Result<OnboardingStatus, BackendError>;
}

/// Client-side router seam. The engine only ever issues route replacements;
/// it never requests a full page reload.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}
