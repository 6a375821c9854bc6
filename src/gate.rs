use std::sync::Arc;

use crate::cache::{RoleCache, SessionCache};
use crate::redirect::{ACADEMY_PATH, LOGIN_PATH, SUBSCRIPTION_PATH};
use crate::trial::TrialResolver;

/// Per-route requirements, declared where the host mounts the route.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateOptions {
    pub allow_academy_only_users: bool,
    pub require_subscription: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(&'static str),
}

/// Declarative route guard. The host keeps its loading state up while
/// `evaluate` is pending, then either renders or redirects.
///
/// Pure delegation: classification comes from the role cache and the trial
/// resolver; the gate adds no state of its own. Backend failures degrade to
/// least privilege through the caches' soft-fail contract.
pub struct RouteGate {
    session: Arc<SessionCache>,
    roles: Arc<RoleCache>,
    trial: Arc<TrialResolver>,
}

impl RouteGate {
    pub fn new(
        session: Arc<SessionCache>,
        roles: Arc<RoleCache>,
        trial: Arc<TrialResolver>,
    ) -> Self {
        Self {
            session,
            roles,
            trial,
        }
    }

    pub async fn evaluate(&self, options: GateOptions) -> GateDecision {
        let Some(user) = self.session.session_user().await else {
            return GateDecision::Redirect(LOGIN_PATH);
        };

        let classification = self.roles.classification(user.id).await;

        if options.require_subscription && !classification.has_premium_access {
            let trial = self.trial.resolve(Some(&user)).await;
            if !trial.is_trial_active {
                tracing::debug!(user_id = %user.id, "no subscription or trial, gating route");
                return GateDecision::Redirect(SUBSCRIPTION_PATH);
            }
        }

        if !options.allow_academy_only_users && classification.is_academy_only {
            return GateDecision::Redirect(ACADEMY_PATH);
        }

        GateDecision::Render
    }
}
