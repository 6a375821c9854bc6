//! The redirect decision engine.
//!
//! On every auth event the engine derives a fresh pseudo-state (who the user
//! is, where the browser is, whether a special flow is active) and walks an
//! ordered rule list; the first applicable rule wins. The whole decision sits
//! behind an outer debounce from the originating event, the role step behind
//! a second, shorter one, and the [`RedirectPhase`] gate keeps the whole
//! cycle to at most one navigation even when two debounced evaluations both
//! resolve. Any lookup error aborts the decision: never redirect on
//! uncertain state.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::backend::{AuthBackend, Navigator};
use crate::cache::{RoleCache, SessionCache};
use crate::classify::{classify, Classification};
use crate::config::RedirectConfig;
use crate::scheduler::Debounce;
use crate::types::{AuthEvent, Location, SessionUser, SignupType};

pub const ACADEMY_PATH: &str = "/academy";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const SUBSCRIPTION_PATH: &str = "/subscription";

pub const EMAIL_VERIFICATION_PATH: &str = "/email-verification";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Pages a freshly signed-in user gets routed away from.
const ENTRY_PAGES: &[&str] = &[LOGIN_PATH, SIGNUP_PATH, "/"];

/// Auth pages only; "/" stays reachable for regular users.
const AUTH_PAGES: &[&str] = &[LOGIN_PATH, SIGNUP_PATH];

/// Path prefixes an academy-only user may stay on.
const ACADEMY_ALLOWED_PREFIXES: &[&str] = &[
    ACADEMY_PATH,
    SUBSCRIPTION_PATH,
    "/profile",
    "/account-settings",
    ONBOARDING_PATH,
];

/// Explicit redirect-cycle state, reset on sign-out and on each new sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPhase {
    Idle,
    Deciding,
    Redirected,
}

/// Outcome of the onboarding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingOutcome {
    /// Needs onboarding and is elsewhere.
    Redirect,
    /// Needs onboarding and is already there; decision ends here.
    Stay,
    /// Onboarding is done; later rules apply.
    NotNeeded,
}

// ========================================
// Pure transition rules
// ========================================

/// Rules 1-2: flows whose UI must never be hijacked.
pub fn is_special_flow(location: &Location) -> bool {
    if location.path == EMAIL_VERIFICATION_PATH {
        return true;
    }
    location.path == RESET_PASSWORD_PATH && location.has_query("token")
}

/// Rule 3: fresh academy signups land at the academy regardless of
/// onboarding state.
pub fn signup_redirect(signup_type: Option<SignupType>, path: &str) -> Option<&'static str> {
    match signup_type {
        Some(SignupType::HavenArk) | Some(SignupType::Academy)
            if ENTRY_PAGES.contains(&path) =>
        {
            Some(ACADEMY_PATH)
        }
        _ => None,
    }
}

/// Rule 4: new or un-onboarded users belong on the onboarding page.
pub fn onboarding_outcome(is_new_user: bool, completed: bool, path: &str) -> OnboardingOutcome {
    if !is_new_user && completed {
        return OnboardingOutcome::NotNeeded;
    }
    if path == ONBOARDING_PATH {
        OnboardingOutcome::Stay
    } else {
        OnboardingOutcome::Redirect
    }
}

/// Rules 5-6: classification-driven routing.
pub fn role_redirect(classification: &Classification, path: &str) -> Option<&'static str> {
    if classification.is_academy_only {
        if ENTRY_PAGES.contains(&path) {
            return Some(ACADEMY_PATH);
        }
        if !ACADEMY_ALLOWED_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return Some(ACADEMY_PATH);
        }
        return None;
    }
    if AUTH_PAGES.contains(&path) {
        return Some(DASHBOARD_PATH);
    }
    None
}

// ========================================
// Async driver
// ========================================

pub struct RedirectEngine {
    backend: Arc<dyn AuthBackend>,
    session: Arc<SessionCache>,
    roles: Arc<RoleCache>,
    navigator: Arc<dyn Navigator>,
    phase: Mutex<RedirectPhase>,
    event_debounce: Debounce,
    role_debounce: Debounce,
}

impl RedirectEngine {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        session: Arc<SessionCache>,
        roles: Arc<RoleCache>,
        navigator: Arc<dyn Navigator>,
        config: &RedirectConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            session,
            roles,
            navigator,
            phase: Mutex::new(RedirectPhase::Idle),
            event_debounce: Debounce::new(config.event_debounce()),
            role_debounce: Debounce::new(config.role_check_debounce()),
        })
    }

    pub async fn phase(&self) -> RedirectPhase {
        *self.phase.lock().await
    }

    pub async fn handle_auth_event(self: Arc<Self>, event: &AuthEvent, location: Location) {
        match event {
            AuthEvent::SignedOut => {
                self.event_debounce.cancel().await;
                self.role_debounce.cancel().await;
                *self.phase.lock().await = RedirectPhase::Idle;
                tracing::debug!("redirect cycle reset on sign-out");
            }
            AuthEvent::SignedIn(_) => {
                // A new sign-in starts a new cycle even if the previous one
                // already navigated.
                *self.phase.lock().await = RedirectPhase::Idle;
                self.schedule_evaluation(location).await;
            }
            AuthEvent::InitialSession(Some(_)) => {
                self.schedule_evaluation(location).await;
            }
            // Signed-out initial loads, token refreshes, and focus changes
            // never move the browser.
            _ => {}
        }
    }

    async fn schedule_evaluation(self: Arc<Self>, location: Location) {
        let engine = Arc::clone(&self);
        self.event_debounce
            .schedule(Box::pin(async move {
                engine.evaluate(location).await;
            }))
            .await;
    }

    async fn evaluate(self: Arc<Self>, location: Location) {
        {
            let mut phase = self.phase.lock().await;
            if *phase == RedirectPhase::Redirected {
                tracing::debug!("evaluation skipped, already redirected this cycle");
                return;
            }
            *phase = RedirectPhase::Deciding;
        }

        if is_special_flow(&location) {
            tracing::debug!(path = %location.path, "special flow, suppressing redirect");
            self.settle().await;
            return;
        }

        let Some(user) = self.session.session_user().await else {
            self.settle().await;
            return;
        };

        if let Some(target) = signup_redirect(user.signup_type(), &location.path) {
            self.navigate(target).await;
            return;
        }

        let onboarding = match self.backend.check_onboarding_status(user.id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "onboarding lookup failed, staying put");
                self.settle().await;
                return;
            }
        };
        match onboarding_outcome(user.is_new_user(), onboarding.completed, &location.path) {
            OnboardingOutcome::Redirect => {
                self.navigate(ONBOARDING_PATH).await;
                return;
            }
            OnboardingOutcome::Stay => {
                self.settle().await;
                return;
            }
            OnboardingOutcome::NotNeeded => {}
        }

        // Role lookups are async and triggers can overlap; collapse them.
        let engine = Arc::clone(&self);
        self.role_debounce
            .schedule(Box::pin(async move {
                engine.role_step(user, location).await;
            }))
            .await;
    }

    async fn role_step(self: Arc<Self>, user: SessionUser, location: Location) {
        let assignments = match self.roles.fetch(user.id).await {
            Ok(assignments) => assignments,
            Err(e) => {
                tracing::warn!(error = %e, "role lookup failed, staying put");
                self.settle().await;
                return;
            }
        };
        let classification = classify(&assignments, Utc::now());

        match role_redirect(&classification, &location.path) {
            Some(target) => self.navigate(target).await,
            None => self.settle().await,
        }
    }

    /// Issue at most one route replacement per cycle.
    async fn navigate(&self, path: &'static str) {
        let mut phase = self.phase.lock().await;
        if *phase == RedirectPhase::Redirected {
            tracing::debug!(%path, "navigation suppressed, already redirected this cycle");
            return;
        }
        self.navigator.replace(path);
        *phase = RedirectPhase::Redirected;
        tracing::info!(%path, "route replacement issued");
    }

    /// Decision ended without a navigation; free the gate for the next event.
    async fn settle(&self) {
        let mut phase = self.phase.lock().await;
        if *phase == RedirectPhase::Deciding {
            *phase = RedirectPhase::Idle;
        }
    }
}
