#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use wiggly_auth::backend::{AuthBackend, Navigator};
use wiggly_auth::error::BackendError;
use wiggly_auth::types::{OnboardingStatus, RoleAssignment, Session, SessionUser};

/// Scriptable stand-in for the hosted backend.
#[derive(Default)]
pub struct MockBackend {
    session: Mutex<Option<Session>>,
    roles: Mutex<Vec<RoleAssignment>>,
    onboarding_completed: Mutex<bool>,
    fail_session: Mutex<bool>,
    fail_roles: Mutex<bool>,
    fail_onboarding: Mutex<bool>,
    pub session_fetches: AtomicUsize,
    pub role_fetches: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.onboarding_completed.lock().unwrap() = true;
        backend
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub fn set_roles(&self, roles: Vec<RoleAssignment>) {
        *self.roles.lock().unwrap() = roles;
    }

    pub fn set_onboarding_completed(&self, completed: bool) {
        *self.onboarding_completed.lock().unwrap() = completed;
    }

    pub fn set_fail_session(&self, fail: bool) {
        *self.fail_session.lock().unwrap() = fail;
    }

    pub fn set_fail_roles(&self, fail: bool) {
        *self.fail_roles.lock().unwrap() = fail;
    }

    pub fn set_fail_onboarding(&self, fail: bool) {
        *self.fail_onboarding.lock().unwrap() = fail;
    }

    pub fn role_fetch_count(&self) -> usize {
        self.role_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.session_fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_session.lock().unwrap() {
            return Err(BackendError::Unavailable("session endpoint down".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn fetch_role_assignments(
        &self,
        _user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, BackendError> {
        self.role_fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_roles.lock().unwrap() {
            return Err(BackendError::Query("role query failed".into()));
        }
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn check_onboarding_status(
        &self,
        _user_id: Uuid,
    ) -> Result<OnboardingStatus, BackendError> {
        if *self.fail_onboarding.lock().unwrap() {
            return Err(BackendError::Unavailable("rpc down".into()));
        }
        Ok(OnboardingStatus {
            completed: *self.onboarding_completed.lock().unwrap(),
        })
    }
}

/// Navigator that records every route replacement.
#[derive(Default)]
pub struct RecordingNavigator {
    replacements: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> Vec<String> {
        self.replacements.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        self.replacements.lock().unwrap().push(path.to_string());
    }
}

// ========================================
// Fixtures
// ========================================

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

/// Established user: account older than any trial window, has signed in
/// before.
pub fn regular_user() -> SessionUser {
    user_created_hours_ago(24 * 30)
}

pub fn user_created_hours_ago(hours: i64) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: Some("trader@example.com".to_string()),
        created_at: Utc::now() - Duration::hours(hours),
        last_sign_in_at: Some(Utc::now() - Duration::hours(1)),
        user_metadata: json!({}),
    }
}

/// A user whose very first sign-in is happening now.
pub fn new_user() -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: Some("fresh@example.com".to_string()),
        created_at: Utc::now(),
        last_sign_in_at: None,
        user_metadata: json!({}),
    }
}

pub fn user_with_signup_type(signup_type: &str) -> SessionUser {
    SessionUser {
        user_metadata: json!({ "signup_type": signup_type }),
        ..new_user()
    }
}

pub fn session_for(user: &SessionUser) -> Session {
    Session {
        access_token: format!("token-{}", user.id.simple()),
        user: user.clone(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
