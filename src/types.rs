use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Hierarchy level at or above which a role grants admin authority.
pub const HIERARCHY_ADMIN: i32 = 90;

/// Hierarchy level at or above which a role counts as premium tier.
pub const HIERARCHY_PREMIUM: i32 = 40;

/// Hierarchy level of academy-adjacent premium roles.
pub const HIERARCHY_ACADEMY_PREMIUM: i32 = 30;

/// How the account was created, read from the session user's metadata.
/// Unknown or missing discriminators parse to `None` at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupType {
    HavenArk,
    Academy,
}

/// The user half of a session as the hosted backend returns it.
/// `user_metadata` is kept untyped because the backend stores it as a
/// free-form JSON object; only `signup_type` is ever read out of it here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl SessionUser {
    pub fn signup_type(&self) -> Option<SignupType> {
        match self.user_metadata.get("signup_type").and_then(Value::as_str) {
            Some("haven_ark") => Some(SignupType::HavenArk),
            Some("academy") => Some(SignupType::Academy),
            _ => None,
        }
    }

    /// A user that has never signed in before is routed through onboarding.
    pub fn is_new_user(&self) -> bool {
        self.last_sign_in_at.is_none()
    }
}

/// Opaque identity token plus the user it belongs to. Owned by the host's
/// auth provider for its lifetime; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: SessionUser,
}

/// One row of the backend's role-assignment query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub name: String,
    pub hierarchy_level: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// An assignment with a past expiry must be treated as absent by every
    /// consumer. Filtering happens at read time; rows are never deleted here.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OnboardingStatus {
    pub completed: bool,
}

/// Auth-provider callback vocabulary consumed by the redirect engine and the
/// refresh broadcaster.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// First session fetch after page load; `None` when nobody is signed in.
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    /// The window regained focus; only the broadcaster cares.
    FocusRegained,
}

/// Where the browser currently is: path plus parsed query parameters.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: HashMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn has_query(&self, key: &str) -> bool {
        self.query.contains_key(key)
    }
}
