use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Tunable windows for the auth core. Every component takes its slice of this
/// by value so tests can substitute their own; the global [`CONFIG`] is a
/// convenience default for hosts that do not care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub redirect: RedirectConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub trial: TrialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Outer collapse window from the originating auth event.
    pub event_debounce_ms: u64,
    /// Inner collapse window around the async role-classification step.
    pub role_check_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Read-through memoization window for role and session lookups.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minimum gap between two emissions from one broadcaster instance.
    pub throttle_secs: u64,
    /// Focus-triggered refresh is suppressed this long after a reported
    /// unload, to avoid redundant refreshes on fast reload cycles.
    pub unload_suppress_secs: u64,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Implicit trial window granted from account creation when no explicit
    /// trial role exists.
    pub implicit_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect: RedirectConfig {
                event_debounce_ms: 500,
                role_check_debounce_ms: 300,
            },
            cache: CacheConfig { ttl_secs: 60 },
            refresh: RefreshConfig {
                throttle_secs: 2,
                unload_suppress_secs: 5,
                channel_capacity: 64,
            },
            trial: TrialConfig { implicit_hours: 24 },
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Redirect overrides
        if let Ok(v) = env::var("WIGGLY_REDIRECT_DEBOUNCE_MS") {
            self.redirect.event_debounce_ms =
                v.parse().unwrap_or(self.redirect.event_debounce_ms);
        }
        if let Ok(v) = env::var("WIGGLY_ROLE_CHECK_DEBOUNCE_MS") {
            self.redirect.role_check_debounce_ms =
                v.parse().unwrap_or(self.redirect.role_check_debounce_ms);
        }

        // Cache overrides
        if let Ok(v) = env::var("WIGGLY_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }

        // Refresh overrides
        if let Ok(v) = env::var("WIGGLY_REFRESH_THROTTLE_SECS") {
            self.refresh.throttle_secs = v.parse().unwrap_or(self.refresh.throttle_secs);
        }
        if let Ok(v) = env::var("WIGGLY_UNLOAD_SUPPRESS_SECS") {
            self.refresh.unload_suppress_secs =
                v.parse().unwrap_or(self.refresh.unload_suppress_secs);
        }
        if let Ok(v) = env::var("WIGGLY_REFRESH_CHANNEL_CAPACITY") {
            self.refresh.channel_capacity =
                v.parse().unwrap_or(self.refresh.channel_capacity);
        }

        // Trial overrides
        if let Ok(v) = env::var("WIGGLY_IMPLICIT_TRIAL_HOURS") {
            self.trial.implicit_hours = v.parse().unwrap_or(self.trial.implicit_hours);
        }

        self
    }
}

impl RedirectConfig {
    pub fn event_debounce(&self) -> Duration {
        Duration::from_millis(self.event_debounce_ms)
    }

    pub fn role_check_debounce(&self) -> Duration {
        Duration::from_millis(self.role_check_debounce_ms)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl RefreshConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    pub fn unload_suppress(&self) -> Duration {
        Duration::from_secs(self.unload_suppress_secs)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AuthConfig> = Lazy::new(AuthConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AuthConfig {
    &CONFIG
}
