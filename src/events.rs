//! Typed refresh-event bus and the throttled broadcaster feeding it.
//!
//! Page-level data hooks (trades, funds, calendar, analytics) each subscribe
//! to the subset of events they care about and re-fetch their own data. The
//! broadcaster knows nothing about its consumers; delivery is fire-and-forget
//! over a tokio broadcast channel: at least one emission per distinct
//! user-facing trigger, no ordering or delivery guarantee beyond channel
//! semantics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::RefreshConfig;
use crate::types::AuthEvent;

/// The fixed set of named refresh signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RefreshEvent {
    GlobalDataRefresh { timestamp: DateTime<Utc> },
    ClearUserDataCache,
    TradeDataUpdated,
    DashboardDataUpdated,
    CalendarDataUpdated,
    PlaybookDataUpdated,
    FundsDataUpdated,
    AnalyticsDataUpdated,
}

impl RefreshEvent {
    /// The browser-event name this signal replaced.
    pub fn name(&self) -> &'static str {
        match self {
            RefreshEvent::GlobalDataRefresh { .. } => "globalDataRefresh",
            RefreshEvent::ClearUserDataCache => "clearUserDataCache",
            RefreshEvent::TradeDataUpdated => "tradeDataUpdated",
            RefreshEvent::DashboardDataUpdated => "dashboardDataUpdated",
            RefreshEvent::CalendarDataUpdated => "calendarDataUpdated",
            RefreshEvent::PlaybookDataUpdated => "playbookDataUpdated",
            RefreshEvent::FundsDataUpdated => "fundsDataUpdated",
            RefreshEvent::AnalyticsDataUpdated => "analyticsDataUpdated",
        }
    }
}

/// The six domain events emitted after every cache clear, in order.
const DOMAIN_EVENTS: [RefreshEvent; 6] = [
    RefreshEvent::TradeDataUpdated,
    RefreshEvent::DashboardDataUpdated,
    RefreshEvent::CalendarDataUpdated,
    RefreshEvent::PlaybookDataUpdated,
    RefreshEvent::FundsDataUpdated,
    RefreshEvent::AnalyticsDataUpdated,
];

/// Cloneable multi-producer, multi-consumer bus for refresh events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RefreshEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all live subscribers. Returns how many received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, event: RefreshEvent) -> usize {
        let name = event.name();
        let delivered = self.sender.send(event).unwrap_or_default();
        tracing::trace!(event = name, delivered, "refresh event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits the global refresh sequence, throttled per instance.
///
/// Triggers: initial session load, detected user switch, window focus
/// regained (unless the tab reported an unload moments before), and explicit
/// sign-in.
pub struct RefreshBroadcaster {
    bus: EventBus,
    throttle: Duration,
    unload_suppress: Duration,
    last_emit: Mutex<Option<Instant>>,
    last_unload: Mutex<Option<Instant>>,
    last_user: Mutex<Option<Uuid>>,
}

impl RefreshBroadcaster {
    pub fn new(bus: EventBus, config: &RefreshConfig) -> Self {
        Self {
            bus,
            throttle: config.throttle(),
            unload_suppress: config.unload_suppress(),
            last_emit: Mutex::new(None),
            last_unload: Mutex::new(None),
            last_user: Mutex::new(None),
        }
    }

    /// Emit one global refresh followed by the cache clear and the fixed
    /// domain set. Returns false when the throttle swallowed the call.
    pub async fn refresh_data(&self) -> bool {
        {
            let mut last_emit = self.last_emit.lock().await;
            if let Some(at) = *last_emit {
                if at.elapsed() < self.throttle {
                    tracing::debug!("refresh throttled");
                    return false;
                }
            }
            *last_emit = Some(Instant::now());
        }

        self.bus.publish(RefreshEvent::GlobalDataRefresh {
            timestamp: Utc::now(),
        });
        self.bus.publish(RefreshEvent::ClearUserDataCache);
        for event in DOMAIN_EVENTS {
            self.bus.publish(event);
        }
        tracing::debug!("global data refresh broadcast");
        true
    }

    /// The host reports page unloads so a focus event fired by a fast reload
    /// cycle does not trigger a redundant refresh.
    pub async fn note_unload(&self) {
        *self.last_unload.lock().await = Some(Instant::now());
    }

    async fn recently_unloaded(&self) -> bool {
        self.last_unload
            .lock()
            .await
            .map_or(false, |at| at.elapsed() < self.unload_suppress)
    }

    pub async fn handle_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::InitialSession(Some(session)) => {
                self.remember_user(session.user.id).await;
                self.refresh_data().await;
            }
            AuthEvent::InitialSession(None) => {
                *self.last_user.lock().await = None;
            }
            AuthEvent::SignedIn(session) => {
                self.remember_user(session.user.id).await;
                self.refresh_data().await;
            }
            AuthEvent::TokenRefreshed(session) => {
                // Refresh only when the token belongs to a different user
                // than the one we last saw.
                if self.remember_user(session.user.id).await {
                    tracing::info!(user_id = %session.user.id, "user switch detected");
                    self.refresh_data().await;
                }
            }
            AuthEvent::SignedOut => {
                *self.last_user.lock().await = None;
            }
            AuthEvent::FocusRegained => {
                if self.recently_unloaded().await {
                    tracing::debug!("focus refresh suppressed after recent unload");
                } else {
                    self.refresh_data().await;
                }
            }
        }
    }

    /// Record the current user id; true when it differs from the previous one.
    async fn remember_user(&self, user_id: Uuid) -> bool {
        let mut last_user = self.last_user.lock().await;
        let switched = matches!(*last_user, Some(previous) if previous != user_id);
        *last_user = Some(user_id);
        switched
    }
}
