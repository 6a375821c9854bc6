//! Wiring: one entry point that owns the caches, the trial resolver, the
//! redirect engine, and the refresh broadcaster, and fans each auth event out
//! to them in order.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::backend::{AuthBackend, Navigator};
use crate::cache::{RoleCache, SessionCache};
use crate::config::AuthConfig;
use crate::events::{EventBus, RefreshBroadcaster, RefreshEvent};
use crate::gate::RouteGate;
use crate::redirect::RedirectEngine;
use crate::trial::TrialResolver;
use crate::types::{AuthEvent, Location};

pub struct AuthFlow {
    roles: Arc<RoleCache>,
    session: Arc<SessionCache>,
    trial: Arc<TrialResolver>,
    engine: Arc<RedirectEngine>,
    broadcaster: Arc<RefreshBroadcaster>,
    bus: EventBus,
}

impl AuthFlow {
    /// Build the full wiring. Must be called inside a tokio runtime: the
    /// clear-cache listener is spawned here.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        navigator: Arc<dyn Navigator>,
        config: AuthConfig,
    ) -> Self {
        let roles = Arc::new(RoleCache::new(Arc::clone(&backend), config.cache.ttl()));
        let session = Arc::new(SessionCache::new(Arc::clone(&backend), config.cache.ttl()));
        let trial = Arc::new(TrialResolver::new(Arc::clone(&roles), &config.trial));
        let bus = EventBus::with_capacity(config.refresh.channel_capacity);
        let broadcaster = Arc::new(RefreshBroadcaster::new(bus.clone(), &config.refresh));
        let engine = RedirectEngine::new(
            backend,
            Arc::clone(&session),
            Arc::clone(&roles),
            navigator,
            &config.redirect,
        );

        let flow = Self {
            roles,
            session,
            trial,
            engine,
            broadcaster,
            bus,
        };
        flow.spawn_clear_cache_listener();
        flow
    }

    /// The caches are invalidated wholesale whenever anyone broadcasts a
    /// clear-cache event, not only when this flow's own refresh does.
    fn spawn_clear_cache_listener(&self) {
        let mut rx = self.bus.subscribe();
        let roles = Arc::clone(&self.roles);
        let session = Arc::clone(&self.session);
        let trial = Arc::clone(&self.trial);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(RefreshEvent::ClearUserDataCache) => {
                        roles.invalidate().await;
                        session.invalidate().await;
                        trial.invalidate().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "clear-cache listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Entry point for every auth-provider callback.
    pub async fn handle_event(&self, event: AuthEvent, location: Location) {
        tracing::debug!(?event, path = %location.path, "auth event");

        if matches!(event, AuthEvent::SignedOut) {
            self.roles.invalidate().await;
            self.session.invalidate().await;
            self.trial.invalidate().await;
        }

        self.broadcaster.handle_auth_event(&event).await;
        Arc::clone(&self.engine)
            .handle_auth_event(&event, location)
            .await;
    }

    /// Explicit user-facing refresh trigger (pull-to-refresh and friends).
    pub async fn refresh_data(&self) -> bool {
        self.broadcaster.refresh_data().await
    }

    pub async fn note_unload(&self) {
        self.broadcaster.note_unload().await;
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RefreshEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn gate(&self) -> RouteGate {
        RouteGate::new(
            Arc::clone(&self.session),
            Arc::clone(&self.roles),
            Arc::clone(&self.trial),
        )
    }

    pub fn trial(&self) -> Arc<TrialResolver> {
        Arc::clone(&self.trial)
    }

    pub fn roles(&self) -> Arc<RoleCache> {
        Arc::clone(&self.roles)
    }

    pub fn redirect_engine(&self) -> Arc<RedirectEngine> {
        Arc::clone(&self.engine)
    }
}
