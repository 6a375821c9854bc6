mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use common::{
    new_user, regular_user, role, session_for, user_with_signup_type, MockBackend,
    RecordingNavigator,
};
use wiggly_auth::backend::AuthBackend;
use wiggly_auth::cache::{RoleCache, SessionCache};
use wiggly_auth::config::AuthConfig;
use wiggly_auth::redirect::{RedirectEngine, RedirectPhase};
use wiggly_auth::types::{AuthEvent, Location, SessionUser};

struct Rig {
    backend: Arc<MockBackend>,
    navigator: Arc<RecordingNavigator>,
    engine: Arc<RedirectEngine>,
}

fn rig() -> Rig {
    let backend = Arc::new(MockBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let config = AuthConfig::default();
    let dyn_backend: Arc<dyn AuthBackend> = Arc::clone(&backend) as Arc<dyn AuthBackend>;
    let session = Arc::new(SessionCache::new(
        Arc::clone(&dyn_backend),
        config.cache.ttl(),
    ));
    let roles = Arc::new(RoleCache::new(Arc::clone(&dyn_backend), config.cache.ttl()));
    let engine = RedirectEngine::new(
        dyn_backend,
        session,
        roles,
        Arc::clone(&navigator) as Arc<dyn wiggly_auth::backend::Navigator>,
        &config.redirect,
    );
    Rig {
        backend,
        navigator,
        engine,
    }
}

impl Rig {
    fn sign_in(&self, user: &SessionUser) -> AuthEvent {
        let session = session_for(user);
        self.backend.set_session(Some(session.clone()));
        AuthEvent::SignedIn(session)
    }
}

/// Both debounce windows plus slack.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1000)).await;
}

#[tokio::test(start_paused = true)]
async fn two_events_in_the_debounce_window_navigate_once() -> Result<()> {
    common::init_tracing();
    let rig = rig();
    let user = regular_user();
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    rig.engine
        .clone()
        .handle_auth_event(
            &AuthEvent::InitialSession(Some(session_for(&user))),
            Location::new("/login"),
        )
        .await;
    settle().await;

    assert_eq!(rig.navigator.targets(), vec!["/dashboard".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn late_duplicate_is_suppressed_by_the_phase_gate() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    settle().await;

    // Second evaluation in the same cycle, well outside the debounce window.
    rig.engine
        .clone()
        .handle_auth_event(
            &AuthEvent::InitialSession(Some(session_for(&user))),
            Location::new("/login"),
        )
        .await;
    settle().await;

    assert_eq!(rig.navigator.targets().len(), 1);
    assert_eq!(rig.engine.phase().await, RedirectPhase::Redirected);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn academy_only_user_is_routed_off_restricted_pages() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    rig.backend.set_roles(vec![role("academy_student", 30)]);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/trades"))
        .await;
    settle().await;

    assert_eq!(rig.navigator.targets(), vec!["/academy".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn academy_only_user_stays_on_allowed_pages() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    rig.backend.set_roles(vec![role("academy_student", 30)]);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/academy/profile"))
        .await;
    settle().await;

    assert!(rig.navigator.targets().is_empty());
    assert_eq!(rig.engine.phase().await, RedirectPhase::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn haven_ark_signup_beats_incomplete_onboarding() -> Result<()> {
    let rig = rig();
    let user = user_with_signup_type("haven_ark");
    rig.backend.set_onboarding_completed(false);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/signup"))
        .await;
    settle().await;

    assert_eq!(rig.navigator.targets(), vec!["/academy".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn new_user_is_sent_to_onboarding() -> Result<()> {
    let rig = rig();
    let user = new_user();
    rig.backend.set_onboarding_completed(false);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/"))
        .await;
    settle().await;

    assert_eq!(rig.navigator.targets(), vec!["/onboarding".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn email_verification_page_is_never_hijacked() -> Result<()> {
    let rig = rig();
    let user = new_user();
    rig.backend.set_onboarding_completed(false);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/email-verification"))
        .await;
    settle().await;

    assert!(rig.navigator.targets().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reset_password_with_token_is_never_hijacked() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(
            &event,
            Location::new("/reset-password").with_query("token", "abc"),
        )
        .await;
    settle().await;

    assert!(rig.navigator.targets().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn onboarding_lookup_failure_stays_put() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    rig.backend.set_fail_onboarding(true);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    settle().await;

    assert!(rig.navigator.targets().is_empty());
    assert_eq!(rig.engine.phase().await, RedirectPhase::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn role_lookup_failure_stays_put() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    rig.backend.set_fail_roles(true);
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    settle().await;

    // An empty grant list would have produced /dashboard; an error must not.
    assert!(rig.navigator.targets().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sign_out_resets_the_cycle_for_the_next_sign_in() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    settle().await;
    assert_eq!(rig.navigator.targets().len(), 1);

    rig.backend.set_session(None);
    rig.engine
        .clone()
        .handle_auth_event(&AuthEvent::SignedOut, Location::new("/dashboard"))
        .await;
    assert_eq!(rig.engine.phase().await, RedirectPhase::Idle);

    let event = rig.sign_in(&user);
    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    settle().await;

    assert_eq!(
        rig.navigator.targets(),
        vec!["/dashboard".to_string(), "/dashboard".to_string()]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sign_out_cancels_a_pending_decision() -> Result<()> {
    let rig = rig();
    let user = regular_user();
    let event = rig.sign_in(&user);

    rig.engine
        .clone()
        .handle_auth_event(&event, Location::new("/login"))
        .await;
    // Sign out lands inside the debounce window.
    rig.engine
        .clone()
        .handle_auth_event(&AuthEvent::SignedOut, Location::new("/login"))
        .await;
    settle().await;

    assert!(rig.navigator.targets().is_empty());
    Ok(())
}
