use chrono::{Duration as ChronoDuration, Utc};
use portfolio_site::{
    auth::{AuthProvider, AuthState, MockAuthProvider, Session},
    error::AuthError,
    guard::{GuardState, GuardView, LOGIN_PATH, MountedGuard, RouteGuard},
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use uuid::Uuid;

const EMAIL: &str = "owner@example.com";
const PASSWORD: &str = "correct horse";

fn provider() -> Arc<MockAuthProvider> {
    Arc::new(MockAuthProvider::new().with_account(EMAIL, PASSWORD))
}

fn session_expiring_in(offset: ChronoDuration) -> Session {
    Session {
        access_token: "token".to_string(),
        user_id: Uuid::new_v4(),
        email: Some(EMAIL.to_string()),
        session_id: Some(Uuid::new_v4()),
        expires_at: Utc::now() + offset,
    }
}

// --- RouteGuard (decision core) ---

#[test]
fn test_guard_shows_placeholder_while_checking() {
    let guard = RouteGuard::new();
    assert_eq!(guard.state(), GuardState::Checking);
    assert_eq!(guard.view(), GuardView::Placeholder);
    assert!(guard.session().is_none());
}

#[test]
fn test_no_session_redirects_with_history_replacement() {
    let mut guard = RouteGuard::new();
    assert_eq!(guard.resolve(Ok(None)), GuardState::Unauthorized);
    assert_eq!(
        guard.view(),
        GuardView::Redirect { to: LOGIN_PATH, replace: true }
    );
}

#[test]
fn test_valid_session_shows_protected_view() {
    let mut guard = RouteGuard::new();
    let session = session_expiring_in(ChronoDuration::hours(1));

    assert_eq!(guard.resolve(Ok(Some(session.clone()))), GuardState::Authorized);
    assert_eq!(guard.view(), GuardView::Protected);
    assert_eq!(guard.session(), Some(&session));
}

#[test]
fn test_check_error_fails_closed() {
    let mut guard = RouteGuard::new();
    let outcome = Err(AuthError::Unavailable("network down".into()));
    assert_eq!(guard.resolve(outcome), GuardState::Unauthorized);
}

#[test]
fn test_expired_session_is_unauthorized() {
    let mut guard = RouteGuard::new();
    let expired = session_expiring_in(ChronoDuration::seconds(-5));
    assert_eq!(guard.resolve(Ok(Some(expired))), GuardState::Unauthorized);
}

#[test]
fn test_guard_moves_back_and_forth() {
    let mut guard = RouteGuard::new();
    let session = session_expiring_in(ChronoDuration::hours(1));

    guard.resolve(Ok(Some(session.clone())));
    assert_eq!(guard.resolve(Ok(None)), GuardState::Unauthorized);
    assert_eq!(guard.resolve(Ok(Some(session))), GuardState::Authorized);
}

// --- MountedGuard (live re-evaluation) ---

#[tokio::test]
async fn test_mount_without_token_is_unauthorized() {
    let auth = provider();
    let guard = MountedGuard::mount(auth as AuthState, None).await;
    assert_eq!(guard.state(), GuardState::Unauthorized);
}

#[tokio::test]
async fn test_sign_in_then_mount_is_authorized() {
    let auth = provider();
    let session = auth.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    let guard = MountedGuard::mount(auth.clone() as AuthState, Some(session.access_token)).await;
    assert_eq!(guard.state(), GuardState::Authorized);
    assert_eq!(guard.view(), GuardView::Protected);
}

#[tokio::test]
async fn test_external_sign_out_transitions_mounted_guard() {
    let auth = provider();
    let session = auth.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    let mut guard =
        MountedGuard::mount(auth.clone() as AuthState, Some(session.access_token.clone())).await;
    assert_eq!(guard.state(), GuardState::Authorized);

    // Sign-out from "another tab".
    let other = auth.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        other.sign_out(&session).await.unwrap();
    });

    let next = timeout(Duration::from_secs(2), guard.changed())
        .await
        .expect("guard should react to sign-out without a reload");
    assert_eq!(next, Some(GuardState::Unauthorized));
    assert_eq!(
        guard.view(),
        GuardView::Redirect { to: LOGIN_PATH, replace: true }
    );
}

#[tokio::test]
async fn test_session_expiry_transitions_mounted_guard() {
    let auth = Arc::new(
        MockAuthProvider::new()
            .with_account(EMAIL, PASSWORD)
            .with_session_ttl(ChronoDuration::milliseconds(150)),
    );
    let session = auth.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    let mut guard = MountedGuard::mount(auth as AuthState, Some(session.access_token)).await;
    assert_eq!(guard.state(), GuardState::Authorized);

    let next = timeout(Duration::from_secs(2), guard.changed())
        .await
        .expect("guard should notice the expiry");
    assert_eq!(next, Some(GuardState::Unauthorized));
}

#[tokio::test]
async fn test_unrelated_notification_does_not_emit_a_transition() {
    let auth = provider();
    let mut guard = MountedGuard::mount(auth.clone() as AuthState, None).await;
    assert_eq!(guard.state(), GuardState::Unauthorized);

    // Someone else signs in; this visitor still has no session.
    auth.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    let result = timeout(Duration::from_millis(200), guard.changed()).await;
    assert!(result.is_err(), "re-check with unchanged state must be swallowed");
    assert_eq!(guard.state(), GuardState::Unauthorized);
}

#[tokio::test]
async fn test_unmount_drops_subscription() {
    let auth = provider();
    assert_eq!(auth.subscriber_count(), 0);

    let guard = MountedGuard::mount(auth.clone() as AuthState, None).await;
    assert_eq!(auth.subscriber_count(), 1);

    guard.unmount();
    assert_eq!(auth.subscriber_count(), 0);
}

#[tokio::test]
async fn test_failing_check_on_mount_fails_closed() {
    let auth = provider();
    let session = auth.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    auth.set_fail_checks(true);

    let guard = MountedGuard::mount(auth.clone() as AuthState, Some(session.access_token)).await;
    assert_eq!(guard.state(), GuardState::Unauthorized);
}
