use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use std::{convert::Infallible, time::Duration};

use crate::{
    auth::{AuthState, Session, SessionSubscription},
    error::AuthError,
    handlers::session::{SESSION_COOKIE, clear_session_cookie},
};

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/admin/login";

/// GuardState
///
/// `Checking` until the first session response arrives; afterwards the guard flips
/// between `Authorized` and `Unauthorized` for as long as it is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardState {
    Checking,
    Authorized,
    Unauthorized,
}

impl GuardState {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardState::Checking => "checking",
            GuardState::Authorized => "authorized",
            GuardState::Unauthorized => "unauthorized",
        }
    }
}

/// What the guard shows for its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Neutral "checking..." output: neither protected content nor a redirect.
    Placeholder,
    /// The nested protected view, unchanged.
    Protected,
    /// Navigate away; `replace` means the protected entry must not stay in history.
    Redirect { to: &'static str, replace: bool },
}

/// RouteGuard
///
/// The decision core of the session gate, independent of how requests or pages are
/// delivered. Errors from the session check fail closed.
#[derive(Debug)]
pub struct RouteGuard {
    state: GuardState,
    session: Option<Session>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGuard {
    pub fn new() -> Self {
        Self {
            state: GuardState::Checking,
            session: None,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn view(&self) -> GuardView {
        match self.state {
            GuardState::Checking => GuardView::Placeholder,
            GuardState::Authorized => GuardView::Protected,
            GuardState::Unauthorized => GuardView::Redirect {
                to: LOGIN_PATH,
                replace: true,
            },
        }
    }

    /// Applies a session-check outcome and returns the new state.
    pub fn resolve(&mut self, outcome: Result<Option<Session>, AuthError>) -> GuardState {
        self.session = match outcome {
            Ok(Some(session)) if !session.is_expired() => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "session check failed, treating visitor as signed out");
                None
            }
        };
        self.state = if self.session.is_some() {
            GuardState::Authorized
        } else {
            GuardState::Unauthorized
        };
        self.state
    }
}

/// Runs one session check for `token` against `auth`.
async fn check(auth: &AuthState, token: Option<&str>) -> Result<Option<Session>, AuthError> {
    match token {
        Some(token) => auth.get_session(token).await,
        None => Ok(None),
    }
}

/// MountedGuard
///
/// A `RouteGuard` that stays subscribed to session changes. Dropping it drops the
/// subscription.
pub struct MountedGuard {
    auth: AuthState,
    token: Option<String>,
    guard: RouteGuard,
    events: SessionSubscription,
}

impl MountedGuard {
    /// Subscribes, then performs the initial check, so a change racing the check is
    /// still observed.
    pub async fn mount(auth: AuthState, token: Option<String>) -> Self {
        let events = auth.subscribe();
        let mut guard = RouteGuard::new();
        guard.resolve(check(&auth, token.as_deref()).await);

        Self {
            auth,
            token,
            guard,
            events,
        }
    }

    pub fn state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn view(&self) -> GuardView {
        self.guard.view()
    }

    /// Waits for the next transition. Every notification, and the expiry of the current
    /// session, triggers a re-check; re-checks that keep the state are swallowed.
    /// Returns `None` once the notification stream is closed.
    pub async fn changed(&mut self) -> Option<GuardState> {
        loop {
            let expiry = self.guard.session().map(|session| {
                (session.expires_at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            });

            tokio::select! {
                event = self.events.recv() => {
                    let event = event?;
                    tracing::debug!(?event, "session change observed");
                }
                _ = sleep_or_pending(expiry) => {
                    tracing::debug!("session reached its expiry");
                }
            }

            let previous = self.guard.state();
            let outcome = check(&self.auth, self.token.as_deref()).await;
            let next = self.guard.resolve(outcome);
            if next != previous {
                return Some(next);
            }
        }
    }

    pub fn unmount(self) {}
}

async fn sleep_or_pending(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// require_session
///
/// Middleware applied to the authenticated router. Resolves the guard for the session
/// cookie: authorized requests continue with the `Session` in their extensions;
/// everything else is redirected to the login page with `303 See Other`, so the
/// protected URL never becomes a history entry of its own.
pub async fn require_session(
    State(auth): State<AuthState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());

    let mut guard = RouteGuard::new();
    guard.resolve(check(&auth, token.as_deref()).await);

    match (guard.view(), guard.session) {
        (GuardView::Protected, Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        _ => {
            tracing::debug!(uri = %request.uri(), "redirecting unauthenticated visitor");
            // A stale cookie would be re-checked on every navigation; drop it.
            let jar = if token.is_some() {
                jar.remove(clear_session_cookie())
            } else {
                jar
            };
            (jar, Redirect::to(LOGIN_PATH)).into_response()
        }
    }
}

/// session_events
///
/// `GET /admin/session/events`: server-sent events that mirror a mounted guard.
/// Emits `event: session` with `authorized` or `unauthorized` once the initial check
/// resolves and again on every transition. Pages react to `unauthorized` with
/// `location.replace(LOGIN_PATH)`.
pub async fn session_events(
    State(auth): State<AuthState>,
    jar: PrivateCookieJar,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());
    let guard = MountedGuard::mount(auth, token).await;
    let initial = guard.state();

    let transitions = stream::unfold(guard, |mut guard| async move {
        guard.changed().await.map(|state| (state, guard))
    });

    let events = stream::once(async move { initial })
        .chain(transitions)
        .map(|state| Ok(Event::default().event("session").data(state.as_str())));

    Sse::new(events).keep_alive(KeepAlive::default())
}
