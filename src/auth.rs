use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::error::AuthError;

/// Claims
///
/// The payload of an access token issued by the hosted auth service (GoTrue).
/// Validated locally on every session check; no network round-trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the signed-in user.
    pub sub: Uuid,
    /// Expiration Time (exp): the token is rejected after this instant.
    pub exp: i64,
    /// Issued At (iat).
    pub iat: i64,
    #[serde(default)]
    pub email: Option<String>,
    /// Identifies the login session the token belongs to; shared by refreshed tokens.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

/// Session
///
/// A credential proving the visitor is authenticated as the site owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub session_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Key under which a sign-out revokes this session.
    fn revocation_key(&self) -> String {
        self.session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.access_token.clone())
    }
}

/// A change of authentication state somewhere (this tab, another tab, another device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: Uuid },
    SignedOut { user_id: Uuid },
    /// Notifications were dropped for a slow subscriber; re-check from scratch.
    Resync,
}

/// SessionSubscription
///
/// Handle on the session-change stream. Dropping it unsubscribes.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    pub fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    /// Next notification, or `None` once the provider is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "session subscriber lagged");
                Some(SessionEvent::Resync)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    pub fn unsubscribe(self) {}
}

/// AuthProvider
///
/// Contract of the external authentication service. The rest of the crate only ever
/// talks to this trait, so the hosted service can be swapped for `MockAuthProvider`
/// in tests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves an access token to its session. `Ok(None)` for unknown, expired or
    /// revoked tokens; `Err` only when the check itself could not be performed.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError>;

    /// Subscribes to sign-in / sign-out notifications.
    fn subscribe(&self) -> SessionSubscription;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// AuthState
///
/// The concrete type used to share the auth provider across the application state.
pub type AuthState = Arc<dyn AuthProvider>;

const EVENT_BUFFER: usize = 64;

// --- Hosted implementation ---

/// GoTrue's successful password-grant response (only the fields we use).
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// GoTrue error bodies differ between versions; take whichever message is present.
#[derive(Deserialize, Default)]
struct GoTrueError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl GoTrueError {
    fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| "Failed to login".to_string())
    }
}

/// SupabaseAuth
///
/// `AuthProvider` backed by the hosted GoTrue API:
/// - sign-in: `POST {url}/auth/v1/token?grant_type=password`
/// - sign-out: `POST {url}/auth/v1/logout`
/// - session check: local HS256 validation of the access token, plus a revocation list
///   filled by sign-outs made through this server.
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
    // revocation key -> token expiry; entries are pruned once the token would have expired anyway.
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: &str, jwt_secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_audience(&["authenticated"]);

        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            revoked: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn decode_session(&self, access_token: &str) -> Result<Session, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(access_token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Session {
            access_token: access_token.to_string(),
            user_id: claims.sub,
            email: claims.email,
            session_id: claims.session_id,
            expires_at,
        })
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let session = match self.decode_session(access_token) {
            Ok(session) => session,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("access token expired"),
                    _ => tracing::debug!(error = %e, "access token rejected"),
                }
                return Ok(None);
            }
        };

        if self.revoked.read().await.contains_key(&session.revocation_key()) {
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.json::<GoTrueError>().await.unwrap_or_default();
            let message = body.into_message();
            tracing::info!(%status, "sign-in rejected by auth service");
            return Err(AuthError::Rejected(message));
        }

        let token = response.json::<TokenResponse>().await?;
        let session = self.decode_session(&token.access_token)?;

        tracing::info!(user_id = %session.user_id, "admin signed in");
        self.notify(SessionEvent::SignedIn { user_id: session.user_id });
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        // Revoke locally first so the session is dead here even if the remote call fails.
        {
            let mut revoked = self.revoked.write().await;
            let now = Utc::now();
            revoked.retain(|_, expires_at| *expires_at > now);
            revoked.insert(session.revocation_key(), session.expires_at);
        }
        self.notify(SessionEvent::SignedOut { user_id: session.user_id });
        tracing::info!(user_id = %session.user_id, "admin signed out");

        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.json::<GoTrueError>().await.unwrap_or_default();
            return Err(AuthError::Rejected(body.into_message()));
        }
        Ok(())
    }
}

// --- Mock implementation (for tests) ---

/// MockAuthProvider
///
/// In-process `AuthProvider` with a fixed set of accounts. Tokens are random UUIDs.
/// Used by the test suite to drive the guard and the login flow without a network.
pub struct MockAuthProvider {
    accounts: HashMap<String, (String, Uuid)>,
    sessions: RwLock<HashMap<String, Session>>,
    session_ttl: Duration,
    fail_checks: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            accounts: HashMap::new(),
            sessions: RwLock::new(HashMap::new()),
            session_ttl: Duration::hours(1),
            fail_checks: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_account(mut self, email: &str, password: &str) -> Self {
        self.accounts
            .insert(email.to_string(), (password.to_string(), Uuid::new_v4()));
        self
    }

    /// Lifetime of sessions issued from now on.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// When set, `get_session` fails as if the auth service were unreachable.
    pub fn set_fail_checks(&self, fail: bool) {
        self.fail_checks.store(fail, Ordering::SeqCst);
    }

    /// Number of live `SessionSubscription`s.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("mock auth set to fail".into()));
        }
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(access_token)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user_id = match self.accounts.get(email) {
            Some((expected, user_id)) if expected == password => *user_id,
            _ => return Err(AuthError::Rejected("Invalid login credentials".into())),
        };

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            user_id,
            email: Some(email.to_string()),
            session_id: Some(Uuid::new_v4()),
            expires_at: Utc::now() + self.session_ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.access_token.clone(), session.clone());
        let _ = self.events.send(SessionEvent::SignedIn { user_id });
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.sessions
            .write()
            .await
            .retain(|_, s| s.user_id != session.user_id);
        let _ = self.events.send(SessionEvent::SignedOut { user_id: session.user_id });
        Ok(())
    }
}
