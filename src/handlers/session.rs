use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;

use crate::auth::Session;

/// Name of the encrypted cookie carrying the admin's access token.
pub const SESSION_COOKIE: &str = "sb-session";

/// session_cookie
///
/// Builds the cookie that stores `session`'s access token. It lives no longer than the
/// token itself, is never readable from scripts, and is only sent over HTTPS when
/// `secure` is set.
pub fn session_cookie(session: &Session, secure: bool) -> Cookie<'static> {
    let remaining = (session.expires_at - Utc::now()).num_seconds().max(0);

    Cookie::build((SESSION_COOKIE, session.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(remaining))
        .build()
}

/// The removal cookie; path must match the one the session cookie was set with.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
