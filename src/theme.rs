use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::convert::Infallible;

/// Name of the one preference the site persists on the client.
pub const THEME_COOKIE: &str = "theme";

/// Client hint carrying the visitor's OS-level colour scheme.
pub const PREFERS_COLOR_SCHEME: &str = "sec-ch-prefers-color-scheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().trim_matches('"') {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Where the current theme came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSource {
    Stored,
    System,
    Default,
}

/// ThemePreference
///
/// The single owner of the light/dark choice for a request. Initialised from the
/// stored cookie, else the system preference hint, else dark. `set` and `toggle` write
/// storage and update the value every template of the response renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemePreference {
    current: Theme,
    source: ThemeSource,
}

impl ThemePreference {
    pub fn resolve(jar: &CookieJar, headers: &HeaderMap) -> Self {
        if let Some(theme) = jar.get(THEME_COOKIE).and_then(|c| Theme::parse(c.value())) {
            return Self { current: theme, source: ThemeSource::Stored };
        }

        let system = headers
            .get(PREFERS_COLOR_SCHEME)
            .and_then(|value| value.to_str().ok())
            .and_then(Theme::parse);

        match system {
            Some(theme) => Self { current: theme, source: ThemeSource::System },
            None => Self { current: Theme::default(), source: ThemeSource::Default },
        }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn source(&self) -> ThemeSource {
        self.source
    }

    pub fn set(&mut self, theme: Theme, jar: CookieJar) -> CookieJar {
        self.current = theme;
        self.source = ThemeSource::Stored;
        jar.add(theme_cookie(theme))
    }

    pub fn toggle(&mut self, jar: CookieJar) -> CookieJar {
        let next = self.current.toggled();
        self.set(next, jar)
    }
}

fn theme_cookie(theme: Theme) -> Cookie<'static> {
    Cookie::build((THEME_COOKIE, theme.as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(365))
        .build()
}

impl<S> FromRequestParts<S> for ThemePreference
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(ThemePreference::resolve(&jar, &parts.headers))
    }
}
