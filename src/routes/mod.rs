/// Router Module Index
///
/// Splits the site into routers by who may reach them. Access control is applied at the
/// router level (see `create_router`), never inside individual handlers.

/// Marketing pages, the contact form, the theme toggle and health check. No session.
pub mod public;

/// Read-only JSON API plus the contact endpoint, nested under `/api`.
pub mod api;

/// Admin entry points that must work without a session: login, logout, session events.
pub mod admin;

/// The dashboard and manager mutations. Wrapped in `guard::require_session`.
pub mod authenticated;
