//! Request handlers, grouped by the surface they serve.
//!
//! - `pages`: the public marketing pages, the contact form and the theme toggle.
//! - `admin`: login/logout and the guarded dashboard with its managers.
//! - `api`: the read-only JSON API and the contact endpoint, documented with utoipa.
//! - `session`: the encrypted session cookie shared by `admin` and the guard.

pub mod admin;
pub mod api;
pub mod pages;
pub mod session;
