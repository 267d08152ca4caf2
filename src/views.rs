use axum::{
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, Value, context};
use std::sync::Arc;

use crate::{config::AppConfig, error::AppError, theme::ThemePreference};

/// Templates compiled into the binary: (name, source).
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("internship.html", include_str!("../templates/internship.html")),
    ("projects.html", include_str!("../templates/projects.html")),
    ("contact.html", include_str!("../templates/contact.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

/// Title and meta description of one page.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub title: &'static str,
    pub description: Option<String>,
}

impl PageMeta {
    pub fn new(title: &'static str) -> Self {
        Self { title, description: None }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Views
///
/// The template environment. Every page renders inside `base.html`, which receives the
/// SEO metadata and the visitor's theme.
#[derive(Clone)]
pub struct Views {
    env: Arc<Environment<'static>>,
    site_owner: String,
    site_description: String,
}

impl Views {
    pub fn new(config: &AppConfig) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self {
            env: Arc::new(env),
            site_owner: config.site_owner.clone(),
            site_description: config.site_description.clone(),
        })
    }

    /// Renders `template` to a string with page-level variables merged into `ctx`.
    pub fn render(
        &self,
        template: &str,
        meta: &PageMeta,
        theme: &ThemePreference,
        ctx: Value,
    ) -> Result<String, AppError> {
        let page = context! {
            page_title => format!("{} | {}", meta.title, self.site_owner),
            page_description => meta.description.clone().unwrap_or_else(|| self.site_description.clone()),
            site_owner => self.site_owner.clone(),
            theme => theme.current(),
        };
        let tmpl = self.env.get_template(template)?;
        Ok(tmpl.render(context! { ..page, ..ctx })?)
    }

    /// Renders a full HTML response. Pages advertise the colour-scheme client hint so
    /// first-time visitors get their system theme from the next request on.
    pub fn page(
        &self,
        status: StatusCode,
        template: &str,
        meta: &PageMeta,
        theme: &ThemePreference,
        ctx: Value,
    ) -> Result<Response, AppError> {
        let body = self.render(template, meta, theme, ctx)?;
        let headers = [
            (
                HeaderName::from_static("accept-ch"),
                HeaderValue::from_static("Sec-CH-Prefers-Color-Scheme"),
            ),
            (header::VARY, HeaderValue::from_static("Sec-CH-Prefers-Color-Scheme, Cookie")),
        ];
        Ok((status, headers, Html(body)).into_response())
    }
}
