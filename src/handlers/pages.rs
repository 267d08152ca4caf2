use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;

use crate::{
    editor::{FormInput, ListEditor, Notice},
    error::{AppError, EditorError},
    models::{Certification, Education, Experience, Message, Profile, Project, SkillCategory},
    store::StoreState,
    theme::ThemePreference,
    views::{PageMeta, Views},
};

/// Number of projects featured on the home page.
const FEATURED_PROJECTS: usize = 3;

/// home
///
/// `GET /`: profile headline, a few projects and the skill groups.
pub async fn home(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    let profile = ListEditor::<Profile>::new(store.clone()).load_single().await;
    let mut projects = ListEditor::<Project>::new(store.clone()).load().await;
    projects.truncate(FEATURED_PROJECTS);
    let skills = ListEditor::<SkillCategory>::new(store).load().await;

    views.page(
        StatusCode::OK,
        "home.html",
        &PageMeta::new("Home"),
        &theme,
        context! { nav => "/", profile, projects, skills },
    )
}

/// about
///
/// `GET /about`: education, skills and certifications.
pub async fn about(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    let profile = ListEditor::<Profile>::new(store.clone()).load_single().await;
    let education = ListEditor::<Education>::new(store.clone()).load().await;
    let skills = ListEditor::<SkillCategory>::new(store.clone()).load().await;
    let certifications = ListEditor::<Certification>::new(store).load().await;

    views.page(
        StatusCode::OK,
        "about.html",
        &PageMeta::new("About").describe("Education, skills and certifications."),
        &theme,
        context! { nav => "/about", profile, education, skills, certifications },
    )
}

/// `GET /internship`
pub async fn internship(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    let experiences = ListEditor::<Experience>::new(store).load().await;

    views.page(
        StatusCode::OK,
        "internship.html",
        &PageMeta::new("Internship").describe("Internships and work experience."),
        &theme,
        context! { nav => "/internship", experiences },
    )
}

/// `GET /projects`
pub async fn projects(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    let projects = ListEditor::<Project>::new(store).load().await;

    views.page(
        StatusCode::OK,
        "projects.html",
        &PageMeta::new("Projects").describe("Selected projects with highlights and tech stack."),
        &theme,
        context! { nav => "/projects", projects },
    )
}

/// `GET /contact`
pub async fn contact(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    render_contact(&store, &views, &theme, StatusCode::OK, None, &FormInput::new()).await
}

/// send_message
///
/// `POST /contact`: stores a visitor's message in the inbox. A missing field re-renders
/// the form with what was typed; a store failure keeps the form and shows a notice.
pub async fn send_message(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
    Form(form): Form<FormInput>,
) -> Result<Response, AppError> {
    let editor = ListEditor::<Message>::new(store.clone());

    let (status, notice, kept) = match editor.create(&form).await {
        Ok(message) => {
            tracing::info!(message_id = message.id, "contact message received");
            (
                StatusCode::OK,
                Notice::success("Thanks! Your message has been sent."),
                FormInput::new(),
            )
        }
        Err(EditorError::Form(e)) => (StatusCode::BAD_REQUEST, Notice::error(e.to_string()), form),
        Err(e) => {
            tracing::warn!(error = %e, "failed to store contact message");
            (
                StatusCode::OK,
                Notice::error("Failed to send message. Please try again later."),
                form,
            )
        }
    };

    render_contact(&store, &views, &theme, status, Some(notice), &kept).await
}

async fn render_contact(
    store: &StoreState,
    views: &Views,
    theme: &ThemePreference,
    status: StatusCode,
    notice: Option<Notice>,
    form: &FormInput,
) -> Result<Response, AppError> {
    let profile = ListEditor::<Profile>::new(store.clone()).load_single().await;

    views.page(
        status,
        "contact.html",
        &PageMeta::new("Contact").describe("Get in touch."),
        theme,
        context! { nav => "/contact", profile, notice, form },
    )
}

/// toggle_theme
///
/// `POST /theme`: flips the stored light/dark preference and sends the visitor back to
/// the page they came from.
pub async fn toggle_theme(
    mut theme: ThemePreference,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Redirect) {
    let jar = theme.toggle(jar);
    tracing::debug!(theme = theme.current().as_str(), "theme toggled");
    (jar, Redirect::to(&return_path(&headers)))
}

/// Path of a same-origin `Referer`, else `/`.
fn return_path(headers: &HeaderMap) -> String {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok());

    let Some(referer) = referer else {
        return "/".to_string();
    };
    if let Some(authority) = referer.authority()
        && Some(authority.as_str()) != host
    {
        return "/".to_string();
    }
    referer
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or("/")
        .to_string()
}

/// not_found
///
/// Fallback for every unknown path.
pub async fn not_found(State(views): State<Views>, theme: ThemePreference, uri: Uri) -> Response {
    tracing::debug!(%uri, "no route matched");
    match views.page(
        StatusCode::NOT_FOUND,
        "not_found.html",
        &PageMeta::new("Page Not Found"),
        &theme,
        context! { path => uri.path() },
    ) {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
