use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::{AuthState, Session},
    config::AppConfig,
    editor::{Confirmation, Entity, FieldKind, FormInput, ListEditor, Notice, Submission},
    error::{AppError, EditorError},
    guard::LOGIN_PATH,
    handlers::session::{SESSION_COOKIE, clear_session_cookie, session_cookie},
    models::{
        Certification, Education, Experience, LoginForm, Message, Profile, Project, SkillCategory,
    },
    store::StoreState,
    theme::ThemePreference,
    views::{PageMeta, Views},
};

/// Landing page after a successful sign-in.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

// --- Managers ---

/// Manager
///
/// One tab of the dashboard, bound to one table. The lowercase name is the tab's
/// slug in URLs (`?tab=projects`, `/admin/manage/projects`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    #[default]
    Profile,
    Education,
    Skills,
    Certifications,
    Experience,
    Projects,
    Messages,
}

impl Manager {
    pub const ALL: [Manager; 7] = [
        Manager::Profile,
        Manager::Education,
        Manager::Skills,
        Manager::Certifications,
        Manager::Experience,
        Manager::Projects,
        Manager::Messages,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Manager::Profile => "profile",
            Manager::Education => "education",
            Manager::Skills => "skills",
            Manager::Certifications => "certifications",
            Manager::Experience => "experience",
            Manager::Projects => "projects",
            Manager::Messages => "messages",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Manager::Profile => "Profile",
            Manager::Education => "Education",
            Manager::Skills => "Skills",
            Manager::Certifications => "Certifications",
            Manager::Experience => "Experience",
            Manager::Projects => "Projects",
            Manager::Messages => "Messages",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.slug() == slug)
    }

    /// The profile tab edits a single row instead of a list.
    fn is_singleton(self) -> bool {
        self == Manager::Profile
    }

    /// The inbox is filled by visitors; the owner can only read and delete.
    fn is_read_only(self) -> bool {
        self == Manager::Messages
    }
}

#[derive(Serialize)]
struct Tab {
    slug: &'static str,
    title: &'static str,
}

// --- Dashboard view model ---

#[derive(Debug, Serialize)]
struct Column {
    name: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct Row {
    id: i64,
    cells: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FormField {
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    value: String,
}

/// Panel
///
/// Everything the dashboard template needs to draw one manager: the table of listed
/// columns, the create/edit form, and the pending delete confirmation.
#[derive(Debug, Serialize)]
struct Panel {
    slug: &'static str,
    label: &'static str,
    singleton: bool,
    read_only: bool,
    columns: Vec<Column>,
    rows: Vec<Row>,
    form: Vec<FormField>,
    editing: Option<i64>,
    confirm_delete: Option<Row>,
}

impl Panel {
    fn build<E: Entity>(manager: Manager, items: &[E], edit: Option<i64>, delete: Option<i64>) -> Self {
        let listed: Vec<_> = E::FIELDS.iter().filter(|f| f.listed).collect();
        let records: Vec<(i64, Value)> = items
            .iter()
            .map(|item| (item.id(), serde_json::to_value(item).unwrap_or(Value::Null)))
            .collect();

        let rows: Vec<Row> = records
            .iter()
            .map(|(id, record)| Row {
                id: *id,
                cells: listed.iter().map(|f| f.display(record.get(f.name))).collect(),
            })
            .collect();

        let editing_record = edit.and_then(|id| records.iter().find(|(rid, _)| *rid == id));
        let form = E::FIELDS
            .iter()
            .filter(|f| f.editable())
            .map(|f| FormField {
                name: f.name,
                label: f.label,
                kind: f.kind,
                value: editing_record
                    .map(|(_, record)| f.display(record.get(f.name)))
                    .unwrap_or_default(),
            })
            .collect();

        let confirm_delete = delete.and_then(|id| {
            rows.iter().find(|row| row.id == id).map(|row| Row {
                id: row.id,
                cells: row.cells.clone(),
            })
        });

        Self {
            slug: manager.slug(),
            label: E::LABEL,
            singleton: manager.is_singleton(),
            read_only: manager.is_read_only(),
            columns: listed
                .iter()
                .map(|f| Column { name: f.name, label: f.label })
                .collect(),
            rows,
            form,
            editing: editing_record.map(|(id, _)| *id),
            confirm_delete,
        }
    }

    /// Re-fills the form with what was submitted, so a rejected edit is not lost.
    fn keep_input(mut self, id: Option<i64>, input: &FormInput) -> Self {
        for field in &mut self.form {
            field.value = input.get(field.name).cloned().unwrap_or_default();
        }
        self.editing = id;
        self
    }
}

// --- Manager dispatch ---

async fn load_panel(
    manager: Manager,
    store: StoreState,
    edit: Option<i64>,
    delete: Option<i64>,
) -> Panel {
    match manager {
        Manager::Profile => {
            let profile: Vec<Profile> = ListEditor::<Profile>::new(store)
                .load_single()
                .await
                .into_iter()
                .collect();
            let id = profile.first().map(|p| p.id);
            Panel::build(manager, &profile, id, None)
        }
        Manager::Education => list_panel::<Education>(manager, store, edit, delete).await,
        Manager::Skills => list_panel::<SkillCategory>(manager, store, edit, delete).await,
        Manager::Certifications => list_panel::<Certification>(manager, store, edit, delete).await,
        Manager::Experience => list_panel::<Experience>(manager, store, edit, delete).await,
        Manager::Projects => list_panel::<Project>(manager, store, edit, delete).await,
        Manager::Messages => list_panel::<Message>(manager, store, None, delete).await,
    }
}

async fn list_panel<E: Entity>(
    manager: Manager,
    store: StoreState,
    edit: Option<i64>,
    delete: Option<i64>,
) -> Panel {
    let items = ListEditor::<E>::new(store).load().await;
    Panel::build(manager, &items, edit, delete)
}

async fn submit_panel<E: Entity>(
    manager: Manager,
    store: StoreState,
    id: Option<i64>,
    form: &FormInput,
) -> (Panel, Option<Notice>) {
    let Submission { items, notice } = ListEditor::<E>::new(store).submit(id, form).await;
    let failed = notice.as_ref().is_some_and(Notice::is_error);

    let panel = if manager.is_singleton() {
        let id = items.first().map(Entity::id);
        let panel = Panel::build(manager, &items[..items.len().min(1)], id, None);
        if failed { panel.keep_input(id, form) } else { panel }
    } else if failed {
        Panel::build(manager, &items, None, None).keep_input(id, form)
    } else {
        Panel::build(manager, &items, None, None)
    };
    (panel, notice)
}

async fn remove_panel<E: Entity>(
    manager: Manager,
    store: StoreState,
    id: i64,
    confirmation: Confirmation,
) -> (Panel, Option<Notice>) {
    let Submission { items, notice } = ListEditor::<E>::new(store).remove(id, confirmation).await;
    let edit = if manager.is_singleton() {
        items.first().map(Entity::id)
    } else {
        None
    };
    (Panel::build(manager, &items, edit, None), notice)
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    pub edit: Option<i64>,
    pub delete: Option<i64>,
}

/// dashboard
///
/// `GET /admin/dashboard`: the tabbed CRUD panel. Only reachable through
/// `require_session`, which provides the `Session` extension.
pub async fn dashboard(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
    Extension(session): Extension<Session>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let manager = query
        .tab
        .as_deref()
        .and_then(Manager::from_slug)
        .unwrap_or_default();

    let panel = load_panel(manager, store, query.edit, query.delete).await;
    render_dashboard(&views, &theme, &session, manager, panel, None, StatusCode::OK)
}

/// manage_submit
///
/// `POST /admin/manage/{manager}`: create or update. A non-empty hidden `id` field selects
/// update of that row; without it a new row is inserted.
pub async fn manage_submit(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
    Extension(session): Extension<Session>,
    Path(manager): Path<Manager>,
    Form(form): Form<FormInput>,
) -> Result<Response, AppError> {
    let id = match form.get("id").map(|raw| raw.trim()).filter(|raw| !raw.is_empty()) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                let panel = load_panel(manager, store, None, None).await;
                let notice = Notice::error(format!("Invalid id `{raw}`"));
                return render_dashboard(
                    &views,
                    &theme,
                    &session,
                    manager,
                    panel,
                    Some(notice),
                    StatusCode::BAD_REQUEST,
                );
            }
        },
        None => None,
    };

    let (panel, notice) = match manager {
        Manager::Profile => submit_panel::<Profile>(manager, store, id, &form).await,
        Manager::Education => submit_panel::<Education>(manager, store, id, &form).await,
        Manager::Skills => submit_panel::<SkillCategory>(manager, store, id, &form).await,
        Manager::Certifications => submit_panel::<Certification>(manager, store, id, &form).await,
        Manager::Experience => submit_panel::<Experience>(manager, store, id, &form).await,
        Manager::Projects => submit_panel::<Project>(manager, store, id, &form).await,
        Manager::Messages => {
            let panel = load_panel(manager, store, None, None).await;
            let notice = Notice::error(EditorError::ReadOnly(Message::LABEL).to_string());
            return render_dashboard(
                &views,
                &theme,
                &session,
                manager,
                panel,
                Some(notice),
                StatusCode::METHOD_NOT_ALLOWED,
            );
        }
    };

    let failed = notice.as_ref().is_some_and(Notice::is_error);
    tracing::info!(manager = manager.slug(), ?id, failed, "manager form submitted");
    render_dashboard(&views, &theme, &session, manager, panel, notice, StatusCode::OK)
}

/// manage_delete
///
/// `POST /admin/manage/{manager}/{id}/delete`: deletes only when the form carries
/// `confirm=yes`; any other answer is a decline and leaves the list untouched.
pub async fn manage_delete(
    State(store): State<StoreState>,
    State(views): State<Views>,
    theme: ThemePreference,
    Extension(session): Extension<Session>,
    Path((manager, id)): Path<(Manager, i64)>,
    Form(form): Form<FormInput>,
) -> Result<Response, AppError> {
    let confirmation = Confirmation::from_answer(form.get("confirm").map(String::as_str));

    let (panel, notice) = match manager {
        Manager::Profile => remove_panel::<Profile>(manager, store, id, confirmation).await,
        Manager::Education => remove_panel::<Education>(manager, store, id, confirmation).await,
        Manager::Skills => remove_panel::<SkillCategory>(manager, store, id, confirmation).await,
        Manager::Certifications => {
            remove_panel::<Certification>(manager, store, id, confirmation).await
        }
        Manager::Experience => remove_panel::<Experience>(manager, store, id, confirmation).await,
        Manager::Projects => remove_panel::<Project>(manager, store, id, confirmation).await,
        Manager::Messages => remove_panel::<Message>(manager, store, id, confirmation).await,
    };

    tracing::info!(manager = manager.slug(), id, ?confirmation, "manager delete requested");
    render_dashboard(&views, &theme, &session, manager, panel, notice, StatusCode::OK)
}

fn render_dashboard(
    views: &Views,
    theme: &ThemePreference,
    session: &Session,
    manager: Manager,
    panel: Panel,
    notice: Option<Notice>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let tabs: Vec<Tab> = Manager::ALL
        .into_iter()
        .map(|m| Tab { slug: m.slug(), title: m.title() })
        .collect();

    views.page(
        status,
        "dashboard.html",
        &PageMeta::new("Admin Dashboard"),
        theme,
        context! {
            nav => DASHBOARD_PATH,
            tabs,
            active => manager.slug(),
            panel,
            notice,
            user_email => session.email.clone(),
        },
    )
}

/// `GET /admin`
pub async fn admin_index() -> Redirect {
    Redirect::to(DASHBOARD_PATH)
}

// --- Login / logout ---

/// `GET /admin/login`
pub async fn login_page(
    State(views): State<Views>,
    theme: ThemePreference,
) -> Result<Response, AppError> {
    render_login(&views, &theme, StatusCode::OK, None, None)
}

/// login
///
/// `POST /admin/login`: password sign-in against the auth service. Success stores the
/// access token in the encrypted session cookie and continues to the dashboard; failure
/// re-renders the form with the service's message.
pub async fn login(
    State(auth): State<AuthState>,
    State(views): State<Views>,
    State(config): State<AppConfig>,
    theme: ThemePreference,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth.sign_in_with_password(form.email.trim(), &form.password).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&session, config.secure_cookies()));
            Ok((jar, Redirect::to(DASHBOARD_PATH)).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "admin sign-in failed");
            render_login(
                &views,
                &theme,
                StatusCode::UNAUTHORIZED,
                Some(e.user_message()),
                Some(form.email),
            )
        }
    }
}

fn render_login(
    views: &Views,
    theme: &ThemePreference,
    status: StatusCode,
    error: Option<String>,
    email: Option<String>,
) -> Result<Response, AppError> {
    views.page(
        status,
        "login.html",
        &PageMeta::new("Admin Login"),
        theme,
        context! { nav => LOGIN_PATH, error, email },
    )
}

/// logout
///
/// `POST /admin/logout`: ends the session at the auth service (which notifies every
/// mounted guard), drops the cookie and returns to the login page.
pub async fn logout(State(auth): State<AuthState>, jar: PrivateCookieJar) -> impl IntoResponse {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned());

    if let Some(token) = token {
        match auth.get_session(&token).await {
            Ok(Some(session)) => {
                if let Err(e) = auth.sign_out(&session).await {
                    tracing::warn!(error = %e, "sign-out at auth service failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "session lookup during logout failed"),
        }
    }

    (jar.remove(clear_session_cookie()), Redirect::to(LOGIN_PATH))
}
