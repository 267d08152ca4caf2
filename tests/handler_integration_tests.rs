use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use futures::StreamExt;
use portfolio_site::{
    AppConfig, AppState, Views,
    auth::{AuthState, MockAuthProvider},
    create_router,
    store::{MemoryStore, StoreCall, StoreState, Table},
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const EMAIL: &str = "owner@example.com";
const PASSWORD: &str = "hunter2";

// --- Test Harness ---

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(MockAuthProvider::new().with_account(EMAIL, PASSWORD));

        let state = AppState {
            store: store.clone() as StoreState,
            auth: auth as AuthState,
            views: Views::new(&config).expect("templates compile"),
            config,
            cookie_key: Key::generate(),
        };

        TestApp {
            router: create_router(state),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Signs in through the login form and returns the `name=value` session cookie.
    async fn login(&self) -> String {
        let response = self
            .post_form("/admin/login", &format!("email={EMAIL}&password={PASSWORD}"), None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        set_cookie(&response, "sb-session").expect("login sets the session cookie")
    }
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the `Set-Cookie` header for `name`, if any.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}

fn seed_projects(store: &MemoryStore) {
    store.seed(
        Table::Projects,
        vec![
            json!({ "id": 1, "title": "Alpha", "period": "2023", "description": "first", "highlights": [], "tags": ["rust"], "github_url": null }),
            json!({ "id": 2, "title": "Beta", "period": "2024", "description": "second", "highlights": [], "tags": [], "github_url": null }),
        ],
    );
}

// --- Public pages ---

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_public_pages_render_with_seo_title() {
    let app = TestApp::new();
    seed_projects(&app.store);

    for (path, title) in [
        ("/", "Home | Portfolio"),
        ("/about", "About | Portfolio"),
        ("/internship", "Internship | Portfolio"),
        ("/projects", "Projects | Portfolio"),
        ("/contact", "Contact | Portfolio"),
    ] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        assert!(response.headers().contains_key("accept-ch"));
        let body = body_text(response).await;
        assert!(body.contains(&format!("<title>{title}</title>")), "title of {path}");
    }
}

#[tokio::test]
async fn test_projects_page_lists_store_content() {
    let app = TestApp::new();
    seed_projects(&app.store);

    let body = body_text(app.get("/projects", None).await).await;
    assert!(body.contains("Alpha"));
    assert!(body.contains("Beta"));
}

#[tokio::test]
async fn test_public_page_survives_store_failure() {
    let app = TestApp::new();
    app.store.set_failing(true);

    let response = app.get("/projects", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No projects yet."));
}

#[tokio::test]
async fn test_unknown_path_renders_not_found() {
    let app = TestApp::new();
    let response = app.get("/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page Not Found | Portfolio"));
}

// --- Contact form ---

#[tokio::test]
async fn test_contact_form_stores_message() {
    let app = TestApp::new();

    let response = app
        .post_form("/contact", "name=Ada&email=ada%40example.com&message=Hello+there", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Your message has been sent."));
    let rows = app.store.rows(Table::Messages);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "ada@example.com");
    assert_eq!(rows[0]["message"], "Hello there");
    assert!(rows[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_contact_form_rejects_blank_message() {
    let app = TestApp::new();

    let response = app.post_form("/contact", "name=Ada&email=a%40b.io&message=", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Message is required"));
    assert!(app.store.rows(Table::Messages).is_empty());
}

// --- Theme ---

#[tokio::test]
async fn test_theme_defaults_to_dark() {
    let app = TestApp::new();
    let body = body_text(app.get("/", None).await).await;
    assert!(body.contains(r#"<html lang="en" class="dark">"#));
}

#[tokio::test]
async fn test_theme_uses_stored_cookie_then_system_hint() {
    let app = TestApp::new();

    let body = body_text(app.get("/", Some("theme=light")).await).await;
    assert!(body.contains(r#"class="light""#));

    let request = Request::builder()
        .uri("/")
        .header("sec-ch-prefers-color-scheme", "\"light\"")
        .body(Body::empty())
        .unwrap();
    let body = body_text(app.send(request).await).await;
    assert!(body.contains(r#"class="light""#));

    // A stored choice wins over the system preference.
    let request = Request::builder()
        .uri("/")
        .header(header::COOKIE, "theme=dark")
        .header("sec-ch-prefers-color-scheme", "\"light\"")
        .body(Body::empty())
        .unwrap();
    let body = body_text(app.send(request).await).await;
    assert!(body.contains(r#"class="dark""#));
}

#[tokio::test]
async fn test_theme_toggle_persists_and_returns_to_referer() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/theme")
        .header(header::HOST, "localhost:3000")
        .header(header::REFERER, "http://localhost:3000/projects")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/projects");
    assert_eq!(set_cookie(&response, "theme").as_deref(), Some("theme=light"));
}

#[tokio::test]
async fn test_theme_toggle_ignores_foreign_referer() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/theme")
        .header(header::HOST, "localhost:3000")
        .header(header::COOKIE, "theme=light")
        .header(header::REFERER, "https://evil.example/phish")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(location(&response), "/");
    assert_eq!(set_cookie(&response, "theme").as_deref(), Some("theme=dark"));
}

// --- Guarded admin ---

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let app = TestApp::new();

    let response = app.get("/admin/dashboard", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(app.store.calls().is_empty(), "no protected data is loaded");
}

#[tokio::test]
async fn test_forged_cookie_redirects_and_is_cleared() {
    let app = TestApp::new();

    let response = app.get("/admin/dashboard", Some("sb-session=forged")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn test_manage_without_session_redirects_and_mutates_nothing() {
    let app = TestApp::new();

    let response = app
        .post_form("/admin/manage/projects", "title=X&period=1&description=d", None)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_login_with_wrong_password_shows_error() {
    let app = TestApp::new();

    let response = app
        .post_form("/admin/login", &format!("email={EMAIL}&password=wrong"), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "sb-session").is_none());
    assert!(body_text(response).await.contains("Invalid login credentials"));
}

#[tokio::test]
async fn test_login_then_dashboard_without_intermediate_redirect() {
    let app = TestApp::new();

    let response = app
        .post_form("/admin/login", &format!("email={EMAIL}&password={PASSWORD}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");
    let raw_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(raw_cookie.contains("HttpOnly"));
    assert!(raw_cookie.contains("SameSite=Lax"));

    let cookie = set_cookie(&response, "sb-session").unwrap();
    let response = app.get("/admin/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Admin Dashboard"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app.post_form("/admin/logout", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = app.get("/admin/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_dashboard_tabs_and_edit_prefill() {
    let app = TestApp::new();
    seed_projects(&app.store);
    let cookie = app.login().await;

    let body = body_text(
        app.get("/admin/dashboard?tab=projects&edit=2", Some(&cookie))
            .await,
    )
    .await;

    assert!(body.contains("Edit Project"));
    assert!(body.contains(r#"name="id" value="2""#));
    assert!(body.contains(r#"value="Beta""#));
}

#[tokio::test]
async fn test_dashboard_delete_prompt() {
    let app = TestApp::new();
    seed_projects(&app.store);
    let cookie = app.login().await;

    let body = body_text(
        app.get("/admin/dashboard?tab=projects&delete=1", Some(&cookie))
            .await,
    )
    .await;

    assert!(body.contains("Delete this Project?"));
    assert!(body.contains(r#"name="confirm" value="yes""#));
}

#[tokio::test]
async fn test_manage_submit_with_id_updates() {
    let app = TestApp::new();
    seed_projects(&app.store);
    let cookie = app.login().await;
    app.store.clear_calls();

    let response = app
        .post_form(
            "/admin/manage/projects",
            "id=2&title=B2&period=2024&description=second&highlights=&tags=&github_url=",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Updated successfully"));

    let calls = app.store.calls();
    assert!(calls.contains(&StoreCall::Update(Table::Projects, 2)));
    assert!(!calls.contains(&StoreCall::Insert(Table::Projects)));

    let rows = app.store.rows(Table::Projects);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["id"], 2);
    assert_eq!(rows[1]["title"], "B2");
}

#[tokio::test]
async fn test_manage_submit_without_id_inserts() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .post_form(
            "/admin/manage/skills",
            "category=Languages&items=Rust%2C+Go",
            Some(&cookie),
        )
        .await;

    assert!(body_text(response).await.contains("Created successfully"));
    let rows = app.store.rows(Table::Skills);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["items"], json!(["Rust", "Go"]));
}

#[tokio::test]
async fn test_manage_submit_invalid_form_keeps_input() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .post_form("/admin/manage/education", "institution=Uni&degree=&period=2021&score=9", Some(&cookie))
        .await;

    let body = body_text(response).await;
    assert!(body.contains("Degree is required"));
    assert!(body.contains(r#"value="Uni""#));
    assert!(app.store.rows(Table::Education).is_empty());
}

#[tokio::test]
async fn test_manage_delete_requires_confirmation() {
    let app = TestApp::new();
    seed_projects(&app.store);
    let cookie = app.login().await;

    let response = app
        .post_form("/admin/manage/projects/1/delete", "confirm=no", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.rows(Table::Projects).len(), 2);
    assert!(
        !app.store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::Delete(..)))
    );

    let response = app
        .post_form("/admin/manage/projects/1/delete", "confirm=yes", Some(&cookie))
        .await;
    assert!(body_text(response).await.contains("Deleted successfully"));
    let rows = app.store.rows(Table::Projects);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Beta");
}

#[tokio::test]
async fn test_messages_are_read_only() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .post_form("/admin/manage/messages", "name=x&email=y&message=z", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(body_text(response).await.contains("Message entries cannot be edited"));
    assert!(app.store.rows(Table::Messages).is_empty());
}

#[tokio::test]
async fn test_session_events_report_unauthorized_without_cookie() {
    let app = TestApp::new();

    let response = app.get("/admin/session/events", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: session"));
    assert!(text.contains("data: unauthorized"));
}

#[tokio::test]
async fn test_session_events_report_authorized_with_cookie() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app.get("/admin/session/events", Some(&cookie)).await;

    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.unwrap().unwrap();
    assert!(String::from_utf8(first.to_vec()).unwrap().contains("data: authorized"));
}
