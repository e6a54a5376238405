//! Login, logout, public pages.

mod common;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use common::{body_text, location, ScriptedBackend, TestApp, PASSWORD};
use healthcore_config::Config;
use healthcore_db::{Database, SessionRepository};
use healthcore_llm::MedicalAssistant;
use healthcore_web::handlers::account::LOGIN_FAILED_MESSAGE;
use healthcore_web::AppState;

#[tokio::test]
async fn test_public_pages() {
    let app = TestApp::new(vec![]).await;

    let health = app.get("/healthz", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_text(health).await, "ok");

    let home = body_text(app.get("/", None).await).await;
    for title in ["Discharge Summary Agent", "Referral Letter Agent", "Insurance Authorization Agent", "Lab Report Agent"] {
        assert!(home.contains(title), "{title}");
    }

    let css = app.get("/static/healthcore.css", None).await;
    assert_eq!(css.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
}

#[tokio::test]
async fn test_wrong_password_gets_generic_message() {
    let app = TestApp::new(vec![]).await;
    app.login("alice").await;

    for (username, password) in [("alice", "wrong"), ("nobody", PASSWORD)] {
        let response = app
            .post_form("/login", None, &[("username", username), ("password", password), ("next", "/")])
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains(LOGIN_FAILED_MESSAGE));
    }
}

#[tokio::test]
async fn test_login_sets_cookie_and_follows_next() {
    let app = TestApp::new(vec![]).await;
    app.login("alice").await;

    let response = app
        .post_form("/login", None, &[("username", "alice"), ("password", PASSWORD), ("next", "/documents")])
        .await;
    assert_eq!(location(&response), "/documents");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("hc_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let session = cookie.split(';').next().unwrap().to_string();
    let page = app.get("/documents", Some(&session)).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_offsite_next_is_ignored() {
    let app = TestApp::new(vec![]).await;
    app.login("alice").await;
    let response = app
        .post_form("/login", None, &[("username", "alice"), ("password", PASSWORD), ("next", "//evil.example/")])
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new(vec![]).await;
    let (_, cookie) = app.login("alice").await;
    assert_eq!(app.get("/audit", Some(&cookie)).await.status(), StatusCode::OK);

    let response = app.post_form("/logout", Some(&cookie), &[]).await;
    assert_eq!(location(&response), "/login");

    let after = app.get("/audit", Some(&cookie)).await;
    assert_eq!(location(&after), "/login?next=%2Faudit");
}

#[tokio::test]
async fn test_login_page_redirects_when_logged_in() {
    let app = TestApp::new(vec![]).await;
    let (_, cookie) = app.login("alice").await;
    let response = app.get("/login?next=/audit", Some(&cookie)).await;
    assert_eq!(location(&response), "/audit");
}

#[tokio::test]
async fn test_control_characters_in_next_are_ignored() {
    let app = TestApp::new(vec![]).await;
    app.login("alice").await;
    let response = app
        .post_form("/login", None, &[("username", "alice"), ("password", PASSWORD), ("next", "/\t/evil.example")])
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_sessions_table_holds_only_digests() {
    let app = TestApp::new(vec![]).await;
    app.login("alice").await;
    let response = app
        .post_form("/login", None, &[("username", "alice"), ("password", PASSWORD), ("next", "/")])
        .await;
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let token = cookie.split(';').next().unwrap().trim_start_matches("hc_session=").to_string();

    let sessions = SessionRepository::new(app.db.clone());
    assert!(sessions.find_user(&token).await.unwrap().is_none());
    let user = sessions.find_user(&app.session_key.digest(&token)).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_state_requires_secret_key() {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    let assistant = MedicalAssistant::new(ScriptedBackend::new(vec![]));
    assert!(AppState::new(Arc::new(db), assistant, Config::default()).is_err());
}

#[tokio::test]
async fn test_staff_badge_in_navigation() {
    let app = TestApp::new(vec![]).await;
    let (_, staff) = app.login_as("admin", true).await;
    let (_, clinician) = app.login("alice").await;

    let html = body_text(app.get("/documents", Some(&staff)).await).await;
    assert!(html.contains(">staff</span>"));
    let html = body_text(app.get("/documents", Some(&clinician)).await).await;
    assert!(!html.contains(">staff</span>"));
}
