//! Login and logout.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{
    removal_cookie, safe_next, session_cookie, verify_password_blocking, CurrentUser, SessionKey,
    SESSION_COOKIE,
};
use crate::error::WebResult;
use crate::state::SharedState;

pub const LOGIN_FAILED_MESSAGE: &str = "Please enter a correct username and password.";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

pub async fn login_form(
    State(state): State<SharedState>,
    user: Option<CurrentUser>,
    Query(query): Query<NextQuery>,
) -> WebResult<Response> {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Ok(Redirect::to(next).into_response());
    }
    let html = state.render("login.html", context! { next => next })?;
    Ok(Html(html).into_response())
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let next = safe_next(form.next.as_deref()).to_string();
    let username = form.username.trim();

    let found = state.users.find_by_username(username).await?;
    let verified = match &found {
        Some(user) => verify_password_blocking(form.password, user.password_hash.clone()).await?,
        None => false,
    };

    let user = match found {
        Some(user) if verified => user,
        _ => {
            warn!(username = %username, "Failed login attempt");
            let html = state.render(
                "login.html",
                context! { next => next, username => username, error => LOGIN_FAILED_MESSAGE },
            )?;
            return Ok(Html(html).into_response());
        }
    };

    let token = SessionKey::new_token();
    state
        .sessions
        .create(user.id, &state.session_key.digest(&token), state.session_ttl())
        .await?;
    info!(user_id = user.id, "User logged in");
    let jar = jar.add(session_cookie(token, state.secure_cookies()));
    Ok((jar, Redirect::to(&next)).into_response())
}

pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> WebResult<Response> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.sessions.delete(&state.session_key.digest(&token)).await?;
    }
    let jar = jar.remove(removal_cookie());
    Ok((jar, Redirect::to("/login")).into_response())
}
