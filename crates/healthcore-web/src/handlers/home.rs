//! Home page, health check and the stylesheet.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use healthcore_common::AgentKind;
use minijinja::context;
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::handlers::NavUser;
use crate::render::templates::STYLESHEET;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct AgentCard {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl From<AgentKind> for AgentCard {
    fn from(kind: AgentKind) -> Self {
        Self { slug: kind.slug(), title: kind.title(), description: kind.description() }
    }
}

pub async fn home(
    State(state): State<SharedState>,
    user: Option<CurrentUser>,
) -> WebResult<Html<String>> {
    let agents: Vec<AgentCard> = AgentKind::ALL.into_iter().map(AgentCard::from).collect();
    let html = state.render(
        "home.html",
        context! {
            user => user.as_ref().map(NavUser::from),
            agents => agents,
        },
    )?;
    Ok(Html(html))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}
