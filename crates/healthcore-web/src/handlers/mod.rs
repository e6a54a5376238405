//! HTTP handlers for all web routes.

pub mod account;
pub mod agents;
pub mod audit;
pub mod documents;
pub mod home;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::CurrentUser;

/// What the navigation bar needs to know about the logged-in user.
#[derive(Debug, Serialize)]
pub struct NavUser<'a> {
    pub username: &'a str,
    pub is_staff: bool,
}

impl<'a> From<&'a CurrentUser> for NavUser<'a> {
    fn from(user: &'a CurrentUser) -> Self {
        Self { username: &user.0.username, is_staff: user.0.is_staff }
    }
}

pub(crate) fn display_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}
