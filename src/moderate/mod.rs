//! Moderator-only pages. Every handler here takes a [`Moderator`], so the
//! role check happens before any handler code runs.
//!
//! [`Moderator`]: crate::session::Moderator

mod jokes;
mod roles;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(roles::roles_page).post(roles::change_role))
        .route("/jokes", get(jokes::jokes_page))
        .route("/jokes/{id}/edit", post(jokes::edit))
        .route("/jokes/{id}/delete", post(jokes::delete))
}
