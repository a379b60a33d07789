use axum::{
    Form, debug_handler,
    extract::State,
    response::{Html, Redirect},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    db::Role,
    flash::{self, Level},
    include_res, ledger, res,
    session::Moderator,
};

const ROLES_URL: &str = "/moderate/roles";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RoleAction {
    AddModerator,
    RemoveModerator,
}

impl RoleAction {
    fn as_str(&self) -> &'static str {
        match self {
            RoleAction::AddModerator => "add_moderator",
            RoleAction::RemoveModerator => "remove_moderator",
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RoleForm {
    user_id: Uuid,
    action: RoleAction,
}

#[debug_handler(state = AppState)]
pub(crate) async fn roles_page(
    State(db_pool): State<SqlitePool>,
    Moderator(moderator): Moderator,
    session: Session,
) -> AppResult<Html<String>> {
    let rows: String = ledger::all_users(&db_pool)
        .await?
        .iter()
        .map(|user| {
            let (action, label) = match user.role {
                Role::User => (RoleAction::AddModerator, "Make moderator"),
                Role::Moderator => (RoleAction::RemoveModerator, "Remove moderator"),
            };
            res::fill(
                include_res!(str, "/pages/moderate/user_row.html"),
                &[
                    ("id", &user.id.to_string()),
                    ("nickname", &res::escape(&user.nickname)),
                    ("email", &res::escape(&user.email)),
                    ("role", user.role.as_str()),
                    ("balance", &user.joke_balance.to_string()),
                    ("action", action.as_str()),
                    ("label", label),
                ],
            )
        })
        .collect();

    let body = res::fill(include_res!(str, "/pages/moderate/roles.html"), &[("rows", &rows)]);
    res::page(&session, Some(&moderator), "Manage roles", &body).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn change_role(
    State(db_pool): State<SqlitePool>,
    Moderator(moderator): Moderator,
    session: Session,
    Form(RoleForm { user_id, action }): Form<RoleForm>,
) -> AppResult<Redirect> {
    tracing::info!(moderator_id = %moderator.id, %user_id, action = action.as_str(), "role change");

    let (result, message) = match action {
        RoleAction::AddModerator => (
            ledger::promote(&db_pool, user_id).await,
            "User promoted to Moderator successfully!",
        ),
        RoleAction::RemoveModerator => (
            ledger::demote(&db_pool, user_id).await,
            "Moderator role removed successfully!",
        ),
    };
    match result {
        Ok(()) => flash::redirect(&session, Level::Success, message, ROLES_URL).await,
        Err(err) => flash::recover(&session, err, ROLES_URL).await,
    }
}
