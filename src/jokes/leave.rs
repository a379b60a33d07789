use axum::{
    Form, debug_handler,
    extract::State,
    response::{Html, Redirect},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    flash::{self, Level},
    include_res, ledger, res,
    session::CurrentUser,
};

#[derive(Deserialize)]
pub(crate) struct LeaveForm {
    title: String,
    body: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn leave_page(user: CurrentUser, session: Session) -> AppResult<Html<String>> {
    res::page(&session, Some(&user), "Leave a joke", include_res!(str, "/pages/jokes/leave.html")).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn leave(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
    Form(LeaveForm { title, body }): Form<LeaveForm>,
) -> AppResult<Redirect> {
    match ledger::leave(&db_pool, user.id, &title, &body).await {
        Ok(_) => flash::redirect(&session, Level::Success, "Your joke was successfully added!", "/jokes/my").await,
        Err(err) => flash::recover(&session, err, "/jokes/leave").await,
    }
}
