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
    include_res, res,
    session::{CurrentUser, LOGIN_URL, USER_ID},
};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    /// Email or nickname.
    identity: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Html<String>> {
    let user = CurrentUser::load(&session, &db_pool).await?;
    res::page(&session, user.as_deref(), "Log in", include_res!(str, "/pages/auth/login.html")).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(LoginForm { identity, password }): Form<LoginForm>,
) -> AppResult<Redirect> {
    let user = match super::authenticate(&db_pool, &identity, &password).await {
        Ok(user) => user,
        Err(err) => return flash::recover(&session, err, LOGIN_URL).await,
    };

    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    tracing::info!(user_id = %user.id, "welcome");

    let landing = if user.is_moderator() {
        "/moderate/roles"
    } else {
        "/jokes/leave"
    };
    flash::redirect(&session, Level::Success, "You have successfully logged in!", landing).await
}
