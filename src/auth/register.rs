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
    session::{CurrentUser, LOGIN_URL},
};

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    email: String,
    nickname: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Html<String>> {
    let user = CurrentUser::load(&session, &db_pool).await?;
    res::page(&session, user.as_deref(), "Register", include_res!(str, "/pages/auth/register.html")).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(RegisterForm { email, nickname, password }): Form<RegisterForm>,
) -> AppResult<Redirect> {
    match super::register(&db_pool, &email, &nickname, &password).await {
        Ok(_) => {
            flash::redirect(&session, Level::Success, "Registration successful! Please log in.", LOGIN_URL).await
        }
        Err(err) => flash::recover(&session, err, "/auth/register").await,
    }
}
