use axum::{debug_handler, extract::State, response::Html};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, AppState, include_res, res, session::CurrentUser};

const GUEST_ACTIONS: &str =
    r#"<p><a href="/auth/register">Register</a> or <a href="/auth/login">log in</a> to start trading jokes.</p>"#;

#[debug_handler(state = AppState)]
pub async fn index(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Html<String>> {
    let user = CurrentUser::load(&session, &db_pool).await?;

    let actions = match &user {
        Some(user) => format!(
            r#"<p>Welcome back, {}! You have {} credits. <a href="/jokes/leave">Leave a joke</a> or <a href="/jokes/take">take one</a>.</p>"#,
            res::escape(&user.nickname),
            user.joke_balance
        ),
        None => GUEST_ACTIONS.to_owned(),
    };

    let body = res::fill(include_res!(str, "/pages/index.html"), &[("actions", &actions)]);
    res::page(&session, user.as_deref(), "Master of Jokes", &body).await
}
