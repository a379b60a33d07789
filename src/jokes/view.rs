use axum::{
    Form, debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    flash::{self, Level},
    include_res,
    ledger::{self, LedgerError},
    res,
    session::CurrentUser,
};

#[derive(Deserialize)]
pub(crate) struct RateForm {
    rating: i64,
}

#[debug_handler(state = AppState)]
pub(crate) async fn view(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    CurrentUser(mut user): CurrentUser,
    session: Session,
) -> AppResult<Response> {
    let detail = match ledger::view(&db_pool, user.id, joke_id).await {
        Ok(detail) => detail,
        Err(LedgerError::JokeNotFound) => return Ok(res::sorry("joke")),
        Err(err) => return Ok(flash::recover(&session, err, "/jokes/my").await?.into_response()),
    };
    if detail.debited {
        user.joke_balance = ledger::balance(&db_pool, user.id).await?;
        flash::push(&session, Level::Info, "One credit spent. This joke is yours to reread for free.").await?;
    }

    let joke = &detail.joke;
    let is_author = joke.author_id == user.id;
    let actions = if is_author || user.is_moderator() {
        format!(r#"<a href="/jokes/{}/edit">Edit</a>"#, joke.id)
    } else {
        String::new()
    };
    let rate = if is_author {
        String::new()
    } else {
        res::fill(include_res!(str, "/pages/jokes/rate.html"), &[("id", &joke.id.to_string())])
    };

    let body = res::fill(
        include_res!(str, "/pages/jokes/view.html"),
        &[
            ("author", &res::escape(&detail.author_nickname)),
            ("rating", &res::rating(detail.avg_rating)),
            ("body", &res::markdown(&joke.body)),
            ("actions", &actions),
            ("rate", &rate),
        ],
    );
    Ok(res::page(&session, Some(&user), &joke.title, &body).await?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn rate(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
    Form(RateForm { rating }): Form<RateForm>,
) -> AppResult<Redirect> {
    let back = format!("/jokes/{joke_id}");
    match ledger::rate(&db_pool, user.id, joke_id, rating).await {
        Ok(()) => flash::redirect(&session, Level::Success, "Thanks for rating!", &back).await,
        Err(err) => flash::recover(&session, err, &back).await,
    }
}
