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
    AppResult, AppState, db,
    flash::{self, Level},
    include_res, ledger, res,
    session::CurrentUser,
};

#[derive(Deserialize)]
pub(crate) struct EditForm {
    body: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_page(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
) -> AppResult<Response> {
    let Some(joke) = db::get_joke(&db_pool, joke_id).await? else {
        return Ok(res::sorry("joke"));
    };
    if let Err(err) = ledger::authorize(&user, joke.author_id) {
        return Ok(flash::recover(&session, err, "/jokes/my").await?.into_response());
    }

    let body = res::fill(
        include_res!(str, "/pages/jokes/edit.html"),
        &[
            ("id", &joke.id.to_string()),
            ("title", &res::escape(&joke.title)),
            ("body", &res::escape(&joke.body)),
        ],
    );
    Ok(res::page(&session, Some(&user), "Edit joke", &body).await?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
    Form(EditForm { body }): Form<EditForm>,
) -> AppResult<Redirect> {
    match ledger::edit_body(&db_pool, &user, joke_id, &body).await {
        Ok(()) => flash::redirect(&session, Level::Success, "Joke updated.", &format!("/jokes/{joke_id}")).await,
        Err(err) => flash::recover(&session, err, "/jokes/my").await,
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
) -> AppResult<Redirect> {
    match ledger::delete(&db_pool, &user, joke_id).await {
        Ok(()) => flash::redirect(&session, Level::Success, "Joke deleted.", "/jokes/my").await,
        Err(err) => flash::recover(&session, err, "/jokes/my").await,
    }
}
