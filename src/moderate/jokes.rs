use axum::{
    Form, debug_handler,
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    flash::{self, Level},
    include_res, ledger, res,
    session::Moderator,
};

const JOKES_URL: &str = "/moderate/jokes";

#[derive(Deserialize)]
pub(crate) struct EditForm {
    body: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn jokes_page(
    State(db_pool): State<SqlitePool>,
    Moderator(moderator): Moderator,
    session: Session,
) -> AppResult<Html<String>> {
    let rows: String = ledger::all_jokes(&db_pool)
        .await?
        .iter()
        .map(|listing| {
            let body = listing.body.as_deref().unwrap_or_default();
            res::fill(
                include_res!(str, "/pages/moderate/joke_row.html"),
                &[
                    ("id", &listing.id.to_string()),
                    ("title", &res::escape(&listing.title)),
                    ("author", &res::escape(&listing.author_nickname)),
                    ("rating", &res::rating(listing.avg_rating)),
                    ("body_html", &res::markdown(body)),
                    ("body", &res::escape(body)),
                ],
            )
        })
        .collect();

    let body = res::fill(include_res!(str, "/pages/moderate/jokes.html"), &[("rows", &rows)]);
    res::page(&session, Some(&moderator), "All jokes", &body).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    Moderator(moderator): Moderator,
    session: Session,
    Form(EditForm { body }): Form<EditForm>,
) -> AppResult<Redirect> {
    match ledger::edit_as_moderator(&db_pool, joke_id, &body).await {
        Ok(()) => {
            tracing::debug!(moderator_id = %moderator.id, %joke_id, "moderated edit");
            flash::redirect(&session, Level::Success, "Joke updated.", JOKES_URL).await
        }
        Err(err) => flash::recover(&session, err, JOKES_URL).await,
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(joke_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    Moderator(moderator): Moderator,
    session: Session,
) -> AppResult<Redirect> {
    match ledger::delete_as_moderator(&db_pool, joke_id).await {
        Ok(()) => {
            tracing::debug!(moderator_id = %moderator.id, %joke_id, "moderated delete");
            flash::redirect(&session, Level::Success, "Joke deleted.", JOKES_URL).await
        }
        Err(err) => flash::recover(&session, err, JOKES_URL).await,
    }
}
