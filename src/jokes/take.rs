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
    flash::{self, Level},
    include_res, ledger, res,
    session::CurrentUser,
};

use super::{listing_item, read_link};

#[derive(Deserialize)]
pub(crate) struct TakeForm {
    joke_id: Uuid,
}

#[debug_handler(state = AppState)]
pub(crate) async fn take_page(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
) -> AppResult<Html<String>> {
    let listings = ledger::browse(&db_pool, user.id).await?;

    let items: String = listings
        .iter()
        .map(|listing| {
            let take = if listing.taken {
                "<em>taken</em>".to_owned()
            } else {
                format!(
                    r#"<form class="inline" method="post" action="/jokes/take"><input type="hidden" name="joke_id" value="{}"><button type="submit">Take</button></form>"#,
                    listing.id
                )
            };
            listing_item(listing, &format!("{take} {}", read_link(listing)))
        })
        .collect();

    let hint = if listings.is_empty() {
        "<p>Nobody else has left a joke yet.</p>"
    } else if user.joke_balance <= 0 {
        r#"<p>You have no credits. <a href="/jokes/leave">Leave a joke</a> to earn one.</p>"#
    } else {
        ""
    };

    let body = res::fill(include_res!(str, "/pages/jokes/take.html"), &[("hint", hint), ("items", &items)]);
    res::page(&session, Some(&user), "Take a joke", &body).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn take(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
    Form(TakeForm { joke_id }): Form<TakeForm>,
) -> AppResult<Redirect> {
    match ledger::take(&db_pool, user.id, joke_id).await {
        Ok(()) => flash::redirect(&session, Level::Success, "Joke taken! Find it under My jokes.", "/jokes/my").await,
        Err(err) => flash::recover(&session, err, "/jokes/take").await,
    }
}
