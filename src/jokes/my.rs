use axum::{
    Json, debug_handler,
    extract::State,
    response::Html,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, AppState, include_res, ledger, res, session::CurrentUser};

use super::{listing_item, read_link};

#[derive(Serialize)]
pub(crate) struct Balance {
    joke_balance: i64,
}

#[debug_handler(state = AppState)]
pub(crate) async fn my_jokes(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    session: Session,
) -> AppResult<Html<String>> {
    let my = ledger::my_jokes(&db_pool, user.id).await?;

    let authored: String = my
        .authored
        .iter()
        .map(|listing| {
            let actions = format!(
                r#"{} <a href="/jokes/{}/edit">Edit</a>"#,
                read_link(listing),
                listing.id
            );
            listing_item(listing, &actions)
        })
        .collect();
    let taken: String = my
        .taken
        .iter()
        .map(|listing| listing_item(listing, &read_link(listing)))
        .collect();

    let body = res::fill(
        include_res!(str, "/pages/jokes/my.html"),
        &[
            ("balance", &user.joke_balance.to_string()),
            ("authored", if authored.is_empty() { "<li>None yet.</li>" } else { authored.as_str() }),
            ("taken", if taken.is_empty() { "<li>None yet.</li>" } else { taken.as_str() }),
        ],
    );
    res::page(&session, Some(&user), "My jokes", &body).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn balance(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
) -> AppResult<Json<Balance>> {
    let joke_balance = ledger::balance(&db_pool, user.id).await?;
    Ok(Json(Balance { joke_balance }))
}
