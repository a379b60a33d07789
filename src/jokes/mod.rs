mod edit;
mod leave;
mod my;
mod take;
mod view;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, db::JokeListing, include_res, res};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leave", get(leave::leave_page).post(leave::leave))
        .route("/take", get(take::take_page).post(take::take))
        .route("/my", get(my::my_jokes))
        .route("/balance", get(my::balance))
        .route("/{id}", get(view::view))
        .route("/{id}/rate", post(view::rate))
        .route("/{id}/edit", get(edit::edit_page).post(edit::edit))
        .route("/{id}/delete", post(edit::delete))
}

const LOCKED: &str = r#"<p class="locked">Reading this joke costs one credit.</p>"#;

pub(crate) fn listing_item(listing: &JokeListing, actions: &str) -> String {
    let body = match &listing.body {
        Some(body) => format!(r#"<div class="joke-body">{}</div>"#, res::markdown(body)),
        None => LOCKED.to_owned(),
    };

    res::fill(
        include_res!(str, "/pages/jokes/item.html"),
        &[
            ("title", &res::escape(&listing.title)),
            ("author", &res::escape(&listing.author_nickname)),
            ("rating", &res::rating(listing.avg_rating)),
            ("body", &body),
            ("actions", actions),
        ],
    )
}

pub(crate) fn read_link(listing: &JokeListing) -> String {
    let label = if listing.unlocked { "Read" } else { "Read (1 credit)" };
    format!(r#"<a href="/jokes/{}">{label}</a>"#, listing.id)
}
