//! Who is asking.
//!
//! The session only ever stores the signed-in user's id (plus pending flash
//! messages). Everything else about the user, role and balance included, is
//! read from the database once per request into a [`CurrentUser`].

use std::ops::Deref;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    db::{self, User},
    flash::{self, Level},
};

pub const USER_ID: &str = "user_id";
pub const FLASH: &str = "flash";

pub const LOGIN_URL: &str = "/auth/login";

/// The signed-in user for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl CurrentUser {
    pub async fn load(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<CurrentUser>> {
        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Ok(None);
        };

        let user = db::get_user(db_pool, user_id).await?;
        if user.is_none() {
            tracing::warn!(%user_id, "session points at a missing user");
            session.remove::<Uuid>(USER_ID).await?;
        }
        Ok(user.map(CurrentUser))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let db_pool = SqlitePool::from_ref(state);

        match CurrentUser::load(&session, &db_pool).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(flash::redirect(
                &session,
                Level::Warning,
                "You need to be logged in to view this page.",
                LOGIN_URL,
            )
            .await
            .into_response()),
            Err(err) => Err(err.into_response()),
        }
    }
}

/// A [`CurrentUser`] holding the Moderator role.
#[derive(Debug, Clone)]
pub struct Moderator(pub CurrentUser);

impl<S> FromRequestParts<S> for Moderator
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_moderator() {
            return Ok(Moderator(user));
        }

        tracing::warn!(user_id = %user.id, "non-moderator on a moderator page");
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Err(flash::redirect(&session, Level::Danger, "Unauthorized access!", "/")
            .await
            .into_response())
    }
}
