pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod flash;
pub mod index;
pub mod jokes;
pub mod ledger;
pub mod moderate;
pub mod res;
pub mod session;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

pub fn app(app_state: AppState, session_layer: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .route("/", get(index::index))
        .route("/style.css", get(res::stylesheet))
        .nest("/auth", auth::router())
        .nest("/jokes", jokes::router())
        .nest("/moderate", moderate::router())
        .fallback(res::not_found)
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("{}\n\n{}", self.0, self.0.backtrace());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong on our side. Please try again.",
        )
            .into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(ledger::LedgerError);
