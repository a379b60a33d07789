use axum::response::Redirect;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    AppResult,
    ledger::{ErrorKind, LedgerError},
    session::FLASH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

pub async fn push(session: &Session, level: Level, message: impl Into<String>) -> AppResult<()> {
    let mut flashes: Vec<FlashMessage> = session.get(FLASH).await?.unwrap_or_default();
    flashes.push(FlashMessage {
        level,
        message: message.into(),
    });
    session.insert(FLASH, flashes).await?;
    Ok(())
}

/// Removes and returns every pending message.
pub async fn take(session: &Session) -> AppResult<Vec<FlashMessage>> {
    Ok(session
        .remove::<Vec<FlashMessage>>(FLASH)
        .await?
        .unwrap_or_default())
}

pub async fn redirect(
    session: &Session,
    level: Level,
    message: impl Into<String>,
    to: &str,
) -> AppResult<Redirect> {
    push(session, level, message).await?;
    Ok(Redirect::to(to))
}

/// Shows a ledger failure to the user and sends them back to `back`.
/// Store failures are server errors and are passed on.
pub async fn recover(session: &Session, err: LedgerError, back: &str) -> AppResult<Redirect> {
    let level = match err.kind() {
        ErrorKind::Internal => return Err(err.into()),
        ErrorKind::InsufficientResource => Level::Warning,
        _ => Level::Danger,
    };

    tracing::debug!(error = %err, back, "recovered");
    redirect(session, level, err.to_string(), back).await
}
