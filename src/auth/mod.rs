//! Accounts: registration, password login and the session that follows.

mod login;
mod logout;
mod password;
mod register;

use std::sync::LazyLock;

use axum::{Router, routing::get};
use regex::Regex;
use sqlx::SqlitePool;

use crate::{
    AppState,
    db::{self, Role, User},
    ledger::{self, LedgerError, LedgerResult},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register::register_page).post(register::register))
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", get(logout::logout))
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\.-]+@[\w\.-]+\.\w+$").expect("email pattern compiles"));

/// `local@domain.tld`, where every part is made of word characters, dots
/// and dashes, and the top-level part of word characters only.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

fn duplicate_account(message: &str) -> LedgerError {
    if message.contains("users.email") {
        LedgerError::DuplicateEmail
    } else {
        LedgerError::DuplicateNickname
    }
}

pub async fn register(
    db_pool: &SqlitePool,
    email: &str,
    nickname: &str,
    password: &str,
) -> LedgerResult<User> {
    let email = email.trim();
    let nickname = nickname.trim();

    if !is_valid_email(email) {
        return Err(LedgerError::MalformedEmail);
    }
    if nickname.is_empty() {
        return Err(LedgerError::EmptyNickname);
    }
    if password.is_empty() {
        return Err(LedgerError::EmptyPassword);
    }

    let password_hash = password::hash(password)?;
    let user = db::insert_user(db_pool, email, nickname, &password_hash, Role::User)
        .await
        .map_err(|err| LedgerError::on_unique(err, duplicate_account))?;

    tracing::info!(user_id = %user.id, nickname = %user.nickname, "user registered");
    Ok(user)
}

/// Looks the user up by email or nickname and checks the password.
pub async fn authenticate(db_pool: &SqlitePool, identity: &str, password: &str) -> LedgerResult<User> {
    let Some(user) = db::get_user_by_identity(db_pool, identity.trim()).await? else {
        return Err(LedgerError::InvalidCredentials);
    };
    if !password::verify(password, &user.password_hash) {
        tracing::info!(user_id = %user.id, "wrong password");
        return Err(LedgerError::InvalidCredentials);
    }
    Ok(user)
}

/// Makes sure `email` belongs to a Moderator, creating the account (with the
/// email doubling as nickname) if there is none yet. The password is only
/// used for a new account.
pub async fn init_moderator(db_pool: &SqlitePool, email: &str, password: &str) -> LedgerResult<User> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(LedgerError::MalformedEmail);
    }

    if let Some(user) = db::get_user_by_email(db_pool, email).await? {
        ledger::promote(db_pool, user.id).await?;
        return db::get_user(db_pool, user.id)
            .await?
            .ok_or(LedgerError::UserNotFound);
    }

    if password.is_empty() {
        return Err(LedgerError::EmptyPassword);
    }
    let password_hash = password::hash(password)?;
    let user = db::insert_user(db_pool, email, email, &password_hash, Role::Moderator)
        .await
        .map_err(|err| LedgerError::on_unique(err, duplicate_account))?;

    tracing::info!(user_id = %user.id, "moderator created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ErrorKind;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b-c_d@mail.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example.c-m"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email("alice@@example.com"));
    }

    #[tokio::test]
    async fn register_then_login_by_email_or_nickname() {
        let db_pool = db::test_pool().await;

        let alice = register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
        assert_eq!(alice.role, Role::User);
        assert_eq!(alice.joke_balance, 0);
        assert_ne!(alice.password_hash, "pw");

        assert_eq!(authenticate(&db_pool, "alice@example.com", "pw").await.unwrap().id, alice.id);
        assert_eq!(authenticate(&db_pool, "alice", "pw").await.unwrap().id, alice.id);

        let err = authenticate(&db_pool, "alice", "nope").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCredentials));
        let err = authenticate(&db_pool, "bob", "pw").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCredentials));
    }

    #[tokio::test]
    async fn registration_is_validated() {
        let db_pool = db::test_pool().await;

        let err = register(&db_pool, "not-an-email", "alice", "pw").await.unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEmail));
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = register(&db_pool, "alice@example.com", "  ", "pw").await.unwrap_err();
        assert!(matches!(err, LedgerError::EmptyNickname));
        let err = register(&db_pool, "alice@example.com", "alice", "").await.unwrap_err();
        assert!(matches!(err, LedgerError::EmptyPassword));

        register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
        let err = register(&db_pool, "other@example.com", "alice", "pw").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateNickname));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = register(&db_pool, "alice@example.com", "alice2", "pw").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEmail));
    }

    #[tokio::test]
    async fn init_moderator_creates_or_promotes() {
        let db_pool = db::test_pool().await;

        let root = init_moderator(&db_pool, "root@example.com", "pw").await.unwrap();
        assert!(root.is_moderator());
        assert_eq!(root.nickname, "root@example.com");
        assert_eq!(authenticate(&db_pool, "root@example.com", "pw").await.unwrap().id, root.id);

        let alice = register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
        let promoted = init_moderator(&db_pool, "alice@example.com", "ignored").await.unwrap();
        assert_eq!(promoted.id, alice.id);
        assert!(promoted.is_moderator());
        assert_eq!(ledger::moderator_count(&db_pool).await.unwrap(), 2);
    }
}
