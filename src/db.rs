use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::include_res;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
pub enum Role {
    User,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Moderator => "Moderator",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: Role,
    pub joke_balance: i64,

    // unique: email
    // unique: nickname
}

impl User {
    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Joke {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,

    // unique: author_id, title
}

/// A joke as it appears in a listing. `body` is only filled in when the
/// reader is allowed to see it, and `unlocked` says whether reading it is
/// free for them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JokeListing {
    pub id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub author_nickname: String,
    pub avg_rating: f64,
    pub taken: bool,
    pub unlocked: bool,
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    init_schema(&db_pool).await?;
    Ok(db_pool)
}

pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(include_res!(str, "/schema.sql"))
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn insert_user(
    db_pool: &SqlitePool,
    email: &str,
    nickname: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO users (id,email,nickname,password_hash,role,joke_balance) VALUES (?,?,?,?,?,0) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(email)
    .bind(nickname)
    .bind(password_hash)
    .bind(role)
    .fetch_one(db_pool)
    .await
}

pub async fn get_user(db_pool: &SqlitePool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn get_user_by_email(db_pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db_pool)
        .await
}

pub async fn get_user_by_identity(db_pool: &SqlitePool, identity: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email=? OR nickname=?")
        .bind(identity)
        .bind(identity)
        .fetch_optional(db_pool)
        .await
}

pub async fn get_joke(db_pool: &SqlitePool, id: Uuid) -> Result<Option<Joke>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM jokes WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

/// Opens the store for a write transaction. The write lock is taken at
/// `BEGIN`, so two writers never both hold a read lock and wait on each
/// other to upgrade it.
pub async fn begin_write(db_pool: &SqlitePool) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, sqlx::Error> {
    db_pool.begin_with("BEGIN IMMEDIATE").await
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // a single connection, every in-memory connection is its own database
    connect("sqlite::memory:", 1).await.unwrap()
}

/// A store in a fresh file, for tests that need several connections at once.
#[cfg(test)]
pub(crate) async fn file_pool(max_connections: u32) -> (SqlitePool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("jokeshop-{}.db", Uuid::now_v7()));
    let db_pool = connect(&format!("sqlite://{}", path.display()), max_connections)
        .await
        .unwrap();
    (db_pool, path)
}
