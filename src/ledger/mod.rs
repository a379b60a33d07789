//! The joke economy.
//!
//! Every user holds a `joke_balance`. Leaving a joke credits the author by
//! one; the first look at somebody else's joke debits the reader by one.
//! Re-reading a joke that was already paid for is free, and authors always
//! read their own jokes for free. Taking a joke claims it for the reader's
//! "my jokes" list and requires a positive balance, but does not spend it.
//! Nothing else changes a balance.

mod error;

use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{self, Joke, JokeListing, Role, User};

pub use error::{ErrorKind, LedgerError};

pub type LedgerResult<T> = Result<T, LedgerError>;

pub const MAX_TITLE_WORDS: usize = 10;
pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// Authorization for changing a joke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAuthorization {
    /// The author, who can only change their own jokes.
    IsSelf,
    /// Moderator who can change anything.
    Moderator,
}

#[derive(Debug, Clone)]
pub struct JokeDetail {
    pub joke: Joke,
    pub author_nickname: String,
    pub avg_rating: f64,
    /// Whether this read was the paid first view.
    pub debited: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MyJokes {
    pub authored: Vec<JokeListing>,
    pub taken: Vec<JokeListing>,
}

pub async fn leave(
    db_pool: &SqlitePool,
    author_id: Uuid,
    title: &str,
    body: &str,
) -> LedgerResult<Joke> {
    let title = title.trim();
    let body = body.trim();

    if title.is_empty() {
        return Err(LedgerError::EmptyTitle);
    }
    if title.split_whitespace().count() > MAX_TITLE_WORDS {
        return Err(LedgerError::TitleTooLong);
    }

    let mut tx = db::begin_write(db_pool).await?;

    if sqlx::query("SELECT 1 FROM jokes WHERE author_id=? AND title=?")
        .bind(author_id)
        .bind(title)
        .fetch_optional(&mut *tx)
        .await?
        .is_some()
    {
        return Err(LedgerError::DuplicateTitle);
    }

    let credited = sqlx::query("UPDATE users SET joke_balance=joke_balance+1 WHERE id=?")
        .bind(author_id)
        .execute(&mut *tx)
        .await?;
    if credited.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound);
    }

    let joke: Joke = sqlx::query_as(
        "INSERT INTO jokes (id,title,body,author_id,created_at) VALUES (?,?,?,?,?) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(title)
    .bind(body)
    .bind(author_id)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| LedgerError::on_unique(err, |_| LedgerError::DuplicateTitle))?;

    tx.commit().await?;

    tracing::info!(%author_id, joke_id = %joke.id, "joke left");
    Ok(joke)
}

pub async fn take(db_pool: &SqlitePool, user_id: Uuid, joke_id: Uuid) -> LedgerResult<()> {
    let joke = db::get_joke(db_pool, joke_id)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;

    if joke.author_id == user_id {
        return Err(LedgerError::SelfTake);
    }
    if has_taken(db_pool, user_id, joke_id).await? {
        return Err(LedgerError::AlreadyTaken);
    }
    if balance(db_pool, user_id).await? <= 0 {
        return Err(LedgerError::InsufficientBalance);
    }

    sqlx::query("INSERT INTO taken_jokes (user_id,joke_id) VALUES (?,?)")
        .bind(user_id)
        .bind(joke_id)
        .execute(db_pool)
        .await
        .map_err(|err| LedgerError::on_unique(err, |_| LedgerError::AlreadyTaken))?;

    tracing::info!(%user_id, %joke_id, "joke taken");
    Ok(())
}

/// Reads a joke, charging the reader for their first look at a joke they
/// did not write.
///
/// The view record and the debit share one transaction: the record's primary
/// key lets only one first view through, and the debit only applies while the
/// balance is positive. A reader with nothing to spend leaves no record.
pub async fn view(db_pool: &SqlitePool, viewer_id: Uuid, joke_id: Uuid) -> LedgerResult<JokeDetail> {
    let mut tx = db::begin_write(db_pool).await?;

    let joke: Joke = sqlx::query_as("SELECT * FROM jokes WHERE id=?")
        .bind(joke_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;

    let mut debited = false;
    if joke.author_id != viewer_id {
        let first_view = sqlx::query(
            "INSERT INTO viewed_jokes (user_id,joke_id) VALUES (?,?) ON CONFLICT DO NOTHING",
        )
        .bind(viewer_id)
        .bind(joke_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if first_view {
            let charged = sqlx::query(
                "UPDATE users SET joke_balance=joke_balance-1 WHERE id=? AND joke_balance>0",
            )
            .bind(viewer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                == 1;

            if !charged {
                return Err(LedgerError::InsufficientBalance);
            }
            debited = true;
        }
    }

    let (author_nickname,): (String,) = sqlx::query_as("SELECT nickname FROM users WHERE id=?")
        .bind(joke.author_id)
        .fetch_one(&mut *tx)
        .await?;

    let avg_rating: f64 =
        sqlx::query_scalar("SELECT IFNULL(AVG(score), 0.0) FROM ratings WHERE joke_id=?")
            .bind(joke_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    if debited {
        tracing::info!(%viewer_id, %joke_id, "first view debited");
    }

    Ok(JokeDetail {
        joke,
        author_nickname,
        avg_rating,
        debited,
    })
}

pub async fn rate(db_pool: &SqlitePool, rater_id: Uuid, joke_id: Uuid, score: i64) -> LedgerResult<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(LedgerError::ScoreOutOfRange);
    }

    let joke = db::get_joke(db_pool, joke_id)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;
    if joke.author_id == rater_id {
        return Err(LedgerError::SelfRate);
    }

    // repeat ratings by the same user are kept and all count toward the average
    sqlx::query("INSERT INTO ratings (joke_id,user_id,score) VALUES (?,?,?)")
        .bind(joke_id)
        .bind(rater_id)
        .bind(score)
        .execute(db_pool)
        .await?;

    tracing::info!(%rater_id, %joke_id, score, "joke rated");
    Ok(())
}

pub async fn average_rating(db_pool: &SqlitePool, joke_id: Uuid) -> LedgerResult<f64> {
    Ok(
        sqlx::query_scalar("SELECT IFNULL(AVG(score), 0.0) FROM ratings WHERE joke_id=?")
            .bind(joke_id)
            .fetch_one(db_pool)
            .await?,
    )
}

pub fn authorize(actor: &User, author_id: Uuid) -> LedgerResult<EditAuthorization> {
    if actor.id == author_id {
        Ok(EditAuthorization::IsSelf)
    } else if actor.is_moderator() {
        Ok(EditAuthorization::Moderator)
    } else {
        Err(LedgerError::Forbidden)
    }
}

pub async fn edit_as_owner(
    db_pool: &SqlitePool,
    joke_id: Uuid,
    owner_id: Uuid,
    body: &str,
) -> LedgerResult<()> {
    owned_joke(db_pool, joke_id, owner_id).await?;

    sqlx::query("UPDATE jokes SET body=? WHERE id=? AND author_id=?")
        .bind(body.trim())
        .bind(joke_id)
        .bind(owner_id)
        .execute(db_pool)
        .await?;

    tracing::info!(%owner_id, %joke_id, "joke edited by author");
    Ok(())
}

pub async fn edit_as_moderator(db_pool: &SqlitePool, joke_id: Uuid, body: &str) -> LedgerResult<()> {
    let updated = sqlx::query("UPDATE jokes SET body=? WHERE id=?")
        .bind(body.trim())
        .bind(joke_id)
        .execute(db_pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(LedgerError::JokeNotFound);
    }

    tracing::info!(%joke_id, "joke edited by moderator");
    Ok(())
}

/// Changes a joke's body as whoever `actor` is allowed to act as.
pub async fn edit_body(db_pool: &SqlitePool, actor: &User, joke_id: Uuid, body: &str) -> LedgerResult<()> {
    let joke = db::get_joke(db_pool, joke_id)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;

    match authorize(actor, joke.author_id)? {
        EditAuthorization::IsSelf => edit_as_owner(db_pool, joke_id, actor.id, body).await,
        EditAuthorization::Moderator => edit_as_moderator(db_pool, joke_id, body).await,
    }
}

pub async fn delete_as_owner(db_pool: &SqlitePool, joke_id: Uuid, owner_id: Uuid) -> LedgerResult<()> {
    owned_joke(db_pool, joke_id, owner_id).await?;

    sqlx::query("DELETE FROM jokes WHERE id=? AND author_id=?")
        .bind(joke_id)
        .bind(owner_id)
        .execute(db_pool)
        .await?;

    tracing::info!(%owner_id, %joke_id, "joke deleted by author");
    Ok(())
}

pub async fn delete_as_moderator(db_pool: &SqlitePool, joke_id: Uuid) -> LedgerResult<()> {
    // taken, viewed and rating rows go with it through ON DELETE CASCADE
    let deleted = sqlx::query("DELETE FROM jokes WHERE id=?")
        .bind(joke_id)
        .execute(db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(LedgerError::JokeNotFound);
    }

    tracing::info!(%joke_id, "joke deleted by moderator");
    Ok(())
}

pub async fn delete(db_pool: &SqlitePool, actor: &User, joke_id: Uuid) -> LedgerResult<()> {
    let joke = db::get_joke(db_pool, joke_id)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;

    match authorize(actor, joke.author_id)? {
        EditAuthorization::IsSelf => delete_as_owner(db_pool, joke_id, actor.id).await,
        EditAuthorization::Moderator => delete_as_moderator(db_pool, joke_id).await,
    }
}

async fn owned_joke(db_pool: &SqlitePool, joke_id: Uuid, owner_id: Uuid) -> LedgerResult<Joke> {
    let joke = db::get_joke(db_pool, joke_id)
        .await?
        .ok_or(LedgerError::JokeNotFound)?;
    if joke.author_id != owner_id {
        return Err(LedgerError::Forbidden);
    }
    Ok(joke)
}

pub async fn promote(db_pool: &SqlitePool, user_id: Uuid) -> LedgerResult<()> {
    let updated = sqlx::query("UPDATE users SET role=? WHERE id=?")
        .bind(Role::Moderator)
        .bind(user_id)
        .execute(db_pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound);
    }

    tracing::info!(%user_id, "user promoted to moderator");
    Ok(())
}

/// Takes the Moderator role away from `user_id`. There is always at least
/// one Moderator left afterwards.
pub async fn demote(db_pool: &SqlitePool, user_id: Uuid) -> LedgerResult<()> {
    let user = db::get_user(db_pool, user_id)
        .await?
        .ok_or(LedgerError::UserNotFound)?;
    if !user.is_moderator() {
        return Ok(());
    }

    let updated = sqlx::query(
        "UPDATE users SET role=? WHERE id=? AND role=? AND (SELECT COUNT(*) FROM users WHERE role=?) > 1",
    )
    .bind(Role::User)
    .bind(user_id)
    .bind(Role::Moderator)
    .bind(Role::Moderator)
    .execute(db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        tracing::warn!(%user_id, "refused to demote the last moderator");
        return Err(LedgerError::LastModeratorProtected);
    }

    tracing::info!(%user_id, "moderator demoted");
    Ok(())
}

pub async fn moderator_count(db_pool: &SqlitePool) -> LedgerResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role=?")
        .bind(Role::Moderator)
        .fetch_one(db_pool)
        .await?)
}

pub async fn balance(db_pool: &SqlitePool, user_id: Uuid) -> LedgerResult<i64> {
    sqlx::query_scalar("SELECT joke_balance FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(LedgerError::UserNotFound)
}

pub async fn has_taken(db_pool: &SqlitePool, user_id: Uuid, joke_id: Uuid) -> LedgerResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM taken_jokes WHERE user_id=? AND joke_id=?")
        .bind(user_id)
        .bind(joke_id)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

pub async fn has_viewed(db_pool: &SqlitePool, user_id: Uuid, joke_id: Uuid) -> LedgerResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM viewed_jokes WHERE user_id=? AND joke_id=?")
        .bind(user_id)
        .bind(joke_id)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

/// Jokes written by somebody other than `viewer_id`. Bodies are only
/// included for jokes the viewer already paid to read.
pub async fn browse(db_pool: &SqlitePool, viewer_id: Uuid) -> LedgerResult<Vec<JokeListing>> {
    Ok(sqlx::query_as(
        "SELECT j.id, j.title,
            CASE WHEN v.user_id IS NOT NULL THEN j.body END AS body,
            u.nickname AS author_nickname,
            IFNULL((SELECT AVG(r.score) FROM ratings r WHERE r.joke_id=j.id), 0.0) AS avg_rating,
            EXISTS (SELECT 1 FROM taken_jokes t WHERE t.joke_id=j.id AND t.user_id=?) AS taken,
            v.user_id IS NOT NULL AS unlocked
        FROM jokes j
        JOIN users u ON u.id=j.author_id
        LEFT JOIN viewed_jokes v ON v.joke_id=j.id AND v.user_id=?
        WHERE j.author_id!=?
        ORDER BY j.created_at DESC",
    )
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn my_jokes(db_pool: &SqlitePool, user_id: Uuid) -> LedgerResult<MyJokes> {
    let authored = sqlx::query_as(
        "SELECT j.id, j.title, j.body AS body,
            u.nickname AS author_nickname,
            IFNULL((SELECT AVG(r.score) FROM ratings r WHERE r.joke_id=j.id), 0.0) AS avg_rating,
            0 AS taken,
            1 AS unlocked
        FROM jokes j
        JOIN users u ON u.id=j.author_id
        WHERE j.author_id=?
        ORDER BY j.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let taken = sqlx::query_as(
        "SELECT j.id, j.title,
            CASE WHEN v.user_id IS NOT NULL THEN j.body END AS body,
            u.nickname AS author_nickname,
            IFNULL((SELECT AVG(r.score) FROM ratings r WHERE r.joke_id=j.id), 0.0) AS avg_rating,
            1 AS taken,
            v.user_id IS NOT NULL AS unlocked
        FROM taken_jokes t
        JOIN jokes j ON j.id=t.joke_id
        JOIN users u ON u.id=j.author_id
        LEFT JOIN viewed_jokes v ON v.joke_id=j.id AND v.user_id=t.user_id
        WHERE t.user_id=?
        ORDER BY j.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    Ok(MyJokes { authored, taken })
}

pub async fn all_jokes(db_pool: &SqlitePool) -> LedgerResult<Vec<JokeListing>> {
    Ok(sqlx::query_as(
        "SELECT j.id, j.title, j.body AS body,
            u.nickname AS author_nickname,
            IFNULL((SELECT AVG(r.score) FROM ratings r WHERE r.joke_id=j.id), 0.0) AS avg_rating,
            0 AS taken,
            1 AS unlocked
        FROM jokes j
        JOIN users u ON u.id=j.author_id
        ORDER BY j.created_at DESC",
    )
    .fetch_all(db_pool)
    .await?)
}

pub async fn all_users(db_pool: &SqlitePool) -> LedgerResult<Vec<User>> {
    Ok(sqlx::query_as("SELECT * FROM users ORDER BY nickname")
        .fetch_all(db_pool)
        .await?)
}
