use thiserror::Error;

/// Broad class of a [`LedgerError`], used at the HTTP boundary to decide
/// whether the failure is shown to the user or treated as a server fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authorization,
    NotFound,
    InsufficientResource,
    Internal,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("The joke title cannot exceed 10 words.")]
    TitleTooLong,
    #[error("The joke title cannot be empty.")]
    EmptyTitle,
    #[error("A rating must be between 1 and 5.")]
    ScoreOutOfRange,
    #[error("Invalid email format. Please enter a valid email address.")]
    MalformedEmail,
    #[error("Please choose a nickname.")]
    EmptyNickname,
    #[error("Please choose a password.")]
    EmptyPassword,

    #[error("You have already used this joke title. Please choose another.")]
    DuplicateTitle,
    #[error("Nickname already taken. Please choose another nickname.")]
    DuplicateNickname,
    #[error("Email already in use. Please choose another email.")]
    DuplicateEmail,
    #[error("You have already taken this joke.")]
    AlreadyTaken,

    #[error("You cannot take your own joke.")]
    SelfTake,
    #[error("You cannot rate your own joke.")]
    SelfRate,
    #[error("You are not allowed to change this joke.")]
    Forbidden,
    #[error("Cannot remove the last Moderator!")]
    LastModeratorProtected,
    #[error("Invalid email/nickname or password.")]
    InvalidCredentials,

    #[error("Joke not found.")]
    JokeNotFound,
    #[error("User not found.")]
    UserNotFound,

    #[error("You need to leave a joke before you can take or view others.")]
    InsufficientBalance,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            TitleTooLong | EmptyTitle | ScoreOutOfRange | MalformedEmail | EmptyNickname
            | EmptyPassword => ErrorKind::Validation,
            DuplicateTitle | DuplicateNickname | DuplicateEmail | AlreadyTaken => {
                ErrorKind::Conflict
            }
            SelfTake | SelfRate | Forbidden | LastModeratorProtected | InvalidCredentials => {
                ErrorKind::Authorization
            }
            JokeNotFound | UserNotFound => ErrorKind::NotFound,
            InsufficientBalance => ErrorKind::InsufficientResource,
            Store(_) | Hashing(_) => ErrorKind::Internal,
        }
    }

    /// Maps a unique-constraint violation to `conflict`, leaving every other
    /// store error as it is.
    pub(crate) fn on_unique(err: sqlx::Error, conflict: impl FnOnce(&str) -> LedgerError) -> LedgerError {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => conflict(db_err.message()),
            _ => LedgerError::Store(err),
        }
    }
}
