use std::io;

/// Errors raised by the credential store
#[derive(Debug)]
pub enum StoreError {
    DuplicateEmail,
    NotFound,
    InvalidData(String),
    Io(io::Error),
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::InvalidData(error.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "A user with this email already exists"),
            StoreError::NotFound => write!(f, "User not found"),
            StoreError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            StoreError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors surfaced by the auth facade to its callers
#[derive(Debug)]
pub enum AuthError {
    EmailTaken,
    UserNotFound,
    InvalidToken,
    Storage(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateEmail => AuthError::EmailTaken,
            StoreError::NotFound => AuthError::UserNotFound,
            other => AuthError::Storage(other),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::EmailTaken => write!(f, "email already registered"),
            AuthError::UserNotFound => write!(f, "user not found"),
            AuthError::InvalidToken => write!(f, "invalid reset token"),
            AuthError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Storage(e) => Some(e),
            _ => None,
        }
    }
}
