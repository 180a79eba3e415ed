pub mod basic;
pub mod error;
pub mod facade;
pub mod password;
pub mod sessions;
pub mod store;
pub mod tokens;
pub mod user_interface;

// Re-export the main types
pub use basic::{basic_credentials, require_auth};
pub use error::{AuthError, StoreError};
pub use facade::Auth;
pub use password::PasswordHasher;
pub use sessions::SessionManager;
pub use store::{normalize_email, CredentialStore, User, UserId};
pub use tokens::ResetTokenManager;
pub use user_interface::{parse_command, Shell, ShellCommand, ShellOutcome};
