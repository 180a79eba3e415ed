// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, encryption, settings, utils};

// Re-export commonly used types
pub use modules::auth::{Auth, AuthError, CredentialStore, User, UserId};
pub use modules::settings::AuthConfig;

// Constants
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;
pub const MAX_HASH_ITERATIONS: u32 = 10 * DEFAULT_HASH_ITERATIONS;
pub const DEFAULT_TOKEN_LENGTH: usize = 32;
pub const MIN_TOKEN_LENGTH: usize = 16;

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
