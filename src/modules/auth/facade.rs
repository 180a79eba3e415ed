use std::sync::Arc;

use super::basic::basic_credentials;
use super::error::AuthError;
use super::password::PasswordHasher;
use super::sessions::SessionManager;
use super::store::{CredentialStore, User, UserId};
use super::tokens::ResetTokenManager;
use crate::modules::settings::AuthConfig;
use crate::modules::utils::logging::{log_auth_event, subject};

/// Entry point for request handlers: registration, login, sessions and
/// password reset, composed over injected stores.
///
/// Each call is atomic on the component it touches; sequences such as
/// `valid_login` then `create_session` are not atomic as a pair.
pub struct Auth {
    store: Arc<CredentialStore>,
    sessions: Arc<SessionManager>,
    reset_tokens: Arc<ResetTokenManager>,
}

impl Auth {
    pub fn new(
        store: Arc<CredentialStore>,
        sessions: Arc<SessionManager>,
        reset_tokens: Arc<ResetTokenManager>,
    ) -> Self {
        Self {
            store,
            sessions,
            reset_tokens,
        }
    }

    /// Fresh in-memory components sized from `config`
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::with_store(CredentialStore::new(PasswordHasher::new(config.hash_iterations)), config)
    }

    /// Wrap an existing (e.g. loaded) credential store
    pub fn with_store(store: CredentialStore, config: &AuthConfig) -> Self {
        Self::new(
            Arc::new(store),
            Arc::new(SessionManager::new(config.token_length)),
            Arc::new(ResetTokenManager::new(config.token_length)),
        )
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn register_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        match self.store.register(email, password) {
            Ok(user) => {
                log_auth_event("register", &subject(Some(user.id)), true, None);
                Ok(user)
            }
            Err(e) => {
                let error = AuthError::from(e);
                log_auth_event("register", &subject(None), false, Some(&error.to_string()));
                Err(error)
            }
        }
    }

    /// True iff `email` belongs to a user whose password is `password`.
    /// Unknown emails cost the same hashing work as a wrong password.
    pub fn valid_login(&self, email: &str, password: &str) -> bool {
        match self.store.find_by_email(email) {
            Some(user) => {
                let valid = self.store.verify_password(user.id, password);
                log_auth_event("login", &subject(Some(user.id)), valid, None);
                valid
            }
            None => {
                self.store.hasher().dummy_verify(password);
                log_auth_event("login", &subject(None), false, None);
                false
            }
        }
    }

    /// Open a session for an already-authenticated email
    pub fn create_session(&self, email: &str) -> Result<String, AuthError> {
        let user = self.store.find_by_email(email).ok_or(AuthError::UserNotFound)?;
        let session_id = self.sessions.create(user.id);
        let active = self.sessions.sessions_for(user.id);
        log_auth_event(
            "create_session",
            &subject(Some(user.id)),
            true,
            Some(&format!("{} active session(s)", active)),
        );
        Ok(session_id)
    }

    /// Resolve a session id to its user. Empty or unknown ids give `None`.
    pub fn get_user_from_session_id(&self, session_id: &str) -> Option<User> {
        if session_id.is_empty() {
            return None;
        }
        let user_id = self.sessions.resolve(session_id)?;
        self.store.find_by_id(user_id)
    }

    /// End every session held by `user_id`
    pub fn destroy_session(&self, user_id: UserId) {
        let removed = self.sessions.destroy(user_id);
        log_auth_event(
            "destroy_session",
            &subject(Some(user_id)),
            true,
            Some(&format!("{} session(s) removed", removed)),
        );
    }

    pub fn get_reset_password_token(&self, email: &str) -> Result<String, AuthError> {
        let user = match self.store.find_by_email(email) {
            Some(user) => user,
            None => {
                log_auth_event("reset_request", &subject(None), false, Some("unknown email"));
                return Err(AuthError::UserNotFound);
            }
        };
        let replaced = self.reset_tokens.has_pending(user.id);
        let token = self.reset_tokens.issue(user.id);
        log_auth_event(
            "reset_request",
            &subject(Some(user.id)),
            true,
            replaced.then_some("earlier token revoked"),
        );
        Ok(token)
    }

    /// User named by a `Basic` authorization header, if its credentials are valid.
    /// A missing or malformed header gives `None`.
    pub fn user_from_basic_authorization(&self, header: Option<&str>) -> Option<User> {
        let (email, password) = basic_credentials(header?)?;
        if !self.valid_login(&email, &password) {
            return None;
        }
        self.store.find_by_email(&email)
    }

    pub fn user_count(&self) -> usize {
        self.store.len()
    }

    /// Redeem `reset_token` and set a new password for its user
    pub fn update_password(&self, reset_token: &str, new_password: &str) -> Result<(), AuthError> {
        let user_id = match self.reset_tokens.consume(reset_token) {
            Some(user_id) => user_id,
            None => {
                log_auth_event("reset_apply", &subject(None), false, Some("invalid token"));
                return Err(AuthError::InvalidToken);
            }
        };

        match self.store.update_password_hash(user_id, new_password) {
            Ok(()) => {
                log_auth_event("reset_apply", &subject(Some(user_id)), true, None);
                Ok(())
            }
            Err(e) => {
                let error = AuthError::from(e);
                log_auth_event("reset_apply", &subject(Some(user_id)), false, Some(&error.to_string()));
                Err(error)
            }
        }
    }
}
