use std::collections::HashMap;

use parking_lot::Mutex;

use super::store::UserId;
use crate::modules::encryption::keys::generate_token;
use crate::MIN_TOKEN_LENGTH;

/// Maps opaque session ids to user ids.
///
/// A user may hold any number of sessions at once. Sessions do not expire;
/// they live until `destroy` is called for their user.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, UserId>>,
    token_length: usize,
}

impl SessionManager {
    /// Lengths below `MIN_TOKEN_LENGTH` are raised to it
    pub fn new(token_length: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            token_length: token_length.max(MIN_TOKEN_LENGTH),
        }
    }

    /// Start a new session for `user_id` and return its id
    pub fn create(&self, user_id: UserId) -> String {
        let mut sessions = self.sessions.lock();
        loop {
            let session_id = generate_token(self.token_length);
            if !sessions.contains_key(&session_id) {
                sessions.insert(session_id.clone(), user_id);
                return session_id;
            }
        }
    }

    pub fn resolve(&self, session_id: &str) -> Option<UserId> {
        self.sessions.lock().get(session_id).copied()
    }

    /// Remove every session belonging to `user_id`. Returns how many were removed.
    pub fn destroy(&self, user_id: UserId) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, owner| *owner != user_id);
        before - sessions.len()
    }

    pub fn sessions_for(&self, user_id: UserId) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|owner| **owner == user_id)
            .count()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TOKEN_LENGTH)
    }
}
