use std::collections::HashMap;

use parking_lot::Mutex;

use super::store::UserId;
use crate::modules::encryption::keys::generate_token;
use crate::MIN_TOKEN_LENGTH;

#[derive(Default)]
struct TokenTable {
    by_token: HashMap<String, UserId>,
    by_user: HashMap<UserId, String>,
}

/// Single-use password reset tokens, at most one live token per user.
///
/// Callers must only issue tokens for users that exist.
pub struct ResetTokenManager {
    table: Mutex<TokenTable>,
    token_length: usize,
}

impl ResetTokenManager {
    /// Lengths below `MIN_TOKEN_LENGTH` are raised to it
    pub fn new(token_length: usize) -> Self {
        Self {
            table: Mutex::new(TokenTable::default()),
            token_length: token_length.max(MIN_TOKEN_LENGTH),
        }
    }

    /// Issue a fresh token for `user_id`, revoking any earlier one
    pub fn issue(&self, user_id: UserId) -> String {
        let mut table = self.table.lock();
        let token = loop {
            let candidate = generate_token(self.token_length);
            if !table.by_token.contains_key(&candidate) {
                break candidate;
            }
        };

        if let Some(previous) = table.by_user.insert(user_id, token.clone()) {
            table.by_token.remove(&previous);
        }
        table.by_token.insert(token.clone(), user_id);
        token
    }

    /// Redeem a token. Returns the bound user on the first call only;
    /// unknown tokens leave the table untouched.
    pub fn consume(&self, token: &str) -> Option<UserId> {
        let mut table = self.table.lock();
        let user_id = table.by_token.remove(token)?;
        table.by_user.remove(&user_id);
        Some(user_id)
    }

    pub fn has_pending(&self, user_id: UserId) -> bool {
        self.table.lock().by_user.contains_key(&user_id)
    }
}

impl Default for ResetTokenManager {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TOKEN_LENGTH)
    }
}
