use crate::modules::encryption::keys::{
    constant_time_eq, derive_key_from_passphrase, generate_random_salt, KEY_LEN,
};
use crate::MAX_HASH_ITERATIONS;

/// Scheme tag at the head of every encoded hash
const SCHEME: &str = "pbkdf2_sha256";

/// Upper bound on the stored key length accepted by `verify`
const MAX_KEY_LEN: usize = 64;

/// Salted one-way password hashing with PBKDF2-HMAC-SHA256.
///
/// Encoded hashes look like `pbkdf2_sha256$<iterations>$<salt hex>$<key hex>`,
/// so a hash stays verifiable after the configured cost changes.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    /// Iteration counts outside `1..=MAX_HASH_ITERATIONS` are clamped
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.clamp(1, MAX_HASH_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> String {
        let salt = generate_random_salt();
        let key = derive_key_from_passphrase(plaintext, &salt, self.iterations, KEY_LEN);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(salt),
            hex::encode(key)
        )
    }

    /// Check a plaintext password against an encoded hash.
    /// Malformed hashes never match.
    pub fn verify(&self, plaintext: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = parse_encoded(encoded) else {
            return false;
        };
        let derived = derive_key_from_passphrase(plaintext, &salt, iterations, expected.len());
        constant_time_eq(&derived, &expected)
    }

    /// Whether `encoded` is a hash `verify` would accept to check against
    pub fn is_well_formed(encoded: &str) -> bool {
        parse_encoded(encoded).is_some()
    }

    /// Burn one derivation at the configured cost. Used when there is no
    /// stored hash to check against, so both paths take comparable time.
    pub fn dummy_verify(&self, plaintext: &str) {
        let _ = derive_key_from_passphrase(plaintext, &[0u8; 16], self.iterations, KEY_LEN);
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(crate::DEFAULT_HASH_ITERATIONS)
    }
}

fn parse_encoded(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = hex::decode(parts.next()?).ok()?;
    let key = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some()
        || iterations == 0
        || iterations > MAX_HASH_ITERATIONS
        || key.is_empty()
        || key.len() > MAX_KEY_LEN
    {
        return None;
    }
    Some((iterations, salt, key))
}
