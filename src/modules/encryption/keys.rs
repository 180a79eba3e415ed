use crate::HmacSha256;
use pbkdf2::pbkdf2;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length in bytes of a freshly generated salt
pub const SALT_LEN: usize = 16;

/// Length in bytes of a derived password key
pub const KEY_LEN: usize = 32;

/// Function to generate a random salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN).map(|_| rng.gen()).collect()
}

/// Function to derive a key of `len` bytes from the passphrase using PBKDF2
pub fn derive_key_from_passphrase(passphrase: &str, salt: &[u8], iterations: u32, len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    pbkdf2::<HmacSha256>(passphrase.as_bytes(), salt, iterations, &mut key);
    key
}

/// Generate an opaque alphanumeric token from the thread-local CSPRNG
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Compare two byte slices without short-circuiting on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation() {
        let passphrase = "MySecurePassword123!";
        let salt = generate_random_salt();

        let key = derive_key_from_passphrase(passphrase, &salt, 1_000, KEY_LEN);
        assert_eq!(key.len(), KEY_LEN);

        let key2 = derive_key_from_passphrase(passphrase, &salt, 1_000, KEY_LEN);
        assert_eq!(key, key2);

        let key3 = derive_key_from_passphrase("DifferentPassword456!", &salt, 1_000, KEY_LEN);
        assert_ne!(key, key3);

        let different_salt = generate_random_salt();
        let key4 = derive_key_from_passphrase(passphrase, &different_salt, 1_000, KEY_LEN);
        assert_ne!(key, key4);

        // Cost is part of the derivation
        let key5 = derive_key_from_passphrase(passphrase, &salt, 1_001, KEY_LEN);
        assert_ne!(key, key5);
    }

    #[test]
    fn test_random_generation() {
        let salt1 = generate_random_salt();
        let salt2 = generate_random_salt();
        assert_eq!(salt1.len(), SALT_LEN);
        assert_ne!(salt1, salt2);

        let token1 = generate_token(32);
        let token2 = generate_token(32);
        assert_eq!(token1.len(), 32);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
