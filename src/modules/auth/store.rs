use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::error::StoreError;
use super::password::PasswordHasher;
use crate::modules::utils::time::get_current_timestamp;

pub type UserId = u64;

/// Public view of a registered user. Carries no credential material.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String, // Normalized (trimmed, lowercase)
    pub created_at: u64,
}

/// Stored form of a user, hash included. Never leaves this module.
#[derive(Serialize, Deserialize, Clone)]
struct UserRecord {
    id: UserId,
    email: String,
    password_hash: String,
    created_at: u64,
}

impl UserRecord {
    fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// On-disk layout of the store
#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    next_id: UserId,
    users: Vec<UserRecord>,
}

struct StoreInner {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    next_id: UserId,
}

impl StoreInner {
    fn empty() -> Self {
        Self {
            users: HashMap::new(),
            by_email: HashMap::new(),
            next_id: 1,
        }
    }
}

fn id_space_exhausted() -> StoreError {
    StoreError::InvalidData("User id space exhausted".to_string())
}

/// Owns user records and enforces the unique-email invariant.
///
/// Every method is atomic on its own. Hashing happens outside the lock and
/// only the commit is done while holding it. Saves are serialized so an
/// older snapshot never lands on disk after a newer one.
pub struct CredentialStore {
    inner: RwLock<StoreInner>,
    save_lock: Mutex<()>,
    hasher: PasswordHasher,
}

/// Trim and lowercase an email for lookups and comparisons
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl CredentialStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            inner: RwLock::new(StoreInner::empty()),
            save_lock: Mutex::new(()),
            hasher,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Create a user, failing with `DuplicateEmail` if the normalized email is taken
    pub fn register(&self, email: &str, plaintext_password: &str) -> Result<User, StoreError> {
        let email = normalize_email(email);

        // Skip the expensive hash when the answer is already known
        if self.inner.read().by_email.contains_key(&email) {
            return Err(StoreError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(plaintext_password);

        let mut inner = self.inner.write();
        // Re-check: another writer may have committed while we were hashing
        if inner.by_email.contains_key(&email) {
            return Err(StoreError::DuplicateEmail);
        }

        let id = inner.next_id;
        inner.next_id = id.checked_add(1).ok_or_else(id_space_exhausted)?;
        let record = UserRecord {
            id,
            email: email.clone(),
            password_hash,
            created_at: get_current_timestamp(),
        };
        let user = record.to_user();
        inner.by_email.insert(email, id);
        inner.users.insert(id, record);

        Ok(user)
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        let inner = self.inner.read();
        inner
            .by_email
            .get(&email)
            .and_then(|id| inner.users.get(id))
            .map(UserRecord::to_user)
    }

    pub fn find_by_id(&self, id: UserId) -> Option<User> {
        self.inner.read().users.get(&id).map(UserRecord::to_user)
    }

    /// Check a plaintext password against the stored hash for `id`.
    /// Unknown ids never match.
    pub fn verify_password(&self, id: UserId, plaintext_password: &str) -> bool {
        let stored = match self.inner.read().users.get(&id) {
            Some(record) => record.password_hash.clone(),
            None => return false,
        };
        self.hasher.verify(plaintext_password, &stored)
    }

    /// Re-hash and overwrite the password for `id`. No strength checks here.
    pub fn update_password_hash(&self, id: UserId, new_plaintext_password: &str) -> Result<(), StoreError> {
        if !self.inner.read().users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }

        let password_hash = self.hasher.hash(new_plaintext_password);

        let mut inner = self.inner.write();
        match inner.users.get_mut(&id) {
            Some(record) => {
                record.password_hash = password_hash;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a JSON snapshot of all records to `path`.
    /// The file is written to a temp file beside the target, then persisted over it.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let _saving = self.save_lock.lock();

        let snapshot = {
            let inner = self.inner.read();
            let mut users: Vec<UserRecord> = inner.users.values().cloned().collect();
            users.sort_by_key(|record| record.id);
            StoreSnapshot {
                next_id: inner.next_id,
                users,
            }
        };
        let data = serde_json::to_string_pretty(&snapshot)?;

        if path.file_name().is_none() {
            return Err(StoreError::InvalidData(format!("Not a file path: {}", path.display())));
        }
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Load a store from a JSON snapshot. A missing file gives an empty store;
    /// an unreadable or inconsistent one is an error.
    pub fn load(path: &Path, hasher: PasswordHasher) -> Result<Self, StoreError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new(hasher)),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let snapshot: StoreSnapshot = serde_json::from_str(&data)?;

        let mut inner = StoreInner::empty();
        for mut record in snapshot.users {
            record.email = normalize_email(&record.email);
            if !PasswordHasher::is_well_formed(&record.password_hash) {
                return Err(StoreError::InvalidData(format!(
                    "Unusable password hash for user id {}",
                    record.id
                )));
            }
            if inner.users.contains_key(&record.id) {
                return Err(StoreError::InvalidData(format!("Duplicate user id {}", record.id)));
            }
            if inner.by_email.contains_key(&record.email) {
                return Err(StoreError::InvalidData(format!(
                    "Duplicate email for user id {}",
                    record.id
                )));
            }
            inner.by_email.insert(record.email.clone(), record.id);
            inner.users.insert(record.id, record);
        }
        let max_id = inner.users.keys().copied().max().unwrap_or(0);
        let after_max = max_id.checked_add(1).ok_or_else(id_space_exhausted)?;
        inner.next_id = snapshot.next_id.max(after_max);

        Ok(Self {
            inner: RwLock::new(inner),
            save_lock: Mutex::new(()),
            hasher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> CredentialStore {
        CredentialStore::new(PasswordHasher::new(1_000))
    }

    fn write_snapshot(path: &Path, next_id: UserId, users: &[(UserId, &str, String)]) {
        let users = users
            .iter()
            .map(|(id, email, password_hash)| UserRecord {
                id: *id,
                email: email.to_string(),
                password_hash: password_hash.clone(),
                created_at: 0,
            })
            .collect();
        let data = serde_json::to_string(&StoreSnapshot { next_id, users }).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn test_register_and_find() {
        let store = test_store();

        let user = store.register("  Test@Example.com ", "Password123!").unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.id, 1);

        assert_eq!(store.find_by_email("TEST@example.com"), Some(user.clone()));
        assert_eq!(store.find_by_id(user.id), Some(user));
        assert_eq!(store.find_by_email("other@example.com"), None);
        assert_eq!(store.find_by_id(42), None);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = test_store();
        let first = store.register("a@example.com", "pw").unwrap();
        let second = store.register("b@example.com", "pw").unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_password_is_hashed() {
        let store = test_store();
        let user = store.register("hash@example.com", "Password123!").unwrap();

        let inner = store.inner.read();
        let record = inner.users.get(&user.id).unwrap();
        assert_ne!(record.password_hash, "Password123!");
        assert!(!record.password_hash.contains("Password123!"));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = test_store();
        let first = store.register("dup@example.com", "first").unwrap();

        let result = store.register("DUP@example.com", "second");
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_email("dup@example.com"), Some(first.clone()));
        assert!(store.verify_password(first.id, "first"));
        assert!(!store.verify_password(first.id, "second"));
    }

    #[test]
    fn test_verify_password() {
        let store = test_store();
        let user = store.register("verify@example.com", "correct").unwrap();

        assert!(store.verify_password(user.id, "correct"));
        assert!(!store.verify_password(user.id, "wrong"));
        assert!(!store.verify_password(user.id + 1, "correct"));
    }

    #[test]
    fn test_update_password_hash() {
        let store = test_store();
        let user = store.register("update@example.com", "old-password").unwrap();

        store.update_password_hash(user.id, "new-password").unwrap();
        assert!(!store.verify_password(user.id, "old-password"));
        assert!(store.verify_password(user.id, "new-password"));

        let missing = store.update_password_hash(999, "whatever");
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_concurrent_register_same_email() {
        let store = test_store();
        let attempts = 8;

        let results: Vec<Result<User, StoreError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..attempts)
                .map(|i| {
                    let store = &store;
                    scope.spawn(move || store.register("race@example.com", &format!("pw{}", i)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateEmail)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, attempts - 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let store = test_store();
        let alice = store.register("alice@example.com", "alice-pw").unwrap();
        store.register("bob@example.com", "bob-pw").unwrap();
        store.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("alice-pw"));
        // Only the target is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let loaded = CredentialStore::load(&path, PasswordHasher::new(1_000)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.find_by_email("alice@example.com"), Some(alice.clone()));
        assert!(loaded.verify_password(alice.id, "alice-pw"));

        let carol = loaded.register("carol@example.com", "carol-pw").unwrap();
        assert_eq!(carol.id, 3);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::load(&dir.path().join("absent.json"), PasswordHasher::new(1_000)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = CredentialStore::load(&path, PasswordHasher::new(1_000));
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_load_rejects_duplicate_emails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let hasher = PasswordHasher::new(1_000);
        write_snapshot(
            &path,
            3,
            &[
                (1, "same@example.com", hasher.hash("x")),
                (2, "SAME@example.com", hasher.hash("y")),
            ],
        );

        let result = CredentialStore::load(&path, hasher);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_load_rejects_unusable_hashes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let hasher = PasswordHasher::new(1_000);
        let valid = hasher.hash("pw");
        let segments: Vec<&str> = valid.split('$').collect();
        let too_costly = format!("{}${}${}${}", segments[0], u32::MAX, segments[2], segments[3]);

        for password_hash in ["x".to_string(), String::new(), too_costly] {
            write_snapshot(&path, 2, &[(1, "bad@example.com", password_hash)]);
            let result = CredentialStore::load(&path, hasher.clone());
            assert!(matches!(result, Err(StoreError::InvalidData(_))));
        }
    }

    #[test]
    fn test_load_rejects_max_user_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let hasher = PasswordHasher::new(1_000);
        write_snapshot(&path, 1, &[(UserId::MAX, "last@example.com", hasher.hash("pw"))]);

        let result = CredentialStore::load(&path, hasher);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_register_when_ids_run_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let hasher = PasswordHasher::new(1_000);
        write_snapshot(&path, UserId::MAX, &[(1, "first@example.com", hasher.hash("pw"))]);

        let store = CredentialStore::load(&path, hasher).unwrap();
        let result = store.register("late@example.com", "pw");
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_email("late@example.com"), None);
    }

    #[test]
    fn test_concurrent_saves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let store = test_store();
        let threads = 8;
        let rounds = 5;

        let failures: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let store = &store;
                    let path = path.as_path();
                    scope.spawn(move || {
                        let mut failures = 0;
                        for r in 0..rounds {
                            let email = format!("user{}-{}@example.com", t, r);
                            if store.register(&email, "pw").is_err() || store.save(path).is_err() {
                                failures += 1;
                            }
                        }
                        failures
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(failures, 0);
        // The last save ran after every register, so the file holds them all
        let loaded = CredentialStore::load(&path, PasswordHasher::new(1_000)).unwrap();
        assert_eq!(loaded.len(), threads * rounds);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
