use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{DEFAULT_HASH_ITERATIONS, DEFAULT_TOKEN_LENGTH, MAX_HASH_ITERATIONS, MIN_TOKEN_LENGTH};

/// Runtime settings for the auth core and its driver
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub hash_iterations: u32,
    pub token_length: usize,
    pub users_file: Option<PathBuf>, // No persistence when unset
    pub log_level: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            token_length: DEFAULT_TOKEN_LENGTH,
            users_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: AuthConfig = serde_json::from_str(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.hash_iterations == 0 || self.hash_iterations > MAX_HASH_ITERATIONS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("hash_iterations must be between 1 and {}", MAX_HASH_ITERATIONS),
            ));
        }
        if self.token_length < MIN_TOKEN_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("token_length must be at least {}", MIN_TOKEN_LENGTH),
            ));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Unknown log level: {}", self.log_level),
            ));
        }
        Ok(())
    }
}
