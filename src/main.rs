use clap::{Arg, Command};
use log::info;
use std::path::PathBuf;

use user_auth_service::auth::{CredentialStore, PasswordHasher, Shell};
use user_auth_service::utils::logging::initialize_logging;
use user_auth_service::{Auth, AuthConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("user-auth-service")
        .about("Credential and session authentication core with an interactive shell")
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON configuration file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("users-file")
                .long("users-file")
                .help("Where registered users are loaded from and saved to")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Default log level (error, warn, info, debug, trace)")
                .value_name("LEVEL"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append logs to this file instead of stderr")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AuthConfig::load(path)?,
        None => AuthConfig::default(),
    };
    if let Some(path) = matches.get_one::<PathBuf>("users-file") {
        config.users_file = Some(path.clone());
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log_level = level.clone();
    }
    config.validate()?;

    initialize_logging(
        &config.log_level,
        matches.get_one::<PathBuf>("log-file").map(PathBuf::as_path),
    )?;

    let hasher = PasswordHasher::new(config.hash_iterations);
    let store = match &config.users_file {
        Some(path) => CredentialStore::load(path, hasher)?,
        None => CredentialStore::new(hasher),
    };
    info!(
        "Loaded {} user(s), hashing with {} PBKDF2 iterations",
        store.len(),
        store.hasher().iterations()
    );

    let auth = Auth::with_store(store, &config);
    let mut shell = Shell::new(auth, config.users_file.clone());
    shell.run()?;
    Ok(())
}
