use env_logger::{Builder, Env, WriteStyle};
use log::{info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::path::Path;

/// Initialize the logging system.
///
/// `default_level` applies unless `RUST_LOG` says otherwise. With a `log_file`
/// output is appended there, otherwise it goes to stderr.
pub fn initialize_logging(
    default_level: &str,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let level: LevelFilter = default_level.parse()?;

    let mut builder = Builder::from_env(Env::default().default_filter_or(level.to_string()));
    builder
        .format_timestamp_secs()
        .format_module_path(true)
        .write_style(WriteStyle::Auto);

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder
            .write_style(WriteStyle::Never)
            .target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    info!("Logging system initialized");
    Ok(())
}

/// Render a user id for log lines; `-` when there is none
pub fn subject(user_id: Option<u64>) -> String {
    match user_id {
        Some(id) => id.to_string(),
        None => "-".to_string(),
    }
}

/// Structured log line for an authentication event.
/// Callers pass user ids only; credentials and identifiers stay out of logs.
pub fn log_auth_event(event_type: &str, user: &str, success: bool, details: Option<&str>) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Auth event: type={}, user={}, success=true, timestamp={}, details={:?}",
            event_type, user, timestamp, details
        );
    } else {
        warn!(
            "Auth event: type={}, user={}, success=false, timestamp={}, details={:?}",
            event_type, user, timestamp, details
        );
    }
}
