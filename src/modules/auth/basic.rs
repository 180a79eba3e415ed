use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Whether `path` needs authentication given paths that are exempt from it.
///
/// Paths compare equal with or without a trailing slash. A missing path, or
/// an empty exemption list, always requires authentication.
pub fn require_auth(path: Option<&str>, excluded_paths: &[&str]) -> bool {
    let Some(path) = path else {
        return true;
    };
    if excluded_paths.is_empty() {
        return true;
    }
    let path = path.trim_end_matches('/');
    !excluded_paths
        .iter()
        .any(|excluded| excluded.trim_end_matches('/') == path)
}

/// The base64 payload of a `Basic` authorization header
pub fn extract_base64_authorization_header(header: &str) -> Option<&str> {
    header.strip_prefix("Basic ").map(str::trim).filter(|payload| !payload.is_empty())
}

/// Decode a base64 payload into UTF-8 text. Invalid input gives `None`.
pub fn decode_base64_authorization_header(payload: &str) -> Option<String> {
    let bytes = STANDARD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split `email:password` at the first colon; passwords may contain colons
pub fn extract_user_credentials(decoded: &str) -> Option<(&str, &str)> {
    decoded.split_once(':')
}

/// Email and password carried by a `Basic` authorization header
pub fn basic_credentials(header: &str) -> Option<(String, String)> {
    let payload = extract_base64_authorization_header(header)?;
    let decoded = decode_base64_authorization_header(payload)?;
    let (email, password) = extract_user_credentials(&decoded)?;
    Some((email.to_string(), password.to_string()))
}
