use std::io;
use std::path::PathBuf;

use log::error;

use super::error::AuthError;
use super::facade::Auth;
use crate::modules::utils::io::{is_plausible_email, read_line_prompt};
use crate::modules::utils::time::format_date;

/// One line of shell input, parsed
#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Register { email: String, password: String },
    Login { email: String, password: String },
    Profile,
    Logout,
    ResetRequest { email: String },
    ResetApply { token: String, new_password: String },
    Basic { payload: String },
    Stats,
    Help,
    Exit,
}

/// What the shell should do after handling a line
#[derive(Debug, PartialEq, Eq)]
pub enum ShellOutcome {
    Continue(String),
    Exit,
}

const HELP: &str = "\
Commands:
  register <email> <password>          Create an account
  login <email> <password>             Log in and keep the session
  profile                              Show the logged-in user
  logout                               End all sessions of the logged-in user
  reset-request <email>                Get a password reset token
  reset-apply <token> <new_password>   Set a new password with a reset token
  basic <base64 email:password>        Check Basic authorization credentials
  stats                                Show the number of registered users
  help                                 Show this list
  exit                                 Quit";

/// Parse a shell line into a command
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((name, args)) = parts.split_first() else {
        return Err("Empty command. Type 'help' for a list of commands.".to_string());
    };

    let command = match (name.to_lowercase().as_str(), args) {
        ("register", [email, password]) => ShellCommand::Register {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("login", [email, password]) => ShellCommand::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("profile", []) => ShellCommand::Profile,
        ("logout", []) => ShellCommand::Logout,
        ("reset-request", [email]) => ShellCommand::ResetRequest {
            email: email.to_string(),
        },
        ("reset-apply", [token, new_password]) => ShellCommand::ResetApply {
            token: token.to_string(),
            new_password: new_password.to_string(),
        },
        ("basic", [payload]) => ShellCommand::Basic {
            payload: payload.to_string(),
        },
        ("stats", []) => ShellCommand::Stats,
        ("help", []) => ShellCommand::Help,
        ("exit" | "quit", []) => ShellCommand::Exit,
        (
            "register" | "login" | "profile" | "logout" | "reset-request" | "reset-apply" | "basic"
            | "stats" | "help" | "exit" | "quit",
            _,
        ) => return Err(format!("Wrong number of arguments for '{}'. Type 'help'.", name)),
        _ => return Err(format!("Unknown command '{}'. Type 'help'.", name)),
    };
    Ok(command)
}

/// Interactive front end over one `Auth` instance.
///
/// Holds the current session id the way a browser holds a cookie: set on
/// login, cleared on logout.
pub struct Shell {
    auth: Auth,
    users_file: Option<PathBuf>,
    session_id: Option<String>,
}

impl Shell {
    pub fn new(auth: Auth, users_file: Option<PathBuf>) -> Self {
        Self {
            auth,
            users_file,
            session_id: None,
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Read-eval-print loop until `exit` or end of input
    pub fn run(&mut self) -> io::Result<()> {
        println!("\n=== User Auth Service ===");
        println!("{}", HELP);

        while let Some(line) = read_line_prompt("\n> ")? {
            if line.is_empty() {
                continue;
            }
            match self.handle_line(&line) {
                ShellOutcome::Continue(message) => println!("{}", message),
                ShellOutcome::Exit => break,
            }
        }
        println!("Goodbye!");
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> ShellOutcome {
        match parse_command(line) {
            Ok(command) => self.execute(command),
            Err(message) => ShellOutcome::Continue(message),
        }
    }

    pub fn execute(&mut self, command: ShellCommand) -> ShellOutcome {
        let message = match command {
            ShellCommand::Register { email, password } => self.register(&email, &password),
            ShellCommand::Login { email, password } => self.login(&email, &password),
            ShellCommand::Profile => self.profile(),
            ShellCommand::Logout => self.logout(),
            ShellCommand::ResetRequest { email } => self.reset_request(&email),
            ShellCommand::ResetApply { token, new_password } => self.reset_apply(&token, &new_password),
            ShellCommand::Basic { payload } => self.basic(&payload),
            ShellCommand::Stats => format!("users: {}", self.auth.user_count()),
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Exit => return ShellOutcome::Exit,
        };
        ShellOutcome::Continue(message)
    }

    fn register(&mut self, email: &str, password: &str) -> String {
        if !is_plausible_email(email) {
            return "Invalid email format.".to_string();
        }
        match self.auth.register_user(email, password) {
            Ok(user) => format!("{}: user created{}", user.email, self.persist()),
            Err(AuthError::EmailTaken) => "email already registered".to_string(),
            Err(e) => format!("Registration failed: {}", e),
        }
    }

    fn login(&mut self, email: &str, password: &str) -> String {
        if !self.auth.valid_login(email, password) {
            return "Unauthorized: invalid email or password.".to_string();
        }
        match self.auth.create_session(email) {
            Ok(session_id) => {
                let message = format!("{}: logged in (session_id={})", email.trim(), session_id);
                self.session_id = Some(session_id);
                message
            }
            Err(e) => format!("Login failed: {}", e),
        }
    }

    fn profile(&self) -> String {
        let session_id = self.session_id.as_deref().unwrap_or("");
        match self.auth.get_user_from_session_id(session_id) {
            Some(user) => format!(
                "email: {} (member since {})",
                user.email,
                format_date(user.created_at)
            ),
            None => "Forbidden: not logged in.".to_string(),
        }
    }

    fn logout(&mut self) -> String {
        let session_id = self.session_id.take().unwrap_or_default();
        match self.auth.get_user_from_session_id(&session_id) {
            Some(user) => {
                self.auth.destroy_session(user.id);
                format!("{}: logged out", user.email)
            }
            None => "Forbidden: not logged in.".to_string(),
        }
    }

    fn reset_request(&self, email: &str) -> String {
        match self.auth.get_reset_password_token(email) {
            Ok(token) => format!("{}: reset_token={}", email.trim(), token),
            Err(AuthError::UserNotFound) => "Forbidden: no account for that email.".to_string(),
            Err(e) => format!("Reset request failed: {}", e),
        }
    }

    fn reset_apply(&self, token: &str, new_password: &str) -> String {
        match self.auth.update_password(token, new_password) {
            Ok(()) => format!("Password updated{}", self.persist()),
            Err(AuthError::InvalidToken) => "Forbidden: invalid reset token.".to_string(),
            Err(e) => format!("Password update failed: {}", e),
        }
    }

    fn basic(&self, payload: &str) -> String {
        let header = format!("Basic {}", payload);
        match self.auth.user_from_basic_authorization(Some(&header)) {
            Some(user) => format!("authorized: {}", user.email),
            None => "Unauthorized: bad or unknown Basic credentials.".to_string(),
        }
    }

    /// Save the credential store when a users file is configured.
    /// Returns a suffix for the user-facing message.
    fn persist(&self) -> String {
        let Some(path) = &self.users_file else {
            return String::new();
        };
        match self.auth.store().save(path) {
            Ok(()) => String::new(),
            Err(e) => {
                error!("Failed to save user store to {}: {}", path.display(), e);
                format!(" (warning: changes not saved: {})", e)
            }
        }
    }
}
