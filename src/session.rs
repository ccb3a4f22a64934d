use anyhow::Context;

pub const USER_VAR: &str = "SCOREBOARD_USER";
pub const PASSWORD_VAR: &str = "SCOREBOARD_PASSWORD";

/// The two static secrets gating report generation.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads the secrets from the environment. Both variables must be set;
    /// otherwise gated commands refuse to run.
    pub fn from_env() -> anyhow::Result<Self> {
        let username = std::env::var(USER_VAR)
            .with_context(|| format!("{USER_VAR} must be set to enable report access"))?;
        let password = std::env::var(PASSWORD_VAR)
            .with_context(|| format!("{PASSWORD_VAR} must be set to enable report access"))?;
        Ok(Self { username, password })
    }
}

/// Explicit login state passed into the command layer. One session per
/// invocation; nothing outlives the process.
#[derive(Debug, Default)]
pub struct Session {
    authenticated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares trimmed submitted values against the secrets. The result
    /// never reveals which of the two values mismatched.
    pub fn login(&mut self, credentials: &Credentials, user: &str, password: &str) -> bool {
        if user.trim() == credentials.username && password.trim() == credentials.password {
            self.authenticated = true;
        }
        self.authenticated
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("operator", "hunter2")
    }

    #[test]
    fn login_trims_submitted_values() {
        let mut session = Session::new();
        assert!(session.login(&credentials(), " operator ", "hunter2\n"));
        assert!(session.is_authenticated());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut session = Session::new();
        assert!(!session.login(&credentials(), "operator", "wrong"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn wrong_user_is_rejected() {
        let mut session = Session::new();
        assert!(!session.login(&credentials(), "intruder", "hunter2"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn secrets_are_not_trimmed() {
        let spaced = Credentials::new("operator", " hunter2");
        let mut session = Session::new();
        assert!(!session.login(&spaced, "operator", "hunter2"));
    }
}
