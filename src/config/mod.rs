//! Coordinator configuration: session field names and redirect targets.

/// Configuration for a [`StageCoordinator`](crate::middleware::StageCoordinator).
///
/// Built from [`Config::default`] with `with_*` overrides (caller values
/// win), or from environment variables via [`Config::from_env`]. Immutable
/// once handed to the coordinator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Session key holding the stage counter.
    pub session_stage_field: String,
    /// Session key holding the logged-in principal; presence of the key is
    /// the "authenticated" flag the terminal gates check.
    pub session_user_field: String,
    /// Session key where the gate captures the URL to replay after login.
    pub session_login_redirect_field: String,
    /// Static target for [`LoginRedirect`](crate::middleware::LoginRedirect)
    /// when no return-to behavior is configured.
    pub success_redirect: String,
    /// When set, `LoginRedirect` replays the captured URL and uses this
    /// value only as the fallback for sessions with nothing captured.
    pub success_return_to_or_redirect: Option<String>,
    /// Where the terminal gate sends requests that are not fully
    /// authenticated (e.g. `/login`).
    pub failure_redirect: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_stage_field: "passport.stage".to_string(),
            session_user_field: "passport.user".to_string(),
            session_login_redirect_field: "redirectTo".to_string(),
            success_redirect: "/".to_string(),
            success_return_to_or_redirect: None,
            failure_redirect: "/login".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            session_stage_field: std::env::var("STAGEGATE_STAGE_FIELD")
                .unwrap_or(defaults.session_stage_field),
            session_user_field: std::env::var("STAGEGATE_USER_FIELD")
                .unwrap_or(defaults.session_user_field),
            session_login_redirect_field: std::env::var("STAGEGATE_LOGIN_REDIRECT_FIELD")
                .unwrap_or(defaults.session_login_redirect_field),
            success_redirect: std::env::var("STAGEGATE_SUCCESS_REDIRECT")
                .unwrap_or(defaults.success_redirect),
            success_return_to_or_redirect: std::env::var("STAGEGATE_SUCCESS_RETURN_TO").ok(),
            failure_redirect: std::env::var("STAGEGATE_FAILURE_REDIRECT")
                .unwrap_or(defaults.failure_redirect),
        }
    }

    pub fn with_session_stage_field(mut self, field: impl Into<String>) -> Self {
        self.session_stage_field = field.into();
        self
    }

    pub fn with_session_user_field(mut self, field: impl Into<String>) -> Self {
        self.session_user_field = field.into();
        self
    }

    pub fn with_session_login_redirect_field(mut self, field: impl Into<String>) -> Self {
        self.session_login_redirect_field = field.into();
        self
    }

    pub fn with_success_redirect(mut self, url: impl Into<String>) -> Self {
        self.success_redirect = url.into();
        self
    }

    pub fn with_success_return_to_or_redirect(mut self, url: impl Into<String>) -> Self {
        self.success_return_to_or_redirect = Some(url.into());
        self
    }

    pub fn with_failure_redirect(mut self, url: impl Into<String>) -> Self {
        self.failure_redirect = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.session_stage_field, "passport.stage");
        assert_eq!(config.session_login_redirect_field, "redirectTo");
        assert_eq!(config.success_redirect, "/");
        assert_eq!(config.success_return_to_or_redirect, None);
        assert_eq!(config.failure_redirect, "/login");
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = Config::default()
            .with_failure_redirect("/signin")
            .with_success_return_to_or_redirect("/account");
        assert_eq!(config.failure_redirect, "/signin");
        assert_eq!(
            config.success_return_to_or_redirect.as_deref(),
            Some("/account")
        );
        assert_eq!(config.success_redirect, "/");
    }
}
