use client_core::config::{configuration_directory, load_settings};
use client_core::error::CoreError;
use client_core::retry::RetryPolicy;
use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Credentials used by the binary to sign in when no session is stored.
    #[serde(default)]
    pub login: Option<LoginSettings>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BackendSettings {
    /// Project URL of the hosted backend (auth under `/auth/v1`, rows under `/rest/v1`).
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: Secret<String>,
    /// Name of the persisted token slot.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Directory holding the persisted token slot.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_storage_key() -> String {
    "zews_auth_token".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".zews")
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    #[serde(default = "default_profile_collection")]
    pub profile_collection: String,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Unauthenticated entry point the shell is sent to after sign-out.
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            profile_collection: default_profile_collection(),
            retry: RetrySettings::default(),
            login_path: default_login_path(),
        }
    }
}

fn default_profile_collection() -> String {
    "user_profiles".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// OTLP collector endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginSettings {
    pub email: String,
    pub password: Secret<String>,
}

pub fn get_configuration() -> Result<Settings, CoreError> {
    let configuration_directory = configuration_directory("workforce-frontend")?;
    load_settings(&configuration_directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "backend": { "url": "https://project.example.co", "anon_key": "anon" }
        }))
        .unwrap();

        assert_eq!(settings.backend.storage_key, "zews_auth_token");
        assert_eq!(settings.backend.storage_dir, PathBuf::from(".zews"));
        assert_eq!(settings.backend.anon_key.expose_secret(), "anon");
        assert_eq!(settings.session.profile_collection, "user_profiles");
        assert_eq!(settings.session.login_path, "/login");
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.otlp_endpoint.is_none());
        assert!(settings.login.is_none());
    }

    #[test]
    fn test_retry_settings_to_policy() {
        let policy = RetrySettings::default().policy();
        assert_eq!(policy, RetryPolicy::default());

        let quick = RetrySettings {
            max_attempts: 5,
            delay_ms: 50,
        }
        .policy();
        assert_eq!(quick.max_attempts, 5);
        assert_eq!(quick.delay, Duration::from_millis(50));
    }
}
