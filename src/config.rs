//! Configuration for the cal-sink service.

use std::env;
use std::path::PathBuf;

/// Webhook sink configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Cal.com webhook signing secret for signature verification.
    pub webhook_secret: Option<String>,
    /// Todoist API token.
    pub todoist_token: Option<String>,
    /// Todoist project to create tasks in (defaults to the user's inbox).
    pub todoist_project_id: Option<String>,
    /// Path of the booking/task mapping file.
    pub mappings_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            webhook_secret: env::var("CALCOM_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            todoist_token: env::var("TODOIST_API_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            todoist_project_id: env::var("TODOIST_PROJECT_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            mappings_path: env::var("MAPPINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("mappings.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::remove_var("PORT");
        env::remove_var("CALCOM_WEBHOOK_SECRET");
        env::remove_var("TODOIST_API_TOKEN");
        env::remove_var("TODOIST_PROJECT_ID");
        env::remove_var("MAPPINGS_PATH");

        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert!(config.webhook_secret.is_none());
        assert!(config.todoist_token.is_none());
        assert!(config.todoist_project_id.is_none());
        assert_eq!(config.mappings_path, PathBuf::from("mappings.json"));
    }

    #[test]
    fn test_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::set_var("PORT", "9000");
        env::set_var("CALCOM_WEBHOOK_SECRET", "test-secret");
        env::set_var("TODOIST_API_TOKEN", "test-token");
        env::set_var("MAPPINGS_PATH", "/data/mappings.json");

        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.webhook_secret, Some("test-secret".to_string()));
        assert_eq!(config.todoist_token, Some("test-token".to_string()));
        assert_eq!(config.mappings_path, PathBuf::from("/data/mappings.json"));

        env::remove_var("PORT");
        env::remove_var("CALCOM_WEBHOOK_SECRET");
        env::remove_var("TODOIST_API_TOKEN");
        env::remove_var("MAPPINGS_PATH");
    }

    #[test]
    fn test_empty_secret_treated_as_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::set_var("CALCOM_WEBHOOK_SECRET", "");
        let config = Config::default();
        assert!(config.webhook_secret.is_none());
        env::remove_var("CALCOM_WEBHOOK_SECRET");
    }
}
