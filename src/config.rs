//! Application configuration loaded from environment variables.
//!
//! Everything the service talks to (identity provider, document store,
//! media store, mail relay) is configured here, once, at startup.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Core ---
    /// GCP project ID (identity token issuer/audience and document store)
    pub gcp_project_id: String,
    /// Identity provider web API key
    pub identity_api_key: String,
    /// Frontend URL for redirects, CORS, and cookie security
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- OAuth (social sign-in) ---
    /// HMAC key for signing the OAuth state parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub github_client_id: String,
    pub github_client_secret: String,

    // --- Media store ---
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,

    // --- Mail relay ---
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, also the relay username
    pub smtp_mail: String,
    pub smtp_pass: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            identity_api_key: "test_api_key".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            google_client_id: "test_google_id".to_string(),
            google_client_secret: "test_google_secret".to_string(),
            github_client_id: "test_github_id".to_string(),
            github_client_secret: "test_github_secret".to_string(),
            cloudinary_cloud_name: "test-cloud".to_string(),
            cloudinary_api_key: "test_media_key".to_string(),
            cloudinary_api_secret: "test_media_secret".to_string(),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_mail: "noreply@example.com".to_string(),
            smtp_pass: "test_smtp_pass".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every external dependency must be fully configured or startup fails;
    /// in particular, missing media-store credentials are fatal here rather
    /// than at first upload.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FRONTEND_URL"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            github_client_id: env::var("GITHUB_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_ID"))?,
            github_client_secret: env::var("GITHUB_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_SECRET"))?,

            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .map_err(|_| ConfigError::Missing("CLOUDINARY_CLOUD_NAME"))?,
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLOUDINARY_API_KEY"))?,
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLOUDINARY_API_SECRET"))?,

            smtp_host: env::var("SMTP_HOST").map_err(|_| ConfigError::Missing("SMTP_HOST"))?,
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_mail: env::var("SMTP_MAIL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SMTP_MAIL"))?,
            smtp_pass: env::var("SMTP_PASS").map_err(|_| ConfigError::Missing("SMTP_PASS"))?,
        })
    }

    /// Whether session cookies should carry the Secure attribute.
    ///
    /// Mirrors the deployment: https frontend means production.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GCP_PROJECT_ID", "ember-test");
        env::set_var("IDENTITY_API_KEY", "key123");
        env::set_var("FRONTEND_URL", "http://localhost:3000/");
        env::set_var("OAUTH_STATE_KEY", "test_state_key_32_bytes_minimum!");
        env::set_var("GOOGLE_CLIENT_ID", "gid");
        env::set_var("GOOGLE_CLIENT_SECRET", "gsecret");
        env::set_var("GITHUB_CLIENT_ID", "ghid");
        env::set_var("GITHUB_CLIENT_SECRET", "ghsecret");
        env::set_var("CLOUDINARY_CLOUD_NAME", "ember-cloud");
        env::set_var("CLOUDINARY_API_KEY", "mkey");
        env::set_var("CLOUDINARY_API_SECRET", "msecret");
        env::set_var("SMTP_HOST", "smtp.test");
        env::set_var("SMTP_MAIL", "noreply@test");
        env::set_var("SMTP_PASS", "mailpass");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gcp_project_id, "ember-test");
        assert_eq!(config.identity_api_key, "key123");
        // Trailing slash is normalized away
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.port, 8080);
        assert_eq!(config.smtp_port, 587);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_secure_cookies_for_https_frontend() {
        let config = Config {
            frontend_url: "https://embersync.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.secure_cookies());
    }
}
