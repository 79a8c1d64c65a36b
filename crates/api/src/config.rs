use helphub_core::request_status::{validate_cancel_window, DEFAULT_CANCEL_WINDOW_MINS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Minutes after submission during which a customer may cancel.
    pub cancel_window_mins: i64,
    /// Address that receives dispute and other admin-targeted notices.
    pub admin_notify_email: Option<String>,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Payment processor credentials and webhook secrets.
    pub processors: ProcessorConfig,
}

/// Credentials for the third-party payment processors.
///
/// A processor client is only built when its API key is present. Webhook
/// signatures are only checked when the matching webhook secret is present.
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_webhook_secret: Option<String>,
}

impl ProcessorConfig {
    /// Load processor settings. Unset or empty variables become `None`.
    ///
    /// | Env Var                   |
    /// |---------------------------|
    /// | `STRIPE_SECRET_KEY`       |
    /// | `STRIPE_WEBHOOK_SECRET`   |
    /// | `RAZORPAY_KEY_ID`         |
    /// | `RAZORPAY_KEY_SECRET`     |
    /// | `RAZORPAY_WEBHOOK_SECRET` |
    pub fn from_env() -> Self {
        Self {
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
            razorpay_key_id: non_empty_var("RAZORPAY_KEY_ID"),
            razorpay_key_secret: non_empty_var("RAZORPAY_KEY_SECRET"),
            razorpay_webhook_secret: non_empty_var("RAZORPAY_WEBHOOK_SECRET"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `CANCEL_WINDOW_MINS`   | `120`                      |
    /// | `ADMIN_NOTIFY_EMAIL`   | (none)                     |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`], processor settings
    /// by [`ProcessorConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparsable numeric values, or a cancel window outside
    /// `0..=MAX_CANCEL_WINDOW_MINS`, so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let cancel_window_mins = parse_cancel_window(
            &std::env::var("CANCEL_WINDOW_MINS")
                .unwrap_or_else(|_| DEFAULT_CANCEL_WINDOW_MINS.to_string()),
        )
        .unwrap_or_else(|msg| panic!("CANCEL_WINDOW_MINS: {msg}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            cancel_window_mins,
            admin_notify_email: non_empty_var("ADMIN_NOTIFY_EMAIL"),
            jwt: JwtConfig::from_env(),
            processors: ProcessorConfig::from_env(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_cancel_window(raw: &str) -> Result<i64, String> {
    let mins: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("'{raw}' is not a whole number of minutes ({e})"))?;
    validate_cancel_window(mins).map_err(|e| e.to_string())
}
