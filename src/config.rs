use std::env;
use std::time::Duration;

use crate::payments::PAYSTACK_API_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    /// Where buyers land after checkout. Defaults to `{base_url}/payments/callback`.
    pub paystack_callback_url: String,
    /// Webhook signing key: `PAYSTACK_WEBHOOK_SECRET` if set, else the secret key
    pub paystack_webhook_secret: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub email_webhook_url: Option<String>,
    /// Delete the buyer account on `transfer.failed` (default true)
    pub purge_user_on_transfer_failed: bool,
    pub bootstrap_admin_email: Option<String>,
    /// Upper bound on every outbound gateway / email request
    pub http_timeout: Duration,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Paystack signs webhooks with the account secret key. An explicit override wins.
pub fn resolve_webhook_secret(override_secret: Option<String>, secret_key: &str) -> Option<String> {
    override_secret.or_else(|| {
        let key = secret_key.trim();
        (!key.is_empty()).then(|| key.to_string())
    })
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COURSEPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let paystack_secret_key = env::var("PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!("PAYSTACK_SECRET_KEY not set, purchase initiation will fail");
            String::new()
        });

        let paystack_webhook_secret =
            resolve_webhook_secret(env_opt("PAYSTACK_WEBHOOK_SECRET"), &paystack_secret_key);

        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "coursepay.db".to_string()),
            dev_mode,
            paystack_secret_key,
            paystack_base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| PAYSTACK_API_URL.to_string()),
            paystack_callback_url: env::var("PAYSTACK_CALLBACK_URL")
                .unwrap_or_else(|_| format!("{}/payments/callback", base_url)),
            paystack_webhook_secret,
            resend_api_key: env_opt("RESEND_API_KEY"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Courses <noreply@example.com>".to_string()),
            email_webhook_url: env_opt("EMAIL_WEBHOOK_URL"),
            purge_user_on_transfer_failed: env_flag("PURGE_USER_ON_TRANSFER_FAILED", true),
            bootstrap_admin_email: env_opt("BOOTSTRAP_ADMIN_EMAIL"),
            http_timeout,
            base_url,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
