use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    /// Permit status moves such as `resolved -> pending`. On unless
    /// `ALLOW_STATUS_REGRESSION` turns it off.
    pub allow_status_regression: bool,
    pub ping_message: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "civicdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "civicdesk-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            jwt,
            allow_status_regression: env_flag(
                std::env::var("ALLOW_STATUS_REGRESSION").ok(),
                true,
            ),
            ping_message: std::env::var("PING_MESSAGE").unwrap_or_else(|_| "ping".into()),
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Unset or blank falls back to `default`.
fn env_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(v) if !v.trim().is_empty() => parse_flag(&v),
        _ => default,
    }
}
