use std::sync::Arc;

use crate::auth::repo::{InMemoryUserRepository, UserRepository};
use crate::complaints::repo::{ComplaintRepository, InMemoryComplaintRepository};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub complaints: Arc<dyn ComplaintRepository>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Ok(Self::in_memory(config))
    }

    /// Volatile stores: everything is lost when the process exits.
    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::from_parts(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryComplaintRepository::new()),
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        complaints: Arc<dyn ComplaintRepository>,
    ) -> Self {
        Self {
            config,
            users,
            complaints,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            allow_status_regression: true,
            ping_message: "pong".into(),
        });
        Self::in_memory(config)
    }
}
