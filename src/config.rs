// src/config.rs
use crate::error::AppResult;
use std::{env, net::SocketAddr, path::PathBuf};

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub storage_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub session_days: i64,
    /// Optional seed admin, created at startup when absent.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let storage_dir = env::var("LOR_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let bind_addr = env::var("LOR_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("LOR_BIND_ADDR '{}' is invalid ({}), falling back to default", raw, e);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let session_days = env::var("LOR_SESSION_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(1);

        Ok(Self {
            database_url,
            storage_dir,
            bind_addr,
            session_days,
            admin_email: env::var("LOR_ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("LOR_ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }
}
