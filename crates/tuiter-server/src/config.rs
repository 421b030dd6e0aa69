use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret: String = try_load("TUITER_JWT_SECRET", DEV_JWT_SECRET)?;
        if jwt_secret == DEV_JWT_SECRET {
            warn!("TUITER_JWT_SECRET is the development default; tokens are forgeable");
        }

        Ok(Self {
            host: try_load("TUITER_HOST", "0.0.0.0")?,
            port: try_load("TUITER_PORT", "4000")?,
            db_path: try_load("TUITER_DB_PATH", "tuiter.db")?,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let port: u16 = try_load("TUITER_TEST_UNSET_PORT", "4000").unwrap();
        assert_eq!(port, 4000);
    }

    #[test]
    fn rejects_unparseable_default() {
        let port: Result<u16> = try_load("TUITER_TEST_UNSET_PORT", "not-a-port");
        assert!(port.is_err());
    }
}
