use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            let value = lookup(key).with_context(|| format!("{key} is not set"))?;
            anyhow::ensure!(!value.trim().is_empty(), "{key} must not be empty");
            Ok(value)
        };
        let minutes = |key: &str, default: i64| -> anyhow::Result<i64> {
            match lookup(key) {
                None => Ok(default),
                Some(v) => {
                    let n = v
                        .parse::<i64>()
                        .with_context(|| format!("{key} must be an integer"))?;
                    anyhow::ensure!(n > 0, "{key} must be positive");
                    Ok(n)
                }
            }
        };

        let jwt = JwtConfig {
            access_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_secret: required("REFRESH_TOKEN_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "nutrilog".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "nutrilog-users".into()),
            access_ttl_minutes: minutes("ACCESS_TOKEN_TTL_MINUTES", 15)?,
            refresh_ttl_minutes: minutes("REFRESH_TOKEN_TTL_MINUTES", 60 * 24 * 7)?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            tracing::warn!("access and refresh tokens share one signing secret");
        }

        let port = lookup("APP_PORT")
            .or_else(|| lookup("PORT"))
            .map(|p| p.parse::<u16>().context("port must be a number"))
            .transpose()?
            .unwrap_or(8080);

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt,
        })
    }
}
