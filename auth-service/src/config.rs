use anyhow::{anyhow, Context, Result};
use common_auth::{JwtConfig, DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_PORT: u16 = 8085;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Admin account created at startup when missing. Admins cannot register
/// themselves, so this is how the first one gets in.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServiceConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST '{}'", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    config_from(|key| env::var(key).ok())
}

/// Build the configuration from an arbitrary variable source.
pub fn config_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup("JWT_SECRET")
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("JWT_SECRET must be set to a non-empty value"))?;

    let ttl_seconds = lookup("JWT_TTL_SECONDS")
        .map(|value| parse_ttl(&value))
        .transpose()
        .context("Failed to parse JWT_TTL_SECONDS")?
        .unwrap_or(DEFAULT_TTL_SECONDS);

    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = lookup("PORT")
        .map(|value| value.trim().parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(DEFAULT_PORT);

    let database_url = lookup("DATABASE_URL").and_then(|value| normalize_optional(&value));

    let cors_origins = lookup("AUTH_CORS_ORIGINS")
        .map(|value| parse_list(&value))
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(default_origins);

    let bootstrap_admin = match (
        lookup("AUTH_BOOTSTRAP_ADMIN_EMAIL").and_then(|value| normalize_optional(&value)),
        lookup("AUTH_BOOTSTRAP_ADMIN_PASSWORD").and_then(|value| normalize_optional(&value)),
    ) {
        (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
        (None, None) => None,
        _ => {
            return Err(anyhow!(
                "AUTH_BOOTSTRAP_ADMIN_EMAIL and AUTH_BOOTSTRAP_ADMIN_PASSWORD must be set together"
            ))
        }
    };

    Ok(ServiceConfig {
        jwt: JwtConfig::new(secret).with_ttl(ttl_seconds)?,
        host,
        port,
        database_url,
        cors_origins,
        bootstrap_admin,
    })
}

fn parse_ttl(value: &str) -> Result<i64> {
    let seconds: i64 = value
        .trim()
        .parse()
        .map_err(|err| anyhow!("Invalid TTL '{value}': {err}"))?;
    if seconds <= 0 {
        return Err(anyhow!("TTL must be positive, got {seconds}"));
    }
    if seconds > MAX_TTL_SECONDS {
        return Err(anyhow!(
            "TTL must not exceed {MAX_TTL_SECONDS} seconds, got {seconds}"
        ));
    }
    Ok(seconds)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
