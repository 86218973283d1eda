use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Placeholder JWT secrets that must not reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Mailgun credentials; mail is disabled when either is missing.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub bot_email: String,
    pub mail: Option<MailConfig>,
}

impl Config {
    /// Read `GROBRO_*` and `MAILGUN_*` variables. Call after `.env` is loaded.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = var("GROBRO_HOST", "0.0.0.0");
        let port: u16 = var("GROBRO_PORT", "3000")
            .parse()
            .context("GROBRO_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let public_url = var("GROBRO_PUBLIC_URL", &format!("http://localhost:{}", port));

        let mail = match (get("MAILGUN_API_KEY"), get("MAILGUN_DOMAIN")) {
            (Some(api_key), Some(domain)) if !api_key.is_empty() && !domain.is_empty() => {
                Some(MailConfig { api_key, domain })
            }
            _ => None,
        };

        Ok(Self {
            addr,
            db_path: var("GROBRO_DB_PATH", "grobro.db").into(),
            jwt_secret: var("GROBRO_JWT_SECRET", "dev-secret-change-me"),
            upload_dir: var("GROBRO_UPLOAD_DIR", "./uploads").into(),
            public_url,
            bot_email: var("GROBRO_BOT_EMAIL", "bot@grobro.local"),
            mail,
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }

    pub fn mail_from(&self) -> String {
        format!("GroBro <{}>", self.bot_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.addr.port(), 3000);
        assert_eq!(cfg.public_url, "http://localhost:3000");
        assert_eq!(cfg.db_path, PathBuf::from("grobro.db"));
        assert!(cfg.mail.is_none());
        assert!(cfg.has_placeholder_secret());
        assert_eq!(cfg.mail_from(), "GroBro <bot@grobro.local>");
    }

    #[test]
    fn mail_needs_key_and_domain() {
        let cfg = config(&[("MAILGUN_API_KEY", "key-123")]).unwrap();
        assert!(cfg.mail.is_none());

        let cfg = config(&[("MAILGUN_API_KEY", "key-123"), ("MAILGUN_DOMAIN", "mg.grobro.test")]).unwrap();
        assert_eq!(cfg.mail.unwrap().domain, "mg.grobro.test");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(config(&[("GROBRO_PORT", "eighty")]).is_err());
    }

    #[test]
    fn real_secret_is_not_placeholder() {
        let cfg = config(&[("GROBRO_JWT_SECRET", "s3cr3t-from-vault")]).unwrap();
        assert!(!cfg.has_placeholder_secret());
    }
}
