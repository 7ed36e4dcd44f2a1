use crate::error::ConfigError;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub mercado_pago_access_token: Option<String>,
    pub mercado_pago_api_base: String,
    pub public_base_url: String,
    pub payment_price_cents: i64,
    pub session_secure: bool,
    pub session_inactivity_secs: i64,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            mercado_pago_access_token: None,
            mercado_pago_api_base: "https://api.mercadopago.com".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            payment_price_cents: 250,
            session_secure: false,
            session_inactivity_secs: 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = var("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", value)?;
        }
        config.database_url = var("DATABASE_URL");
        config.mercado_pago_access_token = var("MERCADO_PAGO_ACCESS_TOKEN");
        if let Some(value) = var("MERCADO_PAGO_API_BASE") {
            config.mercado_pago_api_base = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = var("PUBLIC_BASE_URL") {
            config.public_base_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = var("PAYMENT_PRICE_CENTS") {
            config.payment_price_cents = parse("PAYMENT_PRICE_CENTS", value)?;
        }
        if let Some(value) = var("SESSION_SECURE") {
            config.session_secure = parse("SESSION_SECURE", value)?;
        }
        if let Some(value) = var("SESSION_INACTIVITY_SECS") {
            config.session_inactivity_secs = parse("SESSION_INACTIVITY_SECS", value)?;
        }
        if let Some(value) = var("BCRYPT_COST") {
            config.bcrypt_cost = parse("BCRYPT_COST", value)?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.payment_price_cents, 250);
        assert!(!config.session_secure);
    }

    #[test]
    fn values_are_read_and_trailing_slashes_dropped() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/votacao"),
            ("PUBLIC_BASE_URL", "https://votacao.example/"),
            ("SESSION_SECURE", "true"),
            ("BCRYPT_COST", "4"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/votacao"));
        assert_eq!(config.public_base_url, "https://votacao.example");
        assert!(config.session_secure);
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn malformed_value_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("PAYMENT_PRICE_CENTS", "two")])).unwrap_err();
        assert!(err.to_string().contains("PAYMENT_PRICE_CENTS"));
    }

    #[test]
    fn blank_database_url_is_treated_as_unset() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }
}
