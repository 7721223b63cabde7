//! Environment-backed configuration.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub nats_url: Option<String>,
    /// Upper bound for product prices, in minor currency units.
    pub max_price: i64,
    /// Advisory TTL the caller should apply to the `x-cart-session` token.
    pub cart_session_ttl_days: i64,
    /// How often the empty-cart reaper runs.
    pub reaper_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: parse_or("PORT", 8083),
            database_url: env::var("DATABASE_URL")?,
            nats_url: env::var("NATS_URL").ok(),
            max_price: parse_or("MAX_PRICE", 100_000_000),
            cart_session_ttl_days: parse_or("CART_SESSION_TTL_DAYS", 7),
            reaper_interval_secs: parse_or("REAPER_INTERVAL_SECS", 3600),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            info!("invalid {key} value {raw:?}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        std::env::set_var("TEST_PARSE_OR_PORT", "not-a-number");
        assert_eq!(parse_or("TEST_PARSE_OR_PORT", 8083u16), 8083);
        std::env::remove_var("TEST_PARSE_OR_PORT");
    }
}
