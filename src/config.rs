use crate::rates::coingecko::COINGECKO_API_URL;
use crate::rates::fx::{CURRENCY_API_URL, ER_API_URL, FRANKFURTER_API_URL};
use crate::rates::retry::DEFAULT_MAX_ATTEMPTS;
use crate::rates::FallbackTable;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const MIN_PROVIDER_TIMEOUT_SECS: u64 = 5;
const MAX_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Answer every rate lookup from the fallback table or FIXED.
    pub disable_external_rates: bool,
    /// Built-in table with `FIAT_FALLBACK_RATES` entries merged over it.
    pub fiat_fallback_rates: FallbackTable,
    pub er_api_url: String,
    pub frankfurter_api_url: String,
    pub currency_api_url: String,
    pub coingecko_api_url: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_warmup: Duration,
    pub provider_timeout: Duration,
    pub rate_limit_max_attempts: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let disable_external_rates = parse_bool(&env_map, "DISABLE_EXTERNAL_RATES")?;

        let fiat_fallback_rates = match env_map.get("FIAT_FALLBACK_RATES") {
            Some(raw) => FallbackTable::builtin().merged(
                FallbackTable::parse(raw)
                    .map_err(|e| ConfigError::InvalidValue("FIAT_FALLBACK_RATES".to_string(), e))?,
            ),
            None => FallbackTable::builtin(),
        };

        let url = |key: &str, default: &str| {
            env_map
                .get(key)
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };
        let er_api_url = url("ER_API_URL", ER_API_URL);
        let frankfurter_api_url = url("FRANKFURTER_API_URL", FRANKFURTER_API_URL);
        let currency_api_url = url("CURRENCY_API_URL", CURRENCY_API_URL);
        let coingecko_api_url = url("COINGECKO_API_URL", COINGECKO_API_URL);

        let coingecko_api_key = env_map
            .get("COINGECKO_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let coingecko_warmup = Duration::from_millis(parse_number(
            &env_map,
            "COINGECKO_WARMUP_MS",
            1500u64,
        )?);

        let timeout_secs = parse_number(&env_map, "PROVIDER_TIMEOUT_SECS", 10u64)?;
        if !(MIN_PROVIDER_TIMEOUT_SECS..=MAX_PROVIDER_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::InvalidValue(
                "PROVIDER_TIMEOUT_SECS".to_string(),
                format!(
                    "must be between {} and {}, got {}",
                    MIN_PROVIDER_TIMEOUT_SECS, MAX_PROVIDER_TIMEOUT_SECS, timeout_secs
                ),
            ));
        }

        let rate_limit_max_attempts =
            parse_number(&env_map, "RATE_LIMIT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if rate_limit_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            disable_external_rates,
            fiat_fallback_rates,
            er_api_url,
            frankfurter_api_url,
            currency_api_url,
            coingecko_api_url,
            coingecko_api_key,
            coingecko_warmup,
            provider_timeout: Duration::from_secs(timeout_secs),
            rate_limit_max_attempts,
        })
    }
}

fn parse_bool(env_map: &HashMap<String, String>, key: &str) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("must be true or false, got {}", v),
            )),
        },
    }
}

fn parse_number<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("must be a number, got {}", raw))
        }),
    }
}
