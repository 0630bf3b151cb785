//! Runtime configuration, built once at startup and passed down by reference.

use crate::api::football_api::API_FOOTBALL_BASE_URL;
use crate::api::openai_api::OPENAI_BASE_URL;
use crate::scheduler::{FetchSchedule, ScheduleError, DEFAULT_FETCH_SCHEDULE};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set in environment or .env file")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid FETCH_SCHEDULE: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Upstream sports data API
#[derive(Debug, Clone)]
pub struct ApiFootballConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Knobs for the fetch-and-enrich job
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub window_days: u32,
    pub odds_bookmaker: u32, // 8 = Bet365
    pub odds_bet: u32,       // 1 = Match Winner
    pub h2h_last: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            window_days: 3,
            odds_bookmaker: 8,
            odds_bet: 1,
            h2h_last: 10,
        }
    }
}

/// Chat completions API used by the betslip endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiFootballConfig,
    pub pipeline: PipelineConfig,
    pub schedule: FetchSchedule,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub jwt_secret: Option<String>,
}

impl Config {
    /// Load `.env` and read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("API_FOOTBALL_KEY").ok_or(ConfigError::Missing("API_FOOTBALL_KEY"))?;

        let defaults = PipelineConfig::default();
        let window_days = parse_or(&get, "FETCH_WINDOW_DAYS", defaults.window_days)?;
        if window_days == 0 {
            return Err(ConfigError::Invalid {
                key: "FETCH_WINDOW_DAYS",
                value: window_days.to_string(),
            });
        }

        let schedule = match get("FETCH_SCHEDULE") {
            Some(expr) => expr.parse::<FetchSchedule>()?,
            None => DEFAULT_FETCH_SCHEDULE.parse::<FetchSchedule>()?,
        };

        Ok(Self {
            api: ApiFootballConfig {
                api_key,
                base_url: get("API_FOOTBALL_BASE_URL")
                    .unwrap_or_else(|| API_FOOTBALL_BASE_URL.to_string()),
            },
            pipeline: PipelineConfig {
                data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
                window_days,
                odds_bookmaker: parse_or(&get, "ODDS_BOOKMAKER", defaults.odds_bookmaker)?,
                odds_bet: parse_or(&get, "ODDS_BET", defaults.odds_bet)?,
                h2h_last: parse_or(&get, "H2H_LAST", defaults.h2h_last)?,
            },
            schedule,
            llm: LlmConfig {
                api_key: get("OPENAI_API_KEY"),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                max_tokens: parse_or(&get, "OPENAI_MAX_TOKENS", 300)?,
            },
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_or(&get, "PORT", 5000)?,
            },
            jwt_secret: get("JWT_SECRET"),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}
