use commonware_utils::from_hex_formatted;
use malachite::Natural;
use nhbchain_types::staking::{DEFAULT_APR_BPS, DEFAULT_PAYOUT_PERIOD_DAYS, SECONDS_PER_DAY};
use nhbchain_types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

const fn default_apr_bps() -> u64 {
    DEFAULT_APR_BPS
}

const fn default_payout_period_days() -> u64 {
    DEFAULT_PAYOUT_PERIOD_DAYS
}

const fn default_unbonding_period_secs() -> u64 {
    21 * SECONDS_PER_DAY
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Engine configuration, usually loaded from YAML.
///
/// Values here are fallbacks: parameters written to the on-chain parameter store take
/// precedence at execution time.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_apr_bps")]
    pub apr_bps: u64,
    #[serde(default = "default_payout_period_days")]
    pub payout_period_days: u64,
    /// Decimal wei; absent or zero disables the cap.
    #[serde(default)]
    pub max_emission_per_year: Option<String>,
    #[serde(default = "default_unbonding_period_secs")]
    pub unbonding_period_secs: u64,
    /// Hex address receiving escrow release fees.
    #[serde(default)]
    pub fee_treasury: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apr_bps: default_apr_bps(),
            payout_period_days: default_payout_period_days(),
            max_emission_per_year: None,
            unbonding_period_secs: default_unbonding_period_secs(),
            fee_treasury: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} out of range (got {value}, max {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("{field} must be a decimal integer: {value}")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("{field} must be a 20-byte hex address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub apr_bps: u64,
    pub payout_period_days: u64,
    pub max_emission_per_year: Natural,
    pub unbonding_period_secs: u64,
    pub fee_treasury: Option<Address>,
    pub log_level: Level,
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        Self {
            apr_bps: DEFAULT_APR_BPS,
            payout_period_days: DEFAULT_PAYOUT_PERIOD_DAYS,
            max_emission_per_year: Natural::default(),
            unbonding_period_secs: default_unbonding_period_secs(),
            fee_treasury: None,
            log_level: Level::INFO,
        }
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    from_hex_formatted(value)
        .and_then(|bytes| Address::from_slice(&bytes))
        .ok_or_else(|| ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        })
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.payout_period_days == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "payout_period_days",
                value: 0,
            });
        }
        let max_days = u64::MAX / SECONDS_PER_DAY;
        if self.payout_period_days > max_days {
            return Err(ConfigError::OutOfRange {
                field: "payout_period_days",
                value: self.payout_period_days,
                max: max_days,
            });
        }

        let max_emission_per_year = match self.max_emission_per_year.as_deref().map(str::trim) {
            None | Some("") => Natural::default(),
            Some(raw) => Natural::from_str(raw).map_err(|_| ConfigError::InvalidDecimal {
                field: "max_emission_per_year",
                value: raw.to_string(),
            })?,
        };

        let fee_treasury = self
            .fee_treasury
            .as_deref()
            .map(|raw| parse_address("fee_treasury", raw))
            .transpose()?;

        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        Ok(ValidatedConfig {
            apr_bps: self.apr_bps,
            payout_period_days: self.payout_period_days,
            max_emission_per_year,
            unbonding_period_secs: self.unbonding_period_secs,
            fee_treasury,
            log_level,
        })
    }
}
