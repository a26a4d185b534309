use super::super::*;
use nhbchain_types::staking::SECONDS_PER_DAY;
use std::str::FromStr;
use tracing::debug;

pub(super) const PAUSES: &str = "system/pauses";
pub(super) const STAKING_APR_BPS: &str = "staking.aprBps";
pub(super) const STAKING_PAYOUT_PERIOD_DAYS: &str = "staking.payoutPeriodDays";
pub(super) const STAKING_MAX_EMISSION: &str = "staking.maxEmissionPerYearWei";

/// Staking knobs in effect for one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct StakingParams {
    pub apr_bps: u64,
    pub payout_period_days: u64,
    /// Zero disables the cap.
    pub max_emission_per_year: Natural,
}

impl StakingParams {
    pub fn period_secs(&self) -> u64 {
        self.payout_period_days * SECONDS_PER_DAY
    }
}

fn param_key(name: &str) -> Result<Key, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("parameter name required"));
    }
    Ok(Key::Param(name.to_string()))
}

fn parse_decimal<T: FromStr>(name: &'static str, raw: &[u8]) -> Result<T, Error> {
    let invalid = || Error::InvalidParam {
        name,
        value: String::from_utf8_lossy(raw).into_owned(),
    };
    std::str::from_utf8(raw)
        .map_err(|_| invalid())?
        .trim()
        .parse()
        .map_err(|_| invalid())
}

impl<S: State> Manager<S> {
    pub async fn param_put(&mut self, name: &str, value: Vec<u8>) -> Result<(), Error> {
        let key = param_key(name)?;
        store::put(&mut self.state, key, value).await?;
        debug!(name = name.trim(), "parameter updated");
        Ok(())
    }

    pub async fn param_get(&self, name: &str) -> Result<Option<Vec<u8>>, Error> {
        self.read(&param_key(name)?).await
    }

    async fn pauses(&self) -> Result<Vec<String>, Error> {
        let raw = self.param_get(PAUSES).await?.unwrap_or_default();
        Ok(String::from_utf8_lossy(&raw)
            .split(',')
            .map(|module| module.trim().to_ascii_lowercase())
            .filter(|module| !module.is_empty())
            .collect())
    }

    pub async fn is_paused(&self, module: &str) -> Result<bool, Error> {
        let module = module.trim().to_ascii_lowercase();
        Ok(self.pauses().await?.contains(&module))
    }

    /// Adds or removes `module` from the pause list.
    pub async fn set_module_paused(&mut self, module: &str, paused: bool) -> Result<(), Error> {
        let module = module.trim().to_ascii_lowercase();
        if module.is_empty() {
            return Err(Error::InvalidArgument("module required"));
        }
        let mut pauses = self.pauses().await?;
        pauses.retain(|existing| *existing != module);
        if paused {
            pauses.push(module);
        }
        pauses.sort();
        self.param_put(PAUSES, pauses.join(",").into_bytes()).await
    }

    pub(super) async fn require_unpaused(&self, module: &'static str) -> Result<(), Error> {
        if self.is_paused(module).await? {
            return Err(Error::Paused(module));
        }
        Ok(())
    }

    /// Stored staking parameters, falling back to the configured defaults.
    pub(super) async fn staking_params(&self) -> Result<StakingParams, Error> {
        let apr_bps = match self.param_get(STAKING_APR_BPS).await? {
            Some(raw) => parse_decimal(STAKING_APR_BPS, &raw)?,
            None => self.config.apr_bps,
        };
        let payout_period_days = match self.param_get(STAKING_PAYOUT_PERIOD_DAYS).await? {
            Some(raw) => parse_decimal(STAKING_PAYOUT_PERIOD_DAYS, &raw)?,
            None => self.config.payout_period_days,
        };
        if payout_period_days == 0 || payout_period_days.checked_mul(SECONDS_PER_DAY).is_none() {
            return Err(Error::InvalidParam {
                name: STAKING_PAYOUT_PERIOD_DAYS,
                value: payout_period_days.to_string(),
            });
        }
        let max_emission_per_year = match self.param_get(STAKING_MAX_EMISSION).await? {
            Some(raw) if !raw.iter().all(u8::is_ascii_whitespace) => {
                parse_decimal(STAKING_MAX_EMISSION, &raw)?
            }
            _ => self.config.max_emission_per_year.clone(),
        };
        Ok(StakingParams {
            apr_bps,
            payout_period_days,
            max_emission_per_year,
        })
    }
}
