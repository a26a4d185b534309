use super::super::*;
use super::require_address;
use chrono::{Duration, NaiveDate};
use commonware_utils::from_hex_formatted;
use nhbchain_types::fees::{FeeCounter, FeeDay, FeeTotals, FEE_WINDOW_DAYS};
use nhbchain_types::Address;
use tracing::debug;

/// Lifetime totals for one payer and asset within a fee domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeTotalsEntry {
    pub asset: String,
    pub address: Address,
    pub totals: FeeTotals,
}

fn require_domain(domain: &str) -> Result<(), Error> {
    if domain.trim().is_empty() {
        return Err(Error::InvalidArgument("fee domain required"));
    }
    Ok(())
}

fn require_window(window: &str) -> Result<(), Error> {
    let window = window.trim();
    let valid = window.len() == 6
        && window.bytes().all(|b| b.is_ascii_digit())
        && matches!(window[4..].parse::<u32>(), Ok(1..=12));
    if !valid {
        return Err(Error::InvalidArgument("fee window must be YYYYMM"));
    }
    Ok(())
}

fn totals_entry(asset: &str, address: &Address) -> Vec<u8> {
    format!("{}/{}", asset.trim().to_ascii_uppercase(), address.to_hex()).into_bytes()
}

impl<S: State> Manager<S> {
    // === Rolling window ===

    pub async fn fee_day(&self, day: &str) -> Result<FeeDay, Error> {
        if day.trim().is_empty() {
            return Err(Error::InvalidArgument("day required"));
        }
        self.read_or_default(&Key::FeeDay(day.to_string())).await
    }

    /// Days currently tracked by the rolling window, oldest first.
    pub async fn fee_days(&self) -> Result<Vec<String>, Error> {
        Ok(store::get_list(&self.state, &Key::FeeDayIndex)
            .await?
            .into_iter()
            .map(|day| String::from_utf8_lossy(&day).into_owned())
            .collect())
    }

    /// Adds net fees collected at `timestamp` to that UTC day's bucket.
    pub async fn record_fee_day(
        &mut self,
        timestamp: u64,
        net_nhb: Natural,
        net_znhb: Natural,
    ) -> Result<FeeDay, Error> {
        let day = day_id(timestamp)?;
        let mut bucket = self.fee_day(&day).await?;
        bucket.net_nhb += net_nhb;
        bucket.net_znhb += net_znhb;

        let mut days = self.fee_days().await?;
        days.push(day.clone());
        days.sort();
        days.dedup();
        if days.len() > FEE_WINDOW_DAYS {
            days.drain(..days.len() - FEE_WINDOW_DAYS);
        }
        let index: Vec<Vec<u8>> = days.into_iter().map(String::into_bytes).collect();

        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(&mut journal, Key::FeeDay(day.clone()), bucket.clone())
                .await?;
            self.write(&mut journal, Key::FeeDayIndex, index).await
        }
        .await;
        self.commit(journal, result).await?;
        debug!(day, "fee day recorded");
        Ok(bucket)
    }

    /// Net fees for the seven UTC days ending on the day of `now`.
    pub async fn net_fees_7d(&self, now: u64) -> Result<FeeDay, Error> {
        let today = utc(now)?.date_naive();
        let start = today - Duration::days(FEE_WINDOW_DAYS as i64 - 1);
        let mut total = FeeDay::default();
        for day in self.fee_days().await? {
            let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") else {
                continue;
            };
            if date < start || date > today {
                continue;
            }
            let bucket = self.fee_day(&day).await?;
            total.net_nhb += bucket.net_nhb;
            total.net_znhb += bucket.net_znhb;
        }
        Ok(total)
    }

    // === Counters ===

    pub async fn fee_counter(
        &self,
        domain: &str,
        window: &str,
        scope: &str,
        address: &Address,
    ) -> Result<FeeCounter, Error> {
        let key = self.counter_key(domain, window, scope, address)?;
        self.read_or_default(&key).await
    }

    pub async fn put_fee_counter(
        &mut self,
        domain: &str,
        window: &str,
        scope: &str,
        address: &Address,
        counter: FeeCounter,
    ) -> Result<(), Error> {
        let key = self.counter_key(domain, window, scope, address)?;
        store::put(&mut self.state, key, counter).await
    }

    fn counter_key(
        &self,
        domain: &str,
        window: &str,
        scope: &str,
        address: &Address,
    ) -> Result<Key, Error> {
        require_domain(domain)?;
        require_window(window)?;
        require_address(address)?;
        Ok(Key::FeeCounter {
            domain: domain.to_string(),
            window: window.to_string(),
            scope: scope.to_string(),
            address: *address,
        })
    }

    // === Totals ===

    pub async fn fee_totals(
        &self,
        domain: &str,
        asset: &str,
        address: &Address,
    ) -> Result<FeeTotals, Error> {
        require_domain(domain)?;
        require_address(address)?;
        self.read_or_default(&Key::FeeTotals {
            domain: domain.to_string(),
            asset: asset.to_string(),
            address: *address,
        })
        .await
    }

    /// Adds a charge of `gross` carrying `fee` to the payer's totals.
    pub async fn accumulate_fee_totals(
        &mut self,
        domain: &str,
        asset: &str,
        address: &Address,
        gross: Natural,
        fee: Natural,
    ) -> Result<FeeTotals, Error> {
        if asset.trim().is_empty() {
            return Err(Error::InvalidArgument("asset required"));
        }
        if fee > gross {
            return Err(Error::InvalidArgument("fee exceeds gross"));
        }
        let mut totals = self.fee_totals(domain, asset, address).await?;
        totals.net += &gross - &fee;
        totals.gross += gross;
        totals.fee += fee;

        let index_key = Key::FeeTotalsIndex(domain.to_string());
        let mut index = store::get_list(&self.state, &index_key).await?;
        let entry = totals_entry(asset, address);
        if !index.contains(&entry) {
            index.push(entry);
        }

        let key = Key::FeeTotals {
            domain: domain.to_string(),
            asset: asset.to_string(),
            address: *address,
        };
        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(&mut journal, key, totals.clone()).await?;
            self.write(&mut journal, index_key, index).await
        }
        .await;
        self.commit(journal, result).await?;
        Ok(totals)
    }

    /// Every payer and asset with totals in `domain`, in the order first charged.
    pub async fn fee_totals_list(&self, domain: &str) -> Result<Vec<FeeTotalsEntry>, Error> {
        require_domain(domain)?;
        let index_key = Key::FeeTotalsIndex(domain.to_string());
        let index = store::get_list(&self.state, &index_key).await?;
        let mut entries = Vec::with_capacity(index.len());
        for raw in index {
            let raw = String::from_utf8_lossy(&raw).into_owned();
            let Some((asset, hex)) = raw.split_once('/') else {
                continue;
            };
            let Some(address) =
                from_hex_formatted(hex).and_then(|bytes| Address::from_slice(&bytes))
            else {
                continue;
            };
            let totals = self.fee_totals(domain, asset, &address).await?;
            entries.push(FeeTotalsEntry {
                asset: asset.to_string(),
                address,
                totals,
            });
        }
        Ok(entries)
    }
}
