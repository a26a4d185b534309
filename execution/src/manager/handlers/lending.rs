use super::super::*;
use super::require_address;
use nhbchain_types::lending::{FeeAccrual, Market, UserAccount};
use nhbchain_types::Address;
use tracing::debug;

fn pool_id(raw: &str) -> Result<&str, Error> {
    let pool = raw.trim();
    if pool.is_empty() {
        return Err(Error::InvalidArgument("pool id required"));
    }
    Ok(pool)
}

impl<S: State> Manager<S> {
    // === Markets ===

    /// Market for `pool`, if it has been initialised.
    pub async fn lending_market(&self, pool: &str) -> Result<Option<Market>, Error> {
        let pool = pool_id(pool)?;
        let market: Option<Market> = self.read(&Key::LendingMarket(pool.to_string())).await?;
        Ok(market.map(|market| Market {
            pool_id: pool.to_string(),
            ..market
        }))
    }

    /// Stores `market` under `pool` and adds the pool to the index the first time it is seen.
    pub async fn put_lending_market(&mut self, pool: &str, market: Market) -> Result<(), Error> {
        let pool = pool_id(pool)?.to_string();
        let market = Market {
            pool_id: pool.clone(),
            ..market
        };
        let mut index = store::get_list(&self.state, &Key::LendingPoolIndex).await?;
        let indexed = index.iter().any(|id| id == pool.as_bytes());
        if !indexed {
            index.push(pool.clone().into_bytes());
        }

        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(&mut journal, Key::LendingMarket(pool.clone()), market)
                .await?;
            if !indexed {
                self.write(&mut journal, Key::LendingPoolIndex, index)
                    .await?;
            }
            Ok(())
        }
        .await;
        self.commit(journal, result).await?;
        debug!(pool = %pool, "lending market stored");
        Ok(())
    }

    /// Pool identifiers in the order their markets were first stored.
    pub async fn lending_pool_ids(&self) -> Result<Vec<String>, Error> {
        Ok(store::get_list(&self.state, &Key::LendingPoolIndex)
            .await?
            .into_iter()
            .map(|id| String::from_utf8_lossy(&id).into_owned())
            .collect())
    }

    /// Every indexed market; pools whose market record is missing are skipped.
    pub async fn lending_markets(&self) -> Result<Vec<Market>, Error> {
        let mut markets = Vec::new();
        for pool in self.lending_pool_ids().await? {
            if let Some(market) = self.lending_market(&pool).await? {
                markets.push(market);
            }
        }
        Ok(markets)
    }

    // === Fees ===

    pub async fn lending_fee_accrual(&self, pool: &str) -> Result<Option<FeeAccrual>, Error> {
        let pool = pool_id(pool)?;
        self.read(&Key::LendingFees(pool.to_string())).await
    }

    pub async fn put_lending_fee_accrual(
        &mut self,
        pool: &str,
        fees: FeeAccrual,
    ) -> Result<(), Error> {
        let pool = pool_id(pool)?;
        store::put(&mut self.state, Key::LendingFees(pool.to_string()), fees).await
    }

    // === Positions ===

    pub async fn lending_user_account(
        &self,
        pool: &str,
        address: &Address,
    ) -> Result<Option<UserAccount>, Error> {
        let pool = pool_id(pool)?;
        require_address(address)?;
        self.read(&Key::LendingUser(pool.to_string(), *address))
            .await
    }

    /// Stores a position under its own address.
    pub async fn put_lending_user_account(
        &mut self,
        pool: &str,
        account: UserAccount,
    ) -> Result<(), Error> {
        let pool = pool_id(pool)?;
        require_address(&account.address)?;
        let key = Key::LendingUser(pool.to_string(), account.address);
        store::put(&mut self.state, key, account).await
    }
}
