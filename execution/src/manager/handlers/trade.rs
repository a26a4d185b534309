use super::super::*;
use commonware_cryptography::sha256::Digest;
use nhbchain_types::escrow::{Trade, TradeStatus};
use tracing::debug;

impl<S: State> Manager<S> {
    /// Stores `trade` after checking its invariants.
    pub async fn trade_put(&mut self, trade: Trade) -> Result<(), Error> {
        trade.sanitize()?;
        store::put(&mut self.state, Key::TradeRecord(trade.id), trade).await
    }

    pub async fn trade_get(&self, id: &Digest) -> Result<Option<Trade>, Error> {
        self.read(&Key::TradeRecord(*id)).await
    }

    /// Moves a trade to `status`. Settled, cancelled and expired trades are final.
    pub async fn trade_set_status(
        &mut self,
        id: &Digest,
        status: TradeStatus,
    ) -> Result<Trade, Error> {
        let mut trade = self.trade_get(id).await?.ok_or(Error::NotFound("trade"))?;
        if trade.status == status {
            return Ok(trade);
        }
        if trade.status.is_terminal() {
            return Err(Error::InvalidState("trade already final"));
        }
        trade.status = status;
        self.trade_put(trade.clone()).await?;
        debug!(?id, ?status, "trade status updated");
        Ok(trade)
    }

    /// Points `escrow_id` at the trade it belongs to.
    pub async fn trade_index_escrow(
        &mut self,
        escrow_id: &Digest,
        trade_id: &Digest,
    ) -> Result<(), Error> {
        store::put(&mut self.state, Key::TradeEscrowIndex(*escrow_id), *trade_id).await
    }

    pub async fn trade_lookup_by_escrow(
        &self,
        escrow_id: &Digest,
    ) -> Result<Option<Digest>, Error> {
        self.read(&Key::TradeEscrowIndex(*escrow_id)).await
    }

    pub async fn trade_remove_escrow_index(&mut self, escrow_id: &Digest) -> Result<(), Error> {
        store::delete(&mut self.state, &Key::TradeEscrowIndex(*escrow_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{address, manager};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use nhbchain_types::escrow::EscrowInvariantError;
    use nhbchain_types::{hash_parts, Token};

    fn trade() -> Trade {
        Trade {
            id: hash_parts(&[b"trade"]),
            offer_id: "offer-1".into(),
            buyer: address(1),
            seller: address(2),
            quote_token: Token::Nhb,
            quote_amount: Natural::from(100u32),
            escrow_quote: hash_parts(&[b"quote"]),
            base_token: Token::Znhb,
            base_amount: Natural::from(50u32),
            escrow_base: hash_parts(&[b"base"]),
            deadline: 2_000,
            created_at: 1_000,
            funded_at: 0,
            slippage_bps: 50,
            status: TradeStatus::Init,
        }
    }

    #[test]
    fn status_moves_until_final() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let trade = trade();
            manager.trade_put(trade.clone()).await.unwrap();
            assert_eq!(manager.trade_get(&trade.id).await.unwrap(), Some(trade.clone()));

            manager
                .trade_set_status(&trade.id, TradeStatus::Funded)
                .await
                .unwrap();
            let settled = manager
                .trade_set_status(&trade.id, TradeStatus::Settled)
                .await
                .unwrap();
            assert_eq!(settled.status, TradeStatus::Settled);
            assert!(matches!(
                manager
                    .trade_set_status(&trade.id, TradeStatus::Disputed)
                    .await,
                Err(Error::InvalidState(_))
            ));
            assert!(matches!(
                manager
                    .trade_set_status(&hash_parts(&[b"missing"]), TradeStatus::Funded)
                    .await,
                Err(Error::NotFound("trade"))
            ));
        });
    }

    #[test]
    fn put_rejects_invalid_trades() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let mut bad = trade();
            bad.slippage_bps = 10_001;
            assert!(matches!(
                manager.trade_put(bad).await,
                Err(Error::InvalidEscrow(EscrowInvariantError::SlippageOutOfRange { .. }))
            ));
        });
    }

    #[test]
    fn escrow_index_round_trip() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let trade = trade();
            manager
                .trade_index_escrow(&trade.escrow_base, &trade.id)
                .await
                .unwrap();
            assert_eq!(
                manager.trade_lookup_by_escrow(&trade.escrow_base).await.unwrap(),
                Some(trade.id)
            );
            manager
                .trade_remove_escrow_index(&trade.escrow_base)
                .await
                .unwrap();
            assert_eq!(
                manager.trade_lookup_by_escrow(&trade.escrow_base).await.unwrap(),
                None
            );
        });
    }
}
