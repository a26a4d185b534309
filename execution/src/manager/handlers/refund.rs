use super::super::*;
use super::require_positive;
use commonware_cryptography::sha256::Digest;
use nhbchain_types::refund::{RefundLink, RefundThread, MAX_REFUNDS_PER_THREAD};
use tracing::debug;

impl<S: State> Manager<S> {
    pub async fn refund_thread(&self, origin: &Digest) -> Result<Option<RefundThread>, Error> {
        self.read(&Key::RefundThread(*origin)).await
    }

    /// Opens the refund thread for an origin payment.
    ///
    /// Recording the same origin again with the same amount returns the existing thread.
    pub async fn record_origin(
        &mut self,
        origin: &Digest,
        amount: Natural,
        timestamp: u64,
    ) -> Result<RefundThread, Error> {
        require_positive(&amount)?;
        if let Some(existing) = self.refund_thread(origin).await? {
            if existing.origin_amount != amount {
                return Err(Error::Conflict("origin already recorded with another amount"));
            }
            return Ok(existing);
        }
        let thread = RefundThread {
            origin_hash: *origin,
            origin_amount: amount,
            origin_timestamp: timestamp,
            cumulative_refunded: Natural::default(),
            refunds: Vec::new(),
        };
        store::put(&mut self.state, Key::RefundThread(*origin), thread.clone()).await?;
        Ok(thread)
    }

    /// Checks that `amount` more can be refunded against `origin`.
    pub async fn validate_refund(
        &self,
        origin: &Digest,
        amount: &Natural,
    ) -> Result<RefundThread, Error> {
        require_positive(amount)?;
        let thread = self
            .refund_thread(origin)
            .await?
            .ok_or(Error::NotFound("refund origin"))?;
        if *amount > thread.remaining() {
            return Err(Error::RefundExceedsOrigin);
        }
        Ok(thread)
    }

    /// Links refund `refund_tx` to `origin`. Re-applying the same transaction is a no-op.
    pub async fn apply_refund(
        &mut self,
        origin: &Digest,
        refund_tx: &Digest,
        amount: Natural,
        timestamp: u64,
    ) -> Result<RefundThread, Error> {
        if let Some(thread) = self.refund_thread(origin).await? {
            if let Some(link) = thread.refunds.iter().find(|link| link.tx_hash == *refund_tx) {
                if link.amount != amount {
                    return Err(Error::Conflict("refund already applied with another amount"));
                }
                return Ok(thread);
            }
        }

        let mut thread = self.validate_refund(origin, &amount).await?;
        if thread.refunds.len() >= MAX_REFUNDS_PER_THREAD {
            return Err(Error::InvalidState("too many refunds"));
        }
        thread.cumulative_refunded += &amount;
        thread.refunds.push(RefundLink {
            tx_hash: *refund_tx,
            amount,
            timestamp,
        });
        store::put(&mut self.state, Key::RefundThread(*origin), thread.clone()).await?;
        debug!(?origin, ?refund_tx, refunded = %thread.cumulative_refunded, "refund applied");
        Ok(thread)
    }
}
