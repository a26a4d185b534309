//! nhbchain state engine.
//!
//! Applies account, staking-reward, claimable, escrow, trade, refund, governance, fee, loyalty,
//! lending-storage and role operations to a hashed key-value store. The primary entrypoint is
//! [`Manager`], which owns a [`State`] and exposes every operation as an async method.
//!
//! ## Determinism requirements
//! - Time is always supplied by the caller; execution never reads the wall clock.
//! - Amounts are arbitrary-precision naturals and fixed-point math floors; no floats.
//! - Stored lists keep insertion order; nothing iterates a hash-based collection into state.
//!
//! ## Atomicity
//! Operations that write more than one record journal the previous contents of every key they
//! touch. If a later write fails, the earlier ones are undone with compensating writes and the
//! original error is returned.
//!
//! ## Example
//! ```rust,ignore
//! use nhbchain_execution::{mocks::funded_manager, Leg};
//! use nhbchain_types::Token;
//!
//! # async fn example() -> Result<(), nhbchain_execution::Error> {
//! let mut manager = funded_manager(&[(alice, 100, 0)]).await;
//! manager.move_funds(&alice, &bob, Token::Nhb, 40u32.into()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod manager;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use config::{Config, ConfigError, ValidatedConfig};
pub use error::Error;
pub use manager::{
    ClaimOutcome, ClaimableOutcome, EngagementKind, EscrowOutcome, EscrowRequest, FeeTotalsEntry,
    Leg, Manager, Resolution,
};
pub use state::{Adb, Journal, State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
