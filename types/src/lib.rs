pub mod account;
pub mod claimable;
pub mod codec;
pub mod escrow;
pub mod fees;
pub mod fixed;
pub mod governance;
pub mod lending;
pub mod primitives;
pub mod refund;
pub mod staking;
pub mod state;

pub use account::{Account, AccountMetadata, CoreAccount, Engagement, PendingUnbond};
pub use fixed::Uq128x128;
pub use primitives::{hash_parts, module_address, vault_address, Address, Token};
pub use state::{Key, Record, Value};
