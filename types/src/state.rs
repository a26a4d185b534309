//! Storage keys and values.
//!
//! Every record lives under `sha256(prefix ‖ identifier)`. [`Key::path`] renders the unhashed
//! path with the exact ASCII prefixes shared by all nodes, and [`Key::digest`] is the fixed-width
//! key handed to the authenticated store. [`Value`] is the tagged union of everything the store
//! holds; [`Record`] converts between a value and the concrete record type a caller expects.

use bytes::{Buf, BufMut};
use commonware_codec::{DecodeExt, Encode, EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use malachite::Natural;

use crate::account::{AccountMetadata, CoreAccount};
use crate::claimable::Claimable;
use crate::codec::{
    byte_list_encode_size, bytes_encode_size, natural_encode_size, read_byte_list, read_bytes,
    read_natural, write_byte_list, write_bytes, write_natural, MAX_BYTES_LENGTH,
};
use crate::escrow::{Escrow, Trade};
use crate::fees::{FeeCounter, FeeDay, FeeTotals};
use crate::governance::{AuditRecord, Proposal, Vote};
use crate::lending::{FeeAccrual, Market, UserAccount};
use crate::primitives::{Address, Token};
use crate::refund::RefundThread;
use crate::staking::{AccountSnap, GlobalIndex};

/// Longest list stored under a single key.
pub const MAX_LIST_ITEMS: usize = 65_536;

pub const ACCOUNT_METADATA_PREFIX: &str = "account-meta:";
pub const USERNAME_INDEX_PREFIX: &str = "username-index:";
pub const STAKING_GLOBAL_INDEX: &str = "staking/globalIndex";
pub const STAKING_ACCOUNT_PREFIX: &str = "staking/account/";
pub const STAKING_YTD_PREFIX: &str = "staking/ytdEmissions/";
pub const CLAIMABLE_RECORD_PREFIX: &str = "claimable/record/";
pub const CLAIMABLE_NONCE_PREFIX: &str = "claimable/nonce/";
pub const ESCROW_RECORD_PREFIX: &str = "escrow/record/";
pub const ESCROW_VAULT_PREFIX: &str = "escrow/vault/";
pub const TRADE_RECORD_PREFIX: &str = "trade/record/";
pub const TRADE_ESCROW_INDEX_PREFIX: &str = "trade/index/escrow/";
pub const REFUND_THREAD_PREFIX: &str = "refund/thread/";
pub const GOV_PROPOSAL_PREFIX: &str = "gov/proposals/";
pub const GOV_PROPOSAL_SEQ: &str = "gov/seq";
pub const GOV_VOTE_PREFIX: &str = "gov/votes/";
pub const GOV_VOTE_INDEX_PREFIX: &str = "gov/vote-index/";
pub const GOV_ESCROW_PREFIX: &str = "gov/escrow/";
pub const GOV_AUDIT_PREFIX: &str = "gov/audit/";
pub const GOV_AUDIT_SEQ: &str = "gov/audit-seq";
pub const FEE_DAY_PREFIX: &str = "fees/day/";
pub const FEE_DAY_INDEX: &str = "fees/day/index";
pub const FEE_COUNTER_PREFIX: &str = "fees/counter/";
pub const FEE_TOTALS_PREFIX: &str = "fees/totals/";
pub const FEE_TOTALS_INDEX_PREFIX: &str = "fees/totals/index/";
pub const LOYALTY_BASE_DAILY_PREFIX: &str = "loyalty-meter:base-daily:";
pub const LOYALTY_BASE_TOTAL_PREFIX: &str = "loyalty-meter:base-total:";
pub const LOYALTY_PROGRAM_DAILY_PREFIX: &str = "loyalty-meter:program-daily:";
pub const LOYALTY_PROGRAM_DAILY_TOTAL_PREFIX: &str = "loyalty-meter:program-daily-total:";
pub const LOYALTY_PROGRAM_EPOCH_PREFIX: &str = "loyalty-meter:program-epoch:";
pub const LOYALTY_PROGRAM_ISSUANCE_PREFIX: &str = "loyalty-meter:program-issuance:";
pub const LENDING_MARKET_PREFIX: &str = "lending/market/";
pub const LENDING_FEES_PREFIX: &str = "lending/fees/";
pub const LENDING_USER_PREFIX: &str = "lending/user/";
pub const LENDING_POOL_INDEX: &str = "lending/pools/index";
pub const ROLE_PREFIX: &str = "role:";
pub const PARAM_PREFIX: &str = "params/";
pub const CUSTOM_PREFIX: &str = "kv/";

fn normalize(identifier: &str) -> String {
    identifier.trim().to_ascii_lowercase()
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    /// Execution-layer account, stored under the raw address.
    CoreAccount(Address),
    AccountMetadata(Address),
    Username(String),

    StakingGlobalIndex,
    StakingAccount(Address),
    StakingYtd(i32),

    ClaimableRecord(Digest),
    ClaimableNonce(Address),

    EscrowRecord(Digest),
    EscrowVault(Token, Digest),
    TradeRecord(Digest),
    TradeEscrowIndex(Digest),

    RefundThread(Digest),

    Proposal(u64),
    ProposalSeq,
    Vote(u64, Address),
    VoteIndex(u64),
    GovernanceEscrow(Address),
    Audit(u64),
    AuditSeq,

    FeeDay(String),
    FeeDayIndex,
    FeeCounter {
        domain: String,
        window: String,
        scope: String,
        address: Address,
    },
    FeeTotals {
        domain: String,
        asset: String,
        address: Address,
    },
    FeeTotalsIndex(String),

    LoyaltyBaseDaily(String, Address),
    LoyaltyBaseTotal(Address),
    LoyaltyProgramDaily(String, String, Address),
    LoyaltyProgramDailyTotal(String, String),
    LoyaltyProgramEpoch(String, u64),
    LoyaltyProgramIssuance(String, Address),

    LendingMarket(String),
    LendingFees(String),
    LendingUser(String, Address),
    LendingPoolIndex,

    /// Sorted member list of a named role.
    Role(String),

    Param(String),

    /// Caller-supplied path for records without a dedicated namespace, kept under
    /// [`CUSTOM_PREFIX`] so it cannot collide with a typed key.
    Custom(Vec<u8>),
}

impl Key {
    /// Unhashed storage path.
    pub fn path(&self) -> Vec<u8> {
        fn join(prefix: &str, id: &[u8]) -> Vec<u8> {
            let mut out = Vec::with_capacity(prefix.len() + id.len());
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(id);
            out
        }

        match self {
            Self::CoreAccount(address) => address.as_ref().to_vec(),
            Self::AccountMetadata(address) => join(ACCOUNT_METADATA_PREFIX, address.as_ref()),
            Self::Username(name) => join(USERNAME_INDEX_PREFIX, normalize(name).as_bytes()),

            Self::StakingGlobalIndex => STAKING_GLOBAL_INDEX.as_bytes().to_vec(),
            Self::StakingAccount(address) => join(STAKING_ACCOUNT_PREFIX, address.as_ref()),
            Self::StakingYtd(year) => format!("{STAKING_YTD_PREFIX}{year}").into_bytes(),

            Self::ClaimableRecord(id) => join(CLAIMABLE_RECORD_PREFIX, id.as_ref()),
            Self::ClaimableNonce(payer) => join(CLAIMABLE_NONCE_PREFIX, payer.as_ref()),

            Self::EscrowRecord(id) => join(ESCROW_RECORD_PREFIX, id.as_ref()),
            Self::EscrowVault(token, id) => join(
                &format!("{ESCROW_VAULT_PREFIX}{}:", token.symbol()),
                id.as_ref(),
            ),
            Self::TradeRecord(id) => join(TRADE_RECORD_PREFIX, id.as_ref()),
            Self::TradeEscrowIndex(escrow) => join(TRADE_ESCROW_INDEX_PREFIX, escrow.as_ref()),

            Self::RefundThread(origin) => join(REFUND_THREAD_PREFIX, origin.as_ref()),

            Self::Proposal(id) => format!("{GOV_PROPOSAL_PREFIX}{id}").into_bytes(),
            Self::ProposalSeq => GOV_PROPOSAL_SEQ.as_bytes().to_vec(),
            Self::Vote(id, voter) => {
                format!("{GOV_VOTE_PREFIX}{id}/{}", voter.to_hex()).into_bytes()
            }
            Self::VoteIndex(id) => format!("{GOV_VOTE_INDEX_PREFIX}{id}").into_bytes(),
            Self::GovernanceEscrow(address) => join(GOV_ESCROW_PREFIX, address.as_ref()),
            Self::Audit(seq) => format!("{GOV_AUDIT_PREFIX}{seq}").into_bytes(),
            Self::AuditSeq => GOV_AUDIT_SEQ.as_bytes().to_vec(),

            Self::FeeDay(day) => format!("{FEE_DAY_PREFIX}{}", normalize(day)).into_bytes(),
            Self::FeeDayIndex => FEE_DAY_INDEX.as_bytes().to_vec(),
            Self::FeeCounter {
                domain,
                window,
                scope,
                address,
            } => format!(
                "{FEE_COUNTER_PREFIX}{}/{}/{}/{}",
                normalize(domain),
                window.trim(),
                normalize(scope),
                address.to_hex()
            )
            .into_bytes(),
            Self::FeeTotals {
                domain,
                asset,
                address,
            } => format!(
                "{FEE_TOTALS_PREFIX}{}/{}/{}",
                normalize(domain),
                asset.trim().to_ascii_uppercase(),
                address.to_hex()
            )
            .into_bytes(),
            Self::FeeTotalsIndex(domain) => {
                format!("{FEE_TOTALS_INDEX_PREFIX}{}", normalize(domain)).into_bytes()
            }

            Self::LoyaltyBaseDaily(day, address) => join(
                &format!("{LOYALTY_BASE_DAILY_PREFIX}{}:", normalize(day)),
                address.as_ref(),
            ),
            Self::LoyaltyBaseTotal(address) => join(LOYALTY_BASE_TOTAL_PREFIX, address.as_ref()),
            Self::LoyaltyProgramDaily(program, day, address) => join(
                &format!(
                    "{LOYALTY_PROGRAM_DAILY_PREFIX}{}:{}:",
                    normalize(program),
                    normalize(day)
                ),
                address.as_ref(),
            ),
            Self::LoyaltyProgramDailyTotal(program, day) => format!(
                "{LOYALTY_PROGRAM_DAILY_TOTAL_PREFIX}{}:{}",
                normalize(program),
                normalize(day)
            )
            .into_bytes(),
            Self::LoyaltyProgramEpoch(program, epoch) => format!(
                "{LOYALTY_PROGRAM_EPOCH_PREFIX}{}:{epoch}",
                normalize(program)
            )
            .into_bytes(),
            Self::LoyaltyProgramIssuance(program, address) => join(
                &format!("{LOYALTY_PROGRAM_ISSUANCE_PREFIX}{}:", normalize(program)),
                address.as_ref(),
            ),

            Self::LendingMarket(pool) => {
                format!("{LENDING_MARKET_PREFIX}{}", pool.trim()).into_bytes()
            }
            Self::LendingFees(pool) => format!("{LENDING_FEES_PREFIX}{}", pool.trim()).into_bytes(),
            Self::LendingUser(pool, address) => join(
                &format!("{LENDING_USER_PREFIX}{}:", pool.trim()),
                address.as_ref(),
            ),
            Self::LendingPoolIndex => LENDING_POOL_INDEX.as_bytes().to_vec(),

            Self::Role(role) => format!("{ROLE_PREFIX}{}", role.trim()).into_bytes(),

            Self::Param(name) => format!("{PARAM_PREFIX}{}", name.trim()).into_bytes(),

            Self::Custom(path) => join(CUSTOM_PREFIX, path),
        }
    }

    /// Fixed-width key used by the backing store.
    pub fn digest(&self) -> Digest {
        Sha256::hash(&self.path())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    CoreAccount(CoreAccount),
    AccountMetadata(AccountMetadata),
    Address(Address),
    Digest(Digest),
    Amount(Natural),
    Counter(u64),
    Bytes(Vec<u8>),
    List(Vec<Vec<u8>>),

    GlobalIndex(GlobalIndex),
    AccountSnap(AccountSnap),

    Claimable(Claimable),
    Escrow(Escrow),
    Trade(Trade),
    RefundThread(RefundThread),

    Proposal(Proposal),
    Vote(Vote),
    AuditRecord(AuditRecord),

    FeeDay(FeeDay),
    FeeCounter(FeeCounter),
    FeeTotals(FeeTotals),

    LendingMarket(Market),
    LendingFees(FeeAccrual),
    LendingUser(UserAccount),
}

impl Value {
    /// Fails if [`Read`] would refuse the encoding of `self`, for example a string or list
    /// longer than its decode limit.
    pub fn check_encoding(&self) -> Result<(), Error> {
        Self::decode(self.encode()).map(|_| ())
    }

    /// Record type name, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CoreAccount(_) => "CoreAccount",
            Self::AccountMetadata(_) => "AccountMetadata",
            Self::Address(_) => "Address",
            Self::Digest(_) => "Digest",
            Self::Amount(_) => "Amount",
            Self::Counter(_) => "Counter",
            Self::Bytes(_) => "Bytes",
            Self::List(_) => "List",
            Self::GlobalIndex(_) => "GlobalIndex",
            Self::AccountSnap(_) => "AccountSnap",
            Self::Claimable(_) => "Claimable",
            Self::Escrow(_) => "Escrow",
            Self::Trade(_) => "Trade",
            Self::RefundThread(_) => "RefundThread",
            Self::Proposal(_) => "Proposal",
            Self::Vote(_) => "Vote",
            Self::AuditRecord(_) => "AuditRecord",
            Self::FeeDay(_) => "FeeDay",
            Self::FeeCounter(_) => "FeeCounter",
            Self::FeeTotals(_) => "FeeTotals",
            Self::LendingMarket(_) => "LendingMarket",
            Self::LendingFees(_) => "LendingFees",
            Self::LendingUser(_) => "LendingUser",
        }
    }
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::CoreAccount(core) => {
                0u8.write(writer);
                core.write(writer);
            }
            Self::AccountMetadata(meta) => {
                1u8.write(writer);
                meta.write(writer);
            }
            Self::Address(address) => {
                2u8.write(writer);
                address.write(writer);
            }
            Self::Digest(digest) => {
                3u8.write(writer);
                digest.write(writer);
            }
            Self::Amount(amount) => {
                4u8.write(writer);
                write_natural(amount, writer);
            }
            Self::Counter(counter) => {
                5u8.write(writer);
                counter.write(writer);
            }
            Self::Bytes(bytes) => {
                6u8.write(writer);
                write_bytes(bytes, writer);
            }
            Self::List(items) => {
                7u8.write(writer);
                write_byte_list(items, writer);
            }

            // Staking (tags 10-11)
            Self::GlobalIndex(index) => {
                10u8.write(writer);
                index.write(writer);
            }
            Self::AccountSnap(snap) => {
                11u8.write(writer);
                snap.write(writer);
            }

            // Payments (tags 20-23)
            Self::Claimable(claimable) => {
                20u8.write(writer);
                claimable.write(writer);
            }
            Self::Escrow(escrow) => {
                21u8.write(writer);
                escrow.write(writer);
            }
            Self::Trade(trade) => {
                22u8.write(writer);
                trade.write(writer);
            }
            Self::RefundThread(thread) => {
                23u8.write(writer);
                thread.write(writer);
            }

            // Governance (tags 30-32)
            Self::Proposal(proposal) => {
                30u8.write(writer);
                proposal.write(writer);
            }
            Self::Vote(vote) => {
                31u8.write(writer);
                vote.write(writer);
            }
            Self::AuditRecord(record) => {
                32u8.write(writer);
                record.write(writer);
            }

            // Fees (tags 40-42)
            Self::FeeDay(day) => {
                40u8.write(writer);
                day.write(writer);
            }
            Self::FeeCounter(counter) => {
                41u8.write(writer);
                counter.write(writer);
            }
            Self::FeeTotals(totals) => {
                42u8.write(writer);
                totals.write(writer);
            }

            // Lending (tags 50-52)
            Self::LendingMarket(market) => {
                50u8.write(writer);
                market.write(writer);
            }
            Self::LendingFees(fees) => {
                51u8.write(writer);
                fees.write(writer);
            }
            Self::LendingUser(account) => {
                52u8.write(writer);
                account.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::CoreAccount(CoreAccount::read(reader)?),
            1 => Self::AccountMetadata(AccountMetadata::read(reader)?),
            2 => Self::Address(Address::read(reader)?),
            3 => Self::Digest(Digest::read(reader)?),
            4 => Self::Amount(read_natural(reader)?),
            5 => Self::Counter(u64::read(reader)?),
            6 => Self::Bytes(read_bytes(reader, MAX_BYTES_LENGTH)?),
            7 => Self::List(read_byte_list(reader, MAX_LIST_ITEMS)?),

            10 => Self::GlobalIndex(GlobalIndex::read(reader)?),
            11 => Self::AccountSnap(AccountSnap::read(reader)?),

            20 => Self::Claimable(Claimable::read(reader)?),
            21 => Self::Escrow(Escrow::read(reader)?),
            22 => Self::Trade(Trade::read(reader)?),
            23 => Self::RefundThread(RefundThread::read(reader)?),

            30 => Self::Proposal(Proposal::read(reader)?),
            31 => Self::Vote(Vote::read(reader)?),
            32 => Self::AuditRecord(AuditRecord::read(reader)?),

            40 => Self::FeeDay(FeeDay::read(reader)?),
            41 => Self::FeeCounter(FeeCounter::read(reader)?),
            42 => Self::FeeTotals(FeeTotals::read(reader)?),

            50 => Self::LendingMarket(Market::read(reader)?),
            51 => Self::LendingFees(FeeAccrual::read(reader)?),
            52 => Self::LendingUser(UserAccount::read(reader)?),

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::CoreAccount(core) => core.encode_size(),
                Self::AccountMetadata(meta) => meta.encode_size(),
                Self::Address(_) => Address::SIZE,
                Self::Digest(_) => Digest::SIZE,
                Self::Amount(amount) => natural_encode_size(amount),
                Self::Counter(_) => u64::SIZE,
                Self::Bytes(bytes) => bytes_encode_size(bytes),
                Self::List(items) => byte_list_encode_size(items),

                Self::GlobalIndex(index) => index.encode_size(),
                Self::AccountSnap(snap) => snap.encode_size(),

                Self::Claimable(claimable) => claimable.encode_size(),
                Self::Escrow(escrow) => escrow.encode_size(),
                Self::Trade(trade) => trade.encode_size(),
                Self::RefundThread(thread) => thread.encode_size(),

                Self::Proposal(proposal) => proposal.encode_size(),
                Self::Vote(vote) => vote.encode_size(),
                Self::AuditRecord(record) => record.encode_size(),

                Self::FeeDay(day) => day.encode_size(),
                Self::FeeCounter(counter) => counter.encode_size(),
                Self::FeeTotals(totals) => totals.encode_size(),

                Self::LendingMarket(market) => market.encode_size(),
                Self::LendingFees(fees) => fees.encode_size(),
                Self::LendingUser(account) => account.encode_size(),
            }
    }
}

/// A concrete record stored inside a [`Value`].
pub trait Record: Sized {
    const KIND: &'static str;

    fn into_value(self) -> Value;

    /// Extracts the record, or returns the value unchanged if it holds another kind.
    fn from_value(value: Value) -> Result<Self, Value>;
}

macro_rules! impl_record {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: &'static str = stringify!($variant);

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_record! {
    CoreAccount => CoreAccount,
    AccountMetadata => AccountMetadata,
    Address => Address,
    Digest => Digest,
    Amount => Natural,
    Counter => u64,
    Bytes => Vec<u8>,
    List => Vec<Vec<u8>>,
    GlobalIndex => GlobalIndex,
    AccountSnap => AccountSnap,
    Claimable => Claimable,
    Escrow => Escrow,
    Trade => Trade,
    RefundThread => RefundThread,
    Proposal => Proposal,
    Vote => Vote,
    AuditRecord => AuditRecord,
    FeeDay => FeeDay,
    FeeCounter => FeeCounter,
    FeeTotals => FeeTotals,
    LendingMarket => Market,
    LendingFees => FeeAccrual,
    LendingUser => UserAccount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::hash_parts;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn paths_use_exact_prefixes() {
        let addr = Address::new([0xab; 20]);
        let mut meta = b"account-meta:".to_vec();
        meta.extend_from_slice(&[0xab; 20]);
        assert_eq!(Key::AccountMetadata(addr).path(), meta);
        assert_eq!(Key::CoreAccount(addr).path(), vec![0xab; 20]);
        assert_eq!(Key::Proposal(7).path(), b"gov/proposals/7".to_vec());
        assert_eq!(
            Key::Vote(7, addr).path(),
            format!("gov/votes/7/{}", "ab".repeat(20)).into_bytes()
        );
        assert_eq!(
            Key::StakingYtd(2024).path(),
            b"staking/ytdEmissions/2024".to_vec()
        );
        assert_eq!(
            Key::FeeDay(" 2024-01-02 ".into()).path(),
            b"fees/day/2024-01-02".to_vec()
        );
        assert_eq!(
            Key::Param("staking.aprBps".into()).path(),
            b"params/staking.aprBps".to_vec()
        );
        assert_eq!(
            Key::LendingMarket(" nhb-main ".into()).path(),
            b"lending/market/nhb-main".to_vec()
        );
        let mut user = b"lending/user/nhb-main:".to_vec();
        user.extend_from_slice(&[0xab; 20]);
        assert_eq!(Key::LendingUser("nhb-main".into(), addr).path(), user);
        assert_eq!(Key::Role(" minter ".into()).path(), b"role:minter".to_vec());
    }

    #[test]
    fn escrow_vault_path_names_the_token() {
        let id = Digest::from([1u8; 32]);
        let mut expected = b"escrow/vault/ZNHB:".to_vec();
        expected.extend_from_slice(&[1u8; 32]);
        assert_eq!(Key::EscrowVault(Token::Znhb, id).path(), expected);
    }

    #[test]
    fn usernames_are_case_insensitive() {
        assert_eq!(
            Key::Username("Alice".into()).digest(),
            Key::Username(" alice".into()).digest()
        );
    }

    #[test]
    fn loyalty_programs_are_case_insensitive() {
        let addr = Address::new([2u8; 20]);
        assert_eq!(
            Key::LoyaltyProgramEpoch("Coffee".into(), 3).path(),
            b"loyalty-meter:program-epoch:coffee:3".to_vec()
        );
        let day = String::from("2024-01-01");
        assert_eq!(
            Key::LoyaltyProgramDaily(" COFFEE ".into(), day.clone(), addr).digest(),
            Key::LoyaltyProgramDaily("coffee".into(), day.clone(), addr).digest()
        );
        assert_eq!(
            Key::LoyaltyProgramDailyTotal("Coffee".into(), day.clone()).digest(),
            Key::LoyaltyProgramDailyTotal("coffee".into(), day).digest()
        );
        assert_eq!(
            Key::LoyaltyProgramIssuance("Coffee".into(), addr).digest(),
            Key::LoyaltyProgramIssuance("coffee".into(), addr).digest()
        );
    }

    #[test]
    fn custom_paths_cannot_alias_typed_keys() {
        let addr = Address::new([0xab; 20]);
        let core = Key::CoreAccount(addr);
        assert_ne!(Key::Custom(core.path()).digest(), core.digest());
        assert_ne!(
            Key::Custom(b"gov/seq".to_vec()).digest(),
            Key::ProposalSeq.digest()
        );
        assert_eq!(
            Key::Custom(b"scratch".to_vec()).path(),
            b"kv/scratch".to_vec()
        );
    }

    #[test]
    fn encoding_check_matches_decode_limits() {
        assert!(Value::Bytes(vec![0u8; MAX_BYTES_LENGTH])
            .check_encoding()
            .is_ok());
        assert!(Value::Bytes(vec![0u8; MAX_BYTES_LENGTH + 1])
            .check_encoding()
            .is_err());

        let metadata = AccountMetadata {
            username: "x".repeat(2_000),
            ..AccountMetadata::default()
        };
        assert!(matches!(
            Value::AccountMetadata(metadata).check_encoding(),
            Err(Error::Invalid("String", "too long"))
        ));
    }

    #[test]
    fn digest_hashes_the_path() {
        let key = Key::ClaimableNonce(Address::new([3u8; 20]));
        assert_eq!(key.digest(), hash_parts(&[b"claimable/nonce/", &[3u8; 20]]));
        assert_ne!(
            Key::StakingAccount(Address::new([3u8; 20])).digest(),
            key.digest()
        );
    }

    #[test]
    fn record_conversion_rejects_other_kinds() {
        let value = Natural::from(5u32).into_value();
        assert_eq!(Natural::from_value(value.clone()), Ok(Natural::from(5u32)));
        assert_eq!(u64::from_value(value.clone()), Err(value));
    }

    #[test]
    fn value_codec_is_tagged() {
        let value = Value::List(vec![b"a".to_vec(), b"bc".to_vec()]);
        let encoded = value.encode();
        assert_eq!(encoded.len(), value.encode_size());
        assert_eq!(encoded[0], 7);
        assert_eq!(Value::decode(encoded).unwrap(), value);
        assert!(matches!(
            Value::decode(&[99u8][..]),
            Err(Error::InvalidEnum(99))
        ));
    }
}
