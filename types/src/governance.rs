//! Governance proposals, ballots and the audit trail.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use malachite::Natural;

use crate::codec::{
    natural_encode_size, read_natural, read_string, string_encode_size, write_natural,
    write_string, MAX_STRING_LENGTH,
};
use crate::primitives::Address;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    #[default]
    Unspecified,
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
    Failed,
    Expired,
    Executed,
}

impl Write for ProposalStatus {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Unspecified => 0,
            Self::DepositPeriod => 1,
            Self::VotingPeriod => 2,
            Self::Passed => 3,
            Self::Rejected => 4,
            Self::Failed => 5,
            Self::Expired => 6,
            Self::Executed => 7,
        };
        tag.write(writer);
    }
}

impl Read for ProposalStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::DepositPeriod),
            2 => Ok(Self::VotingPeriod),
            3 => Ok(Self::Passed),
            4 => Ok(Self::Rejected),
            5 => Ok(Self::Failed),
            6 => Ok(Self::Expired),
            7 => Ok(Self::Executed),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for ProposalStatus {
    const SIZE: usize = u8::SIZE;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub metadata_uri: String,
    pub submitter: Address,
    pub status: ProposalStatus,
    pub deposit: Natural,
    pub submit_time: u64,
    pub voting_start: u64,
    pub voting_end: u64,
    pub timelock_end: u64,
    pub target: String,
    pub proposed_change: String,
    pub queued: bool,
}

impl Write for Proposal {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.title, writer);
        write_string(&self.summary, writer);
        write_string(&self.metadata_uri, writer);
        self.submitter.write(writer);
        self.status.write(writer);
        write_natural(&self.deposit, writer);
        self.submit_time.write(writer);
        self.voting_start.write(writer);
        self.voting_end.write(writer);
        self.timelock_end.write(writer);
        write_string(&self.target, writer);
        write_string(&self.proposed_change, writer);
        self.queued.write(writer);
    }
}

impl Read for Proposal {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u64::read(reader)?,
            title: read_string(reader, MAX_STRING_LENGTH)?,
            summary: read_string(reader, MAX_STRING_LENGTH * 8)?,
            metadata_uri: read_string(reader, MAX_STRING_LENGTH)?,
            submitter: Address::read(reader)?,
            status: ProposalStatus::read(reader)?,
            deposit: read_natural(reader)?,
            submit_time: u64::read(reader)?,
            voting_start: u64::read(reader)?,
            voting_end: u64::read(reader)?,
            timelock_end: u64::read(reader)?,
            target: read_string(reader, MAX_STRING_LENGTH)?,
            proposed_change: read_string(reader, MAX_STRING_LENGTH * 8)?,
            queued: bool::read(reader)?,
        })
    }
}

impl EncodeSize for Proposal {
    fn encode_size(&self) -> usize {
        u64::SIZE
            + string_encode_size(&self.title)
            + string_encode_size(&self.summary)
            + string_encode_size(&self.metadata_uri)
            + Address::SIZE
            + ProposalStatus::SIZE
            + natural_encode_size(&self.deposit)
            + u64::SIZE * 4
            + string_encode_size(&self.target)
            + string_encode_size(&self.proposed_change)
            + bool::SIZE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Abstain => "abstain",
        }
    }
}

impl Write for VoteChoice {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Yes => 1,
            Self::No => 2,
            Self::Abstain => 3,
        };
        tag.write(writer);
    }
}

impl Read for VoteChoice {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            1 => Ok(Self::Yes),
            2 => Ok(Self::No),
            3 => Ok(Self::Abstain),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for VoteChoice {
    const SIZE: usize = u8::SIZE;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub proposal_id: u64,
    pub voter: Address,
    pub choice: VoteChoice,
    pub power_bps: u32,
    pub timestamp: u64,
}

impl Write for Vote {
    fn write(&self, writer: &mut impl BufMut) {
        self.proposal_id.write(writer);
        self.voter.write(writer);
        self.choice.write(writer);
        self.power_bps.write(writer);
        self.timestamp.write(writer);
    }
}

impl Read for Vote {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            proposal_id: u64::read(reader)?,
            voter: Address::read(reader)?,
            choice: VoteChoice::read(reader)?,
            power_bps: u32::read(reader)?,
            timestamp: u64::read(reader)?,
        })
    }
}

impl FixedSize for Vote {
    const SIZE: usize = u64::SIZE + Address::SIZE + VoteChoice::SIZE + u32::SIZE + u64::SIZE;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuditEvent {
    Proposed,
    Vote,
    Finalized,
    Queued,
    Executed,
    Failed,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Vote => "vote",
            Self::Finalized => "finalized",
            Self::Queued => "queued",
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }
}

impl Write for AuditEvent {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Proposed => 0,
            Self::Vote => 1,
            Self::Finalized => 2,
            Self::Queued => 3,
            Self::Executed => 4,
            Self::Failed => 5,
        };
        tag.write(writer);
    }
}

impl Read for AuditEvent {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Proposed),
            1 => Ok(Self::Vote),
            2 => Ok(Self::Finalized),
            3 => Ok(Self::Queued),
            4 => Ok(Self::Executed),
            5 => Ok(Self::Failed),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for AuditEvent {
    const SIZE: usize = u8::SIZE;
}

/// Immutable governance lifecycle entry, ordered by `sequence`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub sequence: u64,
    pub timestamp: u64,
    pub event: AuditEvent,
    pub proposal_id: u64,
    pub actor: Option<Address>,
    pub details: String,
}

impl Write for AuditRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.sequence.write(writer);
        self.timestamp.write(writer);
        self.event.write(writer);
        self.proposal_id.write(writer);
        self.actor.write(writer);
        write_string(&self.details, writer);
    }
}

impl Read for AuditRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            sequence: u64::read(reader)?,
            timestamp: u64::read(reader)?,
            event: AuditEvent::read(reader)?,
            proposal_id: u64::read(reader)?,
            actor: Option::<Address>::read(reader)?,
            details: read_string(reader, MAX_STRING_LENGTH * 8)?,
        })
    }
}

impl EncodeSize for AuditRecord {
    fn encode_size(&self) -> usize {
        u64::SIZE * 3
            + AuditEvent::SIZE
            + self.actor.encode_size()
            + string_encode_size(&self.details)
    }
}
