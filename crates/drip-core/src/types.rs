//! Core data types: identifiers, change events, reward entries, ledgers.
//!
//! All token amounts are `u128` in the smallest token unit.
//! Identifiers are fixed-width byte arrays with a `0x`-prefixed hex text form;
//! human-readable serializers (JSON, TOML) see the hex string, binary
//! serializers see the raw bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseIdError;

/// Parse `0x`-prefixed (or bare) hex into a fixed-width byte array.
fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() != N * 2 {
        return Err(ParseIdError::InvalidLength {
            expected: N * 2,
            got: digits.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
    Ok(out)
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            bincode::Encode, bincode::Decode,
        )]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width of the identifier in bytes.
            pub const LEN: usize = $len;

            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Return the underlying bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Check if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed_hex::<$len>(s).map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.collect_str(self)
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    s.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; $len]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

fixed_bytes!(
    /// A 32-byte hash value (leaf hashes, tree nodes, Merkle roots).
    Hash256,
    32
);

fixed_bytes!(
    /// Identity of a staking provider. Keys every per-participant container.
    ParticipantId,
    20
);

fixed_bytes!(
    /// Address entitled to receive transferred tokens for a participant.
    Address,
    20
);

/// Serde helper writing `u128` amounts as decimal strings.
///
/// JSON numbers lose precision above 2^53 in most consumers, so amounts
/// always travel as strings. Deserialization also accepts plain integers.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}

/// [`decimal`] for optional amounts (caps, limits).
pub mod decimal_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<u128>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super::decimal")] u128);

        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(v)| v))
    }
}

/// Which clock an [`Interval`] is measured on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Unix seconds.
    #[default]
    Timestamp,
    /// Block numbers.
    Block,
}

/// Half-open accounting window `[start, end)`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Length of the window. Zero for empty or inverted windows.
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Start-inclusive, end-exclusive membership.
    pub fn contains(&self, position: u64) -> bool {
        self.start <= position && position < self.end
    }
}

/// The staking quantity a reward program accrues on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackedQuantity {
    Stake,
    Authorization,
}

/// What a [`ChangeEvent`] changed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StakeIncreased,
    StakeDecreased,
    AuthorizationIncreased,
    AuthorizationDecreased,
}

impl EventKind {
    /// The quantity this kind of event moves.
    pub fn tracked(&self) -> TrackedQuantity {
        match self {
            Self::StakeIncreased | Self::StakeDecreased => TrackedQuantity::Stake,
            Self::AuthorizationIncreased | Self::AuthorizationDecreased => {
                TrackedQuantity::Authorization
            }
        }
    }
}

/// A single balance or authorization change for one participant.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub participant: ParticipantId,
    #[serde(with = "decimal")]
    pub from_amount: u128,
    #[serde(with = "decimal")]
    pub to_amount: u128,
    pub block_number: u64,
    pub timestamp: u64,
    pub kind: EventKind,
}

impl ChangeEvent {
    /// Position of the event on the given clock.
    pub fn position(&self, basis: Basis) -> u64 {
        match basis {
            Basis::Timestamp => self.timestamp,
            Basis::Block => self.block_number,
        }
    }
}

/// Time-weighted average of a participant's tracked quantity over an interval.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccruedBalance {
    pub participant: ParticipantId,
    pub weighted_average: u128,
}

/// One program's reward for one participant in one run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardEntry {
    pub participant: ParticipantId,
    pub beneficiary: Address,
    /// Amount after penalties. This is what the combiner adds.
    #[serde(with = "decimal")]
    pub amount: u128,
    /// Amount as computed by the stream calculator, before penalties.
    #[serde(with = "decimal")]
    pub base_amount: u128,
}

impl RewardEntry {
    /// A fresh entry with no penalty applied.
    pub fn new(participant: ParticipantId, beneficiary: Address, amount: u128) -> Self {
        Self {
            participant,
            beneficiary,
            amount,
            base_amount: amount,
        }
    }
}

/// One participant's row in the cumulative ledger.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub beneficiary: Address,
    #[serde(with = "decimal")]
    pub cumulative_amount: u128,
}

/// Total-to-date rewards per participant.
///
/// Ordered by participant so iteration, serialization and tree building are
/// deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct CumulativeLedger {
    entries: BTreeMap<ParticipantId, LedgerEntry>,
}

impl CumulativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&LedgerEntry> {
        self.entries.get(participant)
    }

    /// Cumulative amount for a participant, zero if absent.
    pub fn amount_of(&self, participant: &ParticipantId) -> u128 {
        self.entries
            .get(participant)
            .map(|e| e.cumulative_amount)
            .unwrap_or(0)
    }

    pub fn insert(
        &mut self,
        participant: ParticipantId,
        entry: LedgerEntry,
    ) -> Option<LedgerEntry> {
        self.entries.insert(participant, entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &LedgerEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all cumulative amounts. Returns `None` on overflow.
    pub fn total(&self) -> Option<u128> {
        self.entries
            .values()
            .try_fold(0u128, |acc, e| acc.checked_add(e.cumulative_amount))
    }
}

impl FromIterator<(ParticipantId, LedgerEntry)> for CumulativeLedger {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, LedgerEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
