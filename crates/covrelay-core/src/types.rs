//! Identifiers, amounts and the payloads carried between relays.
//!
//! [`Address`] and [`MessageId`] render as `0x`-prefixed lowercase hex and
//! parse from the same form, which is also their serde representation.
//! [`CoverageRequest`] can only be built through a constructor that enforces
//! the coverage bounds, and deserialization goes through the same check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::RelayError;
use crate::hash::EnvelopeHasher;
use crate::validator;

/// Fixed-point amount in base units (see [`crate::constants::COVERAGE_UNIT`]).
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

// =============================================================================
// Identifier parsing
// =============================================================================

/// Errors from parsing a hex identifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentifierParseError {
    /// The text does not start with `0x`.
    #[error("identifier must start with 0x")]
    MissingPrefix,

    /// The hex body has the wrong number of characters.
    #[error("expected {expected} hex characters, found {actual}")]
    WrongLength {
        /// Expected number of hex characters.
        expected: usize,
        /// Number of hex characters found.
        actual: usize,
    },

    /// The body contains a non-hex character.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

fn parse_hex_fixed<const N: usize>(text: &str) -> Result<[u8; N], IdentifierParseError> {
    let body = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or(IdentifierParseError::MissingPrefix)?;
    if body.len() != N * 2 {
        return Err(IdentifierParseError::WrongLength {
            expected: N * 2,
            actual: body.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(body, &mut out)?;
    Ok(out)
}

// =============================================================================
// DestinationId
// =============================================================================

/// Opaque selector for a target network.
///
/// Zero is never a valid destination; the registry rejects it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DestinationId(u64);

impl DestinationId {
    /// Wraps a raw selector.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw selector.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` for the reserved zero selector.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for DestinationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Address
// =============================================================================

/// Size of an [`Address`] in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// A 20-byte account or endpoint identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_SIZE]);

    /// Wraps raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Address whose every byte is `byte`. Handy for fixtures.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ADDRESS_SIZE])
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Returns `true` for [`Address::ZERO`].
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_SIZE]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed::<ADDRESS_SIZE>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// MessageId
// =============================================================================

/// Size of a [`MessageId`] in bytes.
pub const MESSAGE_ID_SIZE: usize = 32;

/// Content-derived identifier of a [`MessageEnvelope`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId([u8; MESSAGE_ID_SIZE]);

impl MessageId {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MESSAGE_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MESSAGE_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({self})")
    }
}

impl FromStr for MessageId {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed::<MESSAGE_ID_SIZE>(s).map(Self)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// PolicyId
// =============================================================================

/// Identifier the coverage pool assigns to a materialized policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(u64);

impl PolicyId {
    /// Wraps a raw policy number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw policy number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy-{}", self.0)
    }
}

// =============================================================================
// CoverageRequest
// =============================================================================

/// A holder's request for parametric coverage.
///
/// Immutable once built. The amount and duration satisfy the validator
/// bounds for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCoverageRequest", into = "RawCoverageRequest")]
pub struct CoverageRequest {
    holder: Address,
    amount: Amount,
    duration_secs: u64,
    premium: Amount,
    source_chain: DestinationId,
    created_at: Timestamp,
}

impl CoverageRequest {
    /// Builds a request, enforcing the coverage amount and duration bounds.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::CoverageAmountOutOfRange`] or
    /// [`RelayError::DurationOutOfRange`] when a bound is violated.
    pub fn new(
        holder: Address,
        amount: Amount,
        duration_secs: u64,
        premium: Amount,
        source_chain: DestinationId,
        created_at: Timestamp,
    ) -> Result<Self, RelayError> {
        validator::validate(amount, duration_secs)?;
        Ok(Self {
            holder,
            amount,
            duration_secs,
            premium,
            source_chain,
            created_at,
        })
    }

    /// Identity that will hold the policy.
    #[must_use]
    pub const fn holder(&self) -> Address {
        self.holder
    }

    /// Coverage amount in base units.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Coverage duration in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Premium paid on the source chain, in base units.
    #[must_use]
    pub const fn premium(&self) -> Amount {
        self.premium
    }

    /// Chain on which the request was created.
    #[must_use]
    pub const fn source_chain(&self) -> DestinationId {
        self.source_chain
    }

    /// Creation time on the source chain.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Feeds the canonical big-endian encoding of every field to `hasher`.
    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.holder.as_bytes());
        hasher.update(&self.amount.to_be_bytes());
        hasher.update(&self.duration_secs.to_be_bytes());
        hasher.update(&self.premium.to_be_bytes());
        hasher.update(&self.source_chain.get().to_be_bytes());
        hasher.update(&self.created_at.to_be_bytes());
    }
}

/// Unchecked wire form of [`CoverageRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoverageRequest {
    holder: Address,
    amount: Amount,
    duration_secs: u64,
    premium: Amount,
    source_chain: DestinationId,
    created_at: Timestamp,
}

impl TryFrom<RawCoverageRequest> for CoverageRequest {
    type Error = RelayError;

    fn try_from(raw: RawCoverageRequest) -> Result<Self, Self::Error> {
        Self::new(
            raw.holder,
            raw.amount,
            raw.duration_secs,
            raw.premium,
            raw.source_chain,
            raw.created_at,
        )
    }
}

impl From<CoverageRequest> for RawCoverageRequest {
    fn from(request: CoverageRequest) -> Self {
        Self {
            holder: request.holder,
            amount: request.amount,
            duration_secs: request.duration_secs,
            premium: request.premium,
            source_chain: request.source_chain,
            created_at: request.created_at,
        }
    }
}

// =============================================================================
// MessageEnvelope
// =============================================================================

/// The unit of cross-chain transmission.
///
/// The [`MessageId`] commits to every other field, so a relay can recompute
/// it on receipt with [`MessageEnvelope::verify_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageEnvelope {
    message_id: MessageId,
    source: DestinationId,
    destination: DestinationId,
    origin: Address,
    sender: Address,
    nonce: u64,
    payload: CoverageRequest,
}

impl MessageEnvelope {
    /// Seals a new envelope, deriving its id from the content.
    #[must_use]
    pub fn seal(
        source: DestinationId,
        destination: DestinationId,
        origin: Address,
        sender: Address,
        nonce: u64,
        payload: CoverageRequest,
    ) -> Self {
        let message_id =
            EnvelopeHasher::message_id(source, destination, origin, sender, nonce, &payload);
        Self {
            message_id,
            source,
            destination,
            origin,
            sender,
            nonce,
            payload,
        }
    }

    /// Reassembles an envelope decoded from a transport frame.
    ///
    /// The declared id is taken as-is; receivers must call
    /// [`MessageEnvelope::verify_id`] before trusting it.
    #[must_use]
    pub const fn from_parts(
        message_id: MessageId,
        source: DestinationId,
        destination: DestinationId,
        origin: Address,
        sender: Address,
        nonce: u64,
        payload: CoverageRequest,
    ) -> Self {
        Self {
            message_id,
            source,
            destination,
            origin,
            sender,
            nonce,
            payload,
        }
    }

    /// Checks that the declared id matches the content.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::EnvelopeIntegrity`] on mismatch.
    pub fn verify_id(&self) -> Result<(), RelayError> {
        let computed = EnvelopeHasher::message_id(
            self.source,
            self.destination,
            self.origin,
            self.sender,
            self.nonce,
            &self.payload,
        );
        if computed == self.message_id {
            Ok(())
        } else {
            Err(RelayError::EnvelopeIntegrity {
                declared: self.message_id,
                computed,
            })
        }
    }

    /// Declared message id.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Chain the envelope was sealed on.
    #[must_use]
    pub const fn source(&self) -> DestinationId {
        self.source
    }

    /// Chain the envelope is addressed to.
    #[must_use]
    pub const fn destination(&self) -> DestinationId {
        self.destination
    }

    /// Endpoint address of the sealing relay.
    #[must_use]
    pub const fn origin(&self) -> Address {
        self.origin
    }

    /// Identity that called `send_coverage` on the source relay.
    #[must_use]
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// Sender nonce issued by the source relay.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The relayed coverage request.
    #[must_use]
    pub const fn payload(&self) -> &CoverageRequest {
        &self.payload
    }
}
