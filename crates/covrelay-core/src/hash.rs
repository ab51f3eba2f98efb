//! Blake3 derivation of message identifiers.

use crate::types::{Address, CoverageRequest, DestinationId, MessageId};

/// Domain separator so envelope ids never collide with other Blake3 uses.
const ENVELOPE_DOMAIN: &[u8] = b"covrelay.envelope.v1";

/// Hasher for message envelopes.
///
/// The id is computed over:
/// `domain || source || destination || origin || sender || nonce || request`
/// with integers encoded big-endian. The sender nonce makes two otherwise
/// identical requests from the same sender produce distinct ids.
pub struct EnvelopeHasher;

impl EnvelopeHasher {
    /// Derives the id of an envelope from its content.
    #[must_use]
    pub fn message_id(
        source: DestinationId,
        destination: DestinationId,
        origin: Address,
        sender: Address,
        nonce: u64,
        request: &CoverageRequest,
    ) -> MessageId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ENVELOPE_DOMAIN);
        hasher.update(&source.get().to_be_bytes());
        hasher.update(&destination.get().to_be_bytes());
        hasher.update(origin.as_bytes());
        hasher.update(sender.as_bytes());
        hasher.update(&nonce.to_be_bytes());
        request.hash_into(&mut hasher);
        MessageId::from_bytes(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COVERAGE_UNIT, SECONDS_PER_DAY};

    fn request(premium: u128) -> CoverageRequest {
        CoverageRequest::new(
            Address::repeat_byte(3),
            COVERAGE_UNIT,
            SECONDS_PER_DAY,
            premium,
            DestinationId::new(5),
            42,
        )
        .unwrap()
    }

    #[test]
    fn test_message_id_is_deterministic() {
        let a = EnvelopeHasher::message_id(
            DestinationId::new(5),
            DestinationId::new(6),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            9,
            &request(1),
        );
        let b = EnvelopeHasher::message_id(
            DestinationId::new(5),
            DestinationId::new(6),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            9,
            &request(1),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_id_commits_to_payload_and_route() {
        let base = EnvelopeHasher::message_id(
            DestinationId::new(5),
            DestinationId::new(6),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            9,
            &request(1),
        );
        let other_payload = EnvelopeHasher::message_id(
            DestinationId::new(5),
            DestinationId::new(6),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            9,
            &request(2),
        );
        let other_route = EnvelopeHasher::message_id(
            DestinationId::new(5),
            DestinationId::new(7),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            9,
            &request(1),
        );
        assert_ne!(base, other_payload);
        assert_ne!(base, other_route);
    }
}
