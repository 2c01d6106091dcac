//! Helpers for reading ABI-encoded 32-byte words out of raw logs.
//!
//! Indexed parameters live in `topics[1..]`; non-indexed parameters are
//! concatenated 32-byte words in `data`. Everything here is bounds- and
//! shape-checked: a malformed log surfaces as a [`DecodeError`] naming
//! the event and offending field.

use alloy_primitives::{Address, B256, U256};
use tally_core::error::DecodeError;

/// Check that a log carries exactly `expected` topics (topic0 included).
pub fn require_topics(
    event: &'static str,
    topics: &[B256],
    expected: usize,
) -> Result<(), DecodeError> {
    if topics.len() != expected {
        return Err(DecodeError::TopicCount {
            event,
            expected,
            actual: topics.len(),
        });
    }
    Ok(())
}

/// Read an indexed `bytes32` topic. Caller must have checked the count.
pub fn topic_b256(topics: &[B256], index: usize) -> B256 {
    topics[index]
}

/// Read an indexed `address` topic: a 20-byte address right-aligned in a
/// 32-byte word, with zero padding in the leading 12 bytes.
pub fn topic_address(
    event: &'static str,
    topics: &[B256],
    index: usize,
) -> Result<Address, DecodeError> {
    let word = topics[index];
    if word[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::MalformedAddressTopic { event, index });
    }
    Ok(Address::from_slice(&word[12..]))
}

/// Read the `word`-th 32-byte word of the non-indexed data section.
pub fn data_word(
    event: &'static str,
    data: &[u8],
    word: usize,
) -> Result<[u8; 32], DecodeError> {
    let start = word * 32;
    let end = start + 32;
    if data.len() < end {
        return Err(DecodeError::DataOutOfRange {
            event,
            word,
            len: data.len(),
        });
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&data[start..end]);
    Ok(out)
}

/// Read a `uint256` data word.
pub fn data_u256(event: &'static str, data: &[u8], word: usize) -> Result<U256, DecodeError> {
    Ok(U256::from_be_bytes(data_word(event, data, word)?))
}

/// Read a `uint8` data word: the value sits in the last byte, the
/// leading 31 bytes must be zero.
pub fn data_u8(
    event: &'static str,
    field: &'static str,
    data: &[u8],
    word: usize,
) -> Result<u8, DecodeError> {
    let bytes = data_word(event, data, word)?;
    if bytes[..31].iter().any(|b| *b != 0) {
        return Err(DecodeError::ValueOutOfRange {
            event,
            field,
            value: U256::from_be_bytes(bytes).to_string(),
        });
    }
    Ok(bytes[31])
}

/// Read a `uint256` data word that must fit in an `i64` (internal row ids).
pub fn data_i64(
    event: &'static str,
    field: &'static str,
    data: &[u8],
    word: usize,
) -> Result<i64, DecodeError> {
    let value = data_u256(event, data, word)?;
    i64::try_from(value).map_err(|_| DecodeError::ValueOutOfRange {
        event,
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    fn word_with_value(v: u64) -> Vec<u8> {
        let mut data = vec![0u8; 32];
        data[24..].copy_from_slice(&v.to_be_bytes());
        data
    }

    #[test]
    fn test_topic_address_strips_padding() {
        let topics = vec![
            B256::ZERO,
            b256!("0000000000000000000000001234567890123456789012345678901234567890"),
        ];
        let addr = topic_address("Test", &topics, 1).unwrap();
        assert_eq!(
            addr,
            alloy_primitives::address!("1234567890123456789012345678901234567890")
        );
    }

    #[test]
    fn test_topic_address_rejects_nonzero_padding() {
        let topics = vec![
            B256::ZERO,
            b256!("ff00000000000000000000001234567890123456789012345678901234567890"),
        ];
        let err = topic_address("Test", &topics, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedAddressTopic { index: 1, .. }
        ));
    }

    #[test]
    fn test_data_u256_reads_words_in_order() {
        let mut data = word_with_value(7);
        data.extend(word_with_value(11));
        assert_eq!(data_u256("Test", &data, 0).unwrap(), U256::from(7));
        assert_eq!(data_u256("Test", &data, 1).unwrap(), U256::from(11));
    }

    #[test]
    fn test_data_word_out_of_range() {
        let data = word_with_value(7);
        let err = data_u256("Test", &data, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DataOutOfRange { word: 1, len: 32, .. }
        ));
        // Les données tronquées échouent aussi
        let err = data_u256("Test", &data[..16], 0).unwrap_err();
        assert!(matches!(err, DecodeError::DataOutOfRange { len: 16, .. }));
    }

    #[test]
    fn test_data_u8_rejects_dirty_leading_bytes() {
        let mut data = vec![0u8; 32];
        data[0] = 1;
        data[31] = 2;
        let err = data_u8("Test", "outcome", &data, 0).unwrap_err();
        assert!(matches!(err, DecodeError::ValueOutOfRange { .. }));

        assert_eq!(data_u8("Test", "outcome", &word_with_value(2), 0).unwrap(), 2);
    }

    #[test]
    fn test_data_i64_rejects_overflow() {
        let mut data = vec![0xffu8; 32];
        data[0] = 0x7f;
        let err = data_i64("Test", "prediction_market_id", &data, 0).unwrap_err();
        assert!(matches!(err, DecodeError::ValueOutOfRange { .. }));

        assert_eq!(
            data_i64("Test", "prediction_market_id", &word_with_value(42), 0).unwrap(),
            42
        );
    }
}
