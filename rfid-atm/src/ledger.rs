//! Balance block encoding
//!
//! The balance lives in a 16-byte block as plain ASCII decimal digits,
//! scaled by ten (one implied decimal digit). Decoding keeps every digit byte
//! in order and skips everything else, so `"1\x002"` reads as 12. An empty
//! digit run reads as zero. Encoding writes the digits from the start of the
//! block and zero-fills the rest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tag::{Block, BLOCK_SIZE};

/// Stored amounts are the logical amount times this factor
pub const SCALE: u64 = 10;

/// Errors encoding a balance
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{digits} digits do not fit in a 16-byte block")]
    TooManyDigits { digits: usize },
}

/// How balances are scaled between the menu and the card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Statement shows the stored value as is; deposit and withdraw rescale
    /// `stored ± amount` by ten. Matches cards written by existing terminals.
    #[default]
    Literal,
    /// Stored value is always logical × 10 and statement divides it back
    Consistent,
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => write!(f, "literal"),
            Self::Consistent => write!(f, "consistent"),
        }
    }
}

impl FromStr for ScaleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal" => Ok(Self::Literal),
            "consistent" => Ok(Self::Consistent),
            other => Err(format!(
                "unknown scale mode {:?} (expected literal or consistent)",
                other
            )),
        }
    }
}

/// Digit bytes of a block, in order
pub fn digits(block: &Block) -> String {
    block
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect()
}

/// Decode a balance block
///
/// At most 16 digits, so the value always fits in a `u64`.
pub fn decode(block: &Block) -> u64 {
    block
        .iter()
        .filter(|b| b.is_ascii_digit())
        .fold(0u64, |acc, &b| acc * 10 + u64::from(b - b'0'))
}

/// Encode a balance block
pub fn encode(value: u64) -> Result<Block, LedgerError> {
    let text = value.to_string();
    if text.len() > BLOCK_SIZE {
        return Err(LedgerError::TooManyDigits { digits: text.len() });
    }
    let mut block = [0u8; BLOCK_SIZE];
    block[..text.len()].copy_from_slice(text.as_bytes());
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &[u8]) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block[..text.len()].copy_from_slice(text);
        block
    }

    #[test]
    fn test_decode_plain_digits() {
        assert_eq!(decode(&block(b"100")), 100);
        assert_eq!(decode(&block(b"0050")), 50);
    }

    #[test]
    fn test_decode_empty_is_zero() {
        assert_eq!(decode(&[0u8; BLOCK_SIZE]), 0);
        assert_eq!(decode(&[0xFF; BLOCK_SIZE]), 0);
        assert_eq!(digits(&[0u8; BLOCK_SIZE]), "");
    }

    #[test]
    fn test_decode_drops_interior_bytes() {
        assert_eq!(decode(&block(b"1\x002")), 12);
        assert_eq!(decode(&block(b"a1b2c3")), 123);
        assert_eq!(digits(&block(b"12 $ 34")), "1234");
    }

    #[test]
    fn test_decode_full_block() {
        assert_eq!(decode(b"9999999999999999"), 9_999_999_999_999_999);
    }

    #[test]
    fn test_encode_zero_fills() {
        let encoded = encode(1050).unwrap();
        assert_eq!(&encoded[..4], b"1050");
        assert!(encoded[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_rejects_seventeen_digits() {
        assert_eq!(
            encode(10_000_000_000_000_000),
            Err(LedgerError::TooManyDigits { digits: 17 })
        );
        assert!(encode(9_999_999_999_999_999).is_ok());
    }

    #[test]
    fn test_decode_encode_preserves_value() {
        for value in [0, 7, 10, 100, 1050, 123_456_789, 9_999_999_999_999_999] {
            assert_eq!(decode(&encode(value).unwrap()), value);
        }
    }

    #[test]
    fn test_reencoding_is_stable_but_lossy() {
        let original = block(b"1x2y3");
        let once = encode(decode(&original)).unwrap();
        let twice = encode(decode(&once)).unwrap();
        assert_ne!(once, original);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scale_mode_parse() {
        assert_eq!("literal".parse::<ScaleMode>(), Ok(ScaleMode::Literal));
        assert_eq!("Consistent".parse::<ScaleMode>(), Ok(ScaleMode::Consistent));
        assert!("metric".parse::<ScaleMode>().is_err());
        assert_eq!(ScaleMode::default(), ScaleMode::Literal);
    }
}
