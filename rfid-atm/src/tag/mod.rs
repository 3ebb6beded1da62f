//! Tag memory access
//!
//! A tag is a MIFARE Classic style card: 64 blocks of 16 bytes, grouped in
//! sectors of four blocks, each sector guarded by a key A and a key B.

pub mod simulated;
pub mod store;
pub mod transport;

pub use simulated::{CardFileError, SimulatedCard, SimulatedReader};
pub use store::{AuthKeys, TagStore};
pub use transport::{KeyKind, TagTransport, TransportError};

use std::fmt;

/// Size of one memory block in bytes
pub const BLOCK_SIZE: usize = 16;

/// Size of an authentication key in bytes
pub const KEY_SIZE: usize = 6;

/// Block holding the balance digits
pub const BALANCE_BLOCK: u8 = 1;

/// Block holding the password bytes
pub const PASSWORD_BLOCK: u8 = 5;

/// One memory block
pub type Block = [u8; BLOCK_SIZE];

/// One authentication key
pub type Key = [u8; KEY_SIZE];

/// Tag serial number as returned by anti-collision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid(Vec<u8>);

impl Uid {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// The card currently selected on the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    uid: Uid,
}

impl Token {
    pub fn new(uid: Uid) -> Self {
        Self { uid }
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_display_is_upper_hex() {
        let uid = Uid::new(vec![0xDE, 0xAD, 0x0B, 0x01]);
        assert_eq!(uid.to_string(), "DEAD0B01");
    }

    #[test]
    fn test_token_keeps_uid() {
        let token = Token::new(Uid::new(vec![1, 2, 3, 4]));
        assert_eq!(token.uid().as_bytes(), &[1, 2, 3, 4]);
    }
}
