//! Transceiver interface
//!
//! The block-level primitives of an RFID reader. Tag detection,
//! anti-collision and the crypto handshake live behind this trait; the
//! terminal only sequences them.

use std::fmt;

use thiserror::Error;

use super::{Block, Key, Uid};

/// Which of the two sector keys an authentication uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    A,
    B,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "key A"),
            Self::B => write!(f, "key B"),
        }
    }
}

/// Failures reported by the transceiver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no tag in the field")]
    NoTag,

    #[error("tag {0} is not the selected tag")]
    UidMismatch(Uid),

    #[error("tag rejected {0}")]
    AuthRejected(KeyKind),

    #[error("block {0} is not authenticated")]
    NotAuthenticated(u8),

    #[error("block {0} does not exist")]
    NoSuchBlock(u8),

    #[error("block {0} is read-only")]
    ReadOnly(u8),

    #[error("tag did not answer")]
    Timeout,

    #[error("reader I/O error: {0}")]
    Io(String),
}

/// Block-level access to tags in the reader's field
pub trait TagTransport {
    /// Firmware version of the reader chip, `None` when no reader answers
    fn firmware_version(&mut self) -> Option<u8>;

    /// Whether an idle tag is in the field
    fn detect(&mut self) -> bool;

    /// Run anti-collision and return the UID of the tag
    fn uid(&mut self) -> Result<Uid, TransportError>;

    fn select(&mut self, uid: &Uid) -> Result<(), TransportError>;

    /// Authenticate the sector containing `block`
    fn authenticate(
        &mut self,
        kind: KeyKind,
        block: u8,
        key: &Key,
        uid: &Uid,
    ) -> Result<(), TransportError>;

    fn read_block(&mut self, block: u8) -> Result<Block, TransportError>;

    fn write_block(&mut self, block: u8, data: &Block) -> Result<(), TransportError>;

    /// Halt the tag; it stays silent until it re-enters the field
    fn release(&mut self, uid: &Uid);
}
