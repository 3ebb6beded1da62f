//! Authenticated block storage
//!
//! Every block access authenticates first: key A, then key B if the tag
//! rejects key A. One pass per call, nothing is retried beyond that fallback.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::transport::{KeyKind, TagTransport};
use super::{Block, Key, Token};
use crate::error::AtmError;
use crate::report::{ReportSink, SuccessCode};

/// Factory default MIFARE key
pub const DEFAULT_KEY: Key = [0xFF; 6];

/// The two keys shared by every card the terminal serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthKeys {
    pub key_a: Key,
    pub key_b: Key,
}

impl Default for AuthKeys {
    fn default() -> Self {
        Self {
            key_a: DEFAULT_KEY,
            key_b: DEFAULT_KEY,
        }
    }
}

/// Authenticated read/write of tag blocks
pub struct TagStore<T> {
    transport: T,
    keys: AuthKeys,
}

impl<T: TagTransport> TagStore<T> {
    pub fn new(transport: T, keys: AuthKeys) -> Self {
        Self { transport, keys }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Authenticate the sector of `block`, key A first
    ///
    /// Returns the key that was accepted. The accepted key is announced on
    /// the sink; a rejection by both keys is left to the caller to report.
    fn authenticate(
        &mut self,
        block: u8,
        token: &Token,
        sink: &mut dyn ReportSink,
    ) -> Result<KeyKind, AtmError> {
        let attempts = [(KeyKind::A, self.keys.key_a), (KeyKind::B, self.keys.key_b)];
        for (kind, key) in attempts {
            match self.transport.authenticate(kind, block, &key, token.uid()) {
                Ok(()) => {
                    debug!("Block {} authenticated with {}", block, kind);
                    sink.message(&format!("Authenticated with {}", kind));
                    return Ok(kind);
                }
                Err(e) => debug!("Block {}: {} failed: {}", block, kind, e),
            }
        }
        Err(AtmError::Auth(block))
    }

    /// Read one block
    pub fn read(
        &mut self,
        block: u8,
        token: &Token,
        sink: &mut dyn ReportSink,
    ) -> Result<Block, AtmError> {
        if let Err(e) = self.authenticate(block, token, sink) {
            warn!("Read of block {} on tag {}: {}", block, token.uid(), e);
            e.report(sink);
            return Err(e);
        }

        match self.transport.read_block(block) {
            Ok(data) => {
                sink.success(SuccessCode::Reading);
                Ok(data)
            }
            Err(e) => {
                warn!("Failed to read block {}: {}", block, e);
                let err = AtmError::Read(block);
                err.report(sink);
                Err(err)
            }
        }
    }

    /// Write one block
    pub fn write(
        &mut self,
        block: u8,
        data: &Block,
        token: &Token,
        sink: &mut dyn ReportSink,
    ) -> Result<(), AtmError> {
        if let Err(e) = self.authenticate(block, token, sink) {
            warn!("Write of block {} on tag {}: {}", block, token.uid(), e);
            e.report(sink);
            return Err(e);
        }

        match self.transport.write_block(block, data) {
            Ok(()) => {
                sink.success(SuccessCode::Writing);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to write block {}: {}", block, e);
                let err = AtmError::Write(block);
                err.report(sink);
                Err(err)
            }
        }
    }
}
