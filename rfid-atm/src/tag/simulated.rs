//! Simulated reader and card
//!
//! Stands in for the RC522 transceiver so the terminal can run without
//! hardware. The simulated card's memory can be kept in a JSON card file,
//! which is saved after every successful block write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::AuthKeys;
use super::transport::{KeyKind, TagTransport, TransportError};
use super::{Block, Key, Uid, BLOCK_SIZE};
use crate::config::AtmConfig;
use crate::ledger;

/// Number of blocks on a 1K card
pub const TOTAL_BLOCKS: usize = 64;

/// Blocks per sector; the last one is the sector trailer
pub const BLOCKS_PER_SECTOR: u8 = 4;

/// Firmware version reported by an RC522 v2.0
pub const RC522_FIRMWARE: u8 = 0x92;

/// Custom serde module for base64 encoding of byte vectors
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Card memory as a list of base64 strings, one per block
mod base64_blocks {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Block, TOTAL_BLOCKS};

    pub fn serialize<S>(blocks: &[Block], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(blocks.len()))?;
        for block in blocks {
            seq.serialize_element(&STANDARD.encode(block))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Block>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Vec<String> = Deserialize::deserialize(deserializer)?;
        if encoded.len() != TOTAL_BLOCKS {
            return Err(serde::de::Error::custom(format!(
                "expected {} blocks, found {}",
                TOTAL_BLOCKS,
                encoded.len()
            )));
        }
        encoded
            .iter()
            .map(|s| {
                let bytes = STANDARD.decode(s).map_err(serde::de::Error::custom)?;
                Block::try_from(bytes.as_slice()).map_err(|_| {
                    serde::de::Error::custom(format!("block has {} bytes", bytes.len()))
                })
            })
            .collect()
    }
}

/// Errors loading or saving a card file
#[derive(Debug, Error)]
pub enum CardFileError {
    #[error("cannot access card file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed card file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("card file {0:?} already exists")]
    Exists(PathBuf),
}

/// Memory and keys of one simulated card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedCard {
    #[serde(with = "base64_bytes")]
    pub uid: Vec<u8>,
    pub key_a: Key,
    pub key_b: Key,
    #[serde(with = "base64_blocks")]
    blocks: Vec<Block>,
}

impl SimulatedCard {
    /// Blank card with factory keys
    pub fn new(uid: Vec<u8>) -> Self {
        Self::with_keys(uid, AuthKeys::default())
    }

    /// Blank card whose sectors open with `keys`
    pub fn with_keys(uid: Vec<u8>, keys: AuthKeys) -> Self {
        let mut blocks = vec![[0u8; BLOCK_SIZE]; TOTAL_BLOCKS];
        // Manufacturer block: UID followed by its XOR check byte
        let bcc = uid.iter().fold(0u8, |acc, &b| acc ^ b);
        let len = uid.len().min(BLOCK_SIZE - 1);
        blocks[0][..len].copy_from_slice(&uid[..len]);
        blocks[0][len] = bcc;

        Self {
            uid,
            key_a: keys.key_a,
            key_b: keys.key_b,
            blocks,
        }
    }

    /// Blank card with a random 4-byte UID
    pub fn random(keys: AuthKeys) -> Self {
        let mut uid = vec![0u8; 4];
        OsRng.fill_bytes(&mut uid);
        Self::with_keys(uid, keys)
    }

    /// Store an initial balance (storage units) and password in the blocks
    /// `config` assigns to them
    pub fn provision(
        &mut self,
        config: &AtmConfig,
        stored_balance: u64,
        password: &str,
    ) -> Result<(), ledger::LedgerError> {
        self.set_block(config.balance_block, ledger::encode(stored_balance)?);
        let mut block = [0u8; BLOCK_SIZE];
        let bytes = password.as_bytes();
        let len = bytes.len().min(BLOCK_SIZE);
        block[..len].copy_from_slice(&bytes[..len]);
        self.set_block(config.password_block, block);
        Ok(())
    }

    pub fn block(&self, index: u8) -> Option<Block> {
        self.blocks.get(index as usize).copied()
    }

    pub fn set_block(&mut self, index: u8, data: Block) {
        if let Some(block) = self.blocks.get_mut(index as usize) {
            *block = data;
        }
    }

    fn key(&self, kind: KeyKind) -> &Key {
        match kind {
            KeyKind::A => &self.key_a,
            KeyKind::B => &self.key_b,
        }
    }

    /// Load a card from a JSON card file
    pub fn load(path: &Path) -> Result<Self, CardFileError> {
        let content = fs::read_to_string(path).map_err(|source| CardFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let card = serde_json::from_str(&content)?;
        debug!("Loaded card from {:?}", path);
        Ok(card)
    }

    /// Save the card to a JSON card file
    pub fn save(&self, path: &Path) -> Result<(), CardFileError> {
        let io_err = |source| CardFileError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
        }
        debug!("Saved card to {:?}", path);
        Ok(())
    }

    /// Save to a card file that must not exist yet
    pub fn create(&self, path: &Path) -> Result<(), CardFileError> {
        if path.exists() {
            return Err(CardFileError::Exists(path.to_path_buf()));
        }
        self.save(path)
    }
}

/// Reader with at most one simulated card in its field
pub struct SimulatedReader {
    card: Option<SimulatedCard>,
    firmware: Option<u8>,
    selected: bool,
    halted: bool,
    rearm_on_release: bool,
    authenticated_sector: Option<u8>,
    fail_selects: bool,
    fail_reads: bool,
    fail_writes: bool,
    card_file: Option<PathBuf>,
    auth_attempts: Vec<(KeyKind, u8)>,
    writes: usize,
}

impl SimulatedReader {
    /// Reader with an empty field
    pub fn new() -> Self {
        Self {
            card: None,
            firmware: Some(RC522_FIRMWARE),
            selected: false,
            halted: false,
            rearm_on_release: false,
            authenticated_sector: None,
            fail_selects: false,
            fail_reads: false,
            fail_writes: false,
            card_file: None,
            auth_attempts: Vec::new(),
            writes: 0,
        }
    }

    /// Reader with `card` in its field
    pub fn with_card(card: SimulatedCard) -> Self {
        let mut reader = Self::new();
        reader.card = Some(card);
        reader
    }

    /// A reader chip that never answers
    pub fn absent() -> Self {
        let mut reader = Self::new();
        reader.firmware = None;
        reader
    }

    /// Save the card to `path` after each successful write
    pub fn persist_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.card_file = Some(path.into());
        self
    }

    /// Make a released card answer again on the next poll, as if the
    /// cardholder swiped it again
    pub fn rearm_on_release(mut self, rearm: bool) -> Self {
        self.rearm_on_release = rearm;
        self
    }

    pub fn fail_selects(&mut self, fail: bool) {
        self.fail_selects = fail;
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn card(&self) -> Option<&SimulatedCard> {
        self.card.as_ref()
    }

    pub fn remove_card(&mut self) -> Option<SimulatedCard> {
        self.reset_session();
        let card = self.card.take();
        if let Some(card) = &card {
            info!("Card {} left the field", Uid::new(card.uid.clone()));
        }
        card
    }

    /// Take a halted card out of the field and present it again
    pub fn present_again(&mut self) {
        self.halted = false;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Every authentication attempt so far, in order
    pub fn auth_attempts(&self) -> &[(KeyKind, u8)] {
        &self.auth_attempts
    }

    /// Number of successful block writes
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn reset_session(&mut self) {
        self.selected = false;
        self.authenticated_sector = None;
    }

    fn check_access(&self, block: u8) -> Result<(), TransportError> {
        if self.card.is_none() {
            return Err(TransportError::NoTag);
        }
        if block as usize >= TOTAL_BLOCKS {
            return Err(TransportError::NoSuchBlock(block));
        }
        if self.authenticated_sector != Some(block / BLOCKS_PER_SECTOR) {
            return Err(TransportError::NotAuthenticated(block));
        }
        Ok(())
    }
}

impl Default for SimulatedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTransport for SimulatedReader {
    fn firmware_version(&mut self) -> Option<u8> {
        self.firmware
    }

    fn detect(&mut self) -> bool {
        self.firmware.is_some() && self.card.is_some() && !self.halted
    }

    fn uid(&mut self) -> Result<Uid, TransportError> {
        match &self.card {
            Some(card) if !self.halted => Ok(Uid::new(card.uid.clone())),
            _ => Err(TransportError::NoTag),
        }
    }

    fn select(&mut self, uid: &Uid) -> Result<(), TransportError> {
        let card = self.card.as_ref().ok_or(TransportError::NoTag)?;
        if card.uid != uid.as_bytes() {
            return Err(TransportError::UidMismatch(uid.clone()));
        }
        if self.fail_selects {
            return Err(TransportError::Timeout);
        }
        self.selected = true;
        self.authenticated_sector = None;
        Ok(())
    }

    fn authenticate(
        &mut self,
        kind: KeyKind,
        block: u8,
        key: &Key,
        uid: &Uid,
    ) -> Result<(), TransportError> {
        self.auth_attempts.push((kind, block));
        self.authenticated_sector = None;

        let card = self.card.as_ref().ok_or(TransportError::NoTag)?;
        if !self.selected || card.uid != uid.as_bytes() {
            return Err(TransportError::UidMismatch(uid.clone()));
        }
        if block as usize >= TOTAL_BLOCKS {
            return Err(TransportError::NoSuchBlock(block));
        }
        if card.key(kind) != key {
            return Err(TransportError::AuthRejected(kind));
        }
        self.authenticated_sector = Some(block / BLOCKS_PER_SECTOR);
        Ok(())
    }

    fn read_block(&mut self, block: u8) -> Result<Block, TransportError> {
        self.check_access(block)?;
        if self.fail_reads {
            return Err(TransportError::Timeout);
        }
        self.card
            .as_ref()
            .and_then(|card| card.block(block))
            .ok_or(TransportError::NoSuchBlock(block))
    }

    fn write_block(&mut self, block: u8, data: &Block) -> Result<(), TransportError> {
        self.check_access(block)?;
        if block == 0 || block % BLOCKS_PER_SECTOR == BLOCKS_PER_SECTOR - 1 {
            return Err(TransportError::ReadOnly(block));
        }
        if self.fail_writes {
            return Err(TransportError::Timeout);
        }

        let card = self.card.as_mut().ok_or(TransportError::NoTag)?;
        let previous = card.block(block);
        card.set_block(block, *data);

        if let Some(path) = &self.card_file {
            if let Err(e) = card.save(path) {
                warn!("Failed to persist card: {}", e);
                if let Some(previous) = previous {
                    card.set_block(block, previous);
                }
                return Err(TransportError::Io(e.to_string()));
            }
        }
        self.writes += 1;
        Ok(())
    }

    fn release(&mut self, uid: &Uid) {
        debug!("Halting tag {}", uid);
        self.reset_session();
        self.halted = !self.rearm_on_release;
    }
}
