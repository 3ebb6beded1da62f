//! Password check and change
//!
//! The password block holds the cardholder password as raw bytes. A presented
//! password matches when it equals all 16 stored bytes once zero-padded (or
//! truncated) to the block size.

use log::{debug, info};

use crate::error::AtmError;
use crate::report::{ReportSink, SuccessCode};
use crate::tag::{Block, TagStore, TagTransport, Token, BLOCK_SIZE};

/// Longest password accepted by a password change
pub const MAX_PASSWORD_LEN: usize = 5;

/// Byte appended to every new password before it is written
///
/// Cards written by a password change therefore expect the typed password
/// followed by `a` at the next login.
pub const PASSWORD_SENTINEL: u8 = b'a';

/// Verifies and updates the password block of a card
#[derive(Debug, Clone, Copy)]
pub struct CredentialGate {
    password_block: u8,
}

impl CredentialGate {
    pub fn new(password_block: u8) -> Self {
        Self { password_block }
    }

    /// Lay out password bytes the way they are stored
    pub fn to_block(password: &[u8]) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        let len = password.len().min(BLOCK_SIZE);
        block[..len].copy_from_slice(&password[..len]);
        block
    }

    /// Check a new password against the length rule
    pub fn validate(new_password: &str) -> Result<(), AtmError> {
        let len = new_password.len();
        if len == 0 || len > MAX_PASSWORD_LEN {
            return Err(AtmError::InvalidPassword {
                len,
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// Compare a presented password with the stored one
    ///
    /// Any storage failure counts as a mismatch.
    pub fn verify<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        presented: &str,
        sink: &mut dyn ReportSink,
    ) -> bool {
        let stored = match store.read(self.password_block, token, sink) {
            Ok(block) => block,
            Err(e) => {
                debug!("Password check on {} aborted: {}", token.uid(), e);
                return false;
            }
        };

        let matches = stored == Self::to_block(presented.as_bytes());
        if !matches {
            debug!("Password mismatch on {}", token.uid());
        }
        matches
    }

    /// Store a new password
    ///
    /// An invalid password is rejected before the card is touched.
    pub fn update_password<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        new_password: &str,
        sink: &mut dyn ReportSink,
    ) -> Result<(), AtmError> {
        if let Err(e) = Self::validate(new_password) {
            e.report(sink);
            return Err(e);
        }

        let mut bytes = new_password.as_bytes().to_vec();
        bytes.push(PASSWORD_SENTINEL);
        let block = Self::to_block(&bytes);

        if store.write(self.password_block, &block, token, sink).is_err() {
            let err = AtmError::PasswordUpdateWrite;
            err.report(sink);
            return Err(err);
        }

        info!("Password updated on tag {}", token.uid());
        sink.success(SuccessCode::PasswordUpdated);
        sink.message("Swipe the card through the reader again.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AtmConfig;
    use crate::report::{ErrorCode, RecordingSink};
    use crate::tag::{AuthKeys, SimulatedCard, SimulatedReader, Uid, PASSWORD_BLOCK};

    fn setup(password: &str) -> (TagStore<SimulatedReader>, Token) {
        let mut card = SimulatedCard::new(vec![0x01, 0x02, 0x03, 0x04]);
        card.provision(&AtmConfig::default(), 0, password).unwrap();
        let token = Token::new(Uid::new(card.uid.clone()));
        let mut reader = SimulatedReader::with_card(card);
        reader.select(token.uid()).unwrap();
        (TagStore::new(reader, AuthKeys::default()), token)
    }

    fn stored_password(store: &TagStore<SimulatedReader>) -> Block {
        store
            .transport()
            .card()
            .unwrap()
            .block(PASSWORD_BLOCK)
            .unwrap()
    }

    #[test]
    fn test_verify_success() {
        let (mut store, token) = setup("1234");
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        assert!(gate.verify(&mut store, &token, "1234", &mut sink));
    }

    #[test]
    fn test_verify_mismatch() {
        let (mut store, token) = setup("1234");
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        assert!(!gate.verify(&mut store, &token, "123", &mut sink));
        assert!(!gate.verify(&mut store, &token, "12345", &mut sink));
        assert!(!gate.verify(&mut store, &token, "", &mut sink));
    }

    #[test]
    fn test_verify_truncates_to_block() {
        let (mut store, token) = setup("0123456789abcdef");
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        assert!(gate.verify(&mut store, &token, "0123456789abcdefXYZ", &mut sink));
    }

    #[test]
    fn test_verify_storage_failure_is_mismatch() {
        let (mut store, token) = setup("1234");
        store.transport_mut().fail_reads(true);
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        assert!(!gate.verify(&mut store, &token, "1234", &mut sink));
        assert_eq!(sink.errors(), vec![ErrorCode::ReadFailed]);
    }

    #[test]
    fn test_update_appends_sentinel() {
        let (mut store, token) = setup("1234");
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        gate.update_password(&mut store, &token, "999", &mut sink).unwrap();
        assert_eq!(stored_password(&store), CredentialGate::to_block(b"999a"));
        assert!(sink.has_success(SuccessCode::PasswordUpdated));

        assert!(!gate.verify(&mut store, &token, "999", &mut sink));
        assert!(gate.verify(&mut store, &token, "999a", &mut sink));
    }

    #[test]
    fn test_update_rejects_bad_length() {
        let (mut store, token) = setup("1234");
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let before = stored_password(&store);

        for bad in ["", "123456", "much too long"] {
            let mut sink = RecordingSink::new();
            let err = gate
                .update_password(&mut store, &token, bad, &mut sink)
                .unwrap_err();
            assert!(matches!(err, AtmError::InvalidPassword { max: 5, .. }));
            assert_eq!(sink.errors(), vec![ErrorCode::InvalidPassword]);
        }

        assert_eq!(stored_password(&store), before);
        assert_eq!(store.transport().write_count(), 0);
        assert!(store.transport().auth_attempts().is_empty());
    }

    #[test]
    fn test_update_write_failure() {
        let (mut store, token) = setup("1234");
        store.transport_mut().fail_writes(true);
        let gate = CredentialGate::new(PASSWORD_BLOCK);
        let mut sink = RecordingSink::new();

        let err = gate
            .update_password(&mut store, &token, "55", &mut sink)
            .unwrap_err();
        assert_eq!(err, AtmError::PasswordUpdateWrite);
        assert_eq!(
            sink.errors(),
            vec![ErrorCode::AuthFailed, ErrorCode::PasswordUpdateFailed]
        );
        assert_eq!(stored_password(&store), CredentialGate::to_block(b"1234"));
    }
}
