//! Card-based ATM terminal
//!
//! Cardholders present a MIFARE Classic style tag, enter a password and then
//! check, deposit or withdraw a balance stored on the tag itself, or change
//! the password. The reader sits behind the [`tag::TagTransport`] trait; the
//! crate ships a simulated reader backed by a JSON card file.
//!
//! The default layout on the tag (both blocks can be moved in the config):
//! - block 1: balance as ASCII digits, scaled by ten
//! - block 5: password bytes, zero padded

pub mod config;
pub mod credential;
pub mod error;
pub mod input;
pub mod ledger;
pub mod report;
pub mod session;
pub mod tag;
pub mod transaction;

pub use config::{AtmConfig, ConfigError};
pub use credential::CredentialGate;
pub use error::AtmError;
pub use input::{InputError, LineInput, ScriptedInput, StreamInput};
pub use ledger::{LedgerError, ScaleMode};
pub use report::{ConsoleSink, ErrorCode, Event, RecordingSink, ReportSink, SuccessCode};
pub use session::{CycleOutcome, SessionController, SessionState};
pub use tag::{SimulatedCard, SimulatedReader, TagStore, TagTransport, Token, Uid};
pub use transaction::{Operation, TransactionEngine};
