//! Terminal error type
//!
//! Every failure the terminal can hit while serving a card. Errors are
//! reported to the sink where they happen; the `Result` only tells the caller
//! that the current operation is over.

use thiserror::Error;

use crate::report::{ErrorCode, ReportSink};
use crate::transaction::Operation;

/// Console text for a failed block write (shares display code 7)
pub const WRITE_FAILED_TEXT: &str = "Error: Failed to write to memory.";

/// Console text for a balance too large for the balance block
pub const OVERFLOW_TEXT: &str = "Error: The resulting balance does not fit on the card.";

/// Errors raised while serving a card
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtmError {
    #[error("{op} amount must not be negative, got {amount}")]
    InvalidAmount { op: Operation, amount: i64 },

    #[error("cannot withdraw {requested}, balance is {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("invalid menu option {0:?}")]
    InvalidOption(String),

    #[error("RFID reader not found")]
    ReaderUnavailable,

    #[error("failed to read block {0}")]
    Read(u8),

    #[error("failed to write block {0}")]
    Write(u8),

    #[error("authentication failed for block {0} with both keys")]
    Auth(u8),

    #[error("wrong password")]
    WrongPassword,

    #[error("failed to store the new password")]
    PasswordUpdateWrite,

    #[error("password must be 1 to {max} characters, got {len}")]
    InvalidPassword { len: usize, max: usize },

    #[error("{op} would leave a balance that does not fit in a block")]
    BalanceOverflow { op: Operation },
}

impl AtmError {
    /// Display code reported for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAmount { op, .. } | Self::BalanceOverflow { op } => match op {
                Operation::Deposit => ErrorCode::InvalidDepositAmount,
                Operation::Withdraw => ErrorCode::InvalidWithdrawAmount,
            },
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::InvalidOption(_) => ErrorCode::InvalidOption,
            Self::ReaderUnavailable => ErrorCode::ReaderNotFound,
            Self::Read(_) => ErrorCode::ReadFailed,
            Self::Write(_) | Self::Auth(_) => ErrorCode::AuthFailed,
            Self::WrongPassword => ErrorCode::WrongPassword,
            Self::PasswordUpdateWrite => ErrorCode::PasswordUpdateFailed,
            Self::InvalidPassword { .. } => ErrorCode::InvalidPassword,
        }
    }

    /// Send this error to a sink
    pub fn report(&self, sink: &mut dyn ReportSink) {
        match self {
            Self::Write(_) => sink.error_with(self.code(), WRITE_FAILED_TEXT),
            Self::BalanceOverflow { .. } => sink.error_with(self.code(), OVERFLOW_TEXT),
            _ => sink.error(self.code()),
        }
    }
}
