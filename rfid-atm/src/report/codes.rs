//! Success and error codes shown by the terminal
//!
//! The terminal talks to the cardholder through a small fixed vocabulary:
//! seven success codes and ten error codes. Each code carries the console
//! text and, for errors, the short label shown on the status display.

/// Success codes (1..=7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SuccessCode {
    Leaving = 1,
    Deposited = 2,
    Withdrawn = 3,
    ReaderFound = 4,
    Reading = 5,
    Writing = 6,
    PasswordUpdated = 7,
}

impl SuccessCode {
    /// Numeric code as used by the status display
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a success code by number
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Leaving),
            2 => Some(Self::Deposited),
            3 => Some(Self::Withdrawn),
            4 => Some(Self::ReaderFound),
            5 => Some(Self::Reading),
            6 => Some(Self::Writing),
            7 => Some(Self::PasswordUpdated),
            _ => None,
        }
    }

    /// Console message for this code
    pub fn message(self) -> &'static str {
        match self {
            Self::Leaving => "Leaving the program...",
            Self::Deposited => "The indicated amount has been successfully deposited.",
            Self::Withdrawn => {
                "The indicated amount has been successfully withdrawn from your account."
            }
            Self::ReaderFound => "Found chip MFRC522",
            Self::Reading => "Reading memory...",
            Self::Writing => "Writing on memory...",
            Self::PasswordUpdated => "Your password was updated successfully.",
        }
    }
}

/// Error codes (1..=10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    InvalidDepositAmount = 1,
    InvalidWithdrawAmount = 2,
    InsufficientFunds = 3,
    InvalidOption = 4,
    ReaderNotFound = 5,
    ReadFailed = 6,
    AuthFailed = 7,
    WrongPassword = 8,
    PasswordUpdateFailed = 9,
    InvalidPassword = 10,
}

impl ErrorCode {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up an error code by number
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidDepositAmount),
            2 => Some(Self::InvalidWithdrawAmount),
            3 => Some(Self::InsufficientFunds),
            4 => Some(Self::InvalidOption),
            5 => Some(Self::ReaderNotFound),
            6 => Some(Self::ReadFailed),
            7 => Some(Self::AuthFailed),
            8 => Some(Self::WrongPassword),
            9 => Some(Self::PasswordUpdateFailed),
            10 => Some(Self::InvalidPassword),
            _ => None,
        }
    }

    /// Console message for this code
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidDepositAmount => {
                "Error: The amount to be deposited must be greater than 0."
            }
            Self::InvalidWithdrawAmount => {
                "Error: The amount to be withdrawn must be greater than 0."
            }
            Self::InsufficientFunds => {
                "Error: The amount to be withdrawn must be less than the amount you have."
            }
            Self::InvalidOption => "Error: Invalid option.",
            Self::ReaderNotFound => "Error: Didn't find MFRC522 board.",
            Self::ReadFailed => "Error: Failed to read from memory.",
            Self::AuthFailed => "Error: Failed to authenticate.",
            Self::WrongPassword => "The password is incorrect.",
            Self::PasswordUpdateFailed => {
                "An error occurred while updating your password. Try again."
            }
            Self::InvalidPassword => {
                "The password cannot be null and must be less or equal than 5 characters."
            }
        }
    }

    /// Short label for the status display (fits a 16 column row)
    pub fn label(self) -> &'static str {
        match self {
            Self::InvalidDepositAmount
            | Self::InvalidWithdrawAmount
            | Self::InsufficientFunds => "INVALID AMOUNT",
            Self::InvalidOption => "INVALID OPTION",
            Self::ReaderNotFound => "NO READER",
            Self::ReadFailed => "READING FAILED",
            Self::AuthFailed => "AUTH FAILED",
            Self::WrongPassword => "WRONG PASSWORD",
            Self::PasswordUpdateFailed => "UPDATING ERROR",
            Self::InvalidPassword => "INVALID PASSWORD",
        }
    }

    /// Whether the cardholder should be told to swipe the card again
    pub fn asks_for_retry(self) -> bool {
        !matches!(self, Self::ReaderNotFound | Self::InvalidPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes_round_trip() {
        for code in 1..=7 {
            let success = SuccessCode::from_code(code).unwrap();
            assert_eq!(success.code(), code);
        }
        assert_eq!(SuccessCode::from_code(0), None);
        assert_eq!(SuccessCode::from_code(8), None);
    }

    #[test]
    fn test_error_codes_round_trip() {
        for code in 1..=10 {
            let error = ErrorCode::from_code(code).unwrap();
            assert_eq!(error.code(), code);
        }
        assert_eq!(ErrorCode::from_code(11), None);
    }

    #[test]
    fn test_labels_fit_display_row() {
        for code in 1..=10 {
            let error = ErrorCode::from_code(code).unwrap();
            assert!(error.label().len() <= 16, "{:?}", error);
        }
    }

    #[test]
    fn test_amount_errors_share_label() {
        assert_eq!(ErrorCode::InvalidDepositAmount.label(), "INVALID AMOUNT");
        assert_eq!(ErrorCode::InsufficientFunds.label(), "INVALID AMOUNT");
        assert_eq!(ErrorCode::WrongPassword.label(), "WRONG PASSWORD");
    }
}
