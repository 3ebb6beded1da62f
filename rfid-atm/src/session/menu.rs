//! Menu selection parsing
//!
//! A selection line starts with an option letter. `B` and `C` take an
//! amount: the text after the first whitespace character, read as a leading
//! integer. A missing or unreadable amount is zero.

use crate::error::AtmError;

/// Menu printed after a successful login
pub const MENU_LINES: &[&str] = &[
    "===============MENU===============",
    "A -> See bank statement",
    "B -> Deposit money",
    "C -> Withdraw money",
    "D -> Update password",
    "E -> Exit",
    "==================================",
    "Choose an option and then press <enter>",
    "(if the option is B or C, specify the amount after the option separated by <white space>): ",
];

/// A parsed menu selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Statement,
    Deposit(i64),
    Withdraw(i64),
    UpdatePassword,
    Exit,
}

/// Parse one selection line
///
/// Option letters are upper case. Anything else, including an empty line,
/// is an invalid option.
pub fn parse(line: &str) -> Result<MenuCommand, AtmError> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.chars().next() {
        Some('A') => Ok(MenuCommand::Statement),
        Some('B') => Ok(MenuCommand::Deposit(parse_leading_int(
            amount_after_space(line),
        ))),
        Some('C') => Ok(MenuCommand::Withdraw(parse_leading_int(
            amount_after_space(line),
        ))),
        Some('D') => Ok(MenuCommand::UpdatePassword),
        Some('E') => Ok(MenuCommand::Exit),
        _ => Err(AtmError::InvalidOption(line.to_string())),
    }
}

/// Text starting at the first whitespace character
///
/// The last character never starts the amount, so `"B "` has none.
pub fn amount_after_space(line: &str) -> &str {
    let searchable = line.len().saturating_sub(1);
    line.bytes()
        .take(searchable)
        .position(|b| b.is_ascii_whitespace())
        .map_or("", |start| &line[start..])
}

/// Leading integer of `text`
///
/// Skips leading whitespace, takes an optional sign and then as many digits
/// as follow. No digits gives 0. Values beyond `i64` saturate.
pub fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for digit in rest.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(digit - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}
