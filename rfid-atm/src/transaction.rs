//! Statement, deposit and withdraw
//!
//! All three operate on the balance block. In `ScaleMode::Literal` the
//! arithmetic is that of the cards already in circulation: the statement is
//! the raw stored value, and deposit/withdraw write `(stored ± amount) × 10`,
//! which rescales the stored value again on every update. `ScaleMode::Consistent`
//! keeps the stored value at logical × 10 throughout.

use std::fmt;

use log::info;

use crate::error::AtmError;
use crate::ledger::{self, ScaleMode, SCALE};
use crate::report::{ReportSink, SuccessCode};
use crate::tag::{TagStore, TagTransport, Token};

/// Balance-changing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdraw,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdraw => write!(f, "withdraw"),
        }
    }
}

const SWIPE_AGAIN: &str = "Swipe the card through the reader again.";

/// Runs balance operations against the balance block
#[derive(Debug, Clone, Copy)]
pub struct TransactionEngine {
    balance_block: u8,
    mode: ScaleMode,
}

impl TransactionEngine {
    pub fn new(balance_block: u8, mode: ScaleMode) -> Self {
        Self {
            balance_block,
            mode,
        }
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    fn read_stored<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        sink: &mut dyn ReportSink,
    ) -> Result<u64, AtmError> {
        let block = store.read(self.balance_block, token, sink)?;
        Ok(ledger::decode(&block))
    }

    fn write_stored<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        op: Operation,
        value: u64,
        sink: &mut dyn ReportSink,
    ) -> Result<(), AtmError> {
        let block = match ledger::encode(value) {
            Ok(block) => block,
            Err(e) => {
                info!("Rejected {}: {}", op, e);
                return Err(Self::fail(AtmError::BalanceOverflow { op }, sink));
            }
        };
        store.write(self.balance_block, &block, token, sink)
    }

    fn fail(err: AtmError, sink: &mut dyn ReportSink) -> AtmError {
        err.report(sink);
        err
    }

    /// Report the balance
    ///
    /// Returns the amount shown to the cardholder.
    pub fn statement<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        sink: &mut dyn ReportSink,
    ) -> Result<u64, AtmError> {
        sink.status(1, "->SEE STATEMENT");
        sink.message("Option A - See bank statement");

        let stored = self.read_stored(store, token, sink)?;
        let shown = match self.mode {
            ScaleMode::Literal => stored,
            ScaleMode::Consistent => stored / SCALE,
        };

        sink.message(&format!("Total amount: {} $", shown));
        sink.message(SWIPE_AGAIN);
        Ok(shown)
    }

    /// Add `amount` to the balance
    ///
    /// Returns the new stored value.
    pub fn deposit<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        amount: i64,
        sink: &mut dyn ReportSink,
    ) -> Result<u64, AtmError> {
        let op = Operation::Deposit;
        sink.status(1, "->DEPOSIT MONEY");
        sink.message("Option B - Deposit money");

        let amount = match u64::try_from(amount) {
            Ok(amount) => amount,
            Err(_) => return Err(Self::fail(AtmError::InvalidAmount { op, amount }, sink)),
        };

        let saved = self.read_stored(store, token, sink)?;
        let total = match self.mode {
            ScaleMode::Literal => saved
                .checked_add(amount)
                .and_then(|sum| sum.checked_mul(SCALE)),
            ScaleMode::Consistent => amount
                .checked_mul(SCALE)
                .and_then(|scaled| saved.checked_add(scaled)),
        };
        let Some(total) = total else {
            return Err(Self::fail(AtmError::BalanceOverflow { op }, sink));
        };

        self.write_stored(store, token, op, total, sink)?;
        info!(
            "Deposited {} on tag {}, stored balance {} -> {}",
            amount,
            token.uid(),
            saved,
            total
        );
        sink.success(SuccessCode::Deposited);
        sink.message(SWIPE_AGAIN);
        Ok(total)
    }

    /// Take `amount` from the balance
    ///
    /// Nothing is written unless the balance covers the amount.
    pub fn withdraw<T: TagTransport>(
        &self,
        store: &mut TagStore<T>,
        token: &Token,
        amount: i64,
        sink: &mut dyn ReportSink,
    ) -> Result<u64, AtmError> {
        let op = Operation::Withdraw;
        sink.status(1, "->WITHDRAW MONEY");
        sink.message("Option C - Withdraw money");

        let amount = match u64::try_from(amount) {
            Ok(amount) => amount,
            Err(_) => return Err(Self::fail(AtmError::InvalidAmount { op, amount }, sink)),
        };

        let saved = self.read_stored(store, token, sink)?;
        let debit = match self.mode {
            ScaleMode::Literal => Some(amount),
            ScaleMode::Consistent => amount.checked_mul(SCALE),
        };
        let remaining = match debit.and_then(|debit| saved.checked_sub(debit)) {
            Some(remaining) => remaining,
            None => {
                let available = match self.mode {
                    ScaleMode::Literal => saved,
                    ScaleMode::Consistent => saved / SCALE,
                };
                return Err(Self::fail(
                    AtmError::InsufficientFunds {
                        requested: amount,
                        available,
                    },
                    sink,
                ));
            }
        };

        let total = match self.mode {
            ScaleMode::Literal => remaining.checked_mul(SCALE),
            ScaleMode::Consistent => Some(remaining),
        };
        let Some(total) = total else {
            return Err(Self::fail(AtmError::BalanceOverflow { op }, sink));
        };

        self.write_stored(store, token, op, total, sink)?;
        info!(
            "Withdrew {} from tag {}, stored balance {} -> {}",
            amount,
            token.uid(),
            saved,
            total
        );
        sink.success(SuccessCode::Withdrawn);
        sink.message(SWIPE_AGAIN);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ErrorCode, RecordingSink};
    use crate::tag::{AuthKeys, SimulatedCard, SimulatedReader, Uid, BALANCE_BLOCK};

    fn setup(stored: &[u8]) -> (TagStore<SimulatedReader>, Token) {
        let mut card = SimulatedCard::new(vec![0xAA, 0xBB, 0xCC, 0xDD]);
        let mut block = [0u8; 16];
        block[..stored.len()].copy_from_slice(stored);
        card.set_block(BALANCE_BLOCK, block);
        let token = Token::new(Uid::new(card.uid.clone()));
        let mut reader = SimulatedReader::with_card(card);
        reader.select(token.uid()).unwrap();
        (TagStore::new(reader, AuthKeys::default()), token)
    }

    fn balance_digits(store: &TagStore<SimulatedReader>) -> String {
        let block = store.transport().card().unwrap().block(BALANCE_BLOCK).unwrap();
        ledger::digits(&block)
    }

    fn literal() -> TransactionEngine {
        TransactionEngine::new(BALANCE_BLOCK, ScaleMode::Literal)
    }

    fn consistent() -> TransactionEngine {
        TransactionEngine::new(BALANCE_BLOCK, ScaleMode::Consistent)
    }

    #[test]
    fn test_statement_literal_reports_raw_value() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        assert_eq!(literal().statement(&mut store, &token, &mut sink), Ok(100));
        assert!(sink.messages().contains(&"Total amount: 100 $"));
    }

    #[test]
    fn test_statement_empty_block_is_zero() {
        let (mut store, token) = setup(b"");
        let mut sink = RecordingSink::new();

        assert_eq!(literal().statement(&mut store, &token, &mut sink), Ok(0));
        assert!(sink.messages().contains(&"Total amount: 0 $"));
    }

    #[test]
    fn test_end_to_end_literal() {
        let (mut store, token) = setup(b"100");
        let engine = literal();
        let mut sink = RecordingSink::new();

        assert_eq!(engine.statement(&mut store, &token, &mut sink), Ok(100));
        assert_eq!(engine.deposit(&mut store, &token, 5, &mut sink), Ok(1050));
        assert_eq!(balance_digits(&store), "1050");
        assert!(sink.has_success(SuccessCode::Deposited));
    }

    #[test]
    fn test_end_to_end_consistent() {
        let (mut store, token) = setup(b"100");
        let engine = consistent();
        let mut sink = RecordingSink::new();

        assert_eq!(engine.statement(&mut store, &token, &mut sink), Ok(10));
        assert_eq!(engine.deposit(&mut store, &token, 5, &mut sink), Ok(150));
        assert_eq!(balance_digits(&store), "150");
        assert_eq!(engine.statement(&mut store, &token, &mut sink), Ok(15));
    }

    #[test]
    fn test_deposit_never_decreases_statement() {
        for engine in [literal(), consistent()] {
            for amount in [0, 1, 7, 250] {
                let (mut store, token) = setup(b"30");
                let mut sink = RecordingSink::new();
                let before = engine.statement(&mut store, &token, &mut sink).unwrap();
                engine.deposit(&mut store, &token, amount, &mut sink).unwrap();
                let after = engine.statement(&mut store, &token, &mut sink).unwrap();
                assert!(after >= before, "{:?} {} -> {}", engine.mode(), before, after);
            }
        }
    }

    #[test]
    fn test_negative_deposit_rejected() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        let err = literal()
            .deposit(&mut store, &token, -5, &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            AtmError::InvalidAmount {
                op: Operation::Deposit,
                amount: -5
            }
        );
        assert_eq!(sink.errors(), vec![ErrorCode::InvalidDepositAmount]);
        assert_eq!(store.transport().write_count(), 0);
        assert!(store.transport().auth_attempts().is_empty());
    }

    #[test]
    fn test_withdraw_literal() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        assert_eq!(literal().withdraw(&mut store, &token, 30, &mut sink), Ok(700));
        assert_eq!(balance_digits(&store), "700");
        assert!(sink.has_success(SuccessCode::Withdrawn));
    }

    #[test]
    fn test_withdraw_consistent() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        assert_eq!(consistent().withdraw(&mut store, &token, 3, &mut sink), Ok(70));
        assert_eq!(balance_digits(&store), "70");
    }

    #[test]
    fn test_withdraw_whole_balance() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        assert_eq!(literal().withdraw(&mut store, &token, 100, &mut sink), Ok(0));
        assert_eq!(balance_digits(&store), "0");
    }

    #[test]
    fn test_withdraw_more_than_balance() {
        for (engine, amount) in [(literal(), 101), (consistent(), 11)] {
            let (mut store, token) = setup(b"100");
            let mut sink = RecordingSink::new();

            let err = engine
                .withdraw(&mut store, &token, amount, &mut sink)
                .unwrap_err();
            assert!(matches!(err, AtmError::InsufficientFunds { .. }));
            assert_eq!(sink.errors(), vec![ErrorCode::InsufficientFunds]);
            assert_eq!(store.transport().write_count(), 0);
            assert_eq!(balance_digits(&store), "100");
        }
    }

    #[test]
    fn test_negative_withdraw_rejected() {
        let (mut store, token) = setup(b"100");
        let mut sink = RecordingSink::new();

        let err = literal()
            .withdraw(&mut store, &token, -1, &mut sink)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidWithdrawAmount);
        assert_eq!(store.transport().write_count(), 0);
        assert_eq!(balance_digits(&store), "100");
    }

    #[test]
    fn test_deposit_overflow_rejected() {
        let (mut store, token) = setup(b"9999999999999999");
        let mut sink = RecordingSink::new();

        let err = literal()
            .deposit(&mut store, &token, 1, &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            AtmError::BalanceOverflow {
                op: Operation::Deposit
            }
        );
        assert_eq!(store.transport().write_count(), 0);
    }

    #[test]
    fn test_deposit_read_failure_writes_nothing() {
        let (mut store, token) = setup(b"100");
        store.transport_mut().fail_reads(true);
        let mut sink = RecordingSink::new();

        let err = literal()
            .deposit(&mut store, &token, 5, &mut sink)
            .unwrap_err();
        assert_eq!(err, AtmError::Read(BALANCE_BLOCK));
        assert_eq!(store.transport().write_count(), 0);
        assert!(!sink.has_success(SuccessCode::Deposited));
    }

    #[test]
    fn test_deposit_write_failure() {
        let (mut store, token) = setup(b"100");
        store.transport_mut().fail_writes(true);
        let mut sink = RecordingSink::new();

        let err = literal()
            .deposit(&mut store, &token, 5, &mut sink)
            .unwrap_err();
        assert_eq!(err, AtmError::Write(BALANCE_BLOCK));
        assert_eq!(balance_digits(&store), "100");
    }
}
