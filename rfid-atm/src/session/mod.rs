//! Session controller
//!
//! Drives the terminal: poll the reader for a tag, ask for the password,
//! show the menu, run the chosen operation and halt the tag again. One
//! tag is served at a time and every cycle ends back in `Idle`.

pub mod menu;
pub mod state;

pub use menu::{MenuCommand, MENU_LINES};
pub use state::{Session, SessionState};

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::AtmConfig;
use crate::credential::CredentialGate;
use crate::error::AtmError;
use crate::input::{InputError, LineInput};
use crate::report::{ReportSink, SuccessCode};
use crate::tag::{TagStore, TagTransport, Token};
use crate::transaction::TransactionEngine;

/// How a poll cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No tag in the field
    NoTag,
    /// A tag was served; the terminal keeps polling
    Completed,
    /// The cardholder chose to leave
    Exit,
    /// The input channel reached its end
    InputClosed,
}

/// The terminal's main loop
pub struct SessionController<T, I, S> {
    store: TagStore<T>,
    input: I,
    sink: S,
    gate: CredentialGate,
    engine: TransactionEngine,
    input_timeout: Duration,
    poll_interval: Duration,
    state: SessionState,
    trace: Vec<SessionState>,
}

impl<T, I, S> SessionController<T, I, S>
where
    T: TagTransport,
    I: LineInput,
    S: ReportSink,
{
    pub fn new(transport: T, input: I, sink: S, config: &AtmConfig) -> Self {
        Self {
            store: TagStore::new(transport, config.keys),
            input,
            sink,
            gate: CredentialGate::new(config.password_block),
            engine: TransactionEngine::new(config.balance_block, config.scale_mode),
            input_timeout: config.input_timeout(),
            poll_interval: config.poll_interval(),
            state: SessionState::Idle,
            trace: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// States visited by the most recent cycle, in order
    pub fn trace(&self) -> &[SessionState] {
        &self.trace
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &TagStore<T> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TagStore<T> {
        &mut self.store
    }

    /// Check for the reader chip
    ///
    /// Returns the firmware version.
    pub fn start(&mut self) -> Result<u8, AtmError> {
        self.sink.message("Looking for MFRC522...");
        let Some(version) = self.store.transport_mut().firmware_version() else {
            let err = AtmError::ReaderUnavailable;
            err.report(&mut self.sink);
            return Err(err);
        };

        info!("Reader firmware version 0x{:02X}", version);
        self.sink.success(SuccessCode::ReaderFound);
        self.sink.message(&format!("Firmware ver. 0x{:X}.", version));
        self.sink.message("Swipe the tag to start the application.");
        Ok(version)
    }

    /// Poll until the cardholder exits or the input ends
    pub fn run(&mut self) -> CycleOutcome {
        loop {
            match self.poll_once() {
                CycleOutcome::NoTag => thread::sleep(self.poll_interval),
                CycleOutcome::Completed => {}
                outcome => {
                    info!("Session loop finished: {:?}", outcome);
                    return outcome;
                }
            }
        }
    }

    /// Serve at most one tag
    pub fn poll_once(&mut self) -> CycleOutcome {
        if !self.store.transport_mut().detect() {
            return CycleOutcome::NoTag;
        }

        self.trace.clear();
        self.transition(SessionState::TagDetected);

        let uid = match self.store.transport_mut().uid() {
            Ok(uid) => uid,
            Err(e) => {
                warn!("Tag vanished before anti-collision: {}", e);
                self.transition(SessionState::Idle);
                return CycleOutcome::Completed;
            }
        };
        info!("Tag {} detected", uid);
        self.sink.message(&format!("Tag UID: {}", uid));
        self.sink.status(0, &format!("UID: {}", uid));

        if let Err(e) = self.store.transport_mut().select(&uid) {
            warn!("Failed to select tag {}: {}", uid, e);
            self.store.transport_mut().release(&uid);
            self.transition(SessionState::Idle);
            return CycleOutcome::Completed;
        }

        let mut session = Session::new(Token::new(uid));
        let outcome = self.serve(&mut session);

        self.store.transport_mut().release(session.token().uid());
        self.transition(SessionState::Idle);
        outcome
    }

    fn serve(&mut self, session: &mut Session) -> CycleOutcome {
        self.transition(SessionState::Authenticating);
        self.sink.message("Please, introduce your password: ");
        let attempt = match self.read_line() {
            Ok(line) => line,
            Err(outcome) => return outcome,
        };

        if !self
            .gate
            .verify(&mut self.store, session.token(), &attempt, &mut self.sink)
        {
            AtmError::WrongPassword.report(&mut self.sink);
            return CycleOutcome::Completed;
        }
        session.authenticate();
        self.transition(SessionState::MenuActive);

        for line in MENU_LINES {
            self.sink.message(line);
        }
        let selection = match self.read_line() {
            Ok(line) => line,
            Err(outcome) => return outcome,
        };

        self.transition(SessionState::Dispatching);
        self.sink.message("");
        let command = match menu::parse(&selection) {
            Ok(command) => command,
            Err(e) => {
                e.report(&mut self.sink);
                self.transition(SessionState::OperationDone);
                return CycleOutcome::Completed;
            }
        };
        debug!("Selected {:?}", command);

        self.dispatch(session, command)
    }

    fn dispatch(&mut self, session: &Session, command: MenuCommand) -> CycleOutcome {
        let token = session.token();
        // Failures are already reported by the operation itself
        let result = match command {
            MenuCommand::Statement => self
                .engine
                .statement(&mut self.store, token, &mut self.sink)
                .map(drop),
            MenuCommand::Deposit(amount) => self
                .engine
                .deposit(&mut self.store, token, amount, &mut self.sink)
                .map(drop),
            MenuCommand::Withdraw(amount) => self
                .engine
                .withdraw(&mut self.store, token, amount, &mut self.sink)
                .map(drop),
            MenuCommand::UpdatePassword => {
                self.sink.message("Please, introduce the new password: ");
                let new_password = match self.read_line() {
                    Ok(line) => line,
                    Err(outcome) => return outcome,
                };
                self.gate
                    .update_password(&mut self.store, token, &new_password, &mut self.sink)
            }
            MenuCommand::Exit => {
                self.transition(SessionState::Exiting);
                info!("Cardholder left on tag {}", token.uid());
                self.sink.success(SuccessCode::Leaving);
                self.sink.status(1, "");
                self.sink.status(0, "Leaving...");
                return CycleOutcome::Exit;
            }
        };

        if let Err(e) = result {
            debug!("{:?} on tag {} failed: {}", command, token.uid(), e);
        }
        self.transition(SessionState::OperationDone);
        CycleOutcome::Completed
    }

    fn read_line(&mut self) -> Result<String, CycleOutcome> {
        match self.input.read_line(self.input_timeout) {
            Ok(line) => Ok(line),
            Err(InputError::Closed) => {
                info!("Input closed");
                Err(CycleOutcome::InputClosed)
            }
            Err(e) => {
                warn!("{}", e);
                Err(CycleOutcome::InputClosed)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected session transition {} -> {}", self.state, next);
        }
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
        self.trace.push(next);
    }
}
