//! Reporting sink
//!
//! Every operation of the terminal reports its outcome here instead of
//! returning status codes up the call chain. A sink receives success codes,
//! error codes, status display updates and free-form text, and decides where
//! they go (console, log, test recorder).

mod codes;
mod display;

pub use codes::{ErrorCode, SuccessCode};
pub use display::StatusDisplay;

use std::io::Write;

use log::{debug, info, warn};

/// One reported event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Success(SuccessCode),
    /// An error code, with optional text replacing the code's stock message
    Error {
        code: ErrorCode,
        detail: Option<String>,
    },
    /// Text for one row of the status display
    Status { row: usize, text: String },
    /// Free-form console text (prompts, menu, balances)
    Message(String),
}

/// Destination for everything the terminal has to say
pub trait ReportSink {
    fn report(&mut self, event: Event);

    fn success(&mut self, code: SuccessCode) {
        self.report(Event::Success(code));
    }

    fn error(&mut self, code: ErrorCode) {
        self.report(Event::Error { code, detail: None });
    }

    fn error_with(&mut self, code: ErrorCode, detail: &str) {
        self.report(Event::Error {
            code,
            detail: Some(detail.to_string()),
        });
    }

    fn status(&mut self, row: usize, text: &str) {
        self.report(Event::Status {
            row,
            text: text.to_string(),
        });
    }

    fn message(&mut self, text: &str) {
        self.report(Event::Message(text.to_string()));
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn report(&mut self, event: Event) {
        (**self).report(event);
    }
}

/// Text printed after most errors
pub const RETRY_HINT: &str = "Swipe the card through the reader and try again.";

/// Sink writing to a console stream and keeping the status display current
///
/// Every event is mirrored into the log stream as well.
pub struct ConsoleSink<W: Write> {
    out: W,
    display: StatusDisplay,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            display: StatusDisplay::new(),
        }
    }

    /// Current status display contents
    pub fn display(&self) -> &StatusDisplay {
        &self.display
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn report(&mut self, event: Event) {
        match event {
            Event::Success(code) => {
                info!("success {}: {}", code.code(), code.message());
                self.write_line(code.message());
            }
            Event::Error { code, detail } => {
                let text = detail.as_deref().unwrap_or(code.message()).to_string();
                warn!("error {}: {}", code.code(), text);
                self.display.show_error(code.label());
                self.write_line(&text);
                if code.asks_for_retry() {
                    self.write_line(RETRY_HINT);
                }
            }
            Event::Status { row, text } => {
                debug!("display row {}: {}", row, text);
                self.display.set_row(row, &text);
            }
            Event::Message(text) => {
                debug!("console: {}", text);
                self.write_line(&text);
            }
        }
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<Event>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn successes(&self) -> Vec<SuccessCode> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Success(code) => Some(*code),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorCode> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Error { code, .. } => Some(*code),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Message(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors().contains(&code)
    }

    pub fn has_success(&self, code: SuccessCode) -> bool {
        self.successes().contains(&code)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl ReportSink for RecordingSink {
    fn report(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_error_adds_retry_hint() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.error(ErrorCode::WrongPassword);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("The password is incorrect."));
        assert!(out.contains(RETRY_HINT));
    }

    #[test]
    fn test_console_sink_invalid_password_has_no_hint() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.error(ErrorCode::InvalidPassword);
        assert_eq!(sink.display().row(2), "INVALID PASSWORD");

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!out.contains(RETRY_HINT));
    }

    #[test]
    fn test_console_sink_detail_replaces_message() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.error_with(ErrorCode::AuthFailed, "Error: Failed to write to memory.");

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("Failed to write to memory"));
        assert!(!out.contains("Failed to authenticate"));
    }

    #[test]
    fn test_console_sink_status_rows() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.status(0, "UID: DEADBEEF");
        sink.status(1, "->DEPOSIT MONEY");
        assert_eq!(sink.display().row(0), "UID: DEADBEEF");
        assert_eq!(sink.display().row(1), "->DEPOSIT MONEY");

        sink.error(ErrorCode::InsufficientFunds);
        assert_eq!(sink.display().row(0), "UID: DEADBEEF");
        assert_eq!(sink.display().row(1), "ERROR:");
        assert_eq!(sink.display().row(2), "INVALID AMOUNT");
    }

    #[test]
    fn test_recording_sink_filters() {
        let mut sink = RecordingSink::new();
        sink.success(SuccessCode::Reading);
        sink.error(ErrorCode::ReadFailed);
        sink.message("hello");

        assert_eq!(sink.successes(), vec![SuccessCode::Reading]);
        assert_eq!(sink.errors(), vec![ErrorCode::ReadFailed]);
        assert_eq!(sink.messages(), vec!["hello"]);
        assert!(sink.has_error(ErrorCode::ReadFailed));
    }

    #[test]
    fn test_sink_through_mut_reference() {
        fn emit<S: ReportSink>(mut sink: S) {
            sink.success(SuccessCode::Writing);
        }

        let mut sink = RecordingSink::new();
        emit(&mut sink);
        assert!(sink.has_success(SuccessCode::Writing));
    }
}
