//! Line input channel
//!
//! The cardholder answers prompts one line at a time. A read waits at most
//! the given timeout and yields an empty line when nothing arrived in time;
//! only the end of the input stream is an error.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::debug;
use thiserror::Error;

/// Errors from the input channel
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input channel closed")]
    Closed,

    #[error("input error: {0}")]
    Io(#[from] io::Error),
}

/// Source of cardholder input lines
pub trait LineInput {
    /// Read one line without its terminator, waiting at most `timeout`
    fn read_line(&mut self, timeout: Duration) -> Result<String, InputError>;
}

fn strip_line_end(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Reads lines from a blocking reader on a background thread
pub struct StreamInput {
    lines: Receiver<io::Result<String>>,
}

impl StreamInput {
    /// Read from standard input
    pub fn stdin() -> Self {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    /// Read from any buffered reader
    pub fn spawn<R>(mut reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        });
        Self { lines: rx }
    }
}

impl LineInput for StreamInput {
    fn read_line(&mut self, timeout: Duration) -> Result<String, InputError> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(strip_line_end(line)),
            Ok(Err(e)) => Err(InputError::Io(e)),
            Err(RecvTimeoutError::Timeout) => {
                debug!("No input within {:?}", timeout);
                Ok(String::new())
            }
            Err(RecvTimeoutError::Disconnected) => Err(InputError::Closed),
        }
    }
}

/// Replays a fixed list of lines, then reports the channel closed
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineInput for ScriptedInput {
    fn read_line(&mut self, _timeout: Duration) -> Result<String, InputError> {
        self.lines
            .pop_front()
            .map(strip_line_end)
            .ok_or(InputError::Closed)
    }
}
