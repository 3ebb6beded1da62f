//! Session state
//!
//! Tracks where a poll cycle stands and whether the tag in the field has
//! been unlocked with its password.

use std::fmt;

use crate::tag::Token;

/// Stages of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a tag
    Idle,
    TagDetected,
    /// Password prompt issued
    Authenticating,
    /// Menu shown, waiting for a selection
    MenuActive,
    Dispatching,
    OperationDone,
    /// `E` was selected
    Exiting,
}

impl SessionState {
    /// Whether the cycle may move from `self` to `next`
    ///
    /// Any state may fall back to `Idle`; that is how a cycle ends.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (_, Idle)
                | (Idle, TagDetected)
                | (TagDetected, Authenticating)
                | (Authenticating, MenuActive)
                | (MenuActive, Dispatching)
                | (Dispatching, OperationDone)
                | (Dispatching, Exiting)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TagDetected => "tag detected",
            Self::Authenticating => "authenticating",
            Self::MenuActive => "menu active",
            Self::Dispatching => "dispatching",
            Self::OperationDone => "operation done",
            Self::Exiting => "exiting",
        };
        f.write_str(name)
    }
}

/// The tag being served and whether its password was verified
#[derive(Debug, Clone)]
pub struct Session {
    token: Token,
    authenticated: bool,
}

impl Session {
    pub fn new(token: Token) -> Self {
        Self {
            token,
            authenticated: false,
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Mark the password as verified
    pub fn authenticate(&mut self) {
        self.authenticated = true;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
