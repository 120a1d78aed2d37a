// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types

use std::fmt;

/// Scheduler error type
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Caller passed an argument the operation cannot accept (empty name, length mismatch)
    InvalidArgument(String),

    /// A system with the same name is already registered
    AlreadyRegistered(String),

    /// `initialize` was called a second time
    AlreadyInitialized,

    /// `update` was called before `initialize`
    NotInitialized,

    /// The manager was disposed and can no longer be used
    Disposed,

    /// No registered system carries this name
    SystemNotFound(String),

    /// A system returned an error from `initialize` or `update`
    SystemFailed(String),

    /// A system panicked; the payload message is preserved
    SystemPanicked(String),

    /// The world holds no column for this component type
    ComponentNotFound(&'static str),

    /// The column is borrowed in a mode that conflicts with the request
    ComponentBusy(&'static str),

    /// Configuration rejected by validation or parsing
    Config(String),
}

impl SchedulerError {
    /// Lifecycle and registration misuse, the "caller's bug" class
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            SchedulerError::AlreadyRegistered(_)
                | SchedulerError::AlreadyInitialized
                | SchedulerError::NotInitialized
                | SchedulerError::Disposed
        )
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            SchedulerError::AlreadyRegistered(name) => {
                write!(f, "System '{name}' is already registered")
            }
            SchedulerError::AlreadyInitialized => write!(f, "Scheduler is already initialized"),
            SchedulerError::NotInitialized => {
                write!(f, "Scheduler must be initialized before update")
            }
            SchedulerError::Disposed => write!(f, "Scheduler has been disposed"),
            SchedulerError::SystemNotFound(name) => write!(f, "System not found: {name}"),
            SchedulerError::SystemFailed(msg) => write!(f, "System failed: {msg}"),
            SchedulerError::SystemPanicked(msg) => write!(f, "System panicked: {msg}"),
            SchedulerError::ComponentNotFound(name) => write!(f, "Component not found: {name}"),
            SchedulerError::ComponentBusy(name) => {
                write!(f, "Component column is busy: {name}")
            }
            SchedulerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Config(err.to_string())
    }
}

/// A failure isolated around one system invocation
#[derive(Debug, Clone, PartialEq)]
pub struct SystemError {
    pub system: String,
    pub frame: u64,
    pub error: SchedulerError,
}

impl SystemError {
    pub fn new(system: impl Into<String>, frame: u64, error: SchedulerError) -> Self {
        Self {
            system: system.into(),
            frame,
            error,
        }
    }

    /// True when the failure was a panic rather than a returned error
    pub fn is_panic(&self) -> bool {
        matches!(self.error, SchedulerError::SystemPanicked(_))
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system '{}' on frame {}: {}",
            self.system, self.frame, self.error
        )
    }
}

impl std::error::Error for SystemError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, SchedulerError>;
