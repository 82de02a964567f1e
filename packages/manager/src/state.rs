//! Connection state machine for the whole queue set.
//!
//! ```text
//! Disconnected --begin_connect--> Connecting --finish_connect(ok)--> Connected
//!      ^                              |                                  |
//!      +---finish_connect(failed)-----+                             begin_close
//!                                                                        v
//!                                                                      Closed
//! ```
//!
//! `Closed` is terminal. Only `Connected` accepts jobs.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};

/// Lifecycle status of a queue manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    /// Readiness of the queues is being awaited.
    Connecting,
    Connected,
    Closed,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Guarded transitions between [`ConnectionStatus`] values.
pub struct ConnectionState {
    label: String,
    status: Mutex<ConnectionStatus>,
}

impl ConnectionState {
    /// Create a disconnected state; `label` names the owner in errors.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: Mutex::new(ConnectionStatus::Disconnected),
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_connected(&self) -> ManagerError {
        ManagerError::NotConnected {
            manager: self.label.clone(),
        }
    }

    fn already_closed(&self) -> ManagerError {
        ManagerError::AlreadyClosed {
            manager: self.label.clone(),
        }
    }

    /// Check that jobs may be submitted.
    pub fn ensure_connected(&self) -> ManagerResult<()> {
        match self.status() {
            ConnectionStatus::Connected => Ok(()),
            ConnectionStatus::Closed => Err(self.already_closed()),
            ConnectionStatus::Disconnected | ConnectionStatus::Connecting => {
                Err(self.not_connected())
            }
        }
    }

    /// `Disconnected -> Connecting`.
    pub fn begin_connect(&self) -> ManagerResult<()> {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        match *status {
            ConnectionStatus::Disconnected => {
                *status = ConnectionStatus::Connecting;
                Ok(())
            }
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                Err(ManagerError::AlreadyConnected {
                    manager: self.label.clone(),
                })
            }
            ConnectionStatus::Closed => Err(self.already_closed()),
        }
    }

    /// `Connecting -> Connected` when every queue is ready, back to
    /// `Disconnected` otherwise.
    pub fn finish_connect(&self, ready: bool) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if *status == ConnectionStatus::Connecting {
            *status = if ready {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            };
        }
    }

    /// `Connected -> Closed`.
    pub fn begin_close(&self) -> ManagerResult<()> {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        match *status {
            ConnectionStatus::Connected => {
                *status = ConnectionStatus::Closed;
                Ok(())
            }
            ConnectionStatus::Closed => Err(self.already_closed()),
            ConnectionStatus::Disconnected | ConnectionStatus::Connecting => {
                Err(self.not_connected())
            }
        }
    }
}
