//! Container action dispatcher.
//!
//! Start, stop, restart and delete are each one POST keyed by container id.
//! Start and stop flip the local status before the request goes out; restart
//! and delete leave it alone. The board in [`board`] owns the optimistic
//! state and its reconciliation.

pub mod board;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::api::ContainerStatus;

pub use board::{
    AdminBoard, BoardItem, BoardStats, ContainerBoard, FetchTicket, OwnedBoard, PendingAction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
    Delete,
}

impl ContainerAction {
    pub const ALL: [Self; 4] = [Self::Start, Self::Stop, Self::Restart, Self::Delete];

    /// Last path segment of the action endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Delete => "delete",
        }
    }

    /// Status to show while the request is in flight, if the action has one.
    pub fn optimistic_status(self) -> Option<ContainerStatus> {
        match self {
            Self::Start => Some(ContainerStatus::Running),
            Self::Stop => Some(ContainerStatus::Stopped),
            Self::Restart | Self::Delete => None,
        }
    }

    /// Past-tense verb for notifications.
    pub fn done_message(self) -> &'static str {
        match self {
            Self::Start => "container started",
            Self::Stop => "container stopped",
            Self::Restart => "container restarted",
            Self::Delete => "container deleted",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for ContainerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.endpoint().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown container action: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Delete gate
// ---------------------------------------------------------------------------

/// Why the delete button is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteBlocked {
    #[error("stop the container before deleting it")]
    NotStopped,
    #[error("type the container name exactly to confirm deletion")]
    NameMismatch,
    #[error("container {0} not found")]
    NotFound(u32),
}

/// Local, advisory precondition for delete: the container must be stopped
/// and `typed` must equal its name exactly.
pub fn check_delete(status: ContainerStatus, name: &str, typed: &str) -> Result<(), DeleteBlocked> {
    if status != ContainerStatus::Stopped {
        return Err(DeleteBlocked::NotStopped);
    }
    if typed != name {
        return Err(DeleteBlocked::NameMismatch);
    }
    Ok(())
}
