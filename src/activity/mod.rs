//! Activity log: one JSON line per user-visible operation.
//!
//! Records logins, container actions, reconciliations, ticket moderation and
//! guard redirects so an operator can see what the panel did and when.
//!
//! Log file: `~/.nvpanel/activity.jsonl` (override with
//! `[logging] activity_log`). Each surface resolves an [`ActivityLog`] from
//! its own config and hands it to the view-models. Writing is best-effort
//! and never fails the operation being logged.

use std::fmt;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Register,
    Logout,
    ContainerAction,
    Reconcile,
    TelemetryAuthLost,
    TicketCreated,
    TicketApproved,
    TicketRejected,
    GuardRedirect,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Logout => "logout",
            Self::ContainerAction => "container_action",
            Self::Reconcile => "reconcile",
            Self::TelemetryAuthLost => "telemetry_auth_lost",
            Self::TicketCreated => "ticket_created",
            Self::TicketApproved => "ticket_approved",
            Self::TicketRejected => "ticket_rejected",
            Self::GuardRedirect => "guard_redirect",
        };
        f.write_str(name)
    }
}

/// A single line of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: String,
    pub kind: ActivityKind,
    /// What the operation was about: a username, container id, ticket id
    /// or request path.
    #[serde(default)]
    pub target: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, target: &str, success: bool, detail: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            target: target.to_string(),
            success,
            detail: detail.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Destination for activity events, resolved once from the caller's
/// `[logging]` settings. A disabled log drops every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn from_config(cfg: &LoggingConfig) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        Self {
            path: activity_log_path_from(&cfg.activity_log),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one event. Best-effort: failures are silently ignored.
    pub fn record(&self, kind: ActivityKind, target: &str, success: bool, detail: Option<&str>) {
        let Some(path) = &self.path else {
            return;
        };
        let event = ActivityEvent::new(kind, target, success, detail);
        let _ = append_event(&event, path);
    }

    /// Convenience: log the outcome of a fallible operation, using the
    /// error's message as detail.
    pub fn record_outcome<T, E: fmt::Display>(
        &self,
        kind: ActivityKind,
        target: &str,
        result: &Result<T, E>,
    ) {
        match result {
            Ok(_) => self.record(kind, target, true, None),
            Err(e) => self.record(kind, target, false, Some(&e.to_string())),
        }
    }
}

fn append_event(event: &ActivityEvent, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(event)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// The most recent `limit` events, oldest first. Malformed lines are
/// skipped; a missing file yields an empty list.
///
/// Reads the configured location even when writing is switched off.
pub fn read_recent(cfg: &LoggingConfig, limit: usize) -> Vec<ActivityEvent> {
    let Some(path) = activity_log_path_from(&cfg.activity_log) else {
        return Vec::new();
    };
    read_recent_from(&path, limit)
}

fn read_recent_from(path: &Path, limit: usize) -> Vec<ActivityEvent> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let entries: Vec<ActivityEvent> = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    let skip = entries.len().saturating_sub(limit);
    entries.into_iter().skip(skip).collect()
}

fn activity_log_path_from(configured: &str) -> Option<PathBuf> {
    if configured.is_empty() {
        config::state_dir().map(|dir| dir.join("activity.jsonl"))
    } else {
        Some(PathBuf::from(configured))
    }
}
