//! Resource selectors and the container creation form.
//!
//! A creation request is a ticket: it is only turned into a container once
//! an administrator approves it.

use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::{ApiError, NewTicket, PanelApi};
use crate::notify::Notification;
use crate::validation::{self, ValidationError};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Controlled numeric input: a slider bounded by `min..=max` on a `step`
/// grid, plus quick-select preset buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSelector {
    pub label: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub quick_select: &'static [f64],
    value: f64,
}

impl ResourceSelector {
    pub fn new(
        label: &'static str,
        unit: &'static str,
        (min, max, step): (f64, f64, f64),
        quick_select: &'static [f64],
        initial: f64,
    ) -> Self {
        let mut selector = Self {
            label,
            unit,
            min,
            max,
            step,
            quick_select,
            value: min,
        };
        selector.set(initial);
        selector
    }

    pub fn cpu() -> Self {
        Self::new("CPU", "cores", (1.0, 2.0, 1.0), &[1.0, 2.0], 1.0)
    }

    pub fn ram() -> Self {
        Self::new("RAM", "GB", (1.0, 4.0, 0.25), &[1.0, 2.0, 3.0, 4.0], 1.0)
    }

    pub fn storage() -> Self {
        Self::new("Storage", "GB", (4.0, 15.0, 1.0), &[4.0, 5.0, 10.0, 15.0], 4.0)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Clamp into range and snap to the nearest step counted from `min`.
    /// Non-finite input is ignored.
    pub fn set(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        self.value = (self.min + steps * self.step).clamp(self.min, self.max);
    }

    /// Jump to a preset. Values that are not presets are rejected.
    pub fn quick_select(&mut self, preset: f64) -> bool {
        if self.quick_select.contains(&preset) {
            self.set(preset);
            true
        } else {
            false
        }
    }

    /// Whether the preset button for `preset` shows as active.
    pub fn is_selected(&self, preset: f64) -> bool {
        self.value == preset
    }
}

// ---------------------------------------------------------------------------
// Creation form
// ---------------------------------------------------------------------------

const ADJECTIVES: &[&str] = &[
    "fast", "cloud", "secure", "static", "smart", "global", "silent", "active", "cool", "modern",
    "cyber", "swift", "bright", "sharp", "solid", "stable", "clean", "prime", "nova", "hyper",
    "rapid", "alpha", "micro", "macro", "vivid", "simple", "sonic", "power", "rocket", "lunar",
    "urban", "soft", "green", "sky", "orbit", "deep", "crisp", "light", "neon", "vapor",
];

const NOUNS: &[&str] = &[
    "node", "host", "server", "vm", "core", "unit", "box", "pod", "hub", "base", "net", "root",
    "cube", "rack", "grid", "zone", "gate", "farm", "link", "loop", "pipe", "load", "blob", "cell",
    "byte", "heap", "stack", "flux", "data", "code", "bin", "disk", "vault", "site", "path",
    "mesh", "port", "tier", "shell", "proxy",
];

/// `<adjective>-<noun>-<0..=99>`; always a valid hostname.
pub fn random_hostname() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("fast");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("node");
    let number: u8 = rng.random_range(0..100);
    format!("{adjective}-{noun}-{number}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateForm {
    pub hostname: String,
    pub cpu: ResourceSelector,
    pub ram: ResourceSelector,
    pub storage: ResourceSelector,
}

impl Default for CreateForm {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            cpu: ResourceSelector::cpu(),
            ram: ResourceSelector::ram(),
            storage: ResourceSelector::storage(),
        }
    }
}

impl CreateForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn randomize_hostname(&mut self) {
        self.hostname = random_hostname();
    }

    /// Request body, with GiB selections converted to bytes.
    pub fn to_ticket(&self) -> NewTicket {
        NewTicket {
            rom_bytes: (self.storage.value() * GIB).round() as u64,
            ram_bytes: (self.ram.value() * GIB).round() as u64,
            cpu_cores: self.cpu.value().round() as u32,
            host_name: self.hostname.trim().to_string(),
        }
    }

    /// Validate the hostname, then submit the creation ticket.
    pub fn submit(&self, api: &dyn PanelApi, log: &ActivityLog) -> Result<(), CreateError> {
        let ticket = self.to_ticket();
        validation::validate_hostname(&ticket.host_name)?;
        let result = api.create_ticket(&ticket);
        log.record_outcome(ActivityKind::TicketCreated, &ticket.host_name, &result);
        result.map_err(CreateError::from)
    }

    /// Toast for a submission result.
    pub fn notification(&self, result: &Result<(), CreateError>) -> Notification {
        match result {
            Ok(()) => Notification::success(format!(
                "request to create container {} submitted",
                self.hostname.trim()
            )),
            Err(CreateError::Invalid(e)) => Notification::error(e.to_string()),
            Err(CreateError::Api(ApiError::Network(_))) => {
                Notification::error("API unavailable, try again later")
            }
            Err(CreateError::Api(ApiError::Status { message, .. })) => {
                Notification::error(format!("could not submit creation request: {message}"))
            }
            Err(CreateError::Api(e)) => {
                Notification::error(format!("could not submit creation request: {e}"))
            }
        }
    }
}
