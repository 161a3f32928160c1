/// Configuration schema and defaults for the nvpanel control panel.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[api]`, `[session]`, `[telemetry]`, `[actions]`, `[hosting]`, `[web]`
/// and `[logging]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use std::time::Duration;

use serde::{Deserialize, Serialize};

const GIB: u64 = 1024 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level nvpanel configuration.
///
/// Maps directly to the `~/.nvpanel/config.toml` and `.nvpanel.toml` file
/// schemas. All sections and fields are optional: missing values fall back
/// to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
    pub actions: ActionsConfig,
    pub hosting: HostingConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Remote REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the hosting API (without the `/api/v1` prefix).
    pub base_url: String,
    /// Timeout for ordinary API requests (milliseconds).
    pub timeout_ms: u64,
    /// Abort timeout for container creation requests (milliseconds).
    pub create_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nv-server.online".to_string(),
            timeout_ms: 10_000,
            create_timeout_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [session]
// ---------------------------------------------------------------------------

/// Session cookie settings used by the web gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "authToken".to_string(),
            cookie_max_age_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// [telemetry]
// ---------------------------------------------------------------------------

/// Telemetry polling and animation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Fixed polling interval (milliseconds).
    pub poll_interval_ms: u64,
    /// Maximum animation duration for scalar counters (milliseconds).
    pub counter_max_ms: u64,
    /// Maximum animation duration for percentage bars (milliseconds).
    pub bar_max_ms: u64,
    /// Terminal redraw period while watching (milliseconds).
    pub frame_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            counter_max_ms: 500,
            bar_max_ms: 1_000,
            frame_ms: 50,
        }
    }
}

impl TelemetryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// [actions]
// ---------------------------------------------------------------------------

/// Container action dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Delay before the reconciliation re-fetch after a successful action.
    pub reconcile_delay_ms: u64,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            reconcile_delay_ms: 3_000,
        }
    }
}

impl ActionsConfig {
    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// [hosting]
// ---------------------------------------------------------------------------

/// Facts about the hosting platform used when rendering addresses and
/// capacity figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingConfig {
    /// Public domain containers are reachable under.
    pub domain: String,
    /// SSH port prefix; the container id is appended to it.
    pub ssh_port_prefix: String,
    /// Telegram bot used for account linking.
    pub telegram_bot: String,
    /// Total RAM of the hypervisor host (bytes).
    pub host_ram_bytes: u64,
    /// Total storage of the hypervisor host (bytes).
    pub host_storage_bytes: u64,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            domain: "nv-server.online".to_string(),
            ssh_port_prefix: "22".to_string(),
            telegram_bot: "nvcloud_bot".to_string(),
            host_ram_bytes: 16 * GIB,
            host_storage_bytes: 343 * GIB,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Browser gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `nvpanel web`.
    pub bind: String,
    /// Mark the session cookie `Secure` (set when served behind TLS).
    pub secure_cookies: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            secure_cookies: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether activity events are written at all.
    pub enabled: bool,
    /// Override for the activity log location. Defaults to
    /// `~/.nvpanel/activity.jsonl` when empty.
    pub activity_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activity_log: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl PanelConfig {
    /// Annotated TOML written by `nvpanel config init`.
    pub fn default_toml() -> String {
        r#"# nvpanel configuration
#
# Layers: built-in defaults -> ~/.nvpanel/config.toml -> ./.nvpanel.toml
#         -> NVPANEL_* environment variables.

[api]
base_url = "https://api.nv-server.online"
timeout_ms = 10000
# Abort timeout for container creation requests.
create_timeout_ms = 5000

[session]
cookie_name = "authToken"
cookie_max_age_secs = 3600

[telemetry]
poll_interval_ms = 5000
# Animation caps: scalar counters and percentage bars.
counter_max_ms = 500
bar_max_ms = 1000
frame_ms = 50

[actions]
# Delay before re-fetching the container list after an action.
reconcile_delay_ms = 3000

[hosting]
domain = "nv-server.online"
ssh_port_prefix = "22"
telegram_bot = "nvcloud_bot"
host_ram_bytes = 17179869184
host_storage_bytes = 368293445632

[web]
bind = "127.0.0.1:3000"
secure_cookies = false

[logging]
enabled = true
# Empty means ~/.nvpanel/activity.jsonl
activity_log = ""
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let cfg = PanelConfig::default();
        assert_eq!(cfg.telemetry.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.actions.reconcile_delay(), Duration::from_secs(3));
        assert_eq!(cfg.api.create_timeout_ms, 5_000);
        assert_eq!(cfg.session.cookie_name, "authToken");
        assert_eq!(cfg.hosting.host_ram_bytes, 16 * GIB);
    }

    #[test]
    fn default_toml_parses_to_defaults() {
        let parsed: PanelConfig = toml::from_str(&PanelConfig::default_toml()).unwrap();
        let defaults = PanelConfig::default();
        assert_eq!(parsed.api.base_url, defaults.api.base_url);
        assert_eq!(
            parsed.hosting.host_storage_bytes,
            defaults.hosting.host_storage_bytes
        );
        assert_eq!(parsed.telemetry.bar_max_ms, defaults.telemetry.bar_max_ms);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let parsed: PanelConfig = toml::from_str("[api]\ntimeout_ms = 42\n").unwrap();
        assert_eq!(parsed.api.timeout_ms, 42);
        assert_eq!(parsed.api.base_url, "https://api.nv-server.online");
        assert!(parsed.logging.enabled);
    }
}
