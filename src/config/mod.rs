/// Configuration system for nvpanel.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::PanelConfig::default()`]
/// 2. **User global config**: `~/.nvpanel/config.toml`
/// 3. **Project local config**: `.nvpanel.toml` in the current working directory
/// 4. **Environment variables**: `NVPANEL_*` overrides (highest precedence)
///
/// Malformed TOML files are skipped so a bad edit never locks the user out
/// of the panel.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::PanelConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved nvpanel configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. A file only overrides the keys it sets.
pub fn load() -> PanelConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge TOML files key by key over the defaults; later files win.
fn load_layers(paths: &[Option<PathBuf>]) -> PanelConfig {
    let mut merged = toml::Value::Table(toml::Table::new());
    for layer in paths.iter().filter_map(|p| read_layer(p.as_deref())) {
        merge_toml(&mut merged, layer);
    }
    merged.try_into().unwrap_or_default()
}

/// Parse one file. Files that do not describe a valid config are skipped.
fn read_layer(path: Option<&Path>) -> Option<toml::Value> {
    let content = fs::read_to_string(path?).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    let _: PanelConfig = value.clone().try_into().ok()?;
    Some(value)
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding nvpanel state: `~/.nvpanel/`.
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".nvpanel"))
}

fn global_config_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".nvpanel.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `NVPANEL_API_URL`: API base URL
/// - `NVPANEL_API_TIMEOUT_MS`: request timeout
/// - `NVPANEL_POLL_INTERVAL_MS`: telemetry polling interval
/// - `NVPANEL_RECONCILE_DELAY_MS`: delay before the post-action re-fetch
/// - `NVPANEL_BIND`: web gateway listen address
/// - `NVPANEL_SECURE_COOKIES`: mark session cookies `Secure`
/// - `NVPANEL_LOGGING`: activity log on/off
fn apply_env_overrides(config: &mut PanelConfig) {
    if let Ok(val) = std::env::var("NVPANEL_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Ok(val) = std::env::var("NVPANEL_API_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("NVPANEL_POLL_INTERVAL_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.telemetry.poll_interval_ms = ms;
    }
    if let Ok(val) = std::env::var("NVPANEL_RECONCILE_DELAY_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.actions.reconcile_delay_ms = ms;
    }
    if let Ok(val) = std::env::var("NVPANEL_BIND")
        && !val.is_empty()
    {
        config.web.bind = val;
    }
    if let Ok(val) = std::env::var("NVPANEL_SECURE_COOKIES") {
        config.web.secure_cookies = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("NVPANEL_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.nvpanel/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.nvpanel/ directory")?;
    }

    fs::write(&path, PanelConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `api.base_url`. The existing value's TOML type
/// decides how the raw string is parsed.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&PanelConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((section_path, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config keys are dotted: <section>.<field>, got '{key}'");
    };

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{section_path}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        for val in ["1", "true", "TRUE", "yes", "on", "ON"] {
            assert!(is_truthy(val), "{val} should be truthy");
        }
        for val in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(val), "{val} should be falsy");
        }
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value =
            toml::from_str("[api]\nbase_url = \"https://a.example\"\n").unwrap();
        set_toml_value(&mut root, "api.base_url", "https://b.example").unwrap();
        assert_eq!(
            root["api"]["base_url"].as_str(),
            Some("https://b.example")
        );
    }

    #[test]
    fn set_toml_value_updates_integer_and_bool() {
        let mut root: toml::Value =
            toml::from_str("[telemetry]\npoll_interval_ms = 5000\n[web]\nsecure_cookies = false\n")
                .unwrap();
        set_toml_value(&mut root, "telemetry.poll_interval_ms", "2500").unwrap();
        set_toml_value(&mut root, "web.secure_cookies", "yes").unwrap();
        assert_eq!(root["telemetry"]["poll_interval_ms"].as_integer(), Some(2500));
        assert_eq!(root["web"]["secure_cookies"].as_bool(), Some(true));
    }

    #[test]
    fn set_toml_value_rejects_bad_integer() {
        let mut root: toml::Value = toml::from_str("[api]\ntimeout_ms = 10\n").unwrap();
        assert!(set_toml_value(&mut root, "api.timeout_ms", "soon").is_err());
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str("[api]\ntimeout_ms = 10\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "api.nope", "value").is_err());
        assert!(set_toml_value(&mut root, "flat", "value").is_err());
    }

    fn write_layer(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("nvpanel-{name}-{}.toml", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn project_layer_overrides_only_its_own_keys() {
        let global = write_layer(
            "global",
            "[api]\nbase_url = \"https://global.example\"\ntimeout_ms = 2500\n",
        );
        let project = write_layer(
            "project",
            "[web]\nbind = \"0.0.0.0:8080\"\n[api]\ntimeout_ms = 900\n",
        );

        let config = load_layers(&[Some(global.clone()), Some(project.clone())]);
        assert_eq!(config.api.base_url, "https://global.example");
        assert_eq!(config.api.timeout_ms, 900);
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert_eq!(config.session.cookie_name, PanelConfig::default().session.cookie_name);

        let _ = fs::remove_file(global);
        let _ = fs::remove_file(project);
    }

    #[test]
    fn malformed_layer_is_skipped() {
        let global = write_layer("global-ok", "[web]\nbind = \"127.0.0.1:4000\"\n");
        let broken = write_layer("broken", "[api]\ntimeout_ms = \"soon\"\n");

        let config = load_layers(&[Some(global.clone()), Some(broken.clone()), None]);
        assert_eq!(config.web.bind, "127.0.0.1:4000");
        assert_eq!(config.api.timeout_ms, PanelConfig::default().api.timeout_ms);

        let _ = fs::remove_file(global);
        let _ = fs::remove_file(broken);
    }

    #[test]
    fn show_effective_config_round_trips() {
        let toml_str = show_effective_config().unwrap();
        let _: PanelConfig = toml::from_str(&toml_str).unwrap();
    }
}
