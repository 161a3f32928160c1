//! Terminal surface.
//!
//! Subcommand handlers for:
//! - `nvpanel login|register|logout`: session management
//! - `nvpanel profile`: account details and own containers
//! - `nvpanel containers|create|start|stop|restart|delete|watch`: see [`containers`]
//! - `nvpanel admin ...|tickets ...`: see [`admin`]
//! - `nvpanel config show|init|set|reset`: configuration management
//! - `nvpanel activity`: recent activity log entries

pub mod admin;
pub mod containers;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::activity::{self, ActivityLog};
use crate::api::ApiClient;
use crate::auth::{self, FileSessionStore, RegistrationForm, SessionStore};
use crate::config::{self, schema::PanelConfig};
use crate::profile::{self, ProfileView, TelegramState};

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

/// Resolved config, token store, activity log and an authenticated client.
pub(crate) struct Session {
    pub config: PanelConfig,
    pub store: FileSessionStore,
    pub client: ApiClient,
    pub activity: ActivityLog,
}

impl Session {
    pub fn open() -> Result<Self> {
        let config = config::load();
        let store = FileSessionStore::new();
        let Some(token) = store.load() else {
            bail!("not logged in; run `nvpanel login` first");
        };
        let client = ApiClient::from_config(&config.api).with_token(token);
        let activity = ActivityLog::from_config(&config.logging);
        Ok(Self {
            config,
            store,
            client,
            activity,
        })
    }

    /// Drop the stored token after the API answered 401.
    pub fn expire(&self) {
        self.store.clear();
        eprintln!(
            "{}",
            "Session expired. Run `nvpanel login` to sign in again.".yellow()
        );
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt(label),
    }
}

// ---------------------------------------------------------------------------
// nvpanel login / register / logout
// ---------------------------------------------------------------------------

pub fn run_login(username: Option<String>, password: Option<String>) -> Result<()> {
    let cfg = config::load();
    let username = value_or_prompt(username, "Username")?;
    let password = value_or_prompt(password, "Password")?;

    let client = ApiClient::from_config(&cfg.api);
    let store = FileSessionStore::new();
    let log = ActivityLog::from_config(&cfg.logging);
    auth::login(&client, &store, &log, &username, &password)?;

    println!("{} Logged in as {}", "✓".green().bold(), username.bold());
    Ok(())
}

pub fn run_register(
    email: Option<String>,
    username: Option<String>,
    full_name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let cfg = config::load();
    let form = RegistrationForm {
        email: value_or_prompt(email, "E-mail")?,
        username: value_or_prompt(username, "Username")?,
        full_name: value_or_prompt(full_name, "Full name (three words)")?,
        password: value_or_prompt(password.clone(), "Password")?,
        confirm_password: match password {
            Some(p) => p,
            None => prompt("Confirm password")?,
        },
    };

    let client = ApiClient::from_config(&cfg.api);
    let store = FileSessionStore::new();
    let log = ActivityLog::from_config(&cfg.logging);
    auth::register(&client, &store, &log, &form)?;

    println!(
        "{} Registered and logged in as {}",
        "✓".green().bold(),
        form.username.bold()
    );
    Ok(())
}

pub fn run_logout() -> Result<()> {
    let cfg = config::load();
    auth::logout(&FileSessionStore::new(), &ActivityLog::from_config(&cfg.logging));
    println!("{} Logged out", "✓".green().bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel profile
// ---------------------------------------------------------------------------

pub fn run_profile() -> Result<()> {
    let session = Session::open()?;
    let view = ProfileView::load(&session.client);

    if view.auth_lost() {
        session.expire();
    }
    let Some(user) = &view.profile else {
        bail!(
            view.error
                .clone()
                .unwrap_or_else(|| "could not load profile".to_string())
        );
    };
    let hosting = &session.config.hosting;

    println!("{}", "Profile".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Full name:   ".bold(), user.full_name);
    println!("  {} {}", "E-mail:      ".bold(), user.email);
    println!("  {} {}", "Username:    ".bold(), user.username);
    println!(
        "  {} {}",
        "Registered:  ".bold(),
        profile::format_registration_date(&user.registration_date)
    );
    println!("  {} {}", "Containers:  ".bold(), user.total_containers);
    match view.telegram(hosting) {
        Some(TelegramState::Pending(link)) => {
            println!("  {} {}", "Telegram:    ".bold(), link.underline())
        }
        Some(TelegramState::Linked) => println!("  {} {}", "Telegram:    ".bold(), "linked".green()),
        None => {}
    }
    println!();

    println!("{}", "My containers".bold().cyan());
    let rows = view.rows(hosting);
    if rows.is_empty() {
        println!("  {}", "No containers yet. Create one with `nvpanel create`.".dimmed());
    }
    for row in rows {
        let dot = if row.running { "●".green() } else { "●".red() };
        println!("  {dot} {:<6} {:<40} {}", row.id, row.address, row.status_text());
    }

    if let Some(error) = &view.error {
        println!();
        println!("{}", error.red());
    }

    if view.is_admin() {
        println!();
        println!("{}", "Admin".bold().cyan());
        println!("  {}", "nvpanel admin list      — all containers".dimmed());
        println!("  {}", "nvpanel tickets list    — moderation queue".dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel config
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective nvpanel configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.nvpanel/config.toml");
    print_source(project_exists, ".nvpanel.toml");
    println!("  {} {}", "·".dimmed(), "NVPANEL_* environment variables".dimmed());
    Ok(())
}

fn print_source(exists: bool, label: &str) {
    if exists {
        println!("  {} {}", "✓".green(), label.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
    }
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel activity
// ---------------------------------------------------------------------------

pub fn run_activity(limit: usize) -> Result<()> {
    let events = activity::read_recent(&config::load().logging, limit);
    if events.is_empty() {
        println!("{}", "No activity recorded yet.".yellow());
        return Ok(());
    }

    println!(
        "  {:<20} {:<20} {:<14} {:<6} Detail",
        "Time", "Event", "Target", "OK"
    );
    println!("  {}", "-".repeat(72));
    for event in events {
        let time = chrono::DateTime::parse_from_rfc3339(&event.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or(event.timestamp);
        let ok = if event.success { "yes".green() } else { "no".red() };
        println!(
            "  {:<20} {:<20} {:<14} {:<6} {}",
            time,
            event.kind.to_string(),
            truncate(&event.target, 14),
            ok,
            event.detail.unwrap_or_default().dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
