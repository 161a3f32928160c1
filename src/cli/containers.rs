//! Container commands: listing, creation, power actions and live telemetry.

use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::actions::{ContainerAction, OwnedBoard};
use crate::api::{ContainerStatus, PanelApi};
use crate::notify;
use crate::resources::{CreateError, CreateForm};
use crate::telemetry::{self, Frame, PollOutcome, TelemetryView};
use crate::utils::format;

use super::Session;

// ---------------------------------------------------------------------------
// nvpanel containers
// ---------------------------------------------------------------------------

pub fn run_containers() -> Result<()> {
    let session = Session::open()?;
    let mut board = OwnedBoard::new(session.config.actions.reconcile_delay())
        .with_activity_log(session.activity.clone());
    board.refresh(&session.client);
    notify::print_all(&board.take_notifications());
    if board.auth_lost() {
        session.expire();
        bail!("authorization required");
    }

    let stats = board.stats();
    println!(
        "{} {} total, {} running",
        "Containers:".bold().cyan(),
        stats.total,
        stats.running.to_string().green()
    );
    println!("  {:<6} {:<20} {:<10} Address", "ID", "Name", "Status");
    println!("  {}", "-".repeat(70));
    for c in board.items() {
        println!(
            "  {:<6} {:<20} {:<10} {}",
            c.id,
            c.name,
            colorize_status(c.status),
            format::container_address(&session.config.hosting, &c.name, c.id)
        );
    }
    Ok(())
}

pub(crate) fn colorize_status(status: ContainerStatus) -> colored::ColoredString {
    match status {
        ContainerStatus::Running => "running".green(),
        ContainerStatus::Stopped => "stopped".red(),
    }
}

// ---------------------------------------------------------------------------
// nvpanel create
// ---------------------------------------------------------------------------

pub fn run_create(hostname: Option<String>, cpu: f64, ram: f64, storage: f64) -> Result<()> {
    let session = Session::open()?;
    let mut form = CreateForm::new();
    match hostname {
        Some(name) => form.hostname = name,
        None => form.randomize_hostname(),
    }
    form.cpu.set(cpu);
    form.ram.set(ram);
    form.storage.set(storage);

    println!(
        "Requesting {} — {} CPU, {} GB RAM, {} GB storage",
        form.hostname.bold(),
        form.cpu.value(),
        form.ram.value(),
        form.storage.value()
    );

    submit_create(&session, &form)?;
    println!(
        "  {}",
        "An administrator will review the request shortly.".dimmed()
    );
    Ok(())
}

/// Send the request and print its notification. A 401 drops the stored
/// token.
fn submit_create(session: &Session, form: &CreateForm) -> Result<()> {
    let result = form.submit(&session.client, &session.activity);
    let note = form.notification(&result);
    println!("{note}");
    if let Err(CreateError::Api(e)) = &result
        && e.is_unauthorized()
    {
        session.expire();
    }
    if note.is_error() {
        bail!("container request was not submitted");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel start / stop / restart / delete
// ---------------------------------------------------------------------------

/// Run one action against an owned container, then wait out the
/// reconciliation delay and show the server's view.
pub fn run_action(action: ContainerAction, id: u32, confirm: Option<&str>, wait: bool) -> Result<()> {
    let session = Session::open()?;
    let mut board = OwnedBoard::new(session.config.actions.reconcile_delay())
        .with_activity_log(session.activity.clone());
    board.refresh(&session.client);
    if board.auth_lost() {
        notify::print_all(&board.take_notifications());
        session.expire();
        bail!("authorization required");
    }
    let Some(container) = board.get(id) else {
        bail!("container {id} not found in your containers");
    };
    let name = container.name.clone();

    let now = Instant::now();
    let result = if action == ContainerAction::Delete {
        match board.delete_confirmed(&session.client, id, confirm.unwrap_or_default(), now) {
            Ok(result) => result,
            Err(blocked) => bail!("{blocked}"),
        }
    } else {
        let pending = board.begin_action(action, id);
        if let Some(optimistic) = board.get(id) {
            println!("{} {}", name.bold(), colorize_status(optimistic.status).dimmed());
        }
        let response = session.client.container_action(action, id);
        board.finish_action(&session.client, pending, response, now)
    };

    notify::print_all(&board.take_notifications());
    if board.auth_lost() {
        session.expire();
    }
    result?;

    if wait && action != ContainerAction::Delete
        && let Some(deadline) = board.reconcile_deadline()
    {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        board.poll_reconcile(&session.client, Instant::now());
        notify::print_all(&board.take_notifications());
        if let Some(c) = board.get(id) {
            println!("{} is {}", name.bold(), colorize_status(c.status));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel watch
// ---------------------------------------------------------------------------

/// Live telemetry: poll on the configured interval, redraw every frame.
pub fn run_watch(id: u32, reveal: bool, once: bool) -> Result<()> {
    let session = Session::open()?;
    let cfg = &session.config;
    let start = Instant::now();
    let mut view =
        TelemetryView::new(id, &cfg.telemetry, start).with_activity_log(session.activity.clone());
    if reveal {
        view.toggle_password();
    }

    if once {
        view.poll_due(start);
        let outcome = view.poll_now(&session.client, start);
        return finish_once(&session, &view, outcome);
    }

    let (tx, rx) = mpsc::channel();
    let frame = cfg.telemetry.frame();
    loop {
        let now = Instant::now();
        if view.poll_due(now) {
            telemetry::spawn_fetch(session.client.clone(), id, tx.clone());
        }
        while let Ok(result) = rx.try_recv() {
            if view.apply(result, Instant::now()) == PollOutcome::AuthLost {
                session.expire();
                bail!("authorization required");
            }
        }
        draw(&view, Instant::now(), &session)?;
        thread::sleep(frame);
    }
}

fn finish_once(session: &Session, view: &TelemetryView, outcome: PollOutcome) -> Result<()> {
    match outcome {
        PollOutcome::AuthLost => {
            session.expire();
            bail!("authorization required")
        }
        PollOutcome::Failed(message) => bail!(message),
        PollOutcome::Updated => {
            // Render the settled frame.
            let settled = Instant::now() + Duration::from_secs(2);
            print!("{}", render(view, settled, session));
            Ok(())
        }
    }
}

fn draw(view: &TelemetryView, now: Instant, session: &Session) -> Result<()> {
    let mut out = io::stdout().lock();
    redraw(&mut out, &render(view, now, session))?;
    Ok(())
}

/// Clear the terminal and write one frame from the top-left corner.
fn redraw(out: &mut impl Write, frame: &str) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    write!(out, "{frame}")?;
    out.flush()
}

fn render(view: &TelemetryView, now: Instant, session: &Session) -> String {
    let hosting = &session.config.hosting;
    let (Some(snapshot), Some(frame)) = (view.snapshot(), view.frame(now)) else {
        return match view.error() {
            Some(error) => format!("{}\n", error.red()),
            None => format!("{}\n", "Loading telemetry…".dimmed()),
        };
    };
    let Frame {
        cpu_pct,
        cpu_bar,
        ram_used,
        ram_bar,
        rom_used,
        rom_bar,
        io_ops,
        net_in_rate,
        net_out_rate,
        net_in_total,
        net_out_total,
    } = frame;
    let c = &snapshot.container;

    let mut s = String::new();
    s += &format!(
        "{} {}  {}\n",
        c.name.bold().cyan(),
        format!("#{}", c.id).dimmed(),
        colorize_status(c.status)
    );
    s += &format!("{}\n", "=".repeat(60));
    s += &format!(
        "  {} {}\n",
        "SSH:      ".bold(),
        format::ssh_command(hosting, &c.name, c.id)
    );
    s += &format!("  {} {}\n", "User:     ".bold(), snapshot.user.username);
    s += &format!(
        "  {} {}\n\n",
        "Password: ".bold(),
        format::mask_password(&snapshot.user.password, view.password_revealed())
    );
    s += &format!(
        "  {} {} {:>4}  {}\n",
        "CPU    ".bold(),
        format::text_bar(cpu_bar, 30),
        format!("{cpu_pct}%"),
        format::format_cores(snapshot.cpu.cpu_cores).dimmed()
    );
    s += &format!(
        "  {} {} {} / {}\n",
        "RAM    ".bold(),
        format::text_bar(ram_bar, 30),
        format::format_bytes(ram_used),
        format::format_bytes(snapshot.ram.ram_bytes)
    );
    s += &format!(
        "  {} {} {} / {}\n\n",
        "Storage".bold(),
        format::text_bar(rom_bar, 30),
        format::format_bytes(rom_used),
        format::format_bytes(snapshot.rom.rom_bytes)
    );
    s += &format!(
        "  {} ↓ {}/s (total {})   ↑ {}/s (total {})\n",
        "Network".bold(),
        format::format_bytes(net_in_rate),
        format::format_bytes(net_in_total),
        format::format_bytes(net_out_rate),
        format::format_bytes(net_out_total)
    );
    s += &format!(
        "  {} {} ({})\n",
        "Disk IO".bold(),
        format::format_io(io_ops),
        format::IoLevel::from_ops(snapshot.io.io_operations)
    );
    if let Some(error) = view.error() {
        s += &format!("\n{}\n", error.red());
    }
    s
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;
    use crate::activity::ActivityLog;
    use crate::api::ApiClient;
    use crate::auth::{FileSessionStore, SessionStore};
    use crate::config::schema::PanelConfig;

    fn session_against(server: &Server, store: FileSessionStore) -> Session {
        let mut config = PanelConfig::default();
        config.api.base_url = server.url();
        Session {
            client: ApiClient::from_config(&config.api).with_token("tok"),
            config,
            store,
            activity: ActivityLog::disabled(),
        }
    }

    #[test]
    fn redraw_clears_before_writing_the_frame() {
        let mut out = Vec::new();
        redraw(&mut out, "web-1 running").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1b[2J"));
        assert!(text.ends_with("web-1 running"));
    }

    #[test]
    fn unauthorized_create_clears_stored_token() {
        let mut server = Server::new();
        let ticket = server
            .mock("POST", "/api/v1/proxmox/container/ticket")
            .with_status(401)
            .create();
        let path = std::env::temp_dir().join(format!("nvpanel-session-{}", std::process::id()));
        let store = FileSessionStore::at(path.clone());
        store.save("tok").unwrap();

        let session = session_against(&server, store);
        let mut form = CreateForm::new();
        form.hostname = "quiet-otter".to_string();

        assert!(submit_create(&session, &form).is_err());
        assert_eq!(session.store.load(), None);
        ticket.assert();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn accepted_create_keeps_token() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/v1/proxmox/container/ticket")
            .with_status(201)
            .create();
        let path = std::env::temp_dir().join(format!("nvpanel-session-ok-{}", std::process::id()));
        let store = FileSessionStore::at(path.clone());
        store.save("tok").unwrap();

        let session = session_against(&server, store);
        let mut form = CreateForm::new();
        form.hostname = "quiet-otter".to_string();

        submit_create(&session, &form).unwrap();
        assert_eq!(session.store.load().as_deref(), Some("tok"));
        let _ = std::fs::remove_file(&path);
    }
}
