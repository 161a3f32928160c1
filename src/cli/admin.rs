//! Administrator commands: the full container listing and ticket
//! moderation.

use std::thread;
use std::time::Instant;

use anyhow::{Result, bail};
use colored::Colorize;

use crate::actions::{AdminBoard, ContainerAction};
use crate::moderation::{Section, TicketBoard};
use crate::notify;
use crate::utils::format;

use super::Session;
use super::containers::colorize_status;

// ---------------------------------------------------------------------------
// nvpanel admin list
// ---------------------------------------------------------------------------

pub fn run_admin_list(expand: Option<u32>) -> Result<()> {
    let session = Session::open()?;
    let mut board = AdminBoard::new(session.config.actions.reconcile_delay())
        .with_activity_log(session.activity.clone());
    board.refresh(&session.client);
    notify::print_all(&board.take_notifications());
    if board.auth_lost() {
        session.expire();
    }
    if !board.is_loaded() {
        bail!("could not load the container listing");
    }
    if let Some(id) = expand {
        board.toggle_expanded(id);
    }
    print_admin_board(&board, &session);
    Ok(())
}

fn print_admin_board(board: &AdminBoard, session: &Session) {
    let hosting = &session.config.hosting;
    let stats = board.stats();

    println!("{}", "All containers".bold().cyan());
    println!("{}", "=".repeat(70));
    println!(
        "  {} {}   {} {}",
        "Total:".bold(),
        stats.total,
        "Running:".bold(),
        stats.running.to_string().green()
    );
    println!(
        "  {} {} of {} ({})",
        "RAM allocated:    ".bold(),
        format::format_bytes(stats.ram_bytes),
        format::format_bytes(hosting.host_ram_bytes),
        format::format_pct(stats.ram_pct(hosting.host_ram_bytes))
    );
    println!(
        "  {} {} of {} ({})",
        "Storage allocated:".bold(),
        format::format_bytes(stats.rom_bytes),
        format::format_bytes(hosting.host_storage_bytes),
        format::format_pct(stats.rom_pct(hosting.host_storage_bytes))
    );
    println!();
    println!(
        "  {:<6} {:<20} {:<14} {:<10}",
        "ID", "Name", "Owner", "Status"
    );
    println!("  {}", "-".repeat(60));

    for c in board.items() {
        println!(
            "  {:<6} {:<20} {:<14} {}",
            c.id,
            c.name,
            c.owner_username,
            colorize_status(c.status)
        );
        if board.expanded() == Some(c.id) {
            println!(
                "         {} {}  {} {}  {} {}",
                "CPU".dimmed(),
                format::format_cores(c.cpu_cores),
                "RAM".dimmed(),
                format::format_bytes(c.ram_bytes),
                "Storage".dimmed(),
                format::format_bytes(c.rom_bytes)
            );
            println!(
                "         {} {}",
                "SSH".dimmed(),
                format::ssh_command(hosting, &c.name, c.id)
            );
        }
    }
}

// ---------------------------------------------------------------------------
// nvpanel admin start|stop|restart|delete
// ---------------------------------------------------------------------------

/// Admin actions skip the delete confirmation gate.
pub fn run_admin_action(action: ContainerAction, id: u32, wait: bool) -> Result<()> {
    let session = Session::open()?;
    let mut board = AdminBoard::new(session.config.actions.reconcile_delay())
        .with_activity_log(session.activity.clone());
    board.refresh(&session.client);

    let result = board.dispatch(&session.client, action, id, Instant::now());
    notify::print_all(&board.take_notifications());
    if board.auth_lost() {
        session.expire();
    }
    result?;

    if wait && let Some(deadline) = board.reconcile_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        board.poll_reconcile(&session.client, Instant::now());
        notify::print_all(&board.take_notifications());
        print_admin_board(&board, &session);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// nvpanel tickets
// ---------------------------------------------------------------------------

pub fn run_tickets_list(show_open: bool, show_closed: bool) -> Result<()> {
    let session = Session::open()?;
    let mut board = TicketBoard::new().with_activity_log(session.activity.clone());
    let loaded = board.load(&session.client);
    notify::print_all(&board.take_notifications());
    if let Err(e) = loaded {
        if e.is_unauthorized() {
            session.expire();
        }
        return Err(e.into());
    }

    // Both sections are shown unless one is asked for explicitly.
    let both = !show_open && !show_closed;
    if show_open || both {
        board.toggle_section(Section::Open);
    }
    if show_closed || both {
        board.toggle_section(Section::Closed);
    }

    for (section, title) in [(Section::Open, "Open tickets"), (Section::Closed, "Closed tickets")] {
        let tickets = board.section(section);
        println!(
            "{} {}",
            title.bold().cyan(),
            format!("({})", tickets.len()).dimmed()
        );
        if !board.is_section_expanded(section) {
            println!();
            continue;
        }
        if tickets.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for t in tickets {
            println!(
                "  {:<10} {:<18} {:<12} {} · {} RAM · {} storage  {}",
                t.id,
                t.name,
                t.owner_username,
                format::format_cores(t.cpu_cores),
                format::format_bytes(t.ram_bytes),
                format::format_bytes(t.rom_bytes),
                crate::profile::format_registration_date(&t.created_at).dimmed()
            );
        }
        println!();
    }
    Ok(())
}

pub fn run_ticket_approve(id: &str) -> Result<()> {
    moderate(id, true)
}

pub fn run_ticket_reject(id: &str) -> Result<()> {
    moderate(id, false)
}

fn moderate(id: &str, approve: bool) -> Result<()> {
    let session = Session::open()?;
    let mut board = TicketBoard::new().with_activity_log(session.activity.clone());
    // Only needed for ticket names in notifications.
    let _ = board.load(&session.client);
    board.take_notifications();

    let result = if approve {
        board.approve(&session.client, id)
    } else {
        board.reject(&session.client, id)
    };
    notify::print_all(&board.take_notifications());
    if let Err(e) = result {
        if e.is_unauthorized() {
            session.expire();
        }
        return Err(e.into());
    }
    Ok(())
}
