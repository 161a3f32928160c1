//! Server-rendered HTML for the browser surface.
//!
//! Every page is a plain function from view-model to markup. Pages carry no
//! script; live telemetry and reconciliation use `<meta http-equiv=refresh>`.

use std::fmt::Write;

use crate::actions::{AdminBoard, ContainerAction, OwnedBoard};
use crate::api::{ContainerStatus, Ticket};
use crate::auth::RegistrationForm;
use crate::config::schema::HostingConfig;
use crate::moderation::{Section, TicketBoard};
use crate::notify::Notification;
use crate::profile::{self, ProfileView, TelegramState};
use crate::resources::{CreateForm, ResourceSelector};
use crate::telemetry::{Frame, TelemetryView};
use crate::utils::format;

use super::escape_html as esc;

const STYLE: &str = r#"
:root { --bg:#0d1117; --surface:#161b22; --border:#30363d; --text:#e6edf3;
  --muted:#8b949e; --accent:#58a6ff; --green:#3fb950; --red:#f85149; --radius:8px; }
* { box-sizing:border-box; }
body { margin:0; background:var(--bg); color:var(--text);
  font:14px/1.5 -apple-system,BlinkMacSystemFont,'Segoe UI',Helvetica,Arial,sans-serif; }
.app { max-width:1000px; margin:0 auto; padding:24px; }
header { display:flex; justify-content:space-between; align-items:center;
  border-bottom:1px solid var(--border); padding-bottom:12px; margin-bottom:20px; }
header a { color:var(--muted); margin-left:14px; text-decoration:none; }
a { color:var(--accent); }
.card { background:var(--surface); border:1px solid var(--border);
  border-radius:var(--radius); padding:16px; margin-bottom:16px; }
.muted { color:var(--muted); }
table { width:100%; border-collapse:collapse; }
td, th { text-align:left; padding:6px 8px; border-bottom:1px solid var(--border); }
.running { color:var(--green); } .stopped { color:var(--red); }
.bar { background:var(--border); border-radius:4px; height:8px; width:100%; }
.bar span { display:block; height:8px; border-radius:4px; background:var(--accent); }
.toast { padding:8px 12px; border-radius:var(--radius); margin-bottom:8px; }
.toast.success { background:#12361f; }
.toast.error { background:#3d1418; }
.error { color:var(--red); }
input, button { font:inherit; padding:6px 10px; border-radius:6px;
  border:1px solid var(--border); background:var(--bg); color:var(--text); }
button { cursor:pointer; } button.selected { border-color:var(--accent); }
form.inline { display:inline; }
label { display:block; margin:8px 0 4px; }
"#;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Auto-reload target for a page.
pub struct Refresh<'a> {
    pub secs: u64,
    pub url: &'a str,
}

fn layout(
    title: &str,
    signed_in: bool,
    notes: &[Notification],
    refresh: Option<Refresh<'_>>,
    body: &str,
) -> String {
    let refresh = refresh
        .map(|r| {
            format!(
                r#"<meta http-equiv="refresh" content="{};url={}">"#,
                r.secs,
                esc(r.url)
            )
        })
        .unwrap_or_default();
    let nav = if signed_in {
        r#"<nav><a href="/profile">Profile</a><a href="/dashboard">Dashboard</a><a href="/container/create">New container</a><a href="/logout">Log out</a></nav>"#
    } else {
        r#"<nav><a href="/login">Log in</a><a href="/register">Register</a></nav>"#
    };
    let toasts: String = notes
        .iter()
        .map(|n| format!(r#"<div class="{}">{}</div>"#, n.css_class(), esc(&n.message)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{refresh}
<title>{title} · NV cloud</title>
<style>{STYLE}</style>
</head>
<body>
<div class="app">
<header><strong>NV cloud</strong>{nav}</header>
{toasts}
{body}
</div>
</body>
</html>
"#,
        title = esc(title),
    )
}

fn status_span(status: ContainerStatus) -> String {
    format!(r#"<span class="{status}">{status}</span>"#)
}

fn bar(pct: f64) -> String {
    format!(
        r#"<div class="bar"><span style="width:{:.1}%"></span></div>"#,
        pct.clamp(0.0, 100.0)
    )
}

fn action_button(url: &str, action: ContainerAction) -> String {
    format!(
        r#"<form class="inline" method="post" action="{}"><button>{action}</button></form>"#,
        esc(url)
    )
}

// ---------------------------------------------------------------------------
// Public pages
// ---------------------------------------------------------------------------

pub fn landing() -> String {
    layout(
        "Welcome",
        false,
        &[],
        None,
        r#"<div class="card"><h1>Containers on demand</h1>
<p class="muted">Request a container, wait for approval, connect over SSH.</p>
<p><a href="/register">Create an account</a> or <a href="/login">log in</a>.</p></div>"#,
    )
}

pub fn not_found() -> String {
    layout(
        "Not found",
        false,
        &[],
        None,
        r#"<div class="card"><h1>404</h1><p class="muted">Nothing lives here.</p></div>"#,
    )
}

pub fn login(username: &str, from: Option<&str>, error: Option<&str>) -> String {
    let action = match from {
        Some(from) => format!("/login?from={}", crate::guard::encode_query_value(from)),
        None => "/login".to_string(),
    };
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, esc(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card"><h1>Log in</h1>
<form method="post" action="{action}">
<label>Username</label><input name="username" value="{username}" required>
<label>Password</label><input name="password" type="password" required>
{error}
<p><button>Log in</button></p>
</form>
<p class="muted">No account? <a href="/register">Register</a></p></div>"#,
        action = esc(&action),
        username = esc(username),
    );
    layout("Log in", false, &[], None, &body)
}

pub fn register(form: &RegistrationForm, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, esc(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card"><h1>Register</h1>
<form method="post" action="/register">
<label>E-mail</label><input name="email" type="email" value="{email}" required>
<label>Username</label><input name="username" value="{username}" required>
<label>Full name</label><input name="full_name" value="{full_name}" placeholder="Last First Middle" required>
<label>Password</label><input name="password" type="password" required>
<label>Confirm password</label><input name="confirm_password" type="password" required>
{error}
<p><button>Register</button></p>
</form></div>"#,
        email = esc(&form.email),
        username = esc(&form.username),
        full_name = esc(&form.full_name),
    );
    layout("Register", false, &[], None, &body)
}

// ---------------------------------------------------------------------------
// Panel pages
// ---------------------------------------------------------------------------

pub fn profile(view: &ProfileView, hosting: &HostingConfig) -> String {
    let mut body = String::new();
    match &view.profile {
        Some(user) => {
            let _ = write!(
                body,
                r#"<div class="card"><h1>{full_name}</h1>
<table>
<tr><th>E-mail</th><td>{email}</td></tr>
<tr><th>Username</th><td>{username}</td></tr>
<tr><th>Registered</th><td>{registered}</td></tr>
<tr><th>Containers</th><td>{total}</td></tr>"#,
                full_name = esc(&user.full_name),
                email = esc(&user.email),
                username = esc(&user.username),
                registered = esc(&profile::format_registration_date(&user.registration_date)),
                total = user.total_containers,
            );
            match view.telegram(hosting) {
                Some(TelegramState::Pending(link)) => {
                    let _ = write!(
                        body,
                        r#"<tr><th>Telegram</th><td><a href="{0}">{0}</a></td></tr>"#,
                        esc(&link)
                    );
                }
                Some(TelegramState::Linked) => {
                    body.push_str(r#"<tr><th>Telegram</th><td class="running">linked</td></tr>"#);
                }
                None => {}
            }
            body.push_str("</table></div>");
        }
        None => body.push_str(r#"<div class="card"><p class="muted">Profile unavailable.</p></div>"#),
    }

    body.push_str(r#"<div class="card"><h2>My containers</h2>"#);
    let rows = view.rows(hosting);
    if rows.is_empty() {
        body.push_str(
            r#"<p class="muted">No containers yet. <a href="/container/create">Request one</a>.</p>"#,
        );
    } else {
        body.push_str("<table>");
        for row in rows {
            let class = if row.running { "running" } else { "stopped" };
            let _ = write!(
                body,
                r#"<tr><td><a href="/container/info/{id}">{id}</a></td><td>{address}</td><td class="{class}">{status}</td></tr>"#,
                id = row.id,
                address = esc(&row.address),
                status = row.status_text(),
            );
        }
        body.push_str("</table>");
    }
    body.push_str("</div>");

    if view.is_admin() {
        body.push_str(
            r#"<div class="card"><h2>Admin</h2><p><a href="/container/list">All containers</a> · <a href="/container/moderation">Moderation queue</a></p></div>"#,
        );
    }

    let notes: Vec<Notification> = view.error.iter().map(Notification::error).collect();
    layout("Profile", true, &notes, None, &body)
}

pub fn dashboard(board: &OwnedBoard, hosting: &HostingConfig, notes: &[Notification]) -> String {
    let stats = board.stats();
    let mut body = format!(
        r#"<div class="card"><h1>Dashboard</h1><p>{} containers, <span class="running">{} running</span></p>"#,
        stats.total, stats.running
    );
    body.push_str("<table><tr><th>ID</th><th>Name</th><th>Status</th><th>SSH</th></tr>");
    for c in board.items() {
        let _ = write!(
            body,
            r#"<tr><td><a href="/container/info/{id}">{id}</a></td><td>{name}</td><td>{status}</td><td><code>{ssh}</code></td></tr>"#,
            id = c.id,
            name = esc(&c.name),
            status = status_span(c.status),
            ssh = esc(&format::ssh_command(hosting, &c.name, c.id)),
        );
    }
    body.push_str("</table></div>");
    layout("Dashboard", true, notes, None, &body)
}

fn selector(name: &str, sel: &ResourceSelector) -> String {
    let mut out = format!(
        r#"<label>{label} ({unit})</label><input name="{name}" type="number" min="{min}" max="{max}" step="{step}" value="{value}"> "#,
        label = sel.label,
        unit = sel.unit,
        min = sel.min,
        max = sel.max,
        step = sel.step,
        value = sel.value(),
    );
    for preset in sel.quick_select {
        let class = if sel.is_selected(*preset) { "selected" } else { "" };
        let _ = write!(
            out,
            r#"<button class="{class}" name="{name}_preset" value="{preset}">{preset}</button> "#
        );
    }
    out
}

pub fn create(form: &CreateForm, notes: &[Notification]) -> String {
    let body = format!(
        r#"<div class="card"><h1>New container</h1>
<form method="post" action="/container/create">
<label>Hostname</label><input name="hostname" value="{hostname}">
<button name="random" value="1">Random name</button>
{cpu}
{ram}
{storage}
<p><button name="submit" value="1">Submit request</button></p>
</form>
<p class="muted">An administrator reviews every request before the container is created.</p></div>"#,
        hostname = esc(&form.hostname),
        cpu = selector("cpu", &form.cpu),
        ram = selector("ram", &form.ram),
        storage = selector("storage", &form.storage),
    );
    layout("New container", true, notes, None, &body)
}

/// Detail page for one container.
pub fn container_info(
    view: &TelemetryView,
    frame: Option<Frame>,
    hosting: &HostingConfig,
    refresh_secs: u64,
) -> String {
    let url = format!("/container/info/{}", view.vmid());
    let notes: Vec<Notification> = view.error().into_iter().map(Notification::error).collect();
    let (Some(t), Some(f)) = (view.snapshot(), frame) else {
        return layout(
            "Container",
            true,
            &notes,
            Some(Refresh {
                secs: refresh_secs,
                url: &url,
            }),
            r#"<div class="card"><p class="muted">Loading telemetry…</p></div>"#,
        );
    };
    let c = &t.container;

    let reveal_link = if view.password_revealed() {
        format!(r#"<a href="{url}">hide</a>"#)
    } else {
        format!(r#"<a href="{url}?reveal=1">show</a>"#)
    };
    let reveal_query = if view.password_revealed() { "?reveal=1" } else { "" };

    let mut actions = String::new();
    for action in [ContainerAction::Start, ContainerAction::Stop, ContainerAction::Restart] {
        actions.push_str(&action_button(&format!("{url}/{action}"), action));
    }

    let body = format!(
        r#"<div class="card"><h1>{name} <span class="muted">#{id}</span> {status}</h1>
<p><code>{ssh}</code></p>
<table>
<tr><th>User</th><td>{user}</td></tr>
<tr><th>Password</th><td><code>{password}</code> {reveal_link}</td></tr>
</table>
<p>{actions}</p></div>

<div class="card">
<p>CPU {cpu_pct}% <span class="muted">{cores}</span></p>{cpu_bar}
<p>RAM {ram_used} / {ram_total}</p>{ram_bar}
<p>Storage {rom_used} / {rom_total}</p>{rom_bar}
<p>Network ↓ {net_in}/s (total {net_in_total}) · ↑ {net_out}/s (total {net_out_total})</p>
<p>Disk IO {io} ({io_level})</p>
</div>

<div class="card"><h2>Delete</h2>
<p class="muted">Stop the container first, then type its name to confirm.</p>
<form method="post" action="{url}/delete">
<input name="confirm" placeholder="{name}"> <button>delete</button>
</form></div>"#,
        name = esc(&c.name),
        id = c.id,
        status = status_span(c.status),
        ssh = esc(&format::ssh_command(hosting, &c.name, c.id)),
        user = esc(&t.user.username),
        password = esc(&format::mask_password(&t.user.password, view.password_revealed())),
        cpu_pct = f.cpu_pct,
        cores = format::format_cores(t.cpu.cpu_cores),
        cpu_bar = bar(f.cpu_bar),
        ram_used = format::format_bytes(f.ram_used),
        ram_total = format::format_bytes(t.ram.ram_bytes),
        ram_bar = bar(f.ram_bar),
        rom_used = format::format_bytes(f.rom_used),
        rom_total = format::format_bytes(t.rom.rom_bytes),
        rom_bar = bar(f.rom_bar),
        net_in = format::format_bytes(f.net_in_rate),
        net_in_total = format::format_bytes(f.net_in_total),
        net_out = format::format_bytes(f.net_out_rate),
        net_out_total = format::format_bytes(f.net_out_total),
        io = format::format_io(f.io_ops),
        io_level = format::IoLevel::from_ops(t.io.io_operations),
    );
    let refresh_url = format!("{url}{reveal_query}");
    layout(
        &c.name,
        true,
        &notes,
        Some(Refresh {
            secs: refresh_secs,
            url: &refresh_url,
        }),
        &body,
    )
}

/// Shown after an action from the detail page; reloads into the detail page
/// once the reconciliation delay has passed.
pub fn action_result(
    id: u32,
    name: &str,
    status: Option<ContainerStatus>,
    notes: &[Notification],
    back: Refresh<'_>,
) -> String {
    let status = status.map(status_span).unwrap_or_default();
    let body = format!(
        r#"<div class="card"><h1>{name} {status}</h1><p class="muted">Refreshing in {secs}s… <a href="{url}">back</a></p></div>"#,
        name = if name.is_empty() {
            format!("#{id}")
        } else {
            esc(name)
        },
        secs = back.secs,
        url = esc(back.url),
    );
    layout("Container", true, notes, Some(back), &body)
}

// ---------------------------------------------------------------------------
// Admin pages
// ---------------------------------------------------------------------------

pub fn admin_list(
    board: &AdminBoard,
    hosting: &HostingConfig,
    notes: &[Notification],
    refresh: Option<Refresh<'_>>,
) -> String {
    let stats = board.stats();
    let ram_pct = stats.ram_pct(hosting.host_ram_bytes);
    let rom_pct = stats.rom_pct(hosting.host_storage_bytes);
    let mut body = format!(
        r#"<div class="card"><h1>All containers</h1>
<p>{total} total, <span class="running">{running} running</span></p>
<p>RAM {ram} of {host_ram} ({ram_pct})</p>{ram_bar}
<p>Storage {rom} of {host_rom} ({rom_pct})</p>{rom_bar}
</div>
<div class="card"><table><tr><th>ID</th><th>Name</th><th>Owner</th><th>Status</th><th></th></tr>"#,
        total = stats.total,
        running = stats.running,
        ram = format::format_bytes(stats.ram_bytes),
        host_ram = format::format_bytes(hosting.host_ram_bytes),
        ram_pct = format::format_pct(ram_pct),
        ram_bar = bar(ram_pct),
        rom = format::format_bytes(stats.rom_bytes),
        host_rom = format::format_bytes(hosting.host_storage_bytes),
        rom_pct = format::format_pct(rom_pct),
        rom_bar = bar(rom_pct),
    );

    for c in board.items() {
        let expanded = board.expanded() == Some(c.id);
        let toggle = if expanded {
            "/container/list".to_string()
        } else {
            format!("/container/list?expand={}", c.id)
        };
        let _ = write!(
            body,
            r#"<tr><td><a href="{toggle}">{id}</a></td><td>{name}</td><td>{owner}</td><td>{status}</td><td>"#,
            id = c.id,
            name = esc(&c.name),
            owner = esc(&c.owner_username),
            status = status_span(c.status),
        );
        for action in ContainerAction::ALL {
            body.push_str(&action_button(
                &format!("/container/list/{}/{action}", c.id),
                action,
            ));
        }
        body.push_str("</td></tr>");
        if expanded {
            let _ = write!(
                body,
                r#"<tr><td></td><td colspan="4" class="muted">{cores} · {ram} RAM · {rom} storage · <code>{ssh}</code></td></tr>"#,
                cores = format::format_cores(c.cpu_cores),
                ram = format::format_bytes(c.ram_bytes),
                rom = format::format_bytes(c.rom_bytes),
                ssh = esc(&format::ssh_command(hosting, &c.name, c.id)),
            );
        }
    }
    body.push_str("</table></div>");
    layout("All containers", true, notes, refresh, &body)
}

/// Query string that keeps the current section/ticket expansion.
pub fn moderation_query(board: &TicketBoard, flip: Option<Section>, ticket: Option<&str>) -> String {
    let flag = |section: Section| {
        let on = board.is_section_expanded(section) != (flip == Some(section));
        if on { "1" } else { "0" }
    };
    let mut query = format!("?open={}&closed={}", flag(Section::Open), flag(Section::Closed));
    if let Some(id) = ticket {
        query.push_str("&ticket=");
        query.push_str(&crate::guard::encode_query_value(id));
    }
    query
}

fn ticket_row(board: &TicketBoard, t: &Ticket) -> String {
    let expanded = board.expanded_ticket() == Some(t.id.as_str());
    let toggle = moderation_query(board, None, (!expanded).then_some(t.id.as_str()));
    let mut row = format!(
        r#"<tr><td><a href="/container/moderation{toggle}">{name}</a></td><td>{owner}</td><td>{cores} · {ram} · {rom}</td><td class="muted">{created}</td><td>"#,
        toggle = esc(&toggle),
        name = esc(&t.name),
        owner = esc(&t.owner_username),
        cores = format::format_cores(t.cpu_cores),
        ram = format::format_bytes(t.ram_bytes),
        rom = format::format_bytes(t.rom_bytes),
        created = esc(&profile::format_registration_date(&t.created_at)),
    );
    if !t.closed {
        let id = esc(&urlencoding::encode(&t.id));
        let _ = write!(
            row,
            r#"<form class="inline" method="post" action="/container/moderation/{id}/approve"><button>approve</button></form><form class="inline" method="post" action="/container/moderation/{id}/reject"><button>reject</button></form>"#
        );
    }
    row.push_str("</td></tr>");
    if expanded {
        let _ = write!(
            row,
            r#"<tr><td colspan="5" class="muted">ticket {id} · owner id {owner_id} · updated {updated}</td></tr>"#,
            id = esc(&t.id),
            owner_id = esc(&t.owner_id),
            updated = esc(t.updated_at.as_deref().unwrap_or("never")),
        );
    }
    row
}

pub fn moderation(board: &TicketBoard, notes: &[Notification]) -> String {
    let mut body = String::from(r#"<h1>Moderation</h1>"#);
    for (section, title) in [(Section::Open, "Open tickets"), (Section::Closed, "Closed tickets")] {
        let tickets = board.section(section);
        let toggle = moderation_query(board, Some(section), board.expanded_ticket());
        let _ = write!(
            body,
            r#"<div class="card"><h2><a href="/container/moderation{toggle}">{title}</a> <span class="muted">({count})</span></h2>"#,
            toggle = esc(&toggle),
            count = tickets.len(),
        );
        if board.is_section_expanded(section) {
            if tickets.is_empty() {
                body.push_str(r#"<p class="muted">none</p>"#);
            } else {
                body.push_str("<table>");
                for t in tickets {
                    body.push_str(&ticket_row(board, t));
                }
                body.push_str("</table>");
            }
        }
        body.push_str("</div>");
    }
    layout("Moderation", true, notes, None, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake;

    #[test]
    fn layout_escapes_notifications_and_sets_refresh() {
        let notes = [Notification::error("<script>")];
        let html = layout(
            "t",
            true,
            &notes,
            Some(Refresh {
                secs: 3,
                url: "/container/list",
            }),
            "",
        );
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"content="3;url=/container/list""#));
        assert!(html.contains("toast error"));
    }

    #[test]
    fn login_form_keeps_return_path() {
        let html = login("ivan", Some("/container/list"), Some("bad password"));
        assert!(html.contains(r#"action="/login?from=/container/list""#));
        assert!(html.contains("bad password"));
    }

    #[test]
    fn moderation_query_flips_one_section() {
        let mut board = TicketBoard::new();
        board.toggle_section(Section::Open);
        assert_eq!(moderation_query(&board, None, None), "?open=1&closed=0");
        assert_eq!(
            moderation_query(&board, Some(Section::Closed), Some("t1")),
            "?open=1&closed=1&ticket=t1"
        );
        assert_eq!(
            moderation_query(&board, Some(Section::Open), None),
            "?open=0&closed=0"
        );
    }

    #[test]
    fn admin_list_shows_expanded_details() {
        let api = fake::FakeApi::new();
        fake::FakeApi::push(
            &api.all,
            Ok(vec![
                fake::container(101, "web-1", ContainerStatus::Running, 2, 20),
                fake::container(102, "db-1", ContainerStatus::Stopped, 4, 40),
            ]),
        );
        let mut board = AdminBoard::new(std::time::Duration::from_secs(3));
        board.refresh(&api);
        board.toggle_expanded(102);
        let html = admin_list(&board, &HostingConfig::default(), &[], None);
        assert!(html.contains("/container/list/101/restart"));
        assert!(html.contains("4.0GB RAM"));
        assert!(!html.contains("2.0GB RAM"));
    }
}
