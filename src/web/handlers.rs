//! Route handlers. Each one builds a view-model for the request, drives it
//! against the hosting API, and renders a page.
//!
//! Pages are stateless between requests: notifications are rendered into
//! the response to the form post that produced them, and the delayed
//! reconciliation fetch becomes a timed reload of the listing.

use std::time::{Duration, Instant};

use anyhow::Result;

use super::pages::{self, Refresh};
use super::{HttpResponse, WebRequest, html_response, json_bytes, json_response, redirect};
use crate::actions::{AdminBoard, BoardItem, ContainerAction, ContainerBoard, OwnedBoard};
use crate::api::{ApiClient, ApiError, ContainerStatus, PanelApi};
use crate::activity::ActivityLog;
use crate::auth::{self, AuthError, MemorySessionStore, RegistrationForm, session};
use crate::config::schema::PanelConfig;
use crate::guard;
use crate::moderation::{Section, TicketBoard};
use crate::notify::Notification;
use crate::profile::ProfileView;
use crate::resources::CreateForm;
use crate::telemetry::{PollOutcome, TelemetryView};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub fn landing(_cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    if req.token.is_some() {
        return redirect(guard::HOME_PATH, None);
    }
    html_response(200, pages::landing())
}

pub fn login_form(_cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let from = req.query_param("from");
    html_response(200, pages::login("", from.as_deref(), None))
}

pub fn login_submit(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let form = req.form();
    let username = form.get("username").map(String::as_str).unwrap_or_default();
    let password = form.get("password").map(String::as_str).unwrap_or_default();
    let from = req.query_param("from");

    let client = ApiClient::from_config(&cfg.api);
    let store = MemorySessionStore::new();
    match auth::login(&client, &store, &activity(cfg), username, password) {
        Ok(token) => sign_in(cfg, &token, from.as_deref()),
        Err(e) => html_response(
            401,
            pages::login(username, from.as_deref(), Some(&e.to_string())),
        ),
    }
}

pub fn register_form(_cfg: &PanelConfig, _req: &WebRequest) -> Result<HttpResponse> {
    html_response(200, pages::register(&RegistrationForm::default(), None))
}

pub fn register_submit(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let mut fields = req.form();
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let form = RegistrationForm {
        email: take("email"),
        username: take("username"),
        password: take("password"),
        confirm_password: take("confirm_password"),
        full_name: take("full_name"),
    };

    let client = ApiClient::from_config(&cfg.api);
    let store = MemorySessionStore::new();
    match auth::register(&client, &store, &activity(cfg), &form) {
        Ok(token) => sign_in(cfg, &token, None),
        Err(e) => {
            let status = if matches!(e, AuthError::Invalid(_)) { 400 } else { 401 };
            html_response(status, pages::register(&form, Some(&e.to_string())))
        }
    }
}

fn sign_in(cfg: &PanelConfig, token: &str, from: Option<&str>) -> Result<HttpResponse> {
    let cookie = session::session_cookie(&cfg.session, token, cfg.web.secure_cookies);
    redirect(&guard::post_login_target(from), Some(&cookie))
}

pub fn logout(cfg: &PanelConfig, _req: &WebRequest) -> Result<HttpResponse> {
    auth::logout(&MemorySessionStore::new(), &activity(cfg));
    sign_out(cfg)
}

/// Drop the cookie and send the browser to the login page.
fn sign_out(cfg: &PanelConfig) -> Result<HttpResponse> {
    redirect("/login", Some(&session::expired_session_cookie(&cfg.session)))
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

pub fn profile(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let view = ProfileView::load(&req.client(cfg));
    if view.auth_lost() {
        return sign_out(cfg);
    }
    html_response(200, pages::profile(&view, &cfg.hosting))
}

pub fn dashboard(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let mut board = OwnedBoard::new(cfg.actions.reconcile_delay());
    board.refresh(&req.client(cfg));
    if board.auth_lost() {
        return sign_out(cfg);
    }
    let notes = board.take_notifications();
    html_response(200, pages::dashboard(&board, &cfg.hosting, &notes))
}

pub fn create_form(_cfg: &PanelConfig, _req: &WebRequest) -> Result<HttpResponse> {
    let mut form = CreateForm::new();
    form.randomize_hostname();
    html_response(200, pages::create(&form, &[]))
}

pub fn create_submit(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let fields = req.form();
    let mut form = CreateForm::new();
    form.hostname = fields.get("hostname").cloned().unwrap_or_default();
    for (key, selector) in [
        ("cpu", &mut form.cpu),
        ("ram", &mut form.ram),
        ("storage", &mut form.storage),
    ] {
        if let Some(value) = fields.get(key).and_then(|v| v.parse().ok()) {
            selector.set(value);
        }
        if let Some(preset) = fields.get(&format!("{key}_preset")).and_then(|v| v.parse().ok()) {
            selector.quick_select(preset);
        }
    }

    // Anything but the submit button only edits the form.
    if fields.contains_key("random") {
        form.randomize_hostname();
    }
    if !fields.contains_key("submit") {
        return html_response(200, pages::create(&form, &[]));
    }

    let result = form.submit(&req.client(cfg), &activity(cfg));
    if let Err(crate::resources::CreateError::Api(e)) = &result
        && e.is_unauthorized()
    {
        return sign_out(cfg);
    }
    let note = form.notification(&result);
    let status = if note.is_error() { 400 } else { 200 };
    html_response(status, pages::create(&form, &[note]))
}

/// One telemetry snapshot, reloaded every poll interval.
pub fn container_info(cfg: &PanelConfig, req: &WebRequest, id: u32) -> Result<HttpResponse> {
    let now = Instant::now();
    let mut view = TelemetryView::new(id, &cfg.telemetry, now).with_activity_log(activity(cfg));
    if req.query_param("reveal").as_deref() == Some("1") {
        view.toggle_password();
    }
    view.poll_due(now);
    if view.poll_now(&req.client(cfg), now) == PollOutcome::AuthLost {
        return sign_out(cfg);
    }
    // A page is a single frame, so render the settled values.
    let frame = view.frame(now + Duration::from_millis(cfg.telemetry.bar_max_ms));
    html_response(
        200,
        pages::container_info(&view, frame, &cfg.hosting, reload_secs(cfg.telemetry.poll_interval())),
    )
}

/// Action posted from the detail page. Delete goes through the name gate.
pub fn container_action(
    cfg: &PanelConfig,
    req: &WebRequest,
    id: u32,
    action: ContainerAction,
) -> Result<HttpResponse> {
    let client = req.client(cfg);
    let confirm = req.form().remove("confirm").unwrap_or_default();
    let now = Instant::now();

    let mut owned = OwnedBoard::new(cfg.actions.reconcile_delay()).with_activity_log(activity(cfg));
    owned.refresh(&client);
    let outcome = if owned.get(id).is_some() || !owned.is_loaded() {
        run_action(&mut owned, &client, action, id, &confirm, now)
    } else {
        // Administrators can act on containers they do not own.
        let mut all =
            AdminBoard::new(cfg.actions.reconcile_delay()).with_activity_log(activity(cfg));
        all.refresh(&client);
        run_action(&mut all, &client, action, id, &confirm, now)
    };
    if outcome.auth_lost {
        return sign_out(cfg);
    }

    let back = if action == ContainerAction::Delete && outcome.succeeded {
        guard::HOME_PATH.to_string()
    } else {
        format!("/container/info/{id}")
    };
    let status = if outcome.succeeded { 200 } else { 400 };
    html_response(
        status,
        pages::action_result(
            id,
            &outcome.name,
            outcome.status,
            &outcome.notes,
            Refresh {
                secs: reload_secs(cfg.actions.reconcile_delay()),
                url: &back,
            },
        ),
    )
}

struct ActionOutcome {
    name: String,
    status: Option<ContainerStatus>,
    notes: Vec<Notification>,
    succeeded: bool,
    auth_lost: bool,
}

fn run_action<T: BoardItem>(
    board: &mut ContainerBoard<T>,
    api: &dyn PanelApi,
    action: ContainerAction,
    id: u32,
    confirm: &str,
    now: Instant,
) -> ActionOutcome {
    let name = board.get(id).map(|c| c.name().to_string()).unwrap_or_default();
    let mut notes = Vec::new();
    let succeeded = if action == ContainerAction::Delete {
        match board.delete_confirmed(api, id, confirm, now) {
            Ok(result) => result.is_ok(),
            Err(blocked) => {
                notes.push(Notification::error(blocked.to_string()));
                false
            }
        }
    } else {
        board.dispatch(api, action, id, now).is_ok()
    };
    notes.extend(board.take_notifications());
    ActionOutcome {
        name,
        status: board.get(id).map(|c| c.status()),
        notes,
        succeeded,
        auth_lost: board.auth_lost(),
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub fn admin_list(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let mut board = AdminBoard::new(cfg.actions.reconcile_delay());
    board.refresh(&req.client(cfg));
    if board.auth_lost() {
        return sign_out(cfg);
    }
    if let Some(id) = req.query_param("expand").and_then(|v| v.parse().ok()) {
        board.toggle_expanded(id);
    }
    let notes = board.take_notifications();
    html_response(200, pages::admin_list(&board, &cfg.hosting, &notes, None))
}

/// Admin list actions are sent without the delete gate. The page shows the
/// optimistic state and reloads once the reconciliation delay has passed.
pub fn admin_action(
    cfg: &PanelConfig,
    req: &WebRequest,
    id: u32,
    action: ContainerAction,
) -> Result<HttpResponse> {
    let client = req.client(cfg);
    let mut board =
        AdminBoard::new(cfg.actions.reconcile_delay()).with_activity_log(activity(cfg));
    board.refresh(&client);
    board.take_notifications();

    let result = board.dispatch(&client, action, id, Instant::now());
    if board.auth_lost() {
        return sign_out(cfg);
    }
    let notes = board.take_notifications();
    let refresh = result.is_ok().then(|| Refresh {
        secs: reload_secs(cfg.actions.reconcile_delay()),
        url: "/container/list",
    });
    html_response(200, pages::admin_list(&board, &cfg.hosting, &notes, refresh))
}

fn ticket_board(
    cfg: &PanelConfig,
    req: &WebRequest,
    api: &dyn PanelApi,
) -> (TicketBoard, Result<(), ApiError>) {
    let mut board = TicketBoard::new().with_activity_log(activity(cfg));
    let loaded = board.load(api);
    if req.query_param("open").as_deref() != Some("0") {
        board.toggle_section(Section::Open);
    }
    if req.query_param("closed").as_deref() == Some("1") {
        board.toggle_section(Section::Closed);
    }
    if let Some(id) = req.query_param("ticket") {
        board.toggle_ticket(&id);
    }
    (board, loaded)
}

pub fn moderation(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let client = req.client(cfg);
    let (mut board, loaded) = ticket_board(cfg, req, &client);
    if loaded.as_ref().is_err_and(ApiError::is_unauthorized) {
        return sign_out(cfg);
    }
    let notes = board.take_notifications();
    html_response(200, pages::moderation(&board, &notes))
}

pub fn moderate(cfg: &PanelConfig, req: &WebRequest, id: &str, verdict: &str) -> Result<HttpResponse> {
    let id = urlencoding::decode(id)
        .map(|id| id.into_owned())
        .unwrap_or_else(|_| id.to_string());
    let client = req.client(cfg);
    let (mut board, _) = ticket_board(cfg, req, &client);
    board.take_notifications();

    let result = match verdict {
        "approve" => board.approve(&client, &id),
        "reject" => board.reject(&client, &id),
        _ => return super::not_found(),
    };
    if result.as_ref().is_err_and(ApiError::is_unauthorized) {
        return sign_out(cfg);
    }
    let notes = board.take_notifications();
    let status = if result.is_ok() { 200 } else { 400 };
    html_response(status, pages::moderation(&board, &notes))
}

// ---------------------------------------------------------------------------
// Pass-through
// ---------------------------------------------------------------------------

/// Forward a guarded `/api/v1/*` call to the hosting API unchanged.
pub fn api_proxy(cfg: &PanelConfig, req: &WebRequest) -> Result<HttpResponse> {
    let rest = req
        .path
        .strip_prefix("/api/v1")
        .or_else(|| req.path.strip_prefix(guard::API_PREFIX))
        .unwrap_or_default();
    let target = if req.query.is_empty() {
        rest.to_string()
    } else {
        format!("{rest}?{}", req.query)
    };

    match req.client(cfg).forward(&req.method.to_string(), &target, req.body.as_deref()) {
        Ok(raw) => json_bytes(raw.status, raw.body.into_bytes()),
        Err(e) => json_response(502, &serde_json::json!({ "error": e.to_string() })),
    }
}

fn activity(cfg: &PanelConfig) -> ActivityLog {
    ActivityLog::from_config(&cfg.logging)
}

/// Whole seconds for a meta refresh, never zero.
fn reload_secs(delay: Duration) -> u64 {
    delay.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{self, FakeApi};

    #[test]
    fn reload_is_at_least_a_second() {
        assert_eq!(reload_secs(Duration::from_millis(200)), 1);
        assert_eq!(reload_secs(Duration::from_secs(3)), 3);
    }

    #[test]
    fn blocked_delete_never_reaches_the_api() {
        let api = FakeApi::new();
        FakeApi::push(
            &api.owned,
            Ok(vec![fake::summary(101, "web-1", ContainerStatus::Running)]),
        );
        let mut board = OwnedBoard::new(Duration::from_secs(3));
        board.refresh(&api);

        let outcome = run_action(
            &mut board,
            &api,
            ContainerAction::Delete,
            101,
            "web-1",
            Instant::now(),
        );
        assert!(!outcome.succeeded);
        assert_eq!(outcome.notes.len(), 1);
        assert!(outcome.notes[0].is_error());
        assert_eq!(api.calls(), vec!["my_containers"]);
    }

    #[test]
    fn stop_reports_optimistic_status() {
        let api = FakeApi::new();
        FakeApi::push(
            &api.owned,
            Ok(vec![fake::summary(101, "web-1", ContainerStatus::Running)]),
        );
        FakeApi::push(&api.actions, Ok(()));
        let mut board = OwnedBoard::new(Duration::from_secs(3));
        board.refresh(&api);

        let outcome = run_action(
            &mut board,
            &api,
            ContainerAction::Stop,
            101,
            "",
            Instant::now(),
        );
        assert!(outcome.succeeded);
        assert_eq!(outcome.name, "web-1");
        assert_eq!(outcome.status, Some(ContainerStatus::Stopped));
        assert!(!outcome.auth_lost);
    }

    #[test]
    fn ticket_board_reads_expansion_from_query() {
        let api = FakeApi::new();
        FakeApi::push(
            &api.ticket_lists,
            Ok(vec![fake::ticket("t1", false), fake::ticket("t2", true)]),
        );
        let req = WebRequest::new(
            tiny_http::Method::Get,
            "/container/moderation?open=0&closed=1&ticket=t2",
            None,
            Some("tok".to_string()),
        );
        let (board, loaded) = ticket_board(&PanelConfig::default(), &req, &api);
        assert!(loaded.is_ok());
        assert!(!board.is_section_expanded(Section::Open));
        assert!(board.is_section_expanded(Section::Closed));
        assert_eq!(board.expanded_ticket(), Some("t2"));
    }
}
