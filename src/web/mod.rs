//! Browser surface: a server-rendered panel behind the route guard.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that:
//! - runs the route guard before every request
//! - renders the panel pages from the same view-models as the terminal
//! - handles the login/registration forms and mirrors the token into the
//!   `authToken` cookie
//! - passes guarded `/api/v1/*` calls through to the hosting API
//!
//! Launched via `nvpanel web` (default: `http://127.0.0.1:3000`).

mod handlers;
mod pages;

use std::collections::HashMap;
use std::io::{Cursor, Read};

use anyhow::{Result, anyhow};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use url::form_urlencoded;

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::ApiClient;
use crate::auth::session;
use crate::config::schema::PanelConfig;
use crate::guard::{self, GuardDecision};

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

/// One incoming request, with everything handlers need already extracted.
#[derive(Debug, Clone)]
pub struct WebRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: Option<String>,
    pub token: Option<String>,
}

impl WebRequest {
    pub fn new(method: Method, url: &str, body: Option<String>, token: Option<String>) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method,
            path: path.to_string(),
            query: query.to_string(),
            body,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn query_param(&self, key: &str) -> Option<String> {
        guard::query_param(&self.query, key)
    }

    /// URL-encoded form body.
    pub fn form(&self) -> HashMap<String, String> {
        parse_form(self.body.as_deref().unwrap_or_default())
    }

    /// Authenticated client for this request's token.
    pub fn client(&self, config: &PanelConfig) -> ApiClient {
        let client = ApiClient::from_config(&config.api);
        match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the gateway on `config.web.bind`.
///
/// Blocks the current thread and handles requests sequentially. Errors are
/// handled per request and never stop the server.
pub fn serve(config: PanelConfig) -> Result<()> {
    let addr = config.web.bind.clone();
    let server = Server::http(&addr)
        .map_err(|e| anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("nvpanel web running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    let gateway = Gateway::new(config);

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let cookies = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Cookie"))
            .map(|h| h.value.as_str().to_string())
            .unwrap_or_default();
        let token = session::cookie_value(&cookies, &gateway.config.session.cookie_name)
            .map(str::to_string);

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch | Method::Delete) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let req = WebRequest::new(method.clone(), &url, body, token);
        let resp = gateway.handle(&req).unwrap_or_else(|e| internal_error(&e));
        let status = resp.status_code().0;
        let _ = request.respond(resp);

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            req.path,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

pub struct Gateway {
    config: PanelConfig,
    activity: ActivityLog,
}

impl Gateway {
    pub fn new(config: PanelConfig) -> Self {
        let activity = ActivityLog::from_config(&config.logging);
        Self { config, activity }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Guard, then route.
    pub fn handle(&self, req: &WebRequest) -> Result<HttpResponse> {
        let verifier = ApiClient::from_config(&self.config.api);
        match guard::evaluate(&req.path, req.token.as_deref(), &verifier) {
            GuardDecision::Allow => self.dispatch(req),
            GuardDecision::Redirect(location) => {
                self.activity
                    .record(ActivityKind::GuardRedirect, &req.path, true, Some(&location));
                redirect(&location, None)
            }
            GuardDecision::Unauthorized(message) => {
                json_response(401, &serde_json::json!({ "error": message }))
            }
        }
    }

    fn dispatch(&self, req: &WebRequest) -> Result<HttpResponse> {
        let cfg = &self.config;
        let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

        match (&req.method, segments.as_slice()) {
            (&Method::Get, [""]) => handlers::landing(cfg, req),

            // Session
            (&Method::Get, ["login"]) => handlers::login_form(cfg, req),
            (&Method::Post, ["login"]) => handlers::login_submit(cfg, req),
            (&Method::Get, ["register"]) => handlers::register_form(cfg, req),
            (&Method::Post, ["register"]) => handlers::register_submit(cfg, req),
            (&Method::Get, ["logout"]) => handlers::logout(cfg, req),

            // Panel
            (&Method::Get, ["profile"]) => handlers::profile(cfg, req),
            (&Method::Get, ["dashboard"]) => handlers::dashboard(cfg, req),
            (&Method::Get, ["container", "create"]) => handlers::create_form(cfg, req),
            (&Method::Post, ["container", "create"]) => handlers::create_submit(cfg, req),
            (&Method::Get, ["container", "info", id]) => match id.parse() {
                Ok(id) => handlers::container_info(cfg, req, id),
                Err(_) => not_found(),
            },
            (&Method::Post, ["container", "info", id, action]) => {
                match (id.parse(), action.parse()) {
                    (Ok(id), Ok(action)) => handlers::container_action(cfg, req, id, action),
                    _ => not_found(),
                }
            }

            // Admin
            (&Method::Get, ["container", "list"]) => handlers::admin_list(cfg, req),
            (&Method::Post, ["container", "list", id, action]) => {
                match (id.parse(), action.parse()) {
                    (Ok(id), Ok(action)) => handlers::admin_action(cfg, req, id, action),
                    _ => not_found(),
                }
            }
            (&Method::Get, ["container", "moderation"]) => handlers::moderation(cfg, req),
            (&Method::Post, ["container", "moderation", id, verdict]) => {
                handlers::moderate(cfg, req, id, verdict)
            }

            // Pass-through
            (_, ["api", ..]) => handlers::api_proxy(cfg, req),

            _ => not_found(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Header values never carry control bytes, so nothing can split a line.
pub(crate) fn header(name: &str, value: &str) -> Result<Header> {
    if value.bytes().any(|b| b.is_ascii_control()) {
        return Err(anyhow!("control character in {name} header"));
    }
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header {name}"))
}

pub(crate) fn html_response(status: u16, html: String) -> Result<HttpResponse> {
    Ok(Response::from_data(html.into_bytes())
        .with_header(header("Content-Type", "text/html; charset=utf-8")?)
        .with_status_code(StatusCode(status)))
}

pub(crate) fn json_response<T: serde::Serialize>(status: u16, data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_vec(data)?;
    json_bytes(status, body)
}

pub(crate) fn json_bytes(status: u16, body: Vec<u8>) -> Result<HttpResponse> {
    Ok(Response::from_data(body)
        .with_header(header("Content-Type", "application/json; charset=utf-8")?)
        .with_status_code(StatusCode(status)))
}

/// `303 See Other`, optionally setting a cookie.
pub(crate) fn redirect(location: &str, set_cookie: Option<&str>) -> Result<HttpResponse> {
    let mut resp = Response::from_data(Vec::new())
        .with_header(header("Location", location)?)
        .with_status_code(StatusCode(303));
    if let Some(cookie) = set_cookie {
        resp.add_header(header("Set-Cookie", cookie)?);
    }
    Ok(resp)
}

fn not_found() -> Result<HttpResponse> {
    html_response(404, pages::not_found())
}

fn internal_error(error: &anyhow::Error) -> HttpResponse {
    let body = serde_json::json!({ "error": error.to_string() }).to_string();
    Response::from_data(body.into_bytes()).with_status_code(StatusCode(500))
}

/// Decode an `application/x-www-form-urlencoded` body.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_gateway() -> Gateway {
        let mut config = PanelConfig::default();
        config.logging.enabled = false;
        Gateway::new(config)
    }

    #[test]
    fn request_splits_path_and_query() {
        let req = WebRequest::new(
            Method::Get,
            "/login?from=%2Fprofile",
            None,
            Some(String::new()),
        );
        assert_eq!(req.path, "/login");
        assert_eq!(req.query_param("from").as_deref(), Some("/profile"));
        assert_eq!(req.token, None);
    }

    #[test]
    fn form_bodies_decode() {
        let form = parse_form("username=ivan_p&password=p%40ss+word&from=%2Fcontainer%2Flist");
        assert_eq!(form["username"], "ivan_p");
        assert_eq!(form["password"], "p@ss word");
        assert_eq!(form["from"], "/container/list");
        assert!(parse_form("").is_empty());
    }

    #[test]
    fn header_values_reject_line_breaks() {
        assert!(header("Location", "/x\r\nSet-Cookie: a=b").is_err());
        assert!(header("Location", "/container/list").is_ok());
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<b a="1">&'"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn public_routes_skip_the_guard_network_call() {
        let gateway = quiet_gateway();
        let req = WebRequest::new(Method::Get, "/nowhere", None, None);
        let resp = gateway.handle(&req).unwrap();
        assert_eq!(resp.status_code().0, 404);
    }

    #[test]
    fn anonymous_api_call_gets_401() {
        let gateway = quiet_gateway();
        let req = WebRequest::new(Method::Get, "/api/v1/user/profile", None, None);
        let resp = gateway.handle(&req).unwrap();
        assert_eq!(resp.status_code().0, 401);
    }

    #[test]
    fn anonymous_protected_page_redirects_to_login() {
        let gateway = quiet_gateway();
        let req = WebRequest::new(Method::Get, "/profile", None, None);
        let resp = gateway.handle(&req).unwrap();
        assert_eq!(resp.status_code().0, 303);
        let location = resp
            .headers()
            .iter()
            .find(|h| h.field.equiv("Location"))
            .map(|h| h.value.as_str().to_string());
        assert_eq!(location.as_deref(), Some("/login?from=/profile"));
    }
}
