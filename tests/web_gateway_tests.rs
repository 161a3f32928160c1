//! Browser gateway tests: guard decisions, the login form round trip and
//! the `/api` pass-through, driven through `Gateway::handle` with the
//! hosting API mocked.
use mockito::{Matcher, Server};
use serde_json::json;
use tiny_http::{HTTPVersion, Method};

use nvpanel::config::schema::PanelConfig;
use nvpanel::web::{Gateway, HttpResponse, WebRequest};

fn config_for(server: &Server) -> PanelConfig {
    let mut config = PanelConfig::default();
    config.api.base_url = server.url();
    config.logging.enabled = false;
    config
}

fn gateway(server: &Server) -> Gateway {
    Gateway::new(config_for(server))
}

fn login_post(from: &str) -> WebRequest {
    WebRequest::new(
        Method::Post,
        &format!("/login?from={from}"),
        Some("username=ivan_p&password=p%40ss".to_string()),
        None,
    )
}

fn mock_login(server: &mut Server) -> mockito::Mock {
    server
        .mock("POST", "/api/v1/auth/login")
        .with_status(200)
        .with_body(json!({ "access_token": "tok-9" }).to_string())
        .create()
}

fn header(resp: &HttpResponse, name: &'static str) -> Option<String> {
    resp.headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn body(resp: HttpResponse) -> String {
    let mut raw = Vec::new();
    resp.raw_print(&mut raw, HTTPVersion(1, 1), &[], false, None)
        .unwrap();
    let raw = String::from_utf8(raw).unwrap();
    raw.split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default()
}

fn get(url: &str, token: Option<&str>) -> WebRequest {
    WebRequest::new(Method::Get, url, None, token.map(str::to_string))
}

fn mock_verify(server: &mut Server, token: &str, status: usize) -> mockito::Mock {
    server
        .mock("POST", "/api/v1/auth/token/verify")
        .match_header("authorization", format!("Bearer {token}").as_str())
        .with_status(status)
        .create()
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[test]
fn protected_page_with_invalid_token_redirects_to_login() {
    let mut server = Server::new();
    let verify = mock_verify(&mut server, "stale", 401);

    let resp = gateway(&server)
        .handle(&get("/container/list", Some("stale")))
        .unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(
        header(&resp, "Location").as_deref(),
        Some("/login?from=/container/list")
    );
    verify.assert();
}

#[test]
fn guest_page_with_valid_token_redirects_home() {
    let mut server = Server::new();
    mock_verify(&mut server, "good", 200);

    let resp = gateway(&server).handle(&get("/login", Some("good"))).unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(header(&resp, "Location").as_deref(), Some("/profile"));
}

#[test]
fn guest_page_with_invalid_token_renders() {
    let mut server = Server::new();
    mock_verify(&mut server, "stale", 401);

    let resp = gateway(&server).handle(&get("/login", Some("stale"))).unwrap();
    assert_eq!(resp.status_code().0, 200);
    assert!(body(resp).contains(r#"name="username""#));
}

#[test]
fn every_navigation_reverifies() {
    let mut server = Server::new();
    let verify = server
        .mock("POST", "/api/v1/auth/token/verify")
        .with_status(200)
        .expect(2)
        .create();
    server
        .mock("GET", "/api/v1/proxmox/container")
        .with_status(200)
        .with_body("[]")
        .expect(2)
        .create();

    let gw = gateway(&server);
    for _ in 0..2 {
        let resp = gw.handle(&get("/dashboard", Some("good"))).unwrap();
        assert_eq!(resp.status_code().0, 200);
    }
    verify.assert();
}

#[test]
fn api_call_with_invalid_token_is_401_json() {
    let mut server = Server::new();
    mock_verify(&mut server, "stale", 401);

    let resp = gateway(&server)
        .handle(&get("/api/v1/user/profile", Some("stale")))
        .unwrap();
    assert_eq!(resp.status_code().0, 401);
    let value: serde_json::Value = serde_json::from_str(&body(resp)).unwrap();
    assert_eq!(value, json!({ "error": "Invalid token" }));
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[test]
fn login_sets_cookie_and_returns_to_origin() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v1/auth/login")
        .match_body(Matcher::Json(json!({ "username": "ivan_p", "password": "p@ss" })))
        .with_status(200)
        .with_body(json!({ "access_token": "tok-9" }).to_string())
        .create();

    let req = WebRequest::new(
        Method::Post,
        "/login?from=%2Fcontainer%2Fcreate",
        Some("username=ivan_p&password=p%40ss".to_string()),
        None,
    );
    let resp = gateway(&server).handle(&req).unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(header(&resp, "Location").as_deref(), Some("/container/create"));
    assert_eq!(
        header(&resp, "Set-Cookie").as_deref(),
        Some("authToken=tok-9; Path=/; Max-Age=3600; SameSite=Lax")
    );
}

#[test]
fn login_ignores_from_values_that_would_split_headers() {
    let mut server = Server::new();
    mock_login(&mut server);

    let req = login_post("%2Fx%0D%0ASet-Cookie:%20authToken=attacker");
    let resp = gateway(&server).handle(&req).unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(header(&resp, "Location").as_deref(), Some("/profile"));

    let cookies: Vec<_> = resp
        .headers()
        .iter()
        .filter(|h| h.field.equiv("Set-Cookie"))
        .map(|h| h.value.as_str().to_string())
        .collect();
    assert_eq!(cookies, vec!["authToken=tok-9; Path=/; Max-Age=3600; SameSite=Lax"]);
}

#[test]
fn login_ignores_backslash_offsite_from() {
    let mut server = Server::new();
    mock_login(&mut server);

    let resp = gateway(&server)
        .handle(&login_post("%2F%5Cevil.example"))
        .unwrap();
    assert_eq!(header(&resp, "Location").as_deref(), Some("/profile"));
}

#[test]
fn activity_follows_the_gateway_logging_config() {
    let mut server = Server::new();
    mock_login(&mut server);
    let path = std::env::temp_dir().join(format!(
        "nvpanel-gateway-activity-{}.jsonl",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let mut config = config_for(&server);
    config.logging.activity_log = path.display().to_string();
    Gateway::new(config.clone())
        .handle(&login_post("%2Fprofile"))
        .unwrap();
    assert!(!path.exists());

    config.logging.enabled = true;
    Gateway::new(config)
        .handle(&login_post("%2Fprofile"))
        .unwrap();
    let logged = std::fs::read_to_string(&path).unwrap();
    assert_eq!(logged.lines().count(), 1);
    assert!(logged.contains(r#""kind":"login""#));
    assert!(logged.contains(r#""target":"ivan_p""#));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn failed_login_shows_server_message_inline() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v1/auth/login")
        .with_status(401)
        .with_body(json!({ "message": "Incorrect username or password" }).to_string())
        .create();

    let req = WebRequest::new(
        Method::Post,
        "/login",
        Some("username=ivan_p&password=nope".to_string()),
        None,
    );
    let resp = gateway(&server).handle(&req).unwrap();
    assert_eq!(resp.status_code().0, 401);
    assert!(header(&resp, "Set-Cookie").is_none());
    assert!(body(resp).contains("Incorrect username or password"));
}

#[test]
fn registration_validates_before_calling_the_api() {
    let mut server = Server::new();
    let signup = server
        .mock("POST", "/api/v1/auth/signup")
        .expect(0)
        .create();

    let req = WebRequest::new(
        Method::Post,
        "/register",
        Some(
            "email=a%40b.c&username=ivan_p&full_name=Ivan&password=x&confirm_password=x"
                .to_string(),
        ),
        None,
    );
    let resp = gateway(&server).handle(&req).unwrap();
    assert_eq!(resp.status_code().0, 400);
    signup.assert();
}

#[test]
fn logout_expires_cookie() {
    let server = Server::new();
    let resp = gateway(&server).handle(&get("/logout", None)).unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(header(&resp, "Location").as_deref(), Some("/login"));
    assert!(
        header(&resp, "Set-Cookie")
            .unwrap()
            .contains("Max-Age=0")
    );
}

#[test]
fn profile_lists_own_containers() {
    let mut server = Server::new();
    mock_verify(&mut server, "good", 200);
    server
        .mock("GET", "/api/v1/user/profile")
        .with_status(200)
        .with_body(
            json!({
                "email": "ivan@example.com",
                "username": "ivan_p",
                "full_name": "Petrov Ivan Sergeevich",
                "total_containers": 1,
                "registration_date": "2025-03-09T12:00:00Z",
                "is_superuser": false,
                "tg_passcode": null
            })
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/v1/proxmox/container")
        .with_status(200)
        .with_body(json!([{ "id": 101, "name": "web-1", "status": "running" }]).to_string())
        .create();

    let resp = gateway(&server).handle(&get("/profile", Some("good"))).unwrap();
    assert_eq!(resp.status_code().0, 200);
    let html = body(resp);
    assert!(html.contains("Petrov Ivan Sergeevich"));
    assert!(html.contains("March 9, 2025"));
    assert!(html.contains("web-1.nv-server.online:22101"));
    assert!(!html.contains("Moderation queue"));
}

#[test]
fn expired_session_on_profile_signs_out() {
    let mut server = Server::new();
    mock_verify(&mut server, "good", 200);
    server
        .mock("GET", "/api/v1/user/profile")
        .with_status(401)
        .create();

    let resp = gateway(&server).handle(&get("/profile", Some("good"))).unwrap();
    assert_eq!(resp.status_code().0, 303);
    assert_eq!(header(&resp, "Location").as_deref(), Some("/login"));
}

#[test]
fn delete_from_detail_page_requires_matching_name() {
    let mut server = Server::new();
    mock_verify(&mut server, "good", 200);
    server
        .mock("GET", "/api/v1/proxmox/container")
        .with_status(200)
        .with_body(json!([{ "id": 101, "name": "web-1", "status": "stopped" }]).to_string())
        .create();
    let delete = server
        .mock("POST", "/api/v1/proxmox/container/delete")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let req = WebRequest::new(
        Method::Post,
        "/container/info/101/delete",
        Some("confirm=web-2".to_string()),
        Some("good".to_string()),
    );
    let resp = gateway(&server).handle(&req).unwrap();
    assert_eq!(resp.status_code().0, 400);
    delete.assert();
}

// ---------------------------------------------------------------------------
// Pass-through
// ---------------------------------------------------------------------------

#[test]
fn api_pass_through_forwards_status_and_body() {
    let mut server = Server::new();
    mock_verify(&mut server, "good", 200);
    let upstream = server
        .mock("GET", "/api/v1/proxmox/container")
        .match_header("authorization", "Bearer good")
        .with_status(200)
        .with_body(r#"[{"id":101,"name":"web-1","status":"running"}]"#)
        .create();

    let resp = gateway(&server)
        .handle(&get("/api/v1/proxmox/container", Some("good")))
        .unwrap();
    assert_eq!(resp.status_code().0, 200);
    assert_eq!(body(resp), r#"[{"id":101,"name":"web-1","status":"running"}]"#);
    upstream.assert();
}
