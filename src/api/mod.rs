//! HTTP client for the hosting REST API.
//!
//! Every data-bearing operation in the panel is one call through this
//! module. The client is synchronous (`ureq`), attaches the bearer token when
//! one is set, and maps responses onto [`ApiError`] so views can tell an
//! authorization loss (401) from a permission failure (403/405) from a
//! transient outage.
//!
//! Views depend on the [`PanelApi`] trait rather than on [`ApiClient`]
//! directly so they can be driven by scripted responses in tests.
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::actions::ContainerAction;
use crate::auth::{self, AuthError};
use crate::config::schema::ApiConfig;
use crate::guard::TokenVerifier;

pub use error::ApiError;
pub use types::{
    Container, ContainerStatus, ContainerSummary, LoginRequest, NewTicket, SignupRequest,
    Telemetry, Ticket, UserProfile,
};

const API_PREFIX: &str = "/api/v1";

// ---------------------------------------------------------------------------
// View-facing seam
// ---------------------------------------------------------------------------

/// Authenticated operations the panel's views perform.
pub trait PanelApi {
    fn profile(&self) -> Result<UserProfile, ApiError>;
    fn my_containers(&self) -> Result<Vec<ContainerSummary>, ApiError>;
    /// Admin-only full listing.
    fn all_containers(&self) -> Result<Vec<Container>, ApiError>;
    fn telemetry(&self, vmid: u32) -> Result<Telemetry, ApiError>;
    fn container_action(&self, action: ContainerAction, vmid: u32) -> Result<(), ApiError>;
    /// Succeeds only on `201 Created`.
    fn create_ticket(&self, ticket: &NewTicket) -> Result<(), ApiError>;
    fn tickets(&self) -> Result<Vec<Ticket>, ApiError>;
    /// Create a container from a ticket. Succeeds only on `201 Created`.
    fn approve_ticket(&self, ticket_id: &str) -> Result<(), ApiError>;
    fn reject_ticket(&self, ticket_id: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Raw responses
// ---------------------------------------------------------------------------

/// Status and body of a completed HTTP exchange, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    fn read(resp: ureq::Response) -> Result<Self, ApiError> {
        let status = resp.status();
        let body = resp
            .into_string()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into the matching [`ApiError`].
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }

    /// Require one exact status, e.g. `201` for creation endpoints.
    pub fn expect_status(self, expected: u16) -> Result<Self, ApiError> {
        let resp = self.into_result()?;
        if resp.status == expected {
            Ok(resp)
        } else {
            Err(ApiError::UnexpectedStatus(resp.status))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Collapse `ureq`'s split between status errors and transport errors.
fn into_raw(result: Result<ureq::Response, ureq::Error>) -> Result<RawResponse, ApiError> {
    match result {
        Ok(resp) => RawResponse::read(resp),
        Err(ureq::Error::Status(_, resp)) => RawResponse::read(resp),
        Err(ureq::Error::Transport(transport)) => Err(ApiError::Network(transport.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous hosting API client.
///
/// Cheap to clone; telemetry watching hands a clone to each fetch thread.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    create_timeout: Duration,
    token: Option<String>,
}

impl ApiClient {
    /// Build an anonymous client from the resolved config.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            create_timeout: Duration::from_millis(config.create_timeout_ms),
            token: None,
        }
    }

    /// Attach a bearer token to every authenticated call.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Build an authenticated request. Without a token the call is never
    /// sent: it fails as an authorization error straight away.
    fn authed(&self, method: &str, path: &str) -> Result<ureq::Request, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        Ok(ureq::request(method, &self.url(path))
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Content-Type", "application/json"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = into_raw(self.authed("GET", path)?.call())?.into_result()?;
        resp.json()
    }

    // -- Auth ---------------------------------------------------------------

    /// `POST /auth/login` → access token.
    pub fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        self.auth_call("/auth/login", request)
    }

    /// `POST /auth/signup` → access token.
    pub fn signup(&self, request: &SignupRequest) -> Result<String, AuthError> {
        self.auth_call("/auth/signup", request)
    }

    fn auth_call<B: Serialize>(&self, path: &str, body: &B) -> Result<String, AuthError> {
        let result = ureq::post(&self.url(path))
            .timeout(self.timeout)
            .send_json(body);
        let raw = into_raw(result).map_err(|e| AuthError::Network(e.to_string()))?;
        auth::interpret_auth_response(raw.status, &raw.body)
    }

    /// `POST /auth/token/verify`. Any failure of the call itself counts as
    /// an invalid token.
    pub fn verify_token(&self, token: &str) -> bool {
        let result = ureq::post(&self.url("/auth/token/verify"))
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Content-Type", "application/json")
            .call();
        into_raw(result).is_ok_and(|raw| raw.is_success())
    }

    // -- Pass-through -------------------------------------------------------

    /// Forward an arbitrary authenticated call, returning the raw exchange.
    ///
    /// `path_and_query` is relative to `/api/v1`. Used by the web gateway's
    /// `/api/*` pass-through.
    pub fn forward(
        &self,
        method: &str,
        path_and_query: &str,
        body: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        let request = self.authed(method, path_and_query)?;
        let result = match body {
            Some(body) if !body.is_empty() => request.send_string(body),
            _ => request.call(),
        };
        into_raw(result)
    }
}

impl PanelApi for ApiClient {
    fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/user/profile")
    }

    fn my_containers(&self) -> Result<Vec<ContainerSummary>, ApiError> {
        self.get_json("/proxmox/container")
    }

    fn all_containers(&self) -> Result<Vec<Container>, ApiError> {
        self.get_json("/proxmox/container/all")
    }

    fn telemetry(&self, vmid: u32) -> Result<Telemetry, ApiError> {
        self.get_json(&format!("/proxmox/container/telemetry/{vmid}"))
    }

    fn container_action(&self, action: ContainerAction, vmid: u32) -> Result<(), ApiError> {
        let path = format!("/proxmox/container/{}?vmid={vmid}", action.endpoint());
        into_raw(self.authed("POST", &path)?.call())?.into_result()?;
        Ok(())
    }

    fn create_ticket(&self, ticket: &NewTicket) -> Result<(), ApiError> {
        let request = self
            .authed("POST", "/proxmox/container/ticket")?
            .timeout(self.create_timeout);
        into_raw(request.send_json(ticket))?.expect_status(201)?;
        Ok(())
    }

    fn tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        self.get_json("/proxmox/container/ticket")
    }

    fn approve_ticket(&self, ticket_id: &str) -> Result<(), ApiError> {
        let path = format!("/proxmox/container/{ticket_id}");
        into_raw(self.authed("POST", &path)?.call())?.expect_status(201)?;
        Ok(())
    }

    fn reject_ticket(&self, ticket_id: &str) -> Result<(), ApiError> {
        let path = format!("/proxmox/container/ticket/{ticket_id}");
        into_raw(self.authed("DELETE", &path)?.call())?.into_result()?;
        Ok(())
    }
}

impl TokenVerifier for ApiClient {
    fn verify(&self, token: &str) -> bool {
        self.verify_token(token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
