//! Auth client: login, registration and token lifecycle.
//!
//! Turns raw login/signup responses into an access token or an
//! [`AuthError`] whose message comes from the server body, and persists the
//! token on success.

pub mod session;

use thiserror::Error;

use crate::activity::{ActivityKind, ActivityLog};
use crate::api::{ApiClient, LoginRequest, SignupRequest};
use crate::validation::{self, ValidationError};

pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

/// Shown when the server rejects credentials without saying why.
pub const GENERIC_AUTH_ERROR: &str = "authentication failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected by local validation before any request was sent.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// Rejected by the server; the message is the server's own.
    #[error("{0}")]
    Rejected(String),
    /// The server accepted the call but sent no `access_token`.
    #[error("server response did not include an access token")]
    MissingToken,
    #[error("API unavailable: {0}")]
    Network(String),
    #[error("could not store session: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Response interpretation
// ---------------------------------------------------------------------------

/// Extract the access token from a login/signup response.
///
/// On failure the message is taken from the body's `message`, then
/// `username`, then `email` field, falling back to
/// [`GENERIC_AUTH_ERROR`]. Field errors may be a string or a list of
/// strings.
pub fn interpret_auth_response(status: u16, body: &str) -> Result<String, AuthError> {
    let data: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

    if !(200..300).contains(&status) {
        let message = ["message", "username", "email"]
            .iter()
            .find_map(|field| field_message(data.get(*field)?))
            .unwrap_or_else(|| GENERIC_AUTH_ERROR.to_string());
        return Err(AuthError::Rejected(message));
    }

    data.get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingToken)
}

fn field_message(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Registration form input as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
}

impl RegistrationForm {
    /// Local checks, in the order the form reports them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_username(&self.username)?;
        validation::validate_password_match(&self.password, &self.confirm_password)?;
        validation::validate_full_name(&self.full_name)?;
        Ok(())
    }

    fn to_request(&self) -> SignupRequest {
        SignupRequest {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Log in and persist the returned token.
pub fn login(
    api: &ApiClient,
    store: &dyn SessionStore,
    log: &ActivityLog,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let request = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let result = api.login(&request).and_then(|token| persist(store, token));
    log.record_outcome(ActivityKind::Login, username, &result);
    result
}

/// Validate, register and persist the returned token.
pub fn register(
    api: &ApiClient,
    store: &dyn SessionStore,
    log: &ActivityLog,
    form: &RegistrationForm,
) -> Result<String, AuthError> {
    form.validate()?;
    let result = api
        .signup(&form.to_request())
        .and_then(|token| persist(store, token));
    log.record_outcome(ActivityKind::Register, &form.username, &result);
    result
}

/// Forget the stored token.
pub fn logout(store: &dyn SessionStore, log: &ActivityLog) {
    store.clear();
    log.record(ActivityKind::Logout, "", true, None);
}

fn persist(store: &dyn SessionStore, token: String) -> Result<String, AuthError> {
    store
        .save(&token)
        .map_err(|e| AuthError::Storage(e.to_string()))?;
    Ok(token)
}
