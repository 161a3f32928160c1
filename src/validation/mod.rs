//! Local form validation.
//!
//! These checks block submission with an inline message before any request
//! is made. The API re-validates everything; nothing here is authoritative.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const HOSTNAME_MIN_LEN: usize = 4;
pub const HOSTNAME_MAX_LEN: usize = 20;
pub const FULL_NAME_WORDS: usize = 3;

static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").expect("hostname regex must compile"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_]+$").expect("username regex must compile"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("hostname is required")]
    HostnameRequired,
    #[error("hostname must be between {HOSTNAME_MIN_LEN} and {HOSTNAME_MAX_LEN} characters")]
    HostnameLength,
    #[error("hostname may only contain latin letters, digits and hyphens")]
    HostnameCharset,
    #[error("username may only contain latin letters and underscores")]
    UsernameCharset,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("full name must consist of three words, got {0}")]
    FullNameWords(usize),
}

/// Hostname: 4–20 characters of `[a-zA-Z0-9-]`. Length is checked first.
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    if hostname.is_empty() {
        return Err(ValidationError::HostnameRequired);
    }
    let len = hostname.chars().count();
    if !(HOSTNAME_MIN_LEN..=HOSTNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::HostnameLength);
    }
    if !HOSTNAME_RE.is_match(hostname) {
        return Err(ValidationError::HostnameCharset);
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::UsernameCharset)
    }
}

pub fn validate_password_match(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password == confirmation {
        Ok(())
    } else {
        Err(ValidationError::PasswordMismatch)
    }
}

/// Full name must split on whitespace into exactly three words.
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    let words = full_name.split_whitespace().count();
    if words == FULL_NAME_WORDS {
        Ok(())
    } else {
        Err(ValidationError::FullNameWords(words))
    }
}
