//! Bearer token persistence.
//!
//! The terminal surface keeps the token in `~/.nvpanel/session` (its
//! equivalent of browser local storage). The web gateway mirrors it into a
//! short-lived `authToken` cookie that the route guard inspects.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::schema::SessionConfig;

// ---------------------------------------------------------------------------
// Token store
// ---------------------------------------------------------------------------

/// Read-many / write-rarely home of the bearer token.
pub trait SessionStore {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> io::Result<()>;
    /// Forget the token. Best-effort.
    fn clear(&self);
}

/// File-backed store at `~/.nvpanel/session`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: Option<PathBuf>,
}

impl FileSessionStore {
    pub fn new() -> Self {
        Self {
            path: crate::config::state_dir().map(|dir| dir.join("session")),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let token = fs::read_to_string(path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine home directory",
            ));
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, token)
    }

    fn clear(&self) {
        if let Some(path) = &self.path {
            let _ = fs::remove_file(path);
        }
    }
}

/// In-process store, used by the web gateway per request and by tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok()?.clone()
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Cookie mirror
// ---------------------------------------------------------------------------

/// `Set-Cookie` value carrying the token: path `/`, `Max-Age` from config,
/// `SameSite=Lax`, and `Secure` when served over TLS.
pub fn session_cookie(config: &SessionConfig, token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        config.cookie_name, token, config.cookie_max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_session_cookie(config: &SessionConfig) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; SameSite=Lax",
        config.cookie_name
    )
}

/// Value of cookie `name` in a `Cookie` request header. Empty values count
/// as absent.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_carries_lifetime_and_samesite() {
        let cookie = session_cookie(&SessionConfig::default(), "abc", false);
        assert_eq!(cookie, "authToken=abc; Path=/; Max-Age=3600; SameSite=Lax");
    }

    #[test]
    fn secure_flag_only_over_tls() {
        let cookie = session_cookie(&SessionConfig::default(), "abc", true);
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn expired_cookie_has_zero_max_age() {
        let cookie = expired_session_cookie(&SessionConfig::default());
        assert!(cookie.starts_with("authToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let header = "theme=dark; authToken=tok-123; lang=ru";
        assert_eq!(cookie_value(header, "authToken"), Some("tok-123"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("authToken=", "authToken"), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load(), None);
        store.save("t1").unwrap();
        assert_eq!(store.load().as_deref(), Some("t1"));
        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn file_store_trims_and_clears() {
        let path = std::env::temp_dir().join(format!("nvpanel-session-{}", std::process::id()));
        let store = FileSessionStore::at(&path);
        store.save("tok\n").unwrap();
        assert_eq!(store.load().as_deref(), Some("tok"));
        store.clear();
        assert_eq!(store.load(), None);
    }
}
