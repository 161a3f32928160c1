//! Route guard: decides what happens to a navigation before a page renders.
//!
//! Every decision that depends on the token re-verifies it against the API;
//! nothing is cached and nothing is trusted locally. A verification call
//! that fails for any reason counts as an invalid token.
//!
//! | Path class   | No token          | Invalid token     | Valid token        |
//! |--------------|-------------------|-------------------|--------------------|
//! | protected    | `/login?from=..`  | `/login?from=..`  | allow              |
//! | guest-only   | allow             | allow             | redirect `/profile`|
//! | `/api*`      | 401 JSON          | 401 JSON          | pass through       |
//! | anything else| allow             | allow             | allow              |

use url::form_urlencoded;

/// Path prefixes that require a verified session.
pub const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/profile", "/container"];

/// Path prefixes only anonymous visitors should see.
pub const GUEST_PREFIXES: &[&str] = &["/login", "/register"];

pub const API_PREFIX: &str = "/api";

/// Where a verified user lands when visiting a guest-only page.
pub const HOME_PATH: &str = "/profile";

/// Checks a bearer token against the authority.
pub trait TokenVerifier {
    fn verify(&self, token: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Api,
    Protected,
    GuestOnly,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
    /// Reject an API call with a 401 and this error text.
    Unauthorized(&'static str),
}

/// Classify a request path (query string already stripped).
pub fn classify(path: &str) -> RouteClass {
    if path.starts_with(API_PREFIX) {
        RouteClass::Api
    } else if PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::Protected
    } else if GUEST_PREFIXES.iter().any(|p| path.starts_with(p)) {
        RouteClass::GuestOnly
    } else {
        RouteClass::Public
    }
}

/// Apply the guard policy to one navigation.
pub fn evaluate(path: &str, token: Option<&str>, verifier: &dyn TokenVerifier) -> GuardDecision {
    let token = token.filter(|t| !t.is_empty());

    match classify(path) {
        RouteClass::Api => match token {
            None => GuardDecision::Unauthorized("Unauthorized"),
            Some(t) if !verifier.verify(t) => GuardDecision::Unauthorized("Invalid token"),
            Some(_) => GuardDecision::Allow,
        },
        RouteClass::Protected => match token {
            Some(t) if verifier.verify(t) => GuardDecision::Allow,
            _ => GuardDecision::Redirect(login_redirect(path)),
        },
        RouteClass::GuestOnly => match token {
            Some(t) if verifier.verify(t) => GuardDecision::Redirect(HOME_PATH.to_string()),
            _ => GuardDecision::Allow,
        },
        RouteClass::Public => GuardDecision::Allow,
    }
}

/// `/login?from=<path>`.
pub fn login_redirect(from: &str) -> String {
    format!("/login?from={}", encode_query_value(from))
}

/// Where to send a user after login, given the `from` query value.
///
/// Only same-site absolute paths of visible ASCII are honoured. Values that
/// a browser would read as another host (`//host`, `/\host`) or that carry
/// control characters fall back to [`HOME_PATH`].
pub fn post_login_target(from: Option<&str>) -> String {
    match from {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => HOME_PATH.to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.first() == Some(&b'/')
        && !matches!(bytes.get(1), Some(b'/' | b'\\'))
        && bytes.iter().all(u8::is_ascii_graphic)
}

/// Form-encode a query value, leaving `/` readable.
pub fn encode_query_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace("%2F", "/")
}

/// Decoded value of `key` in a raw query string.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct FixedVerifier {
        valid: bool,
        calls: Cell<usize>,
    }

    impl FixedVerifier {
        fn new(valid: bool) -> Self {
            Self {
                valid,
                calls: Cell::new(0),
            }
        }
    }

    impl TokenVerifier for FixedVerifier {
        fn verify(&self, _token: &str) -> bool {
            self.calls.set(self.calls.get() + 1);
            self.valid
        }
    }

    #[test]
    fn protected_without_cookie_redirects_to_login() {
        let verifier = FixedVerifier::new(true);
        assert_eq!(
            evaluate("/profile", None, &verifier),
            GuardDecision::Redirect("/login?from=/profile".to_string())
        );
        assert_eq!(verifier.calls.get(), 0);
    }

    #[test]
    fn protected_with_invalid_token_redirects() {
        let verifier = FixedVerifier::new(false);
        assert_eq!(
            evaluate("/container/info/101", Some("stale"), &verifier),
            GuardDecision::Redirect("/login?from=/container/info/101".to_string())
        );
    }

    #[test]
    fn protected_with_valid_token_is_allowed_and_verified_each_time() {
        let verifier = FixedVerifier::new(true);
        assert_eq!(evaluate("/dashboard", Some("t"), &verifier), GuardDecision::Allow);
        assert_eq!(evaluate("/dashboard", Some("t"), &verifier), GuardDecision::Allow);
        assert_eq!(verifier.calls.get(), 2);
    }

    #[test]
    fn guest_pages_redirect_verified_users_home() {
        let valid = FixedVerifier::new(true);
        assert_eq!(
            evaluate("/login", Some("t"), &valid),
            GuardDecision::Redirect("/profile".to_string())
        );

        let invalid = FixedVerifier::new(false);
        assert_eq!(evaluate("/register", Some("t"), &invalid), GuardDecision::Allow);
        assert_eq!(evaluate("/login", None, &invalid), GuardDecision::Allow);
    }

    #[test]
    fn api_paths_answer_401() {
        let invalid = FixedVerifier::new(false);
        assert_eq!(
            evaluate("/api/v1/user/profile", None, &invalid),
            GuardDecision::Unauthorized("Unauthorized")
        );
        assert_eq!(
            evaluate("/api/v1/user/profile", Some("t"), &invalid),
            GuardDecision::Unauthorized("Invalid token")
        );
        let valid = FixedVerifier::new(true);
        assert_eq!(
            evaluate("/api/v1/user/profile", Some("t"), &valid),
            GuardDecision::Allow
        );
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let verifier = FixedVerifier::new(true);
        assert_eq!(
            evaluate("/profile", Some(""), &verifier),
            GuardDecision::Redirect("/login?from=/profile".to_string())
        );
    }

    #[test]
    fn public_pages_skip_verification() {
        let verifier = FixedVerifier::new(false);
        assert_eq!(evaluate("/", Some("t"), &verifier), GuardDecision::Allow);
        assert_eq!(verifier.calls.get(), 0);
    }

    #[test]
    fn post_login_target_rejects_offsite_values() {
        assert_eq!(post_login_target(Some("/container/list")), "/container/list");
        assert_eq!(post_login_target(Some("//evil.example")), "/profile");
        assert_eq!(post_login_target(Some("https://evil.example")), "/profile");
        assert_eq!(post_login_target(Some("/\\evil.example")), "/profile");
        assert_eq!(post_login_target(Some("/x\r\nSet-Cookie: a=b")), "/profile");
        assert_eq!(post_login_target(Some("/x\ty")), "/profile");
        assert_eq!(post_login_target(None), "/profile");
    }

    #[test]
    fn query_values_survive_encoding() {
        let encoded = encode_query_value("/container/info/7?tab=a b");
        assert_eq!(encoded, "/container/info/7%3Ftab%3Da+b");
        assert_eq!(
            query_param(&format!("from={encoded}"), "from").as_deref(),
            Some("/container/info/7?tab=a b")
        );
        assert_eq!(
            query_param("x=1&from=%2Fprofile", "from").as_deref(),
            Some("/profile")
        );
        assert_eq!(query_param("x=1", "from"), None);
    }
}
