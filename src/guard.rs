//! Cookie-presence route guard for the dashboard.
//!
//! The guard never validates the session token; the external auth service
//! owns that. A non-empty cookie value counts as signed in.

use url::form_urlencoded;

use crate::config::GuardConfig;

/// Paths the guard never inspects (assets, API routes, crawler files).
pub const EXCLUDED_PREFIXES: &[&str] = &[
    "/api",
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/sitemap.xml",
    "/robots.txt",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Signed-out visitor on a protected path.
    RedirectToLogin { location: String },
    /// Signed-in visitor on a login/signup path.
    RedirectAuthenticated { location: String },
}

impl GuardDecision {
    pub fn location(&self) -> Option<&str> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin { location }
            | GuardDecision::RedirectAuthenticated { location } => Some(location),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    config: GuardConfig,
}

impl RouteGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decide what to do with a request for `path` given its raw `Cookie`
    /// header (if any).
    pub fn decide(&self, path: &str, cookie_header: Option<&str>) -> GuardDecision {
        if is_excluded(path) {
            return GuardDecision::Allow;
        }

        let authenticated = cookie_header
            .and_then(|h| cookie_value(h, &self.config.cookie_name))
            .is_some_and(|v| !v.is_empty());

        if !authenticated && matches_any(path, &self.config.protected_routes) {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect", path)
                .finish();
            return GuardDecision::RedirectToLogin {
                location: format!("{}?{}", self.config.login_path, query),
            };
        }

        if authenticated && matches_any(path, &self.config.auth_routes) {
            return GuardDecision::RedirectAuthenticated {
                location: self.config.home_path.clone(),
            };
        }

        GuardDecision::Allow
    }
}

fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn matches_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

/// Value of cookie `name` in a `Cookie` header, e.g. `"a=1; sid=xyz"`.
/// When the name repeats, the first non-empty value wins.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let mut values = header.split(';').filter_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k.trim() == name).then(|| v.trim().trim_matches('"'))
    });
    let first = values.next()?;
    if !first.is_empty() {
        return Some(first);
    }
    Some(values.find(|v| !v.is_empty()).unwrap_or(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_found() {
        assert_eq!(cookie_value("a=1; sid=xyz; b=2", "sid"), Some("xyz"));
    }

    #[test]
    fn test_cookie_value_quoted() {
        assert_eq!(cookie_value("sid=\"xyz\"", "sid"), Some("xyz"));
    }

    #[test]
    fn test_cookie_value_skips_empty_duplicate() {
        assert_eq!(cookie_value("sid=; sid=abc", "sid"), Some("abc"));
        assert_eq!(cookie_value("sid=abc; sid=", "sid"), Some("abc"));
        assert_eq!(cookie_value("sid=; sid=", "sid"), Some(""));
    }

    #[test]
    fn test_cookie_value_missing() {
        assert_eq!(cookie_value("a=1; b=2", "sid"), None);
        assert_eq!(cookie_value("", "sid"), None);
    }

    #[test]
    fn test_cookie_value_keeps_equals_in_value() {
        assert_eq!(cookie_value("sid=abc==", "sid"), Some("abc=="));
    }

    #[test]
    fn test_location_accessor() {
        assert_eq!(GuardDecision::Allow.location(), None);
        let d = GuardDecision::RedirectAuthenticated { location: "/dashboard".into() };
        assert_eq!(d.location(), Some("/dashboard"));
    }
}
