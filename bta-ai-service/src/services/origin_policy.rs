//! Exact-match origin allow-list and the CORS headers it yields.

use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::HashSet;

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";
const MAX_AGE_SECS: &str = "600";

/// Immutable allow-list, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
        }
    }

    /// Decide for the request's `Origin` header. Absent or non-ASCII origins
    /// are denied.
    pub fn evaluate(&self, origin: Option<&HeaderValue>) -> AccessDecision {
        let granted = origin
            .filter(|value| {
                value
                    .to_str()
                    .map(|origin| self.allowed.contains(origin))
                    .unwrap_or(false)
            })
            .cloned();

        AccessDecision { granted }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Per-request CORS outcome. Holds the caller's origin only when it is on
/// the allow-list, so an untrusted origin can never be echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    granted: Option<HeaderValue>,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        self.granted.is_some()
    }

    /// Write the CORS headers for this decision.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.granted
                .clone()
                .unwrap_or_else(|| HeaderValue::from_static("null")),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(["https://app.example.com", "https://www.app.example.com"])
    }

    fn headers_for(origin: Option<&str>) -> HeaderMap {
        let origin = origin.map(|o| HeaderValue::from_str(o).unwrap());
        let mut headers = HeaderMap::new();
        policy().evaluate(origin.as_ref()).apply(&mut headers);
        headers
    }

    #[test]
    fn allowed_origin_is_echoed_exactly() {
        let headers = headers_for(Some("https://www.app.example.com"));

        assert_eq!(headers["access-control-allow-origin"], "https://www.app.example.com");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
        assert_eq!(headers["vary"], "Origin");
    }

    #[test]
    fn unknown_origin_is_never_reflected() {
        for origin in [
            "https://evil.example.com",
            "https://app.example.com.evil.com",
            "https://APP.example.com",
            "https://app.example.com/",
            "null",
        ] {
            let decision = policy().evaluate(Some(&HeaderValue::from_str(origin).unwrap()));
            assert!(!decision.is_allowed(), "{}", origin);

            let headers = headers_for(Some(origin));
            assert_eq!(headers["access-control-allow-origin"], "null");
            assert_eq!(headers["vary"], "Origin");
        }
    }

    #[test]
    fn missing_origin_is_denied() {
        let decision = policy().evaluate(None);
        assert!(!decision.is_allowed());
        assert_eq!(headers_for(None)["access-control-allow-origin"], "null");
    }

    #[test]
    fn non_ascii_origin_is_denied() {
        let value = HeaderValue::from_bytes(b"https://app.example.com\xff").unwrap();
        assert!(!policy().evaluate(Some(&value)).is_allowed());
    }

    #[test]
    fn empty_policy_denies_everything() {
        let policy = OriginPolicy::default();
        assert!(policy.is_empty());
        let value = HeaderValue::from_static("https://app.example.com");
        assert!(!policy.evaluate(Some(&value)).is_allowed());
    }
}
