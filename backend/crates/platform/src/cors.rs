//! CORS origin policy
//!
//! An origin is reflected back (with credentials) when any of these hold:
//! - it is a `http://localhost` origin, or the request is a GET
//! - it equals an allow-list entry (a trailing `/` is ignored on both sides)
//! - an entry has the form `https://*.example.com` and the origin is an
//!   https origin ending in `.example.com`

use axum::http::{HeaderValue, Method, header, request::Parts};

const LOCALHOST: &str = "http://localhost";
const WILDCARD_PREFIX: &str = "https://*";
const HTTPS: &str = "https://";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();

        for origin in origins {
            let origin = origin.as_ref().trim().trim_end_matches('/');
            if origin.is_empty() {
                continue;
            }
            match origin.strip_prefix(WILDCARD_PREFIX) {
                Some(suffix) if !suffix.is_empty() => policy.suffixes.push(suffix.to_string()),
                _ => policy.exact.push(origin.to_string()),
            }
        }

        policy
    }

    pub fn allows(&self, origin: &str, method: &Method) -> bool {
        if origin.is_empty() {
            return false;
        }
        if origin.contains(LOCALHOST) || method == Method::GET {
            return true;
        }

        let origin = origin.trim_end_matches('/');
        if self.exact.iter().any(|allowed| allowed == origin) {
            return true;
        }

        origin.starts_with(HTTPS)
            && self
                .suffixes
                .iter()
                .any(|suffix| origin.ends_with(suffix.as_str()))
    }

    /// Predicate form for `tower_http::cors::AllowOrigin::predicate`
    ///
    /// Preflight requests are judged by the method they announce in
    /// `Access-Control-Request-Method`.
    pub fn allows_request(&self, origin: &HeaderValue, parts: &Parts) -> bool {
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        self.allows(origin, &effective_method(parts))
    }
}

fn effective_method(parts: &Parts) -> Method {
    if parts.method == Method::OPTIONS {
        if let Some(requested) = parts
            .headers
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| Method::from_bytes(v.as_bytes()).ok())
        {
            return requested;
        }
    }
    parts.method.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(["https://*.example.com", "https://app.example.org/", " "])
    }

    #[test]
    fn test_localhost_always_allowed() {
        assert!(policy().allows("http://localhost:3000", &Method::POST));
        assert!(OriginPolicy::default().allows("http://localhost", &Method::DELETE));
    }

    #[test]
    fn test_get_always_allowed() {
        assert!(policy().allows("https://evil.test", &Method::GET));
    }

    #[test]
    fn test_exact_match() {
        assert!(policy().allows("https://app.example.org", &Method::POST));
        assert!(!policy().allows("https://app.example.org.evil", &Method::POST));
    }

    #[test]
    fn test_wildcard_suffix() {
        let p = policy();
        assert!(p.allows("https://shop.example.com", &Method::POST));
        assert!(!p.allows("http://shop.example.com", &Method::POST));
        assert!(!p.allows("https://example.com.evil.test", &Method::POST));
        assert!(!p.allows("https://evilexample.com", &Method::POST));
    }

    #[test]
    fn test_empty_origin_rejected() {
        assert!(!policy().allows("", &Method::GET));
    }

    #[test]
    fn test_preflight_uses_requested_method() {
        let p = OriginPolicy::default();
        let origin = HeaderValue::from_static("https://elsewhere.test");

        let (get_preflight, _) = Request::builder()
            .method(Method::OPTIONS)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(())
            .unwrap()
            .into_parts();
        assert!(p.allows_request(&origin, &get_preflight));

        let (post_preflight, _) = Request::builder()
            .method(Method::OPTIONS)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(())
            .unwrap()
            .into_parts();
        assert!(!p.allows_request(&origin, &post_preflight));
    }
}
