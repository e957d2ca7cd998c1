//! Content-Security-Policy assembly and hardening headers.
//!
//! # Responsibilities
//! - Derive the backend's HTTP(S) and WS(S) origins from the configured URL
//! - Build a fresh, nonce-bearing policy for every request
//! - Define the static hardening headers attached to every response
//!
//! # Design Decisions
//! - Origins are derived once at startup; the policy string never is cached
//! - An unusable backend URL drops the derived origins instead of failing
//! - Directive order is fixed so the serialized header is stable

use axum::http::{header, HeaderName, HeaderValue};
use url::Url;

use crate::config::BackendConfig;
use crate::observability::metrics;
use crate::security::nonce::{Nonce, NonceError};

/// Request header carrying the nonce to the rendering stage.
pub const NONCE_HEADER: &str = "x-nonce";

pub const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";
pub const CONTENT_TYPE_OPTIONS: &str = "nosniff";
pub const FRAME_OPTIONS: &str = "DENY";
pub const PERMISSIONS_POLICY: &str = "accelerometer=(), autoplay=(), camera=(), \
display-capture=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), \
midi=(), payment=(), usb=()";

const SELF: &str = "'self'";
const NONE: &str = "'none'";

/// Hardening headers attached to every response, independent of the nonce.
pub fn hardening_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static(REFERRER_POLICY),
        ),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static(CONTENT_TYPE_OPTIONS),
        ),
        (
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static(FRAME_OPTIONS),
        ),
        (
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY),
        ),
    ]
}

/// Network origins of the remote authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOrigins {
    /// e.g. `https://abc.supabase.co`
    pub http: Option<String>,
    /// e.g. `wss://abc.supabase.co`
    pub ws: Option<String>,
}

impl BackendOrigins {
    /// Derive origins from a base URL. Anything other than an absolute
    /// `http`/`https` URL with a host yields no origins.
    pub fn derive(base_url: Option<&str>) -> Self {
        let Some(raw) = base_url.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(base_url = %raw, error = %e, "Ignoring unparseable backend URL");
                return Self::default();
            }
        };

        let ws_scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                tracing::warn!(scheme = %other, "Backend URL is not http(s); no origins derived");
                return Self::default();
            }
        };

        let Some(host) = url.host_str() else {
            return Self::default();
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Self {
            http: Some(format!("{}://{authority}", url.scheme())),
            ws: Some(format!("{ws_scheme}://{authority}")),
        }
    }
}

/// One CSP directive and its source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: &'static str,
    pub sources: Vec<String>,
}

impl Directive {
    fn new<I, S>(name: &'static str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered directive list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<Directive>,
}

impl ContentSecurityPolicy {
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    /// Serialize as a single header value: `name src src; name src; ...`.
    pub fn to_header_value(&self) -> String {
        self.directives
            .iter()
            .map(|d| {
                if d.sources.is_empty() {
                    d.name.to_string()
                } else {
                    format!("{} {}", d.name, d.sources.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Nonce plus the policy that references it. Built once per request.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub nonce: Nonce,
    pub csp: ContentSecurityPolicy,
}

impl SecurityPolicy {
    pub fn header_value(&self) -> String {
        self.csp.to_header_value()
    }
}

/// Builds a fresh [`SecurityPolicy`] per request.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaderBuilder {
    origins: BackendOrigins,
}

impl SecurityHeaderBuilder {
    pub fn new(base_url: Option<&str>) -> Self {
        let origins = BackendOrigins::derive(base_url);
        tracing::info!(
            http_origin = ?origins.http,
            ws_origin = ?origins.ws,
            "Security header builder initialized"
        );
        Self { origins }
    }

    pub fn from_config(backend: &BackendConfig) -> Self {
        Self::new(backend.base_url())
    }

    pub fn origins(&self) -> &BackendOrigins {
        &self.origins
    }

    /// Generate a nonce and the policy bound to it.
    pub fn build(&self) -> Result<SecurityPolicy, NonceError> {
        let nonce = Nonce::generate()?;
        let csp = self.policy_for(&nonce);
        metrics::record_policy_built();
        Ok(SecurityPolicy { nonce, csp })
    }

    /// The directive set for a given nonce.
    pub fn policy_for(&self, nonce: &Nonce) -> ContentSecurityPolicy {
        let nonce_src = nonce.source();
        let http = self.origins.http.as_deref();
        let ws = self.origins.ws.as_deref();

        let img_src = [Some(SELF), Some("data:"), Some("blob:"), http]
            .into_iter()
            .flatten();
        let connect_src = [Some(SELF), http, ws].into_iter().flatten();

        ContentSecurityPolicy {
            directives: vec![
                Directive::new("default-src", [SELF]),
                Directive::new(
                    "script-src",
                    [SELF.to_string(), nonce_src.clone(), "'strict-dynamic'".to_string()],
                ),
                Directive::new("style-src", [SELF.to_string(), nonce_src]),
                Directive::new("img-src", img_src),
                Directive::new("font-src", [SELF]),
                Directive::new("connect-src", connect_src),
                Directive::new("object-src", [NONE]),
                Directive::new("base-uri", [SELF]),
                Directive::new("form-action", [SELF]),
                Directive::new("frame-ancestors", [NONE]),
                Directive::new("upgrade-insecure-requests", Vec::<String>::new()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_https_origins() {
        let origins = BackendOrigins::derive(Some("https://abc.supabase.co/rest/v1?x=1"));
        assert_eq!(origins.http.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(origins.ws.as_deref(), Some("wss://abc.supabase.co"));
    }

    #[test]
    fn test_derive_http_keeps_port() {
        let origins = BackendOrigins::derive(Some("http://127.0.0.1:54321"));
        assert_eq!(origins.http.as_deref(), Some("http://127.0.0.1:54321"));
        assert_eq!(origins.ws.as_deref(), Some("ws://127.0.0.1:54321"));
    }

    #[test]
    fn test_derive_failures_yield_nothing() {
        assert_eq!(BackendOrigins::derive(None), BackendOrigins::default());
        assert_eq!(BackendOrigins::derive(Some("")), BackendOrigins::default());
        assert_eq!(BackendOrigins::derive(Some("not a url")), BackendOrigins::default());
        assert_eq!(BackendOrigins::derive(Some("ftp://files.example")), BackendOrigins::default());
    }

    #[test]
    fn test_policy_with_backend() {
        let builder = SecurityHeaderBuilder::new(Some("https://abc.supabase.co"));
        let policy = builder.build().unwrap();
        let value = policy.header_value();
        let nonce = policy.nonce.as_str();

        assert!(value.starts_with("default-src 'self'; "));
        assert!(value.contains(&format!("script-src 'self' 'nonce-{nonce}' 'strict-dynamic'")));
        assert!(value.contains(&format!("style-src 'self' 'nonce-{nonce}'")));
        assert!(value.contains("img-src 'self' data: blob: https://abc.supabase.co;"));
        assert!(value.contains("connect-src 'self' https://abc.supabase.co wss://abc.supabase.co;"));
        assert!(value.contains("frame-ancestors 'none'"));
        assert!(value.contains("form-action 'self'"));
        assert!(value.ends_with("upgrade-insecure-requests"));
    }

    #[test]
    fn test_policy_without_backend() {
        let builder = SecurityHeaderBuilder::new(None);
        let policy = builder.build().unwrap();
        assert_eq!(
            policy.csp.directive("connect-src").unwrap().sources,
            vec!["'self'"]
        );
        assert_eq!(
            policy.csp.directive("img-src").unwrap().sources,
            vec!["'self'", "data:", "blob:"]
        );
    }

    #[test]
    fn test_directive_order() {
        let builder = SecurityHeaderBuilder::default();
        let nonce = Nonce::generate().unwrap();
        let names: Vec<_> = builder
            .policy_for(&nonce)
            .directives()
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            [
                "default-src",
                "script-src",
                "style-src",
                "img-src",
                "font-src",
                "connect-src",
                "object-src",
                "base-uri",
                "form-action",
                "frame-ancestors",
                "upgrade-insecure-requests",
            ]
        );
    }

    #[test]
    fn test_consecutive_policies_differ() {
        let builder = SecurityHeaderBuilder::default();
        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.header_value(), b.header_value());
    }

    #[test]
    fn test_hardening_headers() {
        let headers = hardening_headers();
        assert!(headers
            .iter()
            .any(|(k, v)| *k == header::X_CONTENT_TYPE_OPTIONS && *v == "nosniff"));
        let permissions = headers
            .iter()
            .find(|(k, _)| k.as_str() == "permissions-policy")
            .unwrap();
        let value = permissions.1.to_str().unwrap();
        for feature in ["geolocation=()", "camera=()", "microphone=()", "usb=()", "payment=()"] {
            assert!(value.contains(feature), "missing {feature}");
        }
    }
}
