//! Per-request Content-Security-Policy middleware.
//!
//! # Responsibilities
//! - Decide whether a request gets a policy (documents yes, assets and
//!   prefetches no)
//! - Generate a fresh nonce and expose it to handlers through the `x-nonce`
//!   request header and a typed extension
//! - Attach the serialized policy to the response
//!
//! A client-supplied `x-nonce` header never reaches a handler: it is removed
//! on every path and replaced only when a policy is attached.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::security::{headers::NONCE_HEADER, Nonce, SecurityHeaderBuilder};

/// Nonce of the policy attached to the current response.
#[derive(Debug, Clone)]
pub struct CspNonce(pub Nonce);

const SKIPPED_PREFIXES: [&str; 2] = ["/api/", "/static/"];
const SKIPPED_PATHS: [&str; 3] = ["/api", "/static", "/favicon.ico"];

/// Whether a request should receive a nonce-bearing policy.
pub fn csp_applies(path: &str, headers: &HeaderMap) -> bool {
    if SKIPPED_PATHS.contains(&path) || SKIPPED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return false;
    }
    !is_prefetch(headers)
}

fn is_prefetch(headers: &HeaderMap) -> bool {
    if headers.contains_key("next-router-prefetch") {
        return true;
    }
    ["purpose", "sec-purpose"].iter().any(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("prefetch"))
    })
}

pub async fn content_security_policy(
    State(builder): State<Arc<SecurityHeaderBuilder>>,
    mut req: Request,
    next: Next,
) -> Response {
    req.headers_mut().remove(NONCE_HEADER);
    req.extensions_mut().remove::<CspNonce>();

    if !csp_applies(req.uri().path(), req.headers()) {
        return next.run(req).await;
    }

    let policy = match builder.build() {
        Ok(policy) => policy,
        Err(e) => {
            tracing::error!(error = %e, "Refusing to render without a nonce");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (nonce_value, csp_value) = match (
        HeaderValue::from_str(policy.nonce.as_str()),
        HeaderValue::from_str(&policy.header_value()),
    ) {
        (Ok(nonce), Ok(csp)) => (nonce, csp),
        _ => {
            tracing::error!("Generated policy is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    req.headers_mut().insert(NONCE_HEADER, nonce_value);
    req.extensions_mut().insert(CspNonce(policy.nonce));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CONTENT_SECURITY_POLICY, csp_value);
    response
}
