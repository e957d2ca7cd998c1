//! Page shells.
//!
//! The login and dashboard shells only carry the nonce-bearing inline script
//! and style; the operator interaction itself lives in the gate workflows.

use axum::{
    extract::Request,
    response::{Html, IntoResponse},
};

use crate::http::middleware::CspNonce;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem}";

/// The nonce of this response's policy. Empty when no policy is attached.
fn nonce_from(req: &Request) -> &str {
    req.extensions()
        .get::<CspNonce>()
        .map(|CspNonce(nonce)| nonce.as_str())
        .unwrap_or_default()
}

fn shell(title: &str, nonce: &str, body: &str) -> Html<String> {
    let nonce_attr = if nonce.is_empty() {
        String::new()
    } else {
        format!(" nonce=\"{nonce}\"")
    };
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style{nonce_attr}>{STYLE}</style>\n</head>\n<body>\n\
         {body}\n<script{nonce_attr}>document.documentElement.dataset.ready = \"1\";</script>\n\
         </body>\n</html>\n"
    ))
}

pub async fn login_page(req: Request) -> impl IntoResponse {
    shell(
        "Counter sign-in",
        nonce_from(&req),
        "<main id=\"login\"><h1>Counter sign-in</h1></main>",
    )
}

pub async fn dashboard_page(req: Request) -> impl IntoResponse {
    shell(
        "Counter dashboard",
        nonce_from(&req),
        "<main id=\"dashboard\"><h1>Access verification</h1></main>",
    )
}

pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_carries_nonce() {
        let Html(body) = shell("t", "abc=", "<p></p>");
        assert!(body.contains("<style nonce=\"abc=\">"));
        assert!(body.contains("<script nonce=\"abc=\">"));
    }

    #[test]
    fn test_nonce_comes_only_from_extension() {
        let mut req = axum::http::Request::builder()
            .header("x-nonce", "forged")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(nonce_from(&req), "");

        let nonce = crate::security::Nonce::generate().unwrap();
        req.extensions_mut().insert(CspNonce(nonce.clone()));
        assert_eq!(nonce_from(&req), nonce.as_str());
    }

    #[test]
    fn test_shell_without_nonce() {
        let Html(body) = shell("t", "", "<p></p>");
        assert!(!body.contains("nonce"));
    }
}
