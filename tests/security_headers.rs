//! Response header behavior of the page server.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use tower::ServiceExt;

use counter_gate::config::{BackendConfig, GateConfig};
use counter_gate::http::HttpServer;

fn app(base_url: &str) -> Router {
    let config = GateConfig {
        backend: BackendConfig {
            base_url: base_url.into(),
            ..BackendConfig::default()
        },
        ..GateConfig::default()
    };
    HttpServer::new(config).router()
}

async fn get(app: Router, request: Request<Body>) -> (Response<Body>, String) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    (
        Response::from_parts(parts, Body::empty()),
        String::from_utf8(bytes.to_vec()).unwrap(),
    )
}

fn page(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn csp(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .map(|v| v.to_str().unwrap().to_string())
}

fn nonce_in_policy(policy: &str) -> String {
    let start = policy.find("'nonce-").unwrap() + "'nonce-".len();
    let end = policy[start..].find('\'').unwrap();
    policy[start..start + end].to_string()
}

#[tokio::test]
async fn test_rendered_nonce_matches_policy() {
    let (response, body) = get(app("https://abc.supabase.co"), page("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let policy = csp(&response).unwrap();
    let nonce = nonce_in_policy(&policy);
    assert!(body.contains(&format!("<script nonce=\"{nonce}\">")));
    assert!(body.contains(&format!("<style nonce=\"{nonce}\">")));

    assert!(policy.starts_with("default-src 'self'; script-src 'self' 'nonce-"));
    assert!(policy.contains("connect-src 'self' https://abc.supabase.co wss://abc.supabase.co"));
    assert!(policy.contains("frame-ancestors 'none'"));
}

#[tokio::test]
async fn test_nonce_differs_between_requests() {
    let router = app("https://abc.supabase.co");
    let (first, _) = get(router.clone(), page("/dashboard")).await;
    let (second, _) = get(router, page("/dashboard")).await;
    assert_ne!(
        nonce_in_policy(&csp(&first).unwrap()),
        nonce_in_policy(&csp(&second).unwrap())
    );
}

#[tokio::test]
async fn test_client_nonce_is_overwritten() {
    let request = Request::builder()
        .uri("/")
        .header("x-nonce", "attacker")
        .body(Body::empty())
        .unwrap();
    let (response, body) = get(app(""), request).await;
    let nonce = nonce_in_policy(&csp(&response).unwrap());
    assert_ne!(nonce, "attacker");
    assert!(!body.contains("attacker"));
}

#[tokio::test]
async fn test_forged_nonce_ignored_when_policy_skipped() {
    let forged = "x\"><script>alert(1)</script><b a=\"";
    let request = Request::builder()
        .uri("/")
        .header("sec-purpose", "prefetch")
        .header("x-nonce", forged)
        .body(Body::empty())
        .unwrap();
    let (response, body) = get(app(""), request).await;
    assert!(csp(&response).is_none());
    assert!(!body.contains("alert(1)"));
    assert!(!body.contains("nonce="));
}

#[tokio::test]
async fn test_forged_nonce_ignored_with_headers_disabled() {
    let mut config = GateConfig::default();
    config.security.enable_headers = false;
    let request = Request::builder()
        .uri("/dashboard")
        .header("x-nonce", "forged")
        .body(Body::empty())
        .unwrap();
    let (_, body) = get(HttpServer::new(config).router(), request).await;
    assert!(!body.contains("forged"));
}

#[tokio::test]
async fn test_hardening_headers_on_every_response() {
    let prefetch = Request::builder()
        .uri("/")
        .header("next-router-prefetch", "1")
        .body(Body::empty())
        .unwrap();
    for request in [page("/"), page("/health"), prefetch] {
        let (response, _) = get(app(""), request).await;
        let headers = response.headers();
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(headers["permissions-policy"]
            .to_str()
            .unwrap()
            .contains("camera=()"));
        assert!(headers.contains_key("x-request-id"));
    }
}

#[tokio::test]
async fn test_assets_and_prefetches_skip_policy() {
    let (response, _) = get(app(""), page("/favicon.ico")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(csp(&response).is_none());

    let request = Request::builder()
        .uri("/")
        .header("sec-purpose", "prefetch")
        .body(Body::empty())
        .unwrap();
    let (response, body) = get(app(""), request).await;
    assert!(csp(&response).is_none());
    assert!(!body.contains("nonce"));
}

#[tokio::test]
async fn test_unusable_backend_url_drops_origins() {
    let (response, _) = get(app("ftp://files.example.com"), page("/")).await;
    let policy = csp(&response).unwrap();
    assert!(policy.contains("connect-src 'self';"));
    assert!(!policy.contains("files.example.com"));
}

#[tokio::test]
async fn test_health() {
    let (response, body) = get(app(""), page("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body, "ok");
    assert!(csp(&response).is_some());
}

#[tokio::test]
async fn test_headers_can_be_disabled() {
    let mut config = GateConfig::default();
    config.security.enable_headers = false;
    let (response, _) = get(HttpServer::new(config).router(), page("/")).await;
    assert!(csp(&response).is_none());
    assert!(!response.headers().contains_key("x-frame-options"));
}
