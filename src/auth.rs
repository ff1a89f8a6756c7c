//! Delegation of `/api/auth/*` to an external identity service.
//!
//! Sessions, tokens and credential checks all live in that service. This
//! module only relays requests to it and relays its answers back.

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use async_trait::async_trait;

use crate::routes::AppState;

/// Handles every request under `/api/auth/`. Runs before body parsing and
/// the security middleware; receives the raw body.
#[async_trait(?Send)]
pub trait AuthHandler: Send + Sync {
    async fn handle(&self, req: &HttpRequest, body: web::Bytes) -> HttpResponse;
}

pub async fn delegate(req: HttpRequest, body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    data.auth.handle(&req, body).await
}

/// Used when no identity service is configured.
pub struct UnconfiguredAuthHandler;

#[async_trait(?Send)]
impl AuthHandler for UnconfiguredAuthHandler {
    async fn handle(&self, _req: &HttpRequest, _body: web::Bytes) -> HttpResponse {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "auth_not_configured",
            "message": "Set AUTH_SERVICE_URL to enable authentication"
        }))
    }
}

// Connection-scoped headers never forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection", "keep-alive", "proxy-authenticate", "proxy-authorization",
    "te", "trailer", "transfer-encoding", "upgrade", "host", "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Forwards requests to `base_url` + original path and query.
pub struct ProxyAuthHandler {
    base_url: String,
    client: reqwest::Client,
}

impl ProxyAuthHandler {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        // redirects belong to the browser, not to us
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    fn target(&self, req: &HttpRequest) -> String {
        let path = req.uri().path_and_query().map(|p| p.as_str()).unwrap_or_else(|| req.path());
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait(?Send)]
impl AuthHandler for ProxyAuthHandler {
    async fn handle(&self, req: &HttpRequest, body: web::Bytes) -> HttpResponse {
        let Ok(method) = reqwest::Method::from_bytes(req.method().as_str().as_bytes()) else {
            return HttpResponse::MethodNotAllowed().finish();
        };
        let target = self.target(req);

        let mut upstream = self.client.request(method, &target);
        for (name, value) in req.headers() {
            if is_hop_by_hop(name.as_str()) { continue; }
            upstream = upstream.header(name.as_str(), value.as_bytes());
        }
        {
            let conn = req.connection_info();
            upstream = upstream
                .header("x-forwarded-host", conn.host())
                .header("x-forwarded-proto", conn.scheme());
            if let Some(addr) = conn.realip_remote_addr() {
                upstream = upstream.header("x-forwarded-for", addr);
            }
        }

        let resp = match upstream.body(body).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, %target, "auth service unreachable");
                return HttpResponse::BadGateway().json(serde_json::json!({ "error": "auth_service_unavailable" }));
            }
        };

        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut out = HttpResponse::build(status);
        for (name, value) in resp.headers() {
            if is_hop_by_hop(name.as_str()) { continue; }
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                out.append_header((n, v));
            }
        }
        match resp.bytes().await {
            Ok(bytes) => out.body(bytes),
            Err(e) => {
                tracing::error!(error = %e, %target, "failed reading auth service response");
                HttpResponse::BadGateway().json(serde_json::json!({ "error": "auth_service_unavailable" }))
            }
        }
    }
}
