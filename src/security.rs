use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError, http::header};
use futures_util::future::{LocalBoxFuture, ready, Ready};
use std::rc::Rc;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::rate_limit::{RateLimitConfig, SlidingWindowLimiter};

/// Hardening applied to every non-auth route: response headers, plus an
/// optional per-client request limit that answers 429 without reaching the router.
#[derive(Clone, Default)]
pub struct Security {
    pub enable_hsts: bool,
    limiter: Option<SlidingWindowLimiter>,
    trust_proxy: bool,
}

impl Security {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enable_hsts: config.enable_hsts,
            limiter: SlidingWindowLimiter::from_config(&config.rate_limit),
            trust_proxy: config.rate_limit.trust_proxy,
        }
    }

    pub fn with_hsts(mut self, enable: bool) -> Self {
        self.enable_hsts = enable;
        self
    }

    pub fn with_rate_limit(mut self, cfg: &RateLimitConfig) -> Self {
        self.limiter = SlidingWindowLimiter::from_config(cfg);
        self.trust_proxy = cfg.trust_proxy;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for Security
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityMiddleware {
            service: Rc::new(service),
            cfg: self.clone(),
        }))
    }
}

pub struct SecurityMiddleware<S> {
    service: Rc<S>,
    cfg: Security,
}

impl<S, B> Service<ServiceRequest> for SecurityMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let cfg = self.cfg.clone();
        Box::pin(async move {
            let mut res = match &cfg.limiter {
                Some(limiter) => {
                    let client = client_key(&req, cfg.trust_proxy);
                    if limiter.check(&client) {
                        svc.call(req).await?.map_into_left_body()
                    } else {
                        tracing::warn!(%client, "rate limit exceeded");
                        let resp = ApiError::TooManyRequests.error_response();
                        req.into_response(resp).map_into_right_body()
                    }
                }
                None => svc.call(req).await?.map_into_left_body(),
            };
            apply_headers(res.headers_mut(), cfg.enable_hsts);
            Ok(res)
        })
    }
}

/// Socket peer IP, or the forwarded client address when a trusted proxy sets it.
fn client_key(req: &ServiceRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut header::HeaderMap, hsts: bool) {
    let defaults = [
        (header::CONTENT_SECURITY_POLICY, "default-src 'self'; img-src 'self' data:; object-src 'none'; base-uri 'none'; frame-ancestors 'none'; form-action 'self'"),
        (header::REFERRER_POLICY, "no-referrer"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "0"),
    ];
    for (name, value) in defaults {
        if !headers.contains_key(&name) {
            headers.insert(name, header::HeaderValue::from_static(value));
        }
    }
    if hsts && !headers.contains_key(header::STRICT_TRANSPORT_SECURITY) {
        headers.insert(header::STRICT_TRANSPORT_SECURITY, header::HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"));
    }
}
