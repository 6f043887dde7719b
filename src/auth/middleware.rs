use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{extract_bearer_token, AuthError, AuthService, UserRole, UserSession};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = auth_service.validate_session(token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn require_role(request: &Request, allowed: &[UserRole]) -> Result<(), AuthError> {
    let session = request
        .extensions()
        .get::<UserSession>()
        .ok_or(AuthError::InsufficientPermissions)?;

    if !allowed.contains(&session.role) {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(())
}

/// Admin-only middleware
pub async fn admin_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    require_role(&request, &[UserRole::Admin])?;
    Ok(next.run(request).await)
}

/// Trainer (or admin) middleware
pub async fn trainer_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    require_role(&request, &[UserRole::Trainer, UserRole::Admin])?;
    Ok(next.run(request).await)
}

/// Athlete (or admin) middleware
pub async fn athlete_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    require_role(&request, &[UserRole::Athlete, UserRole::Admin])?;
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserSession>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// CORS configuration for browser clients
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Security headers middleware
pub fn security_headers_layer() -> tower_http::set_header::SetResponseHeaderLayer<axum::http::HeaderValue> {
    tower_http::set_header::SetResponseHeaderLayer::overriding(
        axum::http::header::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    )
}

/// Sliding-window request limiter keyed by client address
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<LimiterState>>,
    max_requests: usize,
    window: Duration,
    trust_proxy_headers: bool,
}

#[derive(Debug)]
struct LimiterState {
    requests: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                requests: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            max_requests,
            window,
            trust_proxy_headers: false,
        }
    }

    /// Key clients on `x-forwarded-for` / `x-real-ip` instead of the peer address.
    /// Only safe behind a proxy that overwrites those headers.
    pub fn trusting_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub fn check_rate_limit(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        // At most one full sweep per window keeps idle keys from piling up
        if now.duration_since(state.last_sweep) >= self.window {
            Self::sweep(&mut state.requests, now, self.window);
            state.last_sweep = now;
        }

        let entry = state.requests.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    /// Drop every key with no request inside the current window
    pub fn cleanup_old_entries(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        Self::sweep(&mut state.requests, now, self.window);
        state.last_sweep = now;
    }

    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .requests
            .len()
    }

    fn sweep(requests: &mut HashMap<String, Vec<Instant>>, now: Instant, window: Duration) {
        requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < window);
            !times.is_empty()
        });
    }

    fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy_headers {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .or_else(|| request.headers().get("x-real-ip"))
                .and_then(|header| header.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(address) = forwarded {
                return address.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let client_ip = rate_limiter.client_key(&request);

    if !rate_limiter.check_rate_limit(&client_ip) {
        tracing::warn!(client_ip = %client_ip, "rate limit exceeded");
        return Err(AuthError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
