//! # Authentication
//!
//! Bearer token middleware producing a [`Session`] for the engine.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{subject}:{secret}
//! ```
//!
//! `role` is `sender`, `receiver` or `agency`. `subject` is the sender's
//! account id, the receiver's email address, or the officer id. The
//! scheduler's `system` role is never issued to HTTP callers.
//!
//! ## CallerIdentity
//!
//! Every request that passes the middleware carries a [`CallerIdentity`] in
//! its extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clearance_core::{Role, Session};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Session handed to every engine call.
    pub session: Session,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled and no token is sent.
    pub fn local_operator() -> Self {
        Self {
            session: Session::agency("local-operator"),
        }
    }
}

/// Extracts the identity the auth middleware placed in the extensions.
/// Returns 401 if none is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// `Debug` redacts the token.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<Zeroizing<String>>,
}

impl AuthConfig {
    /// Require `token` as the shared secret.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(Zeroizing::new(token.into())),
        }
    }

    /// Accept every request.
    pub fn disabled() -> Self {
        Self { token: None }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of secrets. A length mismatch still performs
/// a comparison.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn parse_identity(role: &str, subject: &str) -> Result<CallerIdentity, String> {
    let role: Role = role.parse().map_err(|_| format!("unknown role: {role}"))?;
    if role == Role::System {
        return Err("role 'system' cannot authenticate over HTTP".into());
    }
    let subject = subject.trim();
    if subject.is_empty() {
        return Err("token subject must not be empty".into());
    }
    Ok(CallerIdentity {
        session: Session {
            role,
            subject: subject.to_string(),
        },
    })
}

/// Parse a bearer token of the form `{role}:{subject}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    match parts.as_slice() {
        [role, subject, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            parse_identity(role, subject)
        }
        _ => Err("invalid token format; expected {role}:{subject}:{secret}".into()),
    }
}

/// Identity claimed by a token when no secret is configured. The secret
/// segment is optional and ignored.
fn parse_unverified(provided: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    match parts.as_slice() {
        [role, subject] | [role, subject, _] => parse_identity(role, subject),
        _ => Err("invalid token format; expected {role}:{subject}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and insert the [`CallerIdentity`].
///
/// With no configured token, a claimed `{role}:{subject}` is trusted and a
/// request without one runs as the local agency operator.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_else(AuthConfig::disabled);

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let identity = match (&config.token, provided.as_deref()) {
        (Some(expected), Some(value)) => match value.strip_prefix("Bearer ") {
            Some(token) => parse_bearer_token(token, expected),
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return unauthorized_response("authorization header must use Bearer scheme");
            }
        },
        (Some(_), None) => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
        (None, Some(value)) => match value.strip_prefix("Bearer ") {
            Some(token) => parse_unverified(token),
            None => Ok(CallerIdentity::local_operator()),
        },
        (None, None) => Ok(CallerIdentity::local_operator()),
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
            unauthorized_response(&msg)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
