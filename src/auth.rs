//! HTTP Basic authentication for the admin endpoints.
//!
//! Unauthenticated requests get a `401` carrying a `WWW-Authenticate`
//! challenge so browsers prompt for credentials.

use crate::config::AdminCredentials;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const ADMIN_REALM: &str = "Admin Area";

/// Constant-time comparison of two strings.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Decode `Basic <base64(user:pass)>` into its two halves.
fn parse_basic(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn credentials_match(expected: &AdminCredentials, user: &str, pass: &str) -> bool {
    // Both comparisons always run.
    let user_ok = secure_compare(user, &expected.username);
    let pass_ok = secure_compare(pass, &expected.password);
    user_ok & pass_ok
}

fn challenge() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Authentication required",
            "status": StatusCode::UNAUTHORIZED.as_u16()
        })),
    )
        .into_response();
    let value = format!("Basic realm=\"{}\"", ADMIN_REALM);
    if let Ok(value) = HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Middleware guarding admin routes.
pub async fn require_admin(
    State(admin): State<Arc<AdminCredentials>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic);

    match provided {
        Some((user, pass)) if credentials_match(&admin, &user, &pass) => next.run(request).await,
        Some((user, _)) => {
            tracing::warn!(
                "admin authentication failed for user `{}` on {}",
                user,
                request.uri().path()
            );
            challenge()
        }
        None => {
            tracing::debug!("missing admin credentials on {}", request.uri().path());
            challenge()
        }
    }
}
