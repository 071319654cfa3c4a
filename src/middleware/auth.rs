use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::Unauthorized("Invalid token subject".into()))
    }

    /// Fails with `Forbidden` unless the token carries one of `allowed`.
    pub fn require_role(&self, allowed: &[&str]) -> Result<()> {
        let role = self.role.as_deref().unwrap_or_default();
        if allowed.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "You do not have permission to perform this action".into(),
            ))
        }
    }
}

/// Signing material shared by the token issuer and the bearer middleware.
#[derive(Clone)]
pub struct AuthKeys {
    secret: Arc<str>,
    ttl_hours: i64,
}

impl AuthKeys {
    pub fn new(secret: impl Into<Arc<str>>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_hours,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn ttl_hours(&self) -> i64 {
        self.ttl_hours
    }

    pub fn decode(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .ok()
        .map(|data| data.claims)
    }
}

fn reject(code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": "error", "message": code})),
    )
        .into_response()
}

pub async fn require_bearer_auth(
    State(keys): State<AuthKeys>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return reject("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject("unsupported_scheme");
    };

    match keys.decode(token) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => reject("invalid_token"),
    }
}
