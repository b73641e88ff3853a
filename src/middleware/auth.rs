//! Identity context extraction.
//!
//! Authentication lives in the external identity service; this middleware
//! only decodes the bearer token it issued and threads the resulting
//! [`Actor`] through request extensions. A request without a token is a
//! legitimate anonymous read — handlers that mutate decide for themselves
//! that an actor is required.

use axum::{
    body::Body,
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::thread::permissions::{Actor, ActorRole};
use crate::utils::api_response::ApiResponse;

/// Claims carried by the identity service's tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - user ID as string
    pub sub: String,
    /// The role assigned to the user
    pub role: String,
    /// Expiration timestamp (UNIX time)
    pub exp: usize,
}

/// The actor on whose behalf this request runs, if any.
#[derive(Debug, Clone)]
pub struct AuthContext(Option<Actor>);

impl AuthContext {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

/// Decodes an optional `Authorization: Bearer` header into an
/// [`AuthContext`]. Absent header ⇒ anonymous; present but malformed or
/// expired ⇒ 401. With `AUTH_DISABLED=true` a tokenless local request acts
/// as a development admin.
pub async fn auth_context_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let context = match req.headers().get(AUTHORIZATION) {
        None => {
            if Config::get().auth_disabled {
                AuthContext(Some(Actor { id: Uuid::nil(), role: ActorRole::Admin }))
            } else {
                AuthContext::anonymous()
            }
        }
        Some(header) => {
            let token_str = header.to_str().map_err(|_| {
                ApiResponse::<()>::error(
                    StatusCode::BAD_REQUEST,
                    "Invalid Authorization header format",
                    None,
                )
                .into_response()
            })?;
            let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
                ApiResponse::<()>::error(
                    StatusCode::BAD_REQUEST,
                    "Invalid token format (missing 'Bearer ' prefix)",
                    None,
                )
                .into_response()
            })?;
            let token_data = decode::<Claims>(
                token,
                &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
                &Validation::default(),
            )
            .map_err(|e| {
                tracing::warn!("token rejected: {e}");
                ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Invalid token", None)
                    .into_response()
            })?;
            AuthContext(Some(token_data.claims.try_into().map_err(|_| {
                ApiResponse::<()>::error(
                    StatusCode::UNAUTHORIZED,
                    "Invalid user ID in token",
                    None,
                )
                .into_response()
            })?))
        }
    };

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

impl TryFrom<Claims> for Actor {
    type Error = uuid::Error;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Actor { id: claims.sub.parse()?, role: ActorRole::from_claim(&claims.role) })
    }
}
