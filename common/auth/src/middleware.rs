//! Route layers wiring the two gates into an axum router.
//!
//! ```ignore
//! Router::new()
//!     .route("/admin/members", get(list_members))
//!     .route_layer(from_fn_with_state(RoleGate::new([ROLE_ADMIN])?, authorize_request))
//!     .route_layer(from_fn_with_state(codec, authenticate_request))
//! ```
//!
//! Layers added later run first, so `authenticate_request` must be added after
//! `authorize_request`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::codec::TokenCodec;
use crate::error::AuthError;
use crate::extractors::AuthContext;
use crate::guards::RoleGate;

/// Authentication gate as a layer: stores the [`AuthContext`] in the request
/// extensions for everything downstream.
pub async fn authenticate_request(
    State(codec): State<Arc<TokenCodec>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = AuthContext::from_headers(request.headers(), &codec)?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Authorization gate as a layer. Reads the context stored by
/// [`authenticate_request`]; without one the request fails with
/// `PreconditionFailed`.
pub async fn authorize_request(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    gate.check(
        request
            .extensions()
            .get::<AuthContext>()
            .map(AuthContext::claims),
    )?;
    Ok(next.run(request).await)
}
