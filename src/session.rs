// session.rs
// Bearer-token middleware resolving the owner identity for every core call.
// Token issuance belongs to the external auth service; this layer only
// validates the credential and injects the owner id.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::future::BoxFuture;
use serde_json::json;

use crate::state::{AppState, find_owner_by_session};

/// The authenticated shopkeeper a request acts on behalf of.
#[derive(Clone)]
pub struct Owner(pub ObjectId);

pub async fn require_owner(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = bearer_token(&request).ok_or_else(unauthorized_response)?;

    match find_owner_by_session(&state, &token).await {
        Ok(Some(owner)) => {
            request.extensions_mut().insert(Owner(owner));
            Ok(next.run(request).await)
        }
        Ok(None) => Err(unauthorized_response()),
        Err(err) => {
            tracing::error!(error = %err, "session lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "session lookup failed" })),
            )
                .into_response())
        }
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let owner = parts
            .extensions
            .get::<Owner>()
            .cloned()
            .ok_or_else(unauthorized_response);

        Box::pin(async move { owner })
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Not authorized" })),
    )
        .into_response()
}
