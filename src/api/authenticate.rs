// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    auth::AuthError,
    models::{AuthSummary, AuthenticateRequest},
    state::AppState,
};

/// Exchange an ID token for the caller's local identity.
///
/// Creates the identity on the first successful call for a subject.
#[utoipa::path(
    post,
    path = "/v1/authenticate",
    tag = "Auth",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Token verified, identity resolved", body = AuthSummary),
        (status = 400, description = "Malformed token or unsupported identity provider"),
        (status = 401, description = "Signature, expiry or claim check failed, or unknown signing key"),
        (status = 500, description = "Identity store failure"),
        (status = 502, description = "Key set endpoint unavailable"),
        (status = 503, description = "Key set fetch limit reached")
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<AuthSummary>, AuthError> {
    let Json(request) = body.map_err(|e| AuthError::MalformedCredential(e.body_text()))?;
    let summary = state.authenticator.authenticate(&request.id_token).await?;
    Ok(Json(summary))
}
