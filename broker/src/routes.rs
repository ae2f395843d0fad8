// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the broker API.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `/health` | [`health`] | Health check endpoint |
//! | GET | `/accounts` | [`list_accounts`] | List registered accounts |
//! | POST | `/accounts/{account_id}/test` | [`test_account`] | Assume the account role and verify it |
//! | GET | `/accounts/{account_id}/identity` | [`account_identity`] | Caller identity of the assumed role |
//! | GET | `/sessions` | [`session_count`] | Number of cached sessions |
//! | DELETE | `/sessions` | [`clear_sessions`] | Drop all cached sessions |
//!
//! Credentials never leave the process through these endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde_json::{Value, json};

use crate::application::AppState;
use crate::errors::BrokerError;
use crate::models::{AccountDescriptor, CallerIdentity, ConnectionTest};

/// Health check endpoint.
///
/// # Response
///
/// ```json
/// {"status": "ok"}
/// ```
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[tracing::instrument(skip(state))]
pub async fn list_accounts(State(state): State<Arc<AppState>>) -> Json<Vec<AccountDescriptor>> {
    Json(state.accounts.all().to_vec())
}

/// Runs a connection test against a registered account.
///
/// A failed test is still a `200` with `{"ok": false, "error": "..."}`; only an
/// unknown account is an error.
#[tracing::instrument(skip(state))]
pub async fn test_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<ConnectionTest>, BrokerError> {
    let account = state
        .accounts
        .get(&account_id)
        .ok_or_else(|| BrokerError::AccountNotFound(account_id.clone()))?;

    let result = state.broker.test_account(account).await;

    Ok(Json(result))
}

/// Assumes the account's role and returns the verified caller identity.
///
/// # Errors
///
/// - [`BrokerError::AccountNotFound`] - account is not registered
/// - [`BrokerError::ConfigurationMissing`] - broker has no management credentials
/// - [`BrokerError::RoleAssumptionDenied`] / [`BrokerError::RoleAssumptionFailed`]
/// - [`BrokerError::IdentityCheckFailed`]
#[tracing::instrument(skip(state))]
pub async fn account_identity(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<CallerIdentity>, BrokerError> {
    let account = state
        .accounts
        .get(&account_id)
        .ok_or_else(|| BrokerError::AccountNotFound(account_id.clone()))?;

    let session = state.broker.assume_account(account).await?;
    let identity = state.broker.verify_identity(&session).await?;

    Ok(Json(identity))
}

pub async fn session_count(State(state): State<Arc<AppState>>) -> Json<Value> {
    let count = state.broker.cached_session_count().await;
    Json(json!({"cached_sessions": count}))
}

#[tracing::instrument(skip(state))]
pub async fn clear_sessions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cleared = state.broker.clear_cache().await;
    Json(json!({"cleared": cleared}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    // Integration tests using TestServer are in tests/http_integration.rs

    #[tokio::test]
    async fn test_health_returns_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = BrokerError::AccountNotFound("999999999999".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "account not found: 999999999999");
    }
}
