// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("management credentials are not configured")]
    ConfigurationMissing,
    #[error("role assumption denied for account {account_id}: {message}")]
    RoleAssumptionDenied { account_id: String, message: String },
    #[error("role assumption failed for account {account_id}: {message}")]
    RoleAssumptionFailed { account_id: String, message: String },
    #[error("identity check failed: {0}")]
    IdentityCheckFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl BrokerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
            Self::RoleAssumptionDenied { .. } => StatusCode::FORBIDDEN,
            Self::RoleAssumptionFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::IdentityCheckFailed(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({"code": status.as_u16(), "message": self.to_string()}));

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for BrokerError {
    fn from(source: validator::ValidationErrors) -> Self {
        tracing::debug!("{:?}", source);
        BrokerError::InvalidRequest(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BrokerError::ConfigurationMissing.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            BrokerError::RoleAssumptionDenied {
                account_id: "111111111111".to_string(),
                message: "AccessDenied".to_string(),
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            BrokerError::AccountNotFound("222222222222".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_display_includes_account() {
        let err = BrokerError::RoleAssumptionFailed {
            account_id: "111111111111".to_string(),
            message: "dispatch failure".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "role assumption failed for account 111111111111: dispatch failure"
        );
    }
}
