// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Identity provider boundary.
//!
//! The broker never talks to AWS directly. It goes through [`IdentityProvider`],
//! which has exactly two outbound operations: exchanging a role ARN for
//! temporary credentials, and asking "who am I" with those credentials.
//! [`StsProvider`] implements both against AWS STS.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_sts::Client;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;

use crate::constants::MANAGEMENT_PROVIDER_NAME;
use crate::models::{CallerIdentity, ClientFactory, ManagementCredentials, TemporaryCredentials};

/// STS error codes caused by permissions, trust policies or an invalid calling identity.
const DENIED_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
    "ExpiredToken",
    "ExpiredTokenException",
    "RegionDisabledException",
    "MalformedPolicyDocument",
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{code}: {message}")]
    Denied { code: String, message: String },
    #[error("{message}")]
    Failed { message: String },
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a role ARN for temporary credentials.
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        duration: Duration,
    ) -> Result<TemporaryCredentials, ProviderError>;

    /// Identifies the principal behind a set of temporary credentials.
    async fn caller_identity(
        &self,
        credentials: &TemporaryCredentials,
    ) -> Result<CallerIdentity, ProviderError>;

    /// Region new sessions' client factories default to.
    fn region(&self) -> &str;
}

/// AWS STS backed provider authenticated with the management account's static keys.
pub struct StsProvider {
    client: Client,
    region: String,
}

impl StsProvider {
    pub async fn new(credentials: &ManagementCredentials) -> Self {
        let management = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            MANAGEMENT_PROVIDER_NAME,
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(management)
            .load()
            .await;

        tracing::debug!("[broker] STS client ready in {}", credentials.region);

        Self {
            client: Client::new(&config),
            region: credentials.region.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StsProvider {
    #[tracing::instrument(skip(self))]
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        duration: Duration,
    ) -> Result<TemporaryCredentials, ProviderError> {
        let duration_seconds = i32::try_from(duration.as_secs())
            .map_err(|_| ProviderError::failed(format!("duration out of range: {duration:?}")))?;

        let response = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let credentials = response
            .credentials()
            .ok_or_else(|| ProviderError::failed("AWS STS returned no credentials"))?;

        let expiration = SystemTime::try_from(*credentials.expiration())
            .map_err(|err| ProviderError::failed(format!("invalid expiration: {err}")))?;

        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration,
        })
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn caller_identity(
        &self,
        credentials: &TemporaryCredentials,
    ) -> Result<CallerIdentity, ProviderError> {
        let config = ClientFactory::new(credentials, &self.region).config();
        let client = Client::new(&config);

        let response = client
            .get_caller_identity()
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let field = |value: Option<&str>, name: &str| {
            value
                .map(str::to_string)
                .ok_or_else(|| ProviderError::failed(format!("GetCallerIdentity missing {name}")))
        };

        Ok(CallerIdentity {
            account: field(response.account(), "Account")?,
            principal_arn: field(response.arn(), "Arn")?,
            user_id: field(response.user_id(), "UserId")?,
        })
    }

    fn region(&self) -> &str {
        &self.region
    }
}

pub fn is_denied_error_code(code: &str) -> bool {
    DENIED_ERROR_CODES.contains(&code)
}

fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    tracing::debug!("[broker] STS error code {:?}: {}", code, message);

    match code {
        Some(code) if is_denied_error_code(&code) => ProviderError::Denied { code, message },
        Some(code) => ProviderError::Failed {
            message: format!("{code}: {message}"),
        },
        None => ProviderError::Failed { message },
    }
}
