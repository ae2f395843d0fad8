// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::time::{Duration, SystemTime};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    ACCOUNT_ID_LENGTH, ASSUMED_ROLE_PROVIDER_NAME, DEFAULT_ACCOUNT_REGION_COUNT,
    DEFAULT_ENVIRONMENT, DEFAULT_REGION, DEFAULT_REGIONS, DEFAULT_SESSION_DURATION,
    MAX_SESSION_DURATION_SECS, MAX_SESSION_NAME_LENGTH, MIN_SESSION_DURATION_SECS,
    MIN_SESSION_NAME_LENGTH,
};

/// Long-lived credentials of the identity allowed to assume roles in member accounts.
#[derive(Clone, ZeroizeOnDrop)]
pub struct ManagementCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl ManagementCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        }
    }
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for ManagementCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagementCredentials")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Offboarding,
}

/// A member account the dashboard operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AccountDescriptor {
    #[validate(custom(function = "validate_account_id"))]
    pub account_id: String,

    #[serde(default)]
    pub account_name: String,

    #[validate(custom(function = "validate_role_arn"))]
    pub role_arn: String,

    #[serde(default = "default_account_regions")]
    #[validate(custom(function = "validate_regions"))]
    pub regions: Vec<String>,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,

    #[serde(default)]
    pub status: AccountStatus,
}

impl AccountDescriptor {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

fn default_account_regions() -> Vec<String> {
    DEFAULT_REGIONS
        .iter()
        .take(DEFAULT_ACCOUNT_REGION_COUNT)
        .map(|region| region.to_string())
        .collect()
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

/// Temporary credentials issued by the identity provider for an assumed role.
#[derive(Clone, ZeroizeOnDrop)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[zeroize(skip)]
    pub expiration: SystemTime,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl From<&TemporaryCredentials> for Credentials {
    fn from(credential: &TemporaryCredentials) -> Self {
        Credentials::new(
            credential.access_key_id.clone(),
            credential.secret_access_key.clone(),
            Some(credential.session_token.clone()),
            Some(credential.expiration),
            ASSUMED_ROLE_PROVIDER_NAME,
        )
    }
}

/// Builds SDK configuration for any region from one account's assumed-role credentials.
///
/// Service modules construct their clients from it, e.g.
/// `aws_sdk_ec2::Client::new(&session.client_factory().config_for("eu-west-1"))`.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    credentials: Credentials,
    default_region: String,
}

impl ClientFactory {
    pub fn new(credentials: &TemporaryCredentials, default_region: impl Into<String>) -> Self {
        Self {
            credentials: credentials.into(),
            default_region: default_region.into(),
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn config(&self) -> SdkConfig {
        self.config_for(&self.default_region)
    }

    pub fn config_for(&self, region: &str) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(SharedCredentialsProvider::new(self.credentials.clone()))
            .build()
    }
}

/// A role session in a member account, as held by the session cache.
#[derive(Debug)]
pub struct AssumedSession {
    pub account_id: String,
    pub account_name: String,
    pub role_arn: String,
    pub session_name: String,
    pub credentials: TemporaryCredentials,
    client_factory: ClientFactory,
}

impl AssumedSession {
    pub fn new(
        request: &AssumeRoleRequest,
        session_name: String,
        credentials: TemporaryCredentials,
        default_region: &str,
    ) -> Self {
        let client_factory = ClientFactory::new(&credentials, default_region);
        Self {
            account_id: request.account_id.clone(),
            account_name: request.account_name.clone(),
            role_arn: request.role_arn.clone(),
            session_name,
            credentials,
            client_factory,
        }
    }

    pub fn expiration(&self) -> SystemTime {
        self.credentials.expiration
    }

    pub fn client_factory(&self) -> &ClientFactory {
        &self.client_factory
    }

    /// True while the session expires strictly later than `now + buffer`.
    pub fn is_fresh(&self, now: SystemTime, buffer: Duration) -> bool {
        now.checked_add(buffer)
            .map(|threshold| threshold < self.expiration())
            .unwrap_or(false)
    }
}

/// Parameters of a broker `assume` call.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AssumeRoleRequest {
    pub account_id: String,

    pub account_name: String,

    #[validate(custom(function = "validate_role_arn"))]
    pub role_arn: String,

    #[validate(custom(function = "validate_session_name"))]
    pub session_name: Option<String>,

    #[validate(custom(function = "validate_session_duration"))]
    pub duration: Duration,
}

impl AssumeRoleRequest {
    pub fn new(
        account_id: impl Into<String>,
        account_name: impl Into<String>,
        role_arn: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
            role_arn: role_arn.into(),
            session_name: None,
            duration: DEFAULT_SESSION_DURATION,
        }
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

impl From<&AccountDescriptor> for AssumeRoleRequest {
    fn from(account: &AccountDescriptor) -> Self {
        AssumeRoleRequest::new(&account.account_id, &account.account_name, &account.role_arn)
    }
}

/// Result of a "who am I" call made with an assumed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub account: String,
    #[serde(rename = "arn")]
    pub principal_arn: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTest {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            ok: false,
            error: Some(if message.is_empty() {
                "connection test failed".to_string()
            } else {
                message
            }),
        }
    }
}

fn is_account_id(value: &str) -> bool {
    value.len() == ACCOUNT_ID_LENGTH && value.chars().all(|c| c.is_ascii_digit())
}

fn validate_account_id(account_id: &str) -> Result<(), ValidationError> {
    if !is_account_id(account_id) {
        return Err(ValidationError::new("invalid_account_id"));
    }
    Ok(())
}

/// Validates an IAM role ARN
/// Pattern: `arn:<partition>:iam::<12 digits>:role/<optional path/>name`
pub fn validate_role_arn(role_arn: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = role_arn.splitn(6, ':').collect();
    let [prefix, partition, service, region, account, resource] = parts.as_slice() else {
        return Err(ValidationError::new("invalid_role_arn"));
    };

    if *prefix != "arn" || !partition.starts_with("aws") || *service != "iam" || !region.is_empty()
    {
        return Err(ValidationError::new("invalid_role_arn"));
    }

    if !is_account_id(account) {
        return Err(ValidationError::new("invalid_role_arn"));
    }

    // Resource: "role/" followed by an optional path and a non-empty role name
    let Some(path) = resource.strip_prefix("role/") else {
        return Err(ValidationError::new("invalid_role_arn"));
    };
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty()
        || !path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-/".contains(c))
    {
        return Err(ValidationError::new("invalid_role_arn"));
    }

    Ok(())
}

/// Account id embedded in a role ARN, if the ARN has one.
pub fn role_arn_account(role_arn: &str) -> Option<&str> {
    role_arn.split(':').nth(4)
}

fn validate_session_name(session_name: &str) -> Result<(), ValidationError> {
    let length = session_name.len();
    if !(MIN_SESSION_NAME_LENGTH..=MAX_SESSION_NAME_LENGTH).contains(&length) {
        return Err(ValidationError::new("invalid_session_name_length"));
    }
    if !session_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c))
    {
        return Err(ValidationError::new("invalid_session_name"));
    }
    Ok(())
}

fn validate_session_duration(duration: &Duration) -> Result<(), ValidationError> {
    if !(MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS).contains(&duration.as_secs())
        || duration.subsec_nanos() != 0
    {
        return Err(ValidationError::new("invalid_session_duration"));
    }
    Ok(())
}

/// Validates AWS region format (e.g., "us-east-1", "eu-west-2")
/// Pattern: two lowercase letters, hyphen, lowercase letters, hyphen, digits
pub fn validate_aws_region(region: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    let first = parts[0];
    if first.len() != 2 || !first.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::new("invalid_aws_region"));
        }
    }

    let last = parts[parts.len() - 1];
    if last.is_empty() || !last.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    Ok(())
}

fn validate_regions(regions: &[String]) -> Result<(), ValidationError> {
    regions
        .iter()
        .try_for_each(|region| validate_aws_region(region))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ROLE_ARN: &str = "arn:aws:iam::111111111111:role/CloudIDP-Access";

    #[test]
    fn test_validate_role_arn() {
        assert!(validate_role_arn(ROLE_ARN).is_ok());
        assert!(validate_role_arn("arn:aws:iam::111111111111:role/service-role/CloudIDP").is_ok());
        assert!(validate_role_arn("arn:aws-us-gov:iam::111111111111:role/Ops").is_ok());

        assert!(validate_role_arn("").is_err());
        assert!(validate_role_arn("arn:aws:iam::111111111111:user/alice").is_err());
        assert!(validate_role_arn("arn:aws:iam::11111111111:role/Short").is_err());
        assert!(validate_role_arn("arn:aws:s3::111111111111:role/Wrong").is_err());
        assert!(validate_role_arn("arn:aws:iam:us-east-1:111111111111:role/Regional").is_err());
        assert!(validate_role_arn("arn:aws:iam::111111111111:role/").is_err());
        assert!(validate_role_arn("arn:aws:iam::111111111111:role/path/").is_err());
        assert!(validate_role_arn("arn:aws:iam::111111111111:role/bad name").is_err());
    }

    #[test]
    fn test_role_arn_account() {
        assert_eq!(role_arn_account(ROLE_ARN), Some("111111111111"));
        assert_eq!(role_arn_account("not-an-arn"), None);
    }

    #[test]
    fn test_validate_aws_region() {
        assert!(validate_aws_region("us-east-1").is_ok());
        assert!(validate_aws_region("ap-southeast-2").is_ok());
        assert!(validate_aws_region("us-gov-west-1").is_ok());
        assert!(validate_aws_region("invalid-region").is_err());
        assert!(validate_aws_region("US-EAST-1").is_err());
        assert!(validate_aws_region("").is_err());
    }

    #[test]
    fn test_assume_role_request_defaults() {
        let request = AssumeRoleRequest::new("111111111111", "prod", ROLE_ARN);
        assert_eq!(request.duration, DEFAULT_SESSION_DURATION);
        assert!(request.session_name.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_assume_role_request_duration_bounds() {
        let base = AssumeRoleRequest::new("111111111111", "prod", ROLE_ARN);
        assert!(base.clone().with_duration(Duration::from_secs(900)).validate().is_ok());
        assert!(base.clone().with_duration(Duration::from_secs(43_200)).validate().is_ok());
        assert!(base.clone().with_duration(Duration::from_secs(899)).validate().is_err());
        assert!(base.with_duration(Duration::from_secs(43_201)).validate().is_err());
    }

    #[test]
    fn test_assume_role_request_session_name() {
        let base = AssumeRoleRequest::new("111111111111", "prod", ROLE_ARN);
        assert!(base.clone().with_session_name("onboarding@ops").validate().is_ok());
        assert!(base.clone().with_session_name("x").validate().is_err());
        assert!(base.clone().with_session_name("has space").validate().is_err());
        assert!(base.with_session_name("a".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_account_descriptor_defaults() {
        let account: AccountDescriptor = serde_json::from_value(serde_json::json!({
            "account_id": "111111111111",
            "role_arn": ROLE_ARN
        }))
        .unwrap();

        assert_eq!(account.regions, vec!["us-east-1", "us-east-2"]);
        assert_eq!(account.environment, "production");
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.is_active());
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_account_descriptor_status() {
        let account: AccountDescriptor = serde_json::from_value(serde_json::json!({
            "account_id": "111111111111",
            "role_arn": ROLE_ARN,
            "status": "offboarding"
        }))
        .unwrap();
        assert_eq!(account.status, AccountStatus::Offboarding);
        assert!(!account.is_active());
    }

    #[test]
    fn test_account_descriptor_rejects_bad_region() {
        let account: AccountDescriptor = serde_json::from_value(serde_json::json!({
            "account_id": "111111111111",
            "role_arn": ROLE_ARN,
            "regions": ["us-east-1", "nowhere"]
        }))
        .unwrap();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let credentials = TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMIK7MDENG".to_string(),
            session_token: "FwoGZXIvYXdzEXAMPLE".to_string(),
            expiration: SystemTime::now(),
        };
        let output = format!("{:?}", credentials);
        assert!(!output.contains("ASIAEXAMPLE"));
        assert!(!output.contains("wJalrXUtnFEMIK7MDENG"));
        assert!(!output.contains("FwoGZXIvYXdzEXAMPLE"));
        assert!(output.contains("[REDACTED]"));

        let management =
            ManagementCredentials::new("AKIAEXAMPLE", "wJalrXUtnFEMIK7MDENG", None);
        let output = format!("{:?}", management);
        assert!(!output.contains("AKIAEXAMPLE"));
        assert!(!output.contains("wJalrXUtnFEMIK7MDENG"));
        assert!(output.contains("[REDACTED]"));
        assert!(output.contains(DEFAULT_REGION));
    }

    #[test]
    fn test_session_freshness() {
        let now = SystemTime::now();
        let request = AssumeRoleRequest::new("111111111111", "prod", ROLE_ARN);
        let session = AssumedSession::new(
            &request,
            "CloudIDP-test".to_string(),
            TemporaryCredentials {
                access_key_id: "ASIA".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: "token".to_string(),
                expiration: now + Duration::from_secs(600),
            },
            DEFAULT_REGION,
        );

        assert!(session.is_fresh(now, Duration::from_secs(300)));
        assert!(!session.is_fresh(now, Duration::from_secs(600)));
        assert!(!session.is_fresh(now + Duration::from_secs(360), Duration::from_secs(300)));
    }

    #[test]
    fn test_client_factory_regions() {
        let credentials = TemporaryCredentials {
            access_key_id: "ASIA".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: SystemTime::now() + Duration::from_secs(3600),
        };
        let factory = ClientFactory::new(&credentials, "us-east-1");

        assert_eq!(factory.config().region().unwrap().as_ref(), "us-east-1");
        assert_eq!(
            factory.config_for("eu-west-1").region().unwrap().as_ref(),
            "eu-west-1"
        );
        assert!(factory.config().credentials_provider().is_some());
    }

    #[test]
    fn test_connection_test_failure_message_non_empty() {
        assert_eq!(ConnectionTest::success().error, None);
        assert_eq!(
            ConnectionTest::failure("").error.as_deref(),
            Some("connection test failed")
        );
    }
}
