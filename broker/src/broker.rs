// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Multi-account credential broker.
//!
//! [`CredentialBroker`] assumes a role in a member account, caches the
//! resulting [`AssumedSession`] keyed by `(account_id, role_arn)` and hands it
//! out until it comes within [`SESSION_REFRESH_BUFFER`] of expiring.
//!
//! # Cache entry lifecycle
//!
//! ```text
//! Absent -> Active -> Stale (inside the buffer or expired) -> replaced by the next assume
//!              \
//!               +-> Cleared (clear_cache)
//! ```
//!
//! Lookups take the read lock on the session map. A miss takes the assume lock
//! of its `(account_id, role_arn)` key, re-checks the map and calls the provider
//! while holding that lock only, so concurrent callers never race to assume the
//! same role and a slow assume never delays other accounts.
//!
//! [`SESSION_REFRESH_BUFFER`]: crate::constants::SESSION_REFRESH_BUFFER

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use validator::Validate;

use crate::constants::{SESSION_NAME_PREFIX, SESSION_NAME_TIMESTAMP_FORMAT, SESSION_REFRESH_BUFFER};
use crate::errors::BrokerError;
use crate::models::{
    AccountDescriptor, AssumeRoleRequest, AssumedSession, CallerIdentity, ConnectionTest,
    role_arn_account,
};
use crate::provider::{IdentityProvider, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    account_id: String,
    role_arn: String,
}

impl CacheKey {
    fn new(account_id: &str, role_arn: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            role_arn: role_arn.to_string(),
        }
    }
}

pub struct CredentialBroker {
    provider: Option<Arc<dyn IdentityProvider>>,
    sessions: RwLock<HashMap<CacheKey, Arc<AssumedSession>>>,
    /// One lock per key, held across the provider call.
    assume_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl CredentialBroker {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider: Some(provider),
            sessions: RwLock::new(HashMap::new()),
            assume_locks: Mutex::new(HashMap::new()),
        }
    }

    /// A broker without management credentials. Every operation fails with
    /// [`BrokerError::ConfigurationMissing`].
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            sessions: RwLock::new(HashMap::new()),
            assume_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn IdentityProvider>, BrokerError> {
        self.provider.as_ref().ok_or(BrokerError::ConfigurationMissing)
    }

    /// Returns a cached session for the account and role, or assumes the role.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::ConfigurationMissing`] - no management credentials
    /// - [`BrokerError::InvalidRequest`] - malformed role ARN, session name or duration
    /// - [`BrokerError::RoleAssumptionDenied`] - the provider refused the assume-role call
    /// - [`BrokerError::RoleAssumptionFailed`] - any other provider or transport failure
    #[tracing::instrument(skip(self, request), fields(account_id = %request.account_id))]
    pub async fn assume(
        &self,
        request: AssumeRoleRequest,
    ) -> Result<Arc<AssumedSession>, BrokerError> {
        let provider = self.provider()?;
        request.validate()?;

        if role_arn_account(&request.role_arn) != Some(request.account_id.as_str()) {
            tracing::warn!(
                "[broker] role {} is not in account {}",
                request.role_arn,
                request.account_id
            );
        }

        let key = CacheKey::new(&request.account_id, &request.role_arn);

        // Fast path: a fresh cached session
        if let Some(session) = self.fresh_session(&key).await {
            tracing::trace!("[broker] cache hit for {}", request.account_id);
            return Ok(session);
        }

        let assume_lock = self.assume_lock(&key).await;
        let _guard = assume_lock.lock().await;

        // Double-check after acquiring the key's lock (another task may have assumed the role)
        if let Some(session) = self.fresh_session(&key).await {
            return Ok(session);
        }

        let session_name = request
            .session_name
            .clone()
            .unwrap_or_else(generate_session_name);

        tracing::debug!(
            "[broker] assuming {} as {} for {:?}",
            request.role_arn,
            session_name,
            request.duration
        );

        let credentials = provider
            .assume_role(&request.role_arn, &session_name, request.duration)
            .await
            .map_err(|err| {
                tracing::error!(
                    "[broker] failed to assume role in {} ({}): {}",
                    request.account_name,
                    request.account_id,
                    err
                );
                assumption_error(&request.account_id, err)
            })?;

        let session = Arc::new(AssumedSession::new(
            &request,
            session_name,
            credentials,
            provider.region(),
        ));

        if !session.is_fresh(SystemTime::now(), SESSION_REFRESH_BUFFER) {
            tracing::error!(
                "[broker] credentials for {} expire at {:?}, inside the refresh buffer",
                request.account_id,
                session.expiration()
            );
            return Err(BrokerError::RoleAssumptionFailed {
                account_id: request.account_id,
                message: "issued credentials expire within the refresh buffer".to_string(),
            });
        }

        self.sessions.write().await.insert(key, session.clone());

        tracing::info!(
            "[broker] assumed role in {} ({}), expires_at: {:?}",
            session.account_name,
            session.account_id,
            session.expiration()
        );

        Ok(session)
    }

    async fn fresh_session(&self, key: &CacheKey) -> Option<Arc<AssumedSession>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(key)
            .filter(|session| session.is_fresh(SystemTime::now(), SESSION_REFRESH_BUFFER))
            .cloned()
    }

    async fn assume_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.assume_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    /// Assumes the configured role of a registered account with default session settings.
    pub async fn assume_account(
        &self,
        account: &AccountDescriptor,
    ) -> Result<Arc<AssumedSession>, BrokerError> {
        self.assume(AssumeRoleRequest::from(account)).await
    }

    /// Confirms that an assumed session is usable by asking the provider who it belongs to.
    #[tracing::instrument(skip(self, session), fields(account_id = %session.account_id))]
    pub async fn verify_identity(
        &self,
        session: &AssumedSession,
    ) -> Result<CallerIdentity, BrokerError> {
        let provider = self.provider()?;

        let identity = provider
            .caller_identity(&session.credentials)
            .await
            .map_err(|err| {
                tracing::error!("[broker] error getting account identity: {}", err);
                BrokerError::IdentityCheckFailed(err.to_string())
            })?;

        tracing::debug!("[broker] verified identity {}", identity.principal_arn);

        Ok(identity)
    }

    /// Assumes the role and verifies the resulting identity. Never returns an error;
    /// failures are reported in the returned [`ConnectionTest`].
    #[tracing::instrument(skip(self, account_name))]
    pub async fn test_connection(
        &self,
        account_id: &str,
        account_name: &str,
        role_arn: &str,
    ) -> ConnectionTest {
        let request = AssumeRoleRequest::new(account_id, account_name, role_arn);

        let result = match self.assume(request).await {
            Ok(session) => self.verify_identity(&session).await.map(|_| ()),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => ConnectionTest::success(),
            Err(err) => {
                tracing::warn!("[broker] connection test for {} failed: {}", account_id, err);
                ConnectionTest::failure(err.to_string())
            }
        }
    }

    pub async fn test_account(&self, account: &AccountDescriptor) -> ConnectionTest {
        self.test_connection(&account.account_id, &account.account_name, &account.role_arn)
            .await
    }

    /// Drops every cached session and returns how many were dropped.
    pub async fn clear_cache(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let cleared = sessions.len();
        sessions.clear();

        tracing::info!("[broker] cleared {} cached sessions", cleared);

        cleared
    }

    pub async fn cached_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// `CloudIDP-<UTC timestamp>-<random hex>`; the suffix keeps names assumed
/// within the same second distinct in CloudTrail.
fn generate_session_name() -> String {
    format!(
        "{}-{}-{:08x}",
        SESSION_NAME_PREFIX,
        Utc::now().format(SESSION_NAME_TIMESTAMP_FORMAT),
        fastrand::u32(..)
    )
}

fn assumption_error(account_id: &str, err: ProviderError) -> BrokerError {
    match err {
        ProviderError::Denied { code, message } => BrokerError::RoleAssumptionDenied {
            account_id: account_id.to_string(),
            message: format!("{code} - {message}"),
        },
        ProviderError::Failed { message } => BrokerError::RoleAssumptionFailed {
            account_id: account_id.to_string(),
            message,
        },
    }
}
