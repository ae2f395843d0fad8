// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Registry of member accounts loaded from a JSON file.
//!
//! ```json
//! {
//!   "accounts": {
//!     "production": {
//!       "account_id": "111111111111",
//!       "role_arn": "arn:aws:iam::111111111111:role/CloudIDP-Access",
//!       "regions": ["us-east-1", "eu-west-1"],
//!       "environment": "production",
//!       "status": "active"
//!     }
//!   }
//! }
//! ```
//!
//! Entries without an `account_name` are named after their key.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use validator::Validate;

use crate::models::AccountDescriptor;

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: BTreeMap<String, AccountDescriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: Vec<AccountDescriptor>,
}

impl AccountRegistry {
    pub fn new(accounts: Vec<AccountDescriptor>) -> Self {
        Self { accounts }
    }

    /// Loads the registry from `path`. A missing file yields an empty registry.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("[broker] accounts file {} not found", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read accounts file: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("failed to load accounts from {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let file: AccountsFile =
            serde_json::from_str(contents).context("failed to parse accounts document")?;

        let mut accounts = Vec::with_capacity(file.accounts.len());
        for (key, mut account) in file.accounts {
            if account.account_name.is_empty() {
                account.account_name = key.clone();
            }

            account
                .validate()
                .map_err(|err| anyhow!("invalid account {key}: {err}"))?;

            if accounts
                .iter()
                .any(|a: &AccountDescriptor| a.account_id == account.account_id)
            {
                return Err(anyhow!(
                    "duplicate account id {} in entry {key}",
                    account.account_id
                ));
            }

            accounts.push(account);
        }

        tracing::info!("[broker] loaded {} accounts", accounts.len());

        Ok(Self { accounts })
    }

    pub fn all(&self) -> &[AccountDescriptor] {
        &self.accounts
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountDescriptor> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &AccountDescriptor> {
        self.accounts.iter().filter(|a| a.is_active())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::AccountStatus;

    const DOCUMENT: &str = r#"{
        "accounts": {
            "production": {
                "account_id": "111111111111",
                "role_arn": "arn:aws:iam::111111111111:role/CloudIDP-Access",
                "regions": ["us-east-1", "eu-west-1"],
                "cost_center": "CC-100"
            },
            "sandbox": {
                "account_id": "222222222222",
                "account_name": "Sandbox Account",
                "role_arn": "arn:aws:iam::222222222222:role/CloudIDP-Access",
                "environment": "development",
                "status": "suspended"
            }
        }
    }"#;

    #[test]
    fn test_from_json() {
        let registry = AccountRegistry::from_json(DOCUMENT).unwrap();
        assert_eq!(registry.len(), 2);

        let production = registry.get("111111111111").unwrap();
        assert_eq!(production.account_name, "production");
        assert_eq!(production.regions, vec!["us-east-1", "eu-west-1"]);
        assert_eq!(production.cost_center.as_deref(), Some("CC-100"));

        let sandbox = registry.get("222222222222").unwrap();
        assert_eq!(sandbox.account_name, "Sandbox Account");
        assert_eq!(sandbox.environment, "development");
        assert_eq!(sandbox.status, AccountStatus::Suspended);
        assert_eq!(sandbox.regions, vec!["us-east-1", "us-east-2"]);
    }

    #[test]
    fn test_active_filters_status() {
        let registry = AccountRegistry::from_json(DOCUMENT).unwrap();
        let active: Vec<_> = registry.active().map(|a| a.account_id.as_str()).collect();
        assert_eq!(active, vec!["111111111111"]);
    }

    #[test]
    fn test_empty_document() {
        let registry = AccountRegistry::from_json("{}").unwrap();
        assert!(registry.is_empty());
        assert!(registry.get("111111111111").is_none());
    }

    #[test]
    fn test_invalid_role_arn_rejected() {
        let document = r#"{"accounts": {"bad": {
            "account_id": "111111111111",
            "role_arn": "arn:aws:iam::111111111111:user/alice"
        }}}"#;
        let err = AccountRegistry::from_json(document).unwrap_err();
        assert!(err.to_string().contains("invalid account bad"));
    }

    #[test]
    fn test_invalid_account_id_rejected() {
        let document = r#"{"accounts": {"short": {
            "account_id": "1234",
            "role_arn": "arn:aws:iam::111111111111:role/CloudIDP-Access"
        }}}"#;
        assert!(AccountRegistry::from_json(document).is_err());
    }

    #[test]
    fn test_duplicate_account_id_rejected() {
        let document = r#"{"accounts": {
            "a": {"account_id": "111111111111", "role_arn": "arn:aws:iam::111111111111:role/A"},
            "b": {"account_id": "111111111111", "role_arn": "arn:aws:iam::111111111111:role/B"}
        }}"#;
        let err = AccountRegistry::from_json(document).unwrap_err();
        assert!(err.to_string().contains("duplicate account id"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let registry = AccountRegistry::from_path("/nonexistent/cloudidp/accounts.json").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(AccountRegistry::from_json("{not json").is_err());
    }
}
