// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::path::PathBuf;

use clap::Parser;

use crate::constants::DEFAULT_REGION;
use crate::models::ManagementCredentials;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct BrokerOptions {
    #[arg(long, default_value = "127.0.0.1", env("CLOUDIDP_HTTP_HOST"))]
    pub host: String,
    #[arg(long, default_value = "8080", env("CLOUDIDP_HTTP_PORT"))]
    pub port: u16,
    #[arg(long, env("CLOUDIDP_MANAGEMENT_ACCESS_KEY_ID"), hide_env_values = true)]
    pub management_access_key_id: Option<String>,
    #[arg(long, env("CLOUDIDP_MANAGEMENT_SECRET_ACCESS_KEY"), hide_env_values = true)]
    pub management_secret_access_key: Option<String>,
    #[arg(long, default_value = DEFAULT_REGION, env("CLOUDIDP_DEFAULT_REGION"))]
    pub region: String,
    #[arg(long, default_value = "accounts.json", env("CLOUDIDP_ACCOUNTS_FILE"))]
    pub accounts_file: PathBuf,
}

impl BrokerOptions {
    /// Management credentials, if both keys are configured and non-empty.
    pub fn management_credentials(&self) -> Option<ManagementCredentials> {
        let access_key_id = self
            .management_access_key_id
            .as_deref()
            .filter(|v| !v.is_empty())?;
        let secret_access_key = self
            .management_secret_access_key
            .as_deref()
            .filter(|v| !v.is_empty())?;

        Some(ManagementCredentials::new(
            access_key_id,
            secret_access_key,
            Some(self.region.clone()),
        ))
    }
}

impl Default for BrokerOptions {
    fn default() -> Self {
        BrokerOptions {
            host: "127.0.0.1".to_string(),
            port: 8080,
            management_access_key_id: None,
            management_secret_access_key: None,
            region: DEFAULT_REGION.to_string(),
            accounts_file: PathBuf::from("accounts.json"),
        }
    }
}

// Options are logged at startup; keep the keys out of the log.
impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "management_credentials",
                &self.management_credentials().map(|_| "[REDACTED]"),
            )
            .field("region", &self.region)
            .field("accounts_file", &self.accounts_file)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let options = BrokerOptions::try_parse_from([
            "cloudidp-broker",
            "--port",
            "9090",
            "--management-access-key-id",
            "AKIAEXAMPLE",
            "--management-secret-access-key",
            "secret",
            "--region",
            "eu-west-1",
        ])
        .unwrap();

        assert_eq!(options.port, 9090);
        let credentials = options.management_credentials().unwrap();
        assert_eq!(credentials.access_key_id, "AKIAEXAMPLE");
        assert_eq!(credentials.region, "eu-west-1");
    }

    #[test]
    fn test_missing_secret_means_unconfigured() {
        let options = BrokerOptions {
            management_access_key_id: Some("AKIAEXAMPLE".to_string()),
            management_secret_access_key: Some(String::new()),
            ..BrokerOptions::default()
        };
        assert!(options.management_credentials().is_none());
        assert!(BrokerOptions::default().management_credentials().is_none());
    }

    #[test]
    fn test_debug_hides_keys() {
        let options = BrokerOptions {
            management_access_key_id: Some("AKIAEXAMPLE".to_string()),
            management_secret_access_key: Some("supersecret".to_string()),
            ..BrokerOptions::default()
        };
        let output = format!("{:?}", options);
        assert!(!output.contains("AKIAEXAMPLE"));
        assert!(!output.contains("supersecret"));
    }
}
