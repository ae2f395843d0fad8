// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// Prefix for synthesized role session names (`CloudIDP-20250101-120000-0123abcd`).
pub const SESSION_NAME_PREFIX: &str = "CloudIDP";
/// strftime pattern for the UTC timestamp in synthesized session names.
pub const SESSION_NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
pub const SESSION_REFRESH_BUFFER: Duration = Duration::from_secs(300); // refresh 5 minutes before expiry

/// https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRole.html
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(3600);
pub const MIN_SESSION_DURATION_SECS: u64 = 900;
pub const MAX_SESSION_DURATION_SECS: u64 = 43_200;
pub const MIN_SESSION_NAME_LENGTH: usize = 2;
pub const MAX_SESSION_NAME_LENGTH: usize = 64;

pub const ACCOUNT_ID_LENGTH: usize = 12;
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_REGIONS: [&str; 8] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-northeast-1",
];
/// Accounts without an explicit region list get the first two default regions.
pub const DEFAULT_ACCOUNT_REGION_COUNT: usize = 2;

/// Provider name attached to the static management credentials.
pub const MANAGEMENT_PROVIDER_NAME: &str = "cloudidp-management";
/// Provider name attached to assumed-role credentials handed to SDK clients.
pub const ASSUMED_ROLE_PROVIDER_NAME: &str = "cloudidp-assumed-role";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB
