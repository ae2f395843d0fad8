// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # CloudIDP Credential Broker
//!
//! Assumes IAM roles in member AWS accounts on behalf of a management
//! identity, caches the temporary credentials, and hands out per-account
//! sessions that other features build their AWS clients from.
//!
//! ## Architecture
//!
//! ```text
//! Feature module -> CredentialBroker -> session cache (account_id, role_arn)
//!                          |
//!                          +-> IdentityProvider (STS AssumeRole / GetCallerIdentity)
//! ```
//!
//! ## Modules
//!
//! - [`accounts`]: Member account registry loaded from JSON
//! - [`application`]: HTTP server setup with Axum, body limit and timeout
//! - [`broker`]: The credential broker and its session cache
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: Configuration constants for the application
//! - [`errors`]: Broker error taxonomy with HTTP response mapping
//! - [`models`]: Credential, account and session types with validation
//! - [`provider`]: Identity provider trait and the STS implementation
//! - [`routes`]: HTTP route handlers (health, accounts, sessions)
//!
//! ## Usage
//!
//! ```no_run
//! # async fn example() -> Result<(), cloudidp_broker::errors::BrokerError> {
//! use std::sync::Arc;
//! use cloudidp_broker::broker::CredentialBroker;
//! use cloudidp_broker::models::{AssumeRoleRequest, ManagementCredentials};
//! use cloudidp_broker::provider::StsProvider;
//!
//! let credentials = ManagementCredentials::new("AKIA...", "secret", None);
//! let broker = CredentialBroker::new(Arc::new(StsProvider::new(&credentials).await));
//!
//! let session = broker
//!     .assume(AssumeRoleRequest::new(
//!         "111111111111",
//!         "Production",
//!         "arn:aws:iam::111111111111:role/CloudIDP-Access",
//!     ))
//!     .await?;
//! let config = session.client_factory().config_for("eu-west-1");
//! # let _ = config;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Considerations
//!
//! - Sessions are reused until 5 minutes before expiry, then re-assumed
//! - Credential records are zeroized on drop and redacted in `Debug` output
//! - The HTTP API never returns credentials

pub mod accounts;
pub mod application;
pub mod broker;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod models;
pub mod provider;
pub mod routes;
