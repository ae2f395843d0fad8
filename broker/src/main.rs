// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use anyhow::Context;
use clap::Parser;
use cloudidp_broker::accounts::AccountRegistry;
use cloudidp_broker::application::Application;
use cloudidp_broker::broker::CredentialBroker;
use cloudidp_broker::configuration::BrokerOptions;
use cloudidp_broker::provider::StsProvider;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in CloudWatch logs.
        .with_ansi(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from flags or environment variables
    let options = BrokerOptions::parse();

    tracing::info!("[broker] {:?}", &options);

    let accounts = Arc::new(AccountRegistry::from_path(&options.accounts_file)?);

    let broker = match options.management_credentials() {
        Some(credentials) => {
            let provider = StsProvider::new(&credentials).await;
            CredentialBroker::new(Arc::new(provider))
        }
        None => {
            tracing::warn!("[broker] management credentials not configured");
            CredentialBroker::unconfigured()
        }
    };

    let application = Application::build(options, Arc::new(broker), accounts)
        .await
        .context("failed to start HTTP server")?;

    application
        .run_until_stopped()
        .await
        .context("HTTP server stopped")
}
