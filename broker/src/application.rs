// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use crate::accounts::AccountRegistry;
use crate::broker::CredentialBroker;
use crate::configuration::BrokerOptions;
use crate::constants;
use crate::routes;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::serve::Serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<CredentialBroker>,
    pub accounts: Arc<AccountRegistry>,
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(
        options: BrokerOptions,
        broker: Arc<CredentialBroker>,
        accounts: Arc<AccountRegistry>,
    ) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;
        let server = run(listener, broker, accounts)?;
        let port = server.local_addr()?.port();

        tracing::info!("[broker] listening at http://{}:{}", options.host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Builds the router with the production middleware (body limit, timeout).
pub fn create_router(broker: Arc<CredentialBroker>, accounts: Arc<AccountRegistry>) -> Router {
    let state = Arc::new(AppState { broker, accounts });

    Router::new()
        .route("/health", get(routes::health))
        .route("/accounts", get(routes::list_accounts))
        .route("/accounts/{account_id}/test", post(routes::test_account))
        .route("/accounts/{account_id}/identity", get(routes::account_identity))
        .route(
            "/sessions",
            get(routes::session_count).delete(routes::clear_sessions),
        )
        .layer(RequestBodyLimitLayer::new(constants::MAX_REQUEST_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            constants::REQUEST_TIMEOUT,
        ))
        .with_state(state)
}

#[tracing::instrument(skip(listener, broker, accounts))]
pub fn run(
    listener: TcpListener,
    broker: Arc<CredentialBroker>,
    accounts: Arc<AccountRegistry>,
) -> Result<Serve<TcpListener, Router, Router>, std::io::Error> {
    let app = create_router(broker, accounts);
    Ok(axum::serve(listener, app))
}
