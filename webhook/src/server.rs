// Copyright (c) 2025 Elektrobit Automotive GmbH
//
// This program and the accompanying materials are made available under the
// terms of the Apache License, Version 2.0 which is available at
// https://www.apache.org/licenses/LICENSE-2.0.
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};

use crate::admission::{WebhookState, mutate_handler};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/inject", post(mutate_handler))
        .route("/ping", get(|| async { "pong" }))
        .with_state(state)
}

async fn shutdown_on_signal(handle: Handle) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for the shutdown signal: {err}");
        return;
    }
    log::info!("Shutting down the webhook.");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}

/// Serves `app` on `address`, over TLS when certificate and key files are given.
pub async fn serve(
    address: SocketAddr,
    tls_files: Option<(String, String)>,
    app: Router,
) -> std::io::Result<()> {
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match tls_files {
        Some((crt_pem, key_pem)) => {
            let tls_config = RustlsConfig::from_pem_file(crt_pem, key_pem).await?;
            log::info!("Listening for admission reviews on https://{address}");
            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            log::warn!("Serving plain HTTP on http://{address}, TLS is disabled");
            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}
