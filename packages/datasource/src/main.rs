//! `piweb-datasource`: PI Web API datasource service.
//!
//! # Quick start
//!
//! ```sh
//! PIWEB_URL=https://pi.example.com/piwebapi piweb-datasource
//!
//! # With credentials on a custom port:
//! PIWEB_URL=https://pi.example.com/piwebapi PIWEB_USER=reader PIWEB_PASSWORD=... \
//!     PIWEB_BIND=127.0.0.1:8080 piweb-datasource
//! ```
//!
//! # Environment variables
//!
//! See [`piweb_datasource::config::DatasourceConfig::from_env`] for the full list.

use std::process;
use std::sync::Arc;

use piweb_datasource::{build_router, Datasource, DatasourceConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "piweb_datasource=info,tower_http=debug".into()),
        )
        .init();

    let config = match DatasourceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let datasource = match Datasource::new(config.clone()) {
        Ok(ds) => Arc::new(ds),
        Err(e) => {
            eprintln!("error: failed to build PI Web API client: {e}");
            process::exit(1);
        }
    };
    tracing::info!(
        "datasource: {} -> {} (WebID cache TTL {}s)",
        config.datasource_uid,
        config.url,
        config.webid_ttl_secs
    );

    let app = build_router(Arc::clone(&datasource));

    tracing::info!("listening on {}", config.bind_addr);
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: failed to bind {}: {e}", config.bind_addr);
            process::exit(1);
        }
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("could not install ctrl-c handler: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await;

    datasource.dispose();
    if let Err(e) = served {
        eprintln!("error: server error: {e}");
        process::exit(1);
    }
}
