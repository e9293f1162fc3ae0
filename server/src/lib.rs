//! HTTP surface for the rate sampler.
//!
//! Serves two routes backed by one [`QueryService`]:
//!
//! - `GET /` renders the chart page
//! - `GET /data` returns the current view as JSON
//!
//! A background task runs the [`Sampler`] on its own interval. On SIGINT or
//! SIGTERM the sampler is cancelled, the listener stops accepting, and
//! in-flight requests get a bounded grace period to finish.

pub mod config;
pub mod handlers;
pub mod page;

use anyhow::{Context, Result};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use config::Args;
use handlers::AppState;
use rate_sampler::source::http_client;
use rate_sampler::{QueryService, SampleStore, Sampler};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/data", get(handlers::data))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Wire up store, sampler and router from `args` and serve until a shutdown signal.
pub async fn run(args: Args) -> Result<()> {
    args.validate()?;
    let retention = args.retention()?;
    let sampler_config = args.sampler_config()?;

    let client = http_client().context("failed to build HTTP client")?;
    let fiat = args.fiat_provider.build(client.clone());
    let crypto = args.crypto_provider.build(client);

    let store = SampleStore::new(retention);
    let state = AppState::new(QueryService::new(store.clone()), sampler_config.interval);
    let sampler = Sampler::new(fiat, crypto, store, sampler_config);

    info!(
        "Retention: {:?}, interval: {:?}, fetch timeout: {:?}",
        retention,
        sampler.config().interval,
        sampler.config().fetch_timeout
    );

    let cancel = CancellationToken::new();
    let sampler_task = tokio::spawn(sampler.run(cancel.clone()));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("Server started on http://{}", args.listen);

    serve(listener, router(state), cancel, args.shutdown_grace()).await?;

    if let Err(e) = sampler_task.await {
        error!("sampler task failed: {e}");
    }
    info!("Server gracefully stopped");
    Ok(())
}

/// Serve `app` until `cancel` fires, then give in-flight requests `grace`
/// to complete before returning.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
    grace: Duration,
) -> Result<()> {
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    });

    let grace_elapsed = async {
        cancel.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        res = server.into_future() => res.context("server error")?,
        _ = grace_elapsed => warn!("shutdown grace period of {:?} elapsed, dropping open connections", grace),
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down server...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rate_sampler::{FetchError, RateSource, Retention, SamplerConfig, SourceId};
    use serde_json::Value;
    use std::sync::Arc;

    struct Fixed(SourceId, f64);

    #[async_trait]
    impl RateSource for Fixed {
        fn id(&self) -> SourceId {
            self.0
        }

        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _timeout: Duration) -> Result<f64, FetchError> {
            Ok(self.1)
        }
    }

    #[tokio::test]
    async fn serves_sampled_data_and_shuts_down() {
        let store = SampleStore::new(Retention::Count(20));
        let sampler = Sampler::new(
            Arc::new(Fixed(SourceId::Fiat, 0.94)),
            Arc::new(Fixed(SourceId::Crypto, 65000.1234)),
            store.clone(),
            SamplerConfig::default(),
        );
        sampler.tick().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(QueryService::new(store), Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(
            listener,
            router(state),
            cancel.clone(),
            Duration::from_secs(1),
        ));

        let resp = reqwest::get(format!("http://{addr}/data")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["currentUSDtoEUR"], "0.940000");
        assert_eq!(json["currentBTCtoUSD"], "65000.1234");
        assert_eq!(json["status"], "Healthy");

        let page = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(page.status(), reqwest::StatusCode::OK);

        cancel.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(
            QueryService::new(SampleStore::default()),
            Duration::from_secs(10),
        );
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(
            listener,
            router(state),
            cancel.clone(),
            Duration::from_secs(1),
        ));

        let resp = reqwest::get(format!("http://{addr}/nope")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        cancel.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn slow_requests_are_cut_off_after_grace_period() {
        let entered = Arc::new(tokio::sync::Notify::new());
        let app = Router::new().route(
            "/slow",
            get({
                let entered = entered.clone();
                move || {
                    let entered = entered.clone();
                    async move {
                        entered.notify_one();
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        "late"
                    }
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let grace = Duration::from_millis(200);
        let server = tokio::spawn(serve(listener, app, cancel.clone(), grace));

        let request = tokio::spawn(reqwest::get(format!("http://{addr}/slow")));
        entered.notified().await;

        let started = std::time::Instant::now();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("serve did not return after the grace period")
            .unwrap()
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= grace, "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5));

        request.abort();
    }
}
