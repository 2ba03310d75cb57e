//! Assembles the Actix application and runs it.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod settings;
mod state_builders;

pub use config::ServerConfig;
pub use settings::{ServerSettings, StoreBackend};

#[cfg(feature = "metrics")]
use metrics::build_metrics;
use state_builders::build_http_state;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServerHandle, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use thdc_backend::domain::VisitRegistry;
use thdc_backend::inbound::http::health::{HealthState, live, ready};
use thdc_backend::inbound::http::session_config::SessionSettings;
use thdc_backend::inbound::http::state::HttpState;
use thdc_backend::inbound::http::{configure_api, json_error_handler};
use thdc_backend::middleware::trace_requests;

/// Per-worker inputs of [`build_app`].
#[derive(Clone)]
struct Shared {
    health: web::Data<HealthState>,
    http: web::Data<HttpState>,
    session: SessionSettings,
}

fn build_app(
    shared: Shared,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(shared.health)
        .app_data(shared.http)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(from_fn(trace_requests))
        .service(
            web::scope("/api/v1")
                .wrap(shared.session.middleware())
                .configure(configure_api),
        )
        .service(ready)
        .service(live)
        .configure(mount_docs)
}

#[cfg(debug_assertions)]
fn mount_docs(cfg: &mut web::ServiceConfig) {
    use thdc_backend::doc::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    cfg.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
}

#[cfg(not(debug_assertions))]
fn mount_docs(_: &mut web::ServiceConfig) {}

/// Evict idle visits every `every`, passing `(open, evicted)` to `on_sweep`.
fn spawn_visit_sweeper(
    visits: Arc<VisitRegistry>,
    every: Duration,
    on_sweep: impl Fn(usize, usize) + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = visits.evict_idle();
            let open = visits.len();
            debug!(open, evicted, "visit sweep finished");
            on_sweep(open, evicted);
        }
    })
}

async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(err) => warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl-C only"),
        }
    }
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C; shutdown must come from the handle");
        std::future::pending::<()>().await;
    }
}

/// On SIGINT or SIGTERM, fail the probes first and then stop gracefully.
fn drain_on_signal(server: ServerHandle, health: web::Data<HealthState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_requested().await;
        info!("shutdown requested; draining");
        health.begin_draining();
        server.stop(true).await;
    })
}

/// Bind the listener and start serving `config`.
///
/// `health` reports `serving` once the listener is bound and `draining` after
/// a shutdown signal.
///
/// # Errors
/// Returns [`std::io::Error`] when the adapters cannot be built, metrics
/// cannot be registered, or the socket cannot be bound.
pub fn create_server(
    health: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http = build_http_state(&config)?;
    let ServerConfig {
        session,
        bind_addr,
        sweep_interval,
        ..
    } = config;

    #[cfg(feature = "metrics")]
    let (prometheus, visit_metrics) = build_metrics()?;
    let on_sweep = move |open: usize, evicted: usize| {
        #[cfg(feature = "metrics")]
        visit_metrics.record_sweep(open, evicted);
        #[cfg(not(feature = "metrics"))]
        let _ = (open, evicted);
    };
    spawn_visit_sweeper(Arc::clone(&http.visits), sweep_interval, on_sweep);

    let shared = Shared {
        health: health.clone(),
        http: web::Data::new(http),
        session,
    };
    let server = HttpServer::new(move || {
        let app = build_app(shared.clone());
        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());
        app
    })
    .disable_signals()
    .bind(bind_addr)?
    .run();

    drain_on_signal(server.handle(), health.clone());
    health.mark_serving();
    Ok(server)
}
