use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Router,
};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tower::ServiceExt;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers::{add_task, delete_task, get_task_by_id, get_task_list, health, update_task};
use crate::application::task_service::TaskUsecase;
use crate::config::TimeoutConfig;
use crate::errors::{ServerError, ShutdownError};

/// How long in-flight requests may run once shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
/// How long to wait for the serve task to report after shutdown.
pub const SERVE_REPORT_WAIT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
    pub timeout: TimeoutConfig,
}

pub struct HttpServer<U>
where
    U: TaskUsecase,
{
    pub usecase: Arc<U>,
    pub config: HttpServerConfig,
}

impl<U> HttpServer<U>
where
    U: TaskUsecase,
{
    pub fn new(usecase: U, config: HttpServerConfig) -> Self {
        Self {
            usecase: Arc::new(usecase),
            config,
        }
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let mut app: Router = Router::new()
            .route("/health", get(health))
            .route("/tasks", post(add_task::<U>).get(get_task_list::<U>))
            .route(
                "/tasks/{id}",
                get(get_task_by_id::<U>)
                    .patch(update_task::<U>)
                    .delete(delete_task::<U>),
            )
            .with_state(self.usecase.clone());

        // A zero timeout means "no limit".
        let timeout = &self.config.timeout;
        if !timeout.write.is_zero() {
            app = app.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout.write,
            ));
        }
        if !timeout.read.is_zero() {
            app = app.layer(RequestBodyTimeoutLayer::new(timeout.read));
        }
        app.layer(trace_layer)
    }

    /// Serves until SIGINT or SIGTERM, then shuts down gracefully.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then shuts down gracefully.
    pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        serve_until(&self.config.port, self.router(), &self.config.timeout, signal).await
    }
}

/// Binds `0.0.0.0:<port>`, serves `app` and coordinates shutdown.
///
/// The accept loop runs on its own task and reports a terminal error through
/// a single-slot channel. Whichever comes first decides the path:
///
/// - a serve error is returned as is; there is nothing left to shut down.
/// - `signal` starts a graceful shutdown. In-flight requests get
///   [`SHUTDOWN_GRACE`] to finish before the serve task is aborted, and the
///   serve task then gets [`SERVE_REPORT_WAIT`] to report. Shutdown and serve
///   errors are combined when both occur.
///
/// `timeout` supplies the per-connection header-read and idle limits.
pub async fn serve_until<F>(
    port: &str,
    app: Router,
    timeout: &TimeoutConfig,
    signal: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Listen {
            addr: addr.clone(),
            source,
        })?;
    match listener.local_addr() {
        Ok(local) => tracing::info!("starting server on {}", local),
        Err(_) => tracing::info!("starting server on {}", addr),
    }

    let limits = ConnectionLimits {
        header_read: timeout.header_read_limit(),
        idle: timeout.idle_limit(),
    };
    tracing::debug!(header_read = ?limits.header_read, idle = ?limits.idle, "connection limits");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (err_tx, err_rx) = oneshot::channel::<io::Error>();

    let serve_task = tokio::spawn(async move {
        if let Err(e) = accept_loop(listener, app, limits, stop_rx).await {
            let _ = err_tx.send(e);
        }
    });

    supervise(serve_task, err_rx, stop_tx, signal).await
}

async fn supervise<F>(
    mut serve_task: JoinHandle<()>,
    mut err_rx: oneshot::Receiver<io::Error>,
    stop_tx: oneshot::Sender<()>,
    signal: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    tokio::select! {
        _ = signal => {}
        reported = &mut err_rx => {
            let err = match reported {
                Ok(e) => e,
                // The serve task ended without reporting anything.
                Err(_) => match (&mut serve_task).await {
                    Ok(()) => return Ok(()),
                    Err(join) => task_failure(join),
                },
            };
            tracing::error!(error = %err, "server stopped unexpectedly");
            return Err(ServerError::Serve(err));
        }
    }

    tracing::info!(grace = ?SHUTDOWN_GRACE, "shutdown requested, draining in-flight requests");
    let _ = stop_tx.send(());

    let mut task_err = None;
    let shutdown_err = match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve_task).await {
        Ok(Ok(())) => None,
        Ok(Err(join)) => {
            task_err = Some(task_failure(join));
            None
        }
        Err(_) => {
            serve_task.abort();
            Some(ShutdownError::Timeout(SHUTDOWN_GRACE))
        }
    };

    let serve_err = match tokio::time::timeout(SERVE_REPORT_WAIT, err_rx).await {
        Ok(Ok(e)) => Some(e),
        _ => task_err,
    };

    let outcome = match (shutdown_err, serve_err) {
        (Some(shutdown), Some(cause)) => Err(ServerError::Both {
            shutdown,
            serve: cause,
        }),
        (Some(shutdown), None) => Err(ServerError::Shutdown(shutdown)),
        (None, Some(cause)) => Err(ServerError::Serve(cause)),
        (None, None) => Ok(()),
    };
    match &outcome {
        Ok(()) => tracing::info!("server stopped"),
        Err(e) => tracing::error!(error = %e, "server stopped with errors"),
    }
    outcome
}

fn task_failure(join: JoinError) -> io::Error {
    io::Error::other(format!("serve task failed: {join}"))
}

#[derive(Debug, Clone, Copy)]
struct ConnectionLimits {
    header_read: Option<Duration>,
    idle: Option<Duration>,
}

/// Accepts connections until `stop` fires, then drains the open ones.
///
/// Connection tasks live in a `JoinSet`, so aborting the task running this
/// loop also closes every connection it opened.
async fn accept_loop(
    listener: TcpListener,
    app: Router,
    limits: ConnectionLimits,
    mut stop: oneshot::Receiver<()>,
) -> io::Result<()> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    if let Some(limit) = limits.header_read {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(limit);
    }
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(error = %e, "connection task panicked");
                    }
                }
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) if is_connection_error(&e) => {
                        tracing::debug!(error = %e, "accept failed");
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                        return Err(e);
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(%remote, error = %e, "failed to set TCP_NODELAY");
                }

                let activity = Arc::new(Activity::new());
                let service = {
                    let app = app.clone();
                    let activity = Arc::clone(&activity);
                    service_fn(move |request: hyper::Request<Incoming>| {
                        let in_flight = activity.begin();
                        let app = app.clone();
                        async move {
                            let response = app.oneshot(request).await;
                            drop(in_flight);
                            response
                        }
                    })
                };

                let connection = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                let connection = graceful.watch(connection.into_owned());
                let idle = limits.idle;
                connections.spawn(async move {
                    let outcome = match idle {
                        Some(limit) => tokio::select! {
                            outcome = connection => outcome,
                            _ = idle_expired(&activity, limit) => {
                                tracing::debug!(%remote, "closing idle connection");
                                return;
                            }
                        },
                        None => connection.await,
                    };
                    if let Err(e) = outcome {
                        tracing::debug!(%remote, error = %e, "connection closed with error");
                    }
                });
            }
        }
    }

    drop(listener);
    tracing::debug!(open = connections.len(), "listener closed, waiting for connections");
    graceful.shutdown().await;
    Ok(())
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Request bookkeeping for one connection.
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    // Nanoseconds after `opened` at which the last request finished.
    last_done: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_done: AtomicU64::new(0),
        }
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(self))
    }

    /// When the connection will have been idle for `limit`; `None` while a
    /// request is running.
    fn idle_deadline(&self, limit: Duration) -> Option<Instant> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let last = Duration::from_nanos(self.last_done.load(Ordering::SeqCst));
        Some(self.opened + last + limit)
    }
}

struct InFlight(Arc<Activity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        let since_open = u64::try_from(self.0.opened.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.0.last_done.store(since_open, Ordering::SeqCst);
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn idle_expired(activity: &Activity, limit: Duration) {
    loop {
        match activity.idle_deadline(limit) {
            Some(deadline) if deadline <= Instant::now() => return,
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => tokio::time::sleep(limit).await,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "unable to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
