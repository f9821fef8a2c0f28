// src/api/server.rs
//! Control API listener

use crate::api::{AppState, AuthConfig, create_routes};
use crate::miner::MinerService;
use crate::miner::service::read_settings;
use crate::utils::{error::MinerError, logging::LogSink};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Splits `host:port` at the rightmost colon
///
/// # Errors
/// Returns `MinerError::InputError` if either half is missing or the port
/// is not a number.
pub fn parse_bind(bind: &str) -> Result<(String, u16), MinerError> {
    let invalid = || MinerError::InputError("Bind address must be in the form host:port".into());
    let (host, port) = bind.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.is_empty() {
        return Err(invalid());
    }
    let port = port
        .parse()
        .map_err(|_| MinerError::InputError(format!("Invalid port: {}", port)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host.to_string(), port))
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// HTTP control API bound to one address at a time
pub struct WebApi {
    service: Arc<MinerService>,
    auth: Arc<AuthConfig>,
    sink: LogSink,
    running: Mutex<Option<Running>>,
}

impl WebApi {
    /// Creates an API over `service` with the given credentials
    pub fn new(service: Arc<MinerService>, auth: AuthConfig, sink: LogSink) -> Self {
        Self {
            service,
            auth: Arc::new(auth),
            sink,
            running: Mutex::new(None),
        }
    }

    /// Binds `bind` and serves in a background task
    ///
    /// # Returns
    /// The bound address (useful with port 0)
    ///
    /// # Errors
    /// Returns `MinerError` if the address is malformed or cannot be bound
    pub async fn start(&self, bind: &str) -> Result<SocketAddr, MinerError> {
        let (host, port) = parse_bind(bind)?;
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| MinerError::BindError(format!("{}: {}", bind, e)))?;
        let addr = listener.local_addr()?;

        let webui = read_settings(&self.service.settings()).webui_dir();
        let app = create_routes(
            AppState {
                service: self.service.clone(),
                sink: self.sink,
            },
            self.auth.clone(),
            Some(&webui),
        );
        let (shutdown, signal) = oneshot::channel::<()>();
        let sink = self.sink;
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await;
            if let Err(e) = served {
                log::error!(target: sink.target(), "Web API error: {}", e);
            }
        });

        let previous = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Running { shutdown, task });
        if let Some(previous) = previous {
            Self::shutdown(previous).await;
        }
        log::info!(target: self.sink.target(), "Web API running on http://{}", addr);
        Ok(addr)
    }

    /// Stops serving and waits for in-flight requests to finish
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(running) = running {
            Self::shutdown(running).await;
            log::info!(target: self.sink.target(), "Web API stopped");
        }
    }

    async fn shutdown(running: Running) {
        let _ = running.shutdown.send(());
        let _ = running.task.await;
    }
}
