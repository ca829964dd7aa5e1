use crate::registry::RoomRegistry;
use crate::storage::{MemoryStore, RoomStore};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

use crate::handlers;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

/// How often the background task sweeps idle rooms out of the registry.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        let store: Arc<dyn RoomStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(RoomRegistry::with_store(store));
        Self::new_with_dependencies(config, registry)
    }

    pub fn new_with_dependencies(config: ServerConfig, registry: Arc<RoomRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn new_for_tests() -> Self {
        Self::new(ServerConfig::for_tests())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: AppContext::new(config),
        }
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let config = context.config().clone();
        let bind_addr = Self::bind_addr(&config)?;

        let preflight = if bind_addr.port() != 0 {
            Some(std::net::TcpListener::bind(bind_addr).map_err(ServerError::BindError)?)
        } else {
            None
        };
        drop(preflight);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!("web server listening on http://{}", addr);

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        let sweeper = Self::spawn_sweeper(context.registry());

        Ok(ServerHandle::new(addr, shutdown_tx, task, sweeper, context))
    }

    /// Periodic idle-room collection. Turn timeouts are enforced lazily on
    /// reads; this task only reclaims rooms nobody is reading anymore.
    fn spawn_sweeper(registry: Arc<RoomRegistry>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = registry.sweep_idle_rooms();
                if swept > 0 {
                    tracing::info!(swept, "idle room sweep complete");
                }
            }
        })
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let health = Self::health_route();
        let api_routes = Self::api_routes(context);

        health.or(api_routes).unify().boxed()
    }

    fn health_route() -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health::health().into_response())
            .boxed()
    }

    fn api_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let registry = context.registry();

        let create = warp::path!("api" / "rooms")
            .and(warp::post())
            .and(Self::with_registry(registry.clone()))
            .and(warp::body::json())
            .and_then(
                |registry: Arc<RoomRegistry>, request: handlers::CreateRoomRequest| async move {
                    let response = handlers::create_room(registry, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let list = warp::path!("api" / "rooms")
            .and(warp::get())
            .and(Self::with_registry(registry.clone()))
            .and_then(|registry: Arc<RoomRegistry>| async move {
                let response = handlers::list_rooms(registry).await;
                Ok::<_, Infallible>(response)
            });

        let get = warp::path!("api" / "rooms" / String)
            .and(warp::get())
            .and(Self::with_registry(registry.clone()))
            .and_then(|room_id: String, registry: Arc<RoomRegistry>| async move {
                let response = handlers::get_room(registry, room_id).await;
                Ok::<_, Infallible>(response)
            });

        let join = warp::path!("api" / "rooms" / String / "join")
            .and(warp::post())
            .and(Self::with_registry(registry.clone()))
            .and(warp::body::json())
            .and_then(
                |room_id: String,
                 registry: Arc<RoomRegistry>,
                 request: handlers::JoinRoomRequest| async move {
                    let response = handlers::join_room(registry, room_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let start = warp::path!("api" / "rooms" / String / "start")
            .and(warp::post())
            .and(Self::with_registry(registry.clone()))
            .and_then(|room_id: String, registry: Arc<RoomRegistry>| async move {
                let response = handlers::start_game(registry, room_id).await;
                Ok::<_, Infallible>(response)
            });

        let play = warp::path!("api" / "rooms" / String / "play")
            .and(warp::post())
            .and(Self::with_registry(registry.clone()))
            .and(warp::body::json())
            .and_then(
                |room_id: String,
                 registry: Arc<RoomRegistry>,
                 request: handlers::PlayRequest| async move {
                    let response = handlers::play_cards(registry, room_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let pass = warp::path!("api" / "rooms" / String / "pass")
            .and(warp::post())
            .and(Self::with_registry(registry.clone()))
            .and(warp::body::json())
            .and_then(
                |room_id: String,
                 registry: Arc<RoomRegistry>,
                 request: handlers::PlayerRequest| async move {
                    let response = handlers::pass_turn(registry, room_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let leave = warp::path!("api" / "rooms" / String / "leave")
            .and(warp::post())
            .and(Self::with_registry(registry))
            .and(warp::body::json())
            .and_then(
                |room_id: String,
                 registry: Arc<RoomRegistry>,
                 request: handlers::PlayerRequest| async move {
                    let response = handlers::leave_room(registry, room_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        create
            .or(list)
            .unify()
            .or(join)
            .unify()
            .or(start)
            .unify()
            .or(play)
            .unify()
            .or(pass)
            .unify()
            .or(leave)
            .unify()
            .or(get)
            .unify()
            .boxed()
    }

    fn with_registry(
        registry: Arc<RoomRegistry>,
    ) -> impl Filter<Extract = (Arc<RoomRegistry>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&registry))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    sweeper: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        sweeper: JoinHandle<()>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            sweeper: Some(sweeper),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
