//! HTTP engine component.
//!
//! Wraps an `axum` router behind the component lifecycle: the listen port
//! and run mode come from the configuration binder, application routes are
//! merged in before serving, and every request passes through the recovery
//! boundary and a trace layer. Serving itself is explicit — the host calls
//! [`WebEngine::serve`] after a successful load — so the engine never holds
//! the activation sequence hostage.

use std::any::Any;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};

use armature::{async_trait, Component, Container, EnvName, FlagSet, Setting};
use axum::{middleware, Router};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod recover;
pub mod response;

pub use recover::Recovery;
pub use response::{ApiError, CanStatusCode};

const DEFAULT_PORT: i64 = 3000;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("web engine is not activated")]
    NotActivated,

    #[error("unsupported run mode '{0}' (allowed: debug | release)")]
    InvalidMode(String),

    #[error("invalid listen port {0}")]
    InvalidPort(i64),
}

/// How much the engine surfaces internally: `Debug` re-raises handler
/// panics after logging, `Release` converts them into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Debug,
    Release,
}

impl EngineMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "debug" => Some(Self::Debug),
            "release" => Some(Self::Release),
            _ => None,
        }
    }

    /// Default mode when none is configured explicitly.
    fn for_env(env: EnvName) -> Self {
        match env {
            EnvName::Dev => Self::Debug,
            EnvName::Staging | EnvName::Prod => Self::Release,
        }
    }

    pub fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

pub struct WebEngine {
    id: String,
    prefix: String,
    port: Setting<i64>,
    mode_flag: Setting<String>,
    mode: OnceLock<EngineMode>,
    recovery: OnceLock<Recovery>,
    router: Mutex<Option<Router>>,
    cancel: CancellationToken,
}

impl WebEngine {
    /// `prefix` namespaces the flag fields of this instance (e.g. an admin
    /// listener constructed with prefix `"admin"` declares `admin-http-port`).
    /// Empty means no prefix.
    pub fn new(id: impl Into<String>, prefix: &str) -> Self {
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}-")
        };
        Self {
            id: id.into(),
            prefix,
            port: Setting::new(DEFAULT_PORT),
            mode_flag: Setting::new(String::new()),
            mode: OnceLock::new(),
            recovery: OnceLock::new(),
            router: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Merge application routes into the engine. Must happen after a
    /// successful load and before [`serve`](Self::serve).
    pub fn merge(&self, routes: Router) -> Result<(), HttpError> {
        let mut guard = self.router.lock();
        let base = guard.take().ok_or(HttpError::NotActivated)?;
        *guard = Some(base.merge(routes));
        Ok(())
    }

    /// Run mode resolved during activation.
    pub fn mode(&self) -> Result<EngineMode, HttpError> {
        self.mode.get().copied().ok_or(HttpError::NotActivated)
    }

    /// Bind the listener and serve until [`stop`](Component::stop) cancels
    /// it. The recovery boundary and the trace layer are applied here, on
    /// top of everything merged so far. Takes the assembled router; calling
    /// `serve` twice is an error.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let routes = self
            .router
            .lock()
            .take()
            .ok_or(HttpError::NotActivated)?;
        let recovery = self
            .recovery
            .get()
            .cloned()
            .ok_or(HttpError::NotActivated)?;
        let router = routes
            .layer(middleware::from_fn_with_state(recovery, recover::handle))
            .layer(TraceLayer::new_for_http());

        let port = self.port.get();
        if !(1..=u16::MAX as i64).contains(&port) {
            return Err(HttpError::InvalidPort(port).into());
        }
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port as u16);
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let cancel = self.cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Component for WebEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn init_flags(&self, flags: &mut FlagSet) {
        let p = &self.prefix;
        flags.int(
            &format!("{p}http-port"),
            &self.port,
            "Port on which the server listens",
        );
        flags.string(
            &format!("{p}http-mode"),
            &self.mode_flag,
            "Run mode of the server: debug | release (defaults by environment)",
        );
    }

    async fn activate(&self, ctx: &Container) -> anyhow::Result<()> {
        let configured = self.mode_flag.get();
        let mode = if configured.is_empty() {
            EngineMode::for_env(ctx.env_name())
        } else {
            EngineMode::parse(&configured)
                .ok_or_else(|| HttpError::InvalidMode(configured.clone()))?
        };
        let _ = self.mode.set(mode);

        let _ = self
            .recovery
            .set(Recovery::new(ctx.logger(&self.id), mode.is_debug()));
        *self.router.lock() = Some(Router::new());

        ctx.logger(&self.id)
            .with("port", self.port.get())
            .with("mode", format!("{mode:?}"))
            .info("web engine ready");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.cancel.cancel();
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
