//! # Armature - Component Lifecycle Container
//!
//! A small bootstrap framework for wiring named, independently configured
//! components (database handles, web engines, token issuers) into a single
//! process.
//!
//! ## Lifecycle
//!
//! - **Declare**: every registered component declares its configuration
//!   fields with a [`FlagSet`].
//! - **Configure**: the binder resolves each field once, with a fixed
//!   precedence: command-line flag > environment variable > dotenv file >
//!   declared default.
//! - **Activate**: components are activated sequentially in registration
//!   order; the first failure aborts the load.
//! - **Stop**: components are stopped sequentially on shutdown.
//!
//! ## Example
//!
//! ```rust,ignore
//! let container = Container::builder()
//!     .name("billing")
//!     .register(Arc::new(SqlDb::new("db", "")))
//!     .register(Arc::new(WebEngine::new("web", "")))
//!     .build();
//!
//! container.load().await?;
//! // ... serve ...
//! container.stop().await?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod component;
pub mod container;
pub mod error;
pub mod flags;
pub mod logging;

pub use component::{Component, EnvName};
pub use container::{Container, ContainerBuilder};
pub use error::{ContainerError, FlagError, LogError};
pub use flags::{FlagSet, Setting};
pub use logging::{AppLogger, ScopedLogger};
