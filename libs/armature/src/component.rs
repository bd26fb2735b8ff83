use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::container::Container;
use crate::flags::FlagSet;

/// A named unit with a four-phase lifecycle: declare, configure, activate,
/// stop. Concrete components (database connectors, web engines, token
/// issuers) implement this contract and are driven by a [`Container`].
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Process-unique identifier; must be stable for the component's lifetime.
    fn id(&self) -> &str;

    /// Declare configuration fields. Runs before any activation.
    fn init_flags(&self, _flags: &mut FlagSet) {}

    /// Turn resolved configuration into a live runtime resource. May call
    /// back into the container to look up earlier-registered components and
    /// to obtain a scoped logger.
    async fn activate(&self, ctx: &Container) -> anyhow::Result<()>;

    /// Release runtime resources. Idempotent by convention.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Downcast hook so callers can reach a component's extended capability
    /// surface via [`Container::lookup_as`]. Implement as `{ self }`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Deployment environment selecting default behavior for components
/// (e.g. debug vs. release mode for the web engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvName {
    Dev,
    Staging,
    Prod,
}

impl EnvName {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(EnvName::Dev),
            "staging" => Some(EnvName::Staging),
            "prod" => Some(EnvName::Prod),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EnvName::Dev => "dev",
            EnvName::Staging => "staging",
            EnvName::Prod => "prod",
        }
    }
}

impl std::fmt::Display for EnvName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
