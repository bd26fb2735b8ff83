//! Lifecycle container.
//!
//! Owns the ordered list of registered components plus a name-indexed
//! registry, and drives the whole lifecycle: flag declaration, configuration
//! binding, sequential activation, and shutdown. Activation order is
//! registration order — producers must be registered before their consumers;
//! there is no dependency graph.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::component::{Component, EnvName};
use crate::error::ContainerError;
use crate::flags::{FlagSet, Setting};
use crate::logging::{AppLogger, ScopedLogger};

pub struct Container {
    name: String,
    env: Setting<String>,
    env_name: OnceLock<EnvName>,
    components: Vec<Arc<dyn Component>>,
    index: HashMap<String, Arc<dyn Component>>,
    logger: AppLogger,
}

/// Builder collecting components before the container is sealed. The
/// sequence and the index always share membership: a duplicate ID is a
/// silent no-op and the first registration is retained.
pub struct ContainerBuilder {
    name: String,
    components: Vec<Arc<dyn Component>>,
    index: HashMap<String, Arc<dyn Component>>,
    logger: AppLogger,
}

impl ContainerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Swap in a pre-built logger (e.g. a fake for tests).
    pub fn logger(mut self, logger: AppLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn register(mut self, component: Arc<dyn Component>) -> Self {
        let id = component.id().to_string();
        if !self.index.contains_key(&id) {
            self.components.push(component.clone());
            self.index.insert(id, component);
        }
        self
    }

    pub fn build(self) -> Container {
        Container {
            name: self.name,
            env: Setting::new(EnvName::Dev.as_str().to_string()),
            env_name: OnceLock::new(),
            components: self.components,
            index: self.index,
            logger: self.logger,
        }
    }
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder {
            name: String::new(),
            components: Vec::new(),
            index: HashMap::new(),
            logger: AppLogger::new(),
        }
    }

    /// Full startup using the process command line.
    pub async fn load(&self) -> Result<(), ContainerError> {
        self.load_from(std::env::args()).await
    }

    /// Full startup: declare flags, bind configuration, activate the logger,
    /// then activate every component in registration order. The first
    /// activation error stops iteration and is returned wrapped with the
    /// offending component's ID; components activated before it are left
    /// running — a failed load is fatal to the whole process.
    pub async fn load_from<I>(&self, args: I) -> Result<(), ContainerError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = FlagSet::new();
        flags.string(
            "app-env",
            &self.env,
            "Environment for the service: dev | staging | prod",
        );
        self.logger.init_flags(&mut flags);
        for component in &self.components {
            component.init_flags(&mut flags);
        }
        flags.resolve(args)?;

        let env_value = self.env.get();
        let env = EnvName::parse(&env_value)
            .ok_or(ContainerError::Environment(env_value))?;
        let _ = self.env_name.set(env);

        self.logger
            .activate()
            .map_err(|source| ContainerError::Logger { source })?;

        let log = self.logger.scoped(&self.name);
        log.with("env", env)
            .with("log_level", self.logger.level())
            .info("service starting");

        for component in &self.components {
            log.with("component", component.id())
                .info("activating component");
            component
                .activate(self)
                .await
                .map_err(|source| ContainerError::Activate {
                    id: component.id().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Stop every component, then flush the logger. Iteration uses
    /// registration order — the same order as startup, kept for
    /// compatibility with existing deployments; see the shutdown-order test
    /// for the trade-off. Fail-fast: the first error is returned with the
    /// component's ID and later components are not stopped.
    pub async fn stop(&self) -> Result<(), ContainerError> {
        let log = self.logger.scoped(&self.name);
        log.info("stopping container");
        for component in &self.components {
            component
                .stop()
                .await
                .map_err(|source| ContainerError::Stop {
                    id: component.id().to_string(),
                    source,
                })?;
        }
        self.logger.stop();
        Ok(())
    }

    /// Registered component by ID. The registry is read-only after build,
    /// so concurrent lookups need no locking.
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Component>> {
        self.index.get(id).cloned()
    }

    /// Lookup that treats absence as an unrecoverable wiring mistake. All
    /// legitimate lookups happen after registration is complete and refer to
    /// components known to exist.
    pub fn must_lookup(&self, id: &str) -> Arc<dyn Component> {
        match self.lookup(id) {
            Some(component) => component,
            None => self
                .logger
                .scoped(&self.name)
                .with("component", id)
                .fatal(format!("component '{id}' is not registered")),
        }
    }

    /// Typed lookup through the component's extended capability surface.
    /// `None` means either "no such ID" or "not this kind".
    pub fn lookup_as<T: Component>(&self, id: &str) -> Option<Arc<T>> {
        self.lookup(id)?.as_any().downcast::<T>().ok()
    }

    /// Child logger scoped with `prefix`, backed by the process-wide logger.
    pub fn logger(&self, prefix: &str) -> ScopedLogger {
        self.logger.scoped(prefix)
    }

    pub fn log_level(&self) -> String {
        self.logger.level()
    }

    /// Environment name resolved during `load`; `dev` before that.
    pub fn env_name(&self) -> EnvName {
        self.env_name.get().copied().unwrap_or(EnvName::Dev)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
