use thiserror::Error;

/// Configuration binding failures. All of these are fatal to `load()`.
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("cannot parse command line")]
    Cli(#[source] clap::Error),

    #[error("failed to load env file '{path}'")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid value '{value}' for flag '{name}' from {origin}: {reason}")]
    Invalid {
        name: String,
        value: String,
        /// Which configuration source supplied the value.
        origin: &'static str,
        reason: String,
    },
}

/// Logger facade failures.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log level '{0}' (allowed: trace | debug | info | warn | error)")]
    Level(String),
}

/// Structured errors for the lifecycle container. Phase errors carry the ID
/// of the offending component; the underlying cause is kept as the source.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Flags(#[from] FlagError),

    #[error("unsupported environment name '{0}' (allowed: dev | staging | prod)")]
    Environment(String),

    #[error("logger activation failed")]
    Logger {
        #[source]
        source: LogError,
    },

    #[error("activation failed for component '{id}'")]
    Activate {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("stop failed for component '{id}'")]
    Stop {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}
