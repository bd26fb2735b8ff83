//! Configuration binder.
//!
//! Components declare named, typed fields against a [`FlagSet`]; the binder
//! resolves every field exactly once, before any component is activated.
//! Precedence, highest wins:
//!
//! 1. a command-line flag explicitly passed at invocation,
//! 2. a process environment variable (`UPPER_SNAKE` of the flag name),
//! 3. a dotenv file (`ENV_FILE` env var, default `.env`) — merged into the
//!    process environment without overriding already-set variables,
//! 4. the declared default.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use clap::{Arg, ArgAction, Command};

use crate::error::FlagError;

/// A typed configuration field handle. The declaring component keeps a clone;
/// the binder fills the shared cell once during resolution. After binding the
/// value is immutable for the remainder of the process.
#[derive(Debug)]
pub struct Setting<T> {
    cell: Arc<OnceLock<T>>,
    default: T,
}

impl<T: Clone> Clone for Setting<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T: Clone> Setting<T> {
    pub fn new(default: T) -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
            default,
        }
    }

    /// Resolved value, or the declared default when no source provided one.
    pub fn get(&self) -> T {
        self.cell.get().cloned().unwrap_or_else(|| self.default.clone())
    }

    fn bind(&self, value: T) {
        let _ = self.cell.set(value);
    }
}

struct FlagDecl {
    name: String,
    description: String,
    takes_value: bool,
    bind: Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>,
}

/// The set of declared configuration fields for one process.
#[derive(Default)]
pub struct FlagSet {
    decls: Vec<FlagDecl>,
    names: HashSet<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a string field. Flag names are kebab-case; the first
    /// declaration of a name wins (uniqueness across components is a caller
    /// convention, not enforced here).
    pub fn string(&mut self, name: &str, setting: &Setting<String>, description: &str) {
        let s = setting.clone();
        self.declare(name, description, true, move |v| {
            s.bind(v.to_string());
            Ok(())
        });
    }

    /// Declare an integer field.
    pub fn int(&mut self, name: &str, setting: &Setting<i64>, description: &str) {
        let s = setting.clone();
        self.declare(name, description, true, move |v| {
            let parsed = i64::from_str(v.trim()).map_err(|e| e.to_string())?;
            s.bind(parsed);
            Ok(())
        });
    }

    /// Declare a boolean field. On the command line the bare flag means
    /// `true`; `--name=false` and the usual env spellings are accepted.
    pub fn bool(&mut self, name: &str, setting: &Setting<bool>, description: &str) {
        let s = setting.clone();
        self.declare(name, description, false, move |v| {
            let parsed = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => return Err(format!("'{other}' is not a boolean")),
            };
            s.bind(parsed);
            Ok(())
        });
    }

    fn declare<F>(&mut self, name: &str, description: &str, takes_value: bool, bind: F)
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        if !self.names.insert(name.to_string()) {
            return;
        }
        self.decls.push(FlagDecl {
            name: name.to_string(),
            description: description.to_string(),
            takes_value,
            bind: Box::new(bind),
        });
    }

    /// Resolve all declared fields. Runs once per process, after every
    /// component has declared and before any component is activated.
    pub fn resolve<I>(&self, args: I) -> Result<(), FlagError>
    where
        I: IntoIterator<Item = String>,
    {
        load_env_file()?;

        let mut cmd = Command::new("armature");
        for decl in &self.decls {
            let mut arg = Arg::new(decl.name.clone())
                .long(decl.name.clone())
                .help(decl.description.clone())
                .action(ArgAction::Set);
            if !decl.takes_value {
                arg = arg.num_args(0..=1).default_missing_value("true");
            }
            cmd = cmd.arg(arg);
        }

        let matches = cmd.try_get_matches_from(args).map_err(FlagError::Cli)?;

        for decl in &self.decls {
            let from_cli = matches.value_source(&decl.name)
                == Some(clap::parser::ValueSource::CommandLine);
            if from_cli {
                if let Some(value) = matches.get_one::<String>(&decl.name) {
                    (decl.bind)(value).map_err(|reason| FlagError::Invalid {
                        name: decl.name.clone(),
                        value: value.clone(),
                        origin: "command line",
                        reason,
                    })?;
                }
                continue;
            }

            let env_key = decl.name.to_ascii_uppercase().replace('-', "_");
            if let Ok(value) = std::env::var(&env_key) {
                if !value.is_empty() {
                    (decl.bind)(&value).map_err(|reason| FlagError::Invalid {
                        name: decl.name.clone(),
                        value,
                        origin: "environment",
                        reason,
                    })?;
                }
            }
            // No source set the field: the Setting falls back to its default.
        }

        Ok(())
    }
}

/// Merge an optional dotenv file into the process environment. Existing
/// variables are never overridden, which keeps real environment variables
/// above file values in the precedence order.
fn load_env_file() -> Result<(), FlagError> {
    let path = std::env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    if !Path::new(&path).exists() {
        return Ok(());
    }
    dotenvy::from_path(&path).map_err(|source| FlagError::EnvFile { path, source })
}

// Every resolve() reads ENV_FILE from the process environment, so any test
// in this crate that calls resolve() must hold this lock.
#[cfg(test)]
pub(crate) static ENV_FILE_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
