//! Runtime configuration.
//!
//! The configuration is thread-local: the runtime is single-threaded, and every
//! thread (including every test) gets its own independent copy.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Production mode: disables diagnostics, the render guard, source
    /// ranges and performance marks.
    pub production: bool,
    /// Suppress all warnings even outside production.
    pub silent: bool,
    /// Record init/compile performance marks (development only).
    pub performance: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            production: cfg!(not(debug_assertions)),
            silent: false,
            performance: false,
        }
    }
}

impl Config {
    pub fn development() -> Self {
        Self {
            production: false,
            ..Self::default()
        }
    }

    pub fn from_json(source: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(source).map_err(RuntimeError::Config)
    }

    /// Whether development-only checks and diagnostics are active.
    pub fn is_dev(&self) -> bool {
        !self.production
    }

    pub fn perf_enabled(&self) -> bool {
        !self.production && self.performance
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Snapshot of the current thread's configuration.
pub fn get() -> Config {
    CONFIG.with(|c| c.borrow().clone())
}

pub fn set(config: Config) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

pub fn is_dev() -> bool {
    CONFIG.with(|c| c.borrow().is_dev())
}

/// Run `f` with `config` installed, restoring the previous configuration after.
pub fn with_config<R>(config: Config, f: impl FnOnce() -> R) -> R {
    let previous = CONFIG.with(|c| std::mem::replace(&mut *c.borrow_mut(), config));
    let result = f();
    set(previous);
    result
}
