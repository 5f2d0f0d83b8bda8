//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::editor::autosave::DEFAULT_AUTOSAVE_DELAY;
use crate::editor::drag::DEFAULT_THROTTLE;

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Autosave debounce delay (default: 1500 ms).
    pub autosave_delay: Duration,

    /// Minimum interval between drag target recomputations (default: 16 ms).
    pub drag_throttle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            drag_throttle: DEFAULT_THROTTLE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let autosave_delay = match lookup("TESSERA_AUTOSAVE_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .context("TESSERA_AUTOSAVE_DELAY_MS must be a whole number of milliseconds")?,
            ),
            None => defaults.autosave_delay,
        };

        let drag_throttle = match lookup("TESSERA_DRAG_THROTTLE_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .context("TESSERA_DRAG_THROTTLE_MS must be a whole number of milliseconds")?,
            ),
            None => defaults.drag_throttle,
        };

        Ok(Self {
            autosave_delay,
            drag_throttle,
        })
    }
}
