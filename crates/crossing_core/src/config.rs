//! # Signal Configuration
//!
//! Timing for the phase cycle. Loaded once at startup, usually from TOML:
//!
//! ```toml
//! min_cycle_ms = 4000
//! max_cycle_ms = 6000
//! tick_ms = 1
//! green_retry_backoff_ms = 0
//! seed = 42
//! initial_phase = "red"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::{SignalError, SignalResult};
use crate::phase::Phase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a phase controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    /// Shortest cycle duration (ms, inclusive).
    pub min_cycle_ms: u64,
    /// Longest cycle duration (ms, inclusive).
    pub max_cycle_ms: u64,
    /// Sleep slice of the cycling thread (ms). Bounds stop latency.
    pub tick_ms: u64,
    /// Pause between a Red receive and the next receive in
    /// `wait_for_green` (ms). Zero disables the pause.
    pub green_retry_backoff_ms: u64,
    /// Fixed RNG seed. `None` seeds from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Phase the signal shows before its first toggle.
    pub initial_phase: Phase,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_cycle_ms: 4_000,
            max_cycle_ms: 6_000,
            tick_ms: 1,
            green_retry_backoff_ms: 0,
            seed: None,
            initial_phase: Phase::Red,
        }
    }
}

impl SignalConfig {
    /// Short cycles for tests and demos: a toggle every 20-50ms.
    #[must_use]
    pub const fn quick() -> Self {
        Self {
            min_cycle_ms: 20,
            max_cycle_ms: 50,
            tick_ms: 1,
            green_retry_backoff_ms: 0,
            seed: None,
            initial_phase: Phase::Red,
        }
    }

    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::ConfigParse`] on malformed TOML and
    /// [`SignalError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(text: &str) -> SignalResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SignalError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> SignalResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SignalError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that the timing values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> SignalResult<()> {
        if self.tick_ms == 0 {
            return Err(SignalError::InvalidConfig("tick_ms must be > 0".into()));
        }
        if self.max_cycle_ms == 0 {
            return Err(SignalError::InvalidConfig("max_cycle_ms must be > 0".into()));
        }
        if self.min_cycle_ms > self.max_cycle_ms {
            return Err(SignalError::InvalidConfig(format!(
                "min_cycle_ms ({}) exceeds max_cycle_ms ({})",
                self.min_cycle_ms, self.max_cycle_ms
            )));
        }
        Ok(())
    }

    /// Sleep slice of the cycling thread.
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Backoff between unsuccessful receives, if enabled.
    #[must_use]
    pub const fn green_retry_backoff(&self) -> Option<Duration> {
        if self.green_retry_backoff_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.green_retry_backoff_ms))
        }
    }

    /// Builds the RNG used for cycle durations.
    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Draws one cycle duration uniformly from the configured range.
    pub(crate) fn draw_cycle<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.min_cycle_ms..=self.max_cycle_ms))
    }
}
