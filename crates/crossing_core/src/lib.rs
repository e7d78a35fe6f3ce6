//! # CROSSING Core
//!
//! Phase coordination for a single traffic signal:
//! - A blocking handoff queue (mutex + condvar, no busy waiting)
//! - A phase controller whose background thread flips Red/Green on a
//!   randomized timer and publishes every change
//!
//! ## Thread Model
//!
//! ```text
//!   [Cycle Thread] ──publish──> HandoffQueue<Phase> ──> Consumer 1 (wait_for_green)
//!     (one writer)                                  ──> Consumer 2 (wait_for_green)
//!                                                   ──> Consumer N ...
//! ```
//!
//! Consumers race for each published phase. A consumer that loses a Green
//! waits for the next one.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crossing_core::{PhaseController, SignalConfig};
//!
//! let light = PhaseController::with_config(SignalConfig::from_file("signal.toml")?)?;
//! light.simulate()?;
//! light.wait_for_green();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod controller;
pub mod error;
pub mod handoff;
pub mod phase;

pub use config::SignalConfig;
pub use controller::{ControllerStats, PhaseController};
pub use error::{SignalError, SignalResult};
pub use handoff::HandoffQueue;
pub use phase::{AtomicPhase, Phase};
