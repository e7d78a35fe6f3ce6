//! # Phase Controller
//!
//! Owns one signal's phase and a background thread that flips it on a
//! randomized timer.
//!
//! ## Architecture
//!
//! ```text
//!   simulate() ──spawn──> [Cycle Thread] ──toggle──> AtomicPhase ──> current_phase()
//!                               │
//!                               └──send──> HandoffQueue<Phase> ──receive──> wait_for_green()
//!                                                                 (consumers race)
//! ```
//!
//! The cycle thread is the only writer. Each published phase is taken by at
//! most one consumer, so concurrent `wait_for_green` callers may skip a
//! Green and return on a later one.

use crate::config::SignalConfig;
use crate::error::{SignalError, SignalResult};
use crate::handoff::HandoffQueue;
use crate::phase::{AtomicPhase, Phase};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Counters for a controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Phase changes published by the cycle thread.
    pub transitions: u64,
    /// Green phases published.
    pub greens_published: u64,
    /// Red phases published.
    pub reds_published: u64,
    /// `wait_for_green` calls that returned on a Green.
    pub greens_delivered: u64,
}

/// Stop request for the cycle thread.
struct StopSignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn raise(&self) {
        *self.raised.lock() = true;
        self.condvar.notify_all();
    }

    fn reset(&self) {
        *self.raised.lock() = false;
    }

    /// Sleeps up to `timeout`. Returns true if a stop was requested.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut raised = self.raised.lock();
        if !*raised {
            self.condvar.wait_for(&mut raised, timeout);
        }
        *raised
    }
}

/// State shared with the cycle thread.
struct Shared {
    phase: AtomicPhase,
    queue: HandoffQueue<Phase>,
    stop: StopSignal,
    stats: Mutex<ControllerStats>,
}

/// A single traffic signal.
///
/// Starts Red. Call [`simulate`](Self::simulate) once to begin cycling;
/// any number of threads may then call [`wait_for_green`](Self::wait_for_green)
/// or [`current_phase`](Self::current_phase). Dropping the controller stops
/// the cycle thread.
///
/// ```rust,ignore
/// let light = Arc::new(PhaseController::new());
/// light.simulate()?;
///
/// let car = Arc::clone(&light);
/// thread::spawn(move || {
///     car.wait_for_green();
///     // cross the intersection
/// });
/// ```
pub struct PhaseController {
    shared: Arc<Shared>,
    config: SignalConfig,
    cycler: Mutex<Option<JoinHandle<()>>>,
}

impl PhaseController {
    /// Creates a Red signal with the default 4-6s cycle.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SignalConfig::default())
    }

    /// Creates a signal with custom timing, starting in
    /// `config.initial_phase`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: SignalConfig) -> SignalResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SignalConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: AtomicPhase::new(config.initial_phase),
                queue: HandoffQueue::new(),
                stop: StopSignal::new(),
                stats: Mutex::new(ControllerStats::default()),
            }),
            config,
            cycler: Mutex::new(None),
        }
    }

    /// Returns the timing this controller runs with.
    #[must_use]
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Snapshot of the current phase. Never blocks.
    #[inline]
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.shared.phase.load()
    }

    /// Blocks until this caller receives a Green transition.
    ///
    /// Red transitions are discarded. Blocks forever if the signal is never
    /// started.
    pub fn wait_for_green(&self) {
        let backoff = self.config.green_retry_backoff();
        while !self.shared.queue.receive().is_green() {
            if let Some(backoff) = backoff {
                thread::sleep(backoff);
            }
        }
        self.shared.stats.lock().greens_delivered += 1;
    }

    /// Like [`wait_for_green`](Self::wait_for_green), but gives up after
    /// `timeout`. Returns true if a Green was received.
    ///
    /// A timeout too large to express as a deadline waits without bound.
    #[must_use]
    pub fn wait_for_green_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_for_green();
            return true;
        };
        let backoff = self.config.green_retry_backoff();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.shared.queue.receive_timeout(remaining) {
                Some(Phase::Green) => {
                    self.shared.stats.lock().greens_delivered += 1;
                    return true;
                }
                Some(Phase::Red) => {
                    if let Some(backoff) = backoff {
                        thread::sleep(backoff.min(remaining));
                    }
                }
                None => return false,
            }
        }
    }

    /// Starts the background cycle thread and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::AlreadyRunning`] if the cycle thread is alive,
    /// or [`SignalError::SpawnFailed`] if the OS refuses the thread.
    pub fn simulate(&self) -> SignalResult<()> {
        let mut cycler = self.cycler.lock();
        if cycler.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::warn!("simulate called while phase cycle is running");
            return Err(SignalError::AlreadyRunning);
        }

        self.shared.stop.reset();
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name("phase-cycle".into())
            .spawn(move || cycle_through_phases(&shared, &config))
            .map_err(|e| SignalError::SpawnFailed(e.to_string()))?;

        tracing::info!(
            min_cycle_ms = self.config.min_cycle_ms,
            max_cycle_ms = self.config.max_cycle_ms,
            "phase cycle started"
        );
        *cycler = Some(handle);
        Ok(())
    }

    /// Returns true while the cycle thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.cycler.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the cycle thread and waits for it to exit.
    ///
    /// The phase keeps its last value. Consumers parked in
    /// `wait_for_green` stay parked. A stopped controller can be restarted
    /// with [`simulate`](Self::simulate).
    pub fn stop(&self) {
        // Held until the thread has exited so `simulate` cannot reset the
        // stop flag under a live cycle thread.
        let mut cycler = self.cycler.lock();
        let Some(handle) = cycler.take() else {
            return;
        };
        self.shared.stop.raise();
        if handle.join().is_err() {
            tracing::warn!("phase cycle thread panicked");
        }
        drop(cycler);
        tracing::info!(phase = %self.current_phase(), "phase cycle stopped");
    }

    /// Returns current statistics.
    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        self.shared.stats.lock().clone()
    }

    /// Number of published phases no consumer has taken yet.
    #[must_use]
    pub fn pending_transitions(&self) -> usize {
        self.shared.queue.len()
    }
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PhaseController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PhaseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseController")
            .field("phase", &self.current_phase())
            .field("running", &self.is_running())
            .field("pending", &self.pending_transitions())
            .finish_non_exhaustive()
    }
}

/// Cycle thread main loop.
///
/// Toggles once the drawn duration has elapsed since the previous toggle,
/// publishes the new phase, then draws the next duration.
fn cycle_through_phases(shared: &Shared, config: &SignalConfig) {
    let mut rng = config.rng();
    let tick = config.tick();
    let mut cycle = config.draw_cycle(&mut rng);
    let mut started = Instant::now();

    while !shared.stop.wait_timeout(tick) {
        if started.elapsed() < cycle {
            continue;
        }

        let phase = shared.phase.toggle();
        {
            let mut stats = shared.stats.lock();
            stats.transitions += 1;
            match phase {
                Phase::Green => stats.greens_published += 1,
                Phase::Red => stats.reds_published += 1,
            }
        }

        cycle = config.draw_cycle(&mut rng);
        started = Instant::now();
        tracing::debug!(%phase, next_cycle = ?cycle, "phase transition");

        shared.queue.send(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_controller() -> PhaseController {
        PhaseController::with_config(SignalConfig::quick()).unwrap()
    }

    #[test]
    fn test_starts_red() {
        let light = PhaseController::new();
        assert_eq!(light.current_phase(), Phase::Red);
        assert!(!light.is_running());
        assert_eq!(light.stats(), ControllerStats::default());
    }

    #[test]
    fn test_current_phase_is_stable_without_toggle() {
        let light = idle_controller();
        let first = light.current_phase();
        for _ in 0..100 {
            assert_eq!(light.current_phase(), first);
        }
    }

    #[test]
    fn test_red_only_never_returns() {
        let light = idle_controller();
        for _ in 0..3 {
            light.shared.queue.send(Phase::Red);
        }

        assert!(!light.wait_for_green_timeout(Duration::from_millis(50)));
        assert_eq!(light.pending_transitions(), 0);

        light.shared.queue.send(Phase::Red);
        light.shared.queue.send(Phase::Green);
        assert!(light.wait_for_green_timeout(Duration::from_millis(50)));
        assert_eq!(light.stats().greens_delivered, 1);
    }

    #[test]
    fn test_wait_for_green_skips_reds() {
        let light = Arc::new(idle_controller());

        let waiter = {
            let light = Arc::clone(&light);
            thread::spawn(move || light.wait_for_green())
        };

        light.shared.queue.send(Phase::Red);
        thread::sleep(Duration::from_millis(30));
        assert!(!waiter.is_finished(), "returned on a Red");

        light.shared.queue.send(Phase::Green);
        waiter.join().unwrap();
        assert_eq!(light.stats().greens_delivered, 1);
    }

    #[test]
    fn test_single_green_wakes_at_most_one_waiter() {
        let light = Arc::new(idle_controller());

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let light = Arc::clone(&light);
                thread::spawn(move || light.wait_for_green_timeout(Duration::from_millis(300)))
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        light.shared.queue.send(Phase::Green);

        let woke = waiters
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&got| got)
            .count();
        assert_eq!(woke, 1);
    }

    #[test]
    fn test_backoff_respects_deadline() {
        let config = SignalConfig {
            green_retry_backoff_ms: 1_000,
            ..SignalConfig::quick()
        };
        let light = PhaseController::with_config(config).unwrap();
        light.shared.queue.send(Phase::Red);

        let start = Instant::now();
        assert!(!light.wait_for_green_timeout(Duration::from_millis(40)));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_simulate_twice_rejected() {
        let light = idle_controller();
        light.simulate().unwrap();
        assert_eq!(light.simulate(), Err(SignalError::AlreadyRunning));
        light.stop();
        assert!(!light.is_running());
    }

    #[test]
    fn test_stop_then_restart() {
        let light = idle_controller();
        light.simulate().unwrap();
        assert!(light.wait_for_green_timeout(Duration::from_secs(2)));
        light.stop();

        let frozen = light.current_phase();
        let published = light.stats().transitions;
        thread::sleep(Duration::from_millis(120));
        assert_eq!(light.current_phase(), frozen);
        assert_eq!(light.stats().transitions, published);

        light.simulate().unwrap();
        assert!(light.is_running());
    }

    #[test]
    fn test_phase_matches_last_published() {
        let light = idle_controller();
        light.simulate().unwrap();
        thread::sleep(Duration::from_millis(200));
        light.stop();

        let stats = light.stats();
        assert!(stats.transitions > 0);
        assert_eq!(stats.transitions, stats.greens_published + stats.reds_published);

        // Starting from Red, an odd number of toggles ends on Green.
        let expected = if stats.transitions % 2 == 1 {
            Phase::Green
        } else {
            Phase::Red
        };
        assert_eq!(light.current_phase(), expected);
        assert_eq!(light.shared.queue.try_receive(), Some(expected));
    }

    #[test]
    fn test_wait_for_green_unbounded_timeout() {
        let light = idle_controller();
        light.simulate().unwrap();
        assert!(light.wait_for_green_timeout(Duration::MAX));
        assert_eq!(light.stats().greens_delivered, 1);
    }

    #[test]
    fn test_stop_races_simulate() {
        let light = Arc::new(idle_controller());

        for _ in 0..50 {
            light.simulate().unwrap();

            let stopper = {
                let light = Arc::clone(&light);
                thread::spawn(move || light.stop())
            };
            let starter = {
                let light = Arc::clone(&light);
                thread::spawn(move || light.simulate())
            };
            stopper.join().unwrap();
            let started = starter.join().unwrap();

            // Let a thread killed by a stray stop request finish exiting.
            thread::sleep(Duration::from_millis(10));
            let has_handle = light.cycler.lock().is_some();
            assert_eq!(has_handle, light.is_running(), "handle kept for a dead cycle thread");
            assert_eq!(started.is_ok(), has_handle);

            light.stop();
            assert!(!light.is_running());
        }
    }

    #[test]
    fn test_initial_phase_from_config() {
        let config = SignalConfig {
            initial_phase: Phase::Green,
            ..SignalConfig::quick()
        };
        let light = PhaseController::with_config(config).unwrap();
        assert_eq!(light.current_phase(), Phase::Green);

        light.simulate().unwrap();
        assert!(light.wait_for_green_timeout(Duration::from_secs(2)));
        light.stop();
        let stats = light.stats();
        assert!(stats.reds_published >= 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SignalConfig {
            min_cycle_ms: 10,
            max_cycle_ms: 1,
            ..SignalConfig::quick()
        };
        assert!(matches!(
            PhaseController::with_config(config),
            Err(SignalError::InvalidConfig(_))
        ));
    }
}
