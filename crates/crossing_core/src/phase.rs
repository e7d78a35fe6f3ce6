//! # Signal Phase
//!
//! The two-valued phase of a traffic signal, plus a lock-free cell that the
//! cycling thread writes and any caller may read.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Phase of a traffic signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Phase {
    /// Traffic must stop.
    #[default]
    Red = 0,
    /// Traffic may proceed.
    Green = 1,
}

impl Phase {
    /// Returns the opposite phase.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    /// Returns true for [`Phase::Green`].
    #[inline]
    #[must_use]
    pub const fn is_green(self) -> bool {
        matches!(self, Self::Green)
    }

    /// Returns true for [`Phase::Red`].
    #[inline]
    #[must_use]
    pub const fn is_red(self) -> bool {
        matches!(self, Self::Red)
    }

    /// Decodes the `repr(u8)` value. Only the low bit is significant.
    #[inline]
    const fn from_bits(bits: u8) -> Self {
        if bits & 1 == 0 {
            Self::Red
        } else {
            Self::Green
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Green => f.write_str("green"),
        }
    }
}

/// Atomically readable and writable [`Phase`].
pub struct AtomicPhase {
    bits: AtomicU8,
}

impl AtomicPhase {
    /// Creates a cell holding `phase`.
    #[must_use]
    pub const fn new(phase: Phase) -> Self {
        Self {
            bits: AtomicU8::new(phase as u8),
        }
    }

    /// Reads the current phase.
    #[inline]
    #[must_use]
    pub fn load(&self) -> Phase {
        Phase::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Overwrites the current phase.
    #[inline]
    pub fn store(&self, phase: Phase) {
        self.bits.store(phase as u8, Ordering::Release);
    }

    /// Flips the phase and returns the new value.
    #[inline]
    pub fn toggle(&self) -> Phase {
        Phase::from_bits(self.bits.fetch_xor(1, Ordering::AcqRel)).toggled()
    }
}

impl Default for AtomicPhase {
    fn default() -> Self {
        Self::new(Phase::default())
    }
}

impl fmt::Debug for AtomicPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicPhase").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_alternates() {
        assert_eq!(Phase::Red.toggled(), Phase::Green);
        assert_eq!(Phase::Green.toggled(), Phase::Red);
        assert!(Phase::Green.is_green());
        assert!(Phase::Red.is_red());
    }

    #[test]
    fn test_default_is_red() {
        assert_eq!(Phase::default(), Phase::Red);
        assert_eq!(AtomicPhase::default().load(), Phase::Red);
    }

    #[test]
    fn test_atomic_toggle_returns_new_phase() {
        let cell = AtomicPhase::new(Phase::Red);
        assert_eq!(cell.toggle(), Phase::Green);
        assert_eq!(cell.load(), Phase::Green);
        assert_eq!(cell.toggle(), Phase::Red);
        assert_eq!(cell.load(), Phase::Red);

        cell.store(Phase::Green);
        assert_eq!(cell.load(), Phase::Green);
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::Red.to_string(), "red");
        assert_eq!(Phase::Green.to_string(), "green");
    }
}
