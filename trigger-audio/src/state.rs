//! Shared playback flag.
//!
//! The flag is the only datum written from more than one interrupt context
//! (the trigger handler sets it, the sample feeder clears it). It is a single
//! `AtomicU8` so a port to a preemptive or multi-core target stays correct.
//!
//! Handlers take the flag through the [`PlaybackFlag`] trait rather than the
//! concrete type, which lets a test harness interpose on `load`/`store` and
//! replay a trigger landing between two feeder steps.

use core::sync::atomic::{AtomicU8, Ordering};

/// Playback state values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Playback {
    /// No playback in progress; timer ticks only rearm.
    Idle = 0,
    /// The feeder transmits one sample per tick.
    Playing = 1,
}

impl Playback {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Playback::Idle,
            _ => Playback::Playing,
        }
    }
}

/// Load/store access to the shared playback state.
pub trait PlaybackFlag {
    /// Read the current state.
    fn load(&self) -> Playback;

    /// Overwrite the current state.
    fn store(&self, state: Playback);

    /// `true` while the feeder should transmit.
    fn is_playing(&self) -> bool {
        self.load() == Playback::Playing
    }
}

/// Atomic playback flag, suitable for a `static`.
pub struct PlaybackState {
    bits: AtomicU8,
}

impl PlaybackState {
    /// Create a flag holding `initial`.
    pub const fn new(initial: Playback) -> Self {
        PlaybackState {
            bits: AtomicU8::new(initial as u8),
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(Playback::Idle)
    }
}

impl PlaybackFlag for PlaybackState {
    fn load(&self) -> Playback {
        Playback::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn store(&self, state: Playback) {
        self.bits.store(state as u8, Ordering::Release);
    }
}
