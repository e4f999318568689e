//! Periodic timer handler that streams the sample buffer to the DAC.
//!
//! ## Tick sequence
//!
//! ```text
//! mask timer IRQ ─► compare = now + interval ─┬─ Idle ────────────────┐
//!                                             └─ Playing:             │
//!                                                status low           │
//!                                                cursor < len ?       │
//!                                                  yes: transmit16    │
//!                                                       cursor += 1   │
//!                                                  no:  cursor = 0    │
//!                                                       state = Idle  │
//!                                                status high          │
//!                                                 unmask timer IRQ ◄──┘
//! ```
//!
//! The status pulse width is the per-sample processing time and bounds the
//! highest usable sample rate. The timer runs whether or not playback is
//! active; an idle tick only rearms.

use embedded_hal::digital::OutputPin;

use crate::bus::{BusFramer, SpiTx};
use crate::constants::SAMPLE_INTERVAL_TICKS;
use crate::dac::DacControl;
use crate::error::{Error, Result};
use crate::state::{Playback, PlaybackFlag};
use crate::timer::CompareTimer;

/// What a single timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Not playing; only the timer was rearmed.
    Idle,
    /// One DAC command word was transmitted.
    Sent(u16),
    /// The buffer was exhausted. Nothing was transmitted and playback
    /// returned to idle.
    Finished,
}

/// Sample cursor and playback parameters. Owned by the timer context.
pub struct SampleFeeder<'a> {
    samples: &'a [u16],
    cursor: usize,
    interval: u64,
    control: DacControl,
}

impl<'a> SampleFeeder<'a> {
    /// Feeder over `samples` at the default [`SAMPLE_INTERVAL_TICKS`].
    pub const fn new(samples: &'a [u16]) -> Self {
        SampleFeeder {
            samples,
            cursor: 0,
            interval: SAMPLE_INTERVAL_TICKS,
            control: DacControl::PLAYBACK,
        }
    }

    /// Override the timer interval between samples (minimum 1 tick).
    pub const fn with_interval(mut self, ticks: u64) -> Self {
        self.interval = if ticks == 0 { 1 } else { ticks };
        self
    }

    /// Override the DAC control bits.
    pub const fn with_control(mut self, control: DacControl) -> Self {
        self.control = control;
        self
    }

    /// Index of the next sample to transmit.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timer ticks between samples.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Effective sample rate for a timer running at `timer_hz`.
    pub fn achieved_rate_hz(&self, timer_hz: u32) -> u32 {
        u32::try_from(u64::from(timer_hz) / self.interval).unwrap_or(u32::MAX)
    }

    /// Timer interrupt body.
    ///
    /// The timer is always rearmed first and its interrupt always unmasked
    /// last, including when the transmission fails.
    pub fn on_tick<F, T, P, S>(
        &mut self,
        state: &F,
        timer: &mut T,
        bus: &mut BusFramer<P>,
        status: &mut S,
    ) -> Result<TickOutcome>
    where
        F: PlaybackFlag + ?Sized,
        T: CompareTimer,
        P: SpiTx,
        S: OutputPin,
    {
        timer.disable_interrupt();
        timer.schedule_in(self.interval);

        let outcome = if state.is_playing() {
            self.play(state, bus, status)
        } else {
            Ok(TickOutcome::Idle)
        };

        timer.enable_interrupt();
        outcome
    }

    fn play<F, P, S>(&mut self, state: &F, bus: &mut BusFramer<P>, status: &mut S) -> Result<TickOutcome>
    where
        F: PlaybackFlag + ?Sized,
        P: SpiTx,
        S: OutputPin,
    {
        // The step runs even when the indicator fails; its error wins.
        let lowered = status.set_low();
        let step = self.step(state, bus);
        let released = status.set_high();
        let outcome = step?;
        lowered.and(released).map_err(|_| Error::StatusOutput)?;
        Ok(outcome)
    }

    fn step<F, P>(&mut self, state: &F, bus: &mut BusFramer<P>) -> Result<TickOutcome>
    where
        F: PlaybackFlag + ?Sized,
        P: SpiTx,
    {
        let Some(&sample) = self.samples.get(self.cursor) else {
            self.cursor = 0;
            state.store(Playback::Idle);
            #[cfg(feature = "defmt")]
            defmt::debug!("playback finished after {=usize} samples", self.samples.len());
            return Ok(TickOutcome::Finished);
        };

        let word = self.control.command(sample);
        // Cursor only advances once the word is on the bus; a timed-out
        // sample is retried on the next tick.
        bus.transmit16(word)?;
        self.cursor += 1;
        Ok(TickOutcome::Sent(word))
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::bus::sim::SimSpi;
    use crate::bus::{RetryPolicy, SpiConfig};
    use crate::sim::SimPin;
    use crate::state::PlaybackState;
    use crate::timer::sim::SimTimer;

    struct Rig {
        timer: SimTimer,
        bus: BusFramer<SimSpi>,
        status: SimPin,
    }

    impl Rig {
        fn new() -> Self {
            let mut bus = BusFramer::new(SimSpi::new());
            bus.configure(&SpiConfig::for_clock(264_000_000, 10_000_000));
            Rig {
                timer: SimTimer::new(0),
                bus,
                status: SimPin::new(true),
            }
        }

        fn tick<F: PlaybackFlag>(&mut self, feeder: &mut SampleFeeder<'_>, state: &F) -> Result<TickOutcome> {
            self.timer.fire();
            let out = feeder.on_tick(state, &mut self.timer, &mut self.bus, &mut self.status);
            self.bus.spi_mut().flush();
            out
        }
    }

    const SAMPLES: [u16; 3] = [0x100, 0x200, 0x3FF];

    #[test]
    fn idle_ticks_only_rearm() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Idle);
        let mut feeder = SampleFeeder::new(&SAMPLES);

        for _ in 0..50 {
            assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Idle));
        }

        assert_eq!(feeder.cursor(), 0);
        assert!(rig.bus.spi().frames().is_empty());
        assert_eq!(rig.status.lows, 0);
        assert_eq!(rig.timer.rearms, 50);
        assert!(rig.timer.enabled);
    }

    #[test]
    fn rearm_is_now_plus_interval() {
        let mut rig = Rig::new();
        rig.timer.now = 1_000;
        let state = PlaybackState::default();
        let mut feeder = SampleFeeder::new(&SAMPLES);

        feeder
            .on_tick(&state, &mut rig.timer, &mut rig.bus, &mut rig.status)
            .unwrap();
        assert_eq!(rig.timer.compare, 1_000 + SAMPLE_INTERVAL_TICKS);
        assert!(rig.timer.masked_while_rearming);
    }

    #[test]
    fn custom_interval_is_used() {
        let mut rig = Rig::new();
        let state = PlaybackState::default();
        let mut feeder = SampleFeeder::new(&SAMPLES).with_interval(7);

        feeder
            .on_tick(&state, &mut rig.timer, &mut rig.bus, &mut rig.status)
            .unwrap();
        assert_eq!(rig.timer.compare, 7);
        assert_eq!(SampleFeeder::new(&SAMPLES).with_interval(0).interval(), 1);
    }

    #[test]
    fn cursor_advances_by_one_per_playing_tick() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Playing);
        let ramp: [u16; 16] = core::array::from_fn(|i| i as u16 * 0x100);
        let mut feeder = SampleFeeder::new(&ramp);

        for expected in 1..=ramp.len() {
            let before = feeder.cursor();
            assert!(matches!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Sent(_))));
            assert_eq!(feeder.cursor(), before + 1);
            assert_eq!(feeder.cursor(), expected);
        }
        assert!(state.is_playing());
    }

    #[test]
    fn sent_words_carry_control_bits() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&SAMPLES);

        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Sent(0x7100)));
        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Sent(0x7200)));
        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Sent(0x73FF)));
        assert_eq!(&rig.bus.spi().words()[..], &[0x7100, 0x7200, 0x73FF]);
    }

    #[test]
    fn exhaustion_resets_without_sending() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&SAMPLES);
        for _ in 0..SAMPLES.len() {
            rig.tick(&mut feeder, &state).unwrap();
        }
        assert_eq!(feeder.cursor(), SAMPLES.len());
        let frames_before = rig.bus.spi().frames().len();

        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Finished));
        assert_eq!(feeder.cursor(), 0);
        assert_eq!(state.load(), Playback::Idle);
        assert_eq!(rig.bus.spi().frames().len(), frames_before);

        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Idle));
    }

    #[test]
    fn status_pulses_low_then_high_each_playing_tick() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&SAMPLES);
        for _ in 0..4 {
            rig.tick(&mut feeder, &state).unwrap();
        }

        // Three samples plus the finishing tick.
        assert_eq!(&rig.status.log[..], &[false, true, false, true, false, true, false, true]);
        assert!(rig.status.high);
    }

    #[test]
    fn empty_buffer_finishes_on_first_tick() {
        let mut rig = Rig::new();
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&[]);
        assert!(feeder.is_empty());

        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Finished));
        assert_eq!(state.load(), Playback::Idle);
    }

    #[test]
    fn bus_timeout_keeps_cursor_and_reenables_timer() {
        let mut bus = BusFramer::with_retry(SimSpi::new(), RetryPolicy::Bounded(8));
        bus.configure(&SpiConfig::for_clock(264_000_000, 10_000_000));
        bus.spi_mut().set_stuck(true);
        let mut timer = SimTimer::new(0);
        let mut status = SimPin::new(true);
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&SAMPLES);

        let out = feeder.on_tick(&state, &mut timer, &mut bus, &mut status);
        assert_eq!(out, Err(Error::BusTimeout));
        assert_eq!(feeder.cursor(), 0);
        assert!(timer.enabled);
        assert!(status.high, "status must be released after a failed sample");
        assert!(state.is_playing());
    }

    #[test]
    fn status_pin_failure_is_reported_but_playback_continues() {
        let mut rig = Rig::new();
        rig.status.fail = true;
        let state = PlaybackState::new(Playback::Playing);
        let mut feeder = SampleFeeder::new(&SAMPLES);

        for sent in 1..=SAMPLES.len() {
            assert_eq!(rig.tick(&mut feeder, &state), Err(Error::StatusOutput));
            assert!(rig.timer.enabled);
            assert_eq!(feeder.cursor(), sent);
        }
        assert_eq!(rig.bus.spi().frames().len(), SAMPLES.len());

        // Exhaustion still lands even though every tick reports the pin.
        assert_eq!(rig.tick(&mut feeder, &state), Err(Error::StatusOutput));
        assert_eq!(feeder.cursor(), 0);
        assert_eq!(state.load(), Playback::Idle);

        rig.status.fail = false;
        assert_eq!(rig.tick(&mut feeder, &state), Ok(TickOutcome::Idle));
    }

    #[test]
    fn achieved_rate_for_default_interval() {
        let feeder = SampleFeeder::new(&SAMPLES);
        assert_eq!(feeder.achieved_rate_hz(32_768), 10_922);
        assert_eq!(feeder.len(), 3);
    }

    /// Flag whose first `load` lets a trigger land before the feeder acts.
    struct TriggerDuringTick {
        inner: PlaybackState,
        triggered: Cell<bool>,
    }

    impl PlaybackFlag for TriggerDuringTick {
        fn load(&self) -> Playback {
            let seen = self.inner.load();
            if !self.triggered.replace(true) {
                self.inner.store(Playback::Playing);
            }
            seen
        }

        fn store(&self, state: Playback) {
            self.inner.store(state);
        }
    }

    #[test]
    fn trigger_between_load_and_exhaustion_is_overwritten() {
        let mut rig = Rig::new();
        let flag = TriggerDuringTick {
            inner: PlaybackState::new(Playback::Playing),
            triggered: Cell::new(false),
        };
        let mut feeder = SampleFeeder::new(&[]);

        // The trigger re-asserts Playing after the feeder read the flag; the
        // exhaustion path still stores Idle afterwards.
        assert_eq!(rig.tick(&mut feeder, &flag), Ok(TickOutcome::Finished));
        assert_eq!(flag.load(), Playback::Idle);
    }

    #[test]
    fn trigger_during_idle_tick_is_seen_next_tick() {
        let mut rig = Rig::new();
        let flag = TriggerDuringTick {
            inner: PlaybackState::new(Playback::Idle),
            triggered: Cell::new(false),
        };
        let mut feeder = SampleFeeder::new(&SAMPLES);

        assert_eq!(rig.tick(&mut feeder, &flag), Ok(TickOutcome::Idle));
        assert_eq!(rig.tick(&mut feeder, &flag), Ok(TickOutcome::Sent(0x7100)));
    }
}
