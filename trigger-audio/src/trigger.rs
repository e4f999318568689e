//! Falling-edge playback trigger.
//!
//! Firing while already playing only re-asserts `Playing`; the sample cursor
//! is owned by the feeder and is left where it is, so a retrigger never
//! restarts the clip.

use embedded_hal::digital::OutputPin;

use crate::interrupt::InterruptHandler;
use crate::state::{Playback, PlaybackFlag};

/// GPIO-controller side of the trigger input.
pub trait TriggerInput {
    /// Input enable, output disable, pull-up on, falling-edge interrupt on.
    fn configure_falling_edge(&mut self);

    /// Acknowledge the pending edge so the pin can interrupt again.
    fn clear_pending(&mut self);
}

/// Edge interrupt handler that starts playback.
pub struct TriggerHandler<'a, F: ?Sized, A, I> {
    state: &'a F,
    activity: A,
    input: I,
}

impl<'a, F, A, I> TriggerHandler<'a, F, A, I>
where
    F: PlaybackFlag + ?Sized,
    A: OutputPin,
    I: TriggerInput,
{
    /// Handler writing to `state`, driving `activity` and acknowledging `input`.
    pub fn new(state: &'a F, activity: A, input: I) -> Self {
        TriggerHandler {
            state,
            activity,
            input,
        }
    }

    /// Configure the input pin and switch the activity output off.
    pub fn arm(&mut self) -> Result<(), A::Error> {
        self.input.configure_falling_edge();
        self.activity.set_low()
    }

    /// Playback flag written by this handler.
    pub fn state(&self) -> &'a F {
        self.state
    }

    /// Activity output.
    pub fn activity(&self) -> &A {
        &self.activity
    }

    /// Trigger input.
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Give back the pins.
    pub fn release(self) -> (A, I) {
        (self.activity, self.input)
    }
}

impl<F, A, I> InterruptHandler for TriggerHandler<'_, F, A, I>
where
    F: PlaybackFlag + ?Sized,
    A: OutputPin,
    I: TriggerInput,
{
    fn handle(&mut self) {
        // The indicator is cosmetic; a pin fault must not block playback.
        let _ = self.activity.set_high();
        self.state.store(Playback::Playing);
        self.input.clear_pending();

        #[cfg(feature = "defmt")]
        defmt::debug!("playback triggered");
    }
}


#[cfg(test)]
mod tests {
    use super::sim::SimInput;
    use super::*;
    use crate::sim::SimPin;
    use crate::state::PlaybackState;

    #[test]
    fn arm_configures_input_and_clears_indicator() {
        let state = PlaybackState::default();
        let mut trigger = TriggerHandler::new(&state, SimPin::new(true), SimInput::default());
        trigger.arm().unwrap();
        assert!(trigger.input().configured);
        assert!(!trigger.activity().high);
    }

    #[test]
    fn edge_starts_playback_and_acks() {
        let state = PlaybackState::new(Playback::Idle);
        let input = SimInput {
            pending: true,
            ..Default::default()
        };
        let mut trigger = TriggerHandler::new(&state, SimPin::new(false), input);

        trigger.handle();

        assert_eq!(state.load(), Playback::Playing);
        assert!(trigger.activity().high);
        assert!(!trigger.input().pending);
        assert_eq!(trigger.input().acks, 1);
    }

    #[test]
    fn retrigger_is_idempotent() {
        let state = PlaybackState::new(Playback::Playing);
        let mut trigger = TriggerHandler::new(&state, SimPin::new(false), SimInput::default());

        for _ in 0..3 {
            trigger.handle();
            assert_eq!(state.load(), Playback::Playing);
        }
        assert_eq!(trigger.input().acks, 3);
    }

    #[test]
    fn activity_pin_fault_still_triggers() {
        let state = PlaybackState::default();
        let mut pin = SimPin::new(false);
        pin.fail = true;
        let mut trigger = TriggerHandler::new(&state, pin, SimInput::default());

        trigger.handle();
        assert!(state.is_playing());
        assert_eq!(trigger.input().acks, 1);
    }
}
