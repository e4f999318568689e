//! # trigger-audio
//!
//! A `no_std`, zero-allocation, interrupt-driven sample player for bare-metal
//! microcontrollers. A falling edge on an input pin starts streaming a fixed
//! sample buffer to a 12-bit SPI DAC (MCP4921), one sample per timer
//! interrupt, until the buffer is exhausted.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | State | [`state`] | Atomic `Idle`/`Playing` flag shared by both handlers |
//! | Bus | [`bus`] | SPI setup and CS-atomic 16-bit framing |
//! | DAC | [`dac`] | MCP4921 command word |
//! | Dispatch | [`interrupt`] | PLIC source table, claim/dispatch/complete |
//! | Handlers | [`feeder`] / [`trigger`] | Timer tick and edge trigger |
//! | Setup | [`bringup`] | Power-on sequence |
//!
//! Every hardware boundary is a trait ([`bus::SpiTx`], [`timer::CompareTimer`],
//! [`interrupt::InterruptController`], [`interrupt::CpuInterrupts`],
//! [`trigger::TriggerInput`], `embedded_hal::digital::OutputPin`), so the core
//! runs unchanged on the host under test.
//!
//! ## Data flow
//!
//! ```text
//! edge ─► PLIC ─► InterruptRouter::dispatch ─► TriggerHandler ─► state = Playing
//!
//! mtimecmp ─► SampleFeeder::on_tick ─► state? ─► BusFramer::transmit16 ─► DAC
//!                                              └► end of buffer: state = Idle
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! static STATE: PlaybackState = PlaybackState::new(Playback::Idle);
//!
//! // Machine external interrupt entry:
//! if let Err(e) = router.dispatch(&mut plic) {
//!     exit(e.exit_code());
//! }
//!
//! // Machine timer interrupt entry:
//! match feeder.on_tick(&STATE, &mut clint, &mut bus, &mut green_led) {
//!     Ok(TickOutcome::Finished) => finished += 1,
//!     Ok(_) => {}
//!     // The timer stays armed; a timed-out sample is retried next tick.
//!     Err(Error::BusTimeout) => dropped += 1,
//!     // Indicator only, the sample still went out.
//!     Err(e) => log_fault(e),
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | `defmt::Format` on public types and state-transition logging |
//!
//! ## Playback parameters
//!
//! - **Sample rate:** 11 025 Hz source, 3 ticks of a 32 768 Hz timer
//!   ([`constants::SAMPLE_INTERVAL_TICKS`])
//! - **Sample format:** `u16` words, low 12 bits used
//! - **DAC word:** `(sample & 0x0FFF) | 0x7000`

#![no_std]

pub mod bringup;
pub mod bus;
pub mod constants;
pub mod dac;
pub mod error;
pub mod feeder;
pub mod interrupt;
pub mod state;
pub mod timer;
pub mod trigger;

#[cfg(test)]
mod sim;

pub use error::{Error, Result};
pub use feeder::{SampleFeeder, TickOutcome};
pub use state::{Playback, PlaybackFlag, PlaybackState};
