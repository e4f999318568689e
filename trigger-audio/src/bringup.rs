//! Power-on sequence for the playback core.
//!
//! Runs once from the main thread with every interrupt masked, and unmasks
//! them only after the handler table, trigger input, SPI block and first
//! timer deadline are in place.

use core::fmt::Write;

use embedded_hal::digital::OutputPin;

use crate::bus::{BusFramer, SpiConfig, SpiTx};
use crate::constants::{CORE_CLOCK_HZ, FIRST_TICK_DELAY, INT_TRIGGER, SPI_SCK_HZ};
use crate::error::{Error, Result};
use crate::interrupt::{CpuInterrupts, InterruptController, InterruptRouter};
use crate::state::{Playback, PlaybackFlag};
use crate::timer::CompareTimer;
use crate::trigger::{TriggerHandler, TriggerInput};

/// Console banner printed during bring-up.
pub const BANNER: &str = "\n\tTriggered Audio Player\n\n";

/// Board-level settings consumed by [`bring_up`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BringUpConfig {
    /// PLIC source wired to the trigger input.
    pub trigger_source: u32,
    /// PLIC priority for the trigger (must be non-zero).
    pub trigger_priority: u8,
    /// Core clock feeding the SPI block (Hz).
    pub core_clock_hz: u32,
    /// SPI block configuration. The reported SCK is derived from its
    /// divisor and `core_clock_hz`.
    pub spi: SpiConfig,
    /// Ticks until the first timer interrupt.
    pub first_tick_delay: u64,
    /// Start in `Playing` so the clip plays once at power-on.
    pub autoplay: bool,
}

impl BringUpConfig {
    /// Defaults from [`crate::constants`].
    pub const fn new() -> Self {
        Self::with_clocks(CORE_CLOCK_HZ, SPI_SCK_HZ)
    }

    /// Defaults with a different core and SPI clock.
    pub const fn with_clocks(core_clock_hz: u32, spi_sck_hz: u32) -> Self {
        BringUpConfig {
            trigger_source: INT_TRIGGER,
            trigger_priority: 1,
            core_clock_hz,
            spi: SpiConfig::for_clock(core_clock_hz, spi_sck_hz),
            first_tick_delay: FIRST_TICK_DELAY,
            autoplay: false,
        }
    }
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hardware touched by [`bring_up`].
pub struct Peripherals<'p, C: ?Sized, U: ?Sized, T: ?Sized, P, W: ?Sized, O: ?Sized> {
    /// Interrupt controller.
    pub plic: &'p mut C,
    /// Core interrupt masks.
    pub cpu: &'p mut U,
    /// Sample timer.
    pub timer: &'p mut T,
    /// DAC bus.
    pub bus: &'p mut BusFramer<P>,
    /// Diagnostic console.
    pub console: &'p mut W,
    /// Power-on indicator, driven high once the outputs are set up.
    pub power: Option<&'p mut O>,
}

/// Install the trigger, configure the hardware and unmask interrupts.
///
/// On error the interrupts stay masked.
pub fn bring_up<'a, 'h, const N: usize, F, A, I, C, U, T, P, W, O>(
    config: &BringUpConfig,
    router: &mut InterruptRouter<'a, N>,
    trigger: &'a mut TriggerHandler<'h, F, A, I>,
    hw: Peripherals<'_, C, U, T, P, W, O>,
) -> Result<()>
where
    'h: 'a,
    F: PlaybackFlag + ?Sized + 'a,
    A: OutputPin + 'a,
    I: TriggerInput + 'a,
    C: InterruptController + ?Sized,
    U: CpuInterrupts + ?Sized,
    T: CompareTimer + ?Sized,
    P: SpiTx,
    W: Write + ?Sized,
    O: OutputPin + ?Sized,
{
    let Peripherals {
        plic,
        cpu,
        timer,
        bus,
        console,
        power,
    } = hw;

    cpu.disable_external();
    cpu.disable_timer();

    if config.trigger_priority == 0 {
        return Err(Error::InvalidPriority(0));
    }
    if !InterruptRouter::<'a, N>::in_range(config.trigger_source) {
        return Err(Error::SourceOutOfRange(config.trigger_source));
    }

    trigger.arm().map_err(|_| Error::StatusOutput)?;
    if let Some(power) = power {
        power.set_high().map_err(|_| Error::StatusOutput)?;
    }
    if config.autoplay {
        trigger.state().store(Playback::Playing);
    }
    router.register(config.trigger_source, trigger)?;

    // Console output is diagnostic only.
    let _ = console.write_str(BANNER);

    plic.enable(config.trigger_source);
    plic.set_priority(config.trigger_source, config.trigger_priority);

    bus.configure(&config.spi);
    let _ = writeln!(
        console,
        "core freq= {} Hz SPI fsck= {} Hz div= {}",
        config.core_clock_hz,
        config.spi.actual_sck_hz(config.core_clock_hz),
        config.spi.sck_div
    );

    timer.schedule_in(config.first_tick_delay);

    #[cfg(feature = "defmt")]
    defmt::info!(
        "bring-up done: trigger source {=u32}, SPI div {=u32}",
        config.trigger_source,
        config.spi.sck_div
    );

    cpu.enable_external();
    cpu.enable_timer();
    cpu.enable_global();
    Ok(())
}
