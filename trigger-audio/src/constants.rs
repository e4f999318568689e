//! Board and playback constants.
//!
//! Values match a HiFive1-class FE310 board driving an MCP4921 DAC on SPI1.

/// Frequency of the free-running timer that drives the sample feeder (Hz).
pub const RTC_FREQ_HZ: u32 = 32_768;

/// Recording rate of the sample buffer (Hz).
pub const SAMPLE_RATE_HZ: u32 = 11_025;

/// Timer ticks between samples, rounded to the nearest tick.
///
/// 32 768 / 11 025 ≈ 2.97, so each sample is held for 3 ticks
/// (≈ 10.92 kHz effective rate).
pub const SAMPLE_INTERVAL_TICKS: u64 = ticks_per_sample(RTC_FREQ_HZ, SAMPLE_RATE_HZ);

/// Delay before the first timer interrupt after bring-up (2 s).
pub const FIRST_TICK_DELAY: u64 = 2 * RTC_FREQ_HZ as u64;

/// Nominal core clock feeding the SPI block (Hz).
pub const CORE_CLOCK_HZ: u32 = 264_000_000;

/// Target SPI serial clock for the DAC link (Hz).
pub const SPI_SCK_HZ: u32 = 10_000_000;

/// Number of PLIC sources, including the reserved source 0.
pub const PLIC_NUM_INTERRUPTS: usize = 52;

/// First PLIC source ID assigned to the GPIO bank.
pub const INT_GPIO_BASE: u32 = 8;

/// GPIO offset of the playback trigger input.
pub const TRIGGER_PIN_OFFSET: u32 = 12;

/// PLIC source ID of the playback trigger input.
pub const INT_TRIGGER: u32 = INT_GPIO_BASE + TRIGGER_PIN_OFFSET;

/// GPIO offset of the per-sample status LED (green).
pub const STATUS_LED_OFFSET: u32 = 19;

/// GPIO offset of the trigger activity LED (red).
pub const ACTIVITY_LED_OFFSET: u32 = 22;

/// GPIO offset of the power-on LED (blue).
pub const POWER_LED_OFFSET: u32 = 21;

/// Compute the timer ticks per sample for a given timer and sample rate.
///
/// Rounds to nearest and never returns 0.
pub const fn ticks_per_sample(timer_hz: u32, sample_rate_hz: u32) -> u64 {
    let timer = timer_hz as u64;
    let rate = sample_rate_hz as u64;
    if rate == 0 {
        return 1;
    }
    let ticks = (timer + rate / 2) / rate;
    if ticks == 0 {
        1
    } else {
        ticks
    }
}
