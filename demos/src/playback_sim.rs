//! Triggered playback on simulated HiFive1 peripherals.
//!
//! Runs the real bring-up sequence, interrupt router, trigger handler and
//! sample feeder against host models of the PLIC, CLINT, SPI1 and GPIO
//! blocks, stepping the 32 768 Hz timer one tick at a time.
//!
//! ```text
//!   button edge ──► PLIC ──► handle_m_ext_interrupt ──► TriggerHandler
//!   mtimecmp    ──► handle_m_time_interrupt ──► SampleFeeder ──► SPI1 ──► DAC
//! ```
//!
//! Run with `RUST_LOG=debug` (or `trace` for every CS edge).

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::VecDeque;

use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, OutputPin};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use trigger_audio::bringup::{bring_up, BringUpConfig, Peripherals};
use trigger_audio::bus::{BusFramer, CsMode, RetryPolicy, SpiConfig, SpiTx};
use trigger_audio::constants::{
    ACTIVITY_LED_OFFSET, FIRST_TICK_DELAY, INT_TRIGGER, PLIC_NUM_INTERRUPTS, POWER_LED_OFFSET,
    RTC_FREQ_HZ, STATUS_LED_OFFSET,
};
use trigger_audio::dac::DATA_MASK;
use trigger_audio::interrupt::{CpuInterrupts, InterruptController, InterruptRouter};
use trigger_audio::timer::CompareTimer;
use trigger_audio::trigger::{TriggerHandler, TriggerInput};
use trigger_audio::{Playback, PlaybackState, SampleFeeder, TickOutcome};

// ── Clip ─────────────────────────────────────────────────────────────

const CLIP_LEN: usize = 32;

/// One triangle period spanning the full 12-bit range.
const CLIP: [u16; CLIP_LEN] = triangle();

const fn triangle() -> [u16; CLIP_LEN] {
    let mut out = [0u16; CLIP_LEN];
    let half = CLIP_LEN / 2;
    let mut i = 0;
    while i < CLIP_LEN {
        let pos = if i < half { i } else { CLIP_LEN - i };
        out[i] = (pos * DATA_MASK as usize / half) as u16;
        i += 1;
    }
    out
}

// ── Shared state ─────────────────────────────────────────────────────

static STATE: PlaybackState = PlaybackState::new(Playback::Idle);

/// Edges latched by the GPIO block, waiting to be claimed via the PLIC.
static LATCHED: Mutex<RefCell<VecDeque<u32>>> = Mutex::new(RefCell::new(VecDeque::new()));

/// GPIO falling-edge interrupt enable for the trigger pin.
static FALL_IE: AtomicBool = AtomicBool::new(false);

// ── CSR model ────────────────────────────────────────────────────────

const MIE_MTIE: u32 = 1 << 7;
const MIE_MEIE: u32 = 1 << 11;

/// `mie` / `mstatus.MIE`, shared by the CLINT and core models.
#[derive(Default)]
struct Csr {
    mie: Cell<u32>,
    global: Cell<bool>,
}

impl Csr {
    fn set(&self, bit: u32, on: bool) {
        let mie = self.mie.get();
        self.mie.set(if on { mie | bit } else { mie & !bit });
    }

    fn taken(&self, bit: u32) -> bool {
        self.global.get() && self.mie.get() & bit != 0
    }
}

struct Hart<'c> {
    csr: &'c Csr,
}

impl CpuInterrupts for Hart<'_> {
    fn disable_external(&mut self) {
        self.csr.set(MIE_MEIE, false);
    }

    fn enable_external(&mut self) {
        self.csr.set(MIE_MEIE, true);
    }

    fn disable_timer(&mut self) {
        self.csr.set(MIE_MTIE, false);
    }

    fn enable_timer(&mut self) {
        self.csr.set(MIE_MTIE, true);
    }

    fn enable_global(&mut self) {
        self.csr.global.set(true);
    }
}

// ── CLINT ────────────────────────────────────────────────────────────

struct Clint<'c> {
    csr: &'c Csr,
    mtime: u64,
    mtimecmp: u64,
}

impl Clint<'_> {
    fn pending(&self) -> bool {
        self.mtime >= self.mtimecmp
    }
}

impl CompareTimer for Clint<'_> {
    fn now(&self) -> u64 {
        self.mtime
    }

    fn set_compare(&mut self, deadline: u64) {
        self.mtimecmp = deadline;
    }

    fn enable_interrupt(&mut self) {
        self.csr.set(MIE_MTIE, true);
    }

    fn disable_interrupt(&mut self) {
        self.csr.set(MIE_MTIE, false);
    }
}

// ── PLIC ─────────────────────────────────────────────────────────────

struct Plic {
    enabled: [bool; PLIC_NUM_INTERRUPTS],
    priority: [u8; PLIC_NUM_INTERRUPTS],
    in_service: Option<u32>,
}

impl Plic {
    fn new() -> Self {
        Plic {
            enabled: [false; PLIC_NUM_INTERRUPTS],
            priority: [0; PLIC_NUM_INTERRUPTS],
            in_service: None,
        }
    }

    fn armed(&self, source: u32) -> bool {
        let idx = source as usize;
        self.enabled.get(idx).copied().unwrap_or(false)
            && self.priority.get(idx).copied().unwrap_or(0) > 0
    }

    /// Level of the external interrupt line into the hart.
    fn pending(&self) -> bool {
        self.in_service.is_none()
            && critical_section::with(|cs| LATCHED.borrow_ref(cs).iter().any(|&s| self.armed(s)))
    }
}

impl InterruptController for Plic {
    fn claim(&mut self) -> u32 {
        let source = critical_section::with(|cs| {
            let mut latched = LATCHED.borrow_ref_mut(cs);
            let pos = latched.iter().position(|&s| self.armed(s))?;
            latched.remove(pos)
        })
        .unwrap_or(0);
        if source != 0 {
            self.in_service = Some(source);
        }
        source
    }

    fn complete(&mut self, source: u32) {
        if self.in_service == Some(source) {
            self.in_service = None;
        } else {
            warn!(source, "complete for a source that was not claimed");
        }
    }

    fn enable(&mut self, source: u32) {
        if let Some(slot) = self.enabled.get_mut(source as usize) {
            *slot = true;
        }
    }

    fn set_priority(&mut self, source: u32, priority: u8) {
        if let Some(slot) = self.priority.get_mut(source as usize) {
            *slot = priority;
        }
    }
}

// ── SPI1 + MCP4921 ───────────────────────────────────────────────────

const SPI_FIFO_DEPTH: usize = 8;

/// SPI1 with an MCP4921 on CS0. Bytes leave the FIFO only while the core
/// polls a status register.
struct Spi1 {
    config: Option<SpiConfig>,
    cs_mode: CsMode,
    fifo: VecDeque<u8>,
    held: Vec<u8>,
    /// Latched DAC codes.
    dac: Vec<u16>,
    /// CS intervals that did not carry exactly 16 bits.
    torn_frames: usize,
}

impl Spi1 {
    fn new() -> Self {
        Spi1 {
            config: None,
            cs_mode: CsMode::Auto,
            fifo: VecDeque::with_capacity(SPI_FIFO_DEPTH),
            held: Vec::new(),
            dac: Vec::new(),
            torn_frames: 0,
        }
    }

    fn shift_one(&mut self) {
        let Some(byte) = self.fifo.pop_front() else {
            return;
        };
        match self.cs_mode {
            CsMode::Hold => self.held.push(byte),
            CsMode::Auto | CsMode::Off => self.close_frame(&[byte]),
        }
    }

    fn close_frame(&mut self, bytes: &[u8]) {
        match *bytes {
            [high, low] => {
                let word = u16::from_be_bytes([high, low]);
                trace!("DAC frame {word:#06x}");
                self.dac.push(word & DATA_MASK);
            }
            _ => {
                self.torn_frames += 1;
                warn!(len = bytes.len(), "CS interval without a 16-bit word");
            }
        }
    }
}

impl SpiTx for Spi1 {
    fn configure(&mut self, config: &SpiConfig) {
        debug!(
            sck_div = config.sck_div,
            tx_watermark = config.tx_watermark,
            "SPI1 configured"
        );
        self.config = Some(*config);
        self.cs_mode = config.cs_mode;
    }

    fn tx_full(&mut self) -> bool {
        let full = self.fifo.len() >= SPI_FIFO_DEPTH;
        if full {
            self.shift_one();
        }
        full
    }

    fn write_tx(&mut self, byte: u8) {
        if self.fifo.len() < SPI_FIFO_DEPTH {
            self.fifo.push_back(byte);
        } else {
            warn!(byte, "TX FIFO overrun");
        }
    }

    fn set_cs_mode(&mut self, mode: CsMode) {
        if mode != CsMode::Hold && !self.held.is_empty() {
            let held = std::mem::take(&mut self.held);
            self.close_frame(&held);
        }
        trace!(?mode, "CS mode");
        self.cs_mode = mode;
    }

    fn tx_watermark_pending(&mut self) -> bool {
        let mark = self.config.map_or(0, |c| usize::from(c.tx_watermark));
        let pending = self.fifo.len() < mark;
        if !pending {
            self.shift_one();
        }
        pending
    }
}

// ── GPIO ─────────────────────────────────────────────────────────────

struct Led {
    name: &'static str,
    offset: u32,
    high: bool,
    pulses: usize,
}

impl Led {
    fn new(name: &'static str, offset: u32, high: bool) -> Self {
        Led {
            name,
            offset,
            high,
            pulses: 0,
        }
    }
}

impl ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.pulses += 1;
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            trace!(led = self.name, gpio = self.offset, "high");
        }
        self.high = true;
        Ok(())
    }
}

/// Trigger pin on the GPIO block.
struct TriggerPin {
    acks: usize,
}

impl TriggerInput for TriggerPin {
    fn configure_falling_edge(&mut self) {
        FALL_IE.store(true, Ordering::Release);
    }

    fn clear_pending(&mut self) {
        self.acks += 1;
    }
}

/// Ground the trigger pin for one edge.
fn press_trigger() {
    if FALL_IE.load(Ordering::Acquire) {
        critical_section::with(|cs| LATCHED.borrow_ref_mut(cs).push_back(INT_TRIGGER));
    }
}

// ── Console ──────────────────────────────────────────────────────────

struct Uart0;

impl core::fmt::Write for Uart0 {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{s}");
        Ok(())
    }
}

// ── Interrupt entry points ───────────────────────────────────────────

fn handle_m_ext_interrupt(router: &mut InterruptRouter<'_, PLIC_NUM_INTERRUPTS>, plic: &mut Plic) {
    match router.dispatch(plic) {
        Ok(source) => debug!(source, "external interrupt serviced"),
        Err(e) => {
            error!(%e, "unrecoverable interrupt");
            std::process::exit(e.exit_code());
        }
    }
}

fn handle_m_time_interrupt(
    feeder: &mut SampleFeeder<'_>,
    clint: &mut Clint<'_>,
    bus: &mut BusFramer<Spi1>,
    status: &mut Led,
) -> Option<TickOutcome> {
    match feeder.on_tick(&STATE, clint, bus, status) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(%e, cursor = feeder.cursor(), "sample dropped");
            None
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let csr = Csr::default();
    let mut hart = Hart { csr: &csr };
    let mut clint = Clint {
        csr: &csr,
        mtime: 0,
        mtimecmp: u64::MAX,
    };
    let mut plic = Plic::new();
    let mut bus = BusFramer::with_retry(Spi1::new(), RetryPolicy::Bounded(1_000));
    let mut uart = Uart0;
    let mut status = Led::new("green", STATUS_LED_OFFSET, true);
    let mut power = Led::new("blue", POWER_LED_OFFSET, false);
    let mut trigger = TriggerHandler::new(
        &STATE,
        Led::new("red", ACTIVITY_LED_OFFSET, false),
        TriggerPin { acks: 0 },
    );
    let mut router: InterruptRouter<'_, PLIC_NUM_INTERRUPTS> = InterruptRouter::new();

    let config = BringUpConfig::new();
    let setup = bring_up(
        &config,
        &mut router,
        &mut trigger,
        Peripherals {
            plic: &mut plic,
            cpu: &mut hart,
            timer: &mut clint,
            bus: &mut bus,
            console: &mut uart,
            power: Some(&mut power),
        },
    );
    if let Err(e) = setup {
        error!(%e, "bring-up failed");
        std::process::exit(e.exit_code());
    }

    let mut feeder = SampleFeeder::new(&CLIP);
    info!(
        samples = feeder.len(),
        interval = feeder.interval(),
        rate_hz = feeder.achieved_rate_hz(RTC_FREQ_HZ),
        "feeder ready"
    );

    // First press, a retrigger mid-clip, then a replay once idle.
    let clip_ticks = CLIP_LEN as u64 * feeder.interval();
    let presses = [
        FIRST_TICK_DELAY + 10,
        FIRST_TICK_DELAY + 10 + clip_ticks / 2,
        FIRST_TICK_DELAY + 10 + clip_ticks * 3,
    ];
    let end = FIRST_TICK_DELAY + 10 + clip_ticks * 5;

    let mut finished = 0;
    while clint.mtime < end {
        clint.mtime += 1;

        if presses.contains(&clint.mtime) {
            debug!(tick = clint.mtime, "trigger pressed");
            press_trigger();
        }
        if csr.taken(MIE_MEIE) && plic.pending() {
            handle_m_ext_interrupt(&mut router, &mut plic);
        }
        if csr.taken(MIE_MTIE) && clint.pending() {
            if let Some(TickOutcome::Finished) =
                handle_m_time_interrupt(&mut feeder, &mut clint, &mut bus, &mut status)
            {
                finished += 1;
                info!(tick = clint.mtime, "clip finished");
            }
        }
    }

    let (activity, pin) = trigger.release();
    let spi = bus.release();
    info!(
        dac_words = spi.dac.len(),
        torn_frames = spi.torn_frames,
        status_pulses = status.pulses,
        trigger_acks = pin.acks,
        activity_on = activity.high,
        power_on = power.high,
        finished,
        "simulation done"
    );
    if let Some(peak) = spi.dac.iter().max() {
        debug!(peak, first = ?spi.dac.first(), "DAC range");
    }
}
