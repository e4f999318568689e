//! SPI setup parameters.
//!
//! Written once during bring-up via [`SpiTx::configure`](super::SpiTx::configure)
//! and never changed afterwards.

/// Chip-select behaviour of the SPI block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CsMode {
    /// CS asserts and deasserts around every frame (one byte).
    Auto,
    /// CS stays asserted until the mode is switched back.
    Hold,
    /// Hardware CS control disabled.
    Off,
}

/// Bit order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endian {
    /// Most significant bit first.
    Msb,
    /// Least significant bit first.
    Lsb,
}

/// Data direction of the frame format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Received bytes are pushed to the RX FIFO.
    Rx,
    /// Transmit only; the RX FIFO is not filled.
    Tx,
}

/// Number of data lines per transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// Single data line (classic MOSI/MISO).
    Single,
    /// Two data lines.
    Dual,
    /// Four data lines.
    Quad,
}

/// Frame format register contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameFormat {
    /// Bits per frame. Automatic CS only covers a single frame.
    pub len: u8,
    /// Bit order.
    pub endian: Endian,
    /// Data direction.
    pub direction: Direction,
    /// Line protocol.
    pub protocol: Protocol,
}

impl FrameFormat {
    /// 8-bit, MSB-first, transmit-only, single line.
    pub const DAC_8BIT: FrameFormat = FrameFormat {
        len: 8,
        endian: Endian::Msb,
        direction: Direction::Tx,
        protocol: Protocol::Single,
    };
}

/// Complete SPI block configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Serial clock divisor: `fsck = fin / (2 * (sck_div + 1))`.
    pub sck_div: u32,
    /// Clock phase (CPHA).
    pub clock_phase: bool,
    /// Clock polarity (CPOL).
    pub clock_polarity: bool,
    /// Hardware chip-select line used for the DAC.
    pub cs_id: u8,
    /// Idle level of the chip-select line.
    pub cs_default_high: bool,
    /// Chip-select mode outside of 16-bit transfers.
    pub cs_mode: CsMode,
    /// CS assertion to first SCK edge, in SCK cycles.
    pub delay_cs_to_sck: u8,
    /// Last SCK edge to CS deassertion, in SCK cycles.
    pub delay_sck_to_cs: u8,
    /// Minimum CS inactive time, in SCK cycles.
    pub delay_inter_cs: u8,
    /// Maximum inter-frame delay without CS deassertion.
    pub delay_inter_frame: u8,
    /// Frame format.
    pub frame: FrameFormat,
    /// TX watermark threshold: the watermark is pending while fewer than
    /// this many bytes sit in the TX FIFO. Must be 1 for 16-bit framing.
    pub tx_watermark: u8,
    /// RX watermark threshold (unused, TX only).
    pub rx_watermark: u8,
}

impl SpiConfig {
    /// TX watermark required by [`BusFramer::transmit16`](super::BusFramer::transmit16).
    pub const FRAMING_TX_WATERMARK: u8 = 1;

    /// DAC configuration for the given core clock and target SCK.
    pub const fn for_clock(core_hz: u32, sck_hz: u32) -> Self {
        SpiConfig {
            sck_div: spi_divisor(core_hz, sck_hz),
            clock_phase: false,
            clock_polarity: false,
            cs_id: 0,
            cs_default_high: true,
            cs_mode: CsMode::Auto,
            delay_cs_to_sck: 1,
            delay_sck_to_cs: 1,
            delay_inter_cs: 1,
            delay_inter_frame: 0,
            frame: FrameFormat::DAC_8BIT,
            tx_watermark: Self::FRAMING_TX_WATERMARK,
            rx_watermark: 0,
        }
    }

    /// Serial clock actually produced by `sck_div` at `core_hz`.
    pub const fn actual_sck_hz(&self, core_hz: u32) -> u32 {
        core_hz / (2 * (self.sck_div + 1))
    }
}

/// Divisor that yields the closest SCK at or above `sck_hz`.
///
/// `div = (fin / fsck - 2) / 2`, saturating at 0 when the target is out of
/// reach. A 264 MHz core and a 10 MHz target give 12 (≈ 10.15 MHz).
pub const fn spi_divisor(core_hz: u32, sck_hz: u32) -> u32 {
    if sck_hz == 0 {
        return 0;
    }
    (core_hz / sck_hz).saturating_sub(2) >> 1
}
