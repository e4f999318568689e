//! MCP4921 12-bit DAC command word.
//!
//! ```text
//!  15   14    13    12    11 .............. 0
//! A/B  BUF  /GA  /SHDN   D11 ............. D0
//! ```
//!
//! The MCP4921 is single-channel, so A/B is always 0 (channel A).

/// Bit 15: channel select (0 = A).
pub const CMD_CHANNEL_B: u16 = 1 << 15;
/// Bit 14: buffered VREF input.
pub const CMD_BUFFERED: u16 = 1 << 14;
/// Bit 13: gain select, active low (1 = 1x, 0 = 2x).
pub const CMD_GAIN_1X: u16 = 1 << 13;
/// Bit 12: shutdown, active low (1 = output active).
pub const CMD_ACTIVE: u16 = 1 << 12;
/// Bits 11:0: data field.
pub const DATA_MASK: u16 = 0x0FFF;

/// Control half of the DAC command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacControl {
    /// Buffer the reference input.
    pub buffered: bool,
    /// 1x gain (`false` selects 2x).
    pub unity_gain: bool,
    /// Output driver enabled (`false` shuts the output down).
    pub active: bool,
}

impl DacControl {
    /// Buffered reference, 1x gain, output active: `0x7000`.
    pub const PLAYBACK: DacControl = DacControl {
        buffered: true,
        unity_gain: true,
        active: true,
    };

    /// Control bits in their command-word positions.
    pub const fn bits(&self) -> u16 {
        let mut bits = 0;
        if self.buffered {
            bits |= CMD_BUFFERED;
        }
        if self.unity_gain {
            bits |= CMD_GAIN_1X;
        }
        if self.active {
            bits |= CMD_ACTIVE;
        }
        bits
    }

    /// Full 16-bit command for one sample. Bits above 11 of `sample` are
    /// discarded.
    pub const fn command(&self, sample: u16) -> u16 {
        (sample & DATA_MASK) | self.bits()
    }
}

impl Default for DacControl {
    fn default() -> Self {
        Self::PLAYBACK
    }
}
