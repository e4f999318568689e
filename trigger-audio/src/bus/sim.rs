//! Simulated SPI block and bus peer for host tests.
//!
//! The TX FIFO only shifts a byte out while the caller is waiting on a
//! status bit (or on [`SimSpi::flush`]), so the chip-select mode at the moment
//! each byte hits the wire depends on the caller's polling order, as on
//! hardware. The peer records one frame per CS assertion interval.

use heapless::{Deque, Vec};

use super::config::{CsMode, SpiConfig};
use super::framer::SpiTx;

/// Bytes seen by the peer within one CS assertion.
pub(crate) type Frame = Vec<u8, 4>;

const FIFO_DEPTH: usize = 8;

pub(crate) struct SimSpi {
    config: Option<SpiConfig>,
    cs_mode: CsMode,
    fifo: Deque<u8, FIFO_DEPTH>,
    frames: Vec<Frame, 128>,
    held: Option<Frame>,
    stuck: bool,
    overruns: usize,
}

impl SimSpi {
    pub(crate) const FIFO_DEPTH: usize = FIFO_DEPTH;

    pub(crate) fn new() -> Self {
        SimSpi {
            config: None,
            cs_mode: CsMode::Auto,
            fifo: Deque::new(),
            frames: Vec::new(),
            held: None,
            stuck: false,
            overruns: 0,
        }
    }

    pub(crate) fn config(&self) -> Option<SpiConfig> {
        self.config
    }

    pub(crate) fn cs_mode(&self) -> CsMode {
        self.cs_mode
    }

    /// Frames closed so far.
    pub(crate) fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Two-byte frames decoded as big-endian words.
    pub(crate) fn words(&self) -> Vec<u16, 128> {
        self.frames
            .iter()
            .filter(|f| f.len() == 2)
            .map(|f| u16::from_be_bytes([f[0], f[1]]))
            .collect()
    }

    /// Stop (or resume) shifting bytes out.
    pub(crate) fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Bytes written while the FIFO was full.
    pub(crate) fn overruns(&self) -> usize {
        self.overruns
    }

    /// Shift out everything left in the FIFO.
    pub(crate) fn flush(&mut self) {
        while !self.fifo.is_empty() && !self.stuck {
            self.shift_one();
        }
    }

    fn watermark(&self) -> usize {
        self.config.map_or(0, |c| c.tx_watermark as usize)
    }

    fn shift_one(&mut self) {
        if self.stuck {
            return;
        }
        let Some(byte) = self.fifo.pop_front() else {
            return;
        };
        match self.cs_mode {
            CsMode::Hold => {
                let frame = self.held.get_or_insert_with(Vec::new);
                frame.push(byte).unwrap();
            }
            CsMode::Auto | CsMode::Off => {
                let mut frame = Frame::new();
                frame.push(byte).unwrap();
                self.frames.push(frame).unwrap();
            }
        }
    }
}

impl SpiTx for SimSpi {
    fn configure(&mut self, config: &SpiConfig) {
        self.config = Some(*config);
        self.cs_mode = config.cs_mode;
    }

    fn tx_full(&mut self) -> bool {
        let full = self.fifo.len() >= Self::FIFO_DEPTH;
        if full {
            self.shift_one();
        }
        full
    }

    fn write_tx(&mut self, byte: u8) {
        if self.fifo.push_back(byte).is_err() {
            self.overruns += 1;
        }
    }

    fn set_cs_mode(&mut self, mode: CsMode) {
        if mode != CsMode::Hold {
            if let Some(frame) = self.held.take() {
                self.frames.push(frame).unwrap();
            }
        }
        self.cs_mode = mode;
    }

    fn tx_watermark_pending(&mut self) -> bool {
        let pending = self.fifo.len() < self.watermark();
        if !pending {
            self.shift_one();
        }
        pending
    }
}
