//! 8- and 16-bit SPI transmission over single-byte automatic chip-select.
//!
//! The SPI block frames CS automatically only around one 8-bit frame. The
//! DAC expects a 16-bit command with CS held low for all 16 clocks, so
//! [`BusFramer::transmit16`] takes CS into hold mode for the two bytes:
//!
//! ```text
//! CS   ‾‾‾\________________________________/‾‾‾
//! MOSI     [ high byte ][ low byte ]
//!       ^hold   ^wait room  ^wait watermark ^auto
//! ```
//!
//! The high byte may still sit in the TX FIFO when the low byte is queued.
//! Switching back to auto mode before the FIFO drains would deassert CS
//! between the bytes, so the framer waits on the TX watermark, which must be
//! configured to 1 ([`SpiConfig::FRAMING_TX_WATERMARK`]).

use super::config::{CsMode, SpiConfig};
use crate::error::{Error, Result};

/// Register-level access to a transmit-capable SPI block.
pub trait SpiTx {
    /// Apply the full SPI configuration.
    fn configure(&mut self, config: &SpiConfig);

    /// `true` while the TX FIFO cannot accept another byte.
    fn tx_full(&mut self) -> bool;

    /// Push one byte into the TX FIFO.
    fn write_tx(&mut self, byte: u8);

    /// Select the chip-select mode.
    fn set_cs_mode(&mut self, mode: CsMode);

    /// `true` while the TX FIFO holds fewer bytes than the TX watermark.
    fn tx_watermark_pending(&mut self) -> bool;
}

/// Bound on status polling inside the framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryPolicy {
    /// Spin until the condition holds. A stuck bus blocks the caller forever.
    #[default]
    Unbounded,
    /// Poll at most this many times, then fail with [`Error::BusTimeout`].
    Bounded(u32),
}

/// Sends 8-bit and CS-atomic 16-bit frames.
pub struct BusFramer<P> {
    spi: P,
    retry: RetryPolicy,
}

impl<P: SpiTx> BusFramer<P> {
    /// Wrap an SPI block with unbounded waits.
    pub fn new(spi: P) -> Self {
        Self::with_retry(spi, RetryPolicy::Unbounded)
    }

    /// Wrap an SPI block with the given retry policy.
    pub fn with_retry(spi: P, retry: RetryPolicy) -> Self {
        BusFramer { spi, retry }
    }

    /// Write the SPI configuration. Call once, before any transmission.
    pub fn configure(&mut self, config: &SpiConfig) {
        #[cfg(feature = "defmt")]
        if config.tx_watermark != SpiConfig::FRAMING_TX_WATERMARK {
            defmt::warn!("TX watermark {=u8} breaks 16-bit framing", config.tx_watermark);
        }
        self.spi.configure(config);
    }

    /// Current retry policy.
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Send one byte with automatic per-byte chip-select.
    pub fn transmit8(&mut self, byte: u8) -> Result<()> {
        self.wait_for_room()?;
        self.spi.write_tx(byte);
        Ok(())
    }

    /// Send a 16-bit word, MSB first, with CS asserted across both bytes.
    ///
    /// On timeout the chip-select is returned to auto mode before the error
    /// is reported, so the bus is never left held.
    pub fn transmit16(&mut self, word: u16) -> Result<()> {
        let [high, low] = word.to_be_bytes();

        // Bytes queued earlier in auto mode must not join the held frame.
        self.wait_for_drain()?;
        self.spi.set_cs_mode(CsMode::Hold);
        let sent = self.push_held(high, low);
        self.spi.set_cs_mode(CsMode::Auto);

        #[cfg(feature = "defmt")]
        if sent.is_err() {
            defmt::warn!("16-bit frame {=u16:#x} timed out", word);
        }
        sent
    }

    /// Shared access to the wrapped SPI block.
    pub fn spi(&self) -> &P {
        &self.spi
    }

    /// Exclusive access to the wrapped SPI block.
    pub fn spi_mut(&mut self) -> &mut P {
        &mut self.spi
    }

    /// Give back the wrapped SPI block.
    pub fn release(self) -> P {
        self.spi
    }

    fn push_held(&mut self, high: u8, low: u8) -> Result<()> {
        self.wait_for_room()?;
        self.spi.write_tx(high);
        self.wait_for_room()?;
        self.spi.write_tx(low);
        // High byte must be out of the FIFO before CS leaves hold mode.
        self.wait_for_drain()
    }

    fn wait_for_drain(&mut self) -> Result<()> {
        self.wait_until(|spi| spi.tx_watermark_pending())
    }

    fn wait_for_room(&mut self) -> Result<()> {
        self.wait_until(|spi| !spi.tx_full())
    }

    fn wait_until<F>(&mut self, mut ready: F) -> Result<()>
    where
        F: FnMut(&mut P) -> bool,
    {
        match self.retry {
            RetryPolicy::Unbounded => {
                while !ready(&mut self.spi) {
                    core::hint::spin_loop();
                }
                Ok(())
            }
            RetryPolicy::Bounded(limit) => {
                for _ in 0..limit {
                    if ready(&mut self.spi) {
                        return Ok(());
                    }
                    core::hint::spin_loop();
                }
                Err(Error::BusTimeout)
            }
        }
    }
}
