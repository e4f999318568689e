//! Synchronous serial bus to the DAC.
//!
//! - [`config`]: one-time SPI setup ([`SpiConfig`], clock divisor)
//! - [`framer`]: [`BusFramer`] with 8-bit and CS-atomic 16-bit frames

pub mod config;
pub mod framer;

#[cfg(test)]
pub(crate) mod sim;

pub use config::{spi_divisor, CsMode, FrameFormat, SpiConfig};
pub use framer::{BusFramer, RetryPolicy, SpiTx};
