/// Errors surfaced by the playback core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The SPI transmit FIFO or watermark never became ready within the
    /// configured retry bound.
    BusTimeout,
    /// The interrupt controller handed out a source ID outside the handler
    /// table. Unrecoverable: the platform entry point must halt.
    InvalidInterruptSource(u32),
    /// A handler or priority was configured for a source ID outside the
    /// handler table (or for the reserved source 0).
    SourceOutOfRange(u32),
    /// Priority 0 disables a source on the PLIC.
    InvalidPriority(u8),
    /// A status output pin reported a failure.
    StatusOutput,
}

impl Error {
    /// Exit code the platform layer reports for a fatal error.
    ///
    /// An invalid claimed source exits with `1 + source`; everything else
    /// exits with 1.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Self::InvalidInterruptSource(source) => {
                i32::try_from(source).map_or(i32::MAX, |s| s.saturating_add(1))
            }
            _ => 1,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusTimeout => write!(f, "SPI bus timed out"),
            Self::InvalidInterruptSource(id) => {
                write!(f, "claimed interrupt source {id} is outside the handler table")
            }
            Self::SourceOutOfRange(id) => write!(f, "interrupt source {id} out of range"),
            Self::InvalidPriority(p) => write!(f, "interrupt priority {p} never fires"),
            Self::StatusOutput => write!(f, "status output pin failed"),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;
