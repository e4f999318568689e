//! Host-side stand-ins for GPIO used by unit and integration tests.

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use heapless::Vec;

#[derive(Debug)]
pub(crate) struct SimPinError;

impl digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin that records its level history.
pub(crate) struct SimPin {
    pub(crate) high: bool,
    /// First 64 levels written (`true` = high).
    pub(crate) log: Vec<bool, 64>,
    pub(crate) lows: usize,
    pub(crate) highs: usize,
    pub(crate) fail: bool,
}

impl SimPin {
    pub(crate) fn new(high: bool) -> Self {
        SimPin {
            high,
            log: Vec::new(),
            lows: 0,
            highs: 0,
            fail: false,
        }
    }

    fn drive(&mut self, high: bool) -> Result<(), SimPinError> {
        if self.fail {
            return Err(SimPinError);
        }
        self.high = high;
        let _ = self.log.push(high);
        if high {
            self.highs += 1;
        } else {
            self.lows += 1;
        }
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}
