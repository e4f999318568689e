//! External interrupt dispatch.
//!
//! A fixed table maps PLIC source IDs to handlers. Source 0 is the
//! controller's "no interrupt" value and is never valid. The table is filled
//! during bring-up; afterwards only [`InterruptRouter::dispatch`] runs.
//!
//! ```text
//! claim() ─► id in 1..N ? ─ yes ─► handlers[id] (no-op if empty) ─► complete(id)
//!                         └ no ──► Err(InvalidInterruptSource)  (fatal)
//! ```
//!
//! The controller does not hand out another source until `complete` is
//! written, so dispatch is strictly single-level.

use crate::error::{Error, Result};

/// An interrupt handler. Runs to completion in interrupt context.
pub trait InterruptHandler {
    /// Service the interrupt.
    fn handle(&mut self);
}

/// Platform-level interrupt controller (claim/complete handshake).
pub trait InterruptController {
    /// Claim the highest-priority pending source. 0 means none.
    fn claim(&mut self) -> u32;

    /// Signal that `source` has been serviced.
    fn complete(&mut self, source: u32);

    /// Allow `source` to interrupt.
    fn enable(&mut self, source: u32);

    /// Set the priority of `source`. Priority 0 never fires.
    fn set_priority(&mut self, source: u32, priority: u8);
}

/// Core-local interrupt masks (e.g. RISC-V `mie.MEIE`, `mie.MTIE`, `mstatus.MIE`).
pub trait CpuInterrupts {
    /// Mask external interrupts.
    fn disable_external(&mut self);

    /// Unmask external interrupts.
    fn enable_external(&mut self);

    /// Mask the timer interrupt.
    fn disable_timer(&mut self);

    /// Unmask the timer interrupt.
    fn enable_timer(&mut self);

    /// Set the global interrupt enable.
    fn enable_global(&mut self);
}

/// Source-ID to handler table with `N` slots (slot 0 reserved).
pub struct InterruptRouter<'a, const N: usize> {
    handlers: [Option<&'a mut dyn InterruptHandler>; N],
}

impl<'a, const N: usize> InterruptRouter<'a, N> {
    /// Table with every source bound to the no-op handler.
    pub fn new() -> Self {
        InterruptRouter {
            handlers: core::array::from_fn(|_| None),
        }
    }

    /// `true` when `source` names a usable slot.
    pub fn in_range(source: u32) -> bool {
        source >= 1 && (source as usize) < N
    }

    /// Bind `handler` to `source`, replacing any previous binding.
    pub fn register(&mut self, source: u32, handler: &'a mut dyn InterruptHandler) -> Result<()> {
        let slot = self.slot(source).ok_or(Error::SourceOutOfRange(source))?;
        *slot = Some(handler);
        Ok(())
    }

    /// `true` if a handler is bound to `source`.
    pub fn is_registered(&self, source: u32) -> bool {
        Self::in_range(source) && self.handlers.get(source as usize).is_some_and(Option::is_some)
    }

    /// Claim one interrupt, run its handler, and complete it.
    ///
    /// Returns the serviced source. An out-of-range claim runs nothing and is
    /// not completed; the caller must treat it as fatal.
    pub fn dispatch<C: InterruptController + ?Sized>(&mut self, controller: &mut C) -> Result<u32> {
        let source = controller.claim();
        let slot = match self.slot(source) {
            Some(slot) => slot,
            None => {
                #[cfg(feature = "defmt")]
                defmt::error!("claimed interrupt source {=u32} outside handler table", source);
                return Err(Error::InvalidInterruptSource(source));
            }
        };
        if let Some(handler) = slot.as_deref_mut() {
            handler.handle();
        }
        controller.complete(source);
        Ok(source)
    }

    fn slot(&mut self, source: u32) -> Option<&mut Option<&'a mut dyn InterruptHandler>> {
        if Self::in_range(source) {
            self.handlers.get_mut(source as usize)
        } else {
            None
        }
    }
}

impl<const N: usize> Default for InterruptRouter<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
