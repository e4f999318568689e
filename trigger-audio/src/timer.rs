/// Free-running counter with a compare register that raises the timer
/// interrupt (e.g. the RISC-V `mtime`/`mtimecmp` pair).
pub trait CompareTimer {
    /// Current counter value.
    fn now(&self) -> u64;

    /// Schedule the next interrupt at `deadline`. Writing the compare
    /// register also clears a pending timer interrupt.
    fn set_compare(&mut self, deadline: u64);

    /// Unmask the timer interrupt.
    fn enable_interrupt(&mut self);

    /// Mask the timer interrupt.
    fn disable_interrupt(&mut self);

    /// Schedule the next interrupt `ticks` after now.
    fn schedule_in(&mut self, ticks: u64) -> u64 {
        let deadline = self.now().wrapping_add(ticks);
        self.set_compare(deadline);
        deadline
    }
}
