//! The device-under-test side of the TAP.  The engine presents TMS and TDI and
//! samples TDO one TCK cycle at a time through the `Dut` trait; the models
//! here stand in for real silicon on the other end of the port.

use std::collections::VecDeque;

pub trait Dut {
    /// Run one full TCK cycle with the given TMS and TDI values and return the
    /// TDO value sampled during the cycle.
    fn pulse(&mut self, tms: bool, tdi: bool) -> bool;
}

/// Echoes TDI back on TDO after a fixed latency measured in TCK cycles.  With
/// zero latency TDO mirrors TDI combinationally; otherwise the delay line is
/// pre-filled with zeros.
pub struct Loopback {
    delay: VecDeque<bool>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    pub fn with_latency(cycles: usize) -> Self {
        let mut delay = VecDeque::with_capacity(cycles);
        delay.resize(cycles, false);
        Self { delay }
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl Dut for Loopback {
    fn pulse(&mut self, _tms: bool, tdi: bool) -> bool {
        match self.delay.pop_front() {
            Some(out) => {
                self.delay.push_back(tdi);
                out
            }
            None => tdi,
        }
    }
}

/// Records every pulse while forwarding to the wrapped model.
pub struct Trace<D> {
    pub inner: D,
    /// One `(tms, tdi)` entry per TCK, in order.
    pub pulses: Vec<(bool, bool)>,
}

impl<D> Trace<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            pulses: Vec::new(),
        }
    }
}

impl<D: Dut> Dut for Trace<D> {
    fn pulse(&mut self, tms: bool, tdi: bool) -> bool {
        self.pulses.push((tms, tdi));
        self.inner.pulse(tms, tdi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_latency_mirrors_tdi() {
        let mut dut = Loopback::new();
        assert!(dut.pulse(false, true));
        assert!(!dut.pulse(true, false));
    }

    #[test]
    fn latency_delays_by_n_cycles() {
        let mut dut = Loopback::with_latency(2);
        assert!(!dut.pulse(false, true));
        assert!(!dut.pulse(false, true));
        assert!(dut.pulse(false, false));
        assert!(dut.pulse(false, false));
        assert!(!dut.pulse(false, false));
    }

    #[test]
    fn trace_records_in_order() {
        let mut dut = Trace::new(Loopback::new());
        dut.pulse(true, false);
        dut.pulse(false, true);
        assert_eq!(dut.pulses, vec![(true, false), (false, true)]);
    }
}
