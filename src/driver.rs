//! Host-side scan driver.  Converts hexadecimal test vectors into register
//! transactions against the bridge, strobes the engine, polls for completion
//! and decodes the captured response.
//!
//! The vector wire format: hex is big-endian, the buffer fills least
//! significant byte first, so multi-byte vectors are written (and read back)
//! in reversed byte order.  An odd-length input gains one leading zero nibble,
//! and the matching synthesized nibble is dropped again on decode.

use thiserror::Error;

use crate::bridge::{
    REG_CHAIN_LENGTH, REG_COMMAND, REG_CONTROL, REG_END_STATE, REG_SCAN_STATE, REG_STATUS,
};
use crate::buffer::bytes_for_bits;
use crate::bus::{BusDevice, BusError, SystemBus};
use crate::engine::ScanCommand;
use crate::statemachine::JtagState;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The underlying bus reported a failed access.  Never retried; a failed
    /// scan yields no usable captured data.
    #[error("bus acknowledge failure")]
    Ack(#[from] BusError),
}

/// Bits shifted per SCAN command when holding the TAP in Run-Test/Idle.
const RUNTEST_CHUNK: usize = 1024;

pub struct ScanDriver<D> {
    bus: SystemBus<D>,
    base: u32,
}

impl<D: BusDevice> ScanDriver<D> {
    pub fn new(bus: SystemBus<D>) -> Self {
        Self::with_base(bus, 0)
    }

    /// Drive an engine whose register block starts at `base`.
    pub fn with_base(bus: SystemBus<D>, base: u32) -> Self {
        Self { bus, base }
    }

    pub fn bus(&self) -> &SystemBus<D> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus<D> {
        &mut self.bus
    }

    /// Shift `count` bits of `tdi` through the instruction register and return
    /// the captured response as uppercase hex.  Ends in Run-Test/Idle.
    pub fn scan_ir(&mut self, count: usize, tdi: &str) -> Result<String, DriverError> {
        self.scan(JtagState::ShiftIR, count, tdi)
    }

    /// Shift `count` bits of `tdi` through the data register and return the
    /// captured response as uppercase hex.  Ends in Run-Test/Idle.
    pub fn scan_dr(&mut self, count: usize, tdi: &str) -> Result<String, DriverError> {
        self.scan(JtagState::ShiftDR, count, tdi)
    }

    fn scan(
        &mut self,
        scan_state: JtagState,
        count: usize,
        tdi: &str,
    ) -> Result<String, DriverError> {
        tracing::debug!(?scan_state, count, tdi, "scan");
        let mut bytes = parse_hex(tdi);
        // The buffer fills least significant byte first, so the most
        // significant supplied byte must be written last.
        if bytes.len() > 1 {
            bytes.reverse();
        }
        let len = bytes_for_bits(count);
        bytes.truncate(len);
        bytes.resize(len, 0);
        for (i, byte) in bytes.iter().enumerate() {
            self.bus.write(self.base + i as u32, u32::from(*byte))?;
        }

        self.run(ScanCommand::Scan, scan_state, JtagState::Idle, count as u16)?;

        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(self.bus.read(self.base + i as u32)? as u8);
        }
        if out.len() > 1 {
            out.reverse();
        }
        let mut hex = render_hex(&out);
        // Whole-byte readback can synthesize one extra leading nibble when
        // `count` is not a multiple of 4; drop it.
        let digits = count.div_ceil(4);
        if hex.len() > digits {
            hex.drain(..hex.len() - digits);
        }
        tracing::debug!(tdo = %hex, "scan complete");
        Ok(hex)
    }

    /// Hold the TAP in Run-Test/Idle for exactly `ticks` TCK cycles, issued as
    /// idle scans in 1024-bit chunks.
    pub fn runtest(&mut self, ticks: usize) -> Result<(), DriverError> {
        let mut remaining = ticks;
        while remaining > 0 {
            let chunk = remaining.min(RUNTEST_CHUNK);
            self.run(
                ScanCommand::Scan,
                JtagState::Idle,
                JtagState::Idle,
                chunk as u16,
            )?;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Navigate the TAP to `end` without shifting.
    pub fn state(&mut self, end: JtagState) -> Result<(), DriverError> {
        self.run(ScanCommand::State, end, end, 0)
    }

    /// Force Test-Logic-Reset with five TMS-high clocks.
    pub fn tap_reset(&mut self) -> Result<(), DriverError> {
        self.run(ScanCommand::Reset, JtagState::Reset, JtagState::Reset, 0)
    }

    /// Program the control block, strobe go, poll busy until the command
    /// completes, then drop the strobe.  Buffer writes must already be
    /// acknowledged; the engine does not order them itself.
    fn run(
        &mut self,
        command: ScanCommand,
        scan_state: JtagState,
        end_state: JtagState,
        chain_length: u16,
    ) -> Result<(), DriverError> {
        let base = self.base;
        self.bus
            .write(base + REG_SCAN_STATE, scan_state.code().into())?;
        self.bus
            .write(base + REG_END_STATE, end_state.code().into())?;
        self.bus.write(base + REG_CHAIN_LENGTH, chain_length.into())?;
        self.bus.write(base + REG_COMMAND, command as u32)?;
        self.bus.write(base + REG_CONTROL, 1)?;
        // No deadline here: an accepted command always runs to completion, and
        // every status read advances the fabric by its acknowledge latency, so
        // this loop is also what drives the engine forward.
        loop {
            let status = self.bus.read(base + REG_STATUS)?;
            if status & 1 == 0 {
                break;
            }
        }
        self.bus.write(base + REG_CONTROL, 0)?;
        Ok(())
    }
}

/// Parse big-endian hex into bytes, left-padding odd-length input with one
/// zero nibble.  Non-hex characters read as zero.
fn parse_hex(hex: &str) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(hex.len() + 1);
    if hex.len() % 2 != 0 {
        nibbles.push(0);
    }
    for c in hex.chars() {
        nibbles.push(c.to_digit(16).unwrap_or(0) as u8);
    }
    nibbles.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect()
}

fn render_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0xf)] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_length_hex_gains_a_leading_zero_nibble() {
        assert_eq!(parse_hex("A55"), vec![0x0a, 0x55]);
        assert_eq!(parse_hex("0A55"), vec![0x0a, 0x55]);
        assert_eq!(parse_hex("0"), vec![0x00]);
    }

    #[test]
    fn hex_renders_uppercase() {
        assert_eq!(render_hex(&[0xde, 0xad, 0x0f]), "DEAD0F");
        assert_eq!(render_hex(&[]), "");
    }
}
