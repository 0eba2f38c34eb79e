//! Memory-mapped front end for the scan engine.  The scan buffer appears as a
//! byte-per-address window below the control registers.  Every bus request is
//! acknowledged one controller tick after it is asserted; out-of-range
//! addresses are not validated -- unmapped reads return zero and unmapped
//! writes are dropped, matching the reference decoder's behavior.

use crate::bus::{BusDevice, BusRequest};
use crate::dut::Dut;
use crate::engine::{ScanCommand, TapEngine};
use crate::statemachine::JtagState;

/// Scan buffer window, one byte per address.
pub const BUFFER_BASE: u32 = 0x000;
pub const BUFFER_END: u32 = 0x3ff;
/// Start state for a SCAN command (low 4 bits).
pub const REG_SCAN_STATE: u32 = 0x400;
/// End state for SCAN and STATE commands (low 4 bits).
pub const REG_END_STATE: u32 = 0x401;
/// Vector length in bits (low 16 bits).
pub const REG_CHAIN_LENGTH: u32 = 0x402;
/// Control register; bit 0 is the go strobe.
pub const REG_CONTROL: u32 = 0x403;
/// Status register, read-only; bit 0 is busy, bits 4-7 the current TAP state.
pub const REG_STATUS: u32 = 0x404;
/// Command register (low 3 bits): 0 none, 1 scan, 2 reset, 3 state.
pub const REG_COMMAND: u32 = 0x405;
/// Extra controller ticks per TCK half-period (low 16 bits).
pub const REG_CLOCK_DIVIDER: u32 = 0x406;

pub struct RegisterBridge<D> {
    engine: TapEngine<D>,
    pending: Option<BusRequest>,
    response: Option<u32>,
}

impl<D: Dut> RegisterBridge<D> {
    pub fn new(dut: D) -> Self {
        Self {
            engine: TapEngine::new(dut),
            pending: None,
            response: None,
        }
    }

    pub fn engine(&self) -> &TapEngine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TapEngine<D> {
        &mut self.engine
    }

    fn write_reg(&mut self, addr: u32, value: u32) {
        if (BUFFER_BASE..=BUFFER_END).contains(&addr) {
            self.engine
                .buffer_mut()
                .write_byte(addr as usize, value as u8);
            return;
        }
        let ctrl = &mut self.engine.ctrl;
        match addr {
            REG_SCAN_STATE => ctrl.scan_state = JtagState::from_code(value as u8),
            REG_END_STATE => ctrl.end_state = JtagState::from_code(value as u8),
            REG_CHAIN_LENGTH => ctrl.chain_length = value as u16,
            REG_CONTROL => ctrl.go = value & 1 != 0,
            REG_COMMAND => ctrl.command = ScanCommand::from_code(value as u8),
            REG_CLOCK_DIVIDER => ctrl.clock_divider = value as u16,
            // Status is read-only; everything else is unmapped.
            _ => {}
        }
    }

    fn read_reg(&self, addr: u32) -> u32 {
        let ctrl = &self.engine.ctrl;
        match addr {
            BUFFER_BASE..=BUFFER_END => u32::from(self.engine.buffer().read_byte(addr as usize)),
            REG_SCAN_STATE => u32::from(ctrl.scan_state.code()),
            REG_END_STATE => u32::from(ctrl.end_state.code()),
            REG_CHAIN_LENGTH => u32::from(ctrl.chain_length),
            REG_CONTROL => u32::from(ctrl.go),
            REG_STATUS => u32::from(ctrl.busy) | u32::from(ctrl.cur_state.code()) << 4,
            REG_COMMAND => ctrl.command as u32,
            REG_CLOCK_DIVIDER => u32::from(ctrl.clock_divider),
            _ => 0,
        }
    }
}

impl<D: Dut> BusDevice for RegisterBridge<D> {
    fn tick(&mut self) {
        self.engine.tick();
        // Acknowledge one tick after the request was asserted.  Completing the
        // request after the engine tick means a control write takes effect on
        // the following clock, as it would through a real register stage.
        if let Some(req) = self.pending.take() {
            self.response = Some(match req.data {
                Some(value) => {
                    self.write_reg(req.addr, value);
                    0
                }
                None => self.read_reg(req.addr),
            });
        }
    }

    fn request(&mut self, req: BusRequest) {
        self.pending = Some(req);
        self.response = None;
    }

    fn take_response(&mut self) -> Option<u32> {
        self.response.take()
    }
}
