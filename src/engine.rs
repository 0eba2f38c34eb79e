//! The command-driven scan engine.  One `tick` is one controller clock; the
//! engine walks the TAP through `statemachine` routes and shifts vector bits
//! between the `ScanBuffer` and the device under test.
//!
//! Commands are latched off a rising edge of the `go` strobe and always run to
//! completion; the only synchronization signal exposed back to the host is the
//! `busy` flag.

use crate::buffer::ScanBuffer;
use crate::dut::Dut;
use crate::statemachine::{self, JtagState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScanCommand {
    None = 0,
    Scan = 1,
    Reset = 2,
    State = 3,
}

impl ScanCommand {
    /// Decode the low 3 bits of a command register write.  Unassigned codes
    /// decode to `None`.
    pub fn from_code(code: u8) -> Self {
        match code & 0x7 {
            1 => ScanCommand::Scan,
            2 => ScanCommand::Reset,
            3 => ScanCommand::State,
            _ => ScanCommand::None,
        }
    }
}

/// Register-visible control and status fields, one block per engine.  The
/// bridge writes the inputs; the engine owns `busy` and `cur_state`.
pub struct ControlBlock {
    pub command: ScanCommand,
    pub scan_state: JtagState,
    pub end_state: JtagState,
    /// Vector length in bits for a SCAN command.
    pub chain_length: u16,
    /// Extra controller ticks per TCK half-period; zero runs the TAP at the
    /// controller rate.
    pub clock_divider: u16,
    pub go: bool,
    pub busy: bool,
    pub cur_state: JtagState,
}

impl ControlBlock {
    fn new() -> Self {
        Self {
            command: ScanCommand::None,
            scan_state: JtagState::Idle,
            end_state: JtagState::Idle,
            chain_length: 0,
            clock_divider: 0,
            go: false,
            busy: false,
            cur_state: JtagState::Reset,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Idle,
    PreShift,
    ClearBuffer,
    GotoStart,
    Shift,
    GotoState,
    TapReset,
    Done,
}

pub struct TapEngine<D> {
    pub ctrl: ControlBlock,
    buffer: ScanBuffer,
    dut: D,
    phase: Phase,
    prev_go: bool,
    trigger: bool,
    // Command inputs latched at dispatch so register writes mid-command have
    // no effect until the next trigger.
    scan_state: JtagState,
    end_state: JtagState,
    chain_length: usize,
    scan_tms: bool,
    end_tms: bool,
    bit_index: usize,
    reset_count: u8,
    // Clock-divider prescaler countdown; a TCK is emitted when it hits zero.
    wait: u32,
}

impl<D: Dut> TapEngine<D> {
    pub fn new(dut: D) -> Self {
        Self {
            ctrl: ControlBlock::new(),
            buffer: ScanBuffer::new(),
            dut,
            phase: Phase::Idle,
            prev_go: false,
            trigger: false,
            scan_state: JtagState::Idle,
            end_state: JtagState::Idle,
            chain_length: 0,
            scan_tms: false,
            end_tms: false,
            bit_index: 0,
            reset_count: 0,
            wait: 0,
        }
    }

    pub fn buffer(&self) -> &ScanBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ScanBuffer {
        &mut self.buffer
    }

    pub fn dut(&self) -> &D {
        &self.dut
    }

    pub fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    pub fn busy(&self) -> bool {
        self.ctrl.busy
    }

    /// Advance the engine by one controller clock.
    pub fn tick(&mut self) {
        let rising = self.ctrl.go && !self.prev_go;
        self.prev_go = self.ctrl.go;
        // A strobe while a command is in flight is ignored; the Done hold
        // below means a new edge cannot occur before the host has seen
        // completion and dropped the strobe.
        if rising && self.phase == Phase::Idle {
            self.trigger = true;
        }

        match self.phase {
            Phase::Idle => {
                if self.trigger {
                    self.trigger = false;
                    self.dispatch();
                }
            }
            Phase::PreShift => {
                self.scan_state = self.ctrl.scan_state;
                self.end_state = self.ctrl.end_state;
                self.chain_length = usize::from(self.ctrl.chain_length);
                self.phase = Phase::ClearBuffer;
            }
            Phase::ClearBuffer => {
                self.bit_index = 0;
                // TMS held at the shift state's self-loop while shifting, and
                // at the first move toward the end state on the final bit.
                self.scan_tms = statemachine::route(self.scan_state, self.scan_state);
                self.end_tms = statemachine::route(self.scan_state, self.end_state);
                self.wait = 0;
                self.phase = Phase::GotoStart;
            }
            Phase::GotoStart => {
                if self.ctrl.cur_state == self.scan_state {
                    self.phase = if self.chain_length == 0 {
                        Phase::GotoState
                    } else {
                        Phase::Shift
                    };
                } else if self.tck_due() {
                    self.step_toward(self.scan_state);
                }
            }
            Phase::Shift => {
                if self.tck_due() {
                    let last = self.bit_index + 1 == self.chain_length;
                    let tms = if last { self.end_tms } else { self.scan_tms };
                    let tdi = self.buffer.read_bit(self.bit_index);
                    let tdo = self.dut.pulse(tms, tdi);
                    self.buffer.write_bit(self.bit_index, tdo);
                    self.ctrl.cur_state = statemachine::next(self.ctrl.cur_state, tms);
                    self.bit_index += 1;
                    if last {
                        self.phase = Phase::GotoState;
                    }
                }
            }
            Phase::GotoState => {
                if self.ctrl.cur_state == self.end_state {
                    self.finish();
                } else if self.tck_due() {
                    self.step_toward(self.end_state);
                }
            }
            Phase::TapReset => {
                if self.tck_due() {
                    // TMS high for 5 TCKs forces Test-Logic-Reset from any state.
                    self.dut.pulse(true, true);
                    self.ctrl.cur_state = statemachine::next(self.ctrl.cur_state, true);
                    self.reset_count += 1;
                    if self.reset_count == 5 {
                        self.finish();
                    }
                }
            }
            Phase::Done => {
                if !self.ctrl.go {
                    self.phase = Phase::Idle;
                }
            }
        }
    }

    fn dispatch(&mut self) {
        match self.ctrl.command {
            // Strobing with no command selected is a no-op.
            ScanCommand::None => return,
            ScanCommand::Scan => {
                self.phase = Phase::PreShift;
            }
            ScanCommand::Reset => {
                self.reset_count = 0;
                self.wait = 0;
                self.phase = Phase::TapReset;
            }
            ScanCommand::State => {
                self.end_state = self.ctrl.end_state;
                self.wait = 0;
                self.phase = Phase::GotoState;
            }
        }
        self.ctrl.busy = true;
        tracing::debug!(command = ?self.ctrl.command, "command accepted");
    }

    /// Prescaler for TCK-emitting phases: one pulse every
    /// `2 * clock_divider + 1` ticks.
    fn tck_due(&mut self) -> bool {
        if self.wait == 0 {
            self.wait = 2 * u32::from(self.ctrl.clock_divider);
            true
        } else {
            self.wait -= 1;
            false
        }
    }

    fn step_toward(&mut self, target: JtagState) {
        let tms = statemachine::route(self.ctrl.cur_state, target);
        // TDI is held high during navigation; nothing samples it there.
        self.dut.pulse(tms, true);
        self.ctrl.cur_state = statemachine::next(self.ctrl.cur_state, tms);
        tracing::trace!(state = ?self.ctrl.cur_state, tms, "tap step");
    }

    fn finish(&mut self) {
        self.ctrl.busy = false;
        self.phase = Phase::Done;
        tracing::debug!(state = ?self.ctrl.cur_state, "command complete");
    }
}
