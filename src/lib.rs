//! This crate simulates a hardware test bench in which an ATE host drives a
//! JTAG Test Access Port over a memory-mapped register bus.  At the lowest
//! level, `statemachine` holds the 16-state TAP graph as two constant tables
//! and `buffer` stores scan vectors bit-for-bit.  The `engine` walks the TAP
//! and shifts vectors one bit per controller clock against a device model
//! behind the `Dut` trait.
//!
//! The next level up is the `bridge`, which exposes the engine as a register
//! block on the `bus`: a 1 KiB scan-buffer window plus scan/end state, chain
//! length, command, go and busy registers.  The `driver` is the host side: it
//! encodes hexadecimal test vectors into buffer writes, strobes a command,
//! polls busy and decodes the captured response.  Finally, `session` serves a
//! small line protocol (STARTSIM/MW/MR/STOPSIM/EXIT) so an external host can
//! run the whole bench over a socket.
//!
//! # Example
//! ```
//! use jtag_ate::bridge::RegisterBridge;
//! use jtag_ate::bus::SystemBus;
//! use jtag_ate::driver::ScanDriver;
//! use jtag_ate::dut::Loopback;
//!
//! let bridge = RegisterBridge::new(Loopback::new());
//! let mut driver = ScanDriver::new(SystemBus::new(bridge));
//! let tdo = driver.scan_dr(8, "55").unwrap();
//! assert_eq!(tdo, "55");
//! ```

pub mod bridge;
pub mod buffer;
pub mod bus;
pub mod driver;
pub mod dut;
pub mod engine;
pub mod session;
pub mod statemachine;
