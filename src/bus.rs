//! A minimal register bus.  One request may be outstanding; a mapped device
//! acknowledges it synchronously, one controller tick after it is asserted.
//! Each access is bounded by a cycle budget, which is the only failure mode at
//! this layer -- there is no address validation and no retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// The device did not acknowledge within the access cycle budget.
    #[error("bus access at {addr:#05x} not acknowledged within {budget} clocks")]
    Timeout { addr: u32, budget: u32 },
}

/// A single bus transaction.  `data` is `Some` for a write.
#[derive(Clone, Copy, Debug)]
pub struct BusRequest {
    pub addr: u32,
    pub data: Option<u32>,
}

/// A device mapped onto the bus.  `tick` advances the device one controller
/// clock; a request asserted with `request` is acknowledged by a later
/// `take_response` returning `Some`.
pub trait BusDevice {
    fn tick(&mut self);
    fn request(&mut self, req: BusRequest);
    fn take_response(&mut self) -> Option<u32>;
}

/// Default per-access cycle budget.
pub const DEFAULT_ACK_BUDGET: u32 = 10_000;

/// The bus fabric, reduced to a single master and a single device.  Simulated
/// time only advances while an access is in flight, so a caller polling a
/// status register is also the simulation's clock source.
pub struct SystemBus<D> {
    device: D,
    budget: u32,
    clocks: u64,
}

impl<D: BusDevice> SystemBus<D> {
    pub fn new(device: D) -> Self {
        Self::with_budget(device, DEFAULT_ACK_BUDGET)
    }

    pub fn with_budget(device: D, budget: u32) -> Self {
        Self {
            device,
            budget,
            clocks: 0,
        }
    }

    /// Total controller clocks elapsed across all accesses.
    pub fn clocks(&self) -> u64 {
        self.clocks
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn write(&mut self, addr: u32, data: u32) -> Result<(), BusError> {
        self.access(BusRequest {
            addr,
            data: Some(data),
        })
        .map(|_| ())
    }

    pub fn read(&mut self, addr: u32) -> Result<u32, BusError> {
        self.access(BusRequest { addr, data: None })
    }

    fn access(&mut self, req: BusRequest) -> Result<u32, BusError> {
        self.device.request(req);
        for _ in 0..self.budget {
            self.clocks += 1;
            self.device.tick();
            if let Some(value) = self.device.take_response() {
                return Ok(value);
            }
        }
        tracing::warn!(addr = req.addr, budget = self.budget, "bus access timed out");
        Err(BusError::Timeout {
            addr: req.addr,
            budget: self.budget,
        })
    }
}
