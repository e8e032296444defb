use std::fmt;

use crate::error::TbResult;
use crate::sim::Sim;
use crate::sim_if::ObjectKind;
use crate::trigger::Trigger;

/// Handle to one named signal of the simulated design.
#[derive(Clone)]
pub struct SimObject {
    sim: Sim,
    handle: usize,
    kind: ObjectKind,
}

impl fmt::Debug for SimObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimObject")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

impl SimObject {
    pub(crate) fn from_name(sim: &Sim, full_name: &str) -> TbResult<Self> {
        let handle = sim.host().get_handle_by_name(full_name)?;
        let kind = sim.host().get_kind(handle)?;
        Ok(SimObject {
            sim: sim.clone(),
            handle,
            kind,
        })
    }

    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn sim(&self) -> &Sim {
        &self.sim
    }

    pub fn name(&self) -> TbResult<String> {
        self.sim.host().get_full_name(self.handle)
    }

    pub fn size(&self) -> u8 {
        match self.kind {
            ObjectKind::Int(size) => size,
        }
    }

    pub fn u32(&self) -> TbResult<u32> {
        self.sim.host().get_value(self.handle)
    }

    /// Drives the signal. Bits above the signal width are dropped.
    pub fn set(&self, val: u32) -> TbResult<()> {
        self.sim.host().set_value(self.handle, val)
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(&self) -> Trigger {
        Trigger::rising_edge(self)
    }
    pub fn falling_edge(&self) -> Trigger {
        Trigger::falling_edge(self)
    }
    pub fn edge(&self) -> Trigger {
        Trigger::edge(self)
    }
}
