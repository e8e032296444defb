use std::path::PathBuf;

use crate::error::{TbError, TbResult};
use crate::sim::Sim;
use crate::sim_if::scale_time;

/// Default clock period, 1 MHz.
pub const CLK_PERIOD_NS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct TbConfig {
    pub clk_period_ns: u64,
    /// Reset is held for this many clock periods.
    pub reset_cycles: u64,
    /// Idle time at the end of a scenario.
    pub settle_cycles: u64,
    /// A scenario that runs longer than this fails. `None` disables the limit.
    pub timeout_cycles: Option<u64>,
    /// Simulation step as a power of ten seconds.
    pub precision: i8,
    pub seed: u64,
    pub suite_name: String,
    pub junit_path: Option<PathBuf>,
}

impl Default for TbConfig {
    fn default() -> Self {
        Self {
            clk_period_ns: CLK_PERIOD_NS,
            reset_cycles: 2,
            settle_cycles: 5,
            timeout_cycles: Some(10_000),
            precision: -9,
            seed: 1,
            suite_name: "rstb_regfile".to_string(),
            junit_path: None,
        }
    }
}

/// Configuration converted to simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub period: u64,
    pub reset: u64,
    pub settle: u64,
    pub timeout: Option<u64>,
}

impl TbConfig {
    pub fn validate(&self) -> TbResult<()> {
        if self.clk_period_ns == 0 {
            return Err(TbError::Config("clock period must be positive".into()));
        }
        if self.reset_cycles == 0 {
            return Err(TbError::Config("reset duration must be positive".into()));
        }
        if self.reset_cycles < 2 {
            tracing::warn!(
                reset_cycles = self.reset_cycles,
                "reset shorter than two clock periods may not synchronise"
            );
        }
        if self.timeout_cycles == Some(0) {
            return Err(TbError::Config("timeout must be positive".into()));
        }
        scale_time(self.precision)
            .map_err(|_| TbError::Config(format!("unsupported precision 1e{}", self.precision)))?;
        Ok(())
    }

    pub fn timing(&self, sim: &Sim) -> TbResult<Timing> {
        let period = sim
            .steps(self.clk_period_ns, "ns")
            .map_err(|e| TbError::Config(e.to_string()))?;
        if period < 2 {
            return Err(TbError::Config(format!(
                "clock period of {} ns is shorter than two simulation steps",
                self.clk_period_ns
            )));
        }
        let cycles = |what: &str, n: u64| {
            period.checked_mul(n).ok_or_else(|| {
                TbError::Config(format!("{} of {} clock periods is too long", what, n))
            })
        };
        Ok(Timing {
            period,
            reset: cycles("reset", self.reset_cycles)?,
            settle: cycles("settle time", self.settle_cycles)?,
            timeout: self.timeout_cycles.map(|c| cycles("timeout", c)).transpose()?,
        })
    }
}
