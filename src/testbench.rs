use crate::error::{TbError, TbResult};
use crate::executor::JoinHandle;
use crate::signal::SimObject;
use crate::trigger::Trigger;
use crate::RstbResult;

/*
 * CLOCK
 */
/// Low and high phase of a clock with `period` steps.
pub fn clock_phases(period: u64) -> TbResult<(u64, u64)> {
    if period < 2 {
        return Err(TbError::Config(format!(
            "clock period of {} steps can't be split into two phases",
            period
        )));
    }
    let high_t = period / 2;
    let low_t = period - high_t;
    if period % 2 != 0 {
        tracing::warn!(
            period,
            high = high_t,
            low = low_t,
            "clock period not divisible by 2"
        );
    }
    Ok((low_t, high_t))
}

/// Toggles `clk` forever, starting low. Stops when the test is torn down.
pub async fn clock(clk: SimObject, period: u64) -> RstbResult {
    let (low_t, high_t) = clock_phases(period)?;
    let sim = clk.sim().clone();
    loop {
        clk.set(0)?;
        Trigger::timer_steps(&sim, low_t).await?;
        clk.set(1)?;
        Trigger::timer_steps(&sim, high_t).await?;
    }
}

/// Forks [`clock`]. A bad period is reported here, before anything runs.
pub fn start_clock(clk: &SimObject, period: u64) -> TbResult<JoinHandle> {
    clock_phases(period)?;
    Ok(clk.sim().fork(clock(clk.clone(), period), "clock"))
}

/*
 * RESET
 */
/// Holds the active-low `rstn` at 0 for `duration` steps, then releases it.
///
/// The caller picks a duration covering at least two clock periods.
pub async fn reset(rstn: &SimObject, duration: u64) -> TbResult<()> {
    if duration == 0 {
        return Err(TbError::Config("reset duration must be positive".into()));
    }
    rstn.set(0)?;
    Trigger::timer_steps(rstn.sim(), duration).await?;
    rstn.set(1)?;
    rstn.sim().log("Reset complete.");
    Ok(())
}
