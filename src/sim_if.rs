use crate::error::{TbError, TbResult};
use crate::trigger::EdgeKind;

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq)]
pub enum SimCallback {
    /// Absolute simulation time in steps.
    Time(u64),
    /// Value change on a signal handle.
    Edge(usize),
}

/// A callback the host reports as fired. Edge callbacks carry the kind of transition seen.
pub type Fired = (SimCallback, Option<EdgeKind>);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Fixed-width integer signal.
    Int(u8),
}

/// Boundary to the simulation host.
///
/// The harness never advances time on its own: it registers callbacks and the
/// run loop asks the host to `eval` the current delta or `advance` to the
/// next scheduled time.
pub trait SimIf {
    fn get_value(&self, handle: usize) -> TbResult<u32>;
    fn set_value(&self, handle: usize, value: u32) -> TbResult<()>;
    fn get_handle_by_name(&self, name: &str) -> TbResult<usize>;
    fn get_kind(&self, handle: usize) -> TbResult<ObjectKind>;
    fn get_full_name(&self, handle: usize) -> TbResult<String>;
    fn get_sim_time_steps(&self) -> u64;
    fn get_sim_precision(&self) -> i8;
    fn register_callback(&self, cb: SimCallback) -> TbResult<usize>;
    fn cancel_callback(&self, cb_hdl: usize) -> TbResult<()>;
    /// Settle the current time step once and report edges on watched signals.
    fn eval(&self) -> Vec<Fired>;
    /// Earliest scheduled time, without moving there.
    fn next_time(&self) -> Option<u64>;
    /// Move to the next scheduled time. `None` if nothing is scheduled.
    fn advance(&self) -> Option<Vec<Fired>>;

    fn log(&self, msg: &str) {
        tracing::info!(sim_time = self.get_sim_time_steps(), "{}", msg);
    }
    fn get_sim_time(&self, unit: &str) -> TbResult<f64> {
        // this function does not preserve precision, so don't use carelessly
        let t = self.get_sim_time_steps() as f64;
        let precision = self.get_sim_precision();
        Ok(ldexp10(t, precision - time_scale(unit)?))
    }
    fn get_sim_steps(&self, time: f64, unit: &str) -> TbResult<u64> {
        let precision = self.get_sim_precision();
        let steps = ldexp10(time, time_scale(unit)? - precision);
        if steps % 1.0 == 0.0 && steps >= 0.0 {
            Ok(steps as u64)
        } else {
            Err(TbError::TimeRounding {
                time,
                unit: unit.to_string(),
            })
        }
    }
}

pub(crate) fn time_scale(unit: &str) -> TbResult<i8> {
    match unit {
        "fs" => Ok(-15),
        "ps" => Ok(-12),
        "ns" => Ok(-9),
        "us" => Ok(-6),
        "ms" => Ok(-3),
        "sec" => Ok(0),
        _ => Err(TbError::TimeUnit(unit.to_string())),
    }
}

pub(crate) fn scale_time(exp: i8) -> TbResult<&'static str> {
    match exp {
        -15 => Ok("fs"),
        -12 => Ok("ps"),
        -9 => Ok("ns"),
        -6 => Ok("us"),
        -3 => Ok("ms"),
        0 => Ok("sec"),
        _ => Err(TbError::TimeUnit(format!("1e{}", exp))),
    }
}

fn ldexp10(frac: f64, exp: i8) -> f64 {
    // Like math.ldexp, but base 10
    if exp >= 0 {
        frac * 10_u64.pow(exp as u32) as f64
    } else {
        let div = 10_u64.pow(-exp as u32) as f64;
        frac / div
    }
}
