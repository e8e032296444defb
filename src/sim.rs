use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{TbError, TbResult};
use crate::executor::{JoinHandle, ReadyQueue, Task};
use crate::signal::SimObject;
use crate::sim_if::{Fired, SimIf};
use crate::trigger::TriggerMaps;
use crate::RstbResult;

struct SimInner {
    host: Box<dyn SimIf + Send + Sync>,
    triggers: Mutex<TriggerMaps>,
    ready: ReadyQueue,
}

/// Handle to one running simulation: the host, the pending triggers and the
/// task queue. Cloning is cheap; every clone drives the same simulation.
#[derive(Clone)]
pub struct Sim(Arc<SimInner>);

impl fmt::Debug for Sim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sim")
            .field("time_steps", &self.time_steps())
            .finish()
    }
}

impl Sim {
    pub fn new(host: impl SimIf + Send + Sync + 'static) -> Self {
        Sim(Arc::new(SimInner {
            host: Box::new(host),
            triggers: Mutex::new(TriggerMaps::new()),
            ready: ReadyQueue::default(),
        }))
    }

    pub fn host(&self) -> &dyn SimIf {
        self.0.host.as_ref()
    }

    pub fn time_steps(&self) -> u64 {
        self.host().get_sim_time_steps()
    }

    pub fn log(&self, msg: &str) {
        self.host().log(msg)
    }

    /// Converts `time` in `unit` to simulation steps.
    pub fn steps(&self, time: u64, unit: &str) -> TbResult<u64> {
        self.host().get_sim_steps(time as f64, unit)
    }

    /// Looks up a signal by its full hierarchical name.
    pub fn signal(&self, full_name: &str) -> TbResult<SimObject> {
        SimObject::from_name(self, full_name)
    }

    /// Runs `future` concurrently with the caller.
    pub fn fork(
        &self,
        future: impl Future<Output = RstbResult> + Send + 'static,
        name: &str,
    ) -> JoinHandle {
        Task::spawn_from_future(&self.0.ready, future, name)
    }

    pub(crate) fn with_triggers<R>(&self, f: impl FnOnce(&mut TriggerMaps, &dyn SimIf) -> R) -> R {
        let mut maps = self.0.triggers.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut maps, self.host())
    }

    fn react(&self, fired: Vec<Fired>) -> TbResult<()> {
        for (cb, edge) in fired {
            let wakers = self.with_triggers(|maps, host| maps.react(host, cb, edge))?;
            for waker in wakers {
                waker.wake();
            }
        }
        Ok(())
    }

    /// Drives the simulation until `handle` finishes.
    ///
    /// Each iteration polls woken tasks, lets the host settle the current
    /// time step and only moves time forward once no more edges fire.
    /// `limit` bounds the simulated time spent, in steps.
    pub fn run_until_complete(&self, handle: &mut JoinHandle, limit: Option<u64>) -> RstbResult {
        let deadline = limit.map(|l| self.time_steps().saturating_add(l));
        loop {
            self.0.ready.run_once();
            if let Some(result) = handle.try_result() {
                return result;
            }
            let fired = self.host().eval();
            if !fired.is_empty() {
                self.react(fired)?;
                continue;
            }
            let next = self.host().next_time().ok_or(TbError::Stalled)?;
            if let (Some(deadline), Some(limit)) = (deadline, limit) {
                // stop before the host retires the callbacks at `next`
                if next > deadline {
                    return Err(TbError::Timeout { limit });
                }
            }
            let fired = self.host().advance().ok_or(TbError::Stalled)?;
            self.react(fired)?;
        }
    }

    /// Forgets every pending trigger and queued task. Tasks that were waiting,
    /// such as a free-running clock, are dropped without being polled again.
    pub(crate) fn tear_down(&self) -> TbResult<()> {
        let cancelled = self.with_triggers(|maps, host| maps.cancel_all(host));
        self.0.ready.clear();
        cancelled
    }

    pub fn is_idle(&self) -> bool {
        self.with_triggers(|maps, _| maps.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{RegFileModel, DUT_SCOPE};
    use crate::event_sim::EventSim;
    use crate::trigger::Trigger;
    use crate::value::Val;

    fn sim() -> Sim {
        Sim::new(EventSim::new(-9, |s| RegFileModel::attach(s, DUT_SCOPE)))
    }

    #[test]
    fn timers_advance_simulated_time() {
        let sim = sim();
        let s = sim.clone();
        let mut handle = sim.fork(
            async move {
                Trigger::timer(&s, 30, "ns")?.await?;
                Trigger::timer_steps(&s, 12).await?;
                Ok(Val::Int(s.time_steps() as u32))
            },
            "timers",
        );
        let result = sim.run_until_complete(&mut handle, None).unwrap();
        assert_eq!(result, Val::Int(42));
    }

    #[test]
    fn stalls_without_events() {
        let sim = sim();
        let clk = sim.signal("regfile.clk_i").unwrap();
        let mut handle = sim.fork(
            async move {
                clk.rising_edge().await?;
                Ok(Val::None)
            },
            "stuck",
        );
        assert!(matches!(
            sim.run_until_complete(&mut handle, None),
            Err(TbError::Stalled)
        ));
    }

    #[test]
    fn limit_bounds_simulated_time() {
        let sim = sim();
        let s = sim.clone();
        let mut handle = sim.fork(
            async move {
                loop {
                    Trigger::timer_steps(&s, 10).await?;
                }
            },
            "forever",
        );
        assert!(matches!(
            sim.run_until_complete(&mut handle, Some(100)),
            Err(TbError::Timeout { limit: 100 })
        ));
        // the timer at 110 is still pending, time stops at the deadline
        assert_eq!(sim.time_steps(), 100);
        assert_eq!(sim.host().next_time(), Some(110));
        handle.cancel();
        sim.tear_down().unwrap();
        assert!(sim.is_idle());
        assert!(sim.host().next_time().is_none());
    }

    #[test]
    fn runs_again_after_timeout() {
        let sim = sim();
        let s = sim.clone();
        let mut handle = sim.fork(
            async move {
                loop {
                    Trigger::timer_steps(&s, 7).await?;
                }
            },
            "forever",
        );
        assert!(matches!(
            sim.run_until_complete(&mut handle, Some(20)),
            Err(TbError::Timeout { limit: 20 })
        ));
        handle.cancel();
        sim.tear_down().unwrap();

        let s = sim.clone();
        let mut handle = sim.fork(
            async move {
                Trigger::timer_steps(&s, 5).await?;
                Ok(Val::Int(s.time_steps() as u32))
            },
            "after",
        );
        assert_eq!(sim.run_until_complete(&mut handle, Some(20)).unwrap(), Val::Int(19));
    }
}
