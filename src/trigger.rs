use intmap::IntMap;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::error::{TbError, TbResult};
use crate::signal::SimObject;
use crate::sim::Sim;
use crate::sim_if::{SimCallback, SimIf};

struct CallbackHandles {
    handle: usize,
    callbacks: VecDeque<TrigShared>,
}

impl CallbackHandles {
    fn new(handle: usize, shared: TrigShared) -> Self {
        let mut callbacks = VecDeque::new();
        callbacks.push_back(shared);
        Self { handle, callbacks }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // an edge callback is shared by all waiters on a signal; each waiter
    // remembers which transition it wants
    edge_kind: EdgeKind,
}

/// Wakers waiting on host callbacks. One host callback per absolute time
/// and per signal; waiters on the same key share it.
pub(crate) struct TriggerMaps {
    // key is signal handle
    edges: IntMap<CallbackHandles>,
    // key is absolute callback time
    timers: IntMap<CallbackHandles>,
}

impl TriggerMaps {
    pub(crate) fn new() -> Self {
        Self {
            edges: IntMap::new(),
            timers: IntMap::new(),
        }
    }

    fn add_timer(&mut self, host: &dyn SimIf, abs_time: u64, shared: TrigShared) -> TbResult<()> {
        if let Some(callbacks) = self.timers.get_mut(abs_time) {
            callbacks.callbacks.push_back(shared);
        } else {
            let handle = host.register_callback(SimCallback::Time(abs_time))?;
            self.timers.insert(abs_time, CallbackHandles::new(handle, shared));
        }
        Ok(())
    }

    fn add_edge(&mut self, host: &dyn SimIf, sig_hdl: usize, shared: TrigShared) -> TbResult<()> {
        if let Some(callbacks) = self.edges.get_mut(sig_hdl as u64) {
            callbacks.callbacks.push_back(shared);
        } else {
            let handle = host.register_callback(SimCallback::Edge(sig_hdl))?;
            self.edges.insert(sig_hdl as u64, CallbackHandles::new(handle, shared));
        }
        Ok(())
    }

    /// Collects the wakers a fired callback releases. Waiters for the other
    /// edge direction stay registered.
    pub(crate) fn react(
        &mut self,
        host: &dyn SimIf,
        cb: SimCallback,
        edge: Option<EdgeKind>,
    ) -> TbResult<Vec<Waker>> {
        match cb {
            SimCallback::Time(t) => Ok(self
                .timers
                .remove(t)
                .map(|callbacks| callbacks.callbacks.into_iter().map(|s| s.waker).collect())
                .unwrap_or_default()),
            SimCallback::Edge(sig_hdl) => {
                let mut callbacks = match self.edges.remove(sig_hdl as u64) {
                    Some(callbacks) => callbacks,
                    None => {
                        tracing::debug!(sig_hdl, "edge callback without waiters");
                        return Ok(Vec::new());
                    }
                };
                let edge = edge.unwrap_or(EdgeKind::Any);
                let mut wake = Vec::new();
                let mut resched = VecDeque::new();
                for trig in callbacks.callbacks.drain(..) {
                    if trig.edge_kind == EdgeKind::Any || trig.edge_kind == edge {
                        wake.push(trig.waker);
                    } else {
                        resched.push_back(trig);
                    }
                }
                if resched.is_empty() {
                    // if no callbacks are remaining, cancel
                    host.cancel_callback(callbacks.handle)?;
                } else {
                    callbacks.callbacks = resched;
                    self.edges.insert(sig_hdl as u64, callbacks);
                }
                Ok(wake)
            }
        }
    }

    /// Drops every waiter and cancels the matching host callbacks.
    pub(crate) fn cancel_all(&mut self, host: &dyn SimIf) -> TbResult<()> {
        // wakers are dropped with their entries, so waiting tasks are never polled again.
        // A timer the host already fired is gone on its side; skip it and keep going.
        let mut result = Ok(());
        let handles = self.timers.drain().chain(self.edges.drain()).map(|(_, cb)| cb.handle);
        for handle in handles.collect::<Vec<_>>() {
            match host.cancel_callback(handle) {
                Ok(()) => {}
                Err(TbError::InvalidHandle(h)) => {
                    tracing::debug!(cb_hdl = h, "callback already retired by the host");
                }
                Err(e) => {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.timers.is_empty() && self.edges.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
enum TrigKind {
    Edge(usize, EdgeKind),
    Timer(u64),
}

/// Suspension point of a testbench task: elapsed simulation time or a
/// transition on a signal.
#[derive(Clone)]
pub struct Trigger {
    sim: Sim,
    kind: TrigKind,
    awaited: bool,
}

impl Trigger {
    pub fn timer(sim: &Sim, time: u64, unit: &str) -> TbResult<Self> {
        let steps = sim.host().get_sim_steps(time as f64, unit)?;
        Ok(Trigger::timer_steps(sim, steps))
    }
    pub fn timer_steps(sim: &Sim, steps: u64) -> Self {
        Trigger {
            sim: sim.clone(),
            kind: TrigKind::Timer(steps),
            awaited: false,
        }
    }
    pub fn edge(signal: &SimObject) -> Self {
        Trigger::edge_of_kind(signal, EdgeKind::Any)
    }
    pub fn rising_edge(signal: &SimObject) -> Self {
        Trigger::edge_of_kind(signal, EdgeKind::Rising)
    }
    pub fn falling_edge(signal: &SimObject) -> Self {
        Trigger::edge_of_kind(signal, EdgeKind::Falling)
    }
    fn edge_of_kind(signal: &SimObject, edge_kind: EdgeKind) -> Self {
        Trigger {
            sim: signal.sim().clone(),
            kind: TrigKind::Edge(signal.handle(), edge_kind),
            awaited: false,
        }
    }
}

impl Future for Trigger {
    type Output = TbResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Trigger must only be awaited once, so the second time it is polled it must be because
        // the waker signaled its completion.
        if self.awaited {
            return Poll::Ready(Ok(()));
        }
        self.awaited = true;
        let kind = self.kind;
        let registered = self.sim.with_triggers(|maps, host| match kind {
            TrigKind::Timer(steps) => {
                // host callbacks take absolute time
                let abs_time = host.get_sim_time_steps() + steps;
                let shared = TrigShared {
                    waker: cx.waker().clone(),
                    edge_kind: EdgeKind::Any,
                };
                maps.add_timer(host, abs_time, shared)
            }
            TrigKind::Edge(sig_hdl, edge_kind) => {
                let shared = TrigShared {
                    waker: cx.waker().clone(),
                    edge_kind,
                };
                maps.add_edge(host, sig_hdl, shared)
            }
        });
        match registered {
            Ok(()) => Poll::Pending,
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{RegFileModel, DUT_SCOPE};
    use crate::event_sim::EventSim;
    use futures::task::noop_waker;

    fn sim() -> Sim {
        Sim::new(EventSim::new(-9, |s| RegFileModel::attach(s, DUT_SCOPE)))
    }

    fn shared(edge_kind: EdgeKind) -> TrigShared {
        TrigShared {
            waker: noop_waker(),
            edge_kind,
        }
    }

    #[test]
    fn waiters_on_one_time_share_a_callback() {
        let sim = sim();
        sim.with_triggers(|maps, host| {
            maps.add_timer(host, 5, shared(EdgeKind::Any)).unwrap();
            maps.add_timer(host, 5, shared(EdgeKind::Any)).unwrap();
            let woken = maps.react(host, SimCallback::Time(5), None).unwrap();
            assert_eq!(woken.len(), 2);
            assert!(maps.is_empty());
        });
    }

    #[test]
    fn edge_waiters_for_other_direction_stay() {
        let sim = sim();
        let clk = sim.signal("regfile.clk_i").unwrap();
        sim.with_triggers(|maps, host| {
            maps.add_edge(host, clk.handle(), shared(EdgeKind::Rising)).unwrap();
            maps.add_edge(host, clk.handle(), shared(EdgeKind::Falling)).unwrap();
            let woken = maps
                .react(host, SimCallback::Edge(clk.handle()), Some(EdgeKind::Falling))
                .unwrap();
            assert_eq!(woken.len(), 1);
            assert!(!maps.is_empty());
            let woken = maps
                .react(host, SimCallback::Edge(clk.handle()), Some(EdgeKind::Rising))
                .unwrap();
            assert_eq!(woken.len(), 1);
            assert!(maps.is_empty());
        });
    }

    #[test]
    fn cancel_all_releases_host_callbacks() {
        let sim = sim();
        let clk = sim.signal("regfile.clk_i").unwrap();
        sim.with_triggers(|maps, host| {
            maps.add_timer(host, 10, shared(EdgeKind::Any)).unwrap();
            maps.add_edge(host, clk.handle(), shared(EdgeKind::Rising)).unwrap();
            maps.cancel_all(host).unwrap();
            assert!(maps.is_empty());
            assert!(host.advance().is_none());
        });
    }

    #[test]
    fn cancel_all_skips_retired_callbacks() {
        let sim = sim();
        let clk = sim.signal("regfile.clk_i").unwrap();
        sim.with_triggers(|maps, host| {
            maps.add_timer(host, 10, shared(EdgeKind::Any)).unwrap();
            maps.add_timer(host, 30, shared(EdgeKind::Any)).unwrap();
            maps.add_edge(host, clk.handle(), shared(EdgeKind::Rising)).unwrap();
            // host fires the timer at 10 but its waiter is never released
            host.advance().unwrap();
            maps.cancel_all(host).unwrap();
            assert!(maps.is_empty());
            assert!(host.next_time().is_none());
        });
    }
}
