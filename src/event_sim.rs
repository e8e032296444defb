use intmap::IntMap;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device::Device;
use crate::error::{TbError, TbResult};
use crate::sim_if::{Fired, ObjectKind, SimCallback, SimIf};
use crate::trigger::EdgeKind;
use crate::value::width_mask;

struct SignalState {
    name: String,
    width: u8,
    value: u32,
}

/// Flat storage for every signal the host knows about. Handles are indices.
#[derive(Default)]
pub struct SignalStore {
    signals: Vec<SignalState>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a signal of `width` bits, initialised to zero.
    pub fn add(&mut self, name: &str, width: u8) -> usize {
        self.signals.push(SignalState {
            name: name.to_string(),
            width,
            value: 0,
        });
        self.signals.len() - 1
    }

    /// Value of a handle returned by [`SignalStore::add`].
    #[inline]
    pub fn value(&self, handle: usize) -> u32 {
        self.signals[handle].value
    }

    /// Drives a handle returned by [`SignalStore::add`], truncated to its width.
    #[inline]
    pub fn drive(&mut self, handle: usize, value: u32) {
        let sig = &mut self.signals[handle];
        sig.value = value & width_mask(sig.width);
    }

    fn get(&self, handle: usize) -> TbResult<&SignalState> {
        self.signals.get(handle).ok_or(TbError::InvalidHandle(handle))
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.signals.iter().position(|s| s.name == name)
    }
}

enum CbKind {
    Time(u64),
    Edge,
}

struct EdgeWatch {
    cb_hdl: usize,
    sig_hdl: usize,
    last: u32,
}

struct HostState {
    time: u64,
    signals: SignalStore,
    device: Box<dyn Device + Send>,
    next_cb: usize,
    callbacks: IntMap<CbKind>,
    // ordered by (absolute time, callback handle)
    timers: BTreeSet<(u64, usize)>,
    edges: Vec<EdgeWatch>,
}

impl HostState {
    fn new_cb_hdl(&mut self) -> usize {
        let out = self.next_cb;
        self.next_cb += 1;
        out
    }
}

/// Built-in discrete-event host: signal storage, a timer wheel and edge
/// detection around a single [`Device`].
pub struct EventSim {
    precision: i8,
    state: Mutex<HostState>,
}

impl EventSim {
    /// `precision` is the length of one simulation step as a power of ten seconds.
    pub fn new<D, F>(precision: i8, build: F) -> Self
    where
        D: Device + Send + 'static,
        F: FnOnce(&mut SignalStore) -> D,
    {
        let mut signals = SignalStore::new();
        let device = build(&mut signals);
        Self {
            precision,
            state: Mutex::new(HostState {
                time: 0,
                signals,
                device: Box::new(device),
                next_cb: 0,
                callbacks: IntMap::new(),
                timers: BTreeSet::new(),
                edges: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of callbacks still registered with the host.
    pub fn pending_callbacks(&self) -> usize {
        let st = self.state();
        st.timers.len() + st.edges.len()
    }
}

impl SimIf for EventSim {
    fn get_value(&self, handle: usize) -> TbResult<u32> {
        Ok(self.state().signals.get(handle)?.value)
    }

    fn set_value(&self, handle: usize, value: u32) -> TbResult<()> {
        let mut st = self.state();
        st.signals.get(handle)?;
        st.signals.drive(handle, value);
        Ok(())
    }

    fn get_handle_by_name(&self, name: &str) -> TbResult<usize> {
        self.state()
            .signals
            .lookup(name)
            .ok_or_else(|| TbError::UnknownSignal(name.to_string()))
    }

    fn get_kind(&self, handle: usize) -> TbResult<ObjectKind> {
        Ok(ObjectKind::Int(self.state().signals.get(handle)?.width))
    }

    fn get_full_name(&self, handle: usize) -> TbResult<String> {
        Ok(self.state().signals.get(handle)?.name.clone())
    }

    fn get_sim_time_steps(&self) -> u64 {
        self.state().time
    }

    fn get_sim_precision(&self) -> i8 {
        self.precision
    }

    fn register_callback(&self, cb: SimCallback) -> TbResult<usize> {
        let mut st = self.state();
        let cb_hdl = st.new_cb_hdl();
        match cb {
            SimCallback::Time(t_abs) => {
                let t_abs = t_abs.max(st.time);
                st.timers.insert((t_abs, cb_hdl));
                st.callbacks.insert(cb_hdl as u64, CbKind::Time(t_abs));
            }
            SimCallback::Edge(sig_hdl) => {
                let last = st.signals.get(sig_hdl)?.value;
                st.edges.push(EdgeWatch {
                    cb_hdl,
                    sig_hdl,
                    last,
                });
                st.callbacks.insert(cb_hdl as u64, CbKind::Edge);
            }
        }
        Ok(cb_hdl)
    }

    fn cancel_callback(&self, cb_hdl: usize) -> TbResult<()> {
        let mut st = self.state();
        match st.callbacks.remove(cb_hdl as u64) {
            Some(CbKind::Time(t_abs)) => {
                st.timers.remove(&(t_abs, cb_hdl));
            }
            Some(CbKind::Edge) => st.edges.retain(|w| w.cb_hdl != cb_hdl),
            None => return Err(TbError::InvalidHandle(cb_hdl)),
        }
        Ok(())
    }

    fn eval(&self) -> Vec<Fired> {
        let mut st = self.state();
        let HostState {
            signals,
            device,
            edges,
            ..
        } = &mut *st;
        device.eval(signals);

        let mut fired = Vec::new();
        for watch in edges.iter_mut() {
            let current = signals.value(watch.sig_hdl);
            if current != watch.last {
                let edge = match (watch.last, current) {
                    (0, 1) => EdgeKind::Rising,
                    (1, 0) => EdgeKind::Falling,
                    _ => EdgeKind::Any,
                };
                watch.last = current;
                fired.push((SimCallback::Edge(watch.sig_hdl), Some(edge)));
            }
        }
        fired
    }

    fn next_time(&self) -> Option<u64> {
        self.state().timers.first().map(|&(t, _)| t)
    }

    fn advance(&self) -> Option<Vec<Fired>> {
        let mut st = self.state();
        let &(t_next, _) = st.timers.first()?;
        st.time = t_next;
        while let Some(&(t, cb_hdl)) = st.timers.first() {
            if t != t_next {
                break;
            }
            st.timers.pop_first();
            st.callbacks.remove(cb_hdl as u64);
        }
        Some(vec![(SimCallback::Time(t_next), None)])
    }
}
