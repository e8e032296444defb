use crate::bus::ports;
use crate::event_sim::SignalStore;
use crate::value::{Addr, Word, ADDR_BITS, NUM_REGS, WORD_BITS};

/// Device attached to the [`EventSim`](crate::event_sim::EventSim) host.
pub trait Device {
    /// Called once per delta. Implementations watch their own clock for
    /// transitions and drive their outputs.
    fn eval(&mut self, signals: &mut SignalStore);
}

/// Registers hold this until the first reset.
pub const POWER_ON_VALUE: Word = 0xDEAD_BEEF;
pub const DUT_SCOPE: &str = "regfile";

#[derive(Debug, Clone, Copy)]
pub struct RegFilePorts {
    pub clk: usize,
    pub rstn: usize,
    pub addr: usize,
    pub wdata: usize,
    pub we: usize,
    pub rdata: usize,
}

/// Behavioural stand-in for the register file under test: synchronous
/// write and reset on the rising clock edge, combinational read, x0 tied to
/// zero. Faults can be injected to check that the testbench catches them.
pub struct RegFileModel {
    ports: RegFilePorts,
    regs: [Word; NUM_REGS],
    last_clk: u32,
    stuck_reads: Vec<(Addr, Word)>,
    honor_reset: bool,
}

impl RegFileModel {
    /// Declares the ports below `scope`.
    pub fn attach(signals: &mut SignalStore, scope: &str) -> Self {
        let mut port =
            |name: &str, width: u8| signals.add(&format!("{}.{}", scope, name), width);
        let bound = RegFilePorts {
            clk: port(ports::CLK, 1),
            rstn: port(ports::RSTN, 1),
            addr: port(ports::ADDR, ADDR_BITS),
            wdata: port(ports::WDATA, WORD_BITS),
            we: port(ports::WE, 1),
            rdata: port(ports::RDATA, WORD_BITS),
        };
        let mut regs = [POWER_ON_VALUE; NUM_REGS];
        regs[0] = 0;
        Self {
            ports: bound,
            regs,
            last_clk: 0,
            stuck_reads: Vec::new(),
            honor_reset: true,
        }
    }

    /// Reads of `address` return `value` regardless of register content.
    pub fn with_stuck_read(mut self, address: Addr, value: Word) -> Self {
        self.stuck_reads.push((address, value));
        self
    }

    pub fn ignoring_reset(mut self) -> Self {
        self.honor_reset = false;
        self
    }

    pub fn ports(&self) -> RegFilePorts {
        self.ports
    }

    pub fn register(&self, address: Addr) -> Word {
        self.regs[address as usize % NUM_REGS]
    }

    fn rising_edge(&mut self, signals: &SignalStore) {
        let p = self.ports;
        if self.honor_reset && signals.value(p.rstn) == 0 {
            self.regs = [0; NUM_REGS];
        } else if signals.value(p.we) == 1 {
            let addr = signals.value(p.addr) as usize;
            if addr != 0 {
                self.regs[addr] = signals.value(p.wdata);
            }
        }
    }

    fn read(&self, address: usize) -> Word {
        if let Some(&(_, value)) = self.stuck_reads.iter().find(|(a, _)| *a as usize == address) {
            return value;
        }
        match address {
            0 => 0,
            _ => self.regs[address],
        }
    }
}

impl Device for RegFileModel {
    fn eval(&mut self, signals: &mut SignalStore) {
        let clk = signals.value(self.ports.clk);
        if self.last_clk == 0 && clk == 1 {
            self.rising_edge(signals);
        }
        self.last_clk = clk;

        let data = self.read(signals.value(self.ports.addr) as usize);
        signals.drive(self.ports.rdata, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(model: &mut RegFileModel, s: &mut SignalStore) {
        let clk = model.ports().clk;
        s.drive(clk, 0);
        model.eval(s);
        s.drive(clk, 1);
        model.eval(s);
    }

    #[test]
    fn write_commits_on_rising_edge_only() {
        let mut s = SignalStore::new();
        let mut m = RegFileModel::attach(&mut s, DUT_SCOPE);
        let p = m.ports();
        s.drive(p.rstn, 1);
        s.drive(p.addr, 3);
        s.drive(p.wdata, 42);
        s.drive(p.we, 1);
        m.eval(&mut s);
        assert_eq!(m.register(3), POWER_ON_VALUE);
        tick(&mut m, &mut s);
        assert_eq!(m.register(3), 42);
        assert_eq!(s.value(p.rdata), 42);
    }

    #[test]
    fn x0_stays_zero_and_reset_clears() {
        let mut s = SignalStore::new();
        let mut m = RegFileModel::attach(&mut s, DUT_SCOPE);
        let p = m.ports();
        s.drive(p.rstn, 1);
        s.drive(p.we, 1);
        s.drive(p.wdata, 12);
        tick(&mut m, &mut s);
        assert_eq!(s.value(p.rdata), 0);

        s.drive(p.we, 0);
        s.drive(p.rstn, 0);
        tick(&mut m, &mut s);
        assert!((0..NUM_REGS as u8).all(|a| m.register(a) == 0));
    }

    #[test]
    fn faults_are_visible_on_the_bus() {
        let mut s = SignalStore::new();
        let mut m = RegFileModel::attach(&mut s, DUT_SCOPE)
            .with_stuck_read(5, 17)
            .ignoring_reset();
        let p = m.ports();
        s.drive(p.addr, 5);
        tick(&mut m, &mut s);
        assert_eq!(s.value(p.rdata), 17);
        assert_eq!(m.register(7), POWER_ON_VALUE);
    }
}
