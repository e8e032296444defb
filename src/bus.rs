use crate::error::TbResult;
use crate::signal::SimObject;
use crate::sim::Sim;
use crate::value::{Addr, Word};

/// Port names of the register file, relative to its scope.
pub mod ports {
    pub const CLK: &str = "clk_i";
    pub const RSTN: &str = "rstn_i";
    pub const ADDR: &str = "addr_i";
    pub const WDATA: &str = "data_i";
    pub const WE: &str = "we_i";
    pub const RDATA: &str = "data_o";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Armed,
    EdgeWait,
    Complete,
}

/// One bus transaction, alive for the duration of a single read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub op: Op,
    pub address: Addr,
    pub data: Word,
    state: TxState,
}

impl Transaction {
    fn new(op: Op, address: Addr, data: Word) -> Self {
        Self {
            op,
            address,
            data,
            state: TxState::Idle,
        }
    }

    fn advance(&mut self, next: TxState) {
        tracing::trace!(
            op = ?self.op,
            address = self.address,
            data = self.data,
            from = ?self.state,
            to = ?next,
            "transaction"
        );
        self.state = next;
    }

    pub fn state(&self) -> TxState {
        self.state
    }
}

/// The register file's synchronous bus. One transaction in flight at a time.
#[derive(Debug, Clone)]
pub struct Bus {
    pub clk: SimObject,
    pub rstn: SimObject,
    pub addr: SimObject,
    pub wdata: SimObject,
    pub we: SimObject,
    pub rdata: SimObject,
}

impl Bus {
    pub fn from_scope(sim: &Sim, scope: &str) -> TbResult<Self> {
        let port = |name: &str| sim.signal(&format!("{}.{}", scope, name));
        Ok(Bus {
            clk: port(ports::CLK)?,
            rstn: port(ports::RSTN)?,
            addr: port(ports::ADDR)?,
            wdata: port(ports::WDATA)?,
            we: port(ports::WE)?,
            rdata: port(ports::RDATA)?,
        })
    }

    pub fn sim(&self) -> &Sim {
        self.clk.sim()
    }

    /// Drives every device input to zero. Reset is left asserted.
    pub fn drive_idle(&self) -> TbResult<()> {
        self.clk.set(0)?;
        self.rstn.set(0)?;
        self.addr.set(0)?;
        self.wdata.set(0)?;
        self.we.set(0)
    }

    /// Single read: `addr_i` is driven right away, `data_o` is sampled at the
    /// next rising edge. Write enable must already be low.
    pub async fn read(&self, address: Addr) -> TbResult<Word> {
        let mut tx = Transaction::new(Op::Read, address, 0);
        self.addr.set(address as u32)?;
        tx.advance(TxState::Armed);

        tx.advance(TxState::EdgeWait);
        self.clk.rising_edge().await?;
        tx.data = self.rdata.u32()?;
        tx.advance(TxState::Complete);
        Ok(tx.data)
    }

    /// Single write: inputs are set up on the falling edge, the device commits
    /// on the next rising edge. `we_i` is high across exactly one rising edge.
    pub async fn write(&self, address: Addr, value: Word) -> TbResult<()> {
        let mut tx = Transaction::new(Op::Write, address, value);
        self.clk.falling_edge().await?;
        self.addr.set(address as u32)?;
        self.we.set(1)?;
        self.wdata.set(value)?;
        tx.advance(TxState::Armed);

        tx.advance(TxState::EdgeWait);
        self.clk.rising_edge().await?;
        self.we.set(0)?;
        tx.advance(TxState::Complete);
        Ok(())
    }
}
