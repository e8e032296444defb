pub use crate::bus::Bus;
pub use crate::config::{TbConfig, Timing};
pub use crate::error::{TbError, TbResult};
pub use crate::signal::SimObject;
pub use crate::sim::Sim;
pub use crate::test::{TbTests, Test, Verdict};
pub use crate::testbench::{clock, reset, start_clock};
pub use crate::utils;
pub use crate::value::{Addr, Val, Word};
pub use crate::{regfile_sim, run_tests, JoinHandle, RstbResult, Task, Trigger};
pub use futures::future::FutureExt;
