pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod event_sim;
mod executor;
mod junit;
pub mod prelude;
pub mod report;
pub mod scenario;
pub mod signal;
pub mod sim;
pub mod sim_if;
pub mod test;
pub mod testbench;
mod trigger;
pub mod utils;
pub mod value;

use std::time;

use bus::Bus;
use config::TbConfig;
use device::{RegFileModel, DUT_SCOPE};
use error::{TbError, TbResult};
use event_sim::EventSim;
use report::Summary;
use sim::Sim;
use test::{TbTests, Test};
use value::Val;

pub use executor::{JoinHandle, Task};
pub use trigger::{EdgeKind, Trigger};

pub type RstbResult = Result<Val, TbError>;

/// Simulation of the stand-in register file. `customize` can inject faults.
pub fn regfile_sim(
    cfg: &TbConfig,
    customize: impl FnOnce(RegFileModel) -> RegFileModel,
) -> Sim {
    Sim::new(EventSim::new(cfg.precision, |signals| {
        customize(RegFileModel::attach(signals, DUT_SCOPE))
    }))
}

/// Runs `tests` one after the other in a single simulation.
///
/// Configuration is checked before the first test starts; a bad
/// configuration fails the whole run. Each test is torn down before the next
/// one starts, so a failing test leaves no clock or pending transaction
/// behind.
pub fn run_tests(sim: &Sim, scope: &str, cfg: &TbConfig, tests: &mut TbTests) -> TbResult<Summary> {
    cfg.validate()?;
    let timing = cfg.timing(sim)?;
    let bus = Bus::from_scope(sim, scope)?;

    let start = time::Instant::now();
    for test in tests.iter_mut() {
        run_test(sim, &bus, cfg, timing.timeout, test)?;
    }
    end_of_simulation(sim, cfg, tests, start)
}

fn run_test(sim: &Sim, bus: &Bus, cfg: &TbConfig, limit: Option<u64>, test: &mut Test) -> TbResult<()> {
    let time_start = time::Instant::now();
    let sim_time_start = sim.host().get_sim_time("ns")?;

    let mut handle = sim.fork((test.generator)(bus.clone(), cfg.clone()), &test.name);
    let result = sim.run_until_complete(&mut handle, limit);
    handle.cancel();
    sim.tear_down()?;

    test.time_secs = time_start.elapsed().as_secs_f64();
    test.sim_time_ns = sim.host().get_sim_time("ns")? - sim_time_start;
    match &result {
        Ok(_) => sim.log(&format!("TEST {} passed", test.name)),
        Err(e) => {
            tracing::error!(sim_time = sim.time_steps(), test = %test.name, "{}", e);
            sim.log(&format!("TEST {} failed", test.name));
        }
    }
    test.set_result(result);
    Ok(())
}

fn end_of_simulation(
    sim: &Sim,
    cfg: &TbConfig,
    tests: &TbTests,
    start: time::Instant,
) -> TbResult<Summary> {
    let summary = Summary::new(tests, sim.host().get_sim_time("ns")?, start.elapsed().as_secs_f64());
    summary.log();
    if let Some(path) = &cfg.junit_path {
        junit::create_junit_xml(path, &cfg.suite_name, tests)?;
        sim.log(&format!("JUnit report written to {}", path.display()));
    }
    Ok(summary)
}
