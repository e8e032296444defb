//! Register file scenarios. Each one brings the device up from scratch
//! (idle inputs, clock, reset), then checks register content inline and
//! stops at the first mismatch.

use futures::future::FutureExt;

use crate::bus::Bus;
use crate::config::{TbConfig, Timing};
use crate::error::{TbError, TbResult};
use crate::test::{TbTests, Test};
use crate::testbench::{reset, start_clock};
use crate::trigger::Trigger;
use crate::utils;
use crate::value::{Addr, Val, Word, NUM_REGS};
use crate::RstbResult;

/// Value written to x0 by `basic_write`.
const X0_PROBE: Word = 12;
/// Highest register exercised by the write scenarios.
const LAST_WRITTEN: Addr = 30;

fn check(address: Addr, expected: Word, actual: Word) -> TbResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(TbError::mismatch(address, expected, actual))
    }
}

async fn bring_up(bus: &Bus, cfg: &TbConfig) -> TbResult<Timing> {
    let timing = cfg.timing(bus.sim())?;
    bus.drive_idle()?;
    start_clock(&bus.clk, timing.period)?;
    reset(&bus.rstn, timing.reset).await?;
    Ok(timing)
}

async fn settle(bus: &Bus, timing: &Timing, name: &str) -> RstbResult {
    Trigger::timer_steps(bus.sim(), timing.settle).await?;
    bus.sim().log(&format!("Test {} finished.", name));
    Ok(Val::None)
}

/// Every register reads zero right after reset.
pub async fn basic_read(bus: Bus, cfg: TbConfig) -> RstbResult {
    bus.sim().log("Running basic_read test!");
    let timing = bring_up(&bus, &cfg).await?;

    for address in 0..NUM_REGS as Addr {
        let value = bus.read(address).await?;
        check(address, 0, value)?;
    }

    settle(&bus, &timing, "basic_read").await
}

/// x0 ignores writes; x1..x30 read back their own index.
pub async fn basic_write(bus: Bus, cfg: TbConfig) -> RstbResult {
    bus.sim().log("Running basic_write test!");
    let timing = bring_up(&bus, &cfg).await?;

    bus.write(0, X0_PROBE).await?;
    check(0, 0, bus.read(0).await?)?;

    for address in 1..=LAST_WRITTEN {
        bus.write(address, address as Word).await?;
        check(address, address as Word, bus.read(address).await?)?;
    }

    settle(&bus, &timing, "basic_write").await
}

/// Seeded random values read back from x1..x30; x0 stays zero whatever is written.
pub async fn random_write(bus: Bus, cfg: TbConfig) -> RstbResult {
    bus.sim().log("Running random_write test!");
    let timing = bring_up(&bus, &cfg).await?;
    let mut rng = utils::seeded_rng(cfg.seed);

    bus.write(0, utils::rand_word(&mut rng) | 1).await?;
    check(0, 0, bus.read(0).await?)?;

    for address in 1..=LAST_WRITTEN {
        let value = utils::rand_word(&mut rng);
        bus.write(address, value).await?;
        check(address, value, bus.read(address).await?)?;
    }

    settle(&bus, &timing, "random_write").await
}

/// A second reset after a full set of writes clears every register.
pub async fn reset_clears(bus: Bus, cfg: TbConfig) -> RstbResult {
    bus.sim().log("Running reset_clears test!");
    let timing = bring_up(&bus, &cfg).await?;

    for address in 1..NUM_REGS as Addr {
        bus.write(address, !(address as Word)).await?;
    }
    utils::clock_cycles(&bus.clk, 2).await?;

    reset(&bus.rstn, timing.reset).await?;
    for address in 0..NUM_REGS as Addr {
        check(address, 0, bus.read(address).await?)?;
    }

    settle(&bus, &timing, "reset_clears").await
}

/// Two reads without a write in between agree.
pub async fn read_idempotent(bus: Bus, cfg: TbConfig) -> RstbResult {
    bus.sim().log("Running read_idempotent test!");
    let timing = bring_up(&bus, &cfg).await?;

    for address in 1..=LAST_WRITTEN {
        bus.write(address, (address as Word) << 8).await?;
    }
    for address in 0..NUM_REGS as Addr {
        let first = bus.read(address).await?;
        let second = bus.read(address).await?;
        check(address, first, second)?;
    }

    settle(&bus, &timing, "read_idempotent").await
}

/// Every scenario, in the order they run by default.
pub fn all() -> TbTests {
    let mut tests = TbTests::new();
    tests.push(Test::new("basic_read", |bus, cfg| basic_read(bus, cfg).boxed()));
    tests.push(Test::new("basic_write", |bus, cfg| basic_write(bus, cfg).boxed()));
    tests.push(Test::new("random_write", |bus, cfg| random_write(bus, cfg).boxed()));
    tests.push(Test::new("reset_clears", |bus, cfg| reset_clears(bus, cfg).boxed()));
    tests.push(Test::new("read_idempotent", |bus, cfg| read_idempotent(bus, cfg).boxed()));
    tests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_register_and_values() {
        assert!(check(3, 3, 3).is_ok());
        match check(5, 5, 17) {
            Err(TbError::Mismatch {
                address,
                expected,
                actual,
            }) => assert_eq!((address, expected, actual), (5, 5, 17)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn registry_names() {
        let names: Vec<_> = all().iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            names,
            [
                "basic_read",
                "basic_write",
                "random_write",
                "reset_clears",
                "read_idempotent"
            ]
        );
    }
}
