use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use rstb_regfile::config::{TbConfig, CLK_PERIOD_NS};
use rstb_regfile::device::DUT_SCOPE;
use rstb_regfile::value::{Addr, Word};
use rstb_regfile::{regfile_sim, run_tests, scenario};

#[derive(Parser, Debug)]
#[command(name = "rstb-regfile", version, about = "Run the register file bus scenarios")]
struct Cli {
    /// Scenarios to run, all of them when none are given
    scenarios: Vec<String>,

    /// List scenario names and exit
    #[arg(long)]
    list: bool,

    #[arg(long, env = "RSTB_CLK_PERIOD_NS", default_value_t = CLK_PERIOD_NS)]
    clk_period_ns: u64,

    /// Reset length in clock periods
    #[arg(long, default_value_t = 2)]
    reset_cycles: u64,

    /// Idle clock periods at the end of each scenario
    #[arg(long, default_value_t = 5)]
    settle_cycles: u64,

    /// Fail a scenario after this many clock periods
    #[arg(long, default_value_t = 10_000)]
    timeout_cycles: u64,

    /// Seed for random stimulus
    #[arg(long, env = "RSTB_SEED", default_value_t = 1)]
    seed: u64,

    /// Write a JUnit XML report here
    #[arg(long, env = "RSTB_JUNIT")]
    junit: Option<PathBuf>,

    /// Make the device return VALUE for reads of ADDR, as `ADDR:VALUE`
    #[arg(long, value_parser = parse_stuck_read)]
    stuck_read: Vec<(Addr, Word)>,

    /// Make the device ignore reset
    #[arg(long)]
    ignore_reset: bool,
}

fn parse_stuck_read(s: &str) -> Result<(Addr, Word), String> {
    let (addr, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ADDR:VALUE, got `{}`", s))?;
    let addr = addr.trim().parse::<Addr>().map_err(|e| e.to_string())?;
    let value = value.trim().parse::<Word>().map_err(|e| e.to_string())?;
    Ok((addr, value))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list {
        for test in scenario::all().iter() {
            println!("{}", test.name);
        }
        return ExitCode::SUCCESS;
    }

    let cfg = TbConfig {
        clk_period_ns: cli.clk_period_ns,
        reset_cycles: cli.reset_cycles,
        settle_cycles: cli.settle_cycles,
        timeout_cycles: Some(cli.timeout_cycles),
        seed: cli.seed,
        junit_path: cli.junit,
        ..TbConfig::default()
    };

    let mut tests = match scenario::all().select(&cli.scenarios) {
        Ok(tests) => tests,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let stuck_reads = cli.stuck_read;
    let ignore_reset = cli.ignore_reset;
    let sim = regfile_sim(&cfg, move |mut model| {
        for (addr, value) in stuck_reads {
            model = model.with_stuck_read(addr, value);
        }
        if ignore_reset {
            model = model.ignoring_reset();
        }
        model
    });

    match run_tests(&sim, DUT_SCOPE, &cfg, &mut tests) {
        Ok(summary) if summary.passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_read_flag() {
        assert_eq!(parse_stuck_read("5:17"), Ok((5, 17)));
        assert_eq!(parse_stuck_read(" 3 : 0 "), Ok((3, 0)));
        assert!(parse_stuck_read("5").is_err());
        assert!(parse_stuck_read("x:1").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["rstb-regfile", "basic_read"]);
        assert_eq!(cli.scenarios, ["basic_read"]);
        assert_eq!(cli.clk_period_ns, CLK_PERIOD_NS);
        assert!(cli.stuck_read.is_empty());
    }
}
