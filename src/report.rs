use num_format::{Locale, ToFormattedString};
use prettytable::{row, Table};

use crate::test::{TbTests, Verdict};

#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    pub name: String,
    pub verdict: Verdict,
    pub sim_time_ns: f64,
    pub time_secs: f64,
}

/// Outcome of one run over a set of tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub tests: Vec<TestSummary>,
    pub sim_time_ns: f64,
    pub time_secs: f64,
}

impl Summary {
    pub(crate) fn new(tests: &TbTests, sim_time_ns: f64, time_secs: f64) -> Self {
        Self {
            tests: tests
                .iter()
                .map(|t| TestSummary {
                    name: t.name.clone(),
                    verdict: t.verdict(),
                    sim_time_ns: t.sim_time_ns,
                    time_secs: t.time_secs,
                })
                .collect(),
            sim_time_ns,
            time_secs,
        }
    }

    pub fn passed(&self) -> bool {
        self.tests.iter().all(|t| t.verdict.is_pass())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TestSummary> {
        self.tests.iter().filter(|t| !t.verdict.is_pass())
    }

    pub fn verdict(&self, name: &str) -> Option<&Verdict> {
        self.tests.iter().find(|t| t.name == name).map(|t| &t.verdict)
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row![
            "TEST",
            "RESULT",
            "SIM TIME (ns)",
            "REAL TIME (s)",
            "SIM SPEED (ns/s)",
            "DIAGNOSTIC"
        ]);
        for t in &self.tests {
            let (result, diagnostic) = match &t.verdict {
                Verdict::Passed => ("passed", String::new()),
                Verdict::Failed(msg) => ("failed", msg.clone()),
                Verdict::NotRun => ("not run", String::new()),
            };
            let sim_time = (t.sim_time_ns as u64).to_formatted_string(&Locale::en);
            let time = format!("{:.3}", t.time_secs);
            let speed = format!("{:.3}", sim_speed(t.sim_time_ns, t.time_secs));
            table.add_row(row![t.name, result, sim_time, time, speed, diagnostic]);
        }
        table
    }

    pub(crate) fn log(&self) {
        for line in self.table().to_string().lines() {
            tracing::info!("{}", line);
        }
        tracing::info!("TOTAL SIMULATION");
        tracing::info!(
            "Simulation time: {} ns",
            (self.sim_time_ns as u64).to_formatted_string(&Locale::en)
        );
        tracing::info!("Real time: {:.3} s", self.time_secs);
        tracing::info!(
            "Simulation speed: {:.3} ns/s",
            sim_speed(self.sim_time_ns, self.time_secs)
        );
    }
}

fn sim_speed(sim_time_ns: f64, time_secs: f64) -> f64 {
    if time_secs > 0.0 {
        sim_time_ns / time_secs
    } else {
        0.0
    }
}
