use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use std::path::Path;

use crate::error::{TbError, TbResult};
use crate::test::TbTests;

pub(crate) fn create_junit_xml(path: &Path, suite_name: &str, tests: &TbTests) -> TbResult<()> {
    let mut test_cases = Vec::new();

    for t in tests.iter() {
        let duration = Duration::seconds_f64(t.time_secs);
        let tc = match &t.result {
            Some(Ok(_)) => TestCaseBuilder::success(&t.name, duration),
            Some(Err(e)) => {
                TestCaseBuilder::failure(&t.name, duration, "failure", &e.to_string())
            }
            None => TestCaseBuilder::skipped(&t.name),
        }
        .build();
        test_cases.push(tc);
    }

    let test_suite = TestSuiteBuilder::new(suite_name)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = std::fs::File::create(path)?;
    report
        .write_xml(file)
        .map_err(|e| TbError::Report(e.to_string()))
}
