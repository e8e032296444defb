use futures::future::BoxFuture;

use crate::bus::Bus;
use crate::config::TbConfig;
use crate::error::{TbError, TbResult};
use crate::RstbResult;

pub type TestFn = fn(Bus, TbConfig) -> BoxFuture<'static, RstbResult>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Diagnostic of the first failure.
    Failed(String),
    NotRun,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

pub struct Test {
    pub name: String,
    pub generator: TestFn,
    pub result: Option<RstbResult>,
    pub time_secs: f64,
    pub sim_time_ns: f64,
}

impl Test {
    pub fn new(name: &str, generator: TestFn) -> Self {
        Self {
            name: name.to_string(),
            generator,
            result: None,
            time_secs: 0.0,
            sim_time_ns: 0.0,
        }
    }

    pub fn set_result(&mut self, result: RstbResult) {
        self.result = Some(result);
    }

    pub fn error(&self) -> Option<&TbError> {
        self.result.as_ref().and_then(|r| r.as_ref().err())
    }

    pub fn verdict(&self) -> Verdict {
        match &self.result {
            Some(Ok(_)) => Verdict::Passed,
            Some(Err(e)) => Verdict::Failed(e.to_string()),
            None => Verdict::NotRun,
        }
    }
}

/// Tests in execution order.
#[derive(Default)]
pub struct TbTests(Vec<Test>);

impl TbTests {
    pub fn new() -> Self {
        Self(Vec::new())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> core::slice::Iter<'_, Test> {
        self.0.iter()
    }
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Test> {
        self.0.iter_mut()
    }
    pub fn push(&mut self, test: Test) {
        self.0.push(test);
    }
    pub fn get(&self, name: &str) -> Option<&Test> {
        self.0.iter().find(|t| t.name == name)
    }

    /// Keeps the named tests, in the order given. An empty list keeps everything.
    pub fn select(mut self, names: &[String]) -> TbResult<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        let mut selected = TbTests::new();
        for name in names {
            let pos = self
                .0
                .iter()
                .position(|t| &t.name == name)
                .ok_or_else(|| TbError::Config(format!("no test named `{}`", name)))?;
            selected.push(self.0.remove(pos));
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Val;
    use futures::future::FutureExt;

    fn noop(_: Bus, _: TbConfig) -> BoxFuture<'static, RstbResult> {
        async { Ok(Val::None) }.boxed()
    }

    fn registry() -> TbTests {
        let mut tests = TbTests::new();
        tests.push(Test::new("a", noop));
        tests.push(Test::new("b", noop));
        tests.push(Test::new("c", noop));
        tests
    }

    #[test]
    fn select_keeps_requested_order() {
        let names = vec!["c".to_string(), "a".to_string()];
        let tests = registry().select(&names).unwrap();
        let got: Vec<_> = tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(got, ["c", "a"]);

        assert_eq!(registry().select(&[]).unwrap().len(), 3);
        assert!(matches!(
            registry().select(&["z".to_string()]),
            Err(TbError::Config(_))
        ));
    }

    #[test]
    fn verdict_follows_result() {
        let mut t = Test::new("a", noop);
        assert_eq!(t.verdict(), Verdict::NotRun);
        t.set_result(Err(TbError::mismatch(5, 5, 17)));
        assert_eq!(
            t.verdict(),
            Verdict::Failed("register x5 has wrong value 17, it should be 5".into())
        );
        assert!(t.error().unwrap().is_mismatch());
        t.set_result(Ok(Val::None));
        assert!(t.verdict().is_pass());
    }
}
