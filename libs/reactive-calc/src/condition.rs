//! Conditions: per-cycle hooks that run before bounds checking

use std::fmt;

use tracing::debug;

use crate::error::{CalcError, Result};
use crate::field::FieldRegistry;
use crate::value::ValueStore;

/// A condition may rewrite values or field metadata (e.g. bounds)
pub type ConditionFn =
    Box<dyn FnMut(&mut ValueStore, &mut FieldRegistry) -> anyhow::Result<()> + Send>;

/// Ordered list of conditions
#[derive(Default)]
pub struct ConditionRunner {
    conditions: Vec<ConditionFn>,
}

impl ConditionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, condition: F)
    where
        F: FnMut(&mut ValueStore, &mut FieldRegistry) -> anyhow::Result<()> + Send + 'static,
    {
        self.conditions.push(Box::new(condition));
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Run every condition in registration order
    ///
    /// The first failure stops the run.
    pub fn run(&mut self, values: &mut ValueStore, fields: &mut FieldRegistry) -> Result<()> {
        for (index, condition) in self.conditions.iter_mut().enumerate() {
            condition(values, fields).map_err(|e| {
                debug!(index, "condition failed");
                CalcError::Condition(e)
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConditionRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRunner")
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_run_in_order() {
        let mut runner = ConditionRunner::new();
        runner.add(|values, _| {
            values.set("X", 1.0);
            Ok(())
        });
        runner.add(|values, _| {
            let x = values.number("X");
            values.set("X", x * 10.0);
            Ok(())
        });

        let mut values = ValueStore::new();
        let mut fields = FieldRegistry::new();
        runner.run(&mut values, &mut fields).unwrap();
        assert_eq!(values.number("X"), 10.0);
    }

    #[test]
    fn test_failure_stops_run() {
        let mut runner = ConditionRunner::new();
        runner.add(|_, _| anyhow::bail!("rate table unavailable"));
        runner.add(|values, _| {
            values.set("REACHED", 1.0);
            Ok(())
        });

        let mut values = ValueStore::new();
        let mut fields = FieldRegistry::new();
        let err = runner.run(&mut values, &mut fields).unwrap_err();
        assert!(matches!(err, CalcError::Condition(_)));
        assert!(!values.contains("REACHED"));
    }
}
