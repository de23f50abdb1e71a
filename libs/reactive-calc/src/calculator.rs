//! Calculator - fields, conditions, results and the change-detection cycle
//!
//! One cycle ([`Calculator::tick`]):
//!
//! ```text
//! read inputs ──changed or forced?──▶ conditions ──▶ bounds (clamp) ──▶ calc
//!                                                                        │
//!             commit pending? ──▶ write clamped values back ◀────────────┘
//! ```
//!
//! Change detection compares each input against the value last read from it,
//! not against the value store, so clamping a value never looks like a new
//! edit on the next tick.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::calculation::{CalcOutput, Calculation, CalculationDescriptor};
use crate::condition::ConditionRunner;
use crate::error::{CalcError, Result};
use crate::field::{Field, FieldDescriptor, FieldRegistry, MinMax};
use crate::formula::is_identifier;
use crate::io::{CommitNotifier, FieldAnnotation};
use crate::options::{CalculatorOptions, OptionsUpdate};
use crate::source::ValueSource;
use crate::value::{same_number, ValueStore};

/// Outcome of one bounds pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsReport {
    /// Any field's resolved bounds differ from the previous pass
    pub bounds_changed: bool,
    /// Codes of fields clamped in this pass
    pub invalid: Vec<String>,
}

/// Outcome of one change-detection cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Codes whose input changed since the previous tick
    pub changed: Vec<String>,
    /// The force flag was set
    pub forced: bool,
    /// Bounds pass result, when the pipeline ran
    pub bounds: Option<BoundsReport>,
    /// Results computed, when the pipeline ran
    pub outputs: Vec<CalcOutput>,
    /// Number of inputs corrected by the correction pass
    pub corrected: usize,
}

impl TickReport {
    /// True when conditions, bounds and results were evaluated
    pub fn evaluated(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Reactive calculator
///
/// All operations take `&mut self`; hosts that share a calculator between
/// threads wrap it in a mutex (see `CalcScheduler`).
#[derive(Debug)]
pub struct Calculator {
    options: CalculatorOptions,
    fields: FieldRegistry,
    calculations: Vec<Calculation>,
    values: ValueStore,
    conditions: ConditionRunner,
    /// Codes of fields and results, which share one namespace
    codes: HashSet<String>,
    force_changed: bool,
    commits: CommitNotifier,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(CalculatorOptions::default())
    }
}

impl Calculator {
    pub fn new(options: CalculatorOptions) -> Self {
        Self {
            options,
            fields: FieldRegistry::new(),
            calculations: Vec::new(),
            values: ValueStore::new(),
            conditions: ConditionRunner::new(),
            codes: HashSet::new(),
            force_changed: false,
            commits: CommitNotifier::new(),
        }
    }

    pub fn options(&self) -> &CalculatorOptions {
        &self.options
    }

    /// Merge partial options
    pub fn set_options(&mut self, update: OptionsUpdate) {
        debug!(?update, "options updated");
        self.options.apply(update);
    }

    /// Run the pipeline on the next tick even if no input changed
    pub fn force_change(&mut self) {
        self.force_changed = true;
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn field(&self, code: &str) -> Option<&Field> {
        self.fields.get(code)
    }

    pub fn calculations(&self) -> &[Calculation] {
        &self.calculations
    }

    /// Find a field by the name of its input
    pub fn get_field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.by_name(name)
    }

    /// Handle raised by inputs on commit; hosts may raise it directly
    pub fn commit_notifier(&self) -> CommitNotifier {
        self.commits.clone()
    }

    fn check_code(&self, code: &str) -> Result<()> {
        if !is_identifier(code) {
            return Err(CalcError::InvalidCode(code.to_string()));
        }
        if self.codes.contains(code) {
            return Err(CalcError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }

    /// Register a field and seed its value
    pub fn add_field(&mut self, descriptor: FieldDescriptor) -> Result<()> {
        self.check_code(&descriptor.code)?;
        let mut field = Field::from_descriptor(descriptor)?;

        let seed = field.value.resolve(&self.values);
        self.values.set(field.code.clone(), seed.clone());
        field.last_input = seed;

        if let Some(input) = &field.input {
            input.subscribe(self.commits.clone());
        }

        debug!(
            code = %field.code,
            computed = field.is_computed(),
            has_input = field.input.is_some(),
            "field registered"
        );
        self.codes.insert(field.code.clone());
        self.fields.push(field);
        Ok(())
    }

    /// Register a named value without an input (e.g. a rate derived from fields)
    pub fn add_parameter(&mut self, descriptor: FieldDescriptor) -> Result<()> {
        self.add_field(descriptor)
    }

    /// Register a condition, run every cycle before bounds checking
    pub fn add_condition<F>(&mut self, condition: F)
    where
        F: FnMut(&mut ValueStore, &mut FieldRegistry) -> anyhow::Result<()> + Send + 'static,
    {
        self.conditions.add(condition);
    }

    /// Register a result; results evaluate in registration order
    pub fn add_result(&mut self, descriptor: CalculationDescriptor) -> Result<()> {
        if let Some(code) = &descriptor.code {
            self.check_code(code)?;
        }
        let calculation = Calculation::from_descriptor(descriptor)?;

        if let ValueSource::Formula(formula) = &calculation.formula {
            debug!(
                title = %calculation.title,
                formula = formula.source(),
                references = ?formula.identifiers(),
                "result registered"
            );
        }
        if let Some(code) = &calculation.code {
            self.codes.insert(code.clone());
        }
        self.calculations.push(calculation);
        Ok(())
    }

    /// Resolve a field's bounds against the current values
    pub fn get_min_max(&self, field: &Field) -> Option<MinMax> {
        field.min_max(&self.values)
    }

    pub fn run_conditions(&mut self) -> Result<()> {
        self.conditions.run(&mut self.values, &mut self.fields)
    }

    /// Recompute computed fields and clamp bounded ones
    pub fn check_field_bounds(&mut self) -> Result<BoundsReport> {
        let mut report = BoundsReport::default();
        let populate = self.options.populate_fields_data;

        for field in self.fields.iter_mut() {
            if field.value.is_dynamic() {
                let value = field.value.resolve(&self.values);
                self.values.set(field.code.clone(), value);
                continue;
            }

            let Some((min, max)) = field.min_max(&self.values).and_then(|b| b.closed()) else {
                continue;
            };

            let moved = !field.last_min.is_some_and(|last| same_number(last, min))
                || !field.last_max.is_some_and(|last| same_number(last, max));
            if moved {
                report.bounds_changed = true;
                field.last_min = Some(min);
                field.last_max = Some(max);
            }

            let current = self.values.number(&field.code);
            let clamped = if min > max {
                warn!(code = %field.code, min, max, "min exceeds max, clamping to min");
                (!current.is_nan() && !same_number(current, min)).then_some(min)
            } else if current < min {
                Some(min)
            } else if current > max {
                Some(max)
            } else {
                None
            };

            if let Some(value) = clamped {
                debug!(code = %field.code, from = current, to = value, "value clamped");
                self.values.set(field.code.clone(), value);
                report.invalid.push(field.code.clone());
            }

            let Some(stored) = self.values.get(&field.code).cloned() else {
                continue;
            };
            // Stays invalid until the input shows the stored value again
            field.invalid = clamped.is_some()
                || (field.invalid && field.input.is_some() && !field.last_input.same_as(&stored));

            if let Some(input) = &field.input {
                input.mark_invalid(field.invalid);
                if populate {
                    input.annotate(&FieldAnnotation {
                        min: Some(min),
                        max: Some(max),
                        value: stored,
                    });
                }
            }
        }

        if report.bounds_changed {
            if let Some(hook) = &self.options.hooks.on_bounds_change {
                hook().map_err(|e| CalcError::hook("on_bounds_change", e))?;
            }
        }

        Ok(report)
    }

    /// Write clamped values back to their inputs and clear the invalid flags
    ///
    /// Returns the number of inputs written.
    pub fn fix_values(&mut self) -> usize {
        let mut fixed = 0;

        for field in self.fields.iter_mut().filter(|f| f.invalid) {
            field.invalid = false;
            let Some(input) = &field.input else {
                continue;
            };

            let value = self.values.get(&field.code).cloned().unwrap_or_default();
            input.write(&value);
            input.mark_invalid(false);
            field.last_input = input.read();
            fixed += 1;

            debug!(code = %field.code, value = %value, "input corrected");
        }

        fixed
    }

    /// Annotate every bounded input with its current bounds and value
    pub fn populate_fields_data(&self) {
        for field in &self.fields {
            let Some(input) = &field.input else {
                continue;
            };
            let Some(bounds) = field.min_max(&self.values) else {
                continue;
            };
            input.annotate(&FieldAnnotation {
                min: bounds.min,
                max: bounds.max,
                value: self.values.get(&field.code).cloned().unwrap_or_default(),
            });
        }
    }

    /// Evaluate every result in order and publish it
    pub fn calc(&mut self) -> Result<Vec<CalcOutput>> {
        if let Some(hook) = &self.options.hooks.on_before_calc {
            hook(&self.values).map_err(|e| CalcError::hook("on_before_calc", e))?;
        }

        let mut outputs = Vec::with_capacity(self.calculations.len());
        for calculation in &self.calculations {
            let value = calculation.formula.number(&self.values);
            if let Some(code) = &calculation.code {
                self.values.set(code.clone(), value);
            }

            let value_formatted = (calculation.format)(value);
            for sink in &calculation.outputs {
                sink.publish(value, &value_formatted);
            }

            outputs.push(CalcOutput {
                title: calculation.title.clone(),
                value,
                value_formatted,
            });
        }

        if let Some(hook) = &self.options.hooks.on_after_calc {
            hook(&self.values, &outputs).map_err(|e| CalcError::hook("on_after_calc", e))?;
        }

        Ok(outputs)
    }

    /// One change-detection cycle
    ///
    /// An error aborts the rest of this cycle only. The next tick evaluates
    /// again even if no input changed, and a pending commit is left in place
    /// for it.
    pub fn tick(&mut self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let populate = self.options.populate_fields_data;

        for field in self.fields.iter_mut() {
            if field.is_computed() {
                continue;
            }
            let Some(input) = &field.input else {
                continue;
            };

            let reading = input.read();
            if reading.same_as(&field.last_input) {
                continue;
            }

            self.values.set(field.code.clone(), reading.clone());
            field.last_input = reading.clone();
            report.changed.push(field.code.clone());

            if populate {
                input.annotate(&FieldAnnotation {
                    min: field.last_min,
                    max: field.last_max,
                    value: reading,
                });
            }
        }

        report.forced = std::mem::take(&mut self.force_changed);
        if !report.changed.is_empty() || report.forced {
            debug!(changed = ?report.changed, forced = report.forced, "evaluating");
            if let Err(e) = self.evaluate(&mut report) {
                // The edits are already consumed; rerun on the next tick
                self.force_changed = true;
                return Err(e);
            }
        }

        if self.commits.take() && self.options.fix_values_on_blur {
            report.corrected = self.fix_values();
        }

        Ok(report)
    }

    fn evaluate(&mut self, report: &mut TickReport) -> Result<()> {
        self.run_conditions()?;
        report.bounds = Some(self.check_field_bounds()?);
        report.outputs = self.calc()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::io::SharedInput;
    use crate::source::ValueSpec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn bounded(
        code: &str,
        value: f64,
        min: impl Into<ValueSpec>,
        max: impl Into<ValueSpec>,
    ) -> FieldDescriptor {
        FieldDescriptor::new(code).value(value).min(min).max(max)
    }

    #[test]
    fn test_rejects_bad_codes() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("A").value(1.0)).unwrap();

        assert!(matches!(
            calc.add_field(FieldDescriptor::new("A")),
            Err(CalcError::DuplicateCode(_))
        ));
        assert!(matches!(
            calc.add_result(CalculationDescriptor::new("Twice", "=A*2").code("A")),
            Err(CalcError::DuplicateCode(_))
        ));
        assert!(matches!(
            calc.add_field(FieldDescriptor::new("2X")),
            Err(CalcError::InvalidCode(_))
        ));
        assert_eq!(calc.fields().len(), 1);
    }

    #[test]
    fn test_failed_registration_keeps_code_free() {
        let mut calc = Calculator::default();
        assert!(calc.add_field(FieldDescriptor::new("A").min("=B +")).is_err());
        calc.add_field(FieldDescriptor::new("A").value(1.0)).unwrap();
    }

    #[test]
    fn test_average_result() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("A").value(10.0)).unwrap();
        calc.add_field(FieldDescriptor::new("B").value(20.0)).unwrap();
        calc.add_result(CalculationDescriptor::new("Average", "=(A+B)/2")).unwrap();

        let outputs = calc.calc().unwrap();
        assert_eq!(outputs[0].value, 15.0);
        assert_eq!(outputs[0].value_formatted, "15");
    }

    #[test]
    fn test_result_codes_feed_later_results() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("A").value(4.0)).unwrap();
        calc.add_result(CalculationDescriptor::new("X", "A * 2").code("X")).unwrap();
        calc.add_result(CalculationDescriptor::new("Y", "X + 1")).unwrap();

        let outputs = calc.calc().unwrap();
        assert_eq!(outputs[1].value, 9.0);
        assert_eq!(calc.values().number("X"), 8.0);
    }

    #[test]
    fn test_reversed_results_see_nan() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("A").value(4.0)).unwrap();
        calc.add_result(CalculationDescriptor::new("Y", "X + 1")).unwrap();
        calc.add_result(CalculationDescriptor::new("X", "A * 2").code("X")).unwrap();

        let outputs = calc.calc().unwrap();
        assert!(outputs[0].value.is_nan());
        assert_eq!(outputs[0].value_formatted, "NaN");
        assert_eq!(outputs[1].value, 8.0);
    }

    #[test]
    fn test_bounds_clamp_and_idempotence() {
        let mut calc = Calculator::default();
        calc.add_field(bounded("DUR", 40.0, 1.0, 30.0)).unwrap();

        let first = calc.check_field_bounds().unwrap();
        assert!(first.bounds_changed);
        assert_eq!(first.invalid, vec!["DUR".to_string()]);
        assert_eq!(calc.values().number("DUR"), 30.0);

        let second = calc.check_field_bounds().unwrap();
        assert!(!second.bounds_changed);
        assert!(second.invalid.is_empty());
        assert_eq!(calc.values().number("DUR"), 30.0);
    }

    #[test]
    fn test_single_sided_bounds_never_clamp() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("A").value(-5.0).min(0.0)).unwrap();

        let report = calc.check_field_bounds().unwrap();
        assert!(report.invalid.is_empty());
        assert_eq!(calc.values().number("A"), -5.0);
    }

    #[test]
    fn test_nan_value_is_not_clamped() {
        let mut calc = Calculator::default();
        calc.add_field(bounded("A", f64::NAN, 0.0, 10.0)).unwrap();

        let report = calc.check_field_bounds().unwrap();
        assert!(report.invalid.is_empty());
        assert!(calc.values().number("A").is_nan());
    }

    #[test]
    fn test_bounds_change_hook_fires_on_edges() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut calc = Calculator::default();
        calc.set_options(OptionsUpdate::new().on_bounds_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        calc.add_field(FieldDescriptor::new("PRICE").value(1000.0)).unwrap();
        calc.add_field(bounded("INV", 500.0, "=PRICE / 5", "=PRICE")).unwrap();

        calc.check_field_bounds().unwrap();
        calc.check_field_bounds().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        calc.add_condition(|values, _| {
            values.set("PRICE", 2000.0);
            Ok(())
        });
        calc.run_conditions().unwrap();
        calc.check_field_bounds().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(
            calc.get_min_max(calc.field("INV").unwrap()).unwrap().closed(),
            Some((400.0, 2000.0))
        );
    }

    #[test]
    #[traced_test]
    fn test_inverted_dynamic_bounds_clamp_to_min() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("LO").value(50.0)).unwrap();
        calc.add_field(bounded("A", 20.0, "=LO", 10.0)).unwrap();

        let report = calc.check_field_bounds().unwrap();
        assert_eq!(report.invalid, vec!["A".to_string()]);
        assert_eq!(calc.values().number("A"), 50.0);
        assert!(logs_contain("min exceeds max"));
    }

    #[test]
    fn test_inverted_bounds_leave_nan_alone() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("LO").value(50.0)).unwrap();
        calc.add_field(bounded("A", f64::NAN, "=LO", 10.0)).unwrap();

        let report = calc.check_field_bounds().unwrap();
        assert!(report.invalid.is_empty());
        assert!(calc.values().number("A").is_nan());
        assert!(!calc.field("A").unwrap().is_invalid());
    }

    #[test]
    fn test_computed_parameter_follows_fields() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("DUR").value(7.0)).unwrap();
        calc.add_parameter(FieldDescriptor::new("RATE").value(ValueSpec::computed(|v| {
            if v.number("DUR") <= 7.0 {
                11.3
            } else {
                11.8
            }
        })))
        .unwrap();
        assert_eq!(calc.values().number("RATE"), 11.3);

        calc.add_condition(|values, _| {
            values.set("DUR", 10.0);
            Ok(())
        });
        calc.run_conditions().unwrap();
        calc.check_field_bounds().unwrap();
        assert_eq!(calc.values().number("RATE"), 11.8);
        assert!(calc.field("RATE").unwrap().is_computed());
    }

    #[test]
    fn test_get_field_by_name() {
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("DUR").name("duration").value(7.0)).unwrap();

        assert_eq!(calc.get_field_by_name("duration").map(Field::code), Some("DUR"));
        assert!(calc.get_field_by_name("price").is_none());
    }

    #[test]
    fn test_tick_runs_only_on_change_or_force() {
        let input = SharedInput::text("7");
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("DUR").value(7.0).input(input.clone())).unwrap();
        calc.add_result(CalculationDescriptor::new("Months", "DUR * 12")).unwrap();

        assert!(!calc.tick().unwrap().evaluated());

        calc.force_change();
        let report = calc.tick().unwrap();
        assert!(report.forced);
        assert!(report.evaluated());
        assert_eq!(report.outputs[0].value, 84.0);
        assert!(!calc.tick().unwrap().evaluated());

        input.set("10");
        let report = calc.tick().unwrap();
        assert_eq!(report.changed, vec!["DUR".to_string()]);
        assert_eq!(report.outputs[0].value, 120.0);
    }

    #[test]
    fn test_clamp_does_not_retrigger_detection() {
        let input = SharedInput::text("7");
        let mut calc = Calculator::default();
        calc.add_field(bounded("DUR", 7.0, 1.0, 30.0).input(input.clone())).unwrap();

        input.set("40");
        let report = calc.tick().unwrap();
        assert!(report.evaluated());
        assert_eq!(calc.values().number("DUR"), 30.0);
        assert!(input.is_invalid());

        // Input still shows 40, but nothing new was typed
        assert!(!calc.tick().unwrap().evaluated());
        assert_eq!(input.raw(), "40");
    }

    #[test]
    fn test_commit_writes_clamped_value_back() {
        let input = SharedInput::text("7");
        let mut calc = Calculator::default();
        calc.add_field(bounded("DUR", 7.0, 1.0, 30.0).input(input.clone())).unwrap();

        input.set("40");
        calc.tick().unwrap();
        assert!(calc.field("DUR").unwrap().is_invalid());

        input.commit();
        let report = calc.tick().unwrap();
        assert!(!report.evaluated());
        assert_eq!(report.corrected, 1);
        assert_eq!(input.raw(), "30");
        assert!(!input.is_invalid());
        assert!(!calc.field("DUR").unwrap().is_invalid());

        // The write-back is not an edit
        assert!(!calc.tick().unwrap().evaluated());
    }

    #[test]
    fn test_invalid_survives_unrelated_recompute() {
        let duration = SharedInput::text("7");
        let price = SharedInput::text("100");
        let mut calc = Calculator::default();
        calc.add_field(bounded("DUR", 7.0, 1.0, 30.0).input(duration.clone())).unwrap();
        calc.add_field(FieldDescriptor::new("PRICE").value(100.0).input(price.clone())).unwrap();

        duration.set("40");
        calc.tick().unwrap();
        price.set("200");
        calc.tick().unwrap();
        assert!(calc.field("DUR").unwrap().is_invalid());

        duration.commit();
        assert_eq!(calc.tick().unwrap().corrected, 1);
        assert_eq!(duration.raw(), "30");
    }

    #[test]
    fn test_commit_ignored_without_fix_values_on_blur() {
        let input = SharedInput::text("7");
        let mut calc = Calculator::default();
        calc.set_options(OptionsUpdate::new().fix_values_on_blur(false));
        calc.add_field(bounded("DUR", 7.0, 1.0, 30.0).input(input.clone())).unwrap();

        input.set("40");
        input.commit();
        let report = calc.tick().unwrap();
        assert_eq!(report.corrected, 0);
        assert_eq!(input.raw(), "40");
        assert!(input.is_invalid());
    }

    #[test]
    fn test_populate_fields_data_annotates_inputs() {
        let input = SharedInput::text("2000000");
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("PRICE").value(4_000_000.0)).unwrap();
        calc.add_field(
            bounded("INV", 2_000_000.0, "=PRICE / 5", "=PRICE * 0.85").input(input.clone()),
        )
        .unwrap();

        calc.populate_fields_data();
        let annotation = input.annotation().unwrap();
        assert_eq!(annotation.min, Some(800_000.0));
        assert_eq!(annotation.max, Some(3_400_000.0));
        assert_eq!(annotation.value, crate::value::Value::Number(2_000_000.0));
    }

    #[test]
    fn test_condition_error_aborts_only_one_tick() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();

        let input = SharedInput::text("7");
        let sink = crate::io::MemorySink::new();
        let mut calc = Calculator::default();
        calc.add_field(FieldDescriptor::new("DUR").value(7.0).input(input.clone())).unwrap();
        calc.add_condition(move |_, _| {
            if flag.load(Ordering::SeqCst) {
                anyhow::bail!("rate table unavailable");
            }
            Ok(())
        });
        calc.add_result(CalculationDescriptor::new("Months", "DUR * 12").output(sink.clone()))
            .unwrap();

        input.set("8");
        assert!(matches!(calc.tick(), Err(CalcError::Condition(_))));
        assert_eq!(sink.count(), 0);

        fail.store(false, Ordering::SeqCst);
        let report = calc.tick().unwrap();
        assert!(report.evaluated());
        assert!(report.changed.is_empty());
        assert_eq!(report.outputs[0].value, 96.0);
        assert_eq!(sink.last().unwrap().formatted, "96");

        assert!(!calc.tick().unwrap().evaluated());
    }

    #[test]
    fn test_edit_clamped_after_failed_tick() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();

        let input = SharedInput::text("7");
        let mut calc = Calculator::default();
        calc.add_field(bounded("DUR", 7.0, 1.0, 30.0).input(input.clone())).unwrap();
        calc.add_condition(move |_, _| {
            if flag.load(Ordering::SeqCst) {
                anyhow::bail!("rate table unavailable");
            }
            Ok(())
        });

        input.set("40");
        input.commit();
        assert!(calc.tick().is_err());
        assert_eq!(input.raw(), "40");

        fail.store(false, Ordering::SeqCst);
        let report = calc.tick().unwrap();
        assert!(report.evaluated());
        assert_eq!(report.bounds.unwrap().invalid, vec!["DUR".to_string()]);
        assert_eq!(calc.values().number("DUR"), 30.0);
        assert_eq!(report.corrected, 1);
        assert_eq!(input.raw(), "30");
    }

    #[test]
    fn test_calc_hooks() {
        let seen = Arc::new(AtomicUsize::new(0));
        let before = seen.clone();
        let after = seen.clone();

        let mut calc = Calculator::default();
        calc.set_options(
            OptionsUpdate::new()
                .on_before_calc(move |values| {
                    assert_eq!(values.number("A"), 2.0);
                    before.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .on_after_calc(move |_, outputs| {
                    assert_eq!(outputs.len(), 1);
                    after.fetch_add(10, Ordering::SeqCst);
                    Ok(())
                }),
        );
        calc.add_field(FieldDescriptor::new("A").value(2.0)).unwrap();
        calc.add_result(CalculationDescriptor::new("Square", "A * A")).unwrap();

        calc.calc().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_failing_hook_is_reported() {
        let mut calc = Calculator::default();
        calc.set_options(OptionsUpdate::new().on_before_calc(|_| anyhow::bail!("no rates")));
        calc.add_result(CalculationDescriptor::new("One", 1.0)).unwrap();

        let err = calc.calc().unwrap_err();
        assert!(matches!(err, CalcError::Hook { hook: "on_before_calc", .. }));
    }
}
