//! Mortgage calculator: down payment, duration and price in, monthly payment
//! and interest rate out

use std::collections::BTreeMap;
use std::sync::Arc;

use reactive_calc::format::js_number;
use reactive_calc::{
    number_with_spaces, CalculationDescriptor, Calculator, CalculatorOptions, FieldDescriptor,
    SharedInput, ValueSpec,
};

/// Calculator plus the inputs a host can type into, keyed by field code
pub struct Mortgage {
    pub calculator: Calculator,
    pub inputs: BTreeMap<String, Arc<SharedInput>>,
}

impl Mortgage {
    /// Input by field code or input name
    pub fn input(&self, key: &str) -> Option<&Arc<SharedInput>> {
        self.inputs.get(key).or_else(|| {
            let field = self.calculator.get_field_by_name(key)?;
            self.inputs.get(field.code())
        })
    }
}

fn max_investment(price: f64) -> f64 {
    if (price - 500_000.0) / price <= 0.85 {
        price - 500_000.0
    } else {
        price * 0.85
    }
}

pub fn build(options: CalculatorOptions) -> reactive_calc::Result<Mortgage> {
    let investment = SharedInput::text("2 000 000");
    let duration = SharedInput::text("7");
    let price = SharedInput::text("4 000 000");

    let mut calculator = Calculator::new(options);
    calculator.add_field(
        FieldDescriptor::new("INV")
            .title("Down payment")
            .name("investment")
            .value(2_000_000.0)
            .min("=PRICE / 5")
            .max(ValueSpec::computed(|v| max_investment(v.number("PRICE"))))
            .input(investment.clone()),
    )?;
    calculator.add_field(
        FieldDescriptor::new("DUR")
            .title("Duration, years")
            .name("duration")
            .value(7.0)
            .min(1.0)
            .max(30.0)
            .input(duration.clone()),
    )?;
    calculator.add_field(
        FieldDescriptor::new("PRICE")
            .title("Property price")
            .name("price")
            .value(4_000_000.0)
            .min(625_000.0)
            .max(20_000_000.0)
            .input(price.clone()),
    )?;

    // Discounted rate for half down and at most seven years
    calculator.add_parameter(FieldDescriptor::new("RATE").title("Interest rate").value(
        ValueSpec::computed(|v| {
            if v.number("INV") / v.number("PRICE") >= 0.5 && v.number("DUR") <= 7.0 {
                11.3
            } else {
                11.8
            }
        }),
    ))?;

    calculator.add_result(
        CalculationDescriptor::new(
            "Monthly payment",
            ValueSpec::computed(|v| {
                let principal = v.number("PRICE") - v.number("INV");
                let monthly = v.number("RATE") / 1200.0;
                let months = v.number("DUR") * 12.0 - 1.0;
                principal * monthly / (1.0 - (1.0 + monthly).powf(-months))
            }),
        )
        .format(|value| format!("{} ₽", number_with_spaces(value.round()))),
    )?;
    calculator.add_result(
        CalculationDescriptor::new("Interest rate", "=RATE")
            .format(|value| format!("{}%", js_number(value).replace('.', ","))),
    )?;

    let inputs = BTreeMap::from([
        ("INV".to_string(), investment),
        ("DUR".to_string(), duration),
        ("PRICE".to_string(), price),
    ]);

    Ok(Mortgage { calculator, inputs })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mortgage() {
        common::init_test_logging();
        let mut mortgage = build(CalculatorOptions::default()).unwrap();
        mortgage.calculator.force_change();
        let report = mortgage.calculator.tick().unwrap();

        assert_eq!(report.outputs[0].value_formatted, "34 835 ₽");
        assert_eq!(report.outputs[1].value_formatted, "11,3%");
    }

    #[test]
    fn test_max_investment_switches_at_85_percent() {
        assert_eq!(max_investment(1_000_000.0), 500_000.0);
        assert_eq!(max_investment(10_000_000.0), 8_500_000.0);
    }

    #[test]
    fn test_input_lookup_by_code_or_name() {
        let mortgage = build(CalculatorOptions::default()).unwrap();
        assert!(mortgage.input("DUR").is_some());
        assert!(mortgage.input("duration").is_some());
        assert!(mortgage.input("RATE").is_none());
    }
}
