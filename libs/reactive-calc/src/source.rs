//! Constant / formula / computed value sources
//!
//! Field values, field bounds and result formulas can each be a constant, a
//! formula string or a callback. A [`ValueSpec`] is the unresolved form used
//! in descriptors; registration resolves it into a [`ValueSource`], compiling
//! formulas so syntax errors surface during setup.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::formula::Formula;
use crate::value::{Value, ValueStore};

/// Callback computing a number from the current values
pub type ComputeFn = Arc<dyn Fn(&ValueStore) -> f64 + Send + Sync>;

/// Unresolved value specification as written in a descriptor
#[derive(Clone)]
pub enum ValueSpec {
    /// A fixed number or text
    Constant(Value),
    /// Formula text, with or without the leading `=`
    Expression(String),
    /// A callback
    Computed(ComputeFn),
}

impl ValueSpec {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&ValueStore) -> f64 + Send + Sync + 'static,
    {
        ValueSpec::Computed(Arc::new(f))
    }

    pub fn formula(text: impl Into<String>) -> Self {
        ValueSpec::Expression(text.into())
    }

    /// Resolve a field value or bound
    ///
    /// Only text starting with `=` is a formula; other text stays a constant.
    pub fn resolve(self) -> Result<ValueSource> {
        match self {
            ValueSpec::Constant(Value::Text(text)) if text.starts_with('=') => {
                Ok(ValueSource::Formula(Formula::compile(&text)?))
            },
            ValueSpec::Constant(value) => Ok(ValueSource::Constant(value)),
            ValueSpec::Expression(text) => Ok(ValueSource::Formula(Formula::compile(&text)?)),
            ValueSpec::Computed(f) => Ok(ValueSource::Computed(f)),
        }
    }

    /// Resolve a result formula, where any text is compiled
    pub fn resolve_formula(self) -> Result<ValueSource> {
        match self {
            ValueSpec::Constant(Value::Text(text)) | ValueSpec::Expression(text) => {
                Ok(ValueSource::Formula(Formula::compile(&text)?))
            },
            other => other.resolve(),
        }
    }
}

impl fmt::Debug for ValueSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSpec::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            ValueSpec::Expression(s) => f.debug_tuple("Expression").field(s).finish(),
            ValueSpec::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

macro_rules! constant_spec_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ValueSpec {
                fn from(value: $ty) -> Self {
                    ValueSpec::Constant(value.into())
                }
            }
        )*
    };
}

constant_spec_from!(Value, f64, i32, i64, bool, &str, String);

/// Resolved value source
#[derive(Clone)]
pub enum ValueSource {
    Constant(Value),
    Formula(Formula),
    Computed(ComputeFn),
}

impl ValueSource {
    /// Current value against the store
    pub fn resolve(&self, values: &ValueStore) -> Value {
        match self {
            ValueSource::Constant(v) => v.clone(),
            ValueSource::Formula(formula) => Value::Number(formula.evaluate(values)),
            ValueSource::Computed(f) => Value::Number(f(values)),
        }
    }

    /// Current numeric value against the store
    pub fn number(&self, values: &ValueStore) -> f64 {
        match self {
            ValueSource::Constant(v) => v.as_number(),
            ValueSource::Formula(formula) => formula.evaluate(values),
            ValueSource::Computed(f) => f(values),
        }
    }

    /// True for formula and callback sources, which are re-evaluated every cycle
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, ValueSource::Constant(_))
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            ValueSource::Formula(formula) => f.debug_tuple("Formula").field(&formula.source()).finish(),
            ValueSource::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl From<f64> for ValueSource {
    fn from(n: f64) -> Self {
        ValueSource::Constant(Value::Number(n))
    }
}

impl From<Formula> for ValueSource {
    fn from(formula: Formula) -> Self {
        ValueSource::Formula(formula)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn store() -> ValueStore {
        [("PRICE", 4_000_000.0)].into_iter().collect()
    }

    #[test]
    fn test_resolve_constant_and_formula() {
        let values = store();

        let constant = ValueSpec::from(625000.0).resolve().unwrap();
        assert!(!constant.is_dynamic());
        assert_eq!(constant.number(&values), 625000.0);

        let formula = ValueSpec::from("=PRICE / 5").resolve().unwrap();
        assert!(formula.is_dynamic());
        assert_eq!(formula.number(&values), 800000.0);
    }

    #[test]
    fn test_plain_text_stays_constant() {
        let source = ValueSpec::from("gold").resolve().unwrap();
        assert_eq!(source.resolve(&store()), Value::from("gold"));
    }

    #[test]
    fn test_result_formula_compiles_plain_text() {
        let source = ValueSpec::from("PRICE * 2").resolve_formula().unwrap();
        assert_eq!(source.number(&store()), 8_000_000.0);
    }

    #[test]
    fn test_computed() {
        let source = ValueSpec::computed(|v| v.number("PRICE") - 500000.0)
            .resolve()
            .unwrap();
        assert_eq!(source.resolve(&store()), Value::Number(3_500_000.0));
    }

    #[test]
    fn test_bad_formula_fails_on_resolve() {
        assert!(ValueSpec::from("=PRICE **").resolve().is_err());
    }
}
