//! Result definitions
//!
//! A calculation evaluates its formula against the value store and publishes
//! the formatted value to its sinks. With a code it also becomes a named
//! value that later calculations can reference.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::format::to_fixed;
use crate::io::ResultSink;
use crate::source::{ValueSource, ValueSpec};

/// Formats a raw result for display
pub type FormatFn = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Result definition as written by the calculator author
#[derive(Clone)]
pub struct CalculationDescriptor {
    pub code: Option<String>,
    pub title: String,
    pub formula: ValueSpec,
    pub format: Option<FormatFn>,
    pub outputs: Vec<Arc<dyn ResultSink>>,
}

impl CalculationDescriptor {
    /// `formula` may be formula text (the `=` is optional), a number or a callback
    pub fn new(title: impl Into<String>, formula: impl Into<ValueSpec>) -> Self {
        Self {
            code: None,
            title: title.into(),
            formula: formula.into(),
            format: None,
            outputs: Vec::new(),
        }
    }

    /// Publish the raw value under `code` for later calculations
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn format<F>(mut self, format: F) -> Self
    where
        F: Fn(f64) -> String + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(format));
        self
    }

    pub fn output(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.outputs.push(sink);
        self
    }
}

impl fmt::Debug for CalculationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculationDescriptor")
            .field("code", &self.code)
            .field("title", &self.title)
            .field("formula", &self.formula)
            .field("outputs", &self.outputs.len())
            .finish_non_exhaustive()
    }
}

/// Round to an integer
fn default_format() -> FormatFn {
    Arc::new(|value: f64| to_fixed(value, 0))
}

/// A registered calculation
pub struct Calculation {
    pub(crate) code: Option<String>,
    pub(crate) title: String,
    pub(crate) formula: ValueSource,
    pub(crate) format: FormatFn,
    pub(crate) outputs: Vec<Arc<dyn ResultSink>>,
}

impl Calculation {
    pub(crate) fn from_descriptor(descriptor: CalculationDescriptor) -> Result<Self> {
        let formula = descriptor.formula.resolve_formula()?;
        let format = descriptor.format.unwrap_or_else(default_format);

        Ok(Self {
            code: descriptor.code,
            title: descriptor.title,
            formula,
            format,
            outputs: descriptor.outputs,
        })
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn formula(&self) -> &ValueSource {
        &self.formula
    }
}

impl fmt::Debug for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculation")
            .field("code", &self.code)
            .field("title", &self.title)
            .field("formula", &self.formula)
            .finish_non_exhaustive()
    }
}

/// One evaluated result, as handed to `on_after_calc`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcOutput {
    pub title: String,
    pub value: f64,
    pub value_formatted: String,
}
