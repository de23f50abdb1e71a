//! Fields, parameters and their bounds

use std::fmt;
use std::sync::Arc;

use crate::error::{CalcError, Result};
use crate::io::InputSource;
use crate::source::{ValueSource, ValueSpec};
use crate::value::{Value, ValueStore};

/// Field definition as written by the calculator author
///
/// ```
/// use reactive_calc::{FieldDescriptor, SharedInput, ValueSpec};
///
/// let investment = FieldDescriptor::new("INV")
///     .title("Initial payment")
///     .name("investment")
///     .value(2_000_000.0)
///     .min("=PRICE / 5")
///     .max(ValueSpec::computed(|v| v.number("PRICE") * 0.85))
///     .input(SharedInput::text("2000000"));
/// ```
#[derive(Clone)]
pub struct FieldDescriptor {
    pub code: String,
    pub title: String,
    pub name: Option<String>,
    pub value: ValueSpec,
    pub min: Option<ValueSpec>,
    pub max: Option<ValueSpec>,
    pub input: Option<Arc<dyn InputSource>>,
}

impl FieldDescriptor {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: String::new(),
            name: None,
            value: ValueSpec::Constant(Value::default()),
            min: None,
            max: None,
            input: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Name of the linked input, used by `get_field_by_name`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: impl Into<ValueSpec>) -> Self {
        self.value = value.into();
        self
    }

    pub fn min(mut self, min: impl Into<ValueSpec>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<ValueSpec>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn input(mut self, input: Arc<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("code", &self.code)
            .field("title", &self.title)
            .field("name", &self.name)
            .field("value", &self.value)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("has_input", &self.input.is_some())
            .finish()
    }
}

/// Resolved bounds of a field; either side may be open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MinMax {
    /// Both sides, when the field is bounded on both
    pub fn closed(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }
}

/// A registered field
pub struct Field {
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) name: Option<String>,
    pub(crate) value: ValueSource,
    pub(crate) min: Option<ValueSource>,
    pub(crate) max: Option<ValueSource>,
    pub(crate) last_min: Option<f64>,
    pub(crate) last_max: Option<f64>,
    pub(crate) invalid: bool,
    pub(crate) input: Option<Arc<dyn InputSource>>,
    /// Last value read from the input; change detection compares against it
    pub(crate) last_input: Value,
}

impl Field {
    /// Resolve a descriptor, compiling formulas and checking constant bounds
    pub(crate) fn from_descriptor(descriptor: FieldDescriptor) -> Result<Self> {
        let value = descriptor.value.resolve()?;
        let min = descriptor.min.map(ValueSpec::resolve).transpose()?;
        let max = descriptor.max.map(ValueSpec::resolve).transpose()?;

        if let (Some(ValueSource::Constant(lo)), Some(ValueSource::Constant(hi))) = (&min, &max) {
            let (lo, hi) = (lo.as_number(), hi.as_number());
            if lo > hi {
                return Err(CalcError::InvalidBounds {
                    code: descriptor.code,
                    min: lo,
                    max: hi,
                });
            }
        }

        Ok(Self {
            code: descriptor.code,
            title: descriptor.title,
            name: descriptor.name,
            value,
            min,
            max,
            last_min: None,
            last_max: None,
            invalid: false,
            input: descriptor.input,
            last_input: Value::default(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value_source(&self) -> &ValueSource {
        &self.value
    }

    /// True when the value is a formula or callback recomputed every cycle
    pub fn is_computed(&self) -> bool {
        self.value.is_dynamic()
    }

    /// True while the field holds a clamped value not yet written back
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn input(&self) -> Option<&Arc<dyn InputSource>> {
        self.input.as_ref()
    }

    /// Bounds seen by the last bounds pass
    pub fn last_bounds(&self) -> MinMax {
        MinMax {
            min: self.last_min,
            max: self.last_max,
        }
    }

    pub fn set_min(&mut self, min: Option<ValueSource>) {
        self.min = min;
    }

    pub fn set_max(&mut self, max: Option<ValueSource>) {
        self.max = max;
    }

    /// Resolve the bounds against the current values
    ///
    /// `None` only when neither side is defined.
    pub fn min_max(&self, values: &ValueStore) -> Option<MinMax> {
        if self.min.is_none() && self.max.is_none() {
            return None;
        }
        Some(MinMax {
            min: self.min.as_ref().map(|s| s.number(values)),
            max: self.max.as_ref().map(|s| s.number(values)),
        })
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("code", &self.code)
            .field("title", &self.title)
            .field("name", &self.name)
            .field("value", &self.value)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("invalid", &self.invalid)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of fields
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }

    pub fn get(&self, code: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.code == code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.code == code)
    }

    /// Find a field by the name of its input
    pub fn by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }
}

impl<'a> IntoIterator for &'a FieldRegistry {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
