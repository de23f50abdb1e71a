//! Boundary to the external input and view layers
//!
//! The engine never touches a UI directly. Each field may be linked to an
//! [`InputSource`] (read/write the user-editable value, receive validity and
//! bounds annotations) and each result publishes to any number of
//! [`ResultSink`]s. [`SharedInput`] and [`MemorySink`] are in-memory
//! implementations used by hosts without a real UI and by tests.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::value::Value;

/// Per-field state handed to the input after a bounds pass
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAnnotation {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub value: Value,
}

/// Externally owned input linked to a field
pub trait InputSource: Send + Sync {
    /// Current value, already coerced (number, 1/0 flag or raw option text)
    fn read(&self) -> Value;

    /// Overwrite the input with a corrected value
    fn write(&self, value: &Value);

    /// Register for commit (blur/change) notifications
    fn subscribe(&self, _notifier: CommitNotifier) {}

    /// Show or clear the out-of-range marker
    fn mark_invalid(&self, _invalid: bool) {}

    /// Receive the resolved bounds and current value
    fn annotate(&self, _annotation: &FieldAnnotation) {}
}

/// Output target of a result
pub trait ResultSink: Send + Sync {
    fn publish(&self, value: f64, formatted: &str);
}

/// Handle an input uses to request a correction pass
///
/// Raising it only sets a flag; the correction runs on the next cycle.
#[derive(Debug, Clone, Default)]
pub struct CommitNotifier {
    pending: Arc<AtomicBool>,
}

impl CommitNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume a pending notification
    pub(crate) fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// How raw input text is coerced on read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Free text or number input, coerced to a number
    Text,
    /// Checkbox, read as 1 or 0
    Checkbox,
    /// Enumerated choice, read as the raw option string
    Select,
}

/// Parse user-typed numeric text
///
/// Every character except digits, `.` and `,` is dropped, then the longest
/// leading decimal number is parsed. `"2 000 000 ₽"` reads as `2000000`,
/// `"1,5"` as `1` and an empty string as NaN.
pub fn parse_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + 1;
    }

    if !seen_digit {
        return f64::NAN;
    }
    cleaned[..end].parse().unwrap_or(f64::NAN)
}

#[derive(Debug, Default)]
struct InputState {
    raw: String,
    checked: bool,
    invalid: bool,
    annotation: Option<FieldAnnotation>,
    subscribers: Vec<CommitNotifier>,
}

/// In-memory input
#[derive(Debug)]
pub struct SharedInput {
    kind: InputKind,
    state: Mutex<InputState>,
}

impl SharedInput {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            state: Mutex::new(InputState::default()),
        }
    }

    pub fn text(raw: impl Into<String>) -> Arc<Self> {
        let input = Self::new(InputKind::Text);
        input.state.lock().raw = raw.into();
        Arc::new(input)
    }

    pub fn checkbox(checked: bool) -> Arc<Self> {
        let input = Self::new(InputKind::Checkbox);
        input.state.lock().checked = checked;
        Arc::new(input)
    }

    pub fn select(option: impl Into<String>) -> Arc<Self> {
        let input = Self::new(InputKind::Select);
        input.state.lock().raw = option.into();
        Arc::new(input)
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// Simulate the user typing or choosing a value
    pub fn set(&self, raw: impl Into<String>) {
        self.state.lock().raw = raw.into();
    }

    pub fn set_checked(&self, checked: bool) {
        self.state.lock().checked = checked;
    }

    /// Simulate blur/change: notify every subscriber
    pub fn commit(&self) {
        let subscribers = self.state.lock().subscribers.clone();
        for notifier in subscribers {
            notifier.notify();
        }
    }

    pub fn raw(&self) -> String {
        self.state.lock().raw.clone()
    }

    pub fn is_checked(&self) -> bool {
        self.state.lock().checked
    }

    pub fn is_invalid(&self) -> bool {
        self.state.lock().invalid
    }

    pub fn annotation(&self) -> Option<FieldAnnotation> {
        self.state.lock().annotation.clone()
    }
}

impl InputSource for SharedInput {
    fn read(&self) -> Value {
        let state = self.state.lock();
        match self.kind {
            InputKind::Text => Value::Number(parse_numeric(&state.raw)),
            InputKind::Checkbox => Value::from(state.checked),
            InputKind::Select => Value::Text(state.raw.clone()),
        }
    }

    fn write(&self, value: &Value) {
        let mut state = self.state.lock();
        match self.kind {
            InputKind::Checkbox => {
                let n = value.as_number();
                state.checked = n != 0.0 && !n.is_nan();
            },
            InputKind::Text | InputKind::Select => state.raw = value.to_string(),
        }
    }

    fn subscribe(&self, notifier: CommitNotifier) {
        self.state.lock().subscribers.push(notifier);
    }

    fn mark_invalid(&self, invalid: bool) {
        self.state.lock().invalid = invalid;
    }

    fn annotate(&self, annotation: &FieldAnnotation) {
        self.state.lock().annotation = Some(annotation.clone());
    }
}

/// One value published to a sink
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub value: f64,
    pub formatted: String,
}

/// In-memory result sink recording every publication
#[derive(Debug, Default)]
pub struct MemorySink {
    publications: Mutex<Vec<Publication>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last(&self) -> Option<Publication> {
        self.publications.lock().last().cloned()
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.publications.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.publications.lock().len()
    }
}

impl ResultSink for MemorySink {
    fn publish(&self, value: f64, formatted: &str) {
        self.publications.lock().push(Publication {
            value,
            formatted: formatted.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("2 000 000"), 2_000_000.0);
        assert_eq!(parse_numeric("7 лет"), 7.0);
        assert_eq!(parse_numeric("11.3%"), 11.3);
        assert_eq!(parse_numeric("1,5"), 1.0);
        assert_eq!(parse_numeric("1.2.3"), 1.2);
        assert_eq!(parse_numeric(".5"), 0.5);
        assert!(parse_numeric("").is_nan());
        assert!(parse_numeric("abc").is_nan());
        assert!(parse_numeric(",5").is_nan());
    }

    #[test]
    fn test_shared_input_kinds() {
        let text = SharedInput::text("4 000 000");
        assert_eq!(text.read(), Value::Number(4_000_000.0));

        let checkbox = SharedInput::checkbox(true);
        assert_eq!(checkbox.read(), Value::Number(1.0));
        checkbox.write(&Value::Number(0.0));
        assert!(!checkbox.is_checked());

        let select = SharedInput::select("2");
        assert_eq!(select.read(), Value::from("2"));
    }

    #[test]
    fn test_write_renders_number() {
        let input = SharedInput::text("40");
        input.write(&Value::Number(30.0));
        assert_eq!(input.raw(), "30");
        assert_eq!(input.read(), Value::Number(30.0));
    }

    #[test]
    fn test_commit_notifies_subscribers() {
        let input = SharedInput::text("1");
        let notifier = CommitNotifier::new();
        input.subscribe(notifier.clone());

        assert!(!notifier.is_pending());
        input.commit();
        assert!(notifier.is_pending());
        assert!(notifier.take());
        assert!(!notifier.take());
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.publish(1.5, "2");
        sink.publish(3.0, "3");
        assert_eq!(sink.count(), 2);
        assert_eq!(
            sink.last(),
            Some(Publication {
                value: 3.0,
                formatted: "3".to_string()
            })
        );
    }
}
