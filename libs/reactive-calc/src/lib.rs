//! reactive-calc - Reactive calculator engine
//!
//! A calculator is a set of named numeric fields, optional bounds on them,
//! conditions that adjust values, and results computed from formulas. Input
//! changes are picked up by a periodic change-detection cycle which re-runs
//! the whole pipeline.
//!
//! # Architecture
//!
//! ```text
//! InputSource ──read──▶ ValueStore ◀──── conditions
//!      ▲                    │
//!      │ write (commit)     ├──▶ bounds resolver (clamp, invalid flag)
//!      │                    │
//!      └──── fix_values ◀───┴──▶ results ──publish──▶ ResultSink
//! ```
//!
//! # Example
//!
//! ```rust
//! use reactive_calc::{CalculationDescriptor, Calculator, FieldDescriptor, SharedInput};
//!
//! let duration = SharedInput::text("40");
//!
//! let mut calc = Calculator::default();
//! calc.add_field(
//!     FieldDescriptor::new("DUR")
//!         .value(7.0)
//!         .min(1.0)
//!         .max(30.0)
//!         .input(duration.clone()),
//! )
//! .unwrap();
//! calc.add_result(CalculationDescriptor::new("Months", "=DUR * 12")).unwrap();
//!
//! // 40 is out of range: the value store holds 30 and the input is flagged
//! let report = calc.tick().unwrap();
//! assert_eq!(report.outputs[0].value, 360.0);
//! assert!(duration.is_invalid());
//!
//! // On blur the clamped value is written back to the input
//! duration.commit();
//! calc.tick().unwrap();
//! assert_eq!(duration.raw(), "30");
//! ```
//!
//! # Formulas
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `=` prefix | Marks text as a formula in field values and bounds |
//! | `+ - * / %` | Arithmetic, usual precedence, left associative |
//! | `-x`, `+x` | Unary sign |
//! | `( )` | Grouping |
//! | `CODE` | Value of a field, parameter or coded result (NaN when unknown) |

pub mod calculation;
pub mod calculator;
pub mod condition;
pub mod error;
pub mod field;
pub mod format;
pub mod formula;
pub mod io;
pub mod options;
pub mod scheduler;
pub mod source;
pub mod value;

// Re-exports for convenience
pub use calculation::{CalcOutput, Calculation, CalculationDescriptor, FormatFn};
pub use calculator::{BoundsReport, Calculator, TickReport};
pub use condition::ConditionFn;
pub use error::{CalcError, Result};
pub use field::{Field, FieldDescriptor, FieldRegistry, MinMax};
pub use formula::Formula;
pub use io::{
    CommitNotifier, FieldAnnotation, InputKind, InputSource, MemorySink, Publication, ResultSink,
    SharedInput,
};
pub use options::{CalcHooks, CalculatorOptions, OptionsUpdate};
pub use scheduler::{CalcScheduler, SchedulerStatus, DEFAULT_TICK_MS};
pub use source::{ComputeFn, ValueSource, ValueSpec};
pub use value::{Value, ValueStore};

// Formatting helpers for result formats
pub use format::{number_with_spaces, to_fixed};
