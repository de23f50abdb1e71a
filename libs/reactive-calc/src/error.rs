//! Error types for reactive-calc

use thiserror::Error;

/// Calculator errors
///
/// Configuration errors (`FormulaSyntax`, `DuplicateCode`, `InvalidCode`,
/// `InvalidBounds`) are returned from setup calls. `Condition` and `Hook`
/// abort a single cycle; the next tick runs normally.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("Formula syntax error in '{formula}' at position {position}: {message}")]
    FormulaSyntax {
        formula: String,
        position: usize,
        message: String,
    },

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("Invalid code '{0}': expected a letter followed by letters or digits")]
    InvalidCode(String),

    #[error("Invalid bounds for {code}: min {min} is greater than max {max}")]
    InvalidBounds { code: String, min: f64, max: f64 },

    #[error("Condition failed: {0}")]
    Condition(#[source] anyhow::Error),

    #[error("Hook {hook} failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CalcError {
    pub fn syntax(formula: &str, position: usize, message: impl Into<String>) -> Self {
        Self::FormulaSyntax {
            formula: formula.to_string(),
            position,
            message: message.into(),
        }
    }

    pub fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Self::Hook { hook, source }
    }

    /// True for errors raised while registering fields, results or formulas
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::FormulaSyntax { .. }
                | Self::DuplicateCode(_)
                | Self::InvalidCode(_)
                | Self::InvalidBounds { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
