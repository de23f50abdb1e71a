//! Calculator options and hooks
//!
//! The flags deserialize from configuration files; hooks are attached at
//! runtime through [`OptionsUpdate`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::calculation::CalcOutput;
use crate::scheduler::DEFAULT_TICK_MS;
use crate::value::ValueStore;

/// Runs before the results are evaluated
pub type BeforeCalcHook = Arc<dyn Fn(&ValueStore) -> anyhow::Result<()> + Send + Sync>;

/// Runs after all results are evaluated and published
pub type AfterCalcHook =
    Arc<dyn Fn(&ValueStore, &[CalcOutput]) -> anyhow::Result<()> + Send + Sync>;

/// Runs once per bounds pass in which any field's bounds moved
pub type BoundsChangeHook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CalcHooks {
    pub on_before_calc: Option<BeforeCalcHook>,
    pub on_after_calc: Option<AfterCalcHook>,
    pub on_bounds_change: Option<BoundsChangeHook>,
}

impl fmt::Debug for CalcHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalcHooks")
            .field("on_before_calc", &self.on_before_calc.is_some())
            .field("on_after_calc", &self.on_after_calc.is_some())
            .field("on_bounds_change", &self.on_bounds_change.is_some())
            .finish()
    }
}

/// Calculator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorOptions {
    /// Send bounds and value annotations to field inputs
    pub populate_fields_data: bool,
    /// Write clamped values back to inputs after a commit (blur/change)
    pub fix_values_on_blur: bool,
    /// Scheduler period in milliseconds
    pub tick_ms: u64,
    #[serde(skip)]
    pub hooks: CalcHooks,
}

impl Default for CalculatorOptions {
    fn default() -> Self {
        Self {
            populate_fields_data: true,
            fix_values_on_blur: true,
            tick_ms: DEFAULT_TICK_MS,
            hooks: CalcHooks::default(),
        }
    }
}

impl CalculatorOptions {
    /// Merge a partial update; unset entries keep their current value
    pub fn apply(&mut self, update: OptionsUpdate) {
        if let Some(v) = update.populate_fields_data {
            self.populate_fields_data = v;
        }
        if let Some(v) = update.fix_values_on_blur {
            self.fix_values_on_blur = v;
        }
        if let Some(v) = update.tick_ms {
            self.tick_ms = v;
        }
        if let Some(hook) = update.on_before_calc {
            self.hooks.on_before_calc = Some(hook);
        }
        if let Some(hook) = update.on_after_calc {
            self.hooks.on_after_calc = Some(hook);
        }
        if let Some(hook) = update.on_bounds_change {
            self.hooks.on_bounds_change = Some(hook);
        }
    }
}

/// Partial options for `Calculator::set_options`
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptionsUpdate {
    pub populate_fields_data: Option<bool>,
    pub fix_values_on_blur: Option<bool>,
    pub tick_ms: Option<u64>,
    #[serde(skip)]
    pub on_before_calc: Option<BeforeCalcHook>,
    #[serde(skip)]
    pub on_after_calc: Option<AfterCalcHook>,
    #[serde(skip)]
    pub on_bounds_change: Option<BoundsChangeHook>,
}

impl OptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate_fields_data(mut self, enabled: bool) -> Self {
        self.populate_fields_data = Some(enabled);
        self
    }

    pub fn fix_values_on_blur(mut self, enabled: bool) -> Self {
        self.fix_values_on_blur = Some(enabled);
        self
    }

    pub fn tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = Some(tick_ms);
        self
    }

    pub fn on_before_calc<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValueStore) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_before_calc = Some(Arc::new(hook));
        self
    }

    pub fn on_after_calc<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValueStore, &[CalcOutput]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_after_calc = Some(Arc::new(hook));
        self
    }

    pub fn on_bounds_change<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_bounds_change = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for OptionsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsUpdate")
            .field("populate_fields_data", &self.populate_fields_data)
            .field("fix_values_on_blur", &self.fix_values_on_blur)
            .field("tick_ms", &self.tick_ms)
            .finish_non_exhaustive()
    }
}
