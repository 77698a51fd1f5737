//! Trampoline drive configuration.
//!
//! A [`DriveConfig`] bounds how a drive loop executes steps:
//!
//! - `max_steps`: a step budget. A drive exceeding it stops with
//!   [`TaskError::StepBudgetExhausted`] instead of looping forever. Unbounded
//!   by default.
//! - `yield_every`: how often the asynchronous driver hands control back to
//!   the executor. Every 1024 steps by default; the synchronous driver
//!   ignores it.
//!
//! Both can be read from the environment:
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `DEFERRED_MAX_STEPS` | `max_steps` | positive integer |
//! | `DEFERRED_YIELD_EVERY` | `yield_every` | integer, `0` disables yielding |
//!
//! [`TaskError::StepBudgetExhausted`]: crate::TaskError::StepBudgetExhausted

use thiserror::Error;

use crate::tracing_compat::debug;

/// Environment variable holding the step budget.
pub const MAX_STEPS_ENV: &str = "DEFERRED_MAX_STEPS";

/// Environment variable holding the async yield interval.
pub const YIELD_EVERY_ENV: &str = "DEFERRED_YIELD_EVERY";

/// Steps between cooperative yields when nothing else is configured.
pub const DEFAULT_YIELD_INTERVAL: u32 = 1024;

/// A malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// The variable name.
        key: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Limits applied to a trampoline drive loop.
///
/// # Example
///
/// ```
/// use deferred::DriveConfig;
///
/// let config = DriveConfig::default().max_steps(10_000).no_yield();
/// assert_eq!(config.step_budget(), Some(10_000));
/// assert_eq!(config.yield_interval(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveConfig {
    max_steps: Option<u64>,
    yield_every: Option<u32>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            yield_every: Some(DEFAULT_YIELD_INTERVAL),
        }
    }
}

impl DriveConfig {
    /// Sets the step budget.
    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Removes the step budget.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Yields to the executor every `steps` asynchronous steps.
    ///
    /// Zero disables yielding.
    #[must_use]
    pub const fn yield_every(mut self, steps: u32) -> Self {
        self.yield_every = if steps == 0 { None } else { Some(steps) };
        self
    }

    /// Never yields to the executor.
    #[must_use]
    pub const fn no_yield(mut self) -> Self {
        self.yield_every = None;
        self
    }

    /// Returns the step budget, if any.
    #[must_use]
    pub const fn step_budget(&self) -> Option<u64> {
        self.max_steps
    }

    /// Returns the yield interval, if yielding is enabled.
    #[must_use]
    pub const fn yield_interval(&self) -> Option<u32> {
        self.yield_every
    }

    /// Returns true once `steps` executed steps reach the budget.
    pub(crate) const fn budget_exhausted(&self, steps: u64) -> bool {
        match self.max_steps {
            Some(max) => steps >= max,
            None => false,
        }
    }

    /// Returns true when the driver should yield after `steps` steps.
    pub(crate) fn should_yield(&self, steps: u64) -> bool {
        self.yield_every
            .is_some_and(|every| steps > 0 && steps % u64::from(every) == 0)
    }

    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to a
    /// value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a looked-up value does not
    /// parse.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_STEPS_ENV) {
            let steps = parse_value::<u64>(MAX_STEPS_ENV, &raw)?;
            if steps == 0 {
                return Err(ConfigError::InvalidValue {
                    key: MAX_STEPS_ENV,
                    value: raw,
                    reason: String::from("step budget must be positive"),
                });
            }
            config = config.max_steps(steps);
        }
        if let Some(raw) = lookup(YIELD_EVERY_ENV) {
            config = config.yield_every(parse_value::<u32>(YIELD_EVERY_ENV, &raw)?);
        }
        debug!(
            max_steps = ?config.max_steps,
            yield_every = ?config.yield_every,
            "drive config loaded"
        );
        Ok(config)
    }
}

fn parse_value<N>(key: &'static str, raw: &str) -> Result<N, ConfigError>
where
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<N>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: err.to_string(),
        })
}
