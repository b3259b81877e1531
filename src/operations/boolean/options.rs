use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BooleanError, Result};

/// How much the detector may assume about how the operands touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glue {
    /// No assumption; every interference is computed.
    #[default]
    Off,
    /// Operands touch only along coincident faces. Edge-face crossing points
    /// and face-face section curves are skipped.
    Shift,
    /// Operands share coincident sub-shapes. In addition, edge-edge crossing
    /// points and all edge-face and face-face pairs are skipped.
    Full,
}

impl Glue {
    /// Whether edge-face and face-face pairs are evaluated at all.
    #[must_use]
    pub fn checks_faces(self) -> bool {
        self != Self::Full
    }

    /// Whether isolated crossing points and section curves are computed.
    #[must_use]
    pub fn computes_crossings(self) -> bool {
        self == Self::Off
    }
}

/// Cooperative cancellation flag shared between a caller and a running
/// operation.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct ProgressToken {
    cancelled: Arc<AtomicBool>,
}

impl ProgressToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails with [`BooleanError::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the token was cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(BooleanError::Cancelled.into());
        }
        Ok(())
    }
}

/// Settings of a boolean operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanOptions {
    /// Extra tolerance added on top of every entity tolerance.
    pub fuzzy_value: f64,
    /// Evaluate candidate pairs and split faces on the rayon pool.
    pub run_parallel: bool,
    /// Detection shortcuts for operands known to touch in a restricted way.
    pub glue: Glue,
    /// Check that every result solid encloses positive volume.
    pub check_inverted: bool,
    /// Also intersect sub-shapes of the same operand with each other.
    pub self_interference: bool,
    /// Cancellation flag polled between units of work.
    #[serde(skip)]
    pub progress: ProgressToken,
}

impl Default for BooleanOptions {
    fn default() -> Self {
        Self {
            fuzzy_value: 0.0,
            run_parallel: true,
            glue: Glue::Off,
            check_inverted: true,
            self_interference: false,
            progress: ProgressToken::default(),
        }
    }
}

impl BooleanOptions {
    /// Sets the fuzzy value.
    #[must_use]
    pub fn with_fuzzy_value(mut self, fuzzy_value: f64) -> Self {
        self.fuzzy_value = fuzzy_value;
        self
    }

    /// Enables or disables parallel evaluation.
    #[must_use]
    pub fn with_parallel(mut self, run_parallel: bool) -> Self {
        self.run_parallel = run_parallel;
        self
    }

    /// Sets the glue mode.
    #[must_use]
    pub fn with_glue(mut self, glue: Glue) -> Self {
        self.glue = glue;
        self
    }

    /// Enables or disables the orientation check of result solids.
    #[must_use]
    pub fn with_check_inverted(mut self, check_inverted: bool) -> Self {
        self.check_inverted = check_inverted;
        self
    }

    /// Enables or disables self-interference detection.
    #[must_use]
    pub fn with_self_interference(mut self, self_interference: bool) -> Self {
        self.self_interference = self_interference;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressToken) -> Self {
        self.progress = progress;
        self
    }

    /// Checks the option values.
    ///
    /// # Errors
    ///
    /// Returns [`BooleanError::InvalidFuzzyValue`] for a negative or
    /// non-finite fuzzy value.
    pub fn validate(&self) -> Result<()> {
        if !self.fuzzy_value.is_finite() || self.fuzzy_value < 0.0 {
            return Err(BooleanError::InvalidFuzzyValue(self.fuzzy_value).into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BooleanOptions::default();
        assert!(options.fuzzy_value.abs() < f64::EPSILON);
        assert!(options.run_parallel);
        assert_eq!(options.glue, Glue::Off);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn negative_fuzzy_is_rejected() {
        let options = BooleanOptions::default().with_fuzzy_value(-1e-3);
        assert!(options.validate().is_err());
        let options = BooleanOptions::default().with_fuzzy_value(f64::NAN);
        assert!(options.validate().is_err());
    }

    #[test]
    fn token_clones_share_the_flag() {
        let token = ProgressToken::new();
        let options = BooleanOptions::default().with_progress(token.clone());
        assert!(options.progress.check().is_ok());
        token.cancel();
        assert!(options.progress.is_cancelled());
        assert!(options.progress.check().is_err());
    }

    #[test]
    fn glue_modes() {
        assert!(Glue::Off.checks_faces() && Glue::Off.computes_crossings());
        assert!(Glue::Shift.checks_faces() && !Glue::Shift.computes_crossings());
        assert!(!Glue::Full.checks_faces() && !Glue::Full.computes_crossings());
    }
}
