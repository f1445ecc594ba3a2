//! Termination by a run of stable rounds.
//!
//! A round is *stable* when no point changed exemplar. The monitor counts
//! consecutive stable rounds and switches to [`ConvergenceState::Converged`]
//! once the count reaches the threshold; any unstable round resets the count.
//! Requiring a run of stable rounds (rather than one) keeps a transient fixed
//! point from ending the run while messages are still moving.
//!
//! ```text
//!            unstable: count = 0
//!          ┌──────────┐
//!          ▼          │
//!      ┌─────────┐ ───┘         count == threshold   ┌───────────┐
//!      │ Running │ ─────────────────────────────────▶ │ Converged │
//!      └─────────┘  stable: count += 1                └───────────┘
//! ```
//!
//! The base design has no iteration cap; [`ConvergenceMonitor::with_max_iterations`]
//! adds one, reported through [`ConvergenceMonitor::exhausted`].

/// Default number of consecutive stable rounds required.
pub const DEFAULT_CONVERGENCE_ROUNDS: usize = 10;

/// Monitor state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConvergenceState {
    /// Still iterating.
    Running,
    /// The stable-round threshold was reached. Terminal.
    Converged,
}

/// Counts stable rounds and decides when to stop iterating.
#[derive(Clone, Debug)]
pub struct ConvergenceMonitor {
    threshold: usize,
    max_iterations: Option<usize>,
    stable_rounds: usize,
    iterations: usize,
    state: ConvergenceState,
}

impl ConvergenceMonitor {
    /// A monitor requiring `threshold` consecutive stable rounds, with no iteration cap.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            max_iterations: None,
            stable_rounds: 0,
            iterations: 0,
            state: ConvergenceState::Running,
        }
    }

    /// Add an optional iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Record the outcome of one full iteration and return the new state.
    ///
    /// Observations after convergence are counted but cannot leave `Converged`.
    pub fn observe(&mut self, stable: bool) -> ConvergenceState {
        self.iterations += 1;
        if self.state == ConvergenceState::Converged {
            return self.state;
        }
        if stable {
            self.stable_rounds += 1;
        } else {
            self.stable_rounds = 0;
        }
        if self.stable_rounds >= self.threshold {
            self.state = ConvergenceState::Converged;
        }
        self.state
    }

    /// Current state.
    pub fn state(&self) -> ConvergenceState {
        self.state
    }

    /// `true` once converged.
    pub fn is_converged(&self) -> bool {
        self.state == ConvergenceState::Converged
    }

    /// `true` when still running and the iteration cap (if any) has been reached.
    pub fn exhausted(&self) -> bool {
        !self.is_converged() && self.max_iterations.is_some_and(|cap| self.iterations >= cap)
    }

    /// Consecutive stable rounds so far.
    pub fn stable_rounds(&self) -> usize {
        self.stable_rounds
    }

    /// Full iterations observed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Required consecutive stable rounds.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Back to `Running` with zero counts.
    pub fn reset(&mut self) {
        self.stable_rounds = 0;
        self.iterations = 0;
        self.state = ConvergenceState::Running;
    }
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERGENCE_ROUNDS)
    }
}
