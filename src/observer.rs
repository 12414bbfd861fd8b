//! Diagnostic sinks for right-hand-side and Jacobian evaluations.
//!
//! The numeric model reports every evaluation the solver asks for to an
//! [EvaluationObserver]. Observers only look; nothing they do feeds back into
//! the returned derivatives or Jacobians.

use std::cell::RefCell;
use std::fmt;

/// Which callback produced an [Evaluation].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationKind {
    Model,
    Jacobian,
}

impl fmt::Display for EvaluationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationKind::Model => write!(f, "Model"),
            EvaluationKind::Jacobian => write!(f, "Jacobian"),
        }
    }
}

/// One callback evaluation: the time and state asked for and the values returned.
///
/// For [EvaluationKind::Model] the values are the derivatives, for
/// [EvaluationKind::Jacobian] the matrix entries in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub kind: EvaluationKind,
    pub t: f64,
    pub y: Vec<f64>,
    pub values: Vec<f64>,
}

impl Evaluation {
    /// Tab separated line: kind, t, state values, output values.
    pub fn to_line(&self) -> String {
        let mut line = format!("{}\t{}", self.kind, self.t);
        for v in self.y.iter().chain(self.values.iter()) {
            line.push('\t');
            line.push_str(&v.to_string());
        }
        line
    }
}

pub trait EvaluationObserver {
    /// Whether records should be built at all; evaluations skip the
    /// allocation when this returns false.
    fn enabled(&self) -> bool {
        true
    }

    fn record(&self, evaluation: Evaluation);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EvaluationObserver for NoopObserver {
    #[inline(always)]
    fn enabled(&self) -> bool {
        false
    }

    #[inline(always)]
    fn record(&self, _evaluation: Evaluation) {}
}

/// Keeps every evaluation in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    evaluations: RefCell<Vec<Evaluation>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.evaluations.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.borrow().is_empty()
    }

    pub fn count(&self, kind: EvaluationKind) -> usize {
        self.evaluations
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn lines(&self) -> Vec<String> {
        self.evaluations.borrow().iter().map(|e| e.to_line()).collect()
    }

    pub fn into_evaluations(self) -> Vec<Evaluation> {
        self.evaluations.into_inner()
    }
}

impl EvaluationObserver for RecordingObserver {
    fn record(&self, evaluation: Evaluation) {
        self.evaluations.borrow_mut().push(evaluation);
    }
}

/// Forwards each evaluation to `tracing` at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EvaluationObserver for TracingObserver {
    fn enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::TRACE)
    }

    fn record(&self, evaluation: Evaluation) {
        tracing::trace!(target: "emission_check::evaluation", "{}", evaluation.to_line());
    }
}
