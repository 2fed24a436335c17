//! Diagnostics hooks for the dispatch pipeline.
//!
//! The store calls these hooks at fixed points as each action moves through
//! dispatch, middleware, flattening, the error boundary, and reduction.
//! Hooks are pure notifications: they receive references, return nothing,
//! and must never affect pipeline behavior. The default body of every hook
//! is a no-op, so implementors override only the points they care about.

use crate::core::{Action, State};

/// Observation points along the dispatch pipeline.
///
/// One logger serves the whole store; hooks may fire concurrently from
/// different admitted actions' tasks, so implementations must tolerate
/// interleaving.
pub trait StoreLogger<S: State, A: Action>: Send + Sync + 'static {
    /// An action was accepted by `dispatch` and queued for admission.
    fn on_action_dispatched(&self, action: &A) {
        let _ = action;
    }

    /// A middleware stage is about to process one action.
    ///
    /// Fires once per item entering the stage, so a stage downstream of an
    /// expanding middleware fires once per expanded item.
    fn on_middleware_processing(&self, middleware: &str, action: &A) {
        let _ = (middleware, action);
    }

    /// One admitted action's pipeline ran to completion without failure,
    /// having forwarded `forwarded` actions to reduction.
    fn on_chain_completed(&self, forwarded: usize) {
        let _ = forwarded;
    }

    /// A held stream produced an action.
    fn on_stream_action(&self, action: &A) {
        let _ = action;
    }

    /// A failure crossed the per-action error boundary.
    fn on_error_occurred(&self, error: &anyhow::Error) {
        let _ = error;
    }

    /// The error processor produced a replacement action for a failure.
    fn on_error_handled(&self, action: &A) {
        let _ = action;
    }

    /// The reducer folded `action` over `previous`, producing `new`.
    ///
    /// Fires before the new state is published, inside the serialized
    /// reduction sequence, so invocations are totally ordered.
    fn on_state_reduced(&self, action: &A, previous: &S, new: &S) {
        let _ = (action, previous, new);
    }
}

/// A logger that does nothing. The store's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl<S: State, A: Action> StoreLogger<S, A> for NoOpLogger {}

/// A logger that forwards every hook to [`tracing`] at debug level
/// (warn for errors).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl<S, A> StoreLogger<S, A> for TracingLogger
where
    S: State + std::fmt::Debug,
    A: Action + std::fmt::Debug,
{
    fn on_action_dispatched(&self, action: &A) {
        tracing::debug!(?action, "action dispatched");
    }

    fn on_middleware_processing(&self, middleware: &str, action: &A) {
        tracing::debug!(middleware, ?action, "middleware processing");
    }

    fn on_chain_completed(&self, forwarded: usize) {
        tracing::debug!(forwarded, "middleware chain completed");
    }

    fn on_stream_action(&self, action: &A) {
        tracing::debug!(?action, "held stream produced action");
    }

    fn on_error_occurred(&self, error: &anyhow::Error) {
        tracing::warn!(%error, "action pipeline failed");
    }

    fn on_error_handled(&self, action: &A) {
        tracing::debug!(?action, "error replaced");
    }

    fn on_state_reduced(&self, action: &A, previous: &S, new: &S) {
        tracing::debug!(?action, ?previous, ?new, "state reduced");
    }
}
